use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "photoslot", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a template JSON file.
    Validate(ValidateArgs),
    /// Print the placement of one photo in one slot as JSON.
    Place(PlaceArgs),
    /// Composite photos into a template and write a PNG.
    Compose(ComposeArgs),
}

#[derive(Parser, Debug)]
struct ValidateArgs {
    /// Template JSON.
    #[arg(long)]
    template: PathBuf,
}

#[derive(Parser, Debug)]
struct PlaceArgs {
    /// Template JSON.
    #[arg(long)]
    template: PathBuf,

    /// Slot id to place into.
    #[arg(long)]
    slot: String,

    /// Photo size as `WIDTHxHEIGHT`.
    #[arg(long, value_parser = parse_size)]
    photo_size: (u32, u32),

    /// Detected anchor as `X,Y` or `X,Y,FEATURE_SIZE` in photo pixels.
    #[arg(long, value_parser = parse_anchor)]
    anchor: Option<(f64, f64, Option<f64>)>,

    /// Mirror the photo horizontally.
    #[arg(long)]
    mirror: bool,

    /// Engine settings JSON.
    #[arg(long)]
    settings: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ComposeArgs {
    /// Template JSON.
    #[arg(long)]
    template: PathBuf,

    /// Template artwork PNG; resized to the canvas when needed.
    #[arg(long)]
    art: Option<PathBuf>,

    /// Source photos, assigned to slots in paint order.
    #[arg(long = "photo", required = true)]
    photos: Vec<PathBuf>,

    /// JSON array of detections, one per photo.
    #[arg(long)]
    detections: Option<PathBuf>,

    /// Engine settings JSON.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Mirror every photo horizontally.
    #[arg(long)]
    mirror: bool,

    /// Fall back to `bbox_center` for photos without a usable detection.
    #[arg(long)]
    fallback_bbox: bool,

    /// Crop photos to their non-transparent bounds before placement.
    #[arg(long)]
    crop_alpha: bool,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Optional output path for placement diagnostics JSON.
    #[arg(long)]
    placements: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Validate(args) => cmd_validate(args),
        Command::Place(args) => cmd_place(args),
        Command::Compose(args) => cmd_compose(args),
    }
}

fn read_template(path: &Path) -> anyhow::Result<Arc<photoslot::Template>> {
    photoslot::TemplateCache::global()
        .load_file(path)
        .with_context(|| format!("load template '{}'", path.display()))
}

fn read_settings(path: Option<&Path>) -> anyhow::Result<photoslot::EngineSettings> {
    let Some(path) = path else {
        return Ok(photoslot::EngineSettings::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("read settings '{}'", path.display()))?;
    photoslot::EngineSettings::from_json(&json)
        .with_context(|| format!("parse settings '{}'", path.display()))
}

fn read_detections(path: &Path) -> anyhow::Result<Vec<photoslot::RawDetection>> {
    let f = File::open(path).with_context(|| format!("open detections '{}'", path.display()))?;
    let detections: Vec<photoslot::RawDetection> = serde_json::from_reader(BufReader::new(f))
        .with_context(|| "parse detections JSON")?;
    Ok(detections)
}

fn cmd_validate(args: ValidateArgs) -> anyhow::Result<()> {
    let template = read_template(&args.template)?;
    println!(
        "{}: {}x{} canvas, {} slot(s), anchor {}, composite {:?}",
        template.template_id,
        template.canvas_width,
        template.canvas_height,
        template.slots.len(),
        template.anchor_mode,
        template.composite_mode,
    );
    Ok(())
}

fn cmd_place(args: PlaceArgs) -> anyhow::Result<()> {
    let template = read_template(&args.template)?;
    let settings = read_settings(args.settings.as_deref())?;

    let (w, h) = args.photo_size;
    let photo_size = photoslot::Size::new(f64::from(w), f64::from(h));
    let detection = match args.anchor {
        Some((x, y, feature_size)) => photoslot::RawDetection::Found {
            x,
            y,
            feature_size,
            confidence: None,
        },
        None => photoslot::RawDetection::NotFound,
    };

    let mut observation = photoslot::resolve_for_frame(
        template.anchor_mode,
        &detection,
        photo_size,
        &settings.anchor,
    )?;
    if args.mirror {
        observation = observation.mirrored();
    }

    let placement = photoslot::place_observation(&template, &args.slot, &observation)?;
    println!("{}", serde_json::to_string_pretty(&placement)?);
    Ok(())
}

fn cmd_compose(args: ComposeArgs) -> anyhow::Result<()> {
    let template = read_template(&args.template)?;
    let settings = read_settings(args.settings.as_deref())?;

    let detections = match &args.detections {
        Some(path) => read_detections(path)?,
        None => Vec::new(),
    };
    if !detections.is_empty() && detections.len() != args.photos.len() {
        anyhow::bail!(
            "{} detection(s) supplied for {} photo(s)",
            detections.len(),
            args.photos.len()
        );
    }

    let fallback = if args.fallback_bbox {
        photoslot::DetectionFallback::BboxCenter
    } else {
        photoslot::DetectionFallback::Fail
    };

    let mut request = photoslot::CompositeRequest::new(Arc::clone(&template));
    for (idx, path) in args.photos.iter().enumerate() {
        let bytes =
            std::fs::read(path).with_context(|| format!("read photo '{}'", path.display()))?;
        let mut photo = photoslot::decode_photo(&bytes)
            .with_context(|| format!("decode photo '{}'", path.display()))?;
        let mut detection = detections
            .get(idx)
            .copied()
            .unwrap_or(photoslot::RawDetection::NotFound);
        if args.crop_alpha {
            let (cropped, offset) = photo.crop_to_alpha_bbox();
            photo = cropped;
            detection = detection.offset(-offset.x, -offset.y);
        }
        request = request.with_photo(
            photoslot::PhotoInput::new(photo)
                .with_detection(detection)
                .with_mirror(args.mirror)
                .with_fallback(fallback),
        );
    }

    if let Some(path) = &args.art {
        let bytes = std::fs::read(path).with_context(|| format!("read art '{}'", path.display()))?;
        let art = photoslot::decode_template_art(&bytes, template.canvas())
            .with_context(|| format!("decode art '{}'", path.display()))?;
        request = request.with_art(art);
    }

    let result = photoslot::compose(&request, &settings)?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    let png = photoslot::encode_png(&result.raster)?;
    std::fs::write(&args.out, png).with_context(|| format!("write png '{}'", args.out.display()))?;

    if let Some(path) = &args.placements {
        let json = serde_json::to_string_pretty(&result.placements)?;
        std::fs::write(path, json)
            .with_context(|| format!("write placements '{}'", path.display()))?;
    }

    eprintln!(
        "wrote {} ({:016x})",
        args.out.display(),
        result.fingerprint()
    );
    Ok(())
}

fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let w: u32 = w.trim().parse().map_err(|e| format!("bad width: {e}"))?;
    let h: u32 = h.trim().parse().map_err(|e| format!("bad height: {e}"))?;
    if w == 0 || h == 0 {
        return Err("photo size must be > 0".to_string());
    }
    Ok((w, h))
}

fn parse_anchor(s: &str) -> Result<(f64, f64, Option<f64>), String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>().map_err(|e| format!("bad number '{p}': {e}")))
        .collect::<Result<_, _>>()?;
    match parts.as_slice() {
        [x, y] => Ok((*x, *y, None)),
        [x, y, size] => Ok((*x, *y, Some(*size))),
        _ => Err(format!("expected X,Y or X,Y,SIZE, got '{s}'")),
    }
}
