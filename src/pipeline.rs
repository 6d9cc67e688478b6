use std::sync::Arc;

use rayon::prelude::*;

use crate::{
    anchor::resolver::{
        AnchorObservation, AnchorSettings, DetectionFallback, RawDetection, resolve_with_fallback,
    },
    assets::photo::SourcePhoto,
    foundation::core::RasterRgba8,
    foundation::error::{PhotoslotError, PhotoslotResult},
    placement::{
        sampler::{DEFAULT_MAX_SUPERSAMPLE, SampleOptions, sample},
        solver::{SlotPlacement, solve},
    },
    render::compositor::{CompositeResult, ResolvedSlot, composite},
    template::model::Template,
};

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Engine-wide settings shared by every request.
pub struct EngineSettings {
    /// Anchor resolution thresholds and policies.
    #[serde(default)]
    pub anchor: AnchorSettings,
    /// Straight-alpha color the canvas starts from.
    #[serde(default = "default_background_rgba")]
    pub background_rgba: [u8; 4],
    /// Per-axis supersampling cap for downscaled photos.
    #[serde(default = "default_max_supersample")]
    pub max_supersample: u32,
    /// Worker threads for [`compose_batch`]; `None` uses rayon's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            anchor: AnchorSettings::default(),
            background_rgba: default_background_rgba(),
            max_supersample: DEFAULT_MAX_SUPERSAMPLE,
            threads: None,
        }
    }
}

impl EngineSettings {
    /// Parse settings JSON; absent fields take their defaults.
    pub fn from_json(json: &str) -> PhotoslotResult<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate nested anchor settings and numeric limits.
    pub fn validate(&self) -> PhotoslotResult<()> {
        self.anchor.validate()?;
        if self.max_supersample == 0 {
            return Err(PhotoslotError::config("maxSupersample must be >= 1"));
        }
        if self.threads == Some(0) {
            return Err(PhotoslotError::config("threads must be >= 1 when set"));
        }
        Ok(())
    }
}

fn default_background_rgba() -> [u8; 4] {
    [255, 255, 255, 255]
}

fn default_max_supersample() -> u32 {
    DEFAULT_MAX_SUPERSAMPLE
}

#[derive(Clone, Debug)]
/// One source photo with its detection and per-photo options.
pub struct PhotoInput {
    /// Decoded photo.
    pub photo: SourcePhoto,
    /// Detection keyed to the template's anchor mode.
    pub detection: RawDetection,
    /// Flip horizontally before placement.
    pub mirror: bool,
    /// What to do when the required detection is missing.
    pub on_no_detection: DetectionFallback,
}

impl PhotoInput {
    /// A photo with no detection, no mirroring, and the `fail` fallback.
    pub fn new(photo: SourcePhoto) -> Self {
        Self {
            photo,
            detection: RawDetection::NotFound,
            mirror: false,
            on_no_detection: DetectionFallback::Fail,
        }
    }

    /// Attach a detection.
    pub fn with_detection(mut self, detection: RawDetection) -> Self {
        self.detection = detection;
        self
    }

    /// Set the mirror flag.
    pub fn with_mirror(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }

    /// Set the missing-detection fallback.
    pub fn with_fallback(mut self, fallback: DetectionFallback) -> Self {
        self.on_no_detection = fallback;
        self
    }

    fn observe(
        &self,
        template: &Template,
        settings: &AnchorSettings,
    ) -> PhotoslotResult<AnchorObservation> {
        let observation = resolve_with_fallback(
            template.anchor_mode,
            &self.detection,
            &self.photo,
            settings,
            self.on_no_detection,
        )?;
        Ok(if self.mirror {
            observation.mirrored()
        } else {
            observation
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Explicit mapping of one photo onto one slot.
pub struct SlotAssignment {
    /// Target slot id.
    pub slot_id: String,
    /// Index into [`CompositeRequest::photos`].
    pub photo_index: usize,
}

#[derive(Clone, Debug)]
/// Everything needed to render one composite.
pub struct CompositeRequest {
    /// Validated template.
    pub template: Arc<Template>,
    /// Canvas-sized template artwork, if any.
    pub art: Option<RasterRgba8>,
    /// Source photos.
    pub photos: Vec<PhotoInput>,
    /// Explicit assignments; `None` fills slots in paint order.
    pub assignments: Option<Vec<SlotAssignment>>,
}

impl CompositeRequest {
    /// A request with no artwork, photos, or assignments.
    pub fn new(template: Arc<Template>) -> Self {
        Self {
            template,
            art: None,
            photos: Vec::new(),
            assignments: None,
        }
    }

    /// Set the template artwork.
    pub fn with_art(mut self, art: RasterRgba8) -> Self {
        self.art = Some(art);
        self
    }

    /// Append a photo.
    pub fn with_photo(mut self, photo: PhotoInput) -> Self {
        self.photos.push(photo);
        self
    }

    /// Assign photo `photo_index` to `slot_id`.
    pub fn assign(mut self, slot_id: impl Into<String>, photo_index: usize) -> Self {
        self.assignments
            .get_or_insert_with(Vec::new)
            .push(SlotAssignment {
                slot_id: slot_id.into(),
                photo_index,
            });
        self
    }

    /// `(slot_index, photo_index)` pairs to render.
    pub fn slot_photo_pairs(&self) -> PhotoslotResult<Vec<(usize, usize)>> {
        let template = &self.template;
        let Some(assignments) = &self.assignments else {
            let order = template.paint_order();
            if self.photos.len() > order.len() {
                tracing::debug!(
                    photos = self.photos.len(),
                    slots = order.len(),
                    "more photos than slots; extra photos unused"
                );
            }
            return Ok(order.into_iter().zip(0..self.photos.len()).collect());
        };

        let mut pairs = Vec::with_capacity(assignments.len());
        for a in assignments {
            let slot_index = template.slot_index(&a.slot_id).ok_or_else(|| {
                PhotoslotError::config(format!(
                    "template '{}' has no slot '{}'",
                    template.template_id, a.slot_id
                ))
            })?;
            if a.photo_index >= self.photos.len() {
                return Err(PhotoslotError::config(format!(
                    "slot '{}' references photo {} but only {} were supplied",
                    a.slot_id,
                    a.photo_index,
                    self.photos.len()
                )));
            }
            if pairs.iter().any(|&(s, _)| s == slot_index) {
                return Err(PhotoslotError::config(format!(
                    "slot '{}' is assigned more than once",
                    a.slot_id
                )));
            }
            pairs.push((slot_index, a.photo_index));
        }
        Ok(pairs)
    }
}

/// Resolve, place, sample, and composite every assigned photo.
///
/// All-or-nothing: the first failing slot aborts the request.
#[tracing::instrument(
    skip(request, settings),
    fields(template_id = %request.template.template_id, photos = request.photos.len())
)]
pub fn compose(
    request: &CompositeRequest,
    settings: &EngineSettings,
) -> PhotoslotResult<CompositeResult> {
    settings.validate()?;
    let template = &request.template;
    template.validate()?;

    let pairs = request.slot_photo_pairs()?;
    let mut resolved = Vec::with_capacity(pairs.len());
    for (slot_index, photo_index) in pairs {
        let input = &request.photos[photo_index];
        let geometry = template.slot_geometry(slot_index)?;
        let observation = input.observe(template, &settings.anchor).inspect_err(|err| {
            tracing::warn!(slot_id = %geometry.slot_id, photo_index, %err, "anchor resolution failed");
        })?;
        let placement = solve(&geometry, &observation);
        let pixels = sample(
            &input.photo,
            &placement,
            &geometry,
            SampleOptions {
                mirror: input.mirror,
                max_supersample: settings.max_supersample,
            },
        )?;
        resolved.push(ResolvedSlot {
            slot_index,
            placement,
            pixels,
        });
    }

    composite(
        template,
        request.art.as_ref(),
        &resolved,
        settings.background_rgba,
    )
}

/// Placement for a live preview, computed by the same resolver and solver as [`compose`].
pub fn preview_placement(
    template: &Template,
    slot_id: &str,
    input: &PhotoInput,
    settings: &AnchorSettings,
) -> PhotoslotResult<SlotPlacement> {
    let observation = input.observe(template, settings)?;
    place_observation(template, slot_id, &observation)
}

/// Solve the placement of an already-resolved observation in `slot_id`.
pub fn place_observation(
    template: &Template,
    slot_id: &str,
    observation: &AnchorObservation,
) -> PhotoslotResult<SlotPlacement> {
    let index = template.slot_index(slot_id).ok_or_else(|| {
        PhotoslotError::config(format!(
            "template '{}' has no slot '{slot_id}'",
            template.template_id
        ))
    })?;
    let geometry = template.slot_geometry(index)?;
    Ok(solve(&geometry, observation))
}

/// Compose independent requests in parallel, one result per request in input order.
///
/// The outer error covers settings and thread-pool setup only.
#[tracing::instrument(skip(requests, settings), fields(requests = requests.len()))]
pub fn compose_batch(
    requests: &[CompositeRequest],
    settings: &EngineSettings,
) -> PhotoslotResult<Vec<PhotoslotResult<CompositeResult>>> {
    settings.validate()?;
    let pool = build_thread_pool(settings.threads)?;
    Ok(pool.install(|| {
        requests
            .par_iter()
            .map(|request| compose(request, settings))
            .collect()
    }))
}

fn build_thread_pool(threads: Option<usize>) -> PhotoslotResult<rayon::ThreadPool> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| PhotoslotError::Other(anyhow::anyhow!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../tests/unit/pipeline/pipeline.rs"]
mod tests;
