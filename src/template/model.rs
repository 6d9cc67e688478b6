use std::collections::HashSet;
use std::fmt;

use crate::foundation::core::{Canvas, Point, Rect};
use crate::foundation::error::{PhotoslotError, PhotoslotResult};
use crate::foundation::math::approx_le;

const DEFAULT_MIN_ZOOM: f64 = 0.5;
const DEFAULT_MAX_ZOOM: f64 = 3.0;
const DEFAULT_CANVAS_WIDTH: u32 = 1200;
const DEFAULT_CANVAS_HEIGHT: u32 = 1600;
/// Vertical target used when a slot omits `targetY`: upper third of the slot.
const DEFAULT_TARGET_Y_RATIO: f64 = 0.30;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
/// Which subject feature a template aligns to its slot targets.
pub enum AnchorMode {
    /// Center of the detected face.
    FaceCenter,
    /// Eye line of the detected face.
    Eyes,
    /// Shoulder line of the detected subject.
    Shoulders,
    /// Center of the photo's non-transparent bounding box.
    #[default]
    BboxCenter,
    /// No anchor; the photo is fit to cover the slot.
    None,
}

impl AnchorMode {
    /// `true` for modes that need an external detection result.
    pub fn requires_detection(self) -> bool {
        matches!(self, Self::FaceCenter | Self::Eyes | Self::Shoulders)
    }

    /// Stable snake_case name, matching the JSON form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FaceCenter => "face_center",
            Self::Eyes => "eyes",
            Self::Shoulders => "shoulders",
            Self::BboxCenter => "bbox_center",
            Self::None => "none",
        }
    }
}

impl fmt::Display for AnchorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
/// Paint order between template artwork and slot photos.
pub enum CompositeMode {
    /// Template artwork behind the photos.
    Background,
    /// Template artwork on top; its transparent cutouts reveal the photos.
    #[default]
    Overlay,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
/// Authoring intent of a template.
///
/// Decides how a detected feature is scaled when no `desiredFaceRatio` is set.
pub enum TemplateType {
    /// Background-removed subject placed onto artwork; fills a fixed share of
    /// the slot height.
    #[default]
    Sticker,
    /// Full photo placed inside a frame; covers the slot.
    Frame,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
/// Units of a slot's anchor target as written in template JSON.
pub enum AnchorUnits {
    /// Slot-local pixels.
    #[default]
    Px,
    /// Fraction of the slot size in `[0, 1]`.
    Fraction,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Slot-local target point (pixels) that the subject anchor should land on.
pub struct AnchorTarget {
    /// Horizontal target in slot pixels.
    pub target_x: f64,
    /// Vertical target in slot pixels.
    pub target_y: f64,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// A rectangular placement zone on the template canvas.
pub struct Slot {
    /// Identifier, unique within the template.
    pub slot_id: String,
    /// Left edge in canvas pixels.
    pub x: u32,
    /// Top edge in canvas pixels.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Target for the subject anchor, slot-local pixels.
    pub anchor: AnchorTarget,
    /// Paint order among slots; higher paints later.
    #[serde(default)]
    pub z_index: i32,
    /// Per-slot override of the template's desired feature ratio.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_face_ratio: Option<f64>,
    /// Per-slot override of the minimum zoom.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_zoom: Option<f64>,
    /// Per-slot override of the maximum zoom.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_zoom: Option<f64>,
}

impl Slot {
    /// Slot rectangle in canvas coordinates.
    pub fn rect(&self) -> Rect {
        Rect::new(
            f64::from(self.x),
            f64::from(self.y),
            f64::from(self.x) + f64::from(self.width),
            f64::from(self.y) + f64::from(self.height),
        )
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", try_from = "TemplateDoc")]
/// A validated, immutable template: canvas, layering, and slots.
///
/// Deserialization accepts the legacy key spellings produced by older admin
/// tooling (`id`, `png_path`, `dimensions`, `slotId`/`id`, `anchorTarget`,
/// `x`/`y` targets, fractional targets) and always validates the result.
/// Serialization writes the canonical camelCase form.
pub struct Template {
    /// Template identifier.
    pub template_id: String,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Location of the template artwork, relative to the template JSON.
    pub png_url: String,
    /// Canvas width in pixels.
    pub canvas_width: u32,
    /// Canvas height in pixels.
    pub canvas_height: u32,
    /// Anchor feature used for every slot.
    pub anchor_mode: AnchorMode,
    /// Layering of artwork versus photos.
    pub composite_mode: CompositeMode,
    /// Authoring intent.
    pub template_type: TemplateType,
    /// Default fraction of slot height the anchor feature should occupy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired_face_ratio: Option<f64>,
    /// Default minimum zoom.
    pub min_zoom: f64,
    /// Default maximum zoom.
    pub max_zoom: f64,
    /// Slots in declaration order.
    pub slots: Vec<Slot>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
/// A slot with template defaults folded in, in canvas coordinates.
///
/// This is the single geometry input shared by live preview and final render.
pub struct SlotGeometry {
    /// Slot identifier.
    pub slot_id: String,
    /// Slot rectangle in canvas pixels.
    pub rect: Rect,
    /// Slot width in whole pixels.
    pub width_px: u32,
    /// Slot height in whole pixels.
    pub height_px: u32,
    /// Absolute canvas point the anchor should land on.
    pub target: Point,
    /// Fraction of slot height the anchor feature should occupy, if configured.
    pub desired_face_ratio: Option<f64>,
    /// Template intent, used when no feature ratio is configured.
    pub template_type: TemplateType,
    /// Lower zoom bound.
    pub min_zoom: f64,
    /// Upper zoom bound.
    pub max_zoom: f64,
}

impl Template {
    /// Parse template JSON, accepting legacy keys, and validate it.
    pub fn from_json(json: &str) -> PhotoslotResult<Self> {
        let doc: TemplateDoc = serde_json::from_str(json)?;
        Self::try_from(doc)
    }

    /// Serialize to canonical pretty JSON.
    pub fn to_json_pretty(&self) -> PhotoslotResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Built-in single-slot template used when a request names no template.
    pub fn fallback(template_id: impl Into<String>) -> Self {
        Self {
            template_id: template_id.into(),
            name: Some("Default Template".to_string()),
            png_url: String::new(),
            canvas_width: 1200,
            canvas_height: 1200,
            anchor_mode: AnchorMode::BboxCenter,
            composite_mode: CompositeMode::Overlay,
            template_type: TemplateType::Sticker,
            desired_face_ratio: None,
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            slots: vec![Slot {
                slot_id: "main".to_string(),
                x: 100,
                y: 100,
                width: 1000,
                height: 1000,
                anchor: AnchorTarget {
                    target_x: 500.0,
                    target_y: 400.0,
                },
                z_index: 0,
                desired_face_ratio: None,
                min_zoom: None,
                max_zoom: None,
            }],
        }
    }

    /// Output canvas.
    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.canvas_width,
            height: self.canvas_height,
        }
    }

    /// Index of the slot with the given id.
    pub fn slot_index(&self, slot_id: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.slot_id == slot_id)
    }

    /// Slot indices in paint order: ascending `z_index`, ties by declaration order.
    pub fn paint_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.slots.len()).collect();
        order.sort_by_key(|&idx| (self.slots[idx].z_index, idx));
        order
    }

    /// Resolve one slot against template defaults.
    pub fn slot_geometry(&self, index: usize) -> PhotoslotResult<SlotGeometry> {
        let slot = self.slots.get(index).ok_or_else(|| {
            PhotoslotError::config(format!(
                "template '{}' has no slot at index {index}",
                self.template_id
            ))
        })?;
        let rect = slot.rect();
        Ok(SlotGeometry {
            slot_id: slot.slot_id.clone(),
            rect,
            width_px: slot.width,
            height_px: slot.height,
            target: Point::new(
                rect.x0 + slot.anchor.target_x,
                rect.y0 + slot.anchor.target_y,
            ),
            desired_face_ratio: slot.desired_face_ratio.or(self.desired_face_ratio),
            template_type: self.template_type,
            min_zoom: slot.min_zoom.unwrap_or(self.min_zoom),
            max_zoom: slot.max_zoom.unwrap_or(self.max_zoom),
        })
    }

    /// Validate canvas, zoom defaults, and every slot invariant.
    pub fn validate(&self) -> PhotoslotResult<()> {
        if self.template_id.trim().is_empty() {
            return Err(PhotoslotError::config("templateId must be non-empty"));
        }
        Canvas::new(self.canvas_width, self.canvas_height)?;
        validate_zoom(self.min_zoom, self.max_zoom, "template")?;
        if let Some(ratio) = self.desired_face_ratio {
            validate_ratio(ratio, "template")?;
        }

        let mut seen = HashSet::new();
        for slot in &self.slots {
            let id = slot.slot_id.as_str();
            if id.trim().is_empty() {
                return Err(PhotoslotError::config("slotId must be non-empty"));
            }
            if !seen.insert(id) {
                return Err(PhotoslotError::config(format!("duplicate slotId '{id}'")));
            }
            if slot.width == 0 || slot.height == 0 {
                return Err(PhotoslotError::config(format!(
                    "slot '{id}' width/height must be > 0"
                )));
            }
            let right = u64::from(slot.x) + u64::from(slot.width);
            let bottom = u64::from(slot.y) + u64::from(slot.height);
            if right > u64::from(self.canvas_width) || bottom > u64::from(self.canvas_height) {
                return Err(PhotoslotError::config(format!(
                    "slot '{id}' ({},{} {}x{}) exceeds canvas {}x{}",
                    slot.x, slot.y, slot.width, slot.height, self.canvas_width, self.canvas_height
                )));
            }
            let AnchorTarget { target_x, target_y } = slot.anchor;
            if !target_x.is_finite()
                || !target_y.is_finite()
                || target_x < 0.0
                || target_y < 0.0
                || !approx_le(target_x, f64::from(slot.width))
                || !approx_le(target_y, f64::from(slot.height))
            {
                return Err(PhotoslotError::config(format!(
                    "slot '{id}' anchor target ({target_x}, {target_y}) lies outside the slot"
                )));
            }
            let min_zoom = slot.min_zoom.unwrap_or(self.min_zoom);
            let max_zoom = slot.max_zoom.unwrap_or(self.max_zoom);
            validate_zoom(min_zoom, max_zoom, &format!("slot '{id}'"))?;
            if let Some(ratio) = slot.desired_face_ratio {
                validate_ratio(ratio, &format!("slot '{id}'"))?;
            }
        }
        Ok(())
    }
}

fn validate_zoom(min_zoom: f64, max_zoom: f64, owner: &str) -> PhotoslotResult<()> {
    if !min_zoom.is_finite() || !max_zoom.is_finite() || min_zoom <= 0.0 || max_zoom <= 0.0 {
        return Err(PhotoslotError::config(format!(
            "{owner} minZoom/maxZoom must be finite and > 0"
        )));
    }
    if min_zoom > max_zoom {
        return Err(PhotoslotError::config(format!(
            "{owner} minZoom ({min_zoom}) must be <= maxZoom ({max_zoom})"
        )));
    }
    Ok(())
}

fn validate_ratio(ratio: f64, owner: &str) -> PhotoslotResult<()> {
    if !ratio.is_finite() || ratio <= 0.0 {
        return Err(PhotoslotError::config(format!(
            "{owner} desiredFaceRatio must be finite and > 0"
        )));
    }
    Ok(())
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct TemplateDoc {
    #[serde(alias = "id")]
    template_id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, alias = "png_path")]
    png_url: String,
    #[serde(default, alias = "width")]
    canvas_width: Option<u32>,
    #[serde(default, alias = "height")]
    canvas_height: Option<u32>,
    #[serde(default)]
    dimensions: Option<DimensionsDoc>,
    #[serde(default)]
    anchor_mode: AnchorMode,
    #[serde(default)]
    composite_mode: CompositeMode,
    #[serde(default)]
    template_type: TemplateType,
    #[serde(default)]
    desired_face_ratio: Option<f64>,
    #[serde(default = "default_min_zoom")]
    min_zoom: f64,
    #[serde(default = "default_max_zoom")]
    max_zoom: f64,
    #[serde(default)]
    slots: Vec<SlotDoc>,
}

#[derive(serde::Deserialize)]
struct DimensionsDoc {
    width: u32,
    height: u32,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct SlotDoc {
    #[serde(alias = "id")]
    slot_id: Option<String>,
    x: i64,
    y: i64,
    width: i64,
    height: i64,
    #[serde(default, alias = "anchorTarget")]
    anchor: Option<AnchorDoc>,
    #[serde(default)]
    z_index: i32,
    #[serde(default)]
    desired_face_ratio: Option<f64>,
    #[serde(default)]
    min_zoom: Option<f64>,
    #[serde(default)]
    max_zoom: Option<f64>,
}

#[derive(serde::Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct AnchorDoc {
    #[serde(default, alias = "x")]
    target_x: Option<f64>,
    #[serde(default, alias = "y")]
    target_y: Option<f64>,
    #[serde(default)]
    units: AnchorUnits,
}

fn default_min_zoom() -> f64 {
    DEFAULT_MIN_ZOOM
}

fn default_max_zoom() -> f64 {
    DEFAULT_MAX_ZOOM
}

impl TryFrom<TemplateDoc> for Template {
    type Error = PhotoslotError;

    fn try_from(doc: TemplateDoc) -> Result<Self, Self::Error> {
        let (dim_w, dim_h) = doc
            .dimensions
            .map(|d| (Some(d.width), Some(d.height)))
            .unwrap_or((None, None));
        let canvas_width = doc.canvas_width.or(dim_w).unwrap_or(DEFAULT_CANVAS_WIDTH);
        let canvas_height = doc.canvas_height.or(dim_h).unwrap_or(DEFAULT_CANVAS_HEIGHT);

        let slots = doc
            .slots
            .into_iter()
            .map(SlotDoc::into_slot)
            .collect::<PhotoslotResult<Vec<_>>>()?;

        let template = Template {
            template_id: doc.template_id,
            name: doc.name,
            png_url: doc.png_url,
            canvas_width,
            canvas_height,
            anchor_mode: doc.anchor_mode,
            composite_mode: doc.composite_mode,
            template_type: doc.template_type,
            desired_face_ratio: doc.desired_face_ratio,
            min_zoom: doc.min_zoom,
            max_zoom: doc.max_zoom,
            slots,
        };
        template.validate()?;
        Ok(template)
    }
}

impl SlotDoc {
    fn into_slot(self) -> PhotoslotResult<Slot> {
        let slot_id = self.slot_id.unwrap_or_else(|| "main".to_string());
        let px = |v: i64, field: &str| -> PhotoslotResult<u32> {
            u32::try_from(v).map_err(|_| {
                PhotoslotError::config(format!(
                    "slot '{slot_id}' {field} must be a non-negative pixel value, got {v}"
                ))
            })
        };
        let x = px(self.x, "x")?;
        let y = px(self.y, "y")?;
        let width = px(self.width, "width")?;
        let height = px(self.height, "height")?;

        let anchor = self.anchor.unwrap_or_default();
        let (w, h) = (f64::from(width), f64::from(height));
        let (target_x, target_y) = match anchor.units {
            AnchorUnits::Px => (anchor.target_x, anchor.target_y),
            AnchorUnits::Fraction => (
                anchor.target_x.map(|v| v * w),
                anchor.target_y.map(|v| v * h),
            ),
        };

        Ok(Slot {
            slot_id,
            x,
            y,
            width,
            height,
            anchor: AnchorTarget {
                target_x: target_x.unwrap_or(w / 2.0),
                target_y: target_y.unwrap_or(h * DEFAULT_TARGET_Y_RATIO),
            },
            z_index: self.z_index,
            desired_face_ratio: self.desired_face_ratio,
            min_zoom: self.min_zoom,
            max_zoom: self.max_zoom,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/template/model.rs"]
mod tests;
