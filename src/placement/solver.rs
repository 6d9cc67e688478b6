use crate::{
    anchor::resolver::AnchorObservation,
    foundation::core::{Affine, Point, Rect, Size, Vec2},
    foundation::math::GEOMETRY_EPS,
    template::model::{SlotGeometry, TemplateType},
    transform::affine,
};

/// Share of the slot height a sticker fills when no feature ratio is set.
pub const STICKER_FILL_RATIO: f64 = 0.90;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Uniform scale plus translation placing one photo into one slot.
///
/// `translate` is in canvas coordinates: a source point `p` lands on
/// `scale * p + translate`.
pub struct SlotPlacement {
    /// Slot this placement belongs to.
    pub slot_id: String,
    /// Final scale, always within the slot's zoom bounds.
    pub scale: f64,
    /// Scale before zoom clamping.
    pub raw_scale: f64,
    /// Canvas-space translation.
    pub translate: Vec2,
    /// `true` when `raw_scale` was outside the zoom bounds.
    pub zoom_clamped: bool,
    /// Translation added to keep the slot covered; zero when the anchor is exact.
    pub coverage_shift: Vec2,
    /// `false` when the clamped photo is too small to cover the slot on some axis.
    pub full_coverage: bool,
}

impl SlotPlacement {
    /// Source-to-canvas transform.
    pub fn to_affine(&self) -> Affine {
        affine::placement(self.scale, self.translate)
    }

    /// Where a source-photo point lands on the canvas.
    pub fn map_point(&self, p: Point) -> Point {
        self.to_affine() * p
    }

    /// Translation relative to the slot's top-left corner.
    pub fn slot_local_translate(&self, slot: &SlotGeometry) -> Vec2 {
        self.translate - slot.rect.origin().to_vec2()
    }

    /// Canvas-space bounds of the placed photo.
    pub fn placed_bounds(&self, photo_size: Size) -> Rect {
        affine::placed_bounds(self.scale, self.translate, photo_size.to_rect())
    }
}

/// Compute the placement of an observed photo inside `slot`.
///
/// Scale comes from the desired feature height, is clamped to the
/// zoom bounds, and the anchor point is mapped onto the slot target. When the
/// result leaves part of the slot uncovered the translation is shifted per
/// axis by the smallest amount that restores coverage.
///
/// Without a feature the photo covers the slot. With a feature but no
/// configured ratio, `frame` templates cover the slot and `sticker` templates
/// fill [`STICKER_FILL_RATIO`] of the slot height.
pub fn solve(slot: &SlotGeometry, observation: &AnchorObservation) -> SlotPlacement {
    let photo_size = observation.photo_size();
    let cover = cover_scale(slot.rect.size(), photo_size);

    let (raw_scale, anchor, target) = match *observation {
        AnchorObservation::Feature {
            point,
            feature_size,
            ..
        } => {
            let raw = match (slot.desired_face_ratio, slot.template_type) {
                (Some(ratio), _) => ratio * slot.rect.height() / feature_size,
                (None, TemplateType::Sticker) => {
                    STICKER_FILL_RATIO * slot.rect.height() / photo_size.height
                }
                (None, TemplateType::Frame) => cover,
            };
            (raw, point, slot.target)
        }
        AnchorObservation::FitToSlot { .. } => (
            cover,
            photo_size.to_rect().center(),
            slot.rect.center(),
        ),
    };

    let scale = raw_scale.clamp(slot.min_zoom, slot.max_zoom);
    let zoom_clamped = scale != raw_scale;
    if zoom_clamped {
        tracing::debug!(
            slot_id = %slot.slot_id,
            raw_scale,
            scale,
            min_zoom = slot.min_zoom,
            max_zoom = slot.max_zoom,
            "zoom clamped"
        );
    }

    let aligned = target.to_vec2() - anchor.to_vec2() * scale;
    let (tx, cover_x) = cover_axis(
        aligned.x,
        scale * photo_size.width,
        slot.rect.x0,
        slot.rect.width(),
    );
    let (ty, cover_y) = cover_axis(
        aligned.y,
        scale * photo_size.height,
        slot.rect.y0,
        slot.rect.height(),
    );
    let translate = Vec2::new(tx, ty);
    let coverage_shift = translate - aligned;
    let full_coverage = cover_x && cover_y;

    if !full_coverage {
        tracing::warn!(
            slot_id = %slot.slot_id,
            scale,
            "photo cannot cover slot within zoom bounds"
        );
    } else if coverage_shift != Vec2::ZERO {
        tracing::debug!(
            slot_id = %slot.slot_id,
            dx = coverage_shift.x,
            dy = coverage_shift.y,
            "shifted placement to cover slot"
        );
    }

    SlotPlacement {
        slot_id: slot.slot_id.clone(),
        scale,
        raw_scale,
        translate,
        zoom_clamped,
        coverage_shift,
        full_coverage,
    }
}

fn cover_scale(slot: Size, photo: Size) -> f64 {
    (slot.width / photo.width).max(slot.height / photo.height)
}

// Returns the corrected translation and whether the slot is covered on this axis.
// A photo narrower than the slot is kept inside it instead.
fn cover_axis(t: f64, extent: f64, slot_start: f64, slot_len: f64) -> (f64, bool) {
    let slack = extent - slot_len;
    if slack >= -GEOMETRY_EPS * (1.0 + slot_len) {
        let lo = slot_start - slack.max(0.0);
        (t.clamp(lo, slot_start), true)
    } else {
        (t.clamp(slot_start, slot_start - slack), false)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/placement/solver.rs"]
mod tests;
