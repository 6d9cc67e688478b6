//! Affine transform helpers for photo placement.
//!
//! All placements are uniform scale followed by translation, optionally
//! preceded by a horizontal flip of the source photo.

use crate::foundation::core::{Affine, Point, Rect, Vec2};

#[inline]
/// `a` applied after `b`.
pub fn compose(a: Affine, b: Affine) -> Affine {
    a * b
}

#[inline]
/// Map source-photo coordinates to canvas coordinates.
pub fn placement(scale: f64, translate: Vec2) -> Affine {
    Affine::translate(translate) * Affine::scale(scale)
}

#[inline]
/// Horizontal flip of an image `width` pixels wide, mapping `x` to `width - x`.
pub fn mirror_x(width: f64) -> Affine {
    Affine::new([-1.0, 0.0, 0.0, 1.0, width, 0.0])
}

/// Map from source-photo coordinates to canvas coordinates, with the flip
/// applied to the photo first when `mirror` is set.
pub fn photo_to_canvas(scale: f64, translate: Vec2, photo_width: f64, mirror: bool) -> Affine {
    let place = placement(scale, translate);
    if mirror {
        compose(place, mirror_x(photo_width))
    } else {
        place
    }
}

/// Canvas-space bounds of a `photo` rectangle under a uniform placement.
pub fn placed_bounds(scale: f64, translate: Vec2, photo: Rect) -> Rect {
    let p0 = Point::new(photo.x0 * scale, photo.y0 * scale) + translate;
    let p1 = Point::new(photo.x1 * scale, photo.y1 * scale) + translate;
    Rect::from_points(p0, p1)
}

#[cfg(test)]
#[path = "../../tests/unit/transform/affine.rs"]
mod tests;
