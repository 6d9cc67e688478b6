use crate::{
    assets::photo::SourcePhoto,
    foundation::core::{Point, RasterRgba8, rgba8_len},
    foundation::error::{PhotoslotError, PhotoslotResult},
    placement::solver::SlotPlacement,
    render::blend::{PremulRgba, premultiply, unpremultiply},
    template::model::SlotGeometry,
    transform::affine,
};

pub(crate) const DEFAULT_MAX_SUPERSAMPLE: u32 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Per-photo sampling options.
pub struct SampleOptions {
    /// Flip the photo horizontally before placing it.
    #[serde(default)]
    pub mirror: bool,
    /// Upper bound on the per-axis supersampling factor used when downscaling.
    #[serde(default = "default_max_supersample")]
    pub max_supersample: u32,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            mirror: false,
            max_supersample: DEFAULT_MAX_SUPERSAMPLE,
        }
    }
}

fn default_max_supersample() -> u32 {
    DEFAULT_MAX_SUPERSAMPLE
}

/// Resample `photo` into a `slot`-sized straight-alpha buffer.
///
/// Each destination pixel center is mapped back through the inverse
/// placement; samples outside the photo are transparent. Interpolation
/// happens on premultiplied values so transparent neighbours never tint
/// edge pixels. When the photo is scaled down each pixel averages an
/// `n x n` grid of bilinear samples with `n = ceil(1 / scale)`.
pub fn sample(
    photo: &SourcePhoto,
    placement: &SlotPlacement,
    slot: &SlotGeometry,
    options: SampleOptions,
) -> PhotoslotResult<RasterRgba8> {
    if !(placement.scale.is_finite() && placement.scale > 0.0) {
        return Err(PhotoslotError::config(format!(
            "placement scale {} must be finite and > 0",
            placement.scale
        )));
    }

    let to_source = affine::photo_to_canvas(
        placement.scale,
        placement.translate,
        photo.size().width,
        options.mirror,
    )
    .inverse();

    let width = slot.width_px;
    let height = slot.height_px;
    let n = supersample_factor(placement.scale, options.max_supersample);
    let inv_n = 1.0 / f64::from(n);
    let norm = 1.0 / (n * n) as f32;

    let mut data = vec![0u8; rgba8_len(width, height)?];
    for (j, row) in data.chunks_exact_mut(width as usize * 4).enumerate() {
        let y0 = slot.rect.y0 + j as f64;
        for (i, out) in row.chunks_exact_mut(4).enumerate() {
            let x0 = slot.rect.x0 + i as f64;
            let mut acc = [0.0f32; 4];
            for sy in 0..n {
                let cy = y0 + (f64::from(sy) + 0.5) * inv_n;
                for sx in 0..n {
                    let cx = x0 + (f64::from(sx) + 0.5) * inv_n;
                    let src = to_source * Point::new(cx, cy);
                    let px = bilinear_premul(photo, src.x, src.y);
                    for (a, v) in acc.iter_mut().zip(px) {
                        *a += v;
                    }
                }
            }
            for a in &mut acc {
                *a *= norm;
            }
            out.copy_from_slice(&unpremultiply(acc));
        }
    }

    RasterRgba8::new(width, height, data)
}

fn supersample_factor(scale: f64, max: u32) -> u32 {
    if scale >= 1.0 {
        return 1;
    }
    let n = (1.0 / scale).ceil();
    if n >= f64::from(max.max(1)) {
        max.max(1)
    } else {
        n as u32
    }
}

fn bilinear_premul(photo: &SourcePhoto, u: f64, v: f64) -> PremulRgba {
    let w = photo.width();
    let h = photo.height();
    if !u.is_finite() || !v.is_finite() || u < 0.0 || v < 0.0 || u > f64::from(w) || v > f64::from(h)
    {
        return [0.0; 4];
    }

    let sx = u - 0.5;
    let sy = v - 0.5;
    let xf = sx.floor();
    let yf = sy.floor();
    let tx = (sx - xf) as f32;
    let ty = (sy - yf) as f32;

    let clamp_x = |x: f64| x.clamp(0.0, f64::from(w - 1)) as u32;
    let clamp_y = |y: f64| y.clamp(0.0, f64::from(h - 1)) as u32;
    let (x0, x1) = (clamp_x(xf), clamp_x(xf + 1.0));
    let (y0, y1) = (clamp_y(yf), clamp_y(yf + 1.0));

    let p00 = premultiply(photo.pixel(x0, y0));
    let p10 = premultiply(photo.pixel(x1, y0));
    let p01 = premultiply(photo.pixel(x0, y1));
    let p11 = premultiply(photo.pixel(x1, y1));

    let mut out = [0.0f32; 4];
    for c in 0..4 {
        let top = p00[c] * (1.0 - tx) + p10[c] * tx;
        let bottom = p01[c] * (1.0 - tx) + p11[c] * tx;
        out[c] = top * (1.0 - ty) + bottom * ty;
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/placement/sampler.rs"]
mod tests;
