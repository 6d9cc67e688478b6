use crate::{
    foundation::core::RasterRgba8,
    foundation::error::{PhotoslotError, PhotoslotResult},
};

/// One premultiplied RGBA pixel, colour and alpha on a `0..=255` scale.
///
/// Kept in `f32` so layers blend without intermediate 8-bit rounding.
pub type PremulRgba = [f32; 4];

/// Source-over for premultiplied pixels.
pub fn over(dst: PremulRgba, src: PremulRgba) -> PremulRgba {
    let sa = src[3];
    if sa <= 0.0 {
        return dst;
    }
    if sa >= 255.0 {
        return src;
    }

    let inv = 1.0 - sa / 255.0;
    let mut out = [0.0f32; 4];
    for i in 0..4 {
        out[i] = src[i] + dst[i] * inv;
    }
    out
}

/// Premultiply a straight-alpha RGBA8 pixel.
pub fn premultiply(px: [u8; 4]) -> PremulRgba {
    let a = f32::from(px[3]);
    let k = a / 255.0;
    [
        f32::from(px[0]) * k,
        f32::from(px[1]) * k,
        f32::from(px[2]) * k,
        a,
    ]
}

/// Round a premultiplied pixel back to straight-alpha RGBA8.
pub fn unpremultiply(px: PremulRgba) -> [u8; 4] {
    let a = px[3].round().clamp(0.0, 255.0);
    if a < 1.0 {
        return [0, 0, 0, 0];
    }
    let k = 255.0 / px[3];
    let c = |v: f32| (v * k).round().clamp(0.0, 255.0) as u8;
    [c(px[0]), c(px[1]), c(px[2]), a as u8]
}

/// Composite a straight-alpha raster over a premultiplied canvas at `(x, y)`.
///
/// The source must lie fully inside the canvas.
pub fn blit_over(
    dst: &mut [PremulRgba],
    dst_width: u32,
    src: &RasterRgba8,
    x: u32,
    y: u32,
) -> PhotoslotResult<()> {
    let dst_height = u32::try_from(dst.len() / (dst_width.max(1) as usize))
        .map_err(|_| PhotoslotError::input("canvas buffer too large"))?;
    let fits_x = x.checked_add(src.width).is_some_and(|r| r <= dst_width);
    let fits_y = y.checked_add(src.height).is_some_and(|b| b <= dst_height);
    if !fits_x || !fits_y {
        return Err(PhotoslotError::input(format!(
            "{}x{} layer at ({x}, {y}) does not fit a {dst_width}x{dst_height} canvas",
            src.width, src.height
        )));
    }

    let src_row = src.width as usize * 4;
    for (row, src_px) in src.data.chunks_exact(src_row).enumerate() {
        let start = (y as usize + row) * dst_width as usize + x as usize;
        let dst_px = &mut dst[start..start + src.width as usize];
        for (d, s) in dst_px.iter_mut().zip(src_px.chunks_exact(4)) {
            *d = over(*d, premultiply([s[0], s[1], s[2], s[3]]));
        }
    }
    Ok(())
}

/// Flatten a premultiplied canvas into straight-alpha RGBA8 bytes.
pub fn to_straight_rgba8(buf: &[PremulRgba]) -> Vec<u8> {
    buf.iter().flat_map(|&px| unpremultiply(px)).collect()
}

#[cfg(test)]
#[path = "../../tests/unit/render/blend.rs"]
mod tests;
