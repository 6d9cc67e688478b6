use std::io::Cursor;

use anyhow::Context;

use crate::{
    PhotoslotResult,
    assets::photo::SourcePhoto,
    foundation::core::{Canvas, RasterRgba8},
};

/// Decode encoded photo bytes (PNG, JPEG, ...) into straight-alpha RGBA8.
pub fn decode_photo(bytes: &[u8]) -> PhotoslotResult<SourcePhoto> {
    let raster = decode_rgba8(bytes).context("decode photo")?;
    SourcePhoto::from_raster(raster)
}

/// Decode template artwork and fit it to the canvas.
///
/// Artwork whose size differs from the canvas is resized with Lanczos3 to
/// exactly `canvas.width x canvas.height`.
pub fn decode_template_art(bytes: &[u8], canvas: Canvas) -> PhotoslotResult<RasterRgba8> {
    let dyn_img = image::load_from_memory(bytes).context("decode template artwork")?;
    let mut rgba = dyn_img.to_rgba8();
    if rgba.dimensions() != (canvas.width, canvas.height) {
        tracing::debug!(
            from_w = rgba.width(),
            from_h = rgba.height(),
            to_w = canvas.width,
            to_h = canvas.height,
            "resizing template artwork to canvas"
        );
        rgba = image::imageops::resize(
            &rgba,
            canvas.width,
            canvas.height,
            image::imageops::FilterType::Lanczos3,
        );
    }
    let (width, height) = rgba.dimensions();
    RasterRgba8::new(width, height, rgba.into_raw())
}

/// Encode a raster as PNG bytes.
pub fn encode_png(raster: &RasterRgba8) -> PhotoslotResult<Vec<u8>> {
    let img = image::RgbaImage::from_raw(raster.width, raster.height, raster.data.clone())
        .context("raster buffer does not match its dimensions")?;
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .context("encode png")?;
    Ok(buf)
}

fn decode_rgba8(bytes: &[u8]) -> anyhow::Result<RasterRgba8> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    RasterRgba8::new(width, height, rgba.into_raw()).map_err(anyhow::Error::new)
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
