use std::sync::Arc;

use crate::foundation::core::{RasterRgba8, Rect, Size, Vec2, rgba8_len};
use crate::foundation::error::{PhotoslotError, PhotoslotResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
/// Integer pixel rectangle inside an image.
pub struct PixelRect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelRect {
    /// Floating-point rectangle covering the same pixels.
    pub fn to_rect(self) -> Rect {
        Rect::new(
            f64::from(self.x),
            f64::from(self.y),
            f64::from(self.x) + f64::from(self.width),
            f64::from(self.y) + f64::from(self.height),
        )
    }
}

#[derive(Clone, Debug)]
/// Decoded source photograph in straight-alpha RGBA8.
///
/// The buffer may be fully opaque (a plain capture) or alpha-matted by an
/// external background-removal step. Pixels are shared behind an `Arc` so a
/// photo can be reused across slots and requests without copying.
pub struct SourcePhoto {
    width: u32,
    height: u32,
    rgba8: Arc<Vec<u8>>,
}

impl SourcePhoto {
    /// Wrap a row-major RGBA8 buffer, rejecting empty or mis-sized buffers.
    pub fn from_rgba8(width: u32, height: u32, rgba8: Vec<u8>) -> PhotoslotResult<Self> {
        let expected = rgba8_len(width, height)?;
        if rgba8.len() != expected {
            return Err(PhotoslotError::input(format!(
                "photo buffer is {} bytes, header says {width}x{height} ({expected} bytes)",
                rgba8.len()
            )));
        }
        Ok(Self {
            width,
            height,
            rgba8: Arc::new(rgba8),
        })
    }

    /// Adopt an owned raster.
    pub fn from_raster(raster: RasterRgba8) -> PhotoslotResult<Self> {
        Self::from_rgba8(raster.width, raster.height, raster.data)
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Dimensions in floating point.
    pub fn size(&self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }

    /// Raw straight-alpha RGBA8 bytes.
    pub fn rgba8(&self) -> &[u8] {
        &self.rgba8
    }

    /// `true` when at least one pixel is not fully opaque.
    pub fn has_alpha(&self) -> bool {
        self.rgba8.chunks_exact(4).any(|px| px[3] != 255)
    }

    /// Bounding box of pixels with non-zero alpha, or `None` when fully transparent.
    pub fn alpha_bbox(&self) -> Option<PixelRect> {
        let w = self.width as usize;
        let mut min_x = u32::MAX;
        let mut min_y = u32::MAX;
        let mut max_x = 0u32;
        let mut max_y = 0u32;
        let mut any = false;

        for (idx, px) in self.rgba8.chunks_exact(4).enumerate() {
            if px[3] == 0 {
                continue;
            }
            let x = (idx % w) as u32;
            let y = (idx / w) as u32;
            any = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        any.then(|| PixelRect {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        })
    }

    /// Subject bounds: the alpha bounding box, or the full frame when there is none.
    pub fn content_bounds(&self) -> PixelRect {
        self.alpha_bbox().unwrap_or(PixelRect {
            x: 0,
            y: 0,
            width: self.width,
            height: self.height,
        })
    }

    /// Crop to the non-transparent bounding box.
    ///
    /// Returns the cropped photo and the offset of the crop in the original,
    /// so detections made on the original can be shifted into the crop. A fully
    /// transparent photo becomes a single transparent pixel.
    pub fn crop_to_alpha_bbox(&self) -> (SourcePhoto, Vec2) {
        let Some(bbox) = self.alpha_bbox() else {
            let empty = SourcePhoto {
                width: 1,
                height: 1,
                rgba8: Arc::new(vec![0, 0, 0, 0]),
            };
            return (empty, Vec2::ZERO);
        };
        if bbox.width == self.width && bbox.height == self.height {
            return (self.clone(), Vec2::ZERO);
        }

        let row_bytes = bbox.width as usize * 4;
        let mut out = Vec::with_capacity(row_bytes * bbox.height as usize);
        for y in bbox.y..bbox.y + bbox.height {
            let start = ((y as usize) * (self.width as usize) + bbox.x as usize) * 4;
            out.extend_from_slice(&self.rgba8[start..start + row_bytes]);
        }
        let cropped = SourcePhoto {
            width: bbox.width,
            height: bbox.height,
            rgba8: Arc::new(out),
        };
        (
            cropped,
            Vec2::new(f64::from(bbox.x), f64::from(bbox.y)),
        )
    }

    /// Horizontally mirrored copy.
    pub fn mirrored(&self) -> SourcePhoto {
        let row_bytes = self.width as usize * 4;
        let mut out = Vec::with_capacity(self.rgba8.len());
        for row in self.rgba8.chunks_exact(row_bytes) {
            for px in row.chunks_exact(4).rev() {
                out.extend_from_slice(px);
            }
        }
        SourcePhoto {
            width: self.width,
            height: self.height,
            rgba8: Arc::new(out),
        }
    }

    pub(crate) fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        [
            self.rgba8[idx],
            self.rgba8[idx + 1],
            self.rgba8[idx + 2],
            self.rgba8[idx + 3],
        ]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/photo.rs"]
mod tests;
