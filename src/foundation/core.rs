use crate::foundation::error::{PhotoslotError, PhotoslotResult};

pub use kurbo::{Affine, Point, Rect, Size, Vec2};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
/// Output canvas dimensions in pixels.
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Build a canvas, rejecting zero-sized dimensions.
    pub fn new(width: u32, height: u32) -> PhotoslotResult<Self> {
        if width == 0 || height == 0 {
            return Err(PhotoslotError::config("canvas width/height must be > 0"));
        }
        Ok(Self { width, height })
    }

    /// Canvas bounds as a rectangle anchored at the origin.
    pub fn rect(self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }

    /// Canvas size in floating point.
    pub fn size(self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Owned raster in row-major straight-alpha RGBA8.
pub struct RasterRgba8 {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes, `width * height * 4` long.
    pub data: Vec<u8>,
}

impl RasterRgba8 {
    /// Wrap an existing buffer, checking it against the declared dimensions.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> PhotoslotResult<Self> {
        let expected = rgba8_len(width, height)?;
        if data.len() != expected {
            return Err(PhotoslotError::input(format!(
                "raster buffer is {} bytes, expected {expected} for {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A raster filled with one straight-alpha color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> PhotoslotResult<Self> {
        let len = rgba8_len(width, height)?;
        let data = rgba.repeat(len / 4);
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A fully transparent raster.
    pub fn transparent(width: u32, height: u32) -> PhotoslotResult<Self> {
        Self::filled(width, height, [0, 0, 0, 0])
    }

    /// Dimensions in floating point.
    pub fn size(&self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }

    /// Read one pixel. Panics when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = self.index_of(x, y);
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }

    pub(crate) fn index_of(&self, x: u32, y: u32) -> usize {
        ((y as usize) * (self.width as usize) + (x as usize)) * 4
    }
}

/// Byte length of a `width x height` RGBA8 buffer, rejecting zero sizes and overflow.
pub(crate) fn rgba8_len(width: u32, height: u32) -> PhotoslotResult<usize> {
    if width == 0 || height == 0 {
        return Err(PhotoslotError::input(format!(
            "raster dimensions must be > 0, got {width}x{height}"
        )));
    }
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| PhotoslotError::input("raster buffer size overflow"))
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
