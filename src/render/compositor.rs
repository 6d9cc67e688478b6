use std::collections::HashSet;

use crate::{
    foundation::core::{RasterRgba8, rgba8_len},
    foundation::error::{PhotoslotError, PhotoslotResult},
    foundation::math::Fnv1a64,
    placement::solver::SlotPlacement,
    render::blend::{PremulRgba, blit_over, premultiply, to_straight_rgba8},
    template::model::{CompositeMode, Template},
};

#[derive(Clone, Debug)]
/// A sampled photo ready to be layered into its slot.
pub struct ResolvedSlot {
    /// Index into `Template::slots`.
    pub slot_index: usize,
    /// Placement used to produce `pixels`.
    pub placement: SlotPlacement,
    /// Slot-sized straight-alpha pixels.
    pub pixels: RasterRgba8,
}

#[derive(Clone, Debug, PartialEq)]
/// Final canvas-sized composite.
pub struct CompositeResult {
    /// Canvas width.
    pub width: u32,
    /// Canvas height.
    pub height: u32,
    /// Straight-alpha RGBA8 output.
    pub raster: RasterRgba8,
    /// Placements of the painted slots, in paint order.
    pub placements: Vec<SlotPlacement>,
}

impl CompositeResult {
    /// FNV-1a hash of the output dimensions and pixels.
    pub fn fingerprint(&self) -> u64 {
        let mut h = Fnv1a64::new_default();
        h.write_u32(self.width);
        h.write_u32(self.height);
        h.write_bytes(&self.raster.data);
        h.finish()
    }
}

/// Layer resolved slots and template artwork onto a `base_rgba` canvas.
///
/// `background` paints the artwork first and the slots over it; `overlay`
/// paints the slots first and the artwork over everything. Slots are painted
/// in ascending `zIndex`, ties broken by declaration order.
pub fn composite(
    template: &Template,
    art: Option<&RasterRgba8>,
    slots: &[ResolvedSlot],
    base_rgba: [u8; 4],
) -> PhotoslotResult<CompositeResult> {
    let canvas = template.canvas();
    if let Some(art) = art
        && (art.width, art.height) != (canvas.width, canvas.height)
    {
        return Err(PhotoslotError::input(format!(
            "template artwork is {}x{}, canvas is {}x{}",
            art.width, art.height, canvas.width, canvas.height
        )));
    }

    let ordered = paint_ordered(template, slots)?;

    let len = rgba8_len(canvas.width, canvas.height)?;
    let mut buf = vec![premultiply(base_rgba); len / 4];

    let paint_slots = |buf: &mut [PremulRgba]| -> PhotoslotResult<()> {
        for slot in &ordered {
            let s = &template.slots[slot.slot_index];
            blit_over(buf, canvas.width, &slot.pixels, s.x, s.y)?;
        }
        Ok(())
    };

    match template.composite_mode {
        CompositeMode::Background => {
            if let Some(art) = art {
                blit_over(&mut buf, canvas.width, art, 0, 0)?;
            }
            paint_slots(&mut buf)?;
        }
        CompositeMode::Overlay => {
            paint_slots(&mut buf)?;
            if let Some(art) = art {
                blit_over(&mut buf, canvas.width, art, 0, 0)?;
            }
        }
    }

    Ok(CompositeResult {
        width: canvas.width,
        height: canvas.height,
        raster: RasterRgba8::new(canvas.width, canvas.height, to_straight_rgba8(&buf))?,
        placements: ordered.iter().map(|s| s.placement.clone()).collect(),
    })
}

fn paint_ordered<'a>(
    template: &Template,
    slots: &'a [ResolvedSlot],
) -> PhotoslotResult<Vec<&'a ResolvedSlot>> {
    let mut seen = HashSet::new();
    for slot in slots {
        let Some(s) = template.slots.get(slot.slot_index) else {
            return Err(PhotoslotError::config(format!(
                "template '{}' has no slot at index {}",
                template.template_id, slot.slot_index
            )));
        };
        if !seen.insert(slot.slot_index) {
            return Err(PhotoslotError::config(format!(
                "slot '{}' is filled more than once",
                s.slot_id
            )));
        }
        if (slot.pixels.width, slot.pixels.height) != (s.width, s.height) {
            return Err(PhotoslotError::input(format!(
                "slot '{}' pixels are {}x{}, slot is {}x{}",
                s.slot_id, slot.pixels.width, slot.pixels.height, s.width, s.height
            )));
        }
    }

    let mut ordered: Vec<&ResolvedSlot> = slots.iter().collect();
    ordered.sort_by_key(|s| (template.slots[s.slot_index].z_index, s.slot_index));
    Ok(ordered)
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
