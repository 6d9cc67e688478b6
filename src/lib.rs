//! photoslot places captured photos into the cutout slots of a template.
//!
//! Each slot names an anchor target: the point where the subject's face,
//! eyes, shoulders, or bounding-box center should land. Given a photo and a
//! detection of that feature, the engine computes a uniform scale and a
//! translation that put the feature on the target at the designer's preferred
//! size. It then resamples the photo into the slot and layers the slots
//! with the template artwork into one canvas-sized raster.
//!
//! # Pipeline overview
//!
//! 1. **Resolve**: `RawDetection + SourcePhoto -> AnchorObservation` ([`resolve`])
//! 2. **Solve**: `SlotGeometry + AnchorObservation -> SlotPlacement` ([`solve`])
//! 3. **Sample**: `SourcePhoto + SlotPlacement -> slot-sized RGBA8` ([`sample`])
//! 4. **Composite**: slots + artwork -> [`CompositeResult`] ([`composite`])
//!
//! [`compose`] runs all four for a [`CompositeRequest`], and [`preview_placement`]
//! runs the first two so live previews agree with the final render.
//!
//! Design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Deterministic**: identical inputs produce byte-identical output.
//! - **No IO in the engine**: decoding is front-loaded via [`decode_photo`] and
//!   [`decode_template_art`]; templates are shared through [`TemplateCache`].
//! - **Straight alpha at the edges**: inputs and outputs are straight-alpha RGBA8;
//!   blending happens on premultiplied pixels internally.
#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![allow(missing_docs_in_private_items)]

mod anchor;
mod assets;
mod foundation;
mod pipeline;
mod placement;
mod render;
mod template;

/// Affine helpers shared by the solver and the sampler.
pub mod transform;

pub use anchor::resolver::{
    AnchorObservation, AnchorSettings, DetectionFallback, FaceLandmarks, FeatureSizeFallback,
    RawDetection, resolve, resolve_for_frame, resolve_with_fallback,
};
pub use assets::decode::{decode_photo, decode_template_art, encode_png};
pub use assets::photo::{PixelRect, SourcePhoto};
pub use foundation::core::{Affine, Canvas, Point, RasterRgba8, Rect, Size, Vec2};
pub use foundation::error::{AnchorFailure, PhotoslotError, PhotoslotResult};
pub use pipeline::{
    CompositeRequest, EngineSettings, PhotoInput, SlotAssignment, compose, compose_batch,
    place_observation, preview_placement,
};
pub use placement::sampler::{SampleOptions, sample};
pub use placement::solver::{SlotPlacement, solve};
pub use render::blend::{PremulRgba, over};
pub use render::compositor::{CompositeResult, ResolvedSlot, composite};
pub use template::cache::TemplateCache;
pub use template::model::{
    AnchorMode, AnchorTarget, CompositeMode, Slot, SlotGeometry, Template, TemplateType,
};
