//! Mask-driven compositing: shape-mask rasterization, alpha blending, and
//! background matting via an opaque segmentation model.

pub mod error;
pub mod mask;
pub mod blend;
pub mod matting;

pub use error::{ComposeError, Result};
pub use mask::{shape_mask, MaskShape};
pub use blend::{alpha_composite, blend_region, composite_over_color, cutout};
pub use matting::Segmenter;
