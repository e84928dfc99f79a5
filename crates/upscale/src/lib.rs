//! Tile-based super-resolution.
//!
//! The super-resolution model has a bounded practical input size, so large
//! images are split into fixed-size tiles, padded at the right/bottom edge,
//! inferred tile by tile, and reassembled at the scaled size with the
//! padding cropped away.

pub mod error;
pub mod tiles;
pub mod upscaler;

pub use error::{Result, UpscaleError};
pub use tiles::{Tile, TileGrid, TILE_SIZE};
pub use upscaler::Upscaler;
