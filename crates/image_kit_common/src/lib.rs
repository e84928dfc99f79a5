//! # Image Kit Common - Shared Types and Utilities
//!
//! Foundational types shared across the image-kit crates: pixel-space
//! regions, image metadata, and formatting helpers.
//!
//! ## Example
//!
//! ```rust
//! use image_kit_common::{PixelRegion, utils::format_file_size};
//!
//! let region = PixelRegion::new(10, 20, 100, 50).unwrap();
//! assert_eq!(region.area(), 5000);
//! assert_eq!(format_file_size(1536), "1.5 KB");
//! ```

use serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use thiserror::Error;

/// Result type for common image-kit operations
pub type Result<T> = std::result::Result<T, ImageKitError>;

/// Standard error type for shared image-kit types
#[derive(Error, Debug)]
pub enum ImageKitError {
    #[error("Invalid region: width and height must be non-zero")]
    EmptyRegion,

    #[error("Region ({x}, {y}) {width}x{height} exceeds image bounds {image_width}x{image_height}")]
    RegionOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    },

    #[error("Invalid value: {message}")]
    InvalidValue { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// An axis-aligned rectangle in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PixelRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRegion {
    /// Create a new region; width and height must be non-zero
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ImageKitError::EmptyRegion);
        }
        Ok(Self { x, y, width, height })
    }

    /// Check that the region lies fully inside an image of the given size
    pub fn check_within(&self, image_width: u32, image_height: u32) -> Result<()> {
        let fits_x = self.x.checked_add(self.width).map(|end| end <= image_width);
        let fits_y = self.y.checked_add(self.height).map(|end| end <= image_height);
        if fits_x != Some(true) || fits_y != Some(true) {
            return Err(ImageKitError::RegionOutOfBounds {
                x: self.x,
                y: self.y,
                width: self.width,
                height: self.height,
                image_width,
                image_height,
            });
        }
        Ok(())
    }

    /// Area in pixels
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Check if a pixel coordinate is inside this region
    pub fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x && px < self.x + self.width && py >= self.y && py < self.y + self.height
    }
}

/// Metadata describing a loaded or produced image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ImageInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Encoded size on disk, human readable (e.g. "1.5 KB")
    pub encoded_size: String,
}

impl ImageInfo {
    pub fn new(width: u32, height: u32, encoded_bytes: u64) -> Self {
        Self {
            width,
            height,
            encoded_size: utils::format_file_size(encoded_bytes),
        }
    }
}

/// Utility functions shared across crates
pub mod utils {
    use super::*;

    /// Format an encoded byte count with KB/MB thresholds at 1024 and 1024²
    pub fn format_file_size(bytes: u64) -> String {
        const KB: f64 = 1024.0;
        const MB: f64 = 1024.0 * 1024.0;

        if (bytes as f64) < MB {
            format!("{:.1} KB", bytes as f64 / KB)
        } else {
            format!("{:.1} MB", bytes as f64 / MB)
        }
    }

    /// Check if a file extension indicates a supported image file
    pub fn is_image_file(filename: &str) -> bool {
        if let Some(ext) = std::path::Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
        {
            matches!(
                ext.to_lowercase().as_str(),
                "png" | "jpg" | "jpeg" | "webp" | "bmp" | "tiff" | "tif"
            )
        } else {
            false
        }
    }

    /// Get file extension from filename
    pub fn get_file_extension(filename: &str) -> Option<String> {
        std::path::Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
    }

    /// Ensure output directory exists
    pub fn ensure_output_dir(path: &std::path::Path) -> Result<()> {
        std::fs::create_dir_all(path)?;
        Ok(())
    }
}
