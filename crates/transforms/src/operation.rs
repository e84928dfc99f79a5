use compose::MaskShape;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

use crate::error::{Result, TransformError};

/// Container format for persisted results
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    JsonSchema,
    Display,
    EnumString,
    EnumIter,
    VariantNames,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
    Bmp,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Webp => "webp",
            OutputFormat::Bmp => "bmp",
        }
    }

    pub fn image_format(&self) -> image::ImageFormat {
        match self {
            OutputFormat::Png => image::ImageFormat::Png,
            OutputFormat::Jpeg => image::ImageFormat::Jpeg,
            OutputFormat::Webp => image::ImageFormat::WebP,
            OutputFormat::Bmp => image::ImageFormat::Bmp,
        }
    }
}

fn default_opacity() -> f32 {
    0.5
}

fn default_mask_color() -> [u8; 3] {
    // Matches the interactive default highlight color
    [59, 130, 246]
}

#[derive(
    Debug, Clone,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq
)]
#[serde(tag = "type", content = "params", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ImageOperation {
    /// Resample the image to an exact size
    Resize { width: u32, height: u32 },

    /// Keep only a rectangular region
    Crop {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },

    /// Re-encode as JPEG at the given quality
    Compress {
        #[schemars(range(min = 1, max = 100))]
        quality: u8,
    },

    /// Re-encode in another container format
    Convert { format: OutputFormat },

    /// Neural super-resolution at a fixed integer ratio
    Upscale {
        #[schemars(range(min = 2, max = 4))]
        scale: u32,
    },

    /// Detect faces and blend a colored mask over each
    BlurFaces {
        #[serde(default = "default_opacity")]
        #[schemars(range(min = 0.0, max = 1.0))]
        opacity: f32,
        #[serde(default = "default_mask_color")]
        mask_color: [u8; 3],
        #[serde(default)]
        mask_shape: MaskShape,
    },

    /// Matte out the subject; transparent or solid-color backdrop
    RemoveBackground { background: Option<[u8; 3]> },
}

impl ImageOperation {
    /// Stable snake_case name, used for result file names and logs
    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// Check parameters before the job is enqueued
    pub fn validate(&self) -> Result<()> {
        match self {
            ImageOperation::Resize { width, height } => {
                if *width == 0 || *height == 0 {
                    return Err(TransformError::InvalidParameters(format!(
                        "resize target {width}x{height} has a zero dimension"
                    )));
                }
            }
            ImageOperation::Crop { width, height, .. } => {
                if *width == 0 || *height == 0 {
                    return Err(TransformError::InvalidParameters(format!(
                        "crop region {width}x{height} has a zero dimension"
                    )));
                }
            }
            ImageOperation::Compress { quality } => {
                if !(1..=100).contains(quality) {
                    return Err(TransformError::InvalidParameters(format!(
                        "JPEG quality {quality} outside 1..=100"
                    )));
                }
            }
            ImageOperation::Upscale { scale } => {
                if !(2..=4).contains(scale) {
                    return Err(TransformError::InvalidParameters(format!(
                        "upscale ratio {scale} outside 2..=4"
                    )));
                }
            }
            ImageOperation::BlurFaces { opacity, .. } => {
                if !(0.0..=1.0).contains(opacity) {
                    return Err(TransformError::InvalidParameters(format!(
                        "mask opacity {opacity} outside 0..=1"
                    )));
                }
            }
            ImageOperation::Convert { .. } | ImageOperation::RemoveBackground { .. } => {}
        }
        Ok(())
    }

    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ImageOperation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_json_round_trip() {
        let op = ImageOperation::Resize {
            width: 800,
            height: 600,
        };
        let json = serde_json::to_string(&op).expect("Should serialize");
        assert!(json.contains(r#""type":"resize""#));
        assert!(json.contains(r#""params""#));
        let back: ImageOperation = serde_json::from_str(&json).expect("Should deserialize");
        assert_eq!(back, op);
    }

    #[test]
    fn test_blur_faces_defaults_fill_in() {
        let json = r#"{"type": "blur_faces", "params": {}}"#;
        let op: ImageOperation = serde_json::from_str(json).expect("Should deserialize");
        match op {
            ImageOperation::BlurFaces {
                opacity,
                mask_color,
                mask_shape,
            } => {
                assert_eq!(opacity, 0.5);
                assert_eq!(mask_color, [59, 130, 246]);
                assert_eq!(mask_shape, MaskShape::Rectangle);
            }
            other => panic!("unexpected operation: {other:?}"),
        }
    }

    #[test]
    fn test_validation_rejects_bad_parameters() {
        assert!(ImageOperation::Resize { width: 0, height: 10 }.validate().is_err());
        assert!(ImageOperation::Compress { quality: 0 }.validate().is_err());
        assert!(ImageOperation::Upscale { scale: 5 }.validate().is_err());
        assert!(ImageOperation::BlurFaces {
            opacity: 1.5,
            mask_color: [0, 0, 0],
            mask_shape: MaskShape::Circle,
        }
        .validate()
        .is_err());
        assert!(ImageOperation::Upscale { scale: 2 }.validate().is_ok());
    }

    #[test]
    fn test_operation_names_are_snake_case() {
        assert_eq!(
            ImageOperation::RemoveBackground { background: None }.name(),
            "remove_background"
        );
        assert_eq!(
            ImageOperation::Upscale { scale: 2 }.name(),
            "upscale"
        );
    }

    #[test]
    fn test_schema_lists_all_operations() {
        let schema = serde_json::to_string(&ImageOperation::schema()).expect("Should serialize");
        for name in ["resize", "crop", "compress", "convert", "upscale", "blur_faces", "remove_background"] {
            assert!(schema.contains(name), "schema missing {name}");
        }
    }
}
