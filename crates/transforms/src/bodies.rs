use compose::{blend_region, composite_over_color, cutout, shape_mask, Segmenter};
use detect::FaceDetector;
use image::{DynamicImage, Rgb};
use image_kit_common::PixelRegion;
use tracing::debug;
use upscale::Upscaler;

use crate::error::{Result, TransformError};
use crate::models::ModelSet;
use crate::operation::{ImageOperation, OutputFormat};

/// Result of one transform body, ready to be encoded by the store
#[derive(Debug)]
pub struct TransformOutput {
    pub image: DynamicImage,
    pub format: OutputFormat,
    pub jpeg_quality: Option<u8>,
}

impl TransformOutput {
    fn png(image: DynamicImage) -> Self {
        Self {
            image,
            format: OutputFormat::Png,
            jpeg_quality: None,
        }
    }
}

/// Run one operation against an in-memory image.
///
/// Pure with respect to the session: the input image is never mutated and
/// no files are touched. `progress` receives ratios in `[0, 1]`.
pub fn apply_operation(
    operation: &ImageOperation,
    image: &DynamicImage,
    models: &ModelSet,
    progress: &mut dyn FnMut(f32),
) -> Result<TransformOutput> {
    operation.validate()?;
    debug!(operation = operation.name(), "applying operation");

    match operation {
        ImageOperation::Resize { width, height } => {
            let resized = image.resize_exact(*width, *height, image::imageops::FilterType::Triangle);
            progress(1.0);
            Ok(TransformOutput::png(resized))
        }

        ImageOperation::Crop {
            x,
            y,
            width,
            height,
        } => {
            PixelRegion::new(*x, *y, *width, *height)
                .and_then(|region| region.check_within(image.width(), image.height()))
                .map_err(|err| TransformError::InvalidParameters(err.to_string()))?;
            let cropped = image.crop_imm(*x, *y, *width, *height);
            progress(1.0);
            Ok(TransformOutput::png(cropped))
        }

        ImageOperation::Compress { quality } => {
            progress(1.0);
            Ok(TransformOutput {
                image: image.clone(),
                format: OutputFormat::Jpeg,
                jpeg_quality: Some(*quality),
            })
        }

        ImageOperation::Convert { format } => {
            progress(1.0);
            Ok(TransformOutput {
                image: image.clone(),
                format: *format,
                jpeg_quality: None,
            })
        }

        ImageOperation::Upscale { scale } => {
            let upscaler = Upscaler::new(models.super_resolution.clone(), *scale)?;
            let upscaled = upscaler.upscale_with_progress(&image.to_rgb8(), |ratio| {
                progress(ratio);
            })?;
            Ok(TransformOutput::png(DynamicImage::ImageRgb8(upscaled)))
        }

        ImageOperation::BlurFaces {
            opacity,
            mask_color,
            mask_shape,
        } => {
            let mut canvas = image.to_rgb8();
            let detector = FaceDetector::new(models.face.clone());
            let detections = detector.detect(&canvas)?;
            progress(0.5);
            debug!(faces = detections.len(), "masking detected faces");

            let total = detections.len().max(1) as f32;
            for (index, face) in detections.iter().enumerate() {
                let width = face.x2.saturating_sub(face.x1);
                let height = face.y2.saturating_sub(face.y1);
                let mask = shape_mask(*mask_shape, width, height);
                blend_region(
                    &mut canvas,
                    face.x1,
                    face.y1,
                    &mask,
                    Rgb(*mask_color),
                    *opacity,
                );
                progress(0.5 + 0.5 * (index + 1) as f32 / total);
            }
            progress(1.0);
            Ok(TransformOutput::png(DynamicImage::ImageRgb8(canvas)))
        }

        ImageOperation::RemoveBackground { background } => {
            let foreground = image.to_rgb8();
            let segmenter = Segmenter::new(models.matting.clone());
            let matte = segmenter.matte(&foreground)?;
            progress(0.8);

            let result = match background {
                Some(color) => {
                    DynamicImage::ImageRgb8(composite_over_color(&foreground, &matte, *color)?)
                }
                None => DynamicImage::ImageRgba8(cutout(&foreground, &matte)?),
            };
            progress(1.0);
            Ok(TransformOutput::png(result))
        }
    }
}
