use image::imageops::FilterType;
use image::{GrayImage, RgbImage};
use inference::{Inference, Tensor};
use tracing::debug;

use crate::error::{ComposeError, Result};

/// Model-facing input edge length
pub const MATTING_SIZE: u32 = 1024;

/// Driver for a salient-object matting model.
///
/// The model maps a `[1, 3, 1024, 1024]` tensor (components normalized to
/// `[-0.5, 0.5]`) to a single-channel saliency map of the same spatial size.
pub struct Segmenter<M: Inference> {
    model: M,
}

impl<M: Inference> Segmenter<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    /// Estimate a full-resolution alpha matte for the image's subject.
    ///
    /// The raw saliency map is min-max normalized before quantization so the
    /// matte always spans the full `[0, 255]` range.
    pub fn matte(&self, image: &RgbImage) -> Result<GrayImage> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(ComposeError::EmptyImage);
        }

        let input = self.preprocess(image);
        let outputs = self.model.run(&input)?;
        let saliency = outputs
            .into_iter()
            .next()
            .ok_or(inference::InferenceError::NoOutput)?;

        let small = self.postprocess(&saliency)?;
        debug!(width, height, "resizing matte to source resolution");
        Ok(image::imageops::resize(
            &small,
            width,
            height,
            FilterType::Triangle,
        ))
    }

    /// Resize to the model edge and normalize components to `[-0.5, 0.5]`
    fn preprocess(&self, image: &RgbImage) -> Tensor {
        let resized = image::imageops::resize(
            image,
            MATTING_SIZE,
            MATTING_SIZE,
            FilterType::Triangle,
        );
        let edge = MATTING_SIZE as usize;
        let mut data = vec![0.0f32; 3 * edge * edge];
        for (x, y, pixel) in resized.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for c in 0..3 {
                data[c * edge * edge + y * edge + x] = pixel[c] as f32 / 255.0 - 0.5;
            }
        }
        Tensor::new(vec![1, 3, edge, edge], data)
            .unwrap_or_else(|_| Tensor::zeros(vec![1, 3, edge, edge]))
    }

    /// Min-max normalize the saliency map and quantize it to a gray matte
    fn postprocess(&self, saliency: &Tensor) -> Result<GrayImage> {
        let shape = saliency.shape();
        let (height, width) = match shape {
            [1, 1, h, w] => (*h, *w),
            [1, h, w] => (*h, *w),
            other => {
                return Err(ComposeError::MalformedMatte(format!(
                    "expected a single-channel map, got shape {other:?}"
                )));
            }
        };

        let data = saliency.data();
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for &value in data {
            min = min.min(value);
            max = max.max(value);
        }
        let range = if max > min { max - min } else { 1.0 };

        let mut matte = GrayImage::new(width as u32, height as u32);
        for (x, y, pixel) in matte.enumerate_pixels_mut() {
            let value = data[y as usize * width + x as usize];
            let normalized = (value - min) / range;
            pixel[0] = (normalized * 255.0).round().clamp(0.0, 255.0) as u8;
        }
        Ok(matte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Stub model: saliency is the horizontal position, so the left edge is
    /// background and the right edge is subject
    struct HorizontalRampModel;

    impl Inference for HorizontalRampModel {
        fn run(&self, input: &Tensor) -> inference::Result<Vec<Tensor>> {
            let edge = input.dim(2);
            let mut out = vec![0.0f32; edge * edge];
            for y in 0..edge {
                for x in 0..edge {
                    out[y * edge + x] = x as f32;
                }
            }
            Ok(vec![Tensor::new(vec![1, 1, edge, edge], out)?])
        }
    }

    /// Stub model: a constant map exercises the degenerate min==max path
    struct ConstantModel;

    impl Inference for ConstantModel {
        fn run(&self, input: &Tensor) -> inference::Result<Vec<Tensor>> {
            let edge = input.dim(2);
            Ok(vec![Tensor::new(
                vec![1, 1, edge, edge],
                vec![0.7; edge * edge],
            )?])
        }
    }

    struct BadShapeModel;

    impl Inference for BadShapeModel {
        fn run(&self, _input: &Tensor) -> inference::Result<Vec<Tensor>> {
            Ok(vec![Tensor::zeros(vec![1, 3, 8, 8])])
        }
    }

    #[test]
    fn test_matte_matches_source_resolution() {
        let segmenter = Segmenter::new(HorizontalRampModel);
        let image = RgbImage::from_pixel(50, 30, image::Rgb([100, 100, 100]));
        let matte = segmenter.matte(&image).expect("Should matte");
        assert_eq!(matte.dimensions(), (50, 30));
    }

    #[test]
    fn test_matte_spans_full_range_after_normalization() {
        let segmenter = Segmenter::new(HorizontalRampModel);
        // Model-native size: the matte is not resampled, so min-max
        // normalization must hit both extremes exactly
        let image = RgbImage::from_pixel(
            MATTING_SIZE,
            MATTING_SIZE,
            image::Rgb([100, 100, 100]),
        );
        let matte = segmenter.matte(&image).expect("Should matte");
        assert_eq!(matte.get_pixel(0, 0)[0], 0);
        assert_eq!(matte.get_pixel(MATTING_SIZE - 1, 0)[0], 255);
    }

    #[test]
    fn test_resampled_matte_keeps_near_full_range() {
        let segmenter = Segmenter::new(HorizontalRampModel);
        let image = RgbImage::from_pixel(64, 64, image::Rgb([100, 100, 100]));
        let matte = segmenter.matte(&image).expect("Should matte");
        let values: Vec<u8> = matte.pixels().map(|p| p[0]).collect();
        let min = values.iter().copied().min().expect("Should be non-empty");
        let max = values.iter().copied().max().expect("Should be non-empty");
        // Downscaling interpolates, so allow a few levels of softening
        assert!(min <= 5, "left edge should normalize to ~0, got {min}");
        assert!(max >= 250, "right edge should normalize to ~255, got {max}");
    }

    #[test]
    fn test_constant_saliency_does_not_divide_by_zero() {
        let segmenter = Segmenter::new(ConstantModel);
        let image = RgbImage::from_pixel(16, 16, image::Rgb([0, 0, 0]));
        let matte = segmenter.matte(&image).expect("Should matte");
        // min==max collapses to zero coverage rather than NaN
        assert!(matte.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_malformed_output_rejected() {
        let segmenter = Segmenter::new(BadShapeModel);
        let image = RgbImage::from_pixel(16, 16, image::Rgb([0, 0, 0]));
        let err = segmenter.matte(&image).expect_err("Should reject");
        assert!(matches!(err, ComposeError::MalformedMatte(_)));
    }

    #[test]
    fn test_empty_image_rejected() {
        let segmenter = Segmenter::new(ConstantModel);
        let image = RgbImage::new(0, 0);
        assert!(matches!(
            segmenter.matte(&image),
            Err(ComposeError::EmptyImage)
        ));
    }
}
