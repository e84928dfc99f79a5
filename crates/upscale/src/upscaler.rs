use image::RgbImage;
use inference::{Inference, Tensor};
use tracing::debug;

use crate::error::{Result, UpscaleError};
use crate::tiles::{TileGrid, TILE_SIZE};

/// Tiled driver for a fixed-ratio super-resolution model.
///
/// The model maps a `[1, 3, T, T]` tensor (components normalized to
/// `[0,1]`) to `[1, 3, T*scale, T*scale]`.
pub struct Upscaler<M: Inference> {
    model: M,
    scale: u32,
    tile_size: u32,
}

impl<M: Inference> Upscaler<M> {
    pub fn new(model: M, scale: u32) -> Result<Self> {
        if !(2..=4).contains(&scale) {
            return Err(UpscaleError::UnsupportedScale(scale));
        }
        Ok(Self {
            model,
            scale,
            tile_size: TILE_SIZE,
        })
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Upscale an image to exactly `width*scale x height*scale`
    pub fn upscale(&self, image: &RgbImage) -> Result<RgbImage> {
        self.upscale_with_progress(image, |_| {})
    }

    /// Upscale, invoking `progress` with a ratio in `[0,1]` after each tile
    pub fn upscale_with_progress(
        &self,
        image: &RgbImage,
        mut progress: impl FnMut(f32),
    ) -> Result<RgbImage> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(UpscaleError::EmptyImage);
        }

        let grid = TileGrid::new(width, height, self.tile_size);
        debug!(
            width,
            height,
            padded_width = grid.padded_width(),
            padded_height = grid.padded_height(),
            tiles = grid.tile_count(),
            scale = self.scale,
            "upscaling in tiles"
        );

        // Zero-filled padded canvas with the source in the top-left corner
        let mut padded = RgbImage::new(grid.padded_width(), grid.padded_height());
        image::imageops::replace(&mut padded, image, 0, 0);

        let scaled_tile = self.tile_size * self.scale;
        let mut output = RgbImage::new(
            grid.padded_width() * self.scale,
            grid.padded_height() * self.scale,
        );

        let total = grid.tile_count() as f32;
        for (index, tile) in grid.tiles().enumerate() {
            let input = self.tile_to_tensor(&padded, tile.x, tile.y);
            let outputs = self.model.run(&input)?;
            let inferred = outputs.into_iter().next().ok_or(inference::InferenceError::NoOutput)?;

            let expected = vec![1, 3, scaled_tile as usize, scaled_tile as usize];
            if inferred.shape() != expected.as_slice() {
                return Err(UpscaleError::TileShape {
                    expected,
                    actual: inferred.shape().to_vec(),
                });
            }

            self.write_tile(&mut output, &inferred, tile.x * self.scale, tile.y * self.scale);
            progress((index + 1) as f32 / total);
        }

        // Discard the padding contribution
        let result =
            image::imageops::crop_imm(&output, 0, 0, width * self.scale, height * self.scale)
                .to_image();
        Ok(result)
    }

    /// Extract a tile as a `[1, 3, T, T]` tensor with components in `[0,1]`
    fn tile_to_tensor(&self, padded: &RgbImage, ox: u32, oy: u32) -> Tensor {
        let t = self.tile_size as usize;
        let mut data = vec![0.0f32; 3 * t * t];
        for dy in 0..self.tile_size {
            for dx in 0..self.tile_size {
                let pixel = padded.get_pixel(ox + dx, oy + dy);
                let (x, y) = (dx as usize, dy as usize);
                for c in 0..3 {
                    data[c * t * t + y * t + x] = pixel[c] as f32 / 255.0;
                }
            }
        }
        Tensor::new(vec![1, 3, t, t], data).unwrap_or_else(|_| Tensor::zeros(vec![1, 3, t, t]))
    }

    /// Write a scaled `[1, 3, S, S]` tensor tile into the output buffer
    fn write_tile(&self, output: &mut RgbImage, tile: &Tensor, ox: u32, oy: u32) {
        let s = tile.dim(2);
        let data = tile.data();
        for y in 0..s {
            for x in 0..s {
                let mut pixel = [0u8; 3];
                for c in 0..3 {
                    let value = data[c * s * s + y * s + x];
                    pixel[c] = (value * 255.0).clamp(0.0, 255.0) as u8;
                }
                output.put_pixel(ox + x as u32, oy + y as u32, image::Rgb(pixel));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    /// Stub model: nearest-neighbor replication of each input pixel,
    /// preserving the fixed-ratio tile contract
    struct NearestNeighborModel {
        scale: usize,
    }

    impl Inference for NearestNeighborModel {
        fn run(&self, input: &Tensor) -> inference::Result<Vec<Tensor>> {
            let t = input.dim(2);
            let s = t * self.scale;
            let src = input.data();
            let mut out = vec![0.0f32; 3 * s * s];
            for c in 0..3 {
                for y in 0..s {
                    for x in 0..s {
                        out[c * s * s + y * s + x] =
                            src[c * t * t + (y / self.scale) * t + (x / self.scale)];
                    }
                }
            }
            Ok(vec![Tensor::new(vec![1, 3, s, s], out)?])
        }
    }

    /// Stub model that violates the fixed-ratio contract
    struct WrongShapeModel;

    impl Inference for WrongShapeModel {
        fn run(&self, _input: &Tensor) -> inference::Result<Vec<Tensor>> {
            Ok(vec![Tensor::zeros(vec![1, 3, 10, 10])])
        }
    }

    fn gradient_image(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        })
    }

    #[test]
    fn test_output_dimensions_exact() {
        let upscaler = Upscaler::new(NearestNeighborModel { scale: 2 }, 2)
            .unwrap()
            .with_tile_size(16);
        // Deliberately not a multiple of the tile size
        let result = upscaler.upscale(&gradient_image(30, 17)).expect("should upscale");
        assert_eq!(result.dimensions(), (60, 34));
    }

    #[test]
    fn test_exact_multiple_dimensions() {
        let upscaler = Upscaler::new(NearestNeighborModel { scale: 2 }, 2)
            .unwrap()
            .with_tile_size(16);
        let result = upscaler.upscale(&gradient_image(32, 16)).expect("should upscale");
        assert_eq!(result.dimensions(), (64, 32));
    }

    #[test]
    fn test_one_by_one_image() {
        let upscaler = Upscaler::new(NearestNeighborModel { scale: 4 }, 4)
            .unwrap()
            .with_tile_size(8);
        let mut tiny = RgbImage::new(1, 1);
        tiny.put_pixel(0, 0, Rgb([200, 100, 50]));
        let result = upscaler.upscale(&tiny).expect("should upscale");
        assert_eq!(result.dimensions(), (4, 4));
        for pixel in result.pixels() {
            // Allow for the f32 round trip
            assert!((pixel[0] as i32 - 200).abs() <= 1);
            assert!((pixel[1] as i32 - 100).abs() <= 1);
            assert!((pixel[2] as i32 - 50).abs() <= 1);
        }
    }

    #[test]
    fn test_pixels_survive_round_trip() {
        let upscaler = Upscaler::new(NearestNeighborModel { scale: 2 }, 2)
            .unwrap()
            .with_tile_size(8);
        let source = gradient_image(20, 12);
        let result = upscaler.upscale(&source).expect("should upscale");
        for (x, y, pixel) in source.enumerate_pixels() {
            let scaled = result.get_pixel(x * 2, y * 2);
            for c in 0..3 {
                assert!((scaled[c] as i32 - pixel[c] as i32).abs() <= 1);
            }
        }
    }

    #[test]
    fn test_progress_is_monotonic_and_complete() {
        let upscaler = Upscaler::new(NearestNeighborModel { scale: 2 }, 2)
            .unwrap()
            .with_tile_size(8);
        let mut reported = Vec::new();
        upscaler
            .upscale_with_progress(&gradient_image(20, 20), |p| reported.push(p))
            .expect("should upscale");
        // 20x20 over 8px tiles pads to 24x24 = 9 tiles
        assert_eq!(reported.len(), 9);
        assert!(reported.windows(2).all(|w| w[0] <= w[1]));
        assert!((reported.last().copied().unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_wrong_tile_shape_rejected() {
        let upscaler = Upscaler::new(WrongShapeModel, 2).unwrap().with_tile_size(8);
        let err = upscaler.upscale(&gradient_image(8, 8)).expect_err("should fail");
        assert!(matches!(err, UpscaleError::TileShape { .. }));
    }

    #[test]
    fn test_unsupported_scale_rejected() {
        assert!(Upscaler::new(NearestNeighborModel { scale: 1 }, 1).is_err());
        assert!(Upscaler::new(NearestNeighborModel { scale: 5 }, 5).is_err());
    }
}
