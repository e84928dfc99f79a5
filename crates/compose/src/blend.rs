use image::{GrayImage, Rgb, RgbImage, Rgba, RgbaImage};

use crate::error::{ComposeError, Result};

fn check_dims(
    context: &'static str,
    expected: (u32, u32),
    actual: (u32, u32),
) -> Result<()> {
    if expected != actual {
        return Err(ComposeError::DimensionMismatch {
            context,
            width: expected.0,
            height: expected.1,
            actual_width: actual.0,
            actual_height: actual.1,
        });
    }
    Ok(())
}

/// Per-pixel linear blend of two images under a coverage matte.
///
/// Matte value 255 selects the foreground, 0 the background, intermediate
/// values interpolate. All three inputs must share dimensions.
pub fn alpha_composite(
    foreground: &RgbImage,
    background: &RgbImage,
    matte: &GrayImage,
) -> Result<RgbImage> {
    check_dims("background", foreground.dimensions(), background.dimensions())?;
    check_dims("matte", foreground.dimensions(), matte.dimensions())?;

    let (width, height) = foreground.dimensions();
    let mut out = RgbImage::new(width, height);
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let fg = foreground.get_pixel(x, y);
        let bg = background.get_pixel(x, y);
        let alpha = matte.get_pixel(x, y)[0] as f32 / 255.0;
        for c in 0..3 {
            let blended = fg[c] as f32 * alpha + bg[c] as f32 * (1.0 - alpha);
            pixel[c] = blended.round().clamp(0.0, 255.0) as u8;
        }
    }
    Ok(out)
}

/// Blend a solid fill into a sub-region of `image`, weighted by a coverage
/// mask and a global opacity.
///
/// The mask's dimensions define the region; pixels the region places outside
/// the image are skipped rather than wrapped.
pub fn blend_region(
    image: &mut RgbImage,
    region_x: u32,
    region_y: u32,
    mask: &GrayImage,
    fill: Rgb<u8>,
    opacity: f32,
) {
    let opacity = opacity.clamp(0.0, 1.0);
    let (width, height) = image.dimensions();
    for (mx, my, coverage) in mask.enumerate_pixels() {
        let x = region_x + mx;
        let y = region_y + my;
        if x >= width || y >= height {
            continue;
        }
        let alpha = coverage[0] as f32 / 255.0 * opacity;
        if alpha == 0.0 {
            continue;
        }
        let pixel = image.get_pixel_mut(x, y);
        for c in 0..3 {
            let blended = fill[c] as f32 * alpha + pixel[c] as f32 * (1.0 - alpha);
            pixel[c] = blended.round().clamp(0.0, 255.0) as u8;
        }
    }
}

/// Lift the foreground onto a transparent canvas, taking the matte as the
/// alpha channel
pub fn cutout(foreground: &RgbImage, matte: &GrayImage) -> Result<RgbaImage> {
    check_dims("matte", foreground.dimensions(), matte.dimensions())?;

    let (width, height) = foreground.dimensions();
    let mut out = RgbaImage::new(width, height);
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let fg = foreground.get_pixel(x, y);
        let alpha = matte.get_pixel(x, y)[0];
        *pixel = Rgba([fg[0], fg[1], fg[2], alpha]);
    }
    Ok(out)
}

/// Composite the foreground over a uniform backdrop color
pub fn composite_over_color(
    foreground: &RgbImage,
    matte: &GrayImage,
    color: [u8; 3],
) -> Result<RgbImage> {
    let (width, height) = foreground.dimensions();
    let backdrop = RgbImage::from_pixel(width, height, Rgb(color));
    alpha_composite(foreground, &backdrop, matte)
}
