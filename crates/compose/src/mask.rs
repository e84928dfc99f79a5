use image::GrayImage;
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
use imageproc::rect::Rect;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

/// Shape used when rasterizing a fill mask over a detected region
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
pub enum MaskShape {
    #[default]
    Rectangle,
    Circle,
}

/// Rasterize a shape into a single-channel coverage mask.
///
/// Pixels inside the shape are 255, outside are 0. `Rectangle` fills the
/// whole mask; `Circle` inscribes the largest circle that fits.
pub fn shape_mask(shape: MaskShape, width: u32, height: u32) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    if width == 0 || height == 0 {
        return mask;
    }
    match shape {
        MaskShape::Rectangle => {
            draw_filled_rect_mut(
                &mut mask,
                Rect::at(0, 0).of_size(width, height),
                image::Luma([255u8]),
            );
        }
        MaskShape::Circle => {
            let cx = (width / 2) as i32;
            let cy = (height / 2) as i32;
            let radius = (width.min(height) / 2) as i32;
            draw_filled_circle_mut(&mut mask, (cx, cy), radius, image::Luma([255u8]));
        }
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_rectangle_fills_everything() {
        let mask = shape_mask(MaskShape::Rectangle, 8, 5);
        assert!(mask.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn test_circle_center_inside_corners_outside() {
        let mask = shape_mask(MaskShape::Circle, 40, 40);
        assert_eq!(mask.get_pixel(20, 20)[0], 255);
        assert_eq!(mask.get_pixel(0, 0)[0], 0);
        assert_eq!(mask.get_pixel(39, 39)[0], 0);
    }

    #[test]
    fn test_circle_inscribed_in_wide_region() {
        let mask = shape_mask(MaskShape::Circle, 60, 20);
        // Radius is bounded by the shorter axis
        assert_eq!(mask.get_pixel(30, 10)[0], 255);
        assert_eq!(mask.get_pixel(1, 10)[0], 0);
        assert_eq!(mask.get_pixel(58, 10)[0], 0);
    }

    #[test]
    fn test_empty_region_yields_empty_mask() {
        let mask = shape_mask(MaskShape::Circle, 0, 10);
        assert_eq!(mask.dimensions(), (0, 10));
    }

    #[test]
    fn test_shape_string_round_trip() {
        assert_eq!(MaskShape::from_str("circle").expect("Should parse"), MaskShape::Circle);
        assert_eq!(MaskShape::Rectangle.to_string(), "rectangle");
        assert_eq!(MaskShape::default(), MaskShape::Rectangle);
    }
}
