use image::RgbImage;
use inference::{Inference, Tensor};

use crate::error::{DetectError, Result};
use crate::geometry::{ScoredBox, non_max_suppression};

/// A detection in pixel coordinates of the source image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
    pub confidence: f32,
    pub class_id: usize,
}

impl Detection {
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }
}

/// Face detector over an opaque detection model.
///
/// The model takes a normalized 320x240 NCHW tensor and returns two
/// tensors: per-prior class scores `[1, N, C]` (class 0 is background) and
/// normalized corner boxes `[1, N, 4]`.
pub struct FaceDetector<M: Inference> {
    model: M,
    input_width: u32,
    input_height: u32,
    score_threshold: f32,
    iou_threshold: f32,
}

const INPUT_WIDTH: u32 = 320;
const INPUT_HEIGHT: u32 = 240;
const SCORE_THRESHOLD: f32 = 0.7;
const IOU_THRESHOLD: f32 = 0.3;
const PIXEL_MEAN: f32 = 127.0;
const PIXEL_SCALE: f32 = 128.0;

impl<M: Inference> FaceDetector<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            input_width: INPUT_WIDTH,
            input_height: INPUT_HEIGHT,
            score_threshold: SCORE_THRESHOLD,
            iou_threshold: IOU_THRESHOLD,
        }
    }

    pub fn with_score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = threshold;
        self
    }

    pub fn with_iou_threshold(mut self, threshold: f32) -> Self {
        self.iou_threshold = threshold;
        self
    }

    /// Detect faces in an image, returning pixel-space boxes.
    ///
    /// Output order is class-index order, NMS emission order
    /// (descending confidence) within a class.
    pub fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>> {
        if image.width() == 0 || image.height() == 0 {
            return Err(DetectError::EmptyImage);
        }

        let input = self.preprocess(image);
        let outputs = self.model.run(&input)?;
        if outputs.len() < 2 {
            return Err(DetectError::MalformedOutput(format!(
                "expected scores and boxes tensors, got {} outputs",
                outputs.len()
            )));
        }

        self.postprocess(&outputs[0], &outputs[1], image.width(), image.height())
    }

    /// Resize to the model input size and normalize to (x - 127) / 128, NCHW
    fn preprocess(&self, image: &RgbImage) -> Tensor {
        let resized = image::imageops::resize(
            image,
            self.input_width,
            self.input_height,
            image::imageops::FilterType::Triangle,
        );

        let (w, h) = (self.input_width as usize, self.input_height as usize);
        let mut data = vec![0.0f32; 3 * h * w];
        for (x, y, pixel) in resized.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for c in 0..3 {
                data[c * h * w + y * w + x] = (pixel[c] as f32 - PIXEL_MEAN) / PIXEL_SCALE;
            }
        }

        // Shape is validated by construction
        Tensor::new(vec![1, 3, h, w], data).unwrap_or_else(|_| Tensor::zeros(vec![1, 3, h, w]))
    }

    /// Filter by score, suppress per class, and scale survivors to pixels
    fn postprocess(
        &self,
        scores: &Tensor,
        boxes: &Tensor,
        image_width: u32,
        image_height: u32,
    ) -> Result<Vec<Detection>> {
        let num_priors = scores.dim(1);
        let num_classes = scores.dim(2);
        if scores.shape().len() != 3 || boxes.shape().len() != 3 || boxes.dim(2) != 4 {
            return Err(DetectError::MalformedOutput(format!(
                "scores shape {:?}, boxes shape {:?}",
                scores.shape(),
                boxes.shape()
            )));
        }
        if boxes.dim(1) != num_priors {
            return Err(DetectError::MalformedOutput(format!(
                "{} score rows but {} box rows",
                num_priors,
                boxes.dim(1)
            )));
        }

        let score_data = scores.data();
        let box_data = boxes.data();
        let mut detections = Vec::new();

        // Class 0 is the implicit background class
        for class_id in 1..num_classes {
            let candidates: Vec<ScoredBox> = (0..num_priors)
                .filter_map(|prior| {
                    let score = score_data[prior * num_classes + class_id];
                    if score <= self.score_threshold {
                        return None;
                    }
                    let b = &box_data[prior * 4..prior * 4 + 4];
                    Some(ScoredBox::new(b[0], b[1], b[2], b[3], score))
                })
                .collect();

            if candidates.is_empty() {
                continue;
            }

            for survivor in non_max_suppression(candidates, self.iou_threshold, None) {
                if let Some(detection) =
                    to_pixel_detection(&survivor, class_id, image_width, image_height)
                {
                    detections.push(detection);
                }
            }
        }

        Ok(detections)
    }
}

/// Scale a normalized box to pixel coordinates, clamped to the image.
/// Boxes that collapse to zero width or height are dropped.
fn to_pixel_detection(
    b: &ScoredBox,
    class_id: usize,
    image_width: u32,
    image_height: u32,
) -> Option<Detection> {
    let w = image_width as f32;
    let h = image_height as f32;
    let x1 = (b.x1 * w).clamp(0.0, w) as u32;
    let y1 = (b.y1 * h).clamp(0.0, h) as u32;
    let x2 = (b.x2 * w).clamp(0.0, w) as u32;
    let y2 = (b.y2 * h).clamp(0.0, h) as u32;

    if x2 <= x1 || y2 <= y1 {
        return None;
    }

    Some(Detection {
        x1,
        y1,
        x2,
        y2,
        confidence: b.score,
        class_id,
    })
}
