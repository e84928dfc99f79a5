//! Face-region detection: box geometry, greedy non-maximum suppression,
//! and post-processing of a raw detector's confidence/box tensors into a
//! clean set of pixel-space detections.

pub mod error;
pub mod geometry;
pub mod detector;

pub use error::{DetectError, Result};
pub use geometry::{ScoredBox, iou, non_max_suppression};
pub use detector::{Detection, FaceDetector};
