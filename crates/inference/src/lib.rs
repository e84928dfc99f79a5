//! Opaque inference boundary for pretrained models.
//!
//! The processing crates consume face detection, background matting, and
//! super-resolution models purely as black boxes: an NCHW `f32` tensor goes
//! in, one or more tensors come out. Backends implement [`Inference`]; the
//! optional `onnx` feature provides a [`rten`]-backed implementation that
//! loads `.rten`/converted ONNX model files.

pub mod tensor;

#[cfg(feature = "onnx")]
pub mod onnx;

pub use tensor::Tensor;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Tensor shape {shape:?} does not match {expected} data elements")]
    ShapeMismatch { shape: Vec<usize>, expected: usize },

    #[error("Model produced no output tensors")]
    NoOutput,

    #[error("Model backend error: {0}")]
    Backend(String),

    #[error("No model configured for '{0}'")]
    Unconfigured(&'static str),
}

pub type Result<T> = std::result::Result<T, InferenceError>;

/// A pretrained model consumed as an opaque function over tensors.
///
/// Implementations must be deterministic and stateless across calls. Most
/// model families produce a single output tensor; the face detector
/// produces two (per-class scores and normalized boxes), hence the `Vec`.
pub trait Inference: Send + Sync {
    fn run(&self, input: &Tensor) -> Result<Vec<Tensor>>;
}

impl<M: Inference + ?Sized> Inference for std::sync::Arc<M> {
    fn run(&self, input: &Tensor) -> Result<Vec<Tensor>> {
        (**self).run(input)
    }
}

impl<M: Inference + ?Sized> Inference for &M {
    fn run(&self, input: &Tensor) -> Result<Vec<Tensor>> {
        (**self).run(input)
    }
}

/// Placeholder backend for model slots the host did not configure.
///
/// Keeps the thin transforms usable in builds without model weights;
/// any model-backed operation fails with a descriptive error instead.
#[derive(Debug, Clone, Copy)]
pub struct UnconfiguredModel(pub &'static str);

impl Inference for UnconfiguredModel {
    fn run(&self, _input: &Tensor) -> Result<Vec<Tensor>> {
        Err(InferenceError::Unconfigured(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfigured_model_errors() {
        let model = UnconfiguredModel("super-resolution");
        let input = Tensor::zeros(vec![1, 3, 4, 4]);
        let err = model.run(&input).expect_err("should not run");
        assert!(err.to_string().contains("super-resolution"));
    }
}
