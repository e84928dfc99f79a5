//! `rten`-backed model loading.
//!
//! Loads models converted to the rten format (`rten-convert model.onnx`)
//! and adapts them to the [`Inference`] trait. Only f32 NCHW single-input
//! graphs are supported, which covers the face detection, matting, and
//! super-resolution families image-kit consumes.

use std::path::Path;

use rten::Model;
use rten_tensor::prelude::*;
use rten_tensor::NdTensor;

use crate::{Inference, InferenceError, Result, Tensor};

pub struct RtenModel {
    model: Model,
}

impl RtenModel {
    pub fn load(path: &Path) -> Result<Self> {
        let model = Model::load_file(path)
            .map_err(|e| InferenceError::Backend(format!("failed to load {}: {}", path.display(), e)))?;
        Ok(Self { model })
    }
}

impl Inference for RtenModel {
    fn run(&self, input: &Tensor) -> Result<Vec<Tensor>> {
        let shape = input.shape();
        if shape.len() != 4 {
            return Err(InferenceError::Backend(format!(
                "expected a rank-4 NCHW input, got rank {}",
                shape.len()
            )));
        }
        let nd: NdTensor<f32, 4> = NdTensor::from_data(
            [shape[0], shape[1], shape[2], shape[3]],
            input.data().to_vec(),
        );

        let input_id = *self
            .model
            .input_ids()
            .first()
            .ok_or_else(|| InferenceError::Backend("model has no inputs".into()))?;
        let output_ids = self.model.output_ids().to_vec();

        let outputs = self
            .model
            .run(vec![(input_id, nd.into())], &output_ids, None)
            .map_err(|e| InferenceError::Backend(e.to_string()))?;

        if outputs.is_empty() {
            return Err(InferenceError::NoOutput);
        }

        outputs
            .into_iter()
            .map(|output| {
                let tensor: rten_tensor::Tensor<f32> = output
                    .try_into()
                    .map_err(|_| InferenceError::Backend("non-f32 model output".into()))?;
                let shape = tensor.shape().to_vec();
                Tensor::new(shape, tensor.to_vec())
            })
            .collect()
    }
}
