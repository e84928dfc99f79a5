use thiserror::Error;

#[derive(Error, Debug)]
pub enum UpscaleError {
    #[error("Inference error: {0}")]
    Inference(#[from] inference::InferenceError),

    #[error("Unsupported scale factor {0}, expected 2, 3 or 4")]
    UnsupportedScale(u32),

    #[error("Model returned tile shape {actual:?}, expected {expected:?}")]
    TileShape {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Input image is empty")]
    EmptyImage,
}

pub type Result<T> = std::result::Result<T, UpscaleError>;
