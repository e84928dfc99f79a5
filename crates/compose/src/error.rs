use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("Inference error: {0}")]
    Inference(#[from] inference::InferenceError),

    #[error("Dimension mismatch: {context} is {actual_width}x{actual_height}, expected {width}x{height}")]
    DimensionMismatch {
        context: &'static str,
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("Matting output malformed: {0}")]
    MalformedMatte(String),

    #[error("Input image is empty")]
    EmptyImage,
}

pub type Result<T> = std::result::Result<T, ComposeError>;
