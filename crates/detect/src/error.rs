use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectError {
    #[error("Inference error: {0}")]
    Inference(#[from] inference::InferenceError),

    #[error("Detector output malformed: {0}")]
    MalformedOutput(String),

    #[error("Input image is empty")]
    EmptyImage,
}

pub type Result<T> = std::result::Result<T, DetectError>;
