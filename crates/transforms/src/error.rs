use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("No image loaded")]
    NoImageLoaded,

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Detection failed: {0}")]
    Detect(#[from] detect::DetectError),

    #[error("Upscaling failed: {0}")]
    Upscale(#[from] upscale::UpscaleError),

    #[error("Compositing failed: {0}")]
    Compose(#[from] compose::ComposeError),

    #[error("Job error: {0}")]
    Job(#[from] jobs::JobError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Storage failure: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransformError>;
