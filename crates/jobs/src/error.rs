use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    #[error("Job id already in flight: {0}")]
    DuplicateJobId(String),

    #[error("Engine is shut down")]
    Shutdown,
}

pub type Result<T> = std::result::Result<T, JobError>;
