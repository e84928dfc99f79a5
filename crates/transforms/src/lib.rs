//! Image transform operations and the session that runs them as jobs.
//!
//! An [`operation::ImageOperation`] names one transform with its parameters.
//! [`session::Session`] holds the working image, submits operations to a
//! [`jobs::JobEngine`], and persists each result through a
//! [`store::TempStore`].

pub mod bodies;
pub mod error;
pub mod models;
pub mod operation;
pub mod session;
pub mod store;

pub use bodies::{apply_operation, TransformOutput};
pub use error::{Result, TransformError};
pub use models::ModelSet;
pub use operation::{ImageOperation, OutputFormat};
pub use session::Session;
pub use store::{ResultHandle, TempStore};
