use std::fs;
use std::path::Path;
use std::sync::Arc;

use image::DynamicImage;
use image_kit_common::ImageInfo;
use jobs::{EventSink, JobEngine, DEFAULT_WORKERS};
use tracing::info;

use crate::bodies::apply_operation;
use crate::error::{Result, TransformError};
use crate::models::ModelSet;
use crate::operation::ImageOperation;
use crate::store::{ResultHandle, TempStore};

/// An editing session: one working image plus the job engine that runs
/// transforms against snapshots of it.
///
/// Submission snapshots the current image behind an `Arc`, so loading a new
/// image while jobs are in flight never changes what those jobs compute.
pub struct Session {
    engine: JobEngine<ResultHandle>,
    store: Arc<TempStore>,
    models: ModelSet,
    current: Option<Arc<DynamicImage>>,
}

impl Session {
    pub fn new(sink: Arc<dyn EventSink<ResultHandle>>, models: ModelSet) -> Result<Self> {
        Ok(Self::with_store(sink, models, TempStore::new()?))
    }

    pub fn with_store(
        sink: Arc<dyn EventSink<ResultHandle>>,
        models: ModelSet,
        store: TempStore,
    ) -> Self {
        Self {
            engine: JobEngine::new(DEFAULT_WORKERS, sink),
            store: Arc::new(store),
            models,
            current: None,
        }
    }

    /// Load the working image from disk
    pub fn load_image(&mut self, path: impl AsRef<Path>) -> Result<ImageInfo> {
        let path = path.as_ref();
        let encoded_size = fs::metadata(path)?.len();
        let image = image::open(path)?;
        info!(path = %path.display(), width = image.width(), height = image.height(), "image loaded");
        let info = ImageInfo::new(image.width(), image.height(), encoded_size);
        self.current = Some(Arc::new(image));
        Ok(info)
    }

    /// Replace the working image with an in-memory one
    pub fn set_image(&mut self, image: DynamicImage) {
        self.current = Some(Arc::new(image));
    }

    pub fn has_image(&self) -> bool {
        self.current.is_some()
    }

    /// Queue one operation against a snapshot of the working image.
    ///
    /// Fails up front, before anything is enqueued, when no image is loaded,
    /// when the parameters are invalid, or when the id is already in flight.
    pub fn submit(&self, job_id: impl Into<String>, operation: ImageOperation) -> Result<()> {
        operation.validate()?;
        let image = self
            .current
            .clone()
            .ok_or(TransformError::NoImageLoaded)?;

        let name = operation.name();
        let models = self.models.clone();
        let store = Arc::clone(&self.store);
        self.engine.submit(job_id, move |progress| {
            let mut report = |ratio: f32| progress.report(ratio);
            let output = apply_operation(&operation, &image, &models, &mut report)
                .map_err(|err| err.to_string())?;
            store.save(name, &output).map_err(|err| err.to_string())
        })?;
        Ok(())
    }

    /// Best-effort cancellation; returns whether the id was tracked
    pub fn cancel(&self, job_id: &str) -> bool {
        self.engine.cancel(job_id)
    }

    pub fn is_tracked(&self, job_id: &str) -> bool {
        self.engine.is_tracked(job_id)
    }

    /// Make a finished result the new working image
    pub fn adopt_result(&mut self, handle: &ResultHandle) -> Result<ImageInfo> {
        self.load_image(handle.path.clone())
    }

    /// Copy a finished result out of the scratch directory
    pub fn save_result(&self, handle: &ResultHandle, destination: impl AsRef<Path>) -> Result<()> {
        let destination = destination.as_ref();
        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| {
                    TransformError::Storage(format!("creating {}: {err}", parent.display()))
                })?;
            }
        }
        fs::copy(&handle.path, destination).map_err(|err| {
            TransformError::Storage(format!(
                "copying {} to {}: {err}",
                handle.path.display(),
                destination.display()
            ))
        })?;
        info!(path = %destination.display(), "result saved");
        Ok(())
    }
}
