use std::sync::Arc;

use inference::{Inference, UnconfiguredModel};

/// The pretrained models a session can draw on.
///
/// Each slot is an opaque [`Inference`] backend. Slots left unconfigured
/// make the operations that need them fail with a descriptive error while
/// the rest of the session keeps working.
#[derive(Clone)]
pub struct ModelSet {
    pub face: Arc<dyn Inference>,
    pub matting: Arc<dyn Inference>,
    pub super_resolution: Arc<dyn Inference>,
}

impl ModelSet {
    pub fn unconfigured() -> Self {
        Self {
            face: Arc::new(UnconfiguredModel("face-detection")),
            matting: Arc::new(UnconfiguredModel("background-matting")),
            super_resolution: Arc::new(UnconfiguredModel("super-resolution")),
        }
    }

    pub fn with_face(mut self, model: Arc<dyn Inference>) -> Self {
        self.face = model;
        self
    }

    pub fn with_matting(mut self, model: Arc<dyn Inference>) -> Self {
        self.matting = model;
        self
    }

    pub fn with_super_resolution(mut self, model: Arc<dyn Inference>) -> Self {
        self.super_resolution = model;
        self
    }
}

impl Default for ModelSet {
    fn default() -> Self {
        Self::unconfigured()
    }
}
