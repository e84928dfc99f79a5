use std::collections::VecDeque;
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use image::codecs::jpeg::JpegEncoder;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::bodies::TransformOutput;
use crate::error::{Result, TransformError};
use crate::operation::OutputFormat;

/// Default retention before the oldest results are evicted
pub const DEFAULT_MAX_ENTRIES: usize = 32;

const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Pointer to one persisted transform result
#[derive(Debug, Clone, PartialEq)]
pub struct ResultHandle {
    pub path: PathBuf,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    pub encoded_size: u64,
}

impl ResultHandle {
    pub fn human_size(&self) -> String {
        image_kit_common::utils::format_file_size(self.encoded_size)
    }
}

/// Scratch directory of encoded results with bounded retention.
///
/// Files are named `{operation}_{uuid}.{ext}` so concurrent jobs never
/// collide. Once the store holds more than `max_entries` files, the oldest
/// are deleted best-effort.
pub struct TempStore {
    dir: PathBuf,
    max_entries: usize,
    entries: Mutex<VecDeque<PathBuf>>,
}

impl TempStore {
    pub fn new() -> Result<Self> {
        Self::with_dir(std::env::temp_dir().join("image-kit"))
    }

    pub fn with_dir(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|err| TransformError::Storage(format!("creating {}: {err}", dir.display())))?;
        Ok(Self {
            dir,
            max_entries: DEFAULT_MAX_ENTRIES,
            entries: Mutex::new(VecDeque::new()),
        })
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Encode and persist one transform result
    pub fn save(&self, operation_name: &str, output: &TransformOutput) -> Result<ResultHandle> {
        let filename = format!(
            "{operation_name}_{}.{}",
            Uuid::new_v4(),
            output.format.extension()
        );
        let path = self.dir.join(filename);

        match output.format {
            OutputFormat::Jpeg => {
                let file = fs::File::create(&path).map_err(|err| {
                    TransformError::Storage(format!("creating {}: {err}", path.display()))
                })?;
                let quality = output.jpeg_quality.unwrap_or(DEFAULT_JPEG_QUALITY);
                let encoder = JpegEncoder::new_with_quality(BufWriter::new(file), quality);
                // JPEG carries no alpha channel
                output
                    .image
                    .to_rgb8()
                    .write_with_encoder(encoder)
                    .map_err(|err| {
                        TransformError::Storage(format!("encoding {}: {err}", path.display()))
                    })?;
            }
            _ => {
                output
                    .image
                    .save_with_format(&path, output.format.image_format())
                    .map_err(|err| {
                        TransformError::Storage(format!("encoding {}: {err}", path.display()))
                    })?;
            }
        }

        let encoded_size = fs::metadata(&path)
            .map_err(|err| TransformError::Storage(format!("stat {}: {err}", path.display())))?
            .len();
        debug!(path = %path.display(), encoded_size, "result persisted");

        self.retain(path.clone());
        Ok(ResultHandle {
            path,
            format: output.format,
            width: output.image.width(),
            height: output.image.height(),
            encoded_size,
        })
    }

    fn retain(&self, path: PathBuf) {
        let evicted: Vec<PathBuf> = {
            let mut entries = match self.entries.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            entries.push_back(path);
            let excess = entries.len().saturating_sub(self.max_entries);
            entries.drain(..excess).collect()
        };
        for old in evicted {
            if let Err(err) = fs::remove_file(&old) {
                warn!(path = %old.display(), %err, "could not evict old result");
            }
        }
    }
}
