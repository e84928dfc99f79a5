use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use transforms::ImageOperation;

#[derive(Error, Debug)]
pub enum ImageKitError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// One named step in a processing plan
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct PlannedStep {
    pub name: String,
    pub description: Option<String>,
    pub operation: Option<ImageOperation>,
}

/// Declarative processing plan: one input image, steps applied in order,
/// each step's result feeding the next
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ImagePlan {
    pub path: String,
    pub output_dir: String,
    pub steps: Vec<PlannedStep>,
}

impl ImagePlan {
    /// Load a plan from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ImageKitError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load a plan from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ImageKitError> {
        let plan: ImagePlan = toml::from_str(content)?;
        Ok(plan)
    }

    /// Load a plan from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ImageKitError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load a plan from a JSON string
    pub fn from_json(content: &str) -> Result<Self, ImageKitError> {
        let plan: ImagePlan = serde_json::from_str(content)?;
        Ok(plan)
    }

    /// Auto-detect file format and load the plan
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ImageKitError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(ImageKitError::UnsupportedFileFormat),
        }
    }

    /// Save the plan to a TOML file
    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ImageKitError> {
        let content = self.to_toml()?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Convert the plan to a TOML string
    pub fn to_toml(&self) -> Result<String, ImageKitError> {
        let toml = toml::to_string_pretty(&self)?;
        Ok(toml)
    }

    /// Save the plan to a JSON file
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ImageKitError> {
        let content = self.to_json()?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Convert the plan to a JSON string
    pub fn to_json(&self) -> Result<String, ImageKitError> {
        Ok(serde_json::to_string_pretty(&self)?)
    }
}
