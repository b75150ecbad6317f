//! Model artifact persistence
//!
//! This module provides:
//! - A single named artifact, overwritten on every retrain
//! - Atomic writes via temp file and rename
//! - Checksum and width validation on load

use super::regression::{FitMetrics, LinearWaitModel};
use crate::error::{QueueError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// How a model came to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSource {
    Bootstrap,
    Retrained,
}

/// Descriptive data stored alongside the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub version: String,
    pub source: ModelSource,
    pub trained_at: i64,
    pub samples: usize,
    pub metrics: FitMetrics,
}

/// On-disk layout of the artifact
#[derive(Debug, Serialize, Deserialize)]
struct ModelArtifact {
    metadata: ModelMetadata,
    checksum: String,
    model: LinearWaitModel,
}

/// Reads and writes the model artifact at a fixed path
#[derive(Debug, Clone)]
pub struct ModelStore {
    path: PathBuf,
}

impl ModelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist `model`, replacing any previous artifact
    pub fn save(&self, model: &LinearWaitModel, metadata: &ModelMetadata) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let artifact = ModelArtifact {
            metadata: metadata.clone(),
            checksum: compute_checksum(&serde_json::to_vec(model)?),
            model: model.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&artifact)?;

        let temp_path = self.path.with_extension("tmp");
        let mut file = File::create(&temp_path).map_err(|e| {
            QueueError::Storage(format!("Failed to create temp model file {:?}: {}", temp_path, e))
        })?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        fs::rename(&temp_path, &self.path).map_err(|e| {
            QueueError::Storage(format!(
                "Failed to rename {:?} to {:?}: {}",
                temp_path, self.path, e
            ))
        })?;

        info!(
            version = %metadata.version,
            path = %self.path.display(),
            checksum = %artifact.checksum,
            "Model artifact saved"
        );
        Ok(())
    }

    /// Load the artifact. `Ok(None)` when no artifact exists.
    pub fn load(&self) -> Result<Option<(LinearWaitModel, ModelMetadata)>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&self.path).map_err(|e| {
            QueueError::Storage(format!("Failed to read model file {:?}: {}", self.path, e))
        })?;
        let artifact: ModelArtifact = serde_json::from_slice(&bytes)
            .map_err(|e| QueueError::Model(format!("Corrupt model artifact: {}", e)))?;

        let computed = compute_checksum(&serde_json::to_vec(&artifact.model)?);
        if computed != artifact.checksum {
            return Err(QueueError::Model(format!(
                "Checksum mismatch: expected {}, got {}",
                artifact.checksum, computed
            )));
        }
        artifact.model.validate()?;

        Ok(Some((artifact.model, artifact.metadata)))
    }
}

/// Compute SHA256 checksum of data
fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
