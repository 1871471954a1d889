// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection model loading with an ordered fallback chain
//!
//! The active model lives in a [`ModelHandle`]. Only the [`ModelLoader`]
//! writes to it, always by building a complete model first and then swapping
//! the handle's `Arc`. Readers clone the `Arc` and drop the lock, so an
//! in-flight inference keeps the model it started with across a reload.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::{info, warn};

use crate::vision::detector::{DetectionModel, ModelFactory};

/// Default candidate artifacts, most specific first
pub const DEFAULT_MODEL_CANDIDATES: [&str; 3] = ["best.onnx", "yolo11n.onnx", "yolov8n.onnx"];

/// Built-in artifact attempted when every candidate is absent or broken
pub const DEFAULT_FALLBACK_MODEL: &str = "yolov8n.onnx";

#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("No detection model could be loaded (tried {attempted:?}): {last_error}")]
    Exhausted {
        attempted: Vec<PathBuf>,
        last_error: String,
    },

    #[error("Model loading task failed: {0}")]
    TaskFailed(String),

    #[error("Model handle lock poisoned")]
    HandlePoisoned,
}

/// Configuration for the model fallback chain
#[derive(Debug, Clone)]
pub struct ModelLoaderConfig {
    /// Candidate artifacts tried in order; absent files are skipped
    pub candidates: Vec<PathBuf>,
    /// Final artifact tried unconditionally after all candidates
    pub fallback: PathBuf,
}

impl Default for ModelLoaderConfig {
    fn default() -> Self {
        Self {
            candidates: DEFAULT_MODEL_CANDIDATES.iter().map(PathBuf::from).collect(),
            fallback: PathBuf::from(DEFAULT_FALLBACK_MODEL),
        }
    }
}

/// A fully instantiated model and the artifact it came from
pub struct LoadedModel {
    pub model: Arc<dyn DetectionModel>,
    pub source: PathBuf,
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Shared slot for the active detection model
///
/// Empty until a load succeeds.
#[derive(Debug, Clone, Default)]
pub struct ModelHandle {
    inner: Arc<RwLock<Option<Arc<LoadedModel>>>>,
}

impl ModelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle that already holds a model (tests and embedding)
    pub fn with_model(model: Arc<dyn DetectionModel>, source: impl Into<PathBuf>) -> Self {
        let handle = Self::new();
        // A fresh lock cannot be poisoned
        let _ = handle.publish(LoadedModel {
            model,
            source: source.into(),
        });
        handle
    }

    /// The active model, if any
    ///
    /// A poisoned lock reads as "no model".
    pub fn current(&self) -> Option<Arc<LoadedModel>> {
        self.inner.read().ok().and_then(|slot| slot.clone())
    }

    /// Whether a model is loaded, or an error if the handle is unreadable
    pub fn try_is_loaded(&self) -> Result<bool, ModelLoadError> {
        self.inner
            .read()
            .map(|slot| slot.is_some())
            .map_err(|_| ModelLoadError::HandlePoisoned)
    }

    /// Replace the active model
    pub fn publish(&self, loaded: LoadedModel) -> Result<Arc<LoadedModel>, ModelLoadError> {
        let loaded = Arc::new(loaded);
        let mut slot = self
            .inner
            .write()
            .map_err(|_| ModelLoadError::HandlePoisoned)?;
        *slot = Some(loaded.clone());
        Ok(loaded)
    }

    /// Drop the active model
    pub fn clear(&self) -> Result<(), ModelLoadError> {
        let mut slot = self
            .inner
            .write()
            .map_err(|_| ModelLoadError::HandlePoisoned)?;
        *slot = None;
        Ok(())
    }
    #[cfg(test)]
    pub(crate) fn poison(&self) {
        let inner = self.inner.clone();
        let _ = std::thread::spawn(move || {
            let _guard = inner.write().unwrap();
            panic!("poisoning model handle");
        })
        .join();
    }
}

/// Resolves which artifact to activate
#[derive(Clone)]
pub struct ModelLoader {
    factory: Arc<dyn ModelFactory>,
    config: ModelLoaderConfig,
}

impl ModelLoader {
    pub fn new(factory: Arc<dyn ModelFactory>, config: ModelLoaderConfig) -> Self {
        Self { factory, config }
    }

    pub fn config(&self) -> &ModelLoaderConfig {
        &self.config
    }

    /// Walk the fallback chain and return the first model that loads
    ///
    /// Blocking; call from a blocking context or use [`Self::load_and_publish`].
    pub fn load(&self) -> Result<LoadedModel, ModelLoadError> {
        let mut attempted = Vec::new();

        for path in &self.config.candidates {
            if !path.is_file() {
                info!("Model candidate {} not present, skipping", path.display());
                continue;
            }

            attempted.push(path.clone());
            match self.try_load(path) {
                Ok(loaded) => return Ok(loaded),
                Err(e) => warn!("⚠️ Failed to load model from {}: {:#}", path.display(), e),
            }
        }

        warn!(
            "No candidate model loaded, falling back to {}",
            self.config.fallback.display()
        );
        attempted.push(self.config.fallback.clone());
        self.try_load(&self.config.fallback)
            .map_err(|e| ModelLoadError::Exhausted {
                attempted,
                last_error: format!("{:#}", e),
            })
    }

    fn try_load(&self, path: &Path) -> anyhow::Result<LoadedModel> {
        let model = self.factory.load(path)?;
        info!("✅ Detection model loaded from {}", path.display());
        Ok(LoadedModel {
            model,
            source: path.to_path_buf(),
        })
    }

    /// Load on the blocking pool, then publish into `handle`
    ///
    /// On failure the handle keeps whatever model it already had.
    pub async fn load_and_publish(
        &self,
        handle: &ModelHandle,
    ) -> Result<Arc<LoadedModel>, ModelLoadError> {
        let loader = self.clone();
        let loaded = tokio::task::spawn_blocking(move || loader.load())
            .await
            .map_err(|e| ModelLoadError::TaskFailed(e.to_string()))??;
        handle.publish(loaded)
    }
}
