// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection inference over the active model
//!
//! Turns a [`CanonicalImage`] into a [`DetectionResult`] using whatever model
//! the [`ModelHandle`] holds when the call starts.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use super::classes::ClassRegistry;
use super::detector::RawDetection;
use super::image_utils::CanonicalImage;
use super::model_manager::ModelHandle;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model not loaded")]
    ModelNotLoaded,

    #[error("Inference failed: {0}")]
    Failed(String),
}

/// Box corners in original image pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub class_id: u32,
    pub class_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageShape {
    pub width: u32,
    pub height: u32,
}

/// Detections for one image, in model emission order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub detections: Vec<Detection>,
    pub num_detections: usize,
    pub image_shape: ImageShape,
}

/// Runs detection against the shared model handle
#[derive(Debug, Clone)]
pub struct InferenceEngine {
    handle: ModelHandle,
    registry: Arc<ClassRegistry>,
}

impl InferenceEngine {
    pub fn new(handle: ModelHandle, registry: ClassRegistry) -> Self {
        Self {
            handle,
            registry: Arc::new(registry),
        }
    }

    pub fn handle(&self) -> &ModelHandle {
        &self.handle
    }

    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    pub fn is_ready(&self) -> bool {
        self.handle.current().is_some()
    }

    /// Detect objects in `image`, keeping boxes scored at or above `threshold`
    pub async fn infer(
        &self,
        image: CanonicalImage,
        threshold: f32,
    ) -> Result<DetectionResult, InferenceError> {
        let loaded = self.handle.current().ok_or(InferenceError::ModelNotLoaded)?;

        let image_shape = ImageShape {
            width: image.width(),
            height: image.height(),
        };

        let raw = tokio::task::spawn_blocking(move || {
            loaded.model.detect(image.as_rgb(), threshold)
        })
        .await
        .map_err(|e| InferenceError::Failed(format!("detection task aborted: {}", e)))?
        .map_err(|e| InferenceError::Failed(format!("{:#}", e)))?;

        let detections = normalize_detections(raw, &self.registry);
        debug!(
            "Inference complete: {} detections on {}x{} image",
            detections.len(),
            image_shape.width,
            image_shape.height
        );

        Ok(DetectionResult {
            num_detections: detections.len(),
            detections,
            image_shape,
        })
    }
}

/// Convert raw model boxes into labeled detections
///
/// Boxes with non-finite values are dropped.
pub fn normalize_detections(raw: Vec<RawDetection>, registry: &ClassRegistry) -> Vec<Detection> {
    raw.into_iter()
        .filter_map(|det| {
            let finite = det.bbox.iter().all(|v| v.is_finite()) && det.confidence.is_finite();
            if !finite {
                warn!("⚠️ Dropping detection with non-finite values: {:?}", det);
                return None;
            }

            let [ax, ay, bx, by] = det.bbox;
            Some(Detection {
                bbox: BoundingBox {
                    x1: ax.min(bx),
                    y1: ay.min(by),
                    x2: ax.max(bx),
                    y2: ay.max(by),
                },
                confidence: det.confidence,
                class_id: det.class_id,
                class_name: registry.resolve(det.class_id),
            })
        })
        .collect()
}
