// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Request orchestration for the prediction endpoints
//!
//! Validation order is fixed: content type, model presence, decode, infer.
//! Batches check their size and model presence up front, then process each
//! file in order with failures recorded per file.

use std::time::Instant;
use tracing::{debug, info, warn};

use super::request::Upload;
use super::response::{Base64PredictResponse, BatchItemResult, BatchResponse, PredictResponse};
use crate::api::errors::ApiError;
use crate::config::{ServerConfig, DEFAULT_CONF_THRESHOLD, DEFAULT_MAX_BATCH_SIZE};
use crate::vision::{
    decode_base64_image_with_limit, decode_image_bytes_with_limit, CanonicalImage,
    DetectionResult, InferenceEngine, MAX_IMAGE_SIZE,
};

/// Message recorded for batch files skipped after the deadline passed
pub const DEADLINE_EXCEEDED: &str = "Batch deadline exceeded before this file was processed";

/// Limits applied by the orchestrator
#[derive(Debug, Clone, Copy)]
pub struct ServiceSettings {
    pub default_threshold: f32,
    pub max_batch_size: usize,
    pub max_image_bytes: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            default_threshold: DEFAULT_CONF_THRESHOLD,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            max_image_bytes: MAX_IMAGE_SIZE,
        }
    }
}

impl From<&ServerConfig> for ServiceSettings {
    fn from(config: &ServerConfig) -> Self {
        Self {
            default_threshold: config.default_conf_threshold,
            max_batch_size: config.max_batch_size,
            max_image_bytes: config.max_image_bytes,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DetectionService {
    engine: InferenceEngine,
    settings: ServiceSettings,
}

impl DetectionService {
    pub fn new(engine: InferenceEngine, settings: ServiceSettings) -> Self {
        Self { engine, settings }
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    /// Pick the effective confidence threshold
    ///
    /// A body value wins over the query value. Absent means the configured
    /// default; finite values are clamped into `[0, 1]`.
    pub fn resolve_threshold(
        &self,
        query: Option<f32>,
        body: Option<f32>,
    ) -> Result<f32, ApiError> {
        match body.or(query) {
            None => Ok(self.settings.default_threshold),
            Some(value) if !value.is_finite() => Err(ApiError::InvalidThreshold(format!(
                "{} is not a finite number",
                value
            ))),
            Some(value) => Ok(value.clamp(0.0, 1.0)),
        }
    }

    /// POST /predict
    pub async fn predict_single(
        &self,
        upload: Upload,
        threshold: f32,
    ) -> Result<PredictResponse, ApiError> {
        if !upload.is_image() {
            return Err(content_type_error(&upload));
        }
        self.require_model()?;

        let results = self.detect_bytes(&upload, threshold).await?;
        info!(
            "✅ Prediction complete for {}: {} detections",
            upload.filename, results.num_detections
        );
        Ok(PredictResponse::success(upload.filename, results))
    }

    /// POST /predict_batch
    ///
    /// Files left unprocessed when `deadline` passes are reported as failures.
    pub async fn predict_batch(
        &self,
        uploads: Vec<Upload>,
        threshold: f32,
        deadline: Option<Instant>,
    ) -> Result<BatchResponse, ApiError> {
        if uploads.len() > self.settings.max_batch_size {
            return Err(ApiError::BatchTooLarge {
                count: uploads.len(),
                max: self.settings.max_batch_size,
            });
        }
        if uploads.is_empty() {
            return Err(ApiError::InvalidRequest("No files provided".to_string()));
        }
        self.require_model()?;

        let mut items = Vec::with_capacity(uploads.len());
        for upload in uploads {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                warn!("⚠️ Skipping {}: batch deadline exceeded", upload.filename);
                items.push(BatchItemResult::Failure {
                    filename: upload.filename,
                    error: DEADLINE_EXCEEDED.to_string(),
                });
                continue;
            }

            let outcome = if upload.is_image() {
                self.detect_bytes(&upload, threshold).await
            } else {
                Err(content_type_error(&upload))
            };

            items.push(match outcome {
                Ok(results) => BatchItemResult::Success {
                    filename: upload.filename,
                    results,
                },
                Err(e) => {
                    warn!("⚠️ Error processing {}: {}", upload.filename, e);
                    BatchItemResult::Failure {
                        filename: upload.filename,
                        error: e.to_string(),
                    }
                }
            });
        }

        let response = BatchResponse::from_items(items);
        info!(
            "✅ Batch complete: {} files, {} successful, {} failed",
            response.total_files, response.successful, response.failed
        );
        Ok(response)
    }

    /// POST /predict_base64
    pub async fn predict_base64(
        &self,
        image: Option<&str>,
        threshold: f32,
    ) -> Result<Base64PredictResponse, ApiError> {
        let payload = image
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ApiError::MissingImageData)?;
        self.require_model()?;

        let (image, info) = decode_base64_image_with_limit(payload, self.settings.max_image_bytes)
            .map_err(|e| {
                warn!("Failed to decode base64 image: {}", e);
                ApiError::from(e)
            })?;
        debug!(
            "Decoded base64 image: {}x{}, {} bytes",
            info.width, info.height, info.size_bytes
        );

        let results = self.infer(image, threshold).await?;
        info!(
            "✅ Base64 prediction complete: {} detections",
            results.num_detections
        );
        Ok(Base64PredictResponse::success(results))
    }

    fn require_model(&self) -> Result<(), ApiError> {
        if self.engine.is_ready() {
            Ok(())
        } else {
            warn!("Prediction requested but no model is loaded");
            Err(ApiError::ModelNotLoaded)
        }
    }

    async fn detect_bytes(
        &self,
        upload: &Upload,
        threshold: f32,
    ) -> Result<DetectionResult, ApiError> {
        let (image, info) = decode_image_bytes_with_limit(&upload.data, self.settings.max_image_bytes)
            .map_err(|e| {
                warn!("Failed to decode {}: {}", upload.filename, e);
                ApiError::from(e)
            })?;
        debug!(
            "Decoded {}: {}x{} {:?}, {} bytes",
            upload.filename,
            info.width,
            info.height,
            info.format,
            info.size_bytes
        );

        self.infer(image, threshold).await
    }

    async fn infer(
        &self,
        image: CanonicalImage,
        threshold: f32,
    ) -> Result<DetectionResult, ApiError> {
        self.engine.infer(image, threshold).await.map_err(|e| {
            warn!("Inference failed: {}", e);
            ApiError::from(e)
        })
    }
}

fn content_type_error(upload: &Upload) -> ApiError {
    ApiError::InvalidContentType(
        upload
            .content_type
            .clone()
            .unwrap_or_else(|| "none".to_string()),
    )
}
