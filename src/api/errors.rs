// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::vision::{ImageError, InferenceError, ModelLoadError};

/// Error envelope returned by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub detail: String,
    pub error_type: String,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    InvalidImage(String),
    InvalidContentType(String),
    ModelNotLoaded,
    ModelLoadFailed(String),
    InferenceFailed(String),
    BatchTooLarge { count: usize, max: usize },
    MissingImageData,
    InvalidThreshold(String),
    InvalidRequest(String),
}

impl ApiError {
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::InvalidImage(_) => "invalid_image",
            ApiError::InvalidContentType(_) => "invalid_content_type",
            ApiError::ModelNotLoaded => "model_not_loaded",
            ApiError::ModelLoadFailed(_) => "model_load_failed",
            ApiError::InferenceFailed(_) => "inference_failed",
            ApiError::BatchTooLarge { .. } => "batch_too_large",
            ApiError::MissingImageData => "missing_image_data",
            ApiError::InvalidThreshold(_) => "invalid_threshold",
            ApiError::InvalidRequest(_) => "invalid_request",
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            detail: self.to_string(),
            error_type: self.error_type().to_string(),
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::InvalidImage(_)
            | ApiError::InvalidContentType(_)
            | ApiError::BatchTooLarge { .. }
            | ApiError::MissingImageData
            | ApiError::InvalidThreshold(_)
            | ApiError::InvalidRequest(_) => 400,
            ApiError::ModelNotLoaded
            | ApiError::ModelLoadFailed(_)
            | ApiError::InferenceFailed(_) => 500,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::InvalidImage(msg) => write!(f, "Invalid image file: {}", msg),
            ApiError::InvalidContentType(got) => {
                write!(f, "File must be an image (got content type '{}')", got)
            }
            ApiError::ModelNotLoaded => write!(f, "Model not loaded"),
            ApiError::ModelLoadFailed(msg) => write!(f, "Model loading failed: {}", msg),
            ApiError::InferenceFailed(msg) => write!(f, "Prediction failed: {}", msg),
            ApiError::BatchTooLarge { count, max } => write!(
                f,
                "Maximum {} files allowed per batch (got {})",
                max, count
            ),
            ApiError::MissingImageData => write!(f, "No image data provided"),
            ApiError::InvalidThreshold(msg) => write!(f, "Invalid confidence threshold: {}", msg),
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_response())).into_response()
    }
}

impl From<ImageError> for ApiError {
    fn from(err: ImageError) -> Self {
        ApiError::InvalidImage(err.to_string())
    }
}

impl From<InferenceError> for ApiError {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::ModelNotLoaded => ApiError::ModelNotLoaded,
            InferenceError::Failed(msg) => ApiError::InferenceFailed(msg),
        }
    }
}

impl From<ModelLoadError> for ApiError {
    fn from(err: ModelLoadError) -> Self {
        ApiError::ModelLoadFailed(err.to_string())
    }
}
