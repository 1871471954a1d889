// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Prediction request types

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Filename reported when an upload carries none
pub const UNKNOWN_FILENAME: &str = "unknown";

/// One uploaded file as read from a multipart body
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    /// Declared media type, if the part carried one
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl Upload {
    pub fn new(
        filename: impl Into<String>,
        content_type: Option<&str>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.map(str::to_string),
            data: data.into(),
        }
    }

    /// Whether the declared media type is `image/*`
    pub fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"))
            .unwrap_or(false)
    }
}

/// Query parameters shared by the prediction endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictParams {
    /// Minimum detection confidence
    #[serde(default)]
    pub conf_threshold: Option<f32>,

    /// Batch deadline in milliseconds from request start
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Body of POST /predict_base64
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Base64PredictRequest {
    /// Base64 image, optionally prefixed with a `data:image/...;base64,` header
    #[serde(default)]
    pub image: Option<String>,

    #[serde(default)]
    pub conf_threshold: Option<f32>,
}

impl Base64PredictRequest {
    /// The image payload, if present and non-blank
    pub fn image_data(&self) -> Option<&str> {
        self.image
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}
