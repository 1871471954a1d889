// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Prediction response types

use serde::{Deserialize, Serialize};

use crate::vision::DetectionResult;

const STATUS_SUCCESS: &str = "success";

/// Response from POST /predict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub filename: String,
    pub results: DetectionResult,
    pub status: String,
}

impl PredictResponse {
    pub fn success(filename: impl Into<String>, results: DetectionResult) -> Self {
        Self {
            filename: filename.into(),
            results,
            status: STATUS_SUCCESS.to_string(),
        }
    }
}

/// Response from POST /predict_base64
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Base64PredictResponse {
    pub results: DetectionResult,
    pub status: String,
}

impl Base64PredictResponse {
    pub fn success(results: DetectionResult) -> Self {
        Self {
            results,
            status: STATUS_SUCCESS.to_string(),
        }
    }
}

/// Outcome for one file of a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum BatchItemResult {
    #[serde(rename = "success")]
    Success {
        filename: String,
        results: DetectionResult,
    },
    #[serde(rename = "failed")]
    Failure { filename: String, error: String },
}

impl BatchItemResult {
    pub fn filename(&self) -> &str {
        match self {
            BatchItemResult::Success { filename, .. } | BatchItemResult::Failure { filename, .. } => {
                filename
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BatchItemResult::Success { .. })
    }
}

/// Response from POST /predict_batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResponse {
    pub batch_results: Vec<BatchItemResult>,
    pub total_files: usize,
    pub successful: usize,
    pub failed: usize,
}

impl BatchResponse {
    /// Build a response, deriving the counts from the items
    pub fn from_items(batch_results: Vec<BatchItemResult>) -> Self {
        let successful = batch_results.iter().filter(|r| r.is_success()).count();
        let total_files = batch_results.len();
        Self {
            failed: total_files - successful,
            successful,
            total_files,
            batch_results,
        }
    }
}
