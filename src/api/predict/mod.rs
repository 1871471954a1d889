// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Prediction API endpoint module
//!
//! Provides POST /predict, /predict_batch and /predict_base64.

pub mod handler;
pub mod request;
pub mod response;
pub mod service;

pub use handler::{predict_base64_handler, predict_batch_handler, predict_handler};
pub use request::{Base64PredictRequest, PredictParams, Upload};
pub use response::{Base64PredictResponse, BatchItemResult, BatchResponse, PredictResponse};
pub use service::{DetectionService, ServiceSettings, DEADLINE_EXCEEDED};
