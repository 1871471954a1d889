// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod errors;
pub mod health;
pub mod http_server;
pub mod predict;

pub use errors::{ApiError, ErrorResponse};
pub use health::{health_report, HealthResponse};
pub use http_server::{create_router, start_server, AppState};
pub use predict::{
    Base64PredictRequest, Base64PredictResponse, BatchItemResult, BatchResponse, DetectionService,
    PredictResponse, ServiceSettings, Upload,
};
