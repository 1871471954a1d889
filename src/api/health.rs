// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Health reporting

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::vision::InferenceEngine;

const HEALTH_MESSAGE: &str = "Mango Disease Detection API is running";
const DEGRADED_MESSAGE: &str = "API is running but model may not be loaded";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub classes: BTreeMap<u32, String>,
    pub message: String,
    /// Artifact the active model was loaded from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Report service health without ever failing
pub fn health_report(engine: &InferenceEngine) -> HealthResponse {
    let classes = engine
        .registry()
        .iter()
        .map(|(id, name)| (id, name.to_string()))
        .collect();

    match engine.handle().try_is_loaded() {
        Ok(model_loaded) => HealthResponse {
            status: "healthy".to_string(),
            model_loaded,
            classes,
            message: HEALTH_MESSAGE.to_string(),
            model: engine
                .handle()
                .current()
                .map(|loaded| loaded.source.display().to_string()),
            error: None,
        },
        Err(e) => HealthResponse {
            status: "degraded".to_string(),
            model_loaded: false,
            classes,
            message: DEGRADED_MESSAGE.to_string(),
            model: None,
            error: Some(e.to_string()),
        },
    }
}
