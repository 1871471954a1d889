// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the Mango Leaf Node

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-leaf-detection-2025-10-19";

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Build date
pub const BUILD_DATE: &str = "2025-10-19";

/// Service name reported by the API
pub const SERVICE_NAME: &str = "Mango Leaf Disease Detection API";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "onnx-yolo",
    "model-fallback-chain",
    "hot-reload",
    "multipart-upload",
    "batch-upload",
    "base64-upload",
    "batch-deadline",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("{} {} ({})", SERVICE_NAME, VERSION_NUMBER, BUILD_DATE)
}

/// Get full version info for API responses
pub fn get_version_info() -> serde_json::Value {
    serde_json::json!({
        "version": VERSION_NUMBER,
        "build": VERSION,
        "date": BUILD_DATE,
        "features": FEATURES,
    })
}
