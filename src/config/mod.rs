// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Node configuration from command line and environment

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::vision::{
    ModelLoaderConfig, OnnxModelConfig, DEFAULT_FALLBACK_MODEL, MAX_IMAGE_SIZE,
};

/// Default confidence threshold applied when a request supplies none
pub const DEFAULT_CONF_THRESHOLD: f32 = 0.25;

/// Default maximum number of uploads per batch request
pub const DEFAULT_MAX_BATCH_SIZE: usize = 10;

/// Smallest square model input accepted
pub const MIN_MODEL_INPUT_SIZE: u32 = 32;

/// Parse a confidence threshold, clamping finite values into `[0, 1]`
fn parse_threshold(value: &str) -> Result<f32, String> {
    let threshold: f32 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", value))?;
    if !threshold.is_finite() {
        return Err(format!("{} is not a finite number", threshold));
    }
    Ok(threshold.clamp(0.0, 1.0))
}

/// Mango Leaf Node
#[derive(Parser, Debug, Clone)]
#[command(name = "mango-leaf-node")]
#[command(version)]
#[command(about = "HTTP node serving mango leaf disease detections", long_about = None)]
pub struct ServerConfig {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Comma-separated candidate model files, tried in order
    #[arg(
        long,
        env = "MODEL_CANDIDATES",
        value_delimiter = ',',
        default_value = "best.onnx,yolo11n.onnx,yolov8n.onnx"
    )]
    pub model_candidates: Vec<PathBuf>,

    /// Model attempted when no candidate loads
    #[arg(long, env = "FALLBACK_MODEL", default_value = DEFAULT_FALLBACK_MODEL)]
    pub fallback_model: PathBuf,

    /// Square model input size in pixels
    #[arg(
        long,
        env = "MODEL_INPUT_SIZE",
        default_value_t = 640,
        value_parser = clap::value_parser!(u32).range(MIN_MODEL_INPUT_SIZE as i64..)
    )]
    pub model_input_size: u32,

    /// IoU threshold for non-maximum suppression
    #[arg(long, env = "IOU_THRESHOLD", default_value_t = 0.7)]
    pub iou_threshold: f32,

    /// Confidence threshold used when a request supplies none
    #[arg(
        long,
        env = "DEFAULT_CONF_THRESHOLD",
        default_value_t = DEFAULT_CONF_THRESHOLD,
        value_parser = parse_threshold
    )]
    pub default_conf_threshold: f32,

    /// Maximum uploads per batch request
    #[arg(long, env = "MAX_BATCH_SIZE", default_value_t = DEFAULT_MAX_BATCH_SIZE)]
    pub max_batch_size: usize,

    /// Maximum encoded size of a single image
    #[arg(long, env = "MAX_IMAGE_BYTES", default_value_t = MAX_IMAGE_SIZE)]
    pub max_image_bytes: usize,

    /// ONNX Runtime intra-op threads
    #[arg(long, env = "ONNX_INTRA_THREADS", default_value_t = 4)]
    pub onnx_intra_threads: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            model_candidates: ModelLoaderConfig::default().candidates,
            fallback_model: PathBuf::from(DEFAULT_FALLBACK_MODEL),
            model_input_size: 640,
            iou_threshold: 0.7,
            default_conf_threshold: DEFAULT_CONF_THRESHOLD,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            max_image_bytes: MAX_IMAGE_SIZE,
            onnx_intra_threads: 4,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid listen address {}:{}: {}", self.host, self.port, e))
    }

    pub fn loader_config(&self) -> ModelLoaderConfig {
        ModelLoaderConfig {
            candidates: self.model_candidates.clone(),
            fallback: self.fallback_model.clone(),
        }
    }

    pub fn onnx_config(&self) -> OnnxModelConfig {
        OnnxModelConfig {
            input_size: self.model_input_size,
            iou_threshold: self.iou_threshold,
            intra_threads: self.onnx_intra_threads,
        }
    }

    /// Request body limit large enough for a full batch plus multipart framing
    pub fn body_limit(&self) -> usize {
        self.max_image_bytes
            .saturating_mul(self.max_batch_size.max(1))
            .saturating_add(1024 * 1024)
    }
}
