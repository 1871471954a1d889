// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Object detection model capability
//!
//! The inference engine only sees the [`DetectionModel`] trait. This module
//! also provides the ONNX Runtime implementation used in production:
//!
//! - `preprocessing` - Letterbox resize into an NCHW tensor
//! - `postprocessing` - Output decoding and non-maximum suppression
//! - `onnx` - Session loading and the detect pipeline

pub mod onnx;
pub mod postprocessing;
pub mod preprocessing;

use anyhow::Result;
use image::RgbImage;
use std::path::Path;
use std::sync::Arc;

pub use onnx::{OnnxDetectionModel, OnnxModelConfig, OnnxModelFactory};

/// One box as emitted by a detection model, in original image pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
    /// Corners as `[x1, y1, x2, y2]`
    pub bbox: [f32; 4],
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    /// Model class index
    pub class_id: u32,
}

/// A loaded detection model
///
/// Implementations must return only boxes whose confidence is at least
/// `threshold`, in the order they want them reported.
pub trait DetectionModel: Send + Sync {
    fn detect(&self, image: &RgbImage, threshold: f32) -> Result<Vec<RawDetection>>;
}

/// Instantiates detection models from artifacts on disk
pub trait ModelFactory: Send + Sync {
    fn load(&self, path: &Path) -> Result<Arc<dyn DetectionModel>>;
}
