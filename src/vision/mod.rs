// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing for mango leaf disease detection
//!
//! This module provides:
//! - Image decoding into a canonical RGB raster
//! - The detection model capability and its ONNX Runtime implementation
//! - Model loading with an ordered fallback chain
//! - Inference producing labeled detections
//!
//! Everything runs on CPU.

pub mod classes;
pub mod detector;
pub mod image_utils;
pub mod inference;
pub mod model_manager;

pub use classes::{ClassRegistry, LEAF_DISEASE_CLASSES};
pub use detector::{
    DetectionModel, ModelFactory, OnnxDetectionModel, OnnxModelConfig, OnnxModelFactory,
    RawDetection,
};
pub use image_utils::{
    decode_base64_image, decode_base64_image_with_limit, decode_image_bytes,
    decode_image_bytes_with_limit, detect_format, CanonicalImage, ImageError, ImageInfo, MAX_IMAGE_SIZE,
};
pub use inference::{
    BoundingBox, Detection, DetectionResult, ImageShape, InferenceEngine, InferenceError,
};
pub use model_manager::{
    LoadedModel, ModelHandle, ModelLoadError, ModelLoader, ModelLoaderConfig,
    DEFAULT_FALLBACK_MODEL, DEFAULT_MODEL_CANDIDATES,
};
