// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ONNX Runtime YOLO detector
//!
//! Runs Ultralytics YOLO exports (YOLOv8 / YOLO11 detection heads) on CPU.

use anyhow::{Context, Result};
use image::RgbImage;
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::postprocessing::{decode_predictions, non_max_suppression, DEFAULT_IOU_THRESHOLD};
use super::preprocessing::{letterbox, DEFAULT_INPUT_SIZE};
use super::{DetectionModel, ModelFactory, RawDetection};

/// Session and pipeline settings for ONNX detectors
#[derive(Debug, Clone)]
pub struct OnnxModelConfig {
    /// Square model input size in pixels
    pub input_size: u32,
    /// IoU threshold for non-maximum suppression
    pub iou_threshold: f32,
    /// ONNX Runtime intra-op threads
    pub intra_threads: usize,
}

impl Default for OnnxModelConfig {
    fn default() -> Self {
        Self {
            input_size: DEFAULT_INPUT_SIZE,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            intra_threads: 4,
        }
    }
}

/// YOLO detection model backed by an ONNX Runtime session
#[derive(Clone)]
pub struct OnnxDetectionModel {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// Model input name
    input_name: String,
    /// Artifact the session was built from
    source: PathBuf,
    config: OnnxModelConfig,
}

impl std::fmt::Debug for OnnxDetectionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxDetectionModel")
            .field("input_name", &self.input_name)
            .field("source", &self.source)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OnnxDetectionModel {
    /// Load a detection model from an ONNX file
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime initialization fails
    pub fn load<P: AsRef<Path>>(model_path: P, config: OnnxModelConfig) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Detection model not found: {}", model_path.display());
        }

        info!("Loading detection model from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(config.intra_threads)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load detection model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        debug!(
            "Detection model loaded - input: {}, outputs: {}",
            input_name,
            session.outputs.len()
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            source: model_path.to_path_buf(),
            config,
        })
    }
}

impl DetectionModel for OnnxDetectionModel {
    fn detect(&self, image: &RgbImage, threshold: f32) -> Result<Vec<RawDetection>> {
        let mut boxed = letterbox(image, self.config.input_size);

        let input_value = Value::from_array(std::mem::take(&mut boxed.tensor))
            .context("Failed to create input tensor")?;

        let candidates = {
            let mut session = self
                .session
                .lock()
                .map_err(|_| anyhow::anyhow!("Detection session lock poisoned"))?;

            let outputs = session
                .run(ort::inputs![self.input_name.as_str() => input_value])
                .context("Detection inference failed")?;

            let output_tensor = outputs[0]
                .try_extract_array::<f32>()
                .context("Failed to extract output tensor")?;

            debug!("Detection output shape: {:?}", output_tensor.shape());

            decode_predictions(output_tensor.view(), threshold)?
        };

        let kept = non_max_suppression(candidates, self.config.iou_threshold);

        Ok(kept
            .into_iter()
            .map(|det| RawDetection {
                bbox: boxed.restore(det.bbox, image.width(), image.height()),
                ..det
            })
            .collect())
    }
}

/// Builds [`OnnxDetectionModel`]s for the model loader
#[derive(Debug, Clone, Default)]
pub struct OnnxModelFactory {
    config: OnnxModelConfig,
}

impl OnnxModelFactory {
    pub fn new(config: OnnxModelConfig) -> Self {
        Self { config }
    }
}

impl ModelFactory for OnnxModelFactory {
    fn load(&self, path: &Path) -> Result<Arc<dyn DetectionModel>> {
        let model = OnnxDetectionModel::load(path, self.config.clone())?;
        Ok(Arc::new(model))
    }
}
