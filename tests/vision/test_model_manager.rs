// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Model loader tests
//!
//! Verifies that the ModelLoader:
//! - Walks the candidate list in order and stops at the first success
//! - Skips candidates that are not on disk
//! - Falls back to the configured artifact
//! - Publishes into the shared handle without disturbing earlier readers

use image::RgbImage;
use mango_leaf_node::vision::{
    DetectionModel, ModelFactory, ModelHandle, ModelLoadError, ModelLoader, ModelLoaderConfig,
    OnnxModelConfig, OnnxModelFactory, RawDetection,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

struct NullModel;

impl DetectionModel for NullModel {
    fn detect(&self, _image: &RgbImage, _threshold: f32) -> anyhow::Result<Vec<RawDetection>> {
        Ok(vec![])
    }
}

/// Loads only files whose name is listed in `loadable`
struct SelectiveFactory {
    loadable: Vec<&'static str>,
    attempts: Mutex<Vec<String>>,
}

impl SelectiveFactory {
    fn new(loadable: &[&'static str]) -> Arc<Self> {
        Arc::new(Self {
            loadable: loadable.to_vec(),
            attempts: Mutex::new(Vec::new()),
        })
    }

    fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

impl ModelFactory for SelectiveFactory {
    fn load(&self, path: &Path) -> anyhow::Result<Arc<dyn DetectionModel>> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.attempts.lock().unwrap().push(name.clone());
        if self.loadable.contains(&name.as_str()) {
            Ok(Arc::new(NullModel))
        } else {
            anyhow::bail!("corrupt model {}", name)
        }
    }
}

fn write_artifacts(dir: &tempfile::TempDir, names: &[&str]) -> Vec<PathBuf> {
    names
        .iter()
        .map(|name| {
            let path = dir.path().join(name);
            std::fs::write(&path, b"not really onnx").unwrap();
            path
        })
        .collect()
}

#[test]
fn test_only_second_candidate_loadable() {
    let dir = tempfile::tempdir().unwrap();
    let candidates = write_artifacts(&dir, &["A.onnx", "B.onnx", "C.onnx"]);
    let factory = SelectiveFactory::new(&["B.onnx"]);
    let loader = ModelLoader::new(
        factory.clone(),
        ModelLoaderConfig {
            candidates,
            fallback: dir.path().join("fallback.onnx"),
        },
    );

    let loaded = loader.load().unwrap();

    assert_eq!(loaded.source.file_name().unwrap(), "B.onnx");
    assert_eq!(factory.attempts(), vec!["A.onnx", "B.onnx"]);
}

#[test]
fn test_fallback_attempted_when_no_candidates_exist() {
    let dir = tempfile::tempdir().unwrap();
    let factory = SelectiveFactory::new(&["fallback.onnx"]);
    let loader = ModelLoader::new(
        factory.clone(),
        ModelLoaderConfig {
            candidates: vec![dir.path().join("best.onnx"), dir.path().join("yolo11n.onnx")],
            fallback: dir.path().join("fallback.onnx"),
        },
    );

    let loaded = loader.load().unwrap();

    assert_eq!(loaded.source.file_name().unwrap(), "fallback.onnx");
    assert_eq!(factory.attempts(), vec!["fallback.onnx"]);
}

#[test]
fn test_exhausted_chain_lists_attempts() {
    let dir = tempfile::tempdir().unwrap();
    let candidates = write_artifacts(&dir, &["best.onnx"]);
    let loader = ModelLoader::new(
        SelectiveFactory::new(&[]),
        ModelLoaderConfig {
            candidates,
            fallback: dir.path().join("yolov8n.onnx"),
        },
    );

    match loader.load() {
        Err(ModelLoadError::Exhausted {
            attempted,
            last_error,
        }) => {
            let names: Vec<_> = attempted
                .iter()
                .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
                .collect();
            assert_eq!(names, vec!["best.onnx", "yolov8n.onnx"]);
            assert!(last_error.contains("yolov8n.onnx"));
        }
        other => panic!("expected exhausted chain, got {:?}", other.map(|l| l.source)),
    }
}

#[tokio::test]
async fn test_load_and_publish_fills_handle() {
    let dir = tempfile::tempdir().unwrap();
    let candidates = write_artifacts(&dir, &["best.onnx"]);
    let loader = ModelLoader::new(
        SelectiveFactory::new(&["best.onnx"]),
        ModelLoaderConfig {
            candidates,
            fallback: dir.path().join("yolov8n.onnx"),
        },
    );
    let handle = ModelHandle::new();

    let loaded = loader.load_and_publish(&handle).await.unwrap();

    assert!(handle.try_is_loaded().unwrap());
    assert_eq!(handle.current().unwrap().source, loaded.source);
}

#[tokio::test]
async fn test_reload_does_not_disturb_existing_reader() {
    let dir = tempfile::tempdir().unwrap();
    let candidates = write_artifacts(&dir, &["new.onnx"]);
    let handle = ModelHandle::with_model(Arc::new(NullModel), "old.onnx");
    let reader = handle.current().unwrap();

    let loader = ModelLoader::new(
        SelectiveFactory::new(&["new.onnx"]),
        ModelLoaderConfig {
            candidates,
            fallback: dir.path().join("yolov8n.onnx"),
        },
    );
    loader.load_and_publish(&handle).await.unwrap();

    assert_eq!(reader.source, PathBuf::from("old.onnx"));
    assert_eq!(handle.current().unwrap().source.file_name().unwrap(), "new.onnx");
}

#[test]
fn test_onnx_factory_rejects_invalid_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let candidates = write_artifacts(&dir, &["best.onnx"]);
    let loader = ModelLoader::new(
        Arc::new(OnnxModelFactory::new(OnnxModelConfig::default())),
        ModelLoaderConfig {
            candidates,
            fallback: dir.path().join("missing.onnx"),
        },
    );

    assert!(matches!(
        loader.load(),
        Err(ModelLoadError::Exhausted { .. })
    ));
}
