// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Shared fixtures for the HTTP API tests
//!
//! The detection model is replaced by [`FakeModel`] so the router can be
//! exercised end to end without an ONNX artifact on disk.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use mango_leaf_node::{
    api::{create_router, AppState, DetectionService, ServiceSettings},
    vision::{
        ClassRegistry, DetectionModel, InferenceEngine, ModelFactory, ModelHandle, ModelLoader,
        ModelLoaderConfig, RawDetection,
    },
};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot`

pub const BOUNDARY: &str = "leafboundary7MA4YWxkTrZu0gW";

/// Detection model returning one box per known class, filtered by threshold
pub struct FakeModel;

impl DetectionModel for FakeModel {
    fn detect(&self, image: &RgbImage, threshold: f32) -> anyhow::Result<Vec<RawDetection>> {
        let (w, h) = (image.width() as f32, image.height() as f32);
        let all = vec![
            RawDetection {
                bbox: [0.0, 0.0, w / 2.0, h / 2.0],
                confidence: 0.9,
                class_id: 2,
            },
            RawDetection {
                bbox: [w / 2.0, h / 2.0, w, h],
                confidence: 0.5,
                class_id: 0,
            },
            RawDetection {
                bbox: [0.0, 0.0, w, h],
                confidence: 0.1,
                class_id: 9,
            },
        ];
        Ok(all.into_iter().filter(|d| d.confidence >= threshold).collect())
    }
}

/// Factory that loads [`FakeModel`] for any existing file
pub struct FakeFactory;

impl ModelFactory for FakeFactory {
    fn load(&self, path: &Path) -> anyhow::Result<Arc<dyn DetectionModel>> {
        if path.is_file() {
            Ok(Arc::new(FakeModel))
        } else {
            anyhow::bail!("Detection model not found: {}", path.display())
        }
    }
}

fn state_with_handle(handle: ModelHandle, fallback: PathBuf) -> AppState {
    let engine = InferenceEngine::new(handle, ClassRegistry::default());
    let service = DetectionService::new(engine, ServiceSettings::default());
    let loader = ModelLoader::new(
        Arc::new(FakeFactory),
        ModelLoaderConfig {
            candidates: vec![],
            fallback,
        },
    );
    AppState::new(service, loader)
}

/// State with [`FakeModel`] already published
pub fn state_with_model() -> AppState {
    state_with_handle(
        ModelHandle::with_model(Arc::new(FakeModel), "fake.onnx"),
        PathBuf::from("/nonexistent/fallback.onnx"),
    )
}

/// State with an empty handle; reloading loads `fallback`
pub fn state_without_model(fallback: PathBuf) -> AppState {
    state_with_handle(ModelHandle::new(), fallback)
}

pub fn router(state: AppState) -> Router {
    create_router(state, 64 * 1024 * 1024)
}

/// Encode a solid-color image
pub fn encoded_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([40, 160, 40])));
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, format).unwrap();
    buffer.into_inner()
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    encoded_image(width, height, ImageFormat::Png)
}

/// One part of a hand-built multipart body
pub struct Part<'a> {
    pub name: &'a str,
    pub filename: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub data: Vec<u8>,
}

impl<'a> Part<'a> {
    pub fn file(name: &'a str, filename: &'a str, content_type: &'a str, data: Vec<u8>) -> Self {
        Self {
            name,
            filename: Some(filename),
            content_type: Some(content_type),
            data,
        }
    }

    pub fn text(name: &'a str, value: &str) -> Self {
        Self {
            name,
            filename: None,
            content_type: None,
            data: value.as_bytes().to_vec(),
        }
    }
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part.filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    part.name, filename
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name).as_bytes(),
            ),
        }
        if let Some(content_type) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(&part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

pub fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Send a request and parse the JSON response
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body_bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}
