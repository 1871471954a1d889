// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Base64 prediction tests for POST /predict_base64

use super::helpers::*;
use axum::http::StatusCode;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::json;

#[tokio::test]
async fn test_base64_prediction() {
    let app = router(state_with_model());
    let payload = STANDARD.encode(png(30, 20));

    let (status, json) = send(app, json_request("/predict_base64", json!({ "image": payload }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "success");
    assert!(json.get("filename").is_none());
    assert_eq!(json["results"]["num_detections"], 2);
    assert_eq!(json["results"]["image_shape"]["width"], 30);
}

#[tokio::test]
async fn test_data_url_prefix_matches_bare_payload() {
    let payload = STANDARD.encode(png(30, 20));

    let (_, bare) = send(
        router(state_with_model()),
        json_request("/predict_base64", json!({ "image": payload })),
    )
    .await;
    let (status, prefixed) = send(
        router(state_with_model()),
        json_request(
            "/predict_base64",
            json!({ "image": format!("data:image/png;base64,{}", payload) }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(bare, prefixed);
}

#[tokio::test]
async fn test_base64_body_threshold() {
    let app = router(state_with_model());
    let payload = STANDARD.encode(png(8, 8));

    let (status, json) = send(
        app,
        json_request(
            "/predict_base64?conf_threshold=0.05",
            json!({ "image": payload, "conf_threshold": 0.7 }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["results"]["num_detections"], 1);
}

#[tokio::test]
async fn test_base64_missing_image() {
    for body in [json!({}), json!({ "image": "" }), json!({ "image": null })] {
        let (status, json) = send(router(state_with_model()), json_request("/predict_base64", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error_type"], "missing_image_data");
    }
}

#[tokio::test]
async fn test_base64_invalid_payload() {
    let (status, json) = send(
        router(state_with_model()),
        json_request("/predict_base64", json!({ "image": "%%%not-base64%%%" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error_type"], "invalid_image");
}

#[tokio::test]
async fn test_base64_malformed_json() {
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/predict_base64")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();

    let (status, json) = send(router(state_with_model()), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error_type"], "invalid_request");
}

#[tokio::test]
async fn test_base64_without_model_is_internal_error() {
    let payload = STANDARD.encode(png(8, 8));
    let (status, json) = send(
        router(state_without_model("/nonexistent/fallback.onnx".into())),
        json_request("/predict_base64", json!({ "image": payload })),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error_type"], "model_not_loaded");
}
