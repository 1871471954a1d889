// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Prediction endpoint handlers

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    Json,
};
use axum_extra::extract::multipart::{Multipart, MultipartRejection};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::request::{Base64PredictRequest, PredictParams, Upload, UNKNOWN_FILENAME};
use super::response::{Base64PredictResponse, BatchResponse, PredictResponse};
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;

const THRESHOLD_FIELD: &str = "conf_threshold";

/// Fields collected from a prediction multipart body
#[derive(Debug, Default)]
struct MultipartForm {
    uploads: Vec<Upload>,
    conf_threshold: Option<f32>,
}

/// Read every part of `multipart`, keeping files named `file_field`
async fn read_form(mut multipart: Multipart, file_field: &str) -> Result<MultipartForm, ApiError> {
    let mut form = MultipartForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidRequest(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == file_field {
            let filename = field
                .file_name()
                .filter(|f| !f.is_empty())
                .unwrap_or(UNKNOWN_FILENAME)
                .to_string();
            let content_type = field.content_type().map(str::to_string);
            let data = field.bytes().await.map_err(|e| {
                ApiError::InvalidRequest(format!("Failed to read upload {}: {}", filename, e))
            })?;

            debug!(
                "Received upload {} ({}, {} bytes)",
                filename,
                content_type.as_deref().unwrap_or("no content type"),
                data.len()
            );
            form.uploads.push(Upload {
                filename,
                content_type,
                data,
            });
        } else if name == THRESHOLD_FIELD {
            let text = field
                .text()
                .await
                .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
            let value = text.trim().parse::<f32>().map_err(|_| {
                ApiError::InvalidThreshold(format!("'{}' is not a number", text.trim()))
            })?;
            form.conf_threshold = Some(value);
        } else {
            debug!("Ignoring unexpected multipart field '{}'", name);
        }
    }

    Ok(form)
}

fn query_params(query: Result<Query<PredictParams>, QueryRejection>) -> Result<PredictParams, ApiError> {
    query.map(|Query(params)| params).map_err(|e| {
        warn!("Rejected query string: {}", e);
        ApiError::InvalidRequest(e.to_string())
    })
}

fn multipart_body(multipart: Result<Multipart, MultipartRejection>) -> Result<Multipart, ApiError> {
    multipart.map_err(|e| {
        warn!("Rejected multipart request: {}", e);
        ApiError::InvalidRequest(e.to_string())
    })
}

/// POST /predict - Detect leaf diseases in one uploaded image
///
/// # Request
/// - multipart field `file`: the image
/// - optional multipart field or query parameter `conf_threshold`
///
/// # Errors
/// - 400: not an image, undecodable image, bad threshold
/// - 500: no model loaded, inference failed
pub async fn predict_handler(
    State(state): State<AppState>,
    query: Result<Query<PredictParams>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let params = query_params(query)?;
    let form = read_form(multipart_body(multipart)?, "file").await?;

    let threshold = state
        .service
        .resolve_threshold(params.conf_threshold, form.conf_threshold)?;
    let upload = form
        .uploads
        .into_iter()
        .next()
        .ok_or(ApiError::MissingImageData)?;

    let response = state.service.predict_single(upload, threshold).await?;
    Ok(Json(response))
}

/// POST /predict_batch - Detect leaf diseases in up to ten images
///
/// Files are processed in order; a failing file is reported in place and
/// does not affect the others. `timeout_ms` bounds the whole batch.
pub async fn predict_batch_handler(
    State(state): State<AppState>,
    query: Result<Query<PredictParams>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<BatchResponse>, ApiError> {
    let started = Instant::now();
    let params = query_params(query)?;
    let form = read_form(multipart_body(multipart)?, "files").await?;

    let threshold = state
        .service
        .resolve_threshold(params.conf_threshold, form.conf_threshold)?;
    let deadline = params
        .timeout_ms
        .and_then(|ms| started.checked_add(Duration::from_millis(ms)));

    let response = state
        .service
        .predict_batch(form.uploads, threshold, deadline)
        .await?;
    Ok(Json(response))
}

/// POST /predict_base64 - Detect leaf diseases in a base64 image
///
/// # Request
/// JSON `{"image": "<base64>", "conf_threshold": 0.25}`; the image may carry a
/// `data:image/...;base64,` prefix.
pub async fn predict_base64_handler(
    State(state): State<AppState>,
    query: Result<Query<PredictParams>, QueryRejection>,
    body: Result<Json<Base64PredictRequest>, JsonRejection>,
) -> Result<Json<Base64PredictResponse>, ApiError> {
    let params = query_params(query)?;
    let Json(request) = body.map_err(|e| {
        warn!("Rejected base64 request body: {}", e);
        ApiError::InvalidRequest(e.to_string())
    })?;

    let threshold = state
        .service
        .resolve_threshold(params.conf_threshold, request.conf_threshold)?;
    let response = state
        .service
        .predict_base64(request.image_data(), threshold)
        .await?;
    Ok(Json(response))
}
