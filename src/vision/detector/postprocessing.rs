// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLO output decoding and non-maximum suppression

use anyhow::Result;
use ndarray::{ArrayViewD, Axis, Ix2};

use super::RawDetection;

/// Default IoU threshold for class-aware NMS (Ultralytics predict default)
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.7;

/// Decode a YOLOv8/YOLO11 detection head into candidate boxes
///
/// Accepts `[1, 4 + nc, N]` (the Ultralytics export layout) or the
/// transposed `[1, N, 4 + nc]`. Each anchor carries `cx, cy, w, h` followed
/// by one score per class. Boxes stay in model input space.
pub fn decode_predictions(output: ArrayViewD<f32>, threshold: f32) -> Result<Vec<RawDetection>> {
    let shape = output.shape().to_vec();
    if shape.len() != 3 || shape[0] != 1 {
        anyhow::bail!("Unexpected detection output shape: {:?}, expected [1, C, N]", shape);
    }

    let batch = output
        .index_axis(Axis(0), 0)
        .into_dimensionality::<Ix2>()
        .map_err(|e| anyhow::anyhow!("Failed to view detection output: {}", e))?;

    // Anchors outnumber channels in every real export
    let predictions = if shape[1] <= shape[2] {
        batch.reversed_axes()
    } else {
        batch
    };

    let channels = predictions.shape()[1];
    if channels < 5 {
        anyhow::bail!(
            "Detection output has {} channels per anchor, expected at least 5",
            channels
        );
    }

    let mut detections = Vec::new();
    for row in predictions.axis_iter(Axis(0)) {
        let (class_id, confidence) = row
            .iter()
            .skip(4)
            .enumerate()
            .fold((0usize, f32::NEG_INFINITY), |(best_id, best), (id, &score)| {
                if score > best {
                    (id, score)
                } else {
                    (best_id, best)
                }
            });

        if confidence < threshold {
            continue;
        }

        let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
        detections.push(RawDetection {
            bbox: [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
            confidence,
            class_id: class_id as u32,
        });
    }

    Ok(detections)
}

/// Intersection over union of two corner-format boxes
pub fn compute_iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let inter_x1 = a[0].max(b[0]);
    let inter_y1 = a[1].max(b[1]);
    let inter_x2 = a[2].min(b[2]);
    let inter_y2 = a[3].min(b[3]);

    let inter_area = (inter_x2 - inter_x1).max(0.0) * (inter_y2 - inter_y1).max(0.0);
    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    let union_area = area_a + area_b - inter_area;

    if union_area <= 0.0 {
        0.0
    } else {
        inter_area / union_area
    }
}

/// Class-aware non-maximum suppression
///
/// Output is ordered by confidence, highest first. Boxes of different
/// classes never suppress each other.
pub fn non_max_suppression(mut candidates: Vec<RawDetection>, iou_threshold: f32) -> Vec<RawDetection> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<RawDetection> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let suppressed = kept.iter().any(|k| {
            k.class_id == candidate.class_id && compute_iou(&k.bbox, &candidate.bbox) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}
