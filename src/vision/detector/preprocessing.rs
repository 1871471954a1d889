// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for YOLO detectors

use image::{imageops::FilterType, Rgb, RgbImage};
use ndarray::Array4;

/// Default square input size for YOLO exports
pub const DEFAULT_INPUT_SIZE: u32 = 640;

/// Padding color used by Ultralytics letterboxing
pub const PAD_VALUE: u8 = 114;

/// Letterboxed model input plus the transform needed to undo it
#[derive(Debug, Clone)]
pub struct Letterbox {
    /// NCHW tensor `[1, 3, S, S]` with values in 0.0-1.0
    pub tensor: Array4<f32>,
    /// Resize factor applied to the original image
    pub scale: f32,
    /// Horizontal padding added on the left
    pub pad_x: f32,
    /// Vertical padding added on top
    pub pad_y: f32,
}

impl Letterbox {
    /// Map a box from model input space back to original image pixels
    ///
    /// The result is clipped to `[0, width] x [0, height]`.
    pub fn restore(&self, bbox: [f32; 4], width: u32, height: u32) -> [f32; 4] {
        let (w, h) = (width as f32, height as f32);
        let x1 = ((bbox[0] - self.pad_x) / self.scale).clamp(0.0, w);
        let y1 = ((bbox[1] - self.pad_y) / self.scale).clamp(0.0, h);
        let x2 = ((bbox[2] - self.pad_x) / self.scale).clamp(0.0, w);
        let y2 = ((bbox[3] - self.pad_y) / self.scale).clamp(0.0, h);
        [x1, y1, x2, y2]
    }
}

/// Resize with aspect ratio preservation and center padding
///
/// Steps:
/// 1. Scale to fit within target_size x target_size
/// 2. Pad to square with gray (114) background
/// 3. Scale pixels to 0.0-1.0 (no mean/std normalization for YOLO)
/// 4. Convert to NCHW tensor format [1, 3, H, W]
pub fn letterbox(image: &RgbImage, target_size: u32) -> Letterbox {
    let (orig_w, orig_h) = image.dimensions();
    let size = target_size as usize;
    let mut tensor = Array4::from_elem((1, 3, size, size), PAD_VALUE as f32 / 255.0);

    if orig_w == 0 || orig_h == 0 {
        return Letterbox {
            tensor,
            scale: 1.0,
            pad_x: 0.0,
            pad_y: 0.0,
        };
    }

    let scale = (target_size as f32 / orig_w as f32).min(target_size as f32 / orig_h as f32);

    let new_w = ((orig_w as f32 * scale).round() as u32).clamp(1, target_size);
    let new_h = ((orig_h as f32 * scale).round() as u32).clamp(1, target_size);

    let resized = if (new_w, new_h) == (orig_w, orig_h) {
        image.clone()
    } else {
        image::imageops::resize(image, new_w, new_h, FilterType::Triangle)
    };

    let offset_x = (target_size - new_w) / 2;
    let offset_y = (target_size - new_h) / 2;

    for (x, y, Rgb(pixel)) in resized.enumerate_pixels() {
        let tx = (x + offset_x) as usize;
        let ty = (y + offset_y) as usize;
        for c in 0..3 {
            tensor[[0, c, ty, tx]] = pixel[c] as f32 / 255.0;
        }
    }

    Letterbox {
        tensor,
        scale,
        pad_x: offset_x as f32,
        pad_y: offset_y as f32,
    }
}
