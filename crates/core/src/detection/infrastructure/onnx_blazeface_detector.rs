//! Short-range BlazeFace detection on ONNX Runtime.
//!
//! Boxes come out in relative coordinates and are not clipped; clipping
//! happens in the geometry normalizer.

use std::path::Path;

use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::infrastructure::execution_provider::build_session;
use crate::shared::frame::{Frame, PixelFormat};
use crate::shared::region::RelativeBox;

/// BlazeFace model input resolution.
const INPUT_SIZE: u32 = 128;

/// Overlap above which the weaker of two boxes is dropped.
const NMS_IOU_THRESH: f64 = 0.3;

/// Number of BlazeFace anchors (short-range model).
const NUM_ANCHORS: usize = 896;

/// Values per anchor in the regressor output: box (4) + 6 keypoints (12).
const REGRESSOR_STRIDE: usize = 16;

pub struct OnnxBlazefaceDetector {
    session: ort::session::Session,
    confidence: f64,
    anchors: Vec<[f32; 2]>,
}

impl OnnxBlazefaceDetector {
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = build_session(model_path)?;
        log::info!(
            "Loaded face detector {} (confidence >= {confidence})",
            model_path.display()
        );
        Ok(Self {
            session,
            confidence,
            anchors: generate_anchors(),
        })
    }
}

impl FaceDetector for OnnxBlazefaceDetector {
    fn pixel_format(&self) -> PixelFormat {
        PixelFormat::Rgb
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<RelativeBox>, Box<dyn std::error::Error>> {
        if frame.format() != PixelFormat::Rgb {
            return Err("BlazeFace expects RGB frames".into());
        }
        if frame.width() == 0 || frame.height() == 0 {
            return Ok(Vec::new());
        }

        let input = ort::value::Tensor::from_array(preprocess(frame, INPUT_SIZE))?;
        let outputs = self.session.run(ort::inputs![input])?;

        // Outputs: regressors [1, 896, 16], logits [1, 896, 1].
        if outputs.len() < 2 {
            return Err(
                format!("BlazeFace model expected 2 outputs, got {}", outputs.len()).into(),
            );
        }

        let regressors = outputs[0].try_extract_array::<f32>()?;
        let logits = outputs[1].try_extract_array::<f32>()?;
        let reg_data = regressors.as_slice().ok_or("regressor output is not contiguous")?;
        let score_data = logits.as_slice().ok_or("score output is not contiguous")?;

        let candidates = decode(reg_data, score_data, &self.anchors, self.confidence as f32);
        let kept = nms(candidates, NMS_IOU_THRESH);

        log::debug!("Frame {}: {} faces", frame.index(), kept.len());
        Ok(kept.iter().map(RawDet::to_relative).collect())
    }
}

/// Nearest-neighbour resize to `size x size`, scaled to [0,1], NCHW.
fn preprocess(frame: &Frame, size: u32) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let side = size as usize;
    let sample = |dst: usize, extent: u32| {
        let pos = (dst as f64 + 0.5) * f64::from(extent) / side as f64;
        (pos as usize).min(extent as usize - 1)
    };
    let rows: Vec<usize> = (0..side).map(|y| sample(y, frame.height())).collect();
    let cols: Vec<usize> = (0..side).map(|x| sample(x, frame.width())).collect();

    ndarray::Array4::from_shape_fn((1, 3, side, side), |(_, c, y, x)| {
        f32::from(src[[rows[y], cols[x], c]]) / 255.0
    })
}

/// Anchor centres for the short-range model: a 16x16 grid with two anchors
/// per cell followed by an 8x8 grid with six.
fn generate_anchors() -> Vec<[f32; 2]> {
    const LAYERS: [(usize, usize); 2] = [(8, 2), (16, 6)];

    LAYERS
        .iter()
        .flat_map(|&(stride, per_cell)| {
            let cells = INPUT_SIZE as usize / stride;
            (0..cells * cells).flat_map(move |cell| {
                let centre = [
                    ((cell % cells) as f32 + 0.5) / cells as f32,
                    ((cell / cells) as f32 + 0.5) / cells as f32,
                ];
                std::iter::repeat(centre).take(per_cell)
            })
        })
        .collect()
}

/// Decodes anchor-relative regressions into relative corner boxes,
/// keeping only those whose sigmoid score reaches `min_score`.
fn decode(reg_data: &[f32], score_data: &[f32], anchors: &[[f32; 2]], min_score: f32) -> Vec<RawDet> {
    let scale = INPUT_SIZE as f32;
    score_data
        .iter()
        .zip(anchors)
        .zip(reg_data.chunks_exact(REGRESSOR_STRIDE))
        .take(NUM_ANCHORS)
        .filter_map(|((&logit, anchor), reg)| {
            let score = sigmoid(logit);
            if score < min_score {
                return None;
            }
            let cx = anchor[0] + reg[0] / scale;
            let cy = anchor[1] + reg[1] / scale;
            let (half_w, half_h) = (reg[2] / scale / 2.0, reg[3] / scale / 2.0);
            Some(RawDet {
                x1: f64::from(cx - half_w),
                y1: f64::from(cy - half_h),
                x2: f64::from(cx + half_w),
                y2: f64::from(cy + half_h),
                score: f64::from(score),
            })
        })
        .collect()
}

/// A candidate box in relative corner form.
#[derive(Clone, Debug)]
struct RawDet {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    score: f64,
}

impl RawDet {
    fn to_relative(&self) -> RelativeBox {
        RelativeBox::new(self.x1, self.y1, self.x2 - self.x1, self.y2 - self.y1)
    }

    fn area(&self) -> f64 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }
}

/// Greedy non-maximum suppression, highest score first.
fn nms(mut candidates: Vec<RawDet>, iou_thresh: f64) -> Vec<RawDet> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut kept: Vec<RawDet> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if kept.iter().all(|k| bbox_iou(k, &candidate) <= iou_thresh) {
            kept.push(candidate);
        }
    }
    kept
}

fn bbox_iou(a: &RawDet, b: &RawDet) -> f64 {
    let overlap = RawDet {
        x1: a.x1.max(b.x1),
        y1: a.y1.max(b.y1),
        x2: a.x2.min(b.x2),
        y2: a.y2.min(b.y2),
        score: 0.0,
    };
    let inter = overlap.area();
    if inter <= 0.0 {
        return 0.0;
    }
    inter / (a.area() + b.area() - inter)
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
