//! Age and gender classification with two Caffe-derived ONNX networks.
//!
//! Both networks take the same blob: the crop resized to 227×227 in BGR
//! order with a fixed per-channel mean subtracted, NCHW float32, no
//! scaling.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::classification::domain::face_classifier::{
    AgeBucket, FaceAttributes, FaceClassifier, Gender,
};
use crate::classification::domain::hair_heuristic::guess_hair;
use crate::detection::infrastructure::execution_provider::build_session;
use crate::shared::frame::{Frame, PixelFormat};

const INPUT_SIZE: u32 = 227;

/// Per-channel means in B, G, R order.
const MEAN_BGR: [f32; 3] = [78.426_338, 87.768_914, 114.895_85];

pub struct OnnxAgeGenderClassifier {
    age_session: ort::session::Session,
    gender_session: ort::session::Session,
    hair_guess: bool,
}

impl OnnxAgeGenderClassifier {
    pub fn new(age_model: &Path, gender_model: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let age_session = build_session(age_model)?;
        let gender_session = build_session(gender_model)?;
        log::info!(
            "Loaded age model {} and gender model {}",
            age_model.display(),
            gender_model.display()
        );
        Ok(Self {
            age_session,
            gender_session,
            hair_guess: false,
        })
    }

    /// Adds the brightness-based hair guess to every result.
    pub fn with_hair_guess(mut self, enabled: bool) -> Self {
        self.hair_guess = enabled;
        self
    }
}

impl FaceClassifier for OnnxAgeGenderClassifier {
    fn classify(&mut self, crop: &Frame) -> Result<FaceAttributes, Box<dyn std::error::Error>> {
        let blob = preprocess(crop, INPUT_SIZE)?;

        let age_scores = run_scores(&mut self.age_session, blob.clone())?;
        let age = AgeBucket::from_scores(&age_scores).ok_or_else(|| {
            format!(
                "age model returned {} scores, expected {}",
                age_scores.len(),
                AgeBucket::ALL.len()
            )
        })?;

        let gender_scores = run_scores(&mut self.gender_session, blob)?;
        let gender = Gender::from_scores(&gender_scores).ok_or_else(|| {
            format!(
                "gender model returned {} scores, expected {}",
                gender_scores.len(),
                Gender::ALL.len()
            )
        })?;

        let hair = self.hair_guess.then(|| guess_hair(crop));
        Ok(FaceAttributes { age, gender, hair })
    }
}

fn run_scores(
    session: &mut ort::session::Session,
    blob: ndarray::Array4<f32>,
) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
    let input = ort::value::Tensor::from_array(blob)?;
    let outputs = session.run(ort::inputs![input])?;
    if outputs.len() < 1 {
        return Err("classifier produced no outputs".into());
    }
    let scores = outputs[0].try_extract_array::<f32>()?;
    Ok(scores.iter().copied().collect())
}

/// Builds the mean-subtracted BGR NCHW blob for a crop of either channel
/// order.
fn preprocess(crop: &Frame, size: u32) -> Result<ndarray::Array4<f32>, Box<dyn std::error::Error>> {
    if crop.width() == 0 || crop.height() == 0 {
        return Err(format!("cannot classify an empty {}x{} crop", crop.width(), crop.height()).into());
    }
    // The resize is channel-agnostic; RgbImage is only a container here.
    let packed = RgbImage::from_raw(crop.width(), crop.height(), crop.data().to_vec())
        .ok_or("crop buffer does not match its dimensions")?;
    let resized = imageops::resize(&packed, size, size, FilterType::Triangle);

    // Source channel feeding each BGR plane.
    let order = match crop.format() {
        PixelFormat::Bgr => [0, 1, 2],
        PixelFormat::Rgb => [2, 1, 0],
    };

    let s = size as usize;
    let mut blob = ndarray::Array4::<f32>::zeros((1, 3, s, s));
    for (x, y, px) in resized.enumerate_pixels() {
        for (plane, &src) in order.iter().enumerate() {
            blob[[0, plane, y as usize, x as usize]] = px.0[src] as f32 - MEAN_BGR[plane];
        }
    }
    Ok(blob)
}
