pub const DETECTOR_MODEL_NAME: &str = "blazeface.onnx";
pub const AGE_MODEL_NAME: &str = "age_net.onnx";
pub const GENDER_MODEL_NAME: &str = "gender_net.onnx";
pub const LABEL_FONT_NAME: &str = "DejaVuSans.ttf";

/// Requested blur intensity; sanitized to an odd kernel of 31.
pub const DEFAULT_BLUR_LEVEL: i64 = 30;

pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Frames between progress reports.
pub const PROGRESS_INTERVAL: usize = 30;

/// Mean crop brightness below which hair is guessed to be dark.
pub const HAIR_DARK_THRESHOLD: f64 = 100.0;

/// Vertical gap between a face box and its label.
pub const LABEL_MARGIN: u32 = 10;

pub const LABEL_FONT_SIZE: f32 = 20.0;

pub const ANNOTATION_COLOR: [u8; 3] = [0, 255, 0];

pub const APP_DIR_NAME: &str = "FaceCloak";
