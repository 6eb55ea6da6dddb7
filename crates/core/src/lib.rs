//! Per-frame face anonymization and annotation for video files.
//!
//! Each bounded context is split into `domain` (traits and pure logic) and
//! `infrastructure` (ONNX, ffmpeg and drawing backends). [`pipeline`] ties
//! them together.

pub mod classification;
pub mod detection;
pub mod effects;
pub mod pipeline;
pub mod shared;
pub mod video;
