use std::time::Instant;

use crate::detection::domain::face_detector::FaceDetector;
use crate::effects::domain::region_effect::RegionEffect;
use crate::shared::frame::Frame;
use crate::shared::region::normalize;

/// What happened to one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameOutcome {
    /// Boxes the detector returned.
    pub detections: usize,
    /// Regions the effect was applied to.
    pub applied: usize,
    /// Boxes that normalized to an empty rect.
    pub skipped: usize,
    pub detect_ms: f64,
    pub effect_ms: f64,
}

/// Runs detection and the region effect over a single frame.
#[derive(Debug, Default)]
pub struct FrameProcessor;

impl FrameProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Detects faces in `frame` and applies `effect` to each one in place.
    ///
    /// When the detector wants a different channel order it gets a
    /// converted copy; `frame` itself keeps its ordering. Boxes that clip
    /// to nothing are skipped.
    pub fn process(
        &self,
        frame: &mut Frame,
        detector: &mut dyn FaceDetector,
        effect: &mut dyn RegionEffect,
    ) -> Result<FrameOutcome, Box<dyn std::error::Error>> {
        let t0 = Instant::now();
        let wanted = detector.pixel_format();
        let boxes = if wanted == frame.format() {
            detector.detect(frame)?
        } else {
            detector.detect(&frame.to_format(wanted))?
        };
        let detect_ms = t0.elapsed().as_secs_f64() * 1000.0;

        let mut outcome = FrameOutcome {
            detections: boxes.len(),
            detect_ms,
            ..FrameOutcome::default()
        };

        let t1 = Instant::now();
        let (width, height) = (frame.width(), frame.height());
        for b in &boxes {
            let rect = normalize(b, width, height);
            if rect.is_degenerate() {
                log::debug!("Frame {}: skipping empty region from {b:?}", frame.index());
                outcome.skipped += 1;
                continue;
            }
            effect.apply(frame, &rect)?;
            outcome.applied += 1;
        }
        outcome.effect_ms = t1.elapsed().as_secs_f64() * 1000.0;

        Ok(outcome)
    }
}
