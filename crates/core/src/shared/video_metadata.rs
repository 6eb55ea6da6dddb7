use std::path::PathBuf;

/// A frame rate as the container states it, e.g. 30000/1001 for NTSC.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameRate {
    pub num: i32,
    pub den: i32,
}

impl FrameRate {
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /// Both terms positive.
    pub fn is_valid(&self) -> bool {
        self.num > 0 && self.den > 0
    }

    /// Frames per second; 0.0 for an invalid rate.
    pub fn as_f64(&self) -> f64 {
        if self.is_valid() {
            f64::from(self.num) / f64::from(self.den)
        } else {
            0.0
        }
    }
}

/// Stream parameters captured when an input is opened. The output stream is
/// created from the same values so resolution and frame rate match exactly.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub frame_rate: FrameRate,
    /// Frame count reported by the container; 0 when unknown.
    pub total_frames: usize,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    pub fn fps(&self) -> f64 {
        self.frame_rate.as_f64()
    }

    pub fn total_frames_known(&self) -> Option<usize> {
        (self.total_frames > 0).then_some(self.total_frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn metadata(total_frames: usize) -> VideoMetadata {
        VideoMetadata {
            width: 640,
            height: 480,
            frame_rate: FrameRate::new(30, 1),
            total_frames,
            codec: "mpeg4".to_string(),
            source_path: Some(PathBuf::from("/tmp/in.mp4")),
        }
    }

    #[test]
    fn test_construction() {
        let meta = metadata(300);
        assert_eq!(meta.width, 640);
        assert_eq!(meta.height, 480);
        assert_eq!(meta.fps(), 30.0);
        assert_eq!(meta.codec, "mpeg4");
        assert_eq!(meta.source_path, Some(PathBuf::from("/tmp/in.mp4")));
    }

    #[test]
    fn test_total_frames_known() {
        assert_eq!(metadata(300).total_frames_known(), Some(300));
        assert_eq!(metadata(0).total_frames_known(), None);
    }

    #[test]
    fn test_ntsc_rate_is_not_rounded() {
        assert_relative_eq!(FrameRate::new(30000, 1001).as_f64(), 29.97, epsilon = 1e-3);
    }

    #[rstest]
    #[case(0, 1)]
    #[case(25, 0)]
    #[case(-30, 1)]
    fn test_invalid_rate_reads_as_zero(#[case] num: i32, #[case] den: i32) {
        let rate = FrameRate::new(num, den);
        assert!(!rate.is_valid());
        assert_eq!(rate.as_f64(), 0.0);
    }
}
