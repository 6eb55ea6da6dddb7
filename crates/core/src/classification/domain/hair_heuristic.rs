use crate::classification::domain::face_classifier::HairGuess;
use crate::shared::constants::HAIR_DARK_THRESHOLD;
use crate::shared::frame::Frame;

/// Guesses hair tone from the mean brightness of the whole crop.
///
/// Mean over all channels below the threshold is `Dark`. The crop includes
/// skin and background, so this tracks overall exposure as much as hair.
pub fn guess_hair(crop: &Frame) -> HairGuess {
    if crop.mean_intensity() < HAIR_DARK_THRESHOLD {
        HairGuess::Dark
    } else {
        HairGuess::Light
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::frame::PixelFormat;
    use rstest::rstest;

    #[rstest]
    #[case::black([0, 0, 0], HairGuess::Dark)]
    #[case::just_below([99, 99, 99], HairGuess::Dark)]
    #[case::at_threshold([100, 100, 100], HairGuess::Light)]
    #[case::mixed_mean_100([50, 100, 150], HairGuess::Light)]
    #[case::white([255, 255, 255], HairGuess::Light)]
    fn test_guess_hair(#[case] pixel: [u8; 3], #[case] expected: HairGuess) {
        let crop = Frame::filled(8, 8, PixelFormat::Bgr, pixel, 0);
        assert_eq!(guess_hair(&crop), expected);
    }

    #[test]
    fn test_empty_crop_is_dark() {
        let crop = Frame::new(Vec::new(), 0, 0, PixelFormat::Bgr, 0);
        assert_eq!(guess_hair(&crop), HairGuess::Dark);
    }
}
