use crate::effects::domain::region_effect::RegionEffect;
use crate::shared::frame::Frame;
use crate::shared::region::PixelRect;

use super::gaussian::GaussianBlur;

/// Largest kernel actually built; larger requests are capped.
pub const MAX_KERNEL_SIZE: usize = 1001;

/// Maps any requested intensity to an odd kernel size >= 1.
///
/// `floor(level / 2) * 2 + 1`, with floor division, so even levels round
/// up and negative levels collapse to 1.
pub fn sanitize_kernel_size(level: i64) -> usize {
    let k = level.div_euclid(2).saturating_mul(2).saturating_add(1);
    k.max(1) as usize
}

/// Irreversibly blurs each region with a square Gaussian kernel.
pub struct Anonymizer {
    blur: GaussianBlur,
}

impl Anonymizer {
    pub fn new(blur_level: i64) -> Self {
        let requested = sanitize_kernel_size(blur_level);
        let kernel_size = requested.min(MAX_KERNEL_SIZE);
        if kernel_size < requested {
            log::warn!("Blur kernel {requested} capped at {kernel_size}");
        }
        log::info!("Anonymizer: blur level {blur_level} -> kernel {kernel_size}");
        Self {
            blur: GaussianBlur::new(kernel_size),
        }
    }

    pub fn kernel_size(&self) -> usize {
        self.blur.kernel_size()
    }
}

impl RegionEffect for Anonymizer {
    fn apply(&mut self, frame: &mut Frame, rect: &PixelRect) -> Result<(), Box<dyn std::error::Error>> {
        if rect.is_degenerate() {
            return Ok(());
        }
        let mut roi = frame.crop(rect);
        let (w, h) = (roi.width() as usize, roi.height() as usize);
        self.blur.apply(roi.data_mut(), w, h);
        frame.paste(rect, &roi);
        Ok(())
    }
}
