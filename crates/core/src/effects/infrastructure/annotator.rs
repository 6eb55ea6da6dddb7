use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{ImageBuffer, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

use crate::classification::domain::face_classifier::FaceClassifier;
use crate::effects::domain::label::Label;
use crate::effects::domain::region_effect::RegionEffect;
use crate::shared::constants::{ANNOTATION_COLOR, LABEL_FONT_SIZE};
use crate::shared::frame::Frame;
use crate::shared::region::PixelRect;

/// Outline thickness in pixels, drawn inward from the rect edge.
const BOX_THICKNESS: u32 = 2;

/// DejaVu Sans, compiled in so labels render without any font on disk.
const BUNDLED_FONT: &[u8] = include_bytes!("../../../assets/DejaVuSans.ttf");

/// The font used when none is configured or found.
pub fn bundled_font() -> Result<FontVec, Box<dyn std::error::Error>> {
    let font = FontVec::try_from_vec(BUNDLED_FONT.to_vec())
        .map_err(|e| format!("bundled label font is invalid: {e}"))?;
    Ok(font)
}

/// Reads a TrueType/OpenType font for label rendering.
pub fn load_font(path: &Path) -> Result<FontVec, Box<dyn std::error::Error>> {
    let bytes = std::fs::read(path)
        .map_err(|e| format!("failed to read font {}: {e}", path.display()))?;
    let font = FontVec::try_from_vec(bytes)
        .map_err(|e| format!("invalid font {}: {e}", path.display()))?;
    Ok(font)
}

/// Classifies each face and draws a green box with an attribute label.
pub struct Annotator {
    classifier: Box<dyn FaceClassifier>,
    font: FontVec,
    scale: PxScale,
}

impl Annotator {
    pub fn new(classifier: Box<dyn FaceClassifier>, font: FontVec) -> Self {
        Self {
            classifier,
            font,
            scale: PxScale::from(LABEL_FONT_SIZE),
        }
    }
}

impl RegionEffect for Annotator {
    fn apply(&mut self, frame: &mut Frame, rect: &PixelRect) -> Result<(), Box<dyn std::error::Error>> {
        if rect.is_degenerate() {
            return Ok(());
        }

        let crop = frame.crop(rect);
        let attrs = self.classifier.classify(&crop)?;
        let text = Label::compose(&attrs);

        let (fw, fh) = (frame.width(), frame.height());
        let mut img: RgbImage = ImageBuffer::from_raw(fw, fh, frame.take_data())
            .ok_or("frame buffer does not match its dimensions")?;
        let color = Rgb(ANNOTATION_COLOR);

        for inset in 0..BOX_THICKNESS {
            let w = rect.width().saturating_sub(2 * inset);
            let h = rect.height().saturating_sub(2 * inset);
            if w == 0 || h == 0 {
                break;
            }
            let outline = Rect::at((rect.x_min + inset) as i32, (rect.y_min + inset) as i32)
                .of_size(w, h);
            draw_hollow_rect_mut(&mut img, outline, color);
        }

        let size = text_size(self.scale, &self.font, &text);
        let label = Label::place(text, size, rect, fw, fh);
        log::debug!("Frame {}: {} at ({}, {})", frame.index(), label.text, label.x, label.y);
        draw_text_mut(
            &mut img,
            color,
            label.x as i32,
            label.y as i32,
            self.scale,
            &self.font,
            &label.text,
        );

        frame.restore_data(img.into_raw());
        Ok(())
    }
}
