use crate::classification::domain::face_classifier::FaceAttributes;
use crate::shared::constants::LABEL_MARGIN;
use crate::shared::region::PixelRect;

/// Annotation text and the top-left pixel it is drawn at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Label {
    pub text: String,
    pub x: u32,
    pub y: u32,
}

impl Label {
    /// `"Age: 25-32, Gender: Female"`, with `", Hair: dark"` appended when a
    /// hair guess is present.
    pub fn compose(attrs: &FaceAttributes) -> String {
        let mut text = format!("Age: {}, Gender: {}", attrs.age, attrs.gender);
        if let Some(hair) = attrs.hair {
            text.push_str(&format!(", Hair: {hair}"));
        }
        text
    }

    /// Places text of the given rendered size above `rect`.
    ///
    /// The label sits `LABEL_MARGIN` px above the box. If that would leave
    /// the frame it drops inside the box instead, and it is finally clamped
    /// so it starts within the frame.
    pub fn place(
        text: String,
        text_size: (u32, u32),
        rect: &PixelRect,
        frame_width: u32,
        frame_height: u32,
    ) -> Self {
        let (text_w, text_h) = text_size;

        let y = match rect.y_min.checked_sub(LABEL_MARGIN + text_h) {
            Some(above) => above,
            None => rect.y_min + LABEL_MARGIN,
        };
        let y = y.min(frame_height.saturating_sub(text_h));
        let x = rect.x_min.min(frame_width.saturating_sub(text_w));

        Self { text, x, y }
    }
}
