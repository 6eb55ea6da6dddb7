/// A detector-supplied face box in fractional frame coordinates.
///
/// Components are nominally in `[0, 1]`, but detectors emit slightly
/// negative offsets or overhanging widths near frame edges, so nothing here
/// is trusted until it goes through [`normalize`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RelativeBox {
    pub x_min: f64,
    pub y_min: f64,
    pub width: f64,
    pub height: f64,
}

impl RelativeBox {
    pub fn new(x_min: f64, y_min: f64, width: f64, height: f64) -> Self {
        Self {
            x_min,
            y_min,
            width,
            height,
        }
    }
}

/// An integer pixel rectangle, clipped to its frame.
///
/// Invariant: `x_min <= x_max <= frame_width` and `y_min <= y_max <=
/// frame_height`. Max coordinates are exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub x_min: u32,
    pub y_min: u32,
    pub x_max: u32,
    pub y_max: u32,
}

impl PixelRect {
    pub fn new(x_min: u32, y_min: u32, x_max: u32, y_max: u32) -> Self {
        debug_assert!(x_min <= x_max && y_min <= y_max);
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    pub fn width(&self) -> u32 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> u32 {
        self.y_max - self.y_min
    }

    /// Zero-area rects denote "nothing to process".
    pub fn is_degenerate(&self) -> bool {
        self.x_min == self.x_max || self.y_min == self.y_max
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x_min && x < self.x_max && y >= self.y_min && y < self.y_max
    }
}

/// Converts a relative box into a pixel rect clipped to the frame.
///
/// The max edge is derived from the *unclamped* min edge plus the rounded
/// extent, then both edges are clamped. A box that ends up inverted or
/// entirely outside the frame collapses to a degenerate rect instead of
/// failing.
pub fn normalize(b: &RelativeBox, frame_width: u32, frame_height: u32) -> PixelRect {
    let (x_min, x_max) = clip_span(b.x_min, b.width, frame_width);
    let (y_min, y_max) = clip_span(b.y_min, b.height, frame_height);
    PixelRect {
        x_min,
        y_min,
        x_max,
        y_max,
    }
}

fn clip_span(start: f64, extent: f64, limit: u32) -> (u32, u32) {
    let limit_f = limit as f64;
    // `as i64` saturates and maps NaN to 0.
    let lo = (start * limit_f).round() as i64;
    let hi = lo.saturating_add((extent * limit_f).round() as i64);

    let lo = lo.clamp(0, limit as i64);
    let hi = hi.min(limit as i64).max(lo);
    (lo as u32, hi as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_centered_box_at_vga() {
        let rect = normalize(&RelativeBox::new(0.25, 0.25, 0.5, 0.5), 640, 480);
        assert_eq!(rect, PixelRect::new(160, 120, 480, 360));
        assert!(!rect.is_degenerate());
    }

    #[test]
    fn test_right_edge_overhang_is_clamped() {
        let rect = normalize(&RelativeBox::new(0.95, 0.1, 0.2, 0.2), 100, 100);
        assert_eq!(rect.x_min, 95);
        assert_eq!(rect.x_max, 100);
    }

    #[test]
    fn test_negative_offset_clamps_min_but_keeps_extent_from_unclamped_start() {
        // -0.1 * 200 = -20, extent 0.3 * 200 = 60 -> [-20, 40) -> [0, 40)
        let rect = normalize(&RelativeBox::new(-0.1, 0.0, 0.3, 0.5), 200, 100);
        assert_eq!(rect.x_min, 0);
        assert_eq!(rect.x_max, 40);
        assert_eq!(rect.y_max, 50);
    }

    #[test]
    fn test_box_entirely_left_of_frame_is_degenerate() {
        let rect = normalize(&RelativeBox::new(-0.5, 0.2, 0.2, 0.2), 100, 100);
        assert!(rect.is_degenerate());
        assert_eq!(rect.x_min, 0);
        assert_eq!(rect.x_max, 0);
    }

    #[test]
    fn test_box_starting_past_right_edge_is_degenerate_and_in_bounds() {
        let rect = normalize(&RelativeBox::new(1.2, 0.2, 0.3, 0.2), 100, 100);
        assert!(rect.is_degenerate());
        assert_eq!(rect.x_min, 100);
        assert_eq!(rect.x_max, 100);
    }

    #[test]
    fn test_zero_extent_is_degenerate() {
        let rect = normalize(&RelativeBox::new(0.5, 0.5, 0.0, 0.3), 100, 100);
        assert!(rect.is_degenerate());
    }

    #[test]
    fn test_negative_extent_collapses() {
        let rect = normalize(&RelativeBox::new(0.5, 0.5, -0.2, 0.3), 100, 100);
        assert!(rect.is_degenerate());
        assert_eq!(rect.x_min, 50);
        assert_eq!(rect.x_max, 50);
    }

    #[rstest]
    #[case::nan_start(f64::NAN, 0.5)]
    #[case::nan_extent(0.2, f64::NAN)]
    #[case::inf_extent(0.2, f64::INFINITY)]
    #[case::neg_inf_start(f64::NEG_INFINITY, 0.5)]
    fn test_non_finite_components_stay_in_bounds(#[case] start: f64, #[case] extent: f64) {
        let rect = normalize(&RelativeBox::new(start, start, extent, extent), 64, 48);
        assert!(rect.x_min <= rect.x_max && rect.x_max <= 64);
        assert!(rect.y_min <= rect.y_max && rect.y_max <= 48);
    }

    #[test]
    fn test_invariant_holds_over_unit_grid() {
        let steps: Vec<f64> = (0..=10).map(|i| i as f64 / 10.0).collect();
        for &(w, h) in &[(1u32, 1u32), (7, 3), (640, 480), (1920, 1080)] {
            for &x in &steps {
                for &y in &steps {
                    for &bw in &steps {
                        for &bh in &steps {
                            let r = normalize(&RelativeBox::new(x, y, bw, bh), w, h);
                            assert!(r.x_min <= r.x_max && r.x_max <= w, "{r:?} at {w}x{h}");
                            assert!(r.y_min <= r.y_max && r.y_max <= h, "{r:?} at {w}x{h}");
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_rect_accessors() {
        let r = PixelRect::new(10, 20, 30, 60);
        assert_eq!(r.width(), 20);
        assert_eq!(r.height(), 40);
        assert!(r.contains(10, 20));
        assert!(r.contains(29, 59));
        assert!(!r.contains(30, 20));
        assert!(!r.contains(10, 60));
    }

    #[rstest]
    #[case::zero_width(PixelRect::new(5, 5, 5, 10), true)]
    #[case::zero_height(PixelRect::new(5, 5, 10, 5), true)]
    #[case::unit(PixelRect::new(5, 5, 6, 6), false)]
    fn test_is_degenerate(#[case] rect: PixelRect, #[case] expected: bool) {
        assert_eq!(rect.is_degenerate(), expected);
    }
}
