use ndarray::{ArrayView3, ArrayViewMut3};

use crate::shared::region::PixelRect;

/// Channel ordering of a 3-channel 8-bit frame.
///
/// Frames are decoded as `Bgr`, which is also the ordering the writer
/// expects. Detectors declare the ordering they want and receive a
/// converted copy when it differs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Bgr,
    Rgb,
}

impl PixelFormat {
    pub fn swapped(self) -> Self {
        match self {
            PixelFormat::Bgr => PixelFormat::Rgb,
            PixelFormat::Rgb => PixelFormat::Bgr,
        }
    }
}

/// A single video frame: contiguous 3-channel bytes in row-major order.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    format: PixelFormat,
    index: usize,
}

pub const CHANNELS: usize = 3;

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, format: PixelFormat, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * CHANNELS,
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
            format,
            index,
        }
    }

    /// A frame filled with one color, given in the frame's own channel order.
    pub fn filled(width: u32, height: u32, format: PixelFormat, pixel: [u8; 3], index: usize) -> Self {
        let data = pixel
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * CHANNELS)
            .collect();
        Self::new(data, width, height, format, index)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = (y as usize * self.width as usize + x as usize) * CHANNELS;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Swaps the first and third channel of every pixel in place and
    /// retags the frame. Applying it twice restores the original bytes.
    pub fn convert_in_place(&mut self, format: PixelFormat) {
        if format == self.format {
            return;
        }
        for px in self.data.chunks_exact_mut(CHANNELS) {
            px.swap(0, 2);
        }
        self.format = format;
    }

    /// Returns a copy in the requested channel order, leaving `self` as is.
    pub fn to_format(&self, format: PixelFormat) -> Frame {
        let mut out = self.clone();
        out.convert_in_place(format);
        out
    }

    /// Copies the pixels addressed by `rect` into a new frame.
    ///
    /// `rect` must lie inside the frame; a degenerate rect yields an empty
    /// frame.
    pub fn crop(&self, rect: &PixelRect) -> Frame {
        let w = rect.width() as usize;
        let h = rect.height() as usize;
        let fw = self.width as usize;
        let mut out = Vec::with_capacity(w * h * CHANNELS);
        for row in 0..h {
            let start = ((rect.y_min as usize + row) * fw + rect.x_min as usize) * CHANNELS;
            out.extend_from_slice(&self.data[start..start + w * CHANNELS]);
        }
        Frame::new(out, w as u32, h as u32, self.format, self.index)
    }

    /// Writes `patch` back at the top-left corner of `rect`.
    ///
    /// The patch must have the rect's dimensions and this frame's format.
    pub fn paste(&mut self, rect: &PixelRect, patch: &Frame) {
        debug_assert_eq!(patch.width(), rect.width());
        debug_assert_eq!(patch.height(), rect.height());
        debug_assert_eq!(patch.format(), self.format);
        let w = rect.width() as usize;
        let fw = self.width as usize;
        for row in 0..rect.height() as usize {
            let dst = ((rect.y_min as usize + row) * fw + rect.x_min as usize) * CHANNELS;
            let src = row * w * CHANNELS;
            self.data[dst..dst + w * CHANNELS]
                .copy_from_slice(&patch.data[src..src + w * CHANNELS]);
        }
    }

    /// Mean over every byte of the frame; 0.0 for an empty frame.
    pub fn mean_intensity(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        let sum: u64 = self.data.iter().map(|&b| b as u64).sum();
        sum as f64 / self.data.len() as f64
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        ArrayViewMut3::from_shape(self.shape(), &mut self.data)
            .expect("Frame data length must match dimensions")
    }

    pub(crate) fn take_data(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.data)
    }

    pub(crate) fn restore_data(&mut self, data: Vec<u8>) {
        debug_assert_eq!(data.len(), self.width as usize * self.height as usize * CHANNELS);
        self.data = data;
    }

    fn shape(&self) -> (usize, usize, usize) {
        (self.height as usize, self.width as usize, CHANNELS)
    }
}
