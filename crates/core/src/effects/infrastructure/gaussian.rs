//! Separable Gaussian blur over packed 3-channel pixel buffers.

use crate::shared::frame::CHANNELS;

/// Kernels at or above this size are applied to an area-downscaled copy.
const DOWNSCALE_KERNEL_STEP: usize = 50;

/// Sigma for a `kernel_size` tap kernel when no sigma is given
/// (`0.3 * ((k - 1) * 0.5 - 1) + 0.8`).
pub fn default_sigma(kernel_size: usize) -> f64 {
    0.3 * ((kernel_size as f64 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalized 1D Gaussian weights. `kernel_size` must be odd and >= 1.
pub fn gaussian_kernel_1d(kernel_size: usize) -> Vec<f32> {
    debug_assert!(kernel_size >= 1 && kernel_size % 2 == 1);
    let sigma = default_sigma(kernel_size);
    let half = (kernel_size / 2) as f64;
    let weights: Vec<f64> = (0..kernel_size)
        .map(|i| {
            let x = i as f64 - half;
            (-x * x / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = weights.iter().sum();
    weights.iter().map(|&w| (w / sum) as f32).collect()
}

/// A prepared blur: full-size and downscaled kernels plus scratch space
/// reused between calls.
pub struct GaussianBlur {
    kernel: Vec<f32>,
    small_kernel: Vec<f32>,
    scale: usize,
    temp: Vec<f32>,
}

impl GaussianBlur {
    pub fn new(kernel_size: usize) -> Self {
        let scale = (kernel_size / DOWNSCALE_KERNEL_STEP).max(1);
        let small_size = (kernel_size / scale) | 1;
        Self {
            kernel: gaussian_kernel_1d(kernel_size),
            small_kernel: gaussian_kernel_1d(small_size),
            scale,
            temp: Vec::new(),
        }
    }

    pub fn kernel_size(&self) -> usize {
        self.kernel.len()
    }

    pub fn scale(&self) -> usize {
        self.scale
    }

    /// Blurs a packed `width × height × 3` buffer in place.
    ///
    /// Large kernels run on a copy shrunk by `scale` and are bilinearly
    /// stretched back, unless the buffer is too small to shrink.
    pub fn apply(&mut self, data: &mut [u8], width: usize, height: usize) {
        if width == 0 || height == 0 {
            return;
        }
        if self.scale <= 1 || width < self.scale * 2 || height < self.scale * 2 {
            blur_with_kernel(data, width, height, &self.kernel, &mut self.temp);
            return;
        }

        let (mut small, sw, sh) = downscale(data, width, height, self.scale);
        blur_with_kernel(&mut small, sw, sh, &self.small_kernel, &mut self.temp);
        let restored = upscale(&small, sw, sh, width, height);
        data.copy_from_slice(&restored);
    }
}

/// Horizontal then vertical pass with replicated borders.
fn blur_with_kernel(data: &mut [u8], width: usize, height: usize, kernel: &[f32], temp: &mut Vec<f32>) {
    let taps = kernel.len();
    if taps <= 1 {
        return;
    }
    let half = (taps / 2) as isize;
    temp.resize(width * height * CHANNELS, 0.0);

    for y in 0..height {
        for x in 0..width {
            for c in 0..CHANNELS {
                let mut acc = 0.0f32;
                for (k, &w) in kernel.iter().enumerate() {
                    let sx = (x as isize + k as isize - half).clamp(0, width as isize - 1) as usize;
                    acc += data[(y * width + sx) * CHANNELS + c] as f32 * w;
                }
                temp[(y * width + x) * CHANNELS + c] = acc;
            }
        }
    }

    for y in 0..height {
        for x in 0..width {
            for c in 0..CHANNELS {
                let mut acc = 0.0f32;
                for (k, &w) in kernel.iter().enumerate() {
                    let sy = (y as isize + k as isize - half).clamp(0, height as isize - 1) as usize;
                    acc += temp[(sy * width + x) * CHANNELS + c] * w;
                }
                data[(y * width + x) * CHANNELS + c] = acc.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}

/// Area-average shrink by an integer factor.
fn downscale(data: &[u8], width: usize, height: usize, scale: usize) -> (Vec<u8>, usize, usize) {
    let sw = width / scale;
    let sh = height / scale;
    let mut out = vec![0u8; sw * sh * CHANNELS];
    let count = (scale * scale) as u32;

    for y in 0..sh {
        for x in 0..sw {
            for c in 0..CHANNELS {
                let mut sum = 0u32;
                for dy in 0..scale {
                    let row = (y * scale + dy) * width;
                    for dx in 0..scale {
                        sum += data[(row + x * scale + dx) * CHANNELS + c] as u32;
                    }
                }
                out[(y * sw + x) * CHANNELS + c] = (sum / count) as u8;
            }
        }
    }

    (out, sw, sh)
}

/// Bilinear stretch to `target_w × target_h`.
fn upscale(data: &[u8], width: usize, height: usize, target_w: usize, target_h: usize) -> Vec<u8> {
    let mut out = vec![0u8; target_w * target_h * CHANNELS];
    let x_ratio = (width as f32 - 1.0) / (target_w as f32 - 1.0).max(1.0);
    let y_ratio = (height as f32 - 1.0) / (target_h as f32 - 1.0).max(1.0);

    for y in 0..target_h {
        let src_y = y as f32 * y_ratio;
        let y0 = (src_y.floor() as usize).min(height - 1);
        let y1 = (y0 + 1).min(height - 1);
        let fy = src_y - y0 as f32;
        for x in 0..target_w {
            let src_x = x as f32 * x_ratio;
            let x0 = (src_x.floor() as usize).min(width - 1);
            let x1 = (x0 + 1).min(width - 1);
            let fx = src_x - x0 as f32;

            for c in 0..CHANNELS {
                let at = |xx: usize, yy: usize| data[(yy * width + xx) * CHANNELS + c] as f32;
                let top = at(x0, y0) * (1.0 - fx) + at(x1, y0) * fx;
                let bottom = at(x0, y1) * (1.0 - fx) + at(x1, y1) * fx;
                let v = top * (1.0 - fy) + bottom * fy;
                out[(y * target_w + x) * CHANNELS + c] = v.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    out
}
