use std::path::Path;

use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling;

use crate::shared::frame::{Frame, PixelFormat, CHANNELS};
use crate::shared::video_metadata::{FrameRate, VideoMetadata};
use crate::video::domain::video_writer::VideoWriter;

/// Frame rate used when the source reports none.
const FALLBACK_RATE: FrameRate = FrameRate::new(30, 1);

/// Encodes BGR frames to MPEG-4 Part 2 (YUV420P) via ffmpeg-next. The
/// container is picked from the output file extension.
pub struct FfmpegWriter {
    octx: Option<ffmpeg_next::format::context::Output>,
    encoder: Option<ffmpeg_next::codec::encoder::video::Encoder>,
    scaler: Option<scaling::Context>,
    width: u32,
    height: u32,
    /// Encoder time base, one tick per frame.
    time_base: ffmpeg_next::Rational,
    frame_count: usize,
}

// Safety: FfmpegWriter is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegWriter {}

impl FfmpegWriter {
    pub fn new() -> Self {
        Self {
            octx: None,
            encoder: None,
            scaler: None,
            width: 0,
            height: 0,
            time_base: ffmpeg_next::Rational(FALLBACK_RATE.den, FALLBACK_RATE.num),
            frame_count: 0,
        }
    }

    /// Writes every packet the encoder has ready.
    fn drain_packets(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let (Some(encoder), Some(octx)) = (self.encoder.as_mut(), self.octx.as_mut()) else {
            return Err("FfmpegWriter: not opened".into());
        };
        let ost_time_base = octx.stream(0).ok_or("FfmpegWriter: no output stream")?.time_base();

        let mut encoded = ffmpeg_next::Packet::empty();
        while encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(0);
            encoded.rescale_ts(self.time_base, ost_time_base);
            encoded.write_interleaved(octx)?;
        }
        Ok(())
    }
}

impl Default for FfmpegWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// The source rate, kept exact so fractional rates like 30000/1001 survive.
fn encoder_rate(rate: FrameRate) -> ffmpeg_next::Rational {
    let rate = if rate.is_valid() { rate } else { FALLBACK_RATE };
    ffmpeg_next::Rational(rate.num, rate.den)
}

impl VideoWriter for FfmpegWriter {
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let rate = encoder_rate(metadata.frame_rate);
        let time_base = rate.invert();
        let mut octx = ffmpeg_next::format::output(path)?;

        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4)
            .ok_or("MPEG4 encoder not found")?;
        let mut ost = octx.add_stream(Some(codec))?;

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;
        encoder_ctx.set_width(metadata.width);
        encoder_ctx.set_height(metadata.height);
        encoder_ctx.set_format(Pixel::YUV420P);
        encoder_ctx.set_time_base(time_base);
        encoder_ctx.set_frame_rate(Some(rate));
        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder_ctx.open_with(ffmpeg_next::Dictionary::new())?;
        ost.set_parameters(&encoder);
        ost.set_time_base(time_base);
        ost.set_avg_frame_rate(rate);
        octx.write_header()?;

        let scaler = scaling::Context::get(
            Pixel::BGR24,
            metadata.width,
            metadata.height,
            Pixel::YUV420P,
            metadata.width,
            metadata.height,
            scaling::Flags::BILINEAR,
        )?;

        log::debug!(
            "Writing {}: {}x{} @ {}/{} fps, mpeg4",
            path.display(),
            metadata.width,
            metadata.height,
            rate.numerator(),
            rate.denominator()
        );

        self.octx = Some(octx);
        self.encoder = Some(encoder);
        self.scaler = Some(scaler);
        self.width = metadata.width;
        self.height = metadata.height;
        self.time_base = time_base;
        self.frame_count = 0;
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if self.encoder.is_none() {
            return Err("FfmpegWriter: not opened".into());
        }
        if frame.width() != self.width || frame.height() != self.height {
            return Err(format!(
                "frame is {}x{}, writer was opened at {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )
            .into());
        }

        let converted;
        let frame = if frame.format() == PixelFormat::Bgr {
            frame
        } else {
            converted = frame.to_format(PixelFormat::Bgr);
            &converted
        };

        let mut bgr = ffmpeg_next::util::frame::video::Video::new(Pixel::BGR24, self.width, self.height);
        let stride = bgr.stride(0);
        let row_len = self.width as usize * CHANNELS;
        let dst = bgr.data_mut(0);
        for (row, src) in frame.data().chunks_exact(row_len).enumerate() {
            dst[row * stride..row * stride + row_len].copy_from_slice(src);
        }

        let mut yuv = ffmpeg_next::util::frame::video::Video::empty();
        if let Some(scaler) = self.scaler.as_mut() {
            scaler.run(&bgr, &mut yuv)?;
        }
        yuv.set_pts(Some(self.frame_count as i64));

        if let Some(encoder) = self.encoder.as_mut() {
            encoder.send_frame(&yuv)?;
        }
        self.drain_packets()?;

        self.frame_count += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(encoder) = self.encoder.as_mut() {
            encoder.send_eof()?;
            self.drain_packets()?;
            if let Some(octx) = self.octx.as_mut() {
                octx.write_trailer()?;
            }
            log::debug!("Finalized output after {} frames", self.frame_count);
        }

        self.octx = None;
        self.encoder = None;
        self.scaler = None;
        Ok(())
    }
}
