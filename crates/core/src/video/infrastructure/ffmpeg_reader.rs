use std::path::Path;

use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling;

use crate::shared::frame::{Frame, PixelFormat, CHANNELS};
use crate::shared::video_metadata::{FrameRate, VideoMetadata};
use crate::video::domain::video_reader::VideoReader;

type FrameResult = Result<Frame, Box<dyn std::error::Error>>;

/// Decodes video frames via ffmpeg-next (libavformat + libavcodec).
///
/// Every decoded frame is converted to packed BGR24.
pub struct FfmpegReader {
    input_ctx: Option<ffmpeg_next::format::context::Input>,
    video_stream_index: usize,
}

// Safety: FfmpegReader is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegReader {}

impl FfmpegReader {
    pub fn new() -> Self {
        Self {
            input_ctx: None,
            video_stream_index: 0,
        }
    }

    fn start_decoding(&mut self) -> Result<FfmpegFrameIter<'_>, Box<dyn std::error::Error>> {
        let ictx = self.input_ctx.as_mut().ok_or("FfmpegReader: not opened")?;
        let stream = ictx
            .stream(self.video_stream_index)
            .ok_or("FfmpegReader: video stream disappeared")?;
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let width = decoder.width();
        let height = decoder.height();
        let scaler = scaling::Context::get(
            decoder.format(),
            width,
            height,
            Pixel::BGR24,
            width,
            height,
            scaling::Flags::BILINEAR,
        )?;

        Ok(FfmpegFrameIter {
            ictx,
            decoder,
            scaler,
            width,
            height,
            video_stream_index: self.video_stream_index,
            frame_index: 0,
            flushing: false,
            done: false,
        })
    }
}

impl Default for FfmpegReader {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoReader for FfmpegReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let ictx = ffmpeg_next::format::input(path)?;
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;

        let video_stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let avg = stream.avg_frame_rate();
        let avg = FrameRate::new(avg.numerator(), avg.denominator());
        let frame_rate = if avg.is_valid() {
            avg
        } else {
            let real = stream.rate();
            FrameRate::new(real.numerator(), real.denominator())
        };

        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            frame_rate,
            total_frames: stream.frames().max(0) as usize,
            codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            source_path: Some(path.to_path_buf()),
        };
        log::debug!(
            "Opened {}: {}x{} @ {}/{} fps, {} frames, codec {}",
            path.display(),
            metadata.width,
            metadata.height,
            metadata.frame_rate.num,
            metadata.frame_rate.den,
            metadata.total_frames,
            metadata.codec
        );

        self.video_stream_index = video_stream_index;
        self.input_ctx = Some(ictx);

        Ok(metadata)
    }

    fn frames(&mut self) -> Box<dyn Iterator<Item = FrameResult> + '_> {
        match self.start_decoding() {
            Ok(iter) => Box::new(iter),
            Err(e) => Box::new(std::iter::once(Err(e))),
        }
    }

    fn close(&mut self) {
        self.input_ctx = None;
    }
}

/// Decodes one frame per `next()`, so only a single decoded frame is alive
/// at a time regardless of video length.
struct FfmpegFrameIter<'a> {
    ictx: &'a mut ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: scaling::Context,
    width: u32,
    height: u32,
    video_stream_index: usize,
    frame_index: usize,
    flushing: bool,
    done: bool,
}

impl FfmpegFrameIter<'_> {
    fn try_receive(&mut self) -> Option<FrameResult> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        self.decoder.receive_frame(&mut decoded).ok()?;

        let mut bgr = ffmpeg_next::util::frame::video::Video::empty();
        if let Err(e) = self.scaler.run(&decoded, &mut bgr) {
            self.done = true;
            return Some(Err(Box::new(e)));
        }

        let pixels = packed_pixels(&bgr, self.width, self.height);
        let frame = Frame::new(pixels, self.width, self.height, PixelFormat::Bgr, self.frame_index);
        self.frame_index += 1;
        Some(Ok(frame))
    }

    /// Hands the decoder the next packet of the video stream. Once the
    /// container runs dry the decoder is told to flush instead.
    fn feed_decoder(&mut self) {
        for (stream, packet) in self.ictx.packets() {
            if stream.index() != self.video_stream_index {
                continue;
            }
            match self.decoder.send_packet(&packet) {
                Ok(()) => return,
                Err(e) => log::warn!(
                    "Skipping undecodable packet after frame {}: {e}",
                    self.frame_index
                ),
            }
        }
        if let Err(e) = self.decoder.send_eof() {
            log::debug!("Decoder flush failed: {e}");
        }
        self.flushing = true;
    }
}

impl Iterator for FfmpegFrameIter<'_> {
    type Item = FrameResult;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            if let Some(result) = self.try_receive() {
                return Some(result);
            }
            if self.flushing {
                self.done = true;
            } else {
                self.feed_decoder();
            }
        }
        None
    }
}

/// Copies a scaled frame into a tightly packed buffer, dropping the row
/// padding ffmpeg adds when stride > width * 3.
fn packed_pixels(
    scaled: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = scaled.stride(0);
    let data = scaled.data(0);
    let row_len = width as usize * CHANNELS;

    let mut pixels = Vec::with_capacity(row_len * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_len]);
    }
    pixels
}
