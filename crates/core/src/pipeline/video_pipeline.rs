use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::detection::domain::face_detector::FaceDetector;
use crate::effects::domain::region_effect::RegionEffect;
use crate::shared::error::PipelineError;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

use super::frame_processor::FrameProcessor;
use super::pipeline_logger::{NullPipelineLogger, PipelineLogger};

/// Lifecycle of a single run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    Opening,
    Streaming,
    Draining,
    Closed,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineReport {
    pub frames_processed: usize,
    pub faces_detected: usize,
    pub regions_skipped: usize,
    pub output_path: PathBuf,
}

/// Streams a video through detection and a region effect into a new file.
///
/// Single-use: `run` consumes the reader, writer, detector and effect, so
/// a second call returns [`PipelineError::AlreadyExecuted`]. Whatever
/// happens while streaming, the reader and writer are closed and the
/// detector and effect dropped before `run` returns.
pub struct VideoPipeline {
    reader: Option<Box<dyn VideoReader>>,
    writer: Option<Box<dyn VideoWriter>>,
    detector: Option<Box<dyn FaceDetector>>,
    effect: Option<Box<dyn RegionEffect>>,
    processor: FrameProcessor,
    logger: Box<dyn PipelineLogger>,
    cancelled: Arc<AtomicBool>,
    state: PipelineState,
}

impl VideoPipeline {
    pub fn new(
        reader: Box<dyn VideoReader>,
        writer: Box<dyn VideoWriter>,
        detector: Box<dyn FaceDetector>,
        effect: Box<dyn RegionEffect>,
    ) -> Self {
        Self {
            reader: Some(reader),
            writer: Some(writer),
            detector: Some(detector),
            effect: Some(effect),
            processor: FrameProcessor::new(),
            logger: Box::new(NullPipelineLogger),
            cancelled: Arc::new(AtomicBool::new(false)),
            state: PipelineState::Opening,
        }
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Setting the flag stops the run after the frame in flight.
    pub fn with_cancellation(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn run(&mut self, input: &Path, output: &Path) -> Result<PipelineReport, PipelineError> {
        let (Some(mut reader), Some(mut writer), Some(mut detector), Some(mut effect)) = (
            self.reader.take(),
            self.writer.take(),
            self.detector.take(),
            self.effect.take(),
        ) else {
            return Err(PipelineError::AlreadyExecuted);
        };

        self.enter(PipelineState::Opening);
        let streamed = self
            .open(&mut *reader, &mut *writer, input, output)
            .and_then(|metadata| {
                self.stream(
                    &metadata,
                    &mut *reader,
                    &mut *writer,
                    &mut *detector,
                    &mut *effect,
                    output,
                )
            });

        self.enter(PipelineState::Draining);
        reader.close();
        let finalized = writer.close();
        drop(detector);
        drop(effect);

        let result = match (streamed, finalized) {
            (Ok(report), Ok(())) => Ok(report),
            (Ok(_), Err(e)) => Err(PipelineError::Finalize(e.to_string())),
            (Err(e), Err(close_err)) => {
                log::warn!("Closing output after failure also failed: {close_err}");
                Err(e)
            }
            (Err(e), Ok(())) => Err(e),
        };

        match &result {
            Ok(report) => {
                self.enter(PipelineState::Closed);
                self.logger.info(&format!(
                    "Done. {} frames written to {}",
                    report.frames_processed,
                    report.output_path.display()
                ));
                self.logger.summary();
            }
            Err(PipelineError::Cancelled { frames_processed }) => {
                self.enter(PipelineState::Closed);
                self.logger
                    .info(&format!("Cancelled after {frames_processed} frames"));
            }
            Err(_) => self.enter(PipelineState::Error),
        }
        result
    }

    fn enter(&mut self, state: PipelineState) {
        log::debug!("Pipeline state {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    fn open(
        &mut self,
        reader: &mut dyn VideoReader,
        writer: &mut dyn VideoWriter,
        input: &Path,
        output: &Path,
    ) -> Result<VideoMetadata, PipelineError> {
        let unreadable = |reason: String| PipelineError::InputUnreadable {
            path: input.to_path_buf(),
            reason,
        };
        let unwritable = |reason: String| PipelineError::OutputUnwritable {
            path: output.to_path_buf(),
            reason,
        };

        if !input.is_file() {
            return Err(unreadable("file does not exist".into()));
        }
        let metadata = reader.open(input).map_err(|e| unreadable(e.to_string()))?;
        if metadata.width == 0 || metadata.height == 0 {
            return Err(unreadable(format!(
                "invalid frame size {}x{}",
                metadata.width, metadata.height
            )));
        }
        self.logger.info(&format!(
            "Input {}: {}x{} @ {:.2} fps, {} frames",
            input.display(),
            metadata.width,
            metadata.height,
            metadata.fps(),
            metadata
                .total_frames_known()
                .map_or_else(|| "unknown".to_string(), |n| n.to_string())
        ));

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| unwritable(e.to_string()))?;
        }
        writer
            .open(output, &metadata)
            .map_err(|e| unwritable(e.to_string()))?;

        Ok(metadata)
    }

    fn stream(
        &mut self,
        metadata: &VideoMetadata,
        reader: &mut dyn VideoReader,
        writer: &mut dyn VideoWriter,
        detector: &mut dyn FaceDetector,
        effect: &mut dyn RegionEffect,
        output: &Path,
    ) -> Result<PipelineReport, PipelineError> {
        self.enter(PipelineState::Streaming);

        let mut report = PipelineReport {
            frames_processed: 0,
            faces_detected: 0,
            regions_skipped: 0,
            output_path: output.to_path_buf(),
        };

        let mut frames = reader.frames();
        loop {
            if self.cancelled.load(Ordering::Relaxed) {
                return Err(PipelineError::Cancelled {
                    frames_processed: report.frames_processed,
                });
            }

            let mut frame = match frames.next() {
                None => break,
                Some(Ok(frame)) => frame,
                Some(Err(e)) => {
                    log::warn!(
                        "Frame read failed after {} frames, ending stream: {e}",
                        report.frames_processed
                    );
                    break;
                }
            };

            let index = frame.index();
            if frame.width() != metadata.width || frame.height() != metadata.height {
                return Err(PipelineError::FrameSizeChanged {
                    index,
                    expected_width: metadata.width,
                    expected_height: metadata.height,
                    actual_width: frame.width(),
                    actual_height: frame.height(),
                });
            }

            let outcome = self
                .processor
                .process(&mut frame, detector, effect)
                .map_err(|e| PipelineError::frame(index, e))?;

            let t_write = Instant::now();
            writer
                .write(&frame)
                .map_err(|e| PipelineError::encode(index, e))?;

            report.frames_processed += 1;
            report.faces_detected += outcome.detections;
            report.regions_skipped += outcome.skipped;

            self.logger.timing("detect", outcome.detect_ms);
            self.logger.timing("effect", outcome.effect_ms);
            self.logger
                .timing("encode", t_write.elapsed().as_secs_f64() * 1000.0);
            self.logger.metric("faces", outcome.detections as f64);
            self.logger
                .progress(report.frames_processed, metadata.total_frames);
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::infrastructure::anonymizer::Anonymizer;
    use crate::shared::frame::{Frame, PixelFormat};
    use crate::shared::region::{PixelRect, RelativeBox};
    use crate::shared::video_metadata::FrameRate;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn metadata(width: u32, height: u32, total_frames: usize) -> VideoMetadata {
        VideoMetadata {
            width,
            height,
            frame_rate: FrameRate::new(30, 1),
            total_frames,
            codec: "mpeg4".into(),
            source_path: None,
        }
    }

    fn patterned(width: u32, height: u32, index: usize) -> Frame {
        let data = (0..(width * height * 3) as usize)
            .map(|i| ((i / 3 + index * 7) % 251) as u8)
            .collect();
        Frame::new(data, width, height, PixelFormat::Bgr, index)
    }

    // --- Stubs ---

    #[derive(Default)]
    struct Calls {
        reader_closed: bool,
        writer_opened: Option<VideoMetadata>,
        writer_closed: bool,
        written: Vec<Frame>,
        detector_dropped: bool,
    }

    type Shared = Arc<Mutex<Calls>>;

    struct StubReader {
        meta: VideoMetadata,
        frames: Vec<Result<Frame, String>>,
        fail_open: bool,
        calls: Shared,
    }

    impl VideoReader for StubReader {
        fn open(&mut self, _path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
            if self.fail_open {
                return Err("moov atom not found".into());
            }
            Ok(self.meta.clone())
        }

        fn frames(
            &mut self,
        ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
            Box::new(self.frames.drain(..).map(|r| r.map_err(Box::<dyn std::error::Error>::from)))
        }

        fn close(&mut self) {
            self.calls.lock().unwrap().reader_closed = true;
        }
    }

    struct StubWriter {
        fail_open: bool,
        fail_write_at: Option<usize>,
        fail_close: bool,
        calls: Shared,
    }

    impl VideoWriter for StubWriter {
        fn open(&mut self, _path: &Path, metadata: &VideoMetadata) -> Result<(), Box<dyn std::error::Error>> {
            if self.fail_open {
                return Err("permission denied".into());
            }
            self.calls.lock().unwrap().writer_opened = Some(metadata.clone());
            Ok(())
        }

        fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            if self.fail_write_at == Some(frame.index()) {
                return Err("disk full".into());
            }
            self.calls.lock().unwrap().written.push(frame.clone());
            Ok(())
        }

        fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
            self.calls.lock().unwrap().writer_closed = true;
            if self.fail_close {
                return Err("trailer write failed".into());
            }
            Ok(())
        }
    }

    struct StubDetector {
        results: HashMap<usize, Vec<RelativeBox>>,
        fail_at: Option<usize>,
        cancel_at: Option<(usize, Arc<AtomicBool>)>,
        calls: Shared,
    }

    impl FaceDetector for StubDetector {
        fn pixel_format(&self) -> PixelFormat {
            PixelFormat::Rgb
        }

        fn detect(&mut self, frame: &Frame) -> Result<Vec<RelativeBox>, Box<dyn std::error::Error>> {
            if self.fail_at == Some(frame.index()) {
                return Err("inference failed".into());
            }
            if let Some((at, flag)) = &self.cancel_at {
                if *at == frame.index() {
                    flag.store(true, Ordering::Relaxed);
                }
            }
            Ok(self.results.get(&frame.index()).cloned().unwrap_or_default())
        }
    }

    impl Drop for StubDetector {
        fn drop(&mut self) {
            self.calls.lock().unwrap().detector_dropped = true;
        }
    }

    struct NoopEffect;

    impl RegionEffect for NoopEffect {
        fn apply(&mut self, _frame: &mut Frame, _rect: &PixelRect) -> Result<(), Box<dyn std::error::Error>> {
            Ok(())
        }
    }

    struct Fixture {
        dir: TempDir,
        input: PathBuf,
        output: PathBuf,
        calls: Shared,
        reader: StubReader,
        writer: StubWriter,
        detector: StubDetector,
    }

    impl Fixture {
        fn new(meta: VideoMetadata, frames: Vec<Result<Frame, String>>) -> Self {
            let dir = TempDir::new().unwrap();
            let input = dir.path().join("in.mp4");
            fs::write(&input, b"stub").unwrap();
            let output = dir.path().join("out.mp4");
            let calls: Shared = Arc::default();
            Self {
                reader: StubReader {
                    meta,
                    frames,
                    fail_open: false,
                    calls: calls.clone(),
                },
                writer: StubWriter {
                    fail_open: false,
                    fail_write_at: None,
                    fail_close: false,
                    calls: calls.clone(),
                },
                detector: StubDetector {
                    results: HashMap::new(),
                    fail_at: None,
                    cancel_at: None,
                    calls: calls.clone(),
                },
                dir,
                input,
                output,
                calls,
            }
        }

        fn vga(count: usize) -> Self {
            let frames = (0..count).map(|i| Ok(patterned(640, 480, i))).collect();
            Self::new(metadata(640, 480, count), frames)
        }

        fn pipeline_with(self, effect: Box<dyn RegionEffect>) -> (VideoPipeline, Paths) {
            let pipeline = VideoPipeline::new(
                Box::new(self.reader),
                Box::new(self.writer),
                Box::new(self.detector),
                effect,
            );
            let paths = Paths {
                _dir: self.dir,
                input: self.input,
                output: self.output,
                calls: self.calls,
            };
            (pipeline, paths)
        }

        fn pipeline(self) -> (VideoPipeline, Paths) {
            self.pipeline_with(Box::new(NoopEffect))
        }
    }

    struct Paths {
        _dir: TempDir,
        input: PathBuf,
        output: PathBuf,
        calls: Shared,
    }

    fn assert_drained(calls: &Shared) {
        let calls = calls.lock().unwrap();
        assert!(calls.reader_closed, "reader not closed");
        assert!(calls.writer_closed, "writer not closed");
        assert!(calls.detector_dropped, "detector not released");
    }

    // --- Tests ---

    #[test]
    fn test_ten_frames_without_faces_pass_through() {
        let fixture = Fixture::vga(10);
        let originals: Vec<Frame> = (0..10).map(|i| patterned(640, 480, i)).collect();
        let (mut pipeline, paths) = fixture.pipeline();

        let report = pipeline.run(&paths.input, &paths.output).unwrap();

        assert_eq!(report.frames_processed, 10);
        assert_eq!(report.faces_detected, 0);
        assert_eq!(report.output_path, paths.output);
        assert_eq!(pipeline.state(), PipelineState::Closed);

        let calls = paths.calls.lock().unwrap();
        assert_eq!(calls.writer_opened, Some(metadata(640, 480, 10)));
        assert_eq!(calls.written.len(), 10);
        for (written, original) in calls.written.iter().zip(&originals) {
            assert_eq!(written.index(), original.index());
            assert_eq!(written.format(), PixelFormat::Bgr);
            assert_eq!(written.data(), original.data());
        }
        drop(calls);
        assert_drained(&paths.calls);
    }

    #[test]
    fn test_detected_face_is_anonymized_in_output() {
        let mut fixture = Fixture::vga(1);
        fixture
            .detector
            .results
            .insert(0, vec![RelativeBox::new(0.25, 0.25, 0.5, 0.5)]);
        let original = patterned(640, 480, 0);
        let (mut pipeline, paths) = fixture.pipeline_with(Box::new(Anonymizer::new(30)));

        let report = pipeline.run(&paths.input, &paths.output).unwrap();
        assert_eq!(report.faces_detected, 1);

        let calls = paths.calls.lock().unwrap();
        let out = &calls.written[0];
        let rect = PixelRect::new(160, 120, 480, 360);
        assert_ne!(out.crop(&rect).data(), original.crop(&rect).data());
        assert_eq!(out.pixel(0, 0), original.pixel(0, 0));
        assert_eq!(out.pixel(639, 479), original.pixel(639, 479));
    }

    #[test]
    fn test_out_of_frame_detections_are_counted_as_skipped() {
        let mut fixture = Fixture::vga(2);
        fixture.detector.results.insert(
            1,
            vec![
                RelativeBox::new(1.2, 0.1, 0.1, 0.1),
                RelativeBox::new(0.1, 0.1, 0.1, 0.1),
            ],
        );
        let (mut pipeline, paths) = fixture.pipeline();

        let report = pipeline.run(&paths.input, &paths.output).unwrap();
        assert_eq!(report.faces_detected, 2);
        assert_eq!(report.regions_skipped, 1);
    }

    #[test]
    fn test_missing_input_is_unreadable_and_creates_no_output() {
        let fixture = Fixture::vga(3);
        let (mut pipeline, paths) = fixture.pipeline();
        let missing = paths.input.with_file_name("missing.mp4");

        let err = pipeline.run(&missing, &paths.output).unwrap_err();

        assert!(matches!(err, PipelineError::InputUnreadable { ref path, .. } if *path == missing));
        assert!(!paths.output.exists());
        assert!(paths.calls.lock().unwrap().writer_opened.is_none());
        assert_eq!(pipeline.state(), PipelineState::Error);
        assert_drained(&paths.calls);
    }

    #[test]
    fn test_reader_open_failure_is_unreadable() {
        let mut fixture = Fixture::vga(3);
        fixture.reader.fail_open = true;
        let (mut pipeline, paths) = fixture.pipeline();

        let err = pipeline.run(&paths.input, &paths.output).unwrap_err();
        match err {
            PipelineError::InputUnreadable { reason, .. } => assert!(reason.contains("moov")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_writer_open_failure_is_unwritable_and_drains() {
        let mut fixture = Fixture::vga(3);
        fixture.writer.fail_open = true;
        let (mut pipeline, paths) = fixture.pipeline();

        let err = pipeline.run(&paths.input, &paths.output).unwrap_err();
        assert!(matches!(err, PipelineError::OutputUnwritable { .. }));
        assert_eq!(pipeline.state(), PipelineState::Error);
        assert_drained(&paths.calls);
    }

    #[test]
    fn test_missing_output_directories_are_created() {
        let fixture = Fixture::vga(1);
        let (mut pipeline, paths) = fixture.pipeline();
        let nested = paths.output.parent().unwrap().join("a").join("b").join("out.mp4");

        pipeline.run(&paths.input, &nested).unwrap();
        assert!(nested.parent().unwrap().is_dir());
    }

    #[test]
    fn test_output_parent_that_is_a_file_is_unwritable() {
        let fixture = Fixture::vga(1);
        let (mut pipeline, paths) = fixture.pipeline();
        let blocker = paths.output.with_file_name("blocker");
        fs::write(&blocker, b"x").unwrap();

        let err = pipeline.run(&paths.input, &blocker.join("out.mp4")).unwrap_err();
        assert!(matches!(err, PipelineError::OutputUnwritable { .. }));
    }

    #[test]
    fn test_detector_failure_stops_run_and_drains() {
        let mut fixture = Fixture::vga(6);
        fixture.detector.fail_at = Some(3);
        let (mut pipeline, paths) = fixture.pipeline();

        let err = pipeline.run(&paths.input, &paths.output).unwrap_err();
        assert!(matches!(err, PipelineError::FrameProcessing { index: 3, .. }));
        assert_eq!(paths.calls.lock().unwrap().written.len(), 3);
        assert_eq!(pipeline.state(), PipelineState::Error);
        assert_drained(&paths.calls);
    }

    #[test]
    fn test_encode_failure_is_reported_with_index() {
        let mut fixture = Fixture::vga(4);
        fixture.writer.fail_write_at = Some(2);
        let (mut pipeline, paths) = fixture.pipeline();

        let err = pipeline.run(&paths.input, &paths.output).unwrap_err();
        assert!(matches!(err, PipelineError::Encode { index: 2, .. }));
        assert_drained(&paths.calls);
    }

    #[test]
    fn test_read_failure_mid_stream_ends_stream() {
        let frames = vec![
            Ok(patterned(64, 48, 0)),
            Ok(patterned(64, 48, 1)),
            Err("corrupt packet".to_string()),
            Ok(patterned(64, 48, 3)),
        ];
        let fixture = Fixture::new(metadata(64, 48, 4), frames);
        let (mut pipeline, paths) = fixture.pipeline();

        let report = pipeline.run(&paths.input, &paths.output).unwrap();
        assert_eq!(report.frames_processed, 2);
        assert_eq!(pipeline.state(), PipelineState::Closed);
    }

    #[test]
    fn test_frame_size_change_is_fatal() {
        let frames = vec![Ok(patterned(64, 48, 0)), Ok(patterned(32, 48, 1))];
        let fixture = Fixture::new(metadata(64, 48, 2), frames);
        let (mut pipeline, paths) = fixture.pipeline();

        let err = pipeline.run(&paths.input, &paths.output).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::FrameSizeChanged {
                index: 1,
                actual_width: 32,
                ..
            }
        ));
    }

    #[test]
    fn test_finalize_failure_after_successful_stream() {
        let mut fixture = Fixture::vga(2);
        fixture.writer.fail_close = true;
        let (mut pipeline, paths) = fixture.pipeline();

        let err = pipeline.run(&paths.input, &paths.output).unwrap_err();
        assert!(matches!(err, PipelineError::Finalize(ref msg) if msg.contains("trailer")));
    }

    #[test]
    fn test_cancel_before_first_frame() {
        let fixture = Fixture::vga(5);
        let flag = Arc::new(AtomicBool::new(true));
        let (pipeline, paths) = fixture.pipeline();
        let mut pipeline = pipeline.with_cancellation(flag);

        let err = pipeline.run(&paths.input, &paths.output).unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled { frames_processed: 0 }));
        assert!(paths.calls.lock().unwrap().written.is_empty());
        assert_drained(&paths.calls);
    }

    #[test]
    fn test_cancel_stops_after_current_frame() {
        let mut fixture = Fixture::vga(8);
        let flag = Arc::new(AtomicBool::new(false));
        fixture.detector.cancel_at = Some((2, flag.clone()));
        let (pipeline, paths) = fixture.pipeline();
        let mut pipeline = pipeline.with_cancellation(flag);

        let err = pipeline.run(&paths.input, &paths.output).unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled { frames_processed: 3 }));
        assert_eq!(paths.calls.lock().unwrap().written.len(), 3);
        assert_eq!(pipeline.state(), PipelineState::Closed);
    }

    #[test]
    fn test_second_run_is_rejected() {
        let fixture = Fixture::vga(1);
        let (mut pipeline, paths) = fixture.pipeline();
        pipeline.run(&paths.input, &paths.output).unwrap();

        let err = pipeline.run(&paths.input, &paths.output).unwrap_err();
        assert!(matches!(err, PipelineError::AlreadyExecuted));
    }

    #[test]
    fn test_progress_is_reported_per_frame() {
        struct CountingLogger(Arc<Mutex<Vec<(usize, usize)>>>);

        impl PipelineLogger for CountingLogger {
            fn progress(&mut self, current: usize, total: usize) {
                self.0.lock().unwrap().push((current, total));
            }
            fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
            fn metric(&mut self, _name: &str, _value: f64) {}
            fn info(&mut self, _message: &str) {}
        }

        let seen = Arc::new(Mutex::new(Vec::new()));
        let fixture = Fixture::vga(3);
        let (pipeline, paths) = fixture.pipeline();
        let mut pipeline = pipeline.with_logger(Box::new(CountingLogger(seen.clone())));

        pipeline.run(&paths.input, &paths.output).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![(1, 3), (2, 3), (3, 3)]);
    }
}
