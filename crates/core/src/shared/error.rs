use std::path::PathBuf;

use thiserror::Error;

use crate::shared::config::ConfigError;
use crate::shared::model_resolver::ModelResolveError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Fatal outcomes of a pipeline run.
///
/// Recoverable conditions (degenerate detection rects, a decode failure at
/// the tail of the stream) are handled inside the pipeline and never show
/// up here.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    ModelFilesMissing(#[from] ModelResolveError),

    #[error("cannot read input video {path}: {reason}")]
    InputUnreadable { path: PathBuf, reason: String },

    #[error("cannot write output video {path}: {reason}")]
    OutputUnwritable { path: PathBuf, reason: String },

    #[error("frame {index} is {actual_width}x{actual_height}, stream was opened at {expected_width}x{expected_height}")]
    FrameSizeChanged {
        index: usize,
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("processing frame {index} failed: {source}")]
    FrameProcessing {
        index: usize,
        #[source]
        source: BoxError,
    },

    #[error("encoding frame {index} failed: {source}")]
    Encode {
        index: usize,
        #[source]
        source: BoxError,
    },

    #[error("failed to finalize output video: {0}")]
    Finalize(String),

    #[error("cancelled after {frames_processed} frames")]
    Cancelled { frames_processed: usize },

    #[error("pipeline already executed")]
    AlreadyExecuted,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to load model {path}: {reason}")]
    Model { path: PathBuf, reason: String },
}

impl PipelineError {
    /// Wraps a collaborator error (detector, effect) raised while handling a frame.
    pub fn frame(index: usize, err: Box<dyn std::error::Error>) -> Self {
        PipelineError::FrameProcessing {
            index,
            source: err.to_string().into(),
        }
    }

    pub fn encode(index: usize, err: Box<dyn std::error::Error>) -> Self {
        PipelineError::Encode {
            index,
            source: err.to_string().into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_unreadable_message_names_path() {
        let err = PipelineError::InputUnreadable {
            path: PathBuf::from("/videos/missing.mp4"),
            reason: "file does not exist".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/videos/missing.mp4"));
        assert!(msg.contains("does not exist"));
    }

    #[test]
    fn test_frame_wraps_collaborator_error() {
        let err = PipelineError::frame(7, "detector exploded".into());
        assert_eq!(err.to_string(), "processing frame 7 failed: detector exploded");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_model_files_missing_is_transparent() {
        let err: PipelineError = ModelResolveError::Missing {
            base_dir: PathBuf::from("/models"),
            missing: vec!["age_net.onnx".into()],
        }
        .into();
        assert!(matches!(err, PipelineError::ModelFilesMissing(_)));
        assert!(err.to_string().contains("age_net.onnx"));
    }
}
