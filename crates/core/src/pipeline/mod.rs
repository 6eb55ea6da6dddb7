pub mod frame_processor;
pub mod pipeline_logger;
pub mod video_pipeline;
