//! Shared plumbing for the `face-blur` and `face-annotate` binaries.

use std::path::{Path, PathBuf};

use ab_glyph::FontVec;
use clap::{Args, Parser};

use facecloak_core::classification::infrastructure::onnx_age_gender_classifier::OnnxAgeGenderClassifier;
use facecloak_core::detection::domain::face_detector::FaceDetector;
use facecloak_core::detection::infrastructure::onnx_blazeface_detector::OnnxBlazefaceDetector;
use facecloak_core::effects::domain::region_effect::RegionEffect;
use facecloak_core::effects::infrastructure::annotator::{bundled_font, load_font};
use facecloak_core::effects::infrastructure::effect_factory::{create_effect, EffectKind};
use facecloak_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use facecloak_core::pipeline::video_pipeline::{PipelineReport, VideoPipeline};
use facecloak_core::shared::config::FaceCloakConfig;
use facecloak_core::shared::constants::LABEL_FONT_NAME;
use facecloak_core::shared::error::PipelineError;
use facecloak_core::shared::model_resolver;
use facecloak_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use facecloak_core::video::infrastructure::ffmpeg_writer::FfmpegWriter;

/// Flags both binaries accept.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Video to read.
    #[arg(long = "input_video")]
    pub input_video: PathBuf,

    /// Where to write the processed video. Missing directories are created.
    #[arg(long = "output_video")]
    pub output_video: PathBuf,

    /// Directory searched recursively for model files.
    #[arg(long = "models_dir")]
    pub models_dir: Option<PathBuf>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    pub confidence: Option<f64>,

    /// JSON config file; flags given on the command line take precedence.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Blur every detected face in a video.
#[derive(Parser, Debug)]
#[command(name = "face-blur")]
pub struct BlurCli {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Blur intensity; sanitized to an odd kernel size [default: 30].
    #[arg(long = "blur_level", allow_negative_numbers = true)]
    pub blur_level: Option<i64>,
}

/// Box every detected face and label it with estimated age and gender.
#[derive(Parser, Debug)]
#[command(name = "face-annotate")]
pub struct AnnotateCli {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Add a rough hair-tone guess to each label.
    #[arg(long)]
    pub hair: bool,

    /// TrueType font used for labels.
    #[arg(long)]
    pub font: Option<PathBuf>,
}

/// Loads the config file (if any) and applies flag overrides on top.
pub fn load_config(common: &CommonArgs) -> Result<FaceCloakConfig, PipelineError> {
    let mut config = match &common.config {
        Some(path) => FaceCloakConfig::load(path)?,
        None => FaceCloakConfig::default(),
    };
    if let Some(dir) = &common.models_dir {
        config.models_dir = Some(dir.clone());
    }
    if let Some(confidence) = common.confidence {
        config.detector.confidence = confidence;
    }
    config.validate()?;
    Ok(config)
}

pub fn blur_config(cli: &BlurCli) -> Result<FaceCloakConfig, PipelineError> {
    let mut config = load_config(&cli.common)?;
    if let Some(level) = cli.blur_level {
        config.anonymizer.blur_level = level;
    }
    Ok(config)
}

pub fn annotate_config(cli: &AnnotateCli) -> Result<FaceCloakConfig, PipelineError> {
    let mut config = load_config(&cli.common)?;
    if cli.hair {
        config.annotator.hair_guess = true;
    }
    if let Some(font) = &cli.font {
        config.annotator.font_file = font.to_string_lossy().into_owned();
    }
    Ok(config)
}

fn model_error(path: &Path, err: Box<dyn std::error::Error>) -> PipelineError {
    PipelineError::Model {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

/// Resolves every model `names` lists under the configured models directory.
fn resolve_models(config: &FaceCloakConfig, names: &[&str]) -> Result<Vec<PathBuf>, PipelineError> {
    let models_dir = config.resolved_models_dir()?;
    log::debug!("Searching for models under {}", models_dir.display());
    Ok(model_resolver::resolve_all(&models_dir, names)?)
}

fn build_detector(
    config: &FaceCloakConfig,
    model_path: &Path,
) -> Result<Box<dyn FaceDetector>, PipelineError> {
    let detector = OnnxBlazefaceDetector::new(model_path, config.detector.confidence)
        .map_err(|e| model_error(model_path, e))?;
    Ok(Box::new(detector))
}

/// Locates a configured label font: an existing path is used as-is,
/// otherwise the name is searched for under the models directory.
fn find_font(config: &FaceCloakConfig) -> Option<PathBuf> {
    let configured = PathBuf::from(&config.annotator.font_file);
    if configured.is_file() {
        return Some(configured);
    }
    let models_dir = config.resolved_models_dir().ok()?;
    model_resolver::find_in_dir(&models_dir, &config.annotator.font_file)
}

/// The configured font when it loads, else the bundled DejaVu Sans.
fn label_font(config: &FaceCloakConfig) -> Result<FontVec, PipelineError> {
    if let Some(path) = find_font(config) {
        match load_font(&path) {
            Ok(font) => {
                log::debug!("Label font {}", path.display());
                return Ok(font);
            }
            Err(e) => log::warn!("{e}; falling back to bundled font"),
        }
    }
    bundled_font().map_err(|e| PipelineError::Model {
        path: PathBuf::from(LABEL_FONT_NAME),
        reason: e.to_string(),
    })
}

fn run_pipeline(
    common: &CommonArgs,
    config: &FaceCloakConfig,
    detector: Box<dyn FaceDetector>,
    effect: Box<dyn RegionEffect>,
) -> Result<PipelineReport, PipelineError> {
    let mut pipeline = VideoPipeline::new(
        Box::new(FfmpegReader::new()),
        Box::new(FfmpegWriter::new()),
        detector,
        effect,
    )
    .with_logger(Box::new(StdoutPipelineLogger::new(config.progress_interval)));

    pipeline.run(&common.input_video, &common.output_video)
}

pub fn run_blur(cli: &BlurCli) -> Result<PipelineReport, PipelineError> {
    let config = blur_config(cli)?;
    let models = resolve_models(&config, &[config.detector.model_file.as_str()])?;
    let detector = build_detector(&config, &models[0])?;
    let effect = create_effect(EffectKind::Anonymize {
        blur_level: config.anonymizer.blur_level,
    });
    run_pipeline(&cli.common, &config, detector, effect)
}

pub fn run_annotate(cli: &AnnotateCli) -> Result<PipelineReport, PipelineError> {
    let config = annotate_config(cli)?;
    let models = resolve_models(
        &config,
        &[
            config.detector.model_file.as_str(),
            config.annotator.age_model_file.as_str(),
            config.annotator.gender_model_file.as_str(),
        ],
    )?;
    let detector = build_detector(&config, &models[0])?;

    let classifier = OnnxAgeGenderClassifier::new(&models[1], &models[2])
        .map_err(|e| model_error(&models[1], e))?
        .with_hair_guess(config.annotator.hair_guess);

    let font = label_font(&config)?;

    let effect = create_effect(EffectKind::Annotate {
        classifier: Box::new(classifier),
        font,
    });
    run_pipeline(&cli.common, &config, detector, effect)
}

/// Sets up `env_logger` at `info` unless `RUST_LOG` says otherwise.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
