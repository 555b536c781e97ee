use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use gesturecam_core::gesture::infrastructure::canvas_image_writer::CanvasImageWriter;
use gesturecam_core::gesture::infrastructure::onnx_gesture_classifier::OnnxGestureClassifier;
use gesturecam_core::gesture::infrastructure::onnx_hand_landmarker::{
    HandLandmarkerOptions, OnnxHandLandmarker,
};
use gesturecam_core::gesture::infrastructure::onnx_palm_detector::OnnxPalmDetector;
use gesturecam_core::pipeline::pipeline_logger::LogPipelineLogger;
use gesturecam_core::pipeline::predict_gesture_use_case::PredictGestureUseCase;
use gesturecam_core::pipeline::recognize_video_use_case::{FrameGesture, RecognizeVideoUseCase};
use gesturecam_core::shared::config::{ModelSource, RecognizerConfig};
use gesturecam_core::shared::constants::{BUNDLED_MODEL_DIR, IMAGE_EXTENSIONS, PALM_MODEL_NAME};
use gesturecam_core::shared::model_resolver;
use gesturecam_core::video::domain::video_reader::VideoReader;
use gesturecam_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use gesturecam_core::video::infrastructure::image_file_reader::ImageFileReader;

/// Hand gesture recognition for videos and images.
///
/// Prints one JSON object per frame: index, timestamp, gesture label,
/// index fingertip pixel and classifier confidence.
#[derive(Parser, Debug)]
#[command(name = "gesturecam")]
struct Cli {
    /// Input video or image file.
    input: PathBuf,

    /// JSON config file (defaults to the platform config directory).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Gesture classifier ONNX model.
    #[arg(long)]
    classifier_model: Option<PathBuf>,

    /// Hand landmark ONNX model.
    #[arg(long)]
    landmark_model: Option<PathBuf>,

    /// Palm detection ONNX model used to find new hands.
    #[arg(long, conflicts_with = "no_palm")]
    palm_model: Option<PathBuf>,

    /// Search the whole frame with the landmark model instead of detecting palms.
    #[arg(long)]
    no_palm: bool,

    /// Directory searched for models not found in the cache.
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Treat every frame as an unrelated image (no hand tracking).
    #[arg(long)]
    static_image: bool,

    /// Hand detection confidence threshold (0.0-1.0).
    #[arg(long)]
    min_detection_confidence: Option<f32>,

    /// Hand tracking confidence threshold (0.0-1.0).
    #[arg(long)]
    min_tracking_confidence: Option<f32>,

    /// Only recognize every Nth video frame (1 = every frame).
    #[arg(long, default_value = "1")]
    stride: usize,

    /// Write JSON lines here instead of stdout.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Save the air-canvas drawing (pointing draws, fist clears) as a PNG.
    #[arg(long)]
    canvas: Option<PathBuf>,

    /// Mirror the canvas horizontally, as a selfie view would show it.
    #[arg(long, requires = "canvas")]
    mirror: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        log::error!("{e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let mut config = RecognizerConfig::load_or_default(cli.config.as_deref())?;
    apply_overrides(&mut config, &cli);
    config.validate()?;

    let predictor = build_predictor(&config)?;
    let mut use_case =
        RecognizeVideoUseCase::new(predictor).with_logger(Box::new(LogPipelineLogger::default()));
    if cli.canvas.is_some() {
        use_case = use_case.with_canvas(cli.mirror);
    }

    let mut out: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    let summary = use_case.execute(open_reader(&cli.input, cli.stride), &cli.input, &mut |record| {
        write_record(&mut out, record)
    })?;
    out.flush()?;

    log::info!(
        "{} frames, {} with a hand{}",
        summary.frames,
        summary.frames_with_hand,
        summary
            .dominant()
            .map(|g| format!(", mostly {g}"))
            .unwrap_or_default()
    );
    if let Some(path) = &cli.output {
        log::info!("Predictions written to {}", path.display());
    }

    if let (Some(path), Some(canvas)) = (&cli.canvas, use_case.canvas()) {
        CanvasImageWriter::new().write(path, canvas)?;
    }

    Ok(())
}

fn build_predictor(
    config: &RecognizerConfig,
) -> Result<PredictGestureUseCase, Box<dyn std::error::Error>> {
    let bundled_dir = config
        .bundled_model_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(BUNDLED_MODEL_DIR));

    let landmark_path = resolve_model(&config.landmark_model, &bundled_dir)?;
    let classifier_path = resolve_model(&config.classifier_model, &bundled_dir)?;

    let options = HandLandmarkerOptions {
        static_image_mode: config.static_image_mode,
        min_detection_confidence: config.min_detection_confidence,
        min_tracking_confidence: config.min_tracking_confidence,
    };
    let mut detector = OnnxHandLandmarker::new(&landmark_path, options)?;
    if let Some(palm) = build_palm_detector(config, &bundled_dir)? {
        detector = detector.with_palm_detector(palm);
    }
    let classifier = OnnxGestureClassifier::new(&classifier_path)?;

    Ok(PredictGestureUseCase::new(
        Box::new(detector),
        Box::new(classifier),
    ))
}

/// A default palm model that is not installed is optional; one the user
/// pointed at is not.
fn build_palm_detector(
    config: &RecognizerConfig,
    bundled_dir: &Path,
) -> Result<Option<OnnxPalmDetector>, Box<dyn std::error::Error>> {
    let Some(source) = &config.palm_model else {
        log::info!("Palm detection disabled; searching the full frame");
        return Ok(None);
    };
    let path = match resolve_model(source, bundled_dir) {
        Ok(path) => path,
        Err(e) if source.path.is_none() && source.url.is_none() => {
            log::warn!("{e}; searching the full frame for hands instead");
            return Ok(None);
        }
        Err(e) => return Err(e),
    };
    let detector = OnnxPalmDetector::new(&path, config.min_detection_confidence)?;
    Ok(Some(detector))
}

fn resolve_model(
    source: &ModelSource,
    bundled_dir: &Path,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {}", source.name);
    let name = source.name.clone();
    let path = model_resolver::resolve(
        source,
        Some(bundled_dir),
        Some(Box::new(move |downloaded, total| {
            download_progress(&name, downloaded, total)
        })),
    )?;
    log::debug!("Using {}", path.display());
    Ok(path)
}

/// CLI flags take precedence over the config file.
fn apply_overrides(config: &mut RecognizerConfig, cli: &Cli) {
    if let Some(path) = &cli.classifier_model {
        config.classifier_model.path = Some(path.clone());
    }
    if let Some(path) = &cli.landmark_model {
        config.landmark_model.path = Some(path.clone());
    }
    if cli.no_palm {
        config.palm_model = None;
    } else if let Some(path) = &cli.palm_model {
        config
            .palm_model
            .get_or_insert_with(|| ModelSource::named(PALM_MODEL_NAME))
            .path = Some(path.clone());
    }
    if let Some(dir) = &cli.model_dir {
        config.bundled_model_dir = Some(dir.clone());
    }
    if cli.static_image {
        config.static_image_mode = true;
    }
    if let Some(c) = cli.min_detection_confidence {
        config.min_detection_confidence = c;
    }
    if let Some(c) = cli.min_tracking_confidence {
        config.min_tracking_confidence = c;
    }
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input file not found: {}", cli.input.display()).into());
    }
    if cli.stride == 0 {
        return Err("Stride must be at least 1".into());
    }
    if let Some(path) = &cli.canvas {
        if path.extension().is_none() {
            return Err(format!(
                "Canvas path needs an image extension such as .png, got {}",
                path.display()
            )
            .into());
        }
    }
    if cli.output.is_some() && cli.output == cli.canvas {
        return Err("--output and --canvas must be different files".into());
    }
    Ok(())
}

fn write_record(
    out: &mut dyn Write,
    record: &FrameGesture,
) -> Result<(), Box<dyn std::error::Error>> {
    serde_json::to_writer(&mut *out, record)?;
    out.write_all(b"\n")?;
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn open_reader(input: &Path, stride: usize) -> Box<dyn VideoReader> {
    if is_image(input) {
        Box::new(ImageFileReader::new())
    } else {
        Box::new(FfmpegReader::new().with_stride(stride))
    }
}

fn download_progress(name: &str, downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading {name}... {pct}%");
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\rDownloading {name}... {downloaded} bytes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gesturecam_core::gesture::domain::gesture::Gesture;
    use gesturecam_core::gesture::domain::prediction::GesturePrediction;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("gesturecam").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_is_image_by_extension() {
        assert!(is_image(Path::new("hand.PNG")));
        assert!(is_image(Path::new("dir/hand.jpeg")));
        assert!(!is_image(Path::new("clip.mp4")));
        assert!(!is_image(Path::new("no_extension")));
    }

    #[test]
    fn test_overrides_take_precedence() {
        let cli = parse(&[
            "in.mp4",
            "--classifier-model",
            "/models/g.onnx",
            "--model-dir",
            "/models",
            "--static-image",
            "--min-detection-confidence",
            "0.9",
        ]);
        let mut config = RecognizerConfig::default();
        apply_overrides(&mut config, &cli);

        assert_eq!(
            config.classifier_model.path,
            Some(PathBuf::from("/models/g.onnx"))
        );
        assert_eq!(config.landmark_model.path, None);
        assert_eq!(config.bundled_model_dir, Some(PathBuf::from("/models")));
        assert!(config.static_image_mode);
        assert_eq!(config.min_detection_confidence, 0.9);
        assert_eq!(config.min_tracking_confidence, 0.5);
    }

    #[test]
    fn test_no_flags_keep_config() {
        let cli = parse(&["in.mp4"]);
        let mut config = RecognizerConfig::default();
        apply_overrides(&mut config, &cli);
        assert_eq!(config, RecognizerConfig::default());
    }

    #[test]
    fn test_palm_flags() {
        let mut config = RecognizerConfig::default();
        apply_overrides(&mut config, &parse(&["in.mp4", "--no-palm"]));
        assert!(config.palm_model.is_none());

        // An explicit path brings palm detection back even if the config disabled it
        apply_overrides(&mut config, &parse(&["in.mp4", "--palm-model", "/m/palm.onnx"]));
        let palm = config.palm_model.unwrap();
        assert_eq!(palm.name, PALM_MODEL_NAME);
        assert_eq!(palm.path, Some(PathBuf::from("/m/palm.onnx")));

        let args = ["gesturecam", "in.mp4", "--no-palm", "--palm-model", "p"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_missing_default_palm_model_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = RecognizerConfig {
            palm_model: Some(ModelSource::named("not_installed_palm_model.onnx")),
            ..Default::default()
        };
        assert!(build_palm_detector(&config, dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_missing_explicit_palm_model_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = RecognizerConfig {
            palm_model: Some(ModelSource {
                name: PALM_MODEL_NAME.to_string(),
                path: Some(dir.path().join("missing.onnx")),
                url: None,
            }),
            ..Default::default()
        };
        assert!(build_palm_detector(&config, dir.path()).is_err());
    }

    #[test]
    fn test_mirror_requires_canvas() {
        let result = Cli::try_parse_from(["gesturecam", "in.mp4", "--mirror"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_missing_input() {
        let cli = parse(&["/nonexistent/clip.mp4"]);
        let err = validate(&cli).unwrap_err();
        assert!(err.to_string().contains("Input file not found"));
    }

    #[test]
    fn test_validate_canvas_needs_extension() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        std::fs::write(&input, b"").unwrap();
        let input = input.to_str().unwrap();

        assert!(validate(&parse(&[input, "--canvas", "drawing"])).is_err());
        assert!(validate(&parse(&[input, "--canvas", "drawing.png"])).is_ok());
        assert!(validate(&parse(&[input, "--canvas", "a.png", "-o", "a.png"])).is_err());
        assert!(validate(&parse(&[input, "--stride", "0"])).is_err());
    }

    #[test]
    fn test_write_record_emits_json_line() {
        let record = FrameGesture {
            frame_index: 2,
            timestamp_ms: None,
            prediction: GesturePrediction {
                gesture: Gesture::Undo,
                fingertip: None,
                confidence: Some(0.5),
            },
        };
        let mut buf: Vec<u8> = Vec::new();
        write_record(&mut buf, &record).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "{\"frame_index\":2,\"timestamp_ms\":null,\"gesture\":\"undo\",\"fingertip\":null,\"confidence\":0.5}\n"
        );
    }
}
