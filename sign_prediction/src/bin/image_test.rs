use anyhow::Context;
use clap::Parser;
use serde_json::json;
use sign_common::{artifact, telemetry};
use sign_prediction::{
    config,
    detector::Detector,
    model_loader::{DetectorFactory, OrtDetectorFactory},
    prediction::{select_best, PredictionResult},
};
use std::path::PathBuf;

/// Runs the detector on a single image and prints every raw detection.
#[derive(Parser, Debug)]
#[command(name = "image_test")]
struct Args {
    /// Image to run inference on.
    image: PathBuf,
    /// Model artifact; defaults to the configured local artifact path.
    #[arg(long)]
    model: Option<PathBuf>,
    /// Confidence floor override.
    #[arg(long)]
    conf: Option<f32>,
    /// IoU threshold override.
    #[arg(long)]
    iou: Option<f32>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = config::get_configuration()?;
    telemetry::init_subscriber(&config.log_level);

    let model_path = args.model.unwrap_or_else(|| config.model.get_path());
    anyhow::ensure!(
        artifact::validate(&model_path),
        "model artifact missing or empty: {}",
        model_path.display()
    );

    let mut params = config.inference.params();
    if let Some(conf) = args.conf {
        params.confidence_floor = conf;
    }
    if let Some(iou) = args.iou {
        params.iou_threshold = iou;
    }

    let detector = OrtDetectorFactory::new(&config.model, &config.inference).build(&model_path)?;
    let image = image::open(&args.image)
        .with_context(|| format!("failed to load image {}", args.image.display()))?;

    let mut detections = detector.detect(&image, &params)?;
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let best = select_best(detections.clone(), params.confidence_floor)
        .map(PredictionResult::from)
        .unwrap_or_else(PredictionResult::no_detection);

    let report = json!({
        "image": args.image.display().to_string(),
        "confidence_floor": params.confidence_floor,
        "iou_threshold": params.iou_threshold,
        "detections": detections,
        "best": best,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
