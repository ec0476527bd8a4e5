use crate::{
    config::ModelConfig,
    detector::{BoundingBox, Detection, Detector, DetectorError, InferenceParams},
    labels::ClassLabels,
};
use image::{imageops::FilterType, DynamicImage, GenericImageView};
use ndarray::{Array, ArrayView2, Axis, Ix4};
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::TensorRef,
};
use std::{
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

const OUTPUT_NAME: &str = "output0";

fn transform_image(image: &DynamicImage, input_size: u32) -> Array<f32, Ix4> {
    let size = input_size as usize;
    let img = image.resize_exact(input_size, input_size, FilterType::CatmullRom);

    let mut input = Array::zeros((1, 3, size, size));
    for pixel in img.pixels() {
        let x = pixel.0 as _;
        let y = pixel.1 as _;
        let [r, g, b, _] = pixel.2 .0;
        input[[0, 0, y, x]] = (r as f32) / 255.;
        input[[0, 1, y, x]] = (g as f32) / 255.;
        input[[0, 2, y, x]] = (b as f32) / 255.;
    }

    input
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    class_id: usize,
    confidence: f32,
    bbox: BoundingBox,
}

/// Decodes YOLOv5 rows `[xc, yc, w, h, objectness, class scores...]`
/// expressed in network input pixels.
fn decode_rows(
    rows: ArrayView2<f32>,
    scale_x: f32,
    scale_y: f32,
    confidence_floor: f32,
) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for row in rows.axis_iter(Axis(0)) {
        if row.len() < 6 {
            continue;
        }
        let objectness = row[4];
        let best_class = row
            .iter()
            .skip(5)
            .copied()
            .enumerate()
            .reduce(|accum, item| if item.1 > accum.1 { item } else { accum });

        let Some((class_id, class_score)) = best_class else {
            continue;
        };
        let confidence = objectness * class_score;
        if confidence < confidence_floor {
            continue;
        }

        let xc = row[0] * scale_x;
        let yc = row[1] * scale_y;
        let w = row[2] * scale_x;
        let h = row[3] * scale_y;

        candidates.push(Candidate {
            class_id,
            confidence,
            bbox: BoundingBox {
                xmin: xc - w / 2.,
                ymin: yc - h / 2.,
                xmax: xc + w / 2.,
                ymax: yc + h / 2.,
            },
        });
    }

    candidates
}

/// Per-class suppression, highest confidence first, capped at `max_detections`.
fn non_max_suppression(
    mut candidates: Vec<Candidate>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if kept.len() >= max_detections {
            break;
        }
        let overlaps = kept.iter().any(|k| {
            k.class_id == candidate.class_id && k.bbox.iou(&candidate.bbox) > iou_threshold
        });
        if !overlaps {
            kept.push(candidate);
        }
    }

    kept
}

#[derive(Clone)]
pub struct OrtDetector {
    sessions: Arc<Vec<Arc<Mutex<Session>>>>,
    counter: Arc<AtomicUsize>,
    labels: Arc<ClassLabels>,
    input_size: u32,
}

impl OrtDetector {
    pub fn new(
        model_path: &Path,
        model_config: &ModelConfig,
        labels: ClassLabels,
        input_size: u32,
    ) -> Result<Self, DetectorError> {
        let num_instances = model_config.num_instances.max(1);
        let sessions = (0..num_instances)
            .map(|_| {
                let session = Session::builder()?
                    .with_optimization_level(GraphOptimizationLevel::Level3)?
                    .commit_from_file(model_path)?;
                Ok(Arc::new(Mutex::new(session)))
            })
            .collect::<Result<Vec<_>, ort::Error>>()?;

        tracing::info!(
            "Created {} ONNX sessions for {} classes",
            num_instances,
            labels.len()
        );

        Ok(Self {
            sessions: Arc::new(sessions),
            counter: Arc::new(AtomicUsize::new(0)),
            labels: Arc::new(labels),
            input_size,
        })
    }

    fn run_inference(
        &self,
        input: &Array<f32, Ix4>,
    ) -> Result<ndarray::Array2<f32>, DetectorError> {
        let index = self.counter.fetch_add(1, Ordering::SeqCst) % self.sessions.len();
        let mut session = self.sessions[index]
            .lock()
            .map_err(|_| DetectorError::Poisoned)?;

        tracing::debug!("Handling request with session {}", index);
        let tensor_ref = TensorRef::from_array_view(input.view())?;
        let outputs = session.run(ort::inputs![tensor_ref])?;

        let (shape, data) = outputs[OUTPUT_NAME].try_extract_tensor::<f32>()?;
        let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
        if dims.len() != 3 || dims[0] != 1 || dims[2] < 6 {
            return Err(DetectorError::Output(format!(
                "expected [1, N, 5 + classes], got {:?}",
                dims
            )));
        }

        ndarray::Array2::from_shape_vec((dims[1], dims[2]), data.to_vec())
            .map_err(|e| DetectorError::Output(e.to_string()))
    }
}

impl Detector for OrtDetector {
    fn detect(
        &self,
        image: &DynamicImage,
        params: &InferenceParams,
    ) -> Result<Vec<Detection>, DetectorError> {
        let (img_width, img_height) = image.dimensions();
        let input = transform_image(image, self.input_size);
        let rows = self.run_inference(&input)?;

        let scale_x = img_width as f32 / self.input_size as f32;
        let scale_y = img_height as f32 / self.input_size as f32;
        let candidates = decode_rows(rows.view(), scale_x, scale_y, params.confidence_floor);
        let kept = non_max_suppression(candidates, params.iou_threshold, params.max_detections);

        Ok(kept
            .into_iter()
            .map(|c| Detection {
                label: self.labels.name(c.class_id),
                confidence: c.confidence,
                bbox: c.bbox,
            })
            .collect())
    }
}
