// THEORY:
// The `PoseEstimator` wraps a single-person BlazePose landmark model exported to ONNX.
// It turns one BGR camera frame into an `Observation`.
//
// Key architectural principles:
// 1.  **Whole-Frame Input**: The full frame is resized to the model's square input.
//     Landmarks come back in input pixels and are divided by the input edge, which
//     makes them normalized coordinates of the original frame. Aspect distortion
//     affects both axes of a limb equally, so the classifier's comparisons hold.
// 2.  **Presence Gate**: The model always emits 39 points. Whether a person is there
//     at all is decided by its presence score alone; below the configured confidence
//     the frame is reported as `NoSubject` and the points are discarded.

use image::{RgbImage, imageops::FilterType};
use opencv::{
    core::{AlgorithmHint, Mat},
    imgproc,
    prelude::*,
};
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::{Tensor, Value};
use pose_switch::config::ModelConfig;
use pose_switch::core_modules::landmark::LANDMARK_COUNT;
use pose_switch::{Landmark, LandmarkFrame, Observation, PoseSwitchError, Result};
use std::path::Path;
use tracing::{debug, info};

/// Values per model point: x, y, z, visibility, presence.
const MODEL_POINT_STRIDE: usize = 5;

pub struct PoseEstimator {
    session: Session,
    landmark_output: String,
    presence_output: String,
    input_size: u32,
    min_detection_confidence: f32,
}

impl PoseEstimator {
    pub fn load(config: &ModelConfig) -> Result<Self> {
        let path = Path::new(&config.path);
        if !path.exists() {
            return Err(PoseSwitchError::initialization(format!(
                "pose model not found at {}",
                path.display()
            )));
        }
        let model_bytes = std::fs::read(path)?;

        let session = Session::builder()
            .map_err(|e| PoseSwitchError::initialization(format!("ORT session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| PoseSwitchError::initialization(format!("ORT opt level: {e}")))?
            .commit_from_memory(model_bytes.as_slice())
            .map_err(|e| PoseSwitchError::initialization(format!("ORT load model: {e}")))?;

        // Landmarks first, presence flag second; any further heads are unused.
        let mut names = session.outputs.iter().map(|output| output.name.clone());
        let (Some(landmark_output), Some(presence_output)) = (names.next(), names.next()) else {
            return Err(PoseSwitchError::initialization(
                "pose model must expose landmark and presence outputs",
            ));
        };

        info!(
            model = %path.display(),
            input_size = config.input_size,
            %landmark_output,
            %presence_output,
            "Pose model loaded"
        );

        Ok(Self {
            session,
            landmark_output,
            presence_output,
            input_size: config.input_size,
            min_detection_confidence: config.min_detection_confidence,
        })
    }

    /// Estimates landmarks for one BGR frame.
    pub fn estimate(&mut self, frame_bgr: &Mat) -> Result<Observation> {
        // --- 1. Preprocess ---
        let input = to_input_tensor(frame_bgr, self.input_size)?;

        // --- 2. Inference ---
        let outputs = self
            .session
            .run(ort::inputs![input])
            .map_err(|e| PoseSwitchError::estimation(format!("ORT run failed: {e}")))?;

        let presence = outputs
            .get(self.presence_output.as_str())
            .ok_or_else(|| PoseSwitchError::estimation("missing presence output"))?
            .try_extract_tensor::<f32>()
            .map_err(|e| PoseSwitchError::estimation(format!("ORT extract: {e}")))?
            .1
            .first()
            .copied()
            .map(presence_probability)
            .unwrap_or(0.0);

        // --- 3. Presence Gate ---
        if presence < self.min_detection_confidence {
            debug!(presence, "No subject in frame");
            return Ok(Observation::NoSubject);
        }

        let (_, raw) = outputs
            .get(self.landmark_output.as_str())
            .ok_or_else(|| PoseSwitchError::estimation("missing landmark output"))?
            .try_extract_tensor::<f32>()
            .map_err(|e| PoseSwitchError::estimation(format!("ORT extract: {e}")))?;

        decode_landmarks(raw, self.input_size as f32).map(Observation::Subject)
    }
}

/// Converts a BGR frame to a `[1, size, size, 3]` RGB tensor scaled to `[0, 1]`.
fn to_input_tensor(frame_bgr: &Mat, size: u32) -> Result<Value> {
    let mut rgb = Mat::default();
    imgproc::cvt_color(
        frame_bgr,
        &mut rgb,
        imgproc::COLOR_BGR2RGB,
        0,
        AlgorithmHint::ALGO_HINT_DEFAULT,
    )
    .map_err(|e| PoseSwitchError::estimation(format!("BGR2RGB failed: {e}")))?;

    let (width, height) = (rgb.cols() as u32, rgb.rows() as u32);
    let bytes = rgb
        .data_bytes()
        .map_err(|e| PoseSwitchError::estimation(format!("Mat data: {e}")))?
        .to_vec();
    let image = RgbImage::from_raw(width, height, bytes)
        .ok_or_else(|| PoseSwitchError::estimation("frame buffer does not match its size"))?;
    let resized = image::imageops::resize(&image, size, size, FilterType::Triangle);

    let data: Vec<f32> = resized.as_raw().iter().map(|&v| v as f32 / 255.0).collect();
    let shape = vec![1usize, size as usize, size as usize, 3];
    Tensor::from_array((shape, data.into_boxed_slice()))
        .map(Value::from)
        .map_err(|e| PoseSwitchError::estimation(format!("ORT tensor: {e}")))
}

/// Some exports emit the presence flag as a logit rather than a probability.
fn presence_probability(raw: f32) -> f32 {
    if (0.0..=1.0).contains(&raw) {
        raw
    } else {
        1.0 / (1.0 + (-raw).exp())
    }
}

/// Takes the 33 body points from the flat model output and normalizes them to the frame.
fn decode_landmarks(raw: &[f32], input_size: f32) -> Result<LandmarkFrame> {
    if raw.len() < LANDMARK_COUNT * MODEL_POINT_STRIDE {
        return Err(PoseSwitchError::InvalidFrame {
            expected: LANDMARK_COUNT,
            actual: raw.len() / MODEL_POINT_STRIDE,
        });
    }

    let points: Vec<Landmark> = raw
        .chunks_exact(MODEL_POINT_STRIDE)
        .take(LANDMARK_COUNT)
        .map(|p| Landmark::new(p[0] / input_size, p[1] / input_size, p[2] / input_size))
        .collect();
    LandmarkFrame::from_slice(&points)
}
