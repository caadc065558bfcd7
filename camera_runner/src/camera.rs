// THEORY:
// The `Camera` is the live landmark source. It owns the capture device and the pose
// estimator and maps the grab/retrieve split of `LandmarkSource` directly onto the
// device: `grab` only pulls a frame off the sensor, `retrieve` decodes it and runs
// the model. Frames the scheduler rejects are grabbed and dropped undecoded.

use crate::pose::PoseEstimator;
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture},
};
use pose_switch::config::CaptureConfig;
use pose_switch::{LandmarkSource, Observation, PoseSwitchError, Result};
use tracing::{info, warn};

pub struct Camera {
    capture: VideoCapture,
    estimator: PoseEstimator,
    frame: Mat,
}

impl Camera {
    pub fn open(config: &CaptureConfig, estimator: PoseEstimator) -> Result<Self> {
        let mut capture = VideoCapture::new(config.device, videoio::CAP_ANY)
            .map_err(|e| PoseSwitchError::initialization(format!("opening camera {}: {e}", config.device)))?;
        let opened = capture
            .is_opened()
            .map_err(|e| PoseSwitchError::initialization(format!("querying camera: {e}")))?;
        if !opened {
            return Err(PoseSwitchError::initialization(format!(
                "camera {} could not be opened",
                config.device
            )));
        }

        // Drivers are free to ignore these; the estimator copes with any frame size.
        for (prop, value) in [
            (videoio::CAP_PROP_FRAME_WIDTH, config.width as f64),
            (videoio::CAP_PROP_FRAME_HEIGHT, config.height as f64),
            (videoio::CAP_PROP_FPS, config.fps as f64),
        ] {
            if !capture.set(prop, value).unwrap_or(false) {
                warn!(prop, value, "Camera rejected capture property");
            }
        }

        info!(
            device = config.device,
            width = capture.get(videoio::CAP_PROP_FRAME_WIDTH).unwrap_or(0.0),
            height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT).unwrap_or(0.0),
            fps = capture.get(videoio::CAP_PROP_FPS).unwrap_or(0.0),
            "Camera opened"
        );

        Ok(Self {
            capture,
            estimator,
            frame: Mat::default(),
        })
    }
}

impl LandmarkSource for Camera {
    fn grab(&mut self) -> Result<bool> {
        // A live device has no end of stream, so an empty grab is a failure.
        match self.capture.grab() {
            Ok(true) => Ok(true),
            Ok(false) => Err(PoseSwitchError::acquisition("camera returned no frame")),
            Err(e) => Err(PoseSwitchError::acquisition(e.to_string())),
        }
    }

    fn retrieve(&mut self) -> Result<Observation> {
        let decoded = self
            .capture
            .retrieve(&mut self.frame, 0)
            .map_err(|e| PoseSwitchError::acquisition(e.to_string()))?;
        if !decoded || self.frame.empty() {
            return Err(PoseSwitchError::acquisition("grabbed frame could not be decoded"));
        }
        self.estimator.estimate(&self.frame)
    }

    fn release(&mut self) {
        if let Err(e) = self.capture.release() {
            warn!("Failed to release camera: {}", e);
        }
    }
}
