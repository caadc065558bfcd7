use crate::core_modules::confirmation::DEFAULT_CONFIRM_THRESHOLD;
use crate::core_modules::gesture::ThresholdConfig;
use crate::core_modules::scheduler::DEFAULT_ADMISSION_MODULUS;
use crate::error::{PoseSwitchError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Startup configuration. Every field has a default; nothing is hot-reloaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub thresholds: ThresholdConfig,
    pub confirmation: ConfirmationConfig,
    pub scheduler: SchedulerConfig,
    pub capture: CaptureConfig,
    pub model: ModelConfig,
    pub diagnostics: DiagnosticsConfig,
    pub actuator: ActuatorConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// Consecutive identical admitted frames before a gesture fires.
    pub confirm_threshold: u32,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            confirm_threshold: DEFAULT_CONFIRM_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Classify one in every `admission_modulus` captured frames.
    pub admission_modulus: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            admission_modulus: DEFAULT_ADMISSION_MODULUS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub device: i32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Pause between opening the camera and the first tick.
    pub warmup_ms: u64,
    /// Consecutive failed reads tolerated before the run is aborted. Zero never aborts.
    pub max_consecutive_failures: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: 0,
            width: 320,
            height: 240,
            fps: 15,
            warmup_ms: 2000,
            max_consecutive_failures: 3,
        }
    }
}

impl CaptureConfig {
    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path: String,
    /// Square input edge expected by the pose model.
    pub input_size: u32,
    /// Below this presence score the frame is treated as having no subject.
    pub min_detection_confidence: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: "models/pose_landmark_full.onnx".to_string(),
            input_size: 256,
            min_detection_confidence: 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Emit a status report every this many admitted frames. Zero disables it.
    pub status_interval: u64,
    /// Sleep after each admitted frame to leave CPU for capture.
    pub tick_pause_ms: u64,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            status_interval: 15,
            tick_pause_ms: 10,
        }
    }
}

impl DiagnosticsConfig {
    pub fn tick_pause(&self) -> Duration {
        Duration::from_millis(self.tick_pause_ms)
    }
}

/// Commands run for each intent, as argv arrays. Empty means log only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActuatorConfig {
    pub on_command: Vec<String>,
    pub off_command: Vec<String>,
    /// A command still running after this long is killed so later intents can run.
    pub timeout_ms: u64,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            on_command: Vec::new(),
            off_command: Vec::new(),
            timeout_ms: 5000,
        }
    }
}

impl ActuatorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn is_log_only(&self) -> bool {
        self.on_command.is_empty() && self.off_command.is_empty()
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PoseSwitchError::ConfigNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Loads `path` when given, otherwise the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let ThresholdConfig {
            raise_threshold,
            cross_threshold,
        } = self.thresholds;

        if !raise_threshold.is_finite() || raise_threshold < 0.0 {
            return Err(PoseSwitchError::Config(format!(
                "raise_threshold must be a non-negative number, got {raise_threshold}"
            )));
        }
        if !cross_threshold.is_finite() || cross_threshold <= 0.0 {
            return Err(PoseSwitchError::Config(format!(
                "cross_threshold must be a positive number, got {cross_threshold}"
            )));
        }
        if self.confirmation.confirm_threshold == 0 {
            return Err(PoseSwitchError::Config(
                "confirm_threshold must be at least 1".to_string(),
            ));
        }
        if self.scheduler.admission_modulus == 0 {
            return Err(PoseSwitchError::Config(
                "admission_modulus must be at least 1".to_string(),
            ));
        }
        if self.actuator.timeout_ms == 0 {
            return Err(PoseSwitchError::Config(
                "actuator timeout_ms must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.model.min_detection_confidence) {
            return Err(PoseSwitchError::Config(format!(
                "min_detection_confidence must be within [0, 1], got {}",
                self.model.min_detection_confidence
            )));
        }
        Ok(())
    }
}
