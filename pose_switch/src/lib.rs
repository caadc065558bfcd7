// THEORY:
// This file is the entry point for the `pose_switch` library crate. It exposes the
// gesture engine as a small public API: build a `GesturePipeline` from a `Config`
// and an `Actuator`, then feed it one frame per tick, either directly with
// `GesturePipeline::tick` or through a `TickLoop` driving a `LandmarkSource`.
//
// The engine itself lives in `core_modules`, one stage per module, ordered the way
// data flows through it:
//
//     landmark -> classifier -> confirmation -> dispatcher
//                     ^
//                 scheduler (admission)
//
// Pose estimation and camera capture are deliberately outside this crate; they plug
// in through the `LandmarkSource` trait.

pub mod actuator;
pub mod config;
pub mod core_modules;
pub mod error;
pub mod pipeline;
pub mod recording;
pub mod source;
pub mod telemetry;

pub use config::Config;
pub use core_modules::classifier::{classify, classify_observation, classify_points};
pub use core_modules::confirmation::{Advance, ConfirmationState};
pub use core_modules::dispatcher::{ActionIntent, Actuator, CommandEvent, Dispatcher};
pub use core_modules::gesture::{Gesture, ThresholdConfig};
pub use core_modules::landmark::{Landmark, LandmarkFrame, Observation, PoseLandmark};
pub use core_modules::scheduler::FrameScheduler;
pub use error::{PoseSwitchError, Result};
pub use pipeline::{FrameReport, GesturePipeline, SessionSummary, StatusReport, TickOutcome};
pub use source::{LandmarkSource, RunOutcome, StopReason, TickLoop};
