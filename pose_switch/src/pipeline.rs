// THEORY:
// The `pipeline` module is the top-level API of the gesture engine. It owns exactly
// one instance of each stage (scheduler, classifier configuration, confirmation
// state, dispatcher) and threads every captured frame through them in order:
//
//     capture index -> admission -> classification -> confirmation -> dispatch
//
// There is no module-level mutable state anywhere in the engine; frame counters, the
// last gesture and the throughput clock all live in this one struct, created once at
// startup and owned by the thread running the tick loop. A tick either completes all
// stages or, if the frame is not admitted, touches none of them.

use crate::config::Config;
use crate::core_modules::classifier::classify_observation;
use crate::core_modules::confirmation::ConfirmationState;
use crate::core_modules::dispatcher::{ActionIntent, Actuator, CommandEvent, Dispatcher};
use crate::core_modules::gesture::{Gesture, ThresholdConfig};
use crate::core_modules::landmark::Observation;
use crate::core_modules::scheduler::{FrameScheduler, rate};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// What happened to one admitted frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub frame_index: u64,
    pub gesture: Gesture,
    pub streak: u32,
    pub fps: f64,
    /// Set on the single frame a streak is confirmed.
    pub command: Option<CommandEvent>,
}

/// The outcome of one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// The scheduler rejected the frame; no stage ran.
    Skipped { frame_index: u64 },
    Processed(FrameReport),
}

impl TickOutcome {
    pub fn report(&self) -> Option<&FrameReport> {
        match self {
            TickOutcome::Skipped { .. } => None,
            TickOutcome::Processed(report) => Some(report),
        }
    }

    pub fn command(&self) -> Option<CommandEvent> {
        self.report().and_then(|r| r.command)
    }
}

/// A point-in-time view of the pipeline for the diagnostics surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusReport {
    pub frames_captured: u64,
    pub frames_processed: u64,
    pub fps: f64,
    pub streak: u32,
    pub gesture: Gesture,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Frame: {:6} | FPS: {:5.1} | Confidence: {:2} | {} [{}]",
            self.frames_captured,
            self.fps,
            self.streak,
            self.gesture,
            ActionIntent::for_gesture(self.gesture).label()
        )
    }
}

/// Printed once when the run ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSummary {
    pub frames_captured: u64,
    pub frames_processed: u64,
    pub elapsed: Duration,
    /// Captured frames per second.
    pub average_fps: f64,
    /// Admitted (classified) frames per second.
    pub classified_fps: f64,
    pub last_gesture: Gesture,
    pub commands_fired: u64,
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SESSION SUMMARY:")?;
        writeln!(f, "   Frames captured:  {}", self.frames_captured)?;
        writeln!(f, "   Frames processed: {}", self.frames_processed)?;
        writeln!(f, "   Total time:       {:.1} seconds", self.elapsed.as_secs_f64())?;
        writeln!(f, "   Average FPS:      {:.1}", self.average_fps)?;
        writeln!(f, "   Classified FPS:   {:.1}", self.classified_fps)?;
        writeln!(f, "   Commands fired:   {}", self.commands_fired)?;
        write!(f, "   Final gesture:    {}", self.last_gesture)
    }
}

/// The gesture engine: one tick per captured frame.
pub struct GesturePipeline<A> {
    thresholds: ThresholdConfig,
    scheduler: FrameScheduler,
    confirmation: ConfirmationState,
    dispatcher: Dispatcher<A>,
    status_interval: u64,
}

impl<A: Actuator> GesturePipeline<A> {
    pub fn new(config: &Config, actuator: A) -> Self {
        Self::starting_at(config, actuator, Instant::now())
    }

    /// Creates a pipeline whose throughput clock starts at `started_at`.
    pub fn starting_at(config: &Config, actuator: A, started_at: Instant) -> Self {
        Self {
            thresholds: config.thresholds,
            scheduler: FrameScheduler::starting_at(config.scheduler.admission_modulus, started_at),
            confirmation: ConfirmationState::new(config.confirmation.confirm_threshold),
            dispatcher: Dispatcher::new(actuator),
            status_interval: config.diagnostics.status_interval,
        }
    }

    /// Assigns the next capture index. Call once per successfully captured frame.
    pub fn next_frame_index(&mut self) -> u64 {
        self.scheduler.next_frame_index()
    }

    pub fn should_admit(&self, frame_index: u64) -> bool {
        self.scheduler.should_admit(frame_index)
    }

    /// Runs classification, confirmation and dispatch for an admitted frame.
    pub fn process(&mut self, frame_index: u64, observation: &Observation) -> FrameReport {
        // --- 1. Classification ---
        let gesture = classify_observation(observation, &self.thresholds);

        // --- 2. Temporal confirmation ---
        let advance = self.confirmation.advance(gesture);
        let fps = self.scheduler.record_processed();
        debug!(frame_index, %gesture, streak = advance.streak, "Classified frame");

        // --- 3. Dispatch ---
        let command = advance.should_fire.then(|| CommandEvent {
            gesture,
            intent: self.dispatcher.dispatch(gesture),
        });

        if self.status_interval > 0 && self.scheduler.frames_processed() % self.status_interval == 0 {
            let status = self.status();
            info!(
                frames = status.frames_captured,
                processed = status.frames_processed,
                fps = status.fps,
                streak = status.streak,
                gesture = %status.gesture,
                "{}",
                ActionIntent::for_gesture(status.gesture).label()
            );
        }

        FrameReport {
            frame_index,
            gesture,
            streak: advance.streak,
            fps,
            command,
        }
    }

    /// Captures, admits and processes one frame whose landmarks are already known.
    pub fn tick(&mut self, observation: &Observation) -> TickOutcome {
        let frame_index = self.next_frame_index();
        if !self.should_admit(frame_index) {
            return TickOutcome::Skipped { frame_index };
        }
        TickOutcome::Processed(self.process(frame_index, observation))
    }

    pub fn status(&self) -> StatusReport {
        StatusReport {
            frames_captured: self.scheduler.frames_captured(),
            frames_processed: self.scheduler.frames_processed(),
            fps: self.scheduler.fps(),
            streak: self.confirmation.streak_length(),
            gesture: self.confirmation.last_symbol(),
        }
    }

    pub fn summary(&self) -> SessionSummary {
        let elapsed = self.scheduler.elapsed();
        SessionSummary {
            frames_captured: self.scheduler.frames_captured(),
            frames_processed: self.scheduler.frames_processed(),
            elapsed,
            average_fps: rate(self.scheduler.frames_captured(), elapsed),
            classified_fps: rate(self.scheduler.frames_processed(), elapsed),
            last_gesture: self.confirmation.last_symbol(),
            commands_fired: self.dispatcher.dispatched(),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher<A> {
        &self.dispatcher
    }

    pub fn into_dispatcher(self) -> Dispatcher<A> {
        self.dispatcher
    }
}
