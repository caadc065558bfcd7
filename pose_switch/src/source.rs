// THEORY:
// The `source` module is where the engine meets its external collaborator, the
// landmark source, and where the tick loop lives.
//
// Key architectural principles:
// 1.  **Grab, Then Retrieve**: Acquiring a frame and estimating its landmarks are two
//     separate calls, the way capture devices separate grabbing a frame from decoding
//     it. The loop only calls `retrieve` for admitted frames, so rejected frames never
//     pay for pose estimation.
// 2.  **Contained Failures**: A failed grab, a frame that cannot be decoded, or a
//     failed estimate costs one tick and nothing more. Only a run of consecutive
//     failed grabs or failed decodes (bounded by configuration) ends the loop with an
//     error. Errors a source cannot recover from, such as a corrupt recording, end
//     it at once.
// 3.  **Fail Closed on Bad Frames**: A frame the source reports with the wrong number
//     of landmarks is fed to the pipeline as "no subject", which breaks any streak in
//     progress rather than silently holding it.
// 4.  **Stop Between Ticks**: An external stop flag is only checked at the top of
//     the loop, so a tick is never half-applied. The source is always released and a
//     session summary is always produced, however the loop ends.

use crate::config::Config;
use crate::core_modules::dispatcher::Actuator;
use crate::core_modules::landmark::Observation;
use crate::error::{PoseSwitchError, Result};
use crate::pipeline::{GesturePipeline, SessionSummary};
use crate::recording::LandmarkRecorder;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, info, warn};

/// Supplies landmarks, one captured frame at a time.
pub trait LandmarkSource {
    /// Acquires the next frame. Returns `Ok(false)` once the stream has ended.
    fn grab(&mut self) -> Result<bool>;

    /// Estimates landmarks for the most recently grabbed frame.
    fn retrieve(&mut self) -> Result<Observation>;

    /// Releases the underlying device. Called once, after the last tick.
    fn release(&mut self) {}
}

impl<S: LandmarkSource + ?Sized> LandmarkSource for Box<S> {
    fn grab(&mut self) -> Result<bool> {
        (**self).grab()
    }

    fn retrieve(&mut self) -> Result<Observation> {
        (**self).retrieve()
    }

    fn release(&mut self) {
        (**self).release()
    }
}

/// Why the tick loop ended.
#[derive(Debug)]
pub enum StopReason {
    /// The stop flag was raised.
    Interrupted,
    /// The source reported the end of its stream.
    Exhausted,
    /// A failure that cannot be contained within a tick.
    Failed(PoseSwitchError),
}

#[derive(Debug)]
pub struct RunOutcome {
    pub summary: SessionSummary,
    pub stop_reason: StopReason,
}

impl RunOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self.stop_reason, StopReason::Failed(_))
    }
}

/// Drives a `GesturePipeline` from a `LandmarkSource` until stopped.
pub struct TickLoop<A> {
    pipeline: GesturePipeline<A>,
    recorder: Option<LandmarkRecorder>,
    warmup: Duration,
    tick_pause: Duration,
    max_consecutive_failures: u32,
}

impl<A: Actuator> TickLoop<A> {
    pub fn new(config: &Config, pipeline: GesturePipeline<A>) -> Self {
        Self {
            pipeline,
            recorder: None,
            warmup: config.capture.warmup(),
            tick_pause: config.diagnostics.tick_pause(),
            max_consecutive_failures: config.capture.max_consecutive_failures,
        }
    }

    /// Records every admitted observation.
    pub fn with_recorder(mut self, recorder: LandmarkRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    pub fn with_tick_pause(mut self, tick_pause: Duration) -> Self {
        self.tick_pause = tick_pause;
        self
    }

    pub fn pipeline(&self) -> &GesturePipeline<A> {
        &self.pipeline
    }

    pub fn into_pipeline(self) -> GesturePipeline<A> {
        self.pipeline
    }

    /// Runs ticks until `stop` is raised, the source ends, or a fatal failure occurs.
    pub fn run<S: LandmarkSource + ?Sized>(&mut self, source: &mut S, stop: &AtomicBool) -> RunOutcome {
        if !self.warmup.is_zero() {
            info!(warmup_ms = self.warmup.as_millis() as u64, "Waiting for capture to settle");
            std::thread::sleep(self.warmup);
        }
        info!("Detecting gestures");

        let stop_reason = self.run_ticks(source, stop);

        // --- Teardown ---
        source.release();
        if let Some(recorder) = self.recorder.as_mut() {
            if let Err(e) = recorder.flush() {
                warn!("Failed to flush recording: {}", e);
            }
        }

        let summary = self.pipeline.summary();
        match &stop_reason {
            StopReason::Failed(e) => error!("Tick loop aborted: {}", e),
            reason => info!(?reason, "Tick loop finished"),
        }
        info!(
            frames_captured = summary.frames_captured,
            frames_processed = summary.frames_processed,
            elapsed_secs = summary.elapsed.as_secs_f64(),
            average_fps = summary.average_fps,
            classified_fps = summary.classified_fps,
            last_gesture = %summary.last_gesture,
            "Session complete"
        );

        RunOutcome { summary, stop_reason }
    }

    /// Ends the run once `failures` consecutive reads have failed. A limit of zero never does.
    fn escalate(&self, failures: u32) -> Option<StopReason> {
        (self.max_consecutive_failures > 0 && failures >= self.max_consecutive_failures).then(|| {
            StopReason::Failed(PoseSwitchError::TooManyAcquisitionFailures { count: failures })
        })
    }

    fn run_ticks<S: LandmarkSource + ?Sized>(&mut self, source: &mut S, stop: &AtomicBool) -> StopReason {
        // Grabs and decodes fail independently; either streak can end the run.
        let mut failed_grabs: u32 = 0;
        let mut failed_decodes: u32 = 0;

        loop {
            if stop.load(Ordering::SeqCst) {
                return StopReason::Interrupted;
            }

            // --- 1. Acquisition ---
            match source.grab() {
                Ok(true) => failed_grabs = 0,
                Ok(false) => return StopReason::Exhausted,
                Err(e) if e.is_per_tick() => {
                    failed_grabs += 1;
                    warn!(consecutive_failures = failed_grabs, "Failed to read frame: {}", e);
                    if let Some(reason) = self.escalate(failed_grabs) {
                        return reason;
                    }
                    continue;
                }
                Err(e) => return StopReason::Failed(e),
            }

            // --- 2. Admission ---
            let frame_index = self.pipeline.next_frame_index();
            if !self.pipeline.should_admit(frame_index) {
                continue;
            }

            // --- 3. Landmarks ---
            let observation = match source.retrieve() {
                Ok(observation) => observation,
                Err(e @ PoseSwitchError::Acquisition(_)) => {
                    failed_decodes += 1;
                    warn!(frame_index, consecutive_failures = failed_decodes, "Failed to decode frame: {}", e);
                    if let Some(reason) = self.escalate(failed_decodes) {
                        return reason;
                    }
                    continue;
                }
                Err(e @ PoseSwitchError::InvalidFrame { .. }) => {
                    warn!(frame_index, "Unclassifiable frame: {}", e);
                    Observation::NoSubject
                }
                Err(e) if e.is_per_tick() => {
                    failed_decodes = 0;
                    warn!(frame_index, "Skipping frame: {}", e);
                    continue;
                }
                Err(e) => return StopReason::Failed(e),
            };
            failed_decodes = 0;

            if let Some(recorder) = self.recorder.as_mut() {
                if let Err(e) = recorder.record(frame_index, &observation) {
                    warn!(frame_index, "Failed to record frame: {}", e);
                }
            }

            // --- 4. Classification, confirmation, dispatch ---
            self.pipeline.process(frame_index, &observation);

            if !self.tick_pause.is_zero() {
                std::thread::sleep(self.tick_pause);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::classifier::tests::{neutral_pose, raise};
    use crate::core_modules::dispatcher::tests::RecordingActuator;
    use crate::core_modules::gesture::Gesture;
    use crate::core_modules::landmark::PoseLandmark;
    use std::collections::VecDeque;

    /// Plays back a scripted sequence of grab/retrieve results.
    struct ScriptedSource {
        script: VecDeque<Result<Observation>>,
        pending: Option<Result<Observation>>,
        retrieved: usize,
        released: bool,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<Observation>>) -> Self {
            Self {
                script: script.into(),
                pending: None,
                retrieved: 0,
                released: false,
            }
        }
    }

    impl LandmarkSource for ScriptedSource {
        fn grab(&mut self) -> Result<bool> {
            match self.script.pop_front() {
                None => Ok(false),
                Some(Err(PoseSwitchError::Acquisition(m))) => Err(PoseSwitchError::Acquisition(m)),
                Some(next) => {
                    self.pending = Some(next);
                    Ok(true)
                }
            }
        }

        fn retrieve(&mut self) -> Result<Observation> {
            self.retrieved += 1;
            self.pending
                .take()
                .unwrap_or_else(|| Err(PoseSwitchError::estimation("nothing grabbed")))
        }

        fn release(&mut self) {
            self.released = true;
        }
    }

    /// Grabs forever but never manages to decode a frame.
    struct UndecodableSource {
        grabs: u32,
    }

    impl LandmarkSource for UndecodableSource {
        fn grab(&mut self) -> Result<bool> {
            self.grabs += 1;
            Ok(self.grabs <= 50)
        }

        fn retrieve(&mut self) -> Result<Observation> {
            Err(PoseSwitchError::acquisition("grabbed frame could not be decoded"))
        }
    }

    /// Grabs every frame; decodes only those marked `true`.
    struct FlakyDecoder {
        decodes: VecDeque<bool>,
        current: bool,
    }

    impl LandmarkSource for FlakyDecoder {
        fn grab(&mut self) -> Result<bool> {
            match self.decodes.pop_front() {
                Some(decodes) => {
                    self.current = decodes;
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        fn retrieve(&mut self) -> Result<Observation> {
            if self.current {
                left_hand_up()
            } else {
                Err(PoseSwitchError::acquisition("corrupt frame"))
            }
        }
    }

    /// A source whose stream is unreadable from the first frame.
    struct CorruptSource;

    impl LandmarkSource for CorruptSource {
        fn grab(&mut self) -> Result<bool> {
            Err(PoseSwitchError::Recording {
                line: 1,
                message: "expected value".to_string(),
            })
        }

        fn retrieve(&mut self) -> Result<Observation> {
            Err(PoseSwitchError::estimation("nothing grabbed"))
        }
    }

    fn quiet_config() -> Config {
        let mut config = Config::default();
        config.capture.warmup_ms = 0;
        config.diagnostics.tick_pause_ms = 0;
        config
    }

    fn tick_loop(config: &Config) -> TickLoop<RecordingActuator> {
        TickLoop::new(config, GesturePipeline::new(config, RecordingActuator::default()))
    }

    fn left_hand_up() -> Result<Observation> {
        let mut frame = neutral_pose();
        raise(&mut frame, PoseLandmark::LeftWrist);
        Ok(Observation::Subject(frame))
    }

    #[test]
    fn rejected_frames_are_never_retrieved() {
        let config = quiet_config();
        let mut source = ScriptedSource::new((0..6).map(|_| left_hand_up()).collect());
        let mut tick_loop = tick_loop(&config);

        let outcome = tick_loop.run(&mut source, &AtomicBool::new(false));
        assert!(matches!(outcome.stop_reason, StopReason::Exhausted));
        assert_eq!(source.retrieved, 3);
        assert!(source.released);
        assert_eq!(outcome.summary.frames_captured, 6);
        assert_eq!(outcome.summary.frames_processed, 3);
        assert_eq!(outcome.summary.commands_fired, 1);
    }

    #[test]
    fn consecutive_acquisition_failures_escalate() {
        let config = quiet_config();
        let script = vec![
            left_hand_up(),
            Err(PoseSwitchError::acquisition("camera unplugged")),
            Err(PoseSwitchError::acquisition("camera unplugged")),
            Err(PoseSwitchError::acquisition("camera unplugged")),
            left_hand_up(),
        ];
        let mut source = ScriptedSource::new(script);
        let outcome = tick_loop(&config).run(&mut source, &AtomicBool::new(false));

        assert!(outcome.is_failure());
        assert!(matches!(
            outcome.stop_reason,
            StopReason::Failed(PoseSwitchError::TooManyAcquisitionFailures { count: 3 })
        ));
        assert!(source.released);
        assert_eq!(outcome.summary.frames_captured, 1);
    }

    #[test]
    fn consecutive_decode_failures_escalate() {
        let config = quiet_config();
        let mut source = UndecodableSource { grabs: 0 };
        let outcome = tick_loop(&config).run(&mut source, &AtomicBool::new(false));

        assert!(outcome.is_failure());
        assert!(matches!(
            outcome.stop_reason,
            StopReason::Failed(PoseSwitchError::TooManyAcquisitionFailures { count: 3 })
        ));
        // Admitted frames 0, 2 and 4 failed to decode.
        assert_eq!(outcome.summary.frames_captured, 5);
        assert_eq!(outcome.summary.frames_processed, 0);
    }

    #[test]
    fn decode_failures_reset_after_a_good_frame() {
        let mut config = quiet_config();
        config.scheduler.admission_modulus = 1;
        let mut source = FlakyDecoder {
            decodes: VecDeque::from([false, false, true, false, false, true]),
            current: false,
        };
        let outcome = tick_loop(&config).run(&mut source, &AtomicBool::new(false));

        assert!(matches!(outcome.stop_reason, StopReason::Exhausted));
        assert_eq!(outcome.summary.frames_processed, 2);
    }

    #[test]
    fn unrecoverable_source_errors_end_the_run() {
        let config = quiet_config();
        let outcome = tick_loop(&config).run(&mut CorruptSource, &AtomicBool::new(false));
        assert!(matches!(
            outcome.stop_reason,
            StopReason::Failed(PoseSwitchError::Recording { line: 1, .. })
        ));
    }

    #[test]
    fn isolated_failures_are_skipped() {
        let config = quiet_config();
        let mut script = Vec::new();
        for _ in 0..4 {
            script.push(left_hand_up());
            script.push(Err(PoseSwitchError::acquisition("dropped frame")));
            script.push(Err(PoseSwitchError::acquisition("dropped frame")));
        }
        let mut source = ScriptedSource::new(script);
        let outcome = tick_loop(&config).run(&mut source, &AtomicBool::new(false));

        assert!(matches!(outcome.stop_reason, StopReason::Exhausted));
        assert_eq!(outcome.summary.frames_captured, 4);
    }

    #[test]
    fn unbounded_failures_when_limit_is_zero() {
        let mut config = quiet_config();
        config.capture.max_consecutive_failures = 0;
        let script = (0..10)
            .map(|_| Err(PoseSwitchError::acquisition("no signal")))
            .collect();
        let mut source = ScriptedSource::new(script);
        let outcome = tick_loop(&config).run(&mut source, &AtomicBool::new(false));
        assert!(matches!(outcome.stop_reason, StopReason::Exhausted));
    }

    #[test]
    fn invalid_frames_break_the_streak() {
        let mut config = quiet_config();
        config.scheduler.admission_modulus = 1;
        let script = vec![
            left_hand_up(),
            left_hand_up(),
            Err(PoseSwitchError::InvalidFrame {
                expected: 33,
                actual: 12,
            }),
            left_hand_up(),
            left_hand_up(),
        ];
        let mut source = ScriptedSource::new(script);
        let outcome = tick_loop(&config).run(&mut source, &AtomicBool::new(false));

        assert_eq!(outcome.summary.frames_processed, 5);
        assert_eq!(outcome.summary.commands_fired, 0);
        assert_eq!(outcome.summary.last_gesture, Gesture::LeftHandUp);
    }

    #[test]
    fn estimation_failures_skip_the_tick() {
        let mut config = quiet_config();
        config.scheduler.admission_modulus = 1;
        let script = vec![
            left_hand_up(),
            left_hand_up(),
            Err(PoseSwitchError::estimation("model hiccup")),
            left_hand_up(),
        ];
        let mut source = ScriptedSource::new(script);
        let outcome = tick_loop(&config).run(&mut source, &AtomicBool::new(false));

        assert_eq!(outcome.summary.frames_processed, 3);
        assert_eq!(outcome.summary.commands_fired, 1);
    }

    #[test]
    fn stop_flag_ends_before_the_next_tick() {
        let config = quiet_config();
        let mut source = ScriptedSource::new((0..4).map(|_| left_hand_up()).collect());
        let outcome = tick_loop(&config).run(&mut source, &AtomicBool::new(true));

        assert!(matches!(outcome.stop_reason, StopReason::Interrupted));
        assert_eq!(outcome.summary.frames_captured, 0);
        assert!(source.released);
    }
}
