use pose_switch::actuator::CommandActuator;
use pose_switch::config::ActuatorConfig;
use pose_switch::recording::{LandmarkRecorder, ReplaySource};
use pose_switch::{
    Config, Gesture, GesturePipeline, Landmark, LandmarkFrame, Observation, PoseLandmark, StopReason,
    TickLoop,
};
use std::sync::atomic::AtomicBool;

fn right_hand_up() -> LandmarkFrame {
    let mut frame = LandmarkFrame::default();
    frame.set(PoseLandmark::LeftShoulder, Landmark::new(0.6, 0.4, 0.0));
    frame.set(PoseLandmark::RightShoulder, Landmark::new(0.4, 0.4, 0.0));
    frame.set(PoseLandmark::LeftElbow, Landmark::new(0.65, 0.55, 0.0));
    frame.set(PoseLandmark::RightElbow, Landmark::new(0.3, 0.3, 0.0));
    frame.set(PoseLandmark::LeftWrist, Landmark::new(0.68, 0.7, 0.0));
    frame.set(PoseLandmark::RightWrist, Landmark::new(0.28, 0.15, 0.0));
    frame
}

fn replay_config() -> Config {
    let mut config = Config::default();
    config.scheduler.admission_modulus = 1;
    config.capture.warmup_ms = 0;
    config.diagnostics.tick_pause_ms = 0;
    config
}

#[tokio::test]
async fn recorded_session_switches_the_appliance_off() {
    let dir = tempfile::tempdir().unwrap();
    let recording = dir.path().join("session.jsonl");
    let marker = dir.path().join("appliance_off");

    let mut recorder = LandmarkRecorder::create(&recording).unwrap();
    recorder.record(0, &Observation::NoSubject).unwrap();
    for i in 1..=4 {
        recorder.record(i * 2, &Observation::Subject(right_hand_up())).unwrap();
    }
    recorder.flush().unwrap();
    drop(recorder);

    let mut config = replay_config();
    config.actuator = ActuatorConfig {
        on_command: vec![],
        off_command: vec!["touch".into(), marker.display().to_string()],
        ..ActuatorConfig::default()
    };

    let (actuator, task) = CommandActuator::spawn(config.actuator.clone());
    let mut tick_loop = TickLoop::new(&config, GesturePipeline::new(&config, actuator));
    let mut source = ReplaySource::open(&recording).unwrap();

    let outcome = tokio::task::spawn_blocking(move || {
        let outcome = tick_loop.run(&mut source, &AtomicBool::new(false));
        drop(tick_loop);
        outcome
    })
    .await
    .unwrap();
    task.await.unwrap();

    assert!(matches!(outcome.stop_reason, StopReason::Exhausted));
    assert_eq!(outcome.summary.frames_processed, 5);
    assert_eq!(outcome.summary.commands_fired, 1);
    assert_eq!(outcome.summary.last_gesture, Gesture::RightHandUp);
    assert!(marker.exists());
}

#[test]
fn live_run_can_be_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let source_path = dir.path().join("source.jsonl");
    let copy_path = dir.path().join("copy.jsonl");

    let mut recorder = LandmarkRecorder::create(&source_path).unwrap();
    for i in 0..6 {
        recorder.record(i, &Observation::Subject(right_hand_up())).unwrap();
    }
    recorder.flush().unwrap();
    drop(recorder);

    // Replay through the default every-other-frame scheduler while recording.
    let mut config = replay_config();
    config.scheduler.admission_modulus = 2;
    let pipeline = GesturePipeline::new(&config, pose_switch::actuator::LogActuator);
    let mut tick_loop =
        TickLoop::new(&config, pipeline).with_recorder(LandmarkRecorder::create(&copy_path).unwrap());
    let mut source = ReplaySource::open(&source_path).unwrap();
    tick_loop.run(&mut source, &AtomicBool::new(false));
    drop(tick_loop);

    let copy = std::fs::read_to_string(&copy_path).unwrap();
    let frames: Vec<u64> = copy
        .lines()
        .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap()["frame"].as_u64().unwrap())
        .collect();
    assert_eq!(frames, vec![0, 2, 4]);
}
