// Live gesture switch: webcam -> pose model -> gesture engine -> appliance commands.
//
// Usage: camera_runner [config.toml] [--record <session.jsonl>]

mod camera;
mod pose;

use anyhow::{Context, Result, bail};
use camera::Camera;
use pose::PoseEstimator;
use pose_switch::actuator::{CommandActuator, LogActuator};
use pose_switch::recording::LandmarkRecorder;
use pose_switch::{ActionIntent, Actuator, Config, Gesture, GesturePipeline, TickLoop, telemetry};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info};

struct Args {
    config: Option<PathBuf>,
    record: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        config: None,
        record: None,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--record" => {
                let path = iter.next().context("--record needs a file path")?;
                args.record = Some(PathBuf::from(path));
            }
            "-h" | "--help" => {
                println!("Usage: camera_runner [config.toml] [--record <session.jsonl>]");
                std::process::exit(0);
            }
            other if args.config.is_none() => args.config = Some(PathBuf::from(other)),
            other => bail!("unexpected argument: {other}"),
        }
    }
    Ok(args)
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();

    // --- 1. Configuration ---
    let args = parse_args()?;
    let config = Config::load_or_default(args.config.as_deref()).context("loading configuration")?;

    // --- 2. Camera & Model ---
    // Failing to open either is fatal before the loop starts.
    let estimator = PoseEstimator::load(&config.model);
    let camera = estimator.and_then(|estimator| Camera::open(&config.capture, estimator));
    let mut camera = match camera {
        Ok(camera) => camera,
        Err(e) => {
            error!("Initialization failed: {}", e);
            std::process::exit(1);
        }
    };

    print_gesture_guide();

    // --- 3. Actuator ---
    let (actuator, actuator_task) = if config.actuator.is_log_only() {
        (Box::new(LogActuator) as Box<dyn Actuator + Send>, None)
    } else {
        let (actuator, task) = CommandActuator::spawn(config.actuator.clone());
        (Box::new(actuator) as Box<dyn Actuator + Send>, Some(task))
    };

    // --- 4. Interrupt Handling ---
    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown requested");
                stop.store(true, Ordering::SeqCst);
            }
        });
    }

    // --- 5. Tick Loop ---
    let mut tick_loop = TickLoop::new(&config, GesturePipeline::new(&config, actuator));
    if let Some(path) = &args.record {
        let recorder = LandmarkRecorder::create(path)
            .with_context(|| format!("creating recording {}", path.display()))?;
        info!(path = %path.display(), "Recording admitted frames");
        tick_loop = tick_loop.with_recorder(recorder);
    }

    let outcome = tokio::task::spawn_blocking(move || {
        let outcome = tick_loop.run(&mut camera, &stop);
        drop(tick_loop);
        outcome
    })
    .await
    .context("tick loop panicked")?;

    if let Some(task) = actuator_task {
        task.await.ok();
    }

    // --- 6. Session Summary ---
    println!("{}", outcome.summary);
    if outcome.is_failure() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_gesture_guide() {
    println!("GESTURE CONTROL SYSTEM");
    println!("======================");
    for gesture in Gesture::ALL.into_iter().filter(Gesture::is_gesture) {
        println!(
            "  {:<22} -> {}",
            gesture.describe(),
            ActionIntent::for_gesture(gesture).label()
        );
    }
    println!("Press Ctrl+C to exit");
}
