// Replays a recorded landmark session through the gesture engine.
//
// Usage: pose_switch <recording.jsonl> [config.toml]

use anyhow::{Context, Result};
use pose_switch::actuator::{CommandActuator, LogActuator};
use pose_switch::recording::ReplaySource;
use pose_switch::{ActionIntent, Actuator, Config, Gesture, GesturePipeline, TickLoop, telemetry};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();

    // --- 1. Argument Parsing & Setup ---
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        println!("Usage: pose_switch <recording.jsonl> [config.toml]");
        return Ok(());
    }
    let recording = PathBuf::from(&args[1]);
    let config_path = args.get(2).map(PathBuf::from);

    let mut config = Config::load_or_default(config_path.as_deref()).context("loading configuration")?;
    // Recordings only hold frames that were already admitted once.
    config.scheduler.admission_modulus = 1;
    config.capture.warmup_ms = 0;

    let mut source = ReplaySource::open(&recording)
        .with_context(|| format!("opening recording {}", recording.display()))?;

    print_gesture_guide(&config);

    // --- 2. Actuator ---
    let (actuator, actuator_task) = if config.actuator.is_log_only() {
        (Box::new(LogActuator) as Box<dyn Actuator + Send>, None)
    } else {
        let (actuator, task) = CommandActuator::spawn(config.actuator.clone());
        (Box::new(actuator) as Box<dyn Actuator + Send>, Some(task))
    };

    // --- 3. Interrupt Handling ---
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

    // --- 4. Tick Loop ---
    let pipeline = GesturePipeline::new(&config, actuator);
    let mut tick_loop = TickLoop::new(&config, pipeline);
    let outcome = tokio::task::spawn_blocking(move || {
        let outcome = tick_loop.run(&mut source, &stop);
        drop(tick_loop);
        outcome
    })
    .await
    .context("tick loop panicked")?;

    if let Some(task) = actuator_task {
        task.await.ok();
    }

    // --- 5. Session Summary ---
    println!("{}", outcome.summary);
    if outcome.is_failure() {
        error!("Replay ended with an error");
        std::process::exit(1);
    }
    Ok(())
}

fn print_gesture_guide(config: &Config) {
    println!("GESTURE GUIDE:");
    for gesture in Gesture::ALL.into_iter().filter(Gesture::is_gesture) {
        println!(
            "  {:<22} -> {:<14} ({})",
            gesture.describe(),
            gesture,
            ActionIntent::for_gesture(gesture).label()
        );
    }
    println!(
        "  Raise threshold: {} | Cross threshold: {} | Confirm after {} frames",
        config.thresholds.raise_threshold,
        config.thresholds.cross_threshold,
        config.confirmation.confirm_threshold
    );
}
