//! Concrete actuators for the command dispatcher.
//!
//! The tick loop is synchronous and must never wait on the appliance, so the
//! command actuator only enqueues intents. A tokio task drains the queue and
//! runs the configured on/off command for each one, in order.

use crate::config::ActuatorConfig;
use crate::core_modules::dispatcher::{ActionIntent, Actuator, CommandEvent};
use crate::error::{PoseSwitchError, Result};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Logs what the appliance would do without touching any hardware.
#[derive(Debug, Default)]
pub struct LogActuator;

impl Actuator for LogActuator {
    fn actuate(&mut self, event: &CommandEvent) -> Result<()> {
        info!(gesture = %event.gesture, "[ACTION] Would turn {} appliance", event.intent);
        Ok(())
    }
}

/// Hands intents to a background task that runs external commands.
#[derive(Debug, Clone)]
pub struct CommandActuator {
    tx: mpsc::UnboundedSender<CommandEvent>,
}

impl CommandActuator {
    /// Starts the background task. Must be called from within a tokio runtime.
    ///
    /// The task ends once every `CommandActuator` clone has been dropped and the
    /// queue is drained.
    pub fn spawn(config: ActuatorConfig) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_commands(config, rx));
        (Self { tx }, handle)
    }
}

impl Actuator for CommandActuator {
    fn actuate(&mut self, event: &CommandEvent) -> Result<()> {
        self.tx
            .send(*event)
            .map_err(|_| PoseSwitchError::Actuator("command task has stopped".to_string()))
    }
}

async fn run_commands(config: ActuatorConfig, mut rx: mpsc::UnboundedReceiver<CommandEvent>) {
    while let Some(event) = rx.recv().await {
        let argv = match event.intent {
            ActionIntent::On => &config.on_command,
            ActionIntent::Off => &config.off_command,
            ActionIntent::None => continue,
        };

        let Some((program, args)) = argv.split_first() else {
            info!(gesture = %event.gesture, "[ACTION] No command configured for {}", event.intent);
            continue;
        };

        debug!(program = %program, ?args, "Running actuator command");
        let status = Command::new(program).args(args).kill_on_drop(true).status();
        match timeout(config.timeout(), status).await {
            Ok(Ok(status)) if status.success() => {
                info!(gesture = %event.gesture, intent = %event.intent, "Appliance switched")
            }
            Ok(Ok(status)) => warn!(intent = %event.intent, "Actuator command exited with {}", status),
            Ok(Err(e)) => warn!(intent = %event.intent, "Failed to run actuator command {}: {}", program, e),
            Err(_) => warn!(
                intent = %event.intent,
                timeout_ms = config.timeout_ms,
                "Actuator command {} timed out and was killed",
                program
            ),
        }
    }
    debug!("Actuator queue closed");
}
