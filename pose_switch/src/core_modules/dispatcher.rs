// THEORY:
// The `dispatcher` is the last stage of the engine and the only one that faces the
// outside world. It turns a confirmed gesture into an ON/OFF intent and hands that
// intent to an `Actuator`.
//
// Key architectural principles:
// 1.  **Stateless Mapping**: The gesture-to-intent table is a pure function. The
//     dispatcher keeps a counter for reporting, nothing that affects the mapping.
// 2.  **Fire and Forget**: Actuators must not block the tick loop. The dispatcher
//     consumes no acknowledgement, and an actuator error is logged and dropped so
//     a broken relay can never stop gesture tracking.

use crate::core_modules::gesture::Gesture;
use crate::error::Result;
use std::fmt;
use tracing::{info, warn};

/// What the appliance should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionIntent {
    On,
    Off,
    None,
}

impl ActionIntent {
    pub fn for_gesture(gesture: Gesture) -> Self {
        match gesture {
            Gesture::BothHandsUp | Gesture::LeftHandUp => ActionIntent::On,
            Gesture::RightHandUp | Gesture::CrossedArms => ActionIntent::Off,
            Gesture::NoGesture => ActionIntent::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
            Self::None => "NONE",
        }
    }

    /// Operator-facing label shown next to a gesture.
    pub fn label(&self) -> &'static str {
        match self {
            Self::On => "ON COMMAND",
            Self::Off => "OFF COMMAND",
            Self::None => "WAITING",
        }
    }
}

impl fmt::Display for ActionIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A confirmed gesture and the intent it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEvent {
    pub gesture: Gesture,
    pub intent: ActionIntent,
}

impl CommandEvent {
    pub fn new(gesture: Gesture) -> Self {
        Self {
            gesture,
            intent: ActionIntent::for_gesture(gesture),
        }
    }
}

/// The side-effecting collaborator that drives the appliance.
///
/// Implementations must return promptly; anything slow belongs on another task.
pub trait Actuator {
    fn actuate(&mut self, event: &CommandEvent) -> Result<()>;
}

impl<A: Actuator + ?Sized> Actuator for Box<A> {
    fn actuate(&mut self, event: &CommandEvent) -> Result<()> {
        (**self).actuate(event)
    }
}

/// Maps confirmed gestures to intents and forwards them to an actuator.
pub struct Dispatcher<A> {
    actuator: A,
    dispatched: u64,
    failures: u64,
}

impl<A: Actuator> Dispatcher<A> {
    pub fn new(actuator: A) -> Self {
        Self {
            actuator,
            dispatched: 0,
            failures: 0,
        }
    }

    /// Resolves the intent for a confirmed gesture and actuates it.
    ///
    /// `NoGesture` resolves to `ActionIntent::None` and never reaches the actuator.
    pub fn dispatch(&mut self, gesture: Gesture) -> ActionIntent {
        let event = CommandEvent::new(gesture);
        if event.intent == ActionIntent::None {
            return event.intent;
        }

        self.dispatched += 1;
        info!(gesture = %event.gesture, intent = %event.intent, "Dispatching command");

        if let Err(e) = self.actuator.actuate(&event) {
            self.failures += 1;
            warn!(gesture = %event.gesture, intent = %event.intent, "Actuator failed: {}", e);
        }

        event.intent
    }

    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn into_actuator(self) -> A {
        self.actuator
    }
}
