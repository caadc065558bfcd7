use serde::{Deserialize, Serialize};
use std::fmt;

/// The discrete commands the classifier can recognize in a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gesture {
    #[default]
    NoGesture,
    LeftHandUp,
    RightHandUp,
    BothHandsUp,
    CrossedArms,
}

impl Gesture {
    pub const ALL: [Gesture; 5] = [
        Gesture::NoGesture,
        Gesture::LeftHandUp,
        Gesture::RightHandUp,
        Gesture::BothHandsUp,
        Gesture::CrossedArms,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoGesture => "NO_GESTURE",
            Self::LeftHandUp => "LEFT_HAND_UP",
            Self::RightHandUp => "RIGHT_HAND_UP",
            Self::BothHandsUp => "BOTH_HANDS_UP",
            Self::CrossedArms => "CROSSED_ARMS",
        }
    }

    /// How the pose is performed, for operator-facing guides.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::NoGesture => "no recognized pose",
            Self::LeftHandUp => "raise the left hand",
            Self::RightHandUp => "raise the right hand",
            Self::BothHandsUp => "raise both hands",
            Self::CrossedArms => "cross both arms",
        }
    }

    pub fn is_gesture(&self) -> bool {
        !matches!(self, Self::NoGesture)
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Geometric tolerances used by the classifier, in normalized image units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// How far a wrist must sit above both its shoulder and its elbow to count as raised.
    pub raise_threshold: f32,
    /// The largest horizontal gap between a wrist and the opposite shoulder that still counts as crossed.
    pub cross_threshold: f32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            raise_threshold: 0.05,
            cross_threshold: 0.15,
        }
    }
}
