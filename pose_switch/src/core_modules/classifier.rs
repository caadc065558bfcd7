// THEORY:
// The `classifier` is the stateless, per-frame half of gesture recognition. It looks
// at the six arm landmarks of a single frame and names the pose. It has no memory of
// earlier frames; stability over time is the job of the `confirmation` engine.
//
// Key architectural principles:
// 1.  **Fixed Priority**: Checks run strongest-pattern-first: both hands raised,
//     then crossed arms, then a single raised hand. The two-hand check must come
//     before the single-hand checks, otherwise one arm settling a frame ahead of the
//     other would flicker the result between LEFT/RIGHT_HAND_UP and BOTH_HANDS_UP.
// 2.  **Hysteresis by Threshold**: A wrist only counts as raised when it clears both
//     its shoulder and its elbow by `raise_threshold`, so borderline poses read as
//     "not raised" instead of alternating.
// 3.  **Fail Closed**: Any frame that cannot be read (wrong length, NaN or infinite
//     coordinates) yields `NoGesture`. An occluded subject mid-gesture must break a
//     streak, never abort the loop.

use crate::core_modules::gesture::{Gesture, ThresholdConfig};
use crate::core_modules::landmark::{Landmark, LandmarkFrame, Observation, PoseLandmark};

/// The landmarks the classifier reads from each frame.
const ARM_LANDMARKS: [PoseLandmark; 6] = [
    PoseLandmark::LeftShoulder,
    PoseLandmark::RightShoulder,
    PoseLandmark::LeftElbow,
    PoseLandmark::RightElbow,
    PoseLandmark::LeftWrist,
    PoseLandmark::RightWrist,
];

/// Names the gesture shown in a single frame.
pub fn classify(frame: &LandmarkFrame, config: &ThresholdConfig) -> Gesture {
    if !ARM_LANDMARKS.iter().all(|&l| frame.get(l).is_finite()) {
        return Gesture::NoGesture;
    }

    let left_shoulder = frame.get(PoseLandmark::LeftShoulder);
    let right_shoulder = frame.get(PoseLandmark::RightShoulder);
    let left_elbow = frame.get(PoseLandmark::LeftElbow);
    let right_elbow = frame.get(PoseLandmark::RightElbow);
    let left_wrist = frame.get(PoseLandmark::LeftWrist);
    let right_wrist = frame.get(PoseLandmark::RightWrist);

    // --- 1. Raised hands ---
    let left_raised = is_hand_raised(left_shoulder, left_elbow, left_wrist, config.raise_threshold);
    let right_raised = is_hand_raised(right_shoulder, right_elbow, right_wrist, config.raise_threshold);

    // --- 2. Both hands shadow everything else ---
    if left_raised && right_raised {
        return Gesture::BothHandsUp;
    }

    // --- 3. Crossed arms: each wrist near the opposite shoulder ---
    let left_crossed = (left_wrist.x - right_shoulder.x).abs() < config.cross_threshold;
    let right_crossed = (right_wrist.x - left_shoulder.x).abs() < config.cross_threshold;
    if left_crossed && right_crossed {
        return Gesture::CrossedArms;
    }

    // --- 4. Single hands last ---
    if left_raised {
        Gesture::LeftHandUp
    } else if right_raised {
        Gesture::RightHandUp
    } else {
        Gesture::NoGesture
    }
}

/// Classifies an upstream point list that has not been validated yet.
///
/// A list of the wrong length cannot be classified and reads as `NoGesture`.
pub fn classify_points(points: &[Landmark], config: &ThresholdConfig) -> Gesture {
    match LandmarkFrame::from_slice(points) {
        Ok(frame) => classify(&frame, config),
        Err(_) => Gesture::NoGesture,
    }
}

/// Classifies a source observation. An empty frame is never inspected.
pub fn classify_observation(observation: &Observation, config: &ThresholdConfig) -> Gesture {
    match observation {
        Observation::NoSubject => Gesture::NoGesture,
        Observation::Subject(frame) => classify(frame, config),
    }
}

/// Lower `y` is higher on screen.
fn is_hand_raised(shoulder: Landmark, elbow: Landmark, wrist: Landmark, threshold: f32) -> bool {
    wrist.y < shoulder.y - threshold && wrist.y < elbow.y - threshold
}
