// THEORY:
// The `landmark` module is the boundary between the external pose-estimation model
// and everything downstream of it. The model speaks in loosely-typed arrays of
// points; the rest of the engine speaks in a closed anatomical enumeration.
//
// Key architectural principles:
// 1.  **Closed Enumeration**: Every body point the model can report has a variant in
//     `PoseLandmark`. Access is an array index derived from the variant, so a
//     misspelt landmark is a compile error rather than a runtime lookup failure.
// 2.  **Check Once at the Boundary**: A `LandmarkFrame` can only be built from a
//     slice of the exact expected length. Once it exists, every landmark access is
//     infallible. The length check happens exactly once per frame, here.
// 3.  **Fresh Per Frame**: Frames are plain `Copy` data. Nothing in the engine
//     holds on to one after the tick that produced it.

use crate::error::{PoseSwitchError, Result};
use serde::{Deserialize, Serialize};

/// The number of body points reported by the pose model.
pub const LANDMARK_COUNT: usize = 33;

/// Coordinates per landmark in a flat buffer (x, y, z).
pub const COORDS_PER_LANDMARK: usize = 3;

/// Anatomical index of each landmark reported by the pose model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum PoseLandmark {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl PoseLandmark {
    /// Position of this landmark in a frame.
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// A single body point in normalized image coordinates.
///
/// `x` and `y` are in [0, 1] with the origin at the top-left and `y` growing
/// downward. `z` is the model's relative depth and is carried but not used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// True when both image-plane coordinates are usable numbers.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<[f32; 3]> for Landmark {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<Landmark> for [f32; 3] {
    fn from(l: Landmark) -> Self {
        [l.x, l.y, l.z]
    }
}

/// One frame's worth of body landmarks, indexed by `PoseLandmark`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandmarkFrame {
    points: [Landmark; LANDMARK_COUNT],
}

impl LandmarkFrame {
    pub fn new(points: [Landmark; LANDMARK_COUNT]) -> Self {
        Self { points }
    }

    /// Builds a frame from an upstream point list.
    ///
    /// Fails with `InvalidFrame` unless the slice holds exactly `LANDMARK_COUNT` points.
    pub fn from_slice(points: &[Landmark]) -> Result<Self> {
        let points: [Landmark; LANDMARK_COUNT] =
            points
                .try_into()
                .map_err(|_| PoseSwitchError::InvalidFrame {
                    expected: LANDMARK_COUNT,
                    actual: points.len(),
                })?;
        Ok(Self { points })
    }

    /// Builds a frame from a flat `[x0, y0, z0, x1, y1, z1, ...]` buffer of 99 values.
    pub fn from_flat(data: &[f32]) -> Result<Self> {
        if data.len() != LANDMARK_COUNT * COORDS_PER_LANDMARK {
            return Err(PoseSwitchError::InvalidFrame {
                expected: LANDMARK_COUNT * COORDS_PER_LANDMARK,
                actual: data.len(),
            });
        }

        let mut points = [Landmark::default(); LANDMARK_COUNT];
        for (point, xyz) in points.iter_mut().zip(data.chunks_exact(COORDS_PER_LANDMARK)) {
            *point = Landmark::new(xyz[0], xyz[1], xyz[2]);
        }
        Ok(Self { points })
    }

    pub fn get(&self, landmark: PoseLandmark) -> Landmark {
        self.points[landmark.index()]
    }

    pub fn set(&mut self, landmark: PoseLandmark, point: Landmark) {
        self.points[landmark.index()] = point;
    }

    pub fn points(&self) -> &[Landmark; LANDMARK_COUNT] {
        &self.points
    }
}

impl Default for LandmarkFrame {
    fn default() -> Self {
        Self {
            points: [Landmark::default(); LANDMARK_COUNT],
        }
    }
}

/// What the landmark source saw in one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// The model found nobody in the frame.
    NoSubject,
    /// The model found a subject and reported its landmarks.
    Subject(LandmarkFrame),
}

impl Observation {
    pub fn frame(&self) -> Option<&LandmarkFrame> {
        match self {
            Observation::NoSubject => None,
            Observation::Subject(frame) => Some(frame),
        }
    }
}
