// THEORY:
// The `scheduler` decides which captured frames are worth classifying. Capture keeps
// running at full rate, but on a small board pose estimation cannot keep up, so only
// every Nth frame is admitted. Admission is a pure function of the frame index; it
// does not react to measured load.
//
// The scheduler also owns throughput accounting. It hands out capture indices, and
// throughput is captured frames divided by wall-clock time since the scheduler was
// created, recomputed after each admitted frame. The clock is monotonic and never
// reset. The classification rate is available separately.

use std::time::{Duration, Instant};

/// Admit every second captured frame by default.
pub const DEFAULT_ADMISSION_MODULUS: u64 = 2;

#[derive(Debug, Clone)]
pub struct FrameScheduler {
    /// Only frames whose index is a multiple of this are admitted.
    admission_modulus: u64,
    /// When accounting started.
    started_at: Instant,
    /// Frames handed a capture index, admitted or not.
    frames_captured: u64,
    /// Frames that went through classification.
    frames_processed: u64,
    /// Throughput as of the last processed frame.
    fps: f64,
}

impl FrameScheduler {
    pub fn new(admission_modulus: u64) -> Self {
        Self::starting_at(admission_modulus, Instant::now())
    }

    /// Creates a scheduler whose clock starts at `started_at`.
    pub fn starting_at(admission_modulus: u64, started_at: Instant) -> Self {
        Self {
            admission_modulus: admission_modulus.max(1),
            started_at,
            frames_captured: 0,
            frames_processed: 0,
            fps: 0.0,
        }
    }

    /// Assigns the next capture index. Call once per successfully captured frame.
    pub fn next_frame_index(&mut self) -> u64 {
        let index = self.frames_captured;
        self.frames_captured += 1;
        index
    }

    /// Whether the frame with this capture index should be classified.
    pub fn should_admit(&self, frame_index: u64) -> bool {
        frame_index % self.admission_modulus == 0
    }

    /// Records one processed frame and recomputes throughput.
    pub fn record_processed(&mut self) -> f64 {
        self.record_processed_at(Instant::now())
    }

    pub fn record_processed_at(&mut self, now: Instant) -> f64 {
        self.frames_processed += 1;
        self.fps = rate(self.frames_captured, now.saturating_duration_since(self.started_at));
        self.fps
    }

    pub fn frames_captured(&self) -> u64 {
        self.frames_captured
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn admission_modulus(&self) -> u64 {
        self.admission_modulus
    }
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_ADMISSION_MODULUS)
    }
}

/// Frames per second over `elapsed`, zero before any time has passed.
pub fn rate(frames: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 { frames as f64 / secs } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_even_indices() {
        let scheduler = FrameScheduler::default();
        let admitted: Vec<u64> = (0..10).filter(|&i| scheduler.should_admit(i)).collect();
        assert_eq!(admitted, vec![0, 2, 4, 6, 8]);
    }

    #[test]
    fn admission_ignores_wall_clock() {
        let start = Instant::now();
        let mut scheduler = FrameScheduler::starting_at(2, start);
        scheduler.record_processed_at(start + Duration::from_secs(100));
        assert!(scheduler.should_admit(4));
        assert!(!scheduler.should_admit(5));
    }

    #[test]
    fn custom_modulus() {
        let scheduler = FrameScheduler::new(3);
        let admitted: Vec<u64> = (0..10).filter(|&i| scheduler.should_admit(i)).collect();
        assert_eq!(admitted, vec![0, 3, 6, 9]);
    }

    #[test]
    fn zero_modulus_admits_everything() {
        let scheduler = FrameScheduler::new(0);
        assert!((0..5).all(|i| scheduler.should_admit(i)));
    }

    #[test]
    fn capture_indices_are_sequential() {
        let mut scheduler = FrameScheduler::default();
        let indices: Vec<u64> = (0..4).map(|_| scheduler.next_frame_index()).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert_eq!(scheduler.frames_captured(), 4);
        assert_eq!(scheduler.frames_processed(), 0);
    }

    #[test]
    fn fps_counts_captured_frames() {
        // 30 frames captured at 10 fps; only every other one is classified.
        let start = Instant::now();
        let mut scheduler = FrameScheduler::starting_at(2, start);
        for i in 1..=30 {
            let index = scheduler.next_frame_index();
            if scheduler.should_admit(index) {
                scheduler.record_processed_at(start + Duration::from_millis(100 * i));
            }
        }
        // Last admitted frame is index 28, the 29th capture, at 2.9 s.
        assert_eq!(scheduler.frames_processed(), 15);
        assert_eq!(scheduler.frames_captured(), 30);
        assert!((scheduler.fps() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn fps_is_zero_without_elapsed_time() {
        let start = Instant::now();
        let mut scheduler = FrameScheduler::starting_at(2, start);
        assert_eq!(scheduler.record_processed_at(start), 0.0);
    }
}
