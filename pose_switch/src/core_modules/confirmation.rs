// THEORY:
// The `confirmation` engine adds memory to the stateless classifier. Per-frame
// classification is noisy at pose boundaries, so a gesture only becomes a command
// once it has been seen on several consecutive admitted frames.
//
// Key architectural principles:
// 1.  **A Counter, Not an Automaton**: The state is just the last symbol and how many
//     admitted frames in a row have produced it. A different symbol, including
//     `NoGesture`, restarts the count at one.
// 2.  **Fire on the Edge**: A command fires on the one frame where the streak
//     *reaches* the confirm threshold. Holding the pose longer never re-fires; the
//     streak must be broken and rebuilt first.
// 3.  **Single Writer**: The state is owned by the pipeline and mutated once per
//     admitted frame. Nothing else touches it.

use crate::core_modules::gesture::Gesture;

/// Consecutive identical admitted frames needed before a gesture fires.
pub const DEFAULT_CONFIRM_THRESHOLD: u32 = 3;

/// The result of feeding one symbol to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advance {
    /// How many admitted frames in a row have produced the current symbol.
    pub streak: u32,
    /// True only on the frame the streak first reaches the confirm threshold.
    pub should_fire: bool,
}

/// Streak tracking for the temporal debounce.
#[derive(Debug, Clone)]
pub struct ConfirmationState {
    last_symbol: Gesture,
    streak_length: u32,
    confirm_threshold: u32,
}

impl ConfirmationState {
    pub fn new(confirm_threshold: u32) -> Self {
        Self {
            last_symbol: Gesture::NoGesture,
            streak_length: 0,
            confirm_threshold,
        }
    }

    /// Feeds the symbol classified for one admitted frame.
    pub fn advance(&mut self, symbol: Gesture) -> Advance {
        if symbol == self.last_symbol {
            self.streak_length = self.streak_length.saturating_add(1);
        } else {
            self.last_symbol = symbol;
            self.streak_length = 1;
        }

        Advance {
            streak: self.streak_length,
            should_fire: symbol.is_gesture() && self.streak_length == self.confirm_threshold,
        }
    }

    pub fn last_symbol(&self) -> Gesture {
        self.last_symbol
    }

    pub fn streak_length(&self) -> u32 {
        self.streak_length
    }

    pub fn confirm_threshold(&self) -> u32 {
        self.confirm_threshold
    }
}

impl Default for ConfirmationState {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIRM_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(state: &mut ConfirmationState, symbols: &[Gesture]) -> Vec<Advance> {
        symbols.iter().map(|&s| state.advance(s)).collect()
    }

    #[test]
    fn starts_idle() {
        let state = ConfirmationState::default();
        assert_eq!(state.last_symbol(), Gesture::NoGesture);
        assert_eq!(state.streak_length(), 0);
    }

    #[test]
    fn fires_once_on_third_frame() {
        let mut state = ConfirmationState::default();
        let results = feed(&mut state, &[Gesture::LeftHandUp; 6]);

        let streaks: Vec<u32> = results.iter().map(|a| a.streak).collect();
        assert_eq!(streaks, vec![1, 2, 3, 4, 5, 6]);

        let fired: Vec<usize> = results
            .iter()
            .enumerate()
            .filter(|(_, a)| a.should_fire)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(fired, vec![2]);
    }

    #[test]
    fn different_symbol_resets_streak() {
        let mut state = ConfirmationState::default();
        feed(&mut state, &[Gesture::LeftHandUp, Gesture::LeftHandUp]);

        let advance = state.advance(Gesture::RightHandUp);
        assert_eq!(advance.streak, 1);
        assert_eq!(state.last_symbol(), Gesture::RightHandUp);

        let advance = state.advance(Gesture::NoGesture);
        assert_eq!(advance.streak, 1);
        assert_eq!(state.last_symbol(), Gesture::NoGesture);
    }

    #[test]
    fn no_gesture_never_fires() {
        let mut state = ConfirmationState::default();
        let results = feed(&mut state, &[Gesture::NoGesture; 5]);
        assert!(results.iter().all(|a| !a.should_fire));
        // The initial state already holds NoGesture, so the streak continues from zero.
        assert_eq!(state.streak_length(), 5);
    }

    #[test]
    fn broken_streak_must_rebuild_before_refiring() {
        let mut state = ConfirmationState::default();
        let mut symbols = vec![Gesture::CrossedArms; 4];
        symbols.push(Gesture::NoGesture);
        symbols.extend([Gesture::CrossedArms; 3]);

        let fired: Vec<usize> = feed(&mut state, &symbols)
            .iter()
            .enumerate()
            .filter(|(_, a)| a.should_fire)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(fired, vec![2, 7]);
    }

    #[test]
    fn custom_threshold() {
        let mut state = ConfirmationState::new(1);
        assert!(state.advance(Gesture::BothHandsUp).should_fire);
        assert!(!state.advance(Gesture::BothHandsUp).should_fire);
        assert!(state.advance(Gesture::LeftHandUp).should_fire);
    }
}
