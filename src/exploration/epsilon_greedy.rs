use rand::Rng;

use crate::assert_interval;

use super::Choice;

/// Epsilon greedy exploration policy with a multiplicatively decaying threshold
///
/// Epsilon starts at `start` and is multiplied by `decay` on every call to
/// [`decay`](EpsilonGreedy::decay), never dropping below `min`. It never increases.
#[derive(Debug, Clone, PartialEq)]
pub struct EpsilonGreedy {
    epsilon: f32,
    min: f32,
    decay: f32,
}

impl EpsilonGreedy {
    /// Initialize epsilon greedy policy from start value, floor, and per-episode decay factor
    ///
    /// **Panics** if any argument is not in the interval `[0,1]`, or if `start` is less than `min`
    pub fn new(start: f32, min: f32, decay: f32) -> Self {
        assert_interval!(start, 0.0, 1.0);
        assert_interval!(min, 0.0, 1.0);
        assert_interval!(decay, 0.0, 1.0);
        assert!(
            start >= min,
            "Epsilon start value must not be less than its minimum."
        );
        Self {
            epsilon: start,
            min,
            decay,
        }
    }

    /// Current exploration rate
    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    /// Flip the exploration coin: explore with probability epsilon
    pub fn choose(&self, rng: &mut impl Rng) -> Choice {
        if rng.gen::<f32>() < self.epsilon {
            Choice::Explore
        } else {
            Choice::Exploit
        }
    }

    /// Apply one step of decay and return the new epsilon
    pub fn decay(&mut self) -> f32 {
        self.epsilon = (self.epsilon * self.decay).max(self.min);
        self.epsilon
    }
}

impl Default for EpsilonGreedy {
    fn default() -> Self {
        Self::new(0.5, 0.01, 0.98)
    }
}
