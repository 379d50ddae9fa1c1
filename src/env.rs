/// Represents a Markov decision process, defining the dynamics of an environment
/// in which an agent can operate.
///
/// This base trait represents the common case of a discrete-time, episodic MDP with one agent.
/// Unlike a bare transition function, [`step`](Environment::step) always reports the state the
/// environment is left in, even when the episode terminates.
pub trait Environment {
    /// A representation of the state of the environment to be passed to an agent
    type State;

    /// A representation of an action that an agent can take to affect the environment
    type Action;

    /// Determine if the episode is still running
    fn is_active(&self) -> bool;

    /// Update the environment in response to an action taken by an agent
    ///
    /// **Returns** `(next_state, reward, done)`
    fn step(&mut self, action: Self::Action) -> (Self::State, f32, bool);

    /// Reset the environment to its initial state
    ///
    /// **Returns** the state
    fn reset(&mut self) -> Self::State;
}

/// An environment with a finite, state-independent set of actions
pub trait DiscreteActionSpace: Environment {
    /// Get the available actions
    ///
    /// The returned vector should never be empty.
    fn actions(&self) -> Vec<Self::Action>;
}

/// Dimensions of a row-major rectangular grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridDims {
    pub rows: usize,
    pub cols: usize,
}

impl GridDims {
    /// **Panics** if either dimension is zero
    pub fn new(rows: usize, cols: usize) -> Self {
        assert!(rows > 0 && cols > 0, "Grid dimensions must be non-zero.");
        Self { rows, cols }
    }

    /// Number of cells in the grid
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn contains(&self, index: usize) -> bool {
        index < self.len()
    }

    /// Convert a row-major index into `(row, col)`
    pub fn coords(&self, index: usize) -> (usize, usize) {
        (index / self.cols, index % self.cols)
    }

    /// Convert `(row, col)` into a row-major index
    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }
}
