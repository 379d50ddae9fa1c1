use log::debug;
use strum::{FromRepr, VariantArray};

use crate::{
    env::{DiscreteActionSpace, Environment, GridDims},
    error::Error,
};

const STEP_REWARD: f32 = -1.0;
const CLIFF_REWARD: f32 = -10.0;
const GOAL_REWARD: f32 = 10.0;
const TIMEOUT_REWARD: f32 = -10.0;

#[derive(VariantArray, FromRepr, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Move {
    Up = 0,
    Right = 1,
    Down = 2,
    Left = 3,
}

impl From<Move> for usize {
    fn from(value: Move) -> Self {
        value as usize
    }
}

impl TryFrom<usize> for Move {
    type Error = Error;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Move::from_repr(value).ok_or(Error::InvalidAction(value))
    }
}

/// Classification of a grid cell
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cell {
    Start,
    Open,
    Cliff,
    Goal,
}

/// The cliff walking grid world
///
/// The agent starts in the bottom-left corner and must reach the bottom-right corner for a
/// reward of +10. Cells on the bottom row between the two are cliffs: entering one costs -10 but
/// does not end the episode. Every other move costs -1, and an episode that runs for
/// `rows * cols * 3` steps is cut off with a reward of -10.
#[derive(Debug, Clone)]
pub struct CliffWalk {
    dims: GridDims,
    pos: usize,
    steps: usize,
    max_steps: usize,
    total_reward: f32,
    done: bool,
}

impl CliffWalk {
    /// **Panics** if the grid has fewer than two columns, since start and goal would coincide
    pub fn new(rows: usize, cols: usize) -> Self {
        let dims = GridDims::new(rows, cols);
        assert!(cols >= 2, "Cliff walk requires at least two columns.");
        let mut env = Self {
            dims,
            pos: 0,
            steps: 0,
            max_steps: dims.len() * 3,
            total_reward: 0.0,
            done: false,
        };
        env.reset();
        env
    }

    pub fn dims(&self) -> GridDims {
        self.dims
    }

    pub fn state(&self) -> usize {
        self.pos
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Sum of all rewards received since the last reset
    pub fn total_reward(&self) -> f32 {
        self.total_reward
    }

    pub fn start(&self) -> usize {
        self.dims.index(self.dims.rows - 1, 0)
    }

    pub fn goal(&self) -> usize {
        self.dims.index(self.dims.rows - 1, self.dims.cols - 1)
    }

    /// Whether the agent currently stands on the goal
    pub fn at_goal(&self) -> bool {
        self.pos == self.goal()
    }

    pub fn cell(&self, state: usize) -> Cell {
        let (row, col) = self.dims.coords(state);
        let bottom = self.dims.rows - 1;
        if row != bottom {
            Cell::Open
        } else if col == 0 {
            Cell::Start
        } else if col == self.dims.cols - 1 {
            Cell::Goal
        } else {
            Cell::Cliff
        }
    }

    fn apply(&self, action: Move) -> usize {
        let (mut row, mut col) = self.dims.coords(self.pos);
        match action {
            Move::Up => row = row.saturating_sub(1),
            Move::Right => col = (col + 1).min(self.dims.cols - 1),
            Move::Down => row = (row + 1).min(self.dims.rows - 1),
            Move::Left => col = col.saturating_sub(1),
        }
        self.dims.index(row, col)
    }
}

impl Environment for CliffWalk {
    type State = usize;
    type Action = Move;

    fn is_active(&self) -> bool {
        !self.done
    }

    fn step(&mut self, action: Self::Action) -> (Self::State, f32, bool) {
        if self.done {
            debug!("step called on a finished episode");
            return (self.pos, 0.0, true);
        }

        self.steps += 1;
        if self.steps >= self.max_steps {
            debug!("episode cut off after {} steps", self.steps);
            self.done = true;
            self.total_reward += TIMEOUT_REWARD;
            return (self.pos, TIMEOUT_REWARD, true);
        }

        self.pos = self.apply(action);
        let (reward, done) = match self.cell(self.pos) {
            Cell::Cliff => (CLIFF_REWARD, false),
            Cell::Goal => (GOAL_REWARD, true),
            Cell::Start | Cell::Open => (STEP_REWARD, false),
        };

        self.done = done;
        self.total_reward += reward;
        (self.pos, reward, done)
    }

    fn reset(&mut self) -> Self::State {
        self.pos = self.start();
        self.steps = 0;
        self.total_reward = 0.0;
        self.done = false;
        self.pos
    }
}

impl DiscreteActionSpace for CliffWalk {
    fn actions(&self) -> Vec<Self::Action> {
        Move::VARIANTS.to_vec()
    }
}
