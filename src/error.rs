use thiserror::Error;

/// Errors surfaced by the learning core
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("state {state} is outside the {len}-cell grid")]
    StateOutOfRange { state: usize, len: usize },

    #[error("invalid action index {0}")]
    InvalidAction(usize),

    #[error("reward at step {index} is still pending")]
    PendingReward { index: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
