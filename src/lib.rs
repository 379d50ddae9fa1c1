/// Learning agents and the policy network
pub mod algo;

/// Data structures
pub mod ds;

/// State encoders feeding the policy network
pub mod encode;

/// Environment
pub mod env;

/// Error types
pub mod error;

/// Exploration policies
pub mod exploration;

/// Grid world environments
pub mod gym;

/// Episode trajectories
pub mod memory;

/// Discrete distribution helpers
pub mod prob;

/// Training sessions tying an environment to an agent
pub mod session;

mod util;

pub use error::{Error, Result};
