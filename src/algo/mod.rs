pub mod policy;
pub mod reinforce;

pub use policy::{PolicyModel, PolicyModelConfig, PolicyNetwork, PolicyParams};
pub use reinforce::{ReinforceAgent, ReinforceAgentConfig};
