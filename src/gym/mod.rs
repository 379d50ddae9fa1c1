pub mod cliff_walk;

pub use cliff_walk::{Cell, CliffWalk, Move};
