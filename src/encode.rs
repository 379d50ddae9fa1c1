use burn::prelude::*;

use crate::{
    env::GridDims,
    error::{Error, Result},
};

/// Converts a discrete state into the input vector of a policy network
///
/// The network never inspects environment geometry itself; whatever it needs to know about the
/// state space is captured by the encoder it is constructed with.
pub trait StateEncoder {
    /// Length of the produced input vector
    fn input_size(&self) -> usize;

    /// Encode `state` as a flat input vector
    fn encode(&self, state: usize) -> Result<Vec<f32>>;

    /// Encode `state` as a `[1, input_size]` tensor ready for a forward pass
    fn to_tensor<B: Backend>(&self, state: usize, device: &B::Device) -> Result<Tensor<B, 2>> {
        let input = self.encode(state)?;
        Ok(Tensor::<B, 1>::from_floats(input.as_slice(), device).unsqueeze())
    }
}

/// One-hot encoding over the cells of a grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OneHot {
    dims: GridDims,
}

impl OneHot {
    pub fn new(dims: GridDims) -> Self {
        Self { dims }
    }

    pub fn dims(&self) -> GridDims {
        self.dims
    }
}

impl StateEncoder for OneHot {
    fn input_size(&self) -> usize {
        self.dims.len()
    }

    fn encode(&self, state: usize) -> Result<Vec<f32>> {
        if !self.dims.contains(state) {
            return Err(Error::StateOutOfRange {
                state,
                len: self.dims.len(),
            });
        }

        let mut input = vec![0.0; self.dims.len()];
        input[state] = 1.0;
        Ok(input)
    }
}
