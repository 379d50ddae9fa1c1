use burn::{
    optim::{adaptor::OptimizerAdaptor, GradientsParams, Optimizer, Sgd, SgdConfig},
    prelude::*,
    tensor::{activation::relu, backend::AutodiffBackend},
};
use nn::{Initializer, Linear, LinearConfig};

use crate::{
    encode::{OneHot, StateEncoder},
    error::{self, Error},
    prob,
};

/// Single hidden layer network producing action logits
#[derive(Module, Debug)]
pub struct PolicyModel<B: Backend> {
    fc1: Linear<B>,
    fc2: Linear<B>,
}

#[derive(Config, Debug)]
pub struct PolicyModelConfig {
    input_size: usize,
    hidden_size: usize,
    output_size: usize,
    /// Weights are drawn uniformly from `[-init_scale, init_scale]`; biases start at zero
    #[config(default = 0.01)]
    init_scale: f64,
}

impl PolicyModelConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> PolicyModel<B> {
        let initializer = Initializer::Uniform {
            min: -self.init_scale,
            max: self.init_scale,
        };
        PolicyModel {
            fc1: zero_bias(
                LinearConfig::new(self.input_size, self.hidden_size)
                    .with_initializer(initializer.clone())
                    .init(device),
            ),
            fc2: zero_bias(
                LinearConfig::new(self.hidden_size, self.output_size)
                    .with_initializer(initializer)
                    .init(device),
            ),
        }
    }
}

impl<B: Backend> PolicyModel<B> {
    /// Forward pass from a `[batch, input]` tensor to `[batch, actions]` logits
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = relu(self.fc1.forward(input));
        self.fc2.forward(x)
    }
}

fn zero_bias<B: Backend>(mut linear: Linear<B>) -> Linear<B> {
    linear.bias = linear.bias.map(|bias| bias.map(|tensor| tensor.zeros_like().require_grad()));
    linear
}

fn to_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Vec<f32> {
    tensor.into_data().convert::<f32>().value
}

type SgdOptimizer<M, B> = OptimizerAdaptor<Sgd<<B as AutodiffBackend>::InnerBackend>, M, B>;

/// Flattened copy of the network parameters
///
/// Weight matrices are stored row-major as `[inputs, outputs]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyParams {
    pub w1: Vec<f32>,
    pub b1: Vec<f32>,
    pub w2: Vec<f32>,
    pub b2: Vec<f32>,
}

/// The parametric policy: maps a state to a distribution over actions
///
/// Parameters change only through [`update`](PolicyNetwork::update), which performs one plain
/// gradient ascent step (no momentum, no batching) on the REINFORCE objective for a single
/// `(state, action, advantage)` triple.
///
/// ### Generics
/// - `B`: An autodiff burn backend
/// - `E`: The [`StateEncoder`] turning states into network inputs
pub struct PolicyNetwork<B: AutodiffBackend, E: StateEncoder = OneHot> {
    model: PolicyModel<B>,
    optimizer: SgdOptimizer<PolicyModel<B>, B>,
    encoder: E,
    n_actions: usize,
    learning_rate: f64,
    device: B::Device,
}

impl<B: AutodiffBackend, E: StateEncoder> PolicyNetwork<B, E> {
    /// **Panics** if `hidden_size` or `n_actions` is zero
    pub fn new(
        encoder: E,
        hidden_size: usize,
        n_actions: usize,
        learning_rate: f64,
        init_scale: f64,
        device: B::Device,
    ) -> Self {
        assert!(hidden_size > 0, "Hidden layer must not be empty.");
        assert!(n_actions > 0, "Policy needs at least one action.");
        let model = PolicyModelConfig::new(encoder.input_size(), hidden_size, n_actions)
            .with_init_scale(init_scale)
            .init(&device);
        Self {
            model,
            optimizer: SgdConfig::new().init(),
            encoder,
            n_actions,
            learning_rate,
            device,
        }
    }

    pub fn n_actions(&self) -> usize {
        self.n_actions
    }

    fn logits(&self, state: usize) -> error::Result<Tensor<B, 2>> {
        let input = self.encoder.to_tensor::<B>(state, &self.device)?;
        Ok(self.model.forward(input))
    }

    /// Action probabilities for `state`
    ///
    /// The result always has one non-negative entry per action summing to one.
    pub fn forward(&self, state: usize) -> error::Result<Vec<f32>> {
        let logits = self.logits(state)?;
        Ok(prob::softmax(&to_vec(logits)))
    }

    /// One gradient ascent step increasing the log-probability of `action` in `state` in
    /// proportion to `advantage`
    pub fn update(&mut self, state: usize, action: usize, advantage: f32) -> error::Result<()> {
        if action >= self.n_actions {
            return Err(Error::InvalidAction(action));
        }

        let logits = self.logits(state)?;
        let probs = prob::softmax(&to_vec(logits.clone()));
        let signal = policy_gradient(&probs, action, advantage);
        let signal = Tensor::<B, 1>::from_floats(signal.as_slice(), &self.device).unsqueeze::<2>();

        // The gradient of sum(signal * logits) with respect to the logits is `signal` itself,
        // so minimizing its negation backpropagates the policy gradient through both layers.
        let objective = (logits * signal).sum();
        let grads = GradientsParams::from_grads(objective.neg().backward(), &self.model);
        self.model = self
            .optimizer
            .step(self.learning_rate, self.model.clone(), grads);

        Ok(())
    }

    /// Copy the current parameters out of the network
    pub fn params(&self) -> PolicyParams {
        let bias = |linear: &Linear<B>| {
            linear
                .bias
                .as_ref()
                .map(|bias| to_vec(bias.val()))
                .unwrap_or_default()
        };
        PolicyParams {
            w1: to_vec(self.model.fc1.weight.val()),
            b1: bias(&self.model.fc1),
            w2: to_vec(self.model.fc2.weight.val()),
            b2: bias(&self.model.fc2),
        }
    }
}

/// Policy gradient of `log p(action)` with respect to each output logit, scaled by `advantage`
///
/// For the taken action this is `advantage * (1 - p)`, for every other action `-advantage * p`.
pub fn policy_gradient(probs: &[f32], action: usize, advantage: f32) -> Vec<f32> {
    probs
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            if i == action {
                advantage * (1.0 - p)
            } else {
                -advantage * p
            }
        })
        .collect()
}
