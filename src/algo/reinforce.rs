use burn::tensor::backend::AutodiffBackend;
use log::{debug, trace};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    assert_interval,
    ds::RingBuffer,
    encode::{OneHot, StateEncoder},
    error::{Error, Result},
    exploration::{Choice, EpsilonGreedy},
    memory::Trajectory,
    prob,
};

use super::policy::PolicyNetwork;

/// Configuration for the [`ReinforceAgent`]
#[derive(Debug, Clone)]
pub struct ReinforceAgentConfig {
    /// Width of the policy network's hidden layer
    pub hidden_size: usize,
    /// Step size of each policy gradient update
    pub learning_rate: f64,
    /// The discount factor
    pub gamma: f32,
    /// Half-width of the uniform weight initialization
    pub init_scale: f64,
    /// The exploration policy
    pub exploration: EpsilonGreedy,
    /// Number of recent episode rewards considered for convergence
    pub reward_window: usize,
    /// Mean reward over the window above which training counts as converged
    pub convergence_threshold: f32,
    /// Seed for the exploration RNG and the network initialization
    pub seed: Option<u64>,
}

impl Default for ReinforceAgentConfig {
    fn default() -> Self {
        Self {
            hidden_size: 24,
            learning_rate: 1e-3,
            gamma: 0.99,
            init_scale: 0.01,
            exploration: EpsilonGreedy::default(),
            reward_window: 10,
            convergence_threshold: -5.0,
            seed: None,
        }
    }
}

/// A Monte-Carlo policy gradient (REINFORCE) agent with epsilon greedy exploration
///
/// During an episode the agent picks actions with [`select_action`](Self::select_action) and is
/// told their rewards with [`record_reward`](Self::record_reward). When the episode is over,
/// [`update`](Self::update) turns the recorded trajectory into one network update per step,
/// decays epsilon and clears the trajectory.
///
/// Exploitation picks the arg-max of the policy distribution rather than sampling from it.
///
/// ### Generics
/// - `B`: An autodiff burn backend
/// - `E`: The [`StateEncoder`] used by the policy network
pub struct ReinforceAgent<B: AutodiffBackend, E: StateEncoder = OneHot> {
    policy: PolicyNetwork<B, E>,
    memory: Trajectory,
    exploration: EpsilonGreedy,
    recent_rewards: RingBuffer<f32>,
    convergence_threshold: f32,
    gamma: f32,
    episode: u32,
    rng: StdRng,
}

impl<B: AutodiffBackend, E: StateEncoder> ReinforceAgent<B, E> {
    /// Initialize a new `ReinforceAgent`
    ///
    /// ### Arguments
    /// - `encoder` The [`StateEncoder`] for the environment's states
    /// - `n_actions` Size of the environment's action space
    /// - `config` A [`ReinforceAgentConfig`] containing hyperparameters for the agent
    /// - `device` The device the policy network lives on
    ///
    /// **Panics** if `gamma` is not in the interval `[0,1]` or `reward_window` is zero
    pub fn new(
        encoder: E,
        n_actions: usize,
        config: ReinforceAgentConfig,
        device: B::Device,
    ) -> Self {
        assert_interval!(config.gamma, 0.0, 1.0);
        let rng = match config.seed {
            Some(seed) => {
                B::seed(seed);
                StdRng::seed_from_u64(seed)
            }
            None => StdRng::from_entropy(),
        };
        Self {
            policy: PolicyNetwork::new(
                encoder,
                config.hidden_size,
                n_actions,
                config.learning_rate,
                config.init_scale,
                device,
            ),
            memory: Trajectory::new(),
            exploration: config.exploration,
            recent_rewards: RingBuffer::new(config.reward_window),
            convergence_threshold: config.convergence_threshold,
            gamma: config.gamma,
            episode: 0,
            rng,
        }
    }

    /// Choose an action for `state` and record the decision with a pending reward
    pub fn select_action(&mut self, state: usize) -> Result<usize> {
        let probs = self.policy.forward(state)?;
        let action = match self.exploration.choose(&mut self.rng) {
            Choice::Explore => self.rng.gen_range(0..probs.len()),
            Choice::Exploit => prob::argmax(&probs),
        };
        let log_prob = prob::log_prob(probs[action]);
        trace!("state {state}: action {action} (log p = {log_prob:.4})");

        self.memory.record(state, action, None, log_prob);
        Ok(action)
    }

    /// The policy's most probable action for `state`, without exploring or recording anything
    pub fn greedy_action(&self, state: usize) -> Result<usize> {
        let probs = self.policy.forward(state)?;
        Ok(prob::argmax(&probs))
    }

    /// Fill in the reward of the most recent decision
    ///
    /// `next_state` and `done` are kept for diagnostics only.
    pub fn record_reward(&mut self, reward: f32, next_state: Option<usize>, done: bool) {
        if self.memory.overwrite_last_reward(reward) {
            self.memory.record_outcome(next_state, done);
        }
    }

    /// Learn from the finished episode
    ///
    /// `final_reward` replaces the reward of the last decision. Each step's normalized discounted
    /// return is then used as the advantage for one policy update, in chronological order.
    /// Afterwards epsilon is decayed and the trajectory cleared.
    ///
    /// Fails with [`Error::PendingReward`] if a step before the last has no reward yet; the
    /// trajectory is then left unchanged.
    pub fn update(&mut self, final_reward: f32) -> Result<()> {
        let last = self.memory.len().saturating_sub(1);
        if let Some(index) = self.memory.entries()[..last]
            .iter()
            .position(|exp| exp.reward.is_none())
        {
            return Err(Error::PendingReward { index });
        }

        self.memory.overwrite_last_reward(final_reward);
        let returns = self.memory.compute_discounted_returns(self.gamma)?;

        for (exp, advantage) in self.memory.entries().iter().zip(returns) {
            self.policy.update(exp.state, exp.action, advantage)?;
        }

        self.episode += 1;
        let epsilon = self.exploration.decay();
        debug!(
            "episode {}: {} updates, epsilon {:.4}",
            self.episode,
            self.memory.len(),
            epsilon
        );

        self.memory.clear();
        Ok(())
    }

    /// Push an episode's total reward into the recent-reward window and report convergence
    ///
    /// Converged means the window is full and its mean exceeds the configured threshold.
    pub fn check_convergence(&mut self, reward: f32) -> bool {
        self.recent_rewards.push(reward);
        self.recent_rewards.is_full()
            && self
                .recent_rewards
                .mean()
                .is_some_and(|mean| mean > self.convergence_threshold)
    }

    /// Throw away the current trajectory without learning from it
    pub fn discard_episode(&mut self) {
        self.memory.clear();
    }

    pub fn epsilon(&self) -> f32 {
        self.exploration.epsilon()
    }

    /// Number of completed updates
    pub fn episode(&self) -> u32 {
        self.episode
    }

    pub fn memory(&self) -> &Trajectory {
        &self.memory
    }

    pub fn policy(&self) -> &PolicyNetwork<B, E> {
        &self.policy
    }

    /// Mutable access to the policy, e.g. to warm start it before training
    pub fn policy_mut(&mut self) -> &mut PolicyNetwork<B, E> {
        &mut self.policy
    }
}

#[cfg(test)]
mod tests {
    use burn::backend::{Autodiff, NdArray};

    use super::*;
    use crate::env::GridDims;

    type TestBackend = Autodiff<NdArray>;

    fn agent(config: ReinforceAgentConfig) -> ReinforceAgent<TestBackend> {
        ReinforceAgent::new(
            OneHot::new(GridDims::new(2, 3)),
            4,
            config,
            Default::default(),
        )
    }

    fn seeded() -> ReinforceAgentConfig {
        ReinforceAgentConfig {
            seed: Some(42),
            ..Default::default()
        }
    }

    #[test]
    fn select_action_records_a_pending_step() {
        let mut agent = agent(seeded());
        let action = agent.select_action(3).unwrap();
        assert!(action < 4, "valid action");

        let exp = agent.memory().entries()[0];
        assert_eq!(exp.state, 3);
        assert_eq!(exp.action, action);
        assert_eq!(exp.reward, None, "reward pending");

        let probs = agent.policy().forward(3).unwrap();
        assert!((exp.log_prob - (probs[action] + 1e-8).ln()).abs() < 1e-5);
    }

    #[test]
    fn exploitation_picks_the_most_probable_action() {
        let mut agent = agent(ReinforceAgentConfig {
            exploration: EpsilonGreedy::new(0.0, 0.0, 1.0),
            ..seeded()
        });
        for state in 0..6 {
            let greedy = agent.greedy_action(state).unwrap();
            assert_eq!(agent.select_action(state).unwrap(), greedy);
        }
        assert_eq!(agent.memory().len(), 6);
    }

    #[test]
    fn full_exploration_reaches_every_action() {
        let mut agent = agent(ReinforceAgentConfig {
            exploration: EpsilonGreedy::new(1.0, 1.0, 1.0),
            ..seeded()
        });
        let mut seen = [false; 4];
        for _ in 0..200 {
            seen[agent.select_action(0).unwrap()] = true;
        }
        assert!(seen.iter().all(|&s| s), "all actions selected");
    }

    #[test]
    fn greedy_action_records_nothing() {
        let agent = agent(seeded());
        agent.greedy_action(0).unwrap();
        assert!(agent.memory().is_empty());
    }

    #[test]
    fn record_reward_fills_the_last_step() {
        let mut agent = agent(seeded());
        agent.record_reward(-1.0, Some(0), false);
        assert!(agent.memory().is_empty(), "nothing to fill");

        agent.select_action(3).unwrap();
        agent.record_reward(-1.0, Some(0), false);
        assert_eq!(agent.memory().last_reward(), Some(-1.0));
        assert_eq!(agent.memory().next_states(), [0]);
        assert_eq!(agent.memory().dones(), [false]);
    }

    #[test]
    fn update_learns_decays_and_clears() {
        let mut agent = agent(ReinforceAgentConfig {
            learning_rate: 0.1,
            ..seeded()
        });
        let before = agent.policy().params();

        for (state, reward) in [(3, -1.0), (0, -1.0), (1, -1.0)] {
            agent.select_action(state).unwrap();
            agent.record_reward(reward, None, false);
        }
        agent.update(10.0).unwrap();

        assert_ne!(agent.policy().params(), before, "weights changed");
        assert_eq!(agent.episode(), 1, "episode counted");
        assert!((agent.epsilon() - 0.49).abs() < 1e-6, "epsilon decayed");
        assert!(agent.memory().is_empty(), "trajectory cleared");
    }

    #[test]
    fn update_with_pending_rewards_fails() {
        let mut agent = agent(seeded());
        agent.select_action(3).unwrap();
        agent.select_action(0).unwrap();

        assert_eq!(agent.update(10.0), Err(Error::PendingReward { index: 0 }));
        assert_eq!(agent.episode(), 0, "nothing learned");
        assert_eq!(agent.memory().len(), 2, "trajectory kept");
        assert_eq!(agent.memory().last_reward(), None, "last reward untouched");
    }

    #[test]
    fn epsilon_never_increases_or_drops_below_min() {
        let mut agent = agent(seeded());
        let mut previous = agent.epsilon();
        for _ in 0..300 {
            agent.update(0.0).unwrap();
            assert!(agent.epsilon() <= previous);
            assert!(agent.epsilon() >= 0.01);
            previous = agent.epsilon();
        }
    }

    #[test]
    fn convergence_needs_a_full_window() {
        let mut agent = agent(ReinforceAgentConfig {
            reward_window: 3,
            ..seeded()
        });
        assert!(!agent.check_convergence(-10.0));
        assert!(!agent.check_convergence(-10.0), "window not yet full");
        assert!(!agent.check_convergence(-10.0), "mean -10 below threshold");

        assert!(!agent.check_convergence(4.0), "mean -16/3 below threshold");
        assert!(agent.check_convergence(4.0), "mean -2/3 above threshold");
    }

    #[test]
    fn convergence_threshold_with_default_window() {
        let mut agent = agent(seeded());
        for _ in 0..9 {
            assert!(!agent.check_convergence(-4.0), "fewer than ten rewards");
        }
        assert!(agent.check_convergence(-4.0), "mean -4 above -5");
    }
}
