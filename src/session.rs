use burn::tensor::backend::AutodiffBackend;
use log::{debug, info, trace};

use crate::{
    algo::{ReinforceAgent, ReinforceAgentConfig},
    ds::RingBuffer,
    encode::{OneHot, StateEncoder},
    env::{DiscreteActionSpace, Environment},
    error::{Error, Result},
    gym::CliffWalk,
};

/// Hard cap on the length of a single rollout, independent of the environment's own limit
const MAX_EPISODE_STEPS: usize = 1000;

/// Number of recent episodes the running success rate is computed over
const SUCCESS_WINDOW: usize = 100;

/// Outcome of one training episode
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeReport {
    /// One-based index of the episode within the session
    pub episode: usize,
    pub total_reward: f32,
    pub steps: usize,
    /// Whether the episode ended on a positive reward, i.e. at the goal
    pub success: bool,
    pub converged: bool,
    /// Exploration rate after the episode's update
    pub epsilon: f32,
}

/// Running statistics over a session's training episodes
#[derive(Debug, Clone)]
pub struct TrainingStats {
    pub episodes: usize,
    pub successes: usize,
    pub best_reward: f32,
    pub rewards: Vec<f32>,
    pub converged: bool,
    recent_successes: RingBuffer<bool>,
}

impl TrainingStats {
    fn new() -> Self {
        Self {
            episodes: 0,
            successes: 0,
            best_reward: f32::NEG_INFINITY,
            rewards: Vec::new(),
            converged: false,
            recent_successes: RingBuffer::new(SUCCESS_WINDOW),
        }
    }

    fn record(&mut self, total_reward: f32, success: bool, converged: bool) {
        self.episodes += 1;
        if success {
            self.successes += 1;
        }
        self.best_reward = self.best_reward.max(total_reward);
        self.rewards.push(total_reward);
        self.converged = converged;
        self.recent_successes.push(success);
    }

    /// Fraction of all episodes that succeeded
    pub fn success_rate(&self) -> f32 {
        ratio(self.successes, self.episodes)
    }

    /// Fraction of the last 100 episodes that succeeded
    pub fn recent_success_rate(&self) -> f32 {
        let view = self.recent_successes.view();
        ratio(view.iter().filter(|&&s| s).count(), view.len())
    }

    pub fn average_reward(&self) -> f32 {
        if self.rewards.is_empty() {
            0.0
        } else {
            self.rewards.iter().sum::<f32>() / self.rewards.len() as f32
        }
    }
}

/// Result of greedy evaluation rollouts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    pub success_rate: f32,
    pub avg_reward: f32,
    pub avg_steps: f32,
}

fn ratio(count: usize, total: usize) -> f32 {
    if total == 0 {
        0.0
    } else {
        count as f32 / total as f32
    }
}

/// A training session owning an environment, an agent and the statistics of their interaction
///
/// The session drives the episode loop: reset, then select / step / record until the episode
/// ends, then one agent update. It is the only owner of the training state; create it with
/// [`new`](Session::new) (or [`cliff_walk`](Session::cliff_walk)) and release it with
/// [`dispose`](Session::dispose).
pub struct Session<B, E, Enc = OneHot>
where
    B: AutodiffBackend,
    E: Environment,
    Enc: StateEncoder,
{
    env: E,
    agent: ReinforceAgent<B, Enc>,
    stats: TrainingStats,
}

impl<B: AutodiffBackend> Session<B, CliffWalk> {
    /// Create a session on a fresh `rows` x `cols` cliff walk with a one-hot encoded agent
    pub fn cliff_walk(
        rows: usize,
        cols: usize,
        config: ReinforceAgentConfig,
        device: B::Device,
    ) -> Self {
        let env = CliffWalk::new(rows, cols);
        let agent = ReinforceAgent::new(
            OneHot::new(env.dims()),
            env.actions().len(),
            config,
            device,
        );
        Self::new(env, agent)
    }
}

impl<B, E, Enc> Session<B, E, Enc>
where
    B: AutodiffBackend,
    E: Environment<State = usize>,
    E::Action: TryFrom<usize, Error = Error>,
    Enc: StateEncoder,
{
    pub fn new(env: E, agent: ReinforceAgent<B, Enc>) -> Self {
        Self {
            env,
            agent,
            stats: TrainingStats::new(),
        }
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn agent(&self) -> &ReinforceAgent<B, Enc> {
        &self.agent
    }

    pub fn stats(&self) -> &TrainingStats {
        &self.stats
    }

    /// Play one episode with exploration and learn from it
    pub fn run_episode(&mut self) -> Result<EpisodeReport> {
        let (total_reward, steps, final_reward) = match self.rollout() {
            Ok(outcome) => outcome,
            Err(err) => {
                self.agent.discard_episode();
                return Err(err);
            }
        };

        self.agent.update(final_reward)?;
        let converged = self.agent.check_convergence(total_reward);
        let success = final_reward > 0.0;
        self.stats.record(total_reward, success, converged);

        let report = EpisodeReport {
            episode: self.stats.episodes,
            total_reward,
            steps,
            success,
            converged,
            epsilon: self.agent.epsilon(),
        };
        debug!("{report:?}");
        Ok(report)
    }

    /// **Returns** `(total_reward, steps, final_reward)`
    fn rollout(&mut self) -> Result<(f32, usize, f32)> {
        let mut state = self.env.reset();
        let mut final_reward = 0.0;
        let mut steps = 0;

        while steps < MAX_EPISODE_STEPS {
            let action = self.agent.select_action(state)?;
            let (next_state, reward, done) = self.env.step(E::Action::try_from(action)?);
            self.agent.record_reward(reward, Some(next_state), done);

            final_reward = reward;
            steps += 1;
            state = next_state;
            if done {
                break;
            }
        }

        let memory = self.agent.memory();
        if let Some(log_prob) = memory.last_log_prob() {
            trace!("rollout ended after {steps} steps, last action log p = {log_prob:.4}");
        }
        Ok((memory.total_reward(), steps, final_reward))
    }

    /// Run `episodes` training episodes, logging progress every `log_interval` episodes
    pub fn train(&mut self, episodes: usize, log_interval: usize) -> Result<()> {
        let mut converged = self.stats.converged;
        for _ in 0..episodes {
            let report = self.run_episode()?;
            if log_interval > 0 && report.episode % log_interval == 0 {
                info!(
                    "episode {}: reward {:.2}, steps {}, success rate {:.4}, epsilon {:.3}",
                    report.episode,
                    report.total_reward,
                    report.steps,
                    self.stats.recent_success_rate(),
                    report.epsilon,
                );
            }
            if report.converged && !converged {
                info!("converged after {} episodes", report.episode);
            }
            converged = report.converged;
        }
        Ok(())
    }

    /// Play `episodes` greedy episodes without exploring or learning
    pub fn evaluate(&mut self, episodes: usize) -> Result<Evaluation> {
        if episodes == 0 {
            return Ok(Evaluation::default());
        }

        let mut successes = 0;
        let mut total_reward = 0.0;
        let mut total_steps = 0;
        for _ in 0..episodes {
            let mut state = self.env.reset();
            let mut final_reward = 0.0;
            for _ in 0..MAX_EPISODE_STEPS {
                let action = self.agent.greedy_action(state)?;
                let (next_state, reward, done) = self.env.step(E::Action::try_from(action)?);
                total_reward += reward;
                final_reward = reward;
                total_steps += 1;
                state = next_state;
                if done {
                    break;
                }
            }
            if final_reward > 0.0 {
                successes += 1;
            }
        }

        let n = episodes as f32;
        let evaluation = Evaluation {
            success_rate: successes as f32 / n,
            avg_reward: total_reward / n,
            avg_steps: total_steps as f32 / n,
        };
        info!("evaluation over {episodes} episodes: {evaluation:?}");
        Ok(evaluation)
    }

    /// End the session, returning its statistics
    pub fn dispose(self) -> TrainingStats {
        self.stats
    }
}
