use crate::error::{Error, Result};

use super::Exp;

/// Added to the variance before taking its square root when normalizing returns
const VARIANCE_EPSILON: f32 = 1e-8;

/// An append-only record of one episode's decisions
///
/// Each decision is recorded at selection time with its reward still pending; the reward is
/// filled in once the environment reveals it. At the end of the episode the trajectory yields
/// normalized discounted returns and is then cleared.
#[derive(Debug, Default, Clone)]
pub struct Trajectory {
    entries: Vec<Exp>,
    next_states: Vec<usize>,
    dones: Vec<bool>,
}

impl Trajectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a decision; `reward` may be `None` to be filled in later
    pub fn record(&mut self, state: usize, action: usize, reward: Option<f32>, log_prob: f32) {
        self.entries.push(Exp {
            state,
            action,
            reward,
            log_prob,
        });
    }

    /// Replace the reward of the most recent decision
    ///
    /// **Returns** `false` if nothing has been recorded
    pub fn overwrite_last_reward(&mut self, reward: f32) -> bool {
        match self.entries.last_mut() {
            Some(exp) => {
                exp.reward = Some(reward);
                true
            }
            None => false,
        }
    }

    /// Record where the last decision led; diagnostic only
    pub fn record_outcome(&mut self, next_state: Option<usize>, done: bool) {
        if let Some(next_state) = next_state {
            self.next_states.push(next_state);
        }
        self.dones.push(done);
    }

    pub fn entries(&self) -> &[Exp] {
        &self.entries
    }

    pub fn next_states(&self) -> &[usize] {
        &self.next_states
    }

    pub fn dones(&self) -> &[bool] {
        &self.dones
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last_log_prob(&self) -> Option<f32> {
        self.entries.last().map(|exp| exp.log_prob)
    }

    pub fn last_reward(&self) -> Option<f32> {
        self.entries.last().and_then(|exp| exp.reward)
    }

    /// Sum of the rewards filled in so far
    pub fn total_reward(&self) -> f32 {
        self.entries.iter().filter_map(|exp| exp.reward).sum()
    }

    /// All rewards in order
    ///
    /// Fails with [`Error::PendingReward`] if any reward is still a placeholder
    pub fn rewards(&self) -> Result<Vec<f32>> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, exp)| exp.reward.ok_or(Error::PendingReward { index }))
            .collect()
    }

    /// Discounted returns `G[t] = r[t] + gamma * G[t+1]`, without normalization
    pub fn discounted_returns(&self, gamma: f32) -> Result<Vec<f32>> {
        let rewards = self.rewards()?;
        let mut returns = vec![0.0; rewards.len()];
        let mut running = 0.0;
        for (t, reward) in rewards.iter().enumerate().rev() {
            running = reward + gamma * running;
            returns[t] = running;
        }
        Ok(returns)
    }

    /// Discounted returns normalized to zero mean and unit variance
    pub fn compute_discounted_returns(&self, gamma: f32) -> Result<Vec<f32>> {
        let mut returns = self.discounted_returns(gamma)?;
        normalize(&mut returns);
        Ok(returns)
    }

    /// Discard all entries
    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_states.clear();
        self.dones.clear();
    }
}

/// Shift and scale `values` in place to zero mean and unit variance
pub fn normalize(values: &mut [f32]) {
    if values.is_empty() {
        return;
    }

    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / n;
    let std = (variance + VARIANCE_EPSILON).sqrt();
    for x in values.iter_mut() {
        *x = (*x - mean) / std;
    }
}

#[cfg(test)]
mod tests {
    use statrs::statistics::Statistics;

    use super::*;

    fn filled(rewards: &[f32]) -> Trajectory {
        let mut trajectory = Trajectory::new();
        for (t, &reward) in rewards.iter().enumerate() {
            trajectory.record(t, t % 4, Some(reward), -1.0);
        }
        trajectory
    }

    #[test]
    fn record_and_clear() {
        let mut trajectory = Trajectory::new();
        assert!(trajectory.is_empty(), "initialized empty");

        trajectory.record(0, 1, Some(0.5), -0.5);
        assert_eq!(trajectory.len(), 1);
        assert_eq!(
            trajectory.entries()[0],
            Exp {
                state: 0,
                action: 1,
                reward: Some(0.5),
                log_prob: -0.5
            },
            "entry stored as given"
        );
        assert_eq!(trajectory.last_log_prob(), Some(-0.5));

        trajectory.record_outcome(Some(1), false);
        trajectory.clear();
        assert!(trajectory.is_empty(), "cleared");
        assert!(trajectory.next_states().is_empty() && trajectory.dones().is_empty());
        assert_eq!(trajectory.last_log_prob(), None);
    }

    #[test]
    fn pending_rewards_are_overwritten() {
        let mut trajectory = Trajectory::new();
        assert!(!trajectory.overwrite_last_reward(1.0), "nothing to overwrite");

        trajectory.record(3, 0, None, -1.4);
        assert_eq!(trajectory.last_reward(), None, "pending");
        assert_eq!(
            trajectory.compute_discounted_returns(0.99),
            Err(Error::PendingReward { index: 0 })
        );

        assert!(trajectory.overwrite_last_reward(-1.0));
        trajectory.record(0, 1, None, -1.4);
        assert!(trajectory.overwrite_last_reward(-1.0));
        assert!(trajectory.overwrite_last_reward(10.0), "terminal override");

        assert_eq!(trajectory.rewards().unwrap(), vec![-1.0, 10.0]);
        assert_eq!(trajectory.total_reward(), 9.0);
    }

    #[test]
    fn discounted_returns_follow_recurrence() {
        let trajectory = filled(&[1.0, 2.0, 3.0]);
        let returns = trajectory.discounted_returns(0.9).unwrap();
        let expected = [5.23, 4.7, 3.0];
        for (g, e) in returns.iter().zip(expected) {
            assert!((g - e).abs() < 1e-5, "{returns:?}");
        }

        let rewards = [-1.0, -10.0, -1.0, -1.0, 10.0];
        let gamma = 0.99;
        let returns = filled(&rewards).discounted_returns(gamma).unwrap();
        assert_eq!(returns.len(), rewards.len(), "one return per reward");
        assert_eq!(returns[4], rewards[4], "last return is the last reward");
        for t in 0..4 {
            assert!((returns[t] - (rewards[t] + gamma * returns[t + 1])).abs() < 1e-5);
        }
    }

    #[test]
    fn normalized_returns_have_zero_mean_unit_std() {
        let trajectory = filled(&[-1.0, -10.0, -1.0, -1.0, -1.0, 10.0]);
        let returns = trajectory.compute_discounted_returns(0.99).unwrap();
        let returns = returns.iter().map(|&g| g as f64).collect::<Vec<_>>();

        assert!(returns.iter().mean().abs() < 1e-5, "zero mean");
        assert!((returns.iter().population_std_dev() - 1.0).abs() < 1e-3, "unit std");
    }

    #[test]
    fn normalized_reference_values() {
        let returns = filled(&[1.0, 2.0, 3.0])
            .compute_discounted_returns(0.9)
            .unwrap();
        let raw = [5.23_f32, 4.7, 3.0];
        let mean = raw.iter().sum::<f32>() / 3.0;
        let std = (raw.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / 3.0 + 1e-8).sqrt();
        for (g, r) in returns.iter().zip(raw) {
            assert!((g - (r - mean) / std).abs() < 1e-2);
        }
    }

    #[test]
    fn constant_and_empty_episodes_do_not_divide_by_zero() {
        let returns = filled(&[2.0]).compute_discounted_returns(0.99).unwrap();
        assert_eq!(returns, vec![0.0], "single step normalizes to zero");

        let returns = filled(&[0.0, 0.0, 0.0])
            .compute_discounted_returns(0.99)
            .unwrap();
        assert!(returns.iter().all(|g| g.is_finite()));

        let returns = Trajectory::new().compute_discounted_returns(0.99).unwrap();
        assert!(returns.is_empty());
    }
}
