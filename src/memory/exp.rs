/// A single decision recorded during an episode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Exp {
    /// The state the decision was made in
    pub state: usize,
    /// The action taken in that state
    pub action: usize,
    /// The reward received for the action, or `None` while it is still pending
    pub reward: Option<f32>,
    /// Log-probability of the action under the policy at decision time
    pub log_prob: f32,
}
