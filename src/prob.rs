//! Helpers for working with discrete action distributions

/// Floor added to probabilities before taking a logarithm
pub const LOG_FLOOR: f32 = 1e-8;

/// Cap on the shifted exponent in [`softmax`]
const MAX_EXPONENT: f32 = 20.0;

/// Numerically stable softmax
///
/// Logits are shifted by their maximum before exponentiating and the shifted exponent is capped,
/// so arbitrarily large logits cannot overflow. If the logits contain non-finite values or the
/// exponential sum degenerates, a uniform distribution is returned instead.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    if logits.is_empty() {
        return Vec::new();
    }
    if logits.iter().any(|x| !x.is_finite()) {
        return uniform(logits.len());
    }

    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);

    let exps = logits
        .iter()
        .map(|x| (x - max).min(MAX_EXPONENT).exp())
        .collect::<Vec<_>>();
    let sum: f32 = exps.iter().sum();
    if !sum.is_finite() || sum <= 0.0 {
        return uniform(logits.len());
    }

    exps.into_iter().map(|x| x / sum).collect()
}

/// Uniform distribution over `n` outcomes
pub fn uniform(n: usize) -> Vec<f32> {
    vec![1.0 / n as f32; n]
}

/// Log-probability with a floor, never negative infinity
pub fn log_prob(p: f32) -> f32 {
    (p + LOG_FLOOR).ln()
}

/// Index of the largest value, preferring the first on ties
///
/// **Panics** if `values` is empty
pub fn argmax(values: &[f32]) -> usize {
    assert!(!values.is_empty(), "argmax of an empty slice");
    values
        .iter()
        .enumerate()
        .fold(0, |best, (i, &x)| if x > values[best] { i } else { best })
}
