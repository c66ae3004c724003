//! Moments accountant for the subsampled Gaussian mechanism.
//!
//! For moment order `l` the log-moment of one step is `ln A(l + 1)` where
//!
//! `A(a) = sum_{j=0}^{a} C(a, j) q^j (1 - q)^(a - j) exp(j (j - 1) / (2 sigma^2))`.
//!
//! Log-moments of independent steps add, and the tail bound
//! `delta = exp(log_moment(l) - l * eps)` converts them to `(eps, delta)`.

use dp_table_core::{DpError, PrivacyBudget, Result};

/// Default largest moment order.
pub const DEFAULT_MOMENT_ORDER: usize = 32;

/// The privacy parameter fixed by the caller; the other one is solved for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MomentTarget {
    /// Fix epsilon, solve for delta.
    Epsilon(f64),
    /// Fix delta, solve for epsilon.
    Delta(f64),
}

impl MomentTarget {
    fn validate(&self) -> Result<()> {
        match *self {
            MomentTarget::Epsilon(eps) if !(eps.is_finite() && eps > 0.0) => Err(
                DpError::invalid_budget(format!("target epsilon must be positive, got {eps}")),
            ),
            MomentTarget::Delta(delta) if !(delta > 0.0 && delta < 1.0) => Err(
                DpError::invalid_budget(format!("target delta must be in (0, 1), got {delta}")),
            ),
            _ => Ok(()),
        }
    }
}

/// An iterative subsampled Gaussian mechanism to be accounted.
#[derive(Clone, Debug, PartialEq)]
pub struct MomentQuery {
    /// Fraction of the data used per step.
    pub sampling_ratio: f64,
    /// Noise standard deviation divided by the clipping bound.
    pub noise_multiplier: f64,
    /// Number of steps.
    pub steps: u64,
    /// Largest moment order; `None` uses the tracker's default.
    pub moment_order: Option<usize>,
    /// The fixed privacy parameter.
    pub target: MomentTarget,
}

impl MomentQuery {
    /// Describe `steps` steps at sampling ratio `q` with noise multiplier `sigma`.
    pub fn new(sampling_ratio: f64, noise_multiplier: f64, steps: u64, target: MomentTarget) -> Self {
        Self {
            sampling_ratio,
            noise_multiplier,
            steps,
            moment_order: None,
            target,
        }
    }

    /// Set the largest moment order.
    pub fn with_moment_order(mut self, moment_order: usize) -> Self {
        self.moment_order = Some(moment_order);
        self
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        let q = self.sampling_ratio;
        if !q.is_finite() || !(0.0..=1.0).contains(&q) {
            return Err(DpError::invalid(format!(
                "sampling ratio must be in [0, 1], got {q}"
            )));
        }
        let sigma = self.noise_multiplier;
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(DpError::invalid(format!(
                "noise multiplier must be positive, got {sigma}"
            )));
        }
        if self.moment_order == Some(0) {
            return Err(DpError::invalid("moment order must be at least 1"));
        }
        self.target.validate()
    }

    /// Cost of this query with the largest moment order `max_order`.
    pub fn privacy_spent(&self, default_order: usize) -> Result<PrivacyBudget> {
        self.validate()?;
        if self.steps == 0 || self.sampling_ratio == 0.0 {
            return Ok(PrivacyBudget::zero());
        }
        let max_order = self.moment_order.unwrap_or(default_order).max(1);
        let moments = log_moments(
            self.sampling_ratio,
            self.noise_multiplier,
            self.steps,
            max_order,
        );
        get_privacy_spent(&moments, self.target)
    }
}

/// Log-moment of order `order` accumulated over `steps` steps.
pub fn compute_log_moment(q: f64, sigma: f64, steps: u64, order: usize) -> f64 {
    let log_fact = precompute_log_factorials(order + 1);
    compute_log_moment_with(q, sigma, steps, order, &log_fact)
}

/// Log-moments `(order, log_moment)` for every order in `1..=max_order`.
pub fn log_moments(q: f64, sigma: f64, steps: u64, max_order: usize) -> Vec<(usize, f64)> {
    let log_fact = precompute_log_factorials(max_order + 1);
    (1..=max_order)
        .map(|order| {
            (
                order,
                compute_log_moment_with(q, sigma, steps, order, &log_fact),
            )
        })
        .collect()
}

/// Convert log-moments to an `(eps, delta)` budget via the tail bound.
///
/// With `MomentTarget::Delta(d)` epsilon is `min_l (log_moment(l) - ln d) / l`;
/// with `MomentTarget::Epsilon(e)` delta is `min(1, min_l exp(log_moment(l) - l e))`.
pub fn get_privacy_spent(log_moments: &[(usize, f64)], target: MomentTarget) -> Result<PrivacyBudget> {
    target.validate()?;
    let finite = log_moments
        .iter()
        .filter(|(order, lm)| *order > 0 && lm.is_finite());

    match target {
        MomentTarget::Delta(delta) => {
            let log_delta = delta.ln();
            let eps = finite
                .map(|&(order, lm)| (lm - log_delta) / order as f64)
                .fold(f64::INFINITY, f64::min);
            if !eps.is_finite() {
                return Err(DpError::numerical("no finite log-moment to bound epsilon"));
            }
            PrivacyBudget::new(eps.max(0.0), delta)
        }
        MomentTarget::Epsilon(eps) => {
            let delta = finite
                .map(|&(order, lm)| (lm - order as f64 * eps).exp())
                .fold(1.0, f64::min);
            PrivacyBudget::new(eps, delta)
        }
    }
}

fn compute_log_moment_with(q: f64, sigma: f64, steps: u64, order: usize, log_fact: &[f64]) -> f64 {
    if q == 0.0 || steps == 0 {
        return 0.0;
    }
    if !sigma.is_finite() || sigma <= 0.0 {
        return f64::INFINITY;
    }
    let alpha = order + 1;
    let per_step = if q == 1.0 {
        let a = alpha as f64;
        a * (a - 1.0) / (2.0 * sigma * sigma)
    } else {
        log_a_term(q, sigma, alpha, log_fact)
    };
    per_step * steps as f64
}

fn precompute_log_factorials(max_n: usize) -> Vec<f64> {
    let mut log_fact = vec![0.0; max_n.saturating_add(1)];
    for i in 1..log_fact.len() {
        log_fact[i] = log_fact[i - 1] + (i as f64).ln();
    }
    log_fact
}

/// Compute ln A(alpha) for integer alpha and `0 < q < 1`.
fn log_a_term(q: f64, sigma: f64, alpha: usize, log_fact: &[f64]) -> f64 {
    let log_q = q.ln();
    let log_1mq = (1.0 - q).ln();
    let sigma_sq = sigma * sigma;
    let alpha_f = alpha as f64;

    let mut log_sum = f64::NEG_INFINITY;
    for j in 0..=alpha {
        let j_f = j as f64;
        let log_binom = log_fact[alpha] - log_fact[j] - log_fact[alpha - j];
        let log_prob = j_f * log_q + (alpha_f - j_f) * log_1mq;
        let log_exp = j_f * (j_f - 1.0) / (2.0 * sigma_sq);
        log_sum = log_add_exp(log_sum, log_binom + log_prob + log_exp);
    }
    log_sum
}

/// Numerically stable log(exp(a) + exp(b)).
fn log_add_exp(a: f64, b: f64) -> f64 {
    if a == f64::NEG_INFINITY {
        return b;
    }
    if b == f64::NEG_INFINITY {
        return a;
    }
    if a > b {
        a + (b - a).exp().ln_1p()
    } else {
        b + (a - b).exp().ln_1p()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_full_batch_matches_closed_form() {
        // Without subsampling the moment is that of a plain Gaussian.
        let sigma = 2.0;
        let lm = compute_log_moment(1.0, sigma, 3, 4);
        assert!((lm - 3.0 * 5.0 * 4.0 / (2.0 * sigma * sigma)).abs() < 1e-12);

        let log_fact = precompute_log_factorials(5);
        let via_sum = log_a_term(1.0 - 1e-12, sigma, 5, &log_fact) * 3.0;
        assert!((via_sum - lm).abs() < 1e-6);
    }

    #[test]
    fn test_log_moments_add_over_steps() {
        let one = compute_log_moment(0.01, 1.1, 1, 8);
        let many = compute_log_moment(0.01, 1.1, 250, 8);
        assert!((many - 250.0 * one).abs() < 1e-9);
    }

    #[test]
    fn test_orders_are_one_based() {
        let moments = log_moments(0.05, 1.0, 10, 32);
        assert_eq!(moments.len(), 32);
        assert_eq!(moments[0].0, 1);
        assert_eq!(moments[31].0, 32);
        assert!(moments.iter().all(|(_, lm)| lm.is_finite() && *lm >= 0.0));
    }

    #[test]
    fn test_epsilon_for_target_delta_is_finite() {
        let moments = log_moments(0.01, 4.0, 10_000, DEFAULT_MOMENT_ORDER);
        let spent = get_privacy_spent(&moments, MomentTarget::Delta(1e-5)).unwrap();
        assert!(spent.epsilon() > 0.0);
        assert!(spent.epsilon() < 10.0);
        assert_eq!(spent.delta(), 1e-5);
    }

    #[test]
    fn test_delta_and_epsilon_solutions_agree() {
        let moments = log_moments(0.02, 2.0, 500, DEFAULT_MOMENT_ORDER);
        let by_delta = get_privacy_spent(&moments, MomentTarget::Delta(1e-5)).unwrap();
        let by_eps = get_privacy_spent(&moments, MomentTarget::Epsilon(by_delta.epsilon())).unwrap();
        assert!(by_eps.delta() <= 1e-5 * (1.0 + 1e-6));
    }

    #[test]
    fn test_invalid_targets() {
        let moments = log_moments(0.02, 2.0, 10, 4);
        assert!(matches!(
            get_privacy_spent(&moments, MomentTarget::Delta(0.0)),
            Err(DpError::InvalidBudget { .. })
        ));
        assert!(matches!(
            get_privacy_spent(&moments, MomentTarget::Epsilon(-1.0)),
            Err(DpError::InvalidBudget { .. })
        ));
    }

    #[test]
    fn test_query_validation() {
        let target = MomentTarget::Delta(1e-5);
        assert!(MomentQuery::new(1.5, 1.0, 10, target).validate().is_err());
        assert!(MomentQuery::new(0.1, 0.0, 10, target).validate().is_err());
        assert!(MomentQuery::new(0.1, 1.0, 10, target)
            .with_moment_order(0)
            .validate()
            .is_err());
        let free = MomentQuery::new(0.1, 1.0, 0, target).privacy_spent(32).unwrap();
        assert_eq!(free, PrivacyBudget::zero());
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 32, .. ProptestConfig::default() })]

        #[test]
        fn more_noise_reduces_epsilon(
            noise_a in 0.8f64..8.0,
            noise_b in 0.8f64..8.0,
            steps in 1u64..2_000,
            q in 0.001f64..0.2,
        ) {
            let target = MomentTarget::Delta(1e-5);
            let low = noise_a.min(noise_b);
            let high = noise_a.max(noise_b);
            let eps_low = MomentQuery::new(q, low, steps, target).privacy_spent(32).unwrap();
            let eps_high = MomentQuery::new(q, high, steps, target).privacy_spent(32).unwrap();
            prop_assert!(eps_high.epsilon() <= eps_low.epsilon() + 1e-9);
        }

        #[test]
        fn more_steps_increase_epsilon(
            noise in 0.8f64..8.0,
            steps in 1u64..2_000,
            extra in 1u64..2_000,
            q in 0.001f64..0.2,
        ) {
            let target = MomentTarget::Delta(1e-5);
            let a = MomentQuery::new(q, noise, steps, target).privacy_spent(32).unwrap();
            let b = MomentQuery::new(q, noise, steps + extra, target).privacy_spent(32).unwrap();
            prop_assert!(a.epsilon() <= b.epsilon() + 1e-9);
        }
    }
}
