//! Noise mechanisms for differential privacy.
//!
//! Both mechanisms are stateless: they take a true value, the query's
//! sensitivity and the budget to spend, and return a noisy release drawn from
//! the caller's random source.

use rand::Rng;
use rand_distr::{Distribution, Exp, Normal};

use crate::budget::PrivacyBudget;
use crate::error::{DpError, Result};
use crate::tensor::{Scalar, Tensor};

fn check_sensitivity(sensitivity: f64) -> Result<()> {
    if !sensitivity.is_finite() || sensitivity < 0.0 {
        return Err(DpError::invalid(format!(
            "sensitivity must be finite and non-negative, got {sensitivity}"
        )));
    }
    Ok(())
}

fn check_epsilon(budget: &PrivacyBudget) -> Result<()> {
    if budget.epsilon() <= 0.0 {
        return Err(DpError::invalid_budget(format!(
            "epsilon must be positive, got {}",
            budget.epsilon()
        )));
    }
    Ok(())
}

/// Add Gaussian noise with standard deviation `sigma` to a tensor in-place.
pub fn add_gaussian_noise<R: Rng>(tensor: &mut Tensor, sigma: f64, rng: &mut R) -> Result<()> {
    if !sigma.is_finite() || sigma < 0.0 {
        return Err(DpError::numerical(format!("invalid gaussian sigma {sigma}")));
    }
    if sigma == 0.0 || tensor.is_empty() {
        return Ok(());
    }

    let dist = Normal::new(0.0, sigma).map_err(|e| DpError::numerical(e.to_string()))?;
    tensor.mapv_inplace(|x| x + (dist.sample(rng) as Scalar));
    Ok(())
}

/// Add Laplace noise with scale `scale` to a tensor in-place.
pub fn add_laplace_noise<R: Rng>(tensor: &mut Tensor, scale: f64, rng: &mut R) -> Result<()> {
    if !scale.is_finite() || scale < 0.0 {
        return Err(DpError::numerical(format!("invalid laplace scale {scale}")));
    }
    if scale == 0.0 || tensor.is_empty() {
        return Ok(());
    }

    // Laplace noise can be sampled as the difference of two exponentials.
    let dist = Exp::new(1.0 / scale).map_err(|e| DpError::numerical(e.to_string()))?;
    tensor.mapv_inplace(|x| {
        let n = dist.sample(rng) - dist.sample(rng);
        x + (n as Scalar)
    });
    Ok(())
}

/// Laplace mechanism for pure epsilon-DP.
#[derive(Clone, Debug)]
pub struct LaplaceMechanism {
    /// Epsilon parameter.
    pub epsilon: f64,
    /// L1 sensitivity bound.
    pub sensitivity: f64,
}

impl LaplaceMechanism {
    /// Calibrate to a budget. The budget must have `delta == 0` and positive
    /// epsilon.
    pub fn new(sensitivity: f64, budget: &PrivacyBudget) -> Result<Self> {
        check_sensitivity(sensitivity)?;
        check_epsilon(budget)?;
        if !budget.is_pure() {
            return Err(DpError::invalid_budget(format!(
                "laplace mechanism requires delta = 0, got {}",
                budget.delta()
            )));
        }
        Ok(Self {
            epsilon: budget.epsilon(),
            sensitivity,
        })
    }

    /// Get the scale parameter `b = sensitivity / epsilon`.
    pub fn scale(&self) -> f64 {
        self.sensitivity / self.epsilon
    }

    /// Add i.i.d. noise to every coordinate of a tensor.
    pub fn apply<R: Rng>(&self, tensor: &mut Tensor, rng: &mut R) -> Result<()> {
        add_laplace_noise(tensor, self.scale(), rng)
    }
}

/// Gaussian mechanism for `(epsilon, delta)`-DP.
#[derive(Clone, Debug)]
pub struct GaussianMechanism {
    /// Epsilon parameter.
    pub epsilon: f64,
    /// Delta parameter.
    pub delta: f64,
    /// L2 sensitivity bound.
    pub sensitivity: f64,
}

impl GaussianMechanism {
    /// Calibrate to a budget. Requires positive epsilon and `0 < delta < 1`.
    pub fn new(sensitivity: f64, budget: &PrivacyBudget) -> Result<Self> {
        check_sensitivity(sensitivity)?;
        check_epsilon(budget)?;
        let delta = budget.delta();
        if delta <= 0.0 {
            return Err(DpError::invalid_budget(
                "gaussian mechanism requires a positive delta",
            ));
        }
        if delta >= 1.0 {
            return Err(DpError::invalid_budget(format!(
                "gaussian mechanism requires delta < 1, got {delta}"
            )));
        }
        Ok(Self {
            epsilon: budget.epsilon(),
            delta,
            sensitivity,
        })
    }

    /// Noise standard deviation `sensitivity * sqrt(2 ln(1.25 / delta)) / epsilon`.
    pub fn sigma(&self) -> f64 {
        self.sensitivity * (2.0 * (1.25 / self.delta).ln()).sqrt() / self.epsilon
    }

    /// Add i.i.d. noise to every coordinate of a tensor.
    pub fn apply<R: Rng>(&self, tensor: &mut Tensor, rng: &mut R) -> Result<()> {
        add_gaussian_noise(tensor, self.sigma(), rng)
    }
}

/// A calibrated mechanism chosen from the budget's delta.
#[derive(Clone, Debug)]
pub enum Mechanism {
    /// Used when `delta == 0`.
    Laplace(LaplaceMechanism),
    /// Used when `delta > 0`.
    Gaussian(GaussianMechanism),
}

impl Mechanism {
    /// Laplace for pure budgets, Gaussian otherwise.
    pub fn for_budget(sensitivity: f64, budget: &PrivacyBudget) -> Result<Self> {
        if budget.is_pure() {
            LaplaceMechanism::new(sensitivity, budget).map(Mechanism::Laplace)
        } else {
            GaussianMechanism::new(sensitivity, budget).map(Mechanism::Gaussian)
        }
    }

    /// Add noise to every coordinate of a tensor.
    pub fn apply<R: Rng>(&self, tensor: &mut Tensor, rng: &mut R) -> Result<()> {
        match self {
            Mechanism::Laplace(m) => m.apply(tensor, rng),
            Mechanism::Gaussian(m) => m.apply(tensor, rng),
        }
    }

    /// Release a single noisy scalar.
    pub fn release<R: Rng>(&self, value: f64, rng: &mut R) -> Result<f64> {
        let mut t = Tensor::from_elem(ndarray::IxDyn(&[1]), value);
        self.apply(&mut t, rng)?;
        Ok(t[[0]])
    }
}

/// Release `value + Laplace(0, sensitivity / epsilon)`.
pub fn laplace_mechanism<R: Rng>(
    value: f64,
    sensitivity: f64,
    budget: &PrivacyBudget,
    rng: &mut R,
) -> Result<f64> {
    Mechanism::Laplace(LaplaceMechanism::new(sensitivity, budget)?).release(value, rng)
}

/// Release `value + Gaussian(0, sigma)` with the classic calibration.
pub fn gaussian_mechanism<R: Rng>(
    value: f64,
    sensitivity: f64,
    budget: &PrivacyBudget,
    rng: &mut R,
) -> Result<f64> {
    Mechanism::Gaussian(GaussianMechanism::new(sensitivity, budget)?).release(value, rng)
}
