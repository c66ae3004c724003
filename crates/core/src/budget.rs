//! The `(epsilon, delta)` privacy budget value type.

use std::cmp::Ordering;
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

use crate::error::{DpError, Result};

/// An immutable `(epsilon, delta)` privacy loss.
///
/// Budgets add componentwise (simple composition) and are partially ordered
/// componentwise: `a <= b` holds iff `a.epsilon <= b.epsilon` and
/// `a.delta <= b.delta`. Two budgets where one component is larger and the
/// other smaller are incomparable.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PrivacyBudget {
    epsilon: f64,
    delta: f64,
}

impl PrivacyBudget {
    /// Create a budget, rejecting negative or non-finite components.
    pub fn new(epsilon: f64, delta: f64) -> Result<Self> {
        if !epsilon.is_finite() || epsilon < 0.0 {
            return Err(DpError::invalid_budget(format!(
                "epsilon must be finite and non-negative, got {epsilon}"
            )));
        }
        if !delta.is_finite() || delta < 0.0 {
            return Err(DpError::invalid_budget(format!(
                "delta must be finite and non-negative, got {delta}"
            )));
        }
        Ok(Self { epsilon, delta })
    }

    /// Pure epsilon-DP budget (`delta = 0`).
    pub fn pure(epsilon: f64) -> Result<Self> {
        Self::new(epsilon, 0.0)
    }

    /// The empty budget `(0, 0)`.
    pub const fn zero() -> Self {
        Self {
            epsilon: 0.0,
            delta: 0.0,
        }
    }

    /// Epsilon component.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Delta component.
    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Whether this is a pure-DP budget.
    pub fn is_pure(&self) -> bool {
        self.delta == 0.0
    }

    /// Componentwise difference clamped at zero.
    pub fn saturating_sub(&self, other: &Self) -> Self {
        Self {
            epsilon: (self.epsilon - other.epsilon).max(0.0),
            delta: (self.delta - other.delta).max(0.0),
        }
    }

    /// The budget of `k` sequential uses under simple composition.
    pub fn scaled(&self, k: u64) -> Self {
        let k = k as f64;
        Self {
            epsilon: self.epsilon * k,
            delta: self.delta * k,
        }
    }
}

impl Add for PrivacyBudget {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            epsilon: self.epsilon + rhs.epsilon,
            delta: self.delta + rhs.delta,
        }
    }
}

impl Sum for PrivacyBudget {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), Add::add)
    }
}

impl<'a> Sum<&'a PrivacyBudget> for PrivacyBudget {
    fn sum<I: Iterator<Item = &'a PrivacyBudget>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl PartialOrd for PrivacyBudget {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        let eps = self.epsilon.partial_cmp(&other.epsilon)?;
        let delta = self.delta.partial_cmp(&other.delta)?;
        match (eps, delta) {
            (Ordering::Equal, ord) | (ord, Ordering::Equal) => Some(ord),
            (a, b) if a == b => Some(a),
            _ => None,
        }
    }
}

impl fmt::Display for PrivacyBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(eps={:.4}, delta={:.2e})", self.epsilon, self.delta)
    }
}

/// Combine a list of losses with simple composition.
pub fn combine_privacy_losses(losses: &[PrivacyBudget]) -> PrivacyBudget {
    losses.iter().sum()
}
