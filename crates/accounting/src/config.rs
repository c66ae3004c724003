//! Tracker configuration types.

use std::str::FromStr;

use dp_table_core::{DpError, PrivacyBudget, Result};

use crate::moments::DEFAULT_MOMENT_ORDER;
use crate::tracker::{
    AdvancedPrivacyBudgetTracker, MomentPrivacyBudgetTracker, PrivacyBudgetTracker,
    SimplePrivacyBudgetTracker, DEFAULT_TARGET_DELTA,
};

/// Configuration for constructing a tracker with a fresh ledger.
pub trait BudgetTrackerConfig {
    /// Create a new tracker holding `total` budget.
    fn create_tracker(&self, total: PrivacyBudget) -> Result<PrivacyBudgetTracker>;
}

/// Configuration for the simple composition tracker.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimpleTrackerConfig;

impl BudgetTrackerConfig for SimpleTrackerConfig {
    fn create_tracker(&self, total: PrivacyBudget) -> Result<PrivacyBudgetTracker> {
        Ok(PrivacyBudgetTracker::Simple(SimplePrivacyBudgetTracker::new(
            total,
        )))
    }
}

/// Configuration for the advanced composition tracker.
#[derive(Clone, Copy, Debug)]
pub struct AdvancedTrackerConfig {
    /// Slack delta charged with every one-shot query.
    pub target_delta: f64,
}

impl Default for AdvancedTrackerConfig {
    fn default() -> Self {
        Self {
            target_delta: DEFAULT_TARGET_DELTA,
        }
    }
}

impl AdvancedTrackerConfig {
    /// Create a config with an explicit slack delta.
    pub fn new(target_delta: f64) -> Self {
        Self { target_delta }
    }
}

impl BudgetTrackerConfig for AdvancedTrackerConfig {
    fn create_tracker(&self, total: PrivacyBudget) -> Result<PrivacyBudgetTracker> {
        AdvancedPrivacyBudgetTracker::with_target_delta(total, self.target_delta)
            .map(PrivacyBudgetTracker::Advanced)
    }
}

/// Configuration for the moments accountant tracker.
#[derive(Clone, Copy, Debug)]
pub struct MomentTrackerConfig {
    /// Largest moment order evaluated when a query does not set one.
    pub moment_order: usize,
}

impl Default for MomentTrackerConfig {
    fn default() -> Self {
        Self {
            moment_order: DEFAULT_MOMENT_ORDER,
        }
    }
}

impl MomentTrackerConfig {
    /// Create a config with an explicit largest moment order.
    pub fn new(moment_order: usize) -> Self {
        Self { moment_order }
    }
}

impl BudgetTrackerConfig for MomentTrackerConfig {
    fn create_tracker(&self, total: PrivacyBudget) -> Result<PrivacyBudgetTracker> {
        MomentPrivacyBudgetTracker::with_moment_order(total, self.moment_order)
            .map(PrivacyBudgetTracker::Moment)
    }
}

/// Composition strategy used for one-shot table queries.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum CompositionStrategy {
    /// Simple composition.
    #[default]
    Simple,
    /// Advanced composition with a per-query slack delta.
    Advanced {
        /// Slack delta charged with every query.
        target_delta: f64,
    },
}

impl CompositionStrategy {
    /// Advanced composition with the default slack delta.
    pub fn advanced() -> Self {
        Self::Advanced {
            target_delta: DEFAULT_TARGET_DELTA,
        }
    }
}

impl BudgetTrackerConfig for CompositionStrategy {
    fn create_tracker(&self, total: PrivacyBudget) -> Result<PrivacyBudgetTracker> {
        match *self {
            CompositionStrategy::Simple => SimpleTrackerConfig.create_tracker(total),
            CompositionStrategy::Advanced { target_delta } => {
                AdvancedTrackerConfig::new(target_delta).create_tracker(total)
            }
        }
    }
}

impl FromStr for CompositionStrategy {
    type Err = DpError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "advance" | "advanced" => Ok(Self::advanced()),
            other => Err(DpError::invalid(format!(
                "unknown composition strategy `{other}`"
            ))),
        }
    }
}
