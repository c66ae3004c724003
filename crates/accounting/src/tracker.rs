//! Stateful privacy budget ledgers.
//!
//! Every tracker owns a fixed total and a consumed counter that starts at
//! `(0, 0)`. A charge is first composed into a cost by the tracker's strategy,
//! then checked against the remaining budget, and only committed when it fits.
//! A rejected charge leaves the ledger untouched.

use dp_table_core::{DpError, PrivacyBudget, Result};

use crate::composition::{advanced_composition, simple_composition};
use crate::moments::{MomentQuery, DEFAULT_MOMENT_ORDER};

/// Default slack delta used by the advanced tracker for one-shot queries.
pub const DEFAULT_TARGET_DELTA: f64 = 1e-5;

/// Read access to a privacy ledger.
pub trait PrivacyAccountant {
    /// Budget fixed at construction.
    fn total_privacy_budget(&self) -> PrivacyBudget;

    /// Budget spent so far.
    fn consumed_privacy_budget(&self) -> PrivacyBudget;

    /// Budget still available, clamped at zero.
    fn remaining_privacy_budget(&self) -> PrivacyBudget {
        self.total_privacy_budget()
            .saturating_sub(&self.consumed_privacy_budget())
    }
}

#[derive(Clone, Debug)]
struct Ledger {
    total: PrivacyBudget,
    consumed: PrivacyBudget,
}

impl Ledger {
    fn new(total: PrivacyBudget) -> Self {
        Self {
            total,
            consumed: PrivacyBudget::zero(),
        }
    }

    fn commit(&mut self, cost: PrivacyBudget, strategy: &'static str) -> Result<PrivacyBudget> {
        let e = self.consumed + cost;
        if !(e <= self.total) {
            return Err(self.reject(cost, strategy));
        }

        self.consumed = e;
        tracing::debug!(
            strategy,
            epsilon = cost.epsilon(),
            delta = cost.delta(),
            consumed_epsilon = e.epsilon(),
            consumed_delta = e.delta(),
            "privacy loss committed"
        );
        Ok(cost)
    }

    fn reject(&self, requested: PrivacyBudget, strategy: &'static str) -> DpError {
        let remaining = self.total.saturating_sub(&self.consumed);
        tracing::warn!(
            strategy,
            requested_epsilon = requested.epsilon(),
            requested_delta = requested.delta(),
            remaining_epsilon = remaining.epsilon(),
            remaining_delta = remaining.delta(),
            "privacy budget exhausted"
        );
        DpError::BudgetExhausted {
            requested,
            remaining,
        }
    }
}

/// Tracker using simple composition: costs add up linearly.
#[derive(Clone, Debug)]
pub struct SimplePrivacyBudgetTracker {
    ledger: Ledger,
}

impl SimplePrivacyBudgetTracker {
    /// Create a tracker with the given total budget.
    pub fn new(total_privacy_budget: PrivacyBudget) -> Self {
        Self {
            ledger: Ledger::new(total_privacy_budget),
        }
    }

    /// Charge one query.
    pub fn update_privacy_loss(&mut self, privacy_budget: &PrivacyBudget) -> Result<PrivacyBudget> {
        self.ledger.commit(*privacy_budget, "simple")
    }

    /// Charge `k` identical queries at once.
    pub fn update_privacy_loss_k(
        &mut self,
        privacy_budget: &PrivacyBudget,
        k: u64,
    ) -> Result<PrivacyBudget> {
        self.ledger
            .commit(simple_composition(privacy_budget, k), "simple")
    }
}

impl PrivacyAccountant for SimplePrivacyBudgetTracker {
    fn total_privacy_budget(&self) -> PrivacyBudget {
        self.ledger.total
    }

    fn consumed_privacy_budget(&self) -> PrivacyBudget {
        self.ledger.consumed
    }
}

/// Tracker using the advanced composition theorem.
#[derive(Clone, Debug)]
pub struct AdvancedPrivacyBudgetTracker {
    ledger: Ledger,
    target_delta: f64,
}

impl AdvancedPrivacyBudgetTracker {
    /// Create a tracker whose one-shot charges use [`DEFAULT_TARGET_DELTA`].
    pub fn new(total_privacy_budget: PrivacyBudget) -> Self {
        Self {
            ledger: Ledger::new(total_privacy_budget),
            target_delta: DEFAULT_TARGET_DELTA,
        }
    }

    /// Create a tracker with an explicit slack delta for one-shot charges.
    pub fn with_target_delta(total_privacy_budget: PrivacyBudget, target_delta: f64) -> Result<Self> {
        if !(target_delta > 0.0 && target_delta < 1.0) {
            return Err(DpError::invalid_budget(format!(
                "target delta must be in (0, 1), got {target_delta}"
            )));
        }
        Ok(Self {
            ledger: Ledger::new(total_privacy_budget),
            target_delta,
        })
    }

    /// Slack delta used for one-shot charges.
    pub fn target_delta(&self) -> f64 {
        self.target_delta
    }

    /// Charge `k` queries of `privacy_budget` each, composed with slack
    /// `target_delta`.
    ///
    /// A composed epsilon too large to represent cannot fit any finite total,
    /// so it is reported as [`DpError::BudgetExhausted`] carrying the
    /// uncomposed `k`-fold loss.
    pub fn update_privacy_loss(
        &mut self,
        privacy_budget: &PrivacyBudget,
        target_delta: f64,
        k: u64,
    ) -> Result<PrivacyBudget> {
        let cost = match advanced_composition(privacy_budget, k, target_delta) {
            Ok(cost) => cost,
            Err(DpError::NumericalError { .. }) => {
                return Err(self
                    .ledger
                    .reject(simple_composition(privacy_budget, k), "advanced"));
            }
            Err(err) => return Err(err),
        };
        self.ledger.commit(cost, "advanced")
    }
}

impl PrivacyAccountant for AdvancedPrivacyBudgetTracker {
    fn total_privacy_budget(&self) -> PrivacyBudget {
        self.ledger.total
    }

    fn consumed_privacy_budget(&self) -> PrivacyBudget {
        self.ledger.consumed
    }
}

/// Tracker using the moments accountant, for iterative mechanisms such as
/// noisy gradient descent.
#[derive(Clone, Debug)]
pub struct MomentPrivacyBudgetTracker {
    ledger: Ledger,
    moment_order: usize,
}

impl MomentPrivacyBudgetTracker {
    /// Create a tracker evaluating orders `1..=32` by default.
    pub fn new(total_privacy_budget: PrivacyBudget) -> Self {
        Self {
            ledger: Ledger::new(total_privacy_budget),
            moment_order: DEFAULT_MOMENT_ORDER,
        }
    }

    /// Create a tracker with a different default largest moment order.
    pub fn with_moment_order(total_privacy_budget: PrivacyBudget, moment_order: usize) -> Result<Self> {
        if moment_order == 0 {
            return Err(DpError::invalid("moment order must be at least 1"));
        }
        Ok(Self {
            ledger: Ledger::new(total_privacy_budget),
            moment_order,
        })
    }

    /// Default largest moment order.
    pub fn moment_order(&self) -> usize {
        self.moment_order
    }

    /// Cost of `query` without committing it.
    pub fn privacy_spent(&self, query: &MomentQuery) -> Result<PrivacyBudget> {
        query.privacy_spent(self.moment_order)
    }

    /// Charge a whole iterative run.
    pub fn update_privacy_loss(&mut self, query: &MomentQuery) -> Result<PrivacyBudget> {
        let cost = self.privacy_spent(query)?;
        self.ledger.commit(cost, "moment")
    }
}

impl PrivacyAccountant for MomentPrivacyBudgetTracker {
    fn total_privacy_budget(&self) -> PrivacyBudget {
        self.ledger.total
    }

    fn consumed_privacy_budget(&self) -> PrivacyBudget {
        self.ledger.consumed
    }
}

/// A privacy loss to be charged to a tracker.
#[derive(Clone, Debug, PartialEq)]
pub enum PrivacyLoss {
    /// One query at the given budget.
    Query(PrivacyBudget),
    /// `k` queries at the same budget; `target_delta` is the advanced
    /// composition slack and is ignored by the simple tracker.
    Repeated {
        /// Per-query budget.
        budget: PrivacyBudget,
        /// Advanced composition slack.
        target_delta: f64,
        /// Number of queries.
        k: u64,
    },
    /// An iterative subsampled Gaussian run.
    Iterative(MomentQuery),
}

/// One of the three composition strategies.
///
/// The strategy is chosen once, when the tracker is built, and never changes.
#[derive(Clone, Debug)]
pub enum PrivacyBudgetTracker {
    /// Simple composition.
    Simple(SimplePrivacyBudgetTracker),
    /// Advanced composition.
    Advanced(AdvancedPrivacyBudgetTracker),
    /// Moments accountant.
    Moment(MomentPrivacyBudgetTracker),
}

impl PrivacyBudgetTracker {
    /// Strategy name.
    pub fn strategy(&self) -> &'static str {
        match self {
            PrivacyBudgetTracker::Simple(_) => "simple",
            PrivacyBudgetTracker::Advanced(_) => "advanced",
            PrivacyBudgetTracker::Moment(_) => "moment",
        }
    }

    /// Charge `loss`, returning the composed cost actually committed.
    pub fn update_privacy_loss(&mut self, loss: &PrivacyLoss) -> Result<PrivacyBudget> {
        match (self, loss) {
            (PrivacyBudgetTracker::Simple(t), PrivacyLoss::Query(budget)) => {
                t.update_privacy_loss(budget)
            }
            (PrivacyBudgetTracker::Simple(t), PrivacyLoss::Repeated { budget, k, .. }) => {
                t.update_privacy_loss_k(budget, *k)
            }
            (PrivacyBudgetTracker::Advanced(t), PrivacyLoss::Query(budget)) => {
                let target_delta = t.target_delta();
                t.update_privacy_loss(budget, target_delta, 1)
            }
            (
                PrivacyBudgetTracker::Advanced(t),
                PrivacyLoss::Repeated {
                    budget,
                    target_delta,
                    k,
                },
            ) => t.update_privacy_loss(budget, *target_delta, *k),
            (PrivacyBudgetTracker::Moment(t), PrivacyLoss::Iterative(query)) => {
                t.update_privacy_loss(query)
            }
            (tracker, loss) => Err(DpError::invalid(format!(
                "{} tracker cannot account {}",
                tracker.strategy(),
                loss_kind(loss)
            ))),
        }
    }

    /// Charge one query at `budget`.
    pub fn charge_query(&mut self, budget: &PrivacyBudget) -> Result<PrivacyBudget> {
        self.update_privacy_loss(&PrivacyLoss::Query(*budget))
    }
}

fn loss_kind(loss: &PrivacyLoss) -> &'static str {
    match loss {
        PrivacyLoss::Query(_) => "a one-shot query",
        PrivacyLoss::Repeated { .. } => "repeated queries",
        PrivacyLoss::Iterative(_) => "an iterative mechanism",
    }
}

impl PrivacyAccountant for PrivacyBudgetTracker {
    fn total_privacy_budget(&self) -> PrivacyBudget {
        match self {
            PrivacyBudgetTracker::Simple(t) => t.total_privacy_budget(),
            PrivacyBudgetTracker::Advanced(t) => t.total_privacy_budget(),
            PrivacyBudgetTracker::Moment(t) => t.total_privacy_budget(),
        }
    }

    fn consumed_privacy_budget(&self) -> PrivacyBudget {
        match self {
            PrivacyBudgetTracker::Simple(t) => t.consumed_privacy_budget(),
            PrivacyBudgetTracker::Advanced(t) => t.consumed_privacy_budget(),
            PrivacyBudgetTracker::Moment(t) => t.consumed_privacy_budget(),
        }
    }
}
