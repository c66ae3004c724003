//! Privacy budget accounting for differentially private queries.
//!
//! Three composition strategies share one ledger discipline: simple
//! composition, the advanced composition theorem, and a moments accountant for
//! iterative mechanisms.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod composition;
pub mod config;
pub mod moments;
pub mod tracker;

pub use composition::{advanced_composition, simple_composition};
pub use config::{
    AdvancedTrackerConfig, BudgetTrackerConfig, CompositionStrategy, MomentTrackerConfig,
    SimpleTrackerConfig,
};
pub use moments::{
    compute_log_moment, get_privacy_spent, log_moments, MomentQuery, MomentTarget,
    DEFAULT_MOMENT_ORDER,
};
pub use tracker::{
    AdvancedPrivacyBudgetTracker, MomentPrivacyBudgetTracker, PrivacyAccountant, PrivacyBudgetTracker,
    PrivacyLoss, SimplePrivacyBudgetTracker, DEFAULT_TARGET_DELTA,
};

/// Common imports for privacy accounting.
pub mod prelude {
    pub use crate::{
        advanced_composition, compute_log_moment, get_privacy_spent, log_moments,
        simple_composition, AdvancedPrivacyBudgetTracker, AdvancedTrackerConfig,
        BudgetTrackerConfig, CompositionStrategy, MomentPrivacyBudgetTracker, MomentQuery,
        MomentTarget, MomentTrackerConfig, PrivacyAccountant, PrivacyBudgetTracker, PrivacyLoss,
        SimplePrivacyBudgetTracker, SimpleTrackerConfig,
    };
}
