//! Differentially private statistics over tabular data.
//!
//! This facade re-exports the budget, domain and mechanism primitives of
//! `dp_table_core`, the trackers of `dp_table_accounting`, and provides the
//! [`PrivateTable`] query engine.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod dataset;
mod stats;
pub mod table;

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use dp_table_accounting as accounting;
pub use dp_table_core as primitives;

pub use dp_table_accounting::{
    advanced_composition, compute_log_moment, get_privacy_spent, log_moments,
    simple_composition, AdvancedPrivacyBudgetTracker, AdvancedTrackerConfig,
    BudgetTrackerConfig, CompositionStrategy, MomentPrivacyBudgetTracker, MomentQuery,
    MomentTarget, MomentTrackerConfig, PrivacyAccountant, PrivacyBudgetTracker, PrivacyLoss,
    SimplePrivacyBudgetTracker, SimpleTrackerConfig,
};
pub use dp_table_core::{
    combine_privacy_losses, gaussian_mechanism, laplace_mechanism, CategoricalDataDomain,
    DataDomain, DpError, GaussianMechanism, LaplaceMechanism, Mechanism, PrivacyBudget,
    RealDataDomain, Result, Value,
};
pub use dataset::Dataset;
pub use table::{PrivateTable, PrivateTableConfig};

/// Convenience prelude covering the query engine and its building blocks.
pub mod prelude {
    pub use crate::dataset::Dataset;
    pub use crate::table::{PrivateTable, PrivateTableConfig};
    pub use dp_table_accounting::prelude::*;
    pub use dp_table_core::prelude::*;
}
