//! Error types for differentially private queries.

use crate::budget::PrivacyBudget;

/// Errors that can occur while answering a private query.
#[derive(Debug, thiserror::Error)]
pub enum DpError {
    /// The requested (or composed) loss does not fit in the remaining budget.
    #[error("privacy budget exhausted: requested {requested}, remaining {remaining}")]
    BudgetExhausted {
        /// Loss that would have been charged.
        requested: PrivacyBudget,
        /// Budget left before the rejected charge.
        remaining: PrivacyBudget,
    },

    /// Budget is malformed or does not suit the chosen mechanism.
    #[error("invalid privacy budget: {msg}")]
    InvalidBudget {
        /// Human-readable error description.
        msg: String,
    },

    /// A query named a column with no declared domain.
    #[error("unknown column `{column}`")]
    UnknownColumn {
        /// The requested column name.
        column: String,
    },

    /// Column data does not agree with its declared domain.
    #[error("domain mismatch in column `{column}`: {msg}")]
    DomainMismatch {
        /// Offending column.
        column: String,
        /// Human-readable error description.
        msg: String,
    },

    /// Invalid parameter provided.
    #[error("invalid parameter: {msg}")]
    InvalidParameters {
        /// Human-readable error description.
        msg: String,
    },

    /// Numerical computation error.
    #[error("numerical error: {msg}")]
    NumericalError {
        /// Human-readable error description.
        msg: String,
    },
}

/// Result type for DP operations.
pub type Result<T> = std::result::Result<T, DpError>;

impl DpError {
    /// Create an invalid parameter error.
    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        Self::InvalidParameters { msg: msg.into() }
    }

    /// Create an invalid budget error.
    pub fn invalid_budget<S: Into<String>>(msg: S) -> Self {
        Self::InvalidBudget { msg: msg.into() }
    }

    /// Create a numerical error.
    pub fn numerical<S: Into<String>>(msg: S) -> Self {
        Self::NumericalError { msg: msg.into() }
    }

    /// Create an unknown column error.
    pub fn unknown_column<S: Into<String>>(column: S) -> Self {
        Self::UnknownColumn {
            column: column.into(),
        }
    }

    /// Create a domain mismatch error.
    pub fn domain_mismatch<C: Into<String>, S: Into<String>>(column: C, msg: S) -> Self {
        Self::DomainMismatch {
            column: column.into(),
            msg: msg.into(),
        }
    }
}
