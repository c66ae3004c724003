//! Core differential privacy primitives for tabular queries.
//!
//! This crate provides the building blocks shared by the accountants and the
//! query engine: the `(epsilon, delta)` budget type, declared column domains,
//! dynamically typed cell values and the Laplace/Gaussian mechanisms.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod budget;
pub mod domain;
pub mod error;
pub mod noise;
pub mod tensor;
pub mod value;

pub use budget::{combine_privacy_losses, PrivacyBudget};
pub use domain::{CategoricalDataDomain, DataDomain, RealDataDomain};
pub use error::{DpError, Result};
pub use noise::{
    add_gaussian_noise, add_laplace_noise, gaussian_mechanism, laplace_mechanism,
    GaussianMechanism, LaplaceMechanism, Mechanism,
};
pub use tensor::{tensor_from_vec, tensor_to_vec, Scalar, Tensor};
pub use value::Value;

/// Common imports for downstream users.
pub mod prelude {
    pub use crate::{
        add_gaussian_noise, add_laplace_noise, combine_privacy_losses, gaussian_mechanism,
        laplace_mechanism, tensor_from_vec, tensor_to_vec, CategoricalDataDomain, DataDomain,
        DpError, GaussianMechanism, LaplaceMechanism, Mechanism, PrivacyBudget, RealDataDomain,
        Result, Scalar, Tensor, Value,
    };
}
