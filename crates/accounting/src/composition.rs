//! Closed-form composition bounds.

use dp_table_core::{DpError, PrivacyBudget, Result};

/// Loss of `k` uses of `budget` under simple (linear) composition.
pub fn simple_composition(budget: &PrivacyBudget, k: u64) -> PrivacyBudget {
    budget.scaled(k)
}

/// Loss of `k` uses of `budget` under the advanced composition theorem.
///
/// `eps' = sqrt(2 k ln(1 / target_delta)) * eps + k * eps * (exp(eps) - 1)` and
/// `delta' = k * delta + target_delta`. The bound beats simple composition only
/// for small per-query epsilon and large `k`; for large epsilon it is looser.
pub fn advanced_composition(
    budget: &PrivacyBudget,
    k: u64,
    target_delta: f64,
) -> Result<PrivacyBudget> {
    if !(target_delta > 0.0 && target_delta < 1.0) {
        return Err(DpError::invalid_budget(format!(
            "target delta must be in (0, 1), got {target_delta}"
        )));
    }
    if k == 0 {
        return Err(DpError::invalid("number of compositions must be positive"));
    }

    let k_f = k as f64;
    let eps = budget.epsilon();
    let epsilon = (2.0 * k_f * (1.0 / target_delta).ln()).sqrt() * eps
        + k_f * eps * eps.exp_m1();
    let delta = k_f * budget.delta() + target_delta;

    if !epsilon.is_finite() {
        return Err(DpError::numerical(format!(
            "advanced composition bound overflowed for eps={eps}, k={k}"
        )));
    }
    PrivacyBudget::new(epsilon, delta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_advanced_matches_formula() {
        let requested = PrivacyBudget::new(1.0, 0.0).unwrap();
        let combined = advanced_composition(&requested, 2, 0.5).unwrap();

        let expected_eps = (4.0 * 2.0f64.ln()).sqrt() + 2.0 * (1.0f64.exp() - 1.0);
        assert!((combined.epsilon() - expected_eps).abs() < 1e-12);
        assert!((combined.delta() - 0.5).abs() < 1e-12);

        let naive = simple_composition(&requested, 2);
        assert!(combined.epsilon() > naive.epsilon());
    }

    #[test]
    fn test_advanced_beats_simple_for_many_small_queries() {
        let requested = PrivacyBudget::new(0.01, 0.0).unwrap();
        let k = 10_000;
        let advanced = advanced_composition(&requested, k, 1e-5).unwrap();
        let simple = simple_composition(&requested, k);
        assert!(advanced.epsilon() < simple.epsilon());
    }

    #[test]
    fn test_advanced_rejects_bad_parameters() {
        let requested = PrivacyBudget::pure(1.0).unwrap();
        assert!(matches!(
            advanced_composition(&requested, 1, 0.0),
            Err(DpError::InvalidBudget { .. })
        ));
        assert!(advanced_composition(&requested, 1, 1.5).is_err());
        assert!(matches!(
            advanced_composition(&requested, 0, 0.5),
            Err(DpError::InvalidParameters { .. })
        ));
    }

    #[test]
    fn test_advanced_overflow_is_reported() {
        let requested = PrivacyBudget::pure(10_000.0).unwrap();
        assert!(matches!(
            advanced_composition(&requested, 1, 0.5),
            Err(DpError::NumericalError { .. })
        ));
    }

    proptest! {
        #[test]
        fn advanced_grows_with_k(
            eps in 0.001f64..2.0,
            k in 1u64..500,
            target_delta in 1e-9f64..0.5,
        ) {
            let requested = PrivacyBudget::pure(eps).unwrap();
            let a = advanced_composition(&requested, k, target_delta).unwrap();
            let b = advanced_composition(&requested, k + 1, target_delta).unwrap();
            prop_assert!(a <= b);
        }
    }
}
