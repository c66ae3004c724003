//! The private query engine.
//!
//! A [`PrivateTable`] binds a dataset, one declared [`DataDomain`] per
//! queryable column and a budget tracker. Every query derives its sensitivity
//! from the column's domain, perturbs the exact statistic, and only then
//! debits the tracker. If the debit is rejected the noisy value is discarded,
//! so a query either fully succeeds or leaves the ledger untouched.
//!
//! Queries take `&mut self`, which gives the check-then-commit sequence
//! exclusive access to the ledger. To share a table between threads, wrap it
//! in a `Mutex`.

use std::collections::BTreeMap;

use dp_table_accounting::{
    BudgetTrackerConfig, CompositionStrategy, PrivacyAccountant, PrivacyBudgetTracker,
};
use dp_table_core::{
    tensor_from_vec, tensor_to_vec, CategoricalDataDomain, DataDomain, DpError,
    GaussianMechanism, LaplaceMechanism, Mechanism, PrivacyBudget, RealDataDomain, Result, Value,
};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use crate::dataset::Dataset;
use crate::stats;

/// Construction options for a [`PrivateTable`].
#[derive(Clone, Copy, Debug, Default)]
pub struct PrivateTableConfig {
    /// Composition strategy of the table's tracker.
    pub strategy: CompositionStrategy,
    /// Seed of the noise source; `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl PrivateTableConfig {
    /// Set the composition strategy.
    pub fn with_strategy(mut self, strategy: CompositionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Fix the noise seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// A dataset that only answers differentially private queries.
#[derive(Debug)]
pub struct PrivateTable {
    dataset: Dataset,
    domains: BTreeMap<String, DataDomain>,
    tracker: PrivacyBudgetTracker,
    rng: ChaCha20Rng,
}

impl PrivateTable {
    /// Bind a dataset with simple composition and an entropy-seeded noise
    /// source.
    pub fn new<I, S>(dataset: Dataset, domains: I, total_privacy_budget: PrivacyBudget) -> Result<Self>
    where
        I: IntoIterator<Item = (S, DataDomain)>,
        S: Into<String>,
    {
        Self::with_config(
            dataset,
            domains,
            total_privacy_budget,
            PrivateTableConfig::default(),
        )
    }

    /// Bind a dataset with explicit options.
    pub fn with_config<I, S>(
        dataset: Dataset,
        domains: I,
        total_privacy_budget: PrivacyBudget,
        config: PrivateTableConfig,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (S, DataDomain)>,
        S: Into<String>,
    {
        let mut bound = BTreeMap::new();
        for (name, domain) in domains {
            let name = name.into();
            if !dataset.has_column(&name) {
                return Err(DpError::invalid(format!(
                    "domain declared for missing column `{name}`"
                )));
            }
            bound.insert(name, domain);
        }

        let tracker = config.strategy.create_tracker(total_privacy_budget)?;
        let rng = match config.seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed),
            None => ChaCha20Rng::from_entropy(),
        };

        tracing::debug!(
            columns = bound.len(),
            rows = dataset.num_rows(),
            strategy = tracker.strategy(),
            "private table constructed"
        );
        Ok(Self {
            dataset,
            domains: bound,
            tracker,
            rng,
        })
    }

    /// Names of the queryable columns.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.domains.keys().map(String::as_str)
    }

    /// Declared domain of a column.
    pub fn domain(&self, column: &str) -> Option<&DataDomain> {
        self.domains.get(column)
    }

    /// The table's budget tracker.
    pub fn tracker(&self) -> &PrivacyBudgetTracker {
        &self.tracker
    }

    /// Budget fixed at construction.
    pub fn total_privacy_budget(&self) -> PrivacyBudget {
        self.tracker.total_privacy_budget()
    }

    /// Budget spent so far.
    pub fn consumed_privacy_budget(&self) -> PrivacyBudget {
        self.tracker.consumed_privacy_budget()
    }

    /// Budget still available.
    pub fn remaining_privacy_budget(&self) -> PrivacyBudget {
        self.tracker.remaining_privacy_budget()
    }

    /// Private mean with sensitivity `width / n`. Uses the Laplace mechanism
    /// for pure budgets and the Gaussian mechanism otherwise.
    pub fn mean(&mut self, column: &str, budget: &PrivacyBudget) -> Result<f64> {
        let (domain, values) = self.real_column(column)?;
        let mechanism = Mechanism::for_budget(mean_sensitivity(&domain, &values, column)?, budget)?;
        self.release(column, "mean", stats::mean(&values), mechanism, budget)
    }

    /// Private mean using the Laplace mechanism; `budget.delta` must be 0.
    pub fn laplace_mean(&mut self, column: &str, budget: &PrivacyBudget) -> Result<f64> {
        let (domain, values) = self.real_column(column)?;
        let sensitivity = mean_sensitivity(&domain, &values, column)?;
        let mechanism = Mechanism::Laplace(LaplaceMechanism::new(sensitivity, budget)?);
        self.release(column, "laplace_mean", stats::mean(&values), mechanism, budget)
    }

    /// Private mean using the Gaussian mechanism; `budget.delta` must be
    /// positive.
    pub fn gaussian_mean(&mut self, column: &str, budget: &PrivacyBudget) -> Result<f64> {
        let (domain, values) = self.real_column(column)?;
        let sensitivity = mean_sensitivity(&domain, &values, column)?;
        let mechanism = Mechanism::Gaussian(GaussianMechanism::new(sensitivity, budget)?);
        self.release(column, "gaussian_mean", stats::mean(&values), mechanism, budget)
    }

    /// Private population standard deviation with sensitivity `width`.
    pub fn std(&mut self, column: &str, budget: &PrivacyBudget) -> Result<f64> {
        self.range_statistic(column, "std", budget, stats::std_dev)
    }

    /// Private population variance with sensitivity `width`.
    pub fn var(&mut self, column: &str, budget: &PrivacyBudget) -> Result<f64> {
        self.range_statistic(column, "var", budget, stats::variance)
    }

    /// Private maximum with sensitivity `width`.
    ///
    /// A single record can move the maximum across the whole domain, so this
    /// is the noisiest statistic the table offers.
    pub fn max(&mut self, column: &str, budget: &PrivacyBudget) -> Result<f64> {
        self.range_statistic(column, "max", budget, stats::max)
    }

    /// Private minimum with sensitivity `width`.
    pub fn min(&mut self, column: &str, budget: &PrivacyBudget) -> Result<f64> {
        self.range_statistic(column, "min", budget, stats::min)
    }

    /// Private median with sensitivity `width`.
    pub fn median(&mut self, column: &str, budget: &PrivacyBudget) -> Result<f64> {
        self.range_statistic(column, "median", budget, stats::median)
    }

    /// Category with the largest noisy count. Ties go to the category declared
    /// first.
    pub fn mode(&mut self, column: &str, budget: &PrivacyBudget) -> Result<Value> {
        let (domain, indices) = self.categorical_column(column)?;
        if domain.cardinality() == 0 {
            return Err(DpError::domain_mismatch(column, "categorical domain has no categories"));
        }
        let counts = stats::category_counts(&indices, domain.cardinality());
        let noisy = self.release_counts(column, "mode", counts, budget)?;

        let mut best: Option<(usize, f64)> = None;
        for (i, &count) in noisy.iter().enumerate() {
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((i, count));
            }
        }
        best.map(|(i, _)| domain.categories()[i].clone())
            .ok_or_else(|| DpError::domain_mismatch(column, "categorical domain has no categories"))
    }

    /// Noisy count for every declared category, in declaration order.
    pub fn cat_hist(&mut self, column: &str, budget: &PrivacyBudget) -> Result<Vec<f64>> {
        let (domain, indices) = self.categorical_column(column)?;
        let counts = stats::category_counts(&indices, domain.cardinality());
        self.release_counts(column, "cat_hist", counts, budget)
    }

    /// Noisy histogram over `bin_edges` (strictly increasing, at least two).
    /// The last bin includes its right edge; values outside the edges are not
    /// counted.
    pub fn num_hist(
        &mut self,
        column: &str,
        bin_edges: &[f64],
        budget: &PrivacyBudget,
    ) -> Result<Vec<f64>> {
        let (_, values) = self.real_column(column)?;
        if bin_edges.len() < 2 {
            return Err(DpError::invalid("histogram needs at least two bin edges"));
        }
        if bin_edges.iter().any(|e| !e.is_finite()) || bin_edges.windows(2).any(|w| w[0] >= w[1]) {
            return Err(DpError::invalid(
                "histogram bin edges must be finite and strictly increasing",
            ));
        }
        let counts = stats::histogram(&values, bin_edges);
        self.release_counts(column, "num_hist", counts, budget)
    }

    fn domain_for(&self, column: &str) -> Result<&DataDomain> {
        self.domains
            .get(column)
            .ok_or_else(|| DpError::unknown_column(column))
    }

    fn raw_column(&self, column: &str) -> Result<&[Value]> {
        self.dataset
            .column(column)
            .ok_or_else(|| DpError::unknown_column(column))
    }

    /// Numeric values clipped into the column's interval.
    fn real_column(&self, column: &str) -> Result<(RealDataDomain, Vec<f64>)> {
        let domain = match self.domain_for(column)? {
            DataDomain::Real(domain) => *domain,
            DataDomain::Categorical(_) => {
                return Err(DpError::domain_mismatch(
                    column,
                    "numeric statistic requested on a categorical column",
                ))
            }
        };

        let mut clipped = 0usize;
        let mut values = Vec::with_capacity(self.dataset.num_rows());
        for value in self.raw_column(column)? {
            let x = value.as_f64().ok_or_else(|| {
                DpError::domain_mismatch(column, format!("non-numeric value {value}"))
            })?;
            if x.is_nan() {
                return Err(DpError::domain_mismatch(column, "NaN value"));
            }
            if !domain.contains(x) {
                clipped += 1;
            }
            values.push(domain.clip(x));
        }
        if clipped > 0 {
            tracing::warn!(column, clipped, "values clipped to declared domain");
        }
        Ok((domain, values))
    }

    /// Category index of every row.
    fn categorical_column(&self, column: &str) -> Result<(CategoricalDataDomain, Vec<usize>)> {
        let domain = match self.domain_for(column)? {
            DataDomain::Categorical(domain) => domain,
            DataDomain::Real(_) => {
                return Err(DpError::domain_mismatch(
                    column,
                    "categorical statistic requested on a numeric column",
                ))
            }
        };

        let indices = self
            .raw_column(column)?
            .iter()
            .map(|value| {
                domain.index_of(value).ok_or_else(|| {
                    DpError::domain_mismatch(column, format!("value {value} is not a declared category"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok((domain.clone(), indices))
    }

    fn range_statistic(
        &mut self,
        column: &str,
        statistic: &'static str,
        budget: &PrivacyBudget,
        compute: fn(&[f64]) -> f64,
    ) -> Result<f64> {
        let (domain, values) = self.real_column(column)?;
        if values.is_empty() {
            return Err(DpError::invalid(format!("column `{column}` is empty")));
        }
        let mechanism = Mechanism::for_budget(domain.width(), budget)?;
        self.release(column, statistic, compute(&values), mechanism, budget)
    }

    fn release(
        &mut self,
        column: &str,
        statistic: &'static str,
        value: f64,
        mechanism: Mechanism,
        budget: &PrivacyBudget,
    ) -> Result<f64> {
        let noisy = mechanism.release(value, &mut self.rng)?;
        self.tracker.charge_query(budget)?;
        tracing::debug!(
            column,
            statistic,
            epsilon = budget.epsilon(),
            delta = budget.delta(),
            "private query answered"
        );
        Ok(noisy)
    }

    /// One noisy count per bin with sensitivity 1, charged once per call.
    fn release_counts(
        &mut self,
        column: &str,
        statistic: &'static str,
        counts: Vec<f64>,
        budget: &PrivacyBudget,
    ) -> Result<Vec<f64>> {
        let mechanism = Mechanism::for_budget(1.0, budget)?;
        let mut noisy = tensor_from_vec(counts);
        mechanism.apply(&mut noisy, &mut self.rng)?;
        self.tracker.charge_query(budget)?;
        tracing::debug!(
            column,
            statistic,
            bins = noisy.len(),
            epsilon = budget.epsilon(),
            delta = budget.delta(),
            "private query answered"
        );
        Ok(tensor_to_vec(&noisy))
    }
}

fn mean_sensitivity(domain: &RealDataDomain, values: &[f64], column: &str) -> Result<f64> {
    if values.is_empty() {
        return Err(DpError::invalid(format!("column `{column}` is empty")));
    }
    Ok(domain.width() / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_table(strategy: CompositionStrategy) -> PrivateTable {
        let dataset = Dataset::new()
            .with_column("Name", ["Tom", "Jack", "Steve", "Jack"])
            .and_then(|d| d.with_column("Age", [28, 34, 29, 42]))
            .unwrap();
        let domains = [
            (
                "Name",
                DataDomain::from(CategoricalDataDomain::new([
                    "Tom", "Jack", "Steve", "Eve", "Adam", "Lucifer",
                ])),
            ),
            ("Age", DataDomain::from(RealDataDomain::new(0.0, 130.0).unwrap())),
        ];
        PrivateTable::with_config(
            dataset,
            domains,
            PrivacyBudget::new(100_000.0, 1.0).unwrap(),
            PrivateTableConfig::default().with_strategy(strategy).with_seed(17),
        )
        .unwrap()
    }

    #[test]
    fn test_column_names() {
        let t = example_table(CompositionStrategy::Simple);
        assert_eq!(t.columns().collect::<Vec<_>>(), vec!["Age", "Name"]);
        assert_eq!(t.domain("Age").map(DataDomain::kind), Some("real"));
    }

    #[test]
    fn test_domain_for_missing_column_is_rejected() {
        let dataset = Dataset::new().with_column("Age", [1, 2]).unwrap();
        let domains = [("Height", DataDomain::from(RealDataDomain::new(0.0, 3.0).unwrap()))];
        assert!(PrivateTable::new(dataset, domains, PrivacyBudget::pure(1.0).unwrap()).is_err());
    }

    #[test]
    fn test_same_seed_same_answers() {
        let budget = PrivacyBudget::pure(1.0).unwrap();
        let mut a = example_table(CompositionStrategy::Simple);
        let mut b = example_table(CompositionStrategy::Simple);
        assert_eq!(a.mean("Age", &budget).unwrap(), b.mean("Age", &budget).unwrap());
    }

    #[test]
    fn test_failed_mechanism_does_not_charge() {
        let mut t = example_table(CompositionStrategy::Simple);
        let approx = PrivacyBudget::new(1.0, 0.1).unwrap();
        assert!(matches!(
            t.laplace_mean("Age", &approx),
            Err(DpError::InvalidBudget { .. })
        ));
        let pure = PrivacyBudget::pure(1.0).unwrap();
        assert!(matches!(
            t.gaussian_mean("Age", &pure),
            Err(DpError::InvalidBudget { .. })
        ));
        assert_eq!(t.consumed_privacy_budget(), PrivacyBudget::zero());
    }

    #[test]
    fn test_histogram_edges_validated() {
        let mut t = example_table(CompositionStrategy::Simple);
        let budget = PrivacyBudget::pure(1.0).unwrap();
        assert!(t.num_hist("Age", &[10.0], &budget).is_err());
        assert!(t.num_hist("Age", &[10.0, 5.0], &budget).is_err());
        assert!(t.num_hist("Age", &[0.0, f64::NAN], &budget).is_err());
        assert_eq!(t.consumed_privacy_budget(), PrivacyBudget::zero());
    }

    #[test]
    fn test_unknown_column_reported_before_bad_edges() {
        let mut t = example_table(CompositionStrategy::Simple);
        let budget = PrivacyBudget::pure(1.0).unwrap();
        assert!(matches!(
            t.num_hist("Height", &[10.0], &budget),
            Err(DpError::UnknownColumn { .. })
        ));
        assert_eq!(t.consumed_privacy_budget(), PrivacyBudget::zero());
    }

    #[test]
    fn test_mode_over_empty_domain_does_not_charge() {
        let dataset = Dataset::new()
            .with_column("Color", Vec::<Value>::new())
            .unwrap();
        let domains = [(
            "Color",
            DataDomain::from(CategoricalDataDomain::new(Vec::<Value>::new())),
        )];
        let mut t = PrivateTable::new(dataset, domains, PrivacyBudget::pure(10.0).unwrap()).unwrap();
        assert!(matches!(
            t.mode("Color", &PrivacyBudget::pure(1.0).unwrap()),
            Err(DpError::DomainMismatch { .. })
        ));
        assert_eq!(t.consumed_privacy_budget(), PrivacyBudget::zero());
    }

    #[test]
    fn test_advanced_overflow_exhausts_without_charge() {
        let mut t = example_table(CompositionStrategy::Advanced { target_delta: 1e-5 });
        let huge = PrivacyBudget::pure(10_000.0).unwrap();
        assert!(matches!(
            t.mean("Age", &huge),
            Err(DpError::BudgetExhausted { .. })
        ));
        assert_eq!(t.consumed_privacy_budget(), PrivacyBudget::zero());
    }

    #[test]
    fn test_advanced_strategy_charges_composed_cost() {
        let mut t = example_table(CompositionStrategy::Advanced { target_delta: 1e-5 });
        let budget = PrivacyBudget::pure(1.0).unwrap();
        t.mean("Age", &budget).unwrap();
        let expected = dp_table_accounting::advanced_composition(&budget, 1, 1e-5).unwrap();
        assert_eq!(t.consumed_privacy_budget(), expected);
    }
}
