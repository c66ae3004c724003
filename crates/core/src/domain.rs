//! Public value domains that bound per-record sensitivity.
//!
//! A domain describes the values a column *may* hold. It is declared up front
//! by the data owner and never derived from the data, since bounds computed
//! from private records would themselves leak information.

use crate::error::{DpError, Result};
use crate::value::Value;

/// A closed numeric interval `[min, max]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RealDataDomain {
    min: f64,
    max: f64,
}

impl RealDataDomain {
    /// Create a domain; bounds must be finite with `min <= max`.
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() {
            return Err(DpError::invalid("domain bounds must be finite"));
        }
        if min > max {
            return Err(DpError::invalid(format!(
                "domain lower bound {min} exceeds upper bound {max}"
            )));
        }
        Ok(Self { min, max })
    }

    /// Lower bound.
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Upper bound.
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Interval width `max - min`.
    ///
    /// This is the largest change a single record can make to a bounded sum,
    /// and to an extremum or median.
    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    /// Whether `x` lies in the closed interval.
    pub fn contains(&self, x: f64) -> bool {
        self.min <= x && x <= self.max
    }

    /// Clamp `x` into the interval.
    pub fn clip(&self, x: f64) -> f64 {
        x.clamp(self.min, self.max)
    }
}

/// A finite, ordered set of category labels.
#[derive(Clone, Debug, PartialEq)]
pub struct CategoricalDataDomain {
    categories: Vec<Value>,
}

impl CategoricalDataDomain {
    /// Create a domain from labels, dropping repeated labels.
    pub fn new<I, V>(categories: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut out: Vec<Value> = Vec::new();
        for category in categories {
            let category = category.into();
            if !out.contains(&category) {
                out.push(category);
            }
        }
        Self { categories: out }
    }

    /// Declared labels in declaration order.
    pub fn categories(&self) -> &[Value] {
        &self.categories
    }

    /// Number of declared labels.
    pub fn cardinality(&self) -> usize {
        self.categories.len()
    }

    /// Position of `value` in the declared order.
    pub fn index_of(&self, value: &Value) -> Option<usize> {
        self.categories.iter().position(|c| c == value)
    }

    /// Type-sensitive membership test.
    pub fn contains(&self, value: &Value) -> bool {
        self.index_of(value).is_some()
    }
}

/// The declared domain of one column.
#[derive(Clone, Debug, PartialEq)]
pub enum DataDomain {
    /// Numeric interval.
    Real(RealDataDomain),
    /// Finite category set.
    Categorical(CategoricalDataDomain),
}

impl DataDomain {
    /// Whether `value` is a legal member of this domain.
    pub fn contains(&self, value: &Value) -> bool {
        match self {
            DataDomain::Real(domain) => value.as_f64().is_some_and(|x| domain.contains(x)),
            DataDomain::Categorical(domain) => domain.contains(value),
        }
    }

    /// Short name of the domain kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            DataDomain::Real(_) => "real",
            DataDomain::Categorical(_) => "categorical",
        }
    }
}

impl From<RealDataDomain> for DataDomain {
    fn from(domain: RealDataDomain) -> Self {
        DataDomain::Real(domain)
    }
}

impl From<CategoricalDataDomain> for DataDomain {
    fn from(domain: CategoricalDataDomain) -> Self {
        DataDomain::Categorical(domain)
    }
}
