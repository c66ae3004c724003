//! Exact (non-private) statistics over clipped column values.
//!
//! These are never returned to callers directly; the query engine perturbs
//! them before release.

use statrs::statistics::{Data, Median, Statistics};

pub(crate) fn mean(values: &[f64]) -> f64 {
    Statistics::mean(values.iter())
}

pub(crate) fn variance(values: &[f64]) -> f64 {
    Statistics::population_variance(values.iter())
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    Statistics::population_std_dev(values.iter())
}

pub(crate) fn max(values: &[f64]) -> f64 {
    Statistics::max(values.iter())
}

pub(crate) fn min(values: &[f64]) -> f64 {
    Statistics::min(values.iter())
}

pub(crate) fn median(values: &[f64]) -> f64 {
    Data::new(values.to_vec()).median()
}

/// Counts per bin with `numpy.histogram` edges: every bin is half-open except
/// the last, which includes its right edge.
pub(crate) fn histogram(values: &[f64], edges: &[f64]) -> Vec<f64> {
    let num_bins = edges.len().saturating_sub(1);
    let mut counts = vec![0.0; num_bins];
    if num_bins == 0 {
        return counts;
    }
    let last = edges[num_bins];
    for &x in values {
        if x < edges[0] || x > last {
            continue;
        }
        // Index of the first edge strictly greater than x, minus one.
        let bin = edges.partition_point(|&e| e <= x).saturating_sub(1).min(num_bins - 1);
        counts[bin] += 1.0;
    }
    counts
}

/// Counts per category index.
pub(crate) fn category_counts(indices: &[usize], cardinality: usize) -> Vec<f64> {
    let mut counts = vec![0.0; cardinality];
    for &i in indices {
        counts[i] += 1.0;
    }
    counts
}
