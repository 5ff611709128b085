//! Histogram binning
//!
//! Bin edges come from a `BinSpec`; counting follows the usual half-open
//! convention with the last bin closed on the right.

use anyhow::{bail, Result};

/// Default number of equal-width bins
pub const DEFAULT_BIN_COUNT: usize = 12;

/// Upper bound on the number of bins any spec may produce
pub const MAX_BINS: usize = 100_000;

/// How histogram bin edges are chosen
#[derive(Debug, Clone, PartialEq)]
pub enum BinSpec {
    /// Equal-width bins spanning the observed data range
    Count(usize),
    /// Explicit ascending edges
    Edges(Vec<f64>),
    /// `start, start + step, ...` strictly below `stop`
    Range { start: f64, stop: f64, step: f64 },
}

impl Default for BinSpec {
    fn default() -> Self {
        BinSpec::Count(DEFAULT_BIN_COUNT)
    }
}

impl BinSpec {
    pub fn validate(&self) -> Result<()> {
        match self {
            BinSpec::Count(0) => bail!("Histogram bin count must be positive"),
            BinSpec::Count(n) if *n > MAX_BINS => {
                bail!("Histogram bin count {} exceeds the limit of {}", n, MAX_BINS)
            }
            BinSpec::Count(_) => {}
            BinSpec::Edges(edges) => {
                if edges.len() < 2 {
                    bail!("Histogram needs at least 2 bin edges, got {}", edges.len());
                }
                if edges.len() > MAX_BINS + 1 {
                    bail!("Histogram has {} edges, the limit is {}", edges.len(), MAX_BINS + 1);
                }
                if edges.iter().any(|e| !e.is_finite()) {
                    bail!("Histogram bin edges must be finite");
                }
                if edges.windows(2).any(|w| w[0] >= w[1]) {
                    bail!("Histogram bin edges must be strictly ascending");
                }
            }
            BinSpec::Range { start, stop, step } => {
                if !(start.is_finite() && stop.is_finite() && step.is_finite()) {
                    bail!("Histogram range must be finite");
                }
                if *step <= 0.0 {
                    bail!("Histogram range step must be positive, got {}", step);
                }
                let edges = range_len(*start, *stop, *step);
                if edges < 2.0 {
                    bail!("Histogram range [{}, {}) yields fewer than 2 edges", start, stop);
                }
                if !edges.is_finite() || edges > (MAX_BINS + 1) as f64 {
                    bail!(
                        "Histogram range [{}, {}) step {} yields more than {} bins",
                        start,
                        stop,
                        step,
                        MAX_BINS
                    );
                }
            }
        }
        Ok(())
    }

    /// Resolve to concrete edges for the given values
    pub fn edges(&self, values: &[f64]) -> Vec<f64> {
        match self {
            BinSpec::Count(n) => equal_width_edges(values, (*n).clamp(1, MAX_BINS)),
            BinSpec::Edges(edges) => edges.clone(),
            BinSpec::Range { start, stop, step } => arange(*start, *stop, *step),
        }
    }
}

/// `n` equal-width bins over the range of `values`
pub fn equal_width_edges(values: &[f64], n: usize) -> Vec<f64> {
    let finite = values.iter().copied().filter(|v| v.is_finite());
    let (mut lo, mut hi) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });

    if lo > hi {
        lo = 0.0;
        hi = 1.0;
    } else if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }

    let width = (hi - lo) / n as f64;
    (0..=n)
        .map(|i| if i == n { hi } else { lo + i as f64 * width })
        .collect()
}

/// Number of values `arange` would produce, before any cap
fn range_len(start: f64, stop: f64, step: f64) -> f64 {
    if step <= 0.0 || stop <= start {
        return 0.0;
    }
    ((stop - start) / step).ceil()
}

/// Evenly spaced values in `[start, stop)`, at most `MAX_BINS + 1` of them
pub fn arange(start: f64, stop: f64, step: f64) -> Vec<f64> {
    let len = range_len(start, stop, step);
    if len.is_nan() || len < 1.0 {
        return Vec::new();
    }
    let n = len.min((MAX_BINS + 1) as f64) as usize;
    (0..n).map(|i| start + i as f64 * step).collect()
}

/// Count values per bin. Returns `edges.len() - 1` counts.
pub fn bin_counts(values: &[f64], edges: &[f64]) -> Vec<usize> {
    if edges.len() < 2 {
        return Vec::new();
    }
    let bins = edges.len() - 1;
    let first = edges[0];
    let last = edges[bins];
    let mut counts = vec![0usize; bins];

    for &value in values {
        if !(first..=last).contains(&value) {
            continue;
        }
        // Index of the last edge <= value, clamped so `last` lands in the final bin
        let idx = edges.partition_point(|&e| e <= value).saturating_sub(1);
        counts[idx.min(bins - 1)] += 1;
    }

    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arange_edges() {
        let edges = arange(0.0, 0.401, 0.005);
        assert_eq!(edges.len(), 81);
        assert_eq!(edges[0], 0.0);
        assert!((edges[80] - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_equal_width_default() {
        let values = [0.0, 0.6, 1.2];
        let edges = equal_width_edges(&values, DEFAULT_BIN_COUNT);
        assert_eq!(edges.len(), 13);
        assert_eq!(edges[0], 0.0);
        assert_eq!(edges[12], 1.2);
        assert!((edges[1] - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_equal_width_degenerate() {
        assert_eq!(equal_width_edges(&[2.0, 2.0], 2), vec![1.5, 2.0, 2.5]);
        assert_eq!(equal_width_edges(&[], 2), vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_last_bin_closed() {
        let edges = [0.0, 1.0, 2.0];
        assert_eq!(bin_counts(&[0.0, 0.5, 1.0, 2.0], &edges), vec![2, 2]);
    }

    #[test]
    fn test_out_of_range_dropped() {
        let edges = [0.0, 1.0, 2.0];
        assert_eq!(bin_counts(&[-0.1, 2.1, 1.5], &edges), vec![0, 1]);
    }

    #[test]
    fn test_validate() {
        assert!(BinSpec::Count(0).validate().is_err());
        assert!(BinSpec::Count(12).validate().is_ok());
        assert!(BinSpec::Edges(vec![0.0]).validate().is_err());
        assert!(BinSpec::Edges(vec![0.0, 0.2, 0.1]).validate().is_err());
        assert!(BinSpec::Edges(vec![0.0, 0.1, 0.2]).validate().is_ok());
        assert!(BinSpec::Range { start: 0.0, stop: 0.401, step: 0.0 }.validate().is_err());
        assert!(BinSpec::Range { start: 0.0, stop: 0.401, step: 0.005 }.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_oversized_bins() {
        let huge = BinSpec::Range { start: 0.0, stop: 1e30, step: 1e-30 };
        assert!(huge.validate().is_err());
        assert!(BinSpec::Count(usize::MAX).validate().is_err());
        assert!(BinSpec::Count(MAX_BINS + 1).validate().is_err());
        assert!(BinSpec::Count(MAX_BINS).validate().is_ok());
        let edges: Vec<f64> = (0..=MAX_BINS + 1).map(|i| i as f64).collect();
        assert!(BinSpec::Edges(edges).validate().is_err());
    }

    #[test]
    fn test_edges_are_capped() {
        assert_eq!(BinSpec::Count(usize::MAX).edges(&[0.0, 1.0]).len(), MAX_BINS + 1);
        assert_eq!(arange(0.0, 1e30, 1e-30).len(), MAX_BINS + 1);
        assert!(arange(0.0, f64::INFINITY, 1.0).len() <= MAX_BINS + 1);
    }
}
