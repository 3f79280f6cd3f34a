use crate::series::Series;
use serde::{Deserialize, Serialize};

/// Percentile value pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentileValue {
    pub percentile: f64,
    pub value: f64,
}

/// Summary statistics over one series' values.
///
/// Percentiles use the nearest-rank method: the value at sorted index
/// `ceil(p / 100 * n) - 1`, clamped into `[0, n - 1]`. No interpolation is
/// done, so results are always observed samples and jump discontinuously on
/// small inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub count: usize,
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub percentiles: Vec<PercentileValue>,
}

impl SummaryStatistics {
    /// Compute statistics for `values`, or `None` when there is nothing to summarize
    pub fn from_values(values: &[f64], percentiles: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let sorted = sorted_values(values);
        let count = sorted.len();
        let average = sorted.iter().sum::<f64>() / count as f64;

        let percentiles = percentiles
            .iter()
            .filter_map(|&p| {
                nearest_rank(&sorted, p).map(|value| PercentileValue {
                    percentile: p,
                    value,
                })
            })
            .collect();

        Some(Self {
            count,
            average,
            min: sorted[0],
            max: sorted[count - 1],
            median: median(&sorted)?,
            percentiles,
        })
    }

    /// Statistics over a series' values
    pub fn from_series(series: &Series, percentiles: &[f64]) -> Option<Self> {
        Self::from_values(series.values(), percentiles)
    }

    /// Look up a percentile computed at construction time
    pub fn percentile(&self, p: f64) -> Option<f64> {
        self.percentiles
            .iter()
            .find(|pv| (pv.percentile - p).abs() < 1e-9)
            .map(|pv| pv.value)
    }
}

/// Failure flags observed for one endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureSummary {
    pub failed: usize,
    pub total: usize,
}

impl FailureSummary {
    /// Count truthy flags in a failure series
    pub fn from_series(series: &Series) -> Self {
        Self {
            failed: series.truthy_count(),
            total: series.len(),
        }
    }

    /// Fraction of failed samples, `None` without samples
    pub fn ratio(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.failed as f64 / self.total as f64)
        }
    }

    /// Combine counts from several endpoints
    pub fn merge(self, other: FailureSummary) -> FailureSummary {
        FailureSummary {
            failed: self.failed + other.failed,
            total: self.total + other.total,
        }
    }
}

/// Smallest and largest sample of a gauge, e.g. active VUs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaugeRange {
    pub min: f64,
    pub max: f64,
}

impl GaugeRange {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let min = values.iter().copied().reduce(f64::min)?;
        let max = values.iter().copied().reduce(f64::max)?;
        Some(Self { min, max })
    }
}

/// Copy and sort ascending; NaN sorts last
pub fn sorted_values(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Nearest-rank percentile over an ascending slice
pub fn nearest_rank(sorted: &[f64], p: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }

    // p * n / 100 keeps integral products exact (90 * 10 / 100 == 9)
    let rank = (p * n as f64 / 100.0).ceil();
    let index = if rank >= 1.0 {
        (rank as usize - 1).min(n - 1)
    } else {
        0
    };
    Some(sorted[index])
}

/// Middle element, or the mean of the two middle elements for even lengths
pub fn median(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }

    let mid = n / 2;
    if n % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::MetricKind;
    use chrono::{TimeZone, Utc};

    /// Test the reference five-sample scenario
    #[test]
    fn test_summary_statistics_reference_values() {
        let stats =
            SummaryStatistics::from_values(&[100.0, 200.0, 300.0, 400.0, 500.0], &[90.0, 95.0])
                .unwrap();

        assert_eq!(stats.count, 5);
        assert_eq!(stats.average, 300.0);
        assert_eq!(stats.min, 100.0);
        assert_eq!(stats.max, 500.0);
        assert_eq!(stats.median, 300.0);
        // ceil(0.9 * 5) = 5 -> index 4
        assert_eq!(stats.percentile(90.0), Some(500.0));
        assert_eq!(stats.percentile(95.0), Some(500.0));
        assert_eq!(stats.percentile(50.0), None);
    }

    /// Test that empty input yields the explicit empty marker
    #[test]
    fn test_summary_statistics_empty() {
        assert_eq!(SummaryStatistics::from_values(&[], &[90.0, 95.0]), None);
        assert_eq!(nearest_rank(&[], 50.0), None);
        assert_eq!(median(&[]), None);
    }

    /// Test that input order does not matter
    #[test]
    fn test_summary_statistics_unsorted_input() {
        let stats = SummaryStatistics::from_values(&[4.0, 1.0, 3.0, 2.0], &[]).unwrap();
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
        assert_eq!(stats.median, 2.5);
        assert_eq!(stats.average, 2.5);
    }

    /// Test nearest-rank is discontinuous on small samples, unlike interpolation
    #[test]
    fn test_nearest_rank_small_samples() {
        let sorted = [10.0, 20.0, 30.0, 40.0];
        // ceil(0.25 * 4) = 1 -> index 0, ceil(0.26 * 4) = 2 -> index 1
        assert_eq!(nearest_rank(&sorted, 25.0), Some(10.0));
        assert_eq!(nearest_rank(&sorted, 26.0), Some(20.0));
        assert_eq!(nearest_rank(&sorted, 50.0), Some(20.0));
        assert_eq!(nearest_rank(&sorted, 75.0), Some(30.0));
        assert_eq!(nearest_rank(&sorted, 76.0), Some(40.0));
    }

    /// Test percentile clamping at both ends
    #[test]
    fn test_nearest_rank_clamps() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        assert_eq!(nearest_rank(&sorted, 100.0), Some(10.0));
        assert_eq!(nearest_rank(&sorted, 250.0), Some(10.0));
        assert_eq!(nearest_rank(&sorted, 0.0), Some(1.0));
        assert_eq!(nearest_rank(&sorted, 0.001), Some(1.0));
        assert_eq!(nearest_rank(&sorted, -5.0), Some(1.0));
        assert_eq!(nearest_rank(&sorted, 90.0), Some(9.0));
    }

    /// Test ordering invariants over a range of inputs
    #[test]
    fn test_statistics_bounds_invariants() {
        let inputs: [&[f64]; 5] = [
            &[42.0],
            &[5.0, 5.0, 5.0],
            &[1.0, 1000.0],
            &[3.5, 0.25, 99.0, 12.0, 12.0, 7.75],
            &[0.0, -1.0, 2.0, 1e6, 3.0, 4.0, 5.0],
        ];

        for values in inputs {
            let stats = SummaryStatistics::from_values(values, &[100.0]).unwrap();
            assert!(stats.min <= stats.median && stats.median <= stats.max);
            assert!(stats.min <= stats.average && stats.average <= stats.max);
            assert_eq!(stats.percentile(100.0), Some(stats.max));
        }
    }

    /// Test failure aggregation and ratio
    #[test]
    fn test_failure_summary() {
        let t = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let series = Series::from_samples(
            "process-failure",
            MetricKind::Failure,
            vec![(0.0, t), (1.0, t), (1.0, t), (0.0, t)],
        );

        let summary = FailureSummary::from_series(&series);
        assert_eq!(summary, FailureSummary { failed: 2, total: 4 });
        assert_eq!(summary.ratio(), Some(0.5));
        assert_eq!(FailureSummary::default().ratio(), None);

        let merged = summary.merge(FailureSummary { failed: 1, total: 6 });
        assert_eq!(merged, FailureSummary { failed: 3, total: 10 });
    }

    /// Test gauge range extraction
    #[test]
    fn test_gauge_range() {
        assert_eq!(
            GaugeRange::from_values(&[3.0, 30.0, 0.0, 12.0]),
            Some(GaugeRange { min: 0.0, max: 30.0 })
        );
        assert_eq!(GaugeRange::from_values(&[]), None);
    }
}
