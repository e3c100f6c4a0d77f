use serde::Serialize;

/// Summary statistics over all stored calculated values of one experiment.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryStatistics {
    pub median: f64,
    pub average: f64,
    /// Sample standard deviation (n - 1 denominator); `None` for fewer than
    /// two values.
    pub std_dev: Option<f64>,
}

impl SummaryStatistics {
    /// Compute statistics over a non-empty slice of values. Returns `None`
    /// for an empty slice; callers treat that as "no data yet".
    pub fn compute(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let average = values.iter().sum::<f64>() / values.len() as f64;

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        let std_dev = if values.len() > 1 {
            let variance = values
                .iter()
                .map(|v| (v - average).powi(2))
                .sum::<f64>()
                / (values.len() - 1) as f64;
            Some(variance.sqrt())
        } else {
            None
        };

        Some(Self {
            median,
            average,
            std_dev,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_has_no_statistics() {
        assert!(SummaryStatistics::compute(&[]).is_none());
    }

    #[test]
    fn odd_count_median_is_middle_value() {
        let stats = SummaryStatistics::compute(&[3.0, 1.0, 2.0]).unwrap();
        assert_eq!(stats.median, 2.0);
        assert_eq!(stats.average, 2.0);
    }

    #[test]
    fn even_count_median_averages_middle_pair() {
        let stats = SummaryStatistics::compute(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(stats.median, 2.5);
    }

    #[test]
    fn sample_std_dev_uses_n_minus_one() {
        let stats = SummaryStatistics::compute(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        // Known dataset: population std 2.0, sample std ~2.138
        let std_dev = stats.std_dev.unwrap();
        assert!((std_dev - 2.13809).abs() < 1e-4);
    }

    #[test]
    fn nan_values_do_not_panic() {
        // NaN sorts after every number under total order, so the median of
        // the remaining values is still well defined.
        let stats = SummaryStatistics::compute(&[1.0, f64::NAN, 2.0]).unwrap();
        assert_eq!(stats.median, 2.0);
        assert!(stats.average.is_nan());
    }

    #[test]
    fn single_value_has_no_std_dev() {
        let stats = SummaryStatistics::compute(&[1.5]).unwrap();
        assert_eq!(stats.median, 1.5);
        assert!(stats.std_dev.is_none());
    }
}
