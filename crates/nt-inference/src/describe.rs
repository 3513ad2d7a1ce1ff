//! Per-state descriptive statistics over the built panel.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use nt_core::types::Panel;

/// The six panel metrics summarised per state.
pub const DESCRIBED_METRICS: [&str; 6] = [
    "nostalgia_year1",
    "nostalgia_year2",
    "delta_nostalgia",
    "turnout_year1",
    "turnout_year2",
    "delta_turnout",
];

/// Mean and sample standard deviation of one metric, rounded to 2 dp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    /// Arithmetic mean
    pub mean: f64,
    /// Sample standard deviation (ddof = 1; NaN for a single observation)
    pub std: f64,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn summarize(values: &[f64]) -> MetricSummary {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std = if values.len() < 2 {
        f64::NAN
    } else {
        let ss: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
        (ss / (n - 1.0)).sqrt()
    };
    MetricSummary { mean: round2(mean), std: round2(std) }
}

/// Summarise the six panel metrics per state.
///
/// Pure aggregation: `state -> metric -> {mean, std}`, all values rounded
/// to 2 decimal places.
pub fn describe_by_state(panel: &Panel) -> BTreeMap<String, BTreeMap<String, MetricSummary>> {
    let mut out = BTreeMap::new();
    for state in panel.states() {
        let sub = panel.filter_state(&state);
        let mut metrics = BTreeMap::new();
        for metric in DESCRIBED_METRICS {
            // Metric names come from the fixed list above, so lookup cannot fail.
            let values = sub.column(metric).expect("described metric is a panel column");
            metrics.insert(metric.to_string(), summarize(&values));
        }
        out.insert(state, metrics);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use nt_core::types::PanelRow;

    fn row(state: &str, delta_turnout: f64) -> PanelRow {
        PanelRow {
            county_fips: 1,
            state: state.to_string(),
            county_name: "c".to_string(),
            nostalgia_year1: 10.0,
            nostalgia_year2: 14.0,
            turnout_year1: 60.0,
            turnout_year2: 60.0 + delta_turnout,
            delta_nostalgia: 4.0,
            delta_turnout,
            pct_white: 80.0,
            pct_college: 30.0,
            median_income: 50_000.0,
        }
    }

    #[test]
    fn test_mean_and_sample_std() {
        let panel = Panel::new(vec![row("A", 1.0), row("A", 3.0)]);
        let stats = describe_by_state(&panel);
        let dt = stats["A"]["delta_turnout"];
        assert!((dt.mean - 2.0).abs() < 1e-12);
        // sample std of [1, 3] is sqrt(2) = 1.4142... -> 1.41
        assert!((dt.std - 1.41).abs() < 1e-12);
    }

    #[test]
    fn test_rounding_to_two_decimals() {
        let panel = Panel::new(vec![row("A", 1.004), row("A", 1.004)]);
        let stats = describe_by_state(&panel);
        assert!((stats["A"]["delta_turnout"].mean - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_county_state_has_nan_std() {
        let panel = Panel::new(vec![row("A", 2.0)]);
        let stats = describe_by_state(&panel);
        let dt = stats["A"]["delta_turnout"];
        assert!((dt.mean - 2.0).abs() < 1e-12);
        assert!(dt.std.is_nan());
    }

    #[test]
    fn test_states_keyed_and_all_metrics_present() {
        let panel = Panel::new(vec![row("B", 1.0), row("A", 2.0)]);
        let stats = describe_by_state(&panel);
        assert_eq!(stats.keys().cloned().collect::<Vec<_>>(), vec!["A", "B"]);
        for metric in DESCRIBED_METRICS {
            assert!(stats["A"].contains_key(metric));
        }
    }
}
