//! Composite correlation analyses over the county panel.
//!
//! These compose [`crate::correlation`] and [`crate::resampling`] over the
//! `delta_nostalgia` / `delta_turnout` columns: the pooled analysis, the
//! per-state breakdown with a minimum-sample skip policy, cross-state
//! comparison, and covariate subgroup splits.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use nt_core::types::Panel;
use nt_core::{Error, Result};

use crate::correlation::{fisher_z_test, spearman, FisherZTest};
use crate::resampling::{bootstrap_ci, permutation_test};

/// Treatment column of every correlation analysis.
const TREATMENT: &str = "delta_nostalgia";
/// Outcome column of every correlation analysis.
const OUTCOME: &str = "delta_turnout";

/// Minimum state sample size for the per-state breakdown.
pub const DEFAULT_MIN_STATE_N: usize = 10;

/// Pooled correlation analysis with both resampling checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverallAnalysis {
    /// Spearman rho of delta-nostalgia vs delta-turnout
    pub rho: f64,
    /// Asymptotic two-sided p-value
    pub p_value: f64,
    /// Bootstrap 2.5th percentile
    pub ci_lower: f64,
    /// Bootstrap 97.5th percentile
    pub ci_upper: f64,
    /// Permutation two-sided p-value
    pub p_permutation: f64,
    /// Raw bootstrap distribution
    pub bootstrap_dist: Vec<f64>,
    /// Raw permutation distribution
    pub permutation_dist: Vec<f64>,
}

/// Correlation summary for one state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateCorrelation {
    /// Counties in the state sub-panel
    pub n: usize,
    /// Spearman rho
    pub rho: f64,
    /// Asymptotic two-sided p-value
    pub p_value: f64,
    /// Bootstrap 2.5th percentile
    pub ci_lower: f64,
    /// Bootstrap 97.5th percentile
    pub ci_upper: f64,
}

/// Correlation summary for one covariate subgroup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubgroupResult {
    /// Counties in the subgroup
    pub n: usize,
    /// Spearman rho
    pub rho: f64,
    /// Asymptotic two-sided p-value
    pub p_value: f64,
    /// Bootstrap 2.5th percentile
    pub ci_lower: f64,
    /// Bootstrap 97.5th percentile
    pub ci_upper: f64,
    /// Raw bootstrap distribution
    pub bootstrap_dist: Vec<f64>,
}

/// Subgroup split analysis: above-threshold vs at-or-below-threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubgroupAnalysis {
    /// Counties with covariate > threshold
    pub high_group: SubgroupResult,
    /// Counties with covariate <= threshold
    pub low_group: SubgroupResult,
    /// Fisher-z comparison of the two groups' correlations
    pub comparison: FisherZTest,
}

fn deltas(panel: &Panel) -> Result<(Vec<f64>, Vec<f64>)> {
    Ok((panel.column(TREATMENT)?, panel.column(OUTCOME)?))
}

/// Pooled analysis: Spearman rho with asymptotic p, bootstrap CI and
/// permutation p over the whole panel.
pub fn analyze_overall(panel: &Panel, iterations: usize, seed: u64) -> Result<OverallAnalysis> {
    let (x, y) = deltas(panel)?;
    let (rho, p_value) = spearman(&x, &y)?;
    let boot = bootstrap_ci(&x, &y, iterations, seed)?;
    let perm = permutation_test(&x, &y, iterations, seed)?;

    Ok(OverallAnalysis {
        rho,
        p_value,
        ci_lower: boot.ci_lower,
        ci_upper: boot.ci_upper,
        p_permutation: perm.p_value,
        bootstrap_dist: boot.distribution,
        permutation_dist: perm.distribution,
    })
}

/// Per-state correlation breakdown.
///
/// States with fewer than `min_n` counties are skipped (logged, not an
/// error); requested states absent from the panel simply have n = 0 and
/// are skipped the same way.
pub fn analyze_by_state(
    panel: &Panel,
    states: &[&str],
    min_n: usize,
    iterations: usize,
    seed: u64,
) -> Result<BTreeMap<String, StateCorrelation>> {
    let mut results = BTreeMap::new();
    for &state in states {
        let sub = panel.filter_state(state);
        if sub.len() < min_n {
            log::debug!("skipping state {state}: n={} below minimum {min_n}", sub.len());
            continue;
        }
        let (x, y) = deltas(&sub)?;
        let (rho, p_value) = spearman(&x, &y)?;
        let boot = bootstrap_ci(&x, &y, iterations, seed)?;
        results.insert(
            state.to_string(),
            StateCorrelation {
                n: sub.len(),
                rho,
                p_value,
                ci_lower: boot.ci_lower,
                ci_upper: boot.ci_upper,
            },
        );
    }
    Ok(results)
}

/// Fisher-z comparison of a reference state's correlation against others.
///
/// Keys are `"{reference}_vs_{state}"`. Comparison states missing from
/// `state_results` are skipped; a missing reference is an error.
pub fn compare_states(
    state_results: &BTreeMap<String, StateCorrelation>,
    reference: &str,
    others: &[&str],
) -> Result<BTreeMap<String, FisherZTest>> {
    let reference_result = state_results.get(reference).ok_or_else(|| {
        Error::Validation(format!("reference state {reference} not in state results"))
    })?;

    let mut comparisons = BTreeMap::new();
    for &state in others {
        if let Some(other) = state_results.get(state) {
            let test =
                fisher_z_test(reference_result.rho, reference_result.n, other.rho, other.n)?;
            comparisons.insert(format!("{reference}_vs_{state}"), test);
        }
    }
    Ok(comparisons)
}

fn analyze_group(sub: &Panel, iterations: usize, seed: u64) -> Result<SubgroupResult> {
    let (x, y) = deltas(sub)?;
    let (rho, p_value) = spearman(&x, &y)?;
    let boot = bootstrap_ci(&x, &y, iterations, seed)?;
    Ok(SubgroupResult {
        n: sub.len(),
        rho,
        p_value,
        ci_lower: boot.ci_lower,
        ci_upper: boot.ci_upper,
        bootstrap_dist: boot.distribution,
    })
}

/// Split the panel on a demographic covariate and compare the two groups.
///
/// The high group is `covariate > threshold`, the low group the rest; each
/// gets the full correlation + bootstrap treatment, then the correlations
/// are Fisher-z compared. Unknown covariate names are
/// [`Error::MissingColumn`].
pub fn analyze_subgroup(
    panel: &Panel,
    covariate: &str,
    threshold: f64,
    iterations: usize,
    seed: u64,
) -> Result<SubgroupAnalysis> {
    // Resolve the covariate before splitting so unknown names fail fast.
    panel.column(covariate)?;

    let high = panel.filter(|r| r.value(covariate).is_ok_and(|v| v > threshold));
    let low = panel.filter(|r| r.value(covariate).is_ok_and(|v| v <= threshold));

    let high_group = analyze_group(&high, iterations, seed)?;
    let low_group = analyze_group(&low, iterations, seed)?;
    let comparison = fisher_z_test(high_group.rho, high_group.n, low_group.rho, low_group.n)?;

    Ok(SubgroupAnalysis { high_group, low_group, comparison })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nt_core::types::PanelRow;

    /// Panel with a monotone-but-noisy relation between the deltas and a
    /// college share that alternates around 30%.
    fn synthetic_panel(states: &[(&str, usize)]) -> Panel {
        let mut rows = Vec::new();
        let mut fips = 1000;
        for &(state, count) in states {
            for i in 0..count {
                fips += 1;
                let dn = i as f64 - (count as f64) / 2.0;
                let noise = ((i * 11 % 7) as f64 - 3.0) * 0.8;
                rows.push(PanelRow {
                    county_fips: fips,
                    state: state.to_string(),
                    county_name: format!("County {fips}"),
                    nostalgia_year1: 20.0,
                    nostalgia_year2: 20.0 + dn,
                    turnout_year1: 55.0,
                    turnout_year2: 55.0 + 0.5 * dn + noise,
                    delta_nostalgia: dn,
                    delta_turnout: 0.5 * dn + noise,
                    pct_white: 70.0 + (i % 5) as f64,
                    pct_college: if i % 2 == 0 { 40.0 } else { 22.0 },
                    median_income: 45_000.0 + 1000.0 * (i % 9) as f64,
                });
            }
        }
        Panel::new(rows)
    }

    #[test]
    fn test_analyze_overall_fields_consistent() {
        let panel = synthetic_panel(&[("A", 24)]);
        let res = analyze_overall(&panel, 200, 42).unwrap();
        assert!(res.rho > 0.0);
        assert!(res.ci_lower <= res.ci_upper);
        assert_eq!(res.bootstrap_dist.len(), 200);
        assert_eq!(res.permutation_dist.len(), 200);
        let count = res
            .permutation_dist
            .iter()
            .filter(|r| r.abs() >= res.rho.abs())
            .count();
        assert_eq!(res.p_permutation, count as f64 / 200.0);
    }

    #[test]
    fn test_analyze_by_state_skips_small_states() {
        let panel = synthetic_panel(&[("A", 15), ("B", 4)]);
        let results =
            analyze_by_state(&panel, &["A", "B", "Z"], DEFAULT_MIN_STATE_N, 100, 42).unwrap();
        assert!(results.contains_key("A"));
        assert!(!results.contains_key("B"), "below min_n must be skipped");
        assert!(!results.contains_key("Z"), "absent state must be skipped");
        assert_eq!(results["A"].n, 15);
    }

    #[test]
    fn test_compare_states_keys_and_missing_reference() {
        let panel = synthetic_panel(&[("A", 15), ("B", 12)]);
        let results = analyze_by_state(&panel, &["A", "B"], 10, 100, 42).unwrap();

        let comparisons = compare_states(&results, "A", &["B", "Z"]).unwrap();
        assert_eq!(comparisons.len(), 1);
        assert!(comparisons.contains_key("A_vs_B"));

        assert!(matches!(compare_states(&results, "Q", &["B"]), Err(Error::Validation(_))));
    }

    #[test]
    fn test_analyze_subgroup_splits_on_threshold() {
        let panel = synthetic_panel(&[("A", 30)]);
        let res = analyze_subgroup(&panel, "pct_college", 30.0, 150, 42).unwrap();
        assert_eq!(res.high_group.n, 15);
        assert_eq!(res.low_group.n, 15);
        assert_eq!(res.high_group.n + res.low_group.n, panel.len());
        assert!(res.comparison.p_value >= 0.0 && res.comparison.p_value <= 1.0);
    }

    #[test]
    fn test_analyze_subgroup_unknown_covariate() {
        let panel = synthetic_panel(&[("A", 20)]);
        assert!(matches!(
            analyze_subgroup(&panel, "pct_retired", 30.0, 100, 42),
            Err(Error::MissingColumn(_))
        ));
    }
}
