//! # nt-inference
//!
//! Statistical inference for the county-level nostalgia/turnout study:
//! panel construction from two election cycles' ad, turnout and
//! demographic inputs, per-state descriptives, rank-correlation analyses
//! with bootstrap and permutation checks, and the OLS robustness models.
//!
//! Every resampling routine takes an explicit seed and owns its generator,
//! so results are reproducible regardless of call order.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Composite correlation analyses (overall, per-state, subgroup).
pub mod analysis;
/// Spearman rank correlation and Fisher r-to-z comparison.
pub mod correlation;
/// Panel construction with state-mean imputation.
pub mod dataset;
/// Per-state descriptive statistics.
pub mod describe;
/// OLS with HC3 errors, VIF diagnostic and model tabulation.
pub mod ols;
/// Seeded bootstrap and permutation resampling.
pub mod resampling;

pub use analysis::{
    analyze_by_state, analyze_overall, analyze_subgroup, compare_states, OverallAnalysis,
    StateCorrelation, SubgroupAnalysis, SubgroupResult, DEFAULT_MIN_STATE_N,
};
pub use correlation::{fisher_z_test, spearman, FisherZTest};
pub use dataset::build_panel;
pub use describe::{describe_by_state, MetricSummary, DESCRIBED_METRICS};
pub use ols::{
    compute_vif, extract_result, fit_ols, run_full_robustness, tabulate, ModelComparison,
    ModelComparisonRow, RegressionResult, RobustnessReport, ROBUSTNESS_CONTROLS,
};
pub use resampling::{
    bootstrap_ci, permutation_test, BootstrapCi, PermutationTest, DEFAULT_ITERATIONS,
    DEFAULT_SEED,
};
