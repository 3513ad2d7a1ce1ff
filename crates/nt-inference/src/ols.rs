//! OLS regression of delta-turnout on delta-nostalgia, with optional
//! controls, feature standardization and HC3 robust standard errors, plus
//! the variance-inflation multicollinearity diagnostic.
//!
//! # References
//!
//! - MacKinnon & White (1985), "Some heteroskedasticity-consistent
//!   covariance matrix estimators with improved finite sample properties."
//! - Wooldridge, *Introductory Econometrics*, Ch. 8 (robust inference).

use std::collections::BTreeMap;
use std::fmt;

use nalgebra::{DMatrix, DVector, SVD};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

use nt_core::types::Panel;
use nt_core::{Error, ModelDiagnostics, Result};

/// Treatment variable, always the first (non-intercept) regressor.
const TREATMENT: &str = "delta_nostalgia";
/// Regression target.
const OUTCOME: &str = "delta_turnout";

/// Controls of the predefined robustness specification.
pub const ROBUSTNESS_CONTROLS: [&str; 2] = ["median_income", "pct_college"];

/// Immutable summary of a fitted OLS model.
///
/// Decoupled from the solver: reporting code consumes this through
/// [`ModelDiagnostics`], never through a fitting-library model type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionResult {
    /// Term names, intercept first
    pub terms: Vec<String>,
    /// Coefficient estimates, aligned with `terms`
    pub coefficients: Vec<f64>,
    /// Standard errors (HC3 when `robust`, else classical)
    pub std_errors: Vec<f64>,
    /// t-statistics (coefficient / SE)
    pub t_stats: Vec<f64>,
    /// Two-sided p-values on `n - k` degrees of freedom
    pub p_values: Vec<f64>,
    /// Coefficient of determination
    pub r_squared: f64,
    /// R² adjusted for the number of regressors
    pub adj_r_squared: f64,
    /// Number of observations
    pub n_obs: usize,
    /// Akaike information criterion
    pub aic: f64,
    /// Bayesian information criterion
    pub bic: f64,
    /// Whether the standard errors are heteroskedasticity-consistent (HC3)
    pub robust: bool,
}

impl ModelDiagnostics for RegressionResult {
    fn n_obs(&self) -> usize {
        self.n_obs
    }

    fn r_squared(&self) -> f64 {
        self.r_squared
    }

    fn adj_r_squared(&self) -> f64 {
        self.adj_r_squared
    }

    fn aic(&self) -> f64 {
        self.aic
    }

    fn bic(&self) -> f64 {
        self.bic
    }
}

/// The two predefined robustness specifications plus their VIF table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobustnessReport {
    /// Treatment-only model, unstandardized
    pub simple_model: RegressionResult,
    /// Treatment + median_income + pct_college, standardized
    pub controls_model: RegressionResult,
    /// VIF per non-intercept term of the controls-model design
    pub vif: BTreeMap<String, f64>,
}

/// Assemble the design matrix (intercept first) and target for a model.
///
/// Fail-fast validation, each a distinct condition: unresolvable control
/// columns (`MissingColumn`), NaN in any feature column or in the target
/// (`MissingValue`), zero standard deviation in a column to be standardized
/// (`DegenerateInput`).
fn build_design(
    panel: &Panel,
    controls: &[&str],
    standardize: bool,
) -> Result<(DMatrix<f64>, DVector<f64>, Vec<String>)> {
    if panel.is_empty() {
        return Err(Error::Validation("panel must be non-empty".into()));
    }

    let mut names: Vec<&str> = vec![TREATMENT];
    names.extend(controls);

    let mut columns = Vec::with_capacity(names.len());
    for &name in &names {
        columns.push(panel.column(name)?);
    }
    let y = panel.column(OUTCOME)?;

    for (name, col) in names.iter().zip(&columns) {
        if col.iter().any(|v| !v.is_finite()) {
            return Err(Error::MissingValue(format!("feature column {name} contains NaN")));
        }
    }
    if y.iter().any(|v| !v.is_finite()) {
        return Err(Error::MissingValue(format!("target column {OUTCOME} contains NaN")));
    }

    if standardize {
        for (name, col) in names.iter().zip(columns.iter_mut()) {
            let n = col.len() as f64;
            let mean = col.iter().sum::<f64>() / n;
            let var = col.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (n - 1.0);
            let std = var.sqrt();
            if std == 0.0 || !std.is_finite() {
                return Err(Error::DegenerateInput(format!(
                    "column {name} has zero standard deviation, cannot standardize"
                )));
            }
            for v in col.iter_mut() {
                *v = (*v - mean) / std;
            }
        }
    }

    let n = y.len();
    let k = names.len() + 1;
    let mut x = DMatrix::zeros(n, k);
    for i in 0..n {
        x[(i, 0)] = 1.0;
        for (j, col) in columns.iter().enumerate() {
            x[(i, j + 1)] = col[i];
        }
    }

    let mut terms = vec!["intercept".to_string()];
    terms.extend(names.iter().map(|s| s.to_string()));
    Ok((x, DVector::from_vec(y), terms))
}

/// Fit delta-turnout on delta-nostalgia plus optional controls.
///
/// Controls enter in the order given, after the treatment. With
/// `standardize`, every feature column (treatment and controls alike, never
/// the intercept) is centered and scaled by its own mean and standard
/// deviation. `robust_se` selects HC3 sandwich standard errors; otherwise
/// classical `σ²(X'X)⁻¹` errors are reported.
pub fn fit_ols(
    panel: &Panel,
    controls: &[&str],
    standardize: bool,
    robust_se: bool,
) -> Result<RegressionResult> {
    let (x, y, terms) = build_design(panel, controls, standardize)?;
    let n = x.nrows();
    let k = x.ncols();
    if n <= k {
        return Err(Error::DegenerateInput(format!(
            "need more observations ({n}) than parameters ({k})"
        )));
    }

    let xtx = x.transpose() * &x;
    let xtx_inv = xtx
        .try_inverse()
        .ok_or_else(|| Error::Computation("X'X singular in OLS fit".into()))?;
    let beta = &xtx_inv * (x.transpose() * &y);

    let y_hat = &x * &beta;
    let resid = &y - &y_hat;
    let rss: f64 = resid.iter().map(|r| r * r).sum();

    let y_mean = y.iter().sum::<f64>() / n as f64;
    let tss: f64 = y.iter().map(|v| (v - y_mean) * (v - y_mean)).sum();
    let r_squared = if tss > 0.0 { 1.0 - rss / tss } else { 0.0 };
    let adj_r_squared =
        1.0 - (1.0 - r_squared) * (n as f64 - 1.0) / (n as f64 - k as f64);

    let std_errors = if robust_se {
        hc3_standard_errors(&x, &resid, &xtx_inv)
    } else {
        let sigma2 = rss / (n - k) as f64;
        (0..k).map(|j| (sigma2 * xtx_inv[(j, j)]).sqrt()).collect()
    };

    let dof = (n - k) as f64;
    let t_dist = StudentsT::new(0.0, 1.0, dof)
        .map_err(|e| Error::Computation(format!("Student-t with {dof} df: {e}")))?;
    let coefficients: Vec<f64> = beta.iter().copied().collect();
    let t_stats: Vec<f64> =
        coefficients.iter().zip(&std_errors).map(|(b, se)| b / se).collect();
    let p_values: Vec<f64> =
        t_stats.iter().map(|t| 2.0 * (1.0 - t_dist.cdf(t.abs()))).collect();

    // Gaussian log-likelihood at the MLE variance rss/n (statsmodels convention).
    let n_f = n as f64;
    let llf = -0.5 * n_f * ((2.0 * std::f64::consts::PI).ln() + (rss / n_f).ln() + 1.0);
    let aic = 2.0 * k as f64 - 2.0 * llf;
    let bic = k as f64 * n_f.ln() - 2.0 * llf;

    Ok(RegressionResult {
        terms,
        coefficients,
        std_errors,
        t_stats,
        p_values,
        r_squared,
        adj_r_squared,
        n_obs: n,
        aic,
        bic,
        robust: robust_se,
    })
}

/// HC3 sandwich standard errors.
///
/// `V = (X'X)⁻¹ X' diag(e_i²/(1-h_i)²) X (X'X)⁻¹` with leverages
/// `h_i = x_i (X'X)⁻¹ x_i'`.
fn hc3_standard_errors(
    x: &DMatrix<f64>,
    resid: &DVector<f64>,
    xtx_inv: &DMatrix<f64>,
) -> Vec<f64> {
    let n = x.nrows();
    let k = x.ncols();

    let mut meat = DMatrix::zeros(k, k);
    for i in 0..n {
        let xi = x.row(i);
        let h_i = (xi * xtx_inv * xi.transpose())[(0, 0)];
        let w = resid[i] / (1.0 - h_i);
        let omega = w * w;
        for a in 0..k {
            for b in 0..k {
                meat[(a, b)] += omega * x[(i, a)] * x[(i, b)];
            }
        }
    }

    let v = xtx_inv * meat * xtx_inv;
    (0..k).map(|j| v[(j, j)].max(0.0).sqrt()).collect()
}

/// Variance inflation factors for a design matrix with a leading intercept.
///
/// Each non-intercept column is regressed on all other columns (intercept
/// included) via SVD least squares, and `1/(1-R²)` of that auxiliary fit is
/// reported; exact collinearity reports `f64::INFINITY`. `names` labels the
/// non-intercept columns.
pub fn compute_vif(x: &DMatrix<f64>, names: &[String]) -> Result<BTreeMap<String, f64>> {
    let n = x.nrows();
    let k = x.ncols();
    if k < 2 {
        return Err(Error::Validation("design must have at least one non-intercept column".into()));
    }
    if names.len() != k - 1 {
        return Err(Error::Validation(format!(
            "expected {} names for {} non-intercept columns, got {}",
            k - 1,
            k - 1,
            names.len()
        )));
    }

    let mut out = BTreeMap::new();
    for j in 1..k {
        let target = x.column(j).into_owned();

        let mut aux = DMatrix::zeros(n, k - 1);
        let mut dst = 0;
        for c in 0..k {
            if c == j {
                continue;
            }
            aux.set_column(dst, &x.column(c));
            dst += 1;
        }

        // SVD least squares tolerates the rank deficiency that exact
        // collinearity induces in the auxiliary normal equations.
        let svd = SVD::new(aux.clone(), true, true);
        let beta = svd
            .solve(&target, 1e-12)
            .map_err(|e| Error::Computation(format!("VIF auxiliary solve: {e}")))?;
        let resid = &target - aux * beta;
        let rss: f64 = resid.iter().map(|r| r * r).sum();

        let mean = target.iter().sum::<f64>() / n as f64;
        let tss: f64 = target.iter().map(|v| (v - mean) * (v - mean)).sum();
        if tss <= 0.0 {
            return Err(Error::DegenerateInput(format!(
                "column {} has zero variance, VIF undefined",
                names[j - 1]
            )));
        }

        let r2 = 1.0 - rss / tss;
        let vif = if 1.0 - r2 < 1e-12 { f64::INFINITY } else { 1.0 / (1.0 - r2) };
        out.insert(names[j - 1].clone(), vif);
    }
    Ok(out)
}

/// Run both predefined specifications and the VIF diagnostic.
///
/// The simple model regresses delta-turnout on delta-nostalgia alone,
/// unstandardized; the controls model adds median income and college share,
/// standardized. VIF is computed on the controls model's standardized
/// design matrix. Both models use HC3 standard errors.
pub fn run_full_robustness(panel: &Panel) -> Result<RobustnessReport> {
    let simple_model = fit_ols(panel, &[], false, true)?;
    let controls_model = fit_ols(panel, &ROBUSTNESS_CONTROLS, true, true)?;

    let (x, _, terms) = build_design(panel, &ROBUSTNESS_CONTROLS, true)?;
    let vif = compute_vif(&x, &terms[1..])?;

    Ok(RobustnessReport { simple_model, controls_model, vif })
}

/// One row of the model comparison table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelComparisonRow {
    /// Model label
    pub model: String,
    /// Number of observations
    pub n_obs: usize,
    /// Coefficient of determination
    pub r_squared: f64,
    /// Adjusted R²
    pub adj_r_squared: f64,
    /// Akaike information criterion
    pub aic: f64,
    /// Bayesian information criterion
    pub bic: f64,
}

/// Fit-quality comparison across named models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelComparison {
    /// One row per model, in input order
    pub rows: Vec<ModelComparisonRow>,
}

/// Extract the comparison row of one fitted model.
pub fn extract_result(name: &str, model: &dyn ModelDiagnostics) -> ModelComparisonRow {
    ModelComparisonRow {
        model: name.to_string(),
        n_obs: model.n_obs(),
        r_squared: model.r_squared(),
        adj_r_squared: model.adj_r_squared(),
        aic: model.aic(),
        bic: model.bic(),
    }
}

/// Tabulate fit diagnostics across named models (VIF has no row here).
pub fn tabulate(models: &[(&str, &dyn ModelDiagnostics)]) -> ModelComparison {
    ModelComparison {
        rows: models.iter().map(|(name, model)| extract_result(name, *model)).collect(),
    }
}

impl fmt::Display for ModelComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<20} {:>6} {:>10} {:>10} {:>12} {:>12}",
            "model", "N", "R2", "adj R2", "AIC", "BIC"
        )?;
        for row in &self.rows {
            writeln!(
                f,
                "{:<20} {:>6} {:>10.4} {:>10.4} {:>12.2} {:>12.2}",
                row.model, row.n_obs, row.r_squared, row.adj_r_squared, row.aic, row.bic
            )?;
        }
        Ok(())
    }
}
