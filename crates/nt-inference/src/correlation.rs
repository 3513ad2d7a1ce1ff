//! Rank correlation and correlation comparison.
//!
//! Spearman's rho is Pearson correlation on average ranks (ties share the
//! mean of their rank positions), with the asymptotic two-sided p-value
//! from the Student-t transform `t = rho * sqrt((n-2)/(1-rho^2))` on
//! `n-2` degrees of freedom. Correlations from independent groups are
//! compared via the Fisher r-to-z transform.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

use nt_core::{Error, Result};

/// Standard normal CDF via erfc for tail accuracy.
pub(crate) fn normal_cdf(x: f64) -> f64 {
    0.5 * statrs::function::erf::erfc(-x / std::f64::consts::SQRT_2)
}

/// Average ranks (1-based); tied values share the mean of their positions.
pub(crate) fn average_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0_f64; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        // Positions i..=j (0-based) share the average 1-based rank.
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for &k in &order[i..=j] {
            ranks[k] = avg;
        }
        i = j + 1;
    }
    ranks
}

fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    cov / (var_x * var_y).sqrt()
}

fn distinct_count(values: &[f64]) -> usize {
    let mut v = values.to_vec();
    v.sort_by(f64::total_cmp);
    v.dedup();
    v.len()
}

/// Fail-fast validation shared by the correlation and resampling routines.
pub(crate) fn validate_pair(x: &[f64], y: &[f64]) -> Result<()> {
    if x.len() != y.len() {
        return Err(Error::Validation(format!(
            "x and y must have the same length: {} vs {}",
            x.len(),
            y.len()
        )));
    }
    if x.len() < 2 {
        return Err(Error::DegenerateInput("correlation requires at least 2 observations".into()));
    }
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return Err(Error::MissingValue("correlation inputs must be finite".into()));
    }
    if distinct_count(x) < 2 {
        return Err(Error::DegenerateInput("x has fewer than 2 distinct values".into()));
    }
    if distinct_count(y) < 2 {
        return Err(Error::DegenerateInput("y has fewer than 2 distinct values".into()));
    }
    Ok(())
}

/// Spearman rho without validation or a p-value.
///
/// Used inside resampling loops; a degenerate draw (fewer than 2 distinct
/// values on either side) yields NaN, mirroring the rho definition's
/// division by zero rank variance.
pub(crate) fn spearman_rho(x: &[f64], y: &[f64]) -> f64 {
    pearson(&average_ranks(x), &average_ranks(y))
}

/// Spearman rank correlation with its asymptotic two-sided p-value.
///
/// Fails with [`Error::DegenerateInput`] when either input has fewer than
/// 2 distinct values. `|rho| = 1` reports p = 0 (the t transform diverges).
pub fn spearman(x: &[f64], y: &[f64]) -> Result<(f64, f64)> {
    validate_pair(x, y)?;

    let rho = spearman_rho(x, y);
    let n = x.len() as f64;

    let p_value = if 1.0 - rho * rho <= f64::EPSILON {
        0.0
    } else {
        let t = rho * ((n - 2.0) / (1.0 - rho * rho)).sqrt();
        let dist = StudentsT::new(0.0, 1.0, n - 2.0)
            .map_err(|e| Error::Computation(format!("Student-t with {} df: {e}", n - 2.0)))?;
        2.0 * (1.0 - dist.cdf(t.abs()))
    };
    Ok((rho, p_value))
}

/// Result of a Fisher r-to-z comparison of two correlations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FisherZTest {
    /// `(z1 - z2) / sqrt(1/(n1-3) + 1/(n2-3))`
    pub z_stat: f64,
    /// Two-sided normal p-value
    pub p_value: f64,
}

/// Compare two independent correlations via the Fisher transform.
///
/// Fails with [`Error::DegenerateInput`] when either sample has `n <= 3`
/// or either correlation is exactly ±1 (the transform diverges).
pub fn fisher_z_test(r1: f64, n1: usize, r2: f64, n2: usize) -> Result<FisherZTest> {
    if n1 <= 3 || n2 <= 3 {
        return Err(Error::DegenerateInput(format!(
            "Fisher z requires more than 3 observations per group, got {n1} and {n2}"
        )));
    }
    for r in [r1, r2] {
        if !r.is_finite() || r.abs() >= 1.0 {
            return Err(Error::DegenerateInput(format!(
                "Fisher z transform diverges for correlation {r}"
            )));
        }
    }

    let z1 = 0.5 * ((1.0 + r1) / (1.0 - r1)).ln();
    let z2 = 0.5 * ((1.0 + r2) / (1.0 - r2)).ln();
    let se = (1.0 / (n1 as f64 - 3.0) + 1.0 / (n2 as f64 - 3.0)).sqrt();
    let z_stat = (z1 - z2) / se;
    let p_value = 2.0 * (1.0 - normal_cdf(z_stat.abs()));

    Ok(FisherZTest { z_stat, p_value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_ranks_with_ties() {
        let r = average_ranks(&[10.0, 30.0, 20.0, 30.0]);
        assert_eq!(r, vec![1.0, 3.5, 2.0, 3.5]);
    }

    #[test]
    fn test_spearman_perfect_monotonic() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 4.0, 9.0, 16.0, 25.0];
        let (rho, p) = spearman(&x, &y).unwrap();
        assert!((rho - 1.0).abs() < 1e-12);
        assert_eq!(p, 0.0);

        let y_rev: Vec<f64> = y.iter().rev().copied().collect();
        let (rho, _) = spearman(&x, &y_rev).unwrap();
        assert!((rho + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_spearman_known_value_with_tie() {
        // ranks(y) = [1, 2, 3, 4.5, 4.5]; pearson of ranks = 9.5/sqrt(95)
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [5.0, 6.0, 7.0, 8.0, 8.0];
        let (rho, p) = spearman(&x, &y).unwrap();
        assert!((rho - 9.5 / 95.0_f64.sqrt()).abs() < 1e-12, "rho={rho}");
        assert!(p > 0.0 && p < 0.05, "p={p}");
    }

    #[test]
    fn test_spearman_independent_is_near_zero() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [7.0, 3.0, 9.0, 4.0];
        let (rho, p) = spearman(&x, &y).unwrap();
        assert!(rho.abs() < 1.0);
        assert!(p > 0.05);
    }

    #[test]
    fn test_spearman_degenerate_inputs() {
        assert!(matches!(
            spearman(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]),
            Err(Error::DegenerateInput(_))
        ));
        assert!(matches!(
            spearman(&[1.0, 2.0, 3.0], &[5.0, 5.0, 5.0]),
            Err(Error::DegenerateInput(_))
        ));
        assert!(matches!(spearman(&[1.0], &[1.0]), Err(Error::DegenerateInput(_))));
        assert!(matches!(spearman(&[1.0, 2.0], &[1.0]), Err(Error::Validation(_))));
        assert!(matches!(
            spearman(&[1.0, f64::NAN, 3.0], &[1.0, 2.0, 3.0]),
            Err(Error::MissingValue(_))
        ));
    }

    #[test]
    fn test_fisher_z_antisymmetry() {
        let a = fisher_z_test(0.6, 40, 0.2, 55).unwrap();
        let b = fisher_z_test(0.2, 55, 0.6, 40).unwrap();
        assert!((a.z_stat + b.z_stat).abs() < 1e-12);
        assert!((a.p_value - b.p_value).abs() < 1e-12);
    }

    #[test]
    fn test_fisher_z_known_value() {
        // z1 = atanh(0.5) = 0.549306, z2 = atanh(0.0) = 0
        // se = sqrt(1/47 + 1/47), z = 0.549306 / 0.206284 = 2.66285
        let res = fisher_z_test(0.5, 50, 0.0, 50).unwrap();
        assert!((res.z_stat - 2.66285).abs() < 1e-4, "z={}", res.z_stat);
        assert!(res.p_value < 0.01);
    }

    #[test]
    fn test_fisher_z_degenerate() {
        assert!(matches!(fisher_z_test(0.5, 3, 0.2, 50), Err(Error::DegenerateInput(_))));
        assert!(matches!(fisher_z_test(0.5, 50, 0.2, 2), Err(Error::DegenerateInput(_))));
        assert!(matches!(fisher_z_test(1.0, 50, 0.2, 50), Err(Error::DegenerateInput(_))));
        assert!(matches!(fisher_z_test(0.5, 50, -1.0, 50), Err(Error::DegenerateInput(_))));
    }

    #[test]
    fn test_identical_groups_give_zero_z() {
        let res = fisher_z_test(0.31, 25, 0.31, 25).unwrap();
        assert!(res.z_stat.abs() < 1e-12);
        assert!((res.p_value - 1.0).abs() < 1e-12);
    }
}
