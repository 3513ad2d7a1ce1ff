//! Resampling-based significance for the rank correlation.
//!
//! Both routines take explicit seeds and own their generator instances, so
//! results never depend on call order. The bootstrap consumes a single
//! seeded stream and stays sequential; the permutation test derives one
//! seed per iteration (`seed + i`) and fans the iterations out over rayon,
//! which preserves the per-iteration seed-to-result mapping.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use nt_core::{Error, Result};

use crate::correlation::{spearman_rho, validate_pair};

/// Default number of resampling draws.
pub const DEFAULT_ITERATIONS: usize = 5000;
/// Default base seed.
pub const DEFAULT_SEED: u64 = 42;

/// Percentile bootstrap interval for Spearman's rho.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapCi {
    /// 2.5th percentile of the bootstrap distribution
    pub ci_lower: f64,
    /// 97.5th percentile of the bootstrap distribution
    pub ci_upper: f64,
    /// Raw bootstrap distribution, one rho per draw
    pub distribution: Vec<f64>,
}

/// Permutation test for Spearman's rho.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermutationTest {
    /// Fraction of permuted |rho| at or above the observed |rho|
    pub p_value: f64,
    /// Rho on the unpermuted inputs
    pub observed_rho: f64,
    /// Raw permutation distribution, one rho per iteration
    pub distribution: Vec<f64>,
}

/// Quantile of sorted data via linear interpolation.
fn quantile_linear_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let i = pos.floor() as usize;
    let j = pos.ceil() as usize;
    if i == j {
        return sorted[i];
    }
    let t = pos - i as f64;
    (1.0 - t) * sorted[i] + t * sorted[j]
}

fn quantile_linear(data: &[f64], q: f64) -> f64 {
    let mut v = data.to_vec();
    v.sort_by(f64::total_cmp);
    quantile_linear_sorted(&v, q)
}

fn validate_iterations(iterations: usize) -> Result<()> {
    if iterations == 0 {
        return Err(Error::Validation("iterations must be >= 1".into()));
    }
    Ok(())
}

/// Bootstrap the 95% percentile interval for Spearman's rho.
///
/// Resamples (x, y) *pairs* with replacement (same indices on both sides),
/// `x.len()` draws per resample, from one generator seeded with `seed`.
/// Identical seed and inputs give bit-identical output.
pub fn bootstrap_ci(x: &[f64], y: &[f64], iterations: usize, seed: u64) -> Result<BootstrapCi> {
    validate_pair(x, y)?;
    validate_iterations(iterations)?;

    let n = x.len();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut x_boot = vec![0.0_f64; n];
    let mut y_boot = vec![0.0_f64; n];

    let mut distribution = Vec::with_capacity(iterations);
    for _ in 0..iterations {
        for slot in 0..n {
            let idx = rng.random_range(0..n);
            x_boot[slot] = x[idx];
            y_boot[slot] = y[idx];
        }
        distribution.push(spearman_rho(&x_boot, &y_boot));
    }

    let ci_lower = quantile_linear(&distribution, 0.025);
    let ci_upper = quantile_linear(&distribution, 0.975);
    Ok(BootstrapCi { ci_lower, ci_upper, distribution })
}

/// Two-sided permutation test for Spearman's rho.
///
/// Iteration `i` shuffles `y` with its own generator seeded `seed + i` and
/// recomputes rho against the unshuffled `x`. The p-value is the exact
/// fraction of permuted |rho| at or above the observed |rho|.
pub fn permutation_test(
    x: &[f64],
    y: &[f64],
    iterations: usize,
    seed: u64,
) -> Result<PermutationTest> {
    validate_pair(x, y)?;
    validate_iterations(iterations)?;

    let observed_rho = spearman_rho(x, y);

    let distribution: Vec<f64> = (0..iterations as u64)
        .into_par_iter()
        .map(|i| {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i));
            let mut y_perm = y.to_vec();
            y_perm.shuffle(&mut rng);
            spearman_rho(x, &y_perm)
        })
        .collect();

    let exceedances = distribution.iter().filter(|rho| rho.abs() >= observed_rho.abs()).count();
    let p_value = exceedances as f64 / iterations as f64;

    Ok(PermutationTest { p_value, observed_rho, distribution })
}
