//! Core traits for the nostalgia/turnout analysis
//!
//! This module defines the capability seam between model fitting and
//! reporting: tabulation code depends on [`ModelDiagnostics`], not on any
//! concrete fitting library's result type.

/// Read-only fit diagnostics exposed by a fitted model.
pub trait ModelDiagnostics {
    /// Number of observations used in the fit
    fn n_obs(&self) -> usize;

    /// Coefficient of determination
    fn r_squared(&self) -> f64;

    /// R² adjusted for the number of regressors
    fn adj_r_squared(&self) -> f64;

    /// Akaike information criterion
    fn aic(&self) -> f64;

    /// Bayesian information criterion
    fn bic(&self) -> f64;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DummyModel;

    impl ModelDiagnostics for DummyModel {
        fn n_obs(&self) -> usize {
            42
        }

        fn r_squared(&self) -> f64 {
            0.5
        }

        fn adj_r_squared(&self) -> f64 {
            0.45
        }

        fn aic(&self) -> f64 {
            100.0
        }

        fn bic(&self) -> f64 {
            105.0
        }
    }

    #[test]
    fn test_trait_object_usable() {
        let m: &dyn ModelDiagnostics = &DummyModel;
        assert_eq!(m.n_obs(), 42);
        assert!(m.adj_r_squared() < m.r_squared());
        assert!(m.bic() > m.aic());
    }
}
