//! One-line model summaries for comparing specifications.

use crate::ols::OlsFit;
use crate::stats;
use serde::{Deserialize, Serialize};

/// Summary statistics of a fitted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    /// Observations used
    pub n_obs: usize,
    /// R²
    pub r2: f64,
    /// Adjusted R²
    pub adj_r2: f64,
    /// Intercept (NaN when the model has none)
    pub alpha_monthly: f64,
    /// `(1 + alpha)^12 - 1`
    pub alpha_annualized: f64,
    /// Residual standard deviation, `ddof = 1`
    pub resid_vol_monthly: f64,
    /// Residual standard deviation times `sqrt(12)`
    pub resid_vol_annualized: f64,
    /// Correlation between fitted and actual values
    pub corr_fitted_actual: f64,
}

impl ModelSummary {
    /// Summarize a fit.
    pub fn from_fit(fit: &OlsFit) -> Self {
        let resid_vol_monthly = stats::std_dev(fit.resid());
        Self {
            n_obs: fit.nobs(),
            r2: fit.r_squared(),
            adj_r2: fit.adj_r_squared(),
            alpha_monthly: fit.alpha().unwrap_or(f64::NAN),
            alpha_annualized: fit.alpha_annualized(),
            resid_vol_monthly,
            resid_vol_annualized: stats::annualize_volatility(resid_vol_monthly),
            corr_fitted_actual: stats::correlation(fit.response(), fit.fitted()),
        }
    }
}

impl From<&OlsFit> for ModelSummary {
    fn from(fit: &OlsFit) -> Self {
        Self::from_fit(fit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ols::Ols;
    use approx::assert_relative_eq;

    #[test]
    fn summary_matches_fit() {
        let fit = Ols::new(vec![1.0, 3.0, 2.0, 5.0, 4.0])
            .regressor("x", vec![1.0, 2.0, 3.0, 4.0, 5.0])
            .fit()
            .unwrap();
        let s = ModelSummary::from_fit(&fit);
        assert_eq!(s.n_obs, 5);
        assert_relative_eq!(s.r2, 0.64, epsilon = 1e-12);
        assert_relative_eq!(s.alpha_monthly, 0.6, epsilon = 1e-12);
        // SSR = 3.6 over n - 1 = 4
        assert_relative_eq!(s.resid_vol_monthly, 0.9_f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(s.resid_vol_annualized, (0.9_f64 * 12.0).sqrt(), epsilon = 1e-12);
        // with an intercept, corr(y, y_hat)^2 = R²
        assert_relative_eq!(s.corr_fitted_actual, 0.8, epsilon = 1e-12);
    }
}
