//! Newey-West HAC (heteroskedasticity and autocorrelation consistent)
//! standard errors for OLS coefficients.
//!
//! ```text
//! V = n/(n-k) * (X'X)^-1 S (X'X)^-1
//! S = Σ_t e_t² x_t x_t' + Σ_{l=1}^{L} w_l Σ_{t>l} e_t e_{t-l} (x_t x_{t-l}' + x_{t-l} x_t')
//! w_l = 1 - l/(L+1)   (Bartlett kernel)
//! L   = ceil(4 (T/100)^(2/9)) unless set
//! ```
//!
//! p-values are two-sided against the standard normal, the usual
//! large-sample reference for HAC t-statistics.
//!
//! # References
//! - Newey, W. K., & West, K. D. (1987). "A Simple, Positive Semi-Definite,
//!   Heteroskedasticity and Autocorrelation Consistent Covariance Matrix."
//!   Econometrica, 55(3), 703-708.

use crate::error::{RegressionError, Result};
use crate::ols::{OlsFit, two_sided_p};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;

/// Newey-West configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeweyWestConfig {
    /// Number of lags (None = automatic selection)
    pub lags: Option<usize>,
    /// Scale by `n / (n - k)`
    pub small_sample_correction: bool,
}

impl Default for NeweyWestConfig {
    fn default() -> Self {
        Self {
            lags: None,
            small_sample_correction: true,
        }
    }
}

impl NeweyWestConfig {
    /// Lag length for `n_periods` observations.
    pub fn lags_for(&self, n_periods: usize) -> usize {
        self.lags.unwrap_or_else(|| {
            let t = n_periods as f64;
            (4.0 * (t / 100.0).powf(2.0 / 9.0)).ceil() as usize
        })
    }
}

/// Bartlett kernel weight for `lag` given a maximum lag.
pub fn bartlett_weight(lag: usize, max_lag: usize) -> f64 {
    if lag == 0 {
        1.0
    } else if lag <= max_lag {
        1.0 - (lag as f64) / (max_lag as f64 + 1.0)
    } else {
        0.0
    }
}

/// HAC standard errors for every term of a fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HacErrors {
    /// Term names in fit order
    pub names: Vec<String>,
    /// Lags used
    pub lags: usize,
    /// Standard errors
    pub std_errors: Vec<f64>,
    /// t statistics
    pub t_values: Vec<f64>,
    /// Two-sided p-values (Student t with `n - k` df)
    pub p_values: Vec<f64>,
}

impl HacErrors {
    /// t statistic of a named term.
    pub fn t_value(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.t_values[i])
    }

    /// Standard error of a named term.
    pub fn std_error(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.std_errors[i])
    }
}

impl OlsFit {
    /// Newey-West standard errors.
    pub fn newey_west(&self, config: NeweyWestConfig) -> Result<HacErrors> {
        let x = self.design();
        let e = self.resid();
        let (n, k) = x.dim();
        let max_lag = config.lags_for(n).min(n.saturating_sub(1));

        // Score contributions u_t = x_t * e_t
        let mut u = x.clone();
        for t in 0..n {
            for j in 0..k {
                u[[t, j]] *= e[t];
            }
        }

        let mut s: Array2<f64> = u.t().dot(&u);
        for lag in 1..=max_lag {
            let weight = bartlett_weight(lag, max_lag);
            let mut gamma = Array2::<f64>::zeros((k, k));
            for t in lag..n {
                for i in 0..k {
                    for j in 0..k {
                        gamma[[i, j]] += u[[t, i]] * u[[t - lag, j]];
                    }
                }
            }
            for i in 0..k {
                for j in 0..k {
                    s[[i, j]] += weight * (gamma[[i, j]] + gamma[[j, i]]);
                }
            }
        }

        let bread = self.xtx_inv();
        let mut cov = bread.dot(&s).dot(bread);
        if config.small_sample_correction {
            cov *= n as f64 / (n - k) as f64;
        }

        let std_errors: Vec<f64> = (0..k).map(|j| cov[[j, j]].max(0.0).sqrt()).collect();
        let t_values: Vec<f64> = self
            .params()
            .iter()
            .zip(&std_errors)
            .map(|(b, se)| b / se)
            .collect();
        let dist = Normal::new(0.0, 1.0)
            .map_err(|e| RegressionError::Distribution(e.to_string()))?;
        let p_values = t_values.iter().map(|t| two_sided_p(&dist, *t)).collect();

        Ok(HacErrors {
            names: self.names().to_vec(),
            lags: max_lag,
            std_errors,
            t_values,
            p_values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ols::Ols;
    use approx::assert_relative_eq;
    use statrs::distribution::ContinuousCDF;

    #[test]
    fn test_optimal_lags() {
        let config = NeweyWestConfig::default();
        assert_eq!(config.lags_for(100), 4);
        assert_eq!(config.lags_for(500), 6);
        assert_eq!(config.lags_for(1000), 7);

        let manual = NeweyWestConfig {
            lags: Some(10),
            ..Default::default()
        };
        assert_eq!(manual.lags_for(100), 10);
    }

    #[test]
    fn test_bartlett_weight() {
        assert_relative_eq!(bartlett_weight(0, 4), 1.0);
        assert_relative_eq!(bartlett_weight(1, 4), 0.8);
        assert_relative_eq!(bartlett_weight(4, 4), 0.2);
        assert_relative_eq!(bartlett_weight(5, 4), 0.0);
    }

    #[test]
    fn zero_lags_without_correction_is_white() {
        let y = vec![1.0, 3.0, 2.0, 5.0, 4.0, 6.5];
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let fit = Ols::new(y).regressor("x", x.clone()).fit().unwrap();
        let hac = fit
            .newey_west(NeweyWestConfig {
                lags: Some(0),
                small_sample_correction: false,
            })
            .unwrap();
        assert_eq!(hac.lags, 0);

        // HC0 slope variance: Σ (x_t - x̄)² e_t² / Sxx²
        let xm = 3.5;
        let sxx: f64 = x.iter().map(|v| (v - xm).powi(2)).sum();
        let meat: f64 = x
            .iter()
            .zip(fit.resid())
            .map(|(v, e)| (v - xm).powi(2) * e * e)
            .sum();
        assert_relative_eq!(hac.std_error("x").unwrap(), (meat / (sxx * sxx)).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn positive_autocorrelation_widens_errors() {
        // Residuals in blocks of 12 with the same sign, orthogonal to x
        let n = 120;
        let x: Vec<f64> = (0..n).map(|i| (i % 2) as f64).collect();
        let y: Vec<f64> = (0..n)
            .map(|i| 1.0 + 0.5 * x[i] + if (i / 12) % 2 == 0 { 0.3 } else { -0.3 })
            .collect();
        let fit = Ols::new(y).regressor("x", x).fit().unwrap();
        let hac = fit.newey_west(NeweyWestConfig::default()).unwrap();
        assert_eq!(hac.lags, 5);
        assert!(hac.std_error("const").unwrap() > fit.std_error("const").unwrap());
        assert!(hac.t_value("x").unwrap().is_finite());
    }

    #[test]
    fn p_values_use_the_normal_reference() {
        let n = 60;
        let x: Vec<f64> = (0..n).map(|i| ((i * 7) % 11) as f64).collect();
        let y: Vec<f64> = (0..n)
            .map(|i| 0.2 + 0.1 * x[i] + if i % 3 == 0 { 0.4 } else { -0.2 })
            .collect();
        let fit = Ols::new(y).regressor("x", x).fit().unwrap();
        let hac = fit.newey_west(NeweyWestConfig::default()).unwrap();

        let normal = Normal::new(0.0, 1.0).unwrap();
        for (t, p) in hac.t_values.iter().zip(&hac.p_values) {
            assert_relative_eq!(*p, 2.0 * (1.0 - normal.cdf(t.abs())), epsilon = 1e-12);
        }
        assert_relative_eq!(two_sided_p(&normal, 1.959_963_984_540_054), 0.05, epsilon = 1e-9);
    }

    #[test]
    fn lag_clamped_to_sample() {
        let fit = Ols::new(vec![1.0, 2.0, 2.5, 4.0])
            .regressor("x", vec![1.0, 2.0, 3.0, 4.0])
            .fit()
            .unwrap();
        let hac = fit
            .newey_west(NeweyWestConfig {
                lags: Some(100),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(hac.lags, 3);
    }
}
