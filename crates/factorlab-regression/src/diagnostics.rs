//! Residual diagnostics: normality, heteroskedasticity, autocorrelation.

use crate::error::{RegressionError, Result};
use crate::ols::{CONST, Ols, OlsFit};
use crate::stats;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Jarque-Bera normality test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JarqueBera {
    /// `n/6 * (S² + (K - 3)² / 4)`
    pub statistic: f64,
    /// p-value under χ²(2)
    pub p_value: f64,
    /// Sample skewness
    pub skew: f64,
    /// Sample kurtosis (normal = 3)
    pub kurtosis: f64,
}

/// Breusch-Pagan heteroskedasticity test (studentized form).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreuschPagan {
    /// Lagrange multiplier statistic `n * R²` of the auxiliary regression
    pub lm: f64,
    /// p-value of the LM statistic under χ²(k - 1)
    pub lm_p_value: f64,
    /// F statistic of the auxiliary regression
    pub f_stat: f64,
    /// p-value of the F statistic
    pub f_p_value: f64,
}

/// All residual diagnostics of a fitted model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResidualDiagnostics {
    /// Normality
    pub jarque_bera: JarqueBera,
    /// Heteroskedasticity
    pub breusch_pagan: BreuschPagan,
    /// First-order autocorrelation, near 2 when absent
    pub durbin_watson: f64,
}

fn chi2_sf(statistic: f64, df: f64) -> Result<f64> {
    let dist = ChiSquared::new(df).map_err(|e| RegressionError::Distribution(e.to_string()))?;
    Ok(if statistic.is_nan() {
        f64::NAN
    } else {
        1.0 - dist.cdf(statistic)
    })
}

/// Jarque-Bera test on residuals.
pub fn jarque_bera(resid: &[f64]) -> Result<JarqueBera> {
    let n = resid.len();
    if n < 3 {
        return Err(RegressionError::InsufficientData {
            required: 3,
            actual: n,
        });
    }
    let skew = stats::skewness(resid);
    let kurtosis = stats::kurtosis(resid);
    let statistic = n as f64 / 6.0 * (skew * skew + (kurtosis - 3.0).powi(2) / 4.0);
    Ok(JarqueBera {
        statistic,
        p_value: chi2_sf(statistic, 2.0)?,
        skew,
        kurtosis,
    })
}

/// Breusch-Pagan test: regress squared residuals on the model's regressors.
pub fn breusch_pagan(fit: &OlsFit) -> Result<BreuschPagan> {
    let squared: Vec<f64> = fit.resid().iter().map(|e| e * e).collect();
    let mut aux = Ols::new(squared);
    for (j, name) in fit.names().iter().enumerate() {
        if name != CONST {
            aux = aux.regressor(name.clone(), fit.design().column(j).to_vec());
        }
    }
    let aux = aux.fit()?;

    let df = aux.df_model();
    let lm = aux.nobs() as f64 * aux.r_squared();
    Ok(BreuschPagan {
        lm,
        lm_p_value: if df > 0.0 { chi2_sf(lm, df)? } else { f64::NAN },
        f_stat: aux.f_statistic(),
        f_p_value: aux.f_pvalue(),
    })
}

/// Durbin-Watson statistic `Σ(e_t - e_{t-1})² / Σe_t²`.
pub fn durbin_watson(resid: &[f64]) -> f64 {
    let ssr: f64 = resid.iter().map(|e| e * e).sum();
    let diff: f64 = resid.windows(2).map(|w| (w[1] - w[0]).powi(2)).sum();
    diff / ssr
}

impl OlsFit {
    /// Run all residual diagnostics.
    pub fn diagnostics(&self) -> Result<ResidualDiagnostics> {
        Ok(ResidualDiagnostics {
            jarque_bera: jarque_bera(self.resid())?,
            breusch_pagan: breusch_pagan(self)?,
            durbin_watson: durbin_watson(self.resid()),
        })
    }
}
