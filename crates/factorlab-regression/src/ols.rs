//! Ordinary least squares.
//!
//! ```text
//! y = X β + ε,  β = (X'X)^-1 X'y
//! Var(β) = s² (X'X)^-1,  s² = ε'ε / (n - k)
//! ```
//!
//! `X` holds a leading constant column named [`CONST`] followed by the
//! regressors in the order they were added.

use crate::error::{RegressionError, Result};
use crate::linalg::invert;
use crate::stats;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};

/// Name of the intercept term.
pub const CONST: &str = "const";

/// Regression specification: a response and named regressors.
#[derive(Debug, Clone)]
pub struct Ols {
    y: Vec<f64>,
    regressors: Vec<(String, Vec<f64>)>,
    add_constant: bool,
}

impl Ols {
    /// Start a regression of `y` on a constant.
    pub fn new(y: impl Into<Vec<f64>>) -> Self {
        Self {
            y: y.into(),
            regressors: Vec::new(),
            add_constant: true,
        }
    }

    /// Add a named regressor.
    pub fn regressor(mut self, name: impl Into<String>, values: impl Into<Vec<f64>>) -> Self {
        self.regressors.push((name.into(), values.into()));
        self
    }

    /// Fit without an intercept.
    pub const fn without_constant(mut self) -> Self {
        self.add_constant = false;
        self
    }

    fn names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.regressors.len() + 1);
        if self.add_constant {
            names.push(CONST.to_string());
        }
        names.extend(self.regressors.iter().map(|(n, _)| n.clone()));
        names
    }

    fn validate(&self) -> Result<()> {
        let n = self.y.len();
        if self.y.iter().any(|v| !v.is_finite()) {
            return Err(RegressionError::NonFinite("response".to_string()));
        }
        for (i, (name, values)) in self.regressors.iter().enumerate() {
            if values.len() != n {
                return Err(RegressionError::DimensionMismatch {
                    name: name.clone(),
                    expected: n,
                    actual: values.len(),
                });
            }
            if values.iter().any(|v| !v.is_finite()) {
                return Err(RegressionError::NonFinite(name.clone()));
            }
            let clashes_const = self.add_constant && name == CONST;
            if clashes_const || self.regressors[..i].iter().any(|(other, _)| other == name) {
                return Err(RegressionError::DuplicateRegressor(name.clone()));
            }
        }
        Ok(())
    }

    fn design(&self) -> Array2<f64> {
        let n = self.y.len();
        let offset = usize::from(self.add_constant);
        let mut x = Array2::<f64>::zeros((n, self.regressors.len() + offset));
        if self.add_constant {
            x.column_mut(0).fill(1.0);
        }
        for (j, (_, values)) in self.regressors.iter().enumerate() {
            for (i, v) in values.iter().enumerate() {
                x[[i, j + offset]] = *v;
            }
        }
        x
    }

    /// Fit the model.
    ///
    /// # Errors
    /// Fails on mismatched lengths, non-finite input, duplicate names, fewer
    /// observations than parameters plus one, or a singular design.
    pub fn fit(&self) -> Result<OlsFit> {
        self.validate()?;
        let names = self.names();
        let n = self.y.len();
        let k = names.len();
        if k == 0 {
            return Err(RegressionError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }
        if n <= k {
            return Err(RegressionError::InsufficientData {
                required: k + 1,
                actual: n,
            });
        }

        let x = self.design();
        let y = Array1::from(self.y.clone());
        let xtx_inv = invert(&x.t().dot(&x))?;
        let params = xtx_inv.dot(&x.t().dot(&y));
        let fitted = x.dot(&params);
        let resid = &y - &fitted;

        let df_resid = (n - k) as f64;
        let ssr: f64 = resid.iter().map(|e| e * e).sum();
        let mse_resid = ssr / df_resid;

        let tss = if self.add_constant {
            let m = stats::mean(&self.y);
            self.y.iter().map(|v| (v - m).powi(2)).sum::<f64>()
        } else {
            self.y.iter().map(|v| v * v).sum::<f64>()
        };
        let r_squared = if tss > 0.0 { 1.0 - ssr / tss } else { f64::NAN };
        let df_model = (k - usize::from(self.add_constant)) as f64;
        let df_total = if self.add_constant { n as f64 - 1.0 } else { n as f64 };
        let adj_r_squared = 1.0 - (1.0 - r_squared) * df_total / df_resid;

        let std_errors: Vec<f64> = (0..k)
            .map(|j| (mse_resid * xtx_inv[[j, j]]).max(0.0).sqrt())
            .collect();
        let t_dist = StudentsT::new(0.0, 1.0, df_resid)
            .map_err(|e| RegressionError::Distribution(e.to_string()))?;
        let t_values: Vec<f64> = params
            .iter()
            .zip(&std_errors)
            .map(|(b, se)| b / se)
            .collect();
        let p_values = t_values
            .iter()
            .map(|t| two_sided_p(&t_dist, *t))
            .collect();

        let (f_statistic, f_pvalue) = if df_model > 0.0 && mse_resid > 0.0 && tss > 0.0 {
            let f = ((tss - ssr) / df_model) / mse_resid;
            let dist = FisherSnedecor::new(df_model, df_resid)
                .map_err(|e| RegressionError::Distribution(e.to_string()))?;
            (f, 1.0 - dist.cdf(f))
        } else {
            (f64::NAN, f64::NAN)
        };

        Ok(OlsFit {
            names,
            params: params.to_vec(),
            std_errors,
            t_values,
            p_values,
            resid: resid.to_vec(),
            fitted: fitted.to_vec(),
            y: self.y.clone(),
            design: x,
            xtx_inv,
            r_squared,
            adj_r_squared,
            f_statistic,
            f_pvalue,
            nobs: n,
            df_model,
            df_resid,
            mse_resid,
        })
    }
}

pub(crate) fn two_sided_p<D: ContinuousCDF<f64, f64>>(dist: &D, t: f64) -> f64 {
    if t.is_nan() {
        f64::NAN
    } else {
        2.0 * (1.0 - dist.cdf(t.abs()))
    }
}

/// One row of a coefficient table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coefficient {
    /// Term name (`const` for the intercept)
    pub name: String,
    /// Estimate
    pub coef: f64,
    /// Standard error
    pub std_err: f64,
    /// t statistic
    pub t_stat: f64,
    /// Two-sided p-value
    pub p_value: f64,
}

/// A fitted OLS model.
#[derive(Debug, Clone)]
pub struct OlsFit {
    names: Vec<String>,
    params: Vec<f64>,
    std_errors: Vec<f64>,
    t_values: Vec<f64>,
    p_values: Vec<f64>,
    resid: Vec<f64>,
    fitted: Vec<f64>,
    y: Vec<f64>,
    design: Array2<f64>,
    xtx_inv: Array2<f64>,
    r_squared: f64,
    adj_r_squared: f64,
    f_statistic: f64,
    f_pvalue: f64,
    nobs: usize,
    df_model: f64,
    df_resid: f64,
    mse_resid: f64,
}

impl OlsFit {
    fn index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Term names, `const` first when an intercept was fitted.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Estimates in term order.
    pub fn params(&self) -> &[f64] {
        &self.params
    }

    /// Standard errors in term order.
    pub fn std_errors(&self) -> &[f64] {
        &self.std_errors
    }

    /// t statistics in term order.
    pub fn t_values(&self) -> &[f64] {
        &self.t_values
    }

    /// Two-sided p-values in term order.
    pub fn p_values(&self) -> &[f64] {
        &self.p_values
    }

    /// Estimate of a named term.
    pub fn param(&self, name: &str) -> Option<f64> {
        self.index(name).map(|i| self.params[i])
    }

    /// Standard error of a named term.
    pub fn std_error(&self, name: &str) -> Option<f64> {
        self.index(name).map(|i| self.std_errors[i])
    }

    /// t statistic of a named term.
    pub fn t_value(&self, name: &str) -> Option<f64> {
        self.index(name).map(|i| self.t_values[i])
    }

    /// p-value of a named term.
    pub fn p_value(&self, name: &str) -> Option<f64> {
        self.index(name).map(|i| self.p_values[i])
    }

    /// Table row of a named term.
    pub fn coefficient(&self, name: &str) -> Option<Coefficient> {
        self.index(name).map(|i| Coefficient {
            name: self.names[i].clone(),
            coef: self.params[i],
            std_err: self.std_errors[i],
            t_stat: self.t_values[i],
            p_value: self.p_values[i],
        })
    }

    /// Coefficient table in term order.
    pub fn coefficients(&self) -> Vec<Coefficient> {
        self.names
            .iter()
            .filter_map(|n| self.coefficient(n))
            .collect()
    }

    /// Monthly intercept, if fitted.
    pub fn alpha(&self) -> Option<f64> {
        self.param(CONST)
    }

    /// Intercept compounded to a year, `(1 + alpha)^12 - 1`; zero without an
    /// intercept.
    pub fn alpha_annualized(&self) -> f64 {
        stats::annualize_return(self.alpha().unwrap_or(0.0))
    }

    /// Residuals `y - X β`.
    pub fn resid(&self) -> &[f64] {
        &self.resid
    }

    /// Fitted values `X β`.
    pub fn fitted(&self) -> &[f64] {
        &self.fitted
    }

    /// Response the model was fitted on.
    pub fn response(&self) -> &[f64] {
        &self.y
    }

    /// Design matrix including the constant column.
    pub const fn design(&self) -> &Array2<f64> {
        &self.design
    }

    /// `(X'X)^-1`.
    pub const fn xtx_inv(&self) -> &Array2<f64> {
        &self.xtx_inv
    }

    /// Coefficient of determination.
    pub const fn r_squared(&self) -> f64 {
        self.r_squared
    }

    /// R² adjusted for degrees of freedom.
    pub const fn adj_r_squared(&self) -> f64 {
        self.adj_r_squared
    }

    /// F statistic of the joint test that all slopes are zero.
    pub const fn f_statistic(&self) -> f64 {
        self.f_statistic
    }

    /// p-value of the F test.
    pub const fn f_pvalue(&self) -> f64 {
        self.f_pvalue
    }

    /// Number of observations.
    pub const fn nobs(&self) -> usize {
        self.nobs
    }

    /// Model degrees of freedom (slopes, excluding the intercept).
    pub const fn df_model(&self) -> f64 {
        self.df_model
    }

    /// Residual degrees of freedom `n - k`.
    pub const fn df_resid(&self) -> f64 {
        self.df_resid
    }

    /// Residual variance `ε'ε / (n - k)`.
    pub const fn mse_resid(&self) -> f64 {
        self.mse_resid
    }

    /// Standard error of the regression, `sqrt(mse_resid)`.
    pub fn resid_std(&self) -> f64 {
        self.mse_resid.sqrt()
    }
}
