//! Descriptive statistics on slices.
//!
//! Sample moments use `ddof = 1`; skewness and kurtosis use the biased
//! (population) moments that the Jarque-Bera statistic is defined on.

use statrs::distribution::{ContinuousCDF, Normal};

/// Months per year, used to annualize monthly figures.
pub const MONTHS_PER_YEAR: f64 = 12.0;

/// Arithmetic mean, NaN for empty input.
pub fn mean(x: &[f64]) -> f64 {
    if x.is_empty() {
        return f64::NAN;
    }
    x.iter().sum::<f64>() / x.len() as f64
}

/// Variance with `ddof` degrees of freedom removed.
pub fn variance(x: &[f64], ddof: usize) -> f64 {
    covariance(x, x, ddof)
}

/// Sample standard deviation (`ddof = 1`).
pub fn std_dev(x: &[f64]) -> f64 {
    variance(x, 1).sqrt()
}

/// Covariance of two equally long slices with `ddof` removed.
/// NaN when lengths differ or there are too few observations.
pub fn covariance(x: &[f64], y: &[f64], ddof: usize) -> f64 {
    let n = x.len();
    if n != y.len() || n <= ddof {
        return f64::NAN;
    }
    let mx = mean(x);
    let my = mean(y);
    x.iter()
        .zip(y)
        .map(|(a, b)| (a - mx) * (b - my))
        .sum::<f64>()
        / (n - ddof) as f64
}

/// Pearson correlation; NaN when either side has zero variance.
pub fn correlation(x: &[f64], y: &[f64]) -> f64 {
    let sx = variance(x, 1).sqrt();
    let sy = variance(y, 1).sqrt();
    if sx == 0.0 || sy == 0.0 {
        return f64::NAN;
    }
    covariance(x, y, 1) / (sx * sy)
}

/// Correlation of `x` with `y` shifted by `lag` periods.
///
/// A positive lag pairs `x[t]` with `y[t + lag]` (does `x` lead `y`); a
/// negative lag pairs `x[t + |lag|]` with `y[t]`.
pub fn lagged_correlation(x: &[f64], y: &[f64], lag: i32) -> f64 {
    let n = x.len().min(y.len());
    let k = lag.unsigned_abs() as usize;
    if k >= n {
        return f64::NAN;
    }
    if lag >= 0 {
        correlation(&x[..n - k], &y[k..n])
    } else {
        correlation(&x[k..n], &y[..n - k])
    }
}

fn central_moment(x: &[f64], order: i32) -> f64 {
    let m = mean(x);
    x.iter().map(|v| (v - m).powi(order)).sum::<f64>() / x.len() as f64
}

/// Skewness from biased moments.
pub fn skewness(x: &[f64]) -> f64 {
    let m2 = central_moment(x, 2);
    central_moment(x, 3) / m2.powf(1.5)
}

/// Kurtosis from biased moments (Pearson, normal = 3).
pub fn kurtosis(x: &[f64]) -> f64 {
    let m2 = central_moment(x, 2);
    central_moment(x, 4) / (m2 * m2)
}

/// Compound a monthly rate to a year: `(1 + r)^12 - 1`.
pub fn annualize_return(monthly: f64) -> f64 {
    (1.0 + monthly).powf(MONTHS_PER_YEAR) - 1.0
}

/// Scale a monthly volatility to a year: `sigma * sqrt(12)`.
pub fn annualize_volatility(monthly: f64) -> f64 {
    monthly * MONTHS_PER_YEAR.sqrt()
}

/// Total compounded return of a return series: `prod(1 + r) - 1`.
pub fn compound(returns: &[f64]) -> f64 {
    returns.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0
}

/// Theoretical standard normal quantiles for a normal probability plot of
/// `n` ordered observations (Filliben's order statistic medians).
pub fn normal_order_quantiles(n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    let Ok(normal) = Normal::new(0.0, 1.0) else {
        return vec![f64::NAN; n];
    };
    let last = 0.5_f64.powf(1.0 / n as f64);
    (0..n)
        .map(|i| {
            let p = if i == 0 {
                1.0 - last
            } else if i == n - 1 {
                last
            } else {
                (i as f64 + 1.0 - 0.3175) / (n as f64 + 0.365)
            };
            normal.inverse_cdf(p)
        })
        .collect()
}
