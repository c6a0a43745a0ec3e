//! Linear trend regression with event dummies
//!
//! `y_t = b0 + b1·t + Σ g_j·x_jt + e_t`, fitted by OLS on the normal equations.

use super::{check_columns, check_series, dot, least_squares, quadratic_form, Forecaster, ModelForecast};
use crate::error::{ModelError, ModelResult};
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct TrendRegression {
    coefficients: Vec<f64>,
    xtx_inv: Vec<Vec<f64>>,
    sigma: f64,
    n: usize,
    n_exog: usize,
    fitted: Vec<f64>,
    r_squared: f64,
    is_fitted: bool,
}

impl TrendRegression {
    pub fn new() -> Self {
        TrendRegression::default()
    }

    /// `[intercept, slope, event effects…]`
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn slope(&self) -> f64 {
        self.coefficients.get(1).copied().unwrap_or(0.0)
    }

    pub fn r_squared(&self) -> f64 {
        self.r_squared
    }

    fn row(t: usize, exog_values: impl Iterator<Item = f64>) -> Vec<f64> {
        let mut row = vec![1.0, t as f64];
        row.extend(exog_values);
        row
    }
}

impl Forecaster for TrendRegression {
    fn name(&self) -> &'static str {
        "regression"
    }

    fn fit(&mut self, y: &[f64], exog: &[Vec<f64>]) -> ModelResult<()> {
        let k = 2 + exog.len();
        check_series(y, k + 2)?;
        check_columns(exog, exog.len(), y.len())?;

        let n = y.len();
        let rows: Vec<Vec<f64>> = (0..n)
            .map(|t| Self::row(t, exog.iter().map(|c| c[t])))
            .collect();
        let ols = least_squares(&rows, y)?;

        let sse = ols.sse();
        let mean = y.iter().sum::<f64>() / n as f64;
        let sst: f64 = y.iter().map(|v| (v - mean).powi(2)).sum();

        self.fitted = y.iter().zip(&ols.residuals).map(|(v, r)| v - r).collect();
        self.sigma = (sse / (n - k) as f64).sqrt();
        self.r_squared = if sst > 0.0 { 1.0 - sse / sst } else { 1.0 };
        self.coefficients = ols.coefficients;
        self.xtx_inv = ols.xtx_inv;
        self.n = n;
        self.n_exog = exog.len();
        self.is_fitted = true;

        tracing::debug!(
            coefficients = ?self.coefficients,
            r_squared = self.r_squared,
            "trend regression fitted"
        );
        Ok(())
    }

    fn forecast(&self, steps: usize, future_exog: &[Vec<f64>]) -> ModelResult<ModelForecast> {
        if !self.is_fitted {
            return Err(ModelError::NotFitted);
        }
        check_columns(future_exog, self.n_exog, steps)?;

        let mut point = Vec::with_capacity(steps);
        let mut std_err = Vec::with_capacity(steps);
        for h in 0..steps {
            let x = Self::row(self.n + h, future_exog.iter().map(|c| c[h]));
            point.push(dot(&x, &self.coefficients));
            let leverage = quadratic_form(&x, &self.xtx_inv).max(0.0);
            std_err.push(self.sigma * (1.0 + leverage).sqrt());
        }

        Ok(ModelForecast { point, std_err })
    }

    fn fitted_values(&self) -> ModelResult<Vec<f64>> {
        if !self.is_fitted {
            return Err(ModelError::NotFitted);
        }
        Ok(self.fitted.clone())
    }

    fn parameter_count(&self) -> usize {
        2 + self.n_exog + 1
    }

    fn uses_exog(&self) -> bool {
        true
    }

    fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}
