//! ARIMA(p, d, 0) with exogenous regressors
//!
//! Regression with AR errors: the series and regressors are differenced
//! `d` times, the differenced series is regressed on `[1, Δexog…]` by OLS,
//! and the regression residuals are modelled as AR(p) via Yule-Walker.

use super::{check_columns, check_series, dot, least_squares, Forecaster, ModelForecast};
use crate::error::{ModelError, ModelResult};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ArimaX {
    p: usize,
    d: usize,
    with_drift: bool,
    /// Intercept (drift when d = 1) followed by one coefficient per regressor
    beta: Vec<f64>,
    ar_coeffs: Vec<f64>,
    /// Regression residuals on the differenced scale
    residuals: Vec<f64>,
    /// AR innovations (residuals minus their AR prediction)
    innovations: Vec<f64>,
    sigma: f64,
    last_level: f64,
    last_exog: Vec<f64>,
    fitted: Vec<f64>,
    n_exog: usize,
    is_fitted: bool,
}

impl ArimaX {
    pub fn new(p: usize, d: usize, with_drift: bool) -> ModelResult<Self> {
        if p > 5 {
            return Err(ModelError::InvalidParameter {
                name: "p".to_string(),
                reason: "AR order must be <= 5".to_string(),
            });
        }
        if d > 1 {
            return Err(ModelError::InvalidParameter {
                name: "d".to_string(),
                reason: "Differencing order must be 0 or 1".to_string(),
            });
        }

        Ok(ArimaX {
            p,
            d,
            with_drift,
            beta: Vec::new(),
            ar_coeffs: vec![0.0; p],
            residuals: Vec::new(),
            innovations: Vec::new(),
            sigma: 0.0,
            last_level: 0.0,
            last_exog: Vec::new(),
            fitted: Vec::new(),
            n_exog: 0,
            is_fitted: false,
        })
    }

    /// Minimum series length for `n_exog` regressors
    pub fn min_points(&self, n_exog: usize) -> usize {
        2 * self.p + self.d + n_exog + usize::from(self.with_drift) + 4
    }

    pub fn order(&self) -> (usize, usize, usize) {
        (self.p, self.d, 0)
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar_coeffs
    }

    /// Intercept (if any) then regressor coefficients
    pub fn regression_coefficients(&self) -> &[f64] {
        &self.beta
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    fn design_row(&self, exog_values: &[f64]) -> Vec<f64> {
        let mut row = Vec::with_capacity(exog_values.len() + 1);
        if self.with_drift {
            row.push(1.0);
        }
        row.extend_from_slice(exog_values);
        row
    }

    /// ψ-weights of the AR polynomial, integrated `d` times
    fn psi_weights(&self, steps: usize) -> Vec<f64> {
        let mut psi = vec![0.0; steps];
        for j in 0..steps {
            psi[j] = if j == 0 {
                1.0
            } else {
                (1..=self.p.min(j))
                    .map(|i| self.ar_coeffs[i - 1] * psi[j - i])
                    .sum()
            };
        }
        if self.d == 1 {
            let mut acc = 0.0;
            for w in psi.iter_mut() {
                acc += *w;
                *w = acc;
            }
        }
        psi
    }
}

/// Yule-Walker AR(p) estimate via Levinson-Durbin, coefficients clamped to ±0.99
pub fn yule_walker(data: &[f64], p: usize) -> Vec<f64> {
    if p == 0 || data.len() <= p {
        return vec![0.0; p];
    }

    let n = data.len();
    let mean = data.iter().sum::<f64>() / n as f64;
    let centered: Vec<f64> = data.iter().map(|x| x - mean).collect();

    let autocov: Vec<f64> = (0..=p)
        .map(|k| (k..n).map(|i| centered[i] * centered[i - k]).sum::<f64>() / n as f64)
        .collect();

    if autocov[0].abs() < 1e-10 {
        return vec![0.0; p];
    }

    let mut phi = vec![0.0; p];
    let mut error = autocov[0];
    for k in 0..p {
        let mut acc = autocov[k + 1];
        for j in 0..k {
            acc -= phi[j] * autocov[k - j];
        }
        if error.abs() < 1e-10 {
            break;
        }
        let reflection = acc / error;
        let previous = phi.clone();
        phi[k] = reflection;
        for j in 0..k {
            phi[j] = previous[j] - reflection * previous[k - 1 - j];
        }
        error *= 1.0 - reflection * reflection;
    }

    phi.iter().map(|c| c.clamp(-0.99, 0.99)).collect()
}

fn difference(values: &[f64], d: usize) -> Vec<f64> {
    if d == 0 {
        return values.to_vec();
    }
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

impl Forecaster for ArimaX {
    fn name(&self) -> &'static str {
        "arima"
    }

    fn fit(&mut self, y: &[f64], exog: &[Vec<f64>]) -> ModelResult<()> {
        check_series(y, self.min_points(exog.len()))?;
        check_columns(exog, exog.len(), y.len())?;

        let n = y.len();
        let dy = difference(y, self.d);
        let dx: Vec<Vec<f64>> = exog.iter().map(|c| difference(c, self.d)).collect();
        let m = dy.len();

        let rows: Vec<Vec<f64>> = (0..m)
            .map(|t| {
                let values: Vec<f64> = dx.iter().map(|c| c[t]).collect();
                self.design_row(&values)
            })
            .collect();
        let ols = least_squares(&rows, &dy)?;

        let residuals = ols.residuals;
        let ar_coeffs = yule_walker(&residuals, self.p);

        let mut innovations = Vec::with_capacity(m.saturating_sub(self.p));
        let mut fitted = Vec::with_capacity(m.saturating_sub(self.p));
        for t in self.p..m {
            let ar_part: f64 = (1..=self.p).map(|i| ar_coeffs[i - 1] * residuals[t - i]).sum();
            innovations.push(residuals[t] - ar_part);

            let step = dot(&rows[t], &ols.coefficients) + ar_part;
            // Index in y of the value this step predicts
            let target = t + self.d;
            let base = if self.d == 1 { y[target - 1] } else { 0.0 };
            fitted.push(base + step);
        }

        let dof = innovations.len().saturating_sub(ols.coefficients.len() + self.p).max(1);
        let sse: f64 = innovations.iter().map(|e| e * e).sum();

        self.beta = ols.coefficients;
        self.ar_coeffs = ar_coeffs;
        self.residuals = residuals;
        self.innovations = innovations;
        self.sigma = (sse / dof as f64).sqrt();
        self.last_level = y[n - 1];
        self.last_exog = exog.iter().map(|c| c[n - 1]).collect();
        self.fitted = fitted;
        self.n_exog = exog.len();
        self.is_fitted = true;

        tracing::debug!(
            beta = ?self.beta,
            ar = ?self.ar_coeffs,
            sigma = self.sigma,
            "arima fitted"
        );
        Ok(())
    }

    fn forecast(&self, steps: usize, future_exog: &[Vec<f64>]) -> ModelResult<ModelForecast> {
        if !self.is_fitted {
            return Err(ModelError::NotFitted);
        }
        check_columns(future_exog, self.n_exog, steps)?;

        let mut recent: Vec<f64> = self.residuals.iter().rev().take(self.p).copied().collect();
        let mut previous_exog = self.last_exog.clone();
        let mut level = self.last_level;
        let mut point = Vec::with_capacity(steps);

        for h in 0..steps {
            let current: Vec<f64> = future_exog.iter().map(|c| c[h]).collect();
            let regressors: Vec<f64> = if self.d == 1 {
                current.iter().zip(&previous_exog).map(|(c, p)| c - p).collect()
            } else {
                current.clone()
            };

            let u: f64 = (0..self.p).map(|i| self.ar_coeffs[i] * recent[i]).sum();
            if self.p > 0 {
                recent.insert(0, u);
                recent.truncate(self.p);
            }

            let step = dot(&self.design_row(&regressors), &self.beta) + u;
            level = if self.d == 1 { level + step } else { step };
            point.push(level);
            previous_exog = current;
        }

        let std_err = self
            .psi_weights(steps)
            .iter()
            .scan(0.0, |acc, w| {
                *acc += w * w;
                Some(self.sigma * acc.sqrt())
            })
            .collect();

        Ok(ModelForecast { point, std_err })
    }

    fn fitted_values(&self) -> ModelResult<Vec<f64>> {
        if !self.is_fitted {
            return Err(ModelError::NotFitted);
        }
        Ok(self.fitted.clone())
    }

    fn parameter_count(&self) -> usize {
        usize::from(self.with_drift) + self.n_exog + self.p + 1
    }

    fn uses_exog(&self) -> bool {
        true
    }

    fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yule_walker_ar1() {
        // x_t = 0.6 x_{t-1} + e_t, e from a fixed LCG
        let mut state: u64 = 12345;
        let mut x = vec![0.0];
        for _ in 0..400 {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let e = (state >> 33) as f64 / 2f64.powi(31) - 0.5;
            let last = *x.last().unwrap();
            x.push(0.6 * last + e);
        }

        let phi = yule_walker(&x, 1);
        assert!((phi[0] - 0.6).abs() < 0.15, "phi = {}", phi[0]);
    }

    #[test]
    fn test_yule_walker_clamps() {
        let trend: Vec<f64> = (0..30).map(|t| t as f64).collect();
        let phi = yule_walker(&trend, 1);
        assert!(phi[0] <= 0.99);
    }

    #[test]
    fn test_linear_series_with_drift_extends_trend() {
        let y: Vec<f64> = (0..12).map(|t| 10.0 + 2.0 * t as f64).collect();
        let mut model = ArimaX::new(1, 1, true).unwrap();

        model.fit(&y, &[]).unwrap();
        let fc = model.forecast(3, &[]).unwrap();

        assert!((fc.point[0] - 34.0).abs() < 1e-6);
        assert!((fc.point[2] - 38.0).abs() < 1e-6);
        assert_eq!(fc.std_err.len(), 3);
    }

    #[test]
    fn test_standard_errors_grow_with_horizon() {
        let y = vec![22.0, 26.3, 30.7, 35.0, 35.0, 35.0, 38.7, 42.3, 46.0, 47.5, 45.0, 48.0, 47.2, 48.5];
        let mut model = ArimaX::new(1, 1, true).unwrap();

        model.fit(&y, &[]).unwrap();
        let fc = model.forecast(3, &[]).unwrap();

        assert!(fc.std_err[0] > 0.0);
        assert!(fc.std_err[1] > fc.std_err[0]);
        assert!(fc.std_err[2] > fc.std_err[1]);
    }

    #[test]
    fn test_step_regressor_shifts_level() {
        let mut y: Vec<f64> = (0..14).map(|t| 20.0 + t as f64).collect();
        for v in y.iter_mut().skip(8) {
            *v += 5.0;
        }
        let step: Vec<f64> = (0..14).map(|t| if t >= 8 { 1.0 } else { 0.0 }).collect();

        let mut model = ArimaX::new(1, 1, true).unwrap();
        model.fit(&y, &[step]).unwrap();

        let beta = model.regression_coefficients();
        assert!((beta[0] - 1.0).abs() < 1e-6);
        assert!((beta[1] - 5.0).abs() < 1e-6);

        let fc = model.forecast(2, &[vec![1.0, 1.0]]).unwrap();
        assert!((fc.point[0] - 39.0).abs() < 1e-6);
    }

    #[test]
    fn test_insufficient_data() {
        let mut model = ArimaX::new(1, 1, true).unwrap();
        let result = model.fit(&[1.0, 2.0, 3.0], &[]);

        assert_eq!(
            result,
            Err(ModelError::InsufficientData {
                required: 8,
                actual: 3
            })
        );
        assert!(!model.is_fitted());
    }

    #[test]
    fn test_exog_length_mismatch() {
        let y: Vec<f64> = (0..12).map(|t| t as f64).collect();
        let mut model = ArimaX::new(1, 1, true).unwrap();

        let result = model.fit(&y, &[vec![0.0; 11]]);
        assert!(matches!(result, Err(ModelError::ExogMismatch { .. })));
    }

    #[test]
    fn test_predict_before_fit() {
        let model = ArimaX::new(1, 1, true).unwrap();
        assert_eq!(model.predict(3, &[]), Err(ModelError::NotFitted));
    }

    #[test]
    fn test_rejects_second_differencing() {
        assert!(ArimaX::new(1, 2, true).is_err());
    }
}
