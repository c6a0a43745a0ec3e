//! Holt exponential smoothing with a damped trend
//!
//! Level `l` and trend `b` are updated as
//! `l' = αy + (1-α)(l + φb)`, `b' = β(l' - l) + (1-β)φb`, and the h-step
//! forecast is `l + (φ + φ² + … + φ^h) b`.

use super::{check_series, Forecaster, ModelForecast};
use crate::error::{ModelError, ModelResult};
use serde::Serialize;

const GRID: [f64; 9] = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9];
const DAMPING_GRID: [f64; 5] = [0.80, 0.85, 0.90, 0.95, 0.98];

#[derive(Debug, Clone, Serialize)]
pub struct DampedHolt {
    alpha: f64,
    beta: f64,
    phi: f64,
    /// Grid-search the parameters on fit
    auto: bool,
    level: f64,
    trend: f64,
    sigma: f64,
    fitted: Vec<f64>,
    is_fitted: bool,
}

struct Pass {
    sse: f64,
    level: f64,
    trend: f64,
    fitted: Vec<f64>,
}

fn run(y: &[f64], alpha: f64, beta: f64, phi: f64) -> Pass {
    let mut level = y[0];
    let mut trend = y[1] - y[0];
    let mut sse = 0.0;
    let mut fitted = Vec::with_capacity(y.len() - 1);

    for &value in &y[1..] {
        let forecast = level + phi * trend;
        sse += (value - forecast).powi(2);
        fitted.push(forecast);

        let new_level = alpha * value + (1.0 - alpha) * (level + phi * trend);
        trend = beta * (new_level - level) + (1.0 - beta) * phi * trend;
        level = new_level;
    }

    Pass {
        sse,
        level,
        trend,
        fitted,
    }
}

impl DampedHolt {
    pub const MIN_POINTS: usize = 4;

    /// Parameters chosen by grid search on fit
    pub fn auto() -> Self {
        DampedHolt {
            alpha: 0.5,
            beta: 0.1,
            phi: 0.9,
            auto: true,
            level: 0.0,
            trend: 0.0,
            sigma: 0.0,
            fitted: Vec::new(),
            is_fitted: false,
        }
    }

    /// Fixed smoothing parameters
    pub fn new(alpha: f64, beta: f64, phi: f64) -> ModelResult<Self> {
        for (name, value) in [("alpha", alpha), ("beta", beta), ("phi", phi)] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ModelError::InvalidParameter {
                    name: name.to_string(),
                    reason: "must be in (0, 1]".to_string(),
                });
            }
        }
        Ok(DampedHolt {
            alpha,
            beta,
            phi,
            auto: false,
            ..Self::auto()
        })
    }

    pub fn params(&self) -> (f64, f64, f64) {
        (self.alpha, self.beta, self.phi)
    }

    pub fn components(&self) -> (f64, f64) {
        (self.level, self.trend)
    }
}

impl Forecaster for DampedHolt {
    fn name(&self) -> &'static str {
        "ets"
    }

    fn fit(&mut self, y: &[f64], _exog: &[Vec<f64>]) -> ModelResult<()> {
        check_series(y, Self::MIN_POINTS)?;

        if self.auto {
            let mut best: Option<(f64, f64, f64, f64)> = None;
            for &alpha in &GRID {
                for &beta in &GRID {
                    for &phi in &DAMPING_GRID {
                        let sse = run(y, alpha, beta, phi).sse;
                        if best.map_or(true, |(best_sse, ..)| sse < best_sse) {
                            best = Some((sse, alpha, beta, phi));
                        }
                    }
                }
            }
            if let Some((_, alpha, beta, phi)) = best {
                self.alpha = alpha;
                self.beta = beta;
                self.phi = phi;
            }
        }

        let pass = run(y, self.alpha, self.beta, self.phi);
        if !pass.sse.is_finite() {
            return Err(ModelError::NumericalError(
                "Smoothing diverged".to_string(),
            ));
        }

        self.sigma = (pass.sse / pass.fitted.len() as f64).sqrt();
        self.level = pass.level;
        self.trend = pass.trend;
        self.fitted = pass.fitted;
        self.is_fitted = true;

        tracing::debug!(
            alpha = self.alpha,
            beta = self.beta,
            phi = self.phi,
            sigma = self.sigma,
            "damped holt fitted"
        );
        Ok(())
    }

    fn forecast(&self, steps: usize, _future_exog: &[Vec<f64>]) -> ModelResult<ModelForecast> {
        if !self.is_fitted {
            return Err(ModelError::NotFitted);
        }

        let mut point = Vec::with_capacity(steps);
        let mut std_err = Vec::with_capacity(steps);
        let mut damp_sum: f64 = 0.0;
        let mut phi_power: f64 = 1.0;
        let mut variance_sum: f64 = 1.0;

        for _ in 0..steps {
            phi_power *= self.phi;
            damp_sum += phi_power;
            point.push(self.level + damp_sum * self.trend);

            std_err.push(self.sigma * variance_sum.sqrt());
            // c_h = α(1 + β(φ + … + φ^h)) feeds the next horizon
            let c = self.alpha * (1.0 + self.beta * damp_sum);
            variance_sum += c * c;
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
        5
    }

    fn uses_exog(&self) -> bool {
        false
    }

    fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ownership_grid() -> Vec<f64> {
        vec![
            22.0, 26.333333333333332, 30.666666666666668, 35.0, 35.0, 35.0, 35.0, 37.75, 40.5,
            43.25, 46.0, 46.833333333333336, 47.666666666666664, 48.5,
        ]
    }

    #[test]
    fn test_constant_series_stays_flat() {
        let mut model = DampedHolt::auto();
        model.fit(&[5.0; 8], &[]).unwrap();

        let fc = model.predict(3, &[]).unwrap();
        for v in fc {
            assert!((v - 5.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_damped_forecast_flattens() {
        let mut model = DampedHolt::auto();
        model.fit(&ownership_grid(), &[]).unwrap();

        let fc = model.forecast(10, &[]).unwrap();
        let first_step = fc.point[1] - fc.point[0];
        let last_step = fc.point[9] - fc.point[8];

        assert!(last_step.abs() < first_step.abs());
        assert!(fc.std_err.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn test_forecast_std_err_grows_from_sigma() {
        let mut model = DampedHolt::auto();
        model.fit(&ownership_grid(), &[]).unwrap();

        let fc = model.forecast(4, &[]).unwrap();
        assert_eq!(fc.std_err.len(), 4);
        assert!((fc.std_err[0] - model.sigma).abs() < 1e-12);
        assert!(fc.std_err.iter().all(|se| se.is_finite()));
        assert!(fc.std_err.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_fixed_params_respected() {
        let mut model = DampedHolt::new(0.3, 0.2, 0.9).unwrap();
        model.fit(&ownership_grid(), &[]).unwrap();

        assert_eq!(model.params(), (0.3, 0.2, 0.9));
        assert_eq!(model.fitted_values().unwrap().len(), 13);
    }

    #[test]
    fn test_invalid_alpha() {
        assert!(matches!(
            DampedHolt::new(1.5, 0.2, 0.9),
            Err(ModelError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_insufficient_data() {
        let mut model = DampedHolt::auto();
        assert_eq!(
            model.fit(&[1.0, 2.0, 3.0], &[]),
            Err(ModelError::InsufficientData {
                required: 4,
                actual: 3
            })
        );
    }
}
