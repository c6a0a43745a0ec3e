//! Forecasting models
//!
//! Every model follows the same fit/forecast contract so the ensemble can
//! treat them uniformly. Exogenous regressors are passed column-wise: each
//! column has one value per observation (fit) or per horizon step (forecast).

pub mod arima;
pub mod regression;
pub mod smoothing;

pub use arima::ArimaX;
pub use regression::TrendRegression;
pub use smoothing::DampedHolt;

use crate::error::{ModelError, ModelResult};
use serde::Serialize;

/// Point forecasts with one standard error per horizon step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelForecast {
    pub point: Vec<f64>,
    pub std_err: Vec<f64>,
}

/// Common contract for all forecasting models
pub trait Forecaster {
    /// Short identifier used in reports and CSV output
    fn name(&self) -> &'static str;

    /// Fit to `y` with exogenous `exog` columns (each `y.len()` long)
    fn fit(&mut self, y: &[f64], exog: &[Vec<f64>]) -> ModelResult<()>;

    /// Forecast `steps` ahead given future exogenous columns (each `steps` long)
    fn forecast(&self, steps: usize, future_exog: &[Vec<f64>]) -> ModelResult<ModelForecast>;

    fn predict(&self, steps: usize, future_exog: &[Vec<f64>]) -> ModelResult<Vec<f64>> {
        Ok(self.forecast(steps, future_exog)?.point)
    }

    /// In-sample one-step fitted values, aligned with the tail of the series
    fn fitted_values(&self) -> ModelResult<Vec<f64>>;

    /// Number of estimated parameters (for AIC)
    fn parameter_count(&self) -> usize;

    /// Whether exogenous regressors influence the forecast
    fn uses_exog(&self) -> bool;

    fn is_fitted(&self) -> bool;
}

// ============================================================================
// INPUT CHECKS
// ============================================================================

pub(crate) fn check_series(y: &[f64], required: usize) -> ModelResult<()> {
    if y.len() < required {
        return Err(ModelError::InsufficientData {
            required,
            actual: y.len(),
        });
    }
    if y.iter().any(|v| !v.is_finite()) {
        return Err(ModelError::InvalidData(
            "Series contains NaN or infinite values".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn check_columns(columns: &[Vec<f64>], expected_cols: usize, expected_len: usize) -> ModelResult<()> {
    if columns.len() != expected_cols {
        return Err(ModelError::ExogMismatch {
            expected: expected_cols,
            actual: columns.len(),
        });
    }
    for column in columns {
        if column.len() != expected_len {
            return Err(ModelError::ExogMismatch {
                expected: expected_len,
                actual: column.len(),
            });
        }
        if column.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::InvalidData(
                "Regressor contains NaN or infinite values".to_string(),
            ));
        }
    }
    Ok(())
}

// ============================================================================
// LINEAR ALGEBRA
// ============================================================================

/// Solve `a x = b` by Gaussian elimination with partial pivoting
pub fn solve(a: &[Vec<f64>], b: &[f64]) -> ModelResult<Vec<f64>> {
    let k = b.len();
    if a.len() != k || a.iter().any(|row| row.len() != k) {
        return Err(ModelError::NumericalError(
            "System is not square".to_string(),
        ));
    }

    let mut m: Vec<Vec<f64>> = a
        .iter()
        .zip(b)
        .map(|(row, &rhs)| {
            let mut r = row.clone();
            r.push(rhs);
            r
        })
        .collect();

    for col in 0..k {
        let pivot = (col..k)
            .max_by(|&i, &j| m[i][col].abs().total_cmp(&m[j][col].abs()))
            .unwrap_or(col);
        m.swap(col, pivot);

        if m[col][col].abs() < 1e-10 {
            return Err(ModelError::NumericalError("Singular matrix".to_string()));
        }

        for row in 0..k {
            if row != col {
                let factor = m[row][col] / m[col][col];
                if factor != 0.0 {
                    for j in col..=k {
                        m[row][j] -= factor * m[col][j];
                    }
                }
            }
        }
    }

    Ok((0..k).map(|i| m[i][k] / m[i][i]).collect())
}

/// Inverse of a square matrix, column by column
pub fn invert(a: &[Vec<f64>]) -> ModelResult<Vec<Vec<f64>>> {
    let k = a.len();
    let mut columns = Vec::with_capacity(k);
    for j in 0..k {
        let mut e = vec![0.0; k];
        e[j] = 1.0;
        columns.push(solve(a, &e)?);
    }
    Ok((0..k)
        .map(|i| (0..k).map(|j| columns[j][i]).collect())
        .collect())
}

/// Ordinary least squares fit
#[derive(Debug, Clone)]
pub struct OlsFit {
    pub coefficients: Vec<f64>,
    pub residuals: Vec<f64>,
    /// (X'X)^-1, for parameter uncertainty
    pub xtx_inv: Vec<Vec<f64>>,
}

impl OlsFit {
    pub fn sse(&self) -> f64 {
        self.residuals.iter().map(|r| r * r).sum()
    }
}

/// OLS via the normal equations. `rows` is the design matrix, one row per observation.
pub fn least_squares(rows: &[Vec<f64>], y: &[f64]) -> ModelResult<OlsFit> {
    if rows.len() != y.len() {
        return Err(ModelError::ExogMismatch {
            expected: y.len(),
            actual: rows.len(),
        });
    }
    let k = rows.first().map(|r| r.len()).unwrap_or(0);
    if k == 0 {
        return Ok(OlsFit {
            coefficients: Vec::new(),
            residuals: y.to_vec(),
            xtx_inv: Vec::new(),
        });
    }

    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for (row, &target) in rows.iter().zip(y) {
        for i in 0..k {
            xty[i] += row[i] * target;
            for j in 0..k {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }

    let coefficients = solve(&xtx, &xty)?;
    let xtx_inv = invert(&xtx)?;
    let residuals = rows
        .iter()
        .zip(y)
        .map(|(row, &target)| target - dot(row, &coefficients))
        .collect();

    Ok(OlsFit {
        coefficients,
        residuals,
        xtx_inv,
    })
}

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// x' M x
pub fn quadratic_form(x: &[f64], m: &[Vec<f64>]) -> f64 {
    m.iter()
        .zip(x)
        .map(|(row, &xi)| xi * dot(row, x))
        .sum()
}

/// Akaike information criterion from an SSE over `n` residuals
pub fn aic(sse: f64, n: usize, k: usize) -> f64 {
    if n == 0 {
        return f64::NAN;
    }
    let sigma2 = (sse / n as f64).max(1e-12);
    n as f64 * sigma2.ln() + 2.0 * k as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solve_needs_pivoting() {
        // Zero on the first diagonal entry
        let a = vec![vec![0.0, 2.0], vec![3.0, 1.0]];
        let x = solve(&a, &[4.0, 5.0]).unwrap();

        assert!((x[0] - 1.0).abs() < 1e-10);
        assert!((x[1] - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_solve_singular() {
        let a = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        assert!(matches!(
            solve(&a, &[1.0, 2.0]),
            Err(ModelError::NumericalError(_))
        ));
    }

    #[test]
    fn test_invert_identity_product() {
        let a = vec![vec![4.0, 7.0], vec![2.0, 6.0]];
        let inv = invert(&a).unwrap();

        for i in 0..2 {
            for j in 0..2 {
                let v: f64 = (0..2).map(|k| a[i][k] * inv[k][j]).sum();
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((v - expected).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn test_least_squares_recovers_line() {
        let rows: Vec<Vec<f64>> = (0..6).map(|t| vec![1.0, t as f64]).collect();
        let y: Vec<f64> = (0..6).map(|t| 3.0 + 2.0 * t as f64).collect();

        let fit = least_squares(&rows, &y).unwrap();

        assert!((fit.coefficients[0] - 3.0).abs() < 1e-9);
        assert!((fit.coefficients[1] - 2.0).abs() < 1e-9);
        assert!(fit.sse() < 1e-12);
    }

    #[test]
    fn test_check_columns_mismatch() {
        let cols = vec![vec![0.0, 1.0]];
        assert_eq!(
            check_columns(&cols, 1, 3),
            Err(ModelError::ExogMismatch {
                expected: 3,
                actual: 2
            })
        );
    }
}
