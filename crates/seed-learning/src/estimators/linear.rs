//! Penalised linear models with an unpenalised intercept.

use super::{Regressor, check_fit_input, check_predict_input};
use crate::error::{LearningError, Result};
use crate::params::ParamSet;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

pub(crate) const PARAMS: &[&str] = &["alpha"];

/// Solve the symmetric positive-definite system `a · x = b` by Cholesky.
/// Returns `None` when `a` is not positive definite.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 || !diag.is_finite() {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // L · z = b
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * z[j];
        }
        z[i] = (b[i] - sum) / l[[i, i]];
    }

    // Lᵀ · x = z
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (z[i] - sum) / l[[i, i]];
    }
    Some(x)
}

/// Column means of `x` and mean of `y`, plus both centred.
fn center(x: &Array2<f64>, y: &Array1<f64>) -> (Array2<f64>, Array1<f64>, Array1<f64>, f64) {
    let n = x.nrows() as f64;
    let x_mean = x.sum_axis(Axis(0)) / n;
    let y_mean = y.sum() / n;
    let x_c = x - &x_mean.view().insert_axis(Axis(0));
    let y_c = y - y_mean;
    (x_c, y_c, x_mean, y_mean)
}

fn alpha_param(family: &str, params: &ParamSet) -> Result<f64> {
    params.ensure_known(family, PARAMS)?;
    let alpha = params.f64_param("alpha")?.unwrap_or(1.0);
    if !(alpha >= 0.0 && alpha.is_finite()) {
        return Err(LearningError::InvalidConfig(format!(
            "{family} alpha must be finite and non-negative"
        )));
    }
    Ok(alpha)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct LinearFit {
    coefficients: Array1<f64>,
    intercept: f64,
}

impl LinearFit {
    fn predict(&self, family: &str, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.coefficients.is_empty() {
            return Err(LearningError::InferenceError(format!("{family} is not fitted")));
        }
        check_predict_input(x, self.coefficients.len())?;
        Ok(x.dot(&self.coefficients) + self.intercept)
    }
}

/// L2-penalised least squares, closed form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RidgeRegressor {
    pub alpha: f64,
    fit: LinearFit,
}

impl Default for RidgeRegressor {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            fit: LinearFit::default(),
        }
    }
}

impl RidgeRegressor {
    pub fn from_params(params: &ParamSet) -> Result<Self> {
        Ok(Self {
            alpha: alpha_param("Ridge", params)?,
            ..Self::default()
        })
    }

    pub fn params(&self) -> ParamSet {
        ParamSet::new().with("alpha", self.alpha)
    }

    pub fn coefficients(&self) -> &Array1<f64> {
        &self.fit.coefficients
    }
}

impl Regressor for RidgeRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        let (x_c, y_c, x_mean, y_mean) = center(x, y);

        let mut gram = x_c.t().dot(&x_c);
        // A tiny jitter keeps the unpenalised (alpha = 0) case solvable for
        // collinear columns.
        let jitter = 1e-10 * (1.0 + gram.diag().iter().map(|v| v.abs()).sum::<f64>());
        for i in 0..gram.nrows() {
            gram[[i, i]] += self.alpha + jitter;
        }
        let rhs = x_c.t().dot(&y_c);

        let coefficients = cholesky_solve(&gram, &rhs).ok_or_else(|| {
            LearningError::TrainingFailed("Ridge normal equations are singular".to_string())
        })?;
        let intercept = y_mean - coefficients.dot(&x_mean);
        self.fit = LinearFit {
            coefficients,
            intercept,
        };
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.fit.predict("Ridge", x)
    }
}

/// L1-penalised least squares by cyclic coordinate descent.
///
/// Minimises `(1 / 2n)·‖y − Xw‖² + alpha·‖w‖₁`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LassoRegressor {
    pub alpha: f64,
    pub max_iter: usize,
    pub tol: f64,
    fit: LinearFit,
}

impl Default for LassoRegressor {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            max_iter: 1000,
            tol: 1e-4,
            fit: LinearFit::default(),
        }
    }
}

fn soft_threshold(value: f64, threshold: f64) -> f64 {
    if value > threshold {
        value - threshold
    } else if value < -threshold {
        value + threshold
    } else {
        0.0
    }
}

impl LassoRegressor {
    pub fn from_params(params: &ParamSet) -> Result<Self> {
        Ok(Self {
            alpha: alpha_param("Lasso", params)?,
            ..Self::default()
        })
    }

    pub fn params(&self) -> ParamSet {
        ParamSet::new().with("alpha", self.alpha)
    }

    pub fn coefficients(&self) -> &Array1<f64> {
        &self.fit.coefficients
    }
}

impl Regressor for LassoRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        let n_features = x.ncols();
        let (x_c, y_c, x_mean, y_mean) = center(x, y);

        let col_norms: Vec<f64> = (0..n_features)
            .map(|j| x_c.column(j).mapv(|v| v * v).sum())
            .collect();
        let lambda = self.alpha * x.nrows() as f64;

        let mut w = Array1::<f64>::zeros(n_features);
        let mut residual = y_c.clone();

        for _ in 0..self.max_iter {
            let mut max_change = 0.0f64;
            let mut max_weight = 0.0f64;

            for j in 0..n_features {
                if col_norms[j] < 1e-15 {
                    continue;
                }
                let column = x_c.column(j);
                let rho = column.dot(&residual) + col_norms[j] * w[j];
                let updated = soft_threshold(rho, lambda) / col_norms[j];
                let delta = w[j] - updated;
                if delta != 0.0 {
                    residual.scaled_add(delta, &column);
                    w[j] = updated;
                }
                max_change = max_change.max(delta.abs());
                max_weight = max_weight.max(updated.abs());
            }

            if max_weight == 0.0 || max_change / max_weight < self.tol {
                break;
            }
        }

        let intercept = y_mean - w.dot(&x_mean);
        self.fit = LinearFit {
            coefficients: w,
            intercept,
        };
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.fit.predict("Lasso", x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn linear_data() -> (Array2<f64>, Array1<f64>) {
        let x = array![[1.0, 2.0], [2.0, 1.0], [3.0, 4.0], [4.0, 3.0], [5.0, 6.0]];
        let y = x.column(0).mapv(|v| 3.0 * v) + &x.column(1).mapv(|v| -2.0 * v) + 7.0;
        (x, y)
    }

    #[test]
    fn test_ridge_recovers_coefficients_with_small_alpha() {
        let (x, y) = linear_data();
        let mut ridge = RidgeRegressor::from_params(&ParamSet::new().with("alpha", 1e-9)).unwrap();
        ridge.fit(&x, &y).unwrap();

        let coef = ridge.coefficients();
        assert!((coef[0] - 3.0).abs() < 1e-4);
        assert!((coef[1] + 2.0).abs() < 1e-4);
        let pred = ridge.predict(&array![[0.0, 0.0]]).unwrap();
        assert!((pred[0] - 7.0).abs() < 1e-3);
    }

    #[test]
    fn test_ridge_shrinks_with_alpha() {
        let (x, y) = linear_data();
        let mut weak = RidgeRegressor::from_params(&ParamSet::new().with("alpha", 0.01)).unwrap();
        let mut strong = RidgeRegressor::from_params(&ParamSet::new().with("alpha", 100.0)).unwrap();
        weak.fit(&x, &y).unwrap();
        strong.fit(&x, &y).unwrap();

        let norm = |c: &Array1<f64>| c.mapv(|v| v * v).sum();
        assert!(norm(strong.coefficients()) < norm(weak.coefficients()));
    }

    #[test]
    fn test_lasso_zeroes_irrelevant_feature() {
        let x = Array2::from_shape_fn((30, 2), |(i, j)| {
            if j == 0 { i as f64 } else { ((i * 7) % 5) as f64 }
        });
        let y = x.column(0).mapv(|v| 2.0 * v + 1.0);

        let mut lasso = LassoRegressor::from_params(&ParamSet::new().with("alpha", 0.5)).unwrap();
        lasso.fit(&x, &y).unwrap();
        let coef = lasso.coefficients();
        assert!(coef[0] > 1.5);
        assert_eq!(coef[1], 0.0);
    }

    #[test]
    fn test_soft_threshold() {
        assert_eq!(soft_threshold(3.0, 1.0), 2.0);
        assert_eq!(soft_threshold(-3.0, 1.0), -2.0);
        assert_eq!(soft_threshold(0.5, 1.0), 0.0);
    }

    #[test]
    fn test_negative_alpha_rejected() {
        assert!(RidgeRegressor::from_params(&ParamSet::new().with("alpha", -1.0)).is_err());
        assert!(LassoRegressor::from_params(&ParamSet::new().with("gamma", 1.0)).is_err());
    }
}
