//! Regression estimator families.
//!
//! Every family implements [`Regressor`]. [`Estimator`] wraps the families in
//! one serialisable enum so a fitted model can be persisted without trait
//! objects, and [`ModelFamily`] builds an estimator from a hyperparameter set.

mod boosting;
mod forest;
mod linear;
mod neural;
mod tree;

pub use boosting::GradientBoostingRegressor;
pub use forest::RandomForestRegressor;
pub use linear::{LassoRegressor, RidgeRegressor};
pub use neural::NeuralNetRegressor;
pub use tree::DecisionTreeRegressor;

use crate::error::{LearningError, Result};
use crate::params::ParamSet;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fit/predict contract shared by all families.
pub trait Regressor: Send + Sync {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;
}

pub(crate) fn check_fit_input(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() == 0 {
        return Err(LearningError::InvalidData(
            "cannot fit on an empty matrix".to_string(),
        ));
    }
    if x.nrows() != y.len() {
        return Err(LearningError::InvalidData(format!(
            "feature rows ({}) and target length ({}) differ",
            x.nrows(),
            y.len()
        )));
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(LearningError::InvalidData(
            "training data contains non-finite values".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn check_predict_input(x: &Array2<f64>, n_features: usize) -> Result<()> {
    if x.ncols() != n_features {
        return Err(LearningError::InferenceError(format!(
            "expected {n_features} features, got {}",
            x.ncols()
        )));
    }
    Ok(())
}

/// The estimator families the selector knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFamily {
    RandomForest,
    GradientBoosting,
    Lasso,
    Ridge,
    NeuralNet,
}

impl ModelFamily {
    /// Declaration order; also the tie-break order during selection.
    pub const ALL: [ModelFamily; 5] = [
        ModelFamily::RandomForest,
        ModelFamily::GradientBoosting,
        ModelFamily::Lasso,
        ModelFamily::Ridge,
        ModelFamily::NeuralNet,
    ];

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ModelFamily::RandomForest => "RandomForestRegressor",
            ModelFamily::GradientBoosting => "GradientBoostingRegressor",
            ModelFamily::Lasso => "Lasso",
            ModelFamily::Ridge => "Ridge",
            ModelFamily::NeuralNet => "SimpleNNRegressor",
        }
    }

    /// Whether the family's constructor takes a random seed.
    #[must_use]
    pub fn accepts_seed(&self) -> bool {
        matches!(
            self,
            ModelFamily::RandomForest | ModelFamily::GradientBoosting | ModelFamily::Lasso | ModelFamily::Ridge
        )
    }

    /// Hyperparameter names accepted by [`build`](Self::build).
    #[must_use]
    pub fn hyperparameters(&self) -> &'static [&'static str] {
        match self {
            ModelFamily::RandomForest => forest::PARAMS,
            ModelFamily::GradientBoosting => boosting::PARAMS,
            ModelFamily::Lasso | ModelFamily::Ridge => linear::PARAMS,
            ModelFamily::NeuralNet => neural::PARAMS,
        }
    }

    /// Build an unfitted estimator.
    ///
    /// `seed` is ignored by families whose constructor takes none; the linear
    /// solvers are deterministic, so for them it is accepted and unused.
    ///
    /// # Errors
    ///
    /// [`LearningError::InvalidConfig`] for unknown names, mistyped values
    /// and out-of-range settings.
    pub fn build(&self, params: &ParamSet, seed: Option<u64>) -> Result<Estimator> {
        Ok(match self {
            ModelFamily::RandomForest => {
                Estimator::RandomForest(RandomForestRegressor::from_params(params, seed)?)
            }
            ModelFamily::GradientBoosting => {
                Estimator::GradientBoosting(GradientBoostingRegressor::from_params(params, seed)?)
            }
            ModelFamily::Lasso => Estimator::Lasso(LassoRegressor::from_params(params)?),
            ModelFamily::Ridge => Estimator::Ridge(RidgeRegressor::from_params(params)?),
            ModelFamily::NeuralNet => Estimator::NeuralNet(NeuralNetRegressor::from_params(params)?),
        })
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelFamily {
    type Err = LearningError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ModelFamily::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| LearningError::InvalidConfig(format!("unknown model family '{s}'")))
    }
}

/// A (possibly fitted) estimator of any family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", content = "state")]
pub enum Estimator {
    RandomForest(RandomForestRegressor),
    GradientBoosting(GradientBoostingRegressor),
    Lasso(LassoRegressor),
    Ridge(RidgeRegressor),
    NeuralNet(NeuralNetRegressor),
}

impl Estimator {
    pub fn family(&self) -> ModelFamily {
        match self {
            Estimator::RandomForest(_) => ModelFamily::RandomForest,
            Estimator::GradientBoosting(_) => ModelFamily::GradientBoosting,
            Estimator::Lasso(_) => ModelFamily::Lasso,
            Estimator::Ridge(_) => ModelFamily::Ridge,
            Estimator::NeuralNet(_) => ModelFamily::NeuralNet,
        }
    }

    /// Effective hyperparameters, defaults included.
    pub fn params(&self) -> ParamSet {
        match self {
            Estimator::RandomForest(m) => m.params(),
            Estimator::GradientBoosting(m) => m.params(),
            Estimator::Lasso(m) => m.params(),
            Estimator::Ridge(m) => m.params(),
            Estimator::NeuralNet(m) => m.params(),
        }
    }

    fn as_regressor(&self) -> &dyn Regressor {
        match self {
            Estimator::RandomForest(m) => m,
            Estimator::GradientBoosting(m) => m,
            Estimator::Lasso(m) => m,
            Estimator::Ridge(m) => m,
            Estimator::NeuralNet(m) => m,
        }
    }

    fn as_regressor_mut(&mut self) -> &mut dyn Regressor {
        match self {
            Estimator::RandomForest(m) => m,
            Estimator::GradientBoosting(m) => m,
            Estimator::Lasso(m) => m,
            Estimator::Ridge(m) => m,
            Estimator::NeuralNet(m) => m,
        }
    }
}

impl Regressor for Estimator {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.as_regressor_mut().fit(x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.as_regressor().predict(x)
    }
}
