//! Least-squares gradient boosting over shallow regression trees.

use super::tree::DecisionTreeRegressor;
use super::{Regressor, check_fit_input, check_predict_input};
use crate::error::{LearningError, Result};
use crate::params::{ParamSet, ParamValue};
use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

pub(crate) const PARAMS: &[&str] = &["learning_rate", "max_depth", "n_estimators", "subsample"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: Option<usize>,
    /// Fraction of rows drawn (without replacement) for each stage.
    pub subsample: f64,
    pub random_state: Option<u64>,
    init: f64,
    trees: Vec<DecisionTreeRegressor>,
    n_features: usize,
}

impl Default for GradientBoostingRegressor {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: Some(3),
            subsample: 1.0,
            random_state: None,
            init: 0.0,
            trees: Vec::new(),
            n_features: 0,
        }
    }
}

impl GradientBoostingRegressor {
    pub fn from_params(params: &ParamSet, seed: Option<u64>) -> Result<Self> {
        params.ensure_known("GradientBoostingRegressor", PARAMS)?;
        let mut model = Self {
            random_state: seed,
            ..Self::default()
        };
        if let Some(n) = params.usize_param("n_estimators")? {
            model.n_estimators = n;
        }
        if let Some(lr) = params.f64_param("learning_rate")? {
            model.learning_rate = lr;
        }
        if let Some(depth) = params.optional_usize_param("max_depth")? {
            model.max_depth = depth;
        }
        if let Some(fraction) = params.f64_param("subsample")? {
            model.subsample = fraction;
        }

        if model.n_estimators == 0 {
            return Err(LearningError::InvalidConfig(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if !(model.learning_rate > 0.0) {
            return Err(LearningError::InvalidConfig(
                "learning_rate must be positive".to_string(),
            ));
        }
        if !(model.subsample > 0.0 && model.subsample <= 1.0) {
            return Err(LearningError::InvalidConfig(
                "subsample must be in (0, 1]".to_string(),
            ));
        }
        Ok(model)
    }

    pub fn params(&self) -> ParamSet {
        let mut set = ParamSet::new()
            .with("n_estimators", self.n_estimators as i64)
            .with("learning_rate", self.learning_rate)
            .with("max_depth", self.max_depth.map(|d| d as i64))
            .with("subsample", self.subsample);
        if let Some(seed) = self.random_state {
            set.insert("random_state", ParamValue::Int(seed as i64));
        }
        set
    }
}

impl Regressor for GradientBoostingRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        let n = x.nrows();
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(0));
        let stage_rows = ((n as f64 * self.subsample).round() as usize).clamp(1, n);

        self.init = y.sum() / n as f64;
        let mut prediction = Array1::from_elem(n, self.init);
        let mut residual = Array1::zeros(n);
        let mut rows: Vec<usize> = (0..n).collect();
        self.trees.clear();

        for _ in 0..self.n_estimators {
            residual.assign(&(y - &prediction));

            let sample: &[usize] = if stage_rows < n {
                rows.shuffle(&mut rng);
                &rows[..stage_rows]
            } else {
                &rows
            };

            let mut tree = DecisionTreeRegressor::new().with_max_depth(self.max_depth);
            tree.fit_rows(x, &residual, sample)?;
            prediction.scaled_add(self.learning_rate, &tree.predict(x)?);
            self.trees.push(tree);
        }

        self.n_features = x.ncols();
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(LearningError::InferenceError(
                "gradient boosting model is not fitted".to_string(),
            ));
        }
        check_predict_input(x, self.n_features)?;

        let mut out = Array1::from_elem(x.nrows(), self.init);
        for tree in &self.trees {
            out.scaled_add(self.learning_rate, &tree.predict(x)?);
        }
        Ok(out)
    }
}
