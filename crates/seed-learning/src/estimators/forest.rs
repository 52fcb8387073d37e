//! Bagged regression trees.

use super::tree::DecisionTreeRegressor;
use super::{Regressor, check_fit_input, check_predict_input};
use crate::error::{LearningError, Result};
use crate::params::{ParamSet, ParamValue};
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

pub(crate) const PARAMS: &[&str] = &[
    "max_depth",
    "min_samples_leaf",
    "min_samples_split",
    "n_estimators",
];

/// Random forest: each tree sees a bootstrap sample of the rows and every
/// feature; the prediction is the mean over trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub random_state: Option<u64>,
    trees: Vec<DecisionTreeRegressor>,
    n_features: usize,
}

impl Default for RandomForestRegressor {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            random_state: None,
            trees: Vec::new(),
            n_features: 0,
        }
    }
}

impl RandomForestRegressor {
    pub fn from_params(params: &ParamSet, seed: Option<u64>) -> Result<Self> {
        params.ensure_known("RandomForestRegressor", PARAMS)?;
        let mut forest = Self {
            random_state: seed,
            ..Self::default()
        };
        if let Some(n) = params.usize_param("n_estimators")? {
            forest.n_estimators = n;
        }
        if let Some(depth) = params.optional_usize_param("max_depth")? {
            forest.max_depth = depth;
        }
        if let Some(n) = params.usize_param("min_samples_split")? {
            forest.min_samples_split = n;
        }
        if let Some(n) = params.usize_param("min_samples_leaf")? {
            forest.min_samples_leaf = n;
        }
        if forest.n_estimators == 0 {
            return Err(LearningError::InvalidConfig(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        Ok(forest)
    }

    pub fn params(&self) -> ParamSet {
        let mut set = ParamSet::new()
            .with("n_estimators", self.n_estimators as i64)
            .with("max_depth", self.max_depth.map(|d| d as i64))
            .with("min_samples_split", self.min_samples_split as i64)
            .with("min_samples_leaf", self.min_samples_leaf as i64);
        if let Some(seed) = self.random_state {
            set.insert("random_state", ParamValue::Int(seed as i64));
        }
        set
    }
}

impl Regressor for RandomForestRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        let n_samples = x.nrows();
        let base_seed = self.random_state.unwrap_or(0);

        // Per-tree seeds keep the result independent of thread scheduling.
        let trees = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(tree_idx as u64));
                let sample: Vec<usize> = (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();

                let mut tree = DecisionTreeRegressor::new()
                    .with_max_depth(self.max_depth)
                    .with_min_samples_split(self.min_samples_split)
                    .with_min_samples_leaf(self.min_samples_leaf);
                tree.fit_rows(x, y, &sample)?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        self.trees = trees;
        self.n_features = x.ncols();
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(LearningError::InferenceError(
                "random forest is not fitted".to_string(),
            ));
        }
        check_predict_input(x, self.n_features)?;

        let mut total = Array1::zeros(x.nrows());
        for tree in &self.trees {
            total += &tree.predict(x)?;
        }
        Ok(total / self.trees.len() as f64)
    }
}
