//! Exhaustive grid search with k-fold cross-validation.

use crate::error::Result;
use crate::estimators::ModelFamily;
use crate::frame::{ColumnSplit, FeatureFrame};
use crate::metrics::Scoring;
use crate::params::{ParamGrid, ParamSet};
use crate::pipeline::RegressionPipeline;
use crate::split::k_fold;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Cross-validation result for one grid combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinationScore {
    pub params: ParamSet,
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub best_index: usize,
    pub best_params: ParamSet,
    pub best_score: f64,
    pub combinations: Vec<CombinationScore>,
}

/// Grid search over one family.
///
/// Every (combination, fold) pair is evaluated on the current rayon pool;
/// results are gathered by combination index, so the outcome does not depend
/// on scheduling. The encoder is refit on each training fold.
#[derive(Debug, Clone, Copy)]
pub struct GridSearch<'a> {
    pub family: ModelFamily,
    pub grid: &'a ParamGrid,
    pub split: &'a ColumnSplit,
    pub cv_folds: usize,
    pub scoring: Scoring,
    pub seed: Option<u64>,
}

impl GridSearch<'_> {
    pub fn run(&self, frame: &FeatureFrame, y: &[f64]) -> Result<SearchOutcome> {
        let combos = self.grid.combinations();
        let folds = k_fold(frame.n_rows(), self.cv_folds)?;

        let tasks: Vec<(usize, usize)> = (0..combos.len())
            .flat_map(|c| (0..folds.len()).map(move |f| (c, f)))
            .collect();

        let scores: Vec<Result<f64>> = tasks
            .par_iter()
            .map(|&(c, f)| {
                let fold = &folds[f];
                let train_y: Vec<f64> = fold.train.iter().map(|&i| y[i]).collect();
                let valid_y: Vec<f64> = fold.validation.iter().map(|&i| y[i]).collect();

                let pipeline = RegressionPipeline::fit(
                    self.family,
                    &combos[c],
                    self.seed,
                    self.split,
                    &frame.take(&fold.train),
                    &train_y,
                )?;
                let predicted = pipeline.predict(&frame.take(&fold.validation))?;
                Ok(self.scoring.score(&valid_y, &predicted))
            })
            .collect();

        let mut scores = scores.into_iter();
        let mut combinations = Vec::with_capacity(combos.len());
        for params in combos {
            let fold_scores = scores
                .by_ref()
                .take(folds.len())
                .collect::<Result<Vec<f64>>>()?;
            let mean_score = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
            debug!(family = %self.family, params = %params, mean_score, "Combination scored");
            combinations.push(CombinationScore {
                params,
                fold_scores,
                mean_score,
            });
        }

        // Strictly greater wins, so ties keep the lowest index.
        let mut best_index = 0;
        for (i, combo) in combinations.iter().enumerate().skip(1) {
            let best = combinations[best_index].mean_score;
            if combo.mean_score > best || (best.is_nan() && !combo.mean_score.is_nan()) {
                best_index = i;
            }
        }

        let best = &combinations[best_index];
        Ok(SearchOutcome {
            best_index,
            best_params: best.params.clone(),
            best_score: best.mean_score,
            combinations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn linear_frame() -> (FeatureFrame, Vec<f64>) {
        let x: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 3.0 * v + 2.0).collect();
        let df = df! { "X" => x }.unwrap();
        (FeatureFrame::from_frame(&df).unwrap(), y)
    }

    #[test]
    fn test_grid_search_prefers_weaker_penalty_on_clean_data() {
        let (frame, y) = linear_frame();
        let grid = ParamGrid::new().with("alpha", [100.0, 0.01, 10.0]);
        let split = frame.split_columns(&[]);

        let outcome = GridSearch {
            family: ModelFamily::Lasso,
            grid: &grid,
            split: &split,
            cv_folds: 5,
            scoring: Scoring::R2,
            seed: Some(42),
        }
        .run(&frame, &y)
        .unwrap();

        assert_eq!(outcome.combinations.len(), 3);
        assert_eq!(outcome.best_params, ParamSet::new().with("alpha", 0.01));
        assert_eq!(outcome.best_index, 1);
        assert!(outcome.combinations.iter().all(|c| c.fold_scores.len() == 5));
    }

    #[test]
    fn test_ties_keep_lowest_index() {
        let (frame, y) = linear_frame();
        // Identical combinations produce identical scores.
        let grid = ParamGrid::new().with("alpha", [0.5, 0.5]);
        let split = frame.split_columns(&[]);

        let outcome = GridSearch {
            family: ModelFamily::Ridge,
            grid: &grid,
            split: &split,
            cv_folds: 3,
            scoring: Scoring::NegMeanSquaredError,
            seed: None,
        }
        .run(&frame, &y)
        .unwrap();
        assert_eq!(outcome.best_index, 0);
    }

    #[test]
    fn test_invalid_combination_fails_search() {
        let (frame, y) = linear_frame();
        let grid = ParamGrid::new().with("depth", [1i64]);
        let split = frame.split_columns(&[]);

        let result = GridSearch {
            family: ModelFamily::Ridge,
            grid: &grid,
            split: &split,
            cv_folds: 3,
            scoring: Scoring::R2,
            seed: None,
        }
        .run(&frame, &y);
        assert!(result.is_err());
    }
}
