//! Model selection across estimator families.
//!
//! [`ModelSelector::select`] holds out a test split, grid-searches every
//! candidate family with k-fold cross-validation on the training split,
//! refits each family's best combination, and keeps the family with the
//! highest cross-validation score.
//!
//! # Example
//!
//! ```rust,ignore
//! use seed_learning::{ModelSelector, SelectionConfig};
//!
//! let config = SelectionConfig::builder().cv_folds(5).build()?;
//! let result = ModelSelector::new(config).select(&features)?;
//! println!("Best model: {}", result.model.model_name());
//! ```

use crate::config::SelectionConfig;
use crate::error::{LearningError, Result};
use crate::estimators::ModelFamily;
use crate::frame::{ColumnSplit, FeatureFrame};
use crate::metrics::RegressionMetrics;
use crate::model::TrainedModel;
use crate::params::{ParamGrid, ParamSet};
use crate::pipeline::RegressionPipeline;
use crate::search::GridSearch;
use crate::split::train_test_split;
use crate::types::{CandidateFailure, Metrics, ModelComparison, SelectionResult, overfitting_risk};
use polars::prelude::DataFrame;
use std::time::Instant;
use tracing::{info, warn};

/// A family and the hyperparameter grid to search for it.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSpec {
    pub family: ModelFamily,
    pub grid: ParamGrid,
}

impl CandidateSpec {
    pub fn new(family: ModelFamily, grid: ParamGrid) -> Self {
        Self { family, grid }
    }
}

/// The standard candidate list, one entry per family in declaration order.
pub fn default_candidates() -> Vec<CandidateSpec> {
    vec![
        CandidateSpec::new(
            ModelFamily::RandomForest,
            ParamGrid::new()
                .with("n_estimators", [100i64, 200, 300])
                .with("max_depth", [None, Some(10i64), Some(20), Some(30)])
                .with("min_samples_split", [2i64, 5, 10])
                .with("min_samples_leaf", [1i64, 2, 4]),
        ),
        CandidateSpec::new(
            ModelFamily::GradientBoosting,
            ParamGrid::new()
                .with("n_estimators", [100i64, 200])
                .with("learning_rate", [0.05, 0.1]),
        ),
        CandidateSpec::new(
            ModelFamily::Lasso,
            ParamGrid::new().with("alpha", [0.01, 0.1, 1.0]),
        ),
        CandidateSpec::new(
            ModelFamily::Ridge,
            ParamGrid::new().with("alpha", [0.01, 0.1, 1.0]),
        ),
        CandidateSpec::new(
            ModelFamily::NeuralNet,
            ParamGrid::new()
                .with("hidden_dim", [32i64, 64])
                .with("lr", [0.01, 0.001])
                .with("epochs", [10i64])
                .with("batch_size", [32i64]),
        ),
    ]
}

/// A candidate that completed grid search and refit.
struct Evaluated {
    comparison: ModelComparison,
    params: ParamSet,
    pipeline: RegressionPipeline,
    metrics: Metrics,
}

/// Rows and columns shared by every candidate of one run.
struct Workspace<'a> {
    split: &'a ColumnSplit,
    train: &'a FeatureFrame,
    train_y: &'a [f64],
    test: &'a FeatureFrame,
    test_y: &'a [f64],
}

/// Runs grid search over a list of candidate families and keeps the best.
#[derive(Debug, Clone)]
pub struct ModelSelector {
    config: SelectionConfig,
    candidates: Vec<CandidateSpec>,
}

impl ModelSelector {
    /// Selector over [`default_candidates()`].
    pub fn new(config: SelectionConfig) -> Self {
        Self {
            config,
            candidates: default_candidates(),
        }
    }

    /// Replace the candidate list. Declaration order is the tie-break order.
    #[must_use]
    pub fn with_candidates(mut self, candidates: Vec<CandidateSpec>) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    pub fn candidates(&self) -> &[CandidateSpec] {
        &self.candidates
    }

    /// Select the best pipeline for predicting the configured target from
    /// every other column of `df`.
    ///
    /// # Errors
    ///
    /// - [`LearningError::InvalidConfig`] for an empty candidate list or a
    ///   grid key without values
    /// - [`LearningError::TargetNotFound`] if the target column is absent
    /// - [`LearningError::InvalidData`] if the table is too small to split
    /// - [`LearningError::CandidateFailed`] when a family fails and failures
    ///   are not isolated
    /// - [`LearningError::TrainingFailed`] when every isolated family failed
    pub fn select(&self, df: &DataFrame) -> Result<SelectionResult> {
        let started = Instant::now();
        self.validate_candidates()?;

        let (frame, y) = FeatureFrame::with_target(df, &self.config.target_column)?;
        let split = frame.split_columns(&self.config.ordinal_columns);
        info!(
            rows = frame.n_rows(),
            features = frame.n_columns(),
            target_encoded = ?split.target_encoded,
            ordinal = ?split.ordinal,
            numeric = split.numeric.len(),
            "Starting model selection"
        );

        let rows = train_test_split(frame.n_rows(), self.config.test_size, self.config.random_seed)?;
        let take = |idx: &[usize]| -> Vec<f64> { idx.iter().map(|&i| y[i]).collect() };
        let (train, train_y) = (frame.take(&rows.train), take(&rows.train));
        let (test, test_y) = (frame.take(&rows.test), take(&rows.test));
        if train.n_rows() < self.config.cv_folds {
            return Err(LearningError::InvalidData(format!(
                "{} training rows cannot be split into {} folds",
                train.n_rows(),
                self.config.cv_folds
            )));
        }

        let workspace = Workspace {
            split: &split,
            train: &train,
            train_y: &train_y,
            test: &test,
            test_y: &test_y,
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.num_threads())
            .build()
            .map_err(|e| LearningError::TrainingFailed(format!("thread pool: {e}")))?;

        let mut evaluated = Vec::with_capacity(self.candidates.len());
        let mut failures = Vec::new();
        for candidate in &self.candidates {
            let family = candidate.family;
            match pool.install(|| self.evaluate(candidate, &workspace)) {
                Ok(result) => evaluated.push(result),
                Err(e) if self.config.isolate_candidate_failures => {
                    warn!(family = %family, error = %e, "Candidate failed, continuing");
                    failures.push(CandidateFailure {
                        name: family.name().to_string(),
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    return Err(LearningError::CandidateFailed {
                        family: family.name().to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        if evaluated.is_empty() {
            let names: Vec<&str> = failures.iter().map(|f| f.name.as_str()).collect();
            return Err(LearningError::TrainingFailed(format!(
                "every candidate failed: {}",
                names.join(", ")
            )));
        }

        let comparisons: Vec<ModelComparison> =
            evaluated.iter().map(|e| e.comparison.clone()).collect();
        let best = best_candidate(&comparisons);
        let winner = evaluated.swap_remove(best);
        info!(
            model = %winner.comparison.name,
            cv_score = winner.metrics.cv_score,
            test_r2 = winner.metrics.test_score,
            test_rmse = winner.metrics.rmse,
            "Selected best model"
        );

        let model = TrainedModel::new(
            self.config.target_column.clone(),
            frame.names().to_vec(),
            winner.params,
            winner.pipeline,
            winner.metrics,
        );

        Ok(SelectionResult {
            model,
            comparisons,
            failures,
            training_time_seconds: started.elapsed().as_secs_f64(),
        })
    }

    fn validate_candidates(&self) -> Result<()> {
        if self.candidates.is_empty() {
            return Err(LearningError::InvalidConfig(
                "candidate list is empty".to_string(),
            ));
        }
        for candidate in &self.candidates {
            if candidate.grid.is_empty() {
                return Err(LearningError::InvalidConfig(format!(
                    "grid for {} has a parameter without values",
                    candidate.family
                )));
            }
        }
        Ok(())
    }

    fn num_threads(&self) -> usize {
        // 0 lets rayon pick one thread per core.
        usize::try_from(self.config.n_jobs).unwrap_or(0)
    }

    fn evaluate(&self, candidate: &CandidateSpec, ws: &Workspace<'_>) -> Result<Evaluated> {
        let started = Instant::now();
        let family = candidate.family;
        let seed = family
            .accepts_seed()
            .then_some(self.config.random_seed);
        info!(family = %family, combinations = candidate.grid.len(), "Grid search started");

        let search = GridSearch {
            family,
            grid: &candidate.grid,
            split: ws.split,
            cv_folds: self.config.cv_folds,
            scoring: self.config.scoring,
            seed,
        }
        .run(ws.train, ws.train_y)?;

        let pipeline = RegressionPipeline::fit(
            family,
            &search.best_params,
            seed,
            ws.split,
            ws.train,
            ws.train_y,
        )?;
        let train_score = RegressionMetrics::compute(ws.train_y, &pipeline.predict(ws.train)?).r2;
        let test = RegressionMetrics::compute(ws.test_y, &pipeline.predict(ws.test)?);

        let metrics = Metrics {
            cv_score: search.best_score,
            train_score,
            test_score: test.r2,
            mse: test.mse,
            rmse: test.rmse,
            mae: test.mae,
            r2: test.r2,
        };
        let comparison = ModelComparison {
            name: family.name().to_string(),
            cv_score: search.best_score,
            test_score: test.r2,
            train_score,
            test_rmse: test.rmse,
            training_time_seconds: started.elapsed().as_secs_f64(),
            hyperparameters: search.best_params.clone(),
            combinations_evaluated: search.combinations.len(),
            overfitting_risk: overfitting_risk(train_score, test.r2).to_string(),
        };
        info!(
            family = %family,
            params = %search.best_params,
            cv_score = search.best_score,
            test_r2 = test.r2,
            test_rmse = test.rmse,
            "Candidate evaluated"
        );

        Ok(Evaluated {
            comparison,
            params: search.best_params,
            pipeline,
            metrics,
        })
    }
}

/// Index of the comparison with the highest CV score; ties keep the earliest.
///
/// The test score never takes part.
pub fn best_candidate(comparisons: &[ModelComparison]) -> usize {
    let mut best = 0;
    for (i, c) in comparisons.iter().enumerate().skip(1) {
        let current = comparisons[best].cv_score;
        if c.cv_score > current || (current.is_nan() && !c.cv_score.is_nan()) {
            best = i;
        }
    }
    best
}
