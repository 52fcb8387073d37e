//! CART regression tree with squared-error splits.

use super::{Regressor, check_fit_input, check_predict_input};
use crate::error::{LearningError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Flat node storage; children are indices into the node vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTreeRegressor {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    nodes: Vec<Node>,
    n_features: usize,
}

impl Default for DecisionTreeRegressor {
    fn default() -> Self {
        Self::new()
    }
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    sse: f64,
}

impl DecisionTreeRegressor {
    pub fn new() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            nodes: Vec::new(),
            n_features: 0,
        }
    }

    #[must_use]
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Fit on the rows listed in `indices` (repeats allowed, as in a bootstrap).
    pub(crate) fn fit_rows(&mut self, x: &Array2<f64>, y: &Array1<f64>, indices: &[usize]) -> Result<()> {
        if self.min_samples_split < 2 || self.min_samples_leaf < 1 {
            return Err(LearningError::InvalidConfig(
                "min_samples_split must be >= 2 and min_samples_leaf >= 1".to_string(),
            ));
        }
        self.n_features = x.ncols();
        self.nodes.clear();
        let mut indices = indices.to_vec();
        self.grow(x, y, &mut indices, 0);
        Ok(())
    }

    /// Grow the subtree for `indices` and return its node index.
    fn grow(&mut self, x: &Array2<f64>, y: &Array1<f64>, indices: &mut [usize], depth: usize) -> usize {
        let n = indices.len();
        let sum: f64 = indices.iter().map(|&i| y[i]).sum();
        let mean = sum / n as f64;

        let stop = n < self.min_samples_split
            || n < 2 * self.min_samples_leaf
            || self.max_depth.is_some_and(|d| depth >= d)
            || indices.iter().all(|&i| y[i] == y[indices[0]]);

        let split = if stop { None } else { self.best_split(x, y, indices) };
        let Some(split) = split else {
            self.nodes.push(Node::Leaf { value: mean });
            return self.nodes.len() - 1;
        };

        // Reserve the slot so the parent precedes its children.
        let slot = self.nodes.len();
        self.nodes.push(Node::Leaf { value: mean });

        let (mut left_rows, mut right_rows): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, split.feature]] <= split.threshold);

        let left = self.grow(x, y, &mut left_rows, depth + 1);
        let right = self.grow(x, y, &mut right_rows, depth + 1);
        self.nodes[slot] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        slot
    }

    /// Lowest total child SSE over all features and cut points.
    /// Ties keep the earlier feature and the lower threshold.
    fn best_split(&self, x: &Array2<f64>, y: &Array1<f64>, indices: &mut [usize]) -> Option<BestSplit> {
        let n = indices.len();
        let total_sum: f64 = indices.iter().map(|&i| y[i]).sum();
        let total_sq: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();
        let parent_sse = total_sq - total_sum * total_sum / n as f64;

        let mut best: Option<BestSplit> = None;
        for feature in 0..x.ncols() {
            indices.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for pos in 0..n - 1 {
                let yi = y[indices[pos]];
                left_sum += yi;
                left_sq += yi * yi;

                let left_n = pos + 1;
                let right_n = n - left_n;
                if left_n < self.min_samples_leaf || right_n < self.min_samples_leaf {
                    continue;
                }

                let here = x[[indices[pos], feature]];
                let next = x[[indices[pos + 1], feature]];
                if here == next {
                    continue;
                }

                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let sse = (left_sq - left_sum * left_sum / left_n as f64)
                    + (right_sq - right_sum * right_sum / right_n as f64);

                if best.as_ref().is_none_or(|b| sse < b.sse) {
                    let mut threshold = here + (next - here) / 2.0;
                    // Midpoint can round up to `next` for adjacent floats.
                    if threshold >= next {
                        threshold = here;
                    }
                    best = Some(BestSplit {
                        feature,
                        threshold,
                        sse,
                    });
                }
            }
        }

        best.filter(|b| b.sse < parent_sse)
    }

    fn predict_row(&self, x: &Array2<f64>, row: usize) -> f64 {
        let mut node = 0;
        loop {
            match &self.nodes[node] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if x[[row, *feature]] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

impl Regressor for DecisionTreeRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        let indices: Vec<usize> = (0..x.nrows()).collect();
        self.fit_rows(x, y, &indices)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.nodes.is_empty() {
            return Err(LearningError::InferenceError(
                "decision tree is not fitted".to_string(),
            ));
        }
        check_predict_input(x, self.n_features)?;
        Ok((0..x.nrows()).map(|row| self.predict_row(x, row)).collect())
    }
}
