//! Two-stage regression pipeline: column encoding, then an estimator.

use crate::encoding::ColumnEncoder;
use crate::error::Result;
use crate::estimators::{Estimator, ModelFamily, Regressor};
use crate::frame::{ColumnSplit, FeatureFrame};
use crate::params::ParamSet;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionPipeline {
    pub encoder: ColumnEncoder,
    pub estimator: Estimator,
}

impl RegressionPipeline {
    /// Fit the encoder and a freshly built estimator on `frame`.
    pub fn fit(
        family: ModelFamily,
        params: &ParamSet,
        seed: Option<u64>,
        split: &ColumnSplit,
        frame: &FeatureFrame,
        y: &[f64],
    ) -> Result<Self> {
        let mut estimator = family.build(params, seed)?;
        let encoder = ColumnEncoder::fit(frame, y, split)?;
        let x = encoder.transform(frame)?;
        estimator.fit(&x, &Array1::from(y.to_vec()))?;
        Ok(Self { encoder, estimator })
    }

    pub fn predict(&self, frame: &FeatureFrame) -> Result<Vec<f64>> {
        let x = self.encoder.transform(frame)?;
        Ok(self.estimator.predict(&x)?.to_vec())
    }
}
