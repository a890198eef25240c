use std::fmt;

use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::dataset::Label;
use crate::error::{PipelineError, Result, Stage};
use crate::models::classifier_trait::{check_prediction_inputs, check_training_inputs, ClassifierModel};

/// Gradient Boosting Decision Tree (GBDT) classifier
///
/// Trained with the log-likelihood loss, which expects labels in {-1, 1} and
/// returns the positive-class probability from `predict`.
#[derive(Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    iterations: usize,
    max_depth: u32,
    min_leaf_size: usize,
    shrinkage: f32,
    n_features: Option<usize>,
    model: Option<GBDT>,
}

impl GradientBoostedTrees {
    pub fn new(iterations: usize, max_depth: u32, min_leaf_size: usize, shrinkage: f32) -> Self {
        GradientBoostedTrees {
            iterations,
            max_depth,
            min_leaf_size,
            shrinkage,
            n_features: None,
            model: None,
        }
    }

    fn to_data_vec(x: &Array2<f64>, y: Option<&[Label]>) -> DataVec {
        let mut data = DataVec::with_capacity(x.nrows());
        for (i, row) in x.outer_iter().enumerate() {
            let features: Vec<f32> = row.iter().map(|&v| v as f32).collect();
            let label = match y {
                Some(labels) if labels[i] == 1 => 1.0,
                Some(_) => -1.0,
                None => 0.0,
            };
            data.push(Data::new_training_data(features, 1.0, label, None));
        }
        data
    }
}

impl fmt::Debug for GradientBoostedTrees {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GradientBoostedTrees")
            .field("iterations", &self.iterations)
            .field("max_depth", &self.max_depth)
            .field("min_leaf_size", &self.min_leaf_size)
            .field("shrinkage", &self.shrinkage)
            .field("fitted", &self.model.is_some())
            .finish()
    }
}

impl ClassifierModel for GradientBoostedTrees {
    fn fit(&mut self, x: &Array2<f64>, y: &[Label]) -> Result<()> {
        check_training_inputs(x, y, self.name())?;
        if self.iterations == 0 || self.max_depth == 0 {
            return Err(PipelineError::training(
                Stage::ModelSearch,
                format!(
                    "gradient boosting: iterations ({}) and max_depth ({}) must be positive",
                    self.iterations, self.max_depth
                ),
            ));
        }

        let mut config = Config::new();
        config.set_feature_size(x.ncols());
        config.set_shrinkage(self.shrinkage);
        config.set_max_depth(self.max_depth);
        config.set_min_leaf_size(self.min_leaf_size);
        config.set_iterations(self.iterations);
        config.set_loss("LogLikelyhood");
        config.set_debug(false);

        let mut gbdt = GBDT::new(&config);
        let mut train_x = Self::to_data_vec(x, Some(y));
        gbdt.fit(&mut train_x);

        self.model = Some(gbdt);
        self.n_features = Some(x.ncols());
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Vec<f64>> {
        check_prediction_inputs(x, self.n_features, self.name())?;
        let model = self.model.as_ref().ok_or_else(|| {
            PipelineError::training(Stage::Inference, "gradient boosting: model has not been fitted")
        })?;
        let test_x = Self::to_data_vec(x, None);
        Ok(model
            .predict(&test_x)
            .into_iter()
            .map(|p| p as f64)
            .collect())
    }

    fn name(&self) -> &str {
        "gradient_boosting"
    }
}
