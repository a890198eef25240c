//! Single decision tree backed by `linfa-trees`.
use std::fmt;

use linfa::traits::{Fit, Predict};
use linfa::Dataset;
use linfa_trees::{DecisionTree as LinfaTree, SplitQuality};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::dataset::Label;
use crate::error::{PipelineError, Result, Stage};
use crate::models::classifier_trait::{check_prediction_inputs, check_training_inputs, ClassifierModel};

/// Impurity measure used to score candidate splits.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SplitCriterion {
    Gini,
    Entropy,
}

impl SplitCriterion {
    fn quality(&self) -> SplitQuality {
        match self {
            SplitCriterion::Gini => SplitQuality::Gini,
            SplitCriterion::Entropy => SplitQuality::Entropy,
        }
    }
}

impl fmt::Display for SplitCriterion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SplitCriterion::Gini => f.write_str("gini"),
            SplitCriterion::Entropy => f.write_str("entropy"),
        }
    }
}

/// Decision tree classifier.
///
/// `min_samples_split` maps to linfa's `min_weight_split` with unit sample
/// weights. Leaves give hard votes, so `predict_proba` is 0.0 or 1.0.
#[derive(Serialize, Deserialize, Debug)]
pub struct DecisionTree {
    criterion: SplitCriterion,
    max_depth: Option<usize>,
    min_samples_split: usize,
    n_features: Option<usize>,
    model: Option<LinfaTree<f64, usize>>,
}

impl DecisionTree {
    pub fn new(criterion: SplitCriterion, max_depth: Option<usize>, min_samples_split: usize) -> Self {
        DecisionTree {
            criterion,
            max_depth,
            min_samples_split: min_samples_split.max(2),
            n_features: None,
            model: None,
        }
    }

    /// Depth of the fitted tree, if fitted.
    pub fn depth(&self) -> Option<usize> {
        self.model.as_ref().map(|m| m.max_depth())
    }

    /// Number of leaves of the fitted tree, if fitted.
    pub fn leaf_count(&self) -> Option<usize> {
        self.model.as_ref().map(|m| m.num_leaves())
    }

    fn labels(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        check_prediction_inputs(x, self.n_features, self.name())?;
        let model = self.model.as_ref().ok_or_else(|| {
            PipelineError::training(Stage::Inference, format!("{}: model has not been fitted", self.name()))
        })?;
        Ok(model.predict(x))
    }
}

impl ClassifierModel for DecisionTree {
    fn fit(&mut self, x: &Array2<f64>, y: &[Label]) -> Result<()> {
        check_training_inputs(x, y, self.name())?;
        if self.max_depth == Some(0) {
            return Err(PipelineError::training(
                Stage::ModelSearch,
                "decision tree: max_depth must be at least 1",
            ));
        }

        let targets: Array1<usize> = y.iter().map(|&l| usize::from(l)).collect();
        let dataset = Dataset::new(x.clone(), targets);

        let fitted = LinfaTree::params()
            .split_quality(self.criterion.quality())
            .max_depth(self.max_depth)
            .min_weight_split(self.min_samples_split as f32)
            .min_weight_leaf(1.0)
            .fit(&dataset)
            .map_err(|e| {
                PipelineError::training_with(
                    Stage::ModelSearch,
                    format!("decision tree failed to fit ({})", self.criterion),
                    e,
                )
            })?;

        log::trace!(
            "Decision tree fitted with {} leaves, depth {}",
            fitted.num_leaves(),
            fitted.max_depth()
        );

        self.n_features = Some(x.ncols());
        self.model = Some(fitted);
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Vec<f64>> {
        Ok(self
            .labels(x)?
            .iter()
            .map(|&l| if l == 1 { 1.0 } else { 0.0 })
            .collect())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<Label>> {
        Ok(self
            .labels(x)?
            .iter()
            .map(|&l| if l == 1 { 1 } else { 0 })
            .collect())
    }

    fn name(&self) -> &str {
        "decision_tree"
    }
}
