use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::dataset::Label;
use crate::error::Result;
use crate::models::boosting::GradientBoostedTrees;
use crate::models::catalog::HyperParams;
use crate::models::classifier_trait::ClassifierModel;
use crate::models::logistic::LogisticRegression;
use crate::models::tree::DecisionTree;

/// Any candidate model; the fitted value is what gets persisted as an artifact.
#[derive(Serialize, Deserialize, Debug)]
pub enum Model {
    LogisticRegression(LogisticRegression),
    DecisionTree(DecisionTree),
    GradientBoosting(GradientBoostedTrees),
}

impl Model {
    fn inner(&self) -> &dyn ClassifierModel {
        match self {
            Model::LogisticRegression(m) => m,
            Model::DecisionTree(m) => m,
            Model::GradientBoosting(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn ClassifierModel {
        match self {
            Model::LogisticRegression(m) => m,
            Model::DecisionTree(m) => m,
            Model::GradientBoosting(m) => m,
        }
    }
}

impl ClassifierModel for Model {
    fn fit(&mut self, x: &Array2<f64>, y: &[Label]) -> Result<()> {
        self.inner_mut().fit(x, y)
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Vec<f64>> {
        self.inner().predict_proba(x)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<Label>> {
        self.inner().predict(x)
    }

    fn name(&self) -> &str {
        self.inner().name()
    }
}

/// Build an unfitted model from one point of a hyper-parameter grid.
pub fn build_model(params: &HyperParams) -> Model {
    match params {
        HyperParams::LogisticRegression { c, max_iter } => {
            Model::LogisticRegression(LogisticRegression::new(*c, *max_iter))
        }
        HyperParams::DecisionTree {
            criterion,
            max_depth,
            min_samples_split,
        } => Model::DecisionTree(DecisionTree::new(*criterion, *max_depth, *min_samples_split)),
        HyperParams::GradientBoosting {
            iterations,
            max_depth,
            min_leaf_size,
            shrinkage,
        } => Model::GradientBoosting(GradientBoostedTrees::new(
            *iterations,
            *max_depth,
            *min_leaf_size,
            *shrinkage,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_builds_each_family() {
        let cases = [
            (HyperParams::LogisticRegression { c: 1.0, max_iter: 100 }, "logistic_regression"),
            (HyperParams::default(), "decision_tree"),
            (
                HyperParams::GradientBoosting {
                    iterations: 5,
                    max_depth: 2,
                    min_leaf_size: 1,
                    shrinkage: 0.1,
                },
                "gradient_boosting",
            ),
        ];
        for (params, name) in cases {
            assert_eq!(build_model(&params).name(), name);
        }
    }

    #[test]
    fn factory_model_fits_and_predicts() {
        let x = Array2::from_shape_vec(
            (6, 2),
            vec![
                1.0, 0.0, // class 1
                0.0, 1.0, // class 0
                1.0, 0.1, // class 1
                0.0, 0.9, // class 0
                1.1, 0.0, // class 1
                0.0, 1.2, // class 0
            ],
        )
        .unwrap();
        let y = vec![1, 0, 1, 0, 1, 0];
        let mut model = build_model(&HyperParams::default());
        model.fit(&x, &y).unwrap();
        let probs = model.predict_proba(&x).unwrap();
        assert_eq!(probs.len(), x.nrows());
        assert_eq!(model.predict(&x).unwrap(), y);
    }
}
