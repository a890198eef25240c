use linfa::traits::{Fit, Predict};
use linfa::Dataset;
use linfa_logistic::{FittedLogisticRegression, LogisticRegression as LinfaLogistic};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::dataset::Label;
use crate::error::{PipelineError, Result, Stage};
use crate::models::classifier_trait::{check_prediction_inputs, check_training_inputs, ClassifierModel};

/// L2-regularised logistic regression backed by `linfa-logistic`.
///
/// `c` is the inverse regularisation strength, passed to linfa as `alpha = 1 / c`.
/// Targets are handed to linfa as `usize`, so the positive class (the larger
/// label) is "disease present".
#[derive(Serialize, Deserialize, Debug)]
pub struct LogisticRegression {
    c: f64,
    max_iter: usize,
    n_features: Option<usize>,
    model: Option<FittedLogisticRegression<f64, usize>>,
}

impl LogisticRegression {
    pub fn new(c: f64, max_iter: usize) -> Self {
        LogisticRegression {
            c,
            max_iter,
            n_features: None,
            model: None,
        }
    }

    /// Fitted coefficients, one per feature.
    pub fn weights(&self) -> Option<&Array1<f64>> {
        self.model.as_ref().map(|m| m.params())
    }

    fn fitted(&self) -> Result<&FittedLogisticRegression<f64, usize>> {
        self.model.as_ref().ok_or_else(|| {
            PipelineError::training(Stage::Inference, format!("{}: model has not been fitted", self.name()))
        })
    }
}

impl ClassifierModel for LogisticRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &[Label]) -> Result<()> {
        check_training_inputs(x, y, self.name())?;
        if !(self.c > 0.0) || self.c.is_infinite() {
            return Err(PipelineError::training(
                Stage::ModelSearch,
                format!("logistic regression: c must be positive and finite, got {}", self.c),
            ));
        }

        let targets: Array1<usize> = y.iter().map(|&l| usize::from(l)).collect();
        let dataset = Dataset::new(x.clone(), targets);

        let fitted = LinfaLogistic::<f64>::default()
            .alpha(1.0 / self.c)
            .max_iterations(self.max_iter as u64)
            .fit(&dataset)
            .map_err(|e| {
                PipelineError::training_with(
                    Stage::ModelSearch,
                    format!("logistic regression failed to fit (c={})", self.c),
                    e,
                )
            })?;

        log::trace!(
            "Logistic regression fitted (c={}, max_iter={}, intercept={:.4})",
            self.c,
            self.max_iter,
            fitted.intercept()
        );

        self.n_features = Some(x.ncols());
        self.model = Some(fitted);
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Vec<f64>> {
        check_prediction_inputs(x, self.n_features, self.name())?;
        Ok(self.fitted()?.predict_probabilities(x).to_vec())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<Label>> {
        check_prediction_inputs(x, self.n_features, self.name())?;
        let labels: Array1<usize> = self.fitted()?.predict(x);
        Ok(labels.iter().map(|&l| if l == 1 { 1 } else { 0 }).collect())
    }

    fn name(&self) -> &str {
        "logistic_regression"
    }
}
