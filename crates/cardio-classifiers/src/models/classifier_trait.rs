use ndarray::Array2;

use crate::dataset::Label;
use crate::error::{PipelineError, Result, Stage};

/// Contract shared by every candidate model.
///
/// Labels follow the dataset convention (0 = no disease, 1 = disease present).
/// Models are fitted once and are read-only afterwards, so `predict*` take `&self`.
pub trait ClassifierModel {
    /// Fit the model on the rows of `x`.
    fn fit(&mut self, x: &Array2<f64>, y: &[Label]) -> Result<()>;

    /// Probability of the positive class for each row.
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Vec<f64>>;

    /// Hard labels, thresholding the positive-class probability at 0.5.
    fn predict(&self, x: &Array2<f64>) -> Result<Vec<Label>> {
        Ok(self
            .predict_proba(x)?
            .into_iter()
            .map(|p| if p >= 0.5 { 1 } else { 0 })
            .collect())
    }

    /// Optional human readable name for the model
    fn name(&self) -> &str {
        "classifier"
    }
}

pub(crate) fn check_training_inputs(x: &Array2<f64>, y: &[Label], model: &str) -> Result<()> {
    if x.nrows() == 0 {
        return Err(PipelineError::training(
            Stage::ModelSearch,
            format!("{}: cannot fit on an empty matrix", model),
        ));
    }
    if x.nrows() != y.len() {
        return Err(PipelineError::training(
            Stage::ModelSearch,
            format!(
                "{}: {} feature rows but {} labels",
                model,
                x.nrows(),
                y.len()
            ),
        ));
    }
    if let Some(bad) = y.iter().find(|&&l| l > 1) {
        return Err(PipelineError::training(
            Stage::ModelSearch,
            format!("{}: label {} is not binary", model, bad),
        ));
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(PipelineError::training(
            Stage::ModelSearch,
            format!("{}: feature matrix contains non-finite values", model),
        ));
    }
    Ok(())
}

pub(crate) fn check_prediction_inputs(
    x: &Array2<f64>,
    n_features: Option<usize>,
    model: &str,
) -> Result<()> {
    let expected = n_features.ok_or_else(|| {
        PipelineError::training(Stage::Inference, format!("{}: model has not been fitted", model))
    })?;
    if x.ncols() != expected {
        return Err(PipelineError::data(
            Stage::Inference,
            format!(
                "{}: expected {} features, got {}",
                model,
                expected,
                x.ncols()
            ),
        ));
    }
    Ok(())
}
