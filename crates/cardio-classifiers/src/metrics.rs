use crate::dataset::Label;
use crate::error::{PipelineError, Result, Stage};

/// Fraction of predictions equal to the true label.
pub fn accuracy(y_true: &[Label], y_pred: &[Label]) -> Result<f64> {
    if y_true.len() != y_pred.len() {
        return Err(PipelineError::training(
            Stage::ModelSearch,
            format!(
                "accuracy: {} true labels but {} predictions",
                y_true.len(),
                y_pred.len()
            ),
        ));
    }
    if y_true.is_empty() {
        return Err(PipelineError::training(
            Stage::ModelSearch,
            "accuracy: no labels to score",
        ));
    }
    let correct = y_true.iter().zip(y_pred).filter(|(a, b)| a == b).count();
    Ok(correct as f64 / y_true.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_matching_labels() {
        assert_eq!(accuracy(&[1, 0, 1, 1], &[1, 1, 1, 0]).unwrap(), 0.5);
        assert_eq!(accuracy(&[0], &[0]).unwrap(), 1.0);
    }

    #[test]
    fn rejects_mismatched_or_empty_input() {
        assert!(accuracy(&[1, 0], &[1]).is_err());
        assert!(accuracy(&[], &[]).is_err());
    }
}
