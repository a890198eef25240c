//! Median imputation followed by standardization.
//!
//! The transform is fitted once on the training partition and is read-only
//! afterwards. The serving path only ever sees it through the persisted
//! artifact.
use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median, Statistics};

use crate::artifacts::{load_artifact, save_artifact};
use crate::config::ArtifactLayout;
use crate::dataset::{
    class_counts, read_labeled_csv, FeatureFrame, Holdout, Label, Partition, Training,
    TransformedFrame, FEATURE_NAMES,
};
use crate::error::{PipelineError, Result, Stage};

/// Per-feature imputation and scaling parameters, in output column order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PreprocessingTransform {
    feature_names: Vec<String>,
    medians: Vec<f64>,
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl PreprocessingTransform {
    /// Fit on training rows only. `feature_names` fixes which columns are used
    /// and the order of the transformed output.
    pub fn fit<S: AsRef<str>>(train: &FeatureFrame<Training>, feature_names: &[S]) -> Result<Self> {
        if train.nrows() == 0 {
            return Err(PipelineError::data(
                Stage::Transformation,
                "cannot fit the preprocessing transform on zero training rows",
            ));
        }

        let mut names = Vec::with_capacity(feature_names.len());
        let mut medians = Vec::with_capacity(feature_names.len());
        let mut means = Vec::with_capacity(feature_names.len());
        let mut scales = Vec::with_capacity(feature_names.len());

        for name in feature_names {
            let name = name.as_ref();
            let idx = train.column_index(name).ok_or_else(|| {
                PipelineError::schema(Stage::Transformation, name, "feature absent from training data")
            })?;
            let column = train.values().column(idx);

            let observed: Vec<f64> = column.iter().copied().filter(|v| !v.is_nan()).collect();
            if observed.is_empty() {
                return Err(PipelineError::data(
                    Stage::Transformation,
                    format!("feature '{}' has no observed values in the training data", name),
                ));
            }
            let median = Data::new(observed).median();

            let imputed: Vec<f64> = column
                .iter()
                .map(|&v| if v.is_nan() { median } else { v })
                .collect();
            let mean = imputed.iter().mean();
            let std = imputed.iter().population_std_dev();
            let scale = if std.is_finite() && std > f64::EPSILON { std } else { 1.0 };

            log::trace!(
                "Feature {}: median={:.4}, mean={:.4}, scale={:.4}",
                name,
                median,
                mean,
                scale
            );
            names.push(name.to_string());
            medians.push(median);
            means.push(mean);
            scales.push(scale);
        }

        Ok(PreprocessingTransform {
            feature_names: names,
            medians,
            means,
            scales,
        })
    }

    /// Impute and standardize `frame`. Columns are looked up by name, so the
    /// input may carry extra columns or a different order.
    pub fn apply<P: Partition>(&self, frame: &FeatureFrame<P>) -> Result<TransformedFrame<P>> {
        let mut indices = Vec::with_capacity(self.feature_names.len());
        for name in &self.feature_names {
            let idx = frame.column_index(name).ok_or_else(|| {
                PipelineError::schema(
                    Stage::Transformation,
                    name.as_str(),
                    format!("feature absent from {} rows", P::NAME),
                )
            })?;
            indices.push(idx);
        }

        let values = frame.values();
        let out = Array2::from_shape_fn((frame.nrows(), indices.len()), |(r, c)| {
            let raw = values[[r, indices[c]]];
            let v = if raw.is_nan() { self.medians[c] } else { raw };
            (v - self.means[c]) / self.scales[c]
        });
        Ok(TransformedFrame::new(out))
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn medians(&self) -> &[f64] {
        &self.medians
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_artifact(path, self, Stage::Persistence)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let transform: Self = load_artifact(path, Stage::Persistence)?;
        let n = transform.feature_names.len();
        if transform.medians.len() != n || transform.means.len() != n || transform.scales.len() != n {
            return Err(PipelineError::artifact(
                Stage::Persistence,
                format!("inconsistent preprocessing artifact {}", path.display()),
            ));
        }
        Ok(transform)
    }
}

/// Output of the preprocessing stage.
#[derive(Debug, Clone)]
pub struct TransformedData {
    pub x_train: TransformedFrame<Training>,
    pub y_train: Vec<Label>,
    pub x_test: TransformedFrame<Holdout>,
    pub y_test: Vec<Label>,
    pub transform: PreprocessingTransform,
    pub transform_path: PathBuf,
}

/// Reads the split files, fits the transform on the training rows, applies it
/// to both partitions and persists it.
#[derive(Debug, Clone)]
pub struct PreprocessingFitter {
    layout: ArtifactLayout,
    target_column: String,
}

impl PreprocessingFitter {
    pub fn new(layout: ArtifactLayout, target_column: impl Into<String>) -> Self {
        PreprocessingFitter {
            layout,
            target_column: target_column.into(),
        }
    }

    pub fn run(&self, train_path: &Path, test_path: &Path) -> Result<TransformedData> {
        log::info!("Entered data transformation");
        let train = read_labeled_csv::<Training, _>(train_path, &self.target_column)?;
        let test = read_labeled_csv::<Holdout, _>(test_path, &self.target_column)?;
        log::info!(
            "Read train ({} rows) and test ({} rows) data",
            train.len(),
            test.len()
        );

        let transform = PreprocessingTransform::fit(&train.features, &FEATURE_NAMES)?;
        log::info!("Fitted preprocessing transform on {} features", transform.feature_names().len());

        let x_train = transform.apply(&train.features)?;
        let x_test = transform.apply(&test.features)?;
        let (neg, pos) = class_counts(&train.labels);
        log::debug!("Training class counts before rebalancing: 0={}, 1={}", neg, pos);

        let transform_path = self.layout.preprocessor();
        transform.save(&transform_path)?;
        log::info!("Saved preprocessing object to {}", transform_path.display());

        Ok(TransformedData {
            x_train,
            y_train: train.labels,
            x_test,
            y_test: test.labels,
            transform,
            transform_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Serving;
    use crate::error::ErrorKind;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn fit_uses_median_for_missing_values() {
        let train = FeatureFrame::<Training>::from_rows(
            names(&["a", "b"]),
            &[
                vec![1.0, 10.0],
                vec![f64::NAN, 20.0],
                vec![3.0, 30.0],
                vec![5.0, 40.0],
            ],
        )
        .unwrap();
        let transform = PreprocessingTransform::fit(&train, &["a", "b"]).unwrap();
        assert_eq!(transform.medians(), &[3.0, 25.0]);
        assert!((transform.means()[0] - 3.0).abs() < 1e-12);

        let out = transform.apply(&train).unwrap();
        // imputed row sits exactly at the mean
        assert!(out.values()[[1, 0]].abs() < 1e-12);
        let col_b: Vec<f64> = out.values().column(1).to_vec();
        let mean_b = col_b.iter().sum::<f64>() / col_b.len() as f64;
        assert!(mean_b.abs() < 1e-12);
    }

    #[test]
    fn constant_column_scales_by_one() {
        let train = FeatureFrame::<Training>::from_rows(
            names(&["a"]),
            &[vec![7.0], vec![7.0], vec![7.0]],
        )
        .unwrap();
        let transform = PreprocessingTransform::fit(&train, &["a"]).unwrap();
        assert_eq!(transform.scales(), &[1.0]);
        let out = transform.apply(&train).unwrap();
        assert!(out.values().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn all_missing_column_is_a_data_error() {
        let train = FeatureFrame::<Training>::from_rows(
            names(&["a"]),
            &[vec![f64::NAN], vec![f64::NAN]],
        )
        .unwrap();
        let err = PreprocessingTransform::fit(&train, &["a"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);
    }

    #[test]
    fn apply_reports_missing_feature_by_name() {
        let train = FeatureFrame::<Training>::from_rows(
            names(&["a", "b"]),
            &[vec![1.0, 2.0], vec![3.0, 4.0]],
        )
        .unwrap();
        let transform = PreprocessingTransform::fit(&train, &["a", "b"]).unwrap();
        let request = FeatureFrame::<Serving>::from_rows(names(&["a"]), &[vec![1.0]]).unwrap();
        let err = transform.apply(&request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Schema);
        assert_eq!(err.field(), Some("b"));
    }

    #[test]
    fn apply_reorders_columns_by_name() {
        let train = FeatureFrame::<Training>::from_rows(
            names(&["a", "b"]),
            &[vec![0.0, 10.0], vec![2.0, 30.0]],
        )
        .unwrap();
        let transform = PreprocessingTransform::fit(&train, &["a", "b"]).unwrap();
        let swapped = FeatureFrame::<Serving>::from_rows(names(&["b", "a"]), &[vec![30.0, 2.0]]).unwrap();
        let out = transform.apply(&swapped).unwrap();
        assert_eq!(out.values().row(0).to_vec(), vec![1.0, 1.0]);
    }
}
