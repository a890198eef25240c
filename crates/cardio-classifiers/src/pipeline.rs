//! The training entry point: split, preprocess, search, in sequence.
use std::path::PathBuf;

use serde::Serialize;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::ingestion::DatasetSplitter;
use crate::models::{HyperParams, ModelFamily};
use crate::preprocessing::PreprocessingFitter;
use crate::search::ModelSearch;

/// What a training run produced and where it was written.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TrainingSummary {
    pub family: ModelFamily,
    pub params: HyperParams,
    pub cv_accuracy: f64,
    pub test_accuracy: f64,
    pub train_path: PathBuf,
    pub test_path: PathBuf,
    pub preprocessor_path: PathBuf,
    pub model_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct TrainingPipeline {
    config: PipelineConfig,
}

impl TrainingPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        TrainingPipeline { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage once. Each stage consumes the previous stage's
    /// completed output; any error stops the run.
    pub fn run(&self) -> Result<TrainingSummary> {
        let layout = self.config.layout();

        let splitter = DatasetSplitter::new(layout.clone(), self.config.split_config());
        let (train_path, test_path) = splitter.split(&self.config.raw_source)?;

        let fitter = PreprocessingFitter::new(layout.clone(), self.config.target_column.clone());
        let data = fitter.run(&train_path, &test_path)?;

        let search = ModelSearch::new(self.config.search_config(), layout.clone())?;
        let (model, accuracy) = search.search(&data.x_train, &data.y_train, &data.x_test, &data.y_test)?;

        log::info!(
            "Training finished: {} with test accuracy {:.4}",
            model.family(),
            accuracy
        );
        Ok(TrainingSummary {
            family: model.family(),
            params: model.params().clone(),
            cv_accuracy: model.cv_accuracy(),
            test_accuracy: accuracy,
            train_path,
            test_path,
            preprocessor_path: data.transform_path,
            model_path: layout.model(),
        })
    }
}
