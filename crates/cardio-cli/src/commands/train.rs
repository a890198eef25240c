use anyhow::{Context, Result};
use cardio_classifiers::{PipelineConfig, TrainingPipeline, TrainingSummary};

/// Run split, preprocessing and model search with `config`.
pub fn run_training(config: &PipelineConfig) -> Result<TrainingSummary> {
    log::info!(
        "[Cardio::Train] Training from {} into {}",
        config.raw_source.display(),
        config.artifact_root.display()
    );
    let summary = TrainingPipeline::new(config.clone())
        .run()
        .context("Training pipeline failed")?;
    Ok(summary)
}

/// Human readable report of a finished run.
pub fn format_summary(summary: &TrainingSummary) -> String {
    format!(
        "Best Model: {}\nBest Params: {}\nBest Accuracy: {:.4}\nModel: {}",
        summary.family,
        summary.params,
        summary.test_accuracy,
        summary.model_path.display()
    )
}
