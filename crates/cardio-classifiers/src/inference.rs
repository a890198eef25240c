//! Serving-side prediction over the persisted artifacts.
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock, PoisonError};

use serde::{Deserialize, Serialize};

use crate::config::ArtifactLayout;
use crate::dataset::Label;
use crate::error::{PipelineError, Result, Stage};
use crate::features::FeatureRecord;
use crate::preprocessing::PreprocessingTransform;
use crate::search::TrainedModel;

/// Binary outcome of one prediction.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PredictionResult {
    DiseaseAbsent,
    DiseasePresent,
}

impl PredictionResult {
    pub fn from_label(label: Label) -> Self {
        if label == 1 {
            PredictionResult::DiseasePresent
        } else {
            PredictionResult::DiseaseAbsent
        }
    }

    pub fn label(&self) -> Label {
        match self {
            PredictionResult::DiseaseAbsent => 0,
            PredictionResult::DiseasePresent => 1,
        }
    }
}

impl fmt::Display for PredictionResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PredictionResult::DiseaseAbsent => f.write_str("disease absent"),
            PredictionResult::DiseasePresent => f.write_str("disease present"),
        }
    }
}

#[derive(Debug)]
struct LoadedArtifacts {
    transform: PreprocessingTransform,
    model: TrainedModel,
}

impl LoadedArtifacts {
    fn load(layout: &ArtifactLayout) -> Result<Self> {
        let transform = PreprocessingTransform::load(&layout.preprocessor())
            .map_err(|e| e.in_stage(Stage::Inference))?;
        let model =
            TrainedModel::load(&layout.model()).map_err(|e| e.in_stage(Stage::Inference))?;
        log::info!(
            "Loaded preprocessor and {} model from {}",
            model.family(),
            layout.root().display()
        );
        Ok(LoadedArtifacts { transform, model })
    }
}

/// Loads the transform and model on first use and keeps them for the life of
/// the service. Loaded artifacts are never mutated, so `predict` can be called
/// from many threads at once.
///
/// The first load is serialised by `load_lock`: racing first calls read the
/// artifacts from disk once, and later calls never take the lock.
#[derive(Debug)]
pub struct InferenceService {
    layout: Option<ArtifactLayout>,
    artifacts: OnceLock<LoadedArtifacts>,
    load_lock: Mutex<()>,
    loads: AtomicUsize,
}

impl InferenceService {
    pub fn new(layout: ArtifactLayout) -> Self {
        InferenceService {
            layout: Some(layout),
            artifacts: OnceLock::new(),
            load_lock: Mutex::new(()),
            loads: AtomicUsize::new(0),
        }
    }

    /// Serve from objects already in memory, e.g. straight after training.
    pub fn from_parts(transform: PreprocessingTransform, model: TrainedModel) -> Self {
        let artifacts = OnceLock::new();
        let _ = artifacts.set(LoadedArtifacts { transform, model });
        InferenceService {
            layout: None,
            artifacts,
            load_lock: Mutex::new(()),
            loads: AtomicUsize::new(0),
        }
    }

    fn artifacts(&self) -> Result<&LoadedArtifacts> {
        if let Some(loaded) = self.artifacts.get() {
            return Ok(loaded);
        }
        let layout = self.layout.as_ref().ok_or_else(|| {
            PipelineError::artifact(Stage::Inference, "no artifact location configured")
        })?;
        // the lock guards no data; poisoning is ignored
        let _guard = self.load_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(loaded) = self.artifacts.get() {
            return Ok(loaded);
        }
        let loaded = LoadedArtifacts::load(layout)?;
        self.loads.fetch_add(1, Ordering::Relaxed);
        Ok(self.artifacts.get_or_init(|| loaded))
    }

    /// How many times the artifacts were read from disk (0 or 1).
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }

    /// Load the artifacts now instead of on the first request.
    pub fn warm_up(&self) -> Result<()> {
        self.artifacts().map(|_| ())
    }

    pub fn predict(&self, record: &FeatureRecord) -> Result<PredictionResult> {
        let artifacts = self.artifacts()?;
        let frame = record.to_frame()?;
        let x = artifacts
            .transform
            .apply(&frame)
            .map_err(|e| e.in_stage(Stage::Inference))?;
        let labels = artifacts.model.predict(&x)?;
        let label = labels.first().copied().ok_or_else(|| {
            PipelineError::training(Stage::Inference, "model returned no prediction")
        })?;
        let result = PredictionResult::from_label(label);
        log::debug!("Predicted {} ({})", result, artifacts.model.family());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn result_strings() {
        assert_eq!(PredictionResult::from_label(1).to_string(), "disease present");
        assert_eq!(PredictionResult::from_label(0).to_string(), "disease absent");
        assert_eq!(PredictionResult::DiseasePresent.label(), 1);
    }

    #[test]
    fn missing_artifacts_are_artifact_errors() {
        let dir = tempfile::tempdir().unwrap();
        let service = InferenceService::new(ArtifactLayout::new(dir.path()));
        let err = service.warm_up().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Artifact);
        assert_eq!(err.stage(), Stage::Inference);
        assert_eq!(service.load_count(), 0);
    }
}
