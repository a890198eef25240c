use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dataset::TARGET_COLUMN;
use crate::models::catalog::{default_catalog, CandidateModelSpec};

/// Central configuration for a training run and for locating artifacts.
///
/// Each stage receives only the slice it needs through [`PipelineConfig::split_config`],
/// [`PipelineConfig::search_config`] and [`PipelineConfig::layout`].
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// CSV file holding the raw clinical records.
    pub raw_source: PathBuf,
    /// Directory every artifact is written under.
    pub artifact_root: PathBuf,
    /// Directory for the per-process diagnostics log.
    pub log_dir: PathBuf,
    pub target_column: String,
    pub test_fraction: f64,
    pub random_seed: u64,
    pub cv_folds: usize,
    pub smote_neighbors: usize,
    /// Worker threads for the grid search; `None` uses every available core.
    pub n_jobs: Option<usize>,
    /// Optional wall-clock budget for the whole model search.
    pub max_search_seconds: Option<u64>,
    pub candidates: Vec<CandidateModelSpec>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            raw_source: PathBuf::from("notebook/data/heart_cleveland_upload.csv"),
            artifact_root: PathBuf::from("artifacts"),
            log_dir: PathBuf::from("logs"),
            target_column: TARGET_COLUMN.to_string(),
            test_fraction: 0.2,
            random_seed: 42,
            cv_folds: 5,
            smote_neighbors: 5,
            n_jobs: None,
            max_search_seconds: None,
            candidates: default_catalog(),
        }
    }
}

impl PipelineConfig {
    pub fn layout(&self) -> ArtifactLayout {
        ArtifactLayout::new(&self.artifact_root)
    }

    pub fn split_config(&self) -> SplitConfig {
        SplitConfig {
            target_column: self.target_column.clone(),
            test_fraction: self.test_fraction,
            random_seed: self.random_seed,
        }
    }

    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            cv_folds: self.cv_folds,
            smote_neighbors: self.smote_neighbors,
            random_seed: self.random_seed,
            n_jobs: self.n_jobs,
            max_search_seconds: self.max_search_seconds,
            candidates: self.candidates.clone(),
        }
    }
}

/// Inputs of the dataset splitter.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitConfig {
    pub target_column: String,
    pub test_fraction: f64,
    pub random_seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        PipelineConfig::default().split_config()
    }
}

/// Inputs of the model search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub cv_folds: usize,
    pub smote_neighbors: usize,
    pub random_seed: u64,
    pub n_jobs: Option<usize>,
    pub max_search_seconds: Option<u64>,
    pub candidates: Vec<CandidateModelSpec>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        PipelineConfig::default().search_config()
    }
}

/// Well-known artifact locations under a single root. Every training run
/// overwrites these files wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        ArtifactLayout {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn raw_data(&self) -> PathBuf {
        self.root.join("raw.csv")
    }

    pub fn train_data(&self) -> PathBuf {
        self.root.join("train.csv")
    }

    pub fn test_data(&self) -> PathBuf {
        self.root.join("test.csv")
    }

    pub fn preprocessor(&self) -> PathBuf {
        self.root.join("preprocessor.bin")
    }

    pub fn model(&self) -> PathBuf {
        self.root.join("model.bin")
    }
}
