//! cardio-classifiers: training and serving pipeline for heart-disease
//! classification over 13 clinical features.
//!
//! The training path runs [`ingestion::DatasetSplitter`] →
//! [`preprocessing::PreprocessingFitter`] → [`search::ModelSearch`] and leaves
//! its results as artifacts under one root directory. The serving path
//! ([`features::FeatureRecord`] → [`inference::InferenceService`]) reads only
//! those artifacts, so the two can run as separate processes.
pub mod artifacts;
pub mod config;
pub mod dataset;
pub mod error;
pub mod features;
pub mod inference;
pub mod ingestion;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod preprocessing;
pub mod sampling;
pub mod search;
pub mod serving;

pub use config::{ArtifactLayout, PipelineConfig};
pub use error::{ErrorKind, PipelineError, Result, Stage};
pub use features::{FeatureRecord, FieldValue};
pub use inference::{InferenceService, PredictionResult};
pub use pipeline::{TrainingPipeline, TrainingSummary};
pub use serving::{handle_request, PredictionRequest, PredictionResponse};
