//! Error taxonomy shared by every pipeline stage.
//!
//! Each error records the stage that raised it, a stable message and, when
//! available, the low-level cause. Callers branch on [`ErrorKind`] instead of
//! inspecting message text.
use std::fmt;

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

/// Pipeline stage that raised an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Ingestion,
    Transformation,
    Resampling,
    ModelSearch,
    Persistence,
    Assembly,
    Inference,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Stage::Ingestion => "ingestion",
            Stage::Transformation => "transformation",
            Stage::Resampling => "resampling",
            Stage::ModelSearch => "model_search",
            Stage::Persistence => "persistence",
            Stage::Assembly => "assembly",
            Stage::Inference => "inference",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or insufficient input data.
    Data,
    /// Missing or invalid feature.
    Schema,
    /// Search or fit failure.
    Training,
    /// Persistence read/write failure.
    Artifact,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("[{stage}] data error: {message}")]
    Data {
        stage: Stage,
        message: String,
        #[source]
        source: Option<BoxError>,
    },
    #[error("[{stage}] schema error on field '{field}': {message}")]
    Schema {
        stage: Stage,
        field: String,
        message: String,
        #[source]
        source: Option<BoxError>,
    },
    #[error("[{stage}] training error: {message}")]
    Training {
        stage: Stage,
        message: String,
        #[source]
        source: Option<BoxError>,
    },
    #[error("[{stage}] artifact error: {message}")]
    Artifact {
        stage: Stage,
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl PipelineError {
    pub fn data(stage: Stage, message: impl Into<String>) -> Self {
        PipelineError::Data {
            stage,
            message: message.into(),
            source: None,
        }
    }

    pub fn data_with(stage: Stage, message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        PipelineError::Data {
            stage,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn schema(stage: Stage, field: impl Into<String>, message: impl Into<String>) -> Self {
        PipelineError::Schema {
            stage,
            field: field.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn schema_with(
        stage: Stage,
        field: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        PipelineError::Schema {
            stage,
            field: field.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn training(stage: Stage, message: impl Into<String>) -> Self {
        PipelineError::Training {
            stage,
            message: message.into(),
            source: None,
        }
    }

    pub fn training_with(
        stage: Stage,
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        PipelineError::Training {
            stage,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn artifact(stage: Stage, message: impl Into<String>) -> Self {
        PipelineError::Artifact {
            stage,
            message: message.into(),
            source: None,
        }
    }

    pub fn artifact_with(
        stage: Stage,
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        PipelineError::Artifact {
            stage,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Data { .. } => ErrorKind::Data,
            PipelineError::Schema { .. } => ErrorKind::Schema,
            PipelineError::Training { .. } => ErrorKind::Training,
            PipelineError::Artifact { .. } => ErrorKind::Artifact,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Data { stage, .. }
            | PipelineError::Schema { stage, .. }
            | PipelineError::Training { stage, .. }
            | PipelineError::Artifact { stage, .. } => *stage,
        }
    }

    /// Offending field name for schema errors.
    pub fn field(&self) -> Option<&str> {
        match self {
            PipelineError::Schema { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Re-tag the error with the stage that is propagating it, keeping kind and cause.
    pub fn in_stage(mut self, new_stage: Stage) -> Self {
        match &mut self {
            PipelineError::Data { stage, .. }
            | PipelineError::Schema { stage, .. }
            | PipelineError::Training { stage, .. }
            | PipelineError::Artifact { stage, .. } => *stage = new_stage,
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn wrapping_keeps_the_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = PipelineError::artifact_with(Stage::Persistence, "cannot read model", io);
        assert_eq!(err.kind(), ErrorKind::Artifact);
        assert_eq!(err.stage(), Stage::Persistence);
        let cause = err.source().expect("source should be kept");
        assert_eq!(cause.to_string(), "gone");
        assert!(err.to_string().starts_with("[persistence] artifact error"));
    }

    #[test]
    fn schema_error_names_the_field() {
        let err = PipelineError::schema(Stage::Assembly, "chol", "missing");
        assert_eq!(err.kind(), ErrorKind::Schema);
        assert_eq!(err.field(), Some("chol"));
        assert!(err.to_string().contains("'chol'"));
    }

    #[test]
    fn in_stage_retags_without_changing_kind() {
        let err = PipelineError::data(Stage::Resampling, "too few samples").in_stage(Stage::ModelSearch);
        assert_eq!(err.kind(), ErrorKind::Data);
        assert_eq!(err.stage(), Stage::ModelSearch);
    }
}
