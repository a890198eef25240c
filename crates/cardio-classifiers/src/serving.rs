//! Request/response contract at the serving boundary.
//!
//! This is the only place pipeline errors are caught: they are logged and
//! turned into an error response instead of being propagated.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::features::{FeatureRecord, FieldValue};
use crate::inference::{InferenceService, PredictionResult};

/// Inbound map of named fields, each a number or a numeric string.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct PredictionRequest {
    pub fields: HashMap<String, FieldValue>,
}

impl PredictionRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }
}

/// Outbound payload: `{"result": "..."}` or `{"error": "..."}`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PredictionResponse {
    Result(String),
    Error(String),
}

impl PredictionResponse {
    pub fn is_error(&self) -> bool {
        matches!(self, PredictionResponse::Error(_))
    }
}

impl From<PredictionResult> for PredictionResponse {
    fn from(result: PredictionResult) -> Self {
        PredictionResponse::Result(result.to_string())
    }
}

/// Assemble, transform and predict; never fails.
pub fn handle_request(service: &InferenceService, request: &PredictionRequest) -> PredictionResponse {
    let outcome = FeatureRecord::assemble(&request.fields).and_then(|record| service.predict(&record));
    match outcome {
        Ok(result) => {
            log::info!("Prediction served: {}", result);
            result.into()
        }
        Err(e) => {
            log::error!("Prediction failed: {}", e);
            PredictionResponse::Error(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArtifactLayout;

    #[test]
    fn response_json_shape() {
        let ok = PredictionResponse::Result("disease absent".into());
        assert_eq!(
            serde_json::to_string(&ok).unwrap(),
            r#"{"result":"disease absent"}"#
        );
        let err: PredictionResponse = serde_json::from_str(r#"{"error":"boom"}"#).unwrap();
        assert!(err.is_error());
    }

    #[test]
    fn request_is_a_plain_json_object() {
        let request: PredictionRequest = serde_json::from_str(r#"{"age": "61", "sex": 1}"#).unwrap();
        assert_eq!(request.fields.len(), 2);
        let built = PredictionRequest::new().with_field("age", "61").with_field("sex", 1.0);
        assert_eq!(built, request);
    }

    #[test]
    fn incomplete_request_becomes_an_error_response() {
        let dir = tempfile::tempdir().unwrap();
        let service = InferenceService::new(ArtifactLayout::new(dir.path()));
        let response = handle_request(&service, &PredictionRequest::new().with_field("age", 50.0));
        match response {
            PredictionResponse::Error(msg) => assert!(msg.contains("'sex'")),
            other => panic!("expected an error response, got {:?}", other),
        }
    }
}
