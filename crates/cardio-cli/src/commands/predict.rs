use std::path::Path;

use anyhow::{anyhow, Context, Result};
use cardio_classifiers::{
    handle_request, FieldValue, InferenceService, PipelineConfig, PredictionRequest,
    PredictionResponse,
};

/// Split a `name=value` command-line field.
pub fn parse_field(arg: &str) -> Result<(String, FieldValue)> {
    let (name, value) = arg
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected name=value, got '{}'", arg))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow!("Empty field name in '{}'", arg));
    }
    Ok((name.to_string(), FieldValue::Text(value.trim().to_string())))
}

pub fn load_request<P: AsRef<Path>>(path: P) -> Result<PredictionRequest> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read request: {}", path.as_ref().display()))?;
    let request: PredictionRequest = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse request: {}", path.as_ref().display()))?;
    Ok(request)
}

/// Start from the request file, if any, then apply the `name=value` fields
/// on top of it.
pub fn build_request<S: AsRef<str>>(request_file: Option<&Path>, fields: &[S]) -> Result<PredictionRequest> {
    let mut request = match request_file {
        Some(path) => load_request(path)?,
        None => PredictionRequest::new(),
    };
    for field in fields {
        let (name, value) = parse_field(field.as_ref())?;
        request.insert(name, value);
    }
    Ok(request)
}

/// Answer one request from the artifacts under the configured root.
pub fn run_prediction(config: &PipelineConfig, request: &PredictionRequest) -> PredictionResponse {
    log::info!(
        "[Cardio::Predict] Serving from {}",
        config.artifact_root.display()
    );
    let service = InferenceService::new(config.layout());
    handle_request(&service, request)
}

pub fn response_json(response: &PredictionResponse) -> Result<String> {
    serde_json::to_string(response).context("Failed to serialize the response")
}
