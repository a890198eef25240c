use std::path::Path;

use cardio_classifiers::dataset::FEATURE_NAMES;
use cardio_classifiers::models::tree::SplitCriterion;
use cardio_classifiers::models::{CandidateModelSpec, ParamGrid};
use cardio_classifiers::{FieldValue, PipelineConfig, PredictionResponse};
use cardio_cli::commands::predict::{build_request, parse_field, response_json, run_prediction};
use cardio_cli::commands::train::{format_summary, run_training};
use cardio_cli::config::{default_config_json, load_config, resolve_config};

fn write_dataset(path: &Path, n: usize) {
    let mut text = FEATURE_NAMES.join(",");
    text.push_str(",condition\n");
    for i in 0..n {
        let age = 30 + (i * 7) % 45;
        let row = [
            age,
            i % 2,
            i % 4,
            110 + (i * 13) % 60,
            180 + (i * 29) % 150,
            (i / 3) % 2,
            i % 3,
            100 + (i * 17) % 90,
            (i / 2) % 2,
            (i * 3) % 40,
            i % 3,
            (i / 4) % 4,
            (i / 5) % 3,
        ];
        let fields: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        text.push_str(&fields.join(","));
        text.push_str(if age > 60 { ",1\n" } else { ",0\n" });
    }
    std::fs::write(path, text).unwrap();
}

fn quick_config(dir: &Path) -> PipelineConfig {
    let raw = dir.join("heart.csv");
    write_dataset(&raw, 90);
    PipelineConfig {
        raw_source: raw,
        artifact_root: dir.join("artifacts"),
        log_dir: dir.join("logs"),
        candidates: vec![
            CandidateModelSpec::new(ParamGrid::LogisticRegression {
                c: vec![1.0],
                max_iter: vec![300],
            }),
            CandidateModelSpec::new(ParamGrid::DecisionTree {
                criterion: vec![SplitCriterion::Entropy],
                max_depth: vec![Some(4)],
                min_samples_split: vec![2],
            }),
        ],
        ..PipelineConfig::default()
    }
}

#[test]
fn config_file_overrides_only_given_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"random_seed": 7, "artifact_root": "out"}"#).unwrap();

    let config = load_config(&path).unwrap();
    assert_eq!(config.random_seed, 7);
    assert_eq!(config.cv_folds, 5);
    assert_eq!(config.layout().model(), Path::new("out/model.bin"));

    assert_eq!(resolve_config(None).unwrap(), PipelineConfig::default());
    assert!(load_config(dir.path().join("missing.json")).is_err());
}

#[test]
fn default_config_json_parses_back() {
    let json = default_config_json().unwrap();
    let parsed: PipelineConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, PipelineConfig::default());
}

#[test]
fn fields_override_the_request_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("request.json");
    std::fs::write(&path, r#"{"age": 45, "sex": "0"}"#).unwrap();

    let request = build_request(Some(path.as_path()), &["age=71", "cp = 2"]).unwrap();
    assert_eq!(request.fields["age"], FieldValue::Text("71".into()));
    assert_eq!(request.fields["sex"], FieldValue::Text("0".into()));
    assert_eq!(request.fields["cp"], FieldValue::Text("2".into()));

    assert!(parse_field("age").is_err());
    assert!(parse_field("=4").is_err());
}

#[test]
fn prediction_without_artifacts_is_an_error_response() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig {
        artifact_root: dir.path().to_path_buf(),
        ..PipelineConfig::default()
    };
    let fields: Vec<String> = FEATURE_NAMES.iter().map(|n| format!("{}=1", n)).collect();
    let request = build_request(None, &fields).unwrap();

    let response = run_prediction(&config, &request);
    assert!(response.is_error());
    assert!(response_json(&response).unwrap().starts_with(r#"{"error":"#));
}

#[test]
fn train_then_predict() {
    let dir = tempfile::tempdir().unwrap();
    let config = quick_config(dir.path());

    let summary = run_training(&config).unwrap();
    assert!(format_summary(&summary).starts_with("Best Model: "));

    let fields = [
        "age=75", "sex=1", "cp=2", "trestbps=140", "chol=255", "fbs=0", "restecg=1",
        "thalach=145", "exang=0", "oldpeak=20", "slope=1", "ca=1", "thal=1",
    ];
    let response = run_prediction(&config, &build_request(None, &fields).unwrap());
    assert_eq!(response, PredictionResponse::Result("disease present".into()));
}
