#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use cardio_classifiers::dataset::{FEATURE_NAMES, TARGET_COLUMN};
use cardio_classifiers::models::tree::SplitCriterion;
use cardio_classifiers::models::{CandidateModelSpec, ParamGrid};
use cardio_classifiers::{FieldValue, PipelineConfig, PredictionRequest};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub type Row = [f64; 13];

/// Clinically plausible random records.
pub fn synthetic_rows(n: usize, seed: u64) -> Vec<Row> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            [
                rng.gen_range(29..=77) as f64,
                rng.gen_range(0..=1) as f64,
                rng.gen_range(0..=3) as f64,
                rng.gen_range(94..=200) as f64,
                rng.gen_range(126..=564) as f64,
                rng.gen_range(0..=1) as f64,
                rng.gen_range(0..=2) as f64,
                rng.gen_range(71..=202) as f64,
                rng.gen_range(0..=1) as f64,
                rng.gen_range(0..=62) as f64 / 10.0,
                rng.gen_range(0..=2) as f64,
                rng.gen_range(0..=3) as f64,
                rng.gen_range(0..=2) as f64,
            ]
        })
        .collect()
}

pub fn write_csv(path: &Path, rows: &[Row], labels: &[u8]) {
    let mut writer = csv::Writer::from_path(path).unwrap();
    let mut header: Vec<&str> = FEATURE_NAMES.to_vec();
    header.push(TARGET_COLUMN);
    writer.write_record(&header).unwrap();
    for (row, label) in rows.iter().zip(labels) {
        let mut record: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        record.push(label.to_string());
        writer.write_record(&record).unwrap();
    }
    writer.flush().unwrap();
}

/// Records labelled 1 exactly when age is above 60.
pub fn write_age_rule_dataset(path: &Path, n: usize, seed: u64) -> Vec<Row> {
    let rows = synthetic_rows(n, seed);
    let labels: Vec<u8> = rows.iter().map(|r| u8::from(r[0] > 60.0)).collect();
    write_csv(path, &rows, &labels);
    rows
}

pub fn column_medians(rows: &[Row]) -> Row {
    let mut medians = [0.0; 13];
    for (c, slot) in medians.iter_mut().enumerate() {
        let mut column: Vec<f64> = rows.iter().map(|r| r[c]).collect();
        column.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let mid = column.len() / 2;
        *slot = if column.len() % 2 == 0 {
            (column[mid - 1] + column[mid]) / 2.0
        } else {
            column[mid]
        };
    }
    medians
}

pub fn request_for(values: &Row) -> PredictionRequest {
    let fields: HashMap<String, FieldValue> = FEATURE_NAMES
        .iter()
        .zip(values)
        .map(|(name, v)| (name.to_string(), FieldValue::Number(*v)))
        .collect();
    PredictionRequest { fields }
}

/// One combination per family so full runs stay quick.
pub fn small_catalog() -> Vec<CandidateModelSpec> {
    vec![
        CandidateModelSpec::new(ParamGrid::LogisticRegression {
            c: vec![1.0],
            max_iter: vec![500],
        }),
        CandidateModelSpec::new(ParamGrid::DecisionTree {
            criterion: vec![SplitCriterion::Gini, SplitCriterion::Entropy],
            max_depth: vec![Some(3)],
            min_samples_split: vec![2],
        }),
        CandidateModelSpec::new(ParamGrid::GradientBoosting {
            iterations: vec![20],
            max_depth: vec![3],
            min_leaf_size: vec![1],
            shrinkage: vec![0.1],
        }),
    ]
}

pub fn test_config(dir: &Path, raw_source: PathBuf) -> PipelineConfig {
    PipelineConfig {
        raw_source,
        artifact_root: dir.join("artifacts"),
        log_dir: dir.join("logs"),
        n_jobs: Some(2),
        candidates: small_catalog(),
        ..PipelineConfig::default()
    }
}
