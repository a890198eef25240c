//! Assembly of a single inference request into the transform's column order.
use std::collections::HashMap;
use std::fmt;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::dataset::{FeatureFrame, Serving, FEATURE_NAMES};
use crate::error::{PipelineError, Result, Stage};

/// A raw request field: either a JSON number or a numeric string.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    fn coerce(&self, field: &str) -> Result<f64> {
        let value = match self {
            FieldValue::Number(v) => *v,
            FieldValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(PipelineError::schema(Stage::Assembly, field, "value is empty"));
                }
                trimmed.parse::<f64>().map_err(|e| {
                    PipelineError::schema_with(
                        Stage::Assembly,
                        field,
                        format!("'{}' is not numeric", trimmed),
                        e,
                    )
                })?
            }
        };
        if !value.is_finite() {
            return Err(PipelineError::schema(
                Stage::Assembly,
                field,
                format!("{} is not a finite number", value),
            ));
        }
        Ok(value)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Number(v)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FieldValue::Number(v) => write!(f, "{}", v),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

/// The 13 clinical features of one request, validated and in canonical order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRecord {
    values: [f64; FEATURE_NAMES.len()],
}

impl FeatureRecord {
    /// Check every named feature in canonical order. The first field that is
    /// absent or not numeric fails the whole record; no default is ever
    /// substituted. Unknown extra fields are ignored.
    pub fn assemble(fields: &HashMap<String, FieldValue>) -> Result<Self> {
        let mut values = [0.0; FEATURE_NAMES.len()];
        for (slot, name) in values.iter_mut().zip(FEATURE_NAMES) {
            let raw = fields.get(name).ok_or_else(|| {
                PipelineError::schema(Stage::Assembly, name, "required field is missing")
            })?;
            *slot = raw.coerce(name)?;
        }
        Ok(FeatureRecord { values })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| self.values[i])
    }

    /// Single-row frame ready for the preprocessing transform.
    pub fn to_frame(&self) -> Result<FeatureFrame<Serving>> {
        let names = FEATURE_NAMES.iter().map(|n| n.to_string()).collect();
        let values = Array2::from_shape_vec((1, self.values.len()), self.values.to_vec())
            .map_err(|e| PipelineError::data_with(Stage::Assembly, "invalid record shape", e))?;
        FeatureFrame::new(names, values)
    }
}
