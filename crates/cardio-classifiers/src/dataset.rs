//! Tabular data containers for the clinical records.
//!
//! Rows move through the pipeline inside frames tagged with the partition they
//! came from (`Training`, `Holdout`, `Serving`). Fitting the preprocessing
//! transform or rebalancing classes only accepts `Training` frames, so feeding
//! test or inference rows into a fit is a type error rather than silent leakage.
use std::io::Read;
use std::marker::PhantomData;
use std::path::Path;

use csv::StringRecord;
use ndarray::{Array2, Axis};

use crate::error::{PipelineError, Result, Stage};

/// The 13 clinical features, in the column order the transform expects.
pub const FEATURE_NAMES: [&str; 13] = [
    "age", "sex", "cp", "trestbps", "chol", "fbs", "restecg", "thalach", "exang", "oldpeak",
    "slope", "ca", "thal",
];

pub const TARGET_COLUMN: &str = "condition";

/// Binary class label: 0 = no disease, 1 = disease present.
pub type Label = u8;

mod sealed {
    pub trait Sealed {}
}

/// Marker for the origin of a set of rows.
pub trait Partition: sealed::Sealed + Send + Sync + 'static {
    const NAME: &'static str;
}

/// Rows of the training subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Training {}

/// Rows of the held-out test subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Holdout {}

/// Rows submitted for prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Serving {}

impl sealed::Sealed for Training {}
impl sealed::Sealed for Holdout {}
impl sealed::Sealed for Serving {}

impl Partition for Training {
    const NAME: &'static str = "training";
}
impl Partition for Holdout {
    const NAME: &'static str = "holdout";
}
impl Partition for Serving {
    const NAME: &'static str = "serving";
}

/// Named feature columns; missing entries are stored as `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame<P: Partition> {
    names: Vec<String>,
    values: Array2<f64>,
    _partition: PhantomData<P>,
}

impl<P: Partition> FeatureFrame<P> {
    pub fn new(names: Vec<String>, values: Array2<f64>) -> Result<Self> {
        if names.len() != values.ncols() {
            return Err(PipelineError::data(
                Stage::Transformation,
                format!(
                    "{} frame has {} column names for {} value columns",
                    P::NAME,
                    names.len(),
                    values.ncols()
                ),
            ));
        }
        Ok(FeatureFrame {
            names,
            values,
            _partition: PhantomData,
        })
    }

    pub fn from_rows(names: Vec<String>, rows: &[Vec<f64>]) -> Result<Self> {
        let ncols = names.len();
        let mut flat = Vec::with_capacity(rows.len() * ncols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != ncols {
                return Err(PipelineError::data(
                    Stage::Transformation,
                    format!("row {} has {} values, expected {}", i, row.len(), ncols),
                ));
            }
            flat.extend_from_slice(row);
        }
        let values = Array2::from_shape_vec((rows.len(), ncols), flat).map_err(|e| {
            PipelineError::data_with(Stage::Transformation, "invalid frame shape", e)
        })?;
        Self::new(names, values)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

/// Numeric matrix produced by applying the preprocessing transform, still tagged
/// with the partition it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedFrame<P: Partition> {
    values: Array2<f64>,
    _partition: PhantomData<P>,
}

impl<P: Partition> TransformedFrame<P> {
    pub(crate) fn new(values: Array2<f64>) -> Self {
        TransformedFrame {
            values,
            _partition: PhantomData,
        }
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    pub fn into_inner(self) -> Array2<f64> {
        self.values
    }
}

impl TransformedFrame<Training> {
    /// Append synthetic training rows below the existing ones.
    pub(crate) fn with_appended_rows(&self, extra: &Array2<f64>) -> Result<Self> {
        let stacked = ndarray::concatenate(Axis(0), &[self.values.view(), extra.view()])
            .map_err(|e| {
                PipelineError::data_with(Stage::Resampling, "cannot append synthetic rows", e)
            })?;
        Ok(TransformedFrame::new(stacked))
    }
}

/// Features plus their target labels.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledFrame<P: Partition> {
    pub features: FeatureFrame<P>,
    pub labels: Vec<Label>,
}

impl<P: Partition> LabeledFrame<P> {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Parse one cell; blank, `?`, `NA` and `NaN` count as missing.
pub fn parse_cell(raw: &str) -> std::result::Result<Option<f64>, std::num::ParseFloatError> {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || trimmed == "?"
        || trimmed.eq_ignore_ascii_case("na")
        || trimmed.eq_ignore_ascii_case("nan")
    {
        return Ok(None);
    }
    let value = trimmed.parse::<f64>()?;
    Ok(if value.is_nan() { None } else { Some(value) })
}

/// Parse a target label; only 0 and 1 are accepted.
pub fn parse_label(raw: &str) -> Option<Label> {
    match parse_cell(raw) {
        Ok(Some(v)) if v == 0.0 => Some(0),
        Ok(Some(v)) if v == 1.0 => Some(1),
        _ => None,
    }
}

/// Raw records exactly as read from the source file, validated but unconverted.
#[derive(Debug, Clone)]
pub struct RawDataset {
    headers: StringRecord,
    rows: Vec<StringRecord>,
    target_index: usize,
}

impl RawDataset {
    pub fn read<Q: AsRef<Path>>(path: Q, target_column: &str) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref()).map_err(|e| {
            PipelineError::data_with(
                Stage::Ingestion,
                format!("cannot open raw dataset {}", path.as_ref().display()),
                e,
            )
        })?;
        Self::from_reader(file, target_column)
    }

    pub fn from_reader<R: Read>(reader: R, target_column: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader
            .headers()
            .map_err(|e| PipelineError::data_with(Stage::Ingestion, "cannot read header row", e))?
            .clone();

        let expected = FEATURE_NAMES.len() + 1;
        if headers.len() != expected {
            return Err(PipelineError::data(
                Stage::Ingestion,
                format!("expected {} columns, found {}", expected, headers.len()),
            ));
        }
        for name in FEATURE_NAMES.iter().copied().chain(std::iter::once(target_column)) {
            if !headers.iter().any(|h| h == name) {
                return Err(PipelineError::data(
                    Stage::Ingestion,
                    format!("missing column '{}'", name),
                ));
            }
        }
        let target_index = headers
            .iter()
            .position(|h| h == target_column)
            .ok_or_else(|| {
                PipelineError::data(Stage::Ingestion, format!("missing column '{}'", target_column))
            })?;

        let mut rows = Vec::new();
        for (row_idx, result) in reader.records().enumerate() {
            let record = result.map_err(|e| {
                PipelineError::data_with(
                    Stage::Ingestion,
                    format!("unparsable row {}", row_idx + 1),
                    e,
                )
            })?;
            for (col_idx, value) in record.iter().enumerate() {
                if col_idx == target_index {
                    if parse_label(value).is_none() {
                        return Err(PipelineError::data(
                            Stage::Ingestion,
                            format!(
                                "row {}: target '{}' must be 0 or 1, got '{}'",
                                row_idx + 1,
                                target_column,
                                value
                            ),
                        ));
                    }
                } else if let Err(e) = parse_cell(value) {
                    return Err(PipelineError::data_with(
                        Stage::Ingestion,
                        format!(
                            "row {}: non-numeric value '{}' in column '{}'",
                            row_idx + 1,
                            value,
                            &headers[col_idx]
                        ),
                        e,
                    ));
                }
            }
            rows.push(record);
        }

        Ok(RawDataset {
            headers,
            rows,
            target_index,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }

    pub fn rows(&self) -> &[StringRecord] {
        &self.rows
    }

    pub fn labels(&self) -> Vec<Label> {
        self.rows
            .iter()
            .map(|r| parse_label(&r[self.target_index]).unwrap_or_default())
            .collect()
    }

    /// Serialize the selected rows (header first) as CSV bytes.
    pub fn to_csv_bytes(&self, indices: &[usize]) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(&self.headers)
            .map_err(|e| PipelineError::artifact_with(Stage::Ingestion, "cannot write header", e))?;
        for &idx in indices {
            writer.write_record(&self.rows[idx]).map_err(|e| {
                PipelineError::artifact_with(Stage::Ingestion, format!("cannot write row {}", idx), e)
            })?;
        }
        writer.into_inner().map_err(|e| {
            PipelineError::artifact_with(Stage::Ingestion, "cannot flush csv buffer", e.into_error())
        })
    }
}

/// Read a split file into a labeled frame of the given partition. Every column
/// other than the target becomes a feature, in header order.
pub fn read_labeled_csv<P: Partition, Q: AsRef<Path>>(
    path: Q,
    target_column: &str,
) -> Result<LabeledFrame<P>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| {
            PipelineError::data_with(
                Stage::Transformation,
                format!("cannot open {} data {}", P::NAME, path.display()),
                e,
            )
        })?;

    let headers = reader
        .headers()
        .map_err(|e| PipelineError::data_with(Stage::Transformation, "cannot read header row", e))?
        .clone();
    let target_idx = headers.iter().position(|h| h == target_column).ok_or_else(|| {
        PipelineError::schema(
            Stage::Transformation,
            target_column,
            format!("target column absent from {}", path.display()),
        )
    })?;
    let names: Vec<String> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != target_idx)
        .map(|(_, h)| h.to_string())
        .collect();

    let mut rows = Vec::new();
    let mut labels = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| {
            PipelineError::data_with(
                Stage::Transformation,
                format!("unparsable row {} in {}", row_idx + 1, path.display()),
                e,
            )
        })?;
        let label = parse_label(&record[target_idx]).ok_or_else(|| {
            PipelineError::data(
                Stage::Transformation,
                format!("row {}: missing or invalid target label", row_idx + 1),
            )
        })?;
        let mut row = Vec::with_capacity(names.len());
        for (col_idx, value) in record.iter().enumerate() {
            if col_idx == target_idx {
                continue;
            }
            let parsed = parse_cell(value).map_err(|e| {
                PipelineError::data_with(
                    Stage::Transformation,
                    format!("row {}: non-numeric value in column '{}'", row_idx + 1, &headers[col_idx]),
                    e,
                )
            })?;
            row.push(parsed.unwrap_or(f64::NAN));
        }
        rows.push(row);
        labels.push(label);
    }

    log::debug!("Read {} {} rows from {}", rows.len(), P::NAME, path.display());

    Ok(LabeledFrame {
        features: FeatureFrame::from_rows(names, &rows)?,
        labels,
    })
}

/// Count of (class 0, class 1) labels.
pub fn class_counts(labels: &[Label]) -> (usize, usize) {
    let positives = labels.iter().filter(|&&l| l == 1).count();
    (labels.len() - positives, positives)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const HEADER: &str = "age,sex,cp,trestbps,chol,fbs,restecg,thalach,exang,oldpeak,slope,ca,thal,condition";

    #[test]
    fn missing_tokens_parse_as_none() {
        for token in ["", " ", "?", "NA", "nan", "NaN"] {
            assert_eq!(parse_cell(token).unwrap(), None, "token {:?}", token);
        }
        assert_eq!(parse_cell(" 2.5 ").unwrap(), Some(2.5));
        assert!(parse_cell("abc").is_err());
    }

    #[test]
    fn labels_must_be_binary() {
        assert_eq!(parse_label("0"), Some(0));
        assert_eq!(parse_label("1.0"), Some(1));
        assert_eq!(parse_label("2"), None);
        assert_eq!(parse_label(""), None);
    }

    #[test]
    fn raw_dataset_accepts_missing_features() {
        let csv = format!("{}\n63,1,0,145,,1,2,150,0,2.3,2,0,1,0\n", HEADER);
        let ds = RawDataset::from_reader(csv.as_bytes(), TARGET_COLUMN).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.labels(), vec![0]);
    }

    #[test]
    fn raw_dataset_rejects_missing_target() {
        let csv = format!("{}\n63,1,0,145,233,1,2,150,0,2.3,2,0,1,\n", HEADER);
        let err = RawDataset::from_reader(csv.as_bytes(), TARGET_COLUMN).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);
        assert_eq!(err.stage(), Stage::Ingestion);
    }

    #[test]
    fn raw_dataset_rejects_wrong_column_count() {
        let csv = "age,sex,condition\n63,1,0\n";
        let err = RawDataset::from_reader(csv.as_bytes(), TARGET_COLUMN).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);

        let ragged = format!("{}\n63,1,0,145\n", HEADER);
        let err = RawDataset::from_reader(ragged.as_bytes(), TARGET_COLUMN).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);
    }

    #[test]
    fn frame_rejects_mismatched_names() {
        let values = Array2::<f64>::zeros((2, 3));
        let err = FeatureFrame::<Training>::new(vec!["a".into(), "b".into()], values).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);
    }

    #[test]
    fn class_counts_splits_by_label() {
        assert_eq!(class_counts(&[0, 1, 1, 0, 1]), (2, 3));
    }
}
