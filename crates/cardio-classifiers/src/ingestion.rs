//! Dataset ingestion: read the raw records, keep an unmodified copy and write
//! a reproducible train/test split.
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::artifacts::StagedWrites;
use crate::config::{ArtifactLayout, SplitConfig};
use crate::dataset::{class_counts, RawDataset};
use crate::error::{PipelineError, Result, Stage};

/// Shuffle `0..n` with `seed` and cut it into (train, test) index sets.
///
/// `test` holds `ceil(test_fraction * n)` indices taken from the front of the
/// permutation; `train` holds the rest. The two are disjoint and together
/// cover every index exactly once.
pub fn partition_indices(n: usize, test_fraction: f64, seed: u64) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(PipelineError::data(
            Stage::Ingestion,
            format!("test fraction must be in (0, 1), got {}", test_fraction),
        ));
    }
    if n == 0 {
        return Err(PipelineError::data(Stage::Ingestion, "raw dataset has no rows"));
    }
    let n_test = (test_fraction * n as f64).ceil() as usize;
    let n_train = n - n_test.min(n);
    if n_train == 0 {
        return Err(PipelineError::data(
            Stage::Ingestion,
            format!(
                "{} rows with test fraction {} leaves an empty training set",
                n, test_fraction
            ),
        ));
    }

    let mut permutation: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    permutation.shuffle(&mut rng);

    let train = permutation.split_off(n_test);
    Ok((train, permutation))
}

/// Splits the raw dataset into train and test files under the artifact root.
#[derive(Debug, Clone)]
pub struct DatasetSplitter {
    layout: ArtifactLayout,
    config: SplitConfig,
}

impl DatasetSplitter {
    pub fn new(layout: ArtifactLayout, config: SplitConfig) -> Self {
        DatasetSplitter { layout, config }
    }

    /// Read `raw_source`, persist the raw copy and the split, and return the
    /// (train, test) locations.
    ///
    /// The raw copy is written alongside the split but is not part of the
    /// returned contract; nothing downstream reads it. All three files are
    /// staged first and published together, so a failure leaves none of them
    /// half-written.
    pub fn split(&self, raw_source: &Path) -> Result<(PathBuf, PathBuf)> {
        log::info!("Entered data ingestion, reading {}", raw_source.display());

        let raw_bytes = std::fs::read(raw_source).map_err(|e| {
            PipelineError::data_with(
                Stage::Ingestion,
                format!("cannot read raw dataset {}", raw_source.display()),
                e,
            )
        })?;
        let dataset = RawDataset::from_reader(raw_bytes.as_slice(), &self.config.target_column)?;
        let (negatives, positives) = class_counts(&dataset.labels());
        log::info!(
            "Dataset read successfully: {} rows ({} without disease, {} with disease)",
            dataset.len(),
            negatives,
            positives
        );

        let (train_idx, test_idx) = partition_indices(
            dataset.len(),
            self.config.test_fraction,
            self.config.random_seed,
        )?;
        log::info!(
            "Train-test split: {} train rows, {} test rows (seed {})",
            train_idx.len(),
            test_idx.len(),
            self.config.random_seed
        );

        let train_bytes = dataset.to_csv_bytes(&train_idx)?;
        let test_bytes = dataset.to_csv_bytes(&test_idx)?;

        let raw_path = self.layout.raw_data();
        let train_path = self.layout.train_data();
        let test_path = self.layout.test_data();

        let mut staged = StagedWrites::new(Stage::Ingestion);
        staged.stage(&raw_path, &raw_bytes)?;
        staged.stage(&train_path, &train_bytes)?;
        staged.stage(&test_path, &test_bytes)?;
        staged.commit()?;

        log::info!(
            "Data ingestion completed: raw={}, train={}, test={}",
            raw_path.display(),
            train_path.display(),
            test_path.display()
        );
        Ok((train_path, test_path))
    }
}
