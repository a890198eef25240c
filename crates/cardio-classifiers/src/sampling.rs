//! Synthetic minority oversampling (SMOTE).
use std::cmp::Ordering;

use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::dataset::{class_counts, Label, Training, TransformedFrame};
use crate::error::{PipelineError, Result, Stage};

/// Oversamples the minority class until both classes have the same count.
///
/// Each synthetic row is `x + gap * (neighbor - x)` for a random minority row
/// `x`, one of its `k_neighbors` nearest minority rows and `gap` drawn
/// uniformly from `[0, 1)`. Only training frames are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Smote {
    k_neighbors: usize,
    seed: u64,
}

impl Smote {
    pub fn new(k_neighbors: usize, seed: u64) -> Self {
        Smote { k_neighbors, seed }
    }

    /// Return the original rows followed by the synthetic ones, with labels to
    /// match.
    pub fn fit_resample(
        &self,
        x: &TransformedFrame<Training>,
        y: &[Label],
    ) -> Result<(TransformedFrame<Training>, Vec<Label>)> {
        if x.nrows() != y.len() {
            return Err(PipelineError::data(
                Stage::Resampling,
                format!("{} training rows but {} labels", x.nrows(), y.len()),
            ));
        }
        if self.k_neighbors == 0 {
            return Err(PipelineError::data(
                Stage::Resampling,
                "SMOTE needs at least one neighbor",
            ));
        }

        let (neg, pos) = class_counts(y);
        if neg == 0 || pos == 0 {
            return Err(PipelineError::data(
                Stage::Resampling,
                format!(
                    "training labels contain a single class (0={}, 1={}); cannot rebalance",
                    neg, pos
                ),
            ));
        }
        let (minority_label, minority_count, majority_count): (Label, usize, usize) = if pos < neg {
            (1, pos, neg)
        } else {
            (0, neg, pos)
        };
        // checked for balanced input as well
        if minority_count <= self.k_neighbors {
            return Err(PipelineError::data(
                Stage::Resampling,
                format!(
                    "minority class {} has {} samples; SMOTE with k={} needs at least {}",
                    minority_label,
                    minority_count,
                    self.k_neighbors,
                    self.k_neighbors + 1
                ),
            ));
        }
        if minority_count == majority_count {
            log::info!("Classes already balanced ({} each); no synthetic rows added", neg);
            return Ok((x.clone(), y.to_vec()));
        }

        let values = x.values();
        let minority: Vec<usize> = y
            .iter()
            .enumerate()
            .filter(|&(_, &l)| l == minority_label)
            .map(|(i, _)| i)
            .collect();
        let neighbors = nearest_neighbors(values, &minority, self.k_neighbors);

        let n_synthetic = majority_count - minority_count;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut synthetic = Array2::<f64>::zeros((n_synthetic, x.ncols()));
        for mut row in synthetic.rows_mut() {
            let sample = rng.gen_range(0..minority.len());
            let neighbor = neighbors[sample][rng.gen_range(0..self.k_neighbors)];
            let gap: f64 = rng.gen();
            let base = values.row(minority[sample]);
            let other = values.row(neighbor);
            for ((out, &a), &b) in row.iter_mut().zip(base.iter()).zip(other.iter()) {
                *out = a + gap * (b - a);
            }
        }

        let resampled = x.with_appended_rows(&synthetic)?;
        let mut labels = y.to_vec();
        labels.extend(std::iter::repeat(minority_label).take(n_synthetic));

        log::info!(
            "SMOTE added {} synthetic rows of class {}; class counts now 0={}, 1={}",
            n_synthetic,
            minority_label,
            if minority_label == 0 { majority_count } else { neg },
            if minority_label == 1 { majority_count } else { pos }
        );
        Ok((resampled, labels))
    }
}

fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// For every row in `members`, the row indices of its `k` nearest other
/// members. Ties on distance go to the lower row index.
fn nearest_neighbors(values: &Array2<f64>, members: &[usize], k: usize) -> Vec<Vec<usize>> {
    members
        .par_iter()
        .map(|&i| {
            let mut dists: Vec<(f64, usize)> = members
                .iter()
                .filter(|&&j| j != i)
                .map(|&j| (squared_distance(values.row(i), values.row(j)), j))
                .collect();
            dists.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal).then(a.1.cmp(&b.1)));
            dists.into_iter().take(k).map(|(_, j)| j).collect()
        })
        .collect()
}
