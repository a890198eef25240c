//! Class rebalancing, cross-validated grid search and model selection.
//!
//! Every (hyper-parameter combination, fold) pair is an independent unit of
//! work evaluated on the rayon pool. Results for a family are aggregated only
//! once all of its units have finished.
use std::path::Path;
use std::time::Instant;

use ndarray::{Array2, Axis};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};

use crate::artifacts::{load_artifact, save_artifact};
use crate::config::{ArtifactLayout, SearchConfig};
use crate::dataset::{class_counts, Holdout, Label, Partition, Training, TransformedFrame};
use crate::error::{PipelineError, Result, Stage};
use crate::metrics::accuracy;
use crate::models::{build_model, ClassifierModel, HyperParams, Model, ModelFamily};
use crate::sampling::Smote;

/// The selected, fitted classifier together with how it was chosen.
#[derive(Serialize, Deserialize, Debug)]
pub struct TrainedModel {
    family: ModelFamily,
    params: HyperParams,
    cv_accuracy: f64,
    test_accuracy: f64,
    model: Model,
}

impl TrainedModel {
    pub fn family(&self) -> ModelFamily {
        self.family
    }

    pub fn params(&self) -> &HyperParams {
        &self.params
    }

    /// Mean cross-validated accuracy of the chosen combination.
    pub fn cv_accuracy(&self) -> f64 {
        self.cv_accuracy
    }

    /// Accuracy on the held-out test partition.
    pub fn test_accuracy(&self) -> f64 {
        self.test_accuracy
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn predict<P: Partition>(&self, x: &TransformedFrame<P>) -> Result<Vec<Label>> {
        self.model.predict(x.values())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_artifact(path, self, Stage::Persistence)
    }

    pub fn load(path: &Path) -> Result<Self> {
        load_artifact(path, Stage::Persistence)
    }
}

/// Keep the first candidate with the highest score. A later candidate replaces
/// the current best only when its score is strictly greater, so ties keep the
/// earlier one.
pub fn select_best<T, I>(candidates: I) -> Option<(T, f64)>
where
    I: IntoIterator<Item = (T, f64)>,
{
    let mut best: Option<(T, f64)> = None;
    for (item, score) in candidates {
        let replace = match &best {
            None => true,
            Some((_, current)) => score > *current,
        };
        if replace {
            best = Some((item, score));
        }
    }
    best
}

/// Stratified k-fold without shuffling: returns the validation indices of
/// each fold. Each class is cut into `k` contiguous chunks in row order, the
/// first `n_class % k` chunks one row larger than the rest.
pub fn stratified_folds(y: &[Label], k: usize) -> Result<Vec<Vec<usize>>> {
    if k < 2 {
        return Err(PipelineError::training(
            Stage::ModelSearch,
            format!("cross-validation needs at least 2 folds, got {}", k),
        ));
    }
    let mut folds: Vec<Vec<usize>> = vec![Vec::new(); k];
    for class in [0, 1] {
        let members: Vec<usize> = (0..y.len()).filter(|&i| y[i] == class).collect();
        if members.len() < k {
            return Err(PipelineError::data(
                Stage::ModelSearch,
                format!(
                    "class {} has {} samples, fewer than the {} folds requested",
                    class,
                    members.len(),
                    k
                ),
            ));
        }
        let base = members.len() / k;
        let extra = members.len() % k;
        let mut start = 0;
        for (fold, out) in folds.iter_mut().enumerate() {
            let size = base + usize::from(fold < extra);
            out.extend_from_slice(&members[start..start + size]);
            start += size;
        }
    }
    for fold in folds.iter_mut() {
        fold.sort_unstable();
    }
    Ok(folds)
}

struct FoldData {
    x_fit: Array2<f64>,
    y_fit: Vec<Label>,
    x_val: Array2<f64>,
    y_val: Vec<Label>,
}

fn build_fold_data(x: &Array2<f64>, y: &[Label], folds: &[Vec<usize>]) -> Vec<FoldData> {
    folds
        .iter()
        .map(|val_idx| {
            let mut in_val = vec![false; y.len()];
            for &i in val_idx {
                in_val[i] = true;
            }
            let fit_idx: Vec<usize> = (0..y.len()).filter(|&i| !in_val[i]).collect();
            FoldData {
                x_fit: x.select(Axis(0), &fit_idx),
                y_fit: fit_idx.iter().map(|&i| y[i]).collect(),
                x_val: x.select(Axis(0), val_idx),
                y_val: val_idx.iter().map(|&i| y[i]).collect(),
            }
        })
        .collect()
}

fn score_unit(params: &HyperParams, fold: &FoldData) -> Result<f64> {
    let mut model = build_model(params);
    model.fit(&fold.x_fit, &fold.y_fit)?;
    let predicted = model.predict(&fold.x_val)?;
    accuracy(&fold.y_val, &predicted)
}

/// Searches the candidate catalog and persists the winning model.
#[derive(Debug)]
pub struct ModelSearch {
    config: SearchConfig,
    layout: ArtifactLayout,
    pool: Option<ThreadPool>,
}

impl ModelSearch {
    /// With `n_jobs` set, grid units run on a dedicated pool of that size;
    /// otherwise on rayon's global pool.
    pub fn new(config: SearchConfig, layout: ArtifactLayout) -> Result<Self> {
        let pool = match config.n_jobs {
            Some(0) => {
                return Err(PipelineError::training(
                    Stage::ModelSearch,
                    "n_jobs must be positive when set",
                ))
            }
            Some(n) => Some(ThreadPoolBuilder::new().num_threads(n).build().map_err(|e| {
                PipelineError::training_with(Stage::ModelSearch, "cannot build worker pool", e)
            })?),
            None => None,
        };
        Ok(ModelSearch {
            config,
            layout,
            pool,
        })
    }

    fn in_pool<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }

    fn check_budget(&self, started: Instant) -> Result<()> {
        if let Some(limit) = self.config.max_search_seconds {
            let elapsed = started.elapsed().as_secs_f64();
            if elapsed > limit as f64 {
                return Err(PipelineError::training(
                    Stage::ModelSearch,
                    format!(
                        "model search exceeded its budget of {}s ({:.1}s elapsed)",
                        limit, elapsed
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Rebalance the training rows, grid-search every candidate family with
    /// stratified k-fold cross-validation, refit each family's best
    /// combination on all rebalanced rows, and keep the family with the
    /// highest test accuracy. The winner is written to the model artifact.
    pub fn search(
        &self,
        x_train: &TransformedFrame<Training>,
        y_train: &[Label],
        x_test: &TransformedFrame<Holdout>,
        y_test: &[Label],
    ) -> Result<(TrainedModel, f64)> {
        let started = Instant::now();
        log::info!("Entered model training");

        let smote = Smote::new(self.config.smote_neighbors, self.config.random_seed);
        let (x_bal, y_bal) = smote.fit_resample(x_train, y_train)?;
        let (neg, pos) = class_counts(&y_bal);
        log::info!("Rebalanced training set: {} rows (0={}, 1={})", y_bal.len(), neg, pos);

        let folds = stratified_folds(&y_bal, self.config.cv_folds)?;
        let fold_data = build_fold_data(x_bal.values(), &y_bal, &folds);

        let mut finalists: Vec<TrainedModel> = Vec::new();
        for spec in &self.config.candidates {
            let family = spec.grid.family();
            if spec.family != family {
                log::warn!(
                    "Candidate labelled {} carries a {} grid; using the grid's family",
                    spec.family,
                    family
                );
            }
            let combos = spec.grid.combinations();
            if combos.is_empty() {
                log::warn!("{}: empty hyper-parameter grid, skipping", family);
                continue;
            }
            log::info!(
                "{}: evaluating {} combinations x {} folds",
                family,
                combos.len(),
                fold_data.len()
            );

            let units: Vec<(usize, usize)> = (0..combos.len())
                .flat_map(|c| (0..fold_data.len()).map(move |f| (c, f)))
                .collect();
            let scores: Vec<Option<f64>> = self.in_pool(|| {
                units
                    .par_iter()
                    .map(|&(c, f)| match score_unit(&combos[c], &fold_data[f]) {
                        Ok(score) => Some(score),
                        Err(e) => {
                            log::warn!("{} [{}] fold {} failed: {}", family, combos[c], f, e);
                            None
                        }
                    })
                    .collect()
            });
            self.check_budget(started)?;

            let means = combos.iter().enumerate().filter_map(|(c, params)| {
                let per_fold = &scores[c * fold_data.len()..(c + 1) * fold_data.len()];
                let total: Option<f64> = per_fold.iter().copied().sum();
                total.map(|t| (params, t / fold_data.len() as f64))
            });
            let Some((best_params, cv_accuracy)) = select_best(means) else {
                log::warn!("{}: no combination survived cross-validation, skipping", family);
                continue;
            };
            log::info!(
                "{}: best params [{}] with cv accuracy {:.4}",
                family,
                best_params,
                cv_accuracy
            );

            let mut model = build_model(best_params);
            let refit = model
                .fit(x_bal.values(), &y_bal)
                .and_then(|_| model.predict(x_test.values()))
                .and_then(|predicted| accuracy(y_test, &predicted));
            let test_accuracy = match refit {
                Ok(acc) => acc,
                Err(e) => {
                    log::warn!("{}: refit on the full training set failed: {}", family, e);
                    continue;
                }
            };
            log::info!("{}: test accuracy {:.4}", family, test_accuracy);

            finalists.push(TrainedModel {
                family,
                params: best_params.clone(),
                cv_accuracy,
                test_accuracy,
                model,
            });
            self.check_budget(started)?;
        }

        let (best, best_accuracy) = select_best(finalists.into_iter().map(|m| {
            let score = m.test_accuracy;
            (m, score)
        }))
        .ok_or_else(|| {
            PipelineError::training(Stage::ModelSearch, "no candidate produced a usable estimator")
        })?;
        log::info!(
            "Best model: {} [{}] with test accuracy {:.4}",
            best.family,
            best.params,
            best_accuracy
        );

        let model_path = self.layout.model();
        best.save(&model_path)?;
        log::info!("Saved trained model to {}", model_path.display());
        Ok((best, best_accuracy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::tree::SplitCriterion;
    use crate::models::{CandidateModelSpec, ParamGrid};

    /// Two features; the label is the sign of the first one.
    fn frames(
        n_train: usize,
        n_test: usize,
    ) -> (TransformedFrame<Training>, Vec<Label>, TransformedFrame<Holdout>, Vec<Label>) {
        fn rows(n: usize, offset: f64) -> (Array2<f64>, Vec<Label>) {
            let values: Vec<f64> = (0..n)
                .flat_map(|i| {
                    let sign = if i % 2 == 0 { -1.0 } else { 1.0 };
                    [sign * (1.0 + (i as f64 + offset) * 0.1), ((i * 7) % 5) as f64 / 5.0]
                })
                .collect();
            let labels = (0..n).map(|i| (i % 2) as Label).collect();
            (Array2::from_shape_vec((n, 2), values).unwrap(), labels)
        }
        let (x_train, y_train) = rows(n_train, 0.0);
        let (x_test, y_test) = rows(n_test, 0.5);
        (TransformedFrame::new(x_train), y_train, TransformedFrame::new(x_test), y_test)
    }

    fn search_with(
        dir: &Path,
        candidates: Vec<CandidateModelSpec>,
        budget: Option<u64>,
    ) -> Result<(TrainedModel, f64)> {
        let config = SearchConfig {
            n_jobs: Some(2),
            max_search_seconds: budget,
            candidates,
            ..SearchConfig::default()
        };
        let (x_train, y_train, x_test, y_test) = frames(40, 10);
        ModelSearch::new(config, ArtifactLayout::new(dir))?.search(&x_train, &y_train, &x_test, &y_test)
    }

    fn tree_grid(max_depth: Vec<Option<usize>>) -> CandidateModelSpec {
        CandidateModelSpec::new(ParamGrid::DecisionTree {
            criterion: vec![SplitCriterion::Gini],
            max_depth,
            min_samples_split: vec![2],
        })
    }

    #[test]
    fn every_grid_failing_is_a_training_error() {
        let dir = tempfile::tempdir().unwrap();
        let candidates = vec![
            CandidateModelSpec::new(ParamGrid::LogisticRegression {
                c: vec![-1.0],
                max_iter: vec![100],
            }),
            tree_grid(vec![Some(0)]),
            CandidateModelSpec::new(ParamGrid::GradientBoosting {
                iterations: vec![0],
                max_depth: vec![3],
                min_leaf_size: vec![1],
                shrinkage: vec![0.1],
            }),
        ];
        let err = search_with(dir.path(), candidates, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Training);
        assert!(err.to_string().contains("no candidate produced a usable estimator"));
        assert!(!ArtifactLayout::new(dir.path()).model().exists());
    }

    #[test]
    fn failing_combinations_are_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let candidates = vec![
            CandidateModelSpec::new(ParamGrid::LogisticRegression {
                c: vec![0.0],
                max_iter: vec![100],
            }),
            tree_grid(vec![Some(0), Some(3)]),
        ];
        let (model, accuracy) = search_with(dir.path(), candidates, None).unwrap();
        assert_eq!(model.family(), ModelFamily::DecisionTree);
        assert_eq!(
            model.params(),
            &HyperParams::DecisionTree {
                criterion: SplitCriterion::Gini,
                max_depth: Some(3),
                min_samples_split: 2,
            }
        );
        assert_eq!(accuracy, 1.0);
        assert!(ArtifactLayout::new(dir.path()).model().exists());
    }

    #[test]
    fn exceeding_the_search_budget_is_a_training_error() {
        let dir = tempfile::tempdir().unwrap();
        let candidates = vec![tree_grid(vec![Some(1), Some(2), Some(3), None])];
        let err = search_with(dir.path(), candidates, Some(0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Training);
        assert!(err.to_string().contains("budget"));
        assert!(!ArtifactLayout::new(dir.path()).model().exists());
    }

    #[test]
    fn ties_keep_the_first_candidate() {
        let picked = select_best(vec![("a", 0.8), ("b", 0.8), ("c", 0.7)]).unwrap();
        assert_eq!(picked, ("a", 0.8));
        let picked = select_best(vec![("a", 0.8), ("b", 0.9)]).unwrap();
        assert_eq!(picked.0, "b");
        assert!(select_best(Vec::<(&str, f64)>::new()).is_none());
    }

    #[test]
    fn first_candidate_is_accepted_even_at_zero() {
        assert_eq!(select_best(vec![("only", 0.0)]), Some(("only", 0.0)));
    }

    #[test]
    fn folds_are_stratified_and_cover_every_row() {
        let y: Vec<Label> = (0..20).map(|i| if i % 4 == 0 { 1 } else { 0 }).collect();
        let folds = stratified_folds(&y, 5).unwrap();
        assert_eq!(folds.len(), 5);
        let mut all: Vec<usize> = folds.iter().flatten().copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..20).collect::<Vec<_>>());
        for fold in &folds {
            assert_eq!(fold.iter().filter(|&&i| y[i] == 1).count(), 1);
            assert_eq!(fold.len(), 4);
        }
    }

    #[test]
    fn too_few_rows_for_folds_is_a_data_error() {
        let err = stratified_folds(&[0, 0, 1], 5).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);
        assert_eq!(err.stage(), Stage::ModelSearch);
        assert_eq!(stratified_folds(&[0, 1], 1).unwrap_err().kind(), ErrorKind::Training);
    }

    #[test]
    fn zero_jobs_is_rejected() {
        let config = SearchConfig {
            n_jobs: Some(0),
            ..SearchConfig::default()
        };
        assert!(ModelSearch::new(config, ArtifactLayout::new("unused")).is_err());
    }
}
