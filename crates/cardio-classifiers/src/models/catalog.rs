use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::tree::SplitCriterion;

/// Candidate model families, in catalog order.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    LogisticRegression,
    DecisionTree,
    GradientBoosting,
}

impl ModelFamily {
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelFamily::LogisticRegression => "Logistic Regression",
            ModelFamily::DecisionTree => "Decision Tree",
            ModelFamily::GradientBoosting => "Gradient Boosting",
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One concrete point of a family's hyper-parameter space.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub enum HyperParams {
    LogisticRegression {
        /// Inverse L2 regularisation strength.
        c: f64,
        max_iter: usize,
    },
    DecisionTree {
        criterion: SplitCriterion,
        max_depth: Option<usize>,
        min_samples_split: usize,
    },
    GradientBoosting {
        iterations: usize,
        max_depth: u32,
        min_leaf_size: usize,
        shrinkage: f32,
    },
}

impl HyperParams {
    pub fn family(&self) -> ModelFamily {
        match self {
            HyperParams::LogisticRegression { .. } => ModelFamily::LogisticRegression,
            HyperParams::DecisionTree { .. } => ModelFamily::DecisionTree,
            HyperParams::GradientBoosting { .. } => ModelFamily::GradientBoosting,
        }
    }
}

impl fmt::Display for HyperParams {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HyperParams::LogisticRegression { c, max_iter } => {
                write!(f, "c={}, max_iter={}", c, max_iter)
            }
            HyperParams::DecisionTree {
                criterion,
                max_depth,
                min_samples_split,
            } => {
                let depth = max_depth.map_or("none".to_string(), |d| d.to_string());
                write!(
                    f,
                    "criterion={}, max_depth={}, min_samples_split={}",
                    criterion, depth, min_samples_split
                )
            }
            HyperParams::GradientBoosting {
                iterations,
                max_depth,
                min_leaf_size,
                shrinkage,
            } => write!(
                f,
                "iterations={}, max_depth={}, min_leaf_size={}, shrinkage={}",
                iterations, max_depth, min_leaf_size, shrinkage
            ),
        }
    }
}

/// A fully grown gini tree.
impl Default for HyperParams {
    fn default() -> Self {
        HyperParams::DecisionTree {
            criterion: SplitCriterion::Gini,
            max_depth: None,
            min_samples_split: 2,
        }
    }
}

/// Enumerated search space for one family.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub enum ParamGrid {
    LogisticRegression {
        c: Vec<f64>,
        max_iter: Vec<usize>,
    },
    DecisionTree {
        criterion: Vec<SplitCriterion>,
        max_depth: Vec<Option<usize>>,
        min_samples_split: Vec<usize>,
    },
    GradientBoosting {
        iterations: Vec<usize>,
        max_depth: Vec<u32>,
        min_leaf_size: Vec<usize>,
        shrinkage: Vec<f32>,
    },
}

impl ParamGrid {
    pub fn family(&self) -> ModelFamily {
        match self {
            ParamGrid::LogisticRegression { .. } => ModelFamily::LogisticRegression,
            ParamGrid::DecisionTree { .. } => ModelFamily::DecisionTree,
            ParamGrid::GradientBoosting { .. } => ModelFamily::GradientBoosting,
        }
    }

    /// Cartesian product of the grid; parameters are nested in name order with
    /// the last one varying fastest.
    pub fn combinations(&self) -> Vec<HyperParams> {
        let mut out = Vec::new();
        match self {
            ParamGrid::LogisticRegression { c, max_iter } => {
                for &c in c {
                    for &max_iter in max_iter {
                        out.push(HyperParams::LogisticRegression { c, max_iter });
                    }
                }
            }
            ParamGrid::DecisionTree {
                criterion,
                max_depth,
                min_samples_split,
            } => {
                for &criterion in criterion {
                    for &max_depth in max_depth {
                        for &min_samples_split in min_samples_split {
                            out.push(HyperParams::DecisionTree {
                                criterion,
                                max_depth,
                                min_samples_split,
                            });
                        }
                    }
                }
            }
            ParamGrid::GradientBoosting {
                iterations,
                max_depth,
                min_leaf_size,
                shrinkage,
            } => {
                for &iterations in iterations {
                    for &max_depth in max_depth {
                        for &min_leaf_size in min_leaf_size {
                            for &shrinkage in shrinkage {
                                out.push(HyperParams::GradientBoosting {
                                    iterations,
                                    max_depth,
                                    min_leaf_size,
                                    shrinkage,
                                });
                            }
                        }
                    }
                }
            }
        }
        out
    }
}

/// A model family paired with the grid searched for it.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct CandidateModelSpec {
    pub family: ModelFamily,
    pub grid: ParamGrid,
}

impl CandidateModelSpec {
    pub fn new(grid: ParamGrid) -> Self {
        CandidateModelSpec {
            family: grid.family(),
            grid,
        }
    }
}

/// The fixed catalog searched during training: linear, single tree, ensemble.
///
/// The ensemble family is gradient boosting on `gbdt` rather than a random
/// forest, so its grid varies boosting rounds, depth, leaf size and shrinkage
/// instead of forest size. The logistic grid varies only `c` and `max_iter`:
/// `linfa-logistic` has a single L-BFGS solver.
pub fn default_catalog() -> Vec<CandidateModelSpec> {
    vec![
        CandidateModelSpec::new(ParamGrid::LogisticRegression {
            c: vec![0.1, 1.0, 5.0, 10.0],
            max_iter: vec![200, 500, 800],
        }),
        CandidateModelSpec::new(ParamGrid::DecisionTree {
            criterion: vec![SplitCriterion::Gini, SplitCriterion::Entropy],
            max_depth: vec![Some(3), Some(5), Some(10), None],
            min_samples_split: vec![2, 5, 10],
        }),
        CandidateModelSpec::new(ParamGrid::GradientBoosting {
            iterations: vec![50, 100, 200],
            max_depth: vec![3, 5],
            min_leaf_size: vec![1, 2],
            shrinkage: vec![0.05, 0.1],
        }),
    ]
}
