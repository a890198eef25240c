pub mod boosting;
pub mod catalog;
pub mod classifier_trait;
pub mod factory;
pub mod logistic;
pub mod tree;

pub use catalog::{default_catalog, CandidateModelSpec, HyperParams, ModelFamily, ParamGrid};
pub use classifier_trait::ClassifierModel;
pub use factory::{build_model, Model};
