//! Workload health scoring
//!
//! Every workload kind implements [`Workload`], reporting its replica
//! counts and the issues it exhibits. A single evaluator turns issues into
//! a 0-100 score by additive penalty deduction.

mod rubric;
mod scorer;


pub use rubric::{Issue, Workload};
pub use scorer::{evaluate, WorkloadHealthScorer};
