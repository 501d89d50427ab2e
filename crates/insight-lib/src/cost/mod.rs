//! Monthly cost estimation and waste detection
//!
//! This module provides:
//! - Node pricing from an injectable instance price table
//! - Namespace cost from resource requests
//! - Underutilized pod detection with estimated savings
//! - Rule-based optimization suggestions

mod estimator;
mod rules;


pub use estimator::CostEstimator;
pub use rules::{optimization_rules, RuleInputs};
