//! Cluster event classification
//!
//! Events are sorted into severity tiers, aggregated into recurring error
//! patterns, and re-emitted as resource-pressure and security signals.
//! The three views are independent: one event can appear in all of them.

mod classifier;


pub use classifier::EventClassifier;
