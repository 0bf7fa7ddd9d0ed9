//! Milestone domain: record model, time-remaining resolution, severity
//! thresholds, per-type aggregation, and gauge derivation.

pub mod aggregator;
pub mod gauge;
pub mod model;
pub mod threshold;
pub mod time_remaining;
