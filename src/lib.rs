#![forbid(unsafe_code)]

//! SLA dashboard (slad): live service-level milestone counters for support
//! cases.
//!
//! Three layers:
//! 1. **Milestones** — time-remaining resolution, threshold buckets and
//!    per-type aggregation into gauge counters
//! 2. **Case tables** — configurable columns, flattened and normalized rows,
//!    SLA-aware sorting, paging with stale-response protection, CSV export
//! 3. **Dashboard** — a pure update/view state machine plus a runtime that
//!    executes its commands against a [`source::DataSource`]
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use sla_dashboard::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use sla_dashboard::core::config::Config;
//! use sla_dashboard::milestone::aggregator::{AggregationMode, aggregate};
//! ```

pub mod prelude;

pub mod core;
pub mod dashboard;
pub mod logger;
pub mod milestone;
pub mod source;
pub mod table;
