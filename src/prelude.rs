//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use sla_dashboard::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{Result, SlaError};

// Milestones
pub use crate::milestone::aggregator::{Aggregation, AggregationMode, RepresentativeRule, aggregate};
pub use crate::milestone::gauge::{GaugeView, gauge_view};
pub use crate::milestone::model::{MilestoneRecord, MilestoneType, Priority, SeverityBucket};
pub use crate::milestone::threshold::Thresholds;

// Tables
pub use crate::table::columns::{Column, build_columns};
pub use crate::table::normalize::{CaseRow, normalize_rows};
pub use crate::table::sequencer::{Partition, RequestSequencer};
pub use crate::table::sort::{SortDirection, SortState};

// Data source and logging
pub use crate::logger::{ActivityLogger, LogSink};
pub use crate::source::{CasePageParams, DataSource, FixtureSource, SummarySnapshot};

// Dashboard
pub use crate::dashboard::model::{DashboardModel, DashboardSettings};
pub use crate::dashboard::runtime::{DashboardRuntime, RunExit, RuntimeEvent};
pub use crate::dashboard::update::{DashboardCmd, DashboardMsg, update};
pub use crate::dashboard::view::{DashboardViewModel, compute_view_model};
