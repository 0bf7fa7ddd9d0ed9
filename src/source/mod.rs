//! Data source seam: the remote collaborator supplying milestone snapshots and
//! case pages.

#![allow(missing_docs)]

pub mod fixture;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::errors::Result;
use crate::milestone::model::{MilestoneRecord, MilestoneType, Priority, lenient_records};
use crate::table::columns::StaticMetadata;
use crate::table::sort::SortDirection;

pub use fixture::FixtureSource;

/// Bulk snapshot for aggregation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarySnapshot {
    #[serde(default, deserialize_with = "lenient_records")]
    pub milestone_list: Vec<MilestoneRecord>,
}

/// Parameters of one case-page fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CasePageParams {
    /// Account scope, passed through untouched.
    pub scope_id: Option<String>,
    /// Milestone type whose drill-down is open.
    pub milestone_type: MilestoneType,
    /// Dotted field paths to fetch.
    pub fields: Vec<String>,
    /// Dotted sort path.
    pub sort_field: Option<String>,
    pub sort_direction: SortDirection,
    pub search_term: String,
    pub offset: usize,
    pub limit: usize,
    /// Empty means every priority.
    pub priority_filter: Vec<Priority>,
    pub has_jira: bool,
    pub is_stopped: bool,
    pub only_first_sla: bool,
}

impl CasePageParams {
    /// Unfiltered first page for a milestone type.
    #[must_use]
    pub fn first_page(milestone_type: MilestoneType, limit: usize) -> Self {
        Self {
            scope_id: None,
            milestone_type,
            fields: Vec::new(),
            sort_field: None,
            sort_direction: SortDirection::Asc,
            search_term: String::new(),
            offset: 0,
            limit,
            priority_filter: Vec::new(),
            has_jira: false,
            is_stopped: false,
            only_first_sla: false,
        }
    }
}

/// Remote data source. A page shorter than `limit` signals end of data.
pub trait DataSource: Send + Sync {
    fn fetch_summary(&self, scope_id: Option<&str>) -> Result<SummarySnapshot>;
    fn fetch_case_page(&self, params: &CasePageParams) -> Result<Vec<Value>>;

    /// Object metadata for column labels and types, snapshotted by the caller.
    fn metadata(&self) -> StaticMetadata {
        StaticMetadata::default()
    }
}
