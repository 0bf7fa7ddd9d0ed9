//! Dashboard state: the single owner of the milestone snapshot, the
//! aggregation, and the drill-down table.
//!
//! All mutation flows through [`crate::dashboard::update::update`]; rendering
//! reads it through [`crate::dashboard::view::compute_view_model`].

#![allow(missing_docs)]

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::config::Config;
use crate::dashboard::scheduler::PollingScheduler;
use crate::milestone::aggregator::{Aggregation, AggregationMode, RepresentativeRule, aggregate};
use crate::milestone::gauge::CounterColors;
use crate::milestone::model::{MilestoneRecord, MilestoneType, Priority, SeverityBucket};
use crate::milestone::threshold::Thresholds;
use crate::source::CasePageParams;
use crate::table::columns::{Column, StaticMetadata, build_columns, query_fields};
use crate::table::export::{EXPORT_FILE_NAME, ExportField};
use crate::table::normalize::{CaseRow, DisplayTimezone, NormalizeContext};
use crate::table::sequencer::{PageRequest, Partition, PartitionPager, RequestSequencer};
use crate::table::sort::SortState;

/// Maximum number of concurrent notifications.
pub const MAX_NOTIFICATIONS: usize = 3;

/// How long a notification stays up.
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(5);

/// Remaining scroll distance below which the next page is requested.
pub const NEAR_BOTTOM_PX: u32 = 50;

// ──────────────────── settings ────────────────────

/// Configuration snapshot the reducer works from.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSettings {
    pub scope_id: Option<String>,
    pub thresholds: Thresholds,
    pub colors: CounterColors,
    pub column_spec: String,
    pub page_size: usize,
    pub export_row_cap: usize,
    /// File or directory the export is written to.
    pub export_path: PathBuf,
    pub jira_base_url: String,
    pub timezone: DisplayTimezone,
    pub representative: RepresentativeRule,
    pub poll_interval: Duration,
    pub flash_interval: Duration,
}

impl DashboardSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            scope_id: config.scope_id.clone(),
            thresholds: config.thresholds,
            colors: config.display.clone(),
            column_spec: config.table.column_spec.clone(),
            page_size: config.table.page_size,
            export_row_cap: config.table.export_row_cap,
            export_path: PathBuf::from(EXPORT_FILE_NAME),
            jira_base_url: config.table.jira_base_url.clone(),
            timezone: config.table.display_timezone,
            representative: config.aggregation.representative,
            poll_interval: Duration::from_secs(config.polling.interval_secs),
            flash_interval: Duration::from_millis(config.polling.flash_interval_ms),
        }
    }

    #[must_use]
    pub fn normalize_context(&self, now: DateTime<Utc>) -> NormalizeContext<'_> {
        NormalizeContext {
            thresholds: &self.thresholds,
            now,
            timezone: self.timezone,
            jira_base_url: &self.jira_base_url,
        }
    }
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

// ──────────────────── notifications ────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A toast handed to the external presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: u64,
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
}

// ──────────────────── drill-down ────────────────────

/// Lifecycle of the drill-down view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DrillState {
    #[default]
    Closed,
    /// Columns built, first page in flight.
    Opening,
    /// Idle and interactive.
    Open,
    /// A later fetch (next page or re-filter) is in flight; still interactive.
    LoadingMore,
}

/// User-controlled filters of the drill-down.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Filters {
    pub search_term: String,
    /// Empty means no priority filter.
    pub priorities: Vec<Priority>,
    pub has_jira: bool,
}

impl Filters {
    /// Add or remove a priority, keeping the canonical priority order.
    pub fn toggle_priority(&mut self, priority: Priority) {
        if self.priorities.contains(&priority) {
            self.priorities.retain(|p| *p != priority);
        } else {
            self.priorities.push(priority);
            self.priorities.sort_by_key(|p| Priority::ALL.iter().position(|q| q == p));
        }
    }

    #[must_use]
    pub fn is_active(&self, priority: Priority) -> bool {
        self.priorities.contains(&priority)
    }
}

/// Rows and paging state of one partition.
#[derive(Debug, Clone)]
pub struct PartitionTable {
    pub pager: PartitionPager,
    pub rows: Vec<CaseRow>,
}

impl PartitionTable {
    fn new(partition: Partition, page_size: usize, sequencer: RequestSequencer) -> Self {
        Self {
            pager: PartitionPager::resume(partition, page_size, sequencer),
            rows: Vec::new(),
        }
    }
}

/// An in-progress column resize gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeDrag {
    pub field_name: String,
    pub start_x: i32,
    pub start_width: u32,
}

/// Export dialog state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExportDialog {
    pub fields: Vec<ExportField>,
    /// The export query is running.
    pub in_flight: bool,
}

/// Everything that exists only while the drill-down is open.
#[derive(Debug, Clone)]
pub struct DrillDown {
    pub milestone_type: MilestoneType,
    pub columns: Vec<Column>,
    /// Parse failure of the configured column spec, when the fallback layout is used.
    pub column_fallback: Option<String>,
    pub sort: SortState,
    pub filters: Filters,
    tables: [PartitionTable; 2],
    /// Set once the first active page was answered (or failed).
    pub first_page_settled: bool,
    pub drag: Option<ResizeDrag>,
    pub export: Option<ExportDialog>,
}

impl DrillDown {
    /// Columns for `milestone_type`, sorted by its SLA column ascending.
    /// `sequencers` continue the token sequences of earlier drill-downs.
    #[must_use]
    pub fn open(
        milestone_type: MilestoneType,
        settings: &DashboardSettings,
        metadata: &StaticMetadata,
        sequencers: &[RequestSequencer; 2],
    ) -> Self {
        let sort = SortState::ascending(milestone_type.sla_field());
        let build = build_columns(&settings.column_spec, metadata, sort.field.as_deref());
        Self {
            milestone_type,
            columns: build.columns,
            column_fallback: build.fallback.map(|e| e.to_string()),
            sort,
            filters: Filters::default(),
            tables: Partition::ALL
                .map(|p| PartitionTable::new(p, settings.page_size, sequencers[p.index()].clone())),
            first_page_settled: false,
            drag: None,
            export: None,
        }
    }

    #[must_use]
    pub fn table(&self, partition: Partition) -> &PartitionTable {
        &self.tables[partition.index()]
    }

    pub fn table_mut(&mut self, partition: Partition) -> &mut PartitionTable {
        &mut self.tables[partition.index()]
    }

    pub fn tables(&self) -> impl Iterator<Item = &PartitionTable> {
        self.tables.iter()
    }

    /// Supersede everything in flight and restart both partitions at offset zero.
    pub fn reset_requests(&mut self) -> Vec<PageRequest> {
        self.tables
            .iter_mut()
            .map(|t| t.pager.begin_reset())
            .collect()
    }

    /// Make every outstanding response stale and hand back the sequencers
    /// for the next drill-down.
    pub fn retire(&mut self) -> [RequestSequencer; 2] {
        for table in &mut self.tables {
            table.pager.close();
        }
        self.tables.each_ref().map(|t| t.pager.sequencer().clone())
    }

    #[must_use]
    pub fn any_in_flight(&self) -> bool {
        self.tables.iter().any(|t| t.pager.cursor.in_flight)
    }

    /// State implied by the pagers.
    #[must_use]
    pub fn state(&self) -> DrillState {
        if !self.first_page_settled {
            DrillState::Opening
        } else if self.any_in_flight() {
            DrillState::LoadingMore
        } else {
            DrillState::Open
        }
    }

    /// Query parameters for one page request.
    #[must_use]
    pub fn page_params(&self, settings: &DashboardSettings, only_first_sla: bool, request: &PageRequest) -> CasePageParams {
        self.query_params(settings, only_first_sla, request.partition, request.offset, request.limit)
    }

    /// Current filters and sort applied to an arbitrary window of one partition.
    #[must_use]
    pub fn query_params(
        &self,
        settings: &DashboardSettings,
        only_first_sla: bool,
        partition: Partition,
        offset: usize,
        limit: usize,
    ) -> CasePageParams {
        CasePageParams {
            scope_id: settings.scope_id.clone(),
            milestone_type: self.milestone_type,
            fields: query_fields(&self.columns),
            sort_field: self.sort_source_path(),
            sort_direction: self.sort.direction,
            search_term: self.filters.search_term.clone(),
            offset,
            limit,
            priority_filter: self.filters.priorities.clone(),
            has_jira: self.filters.has_jira,
            is_stopped: partition.is_stopped(),
            only_first_sla,
        }
    }

    /// The sort key as the data source knows it.
    fn sort_source_path(&self) -> Option<String> {
        let field = self.sort.field.as_deref()?;
        Some(
            self.columns
                .iter()
                .find(|c| c.field_name == field)
                .map_or_else(|| field.to_string(), |c| c.source_path.clone()),
        )
    }
}

// ──────────────────── model ────────────────────

/// Full dashboard state.
#[derive(Debug, Clone)]
pub struct DashboardModel {
    pub settings: DashboardSettings,
    pub metadata: StaticMetadata,
    /// Reference time for countdowns; advanced by the runtime.
    pub now: DateTime<Utc>,
    pub visible: bool,
    /// "Priority mode": one representative milestone per case.
    pub priority_mode: bool,
    pub snapshot: Vec<MilestoneRecord>,
    pub aggregation: Aggregation,
    pub last_refresh: Option<DateTime<Utc>>,
    pub summary_in_flight: bool,
    /// Current phase of the red-zone flash.
    pub flash_on: bool,
    pub scheduler: PollingScheduler,
    pub drill_down: Option<DrillDown>,
    /// Token sequences outliving individual drill-downs.
    pub sequencers: [RequestSequencer; 2],
    pub notifications: Vec<Notification>,
    next_notification_id: u64,
}

impl DashboardModel {
    #[must_use]
    pub fn new(settings: DashboardSettings, metadata: StaticMetadata, now: DateTime<Utc>) -> Self {
        let scheduler = PollingScheduler::new(settings.poll_interval, settings.flash_interval);
        Self {
            settings,
            metadata,
            now,
            visible: false,
            priority_mode: false,
            snapshot: Vec::new(),
            aggregation: Aggregation::default(),
            last_refresh: None,
            summary_in_flight: false,
            flash_on: false,
            scheduler,
            drill_down: None,
            sequencers: Default::default(),
            notifications: Vec::new(),
            next_notification_id: 1,
        }
    }

    #[must_use]
    pub fn drill_state(&self) -> DrillState {
        self.drill_down
            .as_ref()
            .map_or(DrillState::Closed, DrillDown::state)
    }

    #[must_use]
    pub const fn aggregation_mode(&self) -> AggregationMode {
        if self.priority_mode {
            AggregationMode::OnePerCase
        } else {
            AggregationMode::AllMilestones
        }
    }

    /// Recompute the aggregation from the current snapshot.
    pub fn reaggregate(&mut self) {
        self.aggregation = aggregate(
            &self.snapshot,
            self.aggregation_mode(),
            self.settings.representative,
            &self.settings.thresholds,
            self.now,
        );
    }

    /// Whether any active milestone sits in the red bucket.
    #[must_use]
    pub fn alerting(&self) -> bool {
        self.aggregation
            .active
            .values()
            .any(|s| s.bucket_counts.get(SeverityBucket::Red) > 0)
    }

    /// Push a notification, evicting the oldest beyond [`MAX_NOTIFICATIONS`].
    /// Returns the id for scheduling expiry.
    pub fn push_notification(&mut self, level: NotificationLevel, title: &str, message: impl Into<String>) -> u64 {
        let id = self.next_notification_id;
        self.next_notification_id += 1;
        self.notifications.push(Notification {
            id,
            level,
            title: title.to_string(),
            message: message.into(),
        });
        while self.notifications.len() > MAX_NOTIFICATIONS {
            self.notifications.remove(0);
        }
        id
    }
}
