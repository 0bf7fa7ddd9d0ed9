//! Pure projection of the model into render-ready data.
//!
//! Consumers render the view model as is; nothing here performs I/O and no
//! domain rule is left for the renderer to re-derive.

#![allow(missing_docs)]

use serde::Serialize;

use crate::dashboard::model::{DashboardModel, DrillDown, DrillState, Notification};
use crate::milestone::gauge::{GaugeView, gauge_view};
use crate::milestone::model::{MilestoneType, Priority};
use crate::table::columns::{Column, ColumnType};
use crate::table::export::ExportField;
use crate::table::normalize::CaseRow;
use crate::table::sequencer::Partition;

const BRAND: &str = "brand";
const NEUTRAL: &str = "neutral";

const fn variant(active: bool) -> &'static str {
    if active { BRAND } else { NEUTRAL }
}

/// Everything the presentation layer needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardViewModel {
    pub counters: Vec<GaugeView>,
    pub priority_mode: bool,
    /// Some active milestone is in the red zone.
    pub alerting: bool,
    /// Current phase of the flashing alert.
    pub flash_on: bool,
    /// RFC 3339 time of the last successful summary.
    pub last_refresh: Option<String>,
    pub drill_down: Option<DrillDownView>,
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnView {
    pub field_name: String,
    pub label: String,
    pub column_type: ColumnType,
    pub width_px: Option<u32>,
    pub sortable: bool,
    /// Direction arrow on the sorted column only.
    pub sort_icon: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterButton {
    pub label: &'static str,
    pub variant: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartitionView {
    pub rows: Vec<CaseRow>,
    pub loading: bool,
    pub more_available: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrillDownView {
    pub milestone_type: MilestoneType,
    pub title: String,
    pub state: DrillState,
    pub columns: Vec<ColumnView>,
    pub active: PartitionView,
    pub stopped: PartitionView,
    pub search_term: String,
    pub search_placeholder: String,
    pub priority_filters: Vec<FilterButton>,
    pub has_jira_variant: &'static str,
    /// Why the configured columns were replaced by the fallback layout.
    pub column_fallback: Option<String>,
    /// Present while the export dialog is open.
    pub export_fields: Option<Vec<ExportField>>,
}

/// `"Filter 50+ cases..."` while more pages exist, `"Filter 12 cases..."` otherwise.
#[must_use]
pub fn search_placeholder(loaded: usize, more_available: bool) -> String {
    let plus = if more_available { "+" } else { "" };
    format!("Filter {loaded}{plus} cases...")
}

fn column_view(column: &Column, drill: &DrillDown) -> ColumnView {
    ColumnView {
        field_name: column.field_name.clone(),
        label: column.label.clone(),
        column_type: column.column_type,
        width_px: column.width_px,
        sortable: column.sortable,
        sort_icon: column.sorted.then(|| drill.sort.direction.icon()),
    }
}

fn partition_view(drill: &DrillDown, partition: Partition) -> PartitionView {
    let table = drill.table(partition);
    PartitionView {
        rows: table.rows.clone(),
        loading: table.pager.cursor.in_flight,
        more_available: table.pager.cursor.more_available,
    }
}

fn drill_down_view(drill: &DrillDown) -> DrillDownView {
    let active = partition_view(drill, Partition::Active);
    DrillDownView {
        milestone_type: drill.milestone_type,
        title: format!("{} Overview", drill.milestone_type.name()),
        state: drill.state(),
        columns: drill.columns.iter().map(|c| column_view(c, drill)).collect(),
        search_placeholder: search_placeholder(active.rows.len(), active.more_available),
        active,
        stopped: partition_view(drill, Partition::Stopped),
        search_term: drill.filters.search_term.clone(),
        priority_filters: Priority::ALL
            .iter()
            .map(|p| FilterButton {
                label: p.label(),
                variant: variant(drill.filters.is_active(*p)),
            })
            .collect(),
        has_jira_variant: variant(drill.filters.has_jira),
        column_fallback: drill.column_fallback.clone(),
        export_fields: drill.export.as_ref().map(|d| d.fields.clone()),
    }
}

/// Side-effect-free recompute, called after every transition.
#[must_use]
pub fn compute_view_model(model: &DashboardModel) -> DashboardViewModel {
    let aggregation = &model.aggregation;
    DashboardViewModel {
        counters: MilestoneType::ALL
            .iter()
            .map(|t| {
                gauge_view(
                    *t,
                    &aggregation.active_stats(*t),
                    &aggregation.stopped_stats(*t),
                    &model.settings.colors,
                )
            })
            .collect(),
        priority_mode: model.priority_mode,
        alerting: model.alerting(),
        flash_on: model.flash_on,
        last_refresh: model.last_refresh.map(|t| t.to_rfc3339()),
        drill_down: model.drill_down.as_ref().map(drill_down_view),
        notifications: model.notifications.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::model::DashboardSettings;
    use crate::dashboard::update::{DashboardCmd, DashboardMsg, update};
    use crate::source::SummarySnapshot;
    use crate::table::columns::StaticMetadata;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn model() -> DashboardModel {
        DashboardModel::new(
            DashboardSettings::default(),
            StaticMetadata::default(),
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        )
    }

    #[test]
    fn placeholder_marks_more_data() {
        assert_eq!(search_placeholder(50, true), "Filter 50+ cases...");
        assert_eq!(search_placeholder(3, false), "Filter 3 cases...");
    }

    #[test]
    fn counters_cover_every_type_in_order() {
        let mut m = model();
        let _ = update(
            &mut m,
            DashboardMsg::SummaryLoaded(Ok(SummarySnapshot {
                milestone_list: vec![
                    serde_json::from_value(json!({
                        "caseId": "c1", "mName": "Fix Resolution", "timeRemaining": "3000:00",
                    }))
                    .unwrap(),
                ],
            })),
        );
        let view = compute_view_model(&m);
        let types: Vec<MilestoneType> = view.counters.iter().map(|c| c.milestone_type).collect();
        assert_eq!(types, MilestoneType::ALL.to_vec());
        let fix = &view.counters[MilestoneType::FixResolution.index()];
        assert_eq!(fix.count, 1);
        assert!(!view.alerting);
        assert!(view.last_refresh.is_some());
        assert!(view.drill_down.is_none());
    }

    #[test]
    fn drill_down_view_reflects_filters_and_sort() {
        let mut m = model();
        let cmd = update(&mut m, DashboardMsg::OpenDrillDown(MilestoneType::UpdateOrWorkaround));
        assert_ne!(cmd, DashboardCmd::None);
        let _ = update(&mut m, DashboardMsg::TogglePriority(Priority::High));
        let _ = update(&mut m, DashboardMsg::ToggleHasJira);

        let view = compute_view_model(&m);
        let drill = view.drill_down.unwrap();
        assert_eq!(drill.title, "Update or Workaround Overview");
        assert_eq!(drill.state, DrillState::Opening);
        assert_eq!(drill.has_jira_variant, "brand");
        let variants: Vec<&str> = drill.priority_filters.iter().map(|b| b.variant).collect();
        assert_eq!(variants, vec!["neutral", "brand", "neutral", "neutral"]);
        let icons: Vec<&str> = drill.columns.iter().filter_map(|c| c.sort_icon).collect();
        assert_eq!(icons, vec!["utility:arrowup"]);
        assert_eq!(drill.search_placeholder, "Filter 0 cases...");
        assert!(drill.active.loading);
        assert!(drill.export_fields.is_none());
    }
}
