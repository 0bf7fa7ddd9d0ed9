//! Pure state transitions: `update(model, msg) -> cmd`.
//!
//! The reducer never performs I/O. Fetches, timers, listener registrations,
//! file writes and log lines all leave as [`DashboardCmd`] values that the
//! runtime executes; their outcomes come back as [`DashboardMsg`] values.

#![allow(missing_docs)]

use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;

use crate::core::errors::{Result, SlaError};
use crate::dashboard::model::{
    DashboardModel, DrillDown, ExportDialog, NEAR_BOTTOM_PX, NOTIFICATION_TTL, NotificationLevel,
    ResizeDrag,
};
use crate::dashboard::subscription::ListenerKind;
use crate::logger::jsonl::{EventType, LogEntry, Severity};
use crate::milestone::model::{MilestoneType, Priority};
use crate::source::{CasePageParams, SummarySnapshot};
use crate::table::columns::{MIN_COLUMN_WIDTH, mark_sorted, resize_column};
use crate::table::export::{
    default_export_fields, export_csv, export_query_fields, render_csv, toggle_export_field,
};
use crate::table::normalize::normalize_rows;
use crate::table::sequencer::{ApplyMode, PageRequest, Partition};
use crate::table::sort::sort_rows;

/// Everything that can happen to the dashboard.
#[derive(Debug)]
pub enum DashboardMsg {
    /// The component mounted and is visible.
    Started,
    VisibilityChanged(bool),
    PollTick(u64),
    FlashTick(u64),
    SummaryLoaded(Result<SummarySnapshot>),
    TogglePriorityMode,
    OpenDrillDown(MilestoneType),
    CloseDrillDown,
    EscapePressed,
    PageLoaded {
        request: PageRequest,
        result: Result<Vec<Value>>,
    },
    Search(String),
    TogglePriority(Priority),
    ToggleHasJira,
    SortBy(String),
    ScrolledNearBottom {
        partition: Partition,
        remaining_px: u32,
    },
    /// Pointer down on a header edge; `width_px` is the rendered width.
    ResizeStarted {
        field_name: String,
        x: i32,
        width_px: u32,
    },
    PointerMoved {
        x: i32,
    },
    PointerReleased,
    OpenExportDialog,
    CloseExportDialog,
    ToggleExportField {
        api_name: String,
        selected: bool,
    },
    ConfirmExport,
    ExportFetched(Result<Vec<Value>>),
    ExportWritten(Result<PathBuf>),
    NotificationExpired(u64),
    ViewCase(String),
}

/// Side effects requested by [`update`].
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardCmd {
    None,
    Batch(Vec<Self>),
    FetchSummary {
        scope_id: Option<String>,
    },
    FetchPage {
        request: PageRequest,
        params: CasePageParams,
    },
    FetchExport {
        params: CasePageParams,
    },
    WriteExport {
        path: PathBuf,
        csv: String,
    },
    SchedulePoll {
        generation: u64,
        after: Duration,
    },
    ScheduleFlash {
        generation: u64,
        after: Duration,
    },
    ScheduleNotificationExpiry {
        id: u64,
        after: Duration,
    },
    Attach(ListenerKind),
    Release(ListenerKind),
    /// Hand a record id to the host's navigation.
    NavigateToRecord(String),
    Log(LogEntry),
}

impl DashboardCmd {
    /// Combine commands, dropping `None` and unwrapping singletons.
    #[must_use]
    pub fn batch(cmds: Vec<Self>) -> Self {
        let mut cmds: Vec<Self> = cmds.into_iter().filter(|c| *c != Self::None).collect();
        match cmds.len() {
            0 => Self::None,
            1 => cmds.remove(0),
            _ => Self::Batch(cmds),
        }
    }

    /// Flatten nested batches into execution order.
    #[must_use]
    pub fn flatten(self) -> Vec<Self> {
        match self {
            Self::None => Vec::new(),
            Self::Batch(cmds) => cmds.into_iter().flat_map(Self::flatten).collect(),
            other => vec![other],
        }
    }
}

/// Apply one message.
pub fn update(model: &mut DashboardModel, msg: DashboardMsg) -> DashboardCmd {
    match msg {
        DashboardMsg::Started => {
            let start = log(model, EventType::DashboardStart, Severity::Info);
            DashboardCmd::batch(vec![start, resume_polling(model)])
        }
        DashboardMsg::VisibilityChanged(true) => {
            if model.visible {
                return DashboardCmd::None;
            }
            resume_polling(model)
        }
        DashboardMsg::VisibilityChanged(false) => {
            if !model.visible {
                return DashboardCmd::None;
            }
            model.visible = false;
            model.scheduler.stop_all();
            model.flash_on = false;
            log_with(model, EventType::DashboardStop, Severity::Info, |e| {
                e.with_details("hidden")
            })
        }
        DashboardMsg::PollTick(generation) => {
            if !model.scheduler.poll.accepts(generation) {
                return DashboardCmd::None;
            }
            DashboardCmd::batch(vec![
                log(model, EventType::PollTick, Severity::Info),
                fetch_summary(model),
                DashboardCmd::SchedulePoll {
                    generation,
                    after: model.scheduler.poll.interval(),
                },
            ])
        }
        DashboardMsg::FlashTick(generation) => {
            if !model.scheduler.flash.accepts(generation) {
                return DashboardCmd::None;
            }
            model.flash_on = !model.flash_on;
            DashboardCmd::ScheduleFlash {
                generation,
                after: model.scheduler.flash.interval(),
            }
        }
        DashboardMsg::SummaryLoaded(result) => handle_summary(model, result),
        DashboardMsg::TogglePriorityMode => {
            model.priority_mode = !model.priority_mode;
            model.reaggregate();
            let flash = sync_flash(model);
            // The drill-down query carries the mode flag.
            let requery = refetch(model);
            DashboardCmd::batch(vec![flash, requery])
        }
        DashboardMsg::OpenDrillDown(milestone_type) => open_drill_down(model, milestone_type),
        DashboardMsg::CloseDrillDown | DashboardMsg::EscapePressed => close_drill_down(model),
        DashboardMsg::PageLoaded { request, result } => handle_page(model, request, result),
        DashboardMsg::Search(term) => {
            let Some(drill) = model.drill_down.as_mut() else {
                return DashboardCmd::None;
            };
            let term = term.trim().to_string();
            if drill.filters.search_term == term {
                return DashboardCmd::None;
            }
            drill.filters.search_term = term;
            refetch(model)
        }
        DashboardMsg::TogglePriority(priority) => {
            let Some(drill) = model.drill_down.as_mut() else {
                return DashboardCmd::None;
            };
            drill.filters.toggle_priority(priority);
            refetch(model)
        }
        DashboardMsg::ToggleHasJira => {
            let Some(drill) = model.drill_down.as_mut() else {
                return DashboardCmd::None;
            };
            drill.filters.has_jira = !drill.filters.has_jira;
            refetch(model)
        }
        DashboardMsg::SortBy(field) => handle_sort(model, &field),
        DashboardMsg::ScrolledNearBottom {
            partition,
            remaining_px,
        } => load_more(model, partition, remaining_px),
        DashboardMsg::ResizeStarted {
            field_name,
            x,
            width_px,
        } => {
            let Some(drill) = model.drill_down.as_mut() else {
                return DashboardCmd::None;
            };
            if !drill.columns.iter().any(|c| c.field_name == field_name) {
                return DashboardCmd::None;
            }
            let attach = drill.drag.is_none();
            drill.drag = Some(ResizeDrag {
                field_name,
                start_x: x,
                start_width: width_px,
            });
            if attach {
                DashboardCmd::Attach(ListenerKind::PointerDrag)
            } else {
                DashboardCmd::None
            }
        }
        DashboardMsg::PointerMoved { x } => {
            let Some(drill) = model.drill_down.as_mut() else {
                return DashboardCmd::None;
            };
            if let Some(drag) = &drill.drag {
                let delta = i64::from(x) - i64::from(drag.start_x);
                let width = (i64::from(drag.start_width) + delta)
                    .clamp(i64::from(MIN_COLUMN_WIDTH), i64::from(u32::MAX));
                let width = u32::try_from(width).unwrap_or(MIN_COLUMN_WIDTH);
                let field = drag.field_name.clone();
                resize_column(&mut drill.columns, &field, width);
            }
            DashboardCmd::None
        }
        DashboardMsg::PointerReleased => {
            if model
                .drill_down
                .as_mut()
                .and_then(|d| d.drag.take())
                .is_some()
            {
                DashboardCmd::Release(ListenerKind::PointerDrag)
            } else {
                DashboardCmd::None
            }
        }
        DashboardMsg::OpenExportDialog => {
            if let Some(drill) = model.drill_down.as_mut() {
                drill.export = Some(ExportDialog {
                    fields: default_export_fields(&drill.columns),
                    in_flight: false,
                });
            }
            DashboardCmd::None
        }
        DashboardMsg::CloseExportDialog => {
            if let Some(drill) = model.drill_down.as_mut() {
                drill.export = None;
            }
            DashboardCmd::None
        }
        DashboardMsg::ToggleExportField { api_name, selected } => {
            if let Some(dialog) = model.drill_down.as_mut().and_then(|d| d.export.as_mut()) {
                toggle_export_field(&mut dialog.fields, &api_name, selected);
            }
            DashboardCmd::None
        }
        DashboardMsg::ConfirmExport => confirm_export(model),
        DashboardMsg::ExportFetched(result) => handle_export_rows(model, result),
        DashboardMsg::ExportWritten(Ok(path)) => {
            let entry = log_with(model, EventType::ExportWritten, Severity::Info, |e| LogEntry {
                path: Some(path.display().to_string()),
                ..e
            });
            let toast = notify(
                model,
                NotificationLevel::Success,
                "Export complete",
                path.display().to_string(),
            );
            DashboardCmd::batch(vec![entry, toast])
        }
        DashboardMsg::ExportWritten(Err(err)) => export_failed(model, &err),
        DashboardMsg::NotificationExpired(id) => {
            model.notifications.retain(|n| n.id != id);
            DashboardCmd::None
        }
        DashboardMsg::ViewCase(id) => {
            if id.is_empty() {
                DashboardCmd::None
            } else {
                DashboardCmd::NavigateToRecord(id)
            }
        }
    }
}

// ──────────────────── helpers ────────────────────

fn log(model: &DashboardModel, event: EventType, severity: Severity) -> DashboardCmd {
    DashboardCmd::Log(LogEntry::at(event, severity, model.now))
}

fn log_with(
    model: &DashboardModel,
    event: EventType,
    severity: Severity,
    fill: impl FnOnce(LogEntry) -> LogEntry,
) -> DashboardCmd {
    DashboardCmd::Log(fill(LogEntry::at(event, severity, model.now)))
}

fn notify(
    model: &mut DashboardModel,
    level: NotificationLevel,
    title: &str,
    message: impl Into<String>,
) -> DashboardCmd {
    let id = model.push_notification(level, title, message);
    DashboardCmd::ScheduleNotificationExpiry {
        id,
        after: NOTIFICATION_TTL,
    }
}

fn fetch_summary(model: &mut DashboardModel) -> DashboardCmd {
    model.summary_in_flight = true;
    DashboardCmd::FetchSummary {
        scope_id: model.settings.scope_id.clone(),
    }
}

fn resume_polling(model: &mut DashboardModel) -> DashboardCmd {
    model.visible = true;
    let generation = model.scheduler.poll.start();
    let fetch = fetch_summary(model);
    let flash = sync_flash(model);
    DashboardCmd::batch(vec![
        fetch,
        DashboardCmd::SchedulePoll {
            generation,
            after: model.scheduler.poll.interval(),
        },
        flash,
    ])
}

/// Run the flash timer exactly while a visible counter is in the red zone.
fn sync_flash(model: &mut DashboardModel) -> DashboardCmd {
    let wanted = model.visible && model.alerting();
    let flash = &mut model.scheduler.flash;
    if wanted && !flash.is_running() {
        let generation = flash.start();
        model.flash_on = true;
        DashboardCmd::ScheduleFlash {
            generation,
            after: flash.interval(),
        }
    } else {
        if !wanted {
            flash.stop();
            model.flash_on = false;
        }
        DashboardCmd::None
    }
}

fn handle_summary(model: &mut DashboardModel, result: Result<SummarySnapshot>) -> DashboardCmd {
    model.summary_in_flight = false;
    match result {
        Ok(snapshot) => {
            model.snapshot = snapshot.milestone_list;
            model.reaggregate();
            model.last_refresh = Some(model.now);
            let rows = model.snapshot.len();
            let entry = log_with(model, EventType::SummaryLoaded, Severity::Info, |e| LogEntry {
                rows: Some(rows),
                ..e
            });
            DashboardCmd::batch(vec![entry, sync_flash(model)])
        }
        Err(err) => {
            // Previous counters stay on screen.
            let entry = log_with(model, EventType::FetchFailed, Severity::Warning, |e| {
                e.with_error(&err).with_details("summary")
            });
            let toast = notify(
                model,
                NotificationLevel::Error,
                "Error loading SLA data",
                err.user_message(),
            );
            DashboardCmd::batch(vec![entry, toast])
        }
    }
}

fn fetch_pages(model: &DashboardModel, drill: &DrillDown, requests: Vec<PageRequest>) -> DashboardCmd {
    DashboardCmd::batch(
        requests
            .into_iter()
            .map(|request| DashboardCmd::FetchPage {
                params: drill.page_params(&model.settings, model.priority_mode, &request),
                request,
            })
            .collect(),
    )
}

/// Restart both partitions from offset zero with the current filters.
fn refetch(model: &mut DashboardModel) -> DashboardCmd {
    let Some(mut drill) = model.drill_down.take() else {
        return DashboardCmd::None;
    };
    let requests = drill.reset_requests();
    let cmd = fetch_pages(model, &drill, requests);
    model.drill_down = Some(drill);
    cmd
}

fn open_drill_down(model: &mut DashboardModel, milestone_type: MilestoneType) -> DashboardCmd {
    let mut cmds = Vec::new();
    match model.drill_down.as_mut() {
        Some(previous) if previous.milestone_type == milestone_type => return DashboardCmd::None,
        Some(previous) => {
            // Switching type keeps the escape registration.
            let retired = previous.retire();
            let dragging = previous.drag.take().is_some();
            model.sequencers = retired;
            if dragging {
                cmds.push(DashboardCmd::Release(ListenerKind::PointerDrag));
            }
        }
        None => cmds.push(DashboardCmd::Attach(ListenerKind::Escape)),
    }

    let mut drill = DrillDown::open(
        milestone_type,
        &model.settings,
        &model.metadata,
        &model.sequencers,
    );
    if let Some(reason) = &drill.column_fallback {
        cmds.push(log_with(model, EventType::ColumnSpecFallback, Severity::Warning, |e| {
            e.with_details(reason.clone())
        }));
    }
    cmds.push(log_with(model, EventType::DrillDownOpened, Severity::Info, |e| LogEntry {
        milestone_type: Some(milestone_type.name().to_string()),
        ..e
    }));
    let requests = drill.reset_requests();
    cmds.push(fetch_pages(model, &drill, requests));
    model.drill_down = Some(drill);
    DashboardCmd::batch(cmds)
}

fn close_drill_down(model: &mut DashboardModel) -> DashboardCmd {
    let Some(mut drill) = model.drill_down.take() else {
        return DashboardCmd::None;
    };
    model.sequencers = drill.retire();
    let mut cmds = Vec::new();
    if drill.drag.take().is_some() {
        cmds.push(DashboardCmd::Release(ListenerKind::PointerDrag));
    }
    cmds.push(DashboardCmd::Release(ListenerKind::Escape));
    cmds.push(log_with(model, EventType::DrillDownClosed, Severity::Info, |e| LogEntry {
        milestone_type: Some(drill.milestone_type.name().to_string()),
        ..e
    }));
    DashboardCmd::batch(cmds)
}

fn stale(model: &DashboardModel, request: &PageRequest) -> DashboardCmd {
    log_with(model, EventType::StaleResponseDiscarded, Severity::Info, |e| LogEntry {
        partition: Some(partition_name(request.partition).to_string()),
        token: Some(request.token.value()),
        ..e
    })
}

const fn partition_name(partition: Partition) -> &'static str {
    match partition {
        Partition::Active => "active",
        Partition::Stopped => "stopped",
    }
}

fn handle_page(model: &mut DashboardModel, request: PageRequest, result: Result<Vec<Value>>) -> DashboardCmd {
    let DashboardModel {
        settings,
        now,
        drill_down,
        ..
    } = model;
    let Some(drill) = drill_down.as_mut() else {
        return stale(model, &request);
    };

    let records = match result {
        Ok(records) => records,
        Err(err) => {
            if !drill.table_mut(request.partition).pager.fail(request.token) {
                return stale(model, &request);
            }
            if request.partition == Partition::Active {
                drill.first_page_settled = true;
            }
            let entry = log_with(model, EventType::FetchFailed, Severity::Warning, |e| LogEntry {
                partition: Some(partition_name(request.partition).to_string()),
                token: Some(request.token.value()),
                ..e.with_error(&err)
            });
            let toast = notify(model, NotificationLevel::Error, "Error loading cases", err.user_message());
            return DashboardCmd::batch(vec![entry, toast]);
        }
    };

    if !drill
        .table_mut(request.partition)
        .pager
        .accept(request.token, records.len())
    {
        return stale(model, &request);
    }
    if request.partition == Partition::Active {
        drill.first_page_settled = true;
    }

    let ctx = settings.normalize_context(*now);
    let fresh = normalize_rows(&records, &drill.columns, &ctx);
    let degraded = fresh.iter().filter(|r| r.degraded.is_some()).count();
    let loaded = fresh.len();
    let table = drill.table_mut(request.partition);
    let mut rows = match request.mode {
        ApplyMode::Replace => fresh,
        ApplyMode::Append => {
            let mut rows = table.rows.clone();
            rows.extend(fresh);
            rows
        }
    };
    sort_rows(&mut rows, &drill.sort);
    drill.table_mut(request.partition).rows = rows;

    let partition = partition_name(request.partition).to_string();
    let mut cmds = vec![log_with(model, EventType::PageLoaded, Severity::Info, |e| LogEntry {
        partition: Some(partition.clone()),
        token: Some(request.token.value()),
        rows: Some(loaded),
        ..e
    })];
    if degraded > 0 {
        cmds.push(log_with(model, EventType::RowDegraded, Severity::Warning, |e| LogEntry {
            partition: Some(partition),
            rows: Some(degraded),
            ..e
        }));
    }
    DashboardCmd::batch(cmds)
}

fn handle_sort(model: &mut DashboardModel, field: &str) -> DashboardCmd {
    let Some(drill) = model.drill_down.as_mut() else {
        return DashboardCmd::None;
    };
    if !drill.columns.iter().any(|c| c.field_name == field && c.sortable) {
        return DashboardCmd::None;
    }
    drill.sort.activate(field);
    mark_sorted(&mut drill.columns, drill.sort.field.as_deref());
    for partition in Partition::ALL {
        let mut rows = drill.table(partition).rows.clone();
        sort_rows(&mut rows, &drill.sort);
        drill.table_mut(partition).rows = rows;
    }
    // Later pages must come back in the new order too.
    refetch(model)
}

fn load_more(model: &mut DashboardModel, partition: Partition, remaining_px: u32) -> DashboardCmd {
    if remaining_px >= NEAR_BOTTOM_PX {
        return DashboardCmd::None;
    }
    let Some(mut drill) = model.drill_down.take() else {
        return DashboardCmd::None;
    };
    let cmd = if drill.first_page_settled {
        match drill.table_mut(partition).pager.begin_next() {
            Some(request) => fetch_pages(model, &drill, vec![request]),
            None => DashboardCmd::None,
        }
    } else {
        DashboardCmd::None
    };
    model.drill_down = Some(drill);
    cmd
}

fn confirm_export(model: &mut DashboardModel) -> DashboardCmd {
    let Some(drill) = model.drill_down.as_ref() else {
        return DashboardCmd::None;
    };
    let Some(dialog) = drill.export.as_ref() else {
        return DashboardCmd::None;
    };
    if dialog.in_flight {
        return DashboardCmd::None;
    }
    if !dialog.fields.iter().any(|f| f.selected) {
        return notify(
            model,
            NotificationLevel::Warning,
            "Nothing to export",
            "Select at least one field",
        );
    }
    let mut params = drill.query_params(
        &model.settings,
        model.priority_mode,
        Partition::Active,
        0,
        model.settings.export_row_cap,
    );
    params.fields = export_query_fields(&dialog.fields);
    if let Some(dialog) = model.drill_down.as_mut().and_then(|d| d.export.as_mut()) {
        dialog.in_flight = true;
    }
    DashboardCmd::FetchExport { params }
}

fn handle_export_rows(model: &mut DashboardModel, result: Result<Vec<Value>>) -> DashboardCmd {
    let Some(mut drill) = model.drill_down.take() else {
        return DashboardCmd::None;
    };
    let Some(dialog) = drill.export.take() else {
        model.drill_down = Some(drill);
        return DashboardCmd::None;
    };
    let cmd = match result {
        Ok(records) => {
            let ctx = model.settings.normalize_context(model.now);
            let mut rows = normalize_rows(&records, &drill.columns, &ctx);
            sort_rows(&mut rows, &drill.sort);
            let table = export_csv(&rows, &dialog.fields, model.settings.export_row_cap);
            DashboardCmd::WriteExport {
                path: model.settings.export_path.clone(),
                csv: render_csv(&table),
            }
        }
        Err(err) => {
            // Keep the dialog so the user can retry.
            drill.export = Some(ExportDialog {
                in_flight: false,
                ..dialog
            });
            export_failed(model, &err)
        }
    };
    model.drill_down = Some(drill);
    cmd
}

fn export_failed(model: &mut DashboardModel, err: &SlaError) -> DashboardCmd {
    let entry = log_with(model, EventType::ExportFailed, Severity::Warning, |e| e.with_error(err));
    let toast = notify(model, NotificationLevel::Error, "Export Failed", err.user_message());
    DashboardCmd::batch(vec![entry, toast])
}
