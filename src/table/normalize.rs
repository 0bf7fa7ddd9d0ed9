//! Row normalization: flattened case records, derived SLA values, external
//! ticket details and render cells aligned to the current column list.

#![allow(missing_docs)]

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::columns::{Column, ColumnType, TICKETS_RELATION};
use super::flatten::{FlatRecord, flatten_record, parse_related_items, value_text};
use crate::core::errors::{Result, SlaError};
use crate::milestone::model::{
    MilestoneType, SeverityBucket, SlaStatus, lenient_opt_flag, lenient_text,
};
use crate::milestone::threshold::Thresholds;
use crate::milestone::time_remaining::{parse_timestamp, resolve};

/// Relationship holding a case's milestone instances.
pub const MILESTONES_RELATION: &str = "CaseMilestones";
/// Shown for missing ticket attributes.
pub const MISSING_VALUE: &str = "-";

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Timezone used when rendering date-like columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayTimezone {
    #[default]
    Local,
    Utc,
}

/// Everything row derivation needs besides the record itself.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeContext<'a> {
    pub thresholds: &'a Thresholds,
    pub now: DateTime<Utc>,
    pub timezone: DisplayTimezone,
    pub jira_base_url: &'a str,
}

// ──────────────────── wire shapes ────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
struct NamedRef {
    #[serde(rename = "Name", default, deserialize_with = "lenient_text")]
    name: Option<String>,
}

// Source fields arrive loosely typed: tokens as numbers, flags as null.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct CaseMilestone {
    #[serde(rename = "MilestoneType")]
    milestone_type: Option<NamedRef>,
    #[serde(rename = "IsCompleted", alias = "isCompleted", deserialize_with = "lenient_opt_flag")]
    is_completed: Option<bool>,
    #[serde(rename = "IsViolated", alias = "isViolated", deserialize_with = "lenient_opt_flag")]
    is_violated: Option<bool>,
    #[serde(rename = "TargetDate", alias = "targetDate", deserialize_with = "lenient_text")]
    target_date: Option<String>,
    #[serde(
        rename = "TimeRemainingInMins",
        alias = "timeRemaining",
        deserialize_with = "lenient_text"
    )]
    time_remaining: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct TicketRecord {
    #[serde(rename = "Id", deserialize_with = "lenient_text")]
    id: Option<String>,
    #[serde(rename = "Name", deserialize_with = "lenient_text")]
    name: Option<String>,
    #[serde(rename = "AVB_Status__c", deserialize_with = "lenient_text")]
    status: Option<String>,
    #[serde(rename = "AVB_Priority__c", deserialize_with = "lenient_text")]
    priority: Option<String>,
    #[serde(rename = "AVB_Fix_Versions__c", deserialize_with = "lenient_text")]
    fix_version: Option<String>,
    #[serde(rename = "AVB_Assignee__c", deserialize_with = "lenient_text")]
    assignee: Option<String>,
}

// ──────────────────── derived values ────────────────────

/// Resolved SLA status and severity per milestone type for one case.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlaValues {
    statuses: [SlaStatus; 4],
    severities: [Option<SeverityBucket>; 4],
    violated: bool,
}

impl SlaValues {
    #[must_use]
    pub fn status(&self, milestone_type: MilestoneType) -> &SlaStatus {
        &self.statuses[milestone_type.index()]
    }

    #[must_use]
    pub fn severity(&self, milestone_type: MilestoneType) -> Option<SeverityBucket> {
        self.severities[milestone_type.index()]
    }

    /// Style class for the type's cell, if the milestone was classified.
    #[must_use]
    pub fn css_class(&self, milestone_type: MilestoneType) -> Option<&'static str> {
        self.severity(milestone_type).map(SeverityBucket::css_class)
    }

    /// Whether any milestone on the case is violated.
    #[must_use]
    pub const fn any_violated(&self) -> bool {
        self.violated
    }

    /// Fold one milestone instance in. Status follows precedence; severity
    /// keeps the most urgent seen.
    pub fn record(
        &mut self,
        milestone_type: MilestoneType,
        status: SlaStatus,
        severity: Option<SeverityBucket>,
        violated: bool,
    ) {
        let i = milestone_type.index();
        self.statuses[i].merge(status);
        self.severities[i] = self.severities[i].max(severity);
        self.violated |= violated;
    }

    /// Write the four display values onto a flattened record under their
    /// canonical field names, replacing same-named raw fields.
    pub fn write_into(&self, fields: &mut FlatRecord) {
        for t in MilestoneType::ALL {
            fields.insert(
                t.sla_field().to_string(),
                Value::String(self.status(t).display()),
            );
        }
    }
}

/// One external ticket attached to a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JiraTicket {
    pub id: String,
    pub key: String,
    pub url: String,
    pub status: String,
    pub priority: String,
    pub fix_version: String,
    pub assignee: String,
    pub item_class: &'static str,
}

/// One render cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cell {
    pub key: String,
    pub value: String,
    pub is_url: bool,
    pub is_boolean: bool,
    pub checked: bool,
    pub sla_class: Option<&'static str>,
}

/// A render-ready case row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseRow {
    pub id: String,
    /// Flattened fields including the four derived SLA values.
    pub fields: FlatRecord,
    #[serde(skip)]
    pub sla: SlaValues,
    pub jira: Vec<JiraTicket>,
    pub cells: Vec<Cell>,
    pub row_class: String,
    /// Reason the row could not be normalized, if it was degraded.
    pub degraded: Option<String>,
}

impl CaseRow {
    /// Key of the row's ticket detail block.
    #[must_use]
    pub fn jira_key(&self) -> String {
        format!("{}-jira", self.id)
    }

    #[must_use]
    pub fn field_text(&self, field: &str) -> String {
        value_text(self.fields.get(field))
    }
}

// ──────────────────── derivation ────────────────────

/// Resolve per-type SLA values from a case's milestone instances.
pub fn case_sla_values(raw: &Value, ctx: &NormalizeContext<'_>) -> Result<SlaValues> {
    let milestones: Vec<CaseMilestone> =
        parse_related_items(raw.get(MILESTONES_RELATION), MILESTONES_RELATION)?;
    let mut values = SlaValues::default();
    for m in milestones {
        let Some(milestone_type) = m
            .milestone_type
            .and_then(|t| t.name)
            .as_deref()
            .and_then(MilestoneType::from_name)
        else {
            continue;
        };
        let completed = m.is_completed.unwrap_or(false);
        let violated = m.is_violated.unwrap_or(false);
        let (status, hours) = if completed {
            let status = if violated {
                SlaStatus::Violated
            } else {
                SlaStatus::Completed
            };
            (status, None)
        } else {
            let remaining = resolve(
                m.time_remaining.as_deref(),
                m.target_date.as_deref(),
                ctx.now,
            );
            (remaining.status, remaining.hours)
        };
        let severity = if violated {
            Some(SeverityBucket::Red)
        } else {
            hours.and_then(|h| ctx.thresholds.classify(h, completed, violated))
        };
        values.record(milestone_type, status, severity, violated);
    }
    Ok(values)
}

fn or_missing(value: Option<String>) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| MISSING_VALUE.to_string())
}

/// Ticket details for a case, in source order.
pub fn jira_tickets(raw: &Value, base_url: &str) -> Result<Vec<JiraTicket>> {
    let tickets: Vec<TicketRecord> =
        parse_related_items(raw.get(TICKETS_RELATION), TICKETS_RELATION)?;
    Ok(tickets
        .into_iter()
        .enumerate()
        .map(|(i, t)| {
            let key = t.name.unwrap_or_default();
            JiraTicket {
                id: t.id.unwrap_or_default(),
                url: format!("{base_url}{key}"),
                key,
                status: or_missing(t.status),
                priority: or_missing(t.priority),
                fix_version: or_missing(t.fix_version),
                assignee: or_missing(t.assignee),
                item_class: if i % 2 == 0 {
                    "jira-item-even"
                } else {
                    "jira-item-odd"
                },
            }
        })
        .collect())
}

/// Format a timestamp as `YYYY-MM-DD HH:mm`. Unparseable input passes through.
#[must_use]
pub fn format_date(raw: &str, timezone: DisplayTimezone) -> String {
    match parse_timestamp(raw) {
        Some(ts) => match timezone {
            DisplayTimezone::Utc => ts.format(DATE_FORMAT).to_string(),
            DisplayTimezone::Local => ts.with_timezone(&Local).format(DATE_FORMAT).to_string(),
        },
        None => raw.to_string(),
    }
}

/// Row style: priority by default, overridden when a milestone is violated.
#[must_use]
pub fn row_class(priority: &str, violated: bool) -> String {
    if violated {
        return "table-row row-violated".to_string();
    }
    let priority = priority.trim();
    if priority.is_empty() {
        "table-row priority-normal".to_string()
    } else {
        format!("table-row priority-{}", priority.to_lowercase())
    }
}

fn is_date_like(field_name: &str) -> bool {
    field_name.to_ascii_lowercase().contains("date")
}

fn cell_for(row: &CaseRow, column: &Column, timezone: DisplayTimezone) -> Cell {
    let raw = row.fields.get(&column.field_name);
    let mut value = if column.aggregate {
        row.jira
            .iter()
            .map(|t| t.key.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    } else if let Some(t) = column.virtual_sla {
        row.sla.status(t).display()
    } else {
        value_text(raw)
    };
    if !value.is_empty() && column.virtual_sla.is_none() && is_date_like(&column.field_name) {
        value = format_date(&value, timezone);
    }
    let is_boolean = column.column_type == ColumnType::Boolean;
    let checked = is_boolean
        && match raw {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        };
    Cell {
        key: column.field_name.clone(),
        value,
        is_url: column.column_type == ColumnType::Button,
        is_boolean,
        checked,
        sla_class: column.virtual_sla.and_then(|t| row.sla.css_class(t)),
    }
}

/// Cells for one row, aligned with `columns`.
#[must_use]
pub fn build_cells(row: &CaseRow, columns: &[Column], timezone: DisplayTimezone) -> Vec<Cell> {
    columns.iter().map(|c| cell_for(row, c, timezone)).collect()
}

/// Re-align every row's cells after the column list changed.
pub fn recompute_cells(rows: &mut [CaseRow], columns: &[Column], timezone: DisplayTimezone) {
    for row in rows {
        row.cells = build_cells(row, columns, timezone);
    }
}

fn record_id(raw: &Value) -> String {
    ["Id", "CaseNumber"]
        .into_iter()
        .find_map(|k| raw.get(k).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}

/// Normalize one record.
pub fn normalize_row(raw: &Value, columns: &[Column], ctx: &NormalizeContext<'_>) -> Result<CaseRow> {
    let mut fields = flatten_record(raw)?;
    let sla = case_sla_values(raw, ctx)?;
    sla.write_into(&mut fields);
    let jira = jira_tickets(raw, ctx.jira_base_url)?;
    let id = record_id(raw);
    if id.is_empty() {
        return Err(SlaError::MalformedRecord {
            details: "record has neither Id nor CaseNumber".to_string(),
        });
    }
    let priority = value_text(fields.get("Priority"));
    let mut row = CaseRow {
        id,
        row_class: row_class(&priority, sla.any_violated()),
        fields,
        sla,
        jira,
        cells: Vec::new(),
        degraded: None,
    };
    row.cells = build_cells(&row, columns, ctx.timezone);
    Ok(row)
}

/// Minimal safe rendering of a record that failed to normalize: every cell
/// empty, default styling.
#[must_use]
pub fn degraded_row(raw: &Value, columns: &[Column], error: &SlaError) -> CaseRow {
    CaseRow {
        id: record_id(raw),
        fields: FlatRecord::new(),
        sla: SlaValues::default(),
        jira: Vec::new(),
        cells: columns
            .iter()
            .map(|c| Cell {
                key: c.field_name.clone(),
                value: String::new(),
                is_url: false,
                is_boolean: false,
                checked: false,
                sla_class: None,
            })
            .collect(),
        row_class: row_class("", false),
        degraded: Some(error.to_string()),
    }
}

/// Normalize a page of records. Bad records degrade individually.
#[must_use]
pub fn normalize_rows(raw: &[Value], columns: &[Column], ctx: &NormalizeContext<'_>) -> Vec<CaseRow> {
    raw.iter()
        .map(|r| normalize_row(r, columns, ctx).unwrap_or_else(|e| degraded_row(r, columns, &e)))
        .collect()
}
