//! CSV export of the drill-down view: one row per (case, ticket) pair.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::columns::{Column, DOT_SEP, TICKETS_RELATION};
use super::normalize::{CaseRow, JiraTicket, MILESTONES_RELATION};
use crate::core::errors::{Result, SlaError};
use crate::milestone::model::MilestoneType;

/// Default output file name.
pub const EXPORT_FILE_NAME: &str = "SLA_Export.csv";
/// Row cap of the unpaginated export fetch.
pub const DEFAULT_EXPORT_ROW_CAP: usize = 1_000;

/// Per-ticket export fields.
pub const JIRA_EXPORT_FIELDS: [&str; 6] = [
    "Jira.Key",
    "Jira.Status",
    "Jira.Priority",
    "Jira.FixVersion",
    "Jira.Assignee",
    "Jira.Url",
];

/// One selectable export field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportField {
    pub api_name: String,
    pub label: String,
    pub selected: bool,
}

impl ExportField {
    #[must_use]
    pub fn new(api_name: &str) -> Self {
        Self {
            api_name: api_name.to_string(),
            label: api_name.replace(DOT_SEP, " ").replace(['_', '.'], " "),
            selected: true,
        }
    }

    fn is_ticket_field(&self) -> bool {
        self.api_name.starts_with("Jira.")
    }
}

/// Default field list for the current columns: every non-aggregate column
/// (SLA included), then the ticket fields. All selected.
#[must_use]
pub fn default_export_fields(columns: &[Column]) -> Vec<ExportField> {
    columns
        .iter()
        .filter(|c| !c.aggregate)
        .map(|c| ExportField::new(&c.field_name))
        .chain(JIRA_EXPORT_FIELDS.iter().map(|f| ExportField::new(f)))
        .collect()
}

/// Flip one field's selection. Returns whether the field exists.
pub fn toggle_export_field(fields: &mut [ExportField], api_name: &str, selected: bool) -> bool {
    match fields.iter_mut().find(|f| f.api_name == api_name) {
        Some(field) => {
            field.selected = selected;
            true
        }
        None => false,
    }
}

/// Fields the bulk fetch must request. Derived SLA values are not stored, so
/// they request the milestone relationship instead.
#[must_use]
pub fn export_query_fields(fields: &[ExportField]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push = |name: String| {
        if !out.contains(&name) {
            out.push(name);
        }
    };
    for field in fields.iter().filter(|f| f.selected) {
        if field.is_ticket_field() {
            push(TICKETS_RELATION.to_string());
        } else if MilestoneType::from_sla_field(&field.api_name).is_some() {
            push(MILESTONES_RELATION.to_string());
        } else {
            push(field.api_name.replace(DOT_SEP, "."));
        }
    }
    out
}

/// Header plus data rows, before escaping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CsvTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

fn ticket_value(ticket: Option<&JiraTicket>, api_name: &str) -> String {
    let Some(t) = ticket else {
        return String::new();
    };
    match api_name {
        "Jira.Key" => t.key.clone(),
        "Jira.Status" => t.status.clone(),
        "Jira.Priority" => t.priority.clone(),
        "Jira.FixVersion" => t.fix_version.clone(),
        "Jira.Assignee" => t.assignee.clone(),
        "Jira.Url" => t.url.clone(),
        _ => String::new(),
    }
}

fn export_line(row: &CaseRow, fields: &[&ExportField], ticket: Option<&JiraTicket>) -> Vec<String> {
    fields
        .iter()
        .map(|f| {
            if f.is_ticket_field() {
                ticket_value(ticket, &f.api_name)
            } else {
                row.field_text(&f.api_name)
            }
        })
        .collect()
}

/// Build the export table. At most `row_cap` cases are exported; each case
/// yields one line per ticket, or one line with empty ticket fields.
#[must_use]
pub fn export_csv(rows: &[CaseRow], fields: &[ExportField], row_cap: usize) -> CsvTable {
    let selected: Vec<&ExportField> = fields.iter().filter(|f| f.selected).collect();
    let header = selected.iter().map(|f| f.label.clone()).collect();
    let mut lines = Vec::new();
    for row in rows.iter().take(row_cap) {
        if row.jira.is_empty() {
            lines.push(export_line(row, &selected, None));
        } else {
            lines.extend(
                row.jira
                    .iter()
                    .map(|t| export_line(row, &selected, Some(t))),
            );
        }
    }
    CsvTable {
        header,
        rows: lines,
    }
}

/// Quote every value, doubling embedded quotes.
#[must_use]
pub fn csv_escape(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn csv_line(values: &[String]) -> String {
    values
        .iter()
        .map(|v| csv_escape(v))
        .collect::<Vec<_>>()
        .join(",")
}

/// Serialize as comma-delimited UTF-8 text, header first.
#[must_use]
pub fn render_csv(table: &CsvTable) -> String {
    let mut out = csv_line(&table.header);
    out.push('\n');
    for row in &table.rows {
        out.push_str(&csv_line(row));
        out.push('\n');
    }
    out
}

/// Write the CSV. A directory target receives [`EXPORT_FILE_NAME`].
pub fn write_export(target: &Path, csv: &str) -> Result<PathBuf> {
    let path = if target.is_dir() {
        target.join(EXPORT_FILE_NAME)
    } else {
        target.to_path_buf()
    };
    std::fs::write(&path, csv).map_err(|e| SlaError::io(&path, e))?;
    Ok(path)
}
