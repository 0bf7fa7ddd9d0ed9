//! Column configuration: parses a `field[:widthPx], ...` specification into the
//! ordered column list of the drill-down table.
//!
//! Layout rules, applied in order:
//! 1. the case identifier is always first (default width when unspecified);
//! 2. the four SLA columns follow in fixed order, user duplicates removed;
//! 3. the remaining tokens keep their relative order;
//! 4. dotted paths are nested fields, keyed with [`DOT_SEP`] instead of `.`;
//! 5. `jira` is a non-sortable aggregate of the case's tickets;
//! 6. the identifier is a button, booleans come from metadata;
//! 7. labels fall back to the raw field name.
//!
//! A specification that does not parse degrades to identifier + subject.

#![allow(missing_docs)]

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SlaError};
use crate::milestone::model::MilestoneType;
use crate::table::normalize::MILESTONES_RELATION;

/// Separator replacing `.` in flattened keys.
pub const DOT_SEP: &str = "__DOT__";
/// Case identifier column.
pub const CASE_ID_FIELD: &str = "CaseNumber";
/// Second column of the fallback layout.
pub const SUBJECT_FIELD: &str = "Subject";
/// Aggregate ticket column.
pub const JIRA_FIELD: &str = "jira";
/// Relationship holding a case's external tickets.
pub const TICKETS_RELATION: &str = "Jira_Tickets__r";
/// Boolean field recognized without metadata.
pub const KNOWN_BOOLEAN_FIELD: &str = "IsEscalated";

pub const DEFAULT_CASE_ID_WIDTH: u32 = 100;
pub const SLA_COLUMN_WIDTH: u32 = 150;
pub const MIN_COLUMN_WIDTH: u32 = 40;

/// Render type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Clickable record link.
    Button,
    Boolean,
    Text,
}

/// Field types reported by object metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Boolean,
    Date,
    DateTime,
    Number,
    Text,
}

/// Object-metadata lookup for labels and types.
pub trait FieldMetadata {
    fn label(&self, field: &str) -> Option<String>;
    fn kind(&self, field: &str) -> Option<FieldKind>;
}

/// No metadata available: raw names, text types.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMetadata;

impl FieldMetadata for NoMetadata {
    fn label(&self, _field: &str) -> Option<String> {
        None
    }

    fn kind(&self, _field: &str) -> Option<FieldKind> {
        None
    }
}

/// Describes one field in [`StaticMetadata`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub label: String,
    #[serde(default = "default_kind")]
    pub kind: FieldKind,
}

const fn default_kind() -> FieldKind {
    FieldKind::Text
}

/// Metadata table loaded alongside the data source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticMetadata {
    fields: HashMap<String, FieldDescriptor>,
}

impl StaticMetadata {
    #[must_use]
    pub fn with_field(mut self, name: &str, label: &str, kind: FieldKind) -> Self {
        self.fields.insert(
            name.to_string(),
            FieldDescriptor {
                label: label.to_string(),
                kind,
            },
        );
        self
    }

    fn descriptor(&self, field: &str) -> Option<&FieldDescriptor> {
        self.fields.get(field).or_else(|| {
            self.fields
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(field))
                .map(|(_, v)| v)
        })
    }
}

impl FieldMetadata for StaticMetadata {
    fn label(&self, field: &str) -> Option<String> {
        self.descriptor(field).map(|d| d.label.clone())
    }

    fn kind(&self, field: &str) -> Option<FieldKind> {
        self.descriptor(field).map(|d| d.kind)
    }
}

/// One table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    /// Flattened, dot-free key.
    pub field_name: String,
    /// Dotted path as the data source knows it.
    pub source_path: String,
    pub label: String,
    pub column_type: ColumnType,
    pub width_px: Option<u32>,
    pub sortable: bool,
    /// Set for the four derived SLA columns.
    pub virtual_sla: Option<MilestoneType>,
    /// Set for the ticket aggregate column.
    pub aggregate: bool,
    /// Whether the table is currently sorted by this column.
    pub sorted: bool,
}

impl Column {
    #[must_use]
    pub const fn is_virtual_sla(&self) -> bool {
        self.virtual_sla.is_some()
    }

    fn case_id(width: Option<u32>) -> Self {
        Self {
            field_name: CASE_ID_FIELD.to_string(),
            source_path: CASE_ID_FIELD.to_string(),
            label: "Case Number".to_string(),
            column_type: ColumnType::Button,
            width_px: Some(width.unwrap_or(DEFAULT_CASE_ID_WIDTH)),
            sortable: true,
            virtual_sla: None,
            aggregate: false,
            sorted: false,
        }
    }

    fn sla(milestone_type: MilestoneType) -> Self {
        Self {
            field_name: milestone_type.sla_field().to_string(),
            source_path: milestone_type.sla_field().to_string(),
            label: format!("{} Remaining", milestone_type.short_label()),
            column_type: ColumnType::Text,
            width_px: Some(SLA_COLUMN_WIDTH),
            sortable: true,
            virtual_sla: Some(milestone_type),
            aggregate: false,
            sorted: false,
        }
    }

    fn jira(width: Option<u32>) -> Self {
        Self {
            field_name: JIRA_FIELD.to_string(),
            source_path: TICKETS_RELATION.to_string(),
            label: "Jira Tickets".to_string(),
            column_type: ColumnType::Text,
            width_px: width,
            sortable: false,
            virtual_sla: None,
            aggregate: true,
            sorted: false,
        }
    }

    fn field(token: &SpecToken, metadata: &dyn FieldMetadata) -> Self {
        let nested = token.name.contains('.');
        let field_name = token.name.replace('.', DOT_SEP);
        let label = if nested {
            token.name.split('.').collect::<Vec<_>>().join(" ")
        } else {
            metadata
                .label(&token.name)
                .unwrap_or_else(|| token.name.clone())
        };
        let is_boolean = metadata.kind(&token.name) == Some(FieldKind::Boolean)
            || token.name.eq_ignore_ascii_case(KNOWN_BOOLEAN_FIELD);
        Self {
            field_name,
            source_path: token.name.clone(),
            label,
            column_type: if is_boolean {
                ColumnType::Boolean
            } else {
                ColumnType::Text
            },
            width_px: token.width,
            sortable: true,
            virtual_sla: None,
            aggregate: false,
            sorted: false,
        }
    }
}

/// Outcome of a build: the columns, plus the parse failure when the fallback
/// layout was used.
#[derive(Debug)]
pub struct ColumnBuild {
    pub columns: Vec<Column>,
    pub fallback: Option<SlaError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SpecToken {
    name: String,
    width: Option<u32>,
}

fn parse_spec(spec: &str) -> Result<Vec<SpecToken>> {
    let mut tokens = Vec::new();
    for raw in spec.split(',') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let (name, width) = match raw.split_once(':') {
            Some((name, width)) => {
                let width = width.trim().parse::<u32>().map_err(|e| SlaError::ColumnSpec {
                    details: format!("width of {raw:?}: {e}"),
                })?;
                (name.trim(), Some(width))
            }
            None => (raw, None),
        };
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && !name.ends_with('.')
            && !name.contains("..")
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
        if !valid {
            return Err(SlaError::ColumnSpec {
                details: format!("invalid field name in {raw:?}"),
            });
        }
        tokens.push(SpecToken {
            name: name.to_string(),
            width,
        });
    }
    Ok(tokens)
}

fn try_build(spec: &str, metadata: &dyn FieldMetadata) -> Result<Vec<Column>> {
    let tokens = parse_spec(spec)?;

    let case_id_width = tokens
        .iter()
        .find(|t| t.name.eq_ignore_ascii_case(CASE_ID_FIELD))
        .and_then(|t| t.width);

    let mut columns = Vec::with_capacity(tokens.len() + 5);
    columns.push(Column::case_id(case_id_width));
    columns.extend(MilestoneType::ALL.into_iter().map(Column::sla));

    let mut seen: HashSet<String> = columns
        .iter()
        .map(|c| c.field_name.to_ascii_lowercase())
        .collect();
    for token in &tokens {
        let column = if token.name.eq_ignore_ascii_case(JIRA_FIELD) {
            Column::jira(token.width)
        } else {
            Column::field(token, metadata)
        };
        if seen.insert(column.field_name.to_ascii_lowercase()) {
            columns.push(column);
        }
    }
    Ok(columns)
}

/// Minimal layout used when the specification cannot be parsed.
#[must_use]
pub fn fallback_columns() -> Vec<Column> {
    vec![
        Column::case_id(None),
        Column::field(
            &SpecToken {
                name: SUBJECT_FIELD.to_string(),
                width: None,
            },
            &NoMetadata,
        ),
    ]
}

/// Build the column list. Never fails: a bad specification yields
/// [`fallback_columns`] and the parse error in [`ColumnBuild::fallback`].
#[must_use]
pub fn build_columns(
    spec: &str,
    metadata: &dyn FieldMetadata,
    sorted_by: Option<&str>,
) -> ColumnBuild {
    let (mut columns, fallback) = match try_build(spec, metadata) {
        Ok(columns) => (columns, None),
        Err(err) => (fallback_columns(), Some(err)),
    };
    mark_sorted(&mut columns, sorted_by);
    ColumnBuild { columns, fallback }
}

/// Refresh the sorted-column marker after a sort change.
pub fn mark_sorted(columns: &mut [Column], sorted_by: Option<&str>) {
    for column in columns {
        column.sorted = sorted_by == Some(column.field_name.as_str());
    }
}

/// Set a column's width, clamped to [`MIN_COLUMN_WIDTH`]. Returns whether the
/// column exists.
pub fn resize_column(columns: &mut [Column], field_name: &str, width_px: u32) -> bool {
    match columns.iter_mut().find(|c| c.field_name == field_name) {
        Some(column) => {
            column.width_px = Some(width_px.max(MIN_COLUMN_WIDTH));
            true
        }
        None => false,
    }
}

/// Field list requested from the data source. Derived SLA columns are not
/// stored and are left out; the ticket aggregate requests its relationship.
#[must_use]
pub fn query_fields(columns: &[Column]) -> Vec<String> {
    let mut fields: Vec<String> = columns
        .iter()
        .filter(|c| !c.is_virtual_sla())
        .map(|c| c.source_path.clone())
        .collect();
    // SLA values and ticket details are derived from these relations.
    for relation in [MILESTONES_RELATION, TICKETS_RELATION] {
        if !fields.iter().any(|f| f == relation) {
            fields.push(relation.to_string());
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(columns: &[Column]) -> Vec<&str> {
        columns.iter().map(|c| c.field_name.as_str()).collect()
    }

    #[test]
    fn case_number_width_and_mandatory_sla_columns() {
        let build = build_columns("CaseNumber:80, Subject", &NoMetadata, None);
        assert!(build.fallback.is_none());
        let cols = build.columns;
        assert_eq!(cols.len(), 6);
        assert_eq!(
            names(&cols),
            vec![
                "CaseNumber",
                "RT_Remaining",
                "AT_Remaining",
                "UoW_Remaining",
                "Fx_Remaining",
                "Subject"
            ]
        );
        assert_eq!(cols[0].width_px, Some(80));
        assert_eq!(cols[0].column_type, ColumnType::Button);
        assert!(cols[1..5].iter().all(Column::is_virtual_sla));
    }

    #[test]
    fn case_number_is_forced_first_with_default_width() {
        let cols = build_columns("Subject, Priority, CaseNumber", &NoMetadata, None).columns;
        assert_eq!(cols[0].field_name, CASE_ID_FIELD);
        assert_eq!(cols[0].width_px, Some(DEFAULT_CASE_ID_WIDTH));
        assert_eq!(names(&cols)[5..], ["Subject", "Priority"]);
    }

    #[test]
    fn user_sla_duplicates_are_removed() {
        let cols = build_columns(" Fx_Remaining , Subject, RT_Remaining:300 ", &NoMetadata, None)
            .columns;
        assert_eq!(cols.len(), 6);
        let fx: Vec<_> = cols.iter().filter(|c| c.field_name == "Fx_Remaining").collect();
        assert_eq!(fx.len(), 1);
        assert_eq!(cols[1].width_px, Some(SLA_COLUMN_WIDTH));
    }

    #[test]
    fn nested_fields_use_separator_and_joined_label() {
        let cols = build_columns("Account.Name", &NoMetadata, None).columns;
        let nested = &cols[5];
        assert_eq!(nested.field_name, "Account__DOT__Name");
        assert_eq!(nested.source_path, "Account.Name");
        assert_eq!(nested.label, "Account Name");
        assert!(!nested.field_name.contains('.'));
    }

    #[test]
    fn jira_is_non_sortable_aggregate() {
        let cols = build_columns("Subject, JIRA", &NoMetadata, None).columns;
        let jira = cols.iter().find(|c| c.aggregate).expect("jira column");
        assert!(!jira.sortable);
        assert_eq!(jira.label, "Jira Tickets");
        assert_eq!(jira.field_name, JIRA_FIELD);
    }

    #[test]
    fn metadata_drives_labels_and_boolean_type() {
        let meta = StaticMetadata::default()
            .with_field("Status", "Case Status", FieldKind::Text)
            .with_field("Is_Key_Account__c", "Key Account", FieldKind::Boolean);
        let cols = build_columns("Status, Is_Key_Account__c, IsEscalated, Origin", &meta, None)
            .columns;
        assert_eq!(cols[5].label, "Case Status");
        assert_eq!(cols[6].column_type, ColumnType::Boolean);
        assert_eq!(cols[7].column_type, ColumnType::Boolean);
        assert_eq!(cols[8].label, "Origin");
        assert_eq!(cols[8].column_type, ColumnType::Text);
    }

    #[test]
    fn malformed_spec_degrades_to_two_columns() {
        for bad in ["CaseNumber:wide, Subject", "Sub ject", ":80", "Account..Name"] {
            let build = build_columns(bad, &NoMetadata, None);
            assert_eq!(names(&build.columns), vec!["CaseNumber", "Subject"], "{bad}");
            let err = build.fallback.expect("fallback error");
            assert_eq!(err.code(), "SLA-2003");
        }
    }

    #[test]
    fn sorted_marker_follows_sort_field() {
        let mut cols = build_columns("Subject", &NoMetadata, Some("RT_Remaining")).columns;
        assert!(cols[1].sorted);
        assert!(!cols[0].sorted);
        mark_sorted(&mut cols, Some("Subject"));
        assert!(cols[5].sorted);
        assert!(!cols[1].sorted);
    }

    #[test]
    fn resize_clamps_and_only_touches_width() {
        let mut cols = build_columns("Subject", &NoMetadata, None).columns;
        let before = cols[5].clone();
        assert!(resize_column(&mut cols, "Subject", 10));
        assert_eq!(cols[5].width_px, Some(MIN_COLUMN_WIDTH));
        assert_eq!(cols[5].label, before.label);
        assert!(!resize_column(&mut cols, "Missing", 100));
    }

    #[test]
    fn query_fields_skip_virtual_sla() {
        let cols = build_columns("Subject, Account.Name, jira", &NoMetadata, None).columns;
        assert_eq!(
            query_fields(&cols),
            vec!["CaseNumber", "Subject", "Account.Name", TICKETS_RELATION, MILESTONES_RELATION]
        );
    }

    #[test]
    fn query_fields_always_request_relations() {
        let cols = build_columns("Subject", &NoMetadata, None).columns;
        assert_eq!(
            query_fields(&cols),
            vec!["CaseNumber", "Subject", MILESTONES_RELATION, TICKETS_RELATION]
        );
        let fallback = fallback_columns();
        let fields = query_fields(&fallback);
        assert!(fields.iter().any(|f| f == MILESTONES_RELATION));
        assert!(fields.iter().any(|f| f == TICKETS_RELATION));
    }
}
