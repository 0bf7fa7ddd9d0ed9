//! File-backed data source emulating the remote filters, sorting and paging.

#![allow(missing_docs)]

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use serde_json::Value;

use super::{CasePageParams, DataSource, SummarySnapshot};
use crate::core::errors::{Result, SlaError};
use crate::milestone::model::{MilestoneRecord, MilestoneType, Priority, lenient_records};
use crate::table::columns::{StaticMetadata, TICKETS_RELATION};
use crate::table::flatten::{parse_related, value_text};
use crate::table::normalize::MILESTONES_RELATION;
use crate::table::sort::SortDirection;

/// On-disk fixture document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FixtureData {
    #[serde(deserialize_with = "lenient_records")]
    pub milestone_list: Vec<MilestoneRecord>,
    pub cases: Vec<Value>,
    pub metadata: StaticMetadata,
}

/// Data source backed by a JSON document. When created from a file, every
/// summary fetch re-reads it so edits show up on the next poll.
#[derive(Debug)]
pub struct FixtureSource {
    path: Option<PathBuf>,
    data: RwLock<FixtureData>,
    /// Fixed at load time; a refresh only swaps records.
    metadata: StaticMetadata,
    failures_pending: Mutex<usize>,
}

impl FixtureSource {
    #[must_use]
    pub fn new(mut data: FixtureData) -> Self {
        let metadata = std::mem::take(&mut data.metadata);
        Self {
            path: None,
            data: RwLock::new(data),
            metadata,
            failures_pending: Mutex::new(0),
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(Self::new(serde_json::from_str(raw)?))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let mut source = Self::new(read_fixture(path)?);
        source.path = Some(path.to_path_buf());
        Ok(source)
    }

    /// Make the next `count` fetches fail with a transient source error.
    pub fn fail_next(&self, count: usize) {
        *self.failures_pending.lock() = count;
    }

    /// Replace the document in place (simulates remote data changing).
    pub fn replace(&self, mut data: FixtureData) {
        data.metadata = StaticMetadata::default();
        *self.data.write() = data;
    }

    fn take_failure(&self, operation: &'static str) -> Result<()> {
        let mut pending = self.failures_pending.lock();
        if *pending > 0 {
            *pending -= 1;
            return Err(SlaError::source(operation, "injected transient failure"));
        }
        Ok(())
    }

    fn refresh(&self) -> Result<()> {
        if let Some(path) = &self.path {
            let mut data = read_fixture(path)?;
            data.metadata = StaticMetadata::default();
            *self.data.write() = data;
        }
        Ok(())
    }
}

fn read_fixture(path: &Path) -> Result<FixtureData> {
    let raw = std::fs::read_to_string(path).map_err(|e| SlaError::io(path, e))?;
    serde_json::from_str(&raw).map_err(|e| SlaError::source("load_fixture", e.to_string()))
}

fn lookup<'a>(record: &'a Value, dotted: &str) -> Option<&'a Value> {
    dotted
        .split('.')
        .try_fold(record, |value, segment| value.get(segment))
}

fn has_milestone_of(case: &Value, milestone_type: MilestoneType) -> bool {
    parse_related::<Value>(case.get(MILESTONES_RELATION), MILESTONES_RELATION)
        .unwrap_or_default()
        .iter()
        .filter_map(|m| lookup(m, "MilestoneType.Name").and_then(Value::as_str))
        .any(|name| MilestoneType::from_name(name) == Some(milestone_type))
}

fn matches(case: &Value, params: &CasePageParams) -> bool {
    if !has_milestone_of(case, params.milestone_type) {
        return false;
    }
    let stopped = case.get("IsStopped").and_then(Value::as_bool).unwrap_or(false);
    if stopped != params.is_stopped {
        return false;
    }
    if !params.priority_filter.is_empty() {
        let priority = Priority::from_field(case.get("Priority").and_then(Value::as_str));
        if !priority.is_some_and(|p| params.priority_filter.contains(&p)) {
            return false;
        }
    }
    if params.has_jira {
        let tickets =
            parse_related::<Value>(case.get(TICKETS_RELATION), TICKETS_RELATION).unwrap_or_default();
        if tickets.is_empty() {
            return false;
        }
    }
    let term = params.search_term.trim().to_lowercase();
    if !term.is_empty() {
        let hit = ["CaseNumber", "Subject"]
            .iter()
            .any(|f| value_text(case.get(*f)).to_lowercase().contains(&term));
        if !hit {
            return false;
        }
    }
    true
}

fn compare_on(a: &Value, b: &Value, field: &str) -> Ordering {
    let x = value_text(lookup(a, field)).to_lowercase();
    let y = value_text(lookup(b, field)).to_lowercase();
    match (x.is_empty(), y.is_empty()) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => x.cmp(&y),
    }
}

impl DataSource for FixtureSource {
    fn fetch_summary(&self, _scope_id: Option<&str>) -> Result<SummarySnapshot> {
        self.take_failure("fetch_summary")?;
        self.refresh()?;
        Ok(SummarySnapshot {
            milestone_list: self.data.read().milestone_list.clone(),
        })
    }

    fn fetch_case_page(&self, params: &CasePageParams) -> Result<Vec<Value>> {
        self.take_failure("fetch_case_page")?;
        let data = self.data.read();
        let mut hits: Vec<&Value> = data.cases.iter().filter(|c| matches(c, params)).collect();
        // Derived SLA columns are not stored; the caller sorts those locally.
        if let Some(field) = params
            .sort_field
            .as_deref()
            .filter(|f| MilestoneType::from_sla_field(f).is_none())
        {
            hits.sort_by(|a, b| {
                let ord = compare_on(a, b, field);
                match params.sort_direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            });
        }
        Ok(hits
            .into_iter()
            .skip(params.offset)
            .take(params.limit)
            .cloned()
            .collect())
    }

    fn metadata(&self) -> StaticMetadata {
        self.metadata.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::columns::FieldMetadata;
    use serde_json::json;

    fn case(number: &str, priority: &str, stopped: bool, tickets: usize) -> Value {
        let tickets: Vec<Value> = (0..tickets)
            .map(|i| json!({"Id": format!("j{number}{i}"), "Name": format!("AVB-{number}{i}")}))
            .collect();
        json!({
            "Id": format!("id-{number}"),
            "CaseNumber": number,
            "Subject": format!("subject {number}"),
            "Priority": priority,
            "IsStopped": stopped,
            "CaseMilestones": {"records": [{"MilestoneType": {"Name": "Response Time"}}]},
            "Jira_Tickets__r": tickets,
        })
    }

    fn source() -> FixtureSource {
        FixtureSource::new(FixtureData {
            milestone_list: Vec::new(),
            cases: vec![
                case("003", "High", false, 0),
                case("001", "Urgent", false, 2),
                case("002", "Low", true, 1),
                case("004", "", false, 0),
            ],
            metadata: StaticMetadata::default(),
        })
    }

    fn numbers(page: &[Value]) -> Vec<String> {
        page.iter().map(|c| value_text(c.get("CaseNumber"))).collect()
    }

    #[test]
    fn partitions_filters_and_sorting() {
        let src = source();
        let mut params = CasePageParams::first_page(MilestoneType::ResponseTime, 50);
        params.sort_field = Some("CaseNumber".to_string());
        assert_eq!(numbers(&src.fetch_case_page(&params).unwrap()), vec!["001", "003", "004"]);

        params.is_stopped = true;
        assert_eq!(numbers(&src.fetch_case_page(&params).unwrap()), vec!["002"]);

        params.is_stopped = false;
        params.priority_filter = vec![Priority::Normal, Priority::High];
        assert_eq!(numbers(&src.fetch_case_page(&params).unwrap()), vec!["003", "004"]);

        params.priority_filter.clear();
        params.has_jira = true;
        assert_eq!(numbers(&src.fetch_case_page(&params).unwrap()), vec!["001"]);

        params.has_jira = false;
        params.search_term = "SUBJECT 00".to_string();
        params.sort_direction = SortDirection::Desc;
        assert_eq!(numbers(&src.fetch_case_page(&params).unwrap()), vec!["004", "003", "001"]);
    }

    #[test]
    fn paging_returns_short_last_page() {
        let src = source();
        let mut params = CasePageParams::first_page(MilestoneType::ResponseTime, 2);
        assert_eq!(src.fetch_case_page(&params).unwrap().len(), 2);
        params.offset = 2;
        assert_eq!(src.fetch_case_page(&params).unwrap().len(), 1);
    }

    #[test]
    fn other_milestone_types_do_not_match() {
        let src = source();
        let params = CasePageParams::first_page(MilestoneType::FixResolution, 50);
        assert!(src.fetch_case_page(&params).unwrap().is_empty());
    }

    #[test]
    fn injected_failures_are_transient() {
        let src = source();
        src.fail_next(1);
        let err = src.fetch_summary(None).unwrap_err();
        assert!(err.is_retryable());
        assert!(src.fetch_summary(None).is_ok());
    }

    #[test]
    fn load_reads_file_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.json");
        std::fs::write(
            &path,
            r#"{"milestoneList": [{"caseId": "c1", "mName": "Response Time"}],
                "cases": [],
                "metadata": {"Status": {"label": "Case Status"}}}"#,
        )
        .unwrap();
        let src = FixtureSource::load(&path).unwrap();
        assert_eq!(src.fetch_summary(None).unwrap().milestone_list.len(), 1);
        assert_eq!(src.metadata().label("Status").as_deref(), Some("Case Status"));

        std::fs::write(&path, r#"{"milestoneList": []}"#).unwrap();
        assert!(src.fetch_summary(None).unwrap().milestone_list.is_empty());
    }

    #[test]
    fn malformed_milestone_entries_do_not_reject_the_snapshot() {
        let src = FixtureSource::from_json_str(
            r#"{"milestoneList": [
                {"caseId": "c1", "mName": "Response Time", "timeRemaining": "30:00"},
                {"caseId": "c2", "mName": "Response Time", "timeRemaining": 90},
                {"caseId": "c3", "mName": "Fix Resolution", "isCompleted": null, "isViolated": "true"},
                "not a record",
                {"caseId": "c4", "mName": "Response Time", "isStopped": true}
            ]}"#,
        )
        .unwrap();
        let list = src.fetch_summary(None).unwrap().milestone_list;
        let ids: Vec<&str> = list.iter().map(|r| r.case_id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3", "c4"]);
        assert_eq!(list[1].time_remaining.as_deref(), Some("90"));
        assert!(!list[2].is_completed);
        assert!(list[2].is_violated);
        assert!(list[3].is_stopped);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = FixtureSource::load(Path::new("/nonexistent/slad-fixture.json")).unwrap_err();
        assert_eq!(err.code(), "SLA-3002");
    }
}
