//! Row ordering for the drill-down table.
//!
//! SLA columns sort by a numeric score; everything else sorts case-folded
//! text (or numbers, when both sides are numbers). Empty values come first in
//! both directions.

#![allow(missing_docs)]

use std::cmp::Ordering;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::normalize::CaseRow;
use crate::milestone::model::{MilestoneType, NO_TARGET, OVERDUE_PREFIX};

/// Score of a violated milestone; below every overdue value.
pub const VIOLATED_SCORE: i64 = -1_000_000_000;
/// Score of the no-target marker; above every plain duration.
pub const NO_TARGET_SCORE: i64 = 1_000_000_000;
/// Score of a completed milestone; above the no-target marker.
pub const COMPLETED_SCORE: i64 = 2_000_000_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    /// Header icon hint.
    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Asc => "utility:arrowup",
            Self::Desc => "utility:arrowdown",
        }
    }
}

/// Current sort key and direction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub field: Option<String>,
    pub direction: SortDirection,
}

impl SortState {
    #[must_use]
    pub fn ascending(field: &str) -> Self {
        Self {
            field: Some(field.to_string()),
            direction: SortDirection::Asc,
        }
    }

    /// Header activation: the same column toggles direction, a new column
    /// starts ascending.
    pub fn activate(&mut self, field: &str) {
        if self.field.as_deref() == Some(field) {
            self.direction = self.direction.toggled();
        } else {
            self.field = Some(field.to_string());
            self.direction = SortDirection::Asc;
        }
    }
}

fn duration_part() -> Option<&'static Regex> {
    static PART: OnceLock<Option<Regex>> = OnceLock::new();
    PART.get_or_init(|| Regex::new(r"(\d+)\s*([dhm])").ok())
        .as_ref()
}

/// Sum the `d`/`h`/`m` components of a duration string into minutes.
#[must_use]
pub fn parse_duration_minutes(raw: &str) -> i64 {
    let Some(re) = duration_part() else {
        return 0;
    };
    re.captures_iter(raw)
        .map(|cap| {
            let n: i64 = cap[1].parse().unwrap_or(0);
            let factor = match &cap[2] {
                "d" => 1_440,
                "h" => 60,
                _ => 1,
            };
            n.saturating_mul(factor)
        })
        .fold(0_i64, i64::saturating_add)
}

/// Numeric score of an SLA display value.
///
/// Violated < more overdue < less overdue < less remaining < more remaining
/// < `/` < Completed.
#[must_use]
pub fn sla_score(raw: &str) -> i64 {
    let raw = raw.trim();
    match raw {
        "Violated" => VIOLATED_SCORE,
        "Completed" => COMPLETED_SCORE,
        NO_TARGET => NO_TARGET_SCORE,
        _ => match raw.strip_prefix(OVERDUE_PREFIX) {
            Some(d) => -parse_duration_minutes(d),
            None if duration_part().is_some_and(|re| re.is_match(raw)) => {
                parse_duration_minutes(raw)
            }
            None => NO_TARGET_SCORE,
        },
    }
}

fn compare_present(a: &Value, b: &Value, sla_field: bool) -> Ordering {
    if sla_field {
        let (a, b) = (a.as_str().unwrap_or_default(), b.as_str().unwrap_or_default());
        return sla_score(a).cmp(&sla_score(b));
    }
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }
    let x = super::flatten::value_text(Some(a)).to_lowercase();
    let y = super::flatten::value_text(Some(b)).to_lowercase();
    x.cmp(&y)
}

fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

/// Compare two rows on `field`. Empty values precede non-empty ones whatever
/// the direction; only the non-empty ordering reverses.
#[must_use]
pub fn compare_rows(a: &CaseRow, b: &CaseRow, field: &str, direction: SortDirection) -> Ordering {
    let (x, y) = (a.fields.get(field), b.fields.get(field));
    match (is_empty(x), is_empty(y)) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => {
            let (Some(x), Some(y)) = (x, y) else {
                return Ordering::Equal;
            };
            let ord = compare_present(x, y, MilestoneType::from_sla_field(field).is_some());
            match direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        }
    }
}

/// Stable in-place sort. No sort field leaves the order untouched.
pub fn sort_rows(rows: &mut [CaseRow], state: &SortState) {
    if let Some(field) = state.field.as_deref() {
        rows.sort_by(|a, b| compare_rows(a, b, field, state.direction));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::flatten::FlatRecord;
    use crate::table::normalize::SlaValues;
    use proptest::prelude::*;
    use serde_json::json;

    fn row(id: &str, field: &str, value: Value) -> CaseRow {
        let mut fields = FlatRecord::new();
        fields.insert(field.to_string(), value);
        CaseRow {
            id: id.to_string(),
            fields,
            sla: SlaValues::default(),
            jira: Vec::new(),
            cells: Vec::new(),
            row_class: String::new(),
            degraded: None,
        }
    }

    fn ids(rows: &[CaseRow]) -> Vec<&str> {
        rows.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn duration_parsing_sums_components() {
        assert_eq!(sla_score("Overdue by 1d 2h 3m"), -(1_440 + 2 * 60 + 3));
        assert_eq!(parse_duration_minutes("2h 5m"), 125);
        assert_eq!(parse_duration_minutes("7m"), 7);
        assert_eq!(sla_score("1d 0h 0m"), 1_440);
    }

    #[test]
    fn sla_score_relative_order() {
        let ordered = [
            "Violated",
            "Overdue by 1h 0m",
            "Overdue by 5m",
            "3m",
            "2d 0h 0m",
            "/",
            "Completed",
        ];
        let scores: Vec<i64> = ordered.iter().map(|v| sla_score(v)).collect();
        assert!(scores.windows(2).all(|w| w[0] < w[1]), "{scores:?}");
    }

    #[test]
    fn sla_columns_sort_by_score() {
        let mut rows = vec![
            row("done", "RT_Remaining", json!("Completed")),
            row("late", "RT_Remaining", json!("Overdue by 5m")),
            row("soon", "RT_Remaining", json!("45m")),
            row("bad", "RT_Remaining", json!("Violated")),
            row("none", "RT_Remaining", json!("/")),
        ];
        sort_rows(&mut rows, &SortState::ascending("RT_Remaining"));
        assert_eq!(ids(&rows), vec!["bad", "late", "soon", "none", "done"]);
    }

    #[test]
    fn empty_values_first_in_both_directions() {
        let base = vec![
            row("b", "Subject", json!("beta")),
            row("e1", "Subject", json!("")),
            row("A", "Subject", json!("Alpha")),
            row("e2", "Other", json!("x")),
        ];
        let mut asc = base.clone();
        sort_rows(&mut asc, &SortState::ascending("Subject"));
        assert_eq!(ids(&asc), vec!["e1", "e2", "A", "b"]);

        let mut desc = base;
        sort_rows(
            &mut desc,
            &SortState {
                field: Some("Subject".to_string()),
                direction: SortDirection::Desc,
            },
        );
        assert_eq!(ids(&desc), vec!["e1", "e2", "b", "A"]);
    }

    #[test]
    fn numbers_compare_numerically() {
        let mut rows = vec![
            row("ten", "Age", json!(10)),
            row("two", "Age", json!(2)),
        ];
        sort_rows(&mut rows, &SortState::ascending("Age"));
        assert_eq!(ids(&rows), vec!["two", "ten"]);
    }

    #[test]
    fn activate_toggles_same_column_and_resets_new() {
        let mut state = SortState::ascending("Subject");
        state.activate("Subject");
        assert_eq!(state.direction, SortDirection::Desc);
        assert_eq!(state.direction.icon(), "utility:arrowdown");
        state.activate("Priority");
        assert_eq!(state.field.as_deref(), Some("Priority"));
        assert_eq!(state.direction, SortDirection::Asc);
    }

    fn arb_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(json!("")),
            Just(Value::Null),
            "[a-cA-C]{0,3}".prop_map(Value::from),
        ]
    }

    proptest! {
        #[test]
        fn sorting_is_idempotent(
            values in prop::collection::vec(arb_value(), 0..30),
            desc in any::<bool>(),
        ) {
            let mut rows: Vec<CaseRow> = values
                .into_iter()
                .enumerate()
                .map(|(i, v)| row(&i.to_string(), "Subject", v))
                .collect();
            let state = SortState {
                field: Some("Subject".to_string()),
                direction: if desc { SortDirection::Desc } else { SortDirection::Asc },
            };
            sort_rows(&mut rows, &state);
            let once: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
            sort_rows(&mut rows, &state);
            let twice: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
            prop_assert_eq!(once, twice);

            let first_non_empty = rows.iter().position(|r| !is_empty(r.fields.get("Subject")));
            if let Some(p) = first_non_empty {
                prop_assert!(rows[p..].iter().all(|r| !is_empty(r.fields.get("Subject"))));
            }
        }
    }
}
