//! Milestone record model and the fixed enumerations shared by the counter
//! panel and the drill-down table.

#![allow(missing_docs)]

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ──────────────────── milestone type ────────────────────

/// The fixed set of milestone types. Declaration order is display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MilestoneType {
    #[serde(rename = "Response Time")]
    ResponseTime,
    #[serde(rename = "Analysis and Timeline")]
    AnalysisAndTimeline,
    #[serde(rename = "Update or Workaround")]
    UpdateOrWorkaround,
    #[serde(rename = "Fix Resolution")]
    FixResolution,
}

impl MilestoneType {
    /// All milestone types in display order.
    pub const ALL: [Self; 4] = [
        Self::ResponseTime,
        Self::AnalysisAndTimeline,
        Self::UpdateOrWorkaround,
        Self::FixResolution,
    ];

    /// Name used by the data source (`mName`, `MilestoneType.Name`).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ResponseTime => "Response Time",
            Self::AnalysisAndTimeline => "Analysis and Timeline",
            Self::UpdateOrWorkaround => "Update or Workaround",
            Self::FixResolution => "Fix Resolution",
        }
    }

    /// Abbreviation shown on counters and column headers.
    #[must_use]
    pub const fn short_label(self) -> &'static str {
        match self {
            Self::ResponseTime => "RT",
            Self::AnalysisAndTimeline => "A&T",
            Self::UpdateOrWorkaround => "UoW",
            Self::FixResolution => "Fx",
        }
    }

    /// Full label: `"Response Time (RT)"`.
    #[must_use]
    pub fn full_label(self) -> String {
        format!("{} ({})", self.name(), self.short_label())
    }

    /// Canonical flattened field name carrying this type's derived SLA value.
    #[must_use]
    pub const fn sla_field(self) -> &'static str {
        match self {
            Self::ResponseTime => "RT_Remaining",
            Self::AnalysisAndTimeline => "AT_Remaining",
            Self::UpdateOrWorkaround => "UoW_Remaining",
            Self::FixResolution => "Fx_Remaining",
        }
    }

    /// Zero-based display position.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::ResponseTime => 0,
            Self::AnalysisAndTimeline => 1,
            Self::UpdateOrWorkaround => 2,
            Self::FixResolution => 3,
        }
    }

    /// Resolve a data-source name. Unknown names are not milestone types we track.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(name))
    }

    /// Resolve a canonical SLA field name (`RT_Remaining`, ...).
    #[must_use]
    pub fn from_sla_field(field: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.sla_field().eq_ignore_ascii_case(field))
    }
}

impl fmt::Display for MilestoneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ──────────────────── priority ────────────────────

/// Case priority, most urgent first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    Urgent,
    High,
    Normal,
    Low,
}

impl Priority {
    pub const ALL: [Self; 4] = [Self::Urgent, Self::High, Self::Normal, Self::Low];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Urgent => "Urgent",
            Self::High => "High",
            Self::Normal => "Normal",
            Self::Low => "Low",
        }
    }

    /// Case-insensitive parse. Unknown labels yield `None`.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.label().eq_ignore_ascii_case(label))
    }

    /// Priority of a record field: absent or empty means `Normal`,
    /// unrecognized text means `None`.
    #[must_use]
    pub fn from_field(raw: Option<&str>) -> Option<Self> {
        match raw.map(str::trim) {
            None | Some("") => Some(Self::Normal),
            Some(label) => Self::from_label(label),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ──────────────────── severity bucket ────────────────────

/// Urgency tier derived from hours remaining. Ordered green (calm) to red.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityBucket {
    Green,
    Yellow,
    Orange,
    Red,
}

impl SeverityBucket {
    pub const ALL: [Self; 4] = [Self::Green, Self::Yellow, Self::Orange, Self::Red];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Orange => "orange",
            Self::Red => "red",
        }
    }

    /// Style class consumed by the renderer.
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Green => "sla-green",
            Self::Yellow => "sla-yellow",
            Self::Orange => "sla-orange",
            Self::Red => "sla-red",
        }
    }

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Green => 0,
            Self::Yellow => 1,
            Self::Orange => 2,
            Self::Red => 3,
        }
    }
}

// ──────────────────── milestone record ────────────────────

/// One milestone instance from the summary snapshot.
///
/// Wire names follow the data source (`caseId`, `mName`, ...). The record is
/// an immutable snapshot; a poll replaces the whole list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MilestoneRecord {
    #[serde(deserialize_with = "lenient_string")]
    pub case_id: String,
    #[serde(rename = "mName", deserialize_with = "lenient_string")]
    pub m_name: String,
    #[serde(deserialize_with = "lenient_text")]
    pub priority: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub target_date: Option<String>,
    /// Server-computed `"<minutes>:<seconds>"` token.
    #[serde(alias = "timeRemainingToken", deserialize_with = "lenient_text")]
    pub time_remaining: Option<String>,
    #[serde(deserialize_with = "lenient_flag")]
    pub is_completed: bool,
    #[serde(deserialize_with = "lenient_flag")]
    pub is_violated: bool,
    #[serde(deserialize_with = "lenient_flag")]
    pub is_stopped: bool,
}

impl MilestoneRecord {
    #[must_use]
    pub fn milestone_type(&self) -> Option<MilestoneType> {
        MilestoneType::from_name(&self.m_name)
    }

    #[must_use]
    pub fn priority(&self) -> Option<Priority> {
        Priority::from_field(self.priority.as_deref())
    }
}

/// Decode `milestoneList` entry by entry. Entries that are not records are
/// dropped so one bad item never rejects the snapshot.
pub fn lenient_records<'de, D>(deserializer: D) -> std::result::Result<Vec<MilestoneRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

// ──────────────────── lenient wire values ────────────────────

/// Strings pass through, numbers are rendered, anything else is absent.
pub fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

pub fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_text(deserializer)?.unwrap_or_default())
}

/// `null`, missing and unrecognised values read as `None`.
pub fn lenient_opt_flag<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => Some(b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    })
}

pub fn lenient_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_opt_flag(deserializer)?.unwrap_or(false))
}

// ──────────────────── SLA status ────────────────────

/// Sentinel shown when a milestone has no usable target.
pub const NO_TARGET: &str = "/";

/// Prefix of the overdue rendering.
pub const OVERDUE_PREFIX: &str = "Overdue by ";

/// Resolved SLA display value for one (case, milestone type) pair.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SlaStatus {
    #[default]
    NoTarget,
    Completed,
    Violated,
    Remaining(String),
    Overdue(String),
}

impl SlaStatus {
    /// Precedence when several instances of one type exist on a case.
    #[must_use]
    pub const fn rank(&self) -> u8 {
        match self {
            Self::NoTarget => 0,
            Self::Remaining(_) | Self::Overdue(_) => 1,
            Self::Completed => 2,
            Self::Violated => 3,
        }
    }

    /// Keep `self` unless `candidate` strictly outranks it; ties keep the first.
    pub fn merge(&mut self, candidate: Self) {
        if candidate.rank() > self.rank() {
            *self = candidate;
        }
    }

    /// Rendered cell text.
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            Self::NoTarget => NO_TARGET.to_string(),
            Self::Completed => "Completed".to_string(),
            Self::Violated => "Violated".to_string(),
            Self::Remaining(d) => d.clone(),
            Self::Overdue(d) => format!("{OVERDUE_PREFIX}{d}"),
        }
    }

    /// Inverse of [`Self::display`].
    #[must_use]
    pub fn from_display(raw: &str) -> Self {
        let raw = raw.trim();
        match raw {
            "" | NO_TARGET => Self::NoTarget,
            "Completed" => Self::Completed,
            "Violated" => Self::Violated,
            _ => match raw.strip_prefix(OVERDUE_PREFIX) {
                Some(d) => Self::Overdue(d.to_string()),
                None => Self::Remaining(raw.to_string()),
            },
        }
    }
}

impl fmt::Display for SlaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}
