//! Gauge view derivation for the counter panel.
//!
//! Segments stack red, orange, yellow, green. Each segment's offset is the full
//! circle minus the percentages already drawn before it, which is what a
//! stroke-dash ring renderer consumes directly.

#![allow(clippy::cast_precision_loss)]

use serde::{Deserialize, Serialize};

use super::aggregator::MilestoneStats;
use super::model::{MilestoneType, SeverityBucket};

/// Circumference the percentages are expressed against.
pub const GAUGE_FULL_CIRCLE: f64 = 100.0;

/// Visual stacking order of the ring.
pub const STACK_ORDER: [SeverityBucket; 4] = [
    SeverityBucket::Red,
    SeverityBucket::Orange,
    SeverityBucket::Yellow,
    SeverityBucket::Green,
];

/// One ring segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GaugeSegment {
    pub bucket: SeverityBucket,
    /// `100 * bucket_count / max(count, 1)`.
    pub percent: f64,
    /// Dash offset: full circle minus the preceding segments.
    pub offset: f64,
    pub css_class: &'static str,
}

/// Ring segments in stacking order. A zero-count type yields all-zero segments.
#[must_use]
pub fn gauge_segments(stats: &MilestoneStats) -> Vec<GaugeSegment> {
    let denominator = stats.count.max(1) as f64;
    let mut drawn = 0.0;
    STACK_ORDER
        .into_iter()
        .map(|bucket| {
            let percent = 100.0 * stats.bucket_counts.get(bucket) as f64 / denominator;
            let segment = GaugeSegment {
                bucket,
                percent,
                offset: GAUGE_FULL_CIRCLE - drawn,
                css_class: bucket.css_class(),
            };
            drawn += percent;
            segment
        })
        .collect()
}

/// Counter colors, configured per deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterColors {
    /// Used when the counter is non-zero.
    pub threshold_color: String,
    /// Used when the counter is zero.
    pub normal_color: String,
}

impl Default for CounterColors {
    fn default() -> Self {
        Self {
            threshold_color: "#ff0000".to_string(),
            normal_color: "#000000".to_string(),
        }
    }
}

/// Background heat hint derived from the most urgent priority present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HeatLevel {
    None,
    Normal,
    High,
    Urgent,
}

impl HeatLevel {
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::None => "heat-none",
            Self::Normal => "heat-normal",
            Self::High => "heat-high",
            Self::Urgent => "heat-urgent",
        }
    }
}

/// Render-ready counter for one milestone type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GaugeView {
    pub milestone_type: MilestoneType,
    pub id: &'static str,
    pub full_label: String,
    pub short_label: &'static str,
    pub count: usize,
    pub completed: usize,
    pub has_data: bool,
    pub tooltip: String,
    pub heat: HeatLevel,
    pub color: String,
    pub segments: Vec<GaugeSegment>,
    /// Active milestones in the red bucket; drives the flashing alert.
    pub alerting: bool,
    pub stopped_count: usize,
    pub stopped_tooltip: String,
}

/// Build the counter view for one type from its active and stopped stats.
///
/// Stopped milestones never make a counter alert, even when they are red.
#[must_use]
pub fn gauge_view(
    milestone_type: MilestoneType,
    active: &MilestoneStats,
    stopped: &MilestoneStats,
    colors: &CounterColors,
) -> GaugeView {
    let priorities = &active.priority_counts;
    let heat = if active.count == 0 {
        HeatLevel::None
    } else if priorities.urgent > 0 {
        HeatLevel::Urgent
    } else if priorities.high > 0 {
        HeatLevel::High
    } else {
        HeatLevel::Normal
    };
    let color = if active.count > 0 {
        colors.threshold_color.clone()
    } else {
        colors.normal_color.clone()
    };
    GaugeView {
        milestone_type,
        id: milestone_type.name(),
        full_label: milestone_type.full_label(),
        short_label: milestone_type.short_label(),
        count: active.count,
        completed: active.completed,
        has_data: active.has_data(),
        tooltip: priorities.tooltip(),
        heat,
        color,
        segments: gauge_segments(active),
        alerting: active.bucket_counts.red > 0,
        stopped_count: stopped.count,
        stopped_tooltip: stopped.priority_counts.tooltip(),
    }
}
