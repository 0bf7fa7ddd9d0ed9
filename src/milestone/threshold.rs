//! Severity classification against three configurable hour cut points.

use serde::{Deserialize, Serialize};

use super::model::SeverityBucket;

/// Hour cut points, checked in descending order. A milestone falls in the first
/// bucket whose cut point it strictly exceeds; below all of them it is red.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// More than this many hours remaining is green.
    pub green_min_hours: f64,
    /// More than this many hours remaining is yellow.
    pub yellow_min_hours: f64,
    /// More than this many hours remaining is orange.
    pub orange_min_hours: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            green_min_hours: 24.0,
            yellow_min_hours: 12.0,
            orange_min_hours: 1.0,
        }
    }
}

impl Thresholds {
    /// Bucket for a plain hours-remaining value.
    #[must_use]
    pub fn classify_hours(&self, hours_remaining: f64) -> SeverityBucket {
        if hours_remaining > self.green_min_hours {
            SeverityBucket::Green
        } else if hours_remaining > self.yellow_min_hours {
            SeverityBucket::Yellow
        } else if hours_remaining > self.orange_min_hours {
            SeverityBucket::Orange
        } else {
            SeverityBucket::Red
        }
    }

    /// Bucket for a milestone.
    ///
    /// Violated is always red. Completed (and not violated) is not bucketed and
    /// yields `None`; callers count it separately.
    #[must_use]
    pub fn classify(
        &self,
        hours_remaining: f64,
        completed: bool,
        violated: bool,
    ) -> Option<SeverityBucket> {
        if violated {
            return Some(SeverityBucket::Red);
        }
        if completed {
            return None;
        }
        Some(self.classify_hours(hours_remaining))
    }
}
