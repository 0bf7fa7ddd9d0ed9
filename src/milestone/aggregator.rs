//! Per-milestone-type aggregation of the summary snapshot.
//!
//! Each pass consumes the full milestone list and produces, per type, a count,
//! a priority breakdown, and severity bucket counts. Milestones whose clock is
//! stopped (waiting on the customer) are tallied into a parallel set.
//!
//! Invariant: for every type, `bucket_counts.total() == count`. Completed
//! milestones are not bucketed and are tracked in `completed` instead.

#![allow(missing_docs)]

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::model::{MilestoneRecord, MilestoneType, Priority, SeverityBucket};
use super::threshold::Thresholds;
use super::time_remaining;

// ──────────────────── counters ────────────────────

/// Open-milestone counts by case priority. Unknown priorities are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PriorityCounts {
    pub urgent: usize,
    pub high: usize,
    pub normal: usize,
    pub low: usize,
}

impl PriorityCounts {
    pub fn record(&mut self, priority: Option<Priority>) {
        match priority {
            Some(Priority::Urgent) => self.urgent += 1,
            Some(Priority::High) => self.high += 1,
            Some(Priority::Normal) => self.normal += 1,
            Some(Priority::Low) => self.low += 1,
            None => {}
        }
    }

    #[must_use]
    pub const fn get(&self, priority: Priority) -> usize {
        match priority {
            Priority::Urgent => self.urgent,
            Priority::High => self.high,
            Priority::Normal => self.normal,
            Priority::Low => self.low,
        }
    }

    /// Counter tooltip: `"U: 1 | H: 0 | N: 3 | L: 0"`.
    #[must_use]
    pub fn tooltip(&self) -> String {
        format!(
            "U: {} | H: {} | N: {} | L: {}",
            self.urgent, self.high, self.normal, self.low
        )
    }
}

/// Open-milestone counts by severity bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BucketCounts {
    pub green: usize,
    pub yellow: usize,
    pub orange: usize,
    pub red: usize,
}

impl BucketCounts {
    pub fn increment(&mut self, bucket: SeverityBucket) {
        match bucket {
            SeverityBucket::Green => self.green += 1,
            SeverityBucket::Yellow => self.yellow += 1,
            SeverityBucket::Orange => self.orange += 1,
            SeverityBucket::Red => self.red += 1,
        }
    }

    #[must_use]
    pub const fn get(&self, bucket: SeverityBucket) -> usize {
        match bucket {
            SeverityBucket::Green => self.green,
            SeverityBucket::Yellow => self.yellow,
            SeverityBucket::Orange => self.orange,
            SeverityBucket::Red => self.red,
        }
    }

    #[must_use]
    pub const fn total(&self) -> usize {
        self.green + self.yellow + self.orange + self.red
    }
}

/// Statistics for one milestone type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MilestoneStats {
    /// Open (or violated) milestones; equals the bucket total.
    pub count: usize,
    /// Completed, non-violated milestones (not bucketed).
    pub completed: usize,
    pub priority_counts: PriorityCounts,
    pub bucket_counts: BucketCounts,
}

impl MilestoneStats {
    #[must_use]
    pub const fn has_data(&self) -> bool {
        self.count > 0
    }
}

/// Stats keyed by type; always holds all four types.
pub type StatsByType = BTreeMap<MilestoneType, MilestoneStats>;

fn empty_stats() -> StatsByType {
    MilestoneType::ALL
        .into_iter()
        .map(|t| (t, MilestoneStats::default()))
        .collect()
}

/// Result of one aggregation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Aggregation {
    /// Milestones whose clock is ticking.
    pub active: StatsByType,
    /// Stopped / waiting-on-customer milestones.
    pub stopped: StatsByType,
}

impl Default for Aggregation {
    fn default() -> Self {
        Self {
            active: empty_stats(),
            stopped: empty_stats(),
        }
    }
}

impl Aggregation {
    #[must_use]
    pub fn active_stats(&self, milestone_type: MilestoneType) -> MilestoneStats {
        self.active
            .get(&milestone_type)
            .copied()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn stopped_stats(&self, milestone_type: MilestoneType) -> MilestoneStats {
        self.stopped
            .get(&milestone_type)
            .copied()
            .unwrap_or_default()
    }
}

// ──────────────────── modes ────────────────────

/// Whether every milestone counts, or only one representative per case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    #[default]
    AllMilestones,
    /// "Priority mode": one representative milestone per case.
    OnePerCase,
}

/// How the representative milestone of a case is chosen in [`AggregationMode::OnePerCase`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepresentativeRule {
    /// Violated first, then the open milestone with the least time remaining.
    /// Independent of input order.
    #[default]
    MostUrgent,
    /// First milestone of the case in input order (depends on upstream ordering).
    InputOrder,
}

// ──────────────────── aggregation ────────────────────

/// A milestone with its type and bucket resolved.
#[derive(Debug, Clone, Copy)]
struct Classified<'a> {
    index: usize,
    record: &'a MilestoneRecord,
    milestone_type: MilestoneType,
    hours: Option<f64>,
    bucket: Option<SeverityBucket>,
}

fn classify_record<'a>(
    index: usize,
    record: &'a MilestoneRecord,
    thresholds: &Thresholds,
    now: DateTime<Utc>,
) -> Option<Classified<'a>> {
    let milestone_type = record.milestone_type()?;
    let remaining = time_remaining::resolve(
        record.time_remaining.as_deref(),
        record.target_date.as_deref(),
        now,
    );
    let bucket = match remaining.hours {
        Some(hours) => thresholds.classify(hours, record.is_completed, record.is_violated),
        // No target: violated still reads red, completed stays unbucketed,
        // an open milestone without a deadline is not under time pressure.
        None if record.is_violated => Some(SeverityBucket::Red),
        None if record.is_completed => None,
        None => Some(SeverityBucket::Green),
    };
    Some(Classified {
        index,
        record,
        milestone_type,
        hours: remaining.hours,
        bucket,
    })
}

/// Total order used by [`RepresentativeRule::MostUrgent`]; smaller is more urgent.
fn urgency_order(a: &Classified<'_>, b: &Classified<'_>) -> Ordering {
    fn class(c: &Classified<'_>) -> u8 {
        if c.record.is_violated {
            0
        } else if c.record.is_completed {
            2
        } else {
            1
        }
    }
    let hours = |c: &Classified<'_>| c.hours.unwrap_or(f64::INFINITY);
    class(a)
        .cmp(&class(b))
        .then_with(|| hours(a).total_cmp(&hours(b)))
        .then_with(|| a.milestone_type.cmp(&b.milestone_type))
        .then_with(|| a.record.priority().cmp(&b.record.priority()))
        .then_with(|| a.record.is_stopped.cmp(&b.record.is_stopped))
        .then_with(|| a.index.cmp(&b.index))
}

fn select_representatives<'a>(
    classified: Vec<Classified<'a>>,
    rule: RepresentativeRule,
) -> Vec<Classified<'a>> {
    match rule {
        RepresentativeRule::InputOrder => {
            let mut seen: HashSet<&str> = HashSet::new();
            classified
                .into_iter()
                .filter(|c| seen.insert(c.record.case_id.as_str()))
                .collect()
        }
        RepresentativeRule::MostUrgent => {
            let mut best: HashMap<&str, Classified<'a>> = HashMap::new();
            for c in classified {
                best.entry(c.record.case_id.as_str())
                    .and_modify(|current| {
                        if urgency_order(&c, current) == Ordering::Less {
                            *current = c;
                        }
                    })
                    .or_insert(c);
            }
            let mut chosen: Vec<Classified<'a>> = best.into_values().collect();
            chosen.sort_by_key(|c| c.index);
            chosen
        }
    }
}

/// Aggregate a milestone snapshot.
///
/// Records with an unrecognized milestone type are ignored. `now` is the
/// reference time for records that only carry a target timestamp.
#[must_use]
pub fn aggregate(
    records: &[MilestoneRecord],
    mode: AggregationMode,
    rule: RepresentativeRule,
    thresholds: &Thresholds,
    now: DateTime<Utc>,
) -> Aggregation {
    let classified: Vec<Classified<'_>> = records
        .iter()
        .enumerate()
        .filter_map(|(i, r)| classify_record(i, r, thresholds, now))
        .collect();

    let contributing = match mode {
        AggregationMode::AllMilestones => classified,
        AggregationMode::OnePerCase => select_representatives(classified, rule),
    };

    let mut out = Aggregation::default();
    for c in contributing {
        let partition = if c.record.is_stopped {
            &mut out.stopped
        } else {
            &mut out.active
        };
        let stats = partition.entry(c.milestone_type).or_default();
        match c.bucket {
            Some(bucket) => {
                stats.count += 1;
                stats.priority_counts.record(c.record.priority());
                stats.bucket_counts.increment(bucket);
            }
            None => stats.completed += 1,
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn rec(case: &str, name: &str, token: &str) -> MilestoneRecord {
        MilestoneRecord {
            case_id: case.to_string(),
            m_name: name.to_string(),
            time_remaining: Some(token.to_string()),
            ..MilestoneRecord::default()
        }
    }

    fn run(records: &[MilestoneRecord], mode: AggregationMode) -> Aggregation {
        aggregate(
            records,
            mode,
            RepresentativeRule::MostUrgent,
            &Thresholds::default(),
            now(),
        )
    }

    #[test]
    fn counts_buckets_and_priorities_per_type() {
        let mut urgent = rec("1", "Response Time", "30:00");
        urgent.priority = Some("Urgent".into());
        let records = vec![
            urgent,
            rec("2", "Response Time", "3000:00"),
            rec("3", "Fix Resolution", "300:00"),
        ];
        let agg = run(&records, AggregationMode::AllMilestones);
        let rt = agg.active_stats(MilestoneType::ResponseTime);
        assert_eq!(rt.count, 2);
        assert_eq!(rt.bucket_counts.red, 1);
        assert_eq!(rt.bucket_counts.green, 1);
        assert_eq!(rt.priority_counts.urgent, 1);
        assert_eq!(rt.priority_counts.normal, 1);
        let fx = agg.active_stats(MilestoneType::FixResolution);
        assert_eq!(fx.bucket_counts.orange, 1);
        assert!(!agg.active_stats(MilestoneType::UpdateOrWorkaround).has_data());
    }

    #[test]
    fn completed_is_tracked_separately() {
        let mut done = rec("1", "Response Time", "10:00");
        done.is_completed = true;
        let mut late = rec("2", "Response Time", "10:00");
        late.is_completed = true;
        late.is_violated = true;
        let agg = run(&[done, late], AggregationMode::AllMilestones);
        let rt = agg.active_stats(MilestoneType::ResponseTime);
        assert_eq!(rt.completed, 1);
        assert_eq!(rt.count, 1);
        assert_eq!(rt.bucket_counts.red, 1);
    }

    #[test]
    fn stopped_milestones_go_to_parallel_set() {
        let mut paused = rec("1", "Update or Workaround", "5:00");
        paused.is_stopped = true;
        let agg = run(&[paused], AggregationMode::AllMilestones);
        assert_eq!(agg.active_stats(MilestoneType::UpdateOrWorkaround).count, 0);
        let stopped = agg.stopped_stats(MilestoneType::UpdateOrWorkaround);
        assert_eq!(stopped.count, 1);
        assert_eq!(stopped.bucket_counts.red, 1);
    }

    #[test]
    fn unknown_types_are_ignored() {
        let agg = run(&[rec("1", "Custom Milestone", "5:00")], AggregationMode::AllMilestones);
        assert!(agg.active.values().all(|s| s.count == 0 && s.completed == 0));
    }

    #[test]
    fn input_order_rule_keeps_first_milestone_per_case() {
        let records = vec![
            rec("1", "Fix Resolution", "3000:00"),
            rec("1", "Response Time", "10:00"),
            rec("2", "Response Time", "10:00"),
            rec("1", "Update or Workaround", "10:00"),
        ];
        let agg = aggregate(
            &records,
            AggregationMode::OnePerCase,
            RepresentativeRule::InputOrder,
            &Thresholds::default(),
            now(),
        );
        assert_eq!(agg.active_stats(MilestoneType::FixResolution).count, 1);
        assert_eq!(agg.active_stats(MilestoneType::ResponseTime).count, 1);
        assert_eq!(agg.active_stats(MilestoneType::UpdateOrWorkaround).count, 0);
    }

    #[test]
    fn most_urgent_rule_is_order_independent() {
        let mut violated = rec("1", "Update or Workaround", "600:00");
        violated.is_violated = true;
        let a = vec![
            rec("1", "Fix Resolution", "3000:00"),
            rec("1", "Response Time", "10:00"),
            violated.clone(),
        ];
        let mut b = a.clone();
        b.reverse();
        let agg_a = run(&a, AggregationMode::OnePerCase);
        let agg_b = run(&b, AggregationMode::OnePerCase);
        assert_eq!(agg_a, agg_b);
        assert_eq!(agg_a.active_stats(MilestoneType::UpdateOrWorkaround).count, 1);
        assert_eq!(agg_a.active_stats(MilestoneType::ResponseTime).count, 0);
    }

    #[test]
    fn tooltip_format() {
        let counts = PriorityCounts {
            urgent: 1,
            high: 2,
            normal: 3,
            low: 4,
        };
        assert_eq!(counts.tooltip(), "U: 1 | H: 2 | N: 3 | L: 4");
    }

    fn arb_record() -> impl Strategy<Value = MilestoneRecord> {
        (
            0u8..6,
            prop_oneof![
                Just("Response Time"),
                Just("Analysis and Timeline"),
                Just("Update or Workaround"),
                Just("Fix Resolution"),
                Just("Other"),
            ],
            -3_000i64..6_000,
            any::<bool>(),
            any::<bool>(),
            any::<bool>(),
            any::<bool>(),
        )
            .prop_map(|(case, name, minutes, completed, violated, stopped, tokened)| {
                MilestoneRecord {
                    case_id: format!("case-{case}"),
                    m_name: name.to_string(),
                    priority: None,
                    target_date: None,
                    time_remaining: tokened.then(|| format!("{minutes}:00")),
                    is_completed: completed,
                    is_violated: violated,
                    is_stopped: stopped,
                }
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn bucket_totals_match_counts(
            records in prop::collection::vec(arb_record(), 0..60),
            one_per_case in any::<bool>(),
        ) {
            let mode = if one_per_case {
                AggregationMode::OnePerCase
            } else {
                AggregationMode::AllMilestones
            };
            let agg = run(&records, mode);
            for stats in agg.active.values().chain(agg.stopped.values()) {
                prop_assert_eq!(stats.bucket_counts.total(), stats.count);
            }
        }

        #[test]
        fn one_per_case_never_exceeds_case_count(
            records in prop::collection::vec(arb_record(), 0..60),
        ) {
            let agg = run(&records, AggregationMode::OnePerCase);
            let cases: HashSet<&str> = records
                .iter()
                .filter(|r| r.milestone_type().is_some())
                .map(|r| r.case_id.as_str())
                .collect();
            let contributed: usize = agg
                .active
                .values()
                .chain(agg.stopped.values())
                .map(|s| s.count + s.completed)
                .sum();
            prop_assert_eq!(contributed, cases.len());
        }
    }
}
