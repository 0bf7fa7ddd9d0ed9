//! Single-threaded executor for the dashboard state machine.
//!
//! The runtime owns the model, executes the commands returned by
//! [`update`] against a [`DataSource`] and a [`LogSink`], and feeds results
//! back as messages. Timers live in a virtual-time queue so tests can drive
//! the clock deterministically; [`DashboardRuntime::run`] maps that clock onto
//! wall time and receives external events over a channel.

#![allow(missing_docs)]

use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, TimeDelta, Utc};
use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::dashboard::model::{DashboardModel, DashboardSettings};
use crate::dashboard::subscription::{ListenerKind, ListenerRegistry, Subscription};
use crate::dashboard::update::{DashboardCmd, DashboardMsg, update};
use crate::dashboard::view::{DashboardViewModel, compute_view_model};
use crate::logger::LogSink;
use crate::milestone::aggregator::Aggregation;
use crate::source::DataSource;
use crate::table::export::write_export;

/// Longest wait between clock checks when no timer is pending.
const IDLE_WAIT: Duration = Duration::from_secs(1);

/// Input from outside the runtime (UI events, shutdown requests).
#[derive(Debug)]
pub enum RuntimeEvent {
    Dispatch(DashboardMsg),
    Shutdown,
}

/// Why [`DashboardRuntime::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    Shutdown,
    Disconnected,
    PollLimit,
}

pub struct DashboardRuntime<S: DataSource, L: LogSink> {
    model: DashboardModel,
    source: S,
    sink: L,
    listeners: ListenerRegistry,
    escape: Option<Subscription>,
    drag: Option<Subscription>,
    queue: VecDeque<DashboardMsg>,
    timers: BTreeMap<(Duration, u64), DashboardMsg>,
    timer_seq: u64,
    origin: DateTime<Utc>,
    elapsed: Duration,
    /// When set, page responses wait in `held` instead of being delivered.
    hold_pages: bool,
    held: Vec<DashboardMsg>,
    summary_fetches: usize,
    navigations: Vec<String>,
    exports: Vec<PathBuf>,
}

impl<S: DataSource, L: LogSink> DashboardRuntime<S, L> {
    /// `origin` is the wall-clock time at virtual time zero.
    pub fn new(settings: DashboardSettings, source: S, sink: L, origin: DateTime<Utc>) -> Self {
        let model = DashboardModel::new(settings, source.metadata(), origin);
        Self {
            model,
            source,
            sink,
            listeners: ListenerRegistry::new(),
            escape: None,
            drag: None,
            queue: VecDeque::new(),
            timers: BTreeMap::new(),
            timer_seq: 0,
            origin,
            elapsed: Duration::ZERO,
            hold_pages: false,
            held: Vec::new(),
            summary_fetches: 0,
            navigations: Vec::new(),
            exports: Vec::new(),
        }
    }

    #[must_use]
    pub const fn model(&self) -> &DashboardModel {
        &self.model
    }

    #[must_use]
    pub fn view(&self) -> DashboardViewModel {
        compute_view_model(&self.model)
    }

    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    #[must_use]
    pub const fn sink(&self) -> &L {
        &self.sink
    }

    #[must_use]
    pub const fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    /// Record ids handed to the host's navigation.
    #[must_use]
    pub fn navigations(&self) -> &[String] {
        &self.navigations
    }

    /// Files written by completed exports.
    #[must_use]
    pub fn exports(&self) -> &[PathBuf] {
        &self.exports
    }

    #[must_use]
    pub const fn summary_fetches(&self) -> usize {
        self.summary_fetches
    }

    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Time until the earliest pending timer.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers
            .keys()
            .next()
            .map(|(due, _)| due.saturating_sub(self.elapsed))
    }

    /// Deliver a message and everything it causes.
    pub fn dispatch(&mut self, msg: DashboardMsg) {
        self.queue.push_back(msg);
        self.drain();
    }

    /// Move the virtual clock forward, firing due timers in order.
    pub fn advance(&mut self, by: Duration) {
        let target = self.elapsed.saturating_add(by);
        while let Some(entry) = self.timers.first_entry() {
            let (due, _) = *entry.key();
            if due > target {
                break;
            }
            let msg = entry.remove();
            self.elapsed = self.elapsed.max(due);
            self.dispatch(msg);
        }
        self.elapsed = target;
        self.sync_clock();
    }

    /// Hold page responses back to simulate slow requests.
    pub fn hold_page_responses(&mut self, hold: bool) {
        self.hold_pages = hold;
    }

    /// Deliver held page responses, newest first when `reverse` is set.
    pub fn release_held_responses(&mut self, reverse: bool) {
        let mut held = std::mem::take(&mut self.held);
        if reverse {
            held.reverse();
        }
        self.queue.extend(held);
        self.drain();
    }

    /// Stop timers, close the drill-down and release every listener.
    pub fn shutdown(&mut self) {
        self.dispatch(DashboardMsg::CloseDrillDown);
        self.dispatch(DashboardMsg::VisibilityChanged(false));
        self.timers.clear();
        self.escape = None;
        self.drag = None;
    }

    /// Run against wall time until shutdown, disconnection, or `max_polls`
    /// summary fetches.
    pub fn run(&mut self, events: &Receiver<RuntimeEvent>, max_polls: Option<usize>) -> RunExit {
        self.run_observed(events, max_polls, |_, _| {})
    }

    /// Like [`Self::run`], handing the view to `observe` after every summary
    /// fetch.
    pub fn run_observed<F>(
        &mut self,
        events: &Receiver<RuntimeEvent>,
        max_polls: Option<usize>,
        mut observe: F,
    ) -> RunExit
    where
        F: FnMut(&DashboardViewModel, &Aggregation),
    {
        if !self.model.visible {
            self.dispatch(DashboardMsg::Started);
        }
        let mut observed = 0;
        loop {
            if self.summary_fetches != observed {
                observed = self.summary_fetches;
                observe(&self.view(), &self.model.aggregation);
            }
            if max_polls.is_some_and(|max| self.summary_fetches >= max) {
                self.shutdown();
                return RunExit::PollLimit;
            }
            let wait = self.next_deadline().unwrap_or(IDLE_WAIT).min(IDLE_WAIT);
            let started = Instant::now();
            match events.recv_timeout(wait) {
                Ok(RuntimeEvent::Dispatch(msg)) => {
                    self.advance(started.elapsed());
                    self.dispatch(msg);
                }
                Ok(RuntimeEvent::Shutdown) => {
                    self.shutdown();
                    return RunExit::Shutdown;
                }
                Err(RecvTimeoutError::Timeout) => self.advance(started.elapsed().max(wait)),
                Err(RecvTimeoutError::Disconnected) => {
                    self.shutdown();
                    return RunExit::Disconnected;
                }
            }
        }
    }

    fn sync_clock(&mut self) {
        let offset = TimeDelta::from_std(self.elapsed).unwrap_or(TimeDelta::MAX);
        self.model.now = self.origin.checked_add_signed(offset).unwrap_or(self.origin);
    }

    fn drain(&mut self) {
        while let Some(msg) = self.queue.pop_front() {
            self.sync_clock();
            let cmd = update(&mut self.model, msg);
            for cmd in cmd.flatten() {
                self.execute(cmd);
            }
        }
    }

    fn schedule(&mut self, after: Duration, msg: DashboardMsg) {
        self.timer_seq += 1;
        self.timers
            .insert((self.elapsed.saturating_add(after), self.timer_seq), msg);
    }

    fn execute(&mut self, cmd: DashboardCmd) {
        match cmd {
            DashboardCmd::None => {}
            DashboardCmd::Batch(cmds) => {
                for cmd in cmds {
                    self.execute(cmd);
                }
            }
            DashboardCmd::FetchSummary { scope_id } => {
                self.summary_fetches += 1;
                let result = self.source.fetch_summary(scope_id.as_deref());
                self.queue.push_back(DashboardMsg::SummaryLoaded(result));
            }
            DashboardCmd::FetchPage { request, params } => {
                let result = self.source.fetch_case_page(&params);
                let msg = DashboardMsg::PageLoaded { request, result };
                if self.hold_pages {
                    self.held.push(msg);
                } else {
                    self.queue.push_back(msg);
                }
            }
            DashboardCmd::FetchExport { params } => {
                let result = self.source.fetch_case_page(&params);
                self.queue.push_back(DashboardMsg::ExportFetched(result));
            }
            DashboardCmd::WriteExport { path, csv } => {
                let result = write_export(&path, &csv);
                if let Ok(written) = &result {
                    self.exports.push(written.clone());
                }
                self.queue.push_back(DashboardMsg::ExportWritten(result));
            }
            DashboardCmd::SchedulePoll { generation, after } => {
                self.schedule(after, DashboardMsg::PollTick(generation));
            }
            DashboardCmd::ScheduleFlash { generation, after } => {
                self.schedule(after, DashboardMsg::FlashTick(generation));
            }
            DashboardCmd::ScheduleNotificationExpiry { id, after } => {
                self.schedule(after, DashboardMsg::NotificationExpired(id));
            }
            DashboardCmd::Attach(kind) => {
                let subscription = self.listeners.attach(kind);
                match kind {
                    ListenerKind::Escape => self.escape = Some(subscription),
                    ListenerKind::PointerDrag => self.drag = Some(subscription),
                }
            }
            DashboardCmd::Release(kind) => {
                let held = match kind {
                    ListenerKind::Escape => self.escape.take(),
                    ListenerKind::PointerDrag => self.drag.take(),
                };
                if let Some(subscription) = held {
                    subscription.release();
                }
            }
            DashboardCmd::NavigateToRecord(id) => self.navigations.push(id),
            DashboardCmd::Log(entry) => self.sink.record(entry),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::jsonl::{EventType, LogEntry};
    use crate::milestone::model::MilestoneType;
    use crate::source::FixtureSource;
    use crate::source::fixture::FixtureData;
    use crate::table::sequencer::Partition;
    use chrono::TimeZone;
    use serde_json::json;

    fn origin() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn fixture() -> FixtureSource {
        let data: FixtureData = serde_json::from_value(json!({
            "milestoneList": [
                {"caseId": "c1", "mName": "Response Time", "timeRemaining": "30:00", "priority": "Urgent"},
                {"caseId": "c2", "mName": "Fix Resolution", "timeRemaining": "3000:00", "priority": "Low"},
            ],
            "cases": [
                {"Id": "c1", "CaseNumber": "001", "Subject": "engine", "Priority": "Urgent",
                 "CaseMilestones": {"records": [{"MilestoneType": {"Name": "Response Time"},
                                                 "TimeRemainingInMins": "30:00"}]}},
            ],
        }))
        .unwrap();
        FixtureSource::new(data)
    }

    fn runtime() -> DashboardRuntime<FixtureSource, Vec<LogEntry>> {
        let settings = DashboardSettings {
            poll_interval: Duration::from_secs(60),
            ..DashboardSettings::default()
        };
        DashboardRuntime::new(settings, fixture(), Vec::new(), origin())
    }

    #[test]
    fn polling_refetches_on_interval() {
        let mut rt = runtime();
        rt.dispatch(DashboardMsg::Started);
        assert_eq!(rt.summary_fetches(), 1);
        assert!(rt.view().alerting);

        rt.advance(Duration::from_secs(59));
        assert_eq!(rt.summary_fetches(), 1);
        rt.advance(Duration::from_secs(1));
        assert_eq!(rt.summary_fetches(), 2);
        assert_eq!(rt.model().now, origin() + TimeDelta::seconds(60));

        rt.dispatch(DashboardMsg::VisibilityChanged(false));
        rt.advance(Duration::from_secs(600));
        assert_eq!(rt.summary_fetches(), 2);
    }

    #[test]
    fn flash_toggles_while_alerting() {
        let mut rt = runtime();
        rt.dispatch(DashboardMsg::Started);
        assert!(rt.model().flash_on);
        rt.advance(rt.model().settings.flash_interval);
        assert!(!rt.model().flash_on);
        rt.advance(rt.model().settings.flash_interval);
        assert!(rt.model().flash_on);
    }

    #[test]
    fn escape_listener_follows_drill_down() {
        let mut rt = runtime();
        for _ in 0..3 {
            rt.dispatch(DashboardMsg::OpenDrillDown(MilestoneType::ResponseTime));
            assert_eq!(rt.listeners().active(ListenerKind::Escape), 1);
            rt.dispatch(DashboardMsg::EscapePressed);
            assert_eq!(rt.listeners().total(), 0);
        }
    }

    #[test]
    fn shutdown_releases_drag_mid_gesture() {
        let mut rt = runtime();
        rt.dispatch(DashboardMsg::OpenDrillDown(MilestoneType::ResponseTime));
        rt.dispatch(DashboardMsg::ResizeStarted {
            field_name: "Subject".to_string(),
            x: 10,
            width_px: 100,
        });
        assert_eq!(rt.listeners().total(), 2);
        rt.shutdown();
        assert_eq!(rt.listeners().total(), 0);
        assert!(rt.next_deadline().is_none());
    }

    #[test]
    fn out_of_order_pages_apply_newest_only() {
        let mut rt = runtime();
        rt.hold_page_responses(true);
        rt.dispatch(DashboardMsg::OpenDrillDown(MilestoneType::ResponseTime));
        rt.dispatch(DashboardMsg::Search("no such case".to_string()));
        rt.hold_page_responses(false);
        rt.release_held_responses(true);

        let view = rt.view();
        let drill = view.drill_down.unwrap();
        assert!(drill.active.rows.is_empty());
        let stale = rt
            .sink()
            .iter()
            .filter(|e| e.event == EventType::StaleResponseDiscarded)
            .count();
        assert_eq!(stale, Partition::ALL.len());
    }

    #[test]
    fn notifications_expire_on_the_clock() {
        let mut rt = runtime();
        rt.source().fail_next(1);
        rt.dispatch(DashboardMsg::Started);
        assert_eq!(rt.view().notifications.len(), 1);
        rt.advance(Duration::from_secs(5));
        assert!(rt.view().notifications.is_empty());
    }

    #[test]
    fn view_case_is_forwarded() {
        let mut rt = runtime();
        rt.dispatch(DashboardMsg::ViewCase("c1".to_string()));
        assert_eq!(rt.navigations(), ["c1".to_string()]);
    }

    #[test]
    fn run_stops_after_poll_limit() {
        let mut rt = DashboardRuntime::new(
            DashboardSettings {
                poll_interval: Duration::from_millis(10),
                ..DashboardSettings::default()
            },
            fixture(),
            Vec::new(),
            origin(),
        );
        let (_tx, rx) = crossbeam_channel::unbounded();
        assert_eq!(rt.run(&rx, Some(3)), RunExit::PollLimit);
        assert_eq!(rt.summary_fetches(), 3);
        assert!(!rt.model().visible);
    }

    #[test]
    fn observer_sees_each_refresh() {
        let mut rt = DashboardRuntime::new(
            DashboardSettings {
                poll_interval: Duration::from_millis(10),
                ..DashboardSettings::default()
            },
            fixture(),
            Vec::new(),
            origin(),
        );
        let (_tx, rx) = crossbeam_channel::unbounded();
        let mut counts = Vec::new();
        let exit = rt.run_observed(&rx, Some(2), |view, aggregation| {
            counts.push(view.counters[MilestoneType::ResponseTime.index()].count);
            assert_eq!(aggregation.active_stats(MilestoneType::ResponseTime).count, 1);
        });
        assert_eq!(exit, RunExit::PollLimit);
        assert_eq!(counts, vec![1, 1]);
    }

    #[test]
    fn run_honors_shutdown_event() {
        let mut rt = runtime();
        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(RuntimeEvent::Dispatch(DashboardMsg::OpenDrillDown(MilestoneType::ResponseTime)))
            .unwrap();
        tx.send(RuntimeEvent::Shutdown).unwrap();
        assert_eq!(rt.run(&rx, None), RunExit::Shutdown);
        assert!(rt.model().drill_down.is_none());
        assert_eq!(rt.listeners().total(), 0);
    }
}
