//! Generation-tagged periodic timers for polling and the red-zone flash.
//!
//! A timer never cancels what it already scheduled. Instead every start or
//! stop bumps a generation counter, and a tick carrying an older generation is
//! ignored when it fires.

#![allow(missing_docs)]

use std::time::Duration;

/// One periodic timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodicTimer {
    interval: Duration,
    generation: u64,
    running: bool,
}

impl PeriodicTimer {
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            generation: 0,
            running: false,
        }
    }

    /// Start (or restart) the timer. Returns the generation to tag the first
    /// tick with; ticks of earlier generations become stale.
    pub fn start(&mut self) -> u64 {
        self.generation += 1;
        self.running = true;
        self.generation
    }

    pub fn stop(&mut self) {
        if self.running {
            self.generation += 1;
            self.running = false;
        }
    }

    /// Whether a tick tagged `generation` should run.
    #[must_use]
    pub const fn accepts(&self, generation: u64) -> bool {
        self.running && generation == self.generation
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }
}

/// The two timers the dashboard owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingScheduler {
    pub poll: PeriodicTimer,
    pub flash: PeriodicTimer,
}

impl PollingScheduler {
    #[must_use]
    pub const fn new(poll_interval: Duration, flash_interval: Duration) -> Self {
        Self {
            poll: PeriodicTimer::new(poll_interval),
            flash: PeriodicTimer::new(flash_interval),
        }
    }

    /// Hidden view or teardown: both timers stop.
    pub fn stop_all(&mut self) {
        self.poll.stop();
        self.flash.stop();
    }
}
