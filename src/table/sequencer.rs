//! Request sequencing and pagination for the drill-down table.
//!
//! Every fetch captures a [`RequestToken`] when issued. A response is applied
//! only if its token is still the newest for its partition; anything older is
//! discarded on arrival. The active and stopped partitions page independently.

#![allow(missing_docs)]

use serde::Serialize;

/// Opaque, monotonically increasing request identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RequestToken(u64);

impl RequestToken {
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

/// Issues tokens and answers staleness.
#[derive(Debug, Clone, Default)]
pub struct RequestSequencer {
    latest: u64,
}

impl RequestSequencer {
    #[must_use]
    pub const fn new() -> Self {
        Self { latest: 0 }
    }

    /// Issue a token, superseding every earlier one.
    pub fn issue(&mut self) -> RequestToken {
        self.latest += 1;
        RequestToken(self.latest)
    }

    /// True iff a newer request has been issued since `token`.
    #[must_use]
    pub const fn is_stale(&self, token: RequestToken) -> bool {
        token.0 != self.latest
    }

    #[must_use]
    pub const fn latest(&self) -> Option<RequestToken> {
        if self.latest == 0 {
            None
        } else {
            Some(RequestToken(self.latest))
        }
    }

    /// Supersede every outstanding request without issuing a new one.
    pub fn invalidate(&mut self) {
        self.latest += 1;
    }
}

/// Case partition: actively ticking, or stopped waiting on the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    Active,
    Stopped,
}

impl Partition {
    pub const ALL: [Self; 2] = [Self::Active, Self::Stopped];

    #[must_use]
    pub const fn is_stopped(self) -> bool {
        matches!(self, Self::Stopped)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Active => 0,
            Self::Stopped => 1,
        }
    }
}

/// How a page's rows combine with the rows already loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyMode {
    /// First page after a reset: replaces the list.
    Replace,
    /// Pagination: appended.
    Append,
}

/// A page fetch to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    pub partition: Partition,
    pub token: RequestToken,
    pub offset: usize,
    pub limit: usize,
    pub mode: ApplyMode,
}

/// Offset and availability for one partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    pub offset: usize,
    pub page_size: usize,
    pub more_available: bool,
    pub in_flight: bool,
}

impl PageCursor {
    #[must_use]
    pub const fn new(page_size: usize) -> Self {
        Self {
            offset: 0,
            page_size,
            more_available: false,
            in_flight: false,
        }
    }

    /// A short page signals exhaustion.
    pub fn record_page(&mut self, returned: usize) {
        self.more_available = self.page_size > 0 && returned >= self.page_size;
        self.in_flight = false;
    }
}

/// Sequencer plus cursor for one partition.
#[derive(Debug, Clone)]
pub struct PartitionPager {
    pub partition: Partition,
    sequencer: RequestSequencer,
    pub cursor: PageCursor,
}

impl PartitionPager {
    #[must_use]
    pub const fn new(partition: Partition, page_size: usize) -> Self {
        Self {
            partition,
            sequencer: RequestSequencer::new(),
            cursor: PageCursor::new(page_size),
        }
    }

    /// Continue an earlier token sequence, so responses to requests issued
    /// before (for example by a closed drill-down) stay stale.
    #[must_use]
    pub const fn resume(partition: Partition, page_size: usize, sequencer: RequestSequencer) -> Self {
        Self {
            partition,
            sequencer,
            cursor: PageCursor::new(page_size),
        }
    }

    #[must_use]
    pub const fn sequencer(&self) -> &RequestSequencer {
        &self.sequencer
    }

    /// Restart from offset zero, superseding anything in flight.
    pub fn begin_reset(&mut self) -> PageRequest {
        self.cursor.offset = 0;
        self.cursor.in_flight = true;
        PageRequest {
            partition: self.partition,
            token: self.sequencer.issue(),
            offset: 0,
            limit: self.cursor.page_size,
            mode: ApplyMode::Replace,
        }
    }

    /// Next page, only when more data is available and nothing is loading.
    pub fn begin_next(&mut self) -> Option<PageRequest> {
        if !self.cursor.more_available || self.cursor.in_flight {
            return None;
        }
        self.cursor.offset += self.cursor.page_size;
        self.cursor.in_flight = true;
        Some(PageRequest {
            partition: self.partition,
            token: self.sequencer.issue(),
            offset: self.cursor.offset,
            limit: self.cursor.page_size,
            mode: ApplyMode::Append,
        })
    }

    /// Accept a response. `false` means it was stale and must be discarded.
    pub fn accept(&mut self, token: RequestToken, returned: usize) -> bool {
        if self.sequencer.is_stale(token) {
            return false;
        }
        self.cursor.record_page(returned);
        true
    }

    /// A failed fetch clears the loading flag if it was the newest request.
    pub fn fail(&mut self, token: RequestToken) -> bool {
        if self.sequencer.is_stale(token) {
            return false;
        }
        self.cursor.in_flight = false;
        true
    }

    #[must_use]
    pub const fn is_stale(&self, token: RequestToken) -> bool {
        self.sequencer.is_stale(token)
    }

    /// Drop everything: outstanding responses become stale.
    pub fn close(&mut self) {
        self.sequencer.invalidate();
        self.cursor = PageCursor::new(self.cursor.page_size);
    }
}
