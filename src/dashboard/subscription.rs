//! Scoped listener registrations.
//!
//! Attaching a global listener yields a [`Subscription`]; dropping it releases
//! the registration, so early returns and panics cannot leak listeners across
//! open/close cycles or drag gestures.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

/// Global listeners the dashboard may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerKind {
    /// Keyboard escape, held while the drill-down is open.
    Escape,
    /// Pointer move and pointer up, held for one resize gesture.
    PointerDrag,
}

type Counts = Arc<Mutex<BTreeMap<ListenerKind, usize>>>;

/// Shared table of live registrations.
#[derive(Debug, Clone, Default)]
pub struct ListenerRegistry {
    counts: Counts,
}

impl ListenerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. It stays registered until the returned value is
    /// released or dropped.
    #[must_use]
    pub fn attach(&self, kind: ListenerKind) -> Subscription {
        *self.counts.lock().entry(kind).or_insert(0) += 1;
        Subscription {
            counts: Arc::clone(&self.counts),
            kind,
            released: false,
        }
    }

    /// Live registrations of one kind.
    #[must_use]
    pub fn active(&self, kind: ListenerKind) -> usize {
        self.counts.lock().get(&kind).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.lock().values().sum()
    }
}

/// RAII handle for one registration.
#[derive(Debug)]
#[must_use = "dropping a subscription releases the listener immediately"]
pub struct Subscription {
    counts: Counts,
    kind: ListenerKind,
    released: bool,
}

impl Subscription {
    #[must_use]
    pub const fn kind(&self) -> ListenerKind {
        self.kind
    }

    /// Explicit release; equivalent to dropping.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let mut counts = self.counts.lock();
        if let Some(n) = counts.get_mut(&self.kind) {
            *n = n.saturating_sub(1);
            if *n == 0 {
                counts.remove(&self.kind);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_inner();
    }
}
