//! # Worker lifecycle tracker with sequence-based ordering.
//!
//! Maintains which workers still hold a server, using event sequence numbers
//! to handle out-of-order delivery. The supervisor consults it when the
//! shutdown grace period runs out, to name the stuck workers.
//!
//! ## Architecture
//! ```text
//! Worker ──► Bus ──► subscriber_listener() ──► AliveTracker::update()
//!                                                     │
//!                                                     ▼
//!                                          HashMap<String, WorkerState>
//!                                              (name → {seq, alive})
//! ```
//!
//! ## Rules
//! - `WorkerStarting` marks a worker alive; `WorkerStopped` / `WorkerStartFailed` mark it gone
//! - Other events carrying a worker only advance its `seq`
//! - Events with `seq <= last_seq` are **rejected** (stale)

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::events::{Event, EventKind};

#[derive(Debug, Clone)]
struct WorkerState {
    last_seq: u64,
    alive: bool,
}

/// Thread-safe tracker of workers that have not released their server yet.
#[derive(Debug, Default)]
pub(crate) struct AliveTracker {
    state: RwLock<HashMap<String, WorkerState>>,
}

impl AliveTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Applies `ev` if it is newer than the last event seen for its worker.
    ///
    /// Returns `true` when the alive state changed.
    pub(crate) async fn update(&self, ev: &Event) -> bool {
        let alive = match ev.kind {
            EventKind::WorkerStarting => Some(true),
            EventKind::WorkerStopped | EventKind::WorkerStartFailed => Some(false),
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => return false,
            _ => None,
        };
        let Some(name) = ev.worker.as_deref() else {
            return false;
        };

        let mut state = self.state.write().await;
        let entry = state.entry(name.to_string()).or_insert(WorkerState {
            last_seq: 0,
            alive: false,
        });
        if ev.seq <= entry.last_seq && entry.last_seq != 0 {
            return false;
        }
        entry.last_seq = ev.seq;
        match alive {
            Some(a) if a != entry.alive => {
                entry.alive = a;
                true
            }
            _ => false,
        }
    }

    /// Sorted names of workers still holding a server.
    pub(crate) async fn snapshot(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut alive: Vec<String> = state
            .iter()
            .filter(|(_, ws)| ws.alive)
            .map(|(name, _)| name.clone())
            .collect();
        alive.sort_unstable();
        alive
    }
}
