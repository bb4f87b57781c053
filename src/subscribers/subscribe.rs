//! # Core subscriber trait
//!
//! `Subscribe` is how status output, result collectors and CI hooks plug into a
//! harness run. Each subscriber is driven by its own task, fed through a bounded
//! queue owned by the [`SubscriberSet`](crate::SubscriberSet).
//!
//! ## Contract
//! - A slow subscriber never holds up workers or its peers; when its queue is
//!   full the event is **dropped** for it alone (warn + `SubscriberOverflow`).
//! - [`Subscribe::accepts`] filters before queueing, so a status sink that only
//!   renders task outcomes does not spend queue slots on lifecycle chatter.

use crate::events::{Event, EventKind};
use async_trait::async_trait;

/// Contract for event subscribers.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single event.
    async fn on_event(&self, event: &Event);

    /// Whether events of `kind` should be queued for this subscriber at all.
    fn accepts(&self, kind: EventKind) -> bool {
        let _ = kind;
        true
    }

    /// Name used in overflow and panic reports.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Queue depth; a worker pool at full speed emits a handful of events per test.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
