//! # TaskQueue: shared FIFO of task ids for one suite.
//!
//! One queue per suite; the feeder pushes every task id in discovery order,
//! then one [`QueueItem::Stop`] per worker. Workers pop, run, and `ack`.
//!
//! ```text
//! feeder ──push──► [ t1 t2 ... tK  Stop Stop ... Stop ] ──pop──► worker 1..N
//!                                                        ◄──ack──
//! join() resolves once every pushed item was acked
//! ```
//!
//! ## Rules
//! - `pop` and `ack` are atomic with respect to concurrent callers.
//! - Each popped item is acked exactly once; an extra `ack` is
//!   [`QueueError::AckWithoutPop`].
//! - After [`TaskQueue::close`], `push` and waiting `pop`s fail with [`QueueError::Closed`].

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio::sync::{Semaphore, watch};

use crate::error::QueueError;

/// Element of a [`TaskQueue`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueueItem {
    /// Run the task with this id.
    Task(String),
    /// No more work: the worker that pops this stops.
    Stop,
}

/// Thread-safe FIFO with completion tracking.
#[derive(Debug)]
pub struct TaskQueue {
    items: Mutex<VecDeque<QueueItem>>,
    available: Semaphore,
    in_flight: AtomicUsize,
    unfinished: watch::Sender<usize>,
}

impl TaskQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        let (unfinished, _) = watch::channel(0);
        Self {
            items: Mutex::new(VecDeque::new()),
            available: Semaphore::new(0),
            in_flight: AtomicUsize::new(0),
            unfinished,
        }
    }

    /// Appends an item.
    pub fn push(&self, item: QueueItem) -> Result<(), QueueError> {
        if self.available.is_closed() {
            return Err(QueueError::Closed);
        }
        self.unfinished.send_modify(|n| *n += 1);
        self.lock().push_back(item);
        self.available.add_permits(1);
        Ok(())
    }

    /// Waits for an item and removes it from the head.
    ///
    /// Cancel-safe: dropping the future before it resolves loses no item.
    pub async fn pop(&self) -> Result<QueueItem, QueueError> {
        let permit = self
            .available
            .acquire()
            .await
            .map_err(|_| QueueError::Closed)?;
        permit.forget();
        let item = self.lock().pop_front().ok_or(QueueError::Closed)?;
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        Ok(item)
    }

    /// Marks one popped item as processed.
    pub fn ack(&self) -> Result<(), QueueError> {
        self.in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .map_err(|_| QueueError::AckWithoutPop)?;
        self.unfinished.send_modify(|n| *n = n.saturating_sub(1));
        Ok(())
    }

    /// Resolves once every pushed item has been acknowledged.
    pub async fn join(&self) {
        let mut rx = self.unfinished.subscribe();
        // the sender lives in `self`, so the channel cannot close while we wait
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Removes and acknowledges everything still queued.
    ///
    /// Returns the task ids that were never popped. Used once no worker is
    /// left to consume the queue.
    pub fn drain_remaining(&self) -> Vec<String> {
        let mut skipped = Vec::new();
        while let Ok(permit) = self.available.try_acquire() {
            permit.forget();
            let Some(item) = self.lock().pop_front() else {
                break;
            };
            self.unfinished.send_modify(|n| *n = n.saturating_sub(1));
            if let QueueItem::Task(id) = item {
                skipped.push(id);
            }
        }
        skipped
    }

    /// Wakes every waiting consumer with [`QueueError::Closed`] and rejects further pushes.
    pub fn close(&self) {
        self.available.close();
    }

    /// Number of items pushed but not yet acknowledged.
    pub fn unfinished(&self) -> usize {
        *self.unfinished.borrow()
    }

    /// Number of items waiting to be popped.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True if nothing is waiting to be popped.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<QueueItem>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn task(id: &str) -> QueueItem {
        QueueItem::Task(id.to_string())
    }

    #[tokio::test]
    async fn pops_in_push_order() {
        let q = TaskQueue::new();
        q.push(task("a")).expect("push");
        q.push(task("b")).expect("push");
        q.push(QueueItem::Stop).expect("push");

        assert_eq!(q.pop().await, Ok(task("a")));
        assert_eq!(q.pop().await, Ok(task("b")));
        assert_eq!(q.pop().await, Ok(QueueItem::Stop));
        assert!(q.is_empty());
        assert_eq!(q.unfinished(), 3);
    }

    #[tokio::test]
    async fn ack_without_pop_is_rejected() {
        let q = TaskQueue::new();
        q.push(task("a")).expect("push");
        assert_eq!(q.ack(), Err(QueueError::AckWithoutPop));

        q.pop().await.expect("pop");
        assert_eq!(q.ack(), Ok(()));
        assert_eq!(q.ack(), Err(QueueError::AckWithoutPop));
        assert_eq!(q.unfinished(), 0);
    }

    #[tokio::test]
    async fn join_waits_for_every_ack() {
        let q = Arc::new(TaskQueue::new());
        q.push(task("a")).expect("push");
        q.push(task("b")).expect("push");

        let waiter = {
            let q = q.clone();
            tokio::spawn(async move { q.join().await })
        };
        q.pop().await.expect("pop");
        q.ack().expect("ack");
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        q.pop().await.expect("pop");
        q.ack().expect("ack");
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("join resolved")
            .expect("join task");
    }

    #[tokio::test]
    async fn pop_waits_for_push() {
        let q = Arc::new(TaskQueue::new());
        let consumer = {
            let q = q.clone();
            tokio::spawn(async move { q.pop().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        q.push(task("late")).expect("push");
        assert_eq!(consumer.await.expect("consumer"), Ok(task("late")));
    }

    #[tokio::test]
    async fn close_wakes_waiters_and_rejects_push() {
        let q = Arc::new(TaskQueue::new());
        let consumer = {
            let q = q.clone();
            tokio::spawn(async move { q.pop().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        q.close();
        assert_eq!(consumer.await.expect("consumer"), Err(QueueError::Closed));
        assert_eq!(q.push(task("x")), Err(QueueError::Closed));
    }

    #[tokio::test]
    async fn drain_remaining_reports_tasks_and_settles_join() {
        let q = TaskQueue::new();
        for id in ["a", "b", "c"] {
            q.push(task(id)).expect("push");
        }
        q.push(QueueItem::Stop).expect("push");

        q.pop().await.expect("pop");
        q.ack().expect("ack");

        assert_eq!(q.drain_remaining(), vec!["b".to_string(), "c".to_string()]);
        assert_eq!(q.unfinished(), 0);
        tokio::time::timeout(Duration::from_secs(1), q.join())
            .await
            .expect("join resolved");
    }

    #[tokio::test]
    async fn concurrent_consumers_each_item_once() {
        let q = Arc::new(TaskQueue::new());
        let workers = 4;
        for i in 0..100 {
            q.push(QueueItem::Task(format!("t{i}"))).expect("push");
        }
        for _ in 0..workers {
            q.push(QueueItem::Stop).expect("push");
        }

        let mut handles = Vec::new();
        for _ in 0..workers {
            let q = q.clone();
            handles.push(tokio::spawn(async move {
                let mut seen = Vec::new();
                loop {
                    let item = q.pop().await.expect("pop");
                    q.ack().expect("ack");
                    match item {
                        QueueItem::Task(id) => seen.push(id),
                        QueueItem::Stop => return seen,
                    }
                }
            }));
        }

        let mut all = Vec::new();
        for h in handles {
            all.extend(h.await.expect("worker"));
        }
        q.join().await;
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 100);
    }
}
