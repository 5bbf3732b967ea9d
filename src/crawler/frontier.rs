//! Bounded FIFO of pending crawl tasks
//!
//! Producers never wait: `try_enqueue` on a full frontier hands the task
//! back and the caller drops it. Consumers wait in `dequeue` until a task
//! arrives, the frontier is closed and drained, or the run is cancelled.
//!
//! The frontier also counts tasks that have been handed out but not yet
//! finished. When the queue is empty and nothing is in flight, no worker can
//! produce more work, so the frontier closes itself.

use crate::url::CanonicalUrl;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A canonical URL admitted to the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    url: CanonicalUrl,
}

impl CrawlTask {
    pub fn new(url: CanonicalUrl) -> Self {
        Self { url }
    }

    pub fn url(&self) -> &CanonicalUrl {
        &self.url
    }
}

/// Errors that can emerge while queueing tasks into the frontier.
#[derive(Debug, Error)]
pub enum FrontierError {
    /// The queue is at capacity; the task is returned to the caller.
    #[error("frontier is full")]
    QueueFull(CrawlTask),

    /// The frontier no longer accepts work.
    #[error("frontier is closed")]
    Closed(CrawlTask),
}

impl FrontierError {
    pub fn into_task(self) -> CrawlTask {
        match self {
            Self::QueueFull(task) | Self::Closed(task) => task,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    queue: VecDeque<CrawlTask>,
    in_flight: usize,
    closed: bool,
}

pub struct Frontier {
    state: Mutex<State>,
    capacity: usize,
    notify: Notify,
}

impl Frontier {
    /// Constructs an empty frontier holding at most `capacity` tasks.
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(State {
                queue: VecDeque::with_capacity(capacity.min(1024)),
                ..State::default()
            }),
            capacity,
            notify: Notify::new(),
        }
    }

    // Every critical section leaves State consistent, so a poisoned lock
    // still holds valid data.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of tasks waiting in the queue.
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    /// Number of tasks handed out and not yet marked done.
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Appends a task without waiting.
    pub fn try_enqueue(&self, task: CrawlTask) -> Result<(), FrontierError> {
        {
            let mut state = self.lock();
            if state.closed {
                return Err(FrontierError::Closed(task));
            }
            if state.queue.len() >= self.capacity {
                return Err(FrontierError::QueueFull(task));
            }
            state.queue.push_back(task);
        }

        self.notify.notify_one();
        Ok(())
    }

    /// Takes the oldest task, waiting for one if the queue is empty.
    ///
    /// Returns `None` once the frontier is closed and drained, or as soon
    /// as `cancel` fires. Every task returned must be finished with
    /// [`Frontier::task_done`].
    pub async fn dequeue(&self, cancel: &CancellationToken) -> Option<CrawlTask> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking state so a concurrent enqueue or
            // close cannot slip between the check and the wait.
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if let Some(task) = state.queue.pop_front() {
                    state.in_flight += 1;
                    return Some(task);
                }
                if state.closed {
                    return None;
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                _ = &mut notified => {}
            }
        }
    }

    /// Marks a dequeued task as finished.
    ///
    /// Closes the frontier when this was the last task in flight and the
    /// queue is empty.
    pub fn task_done(&self) {
        let drained = {
            let mut state = self.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
            Self::close_when_idle(&mut state)
        };

        if drained {
            debug!("Frontier drained, closing");
            self.notify.notify_waiters();
        }
    }

    /// Closes the frontier if it holds no work and nothing is in flight.
    ///
    /// Returns true if this call closed it.
    pub fn close_if_idle(&self) -> bool {
        let closed = Self::close_when_idle(&mut self.lock());
        if closed {
            self.notify.notify_waiters();
        }
        closed
    }

    fn close_when_idle(state: &mut State) -> bool {
        if !state.closed && state.in_flight == 0 && state.queue.is_empty() {
            state.closed = true;
            return true;
        }
        false
    }

    /// Stops accepting tasks and wakes every waiting consumer.
    ///
    /// Tasks already queued can still be dequeued.
    pub fn close(&self) {
        self.lock().closed = true;
        self.notify.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::{normalize, Scope};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;
    use url::Url;

    fn task(path: &str) -> CrawlTask {
        let scope = Scope::new(vec!["example.org".to_string()], vec![], true);
        let base = Url::parse("https://example.org/").unwrap();
        CrawlTask::new(normalize(path, &base, &scope).unwrap())
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let frontier = Frontier::new(10);
        let cancel = CancellationToken::new();

        frontier.try_enqueue(task("/a")).unwrap();
        frontier.try_enqueue(task("/b")).unwrap();

        assert_eq!(frontier.dequeue(&cancel).await.unwrap(), task("/a"));
        assert_eq!(frontier.dequeue(&cancel).await.unwrap(), task("/b"));
        assert_eq!(frontier.in_flight(), 2);
    }

    #[test]
    fn test_full_frontier_drops_without_blocking() {
        let frontier = Frontier::new(2);
        frontier.try_enqueue(task("/a")).unwrap();
        frontier.try_enqueue(task("/b")).unwrap();

        match frontier.try_enqueue(task("/c")) {
            Err(FrontierError::QueueFull(returned)) => assert_eq!(returned, task("/c")),
            other => panic!("expected QueueFull, got {:?}", other),
        }
        assert_eq!(frontier.len(), 2);
        assert_eq!(frontier.capacity(), 2);
    }

    #[test]
    fn test_closed_frontier_rejects() {
        let frontier = Frontier::new(2);
        frontier.close();

        let err = frontier.try_enqueue(task("/a")).unwrap_err();
        assert!(matches!(err, FrontierError::Closed(_)));
        assert_eq!(err.into_task(), task("/a"));
    }

    #[tokio::test]
    async fn test_dequeue_waits_for_enqueue() {
        let frontier = Arc::new(Frontier::new(4));
        let cancel = CancellationToken::new();

        let consumer = {
            let frontier = Arc::clone(&frontier);
            let cancel = cancel.clone();
            tokio::spawn(async move { frontier.dequeue(&cancel).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!consumer.is_finished());

        frontier.try_enqueue(task("/late")).unwrap();
        let got = timeout(Duration::from_secs(1), consumer).await.unwrap().unwrap();
        assert_eq!(got, Some(task("/late")));
    }

    #[tokio::test]
    async fn test_close_unblocks_all_waiters() {
        let frontier = Arc::new(Frontier::new(4));
        let cancel = CancellationToken::new();

        let mut consumers = Vec::new();
        for _ in 0..4 {
            let frontier = Arc::clone(&frontier);
            let cancel = cancel.clone();
            consumers.push(tokio::spawn(async move { frontier.dequeue(&cancel).await }));
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
        frontier.close();

        for consumer in consumers {
            let got = timeout(Duration::from_secs(1), consumer).await.unwrap().unwrap();
            assert_eq!(got, None);
        }
    }

    #[tokio::test]
    async fn test_closed_frontier_still_drains() {
        let frontier = Frontier::new(4);
        let cancel = CancellationToken::new();

        frontier.try_enqueue(task("/a")).unwrap();
        frontier.close();

        assert_eq!(frontier.dequeue(&cancel).await, Some(task("/a")));
        assert_eq!(frontier.dequeue(&cancel).await, None);
    }

    #[tokio::test]
    async fn test_cancel_unblocks_dequeue() {
        let frontier = Arc::new(Frontier::new(4));
        let cancel = CancellationToken::new();

        let consumer = {
            let frontier = Arc::clone(&frontier);
            let cancel = cancel.clone();
            tokio::spawn(async move { frontier.dequeue(&cancel).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();

        let got = timeout(Duration::from_secs(1), consumer).await.unwrap().unwrap();
        assert_eq!(got, None);
        assert!(!frontier.is_closed());
    }

    #[tokio::test]
    async fn test_closes_when_last_task_finishes() {
        let frontier = Frontier::new(4);
        let cancel = CancellationToken::new();

        frontier.try_enqueue(task("/a")).unwrap();
        let _a = frontier.dequeue(&cancel).await.unwrap();

        // Work discovered while /a is in flight keeps the frontier open
        frontier.try_enqueue(task("/b")).unwrap();
        frontier.task_done();
        assert!(!frontier.is_closed());

        let _b = frontier.dequeue(&cancel).await.unwrap();
        frontier.task_done();
        assert!(frontier.is_closed());
        assert_eq!(frontier.in_flight(), 0);
        assert_eq!(frontier.dequeue(&cancel).await, None);
    }

    #[tokio::test]
    async fn test_drain_wakes_idle_workers() {
        let frontier = Arc::new(Frontier::new(4));
        let cancel = CancellationToken::new();

        frontier.try_enqueue(task("/only")).unwrap();
        let _only = frontier.dequeue(&cancel).await.unwrap();

        let idle = {
            let frontier = Arc::clone(&frontier);
            let cancel = cancel.clone();
            tokio::spawn(async move { frontier.dequeue(&cancel).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        frontier.task_done();

        let got = timeout(Duration::from_secs(1), idle).await.unwrap().unwrap();
        assert_eq!(got, None);
    }

    #[test]
    fn test_close_if_idle() {
        let empty = Frontier::new(4);
        assert!(empty.close_if_idle());
        assert!(empty.is_closed());
        assert!(!empty.close_if_idle());

        let seeded = Frontier::new(4);
        seeded.try_enqueue(task("/a")).unwrap();
        assert!(!seeded.close_if_idle());
        assert!(!seeded.is_closed());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_producers_respect_capacity() {
        let frontier = Arc::new(Frontier::new(50));
        let mut producers = Vec::new();

        for p in 0..8 {
            let frontier = Arc::clone(&frontier);
            producers.push(tokio::spawn(async move {
                let mut accepted = 0;
                for i in 0..20 {
                    if frontier.try_enqueue(task(&format!("/{}/{}", p, i))).is_ok() {
                        accepted += 1;
                    }
                }
                accepted
            }));
        }

        let mut accepted = 0;
        for producer in producers {
            accepted += producer.await.unwrap();
        }

        assert_eq!(accepted, 50);
        assert_eq!(frontier.len(), 50);
    }
}
