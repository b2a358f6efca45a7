//! Fan-out of store notifications to independent subscribers

use crate::observability::AgentMetrics;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Subscribers of one notification kind
///
/// Publishing never blocks: a subscriber whose channel is full misses that
/// notification. Registrations go away when their token is cancelled or
/// their receiver is dropped.
pub(crate) struct Subscribers<T> {
    kind: &'static str,
    next_id: Arc<AtomicU64>,
    entries: Arc<DashMap<u64, Entry<T>>>,
    metrics: AgentMetrics,
}

struct Entry<T> {
    tx: mpsc::Sender<T>,
    cancel: CancellationToken,
}

impl<T> Clone for Subscribers<T> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            next_id: Arc::clone(&self.next_id),
            entries: Arc::clone(&self.entries),
            metrics: self.metrics.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> Subscribers<T> {
    pub fn new(kind: &'static str, metrics: AgentMetrics) -> Self {
        Self {
            kind,
            next_id: Arc::new(AtomicU64::new(0)),
            entries: Arc::new(DashMap::new()),
            metrics,
        }
    }

    pub fn add(&self, cancel: CancellationToken, tx: mpsc::Sender<T>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.insert(
            id,
            Entry {
                tx: tx.clone(),
                cancel: cancel.clone(),
            },
        );

        let entries = Arc::clone(&self.entries);
        let kind = self.kind;
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tx.closed() => {}
            }
            entries.remove(&id);
            debug!(kind, subscriber = id, "Subscriber removed");
        });
    }

    /// Deliver `value` to every live subscriber, returning how many got it
    pub fn publish(&self, value: &T) -> usize {
        let mut delivered = 0;
        let mut stale = Vec::new();

        for entry in self.entries.iter() {
            if entry.cancel.is_cancelled() {
                stale.push(*entry.key());
                continue;
            }
            match entry.tx.try_send(value.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    self.metrics.inc_subscriber_drops(self.kind);
                    debug!(kind = self.kind, subscriber = *entry.key(), "Subscriber lagging, notification dropped");
                }
                Err(TrySendError::Closed(_)) => stale.push(*entry.key()),
            }
        }

        for id in stale {
            self.entries.remove(&id);
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Cancel and forget every subscriber
    pub fn clear(&self) {
        for entry in self.entries.iter() {
            entry.cancel.cancel();
        }
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_publish_to_all() {
        let subs = Subscribers::new("test", AgentMetrics::new());
        let (tx1, mut rx1) = mpsc::channel(4);
        let (tx2, mut rx2) = mpsc::channel(4);
        subs.add(CancellationToken::new(), tx1);
        subs.add(CancellationToken::new(), tx2);

        assert_eq!(subs.publish(&"hello".to_string()), 2);
        assert_eq!(rx1.recv().await.unwrap(), "hello");
        assert_eq!(rx2.recv().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_slow_subscriber_does_not_block_others() {
        let subs = Subscribers::new("test", AgentMetrics::new());
        let (slow_tx, _slow_rx) = mpsc::channel(1);
        let (fast_tx, mut fast_rx) = mpsc::channel(16);
        subs.add(CancellationToken::new(), slow_tx);
        subs.add(CancellationToken::new(), fast_tx);

        for i in 0..10 {
            subs.publish(&i);
        }

        let mut got = Vec::new();
        while let Ok(v) = fast_rx.try_recv() {
            got.push(v);
        }
        assert_eq!(got, (0..10).collect::<Vec<_>>());
        // the slow one is still registered; it only missed notifications
        assert_eq!(subs.len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_removes_subscriber() {
        let subs = Subscribers::new("test", AgentMetrics::new());
        let (tx, _rx) = mpsc::channel::<u32>(4);
        let cancel = CancellationToken::new();
        subs.add(cancel.clone(), tx);
        assert_eq!(subs.len(), 1);

        cancel.cancel();
        for _ in 0..100 {
            if subs.len() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(subs.len(), 0);
        assert_eq!(subs.publish(&1), 0);
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_pruned() {
        let subs = Subscribers::new("test", AgentMetrics::new());
        let (tx, rx) = mpsc::channel::<u32>(4);
        subs.add(CancellationToken::new(), tx);
        drop(rx);

        assert_eq!(subs.publish(&7), 0);
        assert_eq!(subs.len(), 0);
    }
}
