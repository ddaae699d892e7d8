//! Bounded announcement queue.
//!
//! Producers never wait: a full queue rejects the new announcement and logs
//! it. Workers share one receiver and run broadcasts one at a time each.

use crate::notify::fanout::FanoutEngine;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// A title/body pair to broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    /// Notification title.
    pub title: String,
    /// Notification body.
    pub body: String,
}

impl Announcement {
    /// Build an announcement.
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Cheap, cloneable handle for enqueueing announcements.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::Sender<Announcement>,
}

impl Notifier {
    /// Create a notifier and the receiving end of its queue.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Announcement>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Enqueue without waiting. Returns false if the announcement was dropped.
    pub fn notify(&self, announcement: Announcement) -> bool {
        match self.tx.try_send(announcement) {
            Ok(()) => true,
            Err(TrySendError::Full(dropped)) => {
                tracing::warn!(title = %dropped.title, "notification queue full; announcement dropped");
                false
            }
            Err(TrySendError::Closed(dropped)) => {
                tracing::warn!(title = %dropped.title, "notification workers stopped; announcement dropped");
                false
            }
        }
    }
}

/// Handles of running fan-out workers.
#[derive(Debug)]
pub struct NotifyWorkers {
    handles: Vec<JoinHandle<()>>,
}

impl NotifyWorkers {
    /// Wait for every worker to exit. Workers exit once all notifiers drop
    /// and the queue is drained.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "notify worker panicked");
            }
        }
    }
}

/// Start `workers` tasks draining a queue of `capacity` into `engine`.
pub fn spawn_workers(
    engine: Arc<FanoutEngine>,
    capacity: usize,
    workers: usize,
) -> (Notifier, NotifyWorkers) {
    let (notifier, rx) = Notifier::channel(capacity);
    let rx = Arc::new(Mutex::new(rx));

    let handles = (0..workers)
        .map(|worker| {
            let rx = Arc::clone(&rx);
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                loop {
                    let next = rx.lock().await.recv().await;
                    let Some(announcement) = next else {
                        break;
                    };
                    tracing::debug!(worker, title = %announcement.title, "broadcast starting");
                    engine
                        .broadcast(&announcement.title, &announcement.body)
                        .await;
                }
                tracing::debug!(worker, "notify worker stopped");
            })
        })
        .collect();

    (notifier, NotifyWorkers { handles })
}
