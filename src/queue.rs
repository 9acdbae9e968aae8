//! At-least-once job queue for thumbnail work.
//!
//! Jobs are persisted in redb and handed out under a lease. A worker that
//! dies mid-job simply lets its lease run out and the job is delivered again,
//! so consumers must be idempotent.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::Notify;

use crate::storage::models::Job;
use crate::storage::{Database, DatabaseError};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue storage error: {0}")]
    Storage(#[from] DatabaseError),
}

/// A job handed to a worker, together with what the queue needs to settle it.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub seq: u64,
    pub job: Job,
    /// 1 on first delivery, incremented on every redelivery.
    pub attempt: u32,
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, job: Job) -> Result<(), QueueError>;

    /// Wait until a job is available and lease it.
    async fn dequeue(&self) -> Result<Delivery, QueueError>;

    /// Settle a delivery with the outcome the worker reached.
    async fn complete(
        &self,
        delivery: &Delivery,
        outcome: &crate::Result<()>,
    ) -> Result<(), QueueError>;
}

/// redb-backed queue with visibility timeouts and bounded redelivery
pub struct DurableQueue {
    db: Database,
    notify: Notify,
    visibility_timeout: chrono::Duration,
    max_attempts: u32,
    poll_interval: Duration,
}

impl DurableQueue {
    pub fn new(db: Database, visibility_timeout: Duration, max_attempts: u32) -> Self {
        Self {
            db,
            notify: Notify::new(),
            visibility_timeout: chrono::Duration::from_std(visibility_timeout)
                .unwrap_or(chrono::Duration::MAX),
            max_attempts: max_attempts.max(1),
            poll_interval: Duration::from_secs(1),
        }
    }

    /// Override how often an idle `dequeue` rescans for expired leases.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Lease the next visible job without waiting.
    pub fn try_dequeue(&self) -> Result<Option<Delivery>, QueueError> {
        let now = Utc::now();
        let lease_until = now
            .checked_add_signed(self.visibility_timeout)
            .unwrap_or(chrono::DateTime::<Utc>::MAX_UTC);
        let leased = self.db.lease_next_job(now, lease_until)?;
        Ok(leased.map(|(seq, entry)| Delivery {
            seq,
            job: entry.job,
            attempt: entry.attempts,
        }))
    }
}

#[async_trait]
impl JobQueue for DurableQueue {
    async fn enqueue(&self, job: Job) -> Result<(), QueueError> {
        let seq = self.db.push_job(&job)?;
        tracing::debug!(seq, file_id = ?job.file_id, "Enqueued job");
        self.notify.notify_one();
        Ok(())
    }

    async fn dequeue(&self) -> Result<Delivery, QueueError> {
        loop {
            if let Some(delivery) = self.try_dequeue()? {
                return Ok(delivery);
            }
            // Expired leases never trigger a notification, hence the timer.
            tokio::select! {
                _ = self.notify.notified() => {}
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    async fn complete(
        &self,
        delivery: &Delivery,
        outcome: &crate::Result<()>,
    ) -> Result<(), QueueError> {
        let settled = match outcome {
            Ok(()) => self.db.remove_job(delivery.seq, delivery.attempt)?,
            Err(e) if e.is_rejection() => self.db.remove_job(delivery.seq, delivery.attempt)?,
            Err(e) if delivery.attempt >= self.max_attempts => {
                tracing::error!(
                    seq = delivery.seq,
                    file_id = ?delivery.job.file_id,
                    attempt = delivery.attempt,
                    error = %e,
                    "Job exhausted its attempts, dropping"
                );
                self.db.remove_job(delivery.seq, delivery.attempt)?
            }
            Err(_) => {
                let released = self.db.release_job(delivery.seq, delivery.attempt)?;
                if released {
                    self.notify.notify_one();
                }
                released
            }
        };

        if !settled {
            // The lease ran out and a later delivery owns the job now.
            tracing::debug!(
                seq = delivery.seq,
                attempt = delivery.attempt,
                "Ignoring settlement of a stale delivery"
            );
        }
        Ok(())
    }
}
