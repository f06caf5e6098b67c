//! Bounded priority job queue that feeds the dispatcher's `main_function`.
//!
//! Jobs are ordered by an *effective* priority: `ReadAll`/`WriteAll` jobs
//! always sort to the front (priority 0/1); a single-block job's effective
//! priority is its raw configured priority, except an `immediate` job with
//! `priority > 2` is boosted to `priority - 2`. Ties break FIFO on
//! submission order.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::block::BlockId;
use crate::error::{Error, Result};

/// Upper bound on simultaneously queued jobs.
pub const MAX_QUEUE_DEPTH: usize = 32;

/// Default per-job timeout before the dispatcher retries or drops it.
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_millis(500);

/// Default retry budget before a timed-out job is dropped with
/// `Error::Timeout`.
pub const DEFAULT_MAX_RETRIES: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    ReadBlock,
    WriteBlock,
    ReadAll,
    WriteAll,
}

/// Compute the effective priority used for queue ordering: lower sorts
/// first. `ReadAll`/`WriteAll` always win; a single-block job keeps its raw
/// configured priority, except an `immediate` job with `priority > 2` is
/// boosted by subtracting 2.
pub fn effective_priority(kind: JobKind, configured_priority: u8, immediate: bool) -> u8 {
    match kind {
        JobKind::ReadAll => 0,
        JobKind::WriteAll => 1,
        JobKind::ReadBlock | JobKind::WriteBlock => {
            if immediate && configured_priority > 2 {
                configured_priority - 2
            } else {
                configured_priority
            }
        }
    }
}

/// A queued unit of work.
#[derive(Debug, Clone)]
pub struct Job {
    pub kind: JobKind,
    pub block_id: Option<BlockId>,
    pub data: Option<Vec<u8>>,
    pub priority: u8,
    pub submitted_at: Instant,
    pub attempts: u8,
    pub timeout: Duration,
}

impl Job {
    pub fn new(kind: JobKind, block_id: Option<BlockId>, data: Option<Vec<u8>>, priority: u8) -> Self {
        Self {
            kind,
            block_id,
            data,
            priority,
            submitted_at: Instant::now(),
            attempts: 0,
            timeout: DEFAULT_JOB_TIMEOUT,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.submitted_at) > self.timeout
    }
}

/// Bookkeeping the dispatcher exposes through `get_diagnostics`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueDiagnostics {
    pub enqueued: u64,
    pub processed: u64,
    pub retried: u64,
    pub dropped: u64,
    pub rejected_full: u64,
}

/// The bounded, priority-ordered job queue.
#[derive(Default)]
pub struct JobQueue {
    jobs: VecDeque<Job>,
    diagnostics: QueueDiagnostics,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn diagnostics(&self) -> QueueDiagnostics {
        self.diagnostics
    }

    /// Insert `job` in priority order, FIFO among equal priorities.
    pub fn enqueue(&mut self, job: Job) -> Result<()> {
        if self.jobs.len() >= MAX_QUEUE_DEPTH {
            self.diagnostics.rejected_full += 1;
            tracing::warn!(kind = ?job.kind, "job queue full, rejecting submission");
            return Err(Error::QueueFull);
        }

        let position = self
            .jobs
            .iter()
            .position(|queued| queued.priority > job.priority)
            .unwrap_or(self.jobs.len());
        self.jobs.insert(position, job);
        self.diagnostics.enqueued += 1;
        Ok(())
    }

    /// Pop the next job to service, dropping any jobs whose timeout expired
    /// and has no retry budget left, and re-enqueuing (at the back of their
    /// priority band) those that still have retries remaining.
    pub fn dequeue(&mut self, now: Instant, max_retries: u8) -> Option<Job> {
        while let Some(front) = self.jobs.front() {
            if !front.is_expired(now) {
                break;
            }
            let mut job = self.jobs.pop_front().unwrap();
            if job.attempts >= max_retries {
                self.diagnostics.dropped += 1;
                tracing::error!(kind = ?job.kind, block_id = ?job.block_id, "job dropped after exhausting retries");
                continue;
            }
            job.attempts += 1;
            job.submitted_at = now;
            self.diagnostics.retried += 1;
            tracing::debug!(kind = ?job.kind, attempt = job.attempts, "retrying timed-out job");
            let position = self
                .jobs
                .iter()
                .position(|queued| queued.priority > job.priority)
                .unwrap_or(self.jobs.len());
            self.jobs.insert(position, job);
        }

        let job = self.jobs.pop_front()?;
        self.diagnostics.processed += 1;
        Some(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn job(kind: JobKind, priority: u8) -> Job {
        Job::new(kind, Some(1), None, priority)
    }

    #[test]
    fn read_all_and_write_all_always_sort_first() {
        assert_eq!(effective_priority(JobKind::ReadAll, 9, false), 0);
        assert_eq!(effective_priority(JobKind::WriteAll, 9, false), 1);
    }

    #[test]
    fn single_block_priority_is_unclamped() {
        assert_eq!(effective_priority(JobKind::WriteBlock, 9, false), 9);
        assert_eq!(effective_priority(JobKind::WriteBlock, 1, false), 1);
    }

    #[test]
    fn immediate_jobs_are_boosted_by_two_above_the_floor() {
        assert_eq!(effective_priority(JobKind::WriteBlock, 9, true), 7);
        assert_eq!(effective_priority(JobKind::WriteBlock, 2, true), 2);
        assert_eq!(effective_priority(JobKind::WriteBlock, 0, true), 0);
    }

    #[test]
    fn dequeue_respects_priority_then_fifo() {
        let mut queue = JobQueue::new();
        queue.enqueue(job(JobKind::WriteBlock, 5)).unwrap();
        queue.enqueue(job(JobKind::WriteBlock, 1)).unwrap();
        queue.enqueue(job(JobKind::WriteBlock, 5)).unwrap();

        let now = Instant::now();
        let first = queue.dequeue(now, 2).unwrap();
        assert_eq!(first.priority, 1);
        let second = queue.dequeue(now, 2).unwrap();
        assert_eq!(second.priority, 5);
    }

    #[test]
    fn queue_rejects_past_capacity() {
        let mut queue = JobQueue::new();
        for _ in 0..MAX_QUEUE_DEPTH {
            queue.enqueue(job(JobKind::WriteBlock, 5)).unwrap();
        }
        assert_eq!(queue.enqueue(job(JobKind::WriteBlock, 5)), Err(Error::QueueFull));
    }

    #[test]
    fn expired_job_is_retried_then_dropped() {
        let mut queue = JobQueue::new();
        let mut stale = job(JobKind::WriteBlock, 5);
        stale.timeout = Duration::from_millis(0);
        queue.enqueue(stale).unwrap();

        let later = Instant::now() + Duration::from_millis(5);
        let retried = queue.dequeue(later, 1).unwrap();
        assert_eq!(retried.attempts, 1);
        assert_eq!(queue.diagnostics().retried, 1);

        queue.enqueue(retried).unwrap();
        let much_later = later + Duration::from_millis(5);
        assert!(queue.dequeue(much_later, 1).is_none());
        assert_eq!(queue.diagnostics().dropped, 1);
    }
}
