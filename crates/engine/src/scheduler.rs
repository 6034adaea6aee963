//! Batched concurrent execution of generation jobs.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use pageforge_core::JobStatus;
use pageforge_llm::CompletionService;
use tokio::task::JoinSet;

use crate::job::{Job, JobOutcome};
use crate::state::StoreHandle;

/// Bounded retry with exponential backoff, applied uniformly around every
/// job the scheduler runs. Only transient failures are retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), base_delay }
    }

    /// One attempt, no backoff.
    #[must_use]
    pub fn single_attempt() -> Self {
        Self::new(1, Duration::ZERO)
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Backoff before the given retry (1-based): base × 2^(attempt-1).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1)).min(64)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// Runs a fixed list of jobs in consecutive groups of at most `width`.
///
/// Every job in a group runs concurrently; the next group starts only
/// once the current one has fully settled (success or error). This bounds
/// peak concurrency against the completion service without aborting
/// remaining groups when an earlier one contains failures: partial
/// success is expected, and each artifact's status carries the outcome.
#[derive(Debug, Clone)]
pub struct BatchScheduler {
    width: usize,
}

impl BatchScheduler {
    #[must_use]
    pub fn new(width: usize) -> Self {
        Self { width: width.max(1) }
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Run all jobs to settlement, returning outcomes in input order.
    pub async fn run(
        &self,
        service: Arc<dyn CompletionService>,
        store: &StoreHandle,
        policy: &RetryPolicy,
        jobs: Vec<Job>,
    ) -> Vec<JobOutcome> {
        let total = jobs.len();
        let mut outcomes: Vec<Option<JobOutcome>> = (0..total).map(|_| None).collect();
        let mut remaining: VecDeque<(usize, Job)> = jobs.into_iter().enumerate().collect();

        while !remaining.is_empty() {
            let mut group = JoinSet::new();
            for _ in 0..self.width {
                let Some((idx, job)) = remaining.pop_front() else { break };
                let service = Arc::clone(&service);
                let store = store.clone();
                let policy = policy.clone();
                group.spawn(async move {
                    let outcome = job.run(service.as_ref(), &store, &policy).await;
                    (idx, outcome)
                });
            }
            // Full-settlement barrier: the group drains completely before
            // the next one starts.
            while let Some(joined) = group.join_next().await {
                match joined {
                    Ok((idx, outcome)) => outcomes[idx] = Some(outcome),
                    Err(e) => tracing::warn!("job task failed to join: {e}"),
                }
            }
        }

        outcomes
            .into_iter()
            .map(|o| {
                o.unwrap_or(JobOutcome { status: JobStatus::Error, content: String::new() })
            })
            .collect()
    }
}
