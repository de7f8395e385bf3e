//! Bounded worker pool for one batch of link jobs
//!
//! A batch is one major-index directory (parse) or one dataset root (merge).
//! At most `workers` blocking filesystem jobs are in flight; the calling task
//! collects results as they finish and is the only one touching the summary
//! and the progress callback.

use crate::config::{ConflictPolicy, LinkMode};
use crate::dataset::Split;
use crate::error::Result;
use crate::storage::{materialize, LinkOutcome, RunSummary};
use std::path::PathBuf;
use tokio::task::JoinSet;

/// One entry to materialize
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkJob {
    pub split: Split,
    pub source: PathBuf,
    pub dest: PathBuf,
}

#[derive(Debug, Clone, Copy)]
pub struct BatchPool {
    workers: usize,
    mode: LinkMode,
    policy: ConflictPolicy,
}

impl BatchPool {
    pub fn new(workers: usize, mode: LinkMode, policy: ConflictPolicy) -> Self {
        Self {
            workers: workers.max(1),
            mode,
            policy,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run every job and return once the whole batch is done.
    ///
    /// `on_done` is called once per job, in completion order. Failed links
    /// are reported through it like any other outcome.
    pub async fn run<F>(&self, jobs: Vec<LinkJob>, mut on_done: F) -> Result<RunSummary>
    where
        F: FnMut(&LinkJob, &LinkOutcome),
    {
        let mut summary = RunSummary::default();
        let mut in_flight: JoinSet<(LinkJob, LinkOutcome)> = JoinSet::new();

        for job in jobs {
            while in_flight.len() >= self.workers {
                if let Some(joined) = in_flight.join_next().await {
                    let (job, outcome) = joined?;
                    summary.record(job.split, &outcome);
                    on_done(&job, &outcome);
                }
            }
            let (mode, policy) = (self.mode, self.policy);
            in_flight.spawn_blocking(move || {
                let outcome = materialize(&job.source, &job.dest, mode, policy);
                (job, outcome)
            });
        }

        while let Some(joined) = in_flight.join_next().await {
            let (job, outcome) = joined?;
            summary.record(job.split, &outcome);
            on_done(&job, &outcome);
        }
        Ok(summary)
    }
}
