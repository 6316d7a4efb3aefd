// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic entry points
//!
//! Every job is idempotent. Overlapping runs of the same job only repeat
//! work that the store's compare-and-update checks turn into no-ops.

use crate::dispatch::Dispatcher;
use crate::error::JobError;
use crate::ledger::{Ledger, OutageReport, Retention, SweepReport};
use crate::tasks::{ReconcileReport, RunDueReport, TaskConfig, TaskRunner};
use crate::templates::TemplateService;
use fw_adapters::Transport;
use fw_core::{Clock, Fleet, IdGen, RebuildReport};
use fw_storage::Store;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::Instrument;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Job {
    RunDueTasks,
    ReleaseStaleLocks,
    ReconcileOrphans,
    UnsnoozeAlerts,
    /// Prune resolved alerts and completed actions; the day count overrides
    /// the alert retention window
    PruneResolved {
        older_than_days: Option<u32>,
    },
    CacheAlertTemplates,
    AgentOutages,
}

impl Job {
    pub fn name(&self) -> &'static str {
        match self {
            Job::RunDueTasks => "run_due_tasks",
            Job::ReleaseStaleLocks => "release_stale_locks",
            Job::ReconcileOrphans => "reconcile_orphans",
            Job::UnsnoozeAlerts => "unsnooze_alerts",
            Job::PruneResolved { .. } => "prune_resolved",
            Job::CacheAlertTemplates => "cache_alert_templates",
            Job::AgentOutages => "agent_outages",
        }
    }
}

/// Counts returned by jobs that report them
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "report", rename_all = "snake_case")]
pub enum Report {
    RunDue(RunDueReport),
    Sweep(SweepReport),
    Reconcile(ReconcileReport),
    Rebuild(RebuildReport),
    Outage(OutageReport),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobOutcome {
    /// Success token
    Ok,
    Report(Report),
}

impl JobOutcome {
    /// A sweep that touched nothing and hit no failures is just `Ok`
    pub fn sweep(report: SweepReport) -> Self {
        if report == SweepReport::default() {
            JobOutcome::Ok
        } else {
            JobOutcome::Report(Report::Sweep(report))
        }
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobOutcome::Ok => f.write_str("ok"),
            JobOutcome::Report(report) => match serde_json::to_string(report) {
                Ok(json) => f.write_str(&json),
                Err(_) => write!(f, "{report:?}"),
            },
        }
    }
}

/// Runs jobs against a fleet snapshot
pub struct Jobs<T, C, I> {
    tasks: TaskRunner<T, C>,
    ledger: Ledger<C, I>,
    templates: TemplateService,
    retention: Retention,
}

impl<T: Transport, C: Clock, I: IdGen> Jobs<T, C, I> {
    pub fn new(
        store: Store,
        dispatcher: Dispatcher<T>,
        clock: C,
        ids: I,
        config: TaskConfig,
        retention: Retention,
    ) -> Self {
        Self {
            tasks: TaskRunner::new(store.clone(), dispatcher, clock.clone(), config),
            ledger: Ledger::new(store, clock, ids),
            templates: TemplateService::new(),
            retention,
        }
    }

    pub fn tasks(&self) -> &TaskRunner<T, C> {
        &self.tasks
    }

    pub fn ledger(&self) -> &Ledger<C, I> {
        &self.ledger
    }

    pub fn templates(&self) -> &TemplateService {
        &self.templates
    }

    pub async fn run(&self, job: &Job, fleet: &Fleet) -> Result<JobOutcome, JobError> {
        let span = tracing::info_span!("job", job = job.name());
        async {
            let start = std::time::Instant::now();
            let result = self.run_inner(job, fleet).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(outcome) => tracing::info!(elapsed_ms, %outcome, "job finished"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "job failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_inner(&self, job: &Job, fleet: &Fleet) -> Result<JobOutcome, JobError> {
        let task_err = |source| JobError::Task {
            job: job.name(),
            source,
        };
        let outcome = match job {
            Job::RunDueTasks => {
                let report = self.tasks.run_due(fleet).await.map_err(task_err)?;
                JobOutcome::Report(Report::RunDue(report))
            }
            Job::ReleaseStaleLocks => JobOutcome::sweep(self.tasks.release_stale()),
            Job::ReconcileOrphans => {
                let report = self.tasks.reconcile_orphans(fleet).await.map_err(task_err)?;
                JobOutcome::Report(Report::Reconcile(report))
            }
            Job::UnsnoozeAlerts => JobOutcome::sweep(self.ledger.unsnooze_expired()),
            Job::PruneResolved { older_than_days } => {
                let mut retention = self.retention.clone();
                if let Some(days) = older_than_days {
                    retention.resolved_alerts = Duration::from_secs(u64::from(*days) * 24 * 3600);
                }
                JobOutcome::sweep(self.ledger.prune(&retention))
            }
            Job::CacheAlertTemplates => {
                JobOutcome::Report(Report::Rebuild(self.templates.rebuild(fleet).await))
            }
            Job::AgentOutages => {
                let report = self.ledger.outage_sweep(fleet, &self.templates).await;
                JobOutcome::Report(Report::Outage(report))
            }
        };
        Ok(outcome)
    }
}

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod tests;
