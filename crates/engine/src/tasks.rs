// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduled task engine
//!
//! Decides which (task, agent) pairs are due, takes their run locks in the
//! store and dispatches `RunTask` commands. Also hosts the janitor passes:
//! stale-lock release and orphaned endpoint-entry cleanup.

use crate::dispatch::{Dispatcher, Replies};
use crate::error::{DispatchError, TaskError};
use crate::events;
use crate::ledger::SweepReport;
use fw_adapters::Transport;
use fw_core::{
    AgentId, AgentStatus, Clock, Command, Envelope, Fleet, RunLockConfig, RunReport, TaskId,
    SCHEDULED_NAME_PREFIX,
};
use fw_storage::{Store, StoreError};
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Duration;

/// Task engine configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskConfig {
    pub lock: RunLockConfig,
    /// Prefix of every endpoint scheduled entry this engine owns
    pub name_prefix: String,
    /// How long an interactive run may take before it is reported as timed out
    pub run_timeout: Duration,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            lock: RunLockConfig::default(),
            name_prefix: SCHEDULED_NAME_PREFIX.to_string(),
            run_timeout: Duration::from_secs(120),
        }
    }
}

impl TaskConfig {
    pub fn with_lock(mut self, lock: RunLockConfig) -> Self {
        self.lock = lock;
        self
    }

    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = timeout;
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunDueReport {
    pub dispatched: usize,
    /// Pairs already running elsewhere
    pub conflicts: usize,
    pub failed: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub agents_checked: usize,
    /// Agents that did not answer the listing request
    pub agents_skipped: usize,
    pub orphans_removed: usize,
}

pub struct TaskRunner<T, C> {
    store: Store,
    dispatcher: Dispatcher<T>,
    clock: C,
    config: TaskConfig,
}

impl<T: Transport, C: Clock> TaskRunner<T, C> {
    pub fn new(store: Store, dispatcher: Dispatcher<T>, clock: C, config: TaskConfig) -> Self {
        Self {
            store,
            dispatcher,
            clock,
            config,
        }
    }

    /// Lock and dispatch every due (task, agent) pair in one batch.
    ///
    /// If the batch cannot be delivered every lock taken here is released.
    pub async fn run_due(&self, fleet: &Fleet) -> Result<RunDueReport, TaskError> {
        let now = self.clock.now();
        let mut report = RunDueReport::default();
        let mut acquired = Vec::new();
        let mut effects = Vec::new();

        for task in fleet.tasks.values().filter(|t| t.enabled) {
            for agent in fleet.agents_for_task(task) {
                let last_run = self
                    .store
                    .task_result(&task.id, &agent.id)
                    .and_then(|r| r.last_run);
                if !task.schedule.is_due(now, last_run) {
                    continue;
                }
                match self
                    .store
                    .acquire_run(&task.id, &agent.id, &self.config.lock, &self.clock)
                {
                    Ok(fx) => {
                        acquired.push((task.id.clone(), agent.id.clone()));
                        effects.extend(fx);
                    }
                    Err(StoreError::RunLock(e)) => {
                        tracing::debug!(error = %e, "skipping locked run");
                        report.conflicts += 1;
                    }
                    Err(e) => {
                        tracing::warn!(
                            task = %task.id,
                            agent = %agent.id,
                            error = %e,
                            "lock failed"
                        );
                        report.failed += 1;
                    }
                }
            }
        }

        events::emit(&effects);
        match self.dispatcher.dispatch_effects(&effects).await {
            Ok(dispatched) => {
                report.dispatched = dispatched;
                Ok(report)
            }
            Err(e) => {
                for (task_id, agent_id) in &acquired {
                    self.release(task_id, agent_id);
                }
                Err(e.into())
            }
        }
    }

    /// Run one task on one agent now and wait for its report.
    ///
    /// The lock is released on any failure to get a report back.
    pub async fn run_now(
        &self,
        fleet: &Fleet,
        task_id: &TaskId,
        agent_id: &AgentId,
    ) -> Result<RunReport, TaskError> {
        if !fleet.tasks.contains_key(task_id) {
            return Err(TaskError::UnknownTask(task_id.clone()));
        }
        if fleet.agent(agent_id).is_none() {
            return Err(TaskError::UnknownAgent(agent_id.clone()));
        }

        let effects = self
            .store
            .acquire_run(task_id, agent_id, &self.config.lock, &self.clock)?;
        events::emit(&effects);

        let envelope =
            Envelope::new(Command::run_task(task_id.clone())).with_timeout(self.config.run_timeout);
        let report: RunReport = match self.dispatcher.request(agent_id, envelope).await {
            Ok(report) => report,
            Err(e) => {
                self.release(task_id, agent_id);
                return Err(e.into());
            }
        };

        self.complete(task_id, agent_id, report.clone())?;
        match report.retcode {
            Some(code) if code != 0 => Err(TaskError::AgentFailed {
                task_id: task_id.clone(),
                agent_id: agent_id.clone(),
                retcode: report.retcode,
                stderr: report.stderr,
            }),
            _ => Ok(report),
        }
    }

    /// Record a report from an agent. Returns false if the pair was not running.
    pub fn complete(
        &self,
        task_id: &TaskId,
        agent_id: &AgentId,
        report: RunReport,
    ) -> Result<bool, TaskError> {
        let retcode = report.retcode;
        let completed =
            self.store
                .complete_run(task_id, agent_id, report, &self.config.lock, &self.clock)?;
        if completed {
            tracing::info!(task = %task_id, agent = %agent_id, ?retcode, "run completed");
        } else {
            tracing::debug!(task = %task_id, agent = %agent_id, "ignoring report for idle run");
        }
        Ok(completed)
    }

    /// Release every Running lock older than the grace period
    pub fn release_stale(&self) -> SweepReport {
        let mut report = SweepReport::default();
        for result in self.store.running() {
            match self.store.release_stale_run(
                &result.task_id,
                &result.agent_id,
                &self.config.lock,
                &self.clock,
            ) {
                Ok(true) => {
                    tracing::warn!(
                        task = %result.task_id,
                        agent = %result.agent_id,
                        "released stale lock"
                    );
                    report.processed += 1;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(
                        task = %result.task_id,
                        agent = %result.agent_id,
                        error = %e,
                        "stale release failed"
                    );
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Remove endpoint scheduled entries that no known task owns.
    ///
    /// Only online agents are asked; entries without our prefix are never
    /// touched.
    pub async fn reconcile_orphans(&self, fleet: &Fleet) -> Result<ReconcileReport, TaskError> {
        let now = self.clock.now();
        let known: BTreeSet<&str> = fleet
            .tasks
            .values()
            .map(|t| t.scheduled_name.as_str())
            .filter(|name| !name.is_empty())
            .collect();

        let batch = fleet
            .agents
            .values()
            .filter(|a| fleet.status_of(a, now) == AgentStatus::Online)
            .map(|a| (a.id.clone(), Envelope::new(Command::ListScheduledTasks)))
            .collect();
        let replies: Replies<Vec<String>> = self.dispatcher.request_many(batch).await?;

        let mut report = ReconcileReport::default();
        let mut deletes = Vec::new();
        for (agent_id, reply) in replies {
            let names = match reply {
                Ok(names) => names,
                Err(DispatchError::Timeout) => {
                    report.agents_skipped += 1;
                    continue;
                }
                Err(e) => {
                    tracing::warn!(agent = %agent_id, error = %e, "bad schedule listing");
                    report.agents_skipped += 1;
                    continue;
                }
            };
            report.agents_checked += 1;
            for name in names {
                if name.starts_with(&self.config.name_prefix) && !known.contains(name.as_str()) {
                    tracing::info!(agent = %agent_id, name = %name, "orphaned scheduled entry");
                    let envelope = Envelope::new(Command::delete_scheduled(name));
                    deletes.push((agent_id.clone(), envelope));
                }
            }
        }

        report.orphans_removed = self.dispatcher.broadcast(deletes).await?;
        Ok(report)
    }

    fn release(&self, task_id: &TaskId, agent_id: &AgentId) {
        if let Err(e) = self
            .store
            .release_run(task_id, agent_id, &self.config.lock, &self.clock)
        {
            tracing::warn!(task = %task_id, agent = %agent_id, error = %e, "lock release failed");
        }
    }
}

#[cfg(test)]
#[path = "tasks_tests.rs"]
mod tests;
