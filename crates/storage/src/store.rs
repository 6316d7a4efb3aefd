// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared store with compare-and-update operations
//!
//! Every mutation reads the current record, runs the pure transition, appends
//! the resulting operation to the WAL and applies it, all under one lock.
//! Concurrent callers racing for the same record get exactly one winner.

use crate::state::MaterializedState;
use crate::wal::{Wal, WalError};
use chrono::{DateTime, Utc};
use fw_core::{
    ActionId, AgentId, Alert, AlertError, AlertId, Clock, Effect, Event, InventoryBlob,
    InventoryKind, Operation, Outcome, PendingAction, RunLockConfig, RunLockError, RunLockInput,
    RunReport, TaskId, TaskResult,
};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Wal(#[from] WalError),
    #[error(transparent)]
    RunLock(#[from] RunLockError),
    #[error(transparent)]
    Alert(#[from] AlertError),
    #[error("action not found: {0}")]
    ActionNotFound(ActionId),
    #[error("alert not found: {0}")]
    AlertNotFound(AlertId),
}

struct Inner {
    wal: Wal,
    state: MaterializedState,
}

impl Inner {
    fn commit(&mut self, op: Operation) -> Result<(), StoreError> {
        self.wal.append(&op)?;
        self.state.apply(&op);
        Ok(())
    }
}

/// Handle to the durable state; clones share one WAL
#[derive(Clone)]
pub struct Store {
    inner: Arc<Mutex<Inner>>,
}

impl Store {
    /// Replay the WAL at `path` and open it for appending
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let ops = Wal::replay(path)?;
        let state = MaterializedState::from_ops(&ops);
        let wal = Wal::open(path)?;
        tracing::debug!(path = %path.display(), ops = ops.len(), "replayed wal");
        Ok(Self {
            inner: Arc::new(Mutex::new(Inner { wal, state })),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Read from the current state
    pub fn read<R>(&self, f: impl FnOnce(&MaterializedState) -> R) -> R {
        f(&self.lock().state)
    }

    /// Number of operations in the WAL
    pub fn sequence(&self) -> u64 {
        self.lock().wal.sequence()
    }

    // -- task run locks --

    pub fn task_result(&self, task_id: &TaskId, agent_id: &AgentId) -> Option<TaskResult> {
        self.read(|s| s.task_result(task_id, agent_id).cloned())
    }

    /// Running records, for the janitor
    pub fn running(&self) -> Vec<TaskResult> {
        self.read(|s| {
            s.task_results
                .values()
                .filter(|r| r.is_running())
                .cloned()
                .collect()
        })
    }

    /// Take the run lock for (task, agent)
    pub fn acquire_run(
        &self,
        task_id: &TaskId,
        agent_id: &AgentId,
        config: &RunLockConfig,
        clock: &impl Clock,
    ) -> Result<Vec<Effect>, StoreError> {
        let mut inner = self.lock();
        let current = inner
            .state
            .task_result(task_id, agent_id)
            .cloned()
            .unwrap_or_else(|| TaskResult::new(task_id.clone(), agent_id.clone()));

        let (next, effects) = current.transition(RunLockInput::Acquire, config, clock)?;
        let at = next.locked_at.unwrap_or_else(|| clock.now());
        inner.commit(Operation::TaskLocked {
            task_id: task_id.clone(),
            agent_id: agent_id.clone(),
            at,
        })?;
        Ok(effects)
    }

    /// Record a run result. Returns false if the pair was not Running.
    pub fn complete_run(
        &self,
        task_id: &TaskId,
        agent_id: &AgentId,
        report: RunReport,
        config: &RunLockConfig,
        clock: &impl Clock,
    ) -> Result<bool, StoreError> {
        self.run_input(task_id, agent_id, RunLockInput::Complete { report }, config, clock)
    }

    /// Give back a lock taken for a run that never started
    pub fn release_run(
        &self,
        task_id: &TaskId,
        agent_id: &AgentId,
        config: &RunLockConfig,
        clock: &impl Clock,
    ) -> Result<bool, StoreError> {
        self.run_input(task_id, agent_id, RunLockInput::Release, config, clock)
    }

    /// Release the lock only if it has outlived the grace period
    pub fn release_stale_run(
        &self,
        task_id: &TaskId,
        agent_id: &AgentId,
        config: &RunLockConfig,
        clock: &impl Clock,
    ) -> Result<bool, StoreError> {
        self.run_input(task_id, agent_id, RunLockInput::ReleaseStale, config, clock)
    }

    fn run_input(
        &self,
        task_id: &TaskId,
        agent_id: &AgentId,
        input: RunLockInput,
        config: &RunLockConfig,
        clock: &impl Clock,
    ) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        let Some(current) = inner.state.task_result(task_id, agent_id).cloned() else {
            return Ok(false);
        };

        let (next, effects) = current.transition(input, config, clock)?;
        let op = effects.iter().find_map(|effect| match effect {
            Effect::Emit(Event::TaskCompleted { .. }) => Some(Operation::TaskCompleted {
                task_id: task_id.clone(),
                agent_id: agent_id.clone(),
                report: next.report.clone().unwrap_or_default(),
            }),
            Effect::Emit(Event::TaskLockReleased { .. }) => Some(Operation::TaskLockReleased {
                task_id: task_id.clone(),
                agent_id: agent_id.clone(),
                last_run: next.last_run,
            }),
            _ => None,
        });

        match op {
            Some(op) => {
                inner.commit(op)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // -- pending actions --

    pub fn action(&self, id: &ActionId) -> Option<PendingAction> {
        self.read(|s| s.actions.get(id).cloned())
    }

    pub fn create_action(&self, action: PendingAction) -> Result<Vec<Effect>, StoreError> {
        let effects = vec![Effect::Emit(Event::ActionCreated {
            id: action.id.clone(),
            agent_id: action.agent_id.clone(),
        })];
        self.lock().commit(Operation::ActionCreated { action })?;
        Ok(effects)
    }

    /// Complete a pending action. Later calls for the same id return `None`.
    pub fn complete_action(
        &self,
        id: &ActionId,
        result: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Outcome>, StoreError> {
        let mut inner = self.lock();
        let current = inner
            .state
            .actions
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::ActionNotFound(id.clone()))?;

        let Some((done, _)) = current.complete(result, now) else {
            return Ok(None);
        };
        let outcome = done.outcome.unwrap_or(Outcome::Unknown);
        inner.commit(Operation::ActionCompleted {
            id: id.clone(),
            result: result.to_string(),
            outcome,
            at: now,
        })?;
        Ok(Some(outcome))
    }

    /// Completed actions older than `retention`
    pub fn prunable_actions(&self, retention: Duration, now: DateTime<Utc>) -> Vec<ActionId> {
        self.read(|s| {
            s.actions
                .values()
                .filter(|a| a.is_prunable(retention, now))
                .map(|a| a.id.clone())
                .collect()
        })
    }

    pub fn prune_action(&self, id: &ActionId) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        if !inner.state.actions.contains_key(id) {
            return Ok(false);
        }
        inner.commit(Operation::ActionPruned { id: id.clone() })?;
        Ok(true)
    }

    // -- alerts --

    pub fn alert(&self, id: &AlertId) -> Option<Alert> {
        self.read(|s| s.alerts.get(id).cloned())
    }

    /// Record a new alert unless one of the same kind is already open for the
    /// agent, in which case the open alert's id is returned.
    pub fn raise_alert(&self, alert: Alert) -> Result<(AlertId, Vec<Effect>), StoreError> {
        let mut inner = self.lock();
        if let Some(open) = inner.state.open_alert(&alert.agent_id, alert.kind) {
            return Ok((open.id.clone(), Vec::new()));
        }
        let id = alert.id.clone();
        let effects = vec![Effect::Emit(Event::AlertRaised {
            id: id.clone(),
            agent_id: alert.agent_id.clone(),
        })];
        inner.commit(Operation::AlertRaised { alert })?;
        Ok((id, effects))
    }

    pub fn snooze_alert(
        &self,
        id: &AlertId,
        until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Effect>, StoreError> {
        let mut inner = self.lock();
        let current = Self::get_alert(&inner, id)?;
        let (_, effects) = current.snooze(until, now)?;
        inner.commit(Operation::AlertSnoozed {
            id: id.clone(),
            until,
        })?;
        Ok(effects)
    }

    /// Alerts whose snooze has run out
    pub fn expired_snoozes(&self, now: DateTime<Utc>) -> Vec<AlertId> {
        self.read(|s| {
            s.alerts
                .values()
                .filter(|a| a.expire_snooze(now).is_some())
                .map(|a| a.id.clone())
                .collect()
        })
    }

    pub fn unsnooze_alert(&self, id: &AlertId, now: DateTime<Utc>) -> Result<Vec<Effect>, StoreError> {
        let mut inner = self.lock();
        let current = Self::get_alert(&inner, id)?;
        let Some((_, effects)) = current.expire_snooze(now) else {
            return Ok(Vec::new());
        };
        inner.commit(Operation::AlertUnsnoozed { id: id.clone() })?;
        Ok(effects)
    }

    pub fn resolve_alert(&self, id: &AlertId, now: DateTime<Utc>) -> Result<Vec<Effect>, StoreError> {
        let mut inner = self.lock();
        let current = Self::get_alert(&inner, id)?;
        let Some((_, effects)) = current.resolve(now) else {
            return Ok(Vec::new());
        };
        inner.commit(Operation::AlertResolved {
            id: id.clone(),
            at: now,
        })?;
        Ok(effects)
    }

    /// Resolved alerts older than `retention`
    pub fn prunable_alerts(&self, retention: Duration, now: DateTime<Utc>) -> Vec<AlertId> {
        self.read(|s| {
            s.alerts
                .values()
                .filter(|a| a.is_prunable(retention, now))
                .map(|a| a.id.clone())
                .collect()
        })
    }

    pub fn prune_alert(&self, id: &AlertId) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        if !inner.state.alerts.contains_key(id) {
            return Ok(false);
        }
        inner.commit(Operation::AlertPruned { id: id.clone() })?;
        Ok(true)
    }

    fn get_alert(inner: &Inner, id: &AlertId) -> Result<Alert, StoreError> {
        inner
            .state
            .alerts
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::AlertNotFound(id.clone()))
    }

    // -- inventory --

    /// Keep `blob` as the latest of its kind for its agent
    pub fn store_inventory(&self, blob: InventoryBlob) -> Result<(), StoreError> {
        self.lock().commit(Operation::InventoryStored { blob })
    }

    pub fn inventory(&self, agent_id: &AgentId, kind: InventoryKind) -> Option<InventoryBlob> {
        self.read(|s| s.inventory.get(&(agent_id.clone(), kind)).cloned())
    }

    /// Agents whose latest `kind` blob contains `needle` (case-insensitive).
    /// Blobs that fail to decompress are skipped.
    pub fn search_inventory(&self, kind: InventoryKind, needle: &str) -> Vec<AgentId> {
        self.read(|s| {
            s.inventory
                .iter()
                .filter(|((_, k), _)| *k == kind)
                .filter_map(|((agent, _), blob)| match blob.contains(needle) {
                    Ok(true) => Some(agent.clone()),
                    Ok(false) => None,
                    Err(e) => {
                        tracing::warn!(agent = %agent, error = %e, "unreadable inventory blob");
                        None
                    }
                })
                .collect()
        })
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
