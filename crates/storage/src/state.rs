// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state from WAL replay

use fw_core::{
    ActionId, ActionStatus, AgentId, Alert, AlertId, AlertKind, AlertState, InventoryBlob,
    InventoryKind, Operation, PendingAction, RunState, TaskId, TaskResult,
};
use std::collections::BTreeMap;

/// Materialized state built from WAL operations
#[derive(Debug, Default)]
pub struct MaterializedState {
    pub task_results: BTreeMap<(TaskId, AgentId), TaskResult>,
    pub actions: BTreeMap<ActionId, PendingAction>,
    pub alerts: BTreeMap<AlertId, Alert>,
    pub inventory: BTreeMap<(AgentId, InventoryKind), InventoryBlob>,
}

impl MaterializedState {
    /// Rebuild state from a sequence of operations
    pub fn from_ops<'a>(ops: impl IntoIterator<Item = &'a Operation>) -> Self {
        let mut state = Self::default();
        for op in ops {
            state.apply(op);
        }
        state
    }

    pub fn task_result(&self, task_id: &TaskId, agent_id: &AgentId) -> Option<&TaskResult> {
        self.task_results.get(&(task_id.clone(), agent_id.clone()))
    }

    /// Unresolved alert of `kind` for `agent_id`, if any
    pub fn open_alert(&self, agent_id: &AgentId, kind: AlertKind) -> Option<&Alert> {
        self.alerts
            .values()
            .find(|a| &a.agent_id == agent_id && a.kind == kind && !a.is_resolved())
    }

    /// Apply an operation to update the state
    pub fn apply(&mut self, op: &Operation) {
        match op {
            Operation::TaskLocked {
                task_id,
                agent_id,
                at,
            } => {
                let result = self
                    .task_results
                    .entry((task_id.clone(), agent_id.clone()))
                    .or_insert_with(|| TaskResult::new(task_id.clone(), agent_id.clone()));
                result.state = RunState::Running;
                result.locked_at = Some(*at);
                result.prior_run = result.last_run;
                result.last_run = Some(*at);
            }

            Operation::TaskCompleted {
                task_id,
                agent_id,
                report,
            } => {
                if let Some(result) = self.task_results.get_mut(&(task_id.clone(), agent_id.clone())) {
                    result.state = RunState::Completed;
                    result.locked_at = None;
                    result.report = Some(report.clone());
                }
            }

            Operation::TaskLockReleased {
                task_id,
                agent_id,
                last_run,
            } => {
                if let Some(result) = self.task_results.get_mut(&(task_id.clone(), agent_id.clone())) {
                    result.state = RunState::Idle;
                    result.locked_at = None;
                    result.last_run = *last_run;
                }
            }

            Operation::ActionCreated { action } => {
                self.actions.insert(action.id.clone(), action.clone());
            }

            Operation::ActionCompleted {
                id,
                result,
                outcome,
                at,
            } => {
                if let Some(action) = self.actions.get_mut(id) {
                    action.status = ActionStatus::Completed;
                    action.completed_at = Some(*at);
                    action.result = Some(result.clone());
                    action.outcome = Some(*outcome);
                }
            }

            Operation::ActionPruned { id } => {
                self.actions.remove(id);
            }

            Operation::AlertRaised { alert } => {
                self.alerts.insert(alert.id.clone(), alert.clone());
            }

            Operation::AlertSnoozed { id, until } => {
                if let Some(alert) = self.alerts.get_mut(id) {
                    alert.state = AlertState::Snoozed { until: *until };
                }
            }

            Operation::AlertUnsnoozed { id } => {
                if let Some(alert) = self.alerts.get_mut(id) {
                    alert.state = AlertState::Active;
                }
            }

            Operation::AlertResolved { id, at } => {
                if let Some(alert) = self.alerts.get_mut(id) {
                    alert.state = AlertState::Resolved { at: *at };
                }
            }

            Operation::AlertPruned { id } => {
                self.alerts.remove(id);
            }

            Operation::InventoryStored { blob } => {
                self.inventory
                    .insert((blob.agent_id.clone(), blob.kind), blob.clone());
            }
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
