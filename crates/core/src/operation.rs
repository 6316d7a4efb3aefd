// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operations for the write-ahead log
//!
//! Each operation records the outcome of a transition that has already been
//! checked. Replaying them never re-validates.

use crate::action::{ActionId, Outcome, PendingAction};
use crate::alert::{Alert, AlertId};
use crate::fleet::AgentId;
use crate::inventory::InventoryBlob;
use crate::task::{RunReport, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Operations that can be persisted to the WAL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    /// A (task, agent) run lock was taken
    TaskLocked {
        task_id: TaskId,
        agent_id: AgentId,
        at: DateTime<Utc>,
    },

    /// A running task reported its result
    TaskCompleted {
        task_id: TaskId,
        agent_id: AgentId,
        report: RunReport,
    },

    /// A run lock was given back without a result; `last_run` is the run
    /// time from before the lock
    TaskLockReleased {
        task_id: TaskId,
        agent_id: AgentId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        last_run: Option<DateTime<Utc>>,
    },

    ActionCreated { action: PendingAction },

    ActionCompleted {
        id: ActionId,
        result: String,
        outcome: Outcome,
        at: DateTime<Utc>,
    },

    ActionPruned { id: ActionId },

    AlertRaised { alert: Alert },

    AlertSnoozed { id: AlertId, until: DateTime<Utc> },

    AlertUnsnoozed { id: AlertId },

    AlertResolved { id: AlertId, at: DateTime<Utc> },

    AlertPruned { id: AlertId },

    /// Latest inventory blob of a kind for an agent; replaces the previous one
    InventoryStored { blob: InventoryBlob },
}

#[cfg(test)]
#[path = "operation_tests.rs"]
mod tests;
