// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effects and events for state machine orchestration

use crate::action::{ActionId, Outcome};
use crate::alert::AlertId;
use crate::command::Command;
use crate::fleet::AgentId;
use crate::task::TaskId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Effects are side effects that state machines request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Emit an event for other components to observe
    Emit(Event),
    /// Send a command to an agent
    Dispatch { agent: AgentId, command: Command },
}

/// Events emitted by state machines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    // Task run-lock events
    TaskLocked {
        task_id: TaskId,
        agent_id: AgentId,
        at: DateTime<Utc>,
    },
    TaskCompleted {
        task_id: TaskId,
        agent_id: AgentId,
        retcode: Option<i32>,
    },
    TaskLockReleased {
        task_id: TaskId,
        agent_id: AgentId,
        stale: bool,
    },

    // Pending action events
    ActionCreated {
        id: ActionId,
        agent_id: AgentId,
    },
    ActionCompleted {
        id: ActionId,
        outcome: Outcome,
    },

    // Alert events
    AlertRaised {
        id: AlertId,
        agent_id: AgentId,
    },
    AlertSnoozed {
        id: AlertId,
        until: DateTime<Utc>,
    },
    AlertUnsnoozed {
        id: AlertId,
    },
    AlertResolved {
        id: AlertId,
    },
}

impl Event {
    /// Short name for log lines
    pub fn name(&self) -> &'static str {
        match self {
            Event::TaskLocked { .. } => "task:locked",
            Event::TaskCompleted { .. } => "task:completed",
            Event::TaskLockReleased { .. } => "task:released",
            Event::ActionCreated { .. } => "action:created",
            Event::ActionCompleted { .. } => "action:completed",
            Event::AlertRaised { .. } => "alert:raised",
            Event::AlertSnoozed { .. } => "alert:snoozed",
            Event::AlertUnsnoozed { .. } => "alert:unsnoozed",
            Event::AlertResolved { .. } => "alert:resolved",
        }
    }
}

#[cfg(test)]
#[path = "effect_tests.rs"]
mod tests;
