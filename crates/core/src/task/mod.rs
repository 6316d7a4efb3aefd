// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Automated tasks and their per-agent run records

mod lock;

pub use lock::{RunLockConfig, RunLockError, RunLockInput};

use crate::fleet::{string_id, AgentId, Platform, PolicyId};
use crate::id::{scheduled_entry_name, SCHEDULED_NAME_PREFIX};
use crate::schedule::TaskSchedule;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

string_id!(
    /// Unique identifier for an automated task
    TaskId
);

/// Who a task is assigned to
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum TaskTarget {
    Agent(AgentId),
    /// Every agent governed by this policy
    Policy(PolicyId),
}

/// A recurring unit of work
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomatedTask {
    pub id: TaskId,
    pub name: String,
    /// Name of the matching entry in the endpoint's own scheduler
    #[serde(default)]
    pub scheduled_name: String,
    pub schedule: TaskSchedule,
    pub target: TaskTarget,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Empty means every platform
    #[serde(default)]
    pub platforms: BTreeSet<Platform>,
}

fn default_enabled() -> bool {
    true
}

impl AutomatedTask {
    /// A new task with a freshly generated endpoint entry name
    pub fn new(id: impl Into<String>, name: impl Into<String>, schedule: TaskSchedule) -> Self {
        let id = TaskId::new(id);
        Self {
            target: TaskTarget::Agent(AgentId::new(String::new())),
            scheduled_name: scheduled_entry_name(SCHEDULED_NAME_PREFIX),
            id,
            name: name.into(),
            schedule,
            enabled: true,
            platforms: BTreeSet::new(),
        }
    }

    pub fn with_target(mut self, target: TaskTarget) -> Self {
        self.target = target;
        self
    }

    pub fn with_scheduled_name(mut self, name: impl Into<String>) -> Self {
        self.scheduled_name = name.into();
        self
    }

    pub fn supports(&self, platform: Platform) -> bool {
        self.platforms.is_empty() || self.platforms.contains(&platform)
    }
}

/// Execution state of a (task, agent) pair
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Completed,
}

/// What an agent reported back for a finished run
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    #[serde(default)]
    pub retcode: Option<i32>,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    /// Seconds the run took on the endpoint
    #[serde(default)]
    pub execution_time: f64,
}

/// Per (task, agent) execution record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: TaskId,
    pub agent_id: AgentId,
    pub state: RunState,
    /// Set while `Running`
    pub locked_at: Option<DateTime<Utc>>,
    /// When the most recent run started
    pub last_run: Option<DateTime<Utc>>,
    /// `last_run` before the current lock; restored if the lock is given back
    #[serde(default)]
    pub prior_run: Option<DateTime<Utc>>,
    pub report: Option<RunReport>,
}

impl TaskResult {
    pub fn new(task_id: TaskId, agent_id: AgentId) -> Self {
        Self {
            task_id,
            agent_id,
            state: RunState::Idle,
            locked_at: None,
            last_run: None,
            prior_run: None,
            report: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }
}
