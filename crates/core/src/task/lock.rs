// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run-lock state machine for a (task, agent) pair
//!
//! `Idle → Running → Completed`, plus a janitor path `Running → Idle` once the
//! lock outlives its grace period. Only the janitor releases stale locks;
//! acquisition never steals one.

use super::{RunReport, RunState, TaskResult};
use crate::clock::Clock;
use crate::command::Command;
use crate::effect::{Effect, Event};
use crate::fleet::AgentId;
use crate::task::TaskId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Run-lock configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLockConfig {
    /// How long a Running lock is honored before the janitor may release it
    #[serde(with = "humantime_serde")]
    pub grace: Duration,
}

impl Default for RunLockConfig {
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(30 * 60),
        }
    }
}

impl RunLockConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RunLockError {
    #[error("task {task_id} is already running on {agent_id} (locked at {locked_at})")]
    LockConflict {
        task_id: TaskId,
        agent_id: AgentId,
        locked_at: DateTime<Utc>,
    },
    #[error("task {task_id} on {agent_id} holds a stale lock from {locked_at}; awaiting release")]
    StaleLock {
        task_id: TaskId,
        agent_id: AgentId,
        locked_at: DateTime<Utc>,
    },
}

/// Inputs that drive run-lock transitions
#[derive(Clone, Debug)]
pub enum RunLockInput {
    /// Take the lock and start a run
    Acquire,
    /// A run finished and reported back
    Complete { report: RunReport },
    /// Give the lock back without a result (dispatch failed)
    Release,
    /// Janitor pass; releases the lock only if it is stale
    ReleaseStale,
}

impl TaskResult {
    /// Check if a Running lock has outlived the grace period
    pub fn is_stale(&self, config: &RunLockConfig, clock: &impl Clock) -> bool {
        if self.state != RunState::Running {
            return false;
        }
        match self.locked_at {
            // A Running record without a timestamp can never be confirmed live
            None => true,
            Some(at) => (clock.now() - at).to_std().unwrap_or(Duration::ZERO) > config.grace,
        }
    }

    /// Pure state transition function
    pub fn transition(
        &self,
        input: RunLockInput,
        config: &RunLockConfig,
        clock: &impl Clock,
    ) -> Result<(TaskResult, Vec<Effect>), RunLockError> {
        let mut next = self.clone();
        let mut effects = Vec::new();

        match input {
            RunLockInput::Acquire => {
                if self.state == RunState::Running {
                    let locked_at = self.locked_at.unwrap_or(DateTime::<Utc>::MIN_UTC);
                    return Err(if self.is_stale(config, clock) {
                        RunLockError::StaleLock {
                            task_id: self.task_id.clone(),
                            agent_id: self.agent_id.clone(),
                            locked_at,
                        }
                    } else {
                        RunLockError::LockConflict {
                            task_id: self.task_id.clone(),
                            agent_id: self.agent_id.clone(),
                            locked_at,
                        }
                    });
                }
                let now = clock.now();
                next.state = RunState::Running;
                next.locked_at = Some(now);
                next.prior_run = self.last_run;
                next.last_run = Some(now);
                effects.push(Effect::Emit(Event::TaskLocked {
                    task_id: self.task_id.clone(),
                    agent_id: self.agent_id.clone(),
                    at: now,
                }));
                effects.push(Effect::Dispatch {
                    agent: self.agent_id.clone(),
                    command: Command::run_task(self.task_id.clone()),
                });
            }

            RunLockInput::Complete { report } => {
                if self.state == RunState::Running {
                    effects.push(Effect::Emit(Event::TaskCompleted {
                        task_id: self.task_id.clone(),
                        agent_id: self.agent_id.clone(),
                        retcode: report.retcode,
                    }));
                    next.state = RunState::Completed;
                    next.locked_at = None;
                    next.report = Some(report);
                }
                // Late or duplicate completion: nothing to do
            }

            RunLockInput::Release => {
                if self.state == RunState::Running {
                    next.state = RunState::Idle;
                    next.locked_at = None;
                    next.last_run = self.prior_run;
                    effects.push(Effect::Emit(Event::TaskLockReleased {
                        task_id: self.task_id.clone(),
                        agent_id: self.agent_id.clone(),
                        stale: false,
                    }));
                }
            }

            RunLockInput::ReleaseStale => {
                if self.is_stale(config, clock) {
                    next.state = RunState::Idle;
                    next.locked_at = None;
                    next.last_run = self.prior_run;
                    effects.push(Effect::Emit(Event::TaskLockReleased {
                        task_id: self.task_id.clone(),
                        agent_id: self.agent_id.clone(),
                        stale: true,
                    }));
                }
            }
        }

        Ok((next, effects))
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
