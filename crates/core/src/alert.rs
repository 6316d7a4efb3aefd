// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Alert lifecycle: Active ⇄ Snoozed, then Resolved, then pruned

use crate::effect::{Effect, Event};
use crate::fleet::{string_id, AgentId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

string_id!(AlertId);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    /// Agent stopped checking in
    Availability,
    Check,
    Task,
    Custom,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum AlertState {
    Active,
    Snoozed { until: DateTime<Utc> },
    Resolved { at: DateTime<Utc> },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AlertError {
    #[error("alert {0} is resolved and cannot be snoozed")]
    AlreadyResolved(AlertId),
    #[error("snooze time {until} is not in the future")]
    SnoozeInPast { until: DateTime<Utc> },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub agent_id: AgentId,
    pub kind: AlertKind,
    pub severity: Severity,
    pub message: String,
    pub raised_at: DateTime<Utc>,
    pub state: AlertState,
}

impl Alert {
    pub fn new(
        id: AlertId,
        agent_id: AgentId,
        kind: AlertKind,
        severity: Severity,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            agent_id,
            kind,
            severity,
            message: message.into(),
            raised_at: now,
            state: AlertState::Active,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.state, AlertState::Resolved { .. })
    }

    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        match self.state {
            AlertState::Resolved { at } => Some(at),
            _ => None,
        }
    }

    pub fn snooze(
        &self,
        until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(Alert, Vec<Effect>), AlertError> {
        if self.is_resolved() {
            return Err(AlertError::AlreadyResolved(self.id.clone()));
        }
        if until <= now {
            return Err(AlertError::SnoozeInPast { until });
        }
        let mut next = self.clone();
        next.state = AlertState::Snoozed { until };
        Ok((
            next,
            vec![Effect::Emit(Event::AlertSnoozed {
                id: self.id.clone(),
                until,
            })],
        ))
    }

    /// Back to Active if the snooze has run out
    pub fn expire_snooze(&self, now: DateTime<Utc>) -> Option<(Alert, Vec<Effect>)> {
        match self.state {
            AlertState::Snoozed { until } if until <= now => {
                let mut next = self.clone();
                next.state = AlertState::Active;
                Some((
                    next,
                    vec![Effect::Emit(Event::AlertUnsnoozed { id: self.id.clone() })],
                ))
            }
            _ => None,
        }
    }

    /// Resolve; `None` if already resolved
    pub fn resolve(&self, now: DateTime<Utc>) -> Option<(Alert, Vec<Effect>)> {
        if self.is_resolved() {
            return None;
        }
        let mut next = self.clone();
        next.state = AlertState::Resolved { at: now };
        Some((
            next,
            vec![Effect::Emit(Event::AlertResolved { id: self.id.clone() })],
        ))
    }

    /// Resolved longer ago than `retention`
    pub fn is_prunable(&self, retention: Duration, now: DateTime<Utc>) -> bool {
        self.resolved_at()
            .is_some_and(|at| (now - at).to_std().unwrap_or(Duration::ZERO) > retention)
    }
}

#[cfg(test)]
#[path = "alert_tests.rs"]
mod tests;
