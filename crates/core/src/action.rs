// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pending actions: dispatched commands awaiting one completion report

use crate::effect::{Effect, Event};
use crate::fleet::{string_id, AgentId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

string_id!(ActionId);

/// What was dispatched
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionKind {
    ScheduledReboot { due: DateTime<Utc> },
    AgentUpdate { version: String },
    InstallSoftware { name: String },
    RunCommand { cmd: String },
    RunScript { script: String },
    PatchScan,
    PatchInstall,
}

impl ActionKind {
    pub fn description(&self) -> String {
        match self {
            ActionKind::ScheduledReboot { due } => {
                format!("Device pending reboot at {}", due.format("%Y-%m-%d %H:%M UTC"))
            }
            ActionKind::AgentUpdate { version } => format!("Agent update to {version}"),
            ActionKind::InstallSoftware { name } => format!("{name} software install"),
            ActionKind::RunCommand { cmd } => format!("Run command: {cmd}"),
            ActionKind::RunScript { script } => format!("Run script: {script}"),
            ActionKind::PatchScan => "Run patch scan".to_string(),
            ActionKind::PatchInstall => "Run patch install".to_string(),
        }
    }

    /// When the action is expected to take effect, if scheduled
    pub fn due(&self) -> Option<DateTime<Utc>> {
        match self {
            ActionKind::ScheduledReboot { due } => Some(*due),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Pending,
    Completed,
}

/// Classification of a completion payload. `Unknown` is not a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    AlreadyInstalled,
    Unknown,
}

impl Outcome {
    pub fn is_success(self) -> bool {
        matches!(self, Outcome::Success | Outcome::AlreadyInstalled)
    }
}

/// True when every keyword occurs somewhere in `text` (case-insensitive)
fn contains_all(text: &str, keywords: &[&str]) -> bool {
    let text = text.to_lowercase();
    keywords.iter().all(|k| text.contains(&k.to_lowercase()))
}

/// Classify a software-install result.
///
/// The success set is checked before the duplicate set, so output that
/// matches both counts as a fresh install.
pub fn classify_install(name: &str, text: &str) -> Outcome {
    if contains_all(text, &["install", "of", name, "was", "successful", "installed"]) {
        Outcome::Success
    } else if contains_all(text, &[name, "already", "installed", "--force", "reinstall"]) {
        Outcome::AlreadyInstalled
    } else {
        Outcome::Unknown
    }
}

/// Classify the result payload for any action kind
pub fn classify(kind: &ActionKind, text: &str) -> Outcome {
    match kind {
        ActionKind::InstallSoftware { name } => classify_install(name, text),
        _ => Outcome::Unknown,
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAction {
    pub id: ActionId,
    pub agent_id: AgentId,
    pub kind: ActionKind,
    /// Free-form dispatch parameters
    #[serde(default)]
    pub payload: serde_json::Value,
    pub status: ActionStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub outcome: Option<Outcome>,
}

impl PendingAction {
    pub fn new(
        id: ActionId,
        agent_id: AgentId,
        kind: ActionKind,
        payload: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            agent_id,
            kind,
            payload,
            status: ActionStatus::Pending,
            created_at: now,
            completed_at: None,
            result: None,
            outcome: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ActionStatus::Pending
    }

    /// Finalize with a result. `None` if already completed.
    pub fn complete(&self, result: &str, now: DateTime<Utc>) -> Option<(PendingAction, Vec<Effect>)> {
        if !self.is_pending() {
            return None;
        }
        let outcome = classify(&self.kind, result);
        let mut done = self.clone();
        done.status = ActionStatus::Completed;
        done.completed_at = Some(now);
        done.result = Some(result.to_string());
        done.outcome = Some(outcome);
        let effects = vec![Effect::Emit(Event::ActionCompleted {
            id: self.id.clone(),
            outcome,
        })];
        Some((done, effects))
    }

    /// Completed longer ago than `retention`
    pub fn is_prunable(&self, retention: std::time::Duration, now: DateTime<Utc>) -> bool {
        self.completed_at.is_some_and(|at| {
            (now - at).to_std().unwrap_or(std::time::Duration::ZERO) > retention
        })
    }
}

#[cfg(test)]
#[path = "action_tests.rs"]
mod tests;
