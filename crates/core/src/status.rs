// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent status derived from heartbeats
//!
//! Status is never stored. It is recomputed from the last-seen timestamp on
//! every read, so two workers looking at the same agent at the same instant
//! always agree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Derived agent status
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Online,
    Offline,
    Overdue,
    /// Agent is in maintenance mode; heartbeat age is ignored
    Suppressed,
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AgentStatus::Online => "online",
            AgentStatus::Offline => "offline",
            AgentStatus::Overdue => "overdue",
            AgentStatus::Suppressed => "suppressed",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ThresholdError {
    #[error("offline threshold ({offline:?}) must be shorter than overdue threshold ({overdue:?})")]
    Inverted { offline: Duration, overdue: Duration },
}

/// Heartbeat age thresholds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(with = "humantime_serde")]
    pub offline: Duration,
    #[serde(with = "humantime_serde")]
    pub overdue: Duration,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            offline: Duration::from_secs(4 * 60),
            overdue: Duration::from_secs(30 * 60),
        }
    }
}

impl Thresholds {
    pub fn new(offline: Duration, overdue: Duration) -> Self {
        Self { offline, overdue }
    }

    /// Thresholds as stored on an agent record, in whole minutes
    pub fn from_minutes(offline: u32, overdue: u32) -> Self {
        Self::new(
            Duration::from_secs(u64::from(offline) * 60),
            Duration::from_secs(u64::from(overdue) * 60),
        )
    }

    /// Reject thresholds whose ordering would make status derivation ambiguous
    pub fn validate(&self) -> Result<(), ThresholdError> {
        if self.offline >= self.overdue {
            return Err(ThresholdError::Inverted {
                offline: self.offline,
                overdue: self.overdue,
            });
        }
        Ok(())
    }
}

/// Compute an agent's status.
///
/// Assumes `thresholds.offline < thresholds.overdue`; callers validate that
/// when thresholds are configured. An agent that has never checked in is
/// offline, and a heartbeat from the future counts as zero elapsed time.
pub fn compute_status(
    last_seen: Option<DateTime<Utc>>,
    thresholds: Thresholds,
    maintenance_mode: bool,
    now: DateTime<Utc>,
) -> AgentStatus {
    if maintenance_mode {
        return AgentStatus::Suppressed;
    }
    let Some(last_seen) = last_seen else {
        return AgentStatus::Offline;
    };

    let elapsed = (now - last_seen).to_std().unwrap_or(Duration::ZERO);
    if elapsed < thresholds.offline {
        AgentStatus::Online
    } else if elapsed < thresholds.overdue {
        AgentStatus::Offline
    } else {
        AgentStatus::Overdue
    }
}

/// Tally of agents per status
pub type StatusCounts = BTreeMap<AgentStatus, usize>;

/// Count a fleet snapshot by status
pub fn status_counts(fleet: &crate::fleet::Fleet, now: DateTime<Utc>) -> StatusCounts {
    let mut counts = StatusCounts::new();
    for agent in fleet.agents.values() {
        *counts.entry(fleet.status_of(agent, now)).or_default() += 1;
    }
    counts
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
