// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pending-action and alert ledger

use crate::error::LedgerError;
use crate::events;
use crate::templates::TemplateService;
use chrono::{DateTime, Utc};
use fw_core::{
    ActionId, ActionKind, AgentId, AgentStatus, Alert, AlertId, AlertKind, Clock, Fleet, IdGen,
    Outcome, PendingAction, Severity,
};
use fw_storage::Store;
use serde::Serialize;
use std::time::Duration;

/// Aggregate result of a sweep over many records
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub processed: usize,
    pub failed: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OutageReport {
    pub raised: usize,
    pub resolved: usize,
    pub failed: usize,
}

/// Retention windows for pruning
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Retention {
    pub resolved_alerts: Duration,
    pub completed_actions: Duration,
}

impl Default for Retention {
    fn default() -> Self {
        Self {
            resolved_alerts: Duration::from_secs(30 * 24 * 3600),
            completed_actions: Duration::from_secs(30 * 24 * 3600),
        }
    }
}

pub struct Ledger<C, I> {
    store: Store,
    clock: C,
    ids: I,
}

impl<C: Clock, I: IdGen> Ledger<C, I> {
    pub fn new(store: Store, clock: C, ids: I) -> Self {
        Self { store, clock, ids }
    }

    pub fn create_action(
        &self,
        agent_id: &AgentId,
        kind: ActionKind,
        payload: serde_json::Value,
    ) -> Result<ActionId, LedgerError> {
        let action = PendingAction::new(
            ActionId::new(self.ids.next()),
            agent_id.clone(),
            kind,
            payload,
            self.clock.now(),
        );
        let id = action.id.clone();
        let effects = self.store.create_action(action)?;
        events::emit(&effects);
        Ok(id)
    }

    /// First call stores the result and its outcome; later calls return `None`
    pub fn complete_action(
        &self,
        id: &ActionId,
        result: &str,
    ) -> Result<Option<Outcome>, LedgerError> {
        let outcome = self.store.complete_action(id, result, self.clock.now())?;
        match outcome {
            Some(outcome) => tracing::info!(action = %id, ?outcome, "action completed"),
            None => tracing::debug!(action = %id, "action already completed"),
        }
        Ok(outcome)
    }

    /// Open an alert, or return the one already open for (agent, kind)
    pub fn raise_alert(
        &self,
        agent_id: &AgentId,
        kind: AlertKind,
        severity: Severity,
        message: impl Into<String>,
    ) -> Result<AlertId, LedgerError> {
        let alert = Alert::new(
            AlertId::new(self.ids.next()),
            agent_id.clone(),
            kind,
            severity,
            message,
            self.clock.now(),
        );
        let (id, effects) = self.store.raise_alert(alert)?;
        events::emit(&effects);
        Ok(id)
    }

    pub fn snooze_alert(&self, id: &AlertId, until: DateTime<Utc>) -> Result<(), LedgerError> {
        let effects = self.store.snooze_alert(id, until, self.clock.now())?;
        events::emit(&effects);
        Ok(())
    }

    pub fn resolve_alert(&self, id: &AlertId) -> Result<(), LedgerError> {
        let effects = self.store.resolve_alert(id, self.clock.now())?;
        events::emit(&effects);
        Ok(())
    }

    /// Return expired snoozes to Active
    pub fn unsnooze_expired(&self) -> SweepReport {
        let now = self.clock.now();
        let mut report = SweepReport::default();
        for id in self.store.expired_snoozes(now) {
            match self.store.unsnooze_alert(&id, now) {
                Ok(effects) => {
                    events::emit(&effects);
                    report.processed += 1;
                }
                Err(e) => {
                    tracing::warn!(alert = %id, error = %e, "unsnooze failed");
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Drop resolved alerts and completed actions past their retention
    pub fn prune(&self, retention: &Retention) -> SweepReport {
        let now = self.clock.now();
        let mut report = SweepReport::default();

        for id in self.store.prunable_alerts(retention.resolved_alerts, now) {
            match self.store.prune_alert(&id) {
                Ok(pruned) => report.processed += usize::from(pruned),
                Err(e) => {
                    tracing::warn!(alert = %id, error = %e, "prune failed");
                    report.failed += 1;
                }
            }
        }
        for id in self.store.prunable_actions(retention.completed_actions, now) {
            match self.store.prune_action(&id) {
                Ok(pruned) => report.processed += usize::from(pruned),
                Err(e) => {
                    tracing::warn!(action = %id, error = %e, "prune failed");
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Raise availability alerts for overdue agents and resolve them for
    /// agents that are back online.
    ///
    /// Agents whose alert template resolves to nothing are not alerted on.
    pub async fn outage_sweep(&self, fleet: &Fleet, templates: &TemplateService) -> OutageReport {
        let now = self.clock.now();
        let mut report = OutageReport::default();

        for agent in fleet.agents.values() {
            match fleet.status_of(agent, now) {
                AgentStatus::Overdue => {
                    match templates.resolve(fleet, &agent.id).await {
                        Ok(resolution) if resolution.is_unresolved() => continue,
                        Ok(_) => {}
                        Err(e) => {
                            tracing::warn!(
                                agent = %agent.id,
                                error = %e,
                                "template resolution failed"
                            );
                            report.failed += 1;
                            continue;
                        }
                    }
                    if self
                        .store
                        .read(|s| s.open_alert(&agent.id, AlertKind::Availability).is_some())
                    {
                        continue;
                    }
                    let message = format!("{} is overdue", display_name(agent));
                    let raised =
                        self.raise_alert(&agent.id, AlertKind::Availability, Severity::Error, message);
                    match raised {
                        Ok(_) => report.raised += 1,
                        Err(e) => {
                            tracing::warn!(agent = %agent.id, error = %e, "outage alert failed");
                            report.failed += 1;
                        }
                    }
                }
                AgentStatus::Online => {
                    let open = self.store.read(|s| {
                        s.open_alert(&agent.id, AlertKind::Availability)
                            .map(|a| a.id.clone())
                    });
                    let Some(id) = open else { continue };
                    match self.resolve_alert(&id) {
                        Ok(()) => report.resolved += 1,
                        Err(e) => {
                            tracing::warn!(alert = %id, error = %e, "outage resolve failed");
                            report.failed += 1;
                        }
                    }
                }
                AgentStatus::Offline | AgentStatus::Suppressed => {}
            }
        }
        report
    }
}

fn display_name(agent: &fw_core::Agent) -> &str {
    if agent.hostname.is_empty() {
        agent.id.as_str()
    } else {
        &agent.hostname
    }
}

#[cfg(test)]
#[path = "ledger_tests.rs"]
mod tests;
