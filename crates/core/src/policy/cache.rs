// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Version-stamped cache of resolved templates
//!
//! Entries are keyed by agent and stamped with the version of every entity
//! the resolution consulted. An entry is served only while every stamped
//! version still matches the fleet, and mutation events evict entries that
//! reference the mutated entity. There is no time-based expiry.

use super::resolve::{resolve_for_agent, Resolution, ResolveError};
use crate::fleet::{AgentId, ClientId, Fleet, PolicyId, SiteId, TemplateId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A versioned entity in the ownership hierarchy
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum EntityRef {
    Agent(AgentId),
    Site(SiteId),
    Client(ClientId),
    Policy(PolicyId),
    Template(TemplateId),
    /// Fleet-wide defaults
    Global,
}

impl EntityRef {
    /// Current version in the fleet, or `None` if the entity does not exist
    pub fn version_in(&self, fleet: &Fleet) -> Option<u64> {
        match self {
            EntityRef::Agent(id) => fleet.agents.get(id).map(|x| x.version),
            EntityRef::Site(id) => fleet.sites.get(id).map(|x| x.version),
            EntityRef::Client(id) => fleet.clients.get(id).map(|x| x.version),
            EntityRef::Policy(id) => fleet.policies.get(id).map(|x| x.version),
            EntityRef::Template(id) => fleet.templates.get(id).map(|x| x.version),
            EntityRef::Global => Some(fleet.global.version),
        }
    }
}

/// Versions of every entity a resolution depended on
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VersionVector(Vec<(EntityRef, Option<u64>)>);

impl VersionVector {
    pub fn record(&mut self, fleet: &Fleet, entity: EntityRef) {
        if !self.references(&entity) {
            let version = entity.version_in(fleet);
            self.0.push((entity, version));
        }
    }

    pub fn references(&self, entity: &EntityRef) -> bool {
        self.0.iter().any(|(e, _)| e == entity)
    }

    /// True while no stamped entity has changed version, appeared or vanished
    pub fn is_current(&self, fleet: &Fleet) -> bool {
        self.0.iter().all(|(e, v)| e.version_in(fleet) == *v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Mutation notice from the ownership layer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidationEvent {
    Changed(EntityRef),
    /// The whole snapshot was replaced
    All,
}

#[derive(Clone, Debug)]
struct CacheEntry {
    resolution: Resolution,
    stamp: VersionVector,
}

/// Aggregate result of a full rebuild
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildReport {
    pub resolved: usize,
    pub unresolved: usize,
    pub failed: usize,
}

#[derive(Debug, Default)]
pub struct TemplateCache {
    entries: HashMap<AgentId, CacheEntry>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached resolution, if present and still current against `fleet`
    pub fn get(&self, agent: &AgentId, fleet: &Fleet) -> Option<&Resolution> {
        self.entries
            .get(agent)
            .filter(|entry| entry.stamp.is_current(fleet))
            .map(|entry| &entry.resolution)
    }

    /// Serve from cache or resolve and remember
    pub fn resolve(&mut self, fleet: &Fleet, agent: &AgentId) -> Result<Resolution, ResolveError> {
        if let Some(hit) = self.get(agent, fleet) {
            return Ok(hit.clone());
        }
        let resolved = match resolve_for_agent(fleet, agent) {
            Ok(resolved) => resolved,
            Err(e) => {
                self.entries.remove(agent);
                return Err(e);
            }
        };
        self.entries.insert(
            agent.clone(),
            CacheEntry {
                resolution: resolved.resolution.clone(),
                stamp: resolved.stamp,
            },
        );
        Ok(resolved.resolution)
    }

    /// Evict every entry affected by `event`; returns how many were dropped
    pub fn invalidate(&mut self, event: &InvalidationEvent) -> usize {
        let before = self.entries.len();
        match event {
            InvalidationEvent::All => self.entries.clear(),
            InvalidationEvent::Changed(entity) => {
                self.entries.retain(|agent, entry| {
                    let own = matches!(entity, EntityRef::Agent(id) if id == agent);
                    !own && !entry.stamp.references(entity)
                });
            }
        }
        before - self.entries.len()
    }

    /// Drop everything and resolve every agent in the fleet
    pub fn rebuild(&mut self, fleet: &Fleet) -> RebuildReport {
        self.entries.clear();
        let mut report = RebuildReport::default();
        for agent in fleet.agents.keys() {
            match self.resolve(fleet, agent) {
                Ok(Resolution::Unresolved) => report.unresolved += 1,
                Ok(Resolution::Resolved { .. }) => report.resolved += 1,
                Err(e) => {
                    tracing::warn!(agent = %agent, error = %e, "template resolution failed");
                    report.failed += 1;
                }
            }
        }
        report
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
