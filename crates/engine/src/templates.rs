// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared alert-template cache

use fw_core::{
    AgentId, Fleet, InvalidationEvent, RebuildReport, Resolution, ResolveError, TemplateCache,
};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Cache of resolved alert templates shared across jobs.
///
/// Reads of current entries take the read lock only.
#[derive(Clone, Default)]
pub struct TemplateService {
    cache: Arc<RwLock<TemplateCache>>,
}

impl TemplateService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn resolve(&self, fleet: &Fleet, agent: &AgentId) -> Result<Resolution, ResolveError> {
        if let Some(hit) = self.cache.read().await.get(agent, fleet) {
            return Ok(hit.clone());
        }
        self.cache.write().await.resolve(fleet, agent)
    }

    pub async fn invalidate(&self, event: &InvalidationEvent) -> usize {
        let evicted = self.cache.write().await.invalidate(event);
        tracing::debug!(?event, evicted, "template cache invalidated");
        evicted
    }

    pub async fn rebuild(&self, fleet: &Fleet) -> RebuildReport {
        self.cache.write().await.rebuild(fleet)
    }

    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }
}

#[cfg(test)]
#[path = "templates_tests.rs"]
mod tests;
