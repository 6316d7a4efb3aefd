// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Precedence walk for an agent's effective alert template

use super::cache::{EntityRef, VersionVector};
use crate::fleet::{Agent, AgentId, ClientId, Fleet, Site, SiteId, TemplateId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hierarchy level a template was taken from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Agent,
    Site,
    Client,
    Policy,
    Global,
}

/// A site or client setting: an optional template plus its block flag
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LevelSetting {
    pub template: Option<TemplateId>,
    pub block_inheritance: bool,
}

impl LevelSetting {
    pub fn new(template: Option<TemplateId>) -> Self {
        Self {
            template,
            block_inheritance: false,
        }
    }

    pub fn blocking(mut self) -> Self {
        self.block_inheritance = true;
        self
    }
}

/// Candidate templates at each level, already filtered for applicability
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TemplateLevels {
    pub agent: Option<TemplateId>,
    pub site: LevelSetting,
    pub client: LevelSetting,
    pub policy: Option<TemplateId>,
    pub global: Option<TemplateId>,
}

/// Outcome of a resolution. `Unresolved` means no alerting is configured.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum Resolution {
    Resolved { template: TemplateId, level: Level },
    Unresolved,
}

impl Resolution {
    pub fn template(&self) -> Option<&TemplateId> {
        match self {
            Resolution::Resolved { template, .. } => Some(template),
            Resolution::Unresolved => None,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, Resolution::Unresolved)
    }
}

/// First configured level wins: agent, site, client, policy, global.
///
/// A blocking site or client ends the walk at that level whether or not it
/// has a template of its own.
pub fn resolve_template(levels: &TemplateLevels) -> Resolution {
    let found = |template: &Option<TemplateId>, level| {
        template.clone().map(|template| Resolution::Resolved { template, level })
    };

    if let Some(r) = found(&levels.agent, Level::Agent) {
        return r;
    }
    for (setting, level) in [(&levels.site, Level::Site), (&levels.client, Level::Client)] {
        if let Some(r) = found(&setting.template, level) {
            return r;
        }
        if setting.block_inheritance {
            return Resolution::Unresolved;
        }
    }
    found(&levels.policy, Level::Policy)
        .or_else(|| found(&levels.global, Level::Global))
        .unwrap_or(Resolution::Unresolved)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("agent not found: {0}")]
    UnknownAgent(AgentId),
    #[error("site not found: {0}")]
    UnknownSite(SiteId),
    #[error("client not found: {0}")]
    UnknownClient(ClientId),
}

/// A resolution plus the versions of everything consulted to reach it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedTemplate {
    pub resolution: Resolution,
    pub stamp: VersionVector,
}

/// Gather an agent's candidate templates from the fleet and resolve them.
///
/// Templates that are inactive or exclude the agent count as not configured
/// at their level.
pub fn resolve_for_agent(fleet: &Fleet, agent_id: &AgentId) -> Result<ResolvedTemplate, ResolveError> {
    let agent = fleet
        .agent(agent_id)
        .ok_or_else(|| ResolveError::UnknownAgent(agent_id.clone()))?;
    let site = fleet
        .site_of(agent)
        .ok_or_else(|| ResolveError::UnknownSite(agent.site.clone()))?;
    let client = fleet
        .client_of(site)
        .ok_or_else(|| ResolveError::UnknownClient(site.client.clone()))?;

    let mut walk = Walk {
        fleet,
        agent,
        site,
        stamp: VersionVector::default(),
    };
    walk.stamp.record(fleet, EntityRef::Agent(agent.id.clone()));
    walk.stamp.record(fleet, EntityRef::Site(site.id.clone()));
    walk.stamp.record(fleet, EntityRef::Client(client.id.clone()));

    let agent_level = walk.candidate(agent.alert_template.as_ref());
    let site_level = LevelSetting {
        template: walk.candidate(site.assignment.alert_template.as_ref()),
        block_inheritance: site.assignment.block_policy_inheritance,
    };
    let client_level = LevelSetting {
        template: walk.candidate(client.assignment.alert_template.as_ref()),
        block_inheritance: client.assignment.block_policy_inheritance,
    };

    for policy_id in fleet.policy_chain(agent) {
        walk.stamp.record(fleet, EntityRef::Policy(policy_id.clone()));
    }
    let policy_template = fleet.effective_policy(agent).and_then(|p| p.alert_template.as_ref());
    let policy_level = walk.candidate(policy_template);

    walk.stamp.record(fleet, EntityRef::Global);
    let global_level = walk.candidate(fleet.global.alert_template.as_ref());

    let resolution = resolve_template(&TemplateLevels {
        agent: agent_level,
        site: site_level,
        client: client_level,
        policy: policy_level,
        global: global_level,
    });
    Ok(ResolvedTemplate {
        resolution,
        stamp: walk.stamp,
    })
}

struct Walk<'a> {
    fleet: &'a Fleet,
    agent: &'a Agent,
    site: &'a Site,
    stamp: VersionVector,
}

impl Walk<'_> {
    fn candidate(&mut self, id: Option<&TemplateId>) -> Option<TemplateId> {
        let id = id?;
        self.stamp.record(self.fleet, EntityRef::Template(id.clone()));
        self.fleet
            .templates
            .get(id)
            .filter(|t| t.applies_to(self.agent, self.site))
            .map(|t| t.id.clone())
    }
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod tests;
