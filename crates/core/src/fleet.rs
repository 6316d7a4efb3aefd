// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fleet model: agents and their ownership hierarchy
//!
//! Agent → Site → Client is a strict tree. Children refer to their parent by
//! id and parents never list their children, so every walk is a chain of
//! map lookups and cannot cycle.

use crate::status::{compute_status, AgentStatus, Thresholds};
use crate::task::{AutomatedTask, TaskId, TaskTarget};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

pub(crate) use string_id;

string_id!(
    /// Agent identity; also the agent's transport subject
    AgentId
);
string_id!(SiteId);
string_id!(ClientId);
string_id!(PolicyId);
string_id!(TemplateId);

/// Whether an agent is monitored as a server or a workstation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitoringType {
    Server,
    #[default]
    Workstation,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Windows,
    Linux,
    Darwin,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    #[serde(default)]
    pub hostname: String,
    pub site: SiteId,
    #[serde(default)]
    pub platform: Platform,
    #[serde(default)]
    pub monitoring_type: MonitoringType,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(default)]
    pub maintenance_mode: bool,
    /// Own heartbeat thresholds; unset falls back to the fleet's
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offline_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overdue_minutes: Option<u32>,
    /// Policy assigned directly to this agent
    #[serde(default)]
    pub policy: Option<PolicyId>,
    /// Alert template override for this agent only
    #[serde(default)]
    pub alert_template: Option<TemplateId>,
    #[serde(default)]
    pub block_policy_inheritance: bool,
    #[serde(default)]
    pub version: u64,
}

impl Agent {
    pub fn new(id: impl Into<String>, site: impl Into<String>) -> Self {
        Self {
            id: AgentId::new(id),
            hostname: String::new(),
            site: SiteId::new(site),
            platform: Platform::default(),
            monitoring_type: MonitoringType::default(),
            last_seen: None,
            maintenance_mode: false,
            offline_minutes: None,
            overdue_minutes: None,
            policy: None,
            alert_template: None,
            block_policy_inheritance: false,
            version: 0,
        }
    }

    /// Whether the agent's own minutes form a usable pair over `defaults`
    pub fn own_thresholds(&self, defaults: Thresholds) -> Option<Thresholds> {
        if self.offline_minutes.is_none() && self.overdue_minutes.is_none() {
            return None;
        }
        let minutes = |m: u32| Duration::from_secs(u64::from(m) * 60);
        let own = Thresholds::new(
            self.offline_minutes.map_or(defaults.offline, minutes),
            self.overdue_minutes.map_or(defaults.overdue, minutes),
        );
        own.validate().ok().map(|()| own)
    }

    /// Effective thresholds. An override that would invert the pair is ignored.
    pub fn thresholds(&self, defaults: Thresholds) -> Thresholds {
        self.own_thresholds(defaults).unwrap_or(defaults)
    }

    pub fn status(&self, now: DateTime<Utc>, defaults: Thresholds) -> AgentStatus {
        compute_status(self.last_seen, self.thresholds(defaults), self.maintenance_mode, now)
    }
}

/// Policy and template assignment shared by sites and clients
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    #[serde(default)]
    pub server_policy: Option<PolicyId>,
    #[serde(default)]
    pub workstation_policy: Option<PolicyId>,
    #[serde(default)]
    pub alert_template: Option<TemplateId>,
    #[serde(default)]
    pub block_policy_inheritance: bool,
}

impl Assignment {
    pub fn policy_for(&self, monitoring_type: MonitoringType) -> Option<&PolicyId> {
        match monitoring_type {
            MonitoringType::Server => self.server_policy.as_ref(),
            MonitoringType::Workstation => self.workstation_policy.as_ref(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub id: SiteId,
    #[serde(default)]
    pub name: String,
    pub client: ClientId,
    #[serde(flatten)]
    pub assignment: Assignment,
    #[serde(default)]
    pub version: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub assignment: Assignment,
    #[serde(default)]
    pub version: u64,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub id: PolicyId,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub alert_template: Option<TemplateId>,
    #[serde(default)]
    pub version: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertTemplate {
    pub id: TemplateId,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub excluded_clients: BTreeSet<ClientId>,
    #[serde(default)]
    pub excluded_sites: BTreeSet<SiteId>,
    #[serde(default)]
    pub excluded_agents: BTreeSet<AgentId>,
    #[serde(default)]
    pub exclude_workstations: bool,
    #[serde(default)]
    pub exclude_servers: bool,
    #[serde(default)]
    pub version: u64,
}

impl AlertTemplate {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: TemplateId::new(id),
            name: String::new(),
            is_active: true,
            excluded_clients: BTreeSet::new(),
            excluded_sites: BTreeSet::new(),
            excluded_agents: BTreeSet::new(),
            exclude_workstations: false,
            exclude_servers: false,
            version: 0,
        }
    }

    /// Whether this template may apply to `agent` under `site`
    pub fn applies_to(&self, agent: &Agent, site: &Site) -> bool {
        if !self.is_active {
            return false;
        }
        let excluded_type = match agent.monitoring_type {
            MonitoringType::Server => self.exclude_servers,
            MonitoringType::Workstation => self.exclude_workstations,
        };
        !excluded_type
            && !self.excluded_agents.contains(&agent.id)
            && !self.excluded_sites.contains(&site.id)
            && !self.excluded_clients.contains(&site.client)
    }
}

/// Fleet-wide defaults
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalSettings {
    #[serde(default)]
    pub alert_template: Option<TemplateId>,
    #[serde(default)]
    pub server_policy: Option<PolicyId>,
    #[serde(default)]
    pub workstation_policy: Option<PolicyId>,
    #[serde(default)]
    pub version: u64,
}

/// On-disk shape of a fleet snapshot
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct FleetSnapshot {
    #[serde(default)]
    global: GlobalSettings,
    #[serde(default)]
    clients: Vec<Client>,
    #[serde(default)]
    sites: Vec<Site>,
    #[serde(default)]
    agents: Vec<Agent>,
    #[serde(default)]
    policies: Vec<Policy>,
    #[serde(default)]
    templates: Vec<AlertTemplate>,
    #[serde(default)]
    tasks: Vec<AutomatedTask>,
}

/// Read-only view of the fleet as supplied by the CRUD layer
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(from = "FleetSnapshot", into = "FleetSnapshot")]
pub struct Fleet {
    pub global: GlobalSettings,
    pub clients: BTreeMap<ClientId, Client>,
    pub sites: BTreeMap<SiteId, Site>,
    pub agents: BTreeMap<AgentId, Agent>,
    pub policies: BTreeMap<PolicyId, Policy>,
    pub templates: BTreeMap<TemplateId, AlertTemplate>,
    pub tasks: BTreeMap<TaskId, AutomatedTask>,
    /// Heartbeat thresholds for agents without their own; not part of the snapshot
    pub thresholds: Thresholds,
}

impl From<FleetSnapshot> for Fleet {
    fn from(s: FleetSnapshot) -> Self {
        Self {
            global: s.global,
            clients: s.clients.into_iter().map(|c| (c.id.clone(), c)).collect(),
            sites: s.sites.into_iter().map(|x| (x.id.clone(), x)).collect(),
            agents: s.agents.into_iter().map(|a| (a.id.clone(), a)).collect(),
            policies: s.policies.into_iter().map(|p| (p.id.clone(), p)).collect(),
            templates: s.templates.into_iter().map(|t| (t.id.clone(), t)).collect(),
            tasks: s.tasks.into_iter().map(|t| (t.id.clone(), t)).collect(),
            thresholds: Thresholds::default(),
        }
    }
}

impl From<Fleet> for FleetSnapshot {
    fn from(f: Fleet) -> Self {
        Self {
            global: f.global,
            clients: f.clients.into_values().collect(),
            sites: f.sites.into_values().collect(),
            agents: f.agents.into_values().collect(),
            policies: f.policies.into_values().collect(),
            templates: f.templates.into_values().collect(),
            tasks: f.tasks.into_values().collect(),
        }
    }
}

impl Fleet {
    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn status_of(&self, agent: &Agent, now: DateTime<Utc>) -> AgentStatus {
        agent.status(now, self.thresholds)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn agent(&self, id: &AgentId) -> Option<&Agent> {
        self.agents.get(id)
    }

    pub fn site_of(&self, agent: &Agent) -> Option<&Site> {
        self.sites.get(&agent.site)
    }

    pub fn client_of(&self, site: &Site) -> Option<&Client> {
        self.clients.get(&site.client)
    }

    /// The policy that governs an agent, honoring inheritance blocks.
    ///
    /// Walks agent, site, client, then the global default, taking the first
    /// active policy. A level that blocks inheritance still contributes its
    /// own policy but stops the walk below it.
    pub fn effective_policy(&self, agent: &Agent) -> Option<&Policy> {
        self.policy_chain(agent)
            .into_iter()
            .filter_map(|id| self.policies.get(id))
            .find(|p| p.active)
    }

    /// Policy ids in precedence order, before filtering for activity
    pub(crate) fn policy_chain<'a>(&'a self, agent: &'a Agent) -> Vec<&'a PolicyId> {
        let mut chain: Vec<&PolicyId> = agent.policy.iter().collect();
        if agent.block_policy_inheritance {
            return chain;
        }
        let Some(site) = self.site_of(agent) else {
            return chain;
        };
        chain.extend(site.assignment.policy_for(agent.monitoring_type));
        if site.assignment.block_policy_inheritance {
            return chain;
        }
        let Some(client) = self.client_of(site) else {
            return chain;
        };
        chain.extend(client.assignment.policy_for(agent.monitoring_type));
        if client.assignment.block_policy_inheritance {
            return chain;
        }
        chain.extend(match agent.monitoring_type {
            MonitoringType::Server => self.global.server_policy.as_ref(),
            MonitoringType::Workstation => self.global.workstation_policy.as_ref(),
        });
        chain
    }

    /// Agents a task should run on, filtered by supported platform
    pub fn agents_for_task<'a>(&'a self, task: &'a AutomatedTask) -> Vec<&'a Agent> {
        let targeted: Vec<&Agent> = match &task.target {
            TaskTarget::Agent(id) => self.agents.get(id).into_iter().collect(),
            TaskTarget::Policy(policy_id) => self
                .agents
                .values()
                .filter(|a| self.effective_policy(a).is_some_and(|p| &p.id == policy_id))
                .collect(),
        };
        targeted
            .into_iter()
            .filter(|a| task.supports(a.platform))
            .collect()
    }
}

#[cfg(test)]
#[path = "fleet_tests.rs"]
mod tests;
