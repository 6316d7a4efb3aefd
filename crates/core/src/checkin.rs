// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-agent checkin intervals
//!
//! Each connecting agent gets intervals drawn at random from configured
//! ranges so a large fleet does not check in in lockstep.

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Inclusive range of seconds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub min: u32,
    pub max: u32,
}

impl Range {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    fn sample(self, rng: &mut impl Rng) -> u32 {
        let (lo, hi) = (self.min.min(self.max), self.min.max(self.max));
        rng.gen_range(lo..=hi)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("checkin range {name} is empty ({min} > {max})")]
pub struct InvalidRange {
    pub name: &'static str,
    pub min: u32,
    pub max: u32,
}

/// Interval ranges and feature flags handed to agents
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckinRanges {
    pub hello: Range,
    pub agent_info: Range,
    pub services: Range,
    pub public_ip: Range,
    pub disks: Range,
    pub software: Range,
    pub wmi: Range,
    pub sync_mesh: Range,
    pub limit_data: bool,
    pub install_nushell: bool,
    pub install_deno: bool,
}

impl Default for CheckinRanges {
    fn default() -> Self {
        Self {
            hello: Range::new(30, 60),
            agent_info: Range::new(200, 400),
            services: Range::new(2400, 3000),
            public_ip: Range::new(300, 500),
            disks: Range::new(1000, 2000),
            software: Range::new(2800, 3500),
            wmi: Range::new(3000, 4000),
            sync_mesh: Range::new(800, 1200),
            limit_data: false,
            install_nushell: false,
            install_deno: false,
        }
    }
}

impl CheckinRanges {
    fn named(&self) -> [(&'static str, Range); 8] {
        [
            ("hello", self.hello),
            ("agent_info", self.agent_info),
            ("services", self.services),
            ("public_ip", self.public_ip),
            ("disks", self.disks),
            ("software", self.software),
            ("wmi", self.wmi),
            ("sync_mesh", self.sync_mesh),
        ]
    }

    pub fn validate(&self) -> Result<(), InvalidRange> {
        match self.named().into_iter().find(|(_, r)| r.min > r.max) {
            Some((name, r)) => Err(InvalidRange {
                name,
                min: r.min,
                max: r.max,
            }),
            None => Ok(()),
        }
    }

    /// Draw one agent's intervals
    pub fn sample(&self, rng: &mut impl Rng) -> CheckinConfig {
        CheckinConfig {
            hello: self.hello.sample(rng),
            agent_info: self.agent_info.sample(rng),
            services: self.services.sample(rng),
            public_ip: self.public_ip.sample(rng),
            disks: self.disks.sample(rng),
            software: self.software.sample(rng),
            wmi: self.wmi.sample(rng),
            sync_mesh: self.sync_mesh.sample(rng),
            limit_data: self.limit_data,
            install_nushell: self.install_nushell,
            install_deno: self.install_deno,
        }
    }
}

/// Concrete intervals for one agent, in seconds
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckinConfig {
    pub hello: u32,
    pub agent_info: u32,
    pub services: u32,
    pub public_ip: u32,
    pub disks: u32,
    pub software: u32,
    pub wmi: u32,
    pub sync_mesh: u32,
    pub limit_data: bool,
    pub install_nushell: bool,
    pub install_deno: bool,
}
