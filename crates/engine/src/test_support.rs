// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fleet and store fixtures shared by the engine tests.
//!
//! Times are relative to `FakeClock::new()`, Monday 2026-01-05 09:00 UTC:
//! - `a1` windows, seen 08:59 (online)
//! - `a2` linux, seen 08:00 (overdue)
//! - `a3` windows, seen 08:50 (offline)
//! - `a4` linux, in maintenance
//!
//! Tasks: `daily` at 09:00 on `a1`, `weekly` Mondays 09:00 on windows agents
//! under policy `p1`, and a `manual` task on `a1`.

use fw_core::{AgentId, Fleet, TaskId};
use fw_storage::Store;
use serde_json::json;
use tempfile::TempDir;

pub(crate) fn fleet() -> Fleet {
    serde_json::from_value(json!({
        "global": { "alert_template": "t-global" },
        "clients": [{ "id": "c1", "name": "Acme" }],
        "sites": [{ "id": "s1", "client": "c1", "workstation_policy": "p1" }],
        "policies": [{ "id": "p1", "name": "Workstations" }],
        "templates": [{ "id": "t-global", "name": "Default" }],
        "agents": [
            { "id": "a1", "hostname": "ws-01", "site": "s1", "platform": "windows",
              "last_seen": "2026-01-05T08:59:00Z" },
            { "id": "a2", "hostname": "srv-02", "site": "s1", "platform": "linux",
              "last_seen": "2026-01-05T08:00:00Z" },
            { "id": "a3", "site": "s1", "platform": "windows",
              "last_seen": "2026-01-05T08:50:00Z" },
            { "id": "a4", "site": "s1", "platform": "linux",
              "last_seen": "2026-01-05T08:00:00Z", "maintenance_mode": true }
        ],
        "tasks": [
            { "id": "daily", "name": "Disk cleanup",
              "scheduled_name": "FleetWarden_daily",
              "schedule": { "type": "daily", "time": "09:00:00" },
              "target": { "kind": "agent", "id": "a1" } },
            { "id": "weekly", "name": "Defrag",
              "scheduled_name": "FleetWarden_weekly",
              "schedule": { "type": "weekly", "days": 1, "time": "09:00:00" },
              "target": { "kind": "policy", "id": "p1" },
              "platforms": ["windows"] },
            { "id": "manual", "name": "Collect logs",
              "schedule": { "type": "manual" },
              "target": { "kind": "agent", "id": "a1" } }
        ]
    }))
    .unwrap()
}

/// A fresh store in its own temp dir; keep the dir alive for the test
pub(crate) fn store() -> (TempDir, Store) {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(&dir.path().join("state.wal")).unwrap();
    (dir, store)
}

pub(crate) fn agent(id: &str) -> AgentId {
    AgentId::new(id)
}

pub(crate) fn task(id: &str) -> TaskId {
    TaskId::new(id)
}
