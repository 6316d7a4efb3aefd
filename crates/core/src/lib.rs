// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fw-core: Core library for the fleet warden daemon
//!
//! This crate provides:
//! - The fleet model (clients, sites, agents, policies, alert templates)
//! - Pure status, schedule and template-resolution logic
//! - Pure state machines for task run-locks, pending actions and alerts
//! - The binary command envelope exchanged with agents
//! - Operations persisted to the write-ahead log

pub mod clock;
pub mod id;

pub mod fleet;
pub mod schedule;
pub mod status;

pub mod policy;

// State machines
pub mod action;
pub mod alert;
pub mod effect;
pub mod task;

pub mod checkin;
pub mod command;
pub mod inventory;
pub mod operation;

pub use action::{
    classify, classify_install, ActionId, ActionKind, ActionStatus, Outcome, PendingAction,
};
pub use alert::{Alert, AlertError, AlertId, AlertKind, AlertState, Severity};
pub use checkin::{CheckinConfig, CheckinRanges, InvalidRange, Range};
pub use clock::{Clock, FakeClock, SystemClock};
pub use command::{decode_reply, encode_reply, Command, DecodeError, EncodeError, Envelope};
pub use effect::{Effect, Event};
pub use fleet::{
    Agent, AgentId, AlertTemplate, Client, ClientId, Fleet, GlobalSettings, MonitoringType,
    Platform, Policy, PolicyId, Site, SiteId, TemplateId,
};
pub use id::{
    scheduled_entry_name, IdGen, SequentialIdGen, UuidIdGen, SCHEDULED_NAME_PREFIX,
    SCHEDULED_NAME_SUFFIX_LEN,
};
pub use inventory::{InventoryBlob, InventoryKind};
pub use operation::Operation;
pub use policy::{
    resolve_for_agent, resolve_template, EntityRef, InvalidationEvent, Level, RebuildReport,
    Resolution, ResolveError, ResolvedTemplate, TemplateCache,
};
pub use schedule::{TaskSchedule, Weekday, WeekdayMask};
pub use status::{
    compute_status, status_counts, AgentStatus, StatusCounts, ThresholdError, Thresholds,
};
pub use task::{
    AutomatedTask, RunLockConfig, RunLockError, RunLockInput, RunReport, RunState, TaskId,
    TaskResult, TaskTarget,
};
