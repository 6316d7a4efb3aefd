// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Fleet Warden engine: command dispatch, scheduled tasks, the action and
//! alert ledger, and the periodic jobs that drive them.

mod dispatch;
mod error;
mod events;
mod jobs;
mod ledger;
mod tasks;
mod templates;

#[cfg(test)]
mod test_support;

pub use dispatch::{Dispatcher, Replies};
pub use error::{DispatchError, JobError, LedgerError, TaskError};
pub use jobs::{Job, JobOutcome, Jobs, Report};
pub use ledger::{Ledger, OutageReport, Retention, SweepReport};
pub use tasks::{ReconcileReport, RunDueReport, TaskConfig, TaskRunner};
pub use templates::TemplateService;
