// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Fleet Warden daemon internals: configuration and lifecycle

pub mod config;
pub mod lifecycle;

pub use config::{Config, ConfigError, DEFAULT_CONFIG_PATH, LOG_FILE_NAME};
pub use lifecycle::{load_fleet, startup, Daemon, LifecycleError};
