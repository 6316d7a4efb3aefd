//! Behavioral specifications for fwd.
//!
//! These tests are black-box: they invoke the daemon binary and verify
//! stdout, stderr, exit codes and the files it leaves behind.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

// daemon/
#[path = "specs/daemon/cli.rs"]
mod daemon_cli;
#[path = "specs/daemon/config.rs"]
mod daemon_config;
#[path = "specs/daemon/lifecycle.rs"]
mod daemon_lifecycle;
