//! Daemon startup specs
//!
//! Startup failures happen before the daemon reaches the broker, so these
//! run without one.

use crate::prelude::*;

#[test]
fn missing_fleet_snapshot_fails_startup() {
    let ws = Workspace::empty();
    ws.file("fwd.toml", FULL_CONFIG);

    ws.fwd().assert().failure();

    let log = ws.read("var/fwd.log");
    assert!(log.contains("--- fwd: starting (pid: "), "log:\n{log}");
    assert!(log.contains("ERROR Failed to start daemon"), "log:\n{log}");
    assert!(log.contains("fleet.json"), "log:\n{log}");
}

#[test]
fn failed_startup_leaves_no_pid_file() {
    let ws = Workspace::empty();
    ws.file("fwd.toml", FULL_CONFIG);
    ws.file("fleet.json", "{ \"agents\": [ ");

    ws.fwd().assert().failure();

    assert!(!ws.path().join("var/fwd.pid").exists());
    assert!(ws.read("var/fwd.log").contains("Invalid fleet snapshot"));
}

#[test]
fn each_start_appends_a_marker() {
    let ws = Workspace::empty();
    ws.file("fwd.toml", FULL_CONFIG);

    ws.fwd().assert().failure();
    ws.fwd().assert().failure();

    let markers = ws.read("var/fwd.log").matches("fwd: starting").count();
    assert_eq!(markers, 2);
}
