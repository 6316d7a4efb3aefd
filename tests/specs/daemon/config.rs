//! Config validation specs
//!
//! `fwd --check-config` prints `config ok` and exits 0, or prints the
//! problem and exits 2.

use crate::prelude::*;

#[test]
fn defaults_apply_without_a_config_file() {
    let ws = Workspace::empty();

    ws.fwd().arg("--check-config").passes().stdout_has("config ok");
}

#[test]
fn full_config_is_accepted() {
    let ws = Workspace::empty();
    ws.file("fwd.toml", FULL_CONFIG);

    ws.fwd().arg("--check-config").passes().stdout_has("config ok");
}

#[test]
fn explicit_config_path_is_used() {
    let ws = Workspace::empty();
    let path = ws.file("etc/fleet.toml", "[thresholds]\noffline = \"1h\"\noverdue = \"2m\"\n");

    ws.fwd()
        .arg("--config")
        .arg(&path)
        .arg("--check-config")
        .exits_with(2)
        .stderr_has("[thresholds]");
}

#[test]
fn missing_explicit_config_exits_2() {
    let ws = Workspace::empty();

    ws.fwd()
        .args(["--config", "nowhere.toml", "--check-config"])
        .exits_with(2)
        .stderr_has("cannot read");
}

#[test]
fn inverted_checkin_range_exits_2() {
    let ws = Workspace::empty();
    ws.file("fwd.toml", "[checkin]\nwmi = { min = 4000, max = 3000 }\n");

    ws.fwd()
        .arg("--check-config")
        .exits_with(2)
        .stderr_has("checkin range wmi is empty");
}

#[test]
fn zero_interval_exits_2() {
    let ws = Workspace::empty();
    ws.file("fwd.toml", "[intervals]\nrun_due_tasks = \"0s\"\n");

    ws.fwd()
        .arg("--check-config")
        .exits_with(2)
        .stderr_has("run_due_tasks must be greater than zero");
}

#[test]
fn malformed_toml_exits_2() {
    let ws = Workspace::empty();
    ws.file("fwd.toml", "[transport\nurl = ");

    ws.fwd()
        .arg("--check-config")
        .exits_with(2)
        .stderr_has("invalid config");
}
