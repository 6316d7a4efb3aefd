//! Command-line surface specs

use crate::prelude::*;

#[test]
fn help_prints_usage() {
    let ws = Workspace::empty();

    ws.fwd().arg("--help").passes().stdout_has("usage: fwd");
}

#[test]
fn unknown_argument_exits_2() {
    let ws = Workspace::empty();

    ws.fwd()
        .arg("--frobnicate")
        .exits_with(2)
        .stderr_has("unexpected argument '--frobnicate'")
        .stderr_has("usage: fwd");
}

#[test]
fn config_flag_without_path_exits_2() {
    let ws = Workspace::empty();

    ws.fwd().arg("--config").exits_with(2).stderr_has("--config needs a path");
}
