//! Shared helpers for the behavioral specs

use assert_cmd::assert::Assert;
use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// An empty working directory for one `fwd` invocation
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn empty() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file relative to the workspace root
    pub fn file(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, contents).unwrap();
        path
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(rel)).unwrap_or_default()
    }

    /// `fwd` running inside the workspace
    pub fn fwd(&self) -> Command {
        let mut cmd = Command::cargo_bin("fwd").unwrap();
        cmd.current_dir(self.dir.path());
        cmd.env("RUST_LOG", "info");
        cmd
    }
}

pub trait AssertExt {
    fn passes(self) -> Assert;
    fn exits_with(self, code: i32) -> Assert;
}

impl AssertExt for &mut Command {
    fn passes(self) -> Assert {
        self.assert().success()
    }

    fn exits_with(self, code: i32) -> Assert {
        self.assert().code(code)
    }
}

pub trait OutputExt {
    fn stdout_has(self, needle: &str) -> Self;
    fn stderr_has(self, needle: &str) -> Self;
}

impl OutputExt for Assert {
    fn stdout_has(self, needle: &str) -> Self {
        let stdout = String::from_utf8_lossy(&self.get_output().stdout).into_owned();
        assert!(stdout.contains(needle), "stdout missing {needle:?}:\n{stdout}");
        self
    }

    fn stderr_has(self, needle: &str) -> Self {
        let stderr = String::from_utf8_lossy(&self.get_output().stderr).into_owned();
        assert!(stderr.contains(needle), "stderr missing {needle:?}:\n{stderr}");
        self
    }
}

pub const FULL_CONFIG: &str = r#"
[transport]
url = "nats://127.0.0.1:4222"
user = "fwd"
password = "secret"
request_timeout = "5s"

[state]
dir = "var"
fleet = "fleet.json"

[thresholds]
offline = "5m"
overdue = "45m"

[tasks]
lock_grace = "1h"
name_prefix = "FleetWarden_"

[retention]
resolved_alerts = "14days"
completed_actions = "60days"

[intervals]
run_due_tasks = "20s"
agent_outages = "1m"

[checkin]
hello = { min = 20, max = 40 }
limit_data = true
"#;
