// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration, read from a TOML file.
//!
//! Every field has a default, so an empty file is a valid configuration.
//! Durations are written the humantime way: `"30s"`, `"5m"`, `"30days"`.

use fw_adapters::NatsOptions;
use fw_core::{CheckinRanges, InvalidRange, RunLockConfig, ThresholdError, Thresholds};
use fw_engine::{Job, Retention, TaskConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Config file used when `--config` is not given
pub const DEFAULT_CONFIG_PATH: &str = "fwd.toml";

/// Daemon log, inside the state dir
pub const LOG_FILE_NAME: &str = "fwd.log";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("[thresholds] {0}")]
    Thresholds(#[from] ThresholdError),
    #[error("[checkin] {0}")]
    Checkin(#[from] InvalidRange),
    #[error("[intervals] {0} must be greater than zero")]
    ZeroInterval(&'static str),
    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
    #[error("[transport] url must not be empty")]
    EmptyUrl,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub transport: TransportConfig,
    pub state: StateConfig,
    pub thresholds: ThresholdsConfig,
    pub tasks: TasksConfig,
    pub retention: RetentionConfig,
    pub intervals: IntervalsConfig,
    pub checkin: CheckinRanges,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransportConfig {
    pub url: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub client_name: String,
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Default request/reply window when a command carries no timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            url: "nats://127.0.0.1:4222".to_string(),
            user: None,
            password: None,
            client_name: "fwd".to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: fw_adapters::DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StateConfig {
    /// Holds the WAL, the log and the pid lock
    pub dir: PathBuf,
    /// Fleet snapshot written by the CRUD layer
    pub fleet: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("state"),
            fleet: PathBuf::from("fleet.json"),
        }
    }
}

impl StateConfig {
    pub fn wal_path(&self) -> PathBuf {
        self.dir.join("fleet.wal")
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.join(LOG_FILE_NAME)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.dir.join("fwd.pid")
    }
}

/// Fallback heartbeat thresholds for agents whose own are unusable
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThresholdsConfig {
    #[serde(with = "humantime_serde")]
    pub offline: Duration,
    #[serde(with = "humantime_serde")]
    pub overdue: Duration,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        let defaults = Thresholds::default();
        Self {
            offline: defaults.offline,
            overdue: defaults.overdue,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TasksConfig {
    /// How long a run lock is honored before the janitor may release it
    #[serde(with = "humantime_serde")]
    pub lock_grace: Duration,
    pub name_prefix: String,
    #[serde(with = "humantime_serde")]
    pub run_timeout: Duration,
}

impl Default for TasksConfig {
    fn default() -> Self {
        let defaults = TaskConfig::default();
        Self {
            lock_grace: defaults.lock.grace,
            name_prefix: defaults.name_prefix,
            run_timeout: defaults.run_timeout,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetentionConfig {
    #[serde(with = "humantime_serde")]
    pub resolved_alerts: Duration,
    #[serde(with = "humantime_serde")]
    pub completed_actions: Duration,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        let defaults = Retention::default();
        Self {
            resolved_alerts: defaults.resolved_alerts,
            completed_actions: defaults.completed_actions,
        }
    }
}

/// Period of each job
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntervalsConfig {
    #[serde(with = "humantime_serde")]
    pub run_due_tasks: Duration,
    #[serde(with = "humantime_serde")]
    pub release_stale_locks: Duration,
    #[serde(with = "humantime_serde")]
    pub reconcile_orphans: Duration,
    #[serde(with = "humantime_serde")]
    pub unsnooze_alerts: Duration,
    #[serde(with = "humantime_serde")]
    pub prune_resolved: Duration,
    #[serde(with = "humantime_serde")]
    pub cache_alert_templates: Duration,
    #[serde(with = "humantime_serde")]
    pub agent_outages: Duration,
}

impl Default for IntervalsConfig {
    fn default() -> Self {
        const MINUTE: u64 = 60;
        Self {
            // Schedules fire at minute granularity; tick twice a minute
            run_due_tasks: Duration::from_secs(30),
            release_stale_locks: Duration::from_secs(5 * MINUTE),
            reconcile_orphans: Duration::from_secs(60 * MINUTE),
            unsnooze_alerts: Duration::from_secs(MINUTE),
            prune_resolved: Duration::from_secs(24 * 60 * MINUTE),
            cache_alert_templates: Duration::from_secs(10 * MINUTE),
            agent_outages: Duration::from_secs(2 * MINUTE),
        }
    }
}

impl IntervalsConfig {
    /// Every job with its period
    pub fn schedule(&self) -> Vec<(Job, Duration)> {
        vec![
            (Job::RunDueTasks, self.run_due_tasks),
            (Job::ReleaseStaleLocks, self.release_stale_locks),
            (Job::ReconcileOrphans, self.reconcile_orphans),
            (Job::UnsnoozeAlerts, self.unsnooze_alerts),
            (Job::PruneResolved { older_than_days: None }, self.prune_resolved),
            (Job::CacheAlertTemplates, self.cache_alert_templates),
            (Job::AgentOutages, self.agent_outages),
        ]
    }
}

impl Config {
    /// Read and validate the file at `path`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Like [`Config::load`], but a missing file yields the defaults
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::Read { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transport.url.trim().is_empty() {
            return Err(ConfigError::EmptyUrl);
        }
        self.thresholds().validate()?;
        let timeouts = [
            ("[transport] connect_timeout", self.transport.connect_timeout),
            ("[transport] request_timeout", self.transport.request_timeout),
            ("[tasks] run_timeout", self.tasks.run_timeout),
        ];
        if let Some((name, _)) = timeouts.iter().find(|(_, t)| t.is_zero()) {
            return Err(ConfigError::ZeroTimeout(*name));
        }
        self.checkin.validate()?;
        for (job, period) in self.intervals.schedule() {
            if period.is_zero() {
                return Err(ConfigError::ZeroInterval(job.name()));
            }
        }
        Ok(())
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds::new(self.thresholds.offline, self.thresholds.overdue)
    }

    pub fn nats_options(&self) -> NatsOptions {
        let t = &self.transport;
        let options = NatsOptions::new(t.url.clone())
            .with_client_name(t.client_name.clone())
            .with_connect_timeout(t.connect_timeout);
        match (&t.user, &t.password) {
            (Some(user), Some(password)) => options.with_credentials(user.clone(), password.clone()),
            _ => options,
        }
    }

    pub fn task_config(&self) -> TaskConfig {
        TaskConfig {
            lock: RunLockConfig::new().with_grace(self.tasks.lock_grace),
            name_prefix: self.tasks.name_prefix.clone(),
            run_timeout: self.tasks.run_timeout,
        }
    }

    pub fn retention(&self) -> Retention {
        Retention {
            resolved_alerts: self.retention.resolved_alerts,
            completed_actions: self.retention.completed_actions,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
