// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, fleet reload, shutdown.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;

use fs2::FileExt;
use fw_adapters::Transport;
use fw_core::{
    status_counts, AgentStatus, Clock, Command, Envelope, Fleet, InvalidationEvent, SystemClock,
    Thresholds, UuidIdGen,
};
use fw_engine::{DispatchError, Dispatcher, Job, JobError, JobOutcome, Jobs};
use fw_storage::{Store, StoreError};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to read fleet snapshot {0}: {1}")]
    FleetRead(PathBuf, #[source] std::io::Error),

    #[error("Invalid fleet snapshot {0}: {1}")]
    FleetParse(PathBuf, #[source] serde_json::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Daemon state during operation
pub struct Daemon<T> {
    config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    jobs: Jobs<T, SystemClock, UuidIdGen>,
    dispatcher: Dispatcher<T>,
    fleet: Fleet,
    /// When daemon started
    pub start_time: Instant,
}

/// Start the daemon: take the pid lock, replay the WAL, load the fleet
pub async fn startup<T: Transport>(
    config: &Config,
    transport: T,
) -> Result<Daemon<T>, LifecycleError> {
    match startup_inner(config, transport).await {
        Ok(daemon) => Ok(daemon),
        // The pid file belongs to the daemon that holds the lock
        Err(e @ LifecycleError::LockFailed(_)) => Err(e),
        Err(e) => {
            cleanup_on_failure(config);
            Err(e)
        }
    }
}

async fn startup_inner<T: Transport>(
    config: &Config,
    transport: T,
) -> Result<Daemon<T>, LifecycleError> {
    std::fs::create_dir_all(&config.state.dir)?;

    // Lock first so two daemons never share a WAL
    let lock_path = config.state.lock_path();
    let mut lock_file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    use std::io::Write;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    // Load the fleet before opening the store so a bad snapshot fails fast
    let fleet = load_fleet(&config.state.fleet, config.thresholds())?;

    let store = Store::open(&config.state.wal_path())?;
    info!(
        sequence = store.sequence(),
        running = store.running().len(),
        "loaded state"
    );

    let dispatcher =
        Dispatcher::new(transport).with_timeout(config.transport.request_timeout);
    let jobs = Jobs::new(
        store,
        dispatcher.clone(),
        SystemClock,
        UuidIdGen,
        config.task_config(),
        config.retention(),
    );

    let daemon = Daemon {
        config: config.clone(),
        lock_file,
        jobs,
        dispatcher,
        fleet,
        start_time: Instant::now(),
    };
    daemon.log_summary();
    daemon.push_checkin().await;
    Ok(daemon)
}

impl<T: Transport> Daemon<T> {
    pub fn fleet(&self) -> &Fleet {
        &self.fleet
    }

    pub fn jobs(&self) -> &Jobs<T, SystemClock, UuidIdGen> {
        &self.jobs
    }

    pub async fn run_job(&self, job: &Job) -> Result<JobOutcome, JobError> {
        self.jobs.run(job, &self.fleet).await
    }

    /// Re-read the fleet snapshot and drop every cached resolution.
    ///
    /// On failure the previous snapshot stays in use.
    pub async fn reload(&mut self) -> Result<(), LifecycleError> {
        let fleet = load_fleet(&self.config.state.fleet, self.config.thresholds())?;
        self.fleet = fleet;
        let evicted = self.jobs.templates().invalidate(&InvalidationEvent::All).await;
        info!(agents = self.fleet.agents.len(), evicted, "fleet reloaded");
        self.log_summary();
        self.push_checkin().await;
        Ok(())
    }

    /// One log line with the fleet tallied by status
    pub fn log_summary(&self) {
        let counts = status_counts(&self.fleet, SystemClock.now());
        let count = |status| counts.get(&status).copied().unwrap_or(0);
        info!(
            online = count(AgentStatus::Online),
            offline = count(AgentStatus::Offline),
            overdue = count(AgentStatus::Overdue),
            suppressed = count(AgentStatus::Suppressed),
            "fleet summary"
        );
    }

    /// Send each online agent its own randomized checkin intervals
    pub async fn push_checkin(&self) -> usize {
        let batch = {
            let mut rng = rand::thread_rng();
            let now = SystemClock.now();
            self.fleet
                .agents
                .values()
                .filter(|a| self.fleet.status_of(a, now) == AgentStatus::Online)
                .map(|a| {
                    let config = self.config.checkin.sample(&mut rng);
                    (a.id.clone(), Envelope::new(Command::CheckinConfig(config)))
                })
                .collect::<Vec<_>>()
        };
        match self.dispatcher.broadcast(batch).await {
            Ok(sent) => sent,
            Err(DispatchError::TransportDown(reason)) => {
                warn!(%reason, "checkin push skipped");
                0
            }
            Err(e) => {
                warn!(error = %e, "checkin push failed");
                0
            }
        }
    }

    /// Shutdown the daemon gracefully
    pub fn shutdown(&mut self) {
        info!("Shutting down daemon...");
        let lock_path = self.config.state.lock_path();
        if lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }
        info!(
            uptime_secs = self.start_time.elapsed().as_secs(),
            "Daemon shutdown complete"
        );
    }
}

/// Read a fleet snapshot.
///
/// Agents without their own thresholds use `defaults`, and so do agents
/// whose own minutes are inverted.
pub fn load_fleet(path: &Path, defaults: Thresholds) -> Result<Fleet, LifecycleError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| LifecycleError::FleetRead(path.to_path_buf(), e))?;
    let fleet = Fleet::from_json(&text)
        .map_err(|e| LifecycleError::FleetParse(path.to_path_buf(), e))?
        .with_thresholds(defaults);

    for agent in fleet.agents.values() {
        let overridden = agent.offline_minutes.is_some() || agent.overdue_minutes.is_some();
        if overridden && agent.own_thresholds(defaults).is_none() {
            warn!(
                agent = %agent.id,
                offline_minutes = ?agent.offline_minutes,
                overdue_minutes = ?agent.overdue_minutes,
                "inverted agent thresholds, using configured ones"
            );
        }
    }
    info!(
        path = %path.display(),
        agents = fleet.agents.len(),
        tasks = fleet.tasks.len(),
        "loaded fleet"
    );
    Ok(fleet)
}

/// Clean up resources created during a failed startup
fn cleanup_on_failure(config: &Config) {
    let lock_path = config.state.lock_path();
    if lock_path.exists() {
        if let Err(e) = std::fs::remove_file(&lock_path) {
            warn!("Failed to remove PID file during cleanup: {}", e);
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
