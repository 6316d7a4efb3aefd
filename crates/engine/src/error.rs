// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine

use fw_adapters::TransportError;
use fw_core::{AgentId, DecodeError, EncodeError, RunLockError, TaskId};
use fw_storage::StoreError;
use thiserror::Error;

/// Errors from sending commands to agents
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("transport down: {0}")]
    TransportDown(String),
    #[error("agent did not reply in time")]
    Timeout,
    #[error("malformed reply: {0}")]
    Decode(#[from] DecodeError),
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),
}

impl From<TransportError> for DispatchError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Down(reason) => DispatchError::TransportDown(reason),
            TransportError::Timeout => DispatchError::Timeout,
        }
    }
}

/// Errors from the scheduled task engine
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Lock(RunLockError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error("storage error: {0}")]
    Store(StoreError),
    #[error("task not found: {0}")]
    UnknownTask(TaskId),
    #[error("agent not found: {0}")]
    UnknownAgent(AgentId),
    #[error("task {task_id} failed on {agent_id} (exit {retcode:?}): {stderr}")]
    AgentFailed {
        task_id: TaskId,
        agent_id: AgentId,
        retcode: Option<i32>,
        stderr: String,
    },
}

impl From<StoreError> for TaskError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::RunLock(lock) => TaskError::Lock(lock),
            other => TaskError::Store(other),
        }
    }
}

/// Errors from the pending-action and alert ledger
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// Errors from periodic jobs
#[derive(Debug, Error)]
pub enum JobError {
    #[error("{job}: {source}")]
    Task {
        job: &'static str,
        source: TaskError,
    },
}
