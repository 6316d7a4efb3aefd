// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Commands sent to agents and their MessagePack wire envelope
//!
//! On the wire every message is a map `{func, payload?, timeout?, run_as_user?}`.
//! Each command kind owns a typed payload; decoding reads the header first
//! and then the payload shape that `func` names.

use crate::checkin::CheckinConfig;
use crate::task::TaskId;
use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::time::Duration;
use thiserror::Error;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shell {
    #[default]
    Cmd,
    Powershell,
    Bash,
    Python,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTaskPayload {
    pub task_id: TaskId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptPayload {
    pub script_id: String,
    pub code: String,
    #[serde(default)]
    pub shell: Shell,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandPayload {
    pub cmd: String,
    #[serde(default)]
    pub shell: Shell,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftwarePayload {
    pub name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoverMode {
    /// Restart the agent service
    Agent,
    /// Reinstall the remote-access component
    Mesh,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoverPayload {
    pub mode: RecoverMode,
}

/// An entry in the endpoint's own task scheduler
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledEntry {
    pub name: String,
}

/// A command for one agent
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Ping,
    RunTask(RunTaskPayload),
    RunScript(ScriptPayload),
    RunCommand(CommandPayload),
    InstallSoftware(SoftwarePayload),
    Reboot,
    Recover(RecoverPayload),
    DeleteScheduledTask(ScheduledEntry),
    ListScheduledTasks,
    CheckinConfig(CheckinConfig),
}

impl Command {
    pub fn run_task(task_id: TaskId) -> Self {
        Command::RunTask(RunTaskPayload { task_id })
    }

    pub fn delete_scheduled(name: impl Into<String>) -> Self {
        Command::DeleteScheduledTask(ScheduledEntry { name: name.into() })
    }

    /// Wire name of the command
    pub fn func(&self) -> &'static str {
        match self {
            Command::Ping => "ping",
            Command::RunTask(_) => "runtask",
            Command::RunScript(_) => "runscript",
            Command::RunCommand(_) => "rawcmd",
            Command::InstallSoftware(_) => "installwithchoco",
            Command::Reboot => "rebootnow",
            Command::Recover(_) => "recover",
            Command::DeleteScheduledTask(_) => "delschedtask",
            Command::ListScheduledTasks => "listschedtasks",
            Command::CheckinConfig(_) => "checkinconfig",
        }
    }

    fn has_payload(&self) -> bool {
        !matches!(
            self,
            Command::Ping | Command::Reboot | Command::ListScheduledTasks
        )
    }

    fn serialize_payload<M: SerializeMap>(&self, map: &mut M) -> Result<(), M::Error> {
        match self {
            Command::Ping | Command::Reboot | Command::ListScheduledTasks => Ok(()),
            Command::RunTask(p) => map.serialize_entry("payload", p),
            Command::RunScript(p) => map.serialize_entry("payload", p),
            Command::RunCommand(p) => map.serialize_entry("payload", p),
            Command::InstallSoftware(p) => map.serialize_entry("payload", p),
            Command::Recover(p) => map.serialize_entry("payload", p),
            Command::DeleteScheduledTask(p) => map.serialize_entry("payload", p),
            Command::CheckinConfig(p) => map.serialize_entry("payload", p),
        }
    }

    fn decode_payload(func: &str, bytes: &[u8]) -> Result<Self, DecodeError> {
        Ok(match func {
            "ping" => Command::Ping,
            "rebootnow" => Command::Reboot,
            "listschedtasks" => Command::ListScheduledTasks,
            "runtask" => Command::RunTask(payload(bytes)?),
            "runscript" => Command::RunScript(payload(bytes)?),
            "rawcmd" => Command::RunCommand(payload(bytes)?),
            "installwithchoco" => Command::InstallSoftware(payload(bytes)?),
            "recover" => Command::Recover(payload(bytes)?),
            "delschedtask" => Command::DeleteScheduledTask(payload(bytes)?),
            "checkinconfig" => Command::CheckinConfig(payload(bytes)?),
            other => return Err(DecodeError::UnknownFunc(other.to_string())),
        })
    }
}

#[derive(Debug, Error)]
#[error("encode failed: {0}")]
pub struct EncodeError(#[from] rmp_serde::encode::Error);

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed message: {0}")]
    Malformed(#[from] rmp_serde::decode::Error),
    #[error("unknown func: {0}")]
    UnknownFunc(String),
}

/// A command plus its delivery options
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    pub command: Command,
    /// Seconds the agent may spend on the command
    pub timeout: Option<u64>,
    pub run_as_user: Option<bool>,
}

impl Envelope {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            timeout: None,
            run_as_user: None,
        }
    }

    /// The wire carries whole seconds; partial seconds round up, never to zero
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let secs = timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0);
        self.timeout = Some(secs.max(1));
        self
    }

    pub fn with_run_as_user(mut self, run_as_user: bool) -> Self {
        self.run_as_user = Some(run_as_user);
        self
    }

    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let header: Header = rmp_serde::from_slice(bytes)?;
        Ok(Self {
            command: Command::decode_payload(&header.func, bytes)?,
            timeout: header.timeout,
            run_as_user: header.run_as_user,
        })
    }
}

impl From<Command> for Envelope {
    fn from(command: Command) -> Self {
        Envelope::new(command)
    }
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = 1
            + usize::from(self.command.has_payload())
            + usize::from(self.timeout.is_some())
            + usize::from(self.run_as_user.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("func", self.command.func())?;
        self.command.serialize_payload(&mut map)?;
        if let Some(timeout) = &self.timeout {
            map.serialize_entry("timeout", timeout)?;
        }
        if let Some(run_as_user) = &self.run_as_user {
            map.serialize_entry("run_as_user", run_as_user)?;
        }
        map.end()
    }
}

#[derive(Deserialize)]
struct Header {
    func: String,
    #[serde(default)]
    timeout: Option<u64>,
    #[serde(default)]
    run_as_user: Option<bool>,
}

#[derive(Deserialize)]
struct Body<P> {
    payload: P,
}

fn payload<P: DeserializeOwned>(bytes: &[u8]) -> Result<P, DecodeError> {
    let body: Body<P> = rmp_serde::from_slice(bytes)?;
    Ok(body.payload)
}

/// Decode an agent's MessagePack reply into the shape the caller expects
pub fn decode_reply<R: DeserializeOwned>(bytes: &[u8]) -> Result<R, DecodeError> {
    Ok(rmp_serde::from_slice(bytes)?)
}

/// Encode a reply the way agents do; used by fakes and tests
pub fn encode_reply<R: Serialize>(reply: &R) -> Result<Vec<u8>, EncodeError> {
    Ok(rmp_serde::to_vec_named(reply)?)
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
