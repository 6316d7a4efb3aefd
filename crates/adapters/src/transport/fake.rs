// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake transport for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{Connection, Transport, TransportError};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Recorded transport call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Connect,
    Publish {
        subject: String,
        payload: Vec<u8>,
    },
    Request {
        subject: String,
        payload: Vec<u8>,
        timeout: Duration,
    },
    Close,
}

#[derive(Default)]
struct FakeState {
    calls: Vec<TransportCall>,
    replies: HashMap<String, Vec<u8>>,
    broken_subjects: HashSet<String>,
    down: bool,
}

/// Fake transport with canned replies
///
/// Subjects without a canned reply never answer: requests to them wait out
/// the timeout. Marking the transport down makes `connect` fail; marking a
/// subject broken makes calls to it fail as if the connection dropped.
#[derive(Clone, Default)]
pub struct FakeTransport {
    state: Arc<Mutex<FakeState>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply to requests on `subject` with `reply`
    pub fn reply(&self, subject: &str, reply: Vec<u8>) {
        self.lock().replies.insert(subject.to_string(), reply);
    }

    /// Make calls to `subject` fail with `Down`
    pub fn break_subject(&self, subject: &str) {
        self.lock().broken_subjects.insert(subject.to_string());
    }

    /// Make subsequent connects fail
    pub fn set_down(&self, down: bool) {
        self.lock().down = down;
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<TransportCall> {
        self.lock().calls.clone()
    }

    /// Subjects published to, in call order
    pub fn published(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                TransportCall::Publish { subject, .. } => Some(subject.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn connect_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, TransportCall::Connect))
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Transport for FakeTransport {
    type Conn = FakeConnection;

    async fn connect(&self) -> Result<FakeConnection, TransportError> {
        let mut state = self.lock();
        state.calls.push(TransportCall::Connect);
        if state.down {
            return Err(TransportError::Down("connection refused".to_string()));
        }
        Ok(FakeConnection {
            transport: self.clone(),
        })
    }
}

/// Connection handed out by [`FakeTransport`]
pub struct FakeConnection {
    transport: FakeTransport,
}

#[async_trait]
impl Connection for FakeConnection {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        let mut state = self.transport.lock();
        state.calls.push(TransportCall::Publish {
            subject: subject.to_string(),
            payload,
        });
        if state.broken_subjects.contains(subject) {
            return Err(TransportError::Down(format!("broken pipe on {subject}")));
        }
        Ok(())
    }

    async fn request(
        &self,
        subject: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        let reply = {
            let mut state = self.transport.lock();
            state.calls.push(TransportCall::Request {
                subject: subject.to_string(),
                payload,
                timeout,
            });
            if state.broken_subjects.contains(subject) {
                return Err(TransportError::Down(format!("broken pipe on {subject}")));
            }
            state.replies.get(subject).cloned()
        };

        match reply {
            Some(reply) => Ok(reply),
            None => {
                tokio::time::sleep(timeout).await;
                Err(TransportError::Timeout)
            }
        }
    }

    async fn close(self) -> Result<(), TransportError> {
        self.transport.lock().calls.push(TransportCall::Close);
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
