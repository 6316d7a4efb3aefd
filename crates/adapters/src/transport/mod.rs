// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pub-sub transport adapters
//!
//! Every agent listens on its own subject. A [`Transport`] hands out
//! [`Connection`]s; callers open one per batch and close it afterwards.

mod nats;

pub use nats::{NatsConnection, NatsOptions, NatsTransport};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeConnection, FakeTransport, TransportCall};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Request timeout used when the caller does not supply one
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from transport operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The broker is unreachable or the connection broke mid-call
    #[error("transport down: {0}")]
    Down(String),
    /// No reply arrived within the request window
    #[error("request timed out")]
    Timeout,
}

/// Factory for broker connections
#[async_trait]
pub trait Transport: Clone + Send + Sync + 'static {
    type Conn: Connection;

    /// Open a new connection to the broker
    async fn connect(&self) -> Result<Self::Conn, TransportError>;
}

/// An open broker connection, shared by every call in one batch
#[async_trait]
pub trait Connection: Send + Sync + 'static {
    /// Fire-and-forget publish
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), TransportError>;

    /// Publish and wait for a single reply
    async fn request(
        &self,
        subject: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError>;

    /// Flush outstanding publishes and release the connection
    async fn close(self) -> Result<(), TransportError>
    where
        Self: Sized;
}
