// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command dispatcher
//!
//! Each call is one batch: every payload is encoded up front, a single
//! connection is opened lazily, all targets are driven concurrently over it,
//! and the connection is closed once the batch is joined. A broken
//! connection fails the whole batch.

use crate::error::DispatchError;
use fw_adapters::{Connection, Transport, TransportError, DEFAULT_REQUEST_TIMEOUT};
use fw_core::{decode_reply, AgentId, Command, Effect, Envelope};
use futures::future::try_join_all;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::Instrument;

/// Per-target outcome of a request batch
pub type Replies<R> = Vec<(AgentId, Result<R, DispatchError>)>;

/// Sends commands to agents over a [`Transport`]
#[derive(Clone)]
pub struct Dispatcher<T> {
    transport: T,
    request_timeout: Duration,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Default window for request/reply calls
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Fire-and-forget: publish each envelope to its agent.
    ///
    /// Returns the number of publishes issued. Delivery is not confirmed.
    pub async fn broadcast(&self, batch: Vec<(AgentId, Envelope)>) -> Result<usize, DispatchError> {
        if batch.is_empty() {
            return Ok(0);
        }
        let encoded = batch
            .into_iter()
            .map(|(agent, envelope)| Ok((agent, envelope.encode()?)))
            .collect::<Result<Vec<_>, DispatchError>>()?;
        let count = encoded.len();

        let span = tracing::info_span!("dispatch.broadcast", targets = count);
        async {
            let conn = self.transport.connect().await?;
            let shared = &conn;
            let result = try_join_all(encoded.into_iter().map(|(agent, payload)| async move {
                shared.publish(agent.as_str(), payload).await
            }))
            .await;
            finish(conn, result).await?;
            tracing::info!(count, "broadcast issued");
            Ok::<_, DispatchError>(count)
        }
        .instrument(span)
        .await
    }

    /// Publish the same command to every agent
    pub async fn broadcast_command(
        &self,
        agents: &[AgentId],
        command: &Command,
    ) -> Result<usize, DispatchError> {
        let batch = agents
            .iter()
            .map(|agent| (agent.clone(), Envelope::new(command.clone())))
            .collect();
        self.broadcast(batch).await
    }

    /// Broadcast every `Dispatch` effect in `effects`
    pub async fn dispatch_effects(&self, effects: &[Effect]) -> Result<usize, DispatchError> {
        let batch = effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::Dispatch { agent, command } => {
                    Some((agent.clone(), Envelope::new(command.clone())))
                }
                Effect::Emit(_) => None,
            })
            .collect();
        self.broadcast(batch).await
    }

    /// Request/reply to one agent.
    ///
    /// Uses the envelope's own timeout when set, else the dispatcher default.
    pub async fn request<R: DeserializeOwned>(
        &self,
        agent: &AgentId,
        envelope: Envelope,
    ) -> Result<R, DispatchError> {
        let mut replies = self.request_many(vec![(agent.clone(), envelope)]).await?;
        match replies.pop() {
            Some((_, reply)) => reply,
            None => Err(DispatchError::Timeout),
        }
    }

    /// Request/reply to many agents concurrently over one connection.
    ///
    /// Timeouts and malformed replies are reported per agent; a transport
    /// failure fails the batch.
    pub async fn request_many<R: DeserializeOwned>(
        &self,
        batch: Vec<(AgentId, Envelope)>,
    ) -> Result<Replies<R>, DispatchError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        let encoded = batch
            .into_iter()
            .map(|(agent, envelope)| {
                let timeout = envelope
                    .timeout
                    .map(Duration::from_secs)
                    .unwrap_or(self.request_timeout);
                Ok((agent, envelope.encode()?, timeout))
            })
            .collect::<Result<Vec<_>, DispatchError>>()?;

        let span = tracing::info_span!("dispatch.request", targets = encoded.len());
        async {
            let conn = self.transport.connect().await?;
            let shared = &conn;
            let result = try_join_all(encoded.into_iter().map(|(agent, payload, timeout)| {
                async move {
                    match shared.request(agent.as_str(), payload, timeout).await {
                        Ok(bytes) => {
                            let reply = decode_reply::<R>(&bytes).map_err(DispatchError::from);
                            Ok((agent, reply))
                        }
                        Err(TransportError::Timeout) => Ok((agent, Err(DispatchError::Timeout))),
                        Err(e) => Err(e),
                    }
                }
            }))
            .await;
            let replies = finish(conn, result).await?;
            let timeouts = replies
                .iter()
                .filter(|(_, r)| matches!(r, Err(DispatchError::Timeout)))
                .count();
            tracing::info!(replies = replies.len() - timeouts, timeouts, "requests joined");
            Ok::<_, DispatchError>(replies)
        }
        .instrument(span)
        .await
    }
}

/// Close the batch connection and surface the batch result
async fn finish<C: Connection, V>(
    conn: C,
    result: Result<V, TransportError>,
) -> Result<V, DispatchError> {
    match result {
        Ok(value) => {
            conn.close().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(close_err) = conn.close().await {
                tracing::debug!(error = %close_err, "close after failed batch");
            }
            tracing::error!(error = %e, "batch aborted");
            Err(e.into())
        }
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
