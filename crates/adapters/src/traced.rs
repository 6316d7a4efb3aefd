// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::transport::{Connection, Transport, TransportError};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::Instrument;

/// Wrapper that adds tracing to any Transport
#[derive(Clone)]
pub struct TracedTransport<T> {
    inner: T,
}

impl<T> TracedTransport<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<T: Transport> Transport for TracedTransport<T> {
    type Conn = TracedConnection<T::Conn>;

    async fn connect(&self) -> Result<Self::Conn, TransportError> {
        let span = tracing::info_span!("transport.connect");
        async {
            let start = Instant::now();
            let result = self.inner.connect().await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(inner) => {
                    tracing::debug!(elapsed_ms, "connected");
                    Ok(TracedConnection { inner })
                }
                Err(e) => {
                    tracing::error!(elapsed_ms, error = %e, "connect failed");
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }
}

/// Connection wrapper produced by [`TracedTransport`]
pub struct TracedConnection<C> {
    inner: C,
}

#[async_trait]
impl<C: Connection> Connection for TracedConnection<C> {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        let span = tracing::info_span!("transport.publish", subject, bytes = payload.len());
        async {
            let start = Instant::now();
            let result = self.inner.publish(subject, payload).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(()) => tracing::trace!(elapsed_ms, "published"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "publish failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn request(
        &self,
        subject: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        let span = tracing::info_span!(
            "transport.request",
            subject,
            bytes = payload.len(),
            timeout_ms = timeout.as_millis() as u64
        );
        async {
            let start = Instant::now();
            let result = self.inner.request(subject, payload, timeout).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(reply) => tracing::debug!(elapsed_ms, reply_bytes = reply.len(), "replied"),
                // Silent agents are routine
                Err(TransportError::Timeout) => tracing::warn!(elapsed_ms, "no reply"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "request failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn close(self) -> Result<(), TransportError> {
        let result = self.inner.close().await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "close failed");
        }
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
