// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! NATS transport

use super::{Connection, Transport, TransportError};
use async_nats::{ConnectOptions, RequestErrorKind};
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

/// Connection settings for the NATS broker
#[derive(Clone, Debug)]
pub struct NatsOptions {
    pub url: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub client_name: String,
    pub connect_timeout: Duration,
}

impl NatsOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user: None,
            password: None,
            client_name: "fwd".to_string(),
            connect_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Transport backed by a NATS broker
#[derive(Clone, Debug)]
pub struct NatsTransport {
    options: NatsOptions,
}

impl NatsTransport {
    pub fn new(options: NatsOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Transport for NatsTransport {
    type Conn = NatsConnection;

    async fn connect(&self) -> Result<NatsConnection, TransportError> {
        let mut opts = ConnectOptions::new()
            .name(&self.options.client_name)
            .connection_timeout(self.options.connect_timeout)
            // The client default would cap every request at 10s; only the
            // caller's timeout applies
            .request_timeout(None);
        if let (Some(user), Some(password)) = (&self.options.user, &self.options.password) {
            opts = opts.user_and_password(user.clone(), password.clone());
        }

        let client = opts
            .connect(self.options.url.as_str())
            .await
            .map_err(|e| TransportError::Down(e.to_string()))?;
        Ok(NatsConnection { client })
    }
}

pub struct NatsConnection {
    client: async_nats::Client,
}

#[async_trait]
impl Connection for NatsConnection {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        self.client
            .publish(subject.to_string(), Bytes::from(payload))
            .await
            .map_err(|e| TransportError::Down(e.to_string()))
    }

    async fn request(
        &self,
        subject: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        let call = self.client.request(subject.to_string(), Bytes::from(payload));
        match tokio::time::timeout(timeout, call).await {
            Err(_) => Err(TransportError::Timeout),
            Ok(Ok(message)) => Ok(message.payload.to_vec()),
            Ok(Err(e)) => match e.kind() {
                // An agent that is not subscribed looks the same as one that never answers
                RequestErrorKind::TimedOut | RequestErrorKind::NoResponders => {
                    Err(TransportError::Timeout)
                }
                _ => Err(TransportError::Down(e.to_string())),
            },
        }
    }

    async fn close(self) -> Result<(), TransportError> {
        self.client
            .flush()
            .await
            .map_err(|e| TransportError::Down(e.to_string()))
    }
}

#[cfg(test)]
#[path = "nats_tests.rs"]
mod tests;
