// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Opaque inventory blobs pushed by agents
//!
//! The collector decides the internal structure. We only store the bytes,
//! optionally gzip-compressed, and offer substring search over their text.

use crate::fleet::AgentId;
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryKind {
    Services,
    Processes,
    Hardware,
    EventLog,
    Software,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryBlob {
    pub agent_id: AgentId,
    pub kind: InventoryKind,
    pub collected_at: DateTime<Utc>,
    pub compressed: bool,
    pub data: Vec<u8>,
}

impl InventoryBlob {
    pub fn raw(agent_id: AgentId, kind: InventoryKind, data: Vec<u8>, now: DateTime<Utc>) -> Self {
        Self {
            agent_id,
            kind,
            collected_at: now,
            compressed: false,
            data,
        }
    }

    /// Gzip `text` into a new blob
    pub fn compress(
        agent_id: AgentId,
        kind: InventoryKind,
        text: &str,
        now: DateTime<Utc>,
    ) -> io::Result<Self> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes())?;
        Ok(Self {
            agent_id,
            kind,
            collected_at: now,
            compressed: true,
            data: encoder.finish()?,
        })
    }

    /// Decompressed contents as text; invalid UTF-8 is replaced
    pub fn text(&self) -> io::Result<String> {
        if !self.compressed {
            return Ok(String::from_utf8_lossy(&self.data).into_owned());
        }
        let mut bytes = Vec::new();
        GzDecoder::new(self.data.as_slice()).read_to_end(&mut bytes)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Case-insensitive substring search
    pub fn contains(&self, needle: &str) -> io::Result<bool> {
        Ok(self.text()?.to_lowercase().contains(&needle.to_lowercase()))
    }
}
