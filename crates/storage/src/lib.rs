// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Durable fleet-run state: a JSONL write-ahead log and the state it replays into

mod state;
mod store;
mod wal;

pub use state::MaterializedState;
pub use store::{Store, StoreError};
pub use wal::{Wal, WalError};
