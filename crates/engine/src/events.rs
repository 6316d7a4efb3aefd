// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event logging for state-machine effects

use fw_core::{Effect, Event};

/// Log every `Emit` effect; dispatch effects are carried out by the caller
pub(crate) fn emit(effects: &[Effect]) {
    for effect in effects {
        if let Effect::Emit(event) = effect {
            log_event(event);
        }
    }
}

fn log_event(event: &Event) {
    match event {
        Event::TaskLockReleased { stale: true, .. } | Event::AlertRaised { .. } => {
            tracing::warn!(event = event.name(), ?event, "event")
        }
        _ => tracing::info!(event = event.name(), ?event, "event"),
    }
}
