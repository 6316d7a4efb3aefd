// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Alert-template resolution across the ownership hierarchy

mod cache;
mod resolve;

pub use cache::{EntityRef, InvalidationEvent, RebuildReport, TemplateCache, VersionVector};
pub use resolve::{
    resolve_for_agent, resolve_template, Level, LevelSetting, Resolution, ResolveError,
    ResolvedTemplate, TemplateLevels,
};
