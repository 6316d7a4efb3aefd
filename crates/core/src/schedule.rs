// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Weekday bitmask and recurring-task schedules
//!
//! A weekly schedule is persisted as a 7-bit mask, bit 0 = Monday through
//! bit 6 = Sunday. Day lists from callers may be unordered or contain
//! duplicates, so they are always normalized through the mask before being
//! compared or stored.

use chrono::{DateTime, Datelike, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use thiserror::Error;

/// Day of the week, ordered Monday first
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// Bit position in a [`WeekdayMask`]
    pub fn bit(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        }
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        Weekday::ALL[day.num_days_from_monday() as usize]
    }
}

impl std::fmt::Display for Weekday {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown weekday: {0}")]
pub struct UnknownWeekday(pub String);

impl FromStr for Weekday {
    type Err = UnknownWeekday;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Weekday::ALL
            .into_iter()
            .find(|day| {
                let full = day.name().to_ascii_lowercase();
                lower == full || lower == full[..3]
            })
            .ok_or_else(|| UnknownWeekday(s.to_string()))
    }
}

/// Canonical 7-bit weekday set
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct WeekdayMask(u8);

impl WeekdayMask {
    pub const EVERY_DAY: WeekdayMask = WeekdayMask(0x7F);

    /// Build from stored bits; the unused high bit is dropped
    pub fn from_bits(bits: u8) -> Self {
        Self(bits & 0x7F)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, day: Weekday) -> bool {
        self.0 & (1 << day.bit()) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn days(self) -> BTreeSet<Weekday> {
        mask_to_days(self)
    }
}

impl From<u8> for WeekdayMask {
    fn from(bits: u8) -> Self {
        Self::from_bits(bits)
    }
}

impl From<WeekdayMask> for u8 {
    fn from(mask: WeekdayMask) -> Self {
        mask.0
    }
}

impl FromIterator<Weekday> for WeekdayMask {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        days_to_mask(iter)
    }
}

/// Encode a day list; order and duplicates do not matter
pub fn days_to_mask(days: impl IntoIterator<Item = Weekday>) -> WeekdayMask {
    WeekdayMask(days.into_iter().fold(0, |acc, day| acc | (1 << day.bit())))
}

/// Decode a mask back to its set of days
pub fn mask_to_days(mask: WeekdayMask) -> BTreeSet<Weekday> {
    Weekday::ALL
        .into_iter()
        .filter(|day| mask.contains(*day))
        .collect()
}

/// Parse day names (full or three-letter, any case) into a mask
pub fn parse_days<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<WeekdayMask, UnknownWeekday> {
    let days = names
        .into_iter()
        .map(Weekday::from_str)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(days_to_mask(days))
}

/// When an automated task fires
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskSchedule {
    /// Only runs when triggered by hand
    Manual,
    /// Triggered by a failing check, never by the clock
    CheckFailure,
    Daily {
        time: NaiveTime,
    },
    Weekly {
        days: WeekdayMask,
        time: NaiveTime,
    },
    RunOnce {
        at: DateTime<Utc>,
    },
    /// Runs once on each agent, the first time the engine sees it
    Onboarding,
}

impl TaskSchedule {
    /// Whether the schedule fires at `now` given the last run time.
    ///
    /// Evaluated in UTC at minute granularity. A run already recorded in the
    /// current minute suppresses a second firing.
    pub fn is_due(&self, now: DateTime<Utc>, last_run: Option<DateTime<Utc>>) -> bool {
        match self {
            TaskSchedule::Manual | TaskSchedule::CheckFailure => false,
            TaskSchedule::Onboarding => last_run.is_none(),
            TaskSchedule::RunOnce { at } => {
                now >= *at && last_run.map_or(true, |last| last < *at)
            }
            TaskSchedule::Daily { time } => {
                at_minute(now, *time) && !ran_this_minute(now, last_run)
            }
            TaskSchedule::Weekly { days, time } => {
                days.contains(now.weekday().into())
                    && at_minute(now, *time)
                    && !ran_this_minute(now, last_run)
            }
        }
    }
}

fn at_minute(now: DateTime<Utc>, time: NaiveTime) -> bool {
    now.hour() == time.hour() && now.minute() == time.minute()
}

fn ran_this_minute(now: DateTime<Utc>, last_run: Option<DateTime<Utc>>) -> bool {
    last_run.is_some_and(|last| {
        last.date_naive() == now.date_naive()
            && last.hour() == now.hour()
            && last.minute() == now.minute()
    })
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
