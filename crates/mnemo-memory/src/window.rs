// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Calendar windows ("today", "this week", "this month") in a fixed local offset.

use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A calendar period anchored to the current time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Period {
    Today,
    /// Since Monday 00:00 local.
    Week,
    /// Since the first of the month, 00:00 local.
    Month,
}

/// Closed interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn contains(&self, ts: &DateTime<Utc>) -> bool {
        *ts >= self.start && *ts <= self.end
    }
}

impl Period {
    /// The window from the start of this period (local time) to `now`.
    pub fn window(self, now: DateTime<Utc>, offset: FixedOffset) -> TimeWindow {
        let today = now.with_timezone(&offset).date_naive();
        let first_day = match self {
            Period::Today => today,
            Period::Week => {
                today - Days::new(u64::from(today.weekday().num_days_from_monday()))
            }
            Period::Month => today - Days::new(u64::from(today.day0())),
        };
        TimeWindow {
            start: local_midnight(first_day, offset),
            end: now,
        }
    }
}

/// 00:00 on `date` in `offset`, as UTC.
fn local_midnight(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let local = date.and_time(chrono::NaiveTime::MIN);
    (local - TimeDelta::seconds(i64::from(offset.local_minus_utc()))).and_utc()
}
