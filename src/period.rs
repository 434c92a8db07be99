// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Resolution of named periods to concrete, inclusive UTC bounds.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeDelta, Utc, Weekday};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::AnalyticsPeriod;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn contains(&self, t: &DateTime<Utc>) -> bool {
        *t >= self.start && *t <= self.end
    }
}

pub fn resolve_period(
    period: AnalyticsPeriod,
    now: DateTime<Utc>,
    week_start: Weekday,
) -> Result<DateRange> {
    let today = now.date_naive();
    let start = match period {
        AnalyticsPeriod::ThisWeek => start_of_week(today, week_start),
        AnalyticsPeriod::ThisMonth | AnalyticsPeriod::Custom => {
            first_of_month(today.year(), today.month())?
        }
        AnalyticsPeriod::LastMonth => return previous_month(today),
        AnalyticsPeriod::Last3Months => {
            let (y, m) = shift_month(today.year(), today.month(), -3);
            first_of_month(y, m)?
        }
        AnalyticsPeriod::ThisYear => first_of_month(today.year(), 1)?,
    };
    Ok(DateRange {
        start: start_of_day(start)?,
        end: now,
    })
}

/// The window a period is compared against. Only weeks and months have a
/// real predecessor; every other period compares against itself.
pub fn resolve_previous_period(
    period: AnalyticsPeriod,
    now: DateTime<Utc>,
    week_start: Weekday,
) -> Result<DateRange> {
    let today = now.date_naive();
    match period {
        AnalyticsPeriod::ThisWeek => {
            let this_week = start_of_day(start_of_week(today, week_start))?;
            Ok(DateRange {
                start: this_week - Duration::days(7),
                end: this_week - TimeDelta::milliseconds(1),
            })
        }
        AnalyticsPeriod::ThisMonth => previous_month(today),
        other => resolve_period(other, now, week_start),
    }
}

/// 1st of the previous month 00:00:00.000 to its last day 23:59:59.999.
fn previous_month(today: NaiveDate) -> Result<DateRange> {
    let this_month = start_of_day(first_of_month(today.year(), today.month())?)?;
    let (y, m) = shift_month(today.year(), today.month(), -1);
    Ok(DateRange {
        start: start_of_day(first_of_month(y, m)?)?,
        end: this_month - TimeDelta::milliseconds(1),
    })
}

fn start_of_week(today: NaiveDate, week_start: Weekday) -> NaiveDate {
    let back = (7 + today.weekday().num_days_from_monday() - week_start.num_days_from_monday()) % 7;
    today - Duration::days(back as i64)
}

pub(crate) fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let idx = year * 12 + (month as i32 - 1) + delta;
    (idx.div_euclid(12), (idx.rem_euclid(12) + 1) as u32)
}

pub(crate) fn first_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| Error::Invalid(format!("invalid month {year}-{month:02}")))
}

fn start_of_day(d: NaiveDate) -> Result<DateTime<Utc>> {
    d.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| Error::Invalid(format!("invalid date {d}")))
}
