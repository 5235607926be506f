// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Resolution of the date range searched by a slot query.
//!
//! A query names one day; the search covers the ISO week (Monday to Sunday)
//! containing it, narrowed to the bookable range.
//!
//! ## Rules
//!
//! - A requested day before today is silently moved to today.
//! - A week ending before the exam's first day is rejected.
//! - The range starts no earlier than today and the exam's first day.
//! - The range ends at the soonest of the week's Sunday, the exam's last day
//!   and today plus the reservation window.
//! - A range that would start after it ends is rejected.

use crate::calendar::local_date;
use crate::config::SchedulingConfig;
use crate::error::DomainError;
use crate::types::Exam;
use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use chrono_tz::Tz;

/// Format of the per-day keys in slot query results.
pub const DATE_KEY_FORMAT: &str = "%d.%m.%Y";

/// Inclusive range of local dates to search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchWindow {
    first_day: NaiveDate,
    last_day: NaiveDate,
}

impl SearchWindow {
    #[must_use]
    pub const fn first_day(&self) -> NaiveDate {
        self.first_day
    }

    #[must_use]
    pub const fn last_day(&self) -> NaiveDate {
        self.last_day
    }

    /// Every day of the window in ascending order.
    #[must_use]
    pub fn days(&self) -> Vec<NaiveDate> {
        self.first_day
            .iter_days()
            .take_while(|day| *day <= self.last_day)
            .collect()
    }
}

/// Formats a local date as a result key (`dd.MM.yyyy`).
#[must_use]
pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

/// Parses a requested search day in ISO `yyyy-MM-dd` form.
///
/// # Errors
///
/// Returns `DomainError::DateParseError` if the string is not a valid date.
pub fn parse_search_date(value: &str) -> Result<NaiveDate, DomainError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| DomainError::DateParseError {
        date_string: value.to_string(),
        error: e.to_string(),
    })
}

fn overflow(operation: &str) -> DomainError {
    DomainError::DateArithmeticOverflow {
        operation: operation.to_string(),
    }
}

/// Resolves the days a slot query searches.
///
/// # Arguments
///
/// * `requested` - The requested day, or `None` for today
/// * `exam` - The exam being booked
/// * `tz` - The room's time zone
/// * `config` - Scheduling settings
/// * `now` - Current instant
///
/// # Errors
///
/// Returns `DomainError::SearchDateOutOfRange` if the requested week lies
/// entirely before the exam or starts after the latest bookable day, and
/// `DomainError::DateArithmeticOverflow` if the week or the horizon falls
/// outside the calendar.
pub fn resolve_search_window(
    requested: Option<NaiveDate>,
    exam: &Exam,
    tz: Tz,
    config: &SchedulingConfig,
    now: DateTime<Utc>,
) -> Result<SearchWindow, DomainError> {
    let today: NaiveDate = local_date(now, tz);
    let day: NaiveDate = requested.map_or(today, |d| d.max(today));

    let week_start: NaiveDate = day
        .checked_sub_days(Days::new(u64::from(day.weekday().num_days_from_monday())))
        .ok_or_else(|| overflow("week start"))?;
    let week_end: NaiveDate = week_start
        .checked_add_days(Days::new(6))
        .ok_or_else(|| overflow("week end"))?;

    let exam_first_day: NaiveDate = local_date(exam.period_start, tz);
    let exam_last_day: NaiveDate = local_date(exam.period_end, tz);
    let horizon: NaiveDate = u64::try_from(config.reservation_window_days())
        .ok()
        .and_then(|days| today.checked_add_days(Days::new(days)))
        .ok_or_else(|| overflow("reservation window"))?;
    let latest: NaiveDate = exam_last_day.min(horizon);

    if week_end < exam_first_day {
        return Err(DomainError::SearchDateOutOfRange {
            requested: week_start,
            earliest: exam_first_day.max(today),
            latest,
        });
    }

    let first_day: NaiveDate = week_start.max(today).max(exam_first_day);
    if first_day > latest {
        return Err(DomainError::SearchDateOutOfRange {
            requested: week_start,
            earliest: exam_first_day.max(today),
            latest,
        });
    }

    Ok(SearchWindow {
        first_day,
        last_day: week_end.min(latest),
    })
}
