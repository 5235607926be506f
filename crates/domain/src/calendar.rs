// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Calendar primitives: resolving a room's opening hours for a date.
//!
//! ## Resolution order
//!
//! 1. A room that is out of service or inactive has no open intervals.
//! 2. A closed exception covering the date closes the room all day, even if
//!    open exceptions also cover the date.
//! 3. Open exceptions covering the date replace the weekly blocks.
//! 4. Otherwise the weekly blocks for the date's weekday apply.
//!
//! Local wall-clock windows are converted to UTC using the room's zone rules
//! for that specific date. A local time that falls into a DST gap is moved
//! forward to the first instant that exists. An ambiguous local time resolves
//! to its earlier instant.

use crate::error::DomainError;
use crate::interval::{Interval, merge_intervals};
use crate::types::{ExceptionKind, Room};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Largest DST gap searched when moving a nonexistent local time forward.
const MAX_GAP_MINUTES: i64 = 180;

/// Returns the local calendar date of an instant in the given zone.
#[must_use]
pub fn local_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// Resolves a local date and time to an instant, if it exists.
///
/// Ambiguous times resolve to the earlier instant; times in a DST gap yield `None`.
#[must_use]
pub fn resolve_local_exact(tz: Tz, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&local)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Resolves a local date and time to an instant, moving forward out of DST gaps.
///
/// # Errors
///
/// Returns `DomainError::NonexistentLocalTime` if no instant exists within
/// the searched range after `local`.
pub fn resolve_local_forward(tz: Tz, local: NaiveDateTime) -> Result<DateTime<Utc>, DomainError> {
    if let Some(instant) = resolve_local_exact(tz, local) {
        return Ok(instant);
    }
    let mut minutes: i64 = 1;
    while minutes <= MAX_GAP_MINUTES {
        let Some(candidate) = local.checked_add_signed(Duration::minutes(minutes)) else {
            break;
        };
        if let Some(instant) = resolve_local_exact(tz, candidate) {
            return Ok(instant);
        }
        minutes += 1;
    }
    Err(DomainError::NonexistentLocalTime {
        date: local.date(),
        time: local.time(),
    })
}

/// Converts a local wall-clock window on `date` to an absolute interval.
///
/// A closing time of 00:00 means the end of the day. Returns `Ok(None)` for
/// an empty window.
///
/// # Errors
///
/// Returns an error if either bound cannot be resolved in the zone.
pub fn local_window(
    tz: Tz,
    date: NaiveDate,
    opens: NaiveTime,
    closes: NaiveTime,
) -> Result<Option<Interval>, DomainError> {
    let local_start: NaiveDateTime = date.and_time(opens);
    let local_end: NaiveDateTime = if closes == NaiveTime::MIN {
        let next: NaiveDate = date
            .succ_opt()
            .ok_or_else(|| DomainError::DateArithmeticOverflow {
                operation: format!("computing the day after {date}"),
            })?;
        next.and_time(NaiveTime::MIN)
    } else {
        date.and_time(closes)
    };
    if local_end <= local_start {
        return Ok(None);
    }

    let start: DateTime<Utc> = resolve_local_forward(tz, local_start)?;
    let end: DateTime<Utc> = resolve_local_forward(tz, local_end)?;
    if end <= start {
        return Ok(None);
    }
    Interval::new(start, end).map(Some)
}

/// Computes the open intervals of a room on a local calendar date.
///
/// # Arguments
///
/// * `room` - The room, including its weekly blocks and exceptions
/// * `date` - The calendar date in the room's time zone
///
/// # Returns
///
/// Sorted, non-overlapping intervals. Empty when the room is closed.
///
/// # Errors
///
/// Returns an error if the room's time zone is unknown or a boundary cannot
/// be resolved.
pub fn open_intervals(room: &Room, date: NaiveDate) -> Result<Vec<Interval>, DomainError> {
    if !room.is_operative() {
        return Ok(Vec::new());
    }
    let tz: Tz = room.timezone()?;

    let mut closed: bool = false;
    let mut exception_windows: Vec<(NaiveTime, NaiveTime)> = Vec::new();
    for exception in room.exceptions.iter().filter(|e| e.covers(date)) {
        match exception.kind {
            ExceptionKind::Closed => closed = true,
            ExceptionKind::Open { opens, closes } => exception_windows.push((opens, closes)),
        }
    }
    if closed {
        return Ok(Vec::new());
    }

    let windows: Vec<(NaiveTime, NaiveTime)> = if exception_windows.is_empty() {
        room.opening_hours
            .iter()
            .filter(|block| block.weekday() == date.weekday())
            .map(|block| (block.local_start(), block.local_end()))
            .collect()
    } else {
        exception_windows
    };

    let mut intervals: Vec<Interval> = Vec::with_capacity(windows.len());
    for (opens, closes) in windows {
        if let Some(interval) = local_window(tz, date, opens, closes)? {
            intervals.push(interval);
        }
    }
    Ok(merge_intervals(intervals))
}
