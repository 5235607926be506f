// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::error::DomainError;
use crate::interval::Interval;
use crate::types::{Exam, ExceptionKind, OpeningHours, Room};
use chrono::{DateTime, NaiveTime, Timelike, Utc, Weekday};
use std::collections::BTreeMap;

/// Longest exam a room can host; slots never span more than one day.
pub const MAX_EXAM_DURATION_MINUTES: i64 = 24 * 60;

/// Validates an exam duration.
///
/// # Errors
///
/// Returns `DomainError::InvalidDuration` unless the duration is between 1
/// and `MAX_EXAM_DURATION_MINUTES`.
pub fn validate_exam_duration(duration_minutes: i64) -> Result<(), DomainError> {
    if (1..=MAX_EXAM_DURATION_MINUTES).contains(&duration_minutes) {
        Ok(())
    } else {
        Err(DomainError::InvalidDuration(duration_minutes))
    }
}

/// Minutes since local midnight, with 00:00 as a closing time meaning 24:00.
fn closing_minute(time: NaiveTime) -> u32 {
    if time == NaiveTime::MIN {
        24 * 60
    } else {
        time.num_seconds_from_midnight() / 60
    }
}

fn opening_minute(time: NaiveTime) -> u32 {
    time.num_seconds_from_midnight() / 60
}

/// Validates a room's weekly opening-hours blocks.
///
/// # Arguments
///
/// * `hours` - The weekly blocks of one room
///
/// # Errors
///
/// Returns an error if:
/// - A block closes at or before it opens
/// - Two blocks on the same weekday overlap
pub fn validate_opening_hours(hours: &[OpeningHours]) -> Result<(), DomainError> {
    let mut by_weekday: BTreeMap<u32, (Weekday, Vec<(u32, u32)>)> = BTreeMap::new();
    for block in hours {
        let start: u32 = opening_minute(block.local_start());
        let end: u32 = closing_minute(block.local_end());
        if end <= start {
            return Err(DomainError::InvalidOpeningHours {
                reason: format!(
                    "block on {} closes at {} before opening at {}",
                    block.weekday(),
                    block.local_end(),
                    block.local_start()
                ),
            });
        }
        by_weekday
            .entry(block.weekday().num_days_from_monday())
            .or_insert_with(|| (block.weekday(), Vec::new()))
            .1
            .push((start, end));
    }

    for (weekday, mut blocks) in by_weekday.into_values() {
        blocks.sort_unstable();
        if blocks.windows(2).any(|pair| pair[1].0 < pair[0].1) {
            return Err(DomainError::OverlappingOpeningHours { weekday });
        }
    }
    Ok(())
}

/// Validates a room's configuration.
///
/// # Errors
///
/// Returns an error if:
/// - The time zone is unknown
/// - The weekly blocks are invalid or overlap
/// - An exception's date range is reversed or its window is empty
pub fn validate_room(room: &Room) -> Result<(), DomainError> {
    room.timezone()?;
    validate_opening_hours(&room.opening_hours)?;

    for exception in &room.exceptions {
        if exception.last_day < exception.first_day {
            return Err(DomainError::InvalidOpeningHours {
                reason: format!(
                    "exception ends on {} before it starts on {}",
                    exception.last_day, exception.first_day
                ),
            });
        }
        if let ExceptionKind::Open { opens, closes } = exception.kind
            && closing_minute(closes) <= opening_minute(opens)
        {
            return Err(DomainError::InvalidOpeningHours {
                reason: format!("exception window {opens}-{closes} is empty"),
            });
        }
    }
    Ok(())
}

/// Validates a requested reservation window against the exam.
///
/// # Arguments
///
/// * `start` - Requested start
/// * `end` - Requested end
/// * `exam` - The exam being booked
///
/// # Returns
///
/// The requested window as an interval.
///
/// # Errors
///
/// Returns an error if:
/// - The end is not after the start
/// - The length differs from the exam duration
/// - The window falls outside the exam period
pub fn validate_requested_window(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    exam: &Exam,
) -> Result<Interval, DomainError> {
    let interval: Interval = Interval::new(start, end)?;
    if interval.duration().num_minutes() != exam.duration_minutes {
        return Err(DomainError::InvalidRequestedWindow {
            reason: format!(
                "window lasts {} minutes but the exam lasts {} minutes",
                interval.duration().num_minutes(),
                exam.duration_minutes
            ),
        });
    }
    if start < exam.period_start || end > exam.period_end {
        return Err(DomainError::InvalidRequestedWindow {
            reason: format!(
                "window {interval} is outside the exam period {} - {}",
                exam.period_start.to_rfc3339(),
                exam.period_end.to_rfc3339()
            ),
        });
    }
    Ok(interval)
}
