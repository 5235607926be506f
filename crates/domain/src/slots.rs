// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Candidate slot generation.
//!
//! Slots begin only at the room's starting hours (hourly on the hour when
//! none are configured) and must fit entirely inside one open interval.
//! Consecutive slots advance by starting hour, not by exam duration, so
//! slots of a long exam may overlap each other.

use crate::calendar::{open_intervals, resolve_local_exact};
use crate::error::DomainError;
use crate::interval::Interval;
use crate::types::Room;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;

/// Local starting times for a room, ascending and without duplicates.
#[must_use]
pub fn starting_times(room: &Room) -> Vec<NaiveTime> {
    let mut times: Vec<NaiveTime> = if room.starting_hours.is_empty() {
        (0..24)
            .filter_map(|hour| NaiveTime::from_hms_opt(hour, 0, 0))
            .collect()
    } else {
        room.starting_hours
            .iter()
            .map(crate::types::StartingHour::local_time)
            .collect()
    };
    times.sort_unstable();
    times.dedup();
    times
}

/// Starting-hour boundaries on a local date as absolute instants.
///
/// Starting hours that do not exist on the date (DST gap) are skipped.
fn boundaries(tz: Tz, date: NaiveDate, times: &[NaiveTime]) -> Vec<DateTime<Utc>> {
    let mut instants: Vec<DateTime<Utc>> = times
        .iter()
        .filter_map(|time| resolve_local_exact(tz, date.and_time(*time)))
        .collect();
    instants.sort_unstable();
    instants.dedup();
    instants
}

/// Generates the candidate slots of a room on a local date.
///
/// # Arguments
///
/// * `room` - The room
/// * `date` - The local calendar date
/// * `duration_minutes` - Exam duration
/// * `now` - Current instant; no slot starts before it
///
/// # Returns
///
/// Slots in ascending start order.
///
/// # Errors
///
/// Returns an error if the duration is not positive or calendar resolution fails.
pub fn candidate_slots(
    room: &Room,
    date: NaiveDate,
    duration_minutes: i64,
    now: DateTime<Utc>,
) -> Result<Vec<Interval>, DomainError> {
    if duration_minutes <= 0 {
        return Err(DomainError::InvalidDuration(duration_minutes));
    }
    let open: Vec<Interval> = open_intervals(room, date)?;
    if open.is_empty() {
        return Ok(Vec::new());
    }

    let tz: Tz = room.timezone()?;
    let times: Vec<NaiveTime> = starting_times(room);
    let starts: Vec<DateTime<Utc>> = boundaries(tz, date, &times);
    // A duration chrono cannot represent fits no open interval either.
    let Some(duration) = Duration::try_minutes(duration_minutes) else {
        return Ok(Vec::new());
    };

    let mut slots: Vec<Interval> = Vec::new();
    for interval in &open {
        let earliest: DateTime<Utc> = interval.start().max(now);
        for boundary in starts.iter().copied().filter(|b| *b >= earliest) {
            match boundary.checked_add_signed(duration) {
                Some(end) if end <= interval.end() => slots.push(Interval::new(boundary, end)?),
                _ => break,
            }
        }
    }
    slots.sort();
    slots.dedup();
    Ok(slots)
}
