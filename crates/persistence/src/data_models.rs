// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use exam_slots_domain::{Interval, Reservation};

use crate::error::PersistenceError;

/// Storage format of times of day.
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// Storage format of calendar dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Result of binding a new reservation to an enrolment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedReservation {
    pub reservation: Reservation,
    /// The reservation the enrolment held before.
    ///
    /// A previous local reservation has been deleted. A previous external
    /// reservation is left unbound until the remote side confirms its
    /// cancellation.
    pub previous: Option<Reservation>,
}

/// Result of moving a reservation to another machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineChange {
    pub previous_machine_id: Option<i64>,
    pub reservation: Reservation,
}

/// Result of recording a no-show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoShowOutcome {
    pub reservation: Reservation,
    /// Whether the reservation was deleted and the enrolment unbound.
    pub released: bool,
}

pub(crate) fn instant_from_row(
    seconds: i64,
    table: &'static str,
) -> Result<DateTime<Utc>, PersistenceError> {
    DateTime::<Utc>::from_timestamp(seconds, 0).ok_or_else(|| PersistenceError::CorruptRow {
        table,
        reason: format!("timestamp {seconds} is out of range"),
    })
}

pub(crate) fn interval_from_row(
    start: i64,
    end: i64,
    table: &'static str,
) -> Result<Interval, PersistenceError> {
    let start: DateTime<Utc> = instant_from_row(start, table)?;
    let end: DateTime<Utc> = instant_from_row(end, table)?;
    Interval::new(start, end).map_err(|e| PersistenceError::CorruptRow {
        table,
        reason: e.to_string(),
    })
}

pub(crate) fn time_from_row(
    value: &str,
    table: &'static str,
) -> Result<NaiveTime, PersistenceError> {
    NaiveTime::parse_from_str(value, TIME_FORMAT).map_err(|e| PersistenceError::CorruptRow {
        table,
        reason: format!("time '{value}': {e}"),
    })
}

pub(crate) fn date_from_row(
    value: &str,
    table: &'static str,
) -> Result<NaiveDate, PersistenceError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|e| PersistenceError::CorruptRow {
        table,
        reason: format!("date '{value}': {e}"),
    })
}

pub(crate) fn time_to_row(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

pub(crate) fn date_to_row(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn flag(value: bool) -> i32 {
    i32::from(value)
}
