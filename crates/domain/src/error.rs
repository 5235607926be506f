// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::config::MAX_RESERVATION_WINDOW_DAYS;
use crate::validation::MAX_EXAM_DURATION_MINUTES;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};

/// Errors that can occur during domain validation and calendar arithmetic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The time zone identifier is not a known IANA zone.
    InvalidTimezone(String),
    /// An interval whose end does not come after its start.
    InvalidInterval {
        /// The interval start.
        start: DateTime<Utc>,
        /// The interval end.
        end: DateTime<Utc>,
    },
    /// Two opening-hour blocks on the same weekday overlap.
    OverlappingOpeningHours {
        /// The weekday on which the overlap was found.
        weekday: Weekday,
    },
    /// An opening-hour or exception block closes before it opens.
    InvalidOpeningHours {
        /// Description of the problem.
        reason: String,
    },
    /// A stored lifecycle state string is not recognised.
    UnknownState(String),
    /// Exam duration outside `1..=MAX_EXAM_DURATION_MINUTES`.
    InvalidDuration(i64),
    /// Reservation window outside `1..=MAX_RESERVATION_WINDOW_DAYS`.
    InvalidReservationWindow(i64),
    /// Failed to parse a date from a string.
    DateParseError {
        /// The invalid date string.
        date_string: String,
        /// The parsing error message.
        error: String,
    },
    /// The requested search date lies outside the bookable range.
    SearchDateOutOfRange {
        /// The first day of the requested search week.
        requested: NaiveDate,
        /// The earliest bookable day.
        earliest: NaiveDate,
        /// The latest bookable day.
        latest: NaiveDate,
    },
    /// A local wall-clock time has no instant on the given date (DST gap).
    NonexistentLocalTime {
        /// The local date.
        date: NaiveDate,
        /// The local time.
        time: NaiveTime,
    },
    /// Date arithmetic overflow.
    DateArithmeticOverflow {
        /// Description of the operation that failed.
        operation: String,
    },
    /// The requested reservation window is not acceptable.
    InvalidRequestedWindow {
        /// Description of the problem.
        reason: String,
    },
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTimezone(tz) => write!(f, "Invalid time zone: '{tz}'"),
            Self::InvalidInterval { start, end } => {
                write!(f, "Invalid interval: end {end} is not after start {start}")
            }
            Self::OverlappingOpeningHours { weekday } => {
                write!(f, "Opening hours overlap on {weekday}")
            }
            Self::InvalidOpeningHours { reason } => write!(f, "Invalid opening hours: {reason}"),
            Self::UnknownState(state) => write!(f, "Unknown lifecycle state: '{state}'"),
            Self::InvalidDuration(minutes) => {
                write!(
                    f,
                    "Invalid exam duration: {minutes} minutes. Must be between 1 and {MAX_EXAM_DURATION_MINUTES}"
                )
            }
            Self::InvalidReservationWindow(days) => {
                write!(
                    f,
                    "Invalid reservation window: {days} days. Must be between 1 and {MAX_RESERVATION_WINDOW_DAYS}"
                )
            }
            Self::DateParseError { date_string, error } => {
                write!(f, "Failed to parse date '{date_string}': {error}")
            }
            Self::SearchDateOutOfRange {
                requested,
                earliest,
                latest,
            } => {
                write!(
                    f,
                    "Search date {requested} is outside the bookable range {earliest}..={latest}"
                )
            }
            Self::NonexistentLocalTime { date, time } => {
                write!(f, "Local time {time} does not exist on {date}")
            }
            Self::DateArithmeticOverflow { operation } => {
                write!(f, "Date arithmetic overflow while {operation}")
            }
            Self::InvalidRequestedWindow { reason } => {
                write!(f, "Invalid reservation window: {reason}")
            }
        }
    }
}

impl std::error::Error for DomainError {}
