// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Half-open time intervals over absolute instants.

use crate::error::DomainError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A half-open interval `[start, end)` of UTC instants.
///
/// The end is always strictly after the start. Two intervals that merely
/// touch (one ends where the other starts) do not overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawInterval")]
pub struct Interval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

/// Wire shape of an interval before the ordering check.
#[derive(Deserialize)]
struct RawInterval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<RawInterval> for Interval {
    type Error = DomainError;

    fn try_from(raw: RawInterval) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
    }
}

impl Interval {
    /// Creates a new interval.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidInterval` if `end` is not after `start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, DomainError> {
        if end <= start {
            return Err(DomainError::InvalidInterval { start, end });
        }
        Ok(Self { start, end })
    }

    /// Creates an interval starting at `start` and lasting `minutes`.
    ///
    /// # Errors
    ///
    /// Returns an error if `minutes` is not positive or the end overflows.
    pub fn with_duration(start: DateTime<Utc>, minutes: i64) -> Result<Self, DomainError> {
        if minutes <= 0 {
            return Err(DomainError::InvalidDuration(minutes));
        }
        let end: DateTime<Utc> = Duration::try_minutes(minutes)
            .and_then(|duration| start.checked_add_signed(duration))
            .ok_or_else(|| DomainError::DateArithmeticOverflow {
                operation: format!("adding {minutes} minutes to {start}"),
            })?;
        Self::new(start, end)
    }

    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Returns `true` if the two intervals share at least one instant.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Returns `true` if `other` lies entirely within this interval.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Returns `true` if `instant` lies within `[start, end)`.
    #[must_use]
    pub fn contains_instant(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// Sorts intervals and merges any that overlap or touch.
#[must_use]
pub fn merge_intervals(mut intervals: Vec<Interval>) -> Vec<Interval> {
    intervals.sort();
    let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        match merged.last_mut() {
            Some(last) if interval.start <= last.end => {
                if interval.end > last.end {
                    last.end = interval.end;
                }
            }
            _ => merged.push(interval),
        }
    }
    merged
}
