// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Standard-offset normalization for display and notification payloads.
//!
//! Slot and reservation arithmetic never uses this. It exists only for
//! consumers that expect times expressed against the zone's standard
//! (non-daylight) offset.

use chrono::{DateTime, Duration, Offset, TimeZone, Utc};
use chrono_tz::{OffsetComponents, Tz};

/// Returns `true` if the zone observes daylight saving time at `instant`.
#[must_use]
pub fn is_daylight_saving(instant: DateTime<Utc>, tz: Tz) -> bool {
    tz.offset_from_utc_datetime(&instant.naive_utc()).dst_offset() != Duration::zero()
}

/// Moves an instant back by the zone's daylight saving amount when daylight
/// saving is in effect at that instant.
///
/// Instants at standard offset are returned unchanged.
#[must_use]
pub fn normalize_to_standard_offset(instant: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let offset = tz.offset_from_utc_datetime(&instant.naive_utc());
    let dst: Duration = offset.dst_offset();
    if dst == Duration::zero() {
        return instant;
    }
    instant - dst
}

/// The zone's total UTC offset at `instant`, in minutes.
#[must_use]
pub fn offset_minutes(instant: DateTime<Utc>, tz: Tz) -> i32 {
    tz.offset_from_utc_datetime(&instant.naive_utc())
        .fix()
        .local_minus_utc()
        / 60
}
