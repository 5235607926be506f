// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// A facility in a collaborating organisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalTarget {
    /// Reference of the hosting organisation.
    pub org_ref: String,
    /// Reference of the room in that organisation.
    pub room_ref: String,
}

/// A student's request to book a slot.
///
/// Requests are data only; planning decides whether and how to honour them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationRequest {
    pub user_id: i64,
    pub exam_id: i64,
    /// Local room; ignored when `external` is set.
    pub room_id: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub accessibility_ids: BTreeSet<i64>,
    /// Book in a collaborating organisation instead of locally.
    pub external: Option<ExternalTarget>,
}
