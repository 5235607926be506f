// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Conflict classification of candidate slots.
//!
//! ## Precedence
//!
//! For a candidate slot overlapping the user's own reservations:
//!
//! 1. A reservation for a different exam yields a conflict entry carrying
//!    that reservation's interval and the other exam's name.
//! 2. A reservation for the same exam yields an own-reservation entry
//!    carrying that reservation's interval, whether or not it equals the slot.
//!
//! Everything else is counted: a machine is available unless a different
//! user holds an overlapping reservation on it. Slots overlapping a
//! maintenance period are dropped. A zero count is still reported.
//!
//! Entries are collapsed by exact interval, keeping the strongest
//! classification, and returned in chronological order.

use crate::interval::Interval;
use crate::types::{MaintenancePeriod, Machine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One of the querying user's existing reservations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserReservation {
    pub reservation_id: i64,
    pub exam_id: i64,
    pub exam_name: String,
    pub interval: Interval,
}

/// A reservation occupying a machine, for availability counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineBooking {
    pub reservation_id: i64,
    pub machine_id: i64,
    pub user_id: i64,
    pub interval: Interval,
}

/// Classification of one slot as returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotStatus {
    pub interval: Interval,
    /// Number of free eligible machines, or -1 for own and conflicting entries.
    pub available_machines: i64,
    pub own_reservation: bool,
    pub conflicting_exam: Option<String>,
}

impl SlotStatus {
    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        self.interval.start()
    }

    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        self.interval.end()
    }

    const fn rank(&self) -> u8 {
        if self.conflicting_exam.is_some() {
            2
        } else if self.own_reservation {
            1
        } else {
            0
        }
    }
}

/// A slot with a machine count computed elsewhere (a federated organisation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrecomputedSlot {
    pub interval: Interval,
    pub available_machines: i64,
}

/// The data a classification runs against.
#[derive(Debug, Clone, Copy)]
pub struct ConflictInputs<'a> {
    /// The exam being booked.
    pub exam_id: i64,
    /// The querying user.
    pub user_id: i64,
    pub user_reservations: &'a [UserReservation],
    pub maintenance: &'a [MaintenancePeriod],
    /// Eligible machines of the room.
    pub machines: &'a [Machine],
    /// Reservations held on those machines by anyone.
    pub bookings: &'a [MachineBooking],
}

/// Counts the eligible machines not reserved by another user during `slot`.
#[must_use]
pub fn available_machine_count(
    slot: &Interval,
    user_id: i64,
    machines: &[Machine],
    bookings: &[MachineBooking],
) -> i64 {
    let free: usize = machines
        .iter()
        .filter(|machine| {
            !bookings.iter().any(|booking| {
                booking.machine_id == machine.machine_id
                    && booking.user_id != user_id
                    && booking.interval.overlaps(slot)
            })
        })
        .count();
    i64::try_from(free).unwrap_or(i64::MAX)
}

/// Returns `true` if any maintenance period overlaps the interval.
#[must_use]
pub fn is_under_maintenance(interval: &Interval, maintenance: &[MaintenancePeriod]) -> bool {
    maintenance.iter().any(|p| p.interval.overlaps(interval))
}

/// Classifies a user's own reservations overlapping the slot, if any.
fn classify_against_user(
    slot: &Interval,
    exam_id: i64,
    user_reservations: &[UserReservation],
) -> Option<SlotStatus> {
    let overlapping: Vec<&UserReservation> = user_reservations
        .iter()
        .filter(|r| r.interval.overlaps(slot))
        .collect();

    if let Some(other) = overlapping.iter().find(|r| r.exam_id != exam_id) {
        return Some(SlotStatus {
            interval: other.interval,
            available_machines: -1,
            own_reservation: false,
            conflicting_exam: Some(other.exam_name.clone()),
        });
    }

    overlapping.first().map(|own| SlotStatus {
        interval: own.interval,
        available_machines: -1,
        own_reservation: true,
        conflicting_exam: None,
    })
}

fn collapse(statuses: impl IntoIterator<Item = SlotStatus>) -> Vec<SlotStatus> {
    let mut by_interval: BTreeMap<Interval, SlotStatus> = BTreeMap::new();
    for status in statuses {
        match by_interval.get(&status.interval) {
            Some(existing) if existing.rank() >= status.rank() => {}
            _ => {
                by_interval.insert(status.interval, status);
            }
        }
    }
    by_interval.into_values().collect()
}

/// Classifies candidate slots against reservations and maintenance periods.
///
/// # Arguments
///
/// * `slots` - Candidate slots from the slot generator
/// * `inputs` - The user's reservations, maintenance periods and machine bookings
///
/// # Returns
///
/// Slot statuses in chronological order with duplicate intervals collapsed.
#[must_use]
pub fn classify(slots: &[Interval], inputs: &ConflictInputs<'_>) -> Vec<SlotStatus> {
    let statuses = slots
        .iter()
        .filter(|slot| !is_under_maintenance(slot, inputs.maintenance))
        .map(|slot| {
            classify_against_user(slot, inputs.exam_id, inputs.user_reservations).unwrap_or_else(
                || SlotStatus {
                    interval: *slot,
                    available_machines: available_machine_count(
                        slot,
                        inputs.user_id,
                        inputs.machines,
                        inputs.bookings,
                    ),
                    own_reservation: false,
                    conflicting_exam: None,
                },
            )
        });
    collapse(statuses)
}

/// Classifies slots whose machine counts were computed by a federated organisation.
///
/// The user's local reservations and the local maintenance periods still apply.
#[must_use]
pub fn classify_precomputed(
    slots: &[PrecomputedSlot],
    exam_id: i64,
    user_reservations: &[UserReservation],
    maintenance: &[MaintenancePeriod],
) -> Vec<SlotStatus> {
    let statuses = slots
        .iter()
        .filter(|slot| !is_under_maintenance(&slot.interval, maintenance))
        .map(|slot| {
            classify_against_user(&slot.interval, exam_id, user_reservations).unwrap_or(
                SlotStatus {
                    interval: slot.interval,
                    available_machines: slot.available_machines,
                    own_reservation: false,
                    conflicting_exam: None,
                },
            )
        });
    collapse(statuses)
}
