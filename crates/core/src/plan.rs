// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Planning of reservation changes.
//!
//! Planning is pure: it validates a request against a snapshot and returns
//! what the storage layer should do. The storage layer re-checks machine
//! availability inside its write transaction, so a plan is a proposal, not
//! a guarantee.

use crate::context::{BookingContext, EnrolmentContext};
use crate::error::CoreError;
use crate::request::{ExternalTarget, ReservationRequest};
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use exam_slots_domain::{
    Exam, Interval, Machine, MachineBooking, Reservation, Room, UserReservation, candidate_slots,
    eligible_machines, is_software_satisfied, is_under_maintenance, local_date,
    validate_requested_window,
};
use rand::seq::SliceRandom;

/// A local booking ready to be committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalAllocationPlan {
    pub enrolment_id: i64,
    pub user_id: i64,
    pub interval: Interval,
    /// Free eligible machines in randomised order; the first still free wins.
    pub candidate_machines: Vec<i64>,
    pub reminder_sent: bool,
    /// The reservation this booking replaces.
    pub replaces: Option<i64>,
}

/// A booking to request from a collaborating organisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegatedAllocationPlan {
    pub enrolment_id: i64,
    pub user_id: i64,
    pub interval: Interval,
    pub target: ExternalTarget,
    pub reminder_sent: bool,
    /// The reservation this booking replaces.
    pub replaces: Option<Reservation>,
}

/// How an existing reservation is removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalPlan {
    /// Delete the local row.
    Local { reservation_id: i64 },
    /// Cancel in the collaborating organisation first, then delete locally.
    Remote {
        reservation_id: i64,
        org_ref: String,
        room_ref: String,
        external_ref: String,
    },
}

impl RemovalPlan {
    #[must_use]
    pub const fn reservation_id(&self) -> i64 {
        match self {
            Self::Local { reservation_id } | Self::Remote { reservation_id, .. } => {
                *reservation_id
            }
        }
    }
}

/// What to do when a reservation is marked as a no-show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoShowAction {
    /// Record the no-show and keep the reservation.
    Keep,
    /// Delete the reservation so the student can book again.
    Release,
}

/// Reminder is pre-marked as sent when the reservation starts within a day.
#[must_use]
pub fn reminder_already_due(start: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    start.signed_duration_since(now) < Duration::days(1)
}

/// Checks shared by local and delegated bookings.
fn check_enrolment(
    context: &EnrolmentContext,
    request: &ReservationRequest,
    now: DateTime<Utc>,
) -> Result<Interval, CoreError> {
    let exam: &Exam = &context.exam;
    if !exam.state.allows_reservation() {
        return Err(CoreError::ExamNotBookable {
            exam_id: exam.exam_id,
            state: exam.state,
        });
    }
    if let Some(current) = &context.current_reservation
        && current.has_started(now)
    {
        return Err(CoreError::ReservationInEffect {
            reservation_id: current.reservation_id,
        });
    }

    let interval: Interval = validate_requested_window(request.start, request.end, exam)?;
    if interval.start() < now || is_under_maintenance(&interval, &context.maintenance) {
        return Err(CoreError::SlotNotOffered { interval });
    }
    if let Some(other) =
        conflicting_reservation(&interval, exam.exam_id, &context.user_reservations)
    {
        return Err(CoreError::ConflictingReservation {
            exam_name: other.exam_name.clone(),
        });
    }
    Ok(interval)
}

fn conflicting_reservation<'a>(
    interval: &Interval,
    exam_id: i64,
    user_reservations: &'a [UserReservation],
) -> Option<&'a UserReservation> {
    user_reservations
        .iter()
        .find(|r| r.exam_id != exam_id && r.interval.overlaps(interval))
}

/// Returns `true` if any reservation occupies the machine during `interval`.
///
/// The user's own reservations count: a machine they already hold for an
/// overlapping window is not free for a second booking.
#[must_use]
pub fn is_machine_reserved_during(
    machine_id: i64,
    interval: &Interval,
    bookings: &[MachineBooking],
) -> bool {
    bookings
        .iter()
        .any(|b| b.machine_id == machine_id && b.interval.overlaps(interval))
}

/// Plans a booking on a local machine.
///
/// # Arguments
///
/// * `context` - Snapshot of the enrolment, room and machines
/// * `request` - The booking request
/// * `now` - Current instant
/// * `rng` - Source of randomness for machine selection
///
/// # Returns
///
/// A plan listing the free eligible machines in random order.
///
/// # Errors
///
/// Returns an error if:
/// - The exam does not accept reservations
/// - The current reservation has started
/// - The window is not a slot the room offers, or hits maintenance
/// - The user has another exam at that time
/// - No eligible machine is free during the window
pub fn plan_local_allocation<R: rand::Rng + ?Sized>(
    context: &BookingContext,
    request: &ReservationRequest,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<LocalAllocationPlan, CoreError> {
    let interval: Interval = check_enrolment(&context.enrolment, request, now)?;
    let exam: &Exam = &context.enrolment.exam;
    let room: &Room = &context.room.room;

    let tz: Tz = room.timezone()?;
    let offered: Vec<Interval> = candidate_slots(
        room,
        local_date(interval.start(), tz),
        exam.duration_minutes,
        now,
    )?;
    if !offered.contains(&interval) {
        return Err(CoreError::SlotNotOffered { interval });
    }

    let eligible: Vec<Machine> = eligible_machines(
        room,
        &context.room.machines,
        exam,
        &request.accessibility_ids,
    );
    let mut candidate_machines: Vec<i64> = eligible
        .iter()
        .map(|m| m.machine_id)
        .filter(|id| !is_machine_reserved_during(*id, &interval, &context.room.bookings))
        .collect();
    if candidate_machines.is_empty() {
        return Err(CoreError::NoMachineAvailable);
    }
    candidate_machines.shuffle(rng);

    Ok(LocalAllocationPlan {
        enrolment_id: context.enrolment.enrolment.enrolment_id,
        user_id: request.user_id,
        interval,
        candidate_machines,
        reminder_sent: reminder_already_due(interval.start(), now),
        replaces: context
            .enrolment
            .current_reservation
            .as_ref()
            .map(|r| r.reservation_id),
    })
}

/// Plans a booking in a collaborating organisation.
///
/// Slot and machine checks are the remote side's responsibility.
///
/// # Errors
///
/// Returns an error if:
/// - The exam does not accept reservations
/// - The current reservation has started
/// - The window is invalid, in the past or hits maintenance
/// - The user has another exam at that time
pub fn plan_delegated_allocation(
    context: &EnrolmentContext,
    request: &ReservationRequest,
    target: &ExternalTarget,
    now: DateTime<Utc>,
) -> Result<DelegatedAllocationPlan, CoreError> {
    let interval: Interval = check_enrolment(context, request, now)?;
    Ok(DelegatedAllocationPlan {
        enrolment_id: context.enrolment.enrolment_id,
        user_id: request.user_id,
        interval,
        target: target.clone(),
        reminder_sent: reminder_already_due(interval.start(), now),
        replaces: context.current_reservation.clone(),
    })
}

/// Plans the removal of a reservation.
///
/// # Errors
///
/// Returns `CoreError::ReservationInEffect` if the reservation has started or elapsed.
pub fn plan_removal(
    reservation: &Reservation,
    now: DateTime<Utc>,
) -> Result<RemovalPlan, CoreError> {
    if reservation.has_started(now) {
        return Err(CoreError::ReservationInEffect {
            reservation_id: reservation.reservation_id,
        });
    }
    Ok(match reservation.external() {
        Some(external) => RemovalPlan::Remote {
            reservation_id: reservation.reservation_id,
            org_ref: external.org_ref.clone(),
            room_ref: external.room_ref.clone(),
            external_ref: external.external_ref.clone(),
        },
        None => RemovalPlan::Local {
            reservation_id: reservation.reservation_id,
        },
    })
}

/// Machines in the reservation's room that could take it over.
///
/// A replacement is in service, not archived, has the exam's software, is
/// not the current machine and has no other reservation during the window.
#[must_use]
pub fn replacement_machines(
    reservation: &Reservation,
    exam: &Exam,
    machines: &[Machine],
    bookings: &[MachineBooking],
) -> Vec<Machine> {
    let current: Option<i64> = reservation.machine_id();
    machines
        .iter()
        .filter(|m| Some(m.machine_id) != current)
        .filter(|m| !m.out_of_service && !m.archived)
        .filter(|m| is_software_satisfied(m, exam))
        .filter(|m| {
            !bookings.iter().any(|b| {
                b.machine_id == m.machine_id
                    && b.reservation_id != reservation.reservation_id
                    && b.interval.overlaps(&reservation.interval)
            })
        })
        .cloned()
        .collect()
}

/// Validates moving a reservation to another machine.
///
/// # Errors
///
/// Returns `CoreError::MachineNotEligible` if the machine is not among the
/// replacement machines.
pub fn plan_machine_change(
    reservation: &Reservation,
    exam: &Exam,
    machine_id: i64,
    machines: &[Machine],
    bookings: &[MachineBooking],
) -> Result<Machine, CoreError> {
    replacement_machines(reservation, exam, machines, bookings)
        .into_iter()
        .find(|m| m.machine_id == machine_id)
        .ok_or(CoreError::MachineNotEligible { machine_id })
}

/// Decides what a no-show does to the reservation.
#[must_use]
pub const fn plan_no_show(exam: &Exam) -> NoShowAction {
    if exam.private {
        NoShowAction::Release
    } else {
        NoShowAction::Keep
    }
}
