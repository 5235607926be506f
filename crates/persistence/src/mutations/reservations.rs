// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Reservation write path.
//!
//! Booking swaps the enrolment's reservation in one immediate transaction:
//! re-read the enrolment, refuse if its reservation has started, pick the
//! first planned machine that is still free, release the previous
//! reservation, insert the new one and bind it.
//!
//! A previous local reservation is deleted. A previous external reservation
//! is only unbound; the caller deletes it with `delete_unbound_reservation`
//! once the collaborating organisation has cancelled it.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::SqliteConnection;
use exam_slots::{DelegatedAllocationPlan, LocalAllocationPlan};
use exam_slots_domain::{Enrolment, ExternalReservation, Interval, Reservation};
use tracing::{debug, info, warn};

use crate::backend::sqlite::get_last_insert_rowid;
use crate::data_models::{CommittedReservation, MachineChange, NoShowOutcome, flag};
use crate::diesel_schema::{enrolments, external_reservations, reservations};
use crate::error::PersistenceError;
use crate::queries::exams::{find_enrolment_by_reservation, get_enrolment};
use crate::queries::reservations::{get_reservation, machine_has_overlap};

fn load_reservation(
    conn: &mut SqliteConnection,
    reservation_id: i64,
) -> Result<Reservation, PersistenceError> {
    get_reservation(conn, reservation_id)?
        .ok_or_else(|| PersistenceError::NotFound(format!("reservation {reservation_id}")))
}

/// Loads the enrolment and its current reservation, refusing if that
/// reservation has started.
fn lock_enrolment(
    conn: &mut SqliteConnection,
    enrolment_id: i64,
    now: DateTime<Utc>,
) -> Result<(Enrolment, Option<Reservation>), PersistenceError> {
    let enrolment: Enrolment = get_enrolment(conn, enrolment_id)?
        .ok_or_else(|| PersistenceError::NotFound(format!("enrolment {enrolment_id}")))?;
    let previous: Option<Reservation> = match enrolment.reservation_id {
        Some(id) => get_reservation(conn, id)?,
        None => None,
    };
    if let Some(previous) = &previous
        && previous.has_started(now)
    {
        return Err(PersistenceError::ReservationInEffect {
            reservation_id: previous.reservation_id,
        });
    }
    Ok((enrolment, previous))
}

fn release_previous(
    conn: &mut SqliteConnection,
    enrolment_id: i64,
    previous: &Reservation,
) -> Result<(), PersistenceError> {
    diesel::update(enrolments::table.find(enrolment_id))
        .set(enrolments::reservation_id.eq(None::<i64>))
        .execute(conn)?;
    if previous.external().is_none() {
        diesel::delete(reservations::table.find(previous.reservation_id)).execute(conn)?;
        debug!(
            reservation_id = previous.reservation_id,
            "Deleted replaced reservation"
        );
    }
    Ok(())
}

fn insert_reservation(
    conn: &mut SqliteConnection,
    user_id: i64,
    machine_id: Option<i64>,
    interval: &Interval,
    reminder_sent: bool,
) -> Result<i64, PersistenceError> {
    diesel::insert_into(reservations::table)
        .values((
            reservations::user_id.eq(user_id),
            reservations::machine_id.eq(machine_id),
            reservations::start_at.eq(interval.start().timestamp()),
            reservations::end_at.eq(interval.end().timestamp()),
            reservations::reminder_sent.eq(flag(reminder_sent)),
        ))
        .execute(conn)?;
    get_last_insert_rowid(conn)
}

fn bind_enrolment(
    conn: &mut SqliteConnection,
    enrolment_id: i64,
    reservation_id: i64,
) -> Result<(), PersistenceError> {
    diesel::update(enrolments::table.find(enrolment_id))
        .set((
            enrolments::reservation_id.eq(Some(reservation_id)),
            enrolments::no_show.eq(0),
        ))
        .execute(conn)?;
    Ok(())
}

/// Commits a local booking.
///
/// # Arguments
///
/// * `conn` - The database connection
/// * `plan` - The planned booking with its candidate machines in random order
/// * `now` - Current instant
///
/// # Errors
///
/// Returns an error if:
/// - The enrolment does not exist
/// - The enrolment's current reservation has started
/// - Every candidate machine has an overlapping reservation
/// - The database rejects the write
pub fn commit_local_reservation(
    conn: &mut SqliteConnection,
    plan: &LocalAllocationPlan,
    now: DateTime<Utc>,
) -> Result<CommittedReservation, PersistenceError> {
    conn.immediate_transaction::<_, PersistenceError, _>(|conn| {
        let (enrolment, previous) = lock_enrolment(conn, plan.enrolment_id, now)?;

        let mut chosen: Option<i64> = None;
        for machine_id in &plan.candidate_machines {
            if !machine_has_overlap(conn, *machine_id, &plan.interval)? {
                chosen = Some(*machine_id);
                break;
            }
        }
        let Some(machine_id) = chosen else {
            warn!(
                enrolment_id = enrolment.enrolment_id,
                interval = %plan.interval,
                "All candidate machines were taken"
            );
            return Err(PersistenceError::NoMachineAvailable);
        };

        if let Some(previous) = &previous {
            release_previous(conn, enrolment.enrolment_id, previous)?;
        }
        let reservation_id: i64 = insert_reservation(
            conn,
            plan.user_id,
            Some(machine_id),
            &plan.interval,
            plan.reminder_sent,
        )?;
        bind_enrolment(conn, enrolment.enrolment_id, reservation_id)?;

        info!(
            reservation_id,
            machine_id,
            enrolment_id = enrolment.enrolment_id,
            replaced = ?previous.as_ref().map(|r| r.reservation_id),
            "Local reservation committed"
        );
        Ok(CommittedReservation {
            reservation: load_reservation(conn, reservation_id)?,
            previous,
        })
    })
}

/// Records a booking confirmed by a collaborating organisation.
///
/// # Errors
///
/// Returns an error if:
/// - The enrolment does not exist
/// - The enrolment's current reservation has started
/// - The external reference is already recorded
pub fn commit_external_reservation(
    conn: &mut SqliteConnection,
    plan: &DelegatedAllocationPlan,
    external: &ExternalReservation,
    now: DateTime<Utc>,
) -> Result<CommittedReservation, PersistenceError> {
    conn.immediate_transaction::<_, PersistenceError, _>(|conn| {
        let (enrolment, previous) = lock_enrolment(conn, plan.enrolment_id, now)?;

        if let Some(previous) = &previous {
            release_previous(conn, enrolment.enrolment_id, previous)?;
        }
        let reservation_id: i64 =
            insert_reservation(conn, plan.user_id, None, &plan.interval, plan.reminder_sent)?;
        diesel::insert_into(external_reservations::table)
            .values((
                external_reservations::reservation_id.eq(reservation_id),
                external_reservations::external_ref.eq(&external.external_ref),
                external_reservations::org_ref.eq(&external.org_ref),
                external_reservations::room_ref.eq(&external.room_ref),
                external_reservations::org_name.eq(external.org_name.as_deref()),
                external_reservations::org_code.eq(external.org_code.as_deref()),
                external_reservations::machine_name.eq(&external.machine_name),
                external_reservations::room_name.eq(&external.room_name),
                external_reservations::room_code.eq(external.room_code.as_deref()),
                external_reservations::room_timezone.eq(&external.room_timezone),
                external_reservations::building_name.eq(external.building_name.as_deref()),
                external_reservations::campus.eq(external.campus.as_deref()),
            ))
            .execute(conn)?;
        bind_enrolment(conn, enrolment.enrolment_id, reservation_id)?;

        info!(
            reservation_id,
            external_ref = %external.external_ref,
            enrolment_id = enrolment.enrolment_id,
            "External reservation committed"
        );
        Ok(CommittedReservation {
            reservation: load_reservation(conn, reservation_id)?,
            previous,
        })
    })
}

/// Deletes a reservation, unbinding its enrolment.
///
/// # Returns
///
/// The deleted reservation.
///
/// # Errors
///
/// Returns `PersistenceError::NotFound` if the reservation does not exist.
pub fn remove_reservation(
    conn: &mut SqliteConnection,
    reservation_id: i64,
) -> Result<Reservation, PersistenceError> {
    conn.immediate_transaction::<_, PersistenceError, _>(|conn| {
        let reservation: Reservation = load_reservation(conn, reservation_id)?;
        diesel::delete(reservations::table.find(reservation_id)).execute(conn)?;
        info!(reservation_id, "Reservation removed");
        Ok(reservation)
    })
}

/// Deletes a reservation only if no enrolment holds it.
///
/// # Returns
///
/// `true` if a row was deleted.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn delete_unbound_reservation(
    conn: &mut SqliteConnection,
    reservation_id: i64,
) -> Result<bool, PersistenceError> {
    conn.immediate_transaction::<_, PersistenceError, _>(|conn| {
        if find_enrolment_by_reservation(conn, reservation_id)?.is_some() {
            debug!(reservation_id, "Reservation is bound, not deleting");
            return Ok(false);
        }
        let deleted: usize =
            diesel::delete(reservations::table.find(reservation_id)).execute(conn)?;
        Ok(deleted > 0)
    })
}

/// Moves a local reservation to another machine.
///
/// # Errors
///
/// Returns `PersistenceError::ReservationOverlap` if the machine is
/// reserved during the window, or `NotFound` if the reservation does not
/// exist.
pub fn change_machine(
    conn: &mut SqliteConnection,
    reservation_id: i64,
    machine_id: i64,
) -> Result<MachineChange, PersistenceError> {
    conn.immediate_transaction::<_, PersistenceError, _>(|conn| {
        let before: Reservation = load_reservation(conn, reservation_id)?;
        diesel::update(reservations::table.find(reservation_id))
            .set(reservations::machine_id.eq(Some(machine_id)))
            .execute(conn)?;

        info!(
            reservation_id,
            from = ?before.machine_id(),
            to = machine_id,
            "Reservation moved to another machine"
        );
        Ok(MachineChange {
            previous_machine_id: before.machine_id(),
            reservation: load_reservation(conn, reservation_id)?,
        })
    })
}

/// Records that the student did not show up.
///
/// Both the reservation and its enrolment are flagged. With `release` the
/// reservation is then deleted, which unbinds the enrolment.
///
/// # Errors
///
/// Returns `PersistenceError::NotFound` if the reservation does not exist.
pub fn mark_no_show(
    conn: &mut SqliteConnection,
    reservation_id: i64,
    release: bool,
) -> Result<NoShowOutcome, PersistenceError> {
    conn.immediate_transaction::<_, PersistenceError, _>(|conn| {
        diesel::update(reservations::table.find(reservation_id))
            .set(reservations::no_show.eq(1))
            .execute(conn)?;
        let reservation: Reservation = load_reservation(conn, reservation_id)?;
        diesel::update(enrolments::table.filter(enrolments::reservation_id.eq(reservation_id)))
            .set(enrolments::no_show.eq(1))
            .execute(conn)?;

        if release {
            diesel::delete(reservations::table.find(reservation_id)).execute(conn)?;
        }

        info!(reservation_id, released = release, "No-show recorded");
        Ok(NoShowOutcome {
            reservation,
            released: release,
        })
    })
}
