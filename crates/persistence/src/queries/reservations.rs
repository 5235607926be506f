// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Reservation queries.
//!
//! A reservation row carries either a machine id or a matching row in
//! `external_reservations`. Instants are stored as unix seconds.

use diesel::prelude::*;
use diesel::SqliteConnection;
use exam_slots_domain::{
    ExternalReservation, Interval, MachineBooking, Reservation, ReservationTarget,
    UserReservation,
};
use std::collections::BTreeMap;
use tracing::debug;

use crate::data_models::interval_from_row;
use crate::diesel_schema::{enrolments, exams, external_reservations, reservations};
use crate::error::PersistenceError;

#[derive(Queryable, Selectable)]
#[diesel(table_name = reservations)]
struct ReservationRow {
    reservation_id: i64,
    user_id: i64,
    machine_id: Option<i64>,
    start_at: i64,
    end_at: i64,
    reminder_sent: i32,
    no_show: i32,
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = external_reservations)]
struct ExternalReservationRow {
    external_ref: String,
    org_ref: String,
    room_ref: String,
    org_name: Option<String>,
    org_code: Option<String>,
    machine_name: String,
    room_name: String,
    room_code: Option<String>,
    room_timezone: String,
    building_name: Option<String>,
    campus: Option<String>,
}

impl From<ExternalReservationRow> for ExternalReservation {
    fn from(row: ExternalReservationRow) -> Self {
        Self {
            external_ref: row.external_ref,
            org_ref: row.org_ref,
            room_ref: row.room_ref,
            org_name: row.org_name,
            org_code: row.org_code,
            machine_name: row.machine_name,
            room_name: row.room_name,
            room_code: row.room_code,
            room_timezone: row.room_timezone,
            building_name: row.building_name,
            campus: row.campus,
        }
    }
}

fn reservation_from_row(
    conn: &mut SqliteConnection,
    row: ReservationRow,
) -> Result<Reservation, PersistenceError> {
    let interval: Interval = interval_from_row(row.start_at, row.end_at, "reservations")?;
    let target: ReservationTarget = if let Some(machine_id) = row.machine_id {
        ReservationTarget::Machine(machine_id)
    } else {
        let external: ExternalReservationRow = external_reservations::table
            .find(row.reservation_id)
            .select(ExternalReservationRow::as_select())
            .first::<ExternalReservationRow>(conn)
            .optional()?
            .ok_or_else(|| PersistenceError::CorruptRow {
                table: "reservations",
                reason: format!(
                    "reservation {} has neither a machine nor an external record",
                    row.reservation_id
                ),
            })?;
        ReservationTarget::External(external.into())
    };

    Ok(Reservation {
        reservation_id: row.reservation_id,
        user_id: row.user_id,
        interval,
        target,
        reminder_sent: row.reminder_sent != 0,
        no_show: row.no_show != 0,
    })
}

/// Retrieves a reservation, including its external record if it has one.
///
/// # Errors
///
/// Returns an error if the query fails or the row is malformed.
/// Returns `Ok(None)` if the reservation does not exist.
pub fn get_reservation(
    conn: &mut SqliteConnection,
    reservation_id: i64,
) -> Result<Option<Reservation>, PersistenceError> {
    let row: Option<ReservationRow> = reservations::table
        .find(reservation_id)
        .select(ReservationRow::as_select())
        .first::<ReservationRow>(conn)
        .optional()?;

    row.map(|r| reservation_from_row(conn, r)).transpose()
}

/// Lists the reservations bound to the user's enrolments.
///
/// Each entry carries the exam it was made for, so callers can tell own
/// reservations from conflicting ones.
///
/// # Errors
///
/// Returns an error if the query fails or a row is malformed.
pub fn list_user_reservations(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<Vec<UserReservation>, PersistenceError> {
    let bound: Vec<(Option<i64>, i64, String)> = enrolments::table
        .inner_join(exams::table)
        .filter(enrolments::user_id.eq(user_id))
        .filter(enrolments::reservation_id.is_not_null())
        .select((enrolments::reservation_id, exams::exam_id, exams::name))
        .load::<(Option<i64>, i64, String)>(conn)?;

    let exams_by_reservation: BTreeMap<i64, (i64, String)> = bound
        .into_iter()
        .filter_map(|(reservation_id, exam_id, name)| {
            reservation_id.map(|id| (id, (exam_id, name)))
        })
        .collect();
    let ids: Vec<i64> = exams_by_reservation.keys().copied().collect();

    let rows: Vec<ReservationRow> = reservations::table
        .filter(reservations::reservation_id.eq_any(&ids))
        .order(reservations::start_at)
        .select(ReservationRow::as_select())
        .load::<ReservationRow>(conn)?;

    debug!(user_id, reservation_count = rows.len(), "Loaded user reservations");

    rows.into_iter()
        .filter_map(|row| {
            exams_by_reservation
                .get(&row.reservation_id)
                .map(|(exam_id, exam_name)| {
                    Ok(UserReservation {
                        reservation_id: row.reservation_id,
                        exam_id: *exam_id,
                        exam_name: exam_name.clone(),
                        interval: interval_from_row(row.start_at, row.end_at, "reservations")?,
                    })
                })
        })
        .collect()
}

/// Lists reservations on the given machines that overlap `window`.
///
/// # Errors
///
/// Returns an error if the query fails or a row is malformed.
pub fn list_machine_bookings(
    conn: &mut SqliteConnection,
    machine_ids: &[i64],
    window: &Interval,
) -> Result<Vec<MachineBooking>, PersistenceError> {
    let rows: Vec<ReservationRow> = reservations::table
        .filter(reservations::machine_id.eq_any(machine_ids))
        .filter(reservations::start_at.lt(window.end().timestamp()))
        .filter(reservations::end_at.gt(window.start().timestamp()))
        .select(ReservationRow::as_select())
        .load::<ReservationRow>(conn)?;

    rows.into_iter()
        .filter_map(|row| {
            row.machine_id.map(|machine_id| {
                Ok(MachineBooking {
                    reservation_id: row.reservation_id,
                    machine_id,
                    user_id: row.user_id,
                    interval: interval_from_row(row.start_at, row.end_at, "reservations")?,
                })
            })
        })
        .collect()
}

/// Returns `true` if any reservation on `machine_id` overlaps `interval`.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn machine_has_overlap(
    conn: &mut SqliteConnection,
    machine_id: i64,
    interval: &Interval,
) -> Result<bool, PersistenceError> {
    let count: i64 = reservations::table
        .filter(reservations::machine_id.eq(machine_id))
        .filter(reservations::start_at.lt(interval.end().timestamp()))
        .filter(reservations::end_at.gt(interval.start().timestamp()))
        .count()
        .get_result(conn)?;
    Ok(count > 0)
}
