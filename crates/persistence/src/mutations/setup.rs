// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use diesel::prelude::*;
use diesel::SqliteConnection;
use exam_slots_domain::{Enrolment, Exam, ExamHosting, ExceptionKind, Machine, Room};
use num_traits::ToPrimitive;
use tracing::info;

use crate::backend::sqlite::get_last_insert_rowid;
use crate::data_models::{date_to_row, flag, time_to_row};
use crate::diesel_schema::{
    enrolments, exam_software, exams, exception_hours, machine_accessibilities,
    machine_software, machines, opening_hours, room_accessibilities, rooms, starting_hours,
};
use crate::error::PersistenceError;

/// Inserts a room with its calendar and accessibility tags.
///
/// The room's own `room_id` is ignored.
///
/// # Returns
///
/// The id assigned to the room.
///
/// # Errors
///
/// Returns an error if any insert fails.
pub fn insert_room(conn: &mut SqliteConnection, room: &Room) -> Result<i64, PersistenceError> {
    conn.immediate_transaction::<_, PersistenceError, _>(|conn| {
        diesel::insert_into(rooms::table)
            .values((
                rooms::name.eq(&room.name),
                rooms::room_code.eq(room.room_code.as_deref()),
                rooms::local_timezone.eq(&room.local_timezone),
                rooms::out_of_service.eq(flag(room.out_of_service)),
                rooms::state.eq(room.state.as_str()),
                rooms::street.eq(&room.address.street),
                rooms::zip.eq(&room.address.zip),
                rooms::city.eq(&room.address.city),
                rooms::building_name.eq(room.building_name.as_deref()),
                rooms::campus.eq(room.campus.as_deref()),
            ))
            .execute(conn)?;
        let room_id: i64 = get_last_insert_rowid(conn)?;

        for block in &room.opening_hours {
            let weekday: i32 = block
                .weekday()
                .num_days_from_monday()
                .to_i32()
                .ok_or_else(|| PersistenceError::ConstraintViolation("weekday".to_string()))?;
            diesel::insert_into(opening_hours::table)
                .values((
                    opening_hours::room_id.eq(room_id),
                    opening_hours::weekday.eq(weekday),
                    opening_hours::start_time.eq(time_to_row(block.start_utc())),
                    opening_hours::end_time.eq(time_to_row(block.end_utc())),
                    opening_hours::timezone_offset_minutes.eq(block.timezone_offset_minutes()),
                ))
                .execute(conn)?;
        }

        for exception in &room.exceptions {
            let (closed, opens, closes) = match exception.kind {
                ExceptionKind::Closed => (true, None, None),
                ExceptionKind::Open { opens, closes } => {
                    (false, Some(time_to_row(opens)), Some(time_to_row(closes)))
                }
            };
            diesel::insert_into(exception_hours::table)
                .values((
                    exception_hours::room_id.eq(room_id),
                    exception_hours::first_day.eq(date_to_row(exception.first_day)),
                    exception_hours::last_day.eq(date_to_row(exception.last_day)),
                    exception_hours::closed.eq(flag(closed)),
                    exception_hours::opens.eq(opens),
                    exception_hours::closes.eq(closes),
                ))
                .execute(conn)?;
        }

        for starting_hour in &room.starting_hours {
            diesel::insert_into(starting_hours::table)
                .values((
                    starting_hours::room_id.eq(room_id),
                    starting_hours::start_time.eq(time_to_row(starting_hour.time_utc())),
                    starting_hours::timezone_offset_minutes
                        .eq(starting_hour.timezone_offset_minutes()),
                ))
                .execute(conn)?;
        }

        for accessibility_id in &room.accessibility_ids {
            diesel::insert_into(room_accessibilities::table)
                .values((
                    room_accessibilities::room_id.eq(room_id),
                    room_accessibilities::accessibility_id.eq(accessibility_id),
                ))
                .execute(conn)?;
        }

        info!(room_id, name = %room.name, "Room created");
        Ok(room_id)
    })
}

/// Inserts a machine with its accessibility tags and installed software.
///
/// The machine's own `machine_id` is ignored.
///
/// # Errors
///
/// Returns an error if the room does not exist or an insert fails.
pub fn insert_machine(
    conn: &mut SqliteConnection,
    machine: &Machine,
) -> Result<i64, PersistenceError> {
    conn.immediate_transaction::<_, PersistenceError, _>(|conn| {
        diesel::insert_into(machines::table)
            .values((
                machines::room_id.eq(machine.room_id),
                machines::name.eq(machine.name.as_deref()),
                machines::ip_address.eq(machine.ip_address.as_deref()),
                machines::out_of_service.eq(flag(machine.out_of_service)),
                machines::archived.eq(flag(machine.archived)),
                machines::accessible.eq(flag(machine.accessible)),
            ))
            .execute(conn)?;
        let machine_id: i64 = get_last_insert_rowid(conn)?;

        for accessibility_id in &machine.accessibility_ids {
            diesel::insert_into(machine_accessibilities::table)
                .values((
                    machine_accessibilities::machine_id.eq(machine_id),
                    machine_accessibilities::accessibility_id.eq(accessibility_id),
                ))
                .execute(conn)?;
        }
        for software_id in &machine.software_ids {
            diesel::insert_into(machine_software::table)
                .values((
                    machine_software::machine_id.eq(machine_id),
                    machine_software::software_id.eq(software_id),
                ))
                .execute(conn)?;
        }

        info!(machine_id, room_id = machine.room_id, "Machine created");
        Ok(machine_id)
    })
}

/// Inserts an exam and its required software.
///
/// The exam's own `exam_id` is ignored.
///
/// # Errors
///
/// Returns an error if an insert fails.
pub fn insert_exam(conn: &mut SqliteConnection, exam: &Exam) -> Result<i64, PersistenceError> {
    conn.immediate_transaction::<_, PersistenceError, _>(|conn| {
        diesel::insert_into(exams::table)
            .values((
                exams::name.eq(&exam.name),
                exams::duration_minutes.eq(exam.duration_minutes),
                exams::period_start.eq(exam.period_start.timestamp()),
                exams::period_end.eq(exam.period_end.timestamp()),
                exams::state.eq(exam.state.as_str()),
                exams::is_private.eq(flag(exam.private)),
                exams::federated.eq(flag(exam.hosting == ExamHosting::Federated)),
            ))
            .execute(conn)?;
        let exam_id: i64 = get_last_insert_rowid(conn)?;

        for software_id in &exam.required_software {
            diesel::insert_into(exam_software::table)
                .values((
                    exam_software::exam_id.eq(exam_id),
                    exam_software::software_id.eq(software_id),
                ))
                .execute(conn)?;
        }

        info!(exam_id, name = %exam.name, "Exam created");
        Ok(exam_id)
    })
}

/// Enrols a user in an exam.
///
/// # Errors
///
/// Returns `PersistenceError::ConstraintViolation` if the user is already
/// enrolled, or an error if the exam does not exist.
pub fn insert_enrolment(
    conn: &mut SqliteConnection,
    user_id: i64,
    exam_id: i64,
) -> Result<Enrolment, PersistenceError> {
    diesel::insert_into(enrolments::table)
        .values((
            enrolments::user_id.eq(user_id),
            enrolments::exam_id.eq(exam_id),
        ))
        .execute(conn)?;
    let enrolment_id: i64 = get_last_insert_rowid(conn)?;

    info!(enrolment_id, user_id, exam_id, "Enrolment created");
    Ok(Enrolment {
        enrolment_id,
        user_id,
        exam_id,
        reservation_id: None,
        no_show: false,
    })
}
