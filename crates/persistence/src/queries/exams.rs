// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Exam and enrolment queries.

use diesel::prelude::*;
use diesel::SqliteConnection;
use exam_slots_domain::{Enrolment, Exam, ExamHosting, ExamState};
use std::collections::BTreeSet;
use std::str::FromStr;
use tracing::debug;

use crate::data_models::instant_from_row;
use crate::diesel_schema::{enrolments, exam_software, exams};
use crate::error::PersistenceError;

#[derive(Queryable, Selectable)]
#[diesel(table_name = exams)]
struct ExamRow {
    exam_id: i64,
    name: String,
    duration_minutes: i64,
    period_start: i64,
    period_end: i64,
    state: String,
    is_private: i32,
    federated: i32,
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = enrolments)]
struct EnrolmentRow {
    enrolment_id: i64,
    user_id: i64,
    exam_id: i64,
    reservation_id: Option<i64>,
    no_show: i32,
}

impl From<EnrolmentRow> for Enrolment {
    fn from(row: EnrolmentRow) -> Self {
        Self {
            enrolment_id: row.enrolment_id,
            user_id: row.user_id,
            exam_id: row.exam_id,
            reservation_id: row.reservation_id,
            no_show: row.no_show != 0,
        }
    }
}

/// Retrieves an exam with its required software.
///
/// # Errors
///
/// Returns an error if the query fails or the stored state is unknown.
/// Returns `Ok(None)` if the exam does not exist.
pub fn get_exam(conn: &mut SqliteConnection, exam_id: i64) -> Result<Option<Exam>, PersistenceError> {
    debug!(exam_id, "Loading exam");

    let Some(row) = exams::table
        .find(exam_id)
        .select(ExamRow::as_select())
        .first::<ExamRow>(conn)
        .optional()?
    else {
        return Ok(None);
    };

    let required_software: BTreeSet<i64> = exam_software::table
        .filter(exam_software::exam_id.eq(exam_id))
        .select(exam_software::software_id)
        .load::<i64>(conn)?
        .into_iter()
        .collect();

    let state: ExamState =
        ExamState::from_str(&row.state).map_err(|e| PersistenceError::CorruptRow {
            table: "exams",
            reason: e.to_string(),
        })?;

    Ok(Some(Exam {
        exam_id: row.exam_id,
        name: row.name,
        duration_minutes: row.duration_minutes,
        period_start: instant_from_row(row.period_start, "exams")?,
        period_end: instant_from_row(row.period_end, "exams")?,
        required_software,
        state,
        private: row.is_private != 0,
        hosting: if row.federated != 0 {
            ExamHosting::Federated
        } else {
            ExamHosting::Local
        },
    }))
}

/// Retrieves an enrolment by id.
///
/// # Errors
///
/// Returns an error if the query fails.
/// Returns `Ok(None)` if the enrolment does not exist.
pub fn get_enrolment(
    conn: &mut SqliteConnection,
    enrolment_id: i64,
) -> Result<Option<Enrolment>, PersistenceError> {
    Ok(enrolments::table
        .find(enrolment_id)
        .select(EnrolmentRow::as_select())
        .first::<EnrolmentRow>(conn)
        .optional()?
        .map(Enrolment::from))
}

/// Retrieves a user's enrolment in an exam.
///
/// # Errors
///
/// Returns an error if the query fails.
/// Returns `Ok(None)` if the user is not enrolled.
pub fn find_enrolment(
    conn: &mut SqliteConnection,
    user_id: i64,
    exam_id: i64,
) -> Result<Option<Enrolment>, PersistenceError> {
    Ok(enrolments::table
        .filter(enrolments::user_id.eq(user_id))
        .filter(enrolments::exam_id.eq(exam_id))
        .select(EnrolmentRow::as_select())
        .first::<EnrolmentRow>(conn)
        .optional()?
        .map(Enrolment::from))
}

/// Retrieves the enrolment bound to a reservation.
///
/// # Errors
///
/// Returns an error if the query fails.
/// Returns `Ok(None)` if no enrolment holds the reservation.
pub fn find_enrolment_by_reservation(
    conn: &mut SqliteConnection,
    reservation_id: i64,
) -> Result<Option<Enrolment>, PersistenceError> {
    Ok(enrolments::table
        .filter(enrolments::reservation_id.eq(reservation_id))
        .select(EnrolmentRow::as_select())
        .first::<EnrolmentRow>(conn)
        .optional()?
        .map(Enrolment::from))
}
