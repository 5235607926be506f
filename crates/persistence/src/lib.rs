// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Persistence layer for the exam slot-allocation engine.
//!
//! Built on Diesel with the `SQLite` backend. Migrations are embedded and
//! applied when a connection is opened.
//!
//! ## Guarantees
//!
//! - No two reservations on one machine overlap. A trigger rejects any
//!   insert or update that would break this, independently of the
//!   application-level re-check.
//! - An enrolment holds at most one reservation and a reservation belongs
//!   to at most one enrolment (`enrolments.reservation_id` is unique).
//! - Reservation writes run in immediate transactions and are therefore
//!   serialised across connections.
//!
//! ## Testing
//!
//! - Tests use isolated in-memory databases from `new_in_memory()`
//! - Cross-connection behaviour is tested against a temporary file database

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(clippy::multiple_crate_versions)]

use chrono::{DateTime, Utc};
use diesel::SqliteConnection;
use exam_slots::{DelegatedAllocationPlan, LocalAllocationPlan};
use exam_slots_domain::{
    Enrolment, Exam, ExternalReservation, Interval, Machine, MachineBooking, MaintenancePeriod,
    Reservation, Room, UserReservation,
};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::backend::sqlite::StorageMode;

mod backend;
mod data_models;
mod diesel_schema;
mod error;
mod mutations;
mod queries;

#[cfg(test)]
mod tests;

pub use data_models::{CommittedReservation, MachineChange, NoShowOutcome};
pub use error::PersistenceError;

/// Atomic counter for generating unique in-memory database names.
static DB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Persistence adapter over a single `SQLite` connection.
pub struct Persistence {
    conn: SqliteConnection,
}

impl Persistence {
    /// Creates a new persistence adapter with an in-memory `SQLite` database.
    ///
    /// Each call receives its own shared-cache database, named from an
    /// atomic counter so tests stay isolated.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn new_in_memory() -> Result<Self, PersistenceError> {
        let db_id: u64 = DB_COUNTER.fetch_add(1, Ordering::SeqCst);
        let shared_memory_url: String =
            format!("file:memdb_exam_slots_{db_id}?mode=memory&cache=shared");

        let conn: SqliteConnection =
            backend::sqlite::open(&shared_memory_url, StorageMode::Memory)?;

        Ok(Self { conn })
    }

    /// Creates a new persistence adapter with a file-based `SQLite` database.
    ///
    /// Several adapters may open the same file; their reservation writes
    /// are serialised by the database.
    ///
    /// # Arguments
    ///
    /// * `path` - The path to the `SQLite` database file
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn new_with_file<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let path_str: &str = path.as_ref().to_str().ok_or_else(|| {
            PersistenceError::InitializationError("Invalid database path".to_string())
        })?;

        let conn: SqliteConnection = backend::sqlite::open(path_str, StorageMode::File)?;

        Ok(Self { conn })
    }

    // ========================================================================
    // Setup
    // ========================================================================

    /// Inserts a room with its calendar, returning its id.
    ///
    /// # Errors
    ///
    /// Returns an error if an insert fails.
    pub fn insert_room(&mut self, room: &Room) -> Result<i64, PersistenceError> {
        mutations::setup::insert_room(&mut self.conn, room)
    }

    /// Inserts a machine, returning its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the room does not exist or an insert fails.
    pub fn insert_machine(&mut self, machine: &Machine) -> Result<i64, PersistenceError> {
        mutations::setup::insert_machine(&mut self.conn, machine)
    }

    /// Inserts an exam, returning its id.
    ///
    /// # Errors
    ///
    /// Returns an error if an insert fails.
    pub fn insert_exam(&mut self, exam: &Exam) -> Result<i64, PersistenceError> {
        mutations::setup::insert_exam(&mut self.conn, exam)
    }

    /// Enrols a user in an exam.
    ///
    /// # Errors
    ///
    /// Returns an error if the user is already enrolled or the exam does not exist.
    pub fn insert_enrolment(
        &mut self,
        user_id: i64,
        exam_id: i64,
    ) -> Result<Enrolment, PersistenceError> {
        mutations::setup::insert_enrolment(&mut self.conn, user_id, exam_id)
    }

    // ========================================================================
    // Rooms & Exams
    // ========================================================================

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_room(&mut self, room_id: i64) -> Result<Option<Room>, PersistenceError> {
        queries::rooms::get_room(&mut self.conn, room_id)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_room_machines(&mut self, room_id: i64) -> Result<Vec<Machine>, PersistenceError> {
        queries::rooms::list_room_machines(&mut self.conn, room_id)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_machine(&mut self, machine_id: i64) -> Result<Option<Machine>, PersistenceError> {
        queries::rooms::get_machine(&mut self.conn, machine_id)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_exam(&mut self, exam_id: i64) -> Result<Option<Exam>, PersistenceError> {
        queries::exams::get_exam(&mut self.conn, exam_id)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_enrolment(
        &mut self,
        enrolment_id: i64,
    ) -> Result<Option<Enrolment>, PersistenceError> {
        queries::exams::get_enrolment(&mut self.conn, enrolment_id)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn find_enrolment(
        &mut self,
        user_id: i64,
        exam_id: i64,
    ) -> Result<Option<Enrolment>, PersistenceError> {
        queries::exams::find_enrolment(&mut self.conn, user_id, exam_id)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn find_enrolment_by_reservation(
        &mut self,
        reservation_id: i64,
    ) -> Result<Option<Enrolment>, PersistenceError> {
        queries::exams::find_enrolment_by_reservation(&mut self.conn, reservation_id)
    }

    // ========================================================================
    // Reservations
    // ========================================================================

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_reservation(
        &mut self,
        reservation_id: i64,
    ) -> Result<Option<Reservation>, PersistenceError> {
        queries::reservations::get_reservation(&mut self.conn, reservation_id)
    }

    /// Lists the reservations bound to the user's enrolments.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_user_reservations(
        &mut self,
        user_id: i64,
    ) -> Result<Vec<UserReservation>, PersistenceError> {
        queries::reservations::list_user_reservations(&mut self.conn, user_id)
    }

    /// Lists reservations on the given machines overlapping `window`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_machine_bookings(
        &mut self,
        machine_ids: &[i64],
        window: &Interval,
    ) -> Result<Vec<MachineBooking>, PersistenceError> {
        queries::reservations::list_machine_bookings(&mut self.conn, machine_ids, window)
    }

    /// Commits a planned local booking, replacing the enrolment's reservation.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::NoMachineAvailable` if every planned
    /// machine was taken in the meantime, or `ReservationInEffect` if the
    /// current reservation has started.
    pub fn commit_local_reservation(
        &mut self,
        plan: &LocalAllocationPlan,
        now: DateTime<Utc>,
    ) -> Result<CommittedReservation, PersistenceError> {
        mutations::reservations::commit_local_reservation(&mut self.conn, plan, now)
    }

    /// Records a booking confirmed by a collaborating organisation.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::ReservationInEffect` if the current
    /// reservation has started, or an error if the write fails.
    pub fn commit_external_reservation(
        &mut self,
        plan: &DelegatedAllocationPlan,
        external: &ExternalReservation,
        now: DateTime<Utc>,
    ) -> Result<CommittedReservation, PersistenceError> {
        mutations::reservations::commit_external_reservation(&mut self.conn, plan, external, now)
    }

    /// Deletes a reservation and unbinds its enrolment.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::NotFound` if the reservation does not exist.
    pub fn remove_reservation(
        &mut self,
        reservation_id: i64,
    ) -> Result<Reservation, PersistenceError> {
        mutations::reservations::remove_reservation(&mut self.conn, reservation_id)
    }

    /// Deletes a reservation no enrolment holds any more.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn delete_unbound_reservation(
        &mut self,
        reservation_id: i64,
    ) -> Result<bool, PersistenceError> {
        mutations::reservations::delete_unbound_reservation(&mut self.conn, reservation_id)
    }

    /// Moves a reservation to another machine.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::ReservationOverlap` if the machine is taken.
    pub fn change_machine(
        &mut self,
        reservation_id: i64,
        machine_id: i64,
    ) -> Result<MachineChange, PersistenceError> {
        mutations::reservations::change_machine(&mut self.conn, reservation_id, machine_id)
    }

    /// Records a no-show, deleting the reservation when `release` is set.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::NotFound` if the reservation does not exist.
    pub fn mark_no_show(
        &mut self,
        reservation_id: i64,
        release: bool,
    ) -> Result<NoShowOutcome, PersistenceError> {
        mutations::reservations::mark_no_show(&mut self.conn, reservation_id, release)
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn insert_maintenance_period(
        &mut self,
        interval: &Interval,
        description: &str,
    ) -> Result<MaintenancePeriod, PersistenceError> {
        mutations::maintenance::insert_maintenance_period(&mut self.conn, interval, description)
    }

    /// # Errors
    ///
    /// Returns `PersistenceError::NotFound` if the period does not exist.
    pub fn delete_maintenance_period(
        &mut self,
        maintenance_period_id: i64,
    ) -> Result<(), PersistenceError> {
        mutations::maintenance::delete_maintenance_period(&mut self.conn, maintenance_period_id)
    }

    /// Lists maintenance periods, optionally only those overlapping `window`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_maintenance_periods(
        &mut self,
        window: Option<&Interval>,
    ) -> Result<Vec<MaintenancePeriod>, PersistenceError> {
        queries::maintenance::list_maintenance_periods(&mut self.conn, window)
    }
}
