// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use exam_slots_domain::DomainError;

/// Message raised by the trigger guarding machine reservations.
pub const OVERLAP_TRIGGER_MESSAGE: &str = "machine_reservation_overlap";

/// Errors that can occur during persistence operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// A database error occurred.
    DatabaseError(String),
    /// Database connection failed.
    DatabaseConnectionFailed(String),
    /// Database migration failed.
    MigrationFailed(String),
    /// Query execution failed.
    QueryFailed(String),
    /// Initialization error.
    InitializationError(String),
    /// Foreign key enforcement is not enabled.
    ForeignKeyEnforcementNotEnabled,
    /// A stored value could not be turned back into a domain value.
    CorruptRow { table: &'static str, reason: String },
    /// The write would make two reservations overlap on one machine.
    ReservationOverlap,
    /// None of the planned machines is still free.
    NoMachineAvailable,
    /// The enrolment's reservation has started and cannot be replaced.
    ReservationInEffect { reservation_id: i64 },
    /// A uniqueness or check constraint rejected the write.
    ConstraintViolation(String),
    /// The requested resource was not found.
    NotFound(String),
}

impl std::fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DatabaseError(msg) => write!(f, "Database error: {msg}"),
            Self::DatabaseConnectionFailed(msg) => {
                write!(f, "Database connection failed: {msg}")
            }
            Self::MigrationFailed(msg) => write!(f, "Migration failed: {msg}"),
            Self::QueryFailed(msg) => write!(f, "Query failed: {msg}"),
            Self::InitializationError(msg) => write!(f, "Initialization error: {msg}"),
            Self::ForeignKeyEnforcementNotEnabled => {
                write!(f, "Foreign key enforcement is not enabled")
            }
            Self::CorruptRow { table, reason } => {
                write!(f, "Invalid row in {table}: {reason}")
            }
            Self::ReservationOverlap => {
                write!(f, "Machine already has a reservation during this window")
            }
            Self::NoMachineAvailable => write!(f, "No eligible machine is free"),
            Self::ReservationInEffect { reservation_id } => {
                write!(
                    f,
                    "Reservation {reservation_id} has started and cannot be changed"
                )
            }
            Self::ConstraintViolation(msg) => write!(f, "Constraint violation: {msg}"),
            Self::NotFound(msg) => write!(f, "Not found: {msg}"),
        }
    }
}

impl std::error::Error for PersistenceError {}

impl From<diesel::result::Error> for PersistenceError {
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error};

        match err {
            Error::NotFound => Self::NotFound("Record not found".to_string()),
            Error::DatabaseError(_, ref info)
                if info.message().contains(OVERLAP_TRIGGER_MESSAGE) =>
            {
                Self::ReservationOverlap
            }
            Error::DatabaseError(
                DatabaseErrorKind::UniqueViolation
                | DatabaseErrorKind::CheckViolation
                | DatabaseErrorKind::ForeignKeyViolation,
                ref info,
            ) => Self::ConstraintViolation(info.message().to_string()),
            _ => Self::DatabaseError(err.to_string()),
        }
    }
}

impl From<diesel::ConnectionError> for PersistenceError {
    fn from(err: diesel::ConnectionError) -> Self {
        Self::DatabaseConnectionFailed(err.to_string())
    }
}

impl From<DomainError> for PersistenceError {
    fn from(err: DomainError) -> Self {
        Self::CorruptRow {
            table: "domain",
            reason: err.to_string(),
        }
    }
}
