// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Error types for the API layer.

use chrono::{DateTime, NaiveDate, Utc};
use exam_slots::CoreError;
use exam_slots_domain::{DomainError, ExamState};
use exam_slots_persistence::PersistenceError;
use thiserror::Error;
use tracing::error;

/// Failures talking to a collaborating organisation's reservation service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExternalServiceError {
    /// No federation host has been configured.
    #[error("Booking in other organisations is not configured")]
    Disabled,
    /// The request did not complete.
    #[error("Request to {url} failed: {message}")]
    Transport {
        /// The requested URL.
        url: String,
        /// Description of the failure.
        message: String,
    },
    /// The remote service answered with an unexpected status.
    #[error("Remote service answered {status}: {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Message from the response body, if any.
        message: String,
    },
    /// The response body could not be understood.
    #[error("Unexpected response from remote service: {0}")]
    InvalidResponse(String),
}

/// API-level errors.
///
/// Each variant carries a stable code the web layer hands to clients.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The requested search date lies outside the bookable range.
    #[error("Search date {requested} is outside the bookable range {earliest} - {latest}")]
    SearchDateOutOfRange {
        /// First day of the requested search week.
        requested: NaiveDate,
        /// Earliest bookable day.
        earliest: NaiveDate,
        /// Latest bookable day.
        latest: NaiveDate,
    },
    /// The reservation has started or passed.
    #[error("You cannot modify a reservation that has started or passed")]
    ReservationInEffect {
        /// The reservation in effect.
        reservation_id: i64,
    },
    /// A slot that was offered has just been taken.
    #[error("Please retry, a slot you viewed was just taken")]
    NoMachineAvailable,
    /// The exam does not accept reservation changes.
    #[error("Exam {exam_id} is {state} and accepts no reservations")]
    ExamNotBookable {
        /// The exam.
        exam_id: i64,
        /// Its current state.
        state: ExamState,
    },
    /// The collaborating organisation could not complete the request.
    #[error("External reservation service failed: {0}")]
    ExternalDelegationFailure(#[from] ExternalServiceError),
    /// A requested resource was not found.
    #[error("{resource_type} not found: {message}")]
    NotFound {
        /// The type of resource that was not found.
        resource_type: String,
        /// A human-readable description of what was not found.
        message: String,
    },
    /// Invalid input was provided.
    #[error("Invalid input for field '{field}': {message}")]
    InvalidInput {
        /// The field that was invalid.
        field: String,
        /// A human-readable description of the error.
        message: String,
    },
    /// The user holds a reservation for another exam at that time.
    #[error("You already have a reservation for '{exam_name}' at that time")]
    ConflictingReservation {
        /// Name of the other exam.
        exam_name: String,
    },
    /// The requested window is not a slot the room offers.
    #[error("The room does not offer a slot from {start} to {end}")]
    SlotNotOffered {
        /// Requested start.
        start: DateTime<Utc>,
        /// Requested end.
        end: DateTime<Utc>,
    },
    /// An internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// A description of the internal error.
        message: String,
    },
}

impl ApiError {
    /// The stable error code of this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::SearchDateOutOfRange { .. } => "SearchDateOutOfRange",
            Self::ReservationInEffect { .. } => "ReservationInEffect",
            Self::NoMachineAvailable => "NoMachineAvailable",
            Self::ExamNotBookable { .. } => "ExamNotBookable",
            Self::ExternalDelegationFailure(_) => "ExternalDelegationFailure",
            Self::NotFound { .. } => "NotFound",
            Self::InvalidInput { .. } => "InvalidInput",
            Self::ConflictingReservation { .. } => "ConflictingReservation",
            Self::SlotNotOffered { .. } => "SlotNotOffered",
            Self::Internal { .. } => "Internal",
        }
    }

    pub(crate) fn not_found(resource_type: &str, message: String) -> Self {
        Self::NotFound {
            resource_type: resource_type.to_string(),
            message,
        }
    }

    pub(crate) fn invalid_input(field: &str, message: String) -> Self {
        Self::InvalidInput {
            field: field.to_string(),
            message,
        }
    }
}

/// Translates a domain error into an API error.
#[must_use]
pub fn translate_domain_error(err: DomainError) -> ApiError {
    match err {
        DomainError::SearchDateOutOfRange {
            requested,
            earliest,
            latest,
        } => ApiError::SearchDateOutOfRange {
            requested,
            earliest,
            latest,
        },
        DomainError::InvalidTimezone(_) => ApiError::invalid_input("timezone", err.to_string()),
        DomainError::InvalidInterval { .. } | DomainError::InvalidRequestedWindow { .. } => {
            ApiError::invalid_input("start", err.to_string())
        }
        DomainError::OverlappingOpeningHours { .. } | DomainError::InvalidOpeningHours { .. } => {
            ApiError::invalid_input("opening_hours", err.to_string())
        }
        DomainError::InvalidDuration(_) => ApiError::invalid_input("duration", err.to_string()),
        DomainError::InvalidReservationWindow(_) => {
            ApiError::invalid_input("reservation_window_days", err.to_string())
        }
        DomainError::DateParseError { .. } | DomainError::DateArithmeticOverflow { .. } => {
            ApiError::invalid_input("date", err.to_string())
        }
        DomainError::NonexistentLocalTime { .. } => {
            ApiError::invalid_input("start", err.to_string())
        }
        DomainError::UnknownState(_) => ApiError::Internal {
            message: err.to_string(),
        },
    }
}

/// Translates a core error into an API error.
#[must_use]
pub fn translate_core_error(err: CoreError) -> ApiError {
    match err {
        CoreError::DomainViolation(domain_err) => translate_domain_error(domain_err),
        CoreError::ExamNotBookable { exam_id, state } => {
            ApiError::ExamNotBookable { exam_id, state }
        }
        CoreError::ReservationInEffect { reservation_id } => {
            ApiError::ReservationInEffect { reservation_id }
        }
        CoreError::NoMachineAvailable => ApiError::NoMachineAvailable,
        CoreError::SlotNotOffered { interval } => ApiError::SlotNotOffered {
            start: interval.start(),
            end: interval.end(),
        },
        CoreError::ConflictingReservation { exam_name } => {
            ApiError::ConflictingReservation { exam_name }
        }
        CoreError::DelegationNotAllowed { .. } => {
            ApiError::invalid_input("external", err.to_string())
        }
        CoreError::MachineNotEligible { .. } => {
            ApiError::invalid_input("machine_id", err.to_string())
        }
    }
}

/// Translates a persistence error into an API error.
///
/// Storage failures are logged here and surface as `Internal`.
#[must_use]
pub fn translate_persistence_error(err: PersistenceError) -> ApiError {
    match err {
        PersistenceError::NotFound(message) => ApiError::not_found("Record", message),
        PersistenceError::ReservationOverlap | PersistenceError::NoMachineAvailable => {
            ApiError::NoMachineAvailable
        }
        PersistenceError::ReservationInEffect { reservation_id } => {
            ApiError::ReservationInEffect { reservation_id }
        }
        PersistenceError::ConstraintViolation(message) => {
            ApiError::invalid_input("record", message)
        }
        other => {
            error!(error = %other, "Persistence failure");
            ApiError::Internal {
                message: other.to_string(),
            }
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        translate_domain_error(err)
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        translate_core_error(err)
    }
}

impl From<PersistenceError> for ApiError {
    fn from(err: PersistenceError) -> Self {
        translate_persistence_error(err)
    }
}
