// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use exam_slots_domain::{DomainError, ExamState, Interval};

/// Errors that can occur while planning a reservation change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A domain rule was violated.
    DomainViolation(DomainError),
    /// The exam's state does not permit reservation changes.
    ExamNotBookable {
        /// The exam.
        exam_id: i64,
        /// Its current state.
        state: ExamState,
    },
    /// The existing reservation has started or elapsed and cannot change.
    ReservationInEffect {
        /// The reservation in effect.
        reservation_id: i64,
    },
    /// Every eligible machine is booked during the requested window.
    NoMachineAvailable,
    /// The requested window is not a slot the room offers.
    SlotNotOffered {
        /// The requested window.
        interval: Interval,
    },
    /// The user holds a reservation for another exam during the window.
    ConflictingReservation {
        /// Name of the other exam.
        exam_name: String,
    },
    /// An external booking was requested for an exam hosted locally.
    DelegationNotAllowed {
        /// The exam.
        exam_id: i64,
    },
    /// The machine cannot take over the reservation.
    MachineNotEligible {
        /// The machine.
        machine_id: i64,
    },
}

impl std::fmt::Display for CoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DomainViolation(err) => write!(f, "Domain violation: {err}"),
            Self::ExamNotBookable { exam_id, state } => {
                write!(f, "Exam {exam_id} is {state} and accepts no reservations")
            }
            Self::ReservationInEffect { reservation_id } => {
                write!(
                    f,
                    "Reservation {reservation_id} has already started and cannot be changed"
                )
            }
            Self::NoMachineAvailable => {
                write!(f, "No machine is available for the requested time")
            }
            Self::SlotNotOffered { interval } => {
                write!(f, "The room does not offer the slot {interval}")
            }
            Self::ConflictingReservation { exam_name } => {
                write!(f, "You already have a reservation for '{exam_name}' at that time")
            }
            Self::DelegationNotAllowed { exam_id } => {
                write!(f, "Exam {exam_id} cannot be booked in another organisation")
            }
            Self::MachineNotEligible { machine_id } => {
                write!(f, "Machine {machine_id} cannot take over the reservation")
            }
        }
    }
}

impl std::error::Error for CoreError {}

impl From<DomainError> for CoreError {
    fn from(err: DomainError) -> Self {
        Self::DomainViolation(err)
    }
}
