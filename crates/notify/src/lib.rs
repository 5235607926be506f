// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

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

//! Reservation events handed to the notification collaborator.
//!
//! The engine never formats or delivers messages. It emits one event per
//! successful change and names the message template the collaborator should
//! render.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use exam_slots_domain::{Exam, Reservation, normalize_to_standard_offset};
use serde::Serialize;
use std::sync::{Mutex, PoisonError};
use tracing::info;

/// The machine and room a reservation occupies, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MachineRef {
    /// Local machine id; `None` for a reservation in another organisation.
    pub machine_id: Option<i64>,
    pub machine_name: String,
    pub room_name: String,
}

impl MachineRef {
    /// Creates a new `MachineRef`.
    #[must_use]
    pub const fn new(machine_id: Option<i64>, machine_name: String, room_name: String) -> Self {
        Self {
            machine_id,
            machine_name,
            room_name,
        }
    }
}

/// Everything a message about one reservation needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReservationDetails {
    pub reservation_id: i64,
    pub user_id: i64,
    pub exam_id: i64,
    pub exam_name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub machine: MachineRef,
    /// IANA zone of the room, for rendering local times.
    pub room_timezone: String,
    /// Start shifted to the zone's standard offset.
    pub standard_time_start: DateTime<Utc>,
}

impl ReservationDetails {
    /// Builds the details of a reservation.
    ///
    /// # Arguments
    ///
    /// * `reservation` - The reservation
    /// * `exam` - The exam it belongs to
    /// * `machine` - Where it takes place
    /// * `tz` - The room's time zone
    #[must_use]
    pub fn new(reservation: &Reservation, exam: &Exam, machine: MachineRef, tz: Tz) -> Self {
        let start: DateTime<Utc> = reservation.interval.start();
        Self {
            reservation_id: reservation.reservation_id,
            user_id: reservation.user_id,
            exam_id: exam.exam_id,
            exam_name: exam.name.clone(),
            start,
            end: reservation.interval.end(),
            machine,
            room_timezone: tz.name().to_string(),
            standard_time_start: normalize_to_standard_offset(start, tz),
        }
    }
}

/// The message template the collaborator should render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MessageTemplate {
    /// First reservation for the enrolment.
    ReservationCreated,
    /// Re-booked onto a different machine or room.
    ReservationMachineChanged,
    /// Re-booked onto the same machine.
    ReservationMachineUnchanged,
    /// The reservation was removed.
    ReservationCancelled,
}

impl MessageTemplate {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ReservationCreated => "reservation_created",
            Self::ReservationMachineChanged => "reservation_machine_changed",
            Self::ReservationMachineUnchanged => "reservation_machine_unchanged",
            Self::ReservationCancelled => "reservation_cancelled",
        }
    }
}

/// An event emitted after a reservation change has been committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ReservationEvent {
    /// A reservation was made for an enrolment that had none.
    Created {
        reservation: ReservationDetails,
    },
    /// A reservation replaced an earlier one or was moved to another machine.
    Changed {
        previous_machine: MachineRef,
        new_machine: MachineRef,
        reservation: ReservationDetails,
    },
    /// A reservation was removed.
    Cancelled {
        by_admin: bool,
        /// Optional explanation written by an administrator.
        message: Option<String>,
        reservation: ReservationDetails,
    },
}

impl ReservationEvent {
    /// The collaborator-facing event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Created { .. } => "ReservationCreated",
            Self::Changed { .. } => "ReservationChanged",
            Self::Cancelled { .. } => "ReservationCancelled",
        }
    }

    /// Picks the message template for this event.
    #[must_use]
    pub fn template(&self) -> MessageTemplate {
        match self {
            Self::Created { .. } => MessageTemplate::ReservationCreated,
            Self::Changed {
                previous_machine,
                new_machine,
                ..
            } => {
                if previous_machine == new_machine {
                    MessageTemplate::ReservationMachineUnchanged
                } else {
                    MessageTemplate::ReservationMachineChanged
                }
            }
            Self::Cancelled { .. } => MessageTemplate::ReservationCancelled,
        }
    }

    #[must_use]
    pub const fn reservation(&self) -> &ReservationDetails {
        match self {
            Self::Created { reservation }
            | Self::Changed { reservation, .. }
            | Self::Cancelled { reservation, .. } => reservation,
        }
    }
}

/// Receiver of reservation events.
///
/// Implementations must not fail the caller; delivery problems are theirs.
pub trait NotificationSink: Send + Sync {
    /// Hands one event to the collaborator.
    fn notify(&self, event: &ReservationEvent);
}

/// Sink that records every event in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotificationSink;

impl NotificationSink for TracingNotificationSink {
    fn notify(&self, event: &ReservationEvent) {
        let details: &ReservationDetails = event.reservation();
        info!(
            event = event.name(),
            template = event.template().as_str(),
            reservation_id = details.reservation_id,
            user_id = details.user_id,
            exam_id = details.exam_id,
            machine = %details.machine.machine_name,
            start = %details.start,
            "Reservation event emitted"
        );
    }
}

/// Sink that keeps events in memory.
#[derive(Debug, Default)]
pub struct RecordingNotificationSink {
    events: Mutex<Vec<ReservationEvent>>,
}

impl RecordingNotificationSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every event received so far.
    #[must_use]
    pub fn events(&self) -> Vec<ReservationEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl NotificationSink for RecordingNotificationSink {
    fn notify(&self, event: &ReservationEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

#[cfg(test)]
mod tests;
