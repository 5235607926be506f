// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! API request and response data transfer objects.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use exam_slots_domain::{Machine, MaintenancePeriod, Reservation, SlotStatus};
use exam_slots_notify::MachineRef;

/// API request for the bookable slots of a local room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetSlotsRequest {
    pub user_id: i64,
    pub exam_id: i64,
    pub room_id: i64,
    /// Requested day (`yyyy-MM-dd`); today when omitted.
    pub day: Option<String>,
    pub accessibility_ids: BTreeSet<i64>,
}

/// API request for the slots of a room in a collaborating organisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetExternalSlotsRequest {
    pub user_id: i64,
    pub exam_id: i64,
    pub org_ref: String,
    pub room_ref: String,
    /// Requested day (`yyyy-MM-dd`); today when omitted.
    pub day: Option<String>,
}

/// One slot as shown to the student.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotStatusResponse {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Free eligible machines; -1 when the slot is taken by the user.
    pub available_machines: i64,
    pub own_reservation: bool,
    pub conflicting_exam: Option<String>,
}

impl From<&SlotStatus> for SlotStatusResponse {
    fn from(status: &SlotStatus) -> Self {
        Self {
            start: status.start(),
            end: status.end(),
            available_machines: status.available_machines,
            own_reservation: status.own_reservation,
            conflicting_exam: status.conflicting_exam.clone(),
        }
    }
}

/// Slots keyed by local date (`dd.MM.yyyy`).
pub type GetSlotsResponse = BTreeMap<String, Vec<SlotStatusResponse>>;

/// Where a reservation should be made in a collaborating organisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalRoomRequest {
    pub org_ref: String,
    pub room_ref: String,
}

/// API request to book a slot, replacing any earlier booking for the exam.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateReservationRequest {
    pub user_id: i64,
    pub exam_id: i64,
    /// Local room; ignored when `external` is set.
    pub room_id: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub accessibility_ids: BTreeSet<i64>,
    pub external: Option<ExternalRoomRequest>,
}

/// API response describing a reservation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ReservationResponse {
    pub reservation_id: i64,
    pub user_id: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Local machine; `None` for a booking in another organisation.
    pub machine_id: Option<i64>,
    pub machine_name: String,
    pub room_name: String,
    /// Reference of the booking in another organisation.
    pub external_ref: Option<String>,
    pub reminder_sent: bool,
    /// The reservation this one replaced.
    pub replaced_reservation_id: Option<i64>,
}

/// API response for a removed reservation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RemoveReservationResponse {
    pub reservation_id: i64,
    pub message: String,
}

/// A machine as listed to administrators.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MachineInfo {
    pub machine_id: i64,
    pub room_id: i64,
    pub name: Option<String>,
    pub ip_address: Option<String>,
    pub accessible: bool,
}

impl From<&Machine> for MachineInfo {
    fn from(machine: &Machine) -> Self {
        Self {
            machine_id: machine.machine_id,
            room_id: machine.room_id,
            name: machine.name.clone(),
            ip_address: machine.ip_address.clone(),
            accessible: machine.accessible,
        }
    }
}

/// API response listing machines that could take over a reservation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FindAvailableMachinesResponse {
    pub reservation_id: i64,
    pub machines: Vec<MachineInfo>,
}

/// API response for a reservation moved to another machine.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChangeMachineResponse {
    pub reservation_id: i64,
    pub previous_machine_id: Option<i64>,
    pub machine: MachineInfo,
}

/// API response for a processed no-show.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NoShowResponse {
    pub reservation_id: i64,
    /// Whether the reservation was deleted so the student can book again.
    pub released: bool,
}

/// API request to create a maintenance period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateMaintenancePeriodRequest {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub description: String,
}

/// A maintenance period as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MaintenancePeriodInfo {
    pub maintenance_period_id: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub description: String,
}

impl From<&MaintenancePeriod> for MaintenancePeriodInfo {
    fn from(period: &MaintenancePeriod) -> Self {
        Self {
            maintenance_period_id: period.maintenance_period_id,
            start: period.interval.start(),
            end: period.interval.end(),
            description: period.description.clone(),
        }
    }
}

/// API response for an enrolment.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EnrolmentInfo {
    pub enrolment_id: i64,
    pub user_id: i64,
    pub exam_id: i64,
    pub reservation_id: Option<i64>,
}

pub(crate) fn reservation_response(
    reservation: &Reservation,
    machine: &MachineRef,
    replaced: Option<i64>,
) -> ReservationResponse {
    ReservationResponse {
        reservation_id: reservation.reservation_id,
        user_id: reservation.user_id,
        start: reservation.interval.start(),
        end: reservation.interval.end(),
        machine_id: reservation.machine_id(),
        machine_name: machine.machine_name.clone(),
        room_name: machine.room_name.clone(),
        external_ref: reservation.external().map(|e| e.external_ref.clone()),
        reminder_sent: reservation.reminder_sent,
        replaced_reservation_id: replaced,
    }
}
