// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Engine entry points for the exam slot-allocation engine.
//!
//! This crate ties the pure planning of `exam-slots` to persistence,
//! notification and collaborating organisations. Handlers accept
//! transport-neutral request types and return serializable responses; the
//! web layer only maps them onto HTTP.
//!
//! ## Locking
//!
//! Handlers that may call another organisation take a
//! [`SharedPersistence`] and never hold its lock across a remote call.

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

mod error;
mod external;
mod handlers;
mod request_response;

#[cfg(test)]
mod tests;

pub use error::{
    ApiError, ExternalServiceError, translate_core_error, translate_domain_error,
    translate_persistence_error,
};
pub use external::{
    ExternalReservationService, HttpExternalReservationService, RemoteReservationRequest,
    RemoteSlotQuery,
};
pub use handlers::{
    SharedPersistence, admin_remove_reservation, change_reservation_machine,
    create_maintenance_period, create_or_replace_reservation, delete_maintenance_period, enrol,
    find_available_machines, get_external_slots, get_slots, list_maintenance_periods,
    process_no_show, register_exam, register_machine, register_room, remove_reservation,
};
pub use request_response::{
    ChangeMachineResponse, CreateMaintenancePeriodRequest, CreateReservationRequest,
    EnrolmentInfo, ExternalRoomRequest, FindAvailableMachinesResponse, GetExternalSlotsRequest,
    GetSlotsRequest, GetSlotsResponse, MachineInfo, MaintenancePeriodInfo, NoShowResponse,
    RemoveReservationResponse, ReservationResponse, SlotStatusResponse,
};
