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

//! Pure data model and rules of the exam slot-allocation engine.
//!
//! Nothing in this crate performs I/O. Every function takes the current
//! instant and configuration explicitly.

mod calendar;
mod config;
mod conflict;
mod dst;
mod eligibility;
mod error;
mod interval;
mod search;
mod slots;
mod types;
mod validation;

#[cfg(test)]
mod tests;

pub use calendar::{
    local_date, local_window, open_intervals, resolve_local_exact, resolve_local_forward,
};
pub use config::{
    DEFAULT_RESERVATION_WINDOW_DAYS, DEFAULT_TIMEZONE, MAX_RESERVATION_WINDOW_DAYS,
    SchedulingConfig,
};
pub use conflict::{
    ConflictInputs, MachineBooking, PrecomputedSlot, SlotStatus, UserReservation,
    available_machine_count, classify, classify_precomputed, is_under_maintenance,
};
pub use dst::{is_daylight_saving, normalize_to_standard_offset, offset_minutes};
pub use eligibility::{
    eligible_machines, is_accessibility_satisfied, is_room_accessibility_satisfied,
    is_software_satisfied,
};
pub use error::DomainError;
pub use interval::{Interval, merge_intervals};
pub use search::{DATE_KEY_FORMAT, SearchWindow, date_key, parse_search_date, resolve_search_window};
pub use slots::{candidate_slots, starting_times};
pub use types::{
    Enrolment, Exam, ExamHosting, ExamState, ExceptionHours, ExceptionKind, ExternalReservation,
    Machine, MailAddress, MaintenancePeriod, OpeningHours, Reservation, ReservationTarget, Room,
    RoomState, StartingHour,
};
pub use validation::{
    MAX_EXAM_DURATION_MINUTES, validate_exam_duration, validate_opening_hours,
    validate_requested_window, validate_room,
};
