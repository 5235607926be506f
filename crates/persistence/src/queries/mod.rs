// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Read-only queries.
//!
//! - `rooms` — Rooms with their calendars, and machines
//! - `exams` — Exams and enrolments
//! - `reservations` — Reservations, user reservations and machine bookings
//! - `maintenance` — Maintenance periods

pub mod exams;
pub mod maintenance;
pub mod reservations;
pub mod rooms;
