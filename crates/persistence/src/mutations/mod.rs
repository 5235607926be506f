// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! State-changing operations.
//!
//! - `setup` — Rooms, machines, exams and enrolments
//! - `reservations` — The transactional booking write path
//! - `maintenance` — Maintenance periods
//!
//! Every reservation write runs in an immediate transaction, so the
//! availability re-check and the insert happen under the database write lock.

pub mod maintenance;
pub mod reservations;
pub mod setup;
