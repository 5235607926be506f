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

mod context;
mod error;
mod plan;
mod request;
mod strategy;

#[cfg(test)]
mod tests;

pub use context::{BookingContext, EnrolmentContext, RoomContext};
pub use error::CoreError;
pub use plan::{
    DelegatedAllocationPlan, LocalAllocationPlan, NoShowAction, RemovalPlan,
    is_machine_reserved_during, plan_delegated_allocation, plan_local_allocation,
    plan_machine_change, plan_no_show, plan_removal, reminder_already_due, replacement_machines,
};
pub use request::{ExternalTarget, ReservationRequest};
pub use strategy::AllocationStrategy;
