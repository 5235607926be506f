// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use exam_slots_domain::{
    Enrolment, Exam, Machine, MachineBooking, MaintenancePeriod, Reservation, Room,
    UserReservation,
};

/// Snapshot of an enrolment and everything that constrains its bookings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrolmentContext {
    pub exam: Exam,
    pub enrolment: Enrolment,
    /// The reservation currently bound to the enrolment.
    pub current_reservation: Option<Reservation>,
    /// The user's reservations across all exams.
    pub user_reservations: Vec<UserReservation>,
    pub maintenance: Vec<MaintenancePeriod>,
}

/// Snapshot of a local room and its machines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomContext {
    pub room: Room,
    /// Every machine in the room.
    pub machines: Vec<Machine>,
    /// Reservations on those machines, by anyone.
    pub bookings: Vec<MachineBooking>,
}

/// Everything a local allocation is planned against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingContext {
    pub enrolment: EnrolmentContext,
    pub room: RoomContext,
}
