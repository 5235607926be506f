// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::{BookingContext, EnrolmentContext, ReservationRequest, RoomContext};
use chrono::{DateTime, NaiveTime, Utc, Weekday};
use exam_slots_domain::{
    Enrolment, Exam, ExamHosting, ExamState, Interval, Machine, MachineBooking, MailAddress,
    OpeningHours, Reservation, ReservationTarget, Room, RoomState,
};
use std::collections::BTreeSet;

pub const USER: i64 = 7;

pub fn utc(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .unwrap()
        .with_timezone(&Utc)
}

pub fn interval(start: &str, end: &str) -> Interval {
    Interval::new(utc(start), utc(end)).unwrap()
}

/// Monday 2026-05-04 opens 09:00-17:00 Helsinki time (06:00-14:00 UTC).
pub fn create_test_room() -> Room {
    Room {
        room_id: 1,
        name: String::from("Exam Hall A"),
        room_code: None,
        local_timezone: String::from("Europe/Helsinki"),
        out_of_service: false,
        state: RoomState::Active,
        opening_hours: vec![OpeningHours::from_local(
            Weekday::Mon,
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            180,
        )],
        exceptions: Vec::new(),
        starting_hours: Vec::new(),
        accessibility_ids: BTreeSet::new(),
        address: MailAddress::default(),
        building_name: None,
        campus: None,
    }
}

pub fn create_test_machine(machine_id: i64) -> Machine {
    Machine {
        machine_id,
        room_id: 1,
        name: Some(format!("ws-{machine_id}")),
        ip_address: Some(format!("10.0.0.{machine_id}")),
        out_of_service: false,
        archived: false,
        accessible: true,
        accessibility_ids: BTreeSet::new(),
        software_ids: BTreeSet::new(),
    }
}

pub fn create_test_exam() -> Exam {
    Exam {
        exam_id: 100,
        name: String::from("Linear Algebra"),
        duration_minutes: 60,
        period_start: utc("2026-05-01T00:00:00Z"),
        period_end: utc("2026-06-30T00:00:00Z"),
        required_software: BTreeSet::new(),
        state: ExamState::Published,
        private: false,
        hosting: ExamHosting::Local,
    }
}

pub fn create_test_reservation(reservation_id: i64, machine_id: i64, start: &str, end: &str) -> Reservation {
    Reservation {
        reservation_id,
        user_id: USER,
        interval: interval(start, end),
        target: ReservationTarget::Machine(machine_id),
        reminder_sent: false,
        no_show: false,
    }
}

pub fn booking(reservation_id: i64, machine_id: i64, user_id: i64, start: &str, end: &str) -> MachineBooking {
    MachineBooking {
        reservation_id,
        machine_id,
        user_id,
        interval: interval(start, end),
    }
}

pub fn create_test_context(machines: Vec<Machine>, bookings: Vec<MachineBooking>) -> BookingContext {
    let exam: Exam = create_test_exam();
    BookingContext {
        enrolment: EnrolmentContext {
            enrolment: Enrolment {
                enrolment_id: 40,
                user_id: USER,
                exam_id: exam.exam_id,
                reservation_id: None,
                no_show: false,
            },
            exam,
            current_reservation: None,
            user_reservations: Vec::new(),
            maintenance: Vec::new(),
        },
        room: RoomContext {
            room: create_test_room(),
            machines,
            bookings,
        },
    }
}

/// Request for Monday 10:00-11:00 Helsinki time.
pub fn create_test_request() -> ReservationRequest {
    ReservationRequest {
        user_id: USER,
        exam_id: 100,
        room_id: 1,
        start: utc("2026-05-04T07:00:00Z"),
        end: utc("2026-05-04T08:00:00Z"),
        accessibility_ids: BTreeSet::new(),
        external: None,
    }
}

pub fn now() -> DateTime<Utc> {
    utc("2026-04-30T12:00:00Z")
}
