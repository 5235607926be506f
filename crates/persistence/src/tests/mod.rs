// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![allow(clippy::expect_used, clippy::unwrap_used)]

mod initialization_tests;
mod reservation_tests;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use exam_slots::{DelegatedAllocationPlan, ExternalTarget, LocalAllocationPlan};
use exam_slots_domain::{
    Enrolment, Exam, ExamHosting, ExamState, ExceptionHours, ExceptionKind, ExternalReservation,
    Interval, Machine, MailAddress, OpeningHours, Room, RoomState, StartingHour,
};
use std::collections::BTreeSet;

use crate::Persistence;

pub const USER: i64 = 7;
pub const OTHER_USER: i64 = 8;

pub fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

pub fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub fn interval(start: DateTime<Utc>, end: DateTime<Utc>) -> Interval {
    Interval::new(start, end).unwrap()
}

/// Monday 2026-05-04, 10:00-11:00 in Helsinki.
pub fn create_test_slot() -> Interval {
    interval(utc(2026, 5, 4, 7, 0), utc(2026, 5, 4, 8, 0))
}

pub fn create_test_now() -> DateTime<Utc> {
    utc(2026, 4, 30, 12, 0)
}

pub fn create_test_room() -> Room {
    Room {
        room_id: 0,
        name: String::from("Exam Hall A"),
        room_code: Some(String::from("A-101")),
        local_timezone: String::from("Europe/Helsinki"),
        out_of_service: false,
        state: RoomState::Active,
        opening_hours: [Weekday::Mon, Weekday::Tue, Weekday::Wed]
            .into_iter()
            .map(|day| OpeningHours::from_local(day, time(9, 0), time(17, 0), 180))
            .collect(),
        exceptions: vec![
            ExceptionHours {
                first_day: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
                last_day: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
                kind: ExceptionKind::Closed,
            },
            ExceptionHours {
                first_day: NaiveDate::from_ymd_opt(2026, 6, 19).unwrap(),
                last_day: NaiveDate::from_ymd_opt(2026, 6, 19).unwrap(),
                kind: ExceptionKind::Open {
                    opens: time(10, 0),
                    closes: time(14, 0),
                },
            },
        ],
        starting_hours: vec![
            StartingHour::from_local(time(9, 0), 180),
            StartingHour::from_local(time(10, 0), 180),
        ],
        accessibility_ids: BTreeSet::from([1, 2]),
        address: MailAddress {
            street: String::from("Yliopistonkatu 4"),
            zip: String::from("00100"),
            city: String::from("Helsinki"),
        },
        building_name: Some(String::from("Main Building")),
        campus: None,
    }
}

pub fn create_test_machine(room_id: i64, name: &str) -> Machine {
    Machine {
        machine_id: 0,
        room_id,
        name: Some(name.to_string()),
        ip_address: Some(String::from("10.0.0.1")),
        out_of_service: false,
        archived: false,
        accessible: true,
        accessibility_ids: BTreeSet::from([1]),
        software_ids: BTreeSet::from([10, 11]),
    }
}

pub fn create_test_exam(private: bool) -> Exam {
    Exam {
        exam_id: 0,
        name: String::from("Linear Algebra"),
        duration_minutes: 60,
        period_start: utc(2026, 5, 1, 0, 0),
        period_end: utc(2026, 6, 30, 21, 0),
        required_software: BTreeSet::from([10]),
        state: ExamState::Published,
        private,
        hosting: ExamHosting::Local,
    }
}

pub fn create_test_external(external_ref: &str) -> ExternalReservation {
    ExternalReservation {
        external_ref: external_ref.to_string(),
        org_ref: String::from("org-tampere"),
        room_ref: String::from("room-7"),
        org_name: Some(String::from("Tampere University")),
        org_code: Some(String::from("TUNI")),
        machine_name: String::from("TRE-12"),
        room_name: String::from("Pinni B"),
        room_code: None,
        room_timezone: String::from("Europe/Helsinki"),
        building_name: None,
        campus: Some(String::from("City Centre")),
    }
}

/// A room with two machines, an exam and the test user's enrolment.
pub struct Fixture {
    pub room_id: i64,
    pub machine_ids: Vec<i64>,
    pub exam_id: i64,
    pub enrolment: Enrolment,
}

pub fn create_test_fixture(persistence: &mut Persistence) -> Fixture {
    let room_id: i64 = persistence.insert_room(&create_test_room()).unwrap();
    let machine_ids: Vec<i64> = ["PC-1", "PC-2"]
        .into_iter()
        .map(|name| {
            persistence
                .insert_machine(&create_test_machine(room_id, name))
                .unwrap()
        })
        .collect();
    let exam_id: i64 = persistence.insert_exam(&create_test_exam(false)).unwrap();
    let enrolment: Enrolment = persistence.insert_enrolment(USER, exam_id).unwrap();
    Fixture {
        room_id,
        machine_ids,
        exam_id,
        enrolment,
    }
}

pub fn create_test_plan(
    enrolment: &Enrolment,
    slot: Interval,
    candidate_machines: Vec<i64>,
) -> LocalAllocationPlan {
    LocalAllocationPlan {
        enrolment_id: enrolment.enrolment_id,
        user_id: enrolment.user_id,
        interval: slot,
        candidate_machines,
        reminder_sent: false,
        replaces: enrolment.reservation_id,
    }
}

pub fn create_test_delegated_plan(enrolment: &Enrolment, slot: Interval) -> DelegatedAllocationPlan {
    DelegatedAllocationPlan {
        enrolment_id: enrolment.enrolment_id,
        user_id: enrolment.user_id,
        interval: slot,
        target: ExternalTarget {
            org_ref: String::from("org-tampere"),
            room_ref: String::from("room-7"),
        },
        reminder_sent: false,
        replaces: None,
    }
}
