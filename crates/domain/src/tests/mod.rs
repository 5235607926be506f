// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![allow(clippy::expect_used, clippy::unwrap_used)]


use crate::{
    Exam, ExamHosting, ExamState, Interval, Machine, MailAddress, MaintenancePeriod,
    OpeningHours, Room, RoomState,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use std::collections::BTreeSet;

pub(crate) fn utc(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .unwrap()
        .with_timezone(&Utc)
}

pub(crate) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub(crate) fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

pub(crate) fn interval(start: &str, end: &str) -> Interval {
    Interval::new(utc(start), utc(end)).unwrap()
}

/// Weekday 09:00-17:00 room in Helsinki, configured while at +02:00.
pub(crate) fn create_test_room() -> Room {
    let weekdays: [Weekday; 5] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ];
    Room {
        room_id: 1,
        name: String::from("Exam Hall A"),
        room_code: Some(String::from("A101")),
        local_timezone: String::from("Europe/Helsinki"),
        out_of_service: false,
        state: RoomState::Active,
        opening_hours: weekdays
            .iter()
            .map(|d| OpeningHours::from_local(*d, time(9, 0), time(17, 0), 120))
            .collect(),
        exceptions: Vec::new(),
        starting_hours: Vec::new(),
        accessibility_ids: BTreeSet::from([1, 2]),
        address: MailAddress {
            street: String::from("Yliopistonkatu 1"),
            zip: String::from("00100"),
            city: String::from("Helsinki"),
        },
        building_name: Some(String::from("Main Building")),
        campus: Some(String::from("City Centre")),
    }
}

pub(crate) fn create_test_machine(machine_id: i64) -> Machine {
    Machine {
        machine_id,
        room_id: 1,
        name: Some(format!("ws-{machine_id}")),
        ip_address: Some(format!("10.0.0.{machine_id}")),
        out_of_service: false,
        archived: false,
        accessible: false,
        accessibility_ids: BTreeSet::new(),
        software_ids: BTreeSet::from([10]),
    }
}

pub(crate) fn create_test_exam() -> Exam {
    Exam {
        exam_id: 100,
        name: String::from("Linear Algebra"),
        duration_minutes: 60,
        period_start: utc("2026-05-01T00:00:00Z"),
        period_end: utc("2026-06-30T21:00:00Z"),
        required_software: BTreeSet::from([10]),
        state: ExamState::Published,
        private: false,
        hosting: ExamHosting::Local,
    }
}

pub(crate) fn create_test_maintenance(start: &str, end: &str) -> MaintenancePeriod {
    MaintenancePeriod {
        maintenance_period_id: 1,
        interval: interval(start, end),
        description: String::from("network upgrade"),
    }
}
