// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Test helper functions and fixtures.

use std::collections::BTreeSet;
use std::sync::Mutex as StdMutex;

use chrono::{DateTime, NaiveTime, TimeZone, Utc, Weekday};
use exam_slots_domain::{
    Exam, ExamHosting, ExamState, ExternalReservation, Machine, MailAddress, OpeningHours,
    PrecomputedSlot, Room, RoomState, SchedulingConfig,
};
use exam_slots_persistence::Persistence;
use tokio::sync::Mutex;

use crate::{
    CreateReservationRequest, EnrolmentInfo, ExternalReservationService, ExternalRoomRequest,
    ExternalServiceError, GetSlotsRequest, RemoteReservationRequest, RemoteSlotQuery,
    SharedPersistence, enrol, register_exam, register_machine, register_room,
};

pub const USER: i64 = 7;
pub const OTHER_USER: i64 = 8;

pub fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

pub fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// Thursday 2026-04-30, 15:00 in Helsinki.
pub fn create_test_now() -> DateTime<Utc> {
    utc(2026, 4, 30, 12, 0)
}

pub fn create_test_config() -> SchedulingConfig {
    SchedulingConfig::new(30, "Europe/Helsinki").unwrap()
}

/// Monday 2026-05-04 10:00-11:00 in Helsinki.
pub fn monday_ten() -> (DateTime<Utc>, DateTime<Utc>) {
    (utc(2026, 5, 4, 7, 0), utc(2026, 5, 4, 8, 0))
}

/// Open 09:00-17:00 Helsinki time on weekdays, hourly starts.
pub fn create_test_room() -> Room {
    Room {
        room_id: 0,
        name: String::from("Exam Hall A"),
        room_code: Some(String::from("A-101")),
        local_timezone: String::from("Europe/Helsinki"),
        out_of_service: false,
        state: RoomState::Active,
        opening_hours: [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
        ]
        .into_iter()
        .map(|day| OpeningHours::from_local(day, time(9, 0), time(17, 0), 180))
        .collect(),
        exceptions: Vec::new(),
        starting_hours: Vec::new(),
        accessibility_ids: BTreeSet::new(),
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
        accessibility_ids: BTreeSet::new(),
        software_ids: BTreeSet::from([10]),
    }
}

pub fn create_test_exam(name: &str, hosting: ExamHosting) -> Exam {
    Exam {
        exam_id: 0,
        name: name.to_string(),
        duration_minutes: 60,
        period_start: utc(2026, 5, 1, 0, 0),
        period_end: utc(2026, 6, 30, 21, 0),
        required_software: BTreeSet::from([10]),
        state: ExamState::Published,
        private: false,
        hosting,
    }
}

/// A registered room with machines and one exam the test user is enrolled in.
pub struct Fixture {
    pub persistence: SharedPersistence,
    pub room_id: i64,
    pub machine_ids: Vec<i64>,
    pub exam_id: i64,
    pub enrolment: EnrolmentInfo,
}

impl Fixture {
    /// Registers another exam with the given settings and enrols `user_id`.
    pub fn add_exam(&mut self, exam: &Exam, user_id: i64) -> EnrolmentInfo {
        let persistence: &mut Persistence = self.persistence.get_mut();
        let exam_id: i64 = register_exam(persistence, exam).unwrap();
        enrol(persistence, user_id, exam_id).unwrap()
    }

    pub fn enrol(&mut self, user_id: i64, exam_id: i64) -> EnrolmentInfo {
        enrol(self.persistence.get_mut(), user_id, exam_id).unwrap()
    }
}

pub fn create_test_fixture(machine_count: usize, hosting: ExamHosting) -> Fixture {
    let mut persistence: Persistence = Persistence::new_in_memory().unwrap();
    let room_id: i64 = register_room(&mut persistence, &create_test_room()).unwrap();
    let machine_ids: Vec<i64> = (1..=machine_count)
        .map(|n| {
            register_machine(
                &mut persistence,
                &create_test_machine(room_id, &format!("ws-{n}")),
            )
            .unwrap()
        })
        .collect();
    let exam_id: i64 =
        register_exam(&mut persistence, &create_test_exam("Linear Algebra", hosting)).unwrap();
    let enrolment: EnrolmentInfo = enrol(&mut persistence, USER, exam_id).unwrap();
    Fixture {
        persistence: Mutex::new(persistence),
        room_id,
        machine_ids,
        exam_id,
        enrolment,
    }
}

pub fn create_slots_request(fixture: &Fixture, user_id: i64, exam_id: i64) -> GetSlotsRequest {
    GetSlotsRequest {
        user_id,
        exam_id,
        room_id: fixture.room_id,
        day: Some(String::from("2026-05-04")),
        accessibility_ids: BTreeSet::new(),
    }
}

pub fn create_booking_request(
    fixture: &Fixture,
    user_id: i64,
    exam_id: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> CreateReservationRequest {
    CreateReservationRequest {
        user_id,
        exam_id,
        room_id: fixture.room_id,
        start,
        end,
        accessibility_ids: BTreeSet::new(),
        external: None,
    }
}

pub fn create_external_booking_request(
    user_id: i64,
    exam_id: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> CreateReservationRequest {
    CreateReservationRequest {
        user_id,
        exam_id,
        room_id: 0,
        start,
        end,
        accessibility_ids: BTreeSet::new(),
        external: Some(ExternalRoomRequest {
            org_ref: String::from("org-tampere"),
            room_ref: String::from("room-7"),
        }),
    }
}

// ============================================================================
// Fake collaborating organisation
// ============================================================================

#[derive(Debug, Default)]
pub struct FakeState {
    pub created: Vec<RemoteReservationRequest>,
    pub cancelled: Vec<String>,
    pub queries: Vec<RemoteSlotQuery>,
    pub slots: Vec<PrecomputedSlot>,
    pub create_failure: Option<ExternalServiceError>,
    pub cancel_failure: Option<ExternalServiceError>,
    /// Reference handed out for every booking instead of a fresh one.
    pub fixed_ref: Option<String>,
}

#[derive(Debug, Default)]
pub struct FakeExternalService {
    state: StdMutex<FakeState>,
}

impl FakeExternalService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: FakeState) -> Self {
        Self {
            state: StdMutex::new(state),
        }
    }

    pub fn created(&self) -> Vec<RemoteReservationRequest> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.state.lock().unwrap().cancelled.clone()
    }

    pub fn queries(&self) -> Vec<RemoteSlotQuery> {
        self.state.lock().unwrap().queries.clone()
    }
}

pub fn create_test_snapshot(external_ref: String, request: &RemoteReservationRequest) -> ExternalReservation {
    ExternalReservation {
        external_ref,
        org_ref: request.org_ref.clone(),
        room_ref: request.room_ref.clone(),
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

impl ExternalReservationService for FakeExternalService {
    async fn create_reservation(
        &self,
        request: &RemoteReservationRequest,
    ) -> Result<ExternalReservation, ExternalServiceError> {
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.create_failure.clone() {
            return Err(err);
        }
        state.created.push(request.clone());
        let external_ref: String = state
            .fixed_ref
            .clone()
            .unwrap_or_else(|| format!("ext-{}", state.created.len()));
        Ok(create_test_snapshot(external_ref, request))
    }

    async fn cancel_reservation(
        &self,
        _org_ref: &str,
        _room_ref: &str,
        external_ref: &str,
    ) -> Result<(), ExternalServiceError> {
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.cancel_failure.clone() {
            return Err(err);
        }
        state.cancelled.push(external_ref.to_string());
        Ok(())
    }

    async fn fetch_slots(
        &self,
        query: &RemoteSlotQuery,
    ) -> Result<Vec<PrecomputedSlot>, ExternalServiceError> {
        let mut state = self.state.lock().unwrap();
        state.queries.push(query.clone());
        Ok(state.slots.clone())
    }
}
