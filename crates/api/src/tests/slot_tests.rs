// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use exam_slots_domain::{ExamHosting, Interval, PrecomputedSlot, Room, RoomState};
use exam_slots_notify::RecordingNotificationSink;

use super::helpers::{
    FakeExternalService, FakeState, OTHER_USER, USER, create_booking_request, create_slots_request,
    create_test_config, create_test_exam, create_test_fixture, create_test_now, create_test_room,
    monday_ten, utc,
};
use crate::{
    ApiError, CreateMaintenancePeriodRequest, ExternalServiceError, GetExternalSlotsRequest,
    GetSlotsRequest, GetSlotsResponse, SlotStatusResponse, create_maintenance_period,
    create_or_replace_reservation, get_external_slots, get_slots, register_room,
};

const MONDAY: &str = "04.05.2026";

fn monday(response: &GetSlotsResponse) -> &[SlotStatusResponse] {
    response.get(MONDAY).expect("Monday should be in the response")
}

#[tokio::test]
async fn test_open_room_offers_every_hourly_slot_with_all_machines() {
    let mut fixture = create_test_fixture(2, ExamHosting::Local);
    let request: GetSlotsRequest = create_slots_request(&fixture, USER, fixture.exam_id);

    let response: GetSlotsResponse = get_slots(
        fixture.persistence.get_mut(),
        &request,
        &create_test_config(),
        create_test_now(),
    )
    .unwrap();

    let slots: &[SlotStatusResponse] = monday(&response);
    assert_eq!(slots.len(), 8);
    assert_eq!(slots[0].start, utc(2026, 5, 4, 6, 0));
    assert_eq!(slots[7].end, utc(2026, 5, 4, 14, 0));
    assert!(slots.iter().all(|s| s.available_machines == 2));
    assert!(slots.iter().all(|s| !s.own_reservation && s.conflicting_exam.is_none()));
}

#[tokio::test]
async fn test_every_day_of_the_week_is_keyed() {
    let mut fixture = create_test_fixture(1, ExamHosting::Local);
    let request: GetSlotsRequest = create_slots_request(&fixture, USER, fixture.exam_id);

    let response: GetSlotsResponse = get_slots(
        fixture.persistence.get_mut(),
        &request,
        &create_test_config(),
        create_test_now(),
    )
    .unwrap();

    let keys: Vec<&str> = response.keys().map(String::as_str).collect();
    assert_eq!(keys.len(), 7);
    assert!(keys.contains(&"10.05.2026"));
    assert!(response["09.05.2026"].is_empty());
    assert!(response["10.05.2026"].is_empty());
    assert_eq!(response["08.05.2026"].len(), 8);
}

#[tokio::test]
async fn test_reservation_by_another_user_takes_the_only_machine() {
    let mut fixture = create_test_fixture(1, ExamHosting::Local);
    let exam_id: i64 = fixture.exam_id;
    fixture.enrol(OTHER_USER, exam_id);
    let (start, end) = monday_ten();
    create_or_replace_reservation(
        &fixture.persistence,
        &None::<FakeExternalService>,
        &RecordingNotificationSink::new(),
        &create_booking_request(&fixture, OTHER_USER, exam_id, start, end),
        &create_test_config(),
        create_test_now(),
    )
    .await
    .unwrap();

    let request: GetSlotsRequest = create_slots_request(&fixture, USER, exam_id);
    let response: GetSlotsResponse = get_slots(
        fixture.persistence.get_mut(),
        &request,
        &create_test_config(),
        create_test_now(),
    )
    .unwrap();

    let slots: &[SlotStatusResponse] = monday(&response);
    assert_eq!(slots.len(), 8);
    for slot in slots {
        if slot.start == start {
            assert_eq!(slot.available_machines, 0);
        } else {
            assert_eq!(slot.available_machines, 1, "slot at {}", slot.start);
        }
    }
}

#[tokio::test]
async fn test_reservation_for_other_exam_marks_conflict() {
    let mut fixture = create_test_fixture(2, ExamHosting::Local);
    let algebra: i64 = fixture.exam_id;
    let statistics: i64 = fixture
        .add_exam(&create_test_exam("Statistics", ExamHosting::Local), USER)
        .exam_id;
    let (start, end) = monday_ten();
    create_or_replace_reservation(
        &fixture.persistence,
        &None::<FakeExternalService>,
        &RecordingNotificationSink::new(),
        &create_booking_request(&fixture, USER, algebra, start, end),
        &create_test_config(),
        create_test_now(),
    )
    .await
    .unwrap();

    let request: GetSlotsRequest = create_slots_request(&fixture, USER, statistics);
    let response: GetSlotsResponse = get_slots(
        fixture.persistence.get_mut(),
        &request,
        &create_test_config(),
        create_test_now(),
    )
    .unwrap();

    let slots: &[SlotStatusResponse] = monday(&response);
    let conflict: &SlotStatusResponse = slots.iter().find(|s| s.start == start).unwrap();
    assert_eq!(conflict.conflicting_exam.as_deref(), Some("Linear Algebra"));
    assert_eq!(conflict.available_machines, -1);
    assert!(!conflict.own_reservation);
    assert_eq!(
        slots.iter().filter(|s| s.conflicting_exam.is_some()).count(),
        1
    );
}

#[tokio::test]
async fn test_own_reservation_is_flagged() {
    let mut fixture = create_test_fixture(2, ExamHosting::Local);
    let exam_id: i64 = fixture.exam_id;
    let (start, end) = monday_ten();
    create_or_replace_reservation(
        &fixture.persistence,
        &None::<FakeExternalService>,
        &RecordingNotificationSink::new(),
        &create_booking_request(&fixture, USER, exam_id, start, end),
        &create_test_config(),
        create_test_now(),
    )
    .await
    .unwrap();

    let request: GetSlotsRequest = create_slots_request(&fixture, USER, exam_id);
    let response: GetSlotsResponse = get_slots(
        fixture.persistence.get_mut(),
        &request,
        &create_test_config(),
        create_test_now(),
    )
    .unwrap();

    let own: &SlotStatusResponse = monday(&response)
        .iter()
        .find(|s| s.start == start)
        .unwrap();
    assert!(own.own_reservation);
    assert_eq!(own.available_machines, -1);
}

#[tokio::test]
async fn test_maintenance_period_removes_overlapping_slot() {
    let mut fixture = create_test_fixture(2, ExamHosting::Local);
    let request: GetSlotsRequest = create_slots_request(&fixture, USER, fixture.exam_id);
    create_maintenance_period(
        fixture.persistence.get_mut(),
        &CreateMaintenancePeriodRequest {
            start: utc(2026, 5, 4, 9, 0),
            end: utc(2026, 5, 4, 10, 0),
            description: String::from("Network upgrade"),
        },
    )
    .unwrap();

    let response: GetSlotsResponse = get_slots(
        fixture.persistence.get_mut(),
        &request,
        &create_test_config(),
        create_test_now(),
    )
    .unwrap();

    let slots: &[SlotStatusResponse] = monday(&response);
    assert_eq!(slots.len(), 7);
    assert!(slots.iter().all(|s| s.start != utc(2026, 5, 4, 9, 0)));
}

#[tokio::test]
async fn test_unmet_room_accessibility_yields_empty_result() {
    let mut fixture = create_test_fixture(2, ExamHosting::Local);
    let mut request: GetSlotsRequest = create_slots_request(&fixture, USER, fixture.exam_id);
    request.accessibility_ids = BTreeSet::from([5]);

    let response: GetSlotsResponse = get_slots(
        fixture.persistence.get_mut(),
        &request,
        &create_test_config(),
        create_test_now(),
    )
    .unwrap();

    assert!(response.is_empty());
}

#[tokio::test]
async fn test_inactive_room_yields_empty_result() {
    let mut fixture = create_test_fixture(2, ExamHosting::Local);
    let mut room: Room = create_test_room();
    room.state = RoomState::Inactive;
    let room_id: i64 = register_room(fixture.persistence.get_mut(), &room).unwrap();
    let mut request: GetSlotsRequest = create_slots_request(&fixture, USER, fixture.exam_id);
    request.room_id = room_id;

    let response: GetSlotsResponse = get_slots(
        fixture.persistence.get_mut(),
        &request,
        &create_test_config(),
        create_test_now(),
    )
    .unwrap();

    assert!(response.is_empty());
}

#[tokio::test]
async fn test_search_beyond_reservation_window_is_rejected() {
    let mut fixture = create_test_fixture(1, ExamHosting::Local);
    let mut request: GetSlotsRequest = create_slots_request(&fixture, USER, fixture.exam_id);
    request.day = Some(String::from("2026-06-15"));

    let result: Result<GetSlotsResponse, ApiError> = get_slots(
        fixture.persistence.get_mut(),
        &request,
        &create_test_config(),
        create_test_now(),
    );

    assert!(matches!(
        result,
        Err(ApiError::SearchDateOutOfRange { requested, .. })
            if requested == NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()
    ));
}

#[tokio::test]
async fn test_malformed_day_is_invalid_input() {
    let mut fixture = create_test_fixture(1, ExamHosting::Local);
    let mut request: GetSlotsRequest = create_slots_request(&fixture, USER, fixture.exam_id);
    request.day = Some(String::from("04.05.2026"));

    let result: Result<GetSlotsResponse, ApiError> = get_slots(
        fixture.persistence.get_mut(),
        &request,
        &create_test_config(),
        create_test_now(),
    );

    assert!(matches!(result, Err(ApiError::InvalidInput { .. })));
}

#[tokio::test]
async fn test_slots_require_an_enrolment() {
    let mut fixture = create_test_fixture(1, ExamHosting::Local);
    let request: GetSlotsRequest = create_slots_request(&fixture, OTHER_USER, fixture.exam_id);

    let result: Result<GetSlotsResponse, ApiError> = get_slots(
        fixture.persistence.get_mut(),
        &request,
        &create_test_config(),
        create_test_now(),
    );

    assert!(matches!(result, Err(ApiError::NotFound { .. })));
}

// ============================================================================
// Slots in collaborating organisations
// ============================================================================

fn create_external_slots_request(exam_id: i64) -> GetExternalSlotsRequest {
    GetExternalSlotsRequest {
        user_id: USER,
        exam_id,
        org_ref: String::from("org-tampere"),
        room_ref: String::from("room-7"),
        day: Some(String::from("2026-05-04")),
    }
}

fn remote_slot(start_hour: u32, day: u32, available_machines: i64) -> PrecomputedSlot {
    PrecomputedSlot {
        interval: Interval::new(
            utc(2026, 5, day, start_hour, 0),
            utc(2026, 5, day, start_hour + 1, 0),
        )
        .unwrap(),
        available_machines,
    }
}

#[tokio::test]
async fn test_external_slots_are_grouped_by_local_day() {
    let fixture = create_test_fixture(0, ExamHosting::Federated);
    let external: FakeExternalService = FakeExternalService::with_state(FakeState {
        slots: vec![remote_slot(7, 4, 3), remote_slot(7, 5, 0), remote_slot(22, 5, 1)],
        ..FakeState::default()
    });

    let response: GetSlotsResponse = get_external_slots(
        &fixture.persistence,
        &external,
        &create_external_slots_request(fixture.exam_id),
        &create_test_config(),
        create_test_now(),
    )
    .await
    .unwrap();

    assert_eq!(response[MONDAY].len(), 1);
    assert_eq!(response[MONDAY][0].available_machines, 3);
    assert_eq!(response["05.05.2026"].len(), 1);
    assert_eq!(response["05.05.2026"][0].available_machines, 0);
    // 22:00 UTC is already Wednesday in Helsinki.
    assert_eq!(response["06.05.2026"].len(), 1);

    let queries = external.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].date, NaiveDate::from_ymd_opt(2026, 5, 4).unwrap());
    assert_eq!(queries[0].duration_minutes, 60);
}

#[tokio::test]
async fn test_external_slots_apply_local_maintenance() {
    let mut fixture = create_test_fixture(0, ExamHosting::Federated);
    create_maintenance_period(
        fixture.persistence.get_mut(),
        &CreateMaintenancePeriodRequest {
            start: utc(2026, 5, 4, 7, 0),
            end: utc(2026, 5, 4, 8, 0),
            description: String::from("Central system upgrade"),
        },
    )
    .unwrap();
    let external: FakeExternalService = FakeExternalService::with_state(FakeState {
        slots: vec![remote_slot(7, 4, 3), remote_slot(8, 4, 2)],
        ..FakeState::default()
    });

    let response: GetSlotsResponse = get_external_slots(
        &fixture.persistence,
        &external,
        &create_external_slots_request(fixture.exam_id),
        &create_test_config(),
        create_test_now(),
    )
    .await
    .unwrap();

    assert_eq!(response[MONDAY].len(), 1);
    assert_eq!(response[MONDAY][0].start, utc(2026, 5, 4, 8, 0));
}

#[tokio::test]
async fn test_external_slots_for_local_exam_are_refused() {
    let fixture = create_test_fixture(1, ExamHosting::Local);
    let external: FakeExternalService = FakeExternalService::new();

    let result: Result<GetSlotsResponse, ApiError> = get_external_slots(
        &fixture.persistence,
        &external,
        &create_external_slots_request(fixture.exam_id),
        &create_test_config(),
        create_test_now(),
    )
    .await;

    assert!(matches!(result, Err(ApiError::InvalidInput { .. })));
    assert!(external.queries().is_empty());
}

#[tokio::test]
async fn test_external_slots_without_federation_host_fail() {
    let fixture = create_test_fixture(0, ExamHosting::Federated);

    let result: Result<GetSlotsResponse, ApiError> = get_external_slots(
        &fixture.persistence,
        &None::<FakeExternalService>,
        &create_external_slots_request(fixture.exam_id),
        &create_test_config(),
        create_test_now(),
    )
    .await;

    assert_eq!(
        result,
        Err(ApiError::ExternalDelegationFailure(
            ExternalServiceError::Disabled
        ))
    );
}

#[tokio::test]
async fn test_stored_exam_with_huge_duration_offers_no_slots() {
    let mut fixture = create_test_fixture(1, ExamHosting::Local);
    let mut exam = create_test_exam("Marathon", ExamHosting::Local);
    exam.duration_minutes = 200_000_000_000;
    let exam_id: i64 = fixture.persistence.get_mut().insert_exam(&exam).unwrap();
    fixture.enrol(USER, exam_id);
    let request: GetSlotsRequest = create_slots_request(&fixture, USER, exam_id);

    let response: GetSlotsResponse = get_slots(
        fixture.persistence.get_mut(),
        &request,
        &create_test_config(),
        create_test_now(),
    )
    .unwrap();

    assert!(!response.is_empty());
    assert!(response.values().all(Vec::is_empty));
}
