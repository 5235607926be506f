// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use diesel::prelude::*;

use super::{create_test_fixture, create_test_machine, create_test_room, create_test_slot, interval, utc};
use crate::diesel_schema::{enrolments, reservations};
use crate::error::PersistenceError;
use crate::Persistence;

#[test]
fn test_persistence_initialization() {
    let result: Result<Persistence, PersistenceError> = Persistence::new_in_memory();
    assert!(result.is_ok());
}

#[test]
fn test_multiple_in_memory_instances_are_isolated() {
    let mut db1: Persistence = Persistence::new_in_memory().unwrap();
    let mut db2: Persistence = Persistence::new_in_memory().unwrap();

    let room_id: i64 = db1.insert_room(&create_test_room()).unwrap();

    assert!(db1.get_room(room_id).unwrap().is_some());
    assert!(db2.get_room(room_id).unwrap().is_none());
}

#[test]
fn test_foreign_keys_are_enforced() {
    let mut persistence: Persistence = Persistence::new_in_memory().unwrap();

    let result: Result<i64, PersistenceError> =
        persistence.insert_machine(&create_test_machine(999, "Orphan"));

    assert!(matches!(
        result,
        Err(PersistenceError::ConstraintViolation(_))
    ));
}

#[test]
fn test_trigger_rejects_overlapping_machine_reservations() {
    let mut persistence: Persistence = Persistence::new_in_memory().unwrap();
    let fixture = create_test_fixture(&mut persistence);
    let machine_id: i64 = fixture.machine_ids[0];

    let insert = |conn: &mut diesel::SqliteConnection, start: i64, end: i64| {
        diesel::insert_into(reservations::table)
            .values((
                reservations::user_id.eq(1_i64),
                reservations::machine_id.eq(Some(machine_id)),
                reservations::start_at.eq(start),
                reservations::end_at.eq(end),
            ))
            .execute(conn)
            .map_err(PersistenceError::from)
    };

    let slot = create_test_slot();
    let start: i64 = slot.start().timestamp();
    let end: i64 = slot.end().timestamp();

    insert(&mut persistence.conn, start, end).unwrap();
    // Touching is allowed; half an hour of overlap is not.
    insert(&mut persistence.conn, end, end + 3600).unwrap();
    let overlapping = insert(&mut persistence.conn, start + 1800, end + 1800);

    assert_eq!(overlapping, Err(PersistenceError::ReservationOverlap));
}

#[test]
fn test_reservation_belongs_to_at_most_one_enrolment() {
    let mut persistence: Persistence = Persistence::new_in_memory().unwrap();
    let fixture = create_test_fixture(&mut persistence);
    let other = persistence
        .insert_enrolment(super::OTHER_USER, fixture.exam_id)
        .unwrap();

    let committed = persistence
        .commit_local_reservation(
            &super::create_test_plan(&fixture.enrolment, create_test_slot(), vec![fixture.machine_ids[0]]),
            super::create_test_now(),
        )
        .unwrap();

    let result = diesel::update(enrolments::table.find(other.enrolment_id))
        .set(enrolments::reservation_id.eq(Some(committed.reservation.reservation_id)))
        .execute(&mut persistence.conn)
        .map_err(PersistenceError::from);

    assert!(matches!(
        result,
        Err(PersistenceError::ConstraintViolation(_))
    ));
}

#[test]
fn test_reversed_interval_is_rejected_by_schema() {
    let mut persistence: Persistence = Persistence::new_in_memory().unwrap();
    let slot = interval(utc(2026, 5, 4, 7, 0), utc(2026, 5, 4, 8, 0));

    let result = diesel::insert_into(reservations::table)
        .values((
            reservations::user_id.eq(1_i64),
            reservations::start_at.eq(slot.end().timestamp()),
            reservations::end_at.eq(slot.start().timestamp()),
        ))
        .execute(&mut persistence.conn)
        .map_err(PersistenceError::from);

    assert!(matches!(
        result,
        Err(PersistenceError::ConstraintViolation(_))
    ));
}
