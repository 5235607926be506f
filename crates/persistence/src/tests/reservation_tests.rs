// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use exam_slots_domain::{
    Enrolment, Interval, MachineBooking, Reservation, ReservationTarget, UserReservation,
};

use super::{
    Fixture, OTHER_USER, USER, create_test_delegated_plan, create_test_exam, create_test_external,
    create_test_fixture, create_test_now, create_test_plan, create_test_slot, interval, utc,
};
use crate::error::PersistenceError;
use crate::{CommittedReservation, MachineChange, NoShowOutcome, Persistence};

fn setup() -> (Persistence, Fixture) {
    let mut persistence: Persistence = Persistence::new_in_memory().unwrap();
    let fixture: Fixture = create_test_fixture(&mut persistence);
    (persistence, fixture)
}

fn later_slot() -> Interval {
    interval(utc(2026, 5, 4, 9, 0), utc(2026, 5, 4, 10, 0))
}

/// Books `slot` on `machine_id` for a second user enrolled in the same exam.
fn book_for_other_user(persistence: &mut Persistence, fixture: &Fixture, slot: Interval, machine_id: i64) -> Reservation {
    let other: Enrolment = persistence
        .insert_enrolment(OTHER_USER, fixture.exam_id)
        .unwrap();
    persistence
        .commit_local_reservation(&create_test_plan(&other, slot, vec![machine_id]), create_test_now())
        .unwrap()
        .reservation
}

#[test]
fn test_commit_binds_enrolment_to_first_free_candidate() {
    let (mut persistence, fixture) = setup();
    let plan = create_test_plan(
        &fixture.enrolment,
        create_test_slot(),
        vec![fixture.machine_ids[1], fixture.machine_ids[0]],
    );

    let committed: CommittedReservation = persistence
        .commit_local_reservation(&plan, create_test_now())
        .unwrap();

    assert_eq!(committed.previous, None);
    assert_eq!(committed.reservation.user_id, USER);
    assert_eq!(committed.reservation.interval, create_test_slot());
    assert_eq!(
        committed.reservation.target,
        ReservationTarget::Machine(fixture.machine_ids[1])
    );

    let enrolment: Enrolment = persistence
        .get_enrolment(fixture.enrolment.enrolment_id)
        .unwrap()
        .unwrap();
    assert_eq!(
        enrolment.reservation_id,
        Some(committed.reservation.reservation_id)
    );
}

#[test]
fn test_commit_skips_candidates_taken_since_planning() {
    let (mut persistence, fixture) = setup();
    book_for_other_user(&mut persistence, &fixture, create_test_slot(), fixture.machine_ids[0]);

    let plan = create_test_plan(&fixture.enrolment, create_test_slot(), fixture.machine_ids.clone());
    let committed: CommittedReservation = persistence
        .commit_local_reservation(&plan, create_test_now())
        .unwrap();

    assert_eq!(committed.reservation.machine_id(), Some(fixture.machine_ids[1]));
}

#[test]
fn test_commit_fails_when_every_candidate_is_taken() {
    let (mut persistence, fixture) = setup();
    book_for_other_user(&mut persistence, &fixture, create_test_slot(), fixture.machine_ids[0]);

    let plan = create_test_plan(&fixture.enrolment, create_test_slot(), vec![fixture.machine_ids[0]]);
    let result = persistence.commit_local_reservation(&plan, create_test_now());

    assert_eq!(result, Err(PersistenceError::NoMachineAvailable));
    let enrolment: Enrolment = persistence
        .get_enrolment(fixture.enrolment.enrolment_id)
        .unwrap()
        .unwrap();
    assert_eq!(enrolment.reservation_id, None);
}

#[test]
fn test_replacing_deletes_previous_local_reservation() {
    let (mut persistence, fixture) = setup();
    let first: Reservation = persistence
        .commit_local_reservation(
            &create_test_plan(&fixture.enrolment, create_test_slot(), vec![fixture.machine_ids[0]]),
            create_test_now(),
        )
        .unwrap()
        .reservation;

    let second: CommittedReservation = persistence
        .commit_local_reservation(
            &create_test_plan(&fixture.enrolment, later_slot(), vec![fixture.machine_ids[0]]),
            create_test_now(),
        )
        .unwrap();

    assert_eq!(second.previous, Some(first.clone()));
    assert!(persistence.get_reservation(first.reservation_id).unwrap().is_none());

    let held: Vec<UserReservation> = persistence.list_user_reservations(USER).unwrap();
    assert_eq!(held.len(), 1);
    assert_eq!(held[0].reservation_id, second.reservation.reservation_id);
    assert_eq!(held[0].exam_name, create_test_exam(false).name);
}

#[test]
fn test_own_overlapping_reservation_blocks_its_machine() {
    let (mut persistence, fixture) = setup();
    let plan = create_test_plan(&fixture.enrolment, create_test_slot(), vec![fixture.machine_ids[0]]);
    persistence
        .commit_local_reservation(&plan, create_test_now())
        .unwrap();

    let repeated = persistence.commit_local_reservation(&plan, create_test_now());

    assert_eq!(repeated, Err(PersistenceError::NoMachineAvailable));
    assert_eq!(persistence.list_user_reservations(USER).unwrap().len(), 1);
}

#[test]
fn test_started_reservation_cannot_be_replaced() {
    let (mut persistence, fixture) = setup();
    let first: Reservation = persistence
        .commit_local_reservation(
            &create_test_plan(&fixture.enrolment, create_test_slot(), vec![fixture.machine_ids[0]]),
            create_test_now(),
        )
        .unwrap()
        .reservation;

    let during = utc(2026, 5, 4, 7, 30);
    let result = persistence.commit_local_reservation(
        &create_test_plan(&fixture.enrolment, later_slot(), vec![fixture.machine_ids[1]]),
        during,
    );

    assert_eq!(
        result,
        Err(PersistenceError::ReservationInEffect {
            reservation_id: first.reservation_id
        })
    );
    assert!(persistence.get_reservation(first.reservation_id).unwrap().is_some());
}

#[test]
fn test_reminder_flag_is_stored() {
    let (mut persistence, fixture) = setup();
    let mut plan = create_test_plan(&fixture.enrolment, create_test_slot(), vec![fixture.machine_ids[0]]);
    plan.reminder_sent = true;

    let committed: CommittedReservation = persistence
        .commit_local_reservation(&plan, create_test_now())
        .unwrap();

    assert!(committed.reservation.reminder_sent);
}

#[test]
fn test_remove_reservation_unbinds_enrolment() {
    let (mut persistence, fixture) = setup();
    let reservation: Reservation = persistence
        .commit_local_reservation(
            &create_test_plan(&fixture.enrolment, create_test_slot(), vec![fixture.machine_ids[0]]),
            create_test_now(),
        )
        .unwrap()
        .reservation;

    let removed: Reservation = persistence
        .remove_reservation(reservation.reservation_id)
        .unwrap();

    assert_eq!(removed, reservation);
    let enrolment: Enrolment = persistence
        .get_enrolment(fixture.enrolment.enrolment_id)
        .unwrap()
        .unwrap();
    assert_eq!(enrolment.reservation_id, None);
    assert!(matches!(
        persistence.remove_reservation(reservation.reservation_id),
        Err(PersistenceError::NotFound(_))
    ));
}

#[test]
fn test_change_machine_moves_reservation() {
    let (mut persistence, fixture) = setup();
    let reservation: Reservation = persistence
        .commit_local_reservation(
            &create_test_plan(&fixture.enrolment, create_test_slot(), vec![fixture.machine_ids[0]]),
            create_test_now(),
        )
        .unwrap()
        .reservation;

    let change: MachineChange = persistence
        .change_machine(reservation.reservation_id, fixture.machine_ids[1])
        .unwrap();

    assert_eq!(change.previous_machine_id, Some(fixture.machine_ids[0]));
    assert_eq!(change.reservation.machine_id(), Some(fixture.machine_ids[1]));
}

#[test]
fn test_change_machine_onto_busy_machine_is_rejected() {
    let (mut persistence, fixture) = setup();
    book_for_other_user(&mut persistence, &fixture, create_test_slot(), fixture.machine_ids[1]);
    let reservation: Reservation = persistence
        .commit_local_reservation(
            &create_test_plan(&fixture.enrolment, create_test_slot(), vec![fixture.machine_ids[0]]),
            create_test_now(),
        )
        .unwrap()
        .reservation;

    let result = persistence.change_machine(reservation.reservation_id, fixture.machine_ids[1]);

    assert!(matches!(result, Err(PersistenceError::ReservationOverlap)));
    let unchanged: Reservation = persistence
        .get_reservation(reservation.reservation_id)
        .unwrap()
        .unwrap();
    assert_eq!(unchanged.machine_id(), Some(fixture.machine_ids[0]));
}

#[test]
fn test_machine_bookings_are_limited_to_window_and_machines() {
    let (mut persistence, fixture) = setup();
    let other: Reservation =
        book_for_other_user(&mut persistence, &fixture, create_test_slot(), fixture.machine_ids[0]);
    persistence
        .commit_local_reservation(
            &create_test_plan(&fixture.enrolment, later_slot(), vec![fixture.machine_ids[1]]),
            create_test_now(),
        )
        .unwrap();

    let morning = interval(utc(2026, 5, 4, 6, 0), utc(2026, 5, 4, 8, 0));
    let bookings: Vec<MachineBooking> = persistence
        .list_machine_bookings(&fixture.machine_ids, &morning)
        .unwrap();

    assert_eq!(
        bookings,
        vec![MachineBooking {
            reservation_id: other.reservation_id,
            machine_id: fixture.machine_ids[0],
            user_id: OTHER_USER,
            interval: create_test_slot(),
        }]
    );
    assert!(
        persistence
            .list_machine_bookings(&[fixture.machine_ids[1]], &morning)
            .unwrap()
            .is_empty()
    );
}

#[test]
fn test_external_reservation_is_recorded_with_snapshot() {
    let (mut persistence, fixture) = setup();
    let committed: CommittedReservation = persistence
        .commit_external_reservation(
            &create_test_delegated_plan(&fixture.enrolment, create_test_slot()),
            &create_test_external("ext-1"),
            create_test_now(),
        )
        .unwrap();

    let loaded: Reservation = persistence
        .get_reservation(committed.reservation.reservation_id)
        .unwrap()
        .unwrap();
    assert_eq!(loaded.machine_id(), None);
    assert_eq!(loaded.external(), Some(&create_test_external("ext-1")));
    assert_eq!(persistence.list_user_reservations(USER).unwrap().len(), 1);
}

#[test]
fn test_external_booking_replaces_local_reservation() {
    let (mut persistence, fixture) = setup();
    let local: Reservation = persistence
        .commit_local_reservation(
            &create_test_plan(&fixture.enrolment, create_test_slot(), vec![fixture.machine_ids[0]]),
            create_test_now(),
        )
        .unwrap()
        .reservation;

    let committed: CommittedReservation = persistence
        .commit_external_reservation(
            &create_test_delegated_plan(&fixture.enrolment, later_slot()),
            &create_test_external("ext-1"),
            create_test_now(),
        )
        .unwrap();

    assert_eq!(committed.previous, Some(local.clone()));
    assert!(persistence.get_reservation(local.reservation_id).unwrap().is_none());
}

#[test]
fn test_replaced_external_reservation_stays_until_deleted() {
    let (mut persistence, fixture) = setup();
    let external: Reservation = persistence
        .commit_external_reservation(
            &create_test_delegated_plan(&fixture.enrolment, create_test_slot()),
            &create_test_external("ext-1"),
            create_test_now(),
        )
        .unwrap()
        .reservation;

    let committed: CommittedReservation = persistence
        .commit_local_reservation(
            &create_test_plan(&fixture.enrolment, later_slot(), vec![fixture.machine_ids[0]]),
            create_test_now(),
        )
        .unwrap();

    assert_eq!(committed.previous, Some(external.clone()));
    assert!(persistence.get_reservation(external.reservation_id).unwrap().is_some());
    assert_eq!(persistence.list_user_reservations(USER).unwrap().len(), 1);

    assert!(!persistence
        .delete_unbound_reservation(committed.reservation.reservation_id)
        .unwrap());
    assert!(persistence
        .delete_unbound_reservation(external.reservation_id)
        .unwrap());
    assert!(persistence.get_reservation(external.reservation_id).unwrap().is_none());
}

#[test]
fn test_duplicate_external_reference_is_rejected() {
    let (mut persistence, fixture) = setup();
    let other: Enrolment = persistence
        .insert_enrolment(OTHER_USER, fixture.exam_id)
        .unwrap();
    persistence
        .commit_external_reservation(
            &create_test_delegated_plan(&fixture.enrolment, create_test_slot()),
            &create_test_external("ext-1"),
            create_test_now(),
        )
        .unwrap();

    let result = persistence.commit_external_reservation(
        &create_test_delegated_plan(&other, create_test_slot()),
        &create_test_external("ext-1"),
        create_test_now(),
    );

    assert!(matches!(result, Err(PersistenceError::ConstraintViolation(_))));
    let enrolment: Enrolment = persistence.get_enrolment(other.enrolment_id).unwrap().unwrap();
    assert_eq!(enrolment.reservation_id, None);
}

#[test]
fn test_no_show_keeps_reservation_for_public_exam() {
    let (mut persistence, fixture) = setup();
    let reservation: Reservation = persistence
        .commit_local_reservation(
            &create_test_plan(&fixture.enrolment, create_test_slot(), vec![fixture.machine_ids[0]]),
            create_test_now(),
        )
        .unwrap()
        .reservation;

    let outcome: NoShowOutcome = persistence
        .mark_no_show(reservation.reservation_id, false)
        .unwrap();

    assert!(!outcome.released);
    assert!(outcome.reservation.no_show);
    let enrolment: Enrolment = persistence
        .get_enrolment(fixture.enrolment.enrolment_id)
        .unwrap()
        .unwrap();
    assert!(enrolment.no_show);
    assert_eq!(enrolment.reservation_id, Some(reservation.reservation_id));
}

#[test]
fn test_released_no_show_allows_rebooking() {
    let (mut persistence, fixture) = setup();
    let reservation: Reservation = persistence
        .commit_local_reservation(
            &create_test_plan(&fixture.enrolment, create_test_slot(), vec![fixture.machine_ids[0]]),
            create_test_now(),
        )
        .unwrap()
        .reservation;

    let outcome: NoShowOutcome = persistence
        .mark_no_show(reservation.reservation_id, true)
        .unwrap();

    assert!(outcome.released);
    assert!(persistence.get_reservation(reservation.reservation_id).unwrap().is_none());
    let released: Enrolment = persistence
        .get_enrolment(fixture.enrolment.enrolment_id)
        .unwrap()
        .unwrap();
    assert!(released.no_show);
    assert_eq!(released.reservation_id, None);

    persistence
        .commit_local_reservation(
            &create_test_plan(&released, later_slot(), vec![fixture.machine_ids[0]]),
            create_test_now(),
        )
        .unwrap();
    let rebooked: Enrolment = persistence
        .get_enrolment(fixture.enrolment.enrolment_id)
        .unwrap()
        .unwrap();
    assert!(!rebooked.no_show);
}
