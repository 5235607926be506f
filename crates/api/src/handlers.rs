// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! API handler functions for slot queries, bookings and administration.
//!
//! Read paths and administrative operations take the persistence adapter
//! directly. Booking and removal may call a collaborating organisation, so
//! they take the shared adapter and lock it only around local work. No
//! database transaction is open while a remote call is in flight.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use exam_slots::{
    AllocationStrategy, BookingContext, CoreError, DelegatedAllocationPlan, EnrolmentContext,
    ExternalTarget, LocalAllocationPlan, NoShowAction, RemovalPlan, ReservationRequest,
    RoomContext, plan_delegated_allocation, plan_local_allocation, plan_machine_change,
    plan_no_show, plan_removal, replacement_machines,
};
use exam_slots_domain::{
    ConflictInputs, DomainError, Enrolment, Exam, ExamHosting, ExternalReservation, Interval,
    Machine, MachineBooking, MaintenancePeriod, PrecomputedSlot, Reservation, ReservationTarget,
    Room, SchedulingConfig, SearchWindow, SlotStatus, UserReservation, candidate_slots, classify,
    classify_precomputed, date_key, eligible_machines, is_room_accessibility_satisfied,
    local_date, parse_search_date, resolve_local_forward, resolve_search_window,
    validate_exam_duration, validate_room,
};
use exam_slots_notify::{MachineRef, NotificationSink, ReservationDetails, ReservationEvent};
use exam_slots_persistence::{CommittedReservation, MachineChange, NoShowOutcome, Persistence};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::ApiError;
use crate::external::{ExternalReservationService, RemoteReservationRequest, RemoteSlotQuery};
use crate::request_response::{
    ChangeMachineResponse, CreateMaintenancePeriodRequest, CreateReservationRequest,
    EnrolmentInfo, FindAvailableMachinesResponse, GetExternalSlotsRequest, GetSlotsRequest,
    GetSlotsResponse, MachineInfo, MaintenancePeriodInfo, NoShowResponse,
    RemoveReservationResponse, ReservationResponse, SlotStatusResponse, reservation_response,
};

/// Persistence shared between concurrent requests.
pub type SharedPersistence = Mutex<Persistence>;

/// Where a reservation takes place, for responses and events.
#[derive(Debug, Clone)]
struct Location {
    machine: MachineRef,
    tz: Tz,
}

/// What the locked part of a booking leaves to do afterwards.
enum BookingStep {
    /// Booked locally. A replaced external reservation still needs cancelling.
    Done {
        response: ReservationResponse,
        stale: Option<Reservation>,
    },
    /// The booking must be made in a collaborating organisation.
    Delegate {
        plan: DelegatedAllocationPlan,
        exam: Exam,
    },
}

/// Everything needed to move a reservation to another machine.
struct MachineChangeContext {
    reservation: Reservation,
    exam: Exam,
    machines: Vec<Machine>,
    bookings: Vec<MachineBooking>,
}

// ============================================================================
// Lookups
// ============================================================================

fn require_exam(persistence: &mut Persistence, exam_id: i64) -> Result<Exam, ApiError> {
    persistence
        .get_exam(exam_id)?
        .ok_or_else(|| ApiError::not_found("Exam", format!("Exam {exam_id} does not exist")))
}

fn require_room(persistence: &mut Persistence, room_id: i64) -> Result<Room, ApiError> {
    persistence
        .get_room(room_id)?
        .ok_or_else(|| ApiError::not_found("Room", format!("Room {room_id} does not exist")))
}

fn require_machine(persistence: &mut Persistence, machine_id: i64) -> Result<Machine, ApiError> {
    persistence.get_machine(machine_id)?.ok_or_else(|| {
        ApiError::not_found("Machine", format!("Machine {machine_id} does not exist"))
    })
}

fn require_reservation(
    persistence: &mut Persistence,
    reservation_id: i64,
) -> Result<Reservation, ApiError> {
    persistence.get_reservation(reservation_id)?.ok_or_else(|| {
        ApiError::not_found(
            "Reservation",
            format!("Reservation {reservation_id} does not exist"),
        )
    })
}

fn require_enrolment(
    persistence: &mut Persistence,
    user_id: i64,
    exam_id: i64,
) -> Result<Enrolment, ApiError> {
    persistence.find_enrolment(user_id, exam_id)?.ok_or_else(|| {
        ApiError::not_found(
            "Enrolment",
            format!("User {user_id} is not enrolled in exam {exam_id}"),
        )
    })
}

/// Resolves the exam a reservation was made for.
fn require_reservation_exam(
    persistence: &mut Persistence,
    reservation_id: i64,
) -> Result<Exam, ApiError> {
    let enrolment: Enrolment = persistence
        .find_enrolment_by_reservation(reservation_id)?
        .ok_or_else(|| {
            ApiError::not_found(
                "Enrolment",
                format!("No enrolment holds reservation {reservation_id}"),
            )
        })?;
    require_exam(persistence, enrolment.exam_id)
}

fn locate(
    persistence: &mut Persistence,
    reservation: &Reservation,
    config: &SchedulingConfig,
) -> Result<Location, ApiError> {
    match &reservation.target {
        ReservationTarget::Machine(machine_id) => {
            let machine: Machine = require_machine(persistence, *machine_id)?;
            let room: Room = require_room(persistence, machine.room_id)?;
            Ok(Location {
                machine: MachineRef::new(
                    Some(machine.machine_id),
                    machine.name.unwrap_or_default(),
                    room.name.clone(),
                ),
                tz: room.timezone().unwrap_or(config.default_timezone()),
            })
        }
        ReservationTarget::External(external) => Ok(Location {
            machine: MachineRef::new(
                None,
                external.machine_name.clone(),
                external.room_name.clone(),
            ),
            tz: external
                .room_timezone
                .parse()
                .unwrap_or(config.default_timezone()),
        }),
    }
}

fn load_enrolment_context(
    persistence: &mut Persistence,
    exam: Exam,
    enrolment: Enrolment,
) -> Result<EnrolmentContext, ApiError> {
    let current_reservation: Option<Reservation> = match enrolment.reservation_id {
        Some(id) => persistence.get_reservation(id)?,
        None => None,
    };
    let user_reservations: Vec<UserReservation> =
        persistence.list_user_reservations(enrolment.user_id)?;
    let maintenance: Vec<MaintenancePeriod> = persistence.list_maintenance_periods(None)?;
    Ok(EnrolmentContext {
        exam,
        enrolment,
        current_reservation,
        user_reservations,
        maintenance,
    })
}

/// The instants covered by the local days of a search window.
fn search_span(tz: Tz, window: &SearchWindow) -> Result<Interval, DomainError> {
    let after_last: NaiveDate =
        window
            .last_day()
            .succ_opt()
            .ok_or_else(|| DomainError::DateArithmeticOverflow {
                operation: format!("computing the day after {}", window.last_day()),
            })?;
    let start: DateTime<Utc> =
        resolve_local_forward(tz, window.first_day().and_time(NaiveTime::MIN))?;
    let end: DateTime<Utc> = resolve_local_forward(tz, after_last.and_time(NaiveTime::MIN))?;
    Interval::new(start, end)
}

fn parse_day(day: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    Ok(day.map(parse_search_date).transpose()?)
}

// ============================================================================
// Slot queries
// ============================================================================

/// Computes the bookable slots of a local room for one search week.
///
/// Rooms that are out of service, inactive or lacking a requested
/// accessibility tag yield an empty result, as do rooms without an
/// eligible machine. Zero-count slots are kept.
///
/// # Arguments
///
/// * `persistence` - The persistence layer
/// * `request` - The user, exam, room, day and accessibility requirements
/// * `config` - Scheduling settings
/// * `now` - Current instant
///
/// # Returns
///
/// Slot statuses keyed by local date, one key per searched day.
///
/// # Errors
///
/// Returns an error if:
/// - The exam, room or enrolment does not exist
/// - The day cannot be parsed
/// - The search week lies outside the bookable range
pub fn get_slots(
    persistence: &mut Persistence,
    request: &GetSlotsRequest,
    config: &SchedulingConfig,
    now: DateTime<Utc>,
) -> Result<GetSlotsResponse, ApiError> {
    info!(
        user_id = request.user_id,
        exam_id = request.exam_id,
        room_id = request.room_id,
        day = ?request.day,
        "Handling get_slots request"
    );

    let exam: Exam = require_exam(persistence, request.exam_id)?;
    require_enrolment(persistence, request.user_id, request.exam_id)?;
    let room: Room = require_room(persistence, request.room_id)?;

    let mut response: GetSlotsResponse = GetSlotsResponse::new();
    if !room.is_operative() || !is_room_accessibility_satisfied(&room, &request.accessibility_ids)
    {
        debug!(room_id = room.room_id, "Room cannot host this request");
        return Ok(response);
    }

    let tz: Tz = room.timezone()?;
    let requested: Option<NaiveDate> = parse_day(request.day.as_deref())?;
    let window: SearchWindow = resolve_search_window(requested, &exam, tz, config, now)?;

    let machines: Vec<Machine> = persistence.list_room_machines(room.room_id)?;
    let eligible: Vec<Machine> =
        eligible_machines(&room, &machines, &exam, &request.accessibility_ids);
    if eligible.is_empty() {
        debug!(room_id = room.room_id, "No eligible machine in room");
        return Ok(response);
    }

    let span: Interval = search_span(tz, &window)?;
    let machine_ids: Vec<i64> = eligible.iter().map(|m| m.machine_id).collect();
    let bookings: Vec<MachineBooking> = persistence.list_machine_bookings(&machine_ids, &span)?;
    let user_reservations: Vec<UserReservation> =
        persistence.list_user_reservations(request.user_id)?;
    let maintenance: Vec<MaintenancePeriod> = persistence.list_maintenance_periods(Some(&span))?;

    let inputs: ConflictInputs<'_> = ConflictInputs {
        exam_id: exam.exam_id,
        user_id: request.user_id,
        user_reservations: &user_reservations,
        maintenance: &maintenance,
        machines: &eligible,
        bookings: &bookings,
    };
    for day in window.days() {
        let slots: Vec<Interval> = candidate_slots(&room, day, exam.duration_minutes, now)?;
        let statuses: Vec<SlotStatus> = classify(&slots, &inputs);
        response.insert(
            date_key(day),
            statuses.iter().map(SlotStatusResponse::from).collect(),
        );
    }
    Ok(response)
}

/// Fetches slots of a room in a collaborating organisation.
///
/// Machine counts come from the remote side; the user's own reservations
/// and local maintenance periods are applied here. Days are keyed in the
/// default time zone.
///
/// # Errors
///
/// Returns an error if:
/// - The exam or enrolment does not exist
/// - The exam is not federated
/// - The search week lies outside the bookable range
/// - The remote service fails
pub async fn get_external_slots<S: ExternalReservationService>(
    persistence: &SharedPersistence,
    external: &S,
    request: &GetExternalSlotsRequest,
    config: &SchedulingConfig,
    now: DateTime<Utc>,
) -> Result<GetSlotsResponse, ApiError> {
    info!(
        user_id = request.user_id,
        exam_id = request.exam_id,
        org_ref = %request.org_ref,
        room_ref = %request.room_ref,
        "Handling get_external_slots request"
    );
    let tz: Tz = config.default_timezone();

    let (query, user_reservations, maintenance) = {
        let mut guard = persistence.lock().await;
        let exam: Exam = require_exam(&mut guard, request.exam_id)?;
        require_enrolment(&mut guard, request.user_id, request.exam_id)?;
        if exam.hosting != ExamHosting::Federated {
            return Err(CoreError::DelegationNotAllowed {
                exam_id: exam.exam_id,
            }
            .into());
        }
        let requested: Option<NaiveDate> = parse_day(request.day.as_deref())?;
        let window: SearchWindow = resolve_search_window(requested, &exam, tz, config, now)?;
        let query: RemoteSlotQuery = RemoteSlotQuery {
            org_ref: request.org_ref.clone(),
            room_ref: request.room_ref.clone(),
            date: window.first_day(),
            start: exam.period_start,
            end: exam.period_end,
            duration_minutes: exam.duration_minutes,
        };
        let user_reservations: Vec<UserReservation> =
            guard.list_user_reservations(request.user_id)?;
        let maintenance: Vec<MaintenancePeriod> = guard.list_maintenance_periods(None)?;
        (query, user_reservations, maintenance)
    };

    let slots: Vec<PrecomputedSlot> = external.fetch_slots(&query).await?;
    let statuses: Vec<SlotStatus> =
        classify_precomputed(&slots, request.exam_id, &user_reservations, &maintenance);

    let mut response: GetSlotsResponse = GetSlotsResponse::new();
    for status in &statuses {
        response
            .entry(date_key(local_date(status.start(), tz)))
            .or_default()
            .push(SlotStatusResponse::from(status));
    }
    Ok(response)
}

// ============================================================================
// Booking
// ============================================================================

fn to_core_request(request: &CreateReservationRequest) -> ReservationRequest {
    ReservationRequest {
        user_id: request.user_id,
        exam_id: request.exam_id,
        room_id: request.room_id,
        start: request.start,
        end: request.end,
        accessibility_ids: request.accessibility_ids.clone(),
        external: request.external.as_ref().map(|e| ExternalTarget {
            org_ref: e.org_ref.clone(),
            room_ref: e.room_ref.clone(),
        }),
    }
}

/// Emits the event for a committed booking and builds the response.
fn announce(
    persistence: &mut Persistence,
    notifier: &dyn NotificationSink,
    committed: &CommittedReservation,
    exam: &Exam,
    config: &SchedulingConfig,
) -> Result<ReservationResponse, ApiError> {
    let location: Location = locate(persistence, &committed.reservation, config)?;
    let details: ReservationDetails = ReservationDetails::new(
        &committed.reservation,
        exam,
        location.machine.clone(),
        location.tz,
    );
    let event: ReservationEvent = match &committed.previous {
        None => ReservationEvent::Created {
            reservation: details,
        },
        Some(previous) => ReservationEvent::Changed {
            previous_machine: locate(persistence, previous, config)?.machine,
            new_machine: location.machine.clone(),
            reservation: details,
        },
    };
    notifier.notify(&event);

    Ok(reservation_response(
        &committed.reservation,
        &location.machine,
        committed.previous.as_ref().map(|p| p.reservation_id),
    ))
}

/// A replaced reservation that lives in another organisation.
fn stale_external(committed: CommittedReservation) -> Option<Reservation> {
    committed.previous.filter(|p| p.external().is_some())
}

fn allocate_locally(
    persistence: &mut Persistence,
    notifier: &dyn NotificationSink,
    context: EnrolmentContext,
    request: &ReservationRequest,
    config: &SchedulingConfig,
    now: DateTime<Utc>,
) -> Result<BookingStep, ApiError> {
    let room: Room = require_room(persistence, request.room_id)?;
    let window: Interval = Interval::new(request.start, request.end)?;
    let machines: Vec<Machine> = persistence.list_room_machines(room.room_id)?;
    let machine_ids: Vec<i64> = machines.iter().map(|m| m.machine_id).collect();
    let bookings: Vec<MachineBooking> = persistence.list_machine_bookings(&machine_ids, &window)?;

    let exam: Exam = context.exam.clone();
    let booking: BookingContext = BookingContext {
        enrolment: context,
        room: RoomContext {
            room,
            machines,
            bookings,
        },
    };
    let mut rng: StdRng = StdRng::seed_from_u64(rand::random::<u64>());
    let plan: LocalAllocationPlan = plan_local_allocation(&booking, request, now, &mut rng)?;
    let committed: CommittedReservation = persistence.commit_local_reservation(&plan, now)?;

    let response: ReservationResponse = announce(persistence, notifier, &committed, &exam, config)?;
    Ok(BookingStep::Done {
        response,
        stale: stale_external(committed),
    })
}

/// Cancels a replaced external reservation and deletes its local row.
///
/// Failures are logged; the unbound row stays until the remote side
/// confirms a cancellation.
async fn retire_external<S: ExternalReservationService>(
    persistence: &SharedPersistence,
    external: &S,
    stale: &Reservation,
) {
    let Some(snapshot) = stale.external() else {
        return;
    };
    if let Err(e) = external
        .cancel_reservation(&snapshot.org_ref, &snapshot.room_ref, &snapshot.external_ref)
        .await
    {
        warn!(
            reservation_id = stale.reservation_id,
            external_ref = %snapshot.external_ref,
            error = %e,
            "Replaced external reservation could not be cancelled"
        );
        return;
    }
    let deleted: Result<bool, _> = persistence
        .lock()
        .await
        .delete_unbound_reservation(stale.reservation_id);
    match deleted {
        Ok(true) => info!(
            reservation_id = stale.reservation_id,
            "Replaced external reservation retired"
        ),
        Ok(false) => debug!(
            reservation_id = stale.reservation_id,
            "Replaced external reservation already gone or rebound"
        ),
        Err(e) => warn!(
            reservation_id = stale.reservation_id,
            error = %e,
            "Failed to delete replaced external reservation"
        ),
    }
}

async fn allocate_remotely<S: ExternalReservationService>(
    persistence: &SharedPersistence,
    external: &S,
    notifier: &dyn NotificationSink,
    plan: &DelegatedAllocationPlan,
    exam: &Exam,
    config: &SchedulingConfig,
    now: DateTime<Utc>,
) -> Result<ReservationResponse, ApiError> {
    let remote_request: RemoteReservationRequest = RemoteReservationRequest {
        org_ref: plan.target.org_ref.clone(),
        room_ref: plan.target.room_ref.clone(),
        start: plan.interval.start(),
        end: plan.interval.end(),
        user_ref: plan.user_id.to_string(),
    };
    let snapshot: ExternalReservation = external.create_reservation(&remote_request).await?;

    let committed: Result<CommittedReservation, ApiError> = persistence
        .lock()
        .await
        .commit_external_reservation(plan, &snapshot, now)
        .map_err(ApiError::from);
    let committed: CommittedReservation = match committed {
        Ok(committed) => committed,
        Err(err) => {
            warn!(
                external_ref = %snapshot.external_ref,
                error = %err,
                "Local commit failed, cancelling remote booking"
            );
            if let Err(cancel_err) = external
                .cancel_reservation(&snapshot.org_ref, &snapshot.room_ref, &snapshot.external_ref)
                .await
            {
                error!(
                    external_ref = %snapshot.external_ref,
                    error = %cancel_err,
                    "Remote booking left without a local record"
                );
            }
            return Err(err);
        }
    };

    let response: ReservationResponse = {
        let mut guard = persistence.lock().await;
        announce(&mut guard, notifier, &committed, exam, config)?
    };
    if let Some(stale) = stale_external(committed) {
        retire_external(persistence, external, &stale).await;
    }
    Ok(response)
}

/// Books a slot for an enrolment, replacing its current reservation.
///
/// Local bookings re-validate the slot and pick a random free eligible
/// machine inside one transaction. Federated bookings are first confirmed
/// by the remote organisation and only then recorded locally; a failed
/// remote call leaves local state untouched.
///
/// # Arguments
///
/// * `persistence` - The shared persistence layer
/// * `external` - Client for collaborating organisations
/// * `notifier` - Receiver of reservation events
/// * `request` - The booking request
/// * `config` - Scheduling settings
/// * `now` - Current instant
///
/// # Errors
///
/// Returns an error if:
/// - The exam, room or enrolment does not exist
/// - The exam does not accept reservations (`ExamNotBookable`)
/// - The current reservation has started (`ReservationInEffect`)
/// - The window is not an offered slot or conflicts with another exam
/// - Every eligible machine is taken (`NoMachineAvailable`)
/// - The remote organisation fails (`ExternalDelegationFailure`)
pub async fn create_or_replace_reservation<S: ExternalReservationService>(
    persistence: &SharedPersistence,
    external: &S,
    notifier: &dyn NotificationSink,
    request: &CreateReservationRequest,
    config: &SchedulingConfig,
    now: DateTime<Utc>,
) -> Result<ReservationResponse, ApiError> {
    info!(
        user_id = request.user_id,
        exam_id = request.exam_id,
        room_id = request.room_id,
        start = %request.start,
        external = request.external.is_some(),
        "Handling create_or_replace_reservation request"
    );
    let core_request: ReservationRequest = to_core_request(request);

    let step: BookingStep = {
        let mut guard = persistence.lock().await;
        let exam: Exam = require_exam(&mut guard, request.exam_id)?;
        let enrolment: Enrolment = require_enrolment(&mut guard, request.user_id, request.exam_id)?;
        let context: EnrolmentContext = load_enrolment_context(&mut guard, exam, enrolment)?;
        match AllocationStrategy::select(&context.exam, core_request.external.as_ref())? {
            AllocationStrategy::Local => {
                allocate_locally(&mut guard, notifier, context, &core_request, config, now)?
            }
            AllocationStrategy::Delegated(target) => BookingStep::Delegate {
                plan: plan_delegated_allocation(&context, &core_request, &target, now)?,
                exam: context.exam,
            },
        }
    };

    match step {
        BookingStep::Done { response, stale } => {
            if let Some(stale) = stale {
                retire_external(persistence, external, &stale).await;
            }
            Ok(response)
        }
        BookingStep::Delegate { plan, exam } => {
            allocate_remotely(persistence, external, notifier, &plan, &exam, config, now).await
        }
    }
}

// ============================================================================
// Removal
// ============================================================================

#[allow(clippy::too_many_arguments)]
async fn cancel_reservation<S: ExternalReservationService>(
    persistence: &SharedPersistence,
    external: &S,
    notifier: &dyn NotificationSink,
    config: &SchedulingConfig,
    reservation_id: i64,
    by_admin: bool,
    message: Option<String>,
    now: DateTime<Utc>,
) -> Result<RemoveReservationResponse, ApiError> {
    let (plan, exam, location) = {
        let mut guard = persistence.lock().await;
        let reservation: Reservation = require_reservation(&mut guard, reservation_id)?;
        let plan: RemovalPlan = plan_removal(&reservation, now)?;
        let exam: Exam = require_reservation_exam(&mut guard, reservation_id)?;
        let location: Location = locate(&mut guard, &reservation, config)?;
        (plan, exam, location)
    };

    if let RemovalPlan::Remote {
        org_ref,
        room_ref,
        external_ref,
        ..
    } = &plan
    {
        external
            .cancel_reservation(org_ref, room_ref, external_ref)
            .await?;
    }
    let removed: Reservation = persistence
        .lock()
        .await
        .remove_reservation(plan.reservation_id())?;

    notifier.notify(&ReservationEvent::Cancelled {
        by_admin,
        message,
        reservation: ReservationDetails::new(&removed, &exam, location.machine, location.tz),
    });
    info!(reservation_id, by_admin, "Reservation cancelled");

    Ok(RemoveReservationResponse {
        reservation_id,
        message: format!("Reservation {reservation_id} removed"),
    })
}

/// Removes the reservation held by an enrolment.
///
/// A reservation in another organisation is cancelled there first; local
/// state changes only after the remote side confirms.
///
/// # Errors
///
/// Returns an error if:
/// - The enrolment does not exist or holds no reservation
/// - The reservation has started or passed (`ReservationInEffect`)
/// - The remote organisation fails (`ExternalDelegationFailure`)
pub async fn remove_reservation<S: ExternalReservationService>(
    persistence: &SharedPersistence,
    external: &S,
    notifier: &dyn NotificationSink,
    config: &SchedulingConfig,
    enrolment_id: i64,
    now: DateTime<Utc>,
) -> Result<RemoveReservationResponse, ApiError> {
    info!(enrolment_id, "Handling remove_reservation request");
    let reservation_id: i64 = {
        let mut guard = persistence.lock().await;
        let enrolment: Enrolment = guard.get_enrolment(enrolment_id)?.ok_or_else(|| {
            ApiError::not_found(
                "Enrolment",
                format!("Enrolment {enrolment_id} does not exist"),
            )
        })?;
        enrolment.reservation_id.ok_or_else(|| {
            ApiError::not_found(
                "Reservation",
                format!("Enrolment {enrolment_id} holds no reservation"),
            )
        })?
    };
    cancel_reservation(
        persistence,
        external,
        notifier,
        config,
        reservation_id,
        false,
        None,
        now,
    )
    .await
}

/// Removes a reservation on behalf of an administrator.
///
/// # Errors
///
/// Returns an error if the reservation does not exist, has started, or
/// cannot be cancelled remotely.
pub async fn admin_remove_reservation<S: ExternalReservationService>(
    persistence: &SharedPersistence,
    external: &S,
    notifier: &dyn NotificationSink,
    config: &SchedulingConfig,
    reservation_id: i64,
    message: Option<String>,
    now: DateTime<Utc>,
) -> Result<RemoveReservationResponse, ApiError> {
    info!(reservation_id, "Handling admin_remove_reservation request");
    cancel_reservation(
        persistence,
        external,
        notifier,
        config,
        reservation_id,
        true,
        message,
        now,
    )
    .await
}

// ============================================================================
// Administration
// ============================================================================

fn load_machine_change_context(
    persistence: &mut Persistence,
    reservation_id: i64,
) -> Result<MachineChangeContext, ApiError> {
    let reservation: Reservation = require_reservation(persistence, reservation_id)?;
    let Some(machine_id) = reservation.machine_id() else {
        return Err(ApiError::invalid_input(
            "reservation_id",
            format!("Reservation {reservation_id} is held in another organisation"),
        ));
    };
    let exam: Exam = require_reservation_exam(persistence, reservation_id)?;
    let current: Machine = require_machine(persistence, machine_id)?;
    let machines: Vec<Machine> = persistence.list_room_machines(current.room_id)?;
    let machine_ids: Vec<i64> = machines.iter().map(|m| m.machine_id).collect();
    let bookings: Vec<MachineBooking> =
        persistence.list_machine_bookings(&machine_ids, &reservation.interval)?;
    Ok(MachineChangeContext {
        reservation,
        exam,
        machines,
        bookings,
    })
}

/// Lists machines in the reservation's room that could take it over.
///
/// # Errors
///
/// Returns an error if the reservation does not exist or is not local.
pub fn find_available_machines(
    persistence: &mut Persistence,
    reservation_id: i64,
) -> Result<FindAvailableMachinesResponse, ApiError> {
    let context: MachineChangeContext = load_machine_change_context(persistence, reservation_id)?;
    let machines: Vec<Machine> = replacement_machines(
        &context.reservation,
        &context.exam,
        &context.machines,
        &context.bookings,
    );
    Ok(FindAvailableMachinesResponse {
        reservation_id,
        machines: machines.iter().map(MachineInfo::from).collect(),
    })
}

/// Moves a reservation to another machine of the same room.
///
/// # Errors
///
/// Returns an error if the reservation is not local, or the machine cannot
/// take it over.
pub fn change_reservation_machine(
    persistence: &mut Persistence,
    notifier: &dyn NotificationSink,
    config: &SchedulingConfig,
    reservation_id: i64,
    machine_id: i64,
) -> Result<ChangeMachineResponse, ApiError> {
    info!(reservation_id, machine_id, "Handling change_reservation_machine request");
    let context: MachineChangeContext = load_machine_change_context(persistence, reservation_id)?;
    let target: Machine = plan_machine_change(
        &context.reservation,
        &context.exam,
        machine_id,
        &context.machines,
        &context.bookings,
    )?;
    let previous: Location = locate(persistence, &context.reservation, config)?;

    let change: MachineChange = persistence.change_machine(reservation_id, target.machine_id)?;
    let location: Location = locate(persistence, &change.reservation, config)?;
    notifier.notify(&ReservationEvent::Changed {
        previous_machine: previous.machine,
        new_machine: location.machine.clone(),
        reservation: ReservationDetails::new(
            &change.reservation,
            &context.exam,
            location.machine,
            location.tz,
        ),
    });

    Ok(ChangeMachineResponse {
        reservation_id,
        previous_machine_id: change.previous_machine_id,
        machine: MachineInfo::from(&target),
    })
}

/// Records that the student did not show up.
///
/// Reservations of private exams are released so the student can book
/// again; others are kept and flagged.
///
/// # Errors
///
/// Returns an error if no enrolment holds the reservation.
pub fn process_no_show(
    persistence: &mut Persistence,
    reservation_id: i64,
) -> Result<NoShowResponse, ApiError> {
    let exam: Exam = require_reservation_exam(persistence, reservation_id)?;
    let action: NoShowAction = plan_no_show(&exam);
    let outcome: NoShowOutcome =
        persistence.mark_no_show(reservation_id, action == NoShowAction::Release)?;
    info!(
        reservation_id,
        released = outcome.released,
        "No-show processed"
    );
    Ok(NoShowResponse {
        reservation_id: outcome.reservation.reservation_id,
        released: outcome.released,
    })
}

/// # Errors
///
/// Returns an error if the period is empty or the insert fails.
pub fn create_maintenance_period(
    persistence: &mut Persistence,
    request: &CreateMaintenancePeriodRequest,
) -> Result<MaintenancePeriodInfo, ApiError> {
    let interval: Interval = Interval::new(request.start, request.end)?;
    debug!(%interval, "Handling create_maintenance_period request");
    let period: MaintenancePeriod =
        persistence.insert_maintenance_period(&interval, &request.description)?;
    Ok(MaintenancePeriodInfo::from(&period))
}

/// # Errors
///
/// Returns an error if the query fails.
pub fn list_maintenance_periods(
    persistence: &mut Persistence,
) -> Result<Vec<MaintenancePeriodInfo>, ApiError> {
    Ok(persistence
        .list_maintenance_periods(None)?
        .iter()
        .map(MaintenancePeriodInfo::from)
        .collect())
}

/// # Errors
///
/// Returns an error if the period does not exist.
pub fn delete_maintenance_period(
    persistence: &mut Persistence,
    maintenance_period_id: i64,
) -> Result<(), ApiError> {
    debug!(maintenance_period_id, "Handling delete_maintenance_period request");
    Ok(persistence.delete_maintenance_period(maintenance_period_id)?)
}

// ============================================================================
// Setup
// ============================================================================

/// Registers a room after validating its calendar.
///
/// # Errors
///
/// Returns an error if the opening hours overlap or the zone is unknown.
pub fn register_room(persistence: &mut Persistence, room: &Room) -> Result<i64, ApiError> {
    validate_room(room)?;
    let room_id: i64 = persistence.insert_room(room)?;
    info!(room_id, name = %room.name, "Room registered");
    Ok(room_id)
}

/// # Errors
///
/// Returns an error if the room does not exist.
pub fn register_machine(persistence: &mut Persistence, machine: &Machine) -> Result<i64, ApiError> {
    require_room(persistence, machine.room_id)?;
    let machine_id: i64 = persistence.insert_machine(machine)?;
    info!(machine_id, room_id = machine.room_id, "Machine registered");
    Ok(machine_id)
}

/// # Errors
///
/// Returns an error if the duration is not positive or the period is empty.
pub fn register_exam(persistence: &mut Persistence, exam: &Exam) -> Result<i64, ApiError> {
    validate_exam_duration(exam.duration_minutes)?;
    Interval::new(exam.period_start, exam.period_end)?;
    let exam_id: i64 = persistence.insert_exam(exam)?;
    info!(exam_id, name = %exam.name, "Exam registered");
    Ok(exam_id)
}

/// # Errors
///
/// Returns an error if the exam does not exist or the user is already enrolled.
pub fn enrol(
    persistence: &mut Persistence,
    user_id: i64,
    exam_id: i64,
) -> Result<EnrolmentInfo, ApiError> {
    require_exam(persistence, exam_id)?;
    let enrolment: Enrolment = persistence.insert_enrolment(user_id, exam_id)?;
    Ok(EnrolmentInfo {
        enrolment_id: enrolment.enrolment_id,
        user_id: enrolment.user_id,
        exam_id: enrolment.exam_id,
        reservation_id: enrolment.reservation_id,
    })
}
