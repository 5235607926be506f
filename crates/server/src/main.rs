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
    clippy::all
)]
#![allow(clippy::multiple_crate_versions)]

use axum::{
    Json, Router,
    extract::{Path, Query, State as AxumState},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use chrono::{DateTime, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use clap::Parser;
use exam_slots_api::{
    ApiError, ChangeMachineResponse, CreateMaintenancePeriodRequest, CreateReservationRequest,
    EnrolmentInfo, ExternalRoomRequest, FindAvailableMachinesResponse, GetExternalSlotsRequest,
    GetSlotsRequest, GetSlotsResponse, HttpExternalReservationService, MaintenancePeriodInfo,
    NoShowResponse, RemoveReservationResponse, ReservationResponse, SharedPersistence,
    admin_remove_reservation, change_reservation_machine, create_maintenance_period,
    create_or_replace_reservation, delete_maintenance_period, enrol, find_available_machines,
    get_external_slots, get_slots, list_maintenance_periods, process_no_show, register_exam,
    register_machine, register_room, remove_reservation,
};
use exam_slots_domain::{
    DomainError, Exam, ExamHosting, ExamState, ExceptionHours, Machine, MailAddress,
    OpeningHours, Room, RoomState, SchedulingConfig, StartingHour, offset_minutes,
};
use exam_slots_notify::{NotificationSink, TracingNotificationSink};
use exam_slots_persistence::Persistence;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

/// Exam Slots Server - HTTP server for the exam slot-allocation engine
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the `SQLite` database file. If not provided, uses in-memory database.
    #[arg(short, long)]
    database: Option<String>,

    /// Port to bind the server to
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// How many days ahead students may search for slots
    #[arg(long, default_value_t = 30)]
    reservation_window_days: i64,

    /// Time zone used when a room or remote slot has none
    #[arg(long, default_value = "Europe/Helsinki")]
    default_timezone: String,

    /// Base URL of the federation host. Booking in other organisations is
    /// disabled without it.
    #[arg(long)]
    federation_host: Option<String>,

    /// This organisation's reference at the federation host
    #[arg(long, default_value = "local")]
    home_organisation: String,
}

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    /// The persistence layer; handlers never hold it across a remote call.
    persistence: Arc<SharedPersistence>,
    /// Receiver of reservation events.
    notifier: Arc<dyn NotificationSink>,
    config: SchedulingConfig,
    /// Client for collaborating organisations, if configured.
    external: Option<HttpExternalReservationService>,
}

// ============================================================================
// Request and response bodies
// ============================================================================

/// Query parameters for a local slot search.
#[derive(Debug, Deserialize)]
struct SlotsQuery {
    user_id: i64,
    /// Requested day (`yyyy-MM-dd`).
    day: Option<String>,
    /// Comma-separated accessibility ids.
    accessibility: Option<String>,
}

/// Query parameters for a slot search in another organisation.
#[derive(Debug, Deserialize)]
struct ExternalSlotsQuery {
    user_id: i64,
    org: String,
    room: String,
    day: Option<String>,
}

/// Where to book in another organisation.
#[derive(Debug, Clone, Deserialize, Serialize)]
struct ExternalRoomApiRequest {
    org_ref: String,
    room_ref: String,
}

/// API request for booking a slot.
#[derive(Debug, Clone, Deserialize, Serialize)]
struct CreateReservationApiRequest {
    user_id: i64,
    exam_id: i64,
    /// Local room; omitted for a booking in another organisation.
    #[serde(default)]
    room_id: Option<i64>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    #[serde(default)]
    accessibility_ids: BTreeSet<i64>,
    #[serde(default)]
    external: Option<ExternalRoomApiRequest>,
}

/// Query parameters for an administrator's removal.
#[derive(Debug, Deserialize)]
struct AdminRemoveQuery {
    /// Explanation passed on to the student.
    message: Option<String>,
}

/// API request for moving a reservation to another machine.
#[derive(Debug, Clone, Deserialize, Serialize)]
struct ChangeMachineApiRequest {
    machine_id: i64,
}

/// API request for a maintenance period.
#[derive(Debug, Clone, Deserialize, Serialize)]
struct CreateMaintenancePeriodApiRequest {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    #[serde(default)]
    description: String,
}

/// A weekly opening block in local wall-clock time.
#[derive(Debug, Clone, Deserialize, Serialize)]
struct OpeningHoursApiRequest {
    weekday: Weekday,
    opens: NaiveTime,
    /// `00:00:00` keeps the room open until midnight.
    closes: NaiveTime,
}

/// API request for registering a room.
#[derive(Debug, Clone, Deserialize, Serialize)]
struct CreateRoomApiRequest {
    name: String,
    #[serde(default)]
    room_code: Option<String>,
    local_timezone: String,
    opening_hours: Vec<OpeningHoursApiRequest>,
    /// Local starting times; hourly on the hour when empty.
    #[serde(default)]
    starting_hours: Vec<NaiveTime>,
    #[serde(default)]
    exceptions: Vec<ExceptionHours>,
    #[serde(default)]
    accessibility_ids: BTreeSet<i64>,
    #[serde(default)]
    address: MailAddress,
    #[serde(default)]
    building_name: Option<String>,
    #[serde(default)]
    campus: Option<String>,
}

/// API request for registering a machine.
#[derive(Debug, Clone, Deserialize, Serialize)]
struct CreateMachineApiRequest {
    name: Option<String>,
    #[serde(default)]
    ip_address: Option<String>,
    #[serde(default)]
    accessible: bool,
    #[serde(default)]
    accessibility_ids: BTreeSet<i64>,
    #[serde(default)]
    software_ids: BTreeSet<i64>,
}

/// API request for registering an exam.
#[derive(Debug, Clone, Deserialize, Serialize)]
struct CreateExamApiRequest {
    name: String,
    duration_minutes: i64,
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
    #[serde(default)]
    required_software: BTreeSet<i64>,
    /// Defaults to published.
    #[serde(default)]
    state: Option<ExamState>,
    #[serde(default)]
    private: bool,
    #[serde(default)]
    hosting: ExamHosting,
}

/// API request for enrolling a user.
#[derive(Debug, Clone, Deserialize, Serialize)]
struct EnrolApiRequest {
    user_id: i64,
}

/// API response for a registered entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CreatedResponse {
    id: i64,
}

/// Error response type.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ErrorResponse {
    /// Error indicator.
    error: bool,
    /// Stable error code.
    code: String,
    /// Error message.
    message: String,
}

/// HTTP error wrapper that implements `IntoResponse`.
struct HttpError {
    /// The HTTP status code.
    status: StatusCode,
    code: &'static str,
    /// The error message.
    message: String,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body: Json<ErrorResponse> = Json(ErrorResponse {
            error: true,
            code: self.code.to_string(),
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<ApiError> for HttpError {
    fn from(err: ApiError) -> Self {
        let status: StatusCode = match &err {
            ApiError::SearchDateOutOfRange { .. } | ApiError::InvalidInput { .. } => {
                StatusCode::BAD_REQUEST
            }
            ApiError::ReservationInEffect { .. } | ApiError::ExamNotBookable { .. } => {
                StatusCode::FORBIDDEN
            }
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::NoMachineAvailable
            | ApiError::ConflictingReservation { .. }
            | ApiError::SlotNotOffered { .. } => StatusCode::CONFLICT,
            ApiError::ExternalDelegationFailure(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal { .. } => {
                error!(error = %err, "Internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            code: err.code(),
            message: err.to_string(),
        }
    }
}

fn bad_request(field: &str, message: String) -> HttpError {
    HttpError::from(ApiError::InvalidInput {
        field: field.to_string(),
        message,
    })
}

/// Parses a comma-separated list of ids.
fn parse_id_list(value: Option<&str>) -> Result<BTreeSet<i64>, HttpError> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>().map_err(|e| {
                bad_request("accessibility", format!("'{part}' is not an id: {e}"))
            })
        })
        .collect()
}

// ============================================================================
// Conversions
// ============================================================================

fn room_from_request(req: CreateRoomApiRequest, now: DateTime<Utc>) -> Result<Room, HttpError> {
    let tz: Tz = req
        .local_timezone
        .parse()
        .map_err(|_| ApiError::from(DomainError::InvalidTimezone(req.local_timezone.clone())))?;
    let offset: i32 = offset_minutes(now, tz);
    Ok(Room {
        room_id: 0,
        name: req.name,
        room_code: req.room_code,
        local_timezone: req.local_timezone,
        out_of_service: false,
        state: RoomState::Active,
        opening_hours: req
            .opening_hours
            .iter()
            .map(|block| OpeningHours::from_local(block.weekday, block.opens, block.closes, offset))
            .collect(),
        exceptions: req.exceptions,
        starting_hours: req
            .starting_hours
            .iter()
            .map(|time| StartingHour::from_local(*time, offset))
            .collect(),
        accessibility_ids: req.accessibility_ids,
        address: req.address,
        building_name: req.building_name,
        campus: req.campus,
    })
}

// ============================================================================
// Handlers
// ============================================================================

/// Handler for GET `/exams/{exam_id}/rooms/{room_id}/slots` endpoint.
async fn handle_get_slots(
    AxumState(app_state): AxumState<AppState>,
    Path((exam_id, room_id)): Path<(i64, i64)>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<GetSlotsResponse>, HttpError> {
    let request: GetSlotsRequest = GetSlotsRequest {
        user_id: query.user_id,
        exam_id,
        room_id,
        day: query.day,
        accessibility_ids: parse_id_list(query.accessibility.as_deref())?,
    };
    let mut persistence = app_state.persistence.lock().await;
    let response: GetSlotsResponse =
        get_slots(&mut persistence, &request, &app_state.config, Utc::now())?;
    Ok(Json(response))
}

/// Handler for GET `/exams/{exam_id}/external_slots` endpoint.
async fn handle_get_external_slots(
    AxumState(app_state): AxumState<AppState>,
    Path(exam_id): Path<i64>,
    Query(query): Query<ExternalSlotsQuery>,
) -> Result<Json<GetSlotsResponse>, HttpError> {
    let request: GetExternalSlotsRequest = GetExternalSlotsRequest {
        user_id: query.user_id,
        exam_id,
        org_ref: query.org,
        room_ref: query.room,
        day: query.day,
    };
    let response: GetSlotsResponse = get_external_slots(
        &app_state.persistence,
        &app_state.external,
        &request,
        &app_state.config,
        Utc::now(),
    )
    .await?;
    Ok(Json(response))
}

/// Handler for POST `/reservations` endpoint.
///
/// Books a slot, replacing the enrolment's current reservation.
async fn handle_create_reservation(
    AxumState(app_state): AxumState<AppState>,
    Json(req): Json<CreateReservationApiRequest>,
) -> Result<Json<ReservationResponse>, HttpError> {
    let room_id: i64 = match (&req.external, req.room_id) {
        (Some(_), room_id) => room_id.unwrap_or_default(),
        (None, Some(room_id)) => room_id,
        (None, None) => {
            return Err(bad_request(
                "room_id",
                String::from("A local booking needs a room"),
            ));
        }
    };
    let request: CreateReservationRequest = CreateReservationRequest {
        user_id: req.user_id,
        exam_id: req.exam_id,
        room_id,
        start: req.start,
        end: req.end,
        accessibility_ids: req.accessibility_ids,
        external: req.external.map(|e| ExternalRoomRequest {
            org_ref: e.org_ref,
            room_ref: e.room_ref,
        }),
    };
    let response: ReservationResponse = create_or_replace_reservation(
        &app_state.persistence,
        &app_state.external,
        &*app_state.notifier,
        &request,
        &app_state.config,
        Utc::now(),
    )
    .await?;
    info!(
        reservation_id = response.reservation_id,
        "Successfully created reservation"
    );
    Ok(Json(response))
}

/// Handler for DELETE `/enrolments/{enrolment_id}/reservation` endpoint.
async fn handle_remove_reservation(
    AxumState(app_state): AxumState<AppState>,
    Path(enrolment_id): Path<i64>,
) -> Result<Json<RemoveReservationResponse>, HttpError> {
    let response: RemoveReservationResponse = remove_reservation(
        &app_state.persistence,
        &app_state.external,
        &*app_state.notifier,
        &app_state.config,
        enrolment_id,
        Utc::now(),
    )
    .await?;
    Ok(Json(response))
}

/// Handler for DELETE `/admin/reservations/{reservation_id}` endpoint.
async fn handle_admin_remove_reservation(
    AxumState(app_state): AxumState<AppState>,
    Path(reservation_id): Path<i64>,
    Query(query): Query<AdminRemoveQuery>,
) -> Result<Json<RemoveReservationResponse>, HttpError> {
    let response: RemoveReservationResponse = admin_remove_reservation(
        &app_state.persistence,
        &app_state.external,
        &*app_state.notifier,
        &app_state.config,
        reservation_id,
        query.message,
        Utc::now(),
    )
    .await?;
    Ok(Json(response))
}

/// Handler for GET `/admin/reservations/{reservation_id}/machines` endpoint.
async fn handle_find_available_machines(
    AxumState(app_state): AxumState<AppState>,
    Path(reservation_id): Path<i64>,
) -> Result<Json<FindAvailableMachinesResponse>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    Ok(Json(find_available_machines(
        &mut persistence,
        reservation_id,
    )?))
}

/// Handler for PUT `/admin/reservations/{reservation_id}/machine` endpoint.
async fn handle_change_machine(
    AxumState(app_state): AxumState<AppState>,
    Path(reservation_id): Path<i64>,
    Json(req): Json<ChangeMachineApiRequest>,
) -> Result<Json<ChangeMachineResponse>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    let response: ChangeMachineResponse = change_reservation_machine(
        &mut persistence,
        &*app_state.notifier,
        &app_state.config,
        reservation_id,
        req.machine_id,
    )?;
    Ok(Json(response))
}

/// Handler for POST `/admin/reservations/{reservation_id}/no_show` endpoint.
async fn handle_no_show(
    AxumState(app_state): AxumState<AppState>,
    Path(reservation_id): Path<i64>,
) -> Result<Json<NoShowResponse>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    Ok(Json(process_no_show(&mut persistence, reservation_id)?))
}

/// Handler for POST `/admin/maintenance_periods` endpoint.
async fn handle_create_maintenance_period(
    AxumState(app_state): AxumState<AppState>,
    Json(req): Json<CreateMaintenancePeriodApiRequest>,
) -> Result<Json<MaintenancePeriodInfo>, HttpError> {
    let request: CreateMaintenancePeriodRequest = CreateMaintenancePeriodRequest {
        start: req.start,
        end: req.end,
        description: req.description,
    };
    let mut persistence = app_state.persistence.lock().await;
    Ok(Json(create_maintenance_period(&mut persistence, &request)?))
}

/// Handler for GET `/admin/maintenance_periods` endpoint.
async fn handle_list_maintenance_periods(
    AxumState(app_state): AxumState<AppState>,
) -> Result<Json<Vec<MaintenancePeriodInfo>>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    Ok(Json(list_maintenance_periods(&mut persistence)?))
}

/// Handler for DELETE `/admin/maintenance_periods/{period_id}` endpoint.
async fn handle_delete_maintenance_period(
    AxumState(app_state): AxumState<AppState>,
    Path(period_id): Path<i64>,
) -> Result<StatusCode, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    delete_maintenance_period(&mut persistence, period_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for POST `/admin/rooms` endpoint.
async fn handle_create_room(
    AxumState(app_state): AxumState<AppState>,
    Json(req): Json<CreateRoomApiRequest>,
) -> Result<Json<CreatedResponse>, HttpError> {
    let room: Room = room_from_request(req, Utc::now())?;
    let mut persistence = app_state.persistence.lock().await;
    let id: i64 = register_room(&mut persistence, &room)?;
    Ok(Json(CreatedResponse { id }))
}

/// Handler for POST `/admin/rooms/{room_id}/machines` endpoint.
async fn handle_create_machine(
    AxumState(app_state): AxumState<AppState>,
    Path(room_id): Path<i64>,
    Json(req): Json<CreateMachineApiRequest>,
) -> Result<Json<CreatedResponse>, HttpError> {
    let machine: Machine = Machine {
        machine_id: 0,
        room_id,
        name: req.name,
        ip_address: req.ip_address,
        out_of_service: false,
        archived: false,
        accessible: req.accessible,
        accessibility_ids: req.accessibility_ids,
        software_ids: req.software_ids,
    };
    let mut persistence = app_state.persistence.lock().await;
    let id: i64 = register_machine(&mut persistence, &machine)?;
    Ok(Json(CreatedResponse { id }))
}

/// Handler for POST `/admin/exams` endpoint.
async fn handle_create_exam(
    AxumState(app_state): AxumState<AppState>,
    Json(req): Json<CreateExamApiRequest>,
) -> Result<Json<CreatedResponse>, HttpError> {
    let exam: Exam = Exam {
        exam_id: 0,
        name: req.name,
        duration_minutes: req.duration_minutes,
        period_start: req.period_start,
        period_end: req.period_end,
        required_software: req.required_software,
        state: req.state.unwrap_or(ExamState::Published),
        private: req.private,
        hosting: req.hosting,
    };
    let mut persistence = app_state.persistence.lock().await;
    let id: i64 = register_exam(&mut persistence, &exam)?;
    Ok(Json(CreatedResponse { id }))
}

/// Handler for POST `/exams/{exam_id}/enrolments` endpoint.
async fn handle_enrol(
    AxumState(app_state): AxumState<AppState>,
    Path(exam_id): Path<i64>,
    Json(req): Json<EnrolApiRequest>,
) -> Result<Json<EnrolmentInfo>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    Ok(Json(enrol(&mut persistence, req.user_id, exam_id)?))
}

/// Builds the application router with all endpoints.
fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/exams/{exam_id}/rooms/{room_id}/slots",
            get(handle_get_slots),
        )
        .route(
            "/exams/{exam_id}/external_slots",
            get(handle_get_external_slots),
        )
        .route("/exams/{exam_id}/enrolments", post(handle_enrol))
        .route("/reservations", post(handle_create_reservation))
        .route(
            "/enrolments/{enrolment_id}/reservation",
            delete(handle_remove_reservation),
        )
        .route(
            "/admin/reservations/{reservation_id}",
            delete(handle_admin_remove_reservation),
        )
        .route(
            "/admin/reservations/{reservation_id}/machines",
            get(handle_find_available_machines),
        )
        .route(
            "/admin/reservations/{reservation_id}/machine",
            put(handle_change_machine),
        )
        .route(
            "/admin/reservations/{reservation_id}/no_show",
            post(handle_no_show),
        )
        .route(
            "/admin/maintenance_periods",
            post(handle_create_maintenance_period).get(handle_list_maintenance_periods),
        )
        .route(
            "/admin/maintenance_periods/{period_id}",
            delete(handle_delete_maintenance_period),
        )
        .route("/admin/rooms", post(handle_create_room))
        .route("/admin/rooms/{room_id}/machines", post(handle_create_machine))
        .route("/admin/exams", post(handle_create_exam))
        .with_state(app_state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command-line arguments
    let args: Args = Args::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Initializing Exam Slots Server");

    let config: SchedulingConfig =
        SchedulingConfig::new(args.reservation_window_days, &args.default_timezone)?;

    // Initialize persistence (in-memory or file-based based on CLI argument)
    let persistence: Persistence = if let Some(db_path) = &args.database {
        info!("Using file-based database at: {}", db_path);
        Persistence::new_with_file(db_path)?
    } else {
        info!("Using in-memory database");
        Persistence::new_in_memory()?
    };

    let external: Option<HttpExternalReservationService> = match &args.federation_host {
        Some(host) => {
            info!(host = %host, organisation = %args.home_organisation, "Federation enabled");
            Some(HttpExternalReservationService::new(
                host,
                &args.home_organisation,
            )?)
        }
        None => {
            info!("No federation host configured; external bookings are disabled");
            None
        }
    };

    let app_state: AppState = AppState {
        persistence: Arc::new(Mutex::new(persistence)),
        notifier: Arc::new(TracingNotificationSink),
        config,
        external,
    };

    // Build router
    let app: Router = build_router(app_state);

    // Bind to address
    let addr: std::net::SocketAddr = format!("127.0.0.1:{}", args.port).parse()?;
    info!("Server listening on {}", addr);

    // Run server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
