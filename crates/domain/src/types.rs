// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::error::DomainError;
use crate::interval::Interval;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

/// Shifts a time of day by a signed number of minutes, wrapping around midnight.
fn shift_time(time: NaiveTime, minutes: i32) -> NaiveTime {
    let (shifted, _) = time.overflowing_add_signed(Duration::minutes(i64::from(minutes)));
    shifted
}

/// Lifecycle state of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RoomState {
    /// The room accepts bookings.
    #[default]
    Active,
    /// The room has been retired and accepts no bookings.
    Inactive,
}

impl RoomState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
        }
    }
}

impl FromStr for RoomState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(Self::Active),
            "INACTIVE" => Ok(Self::Inactive),
            _ => Err(DomainError::UnknownState(s.to_string())),
        }
    }
}

impl std::fmt::Display for RoomState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A recurring weekly opening-hours block.
///
/// Times are stored as UTC time of day together with the UTC offset that was
/// in effect when the block was configured. The local wall-clock times are
/// recovered by re-applying that offset, which keeps a block configured as
/// 09:00-17:00 at 09:00-17:00 on both sides of a DST transition.
///
/// A local end of 00:00 means the block runs until the end of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningHours {
    weekday: Weekday,
    start_utc: NaiveTime,
    end_utc: NaiveTime,
    timezone_offset_minutes: i32,
}

impl OpeningHours {
    /// Creates a block from its stored representation.
    #[must_use]
    pub const fn new(
        weekday: Weekday,
        start_utc: NaiveTime,
        end_utc: NaiveTime,
        timezone_offset_minutes: i32,
    ) -> Self {
        Self {
            weekday,
            start_utc,
            end_utc,
            timezone_offset_minutes,
        }
    }

    /// Creates a block from local wall-clock times and the offset in effect
    /// at configuration time.
    #[must_use]
    pub fn from_local(
        weekday: Weekday,
        local_start: NaiveTime,
        local_end: NaiveTime,
        timezone_offset_minutes: i32,
    ) -> Self {
        Self {
            weekday,
            start_utc: shift_time(local_start, -timezone_offset_minutes),
            end_utc: shift_time(local_end, -timezone_offset_minutes),
            timezone_offset_minutes,
        }
    }

    #[must_use]
    pub const fn weekday(&self) -> Weekday {
        self.weekday
    }

    #[must_use]
    pub const fn start_utc(&self) -> NaiveTime {
        self.start_utc
    }

    #[must_use]
    pub const fn end_utc(&self) -> NaiveTime {
        self.end_utc
    }

    #[must_use]
    pub const fn timezone_offset_minutes(&self) -> i32 {
        self.timezone_offset_minutes
    }

    /// Local wall-clock opening time.
    #[must_use]
    pub fn local_start(&self) -> NaiveTime {
        shift_time(self.start_utc, self.timezone_offset_minutes)
    }

    /// Local wall-clock closing time (00:00 meaning end of day).
    #[must_use]
    pub fn local_end(&self) -> NaiveTime {
        shift_time(self.end_utc, self.timezone_offset_minutes)
    }
}

/// What an exception does to a room's hours on the dates it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExceptionKind {
    /// The room is closed all day.
    Closed,
    /// The room is open within the given local window (closes 00:00 = end of day).
    Open {
        /// Local opening time.
        opens: NaiveTime,
        /// Local closing time.
        closes: NaiveTime,
    },
}

/// A dated override of a room's weekly opening hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionHours {
    /// First local date covered (inclusive).
    pub first_day: NaiveDate,
    /// Last local date covered (inclusive).
    pub last_day: NaiveDate,
    /// The override.
    pub kind: ExceptionKind,
}

impl ExceptionHours {
    /// Returns `true` if this exception covers the given local date.
    #[must_use]
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.first_day <= date && date <= self.last_day
    }
}

/// A wall-clock time at which a booking may begin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartingHour {
    time_utc: NaiveTime,
    timezone_offset_minutes: i32,
}

impl StartingHour {
    #[must_use]
    pub const fn new(time_utc: NaiveTime, timezone_offset_minutes: i32) -> Self {
        Self {
            time_utc,
            timezone_offset_minutes,
        }
    }

    #[must_use]
    pub fn from_local(local: NaiveTime, timezone_offset_minutes: i32) -> Self {
        Self {
            time_utc: shift_time(local, -timezone_offset_minutes),
            timezone_offset_minutes,
        }
    }

    #[must_use]
    pub const fn time_utc(&self) -> NaiveTime {
        self.time_utc
    }

    #[must_use]
    pub const fn timezone_offset_minutes(&self) -> i32 {
        self.timezone_offset_minutes
    }

    #[must_use]
    pub fn local_time(&self) -> NaiveTime {
        shift_time(self.time_utc, self.timezone_offset_minutes)
    }
}

/// Postal address metadata of a room.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MailAddress {
    pub street: String,
    pub zip: String,
    pub city: String,
}

/// An examination room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub room_id: i64,
    pub name: String,
    pub room_code: Option<String>,
    /// IANA time zone identifier.
    pub local_timezone: String,
    pub out_of_service: bool,
    pub state: RoomState,
    pub opening_hours: Vec<OpeningHours>,
    pub exceptions: Vec<ExceptionHours>,
    pub starting_hours: Vec<StartingHour>,
    pub accessibility_ids: BTreeSet<i64>,
    pub address: MailAddress,
    pub building_name: Option<String>,
    pub campus: Option<String>,
}

impl Room {
    /// Resolves the room's time zone.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTimezone` if the identifier is unknown.
    pub fn timezone(&self) -> Result<Tz, DomainError> {
        self.local_timezone
            .parse()
            .map_err(|_| DomainError::InvalidTimezone(self.local_timezone.clone()))
    }

    /// A room accepts bookings only while in service and active.
    #[must_use]
    pub fn is_operative(&self) -> bool {
        !self.out_of_service && self.state == RoomState::Active
    }
}

/// A workstation inside a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    pub machine_id: i64,
    pub room_id: i64,
    pub name: Option<String>,
    pub ip_address: Option<String>,
    pub out_of_service: bool,
    pub archived: bool,
    /// Blanket flag satisfying any accessibility requirement.
    pub accessible: bool,
    pub accessibility_ids: BTreeSet<i64>,
    pub software_ids: BTreeSet<i64>,
}

impl Machine {
    /// A machine needs both a name and a network address to be bookable.
    #[must_use]
    pub fn has_identity(&self) -> bool {
        let named: bool = self.name.as_deref().is_some_and(|n| !n.trim().is_empty());
        let addressed: bool = self
            .ip_address
            .as_deref()
            .is_some_and(|ip| !ip.trim().is_empty());
        named && addressed
    }
}

/// A global blackout interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenancePeriod {
    pub maintenance_period_id: i64,
    pub interval: Interval,
    pub description: String,
}

/// Lifecycle state of an exam instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ExamState {
    #[default]
    Draft,
    Published,
    Started,
    Reviewed,
    Graded,
    Archived,
}

impl ExamState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Published => "PUBLISHED",
            Self::Started => "STARTED",
            Self::Reviewed => "REVIEWED",
            Self::Graded => "GRADED",
            Self::Archived => "ARCHIVED",
        }
    }

    /// Only a published exam accepts new or replacement reservations.
    #[must_use]
    pub const fn allows_reservation(&self) -> bool {
        matches!(self, Self::Published)
    }
}

impl FromStr for ExamState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(Self::Draft),
            "PUBLISHED" => Ok(Self::Published),
            "STARTED" => Ok(Self::Started),
            "REVIEWED" => Ok(Self::Reviewed),
            "GRADED" => Ok(Self::Graded),
            "ARCHIVED" => Ok(Self::Archived),
            _ => Err(DomainError::UnknownState(s.to_string())),
        }
    }
}

impl std::fmt::Display for ExamState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where an exam's reservations are allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ExamHosting {
    /// Machines of this institution.
    #[default]
    Local,
    /// Machines may also be booked from a collaborating organisation.
    Federated,
}

/// The parts of an exam instance the reservation engine consults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exam {
    pub exam_id: i64,
    pub name: String,
    pub duration_minutes: i64,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub required_software: BTreeSet<i64>,
    pub state: ExamState,
    /// Private exams allow re-booking after a no-show.
    pub private: bool,
    pub hosting: ExamHosting,
}

/// Binding of a user to an exam instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrolment {
    pub enrolment_id: i64,
    pub user_id: i64,
    pub exam_id: i64,
    pub reservation_id: Option<i64>,
    pub no_show: bool,
}

/// Snapshot of a reservation held in a collaborating organisation.
///
/// Names are copied at booking time; nothing here is a live foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalReservation {
    pub external_ref: String,
    pub org_ref: String,
    pub room_ref: String,
    pub org_name: Option<String>,
    pub org_code: Option<String>,
    pub machine_name: String,
    pub room_name: String,
    pub room_code: Option<String>,
    pub room_timezone: String,
    pub building_name: Option<String>,
    pub campus: Option<String>,
}

/// What a reservation occupies. Local and external bindings are exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationTarget {
    Machine(i64),
    External(ExternalReservation),
}

/// A user's booking of a time window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub reservation_id: i64,
    pub user_id: i64,
    pub interval: Interval,
    pub target: ReservationTarget,
    pub reminder_sent: bool,
    pub no_show: bool,
}

impl Reservation {
    #[must_use]
    pub const fn machine_id(&self) -> Option<i64> {
        match &self.target {
            ReservationTarget::Machine(id) => Some(*id),
            ReservationTarget::External(_) => None,
        }
    }

    #[must_use]
    pub const fn external(&self) -> Option<&ExternalReservation> {
        match &self.target {
            ReservationTarget::Machine(_) => None,
            ReservationTarget::External(external) => Some(external),
        }
    }

    /// A reservation is in effect once its start has been reached.
    #[must_use]
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.interval.start() <= now
    }
}
