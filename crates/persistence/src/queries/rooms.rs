// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Room and machine queries.
//!
//! A room is assembled from its own row and the child tables holding the
//! weekly opening hours, exceptions, starting hours and accessibility tags.

use chrono::Weekday;
use diesel::prelude::*;
use diesel::SqliteConnection;
use exam_slots_domain::{
    ExceptionHours, ExceptionKind, Machine, MailAddress, OpeningHours, Room, RoomState,
    StartingHour,
};
use num_traits::FromPrimitive;
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use tracing::debug;

use crate::data_models::{date_from_row, time_from_row};
use crate::diesel_schema::{
    exception_hours, machine_accessibilities, machine_software, machines, opening_hours,
    room_accessibilities, rooms, starting_hours,
};
use crate::error::PersistenceError;

#[derive(Queryable, Selectable)]
#[diesel(table_name = rooms)]
struct RoomRow {
    room_id: i64,
    name: String,
    room_code: Option<String>,
    local_timezone: String,
    out_of_service: i32,
    state: String,
    street: String,
    zip: String,
    city: String,
    building_name: Option<String>,
    campus: Option<String>,
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = opening_hours)]
struct OpeningHoursRow {
    weekday: i32,
    start_time: String,
    end_time: String,
    timezone_offset_minutes: i32,
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = exception_hours)]
struct ExceptionRow {
    first_day: String,
    last_day: String,
    closed: i32,
    opens: Option<String>,
    closes: Option<String>,
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = starting_hours)]
struct StartingHourRow {
    start_time: String,
    timezone_offset_minutes: i32,
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = machines)]
struct MachineRow {
    machine_id: i64,
    room_id: i64,
    name: Option<String>,
    ip_address: Option<String>,
    out_of_service: i32,
    archived: i32,
    accessible: i32,
}

fn opening_hours_from_row(row: &OpeningHoursRow) -> Result<OpeningHours, PersistenceError> {
    let weekday: Weekday =
        Weekday::from_i32(row.weekday).ok_or_else(|| PersistenceError::CorruptRow {
            table: "opening_hours",
            reason: format!("weekday {} is out of range", row.weekday),
        })?;
    Ok(OpeningHours::new(
        weekday,
        time_from_row(&row.start_time, "opening_hours")?,
        time_from_row(&row.end_time, "opening_hours")?,
        row.timezone_offset_minutes,
    ))
}

fn exception_from_row(row: &ExceptionRow) -> Result<ExceptionHours, PersistenceError> {
    let kind: ExceptionKind = if row.closed != 0 {
        ExceptionKind::Closed
    } else {
        match (&row.opens, &row.closes) {
            (Some(opens), Some(closes)) => ExceptionKind::Open {
                opens: time_from_row(opens, "exception_hours")?,
                closes: time_from_row(closes, "exception_hours")?,
            },
            _ => {
                return Err(PersistenceError::CorruptRow {
                    table: "exception_hours",
                    reason: "open exception without a window".to_string(),
                });
            }
        }
    };
    Ok(ExceptionHours {
        first_day: date_from_row(&row.first_day, "exception_hours")?,
        last_day: date_from_row(&row.last_day, "exception_hours")?,
        kind,
    })
}

/// Retrieves a room with its full calendar.
///
/// # Errors
///
/// Returns an error if the query fails or a stored value is malformed.
/// Returns `Ok(None)` if the room does not exist.
pub fn get_room(conn: &mut SqliteConnection, room_id: i64) -> Result<Option<Room>, PersistenceError> {
    debug!(room_id, "Loading room");

    let Some(row) = rooms::table
        .find(room_id)
        .select(RoomRow::as_select())
        .first::<RoomRow>(conn)
        .optional()?
    else {
        return Ok(None);
    };

    let opening_hours: Vec<OpeningHours> = opening_hours::table
        .filter(opening_hours::room_id.eq(room_id))
        .order((opening_hours::weekday, opening_hours::start_time))
        .select(OpeningHoursRow::as_select())
        .load::<OpeningHoursRow>(conn)?
        .iter()
        .map(opening_hours_from_row)
        .collect::<Result<_, _>>()?;

    let exceptions: Vec<ExceptionHours> = exception_hours::table
        .filter(exception_hours::room_id.eq(room_id))
        .order(exception_hours::first_day)
        .select(ExceptionRow::as_select())
        .load::<ExceptionRow>(conn)?
        .iter()
        .map(exception_from_row)
        .collect::<Result<_, _>>()?;

    let starting_hours: Vec<StartingHour> = starting_hours::table
        .filter(starting_hours::room_id.eq(room_id))
        .order(starting_hours::start_time)
        .select(StartingHourRow::as_select())
        .load::<StartingHourRow>(conn)?
        .iter()
        .map(|r| {
            Ok(StartingHour::new(
                time_from_row(&r.start_time, "starting_hours")?,
                r.timezone_offset_minutes,
            ))
        })
        .collect::<Result<_, PersistenceError>>()?;

    let accessibility_ids: BTreeSet<i64> = room_accessibilities::table
        .filter(room_accessibilities::room_id.eq(room_id))
        .select(room_accessibilities::accessibility_id)
        .load::<i64>(conn)?
        .into_iter()
        .collect();

    let state: RoomState =
        RoomState::from_str(&row.state).map_err(|e| PersistenceError::CorruptRow {
            table: "rooms",
            reason: e.to_string(),
        })?;

    Ok(Some(Room {
        room_id: row.room_id,
        name: row.name,
        room_code: row.room_code,
        local_timezone: row.local_timezone,
        out_of_service: row.out_of_service != 0,
        state,
        opening_hours,
        exceptions,
        starting_hours,
        accessibility_ids,
        address: MailAddress {
            street: row.street,
            zip: row.zip,
            city: row.city,
        },
        building_name: row.building_name,
        campus: row.campus,
    }))
}

fn load_machines(
    conn: &mut SqliteConnection,
    rows: Vec<MachineRow>,
) -> Result<Vec<Machine>, PersistenceError> {
    let ids: Vec<i64> = rows.iter().map(|r| r.machine_id).collect();

    let mut accessibility: BTreeMap<i64, BTreeSet<i64>> = BTreeMap::new();
    for (machine_id, accessibility_id) in machine_accessibilities::table
        .filter(machine_accessibilities::machine_id.eq_any(&ids))
        .select((
            machine_accessibilities::machine_id,
            machine_accessibilities::accessibility_id,
        ))
        .load::<(i64, i64)>(conn)?
    {
        accessibility
            .entry(machine_id)
            .or_default()
            .insert(accessibility_id);
    }

    let mut software: BTreeMap<i64, BTreeSet<i64>> = BTreeMap::new();
    for (machine_id, software_id) in machine_software::table
        .filter(machine_software::machine_id.eq_any(&ids))
        .select((machine_software::machine_id, machine_software::software_id))
        .load::<(i64, i64)>(conn)?
    {
        software.entry(machine_id).or_default().insert(software_id);
    }

    Ok(rows
        .into_iter()
        .map(|row| Machine {
            machine_id: row.machine_id,
            room_id: row.room_id,
            name: row.name,
            ip_address: row.ip_address,
            out_of_service: row.out_of_service != 0,
            archived: row.archived != 0,
            accessible: row.accessible != 0,
            accessibility_ids: accessibility.remove(&row.machine_id).unwrap_or_default(),
            software_ids: software.remove(&row.machine_id).unwrap_or_default(),
        })
        .collect())
}

/// Lists every machine in a room, ordered by id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_room_machines(
    conn: &mut SqliteConnection,
    room_id: i64,
) -> Result<Vec<Machine>, PersistenceError> {
    let rows: Vec<MachineRow> = machines::table
        .filter(machines::room_id.eq(room_id))
        .order(machines::machine_id)
        .select(MachineRow::as_select())
        .load(conn)?;

    debug!(room_id, machine_count = rows.len(), "Loaded room machines");
    load_machines(conn, rows)
}

/// Retrieves a single machine.
///
/// # Errors
///
/// Returns an error if the query fails.
/// Returns `Ok(None)` if the machine does not exist.
pub fn get_machine(
    conn: &mut SqliteConnection,
    machine_id: i64,
) -> Result<Option<Machine>, PersistenceError> {
    let rows: Vec<MachineRow> = machines::table
        .find(machine_id)
        .select(MachineRow::as_select())
        .load(conn)?;
    Ok(load_machines(conn, rows)?.into_iter().next())
}
