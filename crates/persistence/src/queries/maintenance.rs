// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use diesel::prelude::*;
use diesel::SqliteConnection;
use exam_slots_domain::{Interval, MaintenancePeriod};

use crate::data_models::interval_from_row;
use crate::diesel_schema::maintenance_periods;
use crate::error::PersistenceError;

#[derive(Queryable, Selectable)]
#[diesel(table_name = maintenance_periods)]
struct MaintenancePeriodRow {
    maintenance_period_id: i64,
    start_at: i64,
    end_at: i64,
    description: String,
}

/// Lists maintenance periods in start order, optionally only those
/// overlapping `window`.
///
/// # Errors
///
/// Returns an error if the query fails or a row is malformed.
pub fn list_maintenance_periods(
    conn: &mut SqliteConnection,
    window: Option<&Interval>,
) -> Result<Vec<MaintenancePeriod>, PersistenceError> {
    let mut query = maintenance_periods::table
        .order(maintenance_periods::start_at)
        .select(MaintenancePeriodRow::as_select())
        .into_boxed();
    if let Some(window) = window {
        query = query
            .filter(maintenance_periods::start_at.lt(window.end().timestamp()))
            .filter(maintenance_periods::end_at.gt(window.start().timestamp()));
    }

    query
        .load::<MaintenancePeriodRow>(conn)?
        .into_iter()
        .map(|row| {
            Ok(MaintenancePeriod {
                maintenance_period_id: row.maintenance_period_id,
                interval: interval_from_row(row.start_at, row.end_at, "maintenance_periods")?,
                description: row.description,
            })
        })
        .collect()
}
