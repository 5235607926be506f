// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use diesel::prelude::*;
use diesel::SqliteConnection;
use exam_slots_domain::{Interval, MaintenancePeriod};
use tracing::info;

use crate::backend::sqlite::get_last_insert_rowid;
use crate::diesel_schema::maintenance_periods;
use crate::error::PersistenceError;

/// Inserts a maintenance period.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_maintenance_period(
    conn: &mut SqliteConnection,
    interval: &Interval,
    description: &str,
) -> Result<MaintenancePeriod, PersistenceError> {
    diesel::insert_into(maintenance_periods::table)
        .values((
            maintenance_periods::start_at.eq(interval.start().timestamp()),
            maintenance_periods::end_at.eq(interval.end().timestamp()),
            maintenance_periods::description.eq(description),
        ))
        .execute(conn)?;
    let maintenance_period_id: i64 = get_last_insert_rowid(conn)?;

    info!(maintenance_period_id, %interval, "Maintenance period created");
    Ok(MaintenancePeriod {
        maintenance_period_id,
        interval: *interval,
        description: description.to_string(),
    })
}

/// Deletes a maintenance period.
///
/// # Errors
///
/// Returns `PersistenceError::NotFound` if the period does not exist.
pub fn delete_maintenance_period(
    conn: &mut SqliteConnection,
    maintenance_period_id: i64,
) -> Result<(), PersistenceError> {
    let deleted: usize =
        diesel::delete(maintenance_periods::table.find(maintenance_period_id)).execute(conn)?;
    if deleted == 0 {
        return Err(PersistenceError::NotFound(format!(
            "maintenance period {maintenance_period_id}"
        )));
    }
    info!(maintenance_period_id, "Maintenance period deleted");
    Ok(())
}
