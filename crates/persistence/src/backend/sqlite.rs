// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! `SQLite` connection setup.
//!
//! Every connection gets the same PRAGMA set before migrations run. File
//! databases additionally switch to WAL so that slot searches can read
//! while another adapter holds the write lock for a reservation swap.

use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Text};
use diesel::{Connection, RunQueryDsl, SqliteConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, info};

use crate::error::PersistenceError;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Milliseconds a connection waits for the write lock before giving up.
pub const BUSY_TIMEOUT_MS: u32 = 5_000;

/// Where the database lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    /// Shared-cache in-memory database.
    Memory,
    /// On-disk database file.
    File,
}

impl StorageMode {
    /// PRAGMA statements applied to a fresh connection, in order.
    fn pragmas(self) -> Vec<String> {
        let mut pragmas: Vec<String> = vec![
            String::from("PRAGMA foreign_keys = ON"),
            format!("PRAGMA busy_timeout = {BUSY_TIMEOUT_MS}"),
        ];
        if self == Self::File {
            pragmas.push(String::from("PRAGMA journal_mode = WAL"));
        }
        pragmas
    }
}

#[derive(QueryableByName)]
struct IntegerPragma {
    #[diesel(sql_type = BigInt)]
    value: i64,
}

#[derive(QueryableByName)]
struct TextPragma {
    #[diesel(sql_type = Text)]
    value: String,
}

/// Returns the rowid of the last successful insert on this connection.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_last_insert_rowid(conn: &mut SqliteConnection) -> Result<i64, PersistenceError> {
    Ok(diesel::select(sql::<BigInt>("last_insert_rowid()")).get_result(conn)?)
}

/// Opens a connection, configures it and brings the schema up to date.
///
/// The returned connection has foreign key enforcement verified; enrolment
/// unbinding and the cascade deletes of room children rely on it.
///
/// # Arguments
///
/// * `database_url` - A file path or an `SQLite` URI
/// * `mode` - Whether `database_url` names an in-memory or file database
///
/// # Errors
///
/// Returns an error if the connection, a PRAGMA, a migration or the
/// foreign key check fails.
pub fn open(database_url: &str, mode: StorageMode) -> Result<SqliteConnection, PersistenceError> {
    info!(database_url, ?mode, "Opening SQLite database");

    let mut conn: SqliteConnection = SqliteConnection::establish(database_url)?;

    for pragma in mode.pragmas() {
        // PRAGMA has no Diesel DSL.
        diesel::sql_query(&pragma)
            .execute(&mut conn)
            .map_err(|e| PersistenceError::QueryFailed(format!("{pragma}: {e}")))?;
        debug!(pragma = %pragma, "Applied");
    }

    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| PersistenceError::MigrationFailed(e.to_string()))?;

    let foreign_keys: i64 =
        diesel::sql_query("SELECT foreign_keys AS value FROM pragma_foreign_keys")
            .get_result::<IntegerPragma>(&mut conn)?
            .value;
    if foreign_keys == 0 {
        return Err(PersistenceError::ForeignKeyEnforcementNotEnabled);
    }

    if mode == StorageMode::File {
        let journal: String =
            diesel::sql_query("SELECT journal_mode AS value FROM pragma_journal_mode")
                .get_result::<TextPragma>(&mut conn)?
                .value;
        debug!(journal_mode = %journal, "Journal mode");
    }

    Ok(conn)
}
