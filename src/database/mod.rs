// Copyright 2023 Remi Bernotavicius

use diesel::connection::SimpleConnection as _;
use diesel::prelude::Connection as _;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::path::Path;

#[cfg(test)]
pub mod fixtures;
pub mod forms;
pub mod models;
pub mod query;
pub mod recipes;
pub mod schema;

pub type Connection = diesel::sqlite::SqliteConnection;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

pub fn establish_connection(path: impl AsRef<Path>) -> crate::Result<Connection> {
    let path = path.as_ref();
    let url = path.to_str().ok_or_else(|| {
        crate::Error::Invalid(format!("database path {path:?} is not valid UTF-8"))
    })?;
    let mut connection = Connection::establish(url)?;
    connection
        .batch_execute("PRAGMA foreign_keys = ON;")
        .map_err(crate::Error::from)?;
    run_migrations(&mut connection)?;
    Ok(connection)
}

pub fn run_migrations(conn: &mut Connection) -> crate::Result<()> {
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(crate::Error::Migration)?;
    for version in applied {
        log::info!("applied migration {version}");
    }
    Ok(())
}

#[test]
fn migrations() {
    let mut conn = establish_connection(":memory:").unwrap();

    conn.revert_all_migrations(MIGRATIONS).unwrap();
    conn.run_pending_migrations(MIGRATIONS).unwrap();
    assert!(!conn.has_pending_migration(MIGRATIONS).unwrap());
}
