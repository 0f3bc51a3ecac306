//! Users table.

use crate::codec::parsed;
use crate::StorageResult;
use mapshare_model::User;
use mapshare_types::UserId;
use rusqlite::{params, Connection, OptionalExtension, Row};

fn from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: parsed(row, 0)?,
        username: row.get(1)?,
    })
}

pub fn insert(conn: &Connection, user: &User) -> StorageResult<()> {
    conn.execute(
        "INSERT INTO users (id, username) VALUES (?1, ?2)",
        params![user.id.to_string(), user.username],
    )?;
    Ok(())
}

pub fn get(conn: &Connection, id: UserId) -> StorageResult<Option<User>> {
    Ok(conn
        .query_row(
            "SELECT id, username FROM users WHERE id = ?1",
            params![id.to_string()],
            from_row,
        )
        .optional()?)
}

pub fn get_by_username(conn: &Connection, username: &str) -> StorageResult<Option<User>> {
    Ok(conn
        .query_row(
            "SELECT id, username FROM users WHERE username = ?1",
            params![username],
            from_row,
        )
        .optional()?)
}
