//! Shared fixtures for integration tests.
//!
//! The in-memory pool holds a single connection (every checkout must see
//! the same database), so helpers take the connection instead of the pool
//! — never check out a second connection while holding one.

#![allow(dead_code)]

use rusqlite::Connection;
use worktrack::storage::db::{self, DbPool};
use worktrack::storage::get_connection;

/// Fresh in-memory database with the full schema applied.
pub fn test_pool() -> DbPool {
    db::create_test_pool().expect("in-memory pool")
}

/// Seed a handful of users: two workers and one admin.
pub fn seed_users(pool: &DbPool) {
    let conn = get_connection(pool).expect("connection");
    db::upsert_user(&conn, 100, "Иванов Иван", None).expect("user 100");
    db::upsert_user(&conn, 200, "Петров Пётр", None).expect("user 200");
    db::upsert_user(&conn, 900, "Админ Админов", Some(true)).expect("user 900");
}

/// Insert a status row with an explicit timestamp.
pub fn insert_status_at(conn: &Connection, user_id: i64, status: &str, timestamp: &str) {
    conn.execute(
        "INSERT INTO status_history (user_id, status, timestamp) VALUES (?1, ?2, ?3)",
        rusqlite::params![user_id, status, timestamp],
    )
    .expect("insert status");
}

/// Insert a location row with an explicit timestamp.
pub fn insert_location_at(
    conn: &Connection,
    user_id: i64,
    lat: f64,
    lon: f64,
    timestamp: &str,
    session_id: &str,
    location_type: &str,
) {
    conn.execute(
        "INSERT INTO location_history (user_id, latitude, longitude, timestamp, session_id, location_type)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![user_id, lat, lon, timestamp, session_id, location_type],
    )
    .expect("insert location");
}
