//! Location history and live-location session queries.
//!
//! A session groups one day's broadcast: it starts with a `start` row,
//! accumulates `intermediate`/`moving`/`stationary` points and is closed by
//! an `end` row. Session IDs are opaque strings minted here.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension, Result};

use crate::storage::db::{date_bounds, now_timestamp};

/// Point type stored in `location_history.location_type`.
pub mod point_type {
    pub const START: &str = "start";
    pub const INTERMEDIATE: &str = "intermediate";
    pub const MOVING: &str = "moving";
    pub const STATIONARY: &str = "stationary";
    pub const END: &str = "end";
}

/// A row of `location_history`.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationRow {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: String,
    pub session_id: String,
    pub location_type: String,
}

impl LocationRow {
    /// Parsed timestamp; rows are written by us so the format is fixed,
    /// but tolerate fractional seconds from older data.
    pub fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.timestamp)
    }
}

/// Parse the storage timestamp format, with a fractional-seconds fallback.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}

/// Save a location point.
///
/// Without an explicit session the point continues today's open session,
/// or opens a fresh one. Returns the session ID the point landed in.
pub fn save_location(
    conn: &Connection,
    user_id: i64,
    latitude: f64,
    longitude: f64,
    session_id: Option<&str>,
    location_type: &str,
    today: NaiveDate,
) -> Result<String> {
    let session_id = match session_id {
        Some(id) => id.to_string(),
        None => match open_session(conn, user_id, today)? {
            Some(id) => id,
            None => mint_session_id(user_id),
        },
    };

    conn.execute(
        "INSERT INTO location_history (user_id, latitude, longitude, timestamp, session_id, location_type)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![user_id, latitude, longitude, now_timestamp(), session_id, location_type],
    )?;

    Ok(session_id)
}

fn mint_session_id(user_id: i64) -> String {
    format!("session_{}_{}", user_id, chrono::Utc::now().timestamp())
}

/// Most recent session from the date that has no `end` row yet.
fn open_session(conn: &Connection, user_id: i64, date: NaiveDate) -> Result<Option<String>> {
    let (start, end) = date_bounds(date);
    conn.query_row(
        "SELECT session_id FROM location_history
         WHERE user_id = ?1 AND timestamp BETWEEN ?2 AND ?3
         GROUP BY session_id
         HAVING SUM(location_type = 'end') = 0
         ORDER BY MAX(timestamp) DESC
         LIMIT 1",
        params![user_id, start, end],
        |row| row.get(0),
    )
    .optional()
}

/// All open sessions for the date, newest first.
pub fn active_sessions(conn: &Connection, user_id: i64, date: NaiveDate) -> Result<Vec<String>> {
    let (start, end) = date_bounds(date);
    let mut stmt = conn.prepare(
        "SELECT session_id FROM location_history
         WHERE user_id = ?1 AND timestamp BETWEEN ?2 AND ?3
         GROUP BY session_id
         HAVING SUM(location_type = 'end') = 0
         ORDER BY MAX(timestamp) DESC",
    )?;
    let rows = stmt.query_map(params![user_id, start, end], |row| row.get(0))?;
    rows.collect()
}

/// Close a session.
///
/// With a final coordinate an `end` point is appended; otherwise the most
/// recent point of the session is retyped to `end`.
pub fn mark_session_ended(
    conn: &Connection,
    user_id: i64,
    session_id: &str,
    final_point: Option<(f64, f64)>,
) -> Result<()> {
    match final_point {
        Some((lat, lon)) => {
            conn.execute(
                "INSERT INTO location_history (user_id, latitude, longitude, timestamp, session_id, location_type)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'end')",
                params![user_id, lat, lon, now_timestamp(), session_id],
            )?;
        }
        None => {
            let updated = conn.execute(
                "UPDATE location_history SET location_type = 'end'
                 WHERE id = (
                     SELECT id FROM location_history
                     WHERE user_id = ?1 AND session_id = ?2
                     ORDER BY timestamp DESC LIMIT 1
                 )",
                params![user_id, session_id],
            )?;
            if updated == 0 {
                log::warn!("No locations found for session {} of user {}", session_id, user_id);
            }
        }
    }
    Ok(())
}

/// Every point of one local date, oldest first.
pub fn locations_for_date(conn: &Connection, user_id: i64, date: NaiveDate) -> Result<Vec<LocationRow>> {
    let (start, end) = date_bounds(date);
    let mut stmt = conn.prepare(
        "SELECT latitude, longitude, timestamp, session_id, location_type
         FROM location_history
         WHERE user_id = ?1 AND timestamp BETWEEN ?2 AND ?3
         ORDER BY timestamp ASC",
    )?;
    let rows = stmt.query_map(params![user_id, start, end], |row| {
        Ok(LocationRow {
            latitude: row.get(0)?,
            longitude: row.get(1)?,
            timestamp: row.get(2)?,
            session_id: row.get(3)?,
            location_type: row.get(4)?,
        })
    })?;
    rows.collect()
}

/// Points newer than the cutoff timestamp, oldest first.
pub fn locations_since(conn: &Connection, user_id: i64, cutoff: &str) -> Result<Vec<LocationRow>> {
    let mut stmt = conn.prepare(
        "SELECT latitude, longitude, timestamp, session_id, location_type
         FROM location_history
         WHERE user_id = ?1 AND timestamp > ?2
         ORDER BY timestamp ASC",
    )?;
    let rows = stmt.query_map(params![user_id, cutoff], |row| {
        Ok(LocationRow {
            latitude: row.get(0)?,
            longitude: row.get(1)?,
            timestamp: row.get(2)?,
            session_id: row.get(3)?,
            location_type: row.get(4)?,
        })
    })?;
    rows.collect()
}

/// Most recent point regardless of date.
pub fn latest_location(conn: &Connection, user_id: i64) -> Result<Option<LocationRow>> {
    conn.query_row(
        "SELECT latitude, longitude, timestamp, session_id, location_type
         FROM location_history
         WHERE user_id = ?1
         ORDER BY timestamp DESC LIMIT 1",
        params![user_id],
        |row| {
            Ok(LocationRow {
                latitude: row.get(0)?,
                longitude: row.get(1)?,
                timestamp: row.get(2)?,
                session_id: row.get(3)?,
                location_type: row.get(4)?,
            })
        },
    )
    .optional()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::db::{create_test_pool, get_connection, upsert_user};
    use pretty_assertions::assert_eq;

    fn setup() -> (crate::storage::db::DbPool, NaiveDate) {
        let pool = create_test_pool().unwrap();
        let conn = get_connection(&pool).unwrap();
        upsert_user(&conn, 1, "A", None).unwrap();
        (pool, crate::core::config::today_local())
    }

    #[test]
    fn first_point_opens_a_session_and_later_points_join_it() {
        let (pool, today) = setup();
        let conn = get_connection(&pool).unwrap();

        let s1 = save_location(&conn, 1, 55.75, 37.61, None, point_type::START, today).unwrap();
        let s2 = save_location(&conn, 1, 55.76, 37.62, None, point_type::INTERMEDIATE, today).unwrap();
        assert_eq!(s1, s2);

        let sessions = active_sessions(&conn, 1, today).unwrap();
        assert_eq!(sessions, vec![s1.clone()]);

        mark_session_ended(&conn, 1, &s1, None).unwrap();
        assert!(active_sessions(&conn, 1, today).unwrap().is_empty());

        // A new point after the end opens a different session
        let s3 = save_location(&conn, 1, 55.77, 37.63, None, point_type::START, today).unwrap();
        assert_ne!(s1, s3);
    }

    #[test]
    fn ending_with_final_point_appends_an_end_row() {
        let (pool, today) = setup();
        let conn = get_connection(&pool).unwrap();

        let session = save_location(&conn, 1, 55.75, 37.61, None, point_type::START, today).unwrap();
        mark_session_ended(&conn, 1, &session, Some((55.80, 37.70))).unwrap();

        let points = locations_for_date(&conn, 1, today).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points.last().unwrap().location_type, point_type::END);
        assert_eq!(points.last().unwrap().latitude, 55.80);
    }

    #[test]
    fn locations_are_scoped_to_their_date() {
        let (pool, today) = setup();
        let conn = get_connection(&pool).unwrap();

        conn.execute(
            "INSERT INTO location_history (user_id, latitude, longitude, timestamp, session_id, location_type)
             VALUES (1, 55.0, 37.0, '2020-01-01 10:00:00', 's-old', 'start')",
            [],
        )
        .unwrap();
        save_location(&conn, 1, 55.75, 37.61, None, point_type::START, today).unwrap();

        let todays = locations_for_date(&conn, 1, today).unwrap();
        assert_eq!(todays.len(), 1);
        assert_eq!(todays[0].latitude, 55.75);

        let old = locations_for_date(&conn, 1, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()).unwrap();
        assert_eq!(old.len(), 1);
        assert_eq!(old[0].session_id, "s-old");
    }

    #[test]
    fn timestamp_parsing_tolerates_fractional_seconds() {
        assert!(parse_timestamp("2025-05-01 10:00:00").is_some());
        assert!(parse_timestamp("2025-05-01 10:00:00.123456").is_some());
        assert!(parse_timestamp("not a time").is_none());
    }
}
