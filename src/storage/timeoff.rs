//! Time-off request storage.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Result};

use crate::storage::db::{date_bounds, now_timestamp};

/// Request state stored in `timeoff_requests.status`.
pub mod request_status {
    pub const PENDING: &str = "pending";
    pub const APPROVED: &str = "approved";
    pub const REJECTED: &str = "rejected";
}

/// A row of `timeoff_requests`.
#[derive(Debug, Clone)]
pub struct TimeoffRequest {
    pub id: i64,
    pub user_id: i64,
    pub username: Option<String>,
    pub reason: String,
    pub status: String,
    pub request_time: String,
    pub response_time: Option<String>,
}

/// Aggregated counts over a period.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeoffStats {
    pub total: i64,
    pub approved: i64,
    pub rejected: i64,
    pub pending: i64,
}

/// Create a pending request, returning its ID.
pub fn create_timeoff_request(conn: &Connection, user_id: i64, username: Option<&str>, reason: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO timeoff_requests (user_id, username, reason, status, request_time)
         VALUES (?1, ?2, ?3, 'pending', ?4)",
        params![user_id, username, reason, now_timestamp()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// All pending requests, oldest first.
pub fn pending_timeoff_requests(conn: &Connection) -> Result<Vec<TimeoffRequest>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, username, reason, status, request_time, response_time
         FROM timeoff_requests
         WHERE status = 'pending'
         ORDER BY request_time ASC",
    )?;
    let rows = stmt.query_map([], map_request)?;
    rows.collect()
}

/// Every request of one user, newest first.
pub fn timeoff_requests_for_user(conn: &Connection, user_id: i64) -> Result<Vec<TimeoffRequest>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, username, reason, status, request_time, response_time
         FROM timeoff_requests
         WHERE user_id = ?1
         ORDER BY request_time DESC",
    )?;
    let rows = stmt.query_map(params![user_id], map_request)?;
    rows.collect()
}

fn map_request(row: &rusqlite::Row<'_>) -> Result<TimeoffRequest> {
    Ok(TimeoffRequest {
        id: row.get(0)?,
        user_id: row.get(1)?,
        username: row.get(2)?,
        reason: row.get(3)?,
        status: row.get(4)?,
        request_time: row.get(5)?,
        response_time: row.get(6)?,
    })
}

/// Counts for the last `days` days (days == 0 means all time).
pub fn timeoff_stats(conn: &Connection, user_id: i64, days: i64) -> Result<TimeoffStats> {
    let mut sql = String::from("SELECT status, COUNT(*) FROM timeoff_requests WHERE user_id = ?1");
    let cutoff;
    let mut params_vec: Vec<&dyn rusqlite::ToSql> = vec![&user_id];
    if days > 0 {
        cutoff = (crate::core::config::now_local() - chrono::Duration::days(days))
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        sql.push_str(" AND request_time >= ?2");
        params_vec.push(&cutoff);
    }
    sql.push_str(" GROUP BY status");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_vec.as_slice(), |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;

    let mut stats = TimeoffStats::default();
    for row in rows {
        let (status, count) = row?;
        match status.as_str() {
            request_status::APPROVED => stats.approved = count,
            request_status::REJECTED => stats.rejected = count,
            request_status::PENDING => stats.pending = count,
            _ => {}
        }
        stats.total += count;
    }
    Ok(stats)
}

/// Counts for one local date.
pub fn timeoff_stats_for_date(conn: &Connection, user_id: i64, date: NaiveDate) -> Result<TimeoffStats> {
    let (start, end) = date_bounds(date);
    let mut stmt = conn.prepare(
        "SELECT status, COUNT(*) FROM timeoff_requests
         WHERE user_id = ?1 AND request_time BETWEEN ?2 AND ?3
         GROUP BY status",
    )?;
    let rows = stmt.query_map(params![user_id, start, end], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;

    let mut stats = TimeoffStats::default();
    for row in rows {
        let (status, count) = row?;
        match status.as_str() {
            request_status::APPROVED => stats.approved = count,
            request_status::REJECTED => stats.rejected = count,
            request_status::PENDING => stats.pending = count,
            _ => {}
        }
        stats.total += count;
    }
    Ok(stats)
}

/// Resolve a pending request. Returns the requester (user_id, username)
/// or None when the request doesn't exist.
pub fn resolve_timeoff_request(
    conn: &Connection,
    request_id: i64,
    status: &str,
    admin_id: i64,
) -> Result<Option<(i64, Option<String>)>> {
    let requester: Option<(i64, Option<String>)> = conn
        .query_row(
            "SELECT user_id, username FROM timeoff_requests WHERE id = ?1",
            params![request_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let Some(requester) = requester else {
        return Ok(None);
    };

    conn.execute(
        "UPDATE timeoff_requests SET status = ?1, admin_id = ?2, response_time = ?3 WHERE id = ?4",
        params![status, admin_id, now_timestamp(), request_id],
    )?;

    Ok(Some(requester))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::db::{create_test_pool, get_connection, upsert_user};
    use pretty_assertions::assert_eq;

    #[test]
    fn request_lifecycle() {
        let pool = create_test_pool().unwrap();
        let conn = get_connection(&pool).unwrap();
        upsert_user(&conn, 1, "A", None).unwrap();

        let id = create_timeoff_request(&conn, 1, Some("worker"), "к врачу").unwrap();
        let pending = pending_timeoff_requests(&conn).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].reason, "к врачу");

        let requester = resolve_timeoff_request(&conn, id, request_status::APPROVED, 99)
            .unwrap()
            .unwrap();
        assert_eq!(requester.0, 1);

        assert!(pending_timeoff_requests(&conn).unwrap().is_empty());
        let mine = timeoff_requests_for_user(&conn, 1).unwrap();
        assert_eq!(mine[0].status, request_status::APPROVED);
        assert!(mine[0].response_time.is_some());
    }

    #[test]
    fn resolving_missing_request_returns_none() {
        let pool = create_test_pool().unwrap();
        let conn = get_connection(&pool).unwrap();
        assert!(resolve_timeoff_request(&conn, 123, request_status::REJECTED, 1)
            .unwrap()
            .is_none());
    }

    #[test]
    fn stats_count_by_status() {
        let pool = create_test_pool().unwrap();
        let conn = get_connection(&pool).unwrap();
        upsert_user(&conn, 1, "A", None).unwrap();

        let a = create_timeoff_request(&conn, 1, None, "r1").unwrap();
        let b = create_timeoff_request(&conn, 1, None, "r2").unwrap();
        create_timeoff_request(&conn, 1, None, "r3").unwrap();
        resolve_timeoff_request(&conn, a, request_status::APPROVED, 9).unwrap();
        resolve_timeoff_request(&conn, b, request_status::REJECTED, 9).unwrap();

        let stats = timeoff_stats(&conn, 1, 30).unwrap();
        assert_eq!(
            stats,
            TimeoffStats {
                total: 3,
                approved: 1,
                rejected: 1,
                pending: 1
            }
        );

        // All-time query sees the same rows
        let all_time = timeoff_stats(&conn, 1, 0).unwrap();
        assert_eq!(all_time.total, 3);
    }
}
