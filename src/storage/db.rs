//! Connection pool and user/morning-check/night-shift queries.

use chrono::NaiveDate;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, Result};

use crate::core::config;
use crate::storage::migrations::run_migrations;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// A row of the `users` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Telegram numeric ID, primary key
    pub user_id: i64,
    /// Display name shown in reports and the dashboard
    pub full_name: String,
    /// Admin flag (union with the environment admin set)
    pub is_admin: bool,
}

/// Latest-status join used by the dashboard and daily sweep.
#[derive(Debug, Clone)]
pub struct UserStatusRow {
    pub user_id: i64,
    pub full_name: String,
    pub status: Option<String>,
    pub timestamp: Option<String>,
}

/// Morning-check row joined with the user name.
#[derive(Debug, Clone)]
pub struct MorningCheckRow {
    pub user_id: i64,
    pub full_name: String,
    pub notified: bool,
    pub admin_notified: bool,
}

/// Create a new database connection pool
///
/// Initializes a pool with up to 10 connections and runs schema
/// migrations on the first connection.
pub fn create_pool(database_path: &str) -> anyhow::Result<DbPool> {
    let manager = SqliteConnectionManager::file(database_path);
    let pool = Pool::builder().max_size(10).build(manager)?;

    let mut conn = pool.get()?;
    run_migrations(&mut conn)?;

    Ok(pool)
}

/// In-memory pool for tests.
pub fn create_test_pool() -> anyhow::Result<DbPool> {
    let manager = SqliteConnectionManager::memory();
    // A single connection keeps every checkout on the same in-memory DB
    let pool = Pool::builder().max_size(1).build(manager)?;

    let mut conn = pool.get()?;
    run_migrations(&mut conn)?;

    Ok(pool)
}

/// Get a connection from the pool
pub fn get_connection(pool: &DbPool) -> Result<DbConnection, r2d2::Error> {
    pool.get()
}

/// Timestamp string in the configured timezone, the storage format for
/// every table.
pub fn now_timestamp() -> String {
    config::now_local().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// (start, end) bounds covering one local date.
pub fn date_bounds(date: NaiveDate) -> (String, String) {
    (
        format!("{} 00:00:00", date.format("%Y-%m-%d")),
        format!("{} 23:59:59", date.format("%Y-%m-%d")),
    )
}

// ---------------------------------------------------------------------------
// Users

/// Insert a user or update the name (and optionally the admin flag) of an
/// existing one.
pub fn upsert_user(conn: &Connection, user_id: i64, full_name: &str, is_admin: Option<bool>) -> Result<()> {
    let existing: Option<bool> = conn
        .query_row("SELECT is_admin FROM users WHERE user_id = ?1", params![user_id], |row| {
            row.get(0)
        })
        .optional()?;

    match existing {
        Some(_) => match is_admin {
            Some(flag) => {
                conn.execute(
                    "UPDATE users SET full_name = ?1, is_admin = ?2 WHERE user_id = ?3",
                    params![full_name, flag, user_id],
                )?;
            }
            None => {
                conn.execute(
                    "UPDATE users SET full_name = ?1 WHERE user_id = ?2",
                    params![full_name, user_id],
                )?;
            }
        },
        None => {
            conn.execute(
                "INSERT INTO users (user_id, full_name, is_admin, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![user_id, full_name, is_admin.unwrap_or(false), now_timestamp()],
            )?;
        }
    }
    Ok(())
}

/// Full name for a user ID, if registered.
pub fn get_user_name(conn: &Connection, user_id: i64) -> Result<Option<String>> {
    conn.query_row(
        "SELECT full_name FROM users WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )
    .optional()
}

/// Single user record, if registered.
pub fn get_user(conn: &Connection, user_id: i64) -> Result<Option<UserRecord>> {
    conn.query_row(
        "SELECT user_id, full_name, is_admin FROM users WHERE user_id = ?1",
        params![user_id],
        |row| {
            Ok(UserRecord {
                user_id: row.get(0)?,
                full_name: row.get(1)?,
                is_admin: row.get(2)?,
            })
        },
    )
    .optional()
}

/// All users ordered by name.
pub fn get_all_users(conn: &Connection) -> Result<Vec<UserRecord>> {
    let mut stmt = conn.prepare("SELECT user_id, full_name, is_admin FROM users ORDER BY full_name")?;
    let rows = stmt.query_map([], |row| {
        Ok(UserRecord {
            user_id: row.get(0)?,
            full_name: row.get(1)?,
            is_admin: row.get(2)?,
        })
    })?;
    rows.collect()
}

/// Toggle the stored admin flag. Returns false for unknown users.
pub fn set_admin_flag(conn: &Connection, user_id: i64, is_admin: bool) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE users SET is_admin = ?1 WHERE user_id = ?2",
        params![is_admin, user_id],
    )?;
    Ok(updated > 0)
}

/// Delete a user and every row that references them, in one transaction.
pub fn delete_user(conn: &mut Connection, user_id: i64) -> Result<bool> {
    let tx = conn.transaction()?;

    let exists: Option<i64> = tx
        .query_row("SELECT 1 FROM users WHERE user_id = ?1", params![user_id], |row| {
            row.get(0)
        })
        .optional()?;
    if exists.is_none() {
        return Ok(false);
    }

    for table in [
        "status_history",
        "location_history",
        "morning_checks",
        "night_shifts",
        "timeoff_requests",
        "report_artifacts",
    ] {
        tx.execute(&format!("DELETE FROM {} WHERE user_id = ?1", table), params![user_id])?;
    }
    tx.execute("DELETE FROM users WHERE user_id = ?1", params![user_id])?;

    tx.commit()?;
    Ok(true)
}

/// True when the user carries the admin flag in the database or is listed
/// in the environment admin set.
pub fn is_admin(conn: &Connection, user_id: i64) -> bool {
    if config::admin::is_env_admin(user_id) {
        return true;
    }
    matches!(get_user(conn, user_id), Ok(Some(user)) if user.is_admin)
}

// ---------------------------------------------------------------------------
// Status history

/// Record a status change.
pub fn save_status(conn: &Connection, user_id: i64, status_key: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO status_history (user_id, status, timestamp) VALUES (?1, ?2, ?3)",
        params![user_id, status_key, now_timestamp()],
    )?;
    Ok(())
}

/// (status, timestamp) pairs for one local date, oldest first.
pub fn status_history_for_date(conn: &Connection, user_id: i64, date: NaiveDate) -> Result<Vec<(String, String)>> {
    let (start, end) = date_bounds(date);
    let mut stmt = conn.prepare(
        "SELECT status, timestamp FROM status_history
         WHERE user_id = ?1 AND timestamp BETWEEN ?2 AND ?3
         ORDER BY timestamp ASC",
    )?;
    let rows = stmt.query_map(params![user_id, start, end], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}

/// Latest recorded status, if any.
pub fn latest_status(conn: &Connection, user_id: i64) -> Result<Option<(String, String)>> {
    conn.query_row(
        "SELECT status, timestamp FROM status_history
         WHERE user_id = ?1 ORDER BY timestamp DESC LIMIT 1",
        params![user_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()
}

/// Every user joined with their latest status, ordered by name.
pub fn all_users_with_latest_status(conn: &Connection) -> Result<Vec<UserStatusRow>> {
    let mut stmt = conn.prepare(
        "SELECT u.user_id, u.full_name, sh.status, sh.timestamp
         FROM users u
         LEFT JOIN (
             SELECT user_id, status, timestamp,
                    ROW_NUMBER() OVER (PARTITION BY user_id ORDER BY timestamp DESC) AS rn
             FROM status_history
         ) sh ON u.user_id = sh.user_id AND sh.rn = 1
         ORDER BY u.full_name",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(UserStatusRow {
            user_id: row.get(0)?,
            full_name: row.get(1)?,
            status: row.get(2)?,
            timestamp: row.get(3)?,
        })
    })?;
    rows.collect()
}

// ---------------------------------------------------------------------------
// Morning checks

/// Make sure every registered user has a morning-check row for the date.
pub fn ensure_morning_rows(conn: &Connection, date: NaiveDate) -> Result<()> {
    let date = date.format("%Y-%m-%d").to_string();
    conn.execute(
        "INSERT OR IGNORE INTO morning_checks (user_id, check_date, checked_in)
         SELECT user_id, ?1, 0 FROM users",
        params![date],
    )?;
    Ok(())
}

/// Users without a check-in for the date (rows are created on demand).
pub fn unchecked_users(conn: &Connection, date: NaiveDate) -> Result<Vec<MorningCheckRow>> {
    ensure_morning_rows(conn, date)?;

    let date = date.format("%Y-%m-%d").to_string();
    let mut stmt = conn.prepare(
        "SELECT mc.user_id, u.full_name, mc.notified, mc.admin_notified
         FROM morning_checks mc
         JOIN users u ON mc.user_id = u.user_id
         WHERE mc.check_date = ?1 AND mc.checked_in = 0
         ORDER BY u.full_name",
    )?;
    let rows = stmt.query_map(params![date], |row| {
        Ok(MorningCheckRow {
            user_id: row.get(0)?,
            full_name: row.get(1)?,
            notified: row.get(2)?,
            admin_notified: row.get(3)?,
        })
    })?;
    rows.collect()
}

/// Mark a user as checked in for the date.
pub fn set_checked_in(conn: &Connection, user_id: i64, date: NaiveDate) -> Result<()> {
    let date = date.format("%Y-%m-%d").to_string();
    let updated = conn.execute(
        "UPDATE morning_checks SET checked_in = 1 WHERE user_id = ?1 AND check_date = ?2",
        params![user_id, date],
    )?;
    if updated == 0 {
        conn.execute(
            "INSERT OR IGNORE INTO morning_checks (user_id, check_date, checked_in) VALUES (?1, ?2, 1)",
            params![user_id, date],
        )?;
    }
    Ok(())
}

/// Record that reminder/admin notifications went out for the date.
pub fn set_morning_notified(conn: &Connection, user_id: i64, date: NaiveDate) -> Result<()> {
    let date = date.format("%Y-%m-%d").to_string();
    let updated = conn.execute(
        "UPDATE morning_checks SET notified = 1, admin_notified = 1 WHERE user_id = ?1 AND check_date = ?2",
        params![user_id, date],
    )?;
    if updated == 0 {
        conn.execute(
            "INSERT OR IGNORE INTO morning_checks (user_id, check_date, checked_in, notified, admin_notified)
             VALUES (?1, ?2, 0, 1, 1)",
            params![user_id, date],
        )?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Night shifts

/// Register a night shift covering [start, end] (inclusive dates).
pub fn add_night_shift(conn: &Connection, user_id: i64, start: NaiveDate, end: NaiveDate) -> Result<()> {
    conn.execute(
        "INSERT INTO night_shifts (user_id, start_date, end_date) VALUES (?1, ?2, ?3)",
        params![
            user_id,
            start.format("%Y-%m-%d").to_string(),
            end.format("%Y-%m-%d").to_string()
        ],
    )?;
    Ok(())
}

/// True when the date falls inside any registered shift for the user.
pub fn in_night_shift(conn: &Connection, user_id: i64, date: NaiveDate) -> Result<bool> {
    let date = date.format("%Y-%m-%d").to_string();
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM night_shifts WHERE user_id = ?1 AND start_date <= ?2 AND end_date >= ?2",
        params![user_id, date],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn test_conn() -> DbPool {
        create_test_pool().unwrap()
    }

    #[test]
    fn upsert_creates_then_updates() {
        let pool = test_conn();
        let conn = get_connection(&pool).unwrap();

        upsert_user(&conn, 42, "Иванов Иван", None).unwrap();
        let user = get_user(&conn, 42).unwrap().unwrap();
        assert_eq!(user.full_name, "Иванов Иван");
        assert!(!user.is_admin);

        // Name update keeps the admin flag untouched
        set_admin_flag(&conn, 42, true).unwrap();
        upsert_user(&conn, 42, "Иванов И.И.", None).unwrap();
        let user = get_user(&conn, 42).unwrap().unwrap();
        assert_eq!(user.full_name, "Иванов И.И.");
        assert!(user.is_admin);

        // Explicit flag wins
        upsert_user(&conn, 42, "Иванов И.И.", Some(false)).unwrap();
        assert!(!get_user(&conn, 42).unwrap().unwrap().is_admin);
    }

    #[test]
    fn delete_user_removes_dependent_rows() {
        let pool = test_conn();
        let mut conn = get_connection(&pool).unwrap();

        upsert_user(&conn, 1, "A", None).unwrap();
        save_status(&conn, 1, "office").unwrap();
        add_night_shift(
            &conn,
            1,
            NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 5, 2).unwrap(),
        )
        .unwrap();

        assert!(delete_user(&mut conn, 1).unwrap());
        assert!(get_user(&conn, 1).unwrap().is_none());
        let statuses: i64 = conn
            .query_row("SELECT COUNT(*) FROM status_history WHERE user_id = 1", [], |r| r.get(0))
            .unwrap();
        assert_eq!(statuses, 0);

        // Deleting again reports "not found"
        assert!(!delete_user(&mut conn, 1).unwrap());
    }

    #[test]
    fn latest_status_wins() {
        let pool = test_conn();
        let conn = get_connection(&pool).unwrap();

        upsert_user(&conn, 7, "B", None).unwrap();
        conn.execute(
            "INSERT INTO status_history (user_id, status, timestamp) VALUES (7, 'office', '2025-05-01 09:00:00')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO status_history (user_id, status, timestamp) VALUES (7, 'home', '2025-05-01 18:00:00')",
            [],
        )
        .unwrap();

        let (status, _) = latest_status(&conn, 7).unwrap().unwrap();
        assert_eq!(status, "home");

        let rows = all_users_with_latest_status(&conn).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status.as_deref(), Some("home"));
    }

    #[test]
    fn morning_check_lifecycle() {
        let pool = test_conn();
        let conn = get_connection(&pool).unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 5, 5).unwrap();

        upsert_user(&conn, 1, "A", None).unwrap();
        upsert_user(&conn, 2, "B", None).unwrap();

        let unchecked = unchecked_users(&conn, date).unwrap();
        assert_eq!(unchecked.len(), 2);

        set_checked_in(&conn, 1, date).unwrap();
        let unchecked = unchecked_users(&conn, date).unwrap();
        assert_eq!(unchecked.len(), 1);
        assert_eq!(unchecked[0].user_id, 2);
        assert!(!unchecked[0].notified);

        set_morning_notified(&conn, 2, date).unwrap();
        let unchecked = unchecked_users(&conn, date).unwrap();
        assert!(unchecked[0].notified && unchecked[0].admin_notified);
    }

    #[test]
    fn night_shift_covers_range_inclusive() {
        let pool = test_conn();
        let conn = get_connection(&pool).unwrap();
        upsert_user(&conn, 1, "A", None).unwrap();

        let start = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 5, 2).unwrap();
        add_night_shift(&conn, 1, start, end).unwrap();

        assert!(in_night_shift(&conn, 1, start).unwrap());
        assert!(in_night_shift(&conn, 1, end).unwrap());
        assert!(!in_night_shift(&conn, 1, NaiveDate::from_ymd_opt(2025, 5, 3).unwrap()).unwrap());
    }
}
