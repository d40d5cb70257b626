//! Report engine: builds the daily CSV report and route map for one user
//! and registers the artifacts.

pub mod csv;
pub mod map;

use chrono::NaiveDate;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::config;
use crate::core::error::AppResult;
use crate::storage::{artifacts, db, locations, timeoff};

/// Paths of the files produced for one (user, date).
#[derive(Debug, Clone)]
pub struct GeneratedReport {
    pub user_name: String,
    pub csv_path: PathBuf,
    pub map_path: PathBuf,
}

/// Generate the CSV report and route map for a user and date, write them
/// into `REPORTS_DIR` and register both in the artifact table.
///
/// For today's date any open location session is closed first so the
/// report reflects the freshest data.
pub fn generate_for_user(conn: &Connection, user_id: i64, date: NaiveDate) -> AppResult<GeneratedReport> {
    generate_into(conn, user_id, date, Path::new(config::REPORTS_DIR.as_str()))
}

/// Same as [`generate_for_user`] with an explicit output directory.
pub fn generate_into(conn: &Connection, user_id: i64, date: NaiveDate, reports_dir: &Path) -> AppResult<GeneratedReport> {
    let user_name = db::get_user_name(conn, user_id)?.unwrap_or_else(|| format!("User {}", user_id));
    log::info!("Generating report for {} (ID: {}) on {}", user_name, user_id, date);

    if date == config::today_local() {
        for session in locations::active_sessions(conn, user_id, date)? {
            locations::mark_session_ended(conn, user_id, &session, None)?;
            log::info!("Closed active session {} for report of {}", session, user_name);
        }
    }

    let statuses = db::status_history_for_date(conn, user_id, date)?;
    let points = locations::locations_for_date(conn, user_id, date)?;
    let stats = timeoff::timeoff_stats_for_date(conn, user_id, date)?;
    let requests = timeoff::timeoff_requests_for_user(conn, user_id)?;

    let now = config::now_local().naive_local();
    let events = csv::collect_events(date, &statuses, &points, &stats, &requests, now);
    let csv_content = csv::render_csv(user_id, &user_name, &events, now);

    let map_points = map::prepare_points(&points);
    let date_str = date.format("%Y-%m-%d").to_string();
    let map_content = map::render_map(&user_name, &date_str, &map_points);

    fs::create_dir_all(reports_dir)?;

    let csv_path = reports_dir.join(format!("report_{}_{}.csv", user_id, date_str));
    fs::write(&csv_path, csv_content)?;

    let map_path = reports_dir.join(format!("map_{}_{}.html", safe_file_name(&user_name), date_str));
    fs::write(&map_path, map_content)?;

    artifacts::record_artifact(
        conn,
        user_id,
        date,
        csv_path.to_str(),
        map_path.to_str(),
    )?;

    log::info!(
        "Report artifacts written: {} / {}",
        csv_path.display(),
        map_path.display()
    );

    Ok(GeneratedReport {
        user_name,
        csv_path,
        map_path,
    })
}

/// Strip characters that don't belong in a file name.
fn safe_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_whitespace() || c == '/' || c == '\\' { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::db::{create_test_pool, get_connection, upsert_user};

    #[test]
    fn safe_file_name_flattens_separators() {
        assert_eq!(safe_file_name("Иванов Иван"), "Иванов_Иван");
        assert_eq!(safe_file_name("a/b\\c"), "a_b_c");
    }

    #[test]
    fn generates_files_and_registers_artifacts() {
        let dir = tempfile::tempdir().unwrap();

        let pool = create_test_pool().unwrap();
        let conn = get_connection(&pool).unwrap();
        upsert_user(&conn, 5, "Петров Пётр", None).unwrap();
        conn.execute(
            "INSERT INTO status_history (user_id, status, timestamp) VALUES (5, 'office', '2025-05-01 09:00:00')",
            [],
        )
        .unwrap();

        let date = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        let report = generate_into(&conn, 5, date, dir.path()).unwrap();

        assert!(report.csv_path.exists());
        assert!(report.map_path.exists());
        let csv = std::fs::read_to_string(&report.csv_path).unwrap();
        assert!(csv.contains("🏢 В офисе"));

        let registered = crate::storage::artifacts::list_artifacts(&conn).unwrap();
        assert_eq!(registered.len(), 1);
        assert_eq!(registered[0].report_date, "2025-05-01");
    }
}
