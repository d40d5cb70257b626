//! Report artifact registry.
//!
//! Generated CSV reports and route maps are registered here keyed by
//! (user, date). The dashboard lists and serves files exclusively through
//! this table, so the association survives renames and nothing is ever
//! inferred from filename patterns.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Result};

use crate::storage::db::now_timestamp;

/// A row of `report_artifacts`, joined with the owner's name.
#[derive(Debug, Clone)]
pub struct ReportArtifact {
    pub id: i64,
    pub user_id: i64,
    pub full_name: String,
    pub report_date: String,
    pub csv_path: Option<String>,
    pub map_path: Option<String>,
    pub generated_at: String,
}

/// Upsert the artifact row for (user, date).
pub fn record_artifact(
    conn: &Connection,
    user_id: i64,
    date: NaiveDate,
    csv_path: Option<&str>,
    map_path: Option<&str>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO report_artifacts (user_id, report_date, csv_path, map_path, generated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(user_id, report_date) DO UPDATE SET
             csv_path = COALESCE(excluded.csv_path, csv_path),
             map_path = COALESCE(excluded.map_path, map_path),
             generated_at = excluded.generated_at",
        params![
            user_id,
            date.format("%Y-%m-%d").to_string(),
            csv_path,
            map_path,
            now_timestamp()
        ],
    )?;
    Ok(())
}

/// Every registered artifact, newest report date first.
pub fn list_artifacts(conn: &Connection) -> Result<Vec<ReportArtifact>> {
    let mut stmt = conn.prepare(
        "SELECT ra.id, ra.user_id, u.full_name, ra.report_date, ra.csv_path, ra.map_path, ra.generated_at
         FROM report_artifacts ra
         JOIN users u ON u.user_id = ra.user_id
         ORDER BY ra.report_date DESC, u.full_name ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(ReportArtifact {
            id: row.get(0)?,
            user_id: row.get(1)?,
            full_name: row.get(2)?,
            report_date: row.get(3)?,
            csv_path: row.get(4)?,
            map_path: row.get(5)?,
            generated_at: row.get(6)?,
        })
    })?;
    rows.collect()
}

/// Resolve a registered file by its bare file name.
///
/// Only paths recorded in the registry can be served; anything else is
/// unknown to the web layer.
pub fn artifact_path_by_file_name(conn: &Connection, file_name: &str) -> Result<Option<String>> {
    let like = format!("%{}", file_name);
    let path: Option<String> = conn
        .query_row(
            "SELECT csv_path FROM report_artifacts WHERE csv_path LIKE ?1 LIMIT 1",
            params![like],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(path) = path {
        if file_name_of(&path) == file_name {
            return Ok(Some(path));
        }
    }

    let path: Option<String> = conn
        .query_row(
            "SELECT map_path FROM report_artifacts WHERE map_path LIKE ?1 LIMIT 1",
            params![like],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(path) = path {
        if file_name_of(&path) == file_name {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

fn file_name_of(path: &str) -> &str {
    std::path::Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::db::{create_test_pool, get_connection, upsert_user};
    use pretty_assertions::assert_eq;

    #[test]
    fn upsert_merges_csv_and_map() {
        let pool = create_test_pool().unwrap();
        let conn = get_connection(&pool).unwrap();
        upsert_user(&conn, 1, "A", None).unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();

        record_artifact(&conn, 1, date, Some("out/report_1_2025-05-01.csv"), None).unwrap();
        record_artifact(&conn, 1, date, None, Some("out/map_A_2025-05-01.html")).unwrap();

        let artifacts = list_artifacts(&conn).unwrap();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].csv_path.as_deref(), Some("out/report_1_2025-05-01.csv"));
        assert_eq!(artifacts[0].map_path.as_deref(), Some("out/map_A_2025-05-01.html"));
    }

    #[test]
    fn lookup_is_registry_only() {
        let pool = create_test_pool().unwrap();
        let conn = get_connection(&pool).unwrap();
        upsert_user(&conn, 1, "A", None).unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        record_artifact(
            &conn,
            1,
            date,
            Some("out/report_1_2025-05-01.csv"),
            Some("out/map_A_2025-05-01.html"),
        )
        .unwrap();

        assert_eq!(
            artifact_path_by_file_name(&conn, "report_1_2025-05-01.csv").unwrap(),
            Some("out/report_1_2025-05-01.csv".to_string())
        );
        assert_eq!(
            artifact_path_by_file_name(&conn, "map_A_2025-05-01.html").unwrap(),
            Some("out/map_A_2025-05-01.html".to_string())
        );
        // Unregistered names resolve to nothing, even if a file existed
        assert_eq!(artifact_path_by_file_name(&conn, "etc/passwd").unwrap(), None);
        assert_eq!(artifact_path_by_file_name(&conn, "01.csv").unwrap(), None);
    }
}
