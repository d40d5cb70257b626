//! End-to-end report generation: database rows in, CSV + map files out,
//! artifacts registered and resolvable the way the dashboard serves them.
//!
//! Run with: cargo test --test report_integration_test

mod common;

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use worktrack::report;
use worktrack::storage::artifacts;
use worktrack::storage::get_connection;

#[test]
fn full_day_report_contains_all_event_kinds() {
    let pool = common::test_pool();
    common::seed_users(&pool);
    let date = NaiveDate::from_ymd_opt(2025, 5, 5).unwrap();
    let dir = tempfile::tempdir().unwrap();

    let conn = get_connection(&pool).unwrap();
    common::insert_status_at(&conn, 100, "office", "2025-05-05 08:35:00");
    common::insert_status_at(&conn, 100, "home", "2025-05-05 18:00:00");
    common::insert_location_at(&conn, 100, 55.7558, 37.6173, "2025-05-05 08:36:00", "s-1", "start");
    common::insert_location_at(&conn, 100, 55.7570, 37.6180, "2025-05-05 12:00:00", "s-1", "stationary");
    common::insert_location_at(&conn, 100, 55.7590, 37.6200, "2025-05-05 17:55:00", "s-1", "end");
    let generated = report::generate_into(&conn, 100, date, dir.path()).unwrap();

    assert_eq!(generated.user_name, "Иванов Иван");

    let csv = std::fs::read_to_string(&generated.csv_path).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    // Header + 2 statuses + 3 locations
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[0], "ID,ФИО,Пользователь,Тип события,Значение,Время");
    // Chronological: first data row is the morning status
    assert!(lines[1].contains("🏢 В офисе"));
    assert!(lines[2].contains("Начало трансляции"));
    assert!(csv.contains("55.755800,37.617300"));
    assert!(lines[5].contains("🏠 Домой"));

    let map = std::fs::read_to_string(&generated.map_path).unwrap();
    assert!(map.contains("L.polyline"));
    assert!(map.contains("НАЧАЛО"));
    assert!(map.contains("ОСТАНОВКА"));
    assert!(map.contains("КОНЕЦ"));
}

#[test]
fn empty_day_still_produces_both_artifacts() {
    let pool = common::test_pool();
    common::seed_users(&pool);
    let date = NaiveDate::from_ymd_opt(2025, 5, 6).unwrap();
    let dir = tempfile::tempdir().unwrap();

    let conn = get_connection(&pool).unwrap();
    let generated = report::generate_into(&conn, 200, date, dir.path()).unwrap();

    let csv = std::fs::read_to_string(&generated.csv_path).unwrap();
    assert!(csv.contains("Нет данных о местоположении и статусах"));

    let map = std::fs::read_to_string(&generated.map_path).unwrap();
    assert!(map.contains("Нет данных о местоположении"));
}

#[test]
fn artifacts_resolve_by_file_name_only_when_registered() {
    let pool = common::test_pool();
    common::seed_users(&pool);
    let date = NaiveDate::from_ymd_opt(2025, 5, 5).unwrap();
    let dir = tempfile::tempdir().unwrap();

    let conn = get_connection(&pool).unwrap();
    let generated = report::generate_into(&conn, 100, date, dir.path()).unwrap();

    let csv_name = generated.csv_path.file_name().unwrap().to_str().unwrap();
    let resolved = artifacts::artifact_path_by_file_name(&conn, csv_name).unwrap();
    assert_eq!(resolved.as_deref(), generated.csv_path.to_str());

    // The registry answers only for registered names
    assert!(artifacts::artifact_path_by_file_name(&conn, "report_999_2025-05-05.csv")
        .unwrap()
        .is_none());
}

#[test]
fn regeneration_updates_the_same_artifact_row() {
    let pool = common::test_pool();
    common::seed_users(&pool);
    let date = NaiveDate::from_ymd_opt(2025, 5, 5).unwrap();
    let dir = tempfile::tempdir().unwrap();

    let conn = get_connection(&pool).unwrap();
    report::generate_into(&conn, 100, date, dir.path()).unwrap();
    report::generate_into(&conn, 100, date, dir.path()).unwrap();

    let registered = artifacts::list_artifacts(&conn).unwrap();
    assert_eq!(registered.len(), 1);
    assert_eq!(registered[0].report_date, "2025-05-05");
}
