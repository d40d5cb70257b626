//! Integration tests for the storage layer as the bot uses it:
//! a worker's day from first status to the evening report rows.
//!
//! Run with: cargo test --test storage_integration_test

mod common;

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use worktrack::storage::db;
use worktrack::storage::get_connection;
use worktrack::storage::locations;
use worktrack::storage::timeoff::{self, request_status};

#[test]
fn workday_flow_statuses_and_sessions() {
    let pool = common::test_pool();
    common::seed_users(&pool);
    let date = NaiveDate::from_ymd_opt(2025, 5, 5).unwrap();

    let conn = get_connection(&pool).unwrap();

    // Morning: office status + a tracking session with explicit timestamps
    common::insert_status_at(&conn, 100, "office", "2025-05-05 08:35:00");
    common::insert_location_at(&conn, 100, 55.7558, 37.6173, "2025-05-05 08:36:00", "s-1", "start");
    common::insert_location_at(&conn, 100, 55.7570, 37.6180, "2025-05-05 09:10:00", "s-1", "moving");

    // The session is open until something ends it
    assert_eq!(
        locations::active_sessions(&conn, 100, date).unwrap(),
        vec!["s-1".to_string()]
    );

    // Evening: home button ends the session
    locations::mark_session_ended(&conn, 100, "s-1", None).unwrap();
    common::insert_status_at(&conn, 100, "home", "2025-05-05 18:00:00");

    assert!(locations::active_sessions(&conn, 100, date).unwrap().is_empty());

    // The day's rows come back in order
    let statuses = db::status_history_for_date(&conn, 100, date).unwrap();
    assert_eq!(statuses.len(), 2);
    assert_eq!(statuses[0].0, "office");
    assert_eq!(statuses[1].0, "home");

    let points = locations::locations_for_date(&conn, 100, date).unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points.last().unwrap().location_type, "end");

    // Other users are untouched
    assert!(db::status_history_for_date(&conn, 200, date).unwrap().is_empty());
}

#[test]
fn morning_check_exemptions_follow_statuses() {
    let pool = common::test_pool();
    common::seed_users(&pool);
    let date = NaiveDate::from_ymd_opt(2025, 5, 5).unwrap();

    let conn = get_connection(&pool).unwrap();

    // All three users start unchecked
    let unchecked = db::unchecked_users(&conn, date).unwrap();
    assert_eq!(unchecked.len(), 3);

    // A status press marks the user as checked in
    db::set_checked_in(&conn, 100, date).unwrap();
    let unchecked = db::unchecked_users(&conn, date).unwrap();
    assert_eq!(unchecked.len(), 2);
    assert!(unchecked.iter().all(|row| row.user_id != 100));

    // Night shift covers today and tomorrow
    db::add_night_shift(&conn, 200, date, date.succ_opt().unwrap()).unwrap();
    assert!(db::in_night_shift(&conn, 200, date).unwrap());
    assert!(db::in_night_shift(&conn, 200, date.succ_opt().unwrap()).unwrap());
    assert!(!db::in_night_shift(&conn, 200, NaiveDate::from_ymd_opt(2025, 5, 8).unwrap()).unwrap());
}

#[test]
fn timeoff_round_trip_with_admin_decision() {
    let pool = common::test_pool();
    common::seed_users(&pool);

    let conn = get_connection(&pool).unwrap();

    let id = timeoff::create_timeoff_request(&conn, 100, Some("ivanov"), "нужно к врачу").unwrap();

    // Admin sees it pending
    let pending = timeoff::pending_timeoff_requests(&conn).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].user_id, 100);

    // Approve and verify the requester comes back for notification
    let (requester, username) = timeoff::resolve_timeoff_request(&conn, id, request_status::APPROVED, 900)
        .unwrap()
        .unwrap();
    assert_eq!(requester, 100);
    assert_eq!(username.as_deref(), Some("ivanov"));

    // Stats reflect the decision
    let stats = timeoff::timeoff_stats(&conn, 100, 30).unwrap();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.approved, 1);
    assert_eq!(stats.pending, 0);
}

#[test]
fn deleting_a_user_erases_every_trace() {
    let pool = common::test_pool();
    common::seed_users(&pool);
    let date = NaiveDate::from_ymd_opt(2025, 5, 5).unwrap();

    let mut conn = get_connection(&pool).unwrap();

    common::insert_status_at(&conn, 100, "office", "2025-05-05 09:00:00");
    common::insert_location_at(&conn, 100, 55.75, 37.61, "2025-05-05 09:01:00", "s-1", "start");
    db::set_checked_in(&conn, 100, date).unwrap();
    timeoff::create_timeoff_request(&conn, 100, None, "отгул").unwrap();

    assert!(db::delete_user(&mut conn, 100).unwrap());

    for table in [
        "status_history",
        "location_history",
        "morning_checks",
        "timeoff_requests",
    ] {
        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {} WHERE user_id = 100", table), [], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(count, 0, "table {} still has rows", table);
    }

    // The other users survive
    assert_eq!(db::get_all_users(&conn).unwrap().len(), 2);
}
