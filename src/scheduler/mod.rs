//! Background jobs: morning check sweep, daily reports, live-location
//! flush and the user activity monitor.
//!
//! Each job runs as its own `tokio::spawn`ed task on a fixed interval,
//! evaluating its own time window against the configured timezone.

pub mod activity;
pub mod daily_report;
pub mod location_flush;
pub mod morning;

use chrono::{Datelike, NaiveDate};
use std::sync::Arc;

use crate::storage::db::DbPool;
use crate::telegram::{Bot, TrackingState};

/// True for Monday..Friday.
pub fn is_workday(date: NaiveDate) -> bool {
    date.weekday().number_from_monday() <= 5
}

/// Start every background job.
pub fn start_all(bot: Bot, db_pool: Arc<DbPool>, tracking: Arc<TrackingState>) {
    morning::spawn(bot.clone(), Arc::clone(&db_pool));
    morning::spawn_reset(Arc::clone(&db_pool));
    daily_report::spawn(bot.clone(), Arc::clone(&db_pool));
    location_flush::spawn(bot.clone(), Arc::clone(&db_pool), Arc::clone(&tracking));
    activity::spawn(bot, db_pool, tracking);
    log::info!(
        "Background schedulers started (morning check + reset, daily report, location flush, activity monitor)"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekdays_are_workdays() {
        // 2025-05-05 is a Monday
        assert!(is_workday(NaiveDate::from_ymd_opt(2025, 5, 5).unwrap()));
        assert!(is_workday(NaiveDate::from_ymd_opt(2025, 5, 9).unwrap()));
        assert!(!is_workday(NaiveDate::from_ymd_opt(2025, 5, 10).unwrap()));
        assert!(!is_workday(NaiveDate::from_ymd_opt(2025, 5, 11).unwrap()));
    }
}
