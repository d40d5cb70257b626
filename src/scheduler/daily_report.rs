//! Daily report job.
//!
//! At 17:30 local time on workdays every user's CSV report and route map
//! are generated and sent to the admin chat. The job ticks once a minute
//! and remembers the last date it ran so a long tick cannot fire twice.

use chrono::{NaiveDate, NaiveTime};
use std::sync::{Arc, Mutex};
use teloxide::prelude::*;
use tokio::time::{interval, Duration};

use crate::core::config;
use crate::report;
use crate::storage::db::{self, DbPool};
use crate::storage::get_connection;
use crate::storage::locations;
use crate::telegram::admin::send_report_files;
use crate::telegram::Bot;

/// Start the daily report task.
pub fn spawn(bot: Bot, db_pool: Arc<DbPool>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let last_run: Mutex<Option<NaiveDate>> = Mutex::new(None);
        let mut ticker = interval(Duration::from_secs(60));
        loop {
            ticker.tick().await;

            let now = config::now_local();
            let today = now.date_naive();

            if !super::is_workday(today) {
                continue;
            }
            if !within_report_window(now.time()) {
                continue;
            }
            {
                let mut guard = match last_run.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                if *guard == Some(today) {
                    continue;
                }
                *guard = Some(today);
            }

            log::info!("Starting daily report generation for {}", today);
            match generate_and_send_all(&bot, &db_pool).await {
                Ok(count) => log::info!("Daily reports sent for {} user(s)", count),
                Err(e) => log::error!("Daily report generation failed: {}", e),
            }
        }
    })
}

/// True when the clock is inside the report window [17:30, 17:35).
pub fn within_report_window(time: NaiveTime) -> bool {
    let (h, m) = config::report::DAILY_REPORT_TIME;
    let start = NaiveTime::from_hms_opt(h, m, 0).unwrap_or_default();
    let end = NaiveTime::from_hms_opt(h, m + config::report::WINDOW_MINUTES, 0).unwrap_or_default();
    start <= time && time < end
}

/// Generate reports for every user and send them to the admin chat.
///
/// Returns the number of users processed. Individual failures are logged
/// and skipped so one broken user doesn't silence the rest.
pub async fn generate_and_send_all(bot: &Bot, db_pool: &Arc<DbPool>) -> anyhow::Result<usize> {
    let today = config::today_local();
    let admin_id = *config::admin::ADMIN_ID;

    let users = {
        let conn = get_connection(db_pool)?;
        db::get_all_users(&conn)?
    };
    log::info!("Generating daily reports for {} user(s)", users.len());

    let mut processed = 0;
    for user in &users {
        let result: anyhow::Result<()> = async {
            let conn = get_connection(db_pool)?;

            for session in locations::active_sessions(&conn, user.user_id, today)? {
                locations::mark_session_ended(&conn, user.user_id, &session, None)?;
                log::info!(
                    "Ended active location session {} for user {} (ID: {})",
                    session,
                    user.full_name,
                    user.user_id
                );
            }

            let generated = report::generate_for_user(&conn, user.user_id, today)?;
            drop(conn);

            if admin_id != 0 {
                send_report_files(bot, ChatId(admin_id), &generated, today)
                    .await
                    .map_err(|e| anyhow::anyhow!("sending report files: {}", e))?;
            }
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                processed += 1;
                log::info!("Daily report sent for user {} (ID: {})", user.full_name, user.user_id);
            }
            Err(e) => log::error!("Error generating daily report for user {}: {}", user.user_id, e),
        }
    }

    Ok(processed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_window_is_five_minutes() {
        assert!(!within_report_window(NaiveTime::from_hms_opt(17, 29, 59).unwrap()));
        assert!(within_report_window(NaiveTime::from_hms_opt(17, 30, 0).unwrap()));
        assert!(within_report_window(NaiveTime::from_hms_opt(17, 34, 59).unwrap()));
        assert!(!within_report_window(NaiveTime::from_hms_opt(17, 35, 0).unwrap()));
    }
}
