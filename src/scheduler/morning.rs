//! Morning check sweep.
//!
//! On workdays between 08:30 and 10:00 local time, users who have not yet
//! reported anything are reminded (once) and the admin is told (once).
//! Night-shift workers and users whose recent statuses imply absence are
//! exempted for the day.

use chrono::{Duration, NaiveTime};
use std::sync::Arc;
use teloxide::prelude::*;
use tokio::time::interval;

use crate::core::config;
use crate::core::status::Status;
use crate::storage::db::{self, DbPool};
use crate::storage::get_connection;
use crate::telegram::keyboards;
use crate::telegram::notifications::notify_admin_text;
use crate::telegram::Bot;

/// Start the sweep task (every 10 minutes).
pub fn spawn(bot: Bot, db_pool: Arc<DbPool>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(config::morning::sweep_interval());
        loop {
            ticker.tick().await;
            if let Err(e) = run_sweep(&bot, &db_pool).await {
                log::error!("Morning check sweep failed: {}", e);
            }
        }
    })
}

/// Start the midnight rollover task.
///
/// Check rows for the new day are created lazily by `unchecked_users`;
/// this job pre-creates them right after midnight and logs the rollover
/// so the morning sweep starts from a clean slate.
pub fn spawn_reset(db_pool: Arc<DbPool>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(config::morning::sweep_interval());
        let mut last_reset: Option<chrono::NaiveDate> = None;
        loop {
            ticker.tick().await;

            let now = config::now_local();
            let today = now.date_naive();
            if last_reset == Some(today) {
                continue;
            }
            // Only fire in the first slice of the day
            if now.time() >= NaiveTime::from_hms_opt(0, 10, 0).unwrap_or_default() {
                continue;
            }

            last_reset = Some(today);
            log::info!("Resetting morning checks for {}", today);
            match get_connection(&db_pool) {
                Ok(conn) => {
                    if let Err(e) = db::ensure_morning_rows(&conn, today) {
                        log::error!("Failed to create morning check rows: {}", e);
                    }
                }
                Err(e) => log::error!("Failed to get DB connection for morning reset: {}", e),
            }
        }
    })
}

/// True when the local clock is inside the [start, end) check window.
pub fn within_window(time: NaiveTime) -> bool {
    let (sh, sm) = config::morning::CHECK_START;
    let (eh, em) = config::morning::CHECK_END;
    let start = NaiveTime::from_hms_opt(sh, sm, 0).unwrap_or_default();
    let end = NaiveTime::from_hms_opt(eh, em, 0).unwrap_or_default();
    start <= time && time < end
}

/// One sweep: remind every unchecked user and tell the admin, at most once
/// per user per day.
pub async fn run_sweep(bot: &Bot, db_pool: &Arc<DbPool>) -> anyhow::Result<()> {
    let now = config::now_local();
    let today = now.date_naive();

    if !super::is_workday(today) {
        log::debug!("Skipping morning check on non-workday: {}", now.format("%A"));
        return Ok(());
    }
    if !within_window(now.time()) {
        return Ok(());
    }

    let unchecked = {
        let conn = get_connection(db_pool)?;
        db::unchecked_users(&conn, today)?
    };

    for row in unchecked {
        if row.notified && row.admin_notified {
            continue;
        }

        let conn = get_connection(db_pool)?;

        if db::in_night_shift(&conn, row.user_id, today)? {
            log::info!(
                "Skipping morning check for user {} (ID: {}) - in night shift",
                row.full_name,
                row.user_id
            );
            db::set_morning_notified(&conn, row.user_id, today)?;
            continue;
        }

        // Today's statuses can exempt the user outright
        let today_statuses = db::status_history_for_date(&conn, row.user_id, today)?;
        let has_skip_status = today_statuses
            .iter()
            .filter_map(|(key, _)| Status::from_key(key))
            .any(Status::skips_morning_check);
        if has_skip_status {
            log::info!(
                "Skipping morning check for user {} (ID: {}) - absent status today",
                row.full_name,
                row.user_id
            );
            db::set_morning_notified(&conn, row.user_id, today)?;
            continue;
        }

        // Multi-day absences: yesterday's last status was vacation or sick
        let yesterday = today - Duration::days(1);
        let yesterday_statuses = db::status_history_for_date(&conn, row.user_id, yesterday)?;
        let last_yesterday = yesterday_statuses.last().and_then(|(key, _)| Status::from_key(key));
        if matches!(last_yesterday, Some(Status::Vacation) | Some(Status::Sick)) {
            log::info!(
                "Skipping morning check for user {} (ID: {}) - still absent since yesterday",
                row.full_name,
                row.user_id
            );
            db::set_morning_notified(&conn, row.user_id, today)?;
            continue;
        }
        drop(conn);

        if !row.notified {
            let text = format!(
                "⚠️ Доброе утро, {}!\n\nВы еще не отметили свой статус сегодня. \
                 Пожалуйста, нажмите одну из кнопок статуса на клавиатуре.",
                row.full_name
            );
            match bot
                .send_message(ChatId(row.user_id), text)
                .reply_markup(keyboards::status_keyboard(false))
                .await
            {
                Ok(_) => log::info!(
                    "Morning check notification sent to user {} (ID: {})",
                    row.full_name,
                    row.user_id
                ),
                Err(e) => log::error!("Error sending morning notification to user {}: {}", row.user_id, e),
            }
        }

        if !row.admin_notified {
            notify_admin_text(
                bot,
                &format!(
                    "⚠️ Уведомление о непройденной утренней отметке:\n\n\
                     Пользователь {} не отметил свой статус сегодня до 8:30.",
                    row.full_name
                ),
            )
            .await;
        }

        let conn = get_connection(db_pool)?;
        db::set_morning_notified(&conn, row.user_id, today)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_bounds_are_half_open() {
        assert!(!within_window(NaiveTime::from_hms_opt(8, 29, 59).unwrap()));
        assert!(within_window(NaiveTime::from_hms_opt(8, 30, 0).unwrap()));
        assert!(within_window(NaiveTime::from_hms_opt(9, 45, 0).unwrap()));
        assert!(!within_window(NaiveTime::from_hms_opt(10, 0, 0).unwrap()));
        assert!(!within_window(NaiveTime::from_hms_opt(17, 0, 0).unwrap()));
    }
}
