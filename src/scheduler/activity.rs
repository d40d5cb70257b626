//! User activity monitor.
//!
//! Warns the admin when a non-admin user whose working status implies
//! presence has neither changed status nor sent a coordinate for half an
//! hour. Warnings are throttled to once per hour per user.

use std::sync::Arc;
use tokio::time::interval;

use crate::core::config;
use crate::core::status::{display_status, Status};
use crate::storage::db::{self, DbPool};
use crate::storage::get_connection;
use crate::storage::locations::{self, parse_timestamp};
use crate::telegram::notifications::notify_admin_html;
use crate::telegram::{Bot, TrackingState};

/// Start the monitor task.
pub fn spawn(bot: Bot, db_pool: Arc<DbPool>, tracking: Arc<TrackingState>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(config::activity::check_interval());
        loop {
            ticker.tick().await;
            if let Err(e) = run_check(&bot, &db_pool, &tracking).await {
                log::error!("Activity check failed: {}", e);
            }
        }
    })
}

/// Seconds elapsed since a stored timestamp, or None if it doesn't parse.
fn age_secs(raw: &str) -> Option<i64> {
    let ts = parse_timestamp(raw)?;
    let now = config::now_local().naive_local();
    Some((now - ts).num_seconds())
}

/// One monitoring pass.
pub async fn run_check(bot: &Bot, db_pool: &Arc<DbPool>, tracking: &Arc<TrackingState>) -> anyhow::Result<()> {
    let users = {
        let conn = get_connection(db_pool)?;
        db::get_all_users(&conn)?
    };

    for user in users {
        if user.is_admin {
            continue;
        }

        let conn = get_connection(db_pool)?;

        let Some((status_key, status_ts)) = db::latest_status(&conn, user.user_id)? else {
            // Never reported anything: nothing to monitor
            continue;
        };

        if Status::from_key(&status_key).is_some_and(Status::is_safe_for_inactivity) {
            continue;
        }

        let Some(status_age) = age_secs(&status_ts) else {
            continue;
        };
        if status_age < config::activity::INACTIVITY_SECS {
            continue;
        }

        let Some(last_location) = locations::latest_location(&conn, user.user_id)? else {
            // No tracking in use for this user
            continue;
        };
        drop(conn);

        let Some(location_age) = age_secs(&last_location.timestamp) else {
            continue;
        };
        if location_age <= config::activity::INACTIVITY_SECS {
            continue;
        }

        if !tracking.should_notify_inactivity(user.user_id, config::activity::NOTIFY_THROTTLE_SECS) {
            continue;
        }

        let minutes = location_age / 60;
        let last_coord_time = parse_timestamp(&last_location.timestamp)
            .map(|ts| ts.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| last_location.timestamp.clone());
        let status_set_time = parse_timestamp(&status_ts)
            .map(|ts| ts.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| status_ts.clone());

        let message = format!(
            "⚠️ <b>Внимание!</b> Пользователь <b>{}</b> не отправлял координаты \
             в течение <b>{} минут</b>.\n\n\
             Последние координаты в: <b>{}</b>\n\
             Текущий статус: <b>{}</b>\n\
             Статус установлен: <b>{}</b>",
            user.full_name,
            minutes,
            last_coord_time,
            display_status(&status_key),
            status_set_time
        );
        notify_admin_html(bot, &message).await;
        log::info!(
            "Inactivity warning sent for user {}: {} min without coordinates, status {}",
            user.full_name,
            minutes,
            status_key
        );
    }

    Ok(())
}
