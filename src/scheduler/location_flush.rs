//! Live-location flush task.
//!
//! Every five minutes the freshest in-memory point of every tracked user
//! is persisted as an `intermediate` heartbeat, and users whose broadcast
//! has gone quiet for over an hour are asked to re-share (throttled).

use std::sync::Arc;
use teloxide::prelude::*;
use tokio::time::interval;

use crate::core::config;
use crate::storage::db::DbPool;
use crate::storage::get_connection;
use crate::storage::locations::{self, point_type};
use crate::telegram::{Bot, TrackingState};

/// Start the flush task.
pub fn spawn(bot: Bot, db_pool: Arc<DbPool>, tracking: Arc<TrackingState>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(config::tracking::flush_interval());
        loop {
            ticker.tick().await;
            if let Err(e) = run_flush(&bot, &db_pool, &tracking).await {
                log::error!("Location flush failed: {}", e);
            }
        }
    })
}

/// One flush pass.
pub async fn run_flush(bot: &Bot, db_pool: &Arc<DbPool>, tracking: &Arc<TrackingState>) -> anyhow::Result<()> {
    let today = config::today_local();
    let pending = tracking.drain_pending_flushes();

    if !pending.is_empty() {
        log::info!("Flushing {} live location(s)", pending.len());
        let conn = get_connection(db_pool)?;
        for (user_id, session_id, lat, lon) in pending {
            if let Err(e) = locations::save_location(
                &conn,
                user_id,
                lat,
                lon,
                Some(&session_id),
                point_type::INTERMEDIATE,
                today,
            ) {
                log::error!("Failed to flush location of user {}: {}", user_id, e);
            }
        }
    }

    // Sessions that went quiet: ask the user to re-share, at most hourly
    for user_id in tracking.stale_sessions(config::tracking::STALE_SESSION_SECS) {
        if !tracking.should_request_reshare(user_id, config::activity::NOTIFY_THROTTLE_SECS) {
            continue;
        }
        if let Err(e) = bot
            .send_message(
                ChatId(user_id),
                "Пожалуйста, поделитесь вашим текущим местоположением для обновления маршрута.",
            )
            .await
        {
            log::error!("Failed to request location re-share from user {}: {}", user_id, e);
        } else {
            log::info!("Requested location re-share from user {}", user_id);
        }
    }

    Ok(())
}
