//! Live location handling.
//!
//! Initial location messages and live-location edits land here. The point
//! is classified against the in-memory tracking state (moving, stationary,
//! intermediate), persisted, and counts as the morning check-in. Crossing
//! the long-stationary threshold warns the admin once per stretch.

use teloxide::prelude::*;
use teloxide::types::Location;

use crate::core::config;
use crate::storage::db;
use crate::storage::get_connection;
use crate::storage::locations::{self, point_type};
use crate::telegram::handlers::types::{display_name, HandlerDeps, HandlerError};
use crate::telegram::notifications::notify_admin_stationary;
use crate::telegram::Bot;

/// Handle a location message or a live-location update.
pub async fn handle_location(
    bot: &Bot,
    msg: &Message,
    location: &Location,
    is_live_update: bool,
    deps: &HandlerDeps,
) -> Result<(), HandlerError> {
    let user_id = msg.chat.id.0;
    let first_name = msg.from.as_ref().map(|u| u.first_name.clone());
    let lat = location.latitude;
    let lon = location.longitude;
    let today = config::today_local();

    let conn = get_connection(&deps.db_pool)?;
    let user_name = display_name(&conn, user_id, first_name.as_deref());

    if !deps.tracking.is_tracking(user_id) {
        // First point: open a session and confirm
        let session = locations::save_location(&conn, user_id, lat, lon, None, point_type::START, today)?;
        deps.tracking.observe_point(user_id, lat, lon, &session);

        if !is_live_update {
            bot.send_message(
                msg.chat.id,
                "✅ Трансляция геопозиции начата. Для остановки трансляции нажмите '🏠 Домой'.",
            )
            .await?;
        }
        log::info!("Started location session {} for {} [{}, {}]", session, user_name, lat, lon);
    } else {
        let session = deps
            .tracking
            .session_of(user_id)
            .unwrap_or_else(|| format!("session_{}_{}", user_id, chrono::Utc::now().timestamp()));
        let classification = deps.tracking.observe_point(user_id, lat, lon, &session);

        locations::save_location(
            &conn,
            user_id,
            lat,
            lon,
            Some(&session),
            classification.location_type,
            today,
        )?;

        if classification.warn_admin {
            notify_admin_stationary(bot, &user_name, lat, lon).await;
            log::info!("Stationary warning sent to admin for user {}", user_name);
        }

        if !is_live_update {
            bot.send_message(msg.chat.id, "📍 Местоположение обновлено").await?;
        }

        log::info!(
            "Saved location for user {} [{}, {}], type: {}, speed: {:.1} км/ч",
            user_name,
            lat,
            lon,
            classification.location_type,
            classification.speed_kmh
        );
    }

    db::set_checked_in(&conn, user_id, today)?;

    Ok(())
}
