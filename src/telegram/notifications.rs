//! Admin notification helpers.
//!
//! All of these are fire-and-forget: a failed notification is logged and
//! never propagated, so user-facing flows don't break because the admin
//! chat is unreachable.

use teloxide::prelude::*;
use teloxide::types::ParseMode;

use crate::core::config;
use crate::telegram::Bot;

/// Send a plain-text message to the primary admin chat.
pub async fn notify_admin_text(bot: &Bot, text: &str) {
    let admin_id = *config::admin::ADMIN_ID;
    if admin_id == 0 {
        log::debug!("Admin notification skipped (ADMIN_ID not set): {}", text);
        return;
    }
    if let Err(e) = bot.send_message(ChatId(admin_id), text).await {
        log::error!("Failed to notify admin: {}", e);
    }
}

/// Send an HTML-formatted message to the primary admin chat.
pub async fn notify_admin_html(bot: &Bot, html: &str) {
    let admin_id = *config::admin::ADMIN_ID;
    if admin_id == 0 {
        log::debug!("Admin notification skipped (ADMIN_ID not set)");
        return;
    }
    if let Err(e) = bot
        .send_message(ChatId(admin_id), html)
        .parse_mode(ParseMode::Html)
        .await
    {
        log::error!("Failed to notify admin: {}", e);
    }
}

/// Warn the admin that a tracked user has been standing still.
pub async fn notify_admin_stationary(bot: &Bot, user_name: &str, lat: f64, lon: f64) {
    let text = format!(
        "⚠️ Пользователь {} находится на месте более 30 минут.\n\
         Координаты: {:.6}, {:.6}\n\
         <a href=\"https://maps.google.com/maps?q={:.6},{:.6}\">Посмотреть на карте</a>",
        user_name, lat, lon, lat, lon
    );
    notify_admin_html(bot, &text).await;
}
