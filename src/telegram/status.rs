//! Status button handling.
//!
//! A pressed status button records the status, counts as the morning
//! check-in, and for some statuses carries extra behavior: `home` closes
//! the day, `to_night`/`from_night` drive the night-shift exemption.

use chrono::Duration;
use teloxide::prelude::*;

use crate::core::config;
use crate::core::status::Status;
use crate::storage::db;
use crate::storage::get_connection;
use crate::storage::locations;
use crate::telegram::handlers::types::{display_name, HandlerDeps, HandlerError};
use crate::telegram::notifications::notify_admin_text;
use crate::telegram::Bot;

/// Handle one status button press.
pub async fn handle_status_button(
    bot: &Bot,
    msg: &Message,
    status: Status,
    deps: &HandlerDeps,
) -> Result<(), HandlerError> {
    let user_id = msg.chat.id.0;
    let first_name = msg.from.as_ref().map(|u| u.first_name.clone());
    let today = config::today_local();

    let conn = get_connection(&deps.db_pool)?;
    let user_name = display_name(&conn, user_id, first_name.as_deref());

    db::save_status(&conn, user_id, status.as_key())?;
    db::set_checked_in(&conn, user_id, today)?;
    log::info!("User {} set status to {}", user_id, status.as_key());

    match status {
        Status::Home => {
            // Close every open session; the freshest one may still live in
            // the tracking state, the rest only in the database.
            let was_tracking = deps.tracking.is_tracking(user_id);
            deps.tracking.stop_tracking(user_id);

            let mut ended_any = false;
            for session in locations::active_sessions(&conn, user_id, today)? {
                locations::mark_session_ended(&conn, user_id, &session, None)?;
                log::info!("Closed active session {} for user {}", session, user_name);
                ended_any = true;
            }

            let reply = if was_tracking || ended_any {
                format!(
                    "Статус обновлен: {}\n✅ Трансляция геопозиции остановлена.\nХорошего вечера, {}!",
                    status.label(),
                    user_name
                )
            } else {
                format!("Статус обновлен: {}\nХорошего вечера, {}!", status.label(), user_name)
            };
            bot.send_message(msg.chat.id, reply).await?;

            log::info!("Пользователь {} (ID: {}) закончил день", user_name, user_id);
            notify_admin_text(
                bot,
                &format!(
                    "ℹ️ Пользователь {} закончил день ({})",
                    user_name,
                    today.format("%Y-%m-%d")
                ),
            )
            .await;
        }
        Status::ToNight => {
            let tomorrow = today + Duration::days(1);
            db::add_night_shift(&conn, user_id, today, tomorrow)?;
            bot.send_message(
                msg.chat.id,
                format!(
                    "Статус обновлен: {}\n✅ Вы добавлены в ночную смену с {} по {}.\n\
                     Утренние оповещения будут отключены до следующих суток.",
                    status.label(),
                    today.format("%Y-%m-%d"),
                    tomorrow.format("%Y-%m-%d")
                ),
            )
            .await?;
        }
        Status::FromNight => {
            if db::in_night_shift(&conn, user_id, today)? {
                db::set_checked_in(&conn, user_id, today)?;
                bot.send_message(
                    msg.chat.id,
                    format!(
                        "Статус обновлен: {}\n✅ Ночная смена завершена. \
                         Утренние оповещения будут включены с завтрашнего дня.",
                        status.label()
                    ),
                )
                .await?;
            } else {
                bot.send_message(
                    msg.chat.id,
                    format!(
                        "Статус обновлен: {}\nℹ️ Информация: Вы не были отмечены в ночной смене.",
                        status.label()
                    ),
                )
                .await?;
            }
        }
        _ => {
            bot.send_message(msg.chat.id, format!("Статус обновлен: {}", status.label()))
                .await?;
        }
    }

    Ok(())
}
