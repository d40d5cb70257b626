//! Time-off request flows: the request dialogue, the user's own request
//! list, statistics, and the admin approve/reject path.

use teloxide::prelude::*;

use crate::storage::db;
use crate::storage::get_connection;
use crate::storage::locations::parse_timestamp;
use crate::storage::timeoff::{self, request_status};
use crate::telegram::handlers::types::{display_name, HandlerDeps, HandlerError};
use crate::telegram::keyboards;
use crate::telegram::notifications::notify_admin_text;
use crate::telegram::tracking::Dialogue;
use crate::telegram::Bot;

/// `/request` or the 📝 button: open the reason dialogue.
pub async fn start_timeoff_request(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    deps.tracking.set_dialogue(msg.chat.id.0, Dialogue::TimeoffReason);
    bot.send_message(msg.chat.id, "Пожалуйста, напишите причину для отсутствия:")
        .await?;
    Ok(())
}

/// The free-text reply that completes the dialogue.
pub async fn process_timeoff_reason(
    bot: &Bot,
    msg: &Message,
    reason: &str,
    deps: &HandlerDeps,
) -> Result<(), HandlerError> {
    let user_id = msg.chat.id.0;
    let username = msg.from.as_ref().and_then(|u| u.username.clone());

    let conn = get_connection(&deps.db_pool)?;
    let request_id = timeoff::create_timeoff_request(&conn, user_id, username.as_deref(), reason)?;
    log::info!("Time-off request {} created by user {}", request_id, user_id);

    bot.send_message(
        msg.chat.id,
        format!(
            "Ваша заявка на отсутствие отправлена администратору и ожидает рассмотрения.\n\nПричина: {}",
            reason
        ),
    )
    .await?;

    let user_name = display_name(&conn, user_id, msg.from.as_ref().map(|u| u.first_name.as_str()));
    let admin_id = *crate::core::config::admin::ADMIN_ID;
    if admin_id != 0 {
        let text = format!(
            "📋 Новая заявка на отсутствие от {}:\n\nПричина: {}\n\nВыберите действие:",
            user_name, reason
        );
        if let Err(e) = bot
            .send_message(ChatId(admin_id), text)
            .reply_markup(keyboards::timeoff_decision(request_id))
            .await
        {
            log::error!("Failed to send time-off request {} to admin: {}", request_id, e);
        }
    }

    Ok(())
}

/// `/cancel`: abort whatever dialogue is open.
pub async fn cancel_dialogue(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    if deps.tracking.clear_dialogue(msg.chat.id.0).is_some() {
        bot.send_message(msg.chat.id, "Запрос отменен.").await?;
    } else {
        bot.send_message(msg.chat.id, "Нет активной операции.").await?;
    }
    Ok(())
}

fn status_label_ru(status: &str) -> &'static str {
    match status {
        request_status::APPROVED => "✅ Согласовано",
        request_status::REJECTED => "❌ Отклонено",
        _ => "⏳ Ожидает рассмотрения",
    }
}

fn short_time(raw: &str) -> String {
    parse_timestamp(raw)
        .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| raw.to_string())
}

/// `/myrequests`: the caller's requests, newest first.
pub async fn show_my_requests(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let conn = get_connection(&deps.db_pool)?;
    let requests = timeoff::timeoff_requests_for_user(&conn, msg.chat.id.0)?;

    if requests.is_empty() {
        bot.send_message(msg.chat.id, "У вас нет заявок на отсутствие.").await?;
        return Ok(());
    }

    let mut text = "📋 Ваши заявки на отсутствие:\n\n".to_string();
    for request in &requests {
        text.push_str(&format!("Заявка #{}:\n", request.id));
        text.push_str(&format!("• Причина: {}\n", request.reason));
        text.push_str(&format!("• Статус: {}\n", status_label_ru(&request.status)));
        text.push_str(&format!("• Дата запроса: {}\n", short_time(&request.request_time)));
        if let Some(ref response_time) = request.response_time {
            text.push_str(&format!("• Дата ответа: {}\n", short_time(response_time)));
        }
        text.push('\n');
    }

    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

/// `/timeoff_stats [days]`: the caller's statistics over a period.
pub async fn show_timeoff_stats(bot: &Bot, msg: &Message, args: &str, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let days: i64 = args.trim().parse().ok().filter(|d| *d > 0).unwrap_or(30);
    let user_id = msg.chat.id.0;

    let conn = get_connection(&deps.db_pool)?;
    let user_name = display_name(&conn, user_id, msg.from.as_ref().map(|u| u.first_name.as_str()));
    let stats = timeoff::timeoff_stats(&conn, user_id, days)?;

    let text = if stats.total > 0 {
        format!(
            "📊 Статистика запросов на отгул за последние {} дней\n\n\
             👤 {}\n📑 Всего запросов: {}\n✅ Одобрено: {}\n❌ Отклонено: {}\n⏳ Ожидает рассмотрения: {}\n\n\
             Используйте /timeoff_stats [дни] для изменения периода.",
            days, user_name, stats.total, stats.approved, stats.rejected, stats.pending
        )
    } else {
        format!(
            "📊 Статистика запросов на отгул\n\n👤 {}\nℹ️ Нет запросов на отгул за последние {} дней.\n\n\
             Используйте /timeoff_stats [дни] для изменения периода.",
            user_name, days
        )
    };

    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

/// `/requests` (admin): every pending request, one message each with the
/// decision buttons.
pub async fn show_pending_requests(bot: &Bot, chat_id: ChatId, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let conn = get_connection(&deps.db_pool)?;
    let requests = timeoff::pending_timeoff_requests(&conn)?;

    if requests.is_empty() {
        bot.send_message(chat_id, "Нет заявок, ожидающих рассмотрения.").await?;
        return Ok(());
    }

    for request in &requests {
        let user_name = db::get_user_name(&conn, request.user_id)?
            .or_else(|| request.username.clone())
            .unwrap_or_else(|| format!("Пользователь {}", request.user_id));
        let text = format!(
            "📋 Заявка #{} от {}:\n\n• Причина: {}\n• Дата запроса: {}\n\nВыберите действие:",
            request.id,
            user_name,
            request.reason,
            short_time(&request.request_time)
        );
        bot.send_message(chat_id, text)
            .reply_markup(keyboards::timeoff_decision(request.id))
            .await?;
    }

    Ok(())
}

/// approve_timeoff_* / reject_timeoff_* callbacks.
pub async fn handle_timeoff_decision(
    bot: &Bot,
    admin_id: i64,
    chat_id: ChatId,
    message_id: Option<teloxide::types::MessageId>,
    callback_data: &str,
    deps: &HandlerDeps,
) -> Result<(), HandlerError> {
    let (status, request_id) = if let Some(rest) = callback_data.strip_prefix("approve_timeoff_") {
        (request_status::APPROVED, rest.parse::<i64>())
    } else if let Some(rest) = callback_data.strip_prefix("reject_timeoff_") {
        (request_status::REJECTED, rest.parse::<i64>())
    } else {
        return Ok(());
    };

    let Ok(request_id) = request_id else {
        log::error!("Malformed time-off callback: {}", callback_data);
        return Ok(());
    };

    let conn = get_connection(&deps.db_pool)?;
    let resolved = timeoff::resolve_timeoff_request(&conn, request_id, status, admin_id)?;

    let Some((user_id, username)) = resolved else {
        if let Some(message_id) = message_id {
            bot.edit_message_text(chat_id, message_id, "Ошибка: Заявка не найдена или уже обработана.")
                .await?;
        }
        return Ok(());
    };

    let user_name = db::get_user_name(&conn, user_id)?
        .or(username)
        .unwrap_or_else(|| format!("Пользователь {}", user_id));
    let verdict = if status == request_status::APPROVED {
        "согласована"
    } else {
        "отклонена"
    };

    if let Some(message_id) = message_id {
        bot.edit_message_text(
            chat_id,
            message_id,
            format!("Заявка на отсутствие от {} была {}.", user_name, verdict),
        )
        .await?;
    }

    if let Err(e) = bot
        .send_message(
            ChatId(user_id),
            format!("Ваша заявка на отсутствие была {} администратором.", verdict),
        )
        .await
    {
        log::error!("Failed to notify user {} about time-off decision: {}", user_id, e);
        notify_admin_text(
            bot,
            &format!("⚠️ Не удалось уведомить пользователя {} о решении по заявке.", user_name),
        )
        .await;
    }

    log::info!("Time-off request {} resolved as {} by admin {}", request_id, status, admin_id);
    Ok(())
}
