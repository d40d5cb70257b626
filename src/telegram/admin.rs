//! Admin panel: inline-menu router, employee lookup, report generation
//! and user management.

use chrono::{Duration, NaiveDate};
use teloxide::prelude::*;
use teloxide::types::{InputFile, MessageId, ParseMode};

use crate::core::config;
use crate::report;
use crate::storage::db;
use crate::storage::get_connection;
use crate::storage::locations::{self, parse_timestamp};
use crate::storage::timeoff;
use crate::telegram::handlers::types::{HandlerDeps, HandlerError};
use crate::telegram::keyboards;
use crate::telegram::timeoff as timeoff_flow;
use crate::telegram::tracking::{Dialogue, ReportContext};
use crate::telegram::Bot;

const NOT_ALLOWED: &str = "У вас нет прав для выполнения этого действия.";

/// `/admin` or the panel reply-keyboard button.
pub async fn show_admin_panel(bot: &Bot, chat_id: ChatId, user_id: i64, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let conn = get_connection(&deps.db_pool)?;
    if !db::is_admin(&conn, user_id) {
        bot.send_message(chat_id, NOT_ALLOWED).await?;
        return Ok(());
    }
    drop(conn);

    bot.send_message(chat_id, "🔐 Панель администратора\n\nВыберите действие:")
        .reply_markup(keyboards::admin_panel())
        .await?;
    Ok(())
}

/// `/locate`: user selector for the last-known-position view.
pub async fn show_locate_selector(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    deps: &HandlerDeps,
) -> Result<(), HandlerError> {
    let conn = get_connection(&deps.db_pool)?;
    if !db::is_admin(&conn, user_id) {
        bot.send_message(chat_id, NOT_ALLOWED).await?;
        return Ok(());
    }
    let users = db::get_all_users(&conn)?;
    drop(conn);

    bot.send_message(chat_id, "Выберите пользователя для просмотра местоположения:")
        .reply_markup(keyboards::user_selector(&users, "locate_user"))
        .await?;
    Ok(())
}

/// `/report YYYY-MM-DD`: validate the date and show the user selector.
pub async fn handle_report_command(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    args: &str,
    deps: &HandlerDeps,
) -> Result<(), HandlerError> {
    let conn = get_connection(&deps.db_pool)?;
    if !db::is_admin(&conn, user_id) {
        bot.send_message(chat_id, NOT_ALLOWED).await?;
        return Ok(());
    }

    let args = args.trim();
    if args.is_empty() {
        bot.send_message(
            chat_id,
            "Пожалуйста, укажите дату в формате:\n/report ГГГГ-ММ-ДД\n\nПример: /report 2025-05-01",
        )
        .await?;
        return Ok(());
    }

    let Ok(date) = NaiveDate::parse_from_str(args, "%Y-%m-%d") else {
        bot.send_message(
            chat_id,
            "Некорректный формат даты. Используйте формат ГГГГ-ММ-ДД.\nПример: /report 2025-05-01",
        )
        .await?;
        return Ok(());
    };

    deps.tracking.set_report_context(user_id, ReportContext::Date(date));
    let users = db::get_all_users(&conn)?;
    drop(conn);

    bot.send_message(chat_id, format!("Выберите пользователя для отчета за {}:", date))
        .reply_markup(keyboards::user_selector(&users, "report_user_date"))
        .await?;
    Ok(())
}

/// Every admin inline-panel callback lands here.
pub async fn handle_admin_callback(bot: &Bot, q: &CallbackQuery, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let Some(data) = q.data.clone() else {
        return Ok(());
    };
    let admin_id = i64::try_from(q.from.id.0).unwrap_or(0);
    let chat_id = q.message.as_ref().map(|m| m.chat().id);
    let message_id = q.message.as_ref().map(|m| m.id());

    bot.answer_callback_query(q.id.clone()).await?;

    let Some(chat_id) = chat_id else {
        log::warn!("Admin callback {} without an accessible message", data);
        return Ok(());
    };

    {
        let conn = get_connection(&deps.db_pool)?;
        if !db::is_admin(&conn, admin_id) {
            log::warn!("Пользователь {} не является администратором", admin_id);
            edit_or_send(bot, chat_id, message_id, NOT_ALLOWED.to_string(), None).await?;
            return Ok(());
        }
    }

    log::info!("Admin callback from {}: {}", admin_id, data);

    match data.as_str() {
        "admin_back" => {
            edit_or_send(
                bot,
                chat_id,
                message_id,
                "🔐 Панель администратора\n\nВыберите действие:".to_string(),
                Some(keyboards::admin_panel()),
            )
            .await?;
        }
        "admin_locate" => {
            let conn = get_connection(&deps.db_pool)?;
            let users = db::get_all_users(&conn)?;
            edit_or_send(
                bot,
                chat_id,
                message_id,
                "Выберите пользователя для просмотра местоположения:".to_string(),
                Some(keyboards::user_selector(&users, "locate_user")),
            )
            .await?;
        }
        "admin_requests" => {
            let pending = {
                let conn = get_connection(&deps.db_pool)?;
                timeoff::pending_timeoff_requests(&conn)?.len()
            };
            if pending == 0 {
                edit_or_send(bot, chat_id, message_id, "Нет заявок, ожидающих рассмотрения.".to_string(), None)
                    .await?;
            } else {
                edit_or_send(bot, chat_id, message_id, "Заявки, ожидающие рассмотрения:".to_string(), None).await?;
                timeoff_flow::show_pending_requests(bot, chat_id, deps).await?;
            }
        }
        "admin_report" => {
            edit_or_send(
                bot,
                chat_id,
                message_id,
                "Выберите дату для отчета:".to_string(),
                Some(keyboards::report_period_menu()),
            )
            .await?;
        }
        "report_date_today" | "report_date_yesterday" => {
            let date = if data == "report_date_today" {
                config::today_local()
            } else {
                config::today_local() - Duration::days(1)
            };
            deps.tracking.set_report_context(admin_id, ReportContext::Date(date));

            let conn = get_connection(&deps.db_pool)?;
            let users = db::get_all_users(&conn)?;
            edit_or_send(
                bot,
                chat_id,
                message_id,
                format!("Выберите пользователя для отчета за {}:", date),
                Some(keyboards::user_selector_with_back(&users, "report_user_date", "admin_report")),
            )
            .await?;
        }
        "report_date_week" => {
            let end = config::today_local();
            let start = end - Duration::days(6);
            deps.tracking
                .set_report_context(admin_id, ReportContext::Period { start, end });

            let conn = get_connection(&deps.db_pool)?;
            let users = db::get_all_users(&conn)?;
            edit_or_send(
                bot,
                chat_id,
                message_id,
                format!("Выберите пользователя для отчета за период {} - {}:", start, end),
                Some(keyboards::user_selector_with_back(&users, "report_user_week", "admin_report")),
            )
            .await?;
        }
        "report_date_custom" => {
            edit_or_send(
                bot,
                chat_id,
                message_id,
                "Для генерации отчета за определенную дату, пожалуйста, используйте команду:\n\
                 /report ГГГГ-ММ-ДД\n\nПример: /report 2025-05-01"
                    .to_string(),
                Some(keyboards::back_to("admin_report")),
            )
            .await?;
        }
        "admin_daily_reports" => {
            let conn = get_connection(&deps.db_pool)?;
            let users = db::get_all_users(&conn)?;
            edit_or_send(
                bot,
                chat_id,
                message_id,
                "Выберите пользователя для генерации отчета за сегодня:".to_string(),
                Some(keyboards::user_selector(&users, "daily_report_user")),
            )
            .await?;
        }
        "admin_timeoff_stats" => {
            edit_or_send(
                bot,
                chat_id,
                message_id,
                "Выберите период для просмотра статистики отгулов:".to_string(),
                Some(keyboards::timeoff_stats_periods()),
            )
            .await?;
        }
        "admin_users" => {
            edit_or_send(
                bot,
                chat_id,
                message_id,
                "👥 Управление пользователями\n\nВыберите действие:".to_string(),
                Some(keyboards::users_management_menu()),
            )
            .await?;
        }
        "admin_view_users" => {
            let conn = get_connection(&deps.db_pool)?;
            let users = db::all_users_with_latest_status(&conn)?;
            let mut text = "👥 Пользователи системы:\n\n".to_string();
            if users.is_empty() {
                text.push_str("Пока нет зарегистрированных пользователей.");
            }
            for user in &users {
                let status = user
                    .status
                    .as_deref()
                    .map(crate::core::status::display_status)
                    .unwrap_or_else(|| "статус не установлен".to_string());
                text.push_str(&format!("• {} (ID: {}) — {}\n", user.full_name, user.user_id, status));
            }
            edit_or_send(bot, chat_id, message_id, text, Some(keyboards::back_to("admin_users"))).await?;
        }
        "admin_add_user" => {
            deps.tracking.set_dialogue(admin_id, Dialogue::AddUserId);
            edit_or_send(
                bot,
                chat_id,
                message_id,
                "Введите Telegram ID нового пользователя (число).\n/cancel — отменить.".to_string(),
                None,
            )
            .await?;
        }
        "admin_delete_user" => {
            let conn = get_connection(&deps.db_pool)?;
            let users = db::get_all_users(&conn)?;
            edit_or_send(
                bot,
                chat_id,
                message_id,
                "Выберите пользователя для удаления:".to_string(),
                Some(keyboards::user_selector_with_back(&users, "delete_user", "admin_users")),
            )
            .await?;
        }
        "admin_change_rights" => {
            let conn = get_connection(&deps.db_pool)?;
            let users = db::get_all_users(&conn)?;
            edit_or_send(
                bot,
                chat_id,
                message_id,
                "Выберите пользователя для изменения прав:".to_string(),
                Some(keyboards::user_selector_with_back(&users, "rights_user", "admin_users")),
            )
            .await?;
        }
        _ => {
            if let Some(rest) = data.strip_prefix("timeoff_stats_period_") {
                let days: i64 = rest.parse().unwrap_or(30);
                let text = build_timeoff_stats_overview(deps, days)?;
                edit_or_send(
                    bot,
                    chat_id,
                    message_id,
                    text,
                    Some(keyboards::back_to("admin_timeoff_stats")),
                )
                .await?;
            } else if let Some(rest) = data.strip_prefix("locate_user_") {
                handle_locate_user(bot, chat_id, message_id, rest, deps).await?;
            } else if let Some(rest) = data.strip_prefix("confirm_delete_") {
                handle_confirm_delete(bot, chat_id, message_id, rest, deps).await?;
            } else if let Some(rest) = data.strip_prefix("delete_user_") {
                handle_delete_prompt(bot, chat_id, message_id, rest, deps).await?;
            } else if let Some(rest) = data.strip_prefix("rights_user_") {
                handle_rights_prompt(bot, chat_id, message_id, rest, deps).await?;
            } else if let Some(rest) = data.strip_prefix("grant_admin_") {
                handle_rights_change(bot, chat_id, message_id, rest, true, deps).await?;
            } else if let Some(rest) = data.strip_prefix("revoke_admin_") {
                handle_rights_change(bot, chat_id, message_id, rest, false, deps).await?;
            } else if let Some(rest) = data.strip_prefix("report_user_date_") {
                let date = match deps.tracking.report_context_of(admin_id) {
                    Some(ReportContext::Date(date)) => date,
                    _ => config::today_local(),
                };
                handle_report_for_user(bot, chat_id, message_id, rest, date, deps).await?;
            } else if let Some(rest) = data.strip_prefix("report_user_week_") {
                // TODO: report over the whole period instead of its last day
                let date = match deps.tracking.report_context_of(admin_id) {
                    Some(ReportContext::Period { end, .. }) => end,
                    _ => config::today_local(),
                };
                handle_report_for_user(bot, chat_id, message_id, rest, date, deps).await?;
            } else if let Some(rest) = data.strip_prefix("daily_report_user_") {
                handle_report_for_user(bot, chat_id, message_id, rest, config::today_local(), deps).await?;
            } else if let Some(rest) = data.strip_prefix("report_user_") {
                handle_report_for_user(bot, chat_id, message_id, rest, config::today_local(), deps).await?;
            } else {
                log::warn!("Неизвестная команда callback: {}", data);
                edit_or_send(
                    bot,
                    chat_id,
                    message_id,
                    "Неизвестная команда. Пожалуйста, повторите действие.".to_string(),
                    None,
                )
                .await?;
            }
        }
    }

    Ok(())
}

/// Add-user dialogue: ID → name → admin flag.
pub async fn handle_add_user_dialogue(
    bot: &Bot,
    msg: &Message,
    dialogue: Dialogue,
    text: &str,
    deps: &HandlerDeps,
) -> Result<(), HandlerError> {
    let admin_chat = msg.chat.id;
    let admin_id = admin_chat.0;

    match dialogue {
        Dialogue::AddUserId => match text.trim().parse::<i64>() {
            Ok(user_id) => {
                deps.tracking.set_dialogue(admin_id, Dialogue::AddUserName { user_id });
                bot.send_message(admin_chat, format!("ID: {}. Теперь введите полное имя пользователя:", user_id))
                    .await?;
            }
            Err(_) => {
                bot.send_message(admin_chat, "Некорректный ID. Введите число или /cancel.")
                    .await?;
            }
        },
        Dialogue::AddUserName { user_id } => {
            let full_name = text.trim().to_string();
            if full_name.is_empty() {
                bot.send_message(admin_chat, "Имя не может быть пустым. Введите имя или /cancel.")
                    .await?;
                return Ok(());
            }
            deps.tracking
                .set_dialogue(admin_id, Dialogue::AddUserAdmin { user_id, full_name });
            bot.send_message(admin_chat, "Сделать пользователя администратором? (да/нет)")
                .await?;
        }
        Dialogue::AddUserAdmin { user_id, full_name } => {
            let answer = text.trim().to_lowercase();
            let is_admin = matches!(answer.as_str(), "да" | "yes" | "y" | "д");
            deps.tracking.clear_dialogue(admin_id);

            let conn = get_connection(&deps.db_pool)?;
            db::upsert_user(&conn, user_id, &full_name, Some(is_admin))?;
            log::info!(
                "Admin {} added user {} ({}), admin: {}",
                admin_id,
                full_name,
                user_id,
                is_admin
            );
            bot.send_message(
                admin_chat,
                format!(
                    "✅ Пользователь {} (ID: {}) добавлен{}.",
                    full_name,
                    user_id,
                    if is_admin { " с правами администратора" } else { "" }
                ),
            )
            .await?;
        }
        // The time-off dialogue is routed to the timeoff module before
        // this function is reached
        Dialogue::TimeoffReason => {
            log::warn!("Time-off dialogue reached the add-user handler for chat {}", admin_id);
        }
    }

    Ok(())
}

async fn handle_locate_user(
    bot: &Bot,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    raw_id: &str,
    deps: &HandlerDeps,
) -> Result<(), HandlerError> {
    let Ok(user_id) = raw_id.parse::<i64>() else {
        edit_or_send(bot, chat_id, message_id, "Ошибка: некорректный формат ID пользователя".to_string(), None)
            .await?;
        return Ok(());
    };

    let conn = get_connection(&deps.db_pool)?;
    let user_name = db::get_user_name(&conn, user_id)?.unwrap_or_else(|| format!("Пользователь {}", user_id));
    // Only positions from the last 24 hours are worth showing
    let cutoff = (config::now_local() - Duration::hours(24))
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();
    let latest = locations::locations_since(&conn, user_id, &cutoff)?.pop();
    drop(conn);

    let Some(latest) = latest else {
        edit_or_send(
            bot,
            chat_id,
            message_id,
            format!("Нет данных о местоположении для {} за последние 24 часа.", user_name),
            None,
        )
        .await?;
        return Ok(());
    };

    let time_str = parse_timestamp(&latest.timestamp)
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| latest.timestamp.clone());

    let text = format!(
        "📍 Последнее местоположение для {}:\n\
         • Широта: {:.6}\n• Долгота: {:.6}\n• Время: {}\n• Тип: {}\n\n\
         <a href=\"https://maps.google.com/maps?q={:.6},{:.6}\">Смотреть на Google Maps</a>",
        user_name, latest.latitude, latest.longitude, time_str, latest.location_type, latest.latitude, latest.longitude
    );

    match message_id {
        Some(message_id) => {
            bot.edit_message_text(chat_id, message_id, text)
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboards::locate_actions(user_id))
                .await?;
        }
        None => {
            bot.send_message(chat_id, text)
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboards::locate_actions(user_id))
                .await?;
        }
    }

    log::info!("Sent last location of user {} to admin", user_name);
    Ok(())
}

async fn handle_delete_prompt(
    bot: &Bot,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    raw_id: &str,
    deps: &HandlerDeps,
) -> Result<(), HandlerError> {
    let Ok(user_id) = raw_id.parse::<i64>() else {
        return Ok(());
    };
    let conn = get_connection(&deps.db_pool)?;
    let user_name = db::get_user_name(&conn, user_id)?.unwrap_or_else(|| format!("Пользователь {}", user_id));

    edit_or_send(
        bot,
        chat_id,
        message_id,
        format!(
            "Удалить пользователя {} (ID: {})?\nБудут удалены все его статусы, координаты и заявки.",
            user_name, user_id
        ),
        Some(keyboards::confirm_delete(user_id)),
    )
    .await?;
    Ok(())
}

async fn handle_confirm_delete(
    bot: &Bot,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    raw_id: &str,
    deps: &HandlerDeps,
) -> Result<(), HandlerError> {
    let Ok(user_id) = raw_id.parse::<i64>() else {
        return Ok(());
    };
    let mut conn = get_connection(&deps.db_pool)?;
    let deleted = db::delete_user(&mut conn, user_id)?;

    let text = if deleted {
        log::info!("User {} deleted by admin", user_id);
        format!("✅ Пользователь {} удален.", user_id)
    } else {
        format!("Пользователь {} не найден.", user_id)
    };
    edit_or_send(bot, chat_id, message_id, text, Some(keyboards::back_to("admin_users"))).await?;
    Ok(())
}

async fn handle_rights_prompt(
    bot: &Bot,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    raw_id: &str,
    deps: &HandlerDeps,
) -> Result<(), HandlerError> {
    let Ok(user_id) = raw_id.parse::<i64>() else {
        return Ok(());
    };
    let conn = get_connection(&deps.db_pool)?;
    let Some(user) = db::get_user(&conn, user_id)? else {
        edit_or_send(bot, chat_id, message_id, "Пользователь не найден.".to_string(), None).await?;
        return Ok(());
    };

    let (action_text, action_data) = if user.is_admin {
        ("🔽 Снять права администратора", format!("revoke_admin_{}", user_id))
    } else {
        ("🔼 Назначить администратором", format!("grant_admin_{}", user_id))
    };

    let markup = teloxide::types::InlineKeyboardMarkup::new(vec![
        vec![teloxide::types::InlineKeyboardButton::callback(action_text, action_data)],
        vec![teloxide::types::InlineKeyboardButton::callback("🔙 Назад", "admin_users".to_string())],
    ]);

    edit_or_send(
        bot,
        chat_id,
        message_id,
        format!(
            "Пользователь {} (ID: {})\nТекущие права: {}",
            user.full_name,
            user.user_id,
            if user.is_admin { "администратор" } else { "сотрудник" }
        ),
        Some(markup),
    )
    .await?;
    Ok(())
}

async fn handle_rights_change(
    bot: &Bot,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    raw_id: &str,
    grant: bool,
    deps: &HandlerDeps,
) -> Result<(), HandlerError> {
    let Ok(user_id) = raw_id.parse::<i64>() else {
        return Ok(());
    };
    let conn = get_connection(&deps.db_pool)?;
    let updated = db::set_admin_flag(&conn, user_id, grant)?;

    let text = if updated {
        log::info!("Admin status for user {} set to {}", user_id, grant);
        if grant {
            format!("✅ Пользователю {} присвоен статус администратора.", user_id)
        } else {
            format!("✅ Статус администратора снят с пользователя {}.", user_id)
        }
    } else {
        format!("Пользователь {} не найден.", user_id)
    };
    edit_or_send(bot, chat_id, message_id, text, Some(keyboards::back_to("admin_users"))).await?;
    Ok(())
}

/// Generate and send the report + map for one user and date.
async fn handle_report_for_user(
    bot: &Bot,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    raw_id: &str,
    date: NaiveDate,
    deps: &HandlerDeps,
) -> Result<(), HandlerError> {
    let Ok(user_id) = raw_id.parse::<i64>() else {
        edit_or_send(
            bot,
            chat_id,
            message_id,
            format!("Ошибка: некорректный ID пользователя ({})", raw_id),
            None,
        )
        .await?;
        return Ok(());
    };

    let conn = get_connection(&deps.db_pool)?;
    let user_name = db::get_user_name(&conn, user_id)?.unwrap_or_else(|| format!("Пользователь {}", user_id));

    edit_or_send(
        bot,
        chat_id,
        message_id,
        format!("Генерация отчета для {} за {}...", user_name, date),
        None,
    )
    .await?;

    match report::generate_for_user(&conn, user_id, date) {
        Ok(generated) => {
            drop(conn);
            send_report_files(bot, chat_id, &generated, date).await?;
            bot.send_message(chat_id, format!("Отчет для {} сгенерирован и отправлен.", user_name))
                .await?;
        }
        Err(e) => {
            log::error!("Failed to generate report for {}: {}", user_id, e);
            bot.send_message(
                chat_id,
                format!("Не удалось сгенерировать отчет для {}: {}", user_name, e),
            )
            .await?;
        }
    }

    Ok(())
}

/// Send the generated CSV and map as documents.
pub async fn send_report_files(
    bot: &Bot,
    chat_id: ChatId,
    generated: &report::GeneratedReport,
    date: NaiveDate,
) -> Result<(), HandlerError> {
    bot.send_document(
        chat_id,
        InputFile::file(generated.csv_path.clone())
            .file_name(format!("report_{}_{}.csv", generated.user_name, date.format("%Y-%m-%d"))),
    )
    .caption(format!("📊 Отчет для {} ({})", generated.user_name, date.format("%Y-%m-%d")))
    .await?;

    bot.send_document(
        chat_id,
        InputFile::file(generated.map_path.clone())
            .file_name(format!("map_{}_{}.html", generated.user_name, date.format("%Y-%m-%d"))),
    )
    .caption(format!(
        "🗺️ Карта перемещений {} ({})",
        generated.user_name,
        date.format("%Y-%m-%d")
    ))
    .await?;

    Ok(())
}

/// Aggregated time-off statistics across all users for a period.
fn build_timeoff_stats_overview(deps: &HandlerDeps, days: i64) -> Result<String, HandlerError> {
    let conn = get_connection(&deps.db_pool)?;
    let users = db::get_all_users(&conn)?;

    if users.is_empty() {
        return Ok("Нет доступных пользователей для просмотра статистики отгулов.".to_string());
    }

    let period_text = if days < 365 {
        format!("за последние {} дней", days)
    } else {
        "за всё время".to_string()
    };
    let mut message = format!("📊 Статистика запросов на отгул {}\n\n", period_text);

    let mut total = timeoff::TimeoffStats::default();
    let mut per_user = Vec::new();

    for user in &users {
        let stats = timeoff::timeoff_stats(&conn, user.user_id, days)?;
        if stats.total > 0 {
            total.total += stats.total;
            total.approved += stats.approved;
            total.rejected += stats.rejected;
            total.pending += stats.pending;
            per_user.push((user.full_name.clone(), stats));
        }
    }

    message.push_str(&format!(
        "Общая статистика:\n📑 Всего запросов: {}\n✅ Одобрено: {}\n❌ Отклонено: {}\n⏳ Ожидает рассмотрения: {}\n\n",
        total.total, total.approved, total.rejected, total.pending
    ));

    if per_user.is_empty() {
        message.push_str("Нет запросов на отгул за указанный период.");
    } else {
        message.push_str("Статистика по пользователям:\n");
        for (name, stats) in per_user {
            message.push_str(&format!(
                "👤 {}:\n  - Всего: {}, Одобрено: {}, Отклонено: {}, Ожидает: {}\n",
                name, stats.total, stats.approved, stats.rejected, stats.pending
            ));
        }
    }

    Ok(message)
}

/// Edit the originating message when possible, otherwise send a new one.
async fn edit_or_send(
    bot: &Bot,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    text: String,
    markup: Option<teloxide::types::InlineKeyboardMarkup>,
) -> Result<(), HandlerError> {
    match (message_id, markup) {
        (Some(message_id), Some(markup)) => {
            bot.edit_message_text(chat_id, message_id, text)
                .reply_markup(markup)
                .await?;
        }
        (Some(message_id), None) => {
            bot.edit_message_text(chat_id, message_id, text).await?;
        }
        (None, Some(markup)) => {
            bot.send_message(chat_id, text).reply_markup(markup).await?;
        }
        (None, None) => {
            bot.send_message(chat_id, text).await?;
        }
    }
    Ok(())
}
