//! Dispatcher schema and handler chain builders

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use super::commands::{handle_help, handle_start, handle_status_command};
use super::types::{HandlerDeps, HandlerError};
use crate::core::status::Status;
use crate::storage::db;
use crate::storage::get_connection;
use crate::telegram::admin;
use crate::telegram::bot::Command;
use crate::telegram::keyboards::{ADMIN_PANEL_BUTTON, TIMEOFF_BUTTON};
use crate::telegram::location::handle_location;
use crate::telegram::status::handle_status_button;
use crate::telegram::timeoff;
use crate::telegram::tracking::Dialogue;
use crate::telegram::Bot;

/// Creates the main dispatcher schema for the Telegram bot.
///
/// The same tree is used in production and in integration tests.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_commands = deps.clone();
    let deps_status = deps.clone();
    let deps_timeoff_button = deps.clone();
    let deps_panel = deps.clone();
    let deps_dialogue = deps.clone();
    let deps_location = deps.clone();
    let deps_live = deps.clone();
    let deps_callback = deps.clone();

    dptree::entry()
        // Commands first so /cancel works even inside a dialogue
        .branch(command_handler(deps_commands))
        // Status reply-keyboard buttons
        .branch(status_button_handler(deps_status))
        // Time-off request button
        .branch(timeoff_button_handler(deps_timeoff_button))
        // Admin panel button
        .branch(admin_panel_button_handler(deps_panel))
        // Location messages (initial share)
        .branch(location_handler(deps_location))
        // Live location updates arrive as edited messages
        .branch(live_location_handler(deps_live))
        // Free-text replies that complete a dialogue
        .branch(dialogue_handler(deps_dialogue))
        // Inline keyboard callbacks
        .branch(callback_handler(deps_callback))
}

/// Handler for bot commands (/start, /status, /report, etc.)
fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                log::info!("🎯 Received command: {:?} from chat {}", cmd, msg.chat.id);
                let user_id = msg.chat.id.0;

                match cmd {
                    Command::Start => handle_start(&bot, &msg, &deps).await?,
                    Command::Help => handle_help(&bot, &msg).await?,
                    Command::Status => handle_status_command(&bot, &msg, &deps).await?,
                    Command::Request => timeoff::start_timeoff_request(&bot, &msg, &deps).await?,
                    Command::Myrequests => timeoff::show_my_requests(&bot, &msg, &deps).await?,
                    Command::TimeoffStats(args) => timeoff::show_timeoff_stats(&bot, &msg, &args, &deps).await?,
                    Command::Cancel => timeoff::cancel_dialogue(&bot, &msg, &deps).await?,
                    Command::Admin => admin::show_admin_panel(&bot, msg.chat.id, user_id, &deps).await?,
                    Command::Locate => admin::show_locate_selector(&bot, msg.chat.id, user_id, &deps).await?,
                    Command::Requests => {
                        let is_admin = {
                            let conn = get_connection(&deps.db_pool)?;
                            db::is_admin(&conn, user_id)
                        };
                        if is_admin {
                            timeoff::show_pending_requests(&bot, msg.chat.id, &deps).await?;
                        } else {
                            bot.send_message(msg.chat.id, "У вас нет прав для выполнения этого действия.")
                                .await?;
                        }
                    }
                    Command::Report(args) => {
                        admin::handle_report_command(&bot, msg.chat.id, user_id, &args, &deps).await?
                    }
                    Command::GenerateReports => {
                        let is_admin = {
                            let conn = get_connection(&deps.db_pool)?;
                            db::is_admin(&conn, user_id)
                        };
                        if !is_admin {
                            bot.send_message(msg.chat.id, "У вас нет прав для выполнения этого действия.")
                                .await?;
                            return Ok(());
                        }
                        bot.send_message(msg.chat.id, "Запущена генерация ежедневных отчетов...")
                            .await?;
                        match crate::scheduler::daily_report::generate_and_send_all(&bot, &deps.db_pool).await {
                            Ok(count) => {
                                bot.send_message(
                                    msg.chat.id,
                                    format!("✅ Отчеты сгенерированы и отправлены ({} пользователей).", count),
                                )
                                .await?;
                            }
                            Err(e) => {
                                log::error!("Forced daily report failed: {}", e);
                                bot.send_message(msg.chat.id, format!("❌ Ошибка при генерации отчетов: {}", e))
                                    .await?;
                            }
                        }
                    }
                }
                Ok(())
            }
        },
    ))
}

/// Handler for status reply-keyboard presses
fn status_button_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.text().and_then(Status::from_label).is_some())
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                let Some(status) = msg.text().and_then(Status::from_label) else {
                    return Ok(());
                };
                if let Err(e) = handle_status_button(&bot, &msg, status, &deps).await {
                    log::error!("Status handler failed for chat {}: {}", msg.chat.id, e);
                }
                Ok(())
            }
        })
}

/// Handler for the 📝 time-off button
fn timeoff_button_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.text() == Some(TIMEOFF_BUTTON))
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                timeoff::start_timeoff_request(&bot, &msg, &deps).await?;
                Ok(())
            }
        })
}

/// Handler for the admin panel button
fn admin_panel_button_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.text() == Some(ADMIN_PANEL_BUTTON))
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                admin::show_admin_panel(&bot, msg.chat.id, msg.chat.id.0, &deps).await?;
                Ok(())
            }
        })
}

/// Handler for location messages
fn location_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.location().is_some())
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                let Some(location) = msg.location().cloned() else {
                    return Ok(());
                };
                if let Err(e) = handle_location(&bot, &msg, &location, false, &deps).await {
                    log::error!("Location handler failed for chat {}: {}", msg.chat.id, e);
                }
                Ok(())
            }
        })
}

/// Handler for live-location updates (edited messages)
fn live_location_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_edited_message()
        .filter(|msg: Message| msg.location().is_some())
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                let Some(location) = msg.location().cloned() else {
                    return Ok(());
                };
                log::info!("Получено обновление живой геолокации от чата {}", msg.chat.id);
                if let Err(e) = handle_location(&bot, &msg, &location, true, &deps).await {
                    log::error!("Live location handler failed for chat {}: {}", msg.chat.id, e);
                }
                Ok(())
            }
        })
}

/// Handler for free-text dialogue replies
fn dialogue_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_filter = deps.clone();
    Update::filter_message()
        .filter(move |msg: Message| {
            msg.text().is_some() && deps_filter.tracking.dialogue_of(msg.chat.id.0).is_some()
        })
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                let Some(text) = msg.text().map(|t| t.to_string()) else {
                    return Ok(());
                };
                let Some(dialogue) = deps.tracking.dialogue_of(msg.chat.id.0) else {
                    return Ok(());
                };

                match dialogue {
                    Dialogue::TimeoffReason => {
                        deps.tracking.clear_dialogue(msg.chat.id.0);
                        timeoff::process_timeoff_reason(&bot, &msg, &text, &deps).await?;
                    }
                    other => {
                        admin::handle_add_user_dialogue(&bot, &msg, other, &text, &deps).await?;
                    }
                }
                Ok(())
            }
        })
}

/// Handler for callback queries (inline keyboard buttons)
fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move {
            let data = q.data.clone().unwrap_or_default();

            if data.starts_with("approve_timeoff_") || data.starts_with("reject_timeoff_") {
                let admin_id = i64::try_from(q.from.id.0).unwrap_or(0);
                let chat_id = q.message.as_ref().map(|m| m.chat().id);
                let message_id = q.message.as_ref().map(|m| m.id());
                bot.answer_callback_query(q.id.clone()).await?;

                let is_admin = {
                    let conn = get_connection(&deps.db_pool)?;
                    db::is_admin(&conn, admin_id)
                };
                if let Some(chat_id) = chat_id {
                    if is_admin {
                        timeoff::handle_timeoff_decision(&bot, admin_id, chat_id, message_id, &data, &deps).await?;
                    } else if let Some(message_id) = message_id {
                        bot.edit_message_text(chat_id, message_id, "У вас нет прав для выполнения этого действия.")
                            .await?;
                    }
                }
                return Ok(());
            }

            if let Err(e) = admin::handle_admin_callback(&bot, &q, &deps).await {
                log::error!("Admin callback failed: {}", e);
            }
            Ok(())
        }
    })
}
