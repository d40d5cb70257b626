//! User-facing command implementations.

use teloxide::prelude::*;

use crate::storage::db;
use crate::storage::get_connection;
use crate::telegram::bot::help_text;
use crate::telegram::handlers::types::{HandlerDeps, HandlerError};
use crate::telegram::keyboards;
use crate::telegram::Bot;

/// `/start`: welcome message with the status keyboard. Unregistered users
/// are told their ID so the admin can add them.
pub async fn handle_start(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let user_id = msg.chat.id.0;
    let from = msg.from.as_ref();
    log::info!(
        "New /start: {} ({})",
        user_id,
        from.and_then(|u| u.username.as_deref()).unwrap_or("No username")
    );

    let conn = get_connection(&deps.db_pool)?;
    let user_name = db::get_user_name(&conn, user_id)?;
    let is_admin = db::is_admin(&conn, user_id);
    drop(conn);

    let welcome = match user_name {
        Some(name) => format!(
            "Здравствуйте, {}! Добро пожаловать в систему отслеживания статуса и геолокации.\n\n\
             📍 Как включить трансляцию геолокации:\n\
             1. Нажмите на скрепку 📎 (вложение) справа от поля ввода сообщения\n\
             2. Выберите 'Геопозиция' 📍\n\
             3. Нажмите 'Транслировать геопозицию' и выберите время трансляции\n\
             4. Нажмите 'Поделиться'\n\n\
             ❗️ Важно: если вы закрыли чат с ботом, трансляция может прерваться. \
             При необходимости повторите шаги для возобновления трансляции.\n\n\
             Используйте кнопки ниже для установки вашего статуса.",
            name
        ),
        None => format!(
            "Здравствуйте, {}! Добро пожаловать в систему отслеживания статуса и геолокации.\n\n\
             Ваш ID: {}\n\
             ⚠️ Обратитесь к администратору для добавления вас в систему.",
            from.map(|u| u.first_name.as_str()).unwrap_or("коллега"),
            user_id
        ),
    };

    bot.send_message(msg.chat.id, welcome)
        .reply_markup(keyboards::status_keyboard(is_admin))
        .await?;
    Ok(())
}

/// `/help`
pub async fn handle_help(bot: &Bot, msg: &Message) -> Result<(), HandlerError> {
    bot.send_message(msg.chat.id, help_text()).await?;
    Ok(())
}

/// `/status`: re-show the status keyboard.
pub async fn handle_status_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let conn = get_connection(&deps.db_pool)?;
    let is_admin = db::is_admin(&conn, msg.chat.id.0);
    drop(conn);

    bot.send_message(msg.chat.id, "Выберите ваш статус:")
        .reply_markup(keyboards::status_keyboard(is_admin))
        .await?;
    Ok(())
}
