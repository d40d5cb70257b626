//! Bot instance creation and the command vocabulary.

use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::core::config;
use crate::telegram::Bot;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "snake_case", description = "Команды бота:")]
pub enum Command {
    #[command(description = "начать работу с ботом")]
    Start,
    #[command(description = "показать справку")]
    Help,
    #[command(description = "установить статус")]
    Status,
    #[command(description = "запросить отгул/отпуск")]
    Request,
    #[command(description = "посмотреть мои заявки")]
    Myrequests,
    #[command(description = "статистика по отгулам")]
    TimeoffStats(String),
    #[command(description = "отменить текущую операцию")]
    Cancel,
    #[command(description = "панель администратора (только для администратора)")]
    Admin,
    #[command(description = "найти сотрудника (только для администратора)")]
    Locate,
    #[command(description = "просмотр ожидающих заявок (только для администратора)")]
    Requests,
    #[command(description = "сформировать отчет за дату (только для администратора)")]
    Report(String),
    #[command(description = "запустить отправку ежедневных отчетов (только для администратора)")]
    GenerateReports,
}

/// Creates a Bot instance with the configured token.
pub fn create_bot() -> anyhow::Result<Bot> {
    let token = config::BOT_TOKEN.clone();
    if token.is_empty() {
        anyhow::bail!("TELEGRAM_TOKEN environment variable not set");
    }
    let client = ClientBuilder::new().timeout(config::network::timeout()).build()?;
    Ok(Bot::with_client(token, client))
}

/// Registers the user-visible command list in the Telegram UI.
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    use teloxide::types::BotCommand;

    bot.set_my_commands(vec![
        BotCommand::new("start", "начать работу с ботом"),
        BotCommand::new("help", "показать справку"),
        BotCommand::new("status", "установить статус"),
        BotCommand::new("request", "запросить отгул/отпуск"),
        BotCommand::new("myrequests", "посмотреть мои заявки"),
        BotCommand::new("timeoff_stats", "статистика по отгулам"),
        BotCommand::new("cancel", "отменить текущую операцию"),
    ])
    .await?;

    Ok(())
}

/// Help text mirroring the command list.
pub fn help_text() -> String {
    "🤖 Команды бота 🤖\n\n\
     /start - Начать работу с ботом\n\
     /help - Показать это сообщение\n\
     /status - Установить статус\n\
     /request - Запросить отгул/отпуск\n\
     /myrequests - Посмотреть мои заявки\n\
     /timeoff_stats - Статистика по отгулам\n\
     /cancel - Отменить текущую операцию\n\n\
     🔸 Для администраторов 🔸\n\
     /admin - Панель администратора\n\
     /locate - Найти сотрудника\n\
     /requests - Просмотр ожидающих заявок\n\
     /report - Сформировать отчет\n\
     /generate_reports - Запустить отправку ежедневных отчетов\n"
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_descriptions_cover_key_commands() {
        let descriptions = Command::descriptions().to_string();
        assert!(descriptions.contains("start"));
        assert!(descriptions.contains("timeoff_stats"));
        assert!(descriptions.contains("generate_reports"));
    }

    #[test]
    fn help_lists_admin_commands() {
        let help = help_text();
        assert!(help.contains("/locate"));
        assert!(help.contains("/generate_reports"));
    }
}
