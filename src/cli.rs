//! Command-line interface.

use clap::{Parser, Subcommand};

/// Employee status and location tracker bot
#[derive(Parser, Debug)]
#[command(name = "worktrack", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the bot (default). Mode comes from BOT_MODE unless overridden.
    Run {
        /// Force webhook mode regardless of BOT_MODE
        #[arg(long)]
        webhook: bool,
    },
    /// Create the database schema and exit
    InitDb,
    /// Generate the report and map for one user and date, then exit
    Report {
        /// Telegram user ID
        #[arg(long)]
        user: i64,
        /// Report date, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Delete any registered webhook (drops pending updates) and exit
    DeleteWebhook,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_webhook_flag() {
        let cli = Cli::parse_from(["worktrack", "run", "--webhook"]);
        assert!(matches!(cli.command, Some(Commands::Run { webhook: true })));
    }

    #[test]
    fn no_subcommand_defaults_to_none() {
        let cli = Cli::parse_from(["worktrack"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_report_command() {
        let cli = Cli::parse_from(["worktrack", "report", "--user", "42", "--date", "2025-05-01"]);
        match cli.command {
            Some(Commands::Report { user, date }) => {
                assert_eq!(user, 42);
                assert_eq!(date.as_deref(), Some("2025-05-01"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
