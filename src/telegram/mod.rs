//! Telegram bot: commands, keyboards, handlers and per-user state.

pub mod admin;
pub mod bot;
pub mod handlers;
pub mod keyboards;
pub mod location;
pub mod notifications;
pub mod status;
pub mod timeoff;
pub mod tracking;

pub use bot::{create_bot, setup_bot_commands, Command};
pub use handlers::{schema, HandlerDeps, HandlerError};
pub use teloxide::Bot;
pub use tracking::TrackingState;
