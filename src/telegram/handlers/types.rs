//! Handler types and dependencies.

use std::sync::Arc;

use crate::storage::db::DbPool;
use crate::telegram::tracking::TrackingState;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub db_pool: Arc<DbPool>,
    pub tracking: Arc<TrackingState>,
}

impl HandlerDeps {
    pub fn new(db_pool: Arc<DbPool>, tracking: Arc<TrackingState>) -> Self {
        Self { db_pool, tracking }
    }
}

/// Display name for a user: registered full name, else the Telegram first
/// name, else "Пользователь <id>".
pub fn display_name(conn: &rusqlite::Connection, user_id: i64, first_name: Option<&str>) -> String {
    match crate::storage::db::get_user_name(conn, user_id) {
        Ok(Some(name)) => name,
        _ => first_name
            .map(|n| n.to_string())
            .unwrap_or_else(|| format!("Пользователь {}", user_id)),
    }
}
