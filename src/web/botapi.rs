//! Thin Telegram Bot API client for webhook management.
//!
//! The bot itself talks through teloxide; these direct calls exist for the
//! dashboard, which shows and mutates webhook state even when the
//! dispatcher is running in polling mode.

use serde::Deserialize;

use crate::core::config;

/// Subset of getWebhookInfo the dashboard displays.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookInfo {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub pending_update_count: i64,
    #[serde(default)]
    pub last_error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

fn api_url(method: &str) -> String {
    format!("https://api.telegram.org/bot{}/{}", config::BOT_TOKEN.as_str(), method)
}

/// getWebhookInfo
pub async fn get_webhook_info(client: &reqwest::Client) -> anyhow::Result<WebhookInfo> {
    let response: ApiResponse<WebhookInfo> = client.get(api_url("getWebhookInfo")).send().await?.json().await?;
    match (response.ok, response.result) {
        (true, Some(info)) => Ok(info),
        _ => anyhow::bail!(
            "getWebhookInfo failed: {}",
            response.description.unwrap_or_else(|| "unknown error".to_string())
        ),
    }
}

/// setWebhook with the given public URL.
pub async fn set_webhook(client: &reqwest::Client, webhook_url: &str) -> anyhow::Result<()> {
    let response: ApiResponse<bool> = client
        .get(api_url("setWebhook"))
        .query(&[("url", webhook_url)])
        .send()
        .await?
        .json()
        .await?;
    if response.ok {
        Ok(())
    } else {
        anyhow::bail!(
            "setWebhook failed: {}",
            response.description.unwrap_or_else(|| "unknown error".to_string())
        )
    }
}

/// deleteWebhook, optionally dropping queued updates.
pub async fn delete_webhook(client: &reqwest::Client, drop_pending: bool) -> anyhow::Result<()> {
    let response: ApiResponse<bool> = client
        .get(api_url("deleteWebhook"))
        .query(&[("drop_pending_updates", if drop_pending { "true" } else { "false" })])
        .send()
        .await?
        .json()
        .await?;
    if response.ok {
        Ok(())
    } else {
        anyhow::bail!(
            "deleteWebhook failed: {}",
            response.description.unwrap_or_else(|| "unknown error".to_string())
        )
    }
}
