use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Bot token
/// Read from TELEGRAM_TOKEN or TELEGRAM_BOT_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("TELEGRAM_TOKEN")
        .or_else(|_| env::var("TELEGRAM_BOT_TOKEN"))
        .unwrap_or_else(|_| String::new())
});

/// Update delivery mode: "polling" (default) or "webhook"
pub static BOT_MODE: Lazy<String> =
    Lazy::new(|| env::var("BOT_MODE").unwrap_or_else(|_| "polling".to_string()).to_lowercase());

/// Public HTTPS base URL Telegram pushes updates to in webhook mode
/// Read from WEBHOOK_URL environment variable; the /webhook path is appended
pub static WEBHOOK_URL: Lazy<Option<String>> = Lazy::new(|| {
    env::var("WEBHOOK_URL").ok().and_then(|value| {
        let trimmed = value.trim().trim_end_matches('/').to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
});

/// Local port the webhook listener binds to
/// Read from PORT environment variable
/// Default: 5001
pub static PORT: Lazy<u16> = Lazy::new(|| env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(5001));

/// Port for the admin web dashboard
/// Read from WEB_PORT environment variable
/// Default: 5000
pub static WEB_PORT: Lazy<u16> = Lazy::new(|| env::var("WEB_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(5000));

/// Database file path
/// Read from DATABASE_PATH environment variable
/// Default: tracker.db
pub static DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("DATABASE_PATH").unwrap_or_else(|_| "tracker.db".to_string()));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: bot_log.txt
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "bot_log.txt".to_string()));

/// Directory report and map artifacts are written to
/// Read from REPORTS_DIR environment variable
/// Default: current directory
pub static REPORTS_DIR: Lazy<String> = Lazy::new(|| env::var("REPORTS_DIR").unwrap_or_else(|_| ".".to_string()));

/// Single-instance lock file path
/// Read from PID_FILE environment variable
/// Default: bot.pid
pub static PID_FILE: Lazy<String> = Lazy::new(|| env::var("PID_FILE").unwrap_or_else(|_| "bot.pid".to_string()));

/// Timezone all user-facing timestamps and schedule windows are evaluated in
/// Read from TZ_NAME environment variable (IANA name)
/// Default: Europe/Moscow
pub static TZ: Lazy<Tz> = Lazy::new(|| {
    let name = env::var("TZ_NAME").unwrap_or_else(|_| "Europe/Moscow".to_string());
    name.parse().unwrap_or(chrono_tz::Europe::Moscow)
});

/// Current time in the configured timezone.
pub fn now_local() -> DateTime<Tz> {
    Utc::now().with_timezone(&*TZ)
}

/// Today's date in the configured timezone.
pub fn today_local() -> NaiveDate {
    now_local().date_naive()
}

/// Admin configuration
pub mod admin {
    use once_cell::sync::Lazy;
    use std::env;

    fn parse_admin_ids(raw: &str) -> Vec<i64> {
        raw.split([',', ' ', '\n', '\t'])
            .filter_map(|part| part.trim().parse::<i64>().ok())
            .collect()
    }

    /// Additional admin user IDs (comma-separated)
    /// Read from ADMIN_IDS environment variable
    pub static ADMIN_IDS: Lazy<Vec<i64>> = Lazy::new(|| {
        env::var("ADMIN_IDS")
            .ok()
            .map(|raw| parse_admin_ids(&raw))
            .unwrap_or_default()
    });

    /// Primary admin chat for notifications and reports
    /// Read from ADMIN_ID or fallback to first ADMIN_IDS entry
    /// Defaults to 0 if not set (admin notifications disabled)
    pub static ADMIN_ID: Lazy<i64> = Lazy::new(|| {
        env::var("ADMIN_ID")
            .ok()
            .and_then(|s| s.parse().ok())
            .or_else(|| ADMIN_IDS.first().copied())
            .unwrap_or(0)
    });

    /// Returns true when the ID is listed in the environment admin set.
    pub fn is_env_admin(user_id: i64) -> bool {
        (*ADMIN_ID != 0 && user_id == *ADMIN_ID) || ADMIN_IDS.contains(&user_id)
    }
}

/// Morning check configuration
pub mod morning {
    use super::Duration;

    /// Window start, local time
    pub const CHECK_START: (u32, u32) = (8, 30);

    /// Window end, local time
    pub const CHECK_END: (u32, u32) = (10, 0);

    /// Interval between sweep runs (in seconds)
    pub const SWEEP_INTERVAL_SECS: u64 = 600;

    pub fn sweep_interval() -> Duration {
        Duration::from_secs(SWEEP_INTERVAL_SECS)
    }
}

/// Daily report configuration
pub mod report {
    /// Local time the daily report job fires at
    pub const DAILY_REPORT_TIME: (u32, u32) = (17, 30);

    /// A tick inside this many minutes past the report time still fires
    pub const WINDOW_MINUTES: u32 = 5;
}

/// Live location tracking configuration
pub mod tracking {
    use super::Duration;

    /// Movement below this distance counts as standing still (meters)
    pub const STATIONARY_RADIUS_M: f64 = 10.0;

    /// Stationary time before a point is classified as 'stationary' (seconds)
    pub const STATIONARY_AFTER_SECS: f64 = 300.0;

    /// Stationary time before the admin is warned (seconds)
    pub const ADMIN_WARN_AFTER_SECS: f64 = 1800.0;

    /// Interval between live-location flushes to the database (in seconds)
    pub const FLUSH_INTERVAL_SECS: u64 = 300;

    /// A session without points for this long is asked to re-share (seconds)
    pub const STALE_SESSION_SECS: i64 = 3600;

    pub fn flush_interval() -> Duration {
        Duration::from_secs(FLUSH_INTERVAL_SECS)
    }
}

/// User activity monitoring configuration
pub mod activity {
    use super::Duration;

    /// Interval between activity checks (in seconds)
    pub const CHECK_INTERVAL_SECS: u64 = 300;

    /// Silence threshold before the admin is warned (seconds)
    pub const INACTIVITY_SECS: i64 = 1800;

    /// Minimum gap between repeated warnings for the same user (seconds)
    pub const NOTIFY_THROTTLE_SECS: i64 = 3600;

    pub fn check_interval() -> Duration {
        Duration::from_secs(CHECK_INTERVAL_SECS)
    }
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for Bot API and webhook-management HTTP calls (seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;

    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timezone_is_moscow() {
        assert_eq!(TZ.name(), "Europe/Moscow");
    }

    #[test]
    fn admin_ids_parse_mixed_separators() {
        let ids: Vec<i64> = "1, 2\n3\t4 junk"
            .split([',', ' ', '\n', '\t'])
            .filter_map(|p| p.trim().parse().ok())
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }
}
