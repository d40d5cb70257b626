//! Admin web dashboard.
//!
//! Server-rendered pages for bot/webhook status, user management and
//! report artifacts. Artifact downloads resolve exclusively through the
//! registry table, never by probing the filesystem.

pub mod botapi;
pub mod templates;

use axum::{
    extract::{Form, Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use chrono::Duration;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::core::{config, instance};
use crate::report;
use crate::storage::db::{self, DbPool};
use crate::storage::{artifacts, get_connection};
use templates::{DashboardView, Flash};

/// Shared state for the web server.
#[derive(Clone)]
struct WebState {
    db: Arc<DbPool>,
    http: reqwest::Client,
}

/// Start the dashboard server.
pub async fn start_web_server(port: u16, db: Arc<DbPool>) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let state = WebState {
        db,
        http: reqwest::Client::builder().timeout(config::network::timeout()).build()?,
    };

    let app = Router::new()
        .route("/", get(dashboard))
        .route("/users", get(users_page))
        .route("/add_user", post(add_user))
        .route("/set_admin_status", post(set_admin_status))
        .route("/delete_user", post(delete_user))
        .route("/reports", get(reports_page))
        .route("/generate_report", post(generate_report))
        .route("/file/{name}", get(serve_file))
        .route("/setup_webhook", post(setup_webhook))
        .route("/remove_webhook", post(remove_webhook))
        .route("/health", get(health))
        .with_state(state);

    log::info!("Starting admin dashboard on http://{}", addr);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct FlashQuery {
    kind: Option<String>,
    msg: Option<String>,
}

impl FlashQuery {
    fn into_flash(self) -> Option<Flash> {
        Some(Flash {
            kind: self.kind?,
            message: self.msg?,
        })
    }
}

fn redirect_with_flash(target: &str, kind: &str, message: &str) -> Redirect {
    let encoded: String = url::form_urlencoded::byte_serialize(message.as_bytes()).collect();
    Redirect::to(&format!("{}?kind={}&msg={}", target, kind, encoded))
}

/// GET / — bot and webhook status.
async fn dashboard(State(state): State<WebState>) -> Html<String> {
    let webhook_info = botapi::get_webhook_info(&state.http).await.map_err(|e| {
        log::warn!("getWebhookInfo failed: {}", e);
        e.to_string()
    });

    let view = DashboardView {
        bot_status: instance::status(config::PID_FILE.as_str()),
        bot_mode: config::BOT_MODE.clone(),
        token_configured: !config::BOT_TOKEN.is_empty(),
        webhook_env_url: config::WEBHOOK_URL.clone(),
        web_port: *config::WEB_PORT,
        webhook_info,
    };

    Html(templates::render_dashboard(&view))
}

/// GET /users
async fn users_page(State(state): State<WebState>, Query(flash): Query<FlashQuery>) -> Response {
    let conn = match get_connection(&state.db) {
        Ok(conn) => conn,
        Err(e) => return internal_error(e),
    };
    match db::get_all_users(&conn) {
        Ok(users) => Html(templates::render_users(&users, flash.into_flash().as_ref())).into_response(),
        Err(e) => internal_error(e),
    }
}

#[derive(Debug, Deserialize)]
struct AddUserForm {
    user_id: i64,
    full_name: String,
    is_admin: Option<String>,
}

/// POST /add_user
async fn add_user(State(state): State<WebState>, Form(form): Form<AddUserForm>) -> Redirect {
    let is_admin = form.is_admin.as_deref() == Some("1");
    let full_name = form.full_name.trim();

    if full_name.is_empty() {
        return redirect_with_flash("/users", "danger", "Имя не может быть пустым.");
    }

    log::info!(
        "Dashboard: add/update user ID={}, name={}, is_admin={}",
        form.user_id,
        full_name,
        is_admin
    );

    let result = get_connection(&state.db)
        .map_err(anyhow::Error::from)
        .and_then(|conn| db::upsert_user(&conn, form.user_id, full_name, Some(is_admin)).map_err(Into::into));

    match result {
        Ok(()) => redirect_with_flash("/users", "success", "Пользователь успешно добавлен!"),
        Err(e) => {
            log::error!("Dashboard add_user failed: {}", e);
            redirect_with_flash("/users", "danger", &format!("Ошибка при добавлении пользователя: {}", e))
        }
    }
}

#[derive(Debug, Deserialize)]
struct SetAdminForm {
    user_id: i64,
    is_admin: String,
}

/// POST /set_admin_status
async fn set_admin_status(State(state): State<WebState>, Form(form): Form<SetAdminForm>) -> Redirect {
    let grant = form.is_admin == "1";

    let result = get_connection(&state.db)
        .map_err(anyhow::Error::from)
        .and_then(|conn| db::set_admin_flag(&conn, form.user_id, grant).map_err(Into::into));

    match result {
        Ok(true) => {
            log::info!("Dashboard: admin status of user {} set to {}", form.user_id, grant);
            let message = if grant {
                "Пользователю успешно присвоен статус администратора!"
            } else {
                "Статус администратора успешно снят!"
            };
            redirect_with_flash("/users", "success", message)
        }
        Ok(false) => redirect_with_flash("/users", "danger", "Пользователь не найден."),
        Err(e) => {
            log::error!("Dashboard set_admin_status failed: {}", e);
            redirect_with_flash("/users", "danger", &format!("Ошибка при изменении статуса: {}", e))
        }
    }
}

#[derive(Debug, Deserialize)]
struct DeleteUserForm {
    user_id: i64,
}

/// POST /delete_user
async fn delete_user(State(state): State<WebState>, Form(form): Form<DeleteUserForm>) -> Redirect {
    log::info!("Dashboard: delete user {}", form.user_id);

    let result = get_connection(&state.db)
        .map_err(anyhow::Error::from)
        .and_then(|mut conn| db::delete_user(&mut conn, form.user_id).map_err(Into::into));

    match result {
        Ok(true) => redirect_with_flash("/users", "success", "Пользователь успешно удален!"),
        Ok(false) => redirect_with_flash("/users", "danger", "Пользователь не найден."),
        Err(e) => {
            log::error!("Dashboard delete_user failed: {}", e);
            redirect_with_flash("/users", "danger", &format!("Ошибка при удалении пользователя: {}", e))
        }
    }
}

/// GET /reports
async fn reports_page(State(state): State<WebState>, Query(flash): Query<FlashQuery>) -> Response {
    let conn = match get_connection(&state.db) {
        Ok(conn) => conn,
        Err(e) => return internal_error(e),
    };

    let users = match db::get_all_users(&conn) {
        Ok(users) => users,
        Err(e) => return internal_error(e),
    };
    let registered = match artifacts::list_artifacts(&conn) {
        Ok(artifacts) => artifacts,
        Err(e) => return internal_error(e),
    };

    // Last 30 days for the generation form, newest first
    let today = config::today_local();
    let available_dates: Vec<String> = (0..30)
        .map(|i| (today - Duration::days(i)).format("%Y-%m-%d").to_string())
        .collect();

    Html(templates::render_reports(
        &registered,
        &users,
        &available_dates,
        flash.into_flash().as_ref(),
    ))
    .into_response()
}

#[derive(Debug, Deserialize)]
struct GenerateReportForm {
    user_id: i64,
    date: String,
}

/// POST /generate_report
async fn generate_report(State(state): State<WebState>, Form(form): Form<GenerateReportForm>) -> Redirect {
    let Ok(date) = chrono::NaiveDate::parse_from_str(&form.date, "%Y-%m-%d") else {
        return redirect_with_flash("/reports", "danger", "Некорректный формат даты.");
    };

    log::info!("Dashboard: generating report for user {} and date {}", form.user_id, date);

    let result = get_connection(&state.db)
        .map_err(anyhow::Error::from)
        .and_then(|conn| report::generate_for_user(&conn, form.user_id, date).map_err(Into::into));

    match result {
        Ok(generated) => redirect_with_flash(
            "/reports",
            "success",
            &format!(
                "Отчет успешно создан: {}",
                generated.csv_path.file_name().and_then(|n| n.to_str()).unwrap_or("report.csv")
            ),
        ),
        Err(e) => {
            log::error!("Dashboard generate_report failed: {}", e);
            redirect_with_flash("/reports", "danger", &format!("Не удалось создать отчет: {}", e))
        }
    }
}

/// GET /file/{name} — serve a registered artifact.
async fn serve_file(State(state): State<WebState>, Path(name): Path<String>) -> Response {
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return StatusCode::NOT_FOUND.into_response();
    }

    let path = {
        let conn = match get_connection(&state.db) {
            Ok(conn) => conn,
            Err(e) => return internal_error(e),
        };
        match artifacts::artifact_path_by_file_name(&conn, &name) {
            Ok(Some(path)) => path,
            Ok(None) => return StatusCode::NOT_FOUND.into_response(),
            Err(e) => return internal_error(e),
        }
    };

    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let content_type = if name.ends_with(".csv") {
                "text/csv; charset=utf-8"
            } else {
                "text/html; charset=utf-8"
            };
            ([(header::CONTENT_TYPE, content_type)], bytes).into_response()
        }
        Err(e) => {
            log::error!("Registered artifact {} unreadable: {}", path, e);
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

/// POST /setup_webhook
async fn setup_webhook(State(state): State<WebState>) -> Redirect {
    let Some(base_url) = config::WEBHOOK_URL.clone() else {
        return redirect_with_flash("/", "danger", "WEBHOOK_URL не настроен.");
    };
    if config::BOT_TOKEN.is_empty() {
        return redirect_with_flash("/", "danger", "Токен не настроен.");
    }

    let webhook_url = format!("{}/webhook", base_url);
    match botapi::set_webhook(&state.http, &webhook_url).await {
        Ok(()) => {
            log::info!("Webhook set to {}", webhook_url);
            redirect_with_flash("/", "success", "Webhook установлен успешно!")
        }
        Err(e) => {
            log::error!("setWebhook failed: {}", e);
            redirect_with_flash("/", "danger", &format!("Ошибка при установке webhook: {}", e))
        }
    }
}

/// POST /remove_webhook
async fn remove_webhook(State(state): State<WebState>) -> Redirect {
    if config::BOT_TOKEN.is_empty() {
        return redirect_with_flash("/", "danger", "Токен не настроен.");
    }

    match botapi::delete_webhook(&state.http, false).await {
        Ok(()) => {
            log::info!("Webhook deleted");
            redirect_with_flash("/", "success", "Webhook удален успешно!")
        }
        Err(e) => {
            log::error!("deleteWebhook failed: {}", e);
            redirect_with_flash("/", "danger", &format!("Ошибка при удалении webhook: {}", e))
        }
    }
}

/// GET /health
async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

fn internal_error<E: std::fmt::Display>(e: E) -> Response {
    log::error!("Dashboard internal error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html("<h1>Внутренняя ошибка сервера</h1>".to_string()),
    )
        .into_response()
}
