//! Server-rendered HTML for the admin dashboard.

use crate::core::instance::InstanceStatus;
use crate::storage::artifacts::ReportArtifact;
use crate::storage::db::UserRecord;
use crate::web::botapi::WebhookInfo;

/// Flash banner carried between redirects via the query string.
#[derive(Debug, Clone)]
pub struct Flash {
    pub kind: String,
    pub message: String,
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn layout(title: &str, flash: Option<&Flash>, body: &str) -> String {
    let flash_html = flash
        .map(|f| {
            let color = match f.kind.as_str() {
                "success" => "#d4edda",
                "warning" => "#fff3cd",
                _ => "#f8d7da",
            };
            format!(
                "<div class=\"flash\" style=\"background:{}\">{}</div>",
                color,
                html_escape(&f.message)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="ru">
<head>
<meta charset="utf-8">
<title>{title} — WorkTrack</title>
<style>
  body {{ font-family: 'Segoe UI', Arial, sans-serif; margin: 20px; background: #f9f9f9; color: #333; }}
  h1 {{ color: #2c3e50; border-bottom: 2px solid #3498db; padding-bottom: 10px; }}
  nav a {{ margin-right: 16px; color: #3498db; text-decoration: none; }}
  table {{ border-collapse: collapse; width: 100%; margin-top: 20px; background: white;
           box-shadow: 0 2px 4px rgba(0,0,0,0.1); }}
  th, td {{ border: 1px solid #ddd; padding: 10px; text-align: left; }}
  th {{ background: #3498db; color: white; }}
  tr:nth-child(even) {{ background: #f2f2f2; }}
  form.inline {{ display: inline; }}
  .flash {{ padding: 10px 14px; margin: 12px 0; border-radius: 4px; }}
  .card {{ background: white; padding: 16px; margin: 12px 0; border-radius: 4px;
           box-shadow: 0 2px 4px rgba(0,0,0,0.1); }}
  button {{ background: #3498db; color: white; border: none; padding: 6px 12px;
            border-radius: 4px; cursor: pointer; }}
  button.danger {{ background: #e74c3c; }}
  input, select {{ padding: 6px; margin: 4px 0; }}
</style>
</head>
<body>
<h1>{title}</h1>
<nav><a href="/">Статус</a><a href="/users">Пользователи</a><a href="/reports">Отчеты</a></nav>
{flash}
{body}
</body>
</html>
"#,
        title = html_escape(title),
        flash = flash_html,
        body = body,
    )
}

/// Dashboard view model collected by the route handler.
pub struct DashboardView {
    pub bot_status: InstanceStatus,
    pub bot_mode: String,
    pub token_configured: bool,
    pub webhook_env_url: Option<String>,
    pub web_port: u16,
    pub webhook_info: Result<WebhookInfo, String>,
}

pub fn render_dashboard(view: &DashboardView) -> String {
    let (bot_status, bot_pid) = match view.bot_status {
        InstanceStatus::Running(pid) => ("Running".to_string(), pid.to_string()),
        InstanceStatus::Dead(pid) => (format!("Not running (process {} dead)", pid), "—".to_string()),
        InstanceStatus::NotRunning => ("Not running (no PID file)".to_string(), "—".to_string()),
    };

    let (webhook_url, webhook_status, last_error) = match &view.webhook_info {
        Ok(info) if !info.url.is_empty() => (
            info.url.clone(),
            "Active".to_string(),
            info.last_error_message.clone().unwrap_or_else(|| "No errors".to_string()),
        ),
        Ok(_) => ("Not set".to_string(), "Not set".to_string(), "No errors".to_string()),
        Err(e) => ("Error getting information".to_string(), "Error".to_string(), e.clone()),
    };

    let body = format!(
        r#"<div class="card">
<h3>Бот</h3>
<table>
<tr><th>Параметр</th><th>Значение</th></tr>
<tr><td>Статус процесса</td><td>{bot_status}</td></tr>
<tr><td>PID</td><td>{bot_pid}</td></tr>
<tr><td>Режим</td><td>{bot_mode}</td></tr>
<tr><td>Токен</td><td>{token}</td></tr>
<tr><td>WEBHOOK_URL</td><td>{env_url}</td></tr>
<tr><td>Порт панели</td><td>{port}</td></tr>
</table>
</div>
<div class="card">
<h3>Webhook</h3>
<table>
<tr><th>Параметр</th><th>Значение</th></tr>
<tr><td>URL</td><td>{webhook_url}</td></tr>
<tr><td>Статус</td><td>{webhook_status}</td></tr>
<tr><td>Последняя ошибка</td><td>{last_error}</td></tr>
</table>
<form class="inline" method="post" action="/setup_webhook"><button>Установить webhook</button></form>
<form class="inline" method="post" action="/remove_webhook"><button class="danger">Удалить webhook</button></form>
</div>
"#,
        bot_status = html_escape(&bot_status),
        bot_pid = bot_pid,
        bot_mode = html_escape(&view.bot_mode),
        token = if view.token_configured { "Configured" } else { "Not configured" },
        env_url = html_escape(view.webhook_env_url.as_deref().unwrap_or("Not configured")),
        port = view.web_port,
        webhook_url = html_escape(&webhook_url),
        webhook_status = html_escape(&webhook_status),
        last_error = html_escape(&last_error),
    );

    layout("Панель управления", None, &body)
}

pub fn render_users(users: &[UserRecord], flash: Option<&Flash>) -> String {
    let mut rows = String::new();
    for user in users {
        rows.push_str(&format!(
            r#"<tr>
<td>{id}</td>
<td>{name}</td>
<td>{admin}</td>
<td>
<form class="inline" method="post" action="/set_admin_status">
<input type="hidden" name="user_id" value="{id}">
<input type="hidden" name="is_admin" value="{toggle}">
<button>{toggle_label}</button>
</form>
<form class="inline" method="post" action="/delete_user"
      onsubmit="return confirm('Удалить пользователя {name}?');">
<input type="hidden" name="user_id" value="{id}">
<button class="danger">Удалить</button>
</form>
</td>
</tr>
"#,
            id = user.user_id,
            name = html_escape(&user.full_name),
            admin = if user.is_admin { "✅" } else { "—" },
            toggle = if user.is_admin { "0" } else { "1" },
            toggle_label = if user.is_admin { "Снять админа" } else { "Сделать админом" },
        ));
    }

    let body = format!(
        r#"<div class="card">
<table>
<tr><th>ID</th><th>ФИО</th><th>Администратор</th><th>Действия</th></tr>
{rows}
</table>
</div>
<div class="card">
<h3>Добавить пользователя</h3>
<form method="post" action="/add_user">
<label>Telegram ID: <input type="number" name="user_id" required></label><br>
<label>Полное имя: <input type="text" name="full_name" required></label><br>
<label><input type="checkbox" name="is_admin" value="1"> Администратор</label><br>
<button>Добавить</button>
</form>
</div>
"#,
        rows = rows,
    );

    layout("Пользователи", flash, &body)
}

pub fn render_reports(
    artifacts: &[ReportArtifact],
    users: &[UserRecord],
    available_dates: &[String],
    flash: Option<&Flash>,
) -> String {
    let mut rows = String::new();
    for artifact in artifacts {
        let csv_link = artifact
            .csv_path
            .as_deref()
            .and_then(|p| file_link(p, "CSV"))
            .unwrap_or_else(|| "—".to_string());
        let map_link = artifact
            .map_path
            .as_deref()
            .and_then(|p| file_link(p, "Карта"))
            .unwrap_or_else(|| "—".to_string());
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            html_escape(&artifact.full_name),
            html_escape(&artifact.report_date),
            csv_link,
            map_link,
            html_escape(&artifact.generated_at),
        ));
    }

    let user_options: String = users
        .iter()
        .map(|u| format!("<option value=\"{}\">{}</option>", u.user_id, html_escape(&u.full_name)))
        .collect();
    let date_options: String = available_dates
        .iter()
        .map(|d| format!("<option value=\"{}\">{}</option>", html_escape(d), html_escape(d)))
        .collect();

    let body = format!(
        r#"<div class="card">
<h3>Сформировать отчет</h3>
<form method="post" action="/generate_report">
<label>Сотрудник: <select name="user_id" required>{user_options}</select></label>
<label>Дата: <select name="date" required>{date_options}</select></label>
<button>Сформировать</button>
</form>
</div>
<div class="card">
<table>
<tr><th>Сотрудник</th><th>Дата</th><th>Отчет</th><th>Карта</th><th>Сформирован</th></tr>
{rows}
</table>
</div>
"#,
        user_options = user_options,
        date_options = date_options,
        rows = rows,
    );

    layout("Отчеты", flash, &body)
}

fn file_link(path: &str, label: &str) -> Option<String> {
    let name = std::path::Path::new(path).file_name()?.to_str()?;
    Some(format!(
        "<a href=\"/file/{}\">{}</a>",
        html_escape(name),
        html_escape(label)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn users_page_escapes_names() {
        let users = vec![UserRecord {
            user_id: 1,
            full_name: "<b>Мальчик</b>".to_string(),
            is_admin: false,
        }];
        let html = render_users(&users, None);
        assert!(html.contains("&lt;b&gt;Мальчик&lt;/b&gt;"));
        assert!(!html.contains("<b>Мальчик</b>"));
    }

    #[test]
    fn reports_page_links_artifacts_by_file_name() {
        let artifacts = vec![ReportArtifact {
            id: 1,
            user_id: 7,
            full_name: "Иванов".to_string(),
            report_date: "2025-05-01".to_string(),
            csv_path: Some("reports/report_7_2025-05-01.csv".to_string()),
            map_path: None,
            generated_at: "2025-05-01 17:30:00".to_string(),
        }];
        let html = render_reports(&artifacts, &[], &[], None);
        assert!(html.contains("/file/report_7_2025-05-01.csv"));
        assert!(html.contains("—"));
    }

    #[test]
    fn flash_banner_is_rendered() {
        let flash = Flash {
            kind: "success".to_string(),
            message: "Пользователь успешно добавлен!".to_string(),
        };
        let html = render_users(&[], Some(&flash));
        assert!(html.contains("Пользователь успешно добавлен!"));
    }
}
