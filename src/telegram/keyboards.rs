//! Reply and inline keyboards.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup};

use crate::core::status::Status;
use crate::storage::db::UserRecord;

/// Button label for starting a time-off request.
pub const TIMEOFF_BUTTON: &str = "📝 Отпроситься";

/// Button label for opening the admin panel.
pub const ADMIN_PANEL_BUTTON: &str = "👤 Панель администратора";

/// Status keyboard shown to every user; admins get the panel row too.
pub fn status_keyboard(is_admin: bool) -> KeyboardMarkup {
    let mut rows = vec![
        vec![
            KeyboardButton::new(Status::Office.label()),
            KeyboardButton::new(Status::Home.label()),
        ],
        vec![
            KeyboardButton::new(Status::Sick.label()),
            KeyboardButton::new(Status::Vacation.label()),
        ],
        vec![
            KeyboardButton::new(Status::ToNight.label()),
            KeyboardButton::new(Status::FromNight.label()),
        ],
        vec![KeyboardButton::new(TIMEOFF_BUTTON)],
    ];

    if is_admin {
        rows.push(vec![KeyboardButton::new(ADMIN_PANEL_BUTTON)]);
    }

    KeyboardMarkup::new(rows).resize_keyboard()
}

/// Main admin panel.
pub fn admin_panel() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(
            "👁️ Местоположение сотрудников",
            "admin_locate",
        )],
        vec![InlineKeyboardButton::callback("📋 Заявки на отсутствие", "admin_requests")],
        vec![InlineKeyboardButton::callback("📊 Генерировать отчет", "admin_report")],
        vec![InlineKeyboardButton::callback("📊 Отчеты за сегодня", "admin_daily_reports")],
        vec![InlineKeyboardButton::callback("📈 Статистика отгулов", "admin_timeoff_stats")],
        vec![InlineKeyboardButton::callback(
            "👥 Управление пользователями",
            "admin_users",
        )],
    ])
}

/// One button per user, callback data `<prefix>_<user_id>`.
pub fn user_selector(users: &[UserRecord], prefix: &str) -> InlineKeyboardMarkup {
    let rows = users
        .iter()
        .map(|user| {
            vec![InlineKeyboardButton::callback(
                user.full_name.clone(),
                format!("{}_{}", prefix, user.user_id),
            )]
        })
        .collect::<Vec<_>>();
    InlineKeyboardMarkup::new(rows)
}

/// Same as [`user_selector`] with a trailing back button.
pub fn user_selector_with_back(users: &[UserRecord], prefix: &str, back_data: &str) -> InlineKeyboardMarkup {
    let mut rows = users
        .iter()
        .map(|user| {
            vec![InlineKeyboardButton::callback(
                user.full_name.clone(),
                format!("{}_{}", prefix, user.user_id),
            )]
        })
        .collect::<Vec<_>>();
    rows.push(vec![InlineKeyboardButton::callback("🔙 Назад", back_data.to_string())]);
    InlineKeyboardMarkup::new(rows)
}

/// Date choices for report generation.
pub fn report_period_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("За сегодня", "report_date_today")],
        vec![InlineKeyboardButton::callback("За вчера", "report_date_yesterday")],
        vec![InlineKeyboardButton::callback("За 7 дней", "report_date_week")],
        vec![InlineKeyboardButton::callback("Другая дата", "report_date_custom")],
        vec![InlineKeyboardButton::callback("🔙 Назад", "admin_back")],
    ])
}

/// Period choices for the time-off statistics view.
pub fn timeoff_stats_periods() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(
            "За последние 7 дней",
            "timeoff_stats_period_7",
        )],
        vec![InlineKeyboardButton::callback(
            "За последние 30 дней",
            "timeoff_stats_period_30",
        )],
        vec![InlineKeyboardButton::callback(
            "За последние 90 дней",
            "timeoff_stats_period_90",
        )],
        vec![InlineKeyboardButton::callback("Все записи", "timeoff_stats_period_365")],
        vec![InlineKeyboardButton::callback("🔙 Назад", "admin_back")],
    ])
}

/// User management submenu.
pub fn users_management_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("➕ Добавить пользователя", "admin_add_user")],
        vec![InlineKeyboardButton::callback("🗑️ Удалить пользователя", "admin_delete_user")],
        vec![InlineKeyboardButton::callback("🔄 Изменить права", "admin_change_rights")],
        vec![InlineKeyboardButton::callback(
            "👁️ Просмотреть всех пользователей",
            "admin_view_users",
        )],
        vec![InlineKeyboardButton::callback("🔙 Назад", "admin_back")],
    ])
}

/// Approve/reject pair for one time-off request.
pub fn timeoff_decision(request_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("✅ Согласовать", format!("approve_timeoff_{}", request_id)),
        InlineKeyboardButton::callback("❌ Отклонить", format!("reject_timeoff_{}", request_id)),
    ]])
}

/// Delete confirmation for one user.
pub fn confirm_delete(user_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("✅ Да, удалить", format!("confirm_delete_{}", user_id)),
        InlineKeyboardButton::callback("❌ Нет, отмена", "admin_users".to_string()),
    ]])
}

/// Report/map shortcuts attached to a located user.
pub fn locate_actions(user_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(
            "📊 Сгенерировать отчет",
            format!("report_user_{}", user_id),
        )],
        vec![InlineKeyboardButton::callback(
            "🔙 Назад",
            "admin_locate".to_string(),
        )],
    ])
}

/// Single back button.
pub fn back_to(data: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback("🔙 Назад", data.to_string())]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_keyboard_has_admin_row_only_for_admins() {
        let plain = status_keyboard(false);
        let admin = status_keyboard(true);
        assert_eq!(plain.keyboard.len() + 1, admin.keyboard.len());
        let last_row = &admin.keyboard[admin.keyboard.len() - 1];
        assert_eq!(last_row[0].text, ADMIN_PANEL_BUTTON);
    }

    #[test]
    fn user_selector_encodes_ids() {
        let users = vec![
            UserRecord {
                user_id: 10,
                full_name: "A".to_string(),
                is_admin: false,
            },
            UserRecord {
                user_id: 20,
                full_name: "B".to_string(),
                is_admin: true,
            },
        ];
        let markup = user_selector(&users, "locate_user");
        assert_eq!(markup.inline_keyboard.len(), 2);
    }
}
