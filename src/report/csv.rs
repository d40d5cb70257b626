//! Daily activity report in CSV form.
//!
//! One row per event (time-off activity, status change, location point)
//! for one user and one local date, sorted chronologically.

use chrono::{NaiveDate, NaiveDateTime};

use crate::core::status::display_status;
use crate::storage::locations::{parse_timestamp, LocationRow};
use crate::storage::timeoff::{request_status, TimeoffRequest, TimeoffStats};

/// A single report line before numbering.
#[derive(Debug, Clone)]
pub struct ReportEvent {
    pub event_type: String,
    pub value: String,
    pub timestamp: NaiveDateTime,
}

/// Human label for a location point type.
fn point_type_label(location_type: &str) -> &'static str {
    match location_type {
        "start" => "Начало трансляции",
        "end" => "Конец трансляции",
        "stationary" => "Остановка",
        "moving" => "Движение",
        _ => "Промежуточная точка",
    }
}

fn timeoff_status_label(status: &str) -> &'static str {
    match status {
        request_status::APPROVED => "Одобрено",
        request_status::REJECTED => "Отклонено",
        _ => "Ожидает рассмотрения",
    }
}

/// Merge the day's data into a chronological event list.
pub fn collect_events(
    date: NaiveDate,
    statuses: &[(String, String)],
    locations: &[LocationRow],
    timeoff_stats: &TimeoffStats,
    timeoff_requests: &[TimeoffRequest],
    now: NaiveDateTime,
) -> Vec<ReportEvent> {
    let mut events = Vec::new();

    if timeoff_stats.total > 0 {
        events.push(ReportEvent {
            event_type: "Статистика отгулов".to_string(),
            value: format!(
                "Всего запросов: {}, Одобрено: {}, Отклонено: {}, Ожидает: {}",
                timeoff_stats.total, timeoff_stats.approved, timeoff_stats.rejected, timeoff_stats.pending
            ),
            timestamp: now,
        });

        for request in timeoff_requests {
            let Some(ts) = parse_timestamp(&request.request_time) else {
                continue;
            };
            if ts.date() != date {
                continue;
            }
            events.push(ReportEvent {
                event_type: "Запрос отгула".to_string(),
                value: format!(
                    "Причина: {}. Статус: {}",
                    request.reason,
                    timeoff_status_label(&request.status)
                ),
                timestamp: ts,
            });
        }
    }

    for (status, raw_ts) in statuses {
        let Some(ts) = parse_timestamp(raw_ts) else {
            log::error!("Unparseable status timestamp dropped from report: {}", raw_ts);
            continue;
        };
        events.push(ReportEvent {
            event_type: "Статус".to_string(),
            value: display_status(status),
            timestamp: ts,
        });
    }

    for location in locations {
        let Some(ts) = location.parsed_timestamp() else {
            log::error!(
                "Unparseable location timestamp dropped from report: {}",
                location.timestamp
            );
            continue;
        };
        events.push(ReportEvent {
            event_type: format!("Местоположение ({})", point_type_label(&location.location_type)),
            value: format!("{:.6},{:.6}", location.latitude, location.longitude),
            timestamp: ts,
        });
    }

    events.sort_by_key(|e| e.timestamp);
    events
}

/// Render the event list as CSV text.
///
/// Columns: ID, full name, user ID, event type, value, timestamp. An empty
/// day produces a single informational row so the admin still receives a
/// file.
pub fn render_csv(user_id: i64, full_name: &str, events: &[ReportEvent], now: NaiveDateTime) -> String {
    let mut content = "ID,ФИО,Пользователь,Тип события,Значение,Время\n".to_string();

    if events.is_empty() {
        content.push_str(&format!(
            "1,{},{},Информация,Нет данных о местоположении и статусах за указанный период,{}\n",
            escape(full_name),
            user_id,
            now.format("%Y-%m-%d %H:%M:%S")
        ));
        return content;
    }

    for (idx, event) in events.iter().enumerate() {
        content.push_str(&format!(
            "{},{},{},{},{},{}\n",
            idx + 1,
            escape(full_name),
            user_id,
            escape(&event.event_type),
            escape(&event.value),
            event.timestamp.format("%Y-%m-%d %H:%M:%S")
        ));
    }

    content
}

/// Quote a field when needed; embedded quotes are doubled, newlines
/// flattened to spaces.
fn escape(field: &str) -> String {
    let flat = field.replace(['\n', '\r'], " ");
    if flat.contains([',', '"']) {
        format!("\"{}\"", flat.replace('"', "\"\""))
    } else {
        flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn location(lat: f64, lon: f64, ts: &str, loc_type: &str) -> LocationRow {
        LocationRow {
            latitude: lat,
            longitude: lon,
            timestamp: ts.to_string(),
            session_id: "s".to_string(),
            location_type: loc_type.to_string(),
        }
    }

    #[test]
    fn events_are_sorted_chronologically() {
        let date = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        let statuses = vec![("home".to_string(), "2025-05-01 18:00:00".to_string())];
        let locations = vec![location(55.75, 37.61, "2025-05-01 09:15:00", "start")];

        let events = collect_events(
            date,
            &statuses,
            &locations,
            &TimeoffStats::default(),
            &[],
            dt("2025-05-01 19:00:00"),
        );

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "Местоположение (Начало трансляции)");
        assert_eq!(events[1].value, "🏠 Домой");
    }

    #[test]
    fn csv_numbers_rows_after_sorting() {
        let events = vec![
            ReportEvent {
                event_type: "Статус".to_string(),
                value: "🏢 В офисе".to_string(),
                timestamp: dt("2025-05-01 09:00:00"),
            },
            ReportEvent {
                event_type: "Статус".to_string(),
                value: "🏠 Домой".to_string(),
                timestamp: dt("2025-05-01 18:00:00"),
            },
        ];

        let csv = render_csv(10, "Иванов Иван", &events, dt("2025-05-01 19:00:00"));
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "ID,ФИО,Пользователь,Тип события,Значение,Время");
        assert!(lines[1].starts_with("1,Иванов Иван,10,Статус,"));
        assert!(lines[2].starts_with("2,"));
    }

    #[test]
    fn empty_day_yields_informational_row() {
        let csv = render_csv(10, "Иванов", &[], dt("2025-05-01 19:00:00"));
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("Нет данных"));
    }

    #[test]
    fn fields_with_commas_are_quoted() {
        let events = vec![ReportEvent {
            event_type: "Запрос отгула".to_string(),
            value: "Причина: врач, стоматолог. Статус: Одобрено".to_string(),
            timestamp: dt("2025-05-01 10:00:00"),
        }];
        let csv = render_csv(10, "Иванов", &events, dt("2025-05-01 19:00:00"));
        assert!(csv.contains("\"Причина: врач, стоматолог. Статус: Одобрено\""));
    }

    #[test]
    fn timeoff_requests_outside_the_date_are_dropped() {
        let date = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        let stats = TimeoffStats {
            total: 1,
            approved: 0,
            rejected: 0,
            pending: 1,
        };
        let requests = vec![TimeoffRequest {
            id: 1,
            user_id: 10,
            username: None,
            reason: "отгул".to_string(),
            status: "pending".to_string(),
            request_time: "2025-04-30 12:00:00".to_string(),
            response_time: None,
        }];

        let events = collect_events(date, &[], &[], &stats, &requests, dt("2025-05-01 19:00:00"));
        // Stats summary stays, the out-of-date request row does not
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "Статистика отгулов");
    }
}
