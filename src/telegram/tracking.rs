//! In-memory per-user state shared across handlers and schedulers.
//!
//! Three concerns live here, all keyed by Telegram user ID:
//! - live location tracking (movement classification between points),
//! - multi-step dialogues (time-off reason, add-user flow),
//! - admin report context (the date/period picked before a user is chosen).

use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;

use crate::core::config;
use crate::core::geo;

/// Movement classification carried between consecutive points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    Unknown,
    Moving,
    Stationary,
}

/// Live tracking state for one user.
#[derive(Debug, Clone)]
pub struct LiveTrack {
    pub latitude: f64,
    pub longitude: f64,
    pub last_seen: DateTime<Utc>,
    pub movement: Movement,
    pub stationary_secs: f64,
    pub speed_kmh: f64,
    pub admin_notified: bool,
    pub session_id: String,
    /// Freshest point not yet flushed by the periodic task
    pub pending_flush: Option<(f64, f64)>,
}

/// Outcome of feeding a new point into the classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct PointClassification {
    pub location_type: &'static str,
    pub speed_kmh: f64,
    /// Set when the stationary threshold for warning the admin was just crossed
    pub warn_admin: bool,
}

/// A step in a multi-message dialogue.
#[derive(Debug, Clone, PartialEq)]
pub enum Dialogue {
    /// Waiting for the free-text reason of a time-off request
    TimeoffReason,
    /// Add-user flow: waiting for the Telegram ID
    AddUserId,
    /// Add-user flow: waiting for the full name
    AddUserName { user_id: i64 },
    /// Add-user flow: waiting for the yes/no admin answer
    AddUserAdmin { user_id: i64, full_name: String },
}

/// Report date/period an admin picked before selecting a user.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportContext {
    Date(NaiveDate),
    Period { start: NaiveDate, end: NaiveDate },
}

/// Shared mutable state, cheap to clone behind an Arc.
#[derive(Default)]
pub struct TrackingState {
    live: DashMap<i64, LiveTrack>,
    dialogues: DashMap<i64, Dialogue>,
    report_context: DashMap<i64, ReportContext>,
    inactivity_notified: DashMap<i64, DateTime<Utc>>,
    stale_requested: DashMap<i64, DateTime<Utc>>,
}

impl TrackingState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a location point into the movement classifier.
    ///
    /// Returns the point classification and whether this opens a new
    /// session (no live state existed).
    pub fn observe_point(&self, user_id: i64, latitude: f64, longitude: f64, session_id: &str) -> PointClassification {
        let now = Utc::now();

        let mut entry = match self.live.get_mut(&user_id) {
            Some(entry) => entry,
            None => {
                self.live.insert(
                    user_id,
                    LiveTrack {
                        latitude,
                        longitude,
                        last_seen: now,
                        movement: Movement::Unknown,
                        stationary_secs: 0.0,
                        speed_kmh: 0.0,
                        admin_notified: false,
                        session_id: session_id.to_string(),
                        pending_flush: None,
                    },
                );
                return PointClassification {
                    location_type: crate::storage::locations::point_type::START,
                    speed_kmh: 0.0,
                    warn_admin: false,
                };
            }
        };

        let distance = geo::haversine_m(entry.latitude, entry.longitude, latitude, longitude);
        let elapsed = (now - entry.last_seen).num_milliseconds() as f64 / 1000.0;

        let classification = if distance < config::tracking::STATIONARY_RADIUS_M {
            entry.stationary_secs += elapsed.max(0.0);
            entry.speed_kmh = 0.0;
            let crossed_warn_threshold = entry.stationary_secs > config::tracking::ADMIN_WARN_AFTER_SECS
                && !entry.admin_notified;
            if crossed_warn_threshold {
                entry.admin_notified = true;
            }
            if entry.stationary_secs > config::tracking::STATIONARY_AFTER_SECS {
                entry.movement = Movement::Stationary;
                PointClassification {
                    location_type: crate::storage::locations::point_type::STATIONARY,
                    speed_kmh: 0.0,
                    warn_admin: crossed_warn_threshold,
                }
            } else {
                PointClassification {
                    location_type: crate::storage::locations::point_type::INTERMEDIATE,
                    speed_kmh: 0.0,
                    warn_admin: crossed_warn_threshold,
                }
            }
        } else {
            let speed = geo::speed_kmh(distance, elapsed);
            entry.movement = Movement::Moving;
            entry.stationary_secs = 0.0;
            entry.admin_notified = false;
            entry.speed_kmh = speed;
            PointClassification {
                location_type: crate::storage::locations::point_type::MOVING,
                speed_kmh: speed,
                warn_admin: false,
            }
        };

        entry.latitude = latitude;
        entry.longitude = longitude;
        entry.last_seen = now;
        entry.session_id = session_id.to_string();
        entry.pending_flush = Some((latitude, longitude));

        classification
    }

    /// True when the user has an open live-tracking session.
    pub fn is_tracking(&self, user_id: i64) -> bool {
        self.live.contains_key(&user_id)
    }

    /// Session ID of the user's live tracking, if any.
    pub fn session_of(&self, user_id: i64) -> Option<String> {
        self.live.get(&user_id).map(|t| t.session_id.clone())
    }

    /// Drop live tracking state (user went home / session ended).
    pub fn stop_tracking(&self, user_id: i64) {
        self.live.remove(&user_id);
    }

    /// Take the freshest unflushed point of every tracked user.
    pub fn drain_pending_flushes(&self) -> Vec<(i64, String, f64, f64)> {
        let mut drained = Vec::new();
        for mut entry in self.live.iter_mut() {
            if let Some((lat, lon)) = entry.pending_flush.take() {
                drained.push((*entry.key(), entry.session_id.clone(), lat, lon));
            }
        }
        drained
    }

    /// Users whose live session has gone quiet for longer than the cutoff.
    pub fn stale_sessions(&self, max_age_secs: i64) -> Vec<i64> {
        let now = Utc::now();
        self.live
            .iter()
            .filter(|entry| (now - entry.last_seen).num_seconds() > max_age_secs)
            .map(|entry| *entry.key())
            .collect()
    }

    // -- dialogues ---------------------------------------------------------

    pub fn set_dialogue(&self, user_id: i64, dialogue: Dialogue) {
        self.dialogues.insert(user_id, dialogue);
    }

    pub fn dialogue_of(&self, user_id: i64) -> Option<Dialogue> {
        self.dialogues.get(&user_id).map(|d| d.clone())
    }

    pub fn clear_dialogue(&self, user_id: i64) -> Option<Dialogue> {
        self.dialogues.remove(&user_id).map(|(_, d)| d)
    }

    // -- admin report context ---------------------------------------------

    pub fn set_report_context(&self, admin_id: i64, ctx: ReportContext) {
        self.report_context.insert(admin_id, ctx);
    }

    pub fn report_context_of(&self, admin_id: i64) -> Option<ReportContext> {
        self.report_context.get(&admin_id).map(|c| c.clone())
    }

    // -- notification throttles -------------------------------------------

    /// Returns true at most once per `throttle_secs` per user.
    pub fn should_notify_inactivity(&self, user_id: i64, throttle_secs: i64) -> bool {
        let now = Utc::now();
        let allowed = self
            .inactivity_notified
            .get(&user_id)
            .map(|t| (now - *t).num_seconds() > throttle_secs)
            .unwrap_or(true);
        if allowed {
            self.inactivity_notified.insert(user_id, now);
        }
        allowed
    }

    /// Same throttle for "please re-share your location" requests.
    pub fn should_request_reshare(&self, user_id: i64, throttle_secs: i64) -> bool {
        let now = Utc::now();
        let allowed = self
            .stale_requested
            .get(&user_id)
            .map(|t| (now - *t).num_seconds() > throttle_secs)
            .unwrap_or(true);
        if allowed {
            self.stale_requested.insert(user_id, now);
        }
        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::locations::point_type;

    #[test]
    fn first_point_starts_a_session() {
        let state = TrackingState::new();
        let c = state.observe_point(1, 55.75, 37.61, "s1");
        assert_eq!(c.location_type, point_type::START);
        assert!(state.is_tracking(1));
        assert_eq!(state.session_of(1).as_deref(), Some("s1"));
    }

    #[test]
    fn movement_resets_stationary_counter() {
        let state = TrackingState::new();
        state.observe_point(1, 55.7500, 37.6100, "s1");
        // ~110 m north: clearly moving
        let c = state.observe_point(1, 55.7510, 37.6100, "s1");
        assert_eq!(c.location_type, point_type::MOVING);
        assert!(!c.warn_admin);

        // Tiny wiggle: back under the stationary radius
        let c = state.observe_point(1, 55.7510, 37.6100, "s1");
        assert_eq!(c.location_type, point_type::INTERMEDIATE);
    }

    #[test]
    fn stop_tracking_clears_state() {
        let state = TrackingState::new();
        state.observe_point(1, 55.75, 37.61, "s1");
        state.stop_tracking(1);
        assert!(!state.is_tracking(1));
    }

    #[test]
    fn pending_flush_is_drained_once() {
        let state = TrackingState::new();
        state.observe_point(1, 55.75, 37.61, "s1");
        let drained = state.drain_pending_flushes();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].0, 1);
        assert!(state.drain_pending_flushes().is_empty());
    }

    #[test]
    fn dialogue_round_trip() {
        let state = TrackingState::new();
        assert!(state.dialogue_of(1).is_none());
        state.set_dialogue(1, Dialogue::TimeoffReason);
        assert_eq!(state.dialogue_of(1), Some(Dialogue::TimeoffReason));
        assert_eq!(state.clear_dialogue(1), Some(Dialogue::TimeoffReason));
        assert!(state.dialogue_of(1).is_none());
    }

    #[test]
    fn inactivity_throttle_fires_once() {
        let state = TrackingState::new();
        assert!(state.should_notify_inactivity(1, 3600));
        assert!(!state.should_notify_inactivity(1, 3600));
        // A different user is throttled independently
        assert!(state.should_notify_inactivity(2, 3600));
    }
}
