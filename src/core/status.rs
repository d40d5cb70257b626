//! Worker status vocabulary.
//!
//! The canonical keys are what lands in `status_history`; the labels are
//! the reply-keyboard buttons users actually press.

use strum::EnumIter;

/// A status a worker can report via the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum Status {
    /// 🏢 В офисе
    Office,
    /// 🏥 На больничном
    Sick,
    /// 🏖 В отпуске
    Vacation,
    /// 🌃 В ночь — starts a night shift, mutes tomorrow's morning check
    ToNight,
    /// 🌙 С ночи — back from a night shift
    FromNight,
    /// 🏠 Домой — ends the workday and any live location session
    Home,
}

impl Status {
    /// Canonical key stored in the database.
    pub fn as_key(self) -> &'static str {
        match self {
            Status::Office => "office",
            Status::Sick => "sick",
            Status::Vacation => "vacation",
            Status::ToNight => "to_night",
            Status::FromNight => "from_night",
            Status::Home => "home",
        }
    }

    /// Keyboard button label shown to users.
    pub fn label(self) -> &'static str {
        match self {
            Status::Office => "🏢 В офисе",
            Status::Sick => "🏥 На больничном",
            Status::Vacation => "🏖 В отпуске",
            Status::ToNight => "🌃 В ночь",
            Status::FromNight => "🌙 С ночи",
            Status::Home => "🏠 Домой",
        }
    }

    /// Parse a stored key back into a status.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "office" => Some(Status::Office),
            "sick" => Some(Status::Sick),
            "vacation" => Some(Status::Vacation),
            "to_night" => Some(Status::ToNight),
            "from_night" => Some(Status::FromNight),
            "home" => Some(Status::Home),
            _ => None,
        }
    }

    /// Match a keyboard button press to a status.
    pub fn from_label(label: &str) -> Option<Self> {
        use strum::IntoEnumIterator;
        Self::iter().find(|s| s.label() == label)
    }

    /// Statuses that exempt a user from the morning check.
    pub fn skips_morning_check(self) -> bool {
        matches!(self, Status::FromNight | Status::Vacation | Status::Sick)
    }

    /// Statuses under which silence is expected and the activity monitor
    /// stays quiet.
    pub fn is_safe_for_inactivity(self) -> bool {
        matches!(
            self,
            Status::Vacation | Status::Sick | Status::ToNight | Status::FromNight
        )
    }
}

/// Human label for a stored status key; falls back to the raw key for
/// values written by older versions.
pub fn display_status(key: &str) -> String {
    Status::from_key(key)
        .map(|s| s.label().to_string())
        .unwrap_or_else(|| key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn keys_round_trip() {
        for status in Status::iter() {
            assert_eq!(Status::from_key(status.as_key()), Some(status));
        }
    }

    #[test]
    fn labels_round_trip() {
        for status in Status::iter() {
            assert_eq!(Status::from_label(status.label()), Some(status));
        }
    }

    #[test]
    fn morning_skip_set() {
        assert!(Status::Sick.skips_morning_check());
        assert!(Status::Vacation.skips_morning_check());
        assert!(Status::FromNight.skips_morning_check());
        assert!(!Status::Office.skips_morning_check());
        assert!(!Status::Home.skips_morning_check());
    }

    #[test]
    fn display_falls_back_to_raw_key() {
        assert_eq!(display_status("office"), "🏢 В офисе");
        assert_eq!(display_status("night_shift_start"), "night_shift_start");
    }
}
