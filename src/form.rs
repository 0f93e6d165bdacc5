//! Validation of user input for alarms and settings.
//!
//! A form that fails validation is never partially written: callers get a
//! [`ValidationError`] to show the user and nothing is saved.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::{
    model::{Alarm, AlarmPatch, NewAlarm, Settings, TimeOfDay},
    money::{Money, SnoozePrice},
};

/// Snooze lengths offered when creating or editing an alarm.
pub const ALARM_DURATION_PRESETS: [u32; 4] = [1, 5, 10, 15];
/// Snooze lengths offered for the settings default.
pub const DEFAULT_DURATION_PRESETS: [u32; 4] = [5, 9, 10, 15];
pub const DEFAULT_ALARM_LABEL: &str = "Alarm";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid Time: please enter a valid time")]
    InvalidTime,
    #[error("Invalid Price: snooze price must be at least $1.00")]
    InvalidPrice,
    #[error("Invalid Duration: snooze duration must be a whole number of minutes above zero")]
    InvalidDuration,
    #[error("Invalid Day: repeat days go from 0 (Sunday) to 6 (Saturday), got {0}")]
    InvalidDay(u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnoozeDuration {
    Preset(u32),
    /// free-form minutes as typed
    Custom(String),
}

impl SnoozeDuration {
    /// Picks a preset when `minutes` is one, otherwise a custom value.
    #[must_use]
    pub fn for_minutes(minutes: u32) -> Self {
        if ALARM_DURATION_PRESETS.contains(&minutes) {
            Self::Preset(minutes)
        } else {
            Self::Custom(minutes.to_string())
        }
    }

    pub fn minutes(&self) -> Result<u32, ValidationError> {
        match self {
            Self::Preset(minutes) => Some(*minutes),
            Self::Custom(text) => text.trim().parse().ok(),
        }
        .filter(|minutes| *minutes > 0)
        .ok_or(ValidationError::InvalidDuration)
    }
}

/// Raw input for creating or editing an alarm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmForm {
    pub hours: String,
    pub minutes: String,
    pub label: String,
    pub repeat_days: Vec<u8>,
    pub snooze_price: String,
    pub snooze_duration: SnoozeDuration,
}

/// An [`AlarmForm`] that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidAlarm {
    pub time: TimeOfDay,
    pub label: String,
    pub repeat_days: BTreeSet<u8>,
    pub snooze_price: SnoozePrice,
    pub snooze_duration: u32,
}

impl AlarmForm {
    /// An empty form preset with the user's defaults, as shown when
    /// creating an alarm.
    #[must_use]
    pub fn new(time: TimeOfDay, settings: &Settings) -> Self {
        Self {
            hours: format!("{:02}", time.hour()),
            minutes: format!("{:02}", time.minute()),
            label: String::new(),
            repeat_days: Vec::new(),
            snooze_price: settings.default_snooze_price.to_string(),
            snooze_duration: SnoozeDuration::Preset(settings.default_snooze_duration),
        }
    }

    /// A form filled in from an existing alarm, as shown when editing it.
    #[must_use]
    pub fn from_alarm(alarm: &Alarm) -> Self {
        Self {
            hours: format!("{:02}", alarm.time.hour()),
            minutes: format!("{:02}", alarm.time.minute()),
            label: alarm.label.clone(),
            repeat_days: alarm.repeat_days.iter().copied().collect(),
            snooze_price: alarm.snooze_price.to_string(),
            snooze_duration: SnoozeDuration::for_minutes(alarm.snooze_duration),
        }
    }

    /// Sets hours and minutes from `HH:MM` text. Anything without a colon
    /// is taken as the hour.
    pub fn set_time(&mut self, text: &str) {
        let (hours, minutes) = text.split_once(':').unwrap_or((text, ""));
        self.hours = hours.to_string();
        self.minutes = minutes.to_string();
    }

    /// Checks the price first, then the time, then the rest.
    pub fn validate(&self) -> Result<ValidAlarm, ValidationError> {
        let snooze_price = self
            .snooze_price
            .parse::<Money>()
            .ok()
            .and_then(SnoozePrice::checked)
            .ok_or(ValidationError::InvalidPrice)?;
        let hours = self.hours.trim().parse::<u8>().ok();
        let minutes = self.minutes.trim().parse::<u8>().ok();
        let time = hours
            .zip(minutes)
            .and_then(|(h, m)| TimeOfDay::new(h, m))
            .ok_or(ValidationError::InvalidTime)?;
        if let Some(day) = self.repeat_days.iter().find(|day| **day > 6) {
            return Err(ValidationError::InvalidDay(*day));
        }
        let label = match self.label.trim() {
            "" => DEFAULT_ALARM_LABEL.to_string(),
            label => label.to_string(),
        };
        Ok(ValidAlarm {
            time,
            label,
            repeat_days: self.repeat_days.iter().copied().collect(),
            snooze_price,
            snooze_duration: self.snooze_duration.minutes()?,
        })
    }

    pub fn into_new_alarm(self, settings: &Settings) -> Result<NewAlarm, ValidationError> {
        let valid = self.validate()?;
        Ok(NewAlarm {
            time: valid.time,
            label: valid.label,
            enabled: true,
            repeat_days: valid.repeat_days,
            snooze_price: valid.snooze_price,
            snooze_duration: valid.snooze_duration,
            sound: settings.default_sound.clone(),
            vibrate: true,
        })
    }

    /// The edit-screen save: only the fields the form covers are changed.
    pub fn into_patch(self) -> Result<AlarmPatch, ValidationError> {
        let valid = self.validate()?;
        Ok(AlarmPatch {
            time: Some(valid.time),
            label: Some(valid.label),
            repeat_days: Some(valid.repeat_days),
            snooze_price: Some(valid.snooze_price),
            snooze_duration: Some(valid.snooze_duration),
            ..AlarmPatch::default()
        })
    }
}

/// Checks a default snooze duration picked on the settings screen, which
/// only offers [`DEFAULT_DURATION_PRESETS`].
pub fn check_default_duration(minutes: u32) -> Result<u32, ValidationError> {
    if DEFAULT_DURATION_PRESETS.contains(&minutes) {
        Ok(minutes)
    } else {
        Err(ValidationError::InvalidDuration)
    }
}

/// Reads the default snooze price from the settings screen. Never fails:
/// unparseable input becomes 1.00 and anything lower is raised to 1.00.
#[must_use]
pub fn coerce_default_price(input: &str) -> SnoozePrice {
    input
        .parse::<Money>()
        .map_or(SnoozePrice::MIN, SnoozePrice::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(time: &str, price: &str) -> AlarmForm {
        let midnight = TimeOfDay::new(0, 0).unwrap();
        let mut form = AlarmForm::new(midnight, &Settings::default());
        form.set_time(time);
        form.snooze_price = price.to_string();
        form
    }

    #[test]
    fn valid_form_is_normalized() {
        let mut form = form("7:5", "2.5");
        form.label = "   ".to_string();
        form.repeat_days = vec![5, 1, 1];
        let valid = form.validate().unwrap();
        assert_eq!(valid.time.to_string(), "07:05");
        assert_eq!(valid.label, "Alarm");
        assert_eq!(valid.repeat_days, BTreeSet::from([1, 5]));
        assert_eq!(valid.snooze_price.amount(), Money::from_cents(250));
        assert_eq!(valid.snooze_duration, 9);
    }

    #[test]
    fn price_below_one_is_rejected() {
        for price in ["0.99", "abc"] {
            assert_eq!(
                form("07:00", price).validate(),
                Err(ValidationError::InvalidPrice)
            );
        }
    }

    #[test]
    fn out_of_range_time_is_rejected() {
        for time in ["24:00", "12:60", "ab:cd", "", "7"] {
            assert_eq!(
                form(time, "1").validate(),
                Err(ValidationError::InvalidTime),
                "{time}"
            );
        }
    }

    #[test]
    fn price_is_checked_before_time() {
        assert_eq!(form("99:99", "0").validate(), Err(ValidationError::InvalidPrice));
    }

    #[test]
    fn custom_duration_must_be_positive() {
        let mut form = form("07:00", "1");
        form.snooze_duration = SnoozeDuration::Custom("0".to_string());
        assert_eq!(form.validate(), Err(ValidationError::InvalidDuration));
        form.snooze_duration = SnoozeDuration::Custom(" 12 ".to_string());
        assert_eq!(form.validate().unwrap().snooze_duration, 12);
    }

    #[test]
    fn bad_weekday_is_rejected() {
        let mut form = form("07:00", "1");
        form.repeat_days = vec![7];
        assert_eq!(form.validate(), Err(ValidationError::InvalidDay(7)));
    }

    #[test]
    fn editing_keeps_custom_durations_custom() {
        let time = TimeOfDay::new(6, 30).unwrap();
        let mut new = NewAlarm::with_defaults(time, &Settings::default());
        new.snooze_duration = 7;
        let form = AlarmForm::from_alarm(&Alarm::from_new("1".to_string(), new));
        assert_eq!(form.snooze_duration, SnoozeDuration::Custom("7".to_string()));
        assert_eq!(form.hours, "06");
        assert_eq!(form.minutes, "30");
    }

    #[test]
    fn default_duration_must_be_a_preset() {
        assert_eq!(check_default_duration(9), Ok(9));
        assert_eq!(check_default_duration(15), Ok(15));
        // offered for single alarms, not as the default
        assert_eq!(check_default_duration(1), Err(ValidationError::InvalidDuration));
        assert_eq!(check_default_duration(0), Err(ValidationError::InvalidDuration));
    }

    #[test]
    fn default_price_input_never_drops_below_one() {
        assert_eq!(coerce_default_price("abc"), SnoozePrice::MIN);
        assert_eq!(coerce_default_price("0.5"), SnoozePrice::MIN);
        assert_eq!(coerce_default_price("").amount(), Money::from_units(1));
        assert_eq!(coerce_default_price("3.75").amount(), Money::from_cents(375));
    }
}
