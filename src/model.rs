use std::{collections::BTreeSet, fmt, str::FromStr};

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::money::{Money, SnoozePrice};

pub const DEFAULT_SNOOZE_DURATION: u32 = 9;
pub const DEFAULT_SOUND: &str = "default";

/// Weekday index with 0 = Sunday, fixed by the calendar and independent of
/// the user's week-start preference.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn weekday_index(date: NaiveDate) -> u8 {
    // num_days_from_sunday is always 0..=6
    date.weekday().num_days_from_sunday() as u8
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid time of day `{0}`, expected HH:MM")]
pub struct TimeOfDayError(pub String);

/// An hour and minute on a 24-hour clock, written as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    #[must_use]
    pub const fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self { hour, minute })
        } else {
            None
        }
    }

    #[must_use]
    pub const fn hour(self) -> u8 {
        self.hour
    }

    #[must_use]
    pub const fn minute(self) -> u8 {
        self.minute
    }

    #[must_use]
    pub fn of(time: NaiveDateTime) -> Self {
        Self::from(time.time())
    }

    #[must_use]
    pub fn to_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour.into(), self.minute.into(), 0).unwrap_or(NaiveTime::MIN)
    }
}

impl From<NaiveTime> for TimeOfDay {
    #[allow(clippy::cast_possible_truncation)]
    fn from(time: NaiveTime) -> Self {
        Self {
            hour: time.hour() as u8,
            minute: time.minute() as u8,
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for TimeOfDay {
    type Err = TimeOfDayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || TimeOfDayError(s.to_string());
        let (hour, minute) = s.trim().split_once(':').ok_or_else(err)?;
        let hour = hour.parse().map_err(|_| err())?;
        let minute = minute.parse().map_err(|_| err())?;
        Self::new(hour, minute).ok_or_else(err)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = TimeOfDayError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(time: TimeOfDay) -> Self {
        time.to_string()
    }
}

#[inline]
#[must_use]
pub const fn always_true() -> bool {
    true
}

fn default_sound() -> String {
    DEFAULT_SOUND.to_string()
}

const fn default_snooze_duration() -> u32 {
    DEFAULT_SNOOZE_DURATION
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Alarm {
    pub id: String,
    pub time: TimeOfDay,
    #[serde(default)]
    pub label: String,
    #[serde(default = "always_true")]
    pub enabled: bool,
    /// weekday indices (0 = Sunday), empty for a one-time alarm
    #[serde(default)]
    pub repeat_days: BTreeSet<u8>,
    #[serde(default)]
    pub snooze_price: SnoozePrice,
    #[serde(default = "default_snooze_duration")]
    pub snooze_duration: u32,
    #[serde(default = "default_sound")]
    pub sound: String,
    #[serde(default = "always_true")]
    pub vibrate: bool,
}

impl Alarm {
    #[must_use]
    pub fn from_new(id: String, new: NewAlarm) -> Self {
        Self {
            id,
            time: new.time,
            label: new.label,
            enabled: new.enabled,
            repeat_days: new.repeat_days,
            snooze_price: new.snooze_price,
            snooze_duration: new.snooze_duration,
            sound: new.sound,
            vibrate: new.vibrate,
        }
    }

    #[must_use]
    pub fn is_one_time(&self) -> bool {
        self.repeat_days.is_empty()
    }

    /// Whether this alarm is due at `time` on `weekday`.
    ///
    /// Both the polling loop and the notification scheduler decide with this,
    /// so the two wake paths can't disagree.
    #[must_use]
    pub fn matches(&self, time: TimeOfDay, weekday: u8) -> bool {
        self.enabled
            && self.time == time
            && (self.repeat_days.is_empty() || self.repeat_days.contains(&weekday))
    }
}

/// Everything an alarm needs except its id, which the store assigns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAlarm {
    pub time: TimeOfDay,
    pub label: String,
    pub enabled: bool,
    pub repeat_days: BTreeSet<u8>,
    pub snooze_price: SnoozePrice,
    pub snooze_duration: u32,
    pub sound: String,
    pub vibrate: bool,
}

impl NewAlarm {
    /// A one-time alarm at `time` using the defaults from `settings`.
    #[must_use]
    pub fn with_defaults(time: TimeOfDay, settings: &Settings) -> Self {
        Self {
            time,
            label: String::from("Alarm"),
            enabled: true,
            repeat_days: BTreeSet::new(),
            snooze_price: settings.default_snooze_price,
            snooze_duration: settings.default_snooze_duration,
            sound: settings.default_sound.clone(),
            vibrate: true,
        }
    }
}

/// Partial alarm update; `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlarmPatch {
    pub time: Option<TimeOfDay>,
    pub label: Option<String>,
    pub enabled: Option<bool>,
    pub repeat_days: Option<BTreeSet<u8>>,
    pub snooze_price: Option<SnoozePrice>,
    pub snooze_duration: Option<u32>,
    pub sound: Option<String>,
    pub vibrate: Option<bool>,
}

impl AlarmPatch {
    pub fn apply(self, alarm: &mut Alarm) {
        if let Some(time) = self.time {
            alarm.time = time;
        }
        if let Some(label) = self.label {
            alarm.label = label;
        }
        if let Some(enabled) = self.enabled {
            alarm.enabled = enabled;
        }
        if let Some(days) = self.repeat_days {
            alarm.repeat_days = days;
        }
        if let Some(price) = self.snooze_price {
            alarm.snooze_price = price;
        }
        if let Some(duration) = self.snooze_duration {
            alarm.snooze_duration = duration;
        }
        if let Some(sound) = self.sound {
            alarm.sound = sound;
        }
        if let Some(vibrate) = self.vibrate {
            alarm.vibrate = vibrate;
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind} `{value}`")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Hu,
    Es,
    De,
}

impl FromStr for Language {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "en" => Ok(Self::En),
            "hu" => Ok(Self::Hu),
            "es" => Ok(Self::Es),
            "de" => Ok(Self::De),
            _ => Err(UnknownVariant {
                kind: "language",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::En => "en",
            Self::Hu => "hu",
            Self::Es => "es",
            Self::De => "de",
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

impl WeekStart {
    /// Weekday indices in display order.
    #[must_use]
    pub const fn days(self) -> [u8; 7] {
        match self {
            Self::Sunday => [0, 1, 2, 3, 4, 5, 6],
            Self::Monday => [1, 2, 3, 4, 5, 6, 0],
        }
    }
}

impl FromStr for WeekStart {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sunday" | "sun" => Ok(Self::Sunday),
            "monday" | "mon" => Ok(Self::Monday),
            _ => Err(UnknownVariant {
                kind: "week start",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for WeekStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sunday => "sunday",
            Self::Monday => "monday",
        })
    }
}

/// User settings.
///
/// Every field falls back to its default when missing from the stored
/// record, so settings written by an older version pick up new fields.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub default_snooze_price: SnoozePrice,
    pub default_snooze_duration: u32,
    pub default_sound: String,
    pub total_spent_on_snoozing: Money,
    pub language: Language,
    pub week_start: WeekStart,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_snooze_price: SnoozePrice::MIN,
            default_snooze_duration: DEFAULT_SNOOZE_DURATION,
            default_sound: default_sound(),
            total_spent_on_snoozing: Money::ZERO,
            language: Language::default(),
            week_start: WeekStart::default(),
        }
    }
}

/// Partial settings update; `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsPatch {
    pub default_snooze_price: Option<SnoozePrice>,
    pub default_snooze_duration: Option<u32>,
    pub default_sound: Option<String>,
    pub total_spent_on_snoozing: Option<Money>,
    pub language: Option<Language>,
    pub week_start: Option<WeekStart>,
}

impl SettingsPatch {
    pub fn apply(self, settings: &mut Settings) {
        if let Some(price) = self.default_snooze_price {
            settings.default_snooze_price = price;
        }
        if let Some(duration) = self.default_snooze_duration {
            settings.default_snooze_duration = duration;
        }
        if let Some(sound) = self.default_sound {
            settings.default_sound = sound;
        }
        if let Some(total) = self.total_spent_on_snoozing {
            settings.total_spent_on_snoozing = total;
        }
        if let Some(language) = self.language {
            settings.language = language;
        }
        if let Some(week_start) = self.week_start {
            settings.week_start = week_start;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alarm(time: &str, days: &[u8]) -> Alarm {
        Alarm {
            id: "1".to_string(),
            time: time.parse().unwrap(),
            label: "test".to_string(),
            enabled: true,
            repeat_days: days.iter().copied().collect(),
            snooze_price: SnoozePrice::MIN,
            snooze_duration: 5,
            sound: default_sound(),
            vibrate: true,
        }
    }

    #[test]
    fn time_of_day_is_zero_padded() {
        let time: TimeOfDay = "7:5".parse().unwrap();
        assert_eq!(time.to_string(), "07:05");
        assert!("24:00".parse::<TimeOfDay>().is_err());
        assert!("12:60".parse::<TimeOfDay>().is_err());
        assert!("noon".parse::<TimeOfDay>().is_err());
    }

    #[test]
    fn one_time_alarm_matches_any_weekday() {
        let alarm = alarm("07:00", &[]);
        let seven = TimeOfDay::new(7, 0).unwrap();
        assert!((0..7).all(|day| alarm.matches(seven, day)));
        assert!(!alarm.matches(TimeOfDay::new(7, 1).unwrap(), 0));
    }

    #[test]
    fn repeating_alarm_only_matches_its_days() {
        let alarm = alarm("07:00", &[1, 3]);
        let seven = TimeOfDay::new(7, 0).unwrap();
        assert!(alarm.matches(seven, 1));
        assert!(alarm.matches(seven, 3));
        assert!(!alarm.matches(seven, 0));
        assert!(!alarm.matches(seven, 6));
    }

    #[test]
    fn disabled_alarm_never_matches() {
        let mut alarm = alarm("07:00", &[]);
        alarm.enabled = false;
        assert!(!alarm.matches(TimeOfDay::new(7, 0).unwrap(), 2));
    }

    #[test]
    fn weekday_index_starts_on_sunday() {
        // 2024-06-02 was a Sunday
        let sunday = NaiveDate::from_ymd_opt(2024, 6, 2).unwrap();
        assert_eq!(weekday_index(sunday), 0);
        assert_eq!(weekday_index(sunday.succ_opt().unwrap()), 1);
    }

    #[test]
    fn partial_settings_fill_in_defaults() {
        let settings: Settings = toml::from_str("total_spent_on_snoozing = 3.5").unwrap();
        assert_eq!(settings.total_spent_on_snoozing, Money::from_cents(350));
        assert_eq!(settings.default_snooze_duration, DEFAULT_SNOOZE_DURATION);
        assert_eq!(settings.language, Language::En);
    }

    #[test]
    fn stored_price_below_minimum_is_raised() {
        let settings: Settings = toml::from_str("default_snooze_price = 0.25").unwrap();
        assert_eq!(settings.default_snooze_price, SnoozePrice::MIN);
    }

    #[test]
    fn patch_keeps_unspecified_fields() {
        let mut alarm = alarm("07:00", &[1]);
        AlarmPatch {
            label: Some("gym".to_string()),
            ..AlarmPatch::default()
        }
        .apply(&mut alarm);
        assert_eq!(alarm.label, "gym");
        assert_eq!(alarm.time.to_string(), "07:00");
        assert_eq!(alarm.repeat_days, BTreeSet::from([1]));
    }
}
