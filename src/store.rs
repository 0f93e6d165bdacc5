//! Alarm and settings records on top of a [`KeyValueStore`].
//!
//! Every operation has a fallible `try_` form. The plain forms are what the
//! rest of the app uses: reads fall back to an empty list or default
//! settings, writes are logged and dropped. A failed write means the value
//! handed back to the caller may not match what is on disk.

use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    kv::KeyValueStore,
    model::{Alarm, AlarmPatch, NewAlarm, Settings, SettingsPatch},
    money::Money,
};

pub const ALARMS_KEY: &str = "snoozepay_alarms";
pub const SETTINGS_KEY: &str = "snoozepay_settings";

// toml documents need a table at the top
#[derive(Debug, Default, Serialize, Deserialize)]
struct AlarmList {
    #[serde(default)]
    alarms: Vec<Alarm>,
}

/// Picks an id from the creation time in milliseconds, moved past every
/// numeric id already in use so ids keep increasing even if the clock
/// doesn't.
#[must_use]
pub fn next_alarm_id(existing: &[Alarm], now_millis: i64) -> String {
    let newest = existing
        .iter()
        .filter_map(|alarm| alarm.id.parse::<i64>().ok())
        .max();
    match newest {
        Some(newest) if newest >= now_millis => newest.saturating_add(1),
        _ => now_millis,
    }
    .to_string()
}

#[derive(Debug)]
pub struct AlarmStore<S> {
    kv: S,
    // serializes read-modify-write cycles
    write_lock: Mutex<()>,
}

impl<S: KeyValueStore> AlarmStore<S> {
    pub const fn new(kv: S) -> Self {
        Self {
            kv,
            write_lock: Mutex::new(()),
        }
    }

    pub const fn kv(&self) -> &S {
        &self.kv
    }

    pub fn try_alarms(&self) -> Result<Vec<Alarm>> {
        match self.kv.get(ALARMS_KEY)? {
            Some(text) => Ok(toml::from_str::<AlarmList>(&text)?.alarms),
            None => Ok(Vec::new()),
        }
    }

    /// All alarms in stored order, or none if they can't be read.
    pub fn alarms(&self) -> Vec<Alarm> {
        self.try_alarms().unwrap_or_else(|e| {
            error!("error loading alarms: {e}");
            Vec::new()
        })
    }

    pub fn find(&self, id: &str) -> Option<Alarm> {
        self.alarms().into_iter().find(|alarm| alarm.id == id)
    }

    pub fn try_save_alarms(&self, alarms: &[Alarm]) -> Result<()> {
        let text = toml::to_string(&AlarmList {
            alarms: alarms.to_vec(),
        })?;
        self.kv.set(ALARMS_KEY, &text)
    }

    /// Appends a new alarm and returns it.
    pub fn try_create(&self, new: NewAlarm) -> Result<Alarm> {
        let _guard = self.lock();
        let mut alarms = self.try_alarms()?;
        let alarm = Alarm::from_new(
            next_alarm_id(&alarms, Utc::now().timestamp_millis()),
            new,
        );
        alarms.push(alarm.clone());
        self.try_save_alarms(&alarms)?;
        info!("created alarm {} at {}", alarm.id, alarm.time);
        Ok(alarm)
    }

    /// Like [`AlarmStore::try_create`], but a storage failure is only logged
    /// and the alarm that would have been saved is still returned.
    pub fn create(&self, new: NewAlarm) -> Alarm {
        let fallback = new.clone();
        self.try_create(new).unwrap_or_else(|e| {
            error!("error creating alarm: {e}");
            Alarm::from_new(next_alarm_id(&[], Utc::now().timestamp_millis()), fallback)
        })
    }

    /// Merges `patch` into the alarm with `id`. `Ok(None)` if there is no such alarm.
    pub fn try_update(&self, id: &str, patch: AlarmPatch) -> Result<Option<Alarm>> {
        self.modify(id, |alarm| patch.apply(alarm))
    }

    pub fn update(&self, id: &str, patch: AlarmPatch) -> Option<Alarm> {
        self.try_update(id, patch).unwrap_or_else(|e| {
            error!("error updating alarm {id}: {e}");
            None
        })
    }

    pub fn try_toggle(&self, id: &str) -> Result<Option<Alarm>> {
        self.modify(id, |alarm| alarm.enabled = !alarm.enabled)
    }

    pub fn toggle(&self, id: &str) -> Option<Alarm> {
        self.try_toggle(id).unwrap_or_else(|e| {
            error!("error toggling alarm {id}: {e}");
            None
        })
    }

    /// Returns whether an alarm was removed.
    pub fn try_delete(&self, id: &str) -> Result<bool> {
        let _guard = self.lock();
        let mut alarms = self.try_alarms()?;
        let before = alarms.len();
        alarms.retain(|alarm| alarm.id != id);
        let removed = alarms.len() != before;
        if removed {
            self.try_save_alarms(&alarms)?;
            info!("deleted alarm {id}");
        }
        Ok(removed)
    }

    pub fn delete(&self, id: &str) -> bool {
        self.try_delete(id).unwrap_or_else(|e| {
            error!("error deleting alarm {id}: {e}");
            false
        })
    }

    fn modify(&self, id: &str, f: impl FnOnce(&mut Alarm)) -> Result<Option<Alarm>> {
        let _guard = self.lock();
        let mut alarms = self.try_alarms()?;
        let Some(alarm) = alarms.iter_mut().find(|alarm| alarm.id == id) else {
            return Ok(None);
        };
        f(alarm);
        let alarm = alarm.clone();
        self.try_save_alarms(&alarms)?;
        Ok(Some(alarm))
    }

    /// Stored settings with defaults filled in for anything missing.
    pub fn try_settings(&self) -> Result<Settings> {
        match self.kv.get(SETTINGS_KEY)? {
            Some(text) => Ok(toml::from_str(&text)?),
            None => Ok(Settings::default()),
        }
    }

    pub fn settings(&self) -> Settings {
        self.try_settings().unwrap_or_else(|e| {
            error!("error loading settings: {e}");
            Settings::default()
        })
    }

    pub fn try_update_settings(&self, patch: SettingsPatch) -> Result<Settings> {
        let _guard = self.lock();
        self.merge_settings(patch)
    }

    /// Merges `patch` into the current settings and returns the result,
    /// whether or not it could be saved.
    pub fn update_settings(&self, patch: SettingsPatch) -> Settings {
        self.try_update_settings(patch.clone()).unwrap_or_else(|e| {
            error!("error saving settings: {e}");
            let mut settings = self.settings();
            patch.apply(&mut settings);
            settings
        })
    }

    /// Adds `amount` to the running snooze total.
    pub fn try_add_snooze_spending(&self, amount: Money) -> Result<Settings> {
        let _guard = self.lock();
        let total = self.try_settings()?.total_spent_on_snoozing + amount;
        self.merge_settings(SettingsPatch {
            total_spent_on_snoozing: Some(total),
            ..SettingsPatch::default()
        })
    }

    pub fn add_snooze_spending(&self, amount: Money) -> Settings {
        self.try_add_snooze_spending(amount).unwrap_or_else(|e| {
            error!("error recording snooze spending of {amount}: {e}");
            self.settings()
        })
    }

    pub fn reset_spending(&self) -> Settings {
        self.update_settings(SettingsPatch {
            total_spent_on_snoozing: Some(Money::ZERO),
            ..SettingsPatch::default()
        })
    }

    fn merge_settings(&self, patch: SettingsPatch) -> Result<Settings> {
        let mut settings = self.try_settings()?;
        patch.apply(&mut settings);
        self.kv.set(SETTINGS_KEY, &toml::to_string(&settings)?)?;
        Ok(settings)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
