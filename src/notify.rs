//! Scheduled wake-ups through the platform's notification system.
//!
//! Where the platform can wake us at a given time this is the primary way
//! alarms ring; the trigger loop covers everything else. Both decide what is
//! due with [`Alarm::matches`].

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{Duration, NaiveDateTime};
use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::{
    clock::Clock,
    error::Result,
    model::{weekday_index, Alarm},
    ring::RingParams,
    trigger::DeferredTrigger,
};

/// What a scheduled notification carries back when it wakes the app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    #[serde(flatten)]
    pub params: RingParams,
    pub is_snooze: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledWake {
    pub fire_at: NaiveDateTime,
    pub payload: NotificationPayload,
}

pub trait NotificationBackend: Send + Sync {
    fn schedule(&self, wake: &ScheduledWake) -> Result<()>;
    /// Drops every pending wake for `alarm_id`.
    fn cancel(&self, alarm_id: &str) -> Result<()>;
    fn cancel_all(&self) -> Result<()>;
}

impl<T: NotificationBackend + ?Sized> NotificationBackend for Arc<T> {
    fn schedule(&self, wake: &ScheduledWake) -> Result<()> {
        (**self).schedule(wake)
    }

    fn cancel(&self, alarm_id: &str) -> Result<()> {
        (**self).cancel(alarm_id)
    }

    fn cancel_all(&self) -> Result<()> {
        (**self).cancel_all()
    }
}

/// For platforms without scheduled wake-ups; only logs what would have been
/// scheduled and leaves ringing to the trigger loop.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogBackend;

impl NotificationBackend for LogBackend {
    fn schedule(&self, wake: &ScheduledWake) -> Result<()> {
        info!(
            "alarm {} would wake at {} (no scheduled notifications on this platform)",
            wake.payload.params.alarm_id, wake.fire_at
        );
        Ok(())
    }

    fn cancel(&self, _alarm_id: &str) -> Result<()> {
        Ok(())
    }

    fn cancel_all(&self) -> Result<()> {
        Ok(())
    }
}

/// Keeps scheduled wakes in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    wakes: Mutex<Vec<ScheduledWake>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn scheduled(&self) -> Vec<ScheduledWake> {
        self.wakes.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl NotificationBackend for MemoryBackend {
    fn schedule(&self, wake: &ScheduledWake) -> Result<()> {
        self.wakes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(wake.clone());
        Ok(())
    }

    fn cancel(&self, alarm_id: &str) -> Result<()> {
        self.wakes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|wake| wake.payload.params.alarm_id != alarm_id);
        Ok(())
    }

    fn cancel_all(&self) -> Result<()> {
        self.wakes.lock().unwrap_or_else(PoisonError::into_inner).clear();
        Ok(())
    }
}

/// When `alarm` should next ring after `now`, or `None` if it is disabled.
///
/// Today if its time is still ahead, otherwise from tomorrow on, skipping
/// days that aren't in its repeat set.
#[must_use]
pub fn next_occurrence(alarm: &Alarm, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let time = alarm.time.to_naive_time();
    let today = now.date().and_time(time);
    let first = if today > now {
        today
    } else {
        today + Duration::days(1)
    };
    (0..7)
        .map(|offset| first + Duration::days(offset))
        .find(|candidate| alarm.matches(alarm.time, weekday_index(candidate.date())))
}

#[derive(Debug)]
pub struct Scheduler<B, C> {
    backend: B,
    clock: C,
}

impl<B: NotificationBackend, C: Clock> Scheduler<B, C> {
    pub const fn new(backend: B, clock: C) -> Self {
        Self { backend, clock }
    }

    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Replaces any pending wake for `alarm` with one at its next
    /// occurrence. Returns when that is, if anything was scheduled.
    pub fn schedule_alarm(&self, alarm: &Alarm) -> Option<NaiveDateTime> {
        let fire_at = next_occurrence(alarm, self.clock.now())?;
        self.cancel_alarm(&alarm.id);
        let wake = ScheduledWake {
            fire_at,
            payload: NotificationPayload {
                params: RingParams::from(alarm),
                is_snooze: false,
            },
        };
        match self.backend.schedule(&wake) {
            Ok(()) => {
                info!("scheduled alarm {} for {fire_at}", alarm.id);
                Some(fire_at)
            }
            Err(e) => {
                error!("error scheduling alarm {}: {e}", alarm.id);
                None
            }
        }
    }

    pub fn cancel_alarm(&self, alarm_id: &str) {
        if let Err(e) = self.backend.cancel(alarm_id) {
            error!("error cancelling alarm {alarm_id}: {e}");
        }
    }

    pub fn cancel_all(&self) {
        if let Err(e) = self.backend.cancel_all() {
            error!("error cancelling scheduled alarms: {e}");
        }
    }

    /// Drops every pending wake, including ones for alarms that no longer
    /// exist, and schedules every enabled alarm again. Used at startup.
    pub fn reschedule_all(&self, alarms: &[Alarm]) {
        self.cancel_all();
        for alarm in alarms.iter().filter(|alarm| alarm.enabled) {
            self.schedule_alarm(alarm);
        }
    }

    /// Schedules a wake for `snooze` at its deadline, flagged as a snooze so
    /// the ringing prompt can tell it apart from the regular alarm.
    pub fn schedule_snooze(&self, snooze: &DeferredTrigger) -> Option<NaiveDateTime> {
        let wake = ScheduledWake {
            fire_at: snooze.deadline,
            payload: NotificationPayload {
                params: RingParams::from(snooze),
                is_snooze: true,
            },
        };
        match self.backend.schedule(&wake) {
            Ok(()) => {
                info!("scheduled snooze of {} for {}", snooze.alarm_id, snooze.deadline);
                Some(snooze.deadline)
            }
            Err(e) => {
                error!("error scheduling snooze for {}: {e}", snooze.alarm_id);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::{
        clock::ManualClock,
        model::{NewAlarm, Settings},
    };

    // 2024-06-05 was a Wednesday (weekday 3)
    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn alarm(time: &str, days: &[u8]) -> Alarm {
        let mut new = NewAlarm::with_defaults(time.parse().unwrap(), &Settings::default());
        new.repeat_days = days.iter().copied().collect();
        Alarm::from_new("1".to_string(), new)
    }

    #[test]
    fn one_time_alarm_rings_today_or_tomorrow() {
        let alarm = alarm("07:00", &[]);
        assert_eq!(next_occurrence(&alarm, at(5, 6, 0)), Some(at(5, 7, 0)));
        assert_eq!(next_occurrence(&alarm, at(5, 7, 0)), Some(at(6, 7, 0)));
        assert_eq!(next_occurrence(&alarm, at(5, 8, 0)), Some(at(6, 7, 0)));
    }

    #[test]
    fn repeating_alarm_skips_to_a_listed_day() {
        // Monday only
        let alarm = alarm("07:00", &[1]);
        assert_eq!(next_occurrence(&alarm, at(5, 6, 0)), Some(at(10, 7, 0)));
        // Wednesday, later today
        let alarm = self::alarm("07:00", &[3]);
        assert_eq!(next_occurrence(&alarm, at(5, 6, 0)), Some(at(5, 7, 0)));
        // Wednesday, already passed today
        assert_eq!(next_occurrence(&alarm, at(5, 9, 0)), Some(at(12, 7, 0)));
    }

    #[test]
    fn disabled_alarm_is_never_scheduled() {
        let mut alarm = alarm("07:00", &[]);
        alarm.enabled = false;
        assert_eq!(next_occurrence(&alarm, at(5, 6, 0)), None);
    }

    #[test]
    fn rescheduling_replaces_the_old_wake() {
        let scheduler = Scheduler::new(MemoryBackend::new(), ManualClock::new(at(5, 6, 0)));
        let mut alarm = alarm("07:00", &[]);
        scheduler.schedule_alarm(&alarm);
        alarm.time = "08:00".parse().unwrap();
        scheduler.schedule_alarm(&alarm);
        let scheduled = scheduler.backend().scheduled();
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].fire_at, at(5, 8, 0));
        assert!(!scheduled[0].payload.is_snooze);
    }

    #[test]
    fn snooze_wake_is_flagged() {
        let scheduler = Scheduler::new(MemoryBackend::new(), ManualClock::new(at(5, 7, 0)));
        let snooze = DeferredTrigger {
            alarm_id: "1".to_string(),
            label: "gym".to_string(),
            snooze_price: crate::money::SnoozePrice::MIN,
            snooze_duration: 5,
            deadline: at(5, 7, 5),
        };
        assert_eq!(scheduler.schedule_snooze(&snooze), Some(at(5, 7, 5)));
        let scheduled = scheduler.backend().scheduled();
        assert_eq!(scheduled[0].fire_at, at(5, 7, 5));
        assert!(scheduled[0].payload.is_snooze);
        assert_eq!(scheduled[0].payload.params.label, "gym");
    }

    #[test]
    fn reschedule_all_drops_stale_wakes() {
        let scheduler = Scheduler::new(MemoryBackend::new(), ManualClock::new(at(5, 6, 0)));
        let gone = alarm("06:30", &[]);
        scheduler.schedule_alarm(&gone);
        let mut kept = alarm("07:00", &[]);
        kept.id = "2".to_string();
        let mut off = alarm("08:00", &[]);
        off.id = "3".to_string();
        off.enabled = false;
        scheduler.reschedule_all(&[kept, off]);
        let scheduled = scheduler.backend().scheduled();
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].payload.params.alarm_id, "2");
    }
}
