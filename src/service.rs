//! Alarm edits that keep scheduled notifications in step with the store.

use std::sync::Arc;

use log::warn;

use crate::{
    clock::Clock,
    kv::KeyValueStore,
    model::{Alarm, AlarmPatch, NewAlarm},
    notify::{NotificationBackend, Scheduler},
    store::AlarmStore,
};

#[derive(Debug)]
pub struct AlarmService<S, B, C> {
    store: Arc<AlarmStore<S>>,
    scheduler: Scheduler<B, C>,
}

impl<S, B, C> AlarmService<S, B, C>
where
    S: KeyValueStore,
    B: NotificationBackend,
    C: Clock,
{
    pub const fn new(store: Arc<AlarmStore<S>>, scheduler: Scheduler<B, C>) -> Self {
        Self { store, scheduler }
    }

    pub fn store(&self) -> &AlarmStore<S> {
        &self.store
    }

    pub fn shared_store(&self) -> Arc<AlarmStore<S>> {
        Arc::clone(&self.store)
    }

    pub const fn scheduler(&self) -> &Scheduler<B, C> {
        &self.scheduler
    }

    pub fn alarms(&self) -> Vec<Alarm> {
        self.store.alarms()
    }

    pub fn create(&self, new: NewAlarm) -> Alarm {
        let alarm = self.store.create(new);
        if alarm.enabled {
            self.scheduler.schedule_alarm(&alarm);
        }
        alarm
    }

    /// Applies `patch` and reschedules, or cancels if the alarm ends up
    /// disabled. `None` if there is no alarm with `id`.
    pub fn edit(&self, id: &str, patch: AlarmPatch) -> Option<Alarm> {
        let alarm = self.store.update(id, patch);
        self.sync(id, alarm.as_ref());
        alarm
    }

    pub fn toggle(&self, id: &str) -> Option<Alarm> {
        let alarm = self.store.toggle(id);
        self.sync(id, alarm.as_ref());
        alarm
    }

    pub fn remove(&self, id: &str) -> bool {
        self.scheduler.cancel_alarm(id);
        self.store.delete(id)
    }

    /// Schedules every enabled alarm, e.g. at startup.
    pub fn reschedule_all(&self) {
        self.scheduler.reschedule_all(&self.store.alarms());
    }

    fn sync(&self, id: &str, alarm: Option<&Alarm>) {
        match alarm {
            Some(alarm) if alarm.enabled => {
                self.scheduler.schedule_alarm(alarm);
            }
            Some(_) => self.scheduler.cancel_alarm(id),
            None => warn!("no alarm with id {id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::{
        clock::ManualClock,
        kv::MemoryStore,
        model::{Settings, TimeOfDay},
        notify::MemoryBackend,
    };

    type TestService = AlarmService<MemoryStore, MemoryBackend, ManualClock>;

    fn service() -> TestService {
        let now = NaiveDate::from_ymd_opt(2024, 6, 5)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();
        AlarmService::new(
            Arc::new(AlarmStore::new(MemoryStore::new())),
            Scheduler::new(MemoryBackend::new(), ManualClock::new(now)),
        )
    }

    fn new_alarm(hour: u8) -> NewAlarm {
        NewAlarm::with_defaults(TimeOfDay::new(hour, 0).unwrap(), &Settings::default())
    }

    fn scheduled_ids(service: &TestService) -> Vec<String> {
        service
            .scheduler()
            .backend()
            .scheduled()
            .into_iter()
            .map(|wake| wake.payload.params.alarm_id)
            .collect()
    }

    #[test]
    fn create_schedules_enabled_alarms_only() {
        let service = service();
        let on = service.create(new_alarm(7));
        let mut off = new_alarm(8);
        off.enabled = false;
        service.create(off);
        assert_eq!(scheduled_ids(&service), vec![on.id]);
    }

    #[test]
    fn toggling_off_cancels_and_back_on_reschedules() {
        let service = service();
        let alarm = service.create(new_alarm(7));
        service.toggle(&alarm.id);
        assert!(scheduled_ids(&service).is_empty());
        service.toggle(&alarm.id);
        assert_eq!(scheduled_ids(&service), vec![alarm.id]);
    }

    #[test]
    fn editing_moves_the_wake() {
        let service = service();
        let alarm = service.create(new_alarm(7));
        service.edit(
            &alarm.id,
            AlarmPatch {
                time: TimeOfDay::new(9, 30),
                ..AlarmPatch::default()
            },
        );
        let scheduled = service.scheduler().backend().scheduled();
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].fire_at.format("%H:%M").to_string(), "09:30");
    }

    #[test]
    fn remove_cancels_first() {
        let service = service();
        let alarm = service.create(new_alarm(7));
        assert!(service.remove(&alarm.id));
        assert!(scheduled_ids(&service).is_empty());
        assert!(service.alarms().is_empty());
    }
}
