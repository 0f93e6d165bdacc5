//! The alarm trigger loop.
//!
//! Each [`TriggerLoop::tick`] decides whether something should ring right
//! now. Snoozes that have run out take priority over regular alarms, and at
//! most one hand-off happens per tick so ringing prompts never stack.

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use chrono::{Duration, NaiveDateTime};
use log::{debug, error, info};

use crate::{
    clock::Clock,
    error::Result,
    kv::KeyValueStore,
    model::{weekday_index, TimeOfDay},
    money::SnoozePrice,
    ring::{HandOff, RingParams},
    store::AlarmStore,
};

/// A snooze waiting for its deadline. Lives only as long as the loop does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredTrigger {
    pub alarm_id: String,
    pub label: String,
    pub snooze_price: SnoozePrice,
    pub snooze_duration: u32,
    pub deadline: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// another evaluation was still running
    Skipped,
    /// nothing due
    Idle,
    /// a snoozed alarm came back
    Snoozed(RingParams),
    Fired(RingParams),
    /// evaluation failed, nothing fired
    Failed,
}

#[derive(Debug, Default)]
struct LoopState {
    // (alarm id, clock minute) pairs that already rang
    fired: HashSet<(String, NaiveDateTime)>,
    pending: Vec<DeferredTrigger>,
}

/// Releases the in-flight flag however the cycle ends.
struct CycleGuard<'a>(&'a AtomicBool);

impl<'a> CycleGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Debug)]
pub struct TriggerLoop<S, C> {
    store: Arc<AlarmStore<S>>,
    clock: C,
    evaluating: AtomicBool,
    state: Mutex<LoopState>,
}

impl<S: KeyValueStore, C: Clock> TriggerLoop<S, C> {
    pub fn new(store: Arc<AlarmStore<S>>, clock: C) -> Self {
        Self {
            store,
            clock,
            evaluating: AtomicBool::new(false),
            state: Mutex::new(LoopState::default()),
        }
    }

    pub fn store(&self) -> &AlarmStore<S> {
        &self.store
    }

    /// Runs one evaluation cycle and hands off to `hand_off` if something
    /// is due.
    pub fn tick(&self, hand_off: &impl HandOff) -> TickOutcome {
        let Some(_guard) = CycleGuard::acquire(&self.evaluating) else {
            debug!("previous alarm check still running, skipping");
            return TickOutcome::Skipped;
        };
        let outcome = self.evaluate().unwrap_or_else(|e| {
            error!("error checking alarms: {e}");
            TickOutcome::Failed
        });
        if let TickOutcome::Fired(params) | TickOutcome::Snoozed(params) = &outcome {
            hand_off.ring(params.clone());
        }
        outcome
    }

    fn evaluate(&self) -> Result<TickOutcome> {
        let now = self.clock.now();
        let current = TimeOfDay::of(now);
        // date plus HH:MM, so a marker never carries over to another day
        let minute = now.date().and_time(current.to_naive_time());
        let weekday = weekday_index(now.date());

        if let Some(snooze) = self.take_due_snooze(now) {
            info!(
                "snoozed alarm {} ({}) is ringing again",
                snooze.alarm_id, snooze.label
            );
            return Ok(TickOutcome::Snoozed(RingParams::from(&snooze)));
        }

        self.state().fired.retain(|(_, fired_at)| *fired_at == minute);

        let alarms = self.store.try_alarms()?;
        let mut state = self.state();
        let due = alarms.iter().find(|alarm| {
            !state.fired.contains(&(alarm.id.clone(), minute)) && alarm.matches(current, weekday)
        });
        let Some(alarm) = due else {
            return Ok(TickOutcome::Idle);
        };
        state.fired.insert((alarm.id.clone(), minute));
        info!("alarm {} ({}) is ringing", alarm.id, alarm.label);
        Ok(TickOutcome::Fired(RingParams::from(alarm)))
    }

    // newest snooze first when several are due
    fn take_due_snooze(&self, now: NaiveDateTime) -> Option<DeferredTrigger> {
        let mut state = self.state();
        let index = state.pending.iter().rposition(|snooze| now >= snooze.deadline)?;
        Some(state.pending.remove(index))
    }

    /// Queues the alarm to ring again after its snooze duration and charges
    /// the snooze price to the running total.
    ///
    /// The charge is bookkeeping only, no payment is taken.
    pub fn snooze(&self, params: &RingParams) -> DeferredTrigger {
        let deadline =
            self.clock.now() + Duration::minutes(i64::from(params.snooze_duration));
        let trigger = DeferredTrigger {
            alarm_id: params.alarm_id.clone(),
            label: params.label.clone(),
            snooze_price: params.snooze_price,
            snooze_duration: params.snooze_duration,
            deadline,
        };
        self.state().pending.push(trigger.clone());
        let settings = self.store.add_snooze_spending(params.snooze_price.amount());
        info!(
            "snoozed alarm {} for {} min at ${}, ${} spent so far",
            params.alarm_id,
            params.snooze_duration,
            params.snooze_price,
            settings.total_spent_on_snoozing
        );
        trigger
    }

    /// Snoozes waiting for their deadline, oldest first.
    pub fn pending(&self) -> Vec<DeferredTrigger> {
        self.state().pending.clone()
    }

    fn state(&self) -> MutexGuard<'_, LoopState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
