//! What gets handed to the ringing prompt when an alarm goes off.

use std::sync::mpsc::Sender;

use serde::{Deserialize, Serialize};

use crate::{
    communication::Message,
    model::{Alarm, DEFAULT_SNOOZE_DURATION},
    money::{Money, SnoozePrice},
    trigger::DeferredTrigger,
};

pub const DEFAULT_LABEL: &str = "Wake Up!";
pub const DEFAULT_ALARM_ID: &str = "demo";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingParams {
    pub alarm_id: String,
    pub label: String,
    pub snooze_price: SnoozePrice,
    /// minutes
    pub snooze_duration: u32,
}

impl RingParams {
    /// Builds params from loosely typed values such as a notification
    /// payload or command line arguments. Missing or unparseable values fall
    /// back to an id of `demo`, a label of `Wake Up!`, a price of 1 and a
    /// duration of 9 minutes.
    #[must_use]
    pub fn from_raw(
        alarm_id: Option<&str>,
        label: Option<&str>,
        snooze_price: Option<&str>,
        snooze_duration: Option<&str>,
    ) -> Self {
        let price = snooze_price
            .and_then(|price| price.parse::<Money>().ok())
            .filter(|price| *price != Money::ZERO)
            .map_or(SnoozePrice::MIN, SnoozePrice::new);
        let duration = snooze_duration
            .and_then(|duration| duration.trim().parse::<u32>().ok())
            .map_or(DEFAULT_SNOOZE_DURATION, duration_or_default);
        Self {
            alarm_id: alarm_id
                .filter(|id| !id.is_empty())
                .unwrap_or(DEFAULT_ALARM_ID)
                .to_string(),
            label: label_or_default(label.unwrap_or_default()),
            snooze_price: price,
            snooze_duration: duration,
        }
    }
}

// a zero-minute snooze would ring again on the very next tick
const fn duration_or_default(minutes: u32) -> u32 {
    if minutes == 0 {
        DEFAULT_SNOOZE_DURATION
    } else {
        minutes
    }
}

fn label_or_default(label: &str) -> String {
    if label.trim().is_empty() {
        DEFAULT_LABEL.to_string()
    } else {
        label.to_string()
    }
}

impl From<&Alarm> for RingParams {
    fn from(alarm: &Alarm) -> Self {
        Self {
            alarm_id: alarm.id.clone(),
            label: label_or_default(&alarm.label),
            snooze_price: alarm.snooze_price,
            snooze_duration: duration_or_default(alarm.snooze_duration),
        }
    }
}

impl From<&DeferredTrigger> for RingParams {
    fn from(trigger: &DeferredTrigger) -> Self {
        Self {
            alarm_id: trigger.alarm_id.clone(),
            label: label_or_default(&trigger.label),
            snooze_price: trigger.snooze_price,
            snooze_duration: duration_or_default(trigger.snooze_duration),
        }
    }
}

/// Takes over when an alarm fires, usually by showing the ringing prompt.
pub trait HandOff {
    fn ring(&self, params: RingParams);
}

impl HandOff for Sender<Message> {
    fn ring(&self, params: RingParams) {
        if self.send(Message::Ring(params)).is_err() {
            log::warn!("ringing prompt is gone, dropping alarm");
        }
    }
}
