use crate::ring::RingParams;

/// Sent from the trigger loop to the ringing prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Ring(RingParams),
}

/// Sent from the ringing prompt (or anything else driving the daemon) back
/// to the trigger loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// pay and ring again after the snooze duration
    Snooze(RingParams),
    /// free
    Dismiss(String),
    /// evaluate right away instead of waiting for the next tick
    CheckNow,
    Stop,
}
