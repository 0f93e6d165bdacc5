#![warn(clippy::pedantic, clippy::nursery, clippy::cargo)]
#![deny(clippy::use_self, rust_2018_idioms, missing_debug_implementations)]
#![allow(clippy::multiple_crate_versions, clippy::module_name_repetitions)]

//! An alarm clock where dismissing is free and snoozing costs money.
//!
//! The [`trigger::TriggerLoop`] polls the [`store::AlarmStore`] and hands
//! ringing alarms off to whatever shows them; snoozes are queued on the loop
//! and their price is added to the running total in the settings.

pub mod clock;
pub mod communication;
pub mod config;
pub mod daemon;
pub mod error;
pub mod form;
pub mod i18n;
pub mod kv;
pub mod model;
pub mod money;
pub mod notify;
pub mod ring;
pub mod service;
pub mod store;
pub mod trigger;

pub use error::{Error, Result};
