//! Runs the trigger loop on its own thread and talks to it over channels.

use std::{
    io::{BufRead, Write},
    sync::mpsc::{self, Receiver, RecvTimeoutError, Sender},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use log::{info, warn};

use crate::{
    clock::Clock,
    communication::{Command, Message},
    i18n::Strings,
    kv::KeyValueStore,
    notify::{NotificationBackend, Scheduler},
    ring::HandOff,
    trigger::TriggerLoop,
};

/// Ticks `trigger` every `interval` and applies incoming commands in
/// between, until told to stop or every sender is gone. Snoozes are queued on
/// the loop and also handed to `scheduler` as a scheduled wake.
pub fn run<S, C, B, K>(
    trigger: &TriggerLoop<S, C>,
    scheduler: &Scheduler<B, K>,
    interval: Duration,
    hand_off: &impl HandOff,
    commands: &Receiver<Command>,
) where
    S: KeyValueStore,
    C: Clock,
    B: NotificationBackend,
    K: Clock,
{
    info!("starting alarm checker (every {}s)", interval.as_secs_f32());
    trigger.tick(hand_off);
    let mut next_tick = Instant::now() + interval;
    loop {
        match commands.recv_timeout(next_tick.saturating_duration_since(Instant::now())) {
            Ok(Command::Snooze(params)) => {
                scheduler.schedule_snooze(&trigger.snooze(&params));
            }
            Ok(Command::Dismiss(id)) => info!("alarm {id} dismissed"),
            Ok(Command::CheckNow) => {
                trigger.tick(hand_off);
            }
            Ok(Command::Stop) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                trigger.tick(hand_off);
                next_tick = Instant::now() + interval;
            }
        }
    }
    info!("stopping alarm checker");
}

/// A trigger loop running on a background thread. The loop, with its
/// pending snoozes, is dropped when the daemon stops.
#[derive(Debug)]
pub struct Daemon {
    commands: Sender<Command>,
    handle: Option<JoinHandle<()>>,
}

impl Daemon {
    pub fn spawn<S, C, B, K, H>(
        trigger: TriggerLoop<S, C>,
        scheduler: Scheduler<B, K>,
        interval: Duration,
        hand_off: H,
    ) -> Self
    where
        S: KeyValueStore + 'static,
        C: Clock + 'static,
        B: NotificationBackend + 'static,
        K: Clock + 'static,
        H: HandOff + Send + 'static,
    {
        let (commands, rx) = mpsc::channel();
        let handle =
            thread::spawn(move || run(&trigger, &scheduler, interval, &hand_off, &rx));
        Self {
            commands,
            handle: Some(handle),
        }
    }

    #[must_use]
    pub fn commands(&self) -> Sender<Command> {
        self.commands.clone()
    }

    pub fn stop(mut self) {
        // the thread may already be gone
        let _ = self.commands.send(Command::Stop);
        self.join();
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("alarm checker thread panicked");
            }
        }
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        if self.handle.is_some() {
            let _ = self.commands.send(Command::Stop);
            self.join();
        }
    }
}

/// Shows each ringing alarm on `output` and asks whether to snooze (paid)
/// or dismiss (free). Answers go back to the loop over `commands`.
pub fn prompt<R, W>(
    messages: &Receiver<Message>,
    mut input: R,
    mut output: W,
    commands: &Sender<Command>,
    strings: &Strings,
) -> std::io::Result<()>
where
    R: BufRead,
    W: Write,
{
    // ends once the loop thread is gone
    for Message::Ring(params) in messages {
        writeln!(output, "\x07⏰ {}", params.label)?;
        writeln!(
            output,
            "  [s] {} ${} {} ({})",
            strings.pay_to_snooze,
            params.snooze_price,
            strings.to_snooze,
            strings.snooze_minutes(params.snooze_duration)
        )?;
        writeln!(output, "  [d] {} ({})", strings.im_awake, strings.free)?;
        write!(output, "> ")?;
        output.flush()?;

        let mut answer = String::new();
        let closed = input.read_line(&mut answer)? == 0;
        let command = if answer.trim().eq_ignore_ascii_case("s") {
            Command::Snooze(params)
        } else {
            Command::Dismiss(params.alarm_id)
        };
        // a closed input dismisses what is ringing and stops asking
        if commands.send(command).is_err() || closed {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::{i18n::strings, model::Language, ring::RingParams};

    #[test]
    fn snooze_answer_sends_the_params_back() {
        let (tx, messages) = mpsc::channel();
        let (commands, rx) = mpsc::channel();
        let params = RingParams::from_raw(Some("1"), Some("gym"), Some("2"), Some("5"));
        tx.send(Message::Ring(params.clone())).unwrap();
        tx.send(Message::Ring(params.clone())).unwrap();
        drop(tx);

        let mut output = Vec::new();
        prompt(
            &messages,
            Cursor::new("s\nd\n"),
            &mut output,
            &commands,
            strings(Language::En),
        )
        .unwrap();

        assert_eq!(rx.try_recv().unwrap(), Command::Snooze(params));
        assert_eq!(rx.try_recv().unwrap(), Command::Dismiss("1".to_string()));
        let shown = String::from_utf8(output).unwrap();
        assert!(shown.contains("gym"));
        assert!(shown.contains("$2.00"));
        assert!(shown.contains("Snooze 5 min"));
    }

    #[test]
    fn closed_input_dismisses() {
        let (tx, messages) = mpsc::channel();
        let (commands, rx) = mpsc::channel();
        tx.send(Message::Ring(RingParams::from_raw(Some("9"), None, None, None)))
            .unwrap();
        drop(tx);
        prompt(&messages, Cursor::new(""), Vec::new(), &commands, strings(Language::En)).unwrap();
        assert_eq!(rx.try_recv().unwrap(), Command::Dismiss("9".to_string()));
        assert!(rx.try_recv().is_err());
    }
}
