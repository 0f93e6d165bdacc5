#![warn(clippy::pedantic, clippy::nursery, clippy::cargo)]
#![deny(clippy::use_self, rust_2018_idioms, missing_debug_implementations)]

use std::{error::Error, io, process::ExitCode, sync::mpsc, sync::Arc};

use clap::{Args as ClapArgs, Parser, Subcommand};
use pay_to_snooze::{
    clock::SystemClock,
    communication::Message,
    config::Config,
    daemon::{self, Daemon},
    form::{check_default_duration, coerce_default_price, AlarmForm, SnoozeDuration},
    i18n::strings,
    kv::FileStore,
    model::{Language, SettingsPatch, TimeOfDay, WeekStart},
    notify::{LogBackend, Scheduler},
    ring::RingParams,
    service::AlarmService,
    store::AlarmStore,
    trigger::TriggerLoop,
};

type Service = AlarmService<FileStore, LogBackend, SystemClock>;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// write the default config file
    Init {
        #[clap(long, short)]
        force: bool,
    },
    /// watch for alarms and ring them (the default)
    Run,
    List,
    Add {
        /// HH:MM, 24-hour
        #[clap(long, short)]
        time: String,
        #[clap(flatten)]
        fields: AlarmFields,
    },
    Edit {
        id: String,
        #[clap(long, short)]
        time: Option<String>,
        /// make the alarm one-time again
        #[clap(long, conflicts_with = "days")]
        clear_days: bool,
        #[clap(flatten)]
        fields: AlarmFields,
    },
    Remove {
        id: String,
    },
    Toggle {
        id: String,
    },
    Settings {
        #[clap(subcommand)]
        command: Option<SettingsCommand>,
    },
    /// ring right away, as if woken by a scheduled notification
    Ring {
        #[clap(long)]
        alarm_id: Option<String>,
        #[clap(long)]
        label: Option<String>,
        #[clap(long)]
        price: Option<String>,
        #[clap(long)]
        duration: Option<String>,
    },
}

#[derive(ClapArgs)]
struct AlarmFields {
    #[clap(long, short)]
    label: Option<String>,
    /// repeat on these weekdays, 0 = Sunday
    #[clap(long, short, value_delimiter = ',')]
    days: Option<Vec<u8>>,
    /// snooze price in dollars, at least 1.00
    #[clap(long, short)]
    price: Option<String>,
    /// snooze duration in minutes
    #[clap(long)]
    duration: Option<String>,
}

impl AlarmFields {
    fn fill(self, form: &mut AlarmForm) {
        if let Some(label) = self.label {
            form.label = label;
        }
        if let Some(days) = self.days {
            form.repeat_days = days;
        }
        if let Some(price) = self.price {
            form.snooze_price = price;
        }
        if let Some(duration) = self.duration {
            form.snooze_duration = SnoozeDuration::Custom(duration);
        }
    }
}

#[derive(Subcommand)]
enum SettingsCommand {
    Show,
    Set {
        #[clap(long)]
        price: Option<String>,
        /// 5, 9, 10 or 15 minutes
        #[clap(long)]
        duration: Option<u32>,
        #[clap(long)]
        sound: Option<String>,
        #[clap(long)]
        language: Option<Language>,
        #[clap(long)]
        week_start: Option<WeekStart>,
    },
    /// zero the snooze spending total
    ResetSpent,
}

fn main() -> Result<ExitCode, Box<dyn Error>> {
    // initilize the logger
    simple_file_logger::init_logger!("pay_to_snooze").expect("couldn't initialize logger");

    let args = Args::parse();
    if let Some(Command::Init { force }) = args.command {
        if force || !Config::is_config_present()? {
            Config::new().save(Config::config_path()?)?;
            println!("wrote {}", Config::config_path()?.display());
        }
        return Ok(ExitCode::SUCCESS);
    }

    let config = Config::load(Config::config_path()?)?;
    let store = Arc::new(AlarmStore::new(FileStore::new(config.data_path()?)));
    let service = AlarmService::new(store, Scheduler::new(LogBackend, SystemClock));

    match args.command.unwrap_or(Command::Run) {
        Command::Init { .. } => {}
        Command::Run => run(&service, &config, None)?,
        Command::List => list(&service, &config),
        Command::Add { time, fields } => {
            let settings = service.store().settings();
            let now = TimeOfDay::from(chrono::Local::now().time());
            let mut form = AlarmForm::new(now, &settings);
            form.set_time(&time);
            fields.fill(&mut form);
            match form.into_new_alarm(&settings) {
                Ok(new) => println!("created alarm {}", service.create(new).id),
                Err(e) => return Ok(invalid(&e)),
            }
        }
        Command::Edit {
            id,
            time,
            clear_days,
            fields,
        } => {
            let Some(alarm) = service.store().find(&id) else {
                eprintln!("no alarm with id {id}");
                return Ok(ExitCode::FAILURE);
            };
            let mut form = AlarmForm::from_alarm(&alarm);
            if let Some(time) = time {
                form.set_time(&time);
            }
            if clear_days {
                form.repeat_days.clear();
            }
            fields.fill(&mut form);
            match form.into_patch() {
                Ok(patch) => {
                    service.edit(&id, patch);
                }
                Err(e) => return Ok(invalid(&e)),
            }
        }
        Command::Remove { id } => {
            if !service.remove(&id) {
                eprintln!("no alarm with id {id}");
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Toggle { id } => match service.toggle(&id) {
            Some(alarm) => println!(
                "alarm {} {}",
                alarm.id,
                if alarm.enabled { "enabled" } else { "disabled" }
            ),
            None => {
                eprintln!("no alarm with id {id}");
                return Ok(ExitCode::FAILURE);
            }
        },
        Command::Settings { command } => {
            return Ok(settings(&service, command.unwrap_or(SettingsCommand::Show)));
        }
        Command::Ring {
            alarm_id,
            label,
            price,
            duration,
        } => {
            let params = RingParams::from_raw(
                alarm_id.as_deref(),
                label.as_deref(),
                price.as_deref(),
                duration.as_deref(),
            );
            run(&service, &config, Some(params))?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn invalid(e: &pay_to_snooze::form::ValidationError) -> ExitCode {
    eprintln!("{e}");
    ExitCode::FAILURE
}

/// Starts the trigger loop and answers ringing alarms on the terminal.
/// With `ringing`, that alarm is shown first.
fn run(service: &Service, config: &Config, ringing: Option<RingParams>) -> io::Result<()> {
    service.reschedule_all();
    let language = service.store().settings().language;

    let (messages_tx, messages) = mpsc::channel();
    if let Some(params) = ringing {
        // the receiver is still in scope
        let _ = messages_tx.send(Message::Ring(params));
    }
    let trigger = TriggerLoop::new(service.shared_store(), SystemClock);
    let daemon = Daemon::spawn(
        trigger,
        Scheduler::new(LogBackend, SystemClock),
        config.poll_interval(),
        messages_tx,
    );
    let commands = daemon.commands();
    let result = daemon::prompt(
        &messages,
        io::stdin().lock(),
        io::stdout(),
        &commands,
        strings(language),
    );
    daemon.stop();
    result
}

fn list(service: &Service, config: &Config) {
    let settings = service.store().settings();
    let strings = strings(settings.language);
    let alarms = service.alarms();
    if alarms.is_empty() {
        println!("{}", strings.no_alarms);
        return;
    }
    for alarm in alarms {
        println!(
            "{} {} [{}] {} - {} - ${} {}, {}",
            alarm.id,
            alarm.time.to_naive_time().format(&config.time_format),
            if alarm.enabled { "on" } else { "off" },
            alarm.label,
            strings.repeat_summary(&alarm, settings.week_start),
            alarm.snooze_price,
            strings.to_snooze,
            strings.snooze_minutes(alarm.snooze_duration),
        );
    }
}

fn settings(service: &Service, command: SettingsCommand) -> ExitCode {
    let settings = match command {
        SettingsCommand::Show => service.store().settings(),
        SettingsCommand::Set {
            price,
            duration,
            sound,
            language,
            week_start,
        } => {
            let duration = match duration.map(check_default_duration).transpose() {
                Ok(duration) => duration,
                Err(e) => return invalid(&e),
            };
            service.store().update_settings(SettingsPatch {
                default_snooze_price: price.as_deref().map(coerce_default_price),
                default_snooze_duration: duration,
                default_sound: sound,
                language,
                week_start,
                ..SettingsPatch::default()
            })
        }
        SettingsCommand::ResetSpent => service.store().reset_spending(),
    };
    let strings = strings(settings.language);
    println!("{}: ${}", strings.total_spent, settings.total_spent_on_snoozing);
    println!("default snooze price: ${}", settings.default_snooze_price);
    println!("default snooze duration: {} min", settings.default_snooze_duration);
    println!("default sound: {}", settings.default_sound);
    println!("language: {}", settings.language);
    println!("week starts on: {}", settings.week_start);
    ExitCode::SUCCESS
}
