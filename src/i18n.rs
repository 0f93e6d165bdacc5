//! Translated labels for the terminal interface.

use crate::model::{Alarm, Language, WeekStart};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strings {
    /// short weekday names, Sunday first
    pub days: [&'static str; 7],
    pub one_time: &'static str,
    pub to_snooze: &'static str,
    pub pay_to_snooze: &'static str,
    /// `{0}` is replaced by the minutes
    pub snooze_min: &'static str,
    pub im_awake: &'static str,
    pub free: &'static str,
    pub total_spent: &'static str,
    pub no_alarms: &'static str,
}

const EN: Strings = Strings {
    days: ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"],
    one_time: "One time",
    to_snooze: "to snooze",
    pay_to_snooze: "💳 Pay to snooze",
    snooze_min: "Snooze {0} min",
    im_awake: "I'm Awake!",
    free: "Free",
    total_spent: "Total Spent on Snoozing",
    no_alarms: "No Alarms Yet",
};

const HU: Strings = Strings {
    days: ["Vas", "Hét", "Ked", "Sze", "Csü", "Pén", "Szo"],
    one_time: "Egyszeri",
    to_snooze: "szundi",
    pay_to_snooze: "💳 Fizess a szundiért",
    snooze_min: "Szundi {0} perc",
    im_awake: "Ébren vagyok!",
    free: "Ingyenes",
    total_spent: "Összesen szundira költve",
    no_alarms: "Még nincsenek ébresztők",
};

const ES: Strings = Strings {
    days: ["Dom", "Lun", "Mar", "Mié", "Jue", "Vie", "Sáb"],
    one_time: "Una vez",
    to_snooze: "por snooze",
    pay_to_snooze: "💳 Paga por snooze",
    snooze_min: "Snooze {0} min",
    im_awake: "¡Estoy Despierto!",
    free: "Gratis",
    total_spent: "Total gastado en snooze",
    no_alarms: "Sin Alarmas",
};

const DE: Strings = Strings {
    days: ["So", "Mo", "Di", "Mi", "Do", "Fr", "Sa"],
    one_time: "Einmalig",
    to_snooze: "zum Schlummern",
    pay_to_snooze: "💳 Bezahle zum Schlummern",
    snooze_min: "Schlummern {0} Min",
    im_awake: "Ich bin wach!",
    free: "Kostenlos",
    total_spent: "Gesamt für Schlummern ausgegeben",
    no_alarms: "Keine Wecker",
};

#[must_use]
pub const fn strings(language: Language) -> &'static Strings {
    match language {
        Language::En => &EN,
        Language::Hu => &HU,
        Language::Es => &ES,
        Language::De => &DE,
    }
}

impl Strings {
    #[must_use]
    pub fn snooze_minutes(&self, minutes: u32) -> String {
        self.snooze_min.replace("{0}", &minutes.to_string())
    }

    /// Repeat days of `alarm` in the user's week order, or "One time".
    #[must_use]
    pub fn repeat_summary(&self, alarm: &Alarm, week_start: WeekStart) -> String {
        if alarm.is_one_time() {
            return self.one_time.to_string();
        }
        week_start
            .days()
            .iter()
            .filter(|day| alarm.repeat_days.contains(*day))
            .map(|day| self.days[usize::from(*day)])
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewAlarm, Settings, TimeOfDay};

    fn alarm(days: &[u8]) -> Alarm {
        let mut new = NewAlarm::with_defaults(TimeOfDay::new(7, 0).unwrap(), &Settings::default());
        new.repeat_days = days.iter().copied().collect();
        Alarm::from_new("1".to_string(), new)
    }

    #[test]
    fn repeat_days_follow_week_start() {
        let alarm = alarm(&[0, 1, 6]);
        let en = strings(Language::En);
        assert_eq!(en.repeat_summary(&alarm, WeekStart::Sunday), "Sun, Mon, Sat");
        assert_eq!(en.repeat_summary(&alarm, WeekStart::Monday), "Mon, Sat, Sun");
    }

    #[test]
    fn one_time_is_translated() {
        let summary = strings(Language::De).repeat_summary(&alarm(&[]), WeekStart::Sunday);
        assert_eq!(summary, "Einmalig");
        assert_eq!(strings(Language::Hu).snooze_minutes(5), "Szundi 5 perc");
    }
}
