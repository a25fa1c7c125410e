//! Recurrence descriptions and their compilation to the roster wire form
//!
//! A [`RecurrenceSpec`] is the normalized, human-level description ("weekly on
//! Mon and Wed until the end of the year"). The roster API has no weekly
//! period: it models "weekly on selected days" as a daily period with a day
//! filter. [`RecurrenceSpec::compile`] performs that translation and the
//! preview is rendered from the compiled form, so what the user reads is what
//! gets sent.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::dates::{parse_clock_value, parse_date};
use super::row::{JobRow, present};

/// Three-letter day labels, Monday first (index 0 is day 1)
pub const DAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Largest `recurrence_interval` a sheet may ask for
pub const MAX_INTERVAL: u32 = 999;

const DAY_PREFIXES: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecurrenceError {
    #[error("recurrence_type '{0}' is invalid")]
    UnknownType(String),

    #[error("Invalid day(s): {}", .0.join(", "))]
    InvalidDays(Vec<String>),

    #[error("recurrence_interval '{0}' must be an integer between 1 and 999")]
    InvalidInterval(String),

    #[error("Invalid recurrence_end_date '{0}'")]
    InvalidEndDate(String),
}

/// Repeat period as offered to users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    None,
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Yearly,
}

impl Period {
    /// Value of `repeat_interval_period` on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::None => "none",
            Period::Daily => "daily",
            Period::Weekly => "weekly",
            Period::Biweekly => "biweekly",
            Period::Monthly => "monthly",
            Period::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values accepted in the `recurrence_type` column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecurrenceType {
    Daily,
    Weekdays,
    Weekly,
    Biweekly,
    Monthly,
}

impl RecurrenceType {
    pub const ALL: [RecurrenceType; 5] = [
        RecurrenceType::Daily,
        RecurrenceType::Weekdays,
        RecurrenceType::Weekly,
        RecurrenceType::Biweekly,
        RecurrenceType::Monthly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrenceType::Daily => "daily",
            RecurrenceType::Weekdays => "weekdays",
            RecurrenceType::Weekly => "weekly",
            RecurrenceType::Biweekly => "biweekly",
            RecurrenceType::Monthly => "monthly",
        }
    }

    /// Whether `recurrence_days` applies to this type
    pub fn uses_days(&self) -> bool {
        matches!(self, RecurrenceType::Weekly | RecurrenceType::Biweekly)
    }

    pub fn valid_list() -> String {
        Self::ALL.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(", ")
    }
}

impl FromStr for RecurrenceType {
    type Err = RecurrenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == value)
            .ok_or(RecurrenceError::UnknownType(value))
    }
}

/// When a recurring job stops repeating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopMode {
    #[default]
    Never,
    AfterCount(u32),
    OnDate(NaiveDate),
}

impl StopMode {
    /// `frequency_stop_repeat` wire code
    pub fn code(&self) -> u8 {
        match self {
            StopMode::Never => 0,
            StopMode::AfterCount(_) => 1,
            StopMode::OnDate(_) => 2,
        }
    }

    pub fn count(&self) -> Option<u32> {
        match self {
            StopMode::AfterCount(n) => Some(*n),
            _ => None,
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            StopMode::OnDate(date) => Some(*date),
            _ => None,
        }
    }
}

/// Normalized recurrence description of one job
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecurrenceSpec {
    pub is_recurring: bool,
    pub period: Period,
    pub interval_length: u32,
    /// ISO weekday numbers, 1 = Monday .. 7 = Sunday
    pub days_of_week: BTreeSet<u8>,
    pub use_day_of_week_of_month: bool,
    pub stop: StopMode,
}

/// Recurrence fields exactly as the roster API expects them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledRecurrence {
    pub period: Period,
    pub interval_length: u32,
    pub use_day_of_week: bool,
    pub daily_repeat: Vec<u8>,
    pub stop: StopMode,
}

impl RecurrenceSpec {
    pub fn one_off() -> Self {
        Self {
            interval_length: 1,
            ..Default::default()
        }
    }

    pub fn repeating(period: Period) -> Self {
        Self {
            is_recurring: true,
            period,
            interval_length: 1,
            ..Default::default()
        }
    }

    pub fn every(mut self, interval: u32) -> Self {
        self.interval_length = interval.max(1);
        self
    }

    pub fn on_days(mut self, days: impl IntoIterator<Item = u8>) -> Self {
        self.days_of_week = days.into_iter().filter(|d| (1..=7).contains(d)).collect();
        self
    }

    /// Monthly on a weekday ("every month on Tue") instead of the same date
    pub fn on_weekday_of_month(mut self, day: u8) -> Self {
        self.use_day_of_week_of_month = true;
        self.days_of_week = [day].into_iter().filter(|d| (1..=7).contains(d)).collect();
        self
    }

    pub fn ending(mut self, stop: StopMode) -> Self {
        self.stop = stop;
        self
    }

    /// Build the recurrence of a sheet row from its `is_recurring` and
    /// `recurrence_*` columns.
    ///
    /// An explicit falsy `is_recurring` wins over everything else. A truthy
    /// flag without a type means a daily job.
    pub fn from_row(row: &JobRow) -> Result<Self, RecurrenceError> {
        if row.recurring_flag() == Some(false) {
            return Ok(Self::one_off());
        }

        let kind = match row.recurrence_kind() {
            Some(kind) => kind.parse::<RecurrenceType>()?,
            None if row.recurring_flag() == Some(true) => RecurrenceType::Daily,
            None => return Ok(Self::one_off()),
        };

        let interval = match present(&row.recurrence_interval) {
            Some(raw) => match parse_clock_value(raw) {
                Ok(n) if (1..=i64::from(MAX_INTERVAL)).contains(&n) => n as u32,
                _ => return Err(RecurrenceError::InvalidInterval(raw.to_string())),
            },
            None => 1,
        };

        let stop = match present(&row.recurrence_end_date) {
            Some(raw) => StopMode::OnDate(
                parse_date(raw).map_err(|_| RecurrenceError::InvalidEndDate(raw.to_string()))?,
            ),
            None => StopMode::Never,
        };

        let spec = match kind {
            RecurrenceType::Daily => Self::repeating(Period::Daily).every(interval),
            RecurrenceType::Weekdays => Self::repeating(Period::Daily).every(interval).on_days(1..=5),
            RecurrenceType::Weekly | RecurrenceType::Biweekly => {
                let mut days = parse_days(present(&row.recurrence_days).unwrap_or(""))?;
                if days.is_empty() {
                    if let Some(start) = present(&row.date_start).and_then(|raw| parse_date(raw).ok()) {
                        days.insert(weekday_number(start));
                    }
                }
                let period = if kind == RecurrenceType::Biweekly {
                    Period::Biweekly
                } else {
                    Period::Weekly
                };
                Self::repeating(period).every(interval).on_days(days)
            }
            RecurrenceType::Monthly => Self::repeating(Period::Monthly).every(interval),
        };

        Ok(spec.ending(stop))
    }

    /// Translate to the wire representation, `None` for one-off jobs
    pub fn compile(&self) -> Result<Option<CompiledRecurrence>, RecurrenceError> {
        if !self.is_recurring {
            return Ok(None);
        }
        let too_large = || RecurrenceError::InvalidInterval(self.interval_length.to_string());

        let interval = self.interval_length.max(1);
        let days: Vec<u8> = self.days_of_week.iter().copied().collect();

        let (period, interval_length, use_day_of_week, daily_repeat) = match self.period {
            Period::None | Period::Daily => (Period::Daily, interval, false, days),
            Period::Weekly | Period::Biweekly => {
                let interval = if self.period == Period::Biweekly {
                    interval.checked_mul(2).ok_or_else(too_large)?
                } else {
                    interval
                };
                if days.is_empty() {
                    (Period::Daily, interval.checked_mul(7).ok_or_else(too_large)?, false, days)
                } else {
                    (Period::Daily, interval, false, days)
                }
            }
            Period::Monthly if self.use_day_of_week_of_month && !days.is_empty() => {
                (Period::Monthly, interval, true, days)
            }
            Period::Monthly => (Period::Monthly, interval, false, Vec::new()),
            Period::Yearly => (Period::Yearly, interval, false, Vec::new()),
        };

        Ok(Some(CompiledRecurrence {
            period,
            interval_length,
            use_day_of_week,
            daily_repeat,
            stop: self.stop,
        }))
    }

    /// One-line natural language summary
    pub fn preview(&self) -> String {
        match self.compile() {
            Ok(Some(compiled)) => compiled.preview(),
            Ok(None) => "One-time job".to_string(),
            Err(e) => e.to_string(),
        }
    }
}

impl CompiledRecurrence {
    pub fn preview(&self) -> String {
        let n = self.interval_length;
        let frequency = match self.period {
            Period::Monthly if self.use_day_of_week => {
                format!("every {} {} on {}", n, plural(n, "month"), day_list(&self.daily_repeat))
            }
            Period::Monthly => format!("every {} {} on the same date", n, plural(n, "month")),
            Period::Yearly => format!("every {} {}", n, plural(n, "year")),
            _ if self.daily_repeat.is_empty() => format!("every {} {}", n, plural(n, "day")),
            // A daily period filtered to some days reads as a weekly pattern
            _ if self.daily_repeat.len() < 7 => {
                if n == 1 {
                    format!("weekly on {}", day_list(&self.daily_repeat))
                } else {
                    format!("every {} weeks on {}", n, day_list(&self.daily_repeat))
                }
            }
            _ => format!("every {} {} on {}", n, plural(n, "day"), day_list(&self.daily_repeat)),
        };

        let end = match self.stop {
            StopMode::Never => String::new(),
            StopMode::AfterCount(count) => format!(", ending after {} times", count),
            StopMode::OnDate(date) => format!(", ending on {}", date.format("%Y-%m-%d")),
        };

        format!("Repeats {}{}", frequency, end)
    }
}

/// Map a day token to its ISO number using its first three letters
pub fn parse_day_token(token: &str) -> Option<u8> {
    let prefix = day_prefix(token);
    DAY_PREFIXES
        .iter()
        .position(|p| *p == prefix)
        .map(|i| i as u8 + 1)
}

/// Lower-cased three-letter prefix the way day tokens are compared
pub fn day_prefix(token: &str) -> String {
    token.trim().to_lowercase().chars().take(3).collect()
}

/// Parse a comma separated day list; all unknown tokens are reported together
pub fn parse_days(raw: &str) -> Result<BTreeSet<u8>, RecurrenceError> {
    let mut days = BTreeSet::new();
    let mut invalid = Vec::new();

    for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        match parse_day_token(token) {
            Some(day) => {
                days.insert(day);
            }
            None => invalid.push(day_prefix(token)),
        }
    }

    if invalid.is_empty() {
        Ok(days)
    } else {
        Err(RecurrenceError::InvalidDays(invalid))
    }
}

pub fn weekday_number(date: NaiveDate) -> u8 {
    date.weekday().number_from_monday() as u8
}

fn day_list(days: &[u8]) -> String {
    days.iter()
        .filter(|d| (1..=7).contains(*d))
        .map(|d| DAY_LABELS[(*d - 1) as usize])
        .collect::<Vec<_>>()
        .join(", ")
}

fn plural(n: u32, unit: &str) -> String {
    if n > 1 { format!("{}s", unit) } else { unit.to_string() }
}
