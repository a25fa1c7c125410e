use anyhow::{Result, anyhow};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use log::debug;

/// Zone in which "today" is evaluated unless configured otherwise
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::London;

/// Last serial Excel can represent (9999-12-31)
pub const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// `a/b/YYYY` is read month-first and only falls back to day-first when the
/// first part cannot be a month, so `01/03/2025` is 3 January.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d/%m/%Y", "%Y%m%d"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Current calendar date in the given zone, independent of the host locale
pub fn today_in(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| anyhow!("Unknown timezone '{}': {}", name, e))
}

/// Parse a date cell as written in a job sheet.
///
/// Accepts ISO dates, `YYYY/MM/DD`, `MM/DD/YYYY` (or `DD/MM/YYYY` when the
/// day comes first unambiguously), date-times (time part discarded) and
/// Excel serial numbers.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(anyhow!("Empty date value"));
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Ok(date);
        }
    }

    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(datetime.date());
        }
    }

    if let Ok(serial) = value.parse::<f64>() {
        debug!("Treating '{}' as an Excel serial date", value);
        return excel_serial_to_date(serial);
    }

    Err(anyhow!("Unrecognised date '{}' (expected YYYY-MM-DD)", value))
}

/// Parse an hour or minute cell into an integer.
///
/// Spreadsheet exports often render whole numbers as `9.0`; those are
/// accepted, fractional values are not.
pub fn parse_clock_value(raw: &str) -> Result<i64> {
    let value = raw.trim();

    if let Ok(parsed) = value.parse::<i64>() {
        return Ok(parsed);
    }

    match value.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() && parsed.fract() == 0.0 => Ok(parsed as i64),
        _ => Err(anyhow!("invalid literal for integer: '{}'", value)),
    }
}

/// Convert Excel serial date number to NaiveDate
///
/// Excel stores dates as serial numbers since 1900-01-01
/// This handles the Excel leap year bug (treats 1900 as leap year)
pub fn excel_serial_to_date(serial: f64) -> Result<NaiveDate> {
    if !serial.is_finite() || !(1.0..=MAX_EXCEL_SERIAL).contains(&serial) {
        return Err(anyhow!(
            "Invalid Excel date serial: {} (must be between 1 and {})",
            serial,
            MAX_EXCEL_SERIAL
        ));
    }

    let excel_epoch = NaiveDate::from_ymd_opt(1900, 1, 1)
        .ok_or_else(|| anyhow!("Failed to create Excel epoch date"))?;

    // Serial 60 is the non-existent 1900-02-29
    let adjusted_days = if serial >= 60.0 {
        (serial - 2.0) as i64
    } else {
        (serial - 1.0) as i64
    };

    TimeDelta::try_days(adjusted_days)
        .and_then(|days| excel_epoch.checked_add_signed(days))
        .ok_or_else(|| anyhow!("Invalid Excel date serial: {} (overflow)", serial))
}
