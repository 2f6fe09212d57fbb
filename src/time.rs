//! Timestamp normalization and display formatting.
//!
//! Chat timestamps reach the client in several shapes: RFC 3339 instants from
//! the push channel, naive `YYYY-MM-DD HH:MM:SS` strings from older endpoints,
//! and display strings such as `"Today, 9:55 am"` or `"Jul 31, 6:53 pm"` from
//! the snapshot endpoint. Everything is folded into a [`Timestamp`] here so the
//! rest of the crate only ever compares instants.
//!
//! Display strings carry no year. `"<Mon> <day>, ..."` is resolved against the
//! current local year, so a December message viewed in January lands in the
//! future. This module is the only place that needs to change if that matters.

use std::cmp::Ordering;

use chrono::{
    DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Weekday,
};
use once_cell::sync::Lazy;
use regex::Regex;

/// `<word>[ <day>], H:MM am|pm`
static DISPLAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<word>[A-Za-z]+)(?:\s+(?P<day>\d{1,2}))?,\s*(?P<hour>\d{1,2}):(?P<minute>\d{2})\s*(?P<period>[AaPp][Mm])$",
    )
    .expect("display time regex is valid")
});

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// A message time: either a resolved local instant or a raw value that could
/// not be interpreted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Timestamp {
    At(DateTime<Local>),
    Indeterminate(String),
}

impl Timestamp {
    pub fn now() -> Self {
        Timestamp::At(Local::now())
    }

    /// Normalize a raw timestamp string relative to `now`. Never fails.
    pub fn parse(raw: &str, now: DateTime<Local>) -> Self {
        match normalize(raw, now) {
            Some(instant) => Timestamp::At(instant),
            None => {
                tracing::debug!(raw, "unrecognized timestamp, ordering is indeterminate");
                Timestamp::Indeterminate(raw.to_string())
            }
        }
    }

    pub fn instant(&self) -> Option<DateTime<Local>> {
        match self {
            Timestamp::At(instant) => Some(*instant),
            Timestamp::Indeterminate(_) => None,
        }
    }

    /// Chronological comparison. Indeterminate values compare equal to each
    /// other and older than any resolved instant, so stable sorts keep their
    /// relative arrival order.
    pub fn chronological_cmp(&self, other: &Timestamp) -> Ordering {
        match (self.instant(), other.instant()) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        }
    }

    /// The same instant truncated to the minute. Display strings only carry
    /// minute precision, so this is the granularity at which a fetched message
    /// and a pushed message can be recognized as the same one.
    pub fn minute_bucket(&self) -> Option<i64> {
        self.instant().map(|t| t.timestamp().div_euclid(60))
    }

    /// RFC 3339 rendering for the wire; indeterminate values pass through raw.
    pub fn to_wire(&self) -> String {
        match self {
            Timestamp::At(instant) => instant.to_rfc3339(),
            Timestamp::Indeterminate(raw) => raw.clone(),
        }
    }
}

impl From<DateTime<Local>> for Timestamp {
    fn from(instant: DateTime<Local>) -> Self {
        Timestamp::At(instant)
    }
}

/// Convert a 12-hour clock reading to 24-hour: 12 am is 0, 12 pm stays 12,
/// other pm hours add 12.
pub fn to_24_hour(hour: u32, pm: bool) -> u32 {
    match (hour, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, true) => h + 12,
        (h, false) => h,
    }
}

/// Resolve any recognized timestamp shape to a local instant.
pub fn normalize(raw: &str, now: DateTime<Local>) -> Option<DateTime<Local>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Some(instant.with_timezone(&Local));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Local.from_local_datetime(&naive).earliest();
        }
    }

    parse_display(raw, now)
}

fn parse_display(raw: &str, now: DateTime<Local>) -> Option<DateTime<Local>> {
    let caps = DISPLAY_RE.captures(raw)?;
    let word = &caps["word"];

    let date = match caps.name("day") {
        Some(day) => {
            let month = month_number(word)?;
            let day: u32 = day.as_str().parse().ok()?;
            NaiveDate::from_ymd_opt(now.year(), month, day)?
        }
        None => relative_date(word, now.date_naive())?,
    };

    let hour: u32 = caps["hour"].parse().ok()?;
    let minute: u32 = caps["minute"].parse().ok()?;
    if !(1..=12).contains(&hour) {
        return None;
    }
    let pm = caps["period"].eq_ignore_ascii_case("pm");
    let time = NaiveTime::from_hms_opt(to_24_hour(hour, pm), minute, 0)?;

    Local.from_local_datetime(&date.and_time(time)).earliest()
}

fn relative_date(word: &str, today: NaiveDate) -> Option<NaiveDate> {
    let lower = word.to_ascii_lowercase();
    match lower.as_str() {
        "today" => Some(today),
        "yesterday" => today.pred_opt(),
        _ => {
            let weekday: Weekday = lower.parse().ok()?;
            let back = (7 + today.weekday().num_days_from_monday()
                - weekday.num_days_from_monday())
                % 7;
            let back = if back == 0 { 7 } else { back };
            today.checked_sub_signed(Duration::days(i64::from(back)))
        }
    }
}

fn month_number(name: &str) -> Option<u32> {
    let month = match name.to_ascii_lowercase().as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// `9:55 am`
pub fn format_clock(instant: &DateTime<Local>) -> String {
    instant.format("%-I:%M %P").to_string()
}

/// Conversation-list timestamp, bucketed by local calendar days elapsed.
pub fn format_display_time(instant: &DateTime<Local>, now: &DateTime<Local>) -> String {
    let days = (now.date_naive() - instant.date_naive()).num_days();
    let clock = format_clock(instant);
    match days {
        d if d <= 0 => format!("Today, {}", clock),
        1 => format!("Yesterday, {}", clock),
        2..=6 => format!("{}, {}", instant.format("%a"), clock),
        _ => format!("{} {}, {}", instant.format("%b"), instant.day(), clock),
    }
}

/// Transcript bubble timestamp: bare clock for today, dated otherwise.
pub fn format_message_time(instant: &DateTime<Local>, now: &DateTime<Local>) -> String {
    if instant.date_naive() == now.date_naive() {
        format_clock(instant)
    } else {
        format!(
            "{} {}, {}",
            instant.format("%b"),
            instant.day(),
            format_clock(instant)
        )
    }
}

/// Display formatting for a possibly indeterminate timestamp. Indeterminate
/// values render as an empty string.
pub fn display_time(timestamp: &Timestamp, now: &DateTime<Local>) -> String {
    timestamp
        .instant()
        .map(|instant| format_display_time(&instant, now))
        .unwrap_or_default()
}

pub fn message_time(timestamp: &Timestamp, now: &DateTime<Local>) -> String {
    timestamp
        .instant()
        .map(|instant| format_message_time(&instant, now))
        .unwrap_or_default()
}
