//! Time handling for Trenord payloads.
//!
//! Trenord sends the service day as `YYYYMMDD` and clock times as
//! `HH:MM:SS`, both in Italian civil time. Everything is normalized to
//! [`REFERENCE_TZ`] before any comparison, so schedule checks never mix
//! naive and zoned instants.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// The single civil timezone every instant is anchored to.
pub const REFERENCE_TZ: Tz = chrono_tz::Europe::Rome;

/// An instant in the reference timezone.
pub type RailInstant = DateTime<Tz>;

/// Error returned when a date or time field cannot be turned into an instant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time: {reason} ({value})")]
pub struct TimeError {
    reason: &'static str,
    value: String,
}

impl TimeError {
    fn new(reason: &'static str, value: impl Into<String>) -> Self {
        Self {
            reason,
            value: value.into(),
        }
    }
}

/// Current instant in the reference timezone.
pub fn now() -> RailInstant {
    Utc::now().with_timezone(&REFERENCE_TZ)
}

/// Parse a `YYYYMMDD` service day.
pub fn parse_service_date(s: &str) -> Result<NaiveDate, TimeError> {
    NaiveDate::parse_from_str(s, "%Y%m%d").map_err(|_| TimeError::new("expected YYYYMMDD", s))
}

/// Parse an `HH:MM:SS` clock time.
pub fn parse_clock_time(s: &str) -> Result<NaiveTime, TimeError> {
    NaiveTime::parse_from_str(s, "%H:%M:%S").map_err(|_| TimeError::new("expected HH:MM:SS", s))
}

/// Anchor a local date and time to the reference timezone.
///
/// Times falling in the autumn fold resolve to the earlier instant; times
/// inside the spring-forward gap do not exist and are rejected.
pub fn localize(date: NaiveDate, time: NaiveTime) -> Result<RailInstant, TimeError> {
    match REFERENCE_TZ.from_local_datetime(&date.and_time(time)) {
        LocalResult::Single(dt) => Ok(dt),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest),
        LocalResult::None => Err(TimeError::new(
            "local time does not exist in Europe/Rome",
            format!("{date} {time}"),
        )),
    }
}

/// Parse the departure and arrival of a journey day.
///
/// Trenord only sends one service date per journey, so an arrival clock time
/// earlier than the departure means the train runs past midnight.
///
/// # Examples
///
/// ```
/// use train_tracker::domain::parse_journey_times;
///
/// let (dep, arr) = parse_journey_times("20240315", "23:40:00", "00:25:00").unwrap();
/// assert_eq!(dep.format("%Y-%m-%d %H:%M").to_string(), "2024-03-15 23:40");
/// assert_eq!(arr.format("%Y-%m-%d %H:%M").to_string(), "2024-03-16 00:25");
/// ```
pub fn parse_journey_times(
    date: &str,
    dep_time: &str,
    arr_time: &str,
) -> Result<(RailInstant, RailInstant), TimeError> {
    let day = parse_service_date(date)?;
    let dep = parse_clock_time(dep_time)?;
    let arr = parse_clock_time(arr_time)?;

    let arrival_day = if arr < dep {
        day.checked_add_signed(Duration::days(1))
            .ok_or_else(|| TimeError::new("date out of range", date))?
    } else {
        day
    };

    Ok((localize(day, dep)?, localize(arrival_day, arr)?))
}

/// Whether two instants fall on the same calendar day in the reference timezone.
pub fn same_service_day(a: &RailInstant, b: &RailInstant) -> bool {
    a.with_timezone(&REFERENCE_TZ).date_naive() == b.with_timezone(&REFERENCE_TZ).date_naive()
}
