//! Tracker configuration from the environment.

use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

use chrono::DateTime;

use crate::coordinator::TrackerConfig;
use crate::domain::{REFERENCE_TZ, RailInstant};
use crate::polling::PollingWindow;
use crate::trenord::TrenordConfig;

/// Longest accepted tick interval, one day.
const MAX_POLL_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// Longest accepted polling window on either side of the journey, one day.
const MAX_WINDOW_MINS: i64 = 24 * 60;

/// Errors reading configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is not set
    #[error("{0} is not set")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed
    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    /// Only one of departure and arrival was given
    #[error("TRENORD_DEPARTURE_TIME and TRENORD_ARRIVAL_TIME must be set together")]
    PartialSchedule,
}

/// Everything the tracker binary needs to start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Train to track.
    pub train_id: String,
    /// Known schedule, for a warm start.
    pub schedule: Option<(RailInstant, RailInstant)>,
    /// Seconds between ticks.
    pub poll_interval_secs: u64,
    /// Polling window around the schedule.
    pub polling: PollingWindow,
    /// Trenord client settings.
    pub trenord: TrenordConfig,
    /// Serve payloads from this directory instead of the live API.
    pub mock_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`.
    ///
    /// Recognised variables: `TRENORD_TRAIN_ID` (required),
    /// `TRENORD_DEPARTURE_TIME` and `TRENORD_ARRIVAL_TIME` (RFC 3339),
    /// `TRENORD_POLL_INTERVAL_SECS`, `TRENORD_POLL_BEFORE_DEPARTURE_MINS`,
    /// `TRENORD_POLL_AFTER_ARRIVAL_MINS`, `TRENORD_BASE_URL`,
    /// `TRENORD_TIMEOUT_SECS` and `TRENORD_MOCK_DIR`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let train_id = lookup("TRENORD_TRAIN_ID")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("TRENORD_TRAIN_ID"))?;

        let departure = lookup("TRENORD_DEPARTURE_TIME")
            .map(|s| parse_instant("TRENORD_DEPARTURE_TIME", &s))
            .transpose()?;
        let arrival = lookup("TRENORD_ARRIVAL_TIME")
            .map(|s| parse_instant("TRENORD_ARRIVAL_TIME", &s))
            .transpose()?;
        let schedule = match (departure, arrival) {
            (Some(dep), Some(arr)) => Some((dep, arr)),
            (None, None) => None,
            _ => return Err(ConfigError::PartialSchedule),
        };

        let poll_interval_secs = parse_bounded(
            &lookup,
            "TRENORD_POLL_INTERVAL_SECS",
            60,
            1..=MAX_POLL_INTERVAL_SECS,
        )?;
        let polling = PollingWindow::new(
            parse_bounded(
                &lookup,
                "TRENORD_POLL_BEFORE_DEPARTURE_MINS",
                30,
                0..=MAX_WINDOW_MINS,
            )?,
            parse_bounded(
                &lookup,
                "TRENORD_POLL_AFTER_ARRIVAL_MINS",
                10,
                0..=MAX_WINDOW_MINS,
            )?,
        );

        let mut trenord = TrenordConfig::new();
        if let Some(url) = lookup("TRENORD_BASE_URL") {
            trenord = trenord.with_base_url(url);
        }
        if lookup("TRENORD_TIMEOUT_SECS").is_some() {
            trenord = trenord.with_timeout(parse_bounded(
                &lookup,
                "TRENORD_TIMEOUT_SECS",
                10,
                1..=MAX_POLL_INTERVAL_SECS,
            )?);
        }

        Ok(Self {
            train_id,
            schedule,
            poll_interval_secs,
            polling,
            trenord,
            mock_dir: lookup("TRENORD_MOCK_DIR").map(PathBuf::from),
        })
    }

    /// Coordinator configuration for this run.
    pub fn tracker_config(&self) -> TrackerConfig {
        let config = TrackerConfig::new(self.train_id.clone())
            .with_tick_interval(Duration::from_secs(self.poll_interval_secs))
            .with_polling_window(self.polling);

        match self.schedule {
            Some((departure, arrival)) => config.with_schedule(departure, arrival),
            None => config,
        }
    }
}

fn parse_instant(name: &'static str, value: &str) -> Result<RailInstant, ConfigError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&REFERENCE_TZ))
        .map_err(|e| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        })
}

fn parse_number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// Like [`parse_number`], but the value must also fall inside `range`.
fn parse_bounded<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
    range: RangeInclusive<T>,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    let value = parse_number(lookup, name, default)?;
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            name,
            reason: format!(
                "{value} is outside {}..={}",
                range.start(),
                range.end()
            ),
        })
    }
}
