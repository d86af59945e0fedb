//! Trenord "mia/train" API client and payload conversion.
//!
//! Key characteristics of the endpoint:
//! - Addressed by train id and ISO calendar date
//! - Returns an array of journey days; an empty array means the train
//!   does not run that day
//! - Times are `HH:MM:SS` in Italian civil time, with a separate
//!   `YYYYMMDD` service date
//! - Optional keys (`status`, `delay`, suppression data) are omitted or
//!   null rather than defaulted

mod client;
mod convert;
mod error;
mod mock;
mod types;

pub use client::{TrainFetcher, TrenordClient, TrenordConfig};
pub use convert::{
    ConversionError, ParseOutcome, convert_journey_day, current_station, parse_journey_days,
    parse_train, parse_value, resolve_suppression,
};
pub use error::TrenordError;
pub use mock::{MockResponse, MockTrenordClient};
pub use types::{ActualData, JourneyDay, JourneyEntry, PassPoint, StationRef, TrainInfo};
