//! Domain types for a tracked train.
//!
//! Everything here is pure: snapshots, classification and time handling
//! have no I/O and are safe to call from any thread.

mod status;
mod time;
mod train;

pub use status::{RAW_STATUS_TRAVELLING, classify};
pub use time::{
    REFERENCE_TZ, RailInstant, TimeError, localize, now, parse_clock_time, parse_journey_times,
    parse_service_date, same_service_day,
};
pub use train::{CurrentStation, StationType, Suppression, Train, TrainStatus};
