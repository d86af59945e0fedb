//! Trenord API response DTOs.
//!
//! These types map directly to the `mia/train` JSON response. Required keys
//! are plain fields so a missing one fails deserialization; keys Trenord is
//! known to omit or null out are `Option`.

use serde::Deserialize;

/// One journey day for a train. The endpoint returns an array of these.
#[derive(Debug, Clone, Deserialize)]
pub struct JourneyDay {
    /// Service day, `YYYYMMDD`.
    pub date: String,

    /// Scheduled departure from the origin, `HH:MM:SS`.
    pub dep_time: String,

    /// Scheduled arrival at the destination, `HH:MM:SS`.
    pub arr_time: String,

    /// Origin station.
    pub dep_station: StationRef,

    /// Destination station.
    pub arr_station: StationRef,

    /// Whether the whole journey is flagged cancelled.
    pub cancelled: bool,

    /// Journeys for this day; the first one is authoritative.
    pub journey_list: Vec<JourneyEntry>,
}

/// Station reference at either end of the journey.
#[derive(Debug, Clone, Deserialize)]
pub struct StationRef {
    /// Station identifier ("mir" code), e.g. `S01800`.
    pub station_id: String,

    /// Upper-case station name. Not always sent for the arrival station.
    pub station_ori_name: Option<String>,
}

/// A journey: train details plus the ordered checkpoint list.
#[derive(Debug, Clone, Deserialize)]
pub struct JourneyEntry {
    pub train: TrainInfo,

    /// Checkpoints from origin to destination.
    pub pass_list: Vec<PassPoint>,
}

/// Train-level details of a journey.
#[derive(Debug, Clone, Deserialize)]
pub struct TrainInfo {
    /// Line name, e.g. `S5` or `RE`.
    pub line: String,

    /// Commercial train number.
    pub train_name: String,

    /// Terminus as a direction label, upper case.
    pub direction: String,

    /// Raw status code; `"V"` means running. Often absent.
    #[serde(default)]
    pub status: Option<String>,

    /// Delay in minutes. Absent or null before the train has moved.
    #[serde(default)]
    pub delay: Option<i64>,

    /// Name of the first suppressed station.
    #[serde(default)]
    pub suppression_start: Option<String>,

    /// Id of the first suppressed station.
    #[serde(default)]
    pub suppression_start_mir: Option<String>,

    /// Name of the last suppressed station.
    #[serde(default)]
    pub suppression_end: Option<String>,

    /// Id of the last suppressed station.
    #[serde(default)]
    pub suppression_end_mir: Option<String>,
}

/// One checkpoint of the pass list.
#[derive(Debug, Clone, Deserialize)]
pub struct PassPoint {
    /// `O` origin, `D` destination, anything else an intermediate stop.
    #[serde(rename = "type")]
    pub kind: String,

    /// Whether this stop is cancelled.
    pub cancelled: bool,

    /// Real-time data, only present once the train has reported here.
    #[serde(default)]
    pub actual_data: Option<ActualData>,
}

/// Real-time data for a checkpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ActualData {
    #[serde(default)]
    pub actual_station_mir: Option<String>,

    #[serde(default)]
    pub actual_station_name: Option<String>,
}
