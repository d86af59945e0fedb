//! Train snapshot types.
//!
//! A [`Train`] is one immutable snapshot produced by a single accepted
//! fetch. Updates replace the whole value; nothing is patched in place.

use std::fmt;

use super::time::RailInstant;

/// Observable state of a train, as derived by [`classify`](super::classify).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrainStatus {
    /// Not running yet, already arrived, or no usable signal.
    None,
    /// Reported as running.
    Travelling,
    /// Cancelled for the whole journey.
    Cancelled,
}

impl TrainStatus {
    /// Stable upper-case label, suitable for an enum sensor.
    pub fn as_str(&self) -> &'static str {
        match self {
            TrainStatus::None => "NONE",
            TrainStatus::Travelling => "TRAVELLING",
            TrainStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for TrainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of a checkpoint within the journey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StationType {
    Origin,
    Stop,
    Destination,
}

impl StationType {
    /// Map a Trenord pass-list type code. Anything other than `"O"` or `"D"`
    /// is an intermediate stop.
    ///
    /// # Examples
    ///
    /// ```
    /// use train_tracker::domain::StationType;
    ///
    /// assert_eq!(StationType::from_code("O"), StationType::Origin);
    /// assert_eq!(StationType::from_code("D"), StationType::Destination);
    /// assert_eq!(StationType::from_code("F"), StationType::Stop);
    /// ```
    pub fn from_code(code: &str) -> Self {
        match code {
            "O" => StationType::Origin,
            "D" => StationType::Destination,
            _ => StationType::Stop,
        }
    }
}

/// A cancelled leg between two stations.
///
/// May cover the whole journey or only part of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suppression {
    pub from_station_id: String,
    pub from_station_name: String,
    pub to_station_id: String,
    pub to_station_name: String,
}

impl Suppression {
    /// Returns true if this suppression spans exactly the journey's endpoints.
    pub fn covers_journey(&self, departure_station_id: &str, arrival_station_id: &str) -> bool {
        self.from_station_id == departure_station_id && self.to_station_id == arrival_station_id
    }
}

/// The last checkpoint the train has confirmed passing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentStation {
    pub station_id: String,
    pub name: String,
    pub station_type: StationType,
    pub arrival_time: Option<RailInstant>,
    pub departure_time: Option<RailInstant>,
}

/// One snapshot of a tracked train.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Train {
    /// Opaque upstream identifier.
    pub train_id: String,
    /// Display name, e.g. "S5 10512 - 08:10 da Varese per Treviglio".
    pub name: String,
    pub status: TrainStatus,
    /// Delay in minutes, never negative.
    pub delay: u32,
    pub departure_time: RailInstant,
    pub departure_station_id: String,
    pub departure_station_name: String,
    pub arrival_time: RailInstant,
    pub arrival_station_id: String,
    pub suppression: Option<Suppression>,
    pub current_station: Option<CurrentStation>,
}

impl Train {
    /// Returns true once the scheduled arrival is no longer in the future.
    pub fn has_arrived(&self, now: &RailInstant) -> bool {
        self.arrival_time <= *now
    }

    /// Delay to report at `now`; resets to zero after the scheduled arrival.
    pub fn delay_at(&self, now: &RailInstant) -> u32 {
        if self.has_arrived(now) { 0 } else { self.delay }
    }

    /// Suppression to report at `now`; cleared after the scheduled arrival.
    pub fn suppression_at(&self, now: &RailInstant) -> Option<&Suppression> {
        if self.has_arrived(now) {
            None
        } else {
            self.suppression.as_ref()
        }
    }

    /// Returns true if the suppression covers the full route.
    pub fn is_fully_suppressed(&self) -> bool {
        self.suppression
            .as_ref()
            .is_some_and(|s| s.covers_journey(&self.departure_station_id, &self.arrival_station_id))
    }
}
