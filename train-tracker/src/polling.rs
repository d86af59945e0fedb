//! Adaptive polling policy.
//!
//! Decides whether a tick is worth a fetch. Far before departure and well
//! after arrival nothing changes upstream, so those ticks are skipped; during
//! the journey every tick polls.

use chrono::Duration;

use crate::domain::{RailInstant, same_service_day};

/// Why the scheduler decided the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollDecision {
    /// The service day changed since the known schedule.
    DayChanged,
    /// Nothing fetched yet.
    FirstPoll,
    /// Departure is close enough.
    NearDeparture,
    /// Departure is still too far away.
    TooEarly,
    /// Recently arrived; catching final corrections.
    SettlingAfterArrival,
    /// Arrived long enough ago.
    TooLate,
    /// Between departure and arrival.
    EnRoute,
}

impl PollDecision {
    /// Whether this decision means fetching.
    pub fn should_poll(self) -> bool {
        !matches!(self, PollDecision::TooEarly | PollDecision::TooLate)
    }
}

/// Windows around the schedule in which polling is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingWindow {
    /// Start polling when departure is closer than this.
    pub before_departure: Duration,
    /// Keep polling while arrival is more recent than this.
    pub after_arrival: Duration,
}

impl PollingWindow {
    /// Create a window from minute counts.
    ///
    /// Counts too large for a [`Duration`] saturate to [`Duration::MAX`].
    pub fn new(before_departure_mins: i64, after_arrival_mins: i64) -> Self {
        let minutes = |mins| Duration::try_minutes(mins).unwrap_or(Duration::MAX);
        Self {
            before_departure: minutes(before_departure_mins),
            after_arrival: minutes(after_arrival_mins),
        }
    }

    /// Evaluate the polling rules in order and report which one applied.
    pub fn decide(
        &self,
        now: &RailInstant,
        departure_time: &RailInstant,
        arrival_time: &RailInstant,
        has_prior_snapshot: bool,
    ) -> PollDecision {
        if !same_service_day(now, departure_time) {
            return PollDecision::DayChanged;
        }

        if !has_prior_snapshot {
            return PollDecision::FirstPoll;
        }

        if departure_time > now {
            return if departure_time.signed_duration_since(*now) < self.before_departure {
                PollDecision::NearDeparture
            } else {
                PollDecision::TooEarly
            };
        }

        if now > arrival_time {
            return if now.signed_duration_since(*arrival_time) < self.after_arrival {
                PollDecision::SettlingAfterArrival
            } else {
                PollDecision::TooLate
            };
        }

        PollDecision::EnRoute
    }

    /// Whether a fetch should happen at `now`.
    pub fn should_poll(
        &self,
        now: &RailInstant,
        departure_time: &RailInstant,
        arrival_time: &RailInstant,
        has_prior_snapshot: bool,
    ) -> bool {
        self.decide(now, departure_time, arrival_time, has_prior_snapshot)
            .should_poll()
    }
}

impl Default for PollingWindow {
    fn default() -> Self {
        Self::new(30, 10)
    }
}

/// [`PollingWindow::should_poll`] with the default 30/10 minute windows.
pub fn should_poll(
    now: &RailInstant,
    departure_time: &RailInstant,
    arrival_time: &RailInstant,
    has_prior_snapshot: bool,
) -> bool {
    PollingWindow::default().should_poll(now, departure_time, arrival_time, has_prior_snapshot)
}
