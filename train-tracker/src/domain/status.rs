//! Status classification.
//!
//! Several upstream signals overlap: the checkpoint list, the suppression
//! record, the journey-level cancelled flag and the raw status code. They are
//! combined here with a fixed precedence, highest first.

use super::train::{CurrentStation, StationType, Suppression, TrainStatus};

/// Raw status code Trenord uses for a running train.
pub const RAW_STATUS_TRAVELLING: &str = "V";

/// Classify a train from its observable signals.
///
/// 1. Confirmed at its destination: [`TrainStatus::None`].
/// 2. Suppressed over the full route: [`TrainStatus::Cancelled`].
/// 3. Cancelled flag set: [`TrainStatus::Cancelled`].
/// 4. Raw status `"V"`: [`TrainStatus::Travelling`].
/// 5. Otherwise [`TrainStatus::None`].
///
/// Total over all inputs.
///
/// # Examples
///
/// ```
/// use train_tracker::domain::{TrainStatus, classify};
///
/// assert_eq!(classify(None, None, false, Some("V"), "A", "Z"), TrainStatus::Travelling);
/// assert_eq!(classify(None, None, true, Some("V"), "A", "Z"), TrainStatus::Cancelled);
/// assert_eq!(classify(None, None, false, None, "A", "Z"), TrainStatus::None);
/// ```
pub fn classify(
    current_station: Option<&CurrentStation>,
    suppression: Option<&Suppression>,
    cancelled: bool,
    raw_status: Option<&str>,
    departure_station_id: &str,
    arrival_station_id: &str,
) -> TrainStatus {
    if current_station.is_some_and(|s| s.station_type == StationType::Destination) {
        return TrainStatus::None;
    }

    if suppression.is_some_and(|s| s.covers_journey(departure_station_id, arrival_station_id)) {
        return TrainStatus::Cancelled;
    }

    if cancelled {
        return TrainStatus::Cancelled;
    }

    match raw_status {
        Some(RAW_STATUS_TRAVELLING) => TrainStatus::Travelling,
        _ => TrainStatus::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::train::fixtures::suppression;
    use proptest::prelude::*;

    const DEP: &str = "S01800";
    const ARR: &str = "S01900";

    fn station(station_type: StationType) -> CurrentStation {
        CurrentStation {
            station_id: "S01850".to_string(),
            name: "Saronno".to_string(),
            station_type,
            arrival_time: None,
            departure_time: None,
        }
    }

    #[test]
    fn destination_overrides_cancelled_flag() {
        let dest = station(StationType::Destination);
        assert_eq!(
            classify(Some(&dest), None, true, Some("V"), DEP, ARR),
            TrainStatus::None
        );
    }

    #[test]
    fn destination_overrides_full_suppression() {
        let dest = station(StationType::Destination);
        let full = suppression(DEP, ARR);
        assert_eq!(
            classify(Some(&dest), Some(&full), false, None, DEP, ARR),
            TrainStatus::None
        );
    }

    #[test]
    fn full_suppression_cancels_regardless_of_raw_status() {
        let full = suppression(DEP, ARR);
        for raw in [None, Some("V"), Some("P"), Some("")] {
            assert_eq!(
                classify(None, Some(&full), false, raw, DEP, ARR),
                TrainStatus::Cancelled
            );
        }
    }

    #[test]
    fn partial_suppression_falls_through() {
        let partial = suppression("S01850", ARR);
        assert_eq!(
            classify(None, Some(&partial), false, Some("V"), DEP, ARR),
            TrainStatus::Travelling
        );
        assert_eq!(
            classify(None, Some(&partial), false, None, DEP, ARR),
            TrainStatus::None
        );
    }

    #[test]
    fn intermediate_station_does_not_stop_travelling() {
        let stop = station(StationType::Stop);
        assert_eq!(
            classify(Some(&stop), None, false, Some("V"), DEP, ARR),
            TrainStatus::Travelling
        );
        let origin = station(StationType::Origin);
        assert_eq!(
            classify(Some(&origin), None, true, Some("V"), DEP, ARR),
            TrainStatus::Cancelled
        );
    }

    #[test]
    fn all_absent_is_none() {
        assert_eq!(classify(None, None, false, None, "", ""), TrainStatus::None);
    }

    fn station_strategy() -> impl Strategy<Value = Option<StationType>> {
        prop_oneof![
            Just(None),
            Just(Some(StationType::Origin)),
            Just(Some(StationType::Stop)),
            Just(Some(StationType::Destination)),
        ]
    }

    /// 0 = none, 1 = partial, 2 = full route
    fn suppression_strategy() -> impl Strategy<Value = u8> {
        0u8..3
    }

    fn raw_strategy() -> impl Strategy<Value = Option<String>> {
        prop_oneof![
            Just(None),
            Just(Some("V".to_string())),
            Just(Some("P".to_string())),
            "[A-Z]{0,2}".prop_map(Some),
        ]
    }

    proptest! {
        #[test]
        fn classification_follows_precedence(
            station_type in station_strategy(),
            supp in suppression_strategy(),
            cancelled in any::<bool>(),
            raw in raw_strategy(),
        ) {
            let current = station_type.map(station);
            let record = match supp {
                0 => None,
                1 => Some(suppression(DEP, "S01850")),
                _ => Some(suppression(DEP, ARR)),
            };

            let got = classify(
                current.as_ref(),
                record.as_ref(),
                cancelled,
                raw.as_deref(),
                DEP,
                ARR,
            );

            let expected = if station_type == Some(StationType::Destination) {
                TrainStatus::None
            } else if supp == 2 || cancelled {
                TrainStatus::Cancelled
            } else if raw.as_deref() == Some("V") {
                TrainStatus::Travelling
            } else {
                TrainStatus::None
            };

            prop_assert_eq!(got, expected);
        }
    }
}
