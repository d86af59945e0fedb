//! Conversion from Trenord DTOs to domain types.
//!
//! Parsing is pure: no I/O and no clock. Optional upstream fields (`status`,
//! `delay`, suppression keys) get defined defaults; anything else missing is
//! a [`ConversionError`].

use tracing::debug;

use crate::domain::{
    CurrentStation, RailInstant, StationType, Suppression, TimeError, Train, classify,
    parse_journey_times,
};

use super::types::{JourneyDay, PassPoint, TrainInfo};

/// Error during DTO to domain conversion.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConversionError {
    /// Body is not JSON, or does not have the expected shape
    #[error("JSON parse error: {message}")]
    Json {
        message: String,
        body: Option<String>,
    },

    /// Missing required field
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Failed to parse a date or time
    #[error(transparent)]
    InvalidTime(#[from] TimeError),
}

/// Outcome of parsing a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// The train runs today; here is its snapshot.
    Found(Train),
    /// Zero records for this train id and date.
    NotFound,
}

/// Parse a raw response body into a train snapshot.
pub fn parse_train(train_id: &str, body: &str) -> Result<ParseOutcome, ConversionError> {
    let days: Vec<JourneyDay> = serde_json::from_str(body).map_err(|e| ConversionError::Json {
        message: e.to_string(),
        body: Some(body.chars().take(500).collect()),
    })?;

    parse_journey_days(train_id, &days)
}

/// Parse already-decoded JSON into a train snapshot.
pub fn parse_value(
    train_id: &str,
    value: serde_json::Value,
) -> Result<ParseOutcome, ConversionError> {
    let days: Vec<JourneyDay> =
        serde_json::from_value(value).map_err(|e| ConversionError::Json {
            message: e.to_string(),
            body: None,
        })?;

    parse_journey_days(train_id, &days)
}

/// Convert the journey-day records of a response.
///
/// Only the first record is considered; an empty response is
/// [`ParseOutcome::NotFound`].
pub fn parse_journey_days(
    train_id: &str,
    days: &[JourneyDay],
) -> Result<ParseOutcome, ConversionError> {
    match days.first() {
        Some(day) => convert_journey_day(train_id, day).map(ParseOutcome::Found),
        None => Ok(ParseOutcome::NotFound),
    }
}

/// Convert one journey-day record into a [`Train`].
pub fn convert_journey_day(train_id: &str, day: &JourneyDay) -> Result<Train, ConversionError> {
    let entry = day
        .journey_list
        .first()
        .ok_or(ConversionError::MissingField("journey_list[0]"))?;
    let info = &entry.train;

    let (departure_time, arrival_time) =
        parse_journey_times(&day.date, &day.dep_time, &day.arr_time)?;

    let departure_station_name = day
        .dep_station
        .station_ori_name
        .as_deref()
        .map(capitalize)
        .ok_or(ConversionError::MissingField("dep_station.station_ori_name"))?;
    let departure_station_id = day.dep_station.station_id.clone();
    let arrival_station_id = day.arr_station.station_id.clone();

    let suppression = resolve_suppression(info)?;
    let current_station = current_station(&entry.pass_list);

    let status = classify(
        current_station.as_ref(),
        suppression.as_ref(),
        day.cancelled,
        info.status.as_deref(),
        &departure_station_id,
        &arrival_station_id,
    );

    let train = Train {
        train_id: train_id.to_string(),
        name: display_name(info, &departure_time, &departure_station_name),
        status,
        delay: normalize_delay(info.delay),
        departure_time,
        departure_station_id,
        departure_station_name,
        arrival_time,
        arrival_station_id,
        suppression,
        current_station,
    };

    debug!(train_id, status = %train.status, delay = train.delay, "parsed train");

    Ok(train)
}

/// Extract partial or full cancellation metadata.
///
/// A suppression exists only when `suppression_start` is present; once it
/// is, the other three keys are required.
pub fn resolve_suppression(info: &TrainInfo) -> Result<Option<Suppression>, ConversionError> {
    let Some(from_station_name) = info.suppression_start.clone() else {
        return Ok(None);
    };

    Ok(Some(Suppression {
        from_station_id: info
            .suppression_start_mir
            .clone()
            .ok_or(ConversionError::MissingField("suppression_start_mir"))?,
        from_station_name,
        to_station_id: info
            .suppression_end_mir
            .clone()
            .ok_or(ConversionError::MissingField("suppression_end_mir"))?,
        to_station_name: info
            .suppression_end
            .clone()
            .ok_or(ConversionError::MissingField("suppression_end"))?,
    }))
}

/// Find the last confirmed checkpoint.
///
/// Checkpoints are confirmed in order, so the scan stops at the first one
/// that is not; confirmed checkpoints after a gap are ignored.
pub fn current_station(pass_list: &[PassPoint]) -> Option<CurrentStation> {
    let mut last: Option<(&PassPoint, &str, &str)> = None;

    for point in pass_list {
        match confirmed_at(point) {
            Some((id, name)) => last = Some((point, id, name)),
            None => break,
        }
    }

    let (point, station_id, name) = last?;

    Some(CurrentStation {
        station_id: station_id.to_string(),
        name: name.to_string(),
        station_type: StationType::from_code(&point.kind),
        arrival_time: None,
        departure_time: None,
    })
}

/// Station id and name of a confirmed checkpoint.
fn confirmed_at(point: &PassPoint) -> Option<(&str, &str)> {
    if point.cancelled {
        return None;
    }
    let actual = point.actual_data.as_ref()?;
    Some((
        actual.actual_station_mir.as_deref()?,
        actual.actual_station_name.as_deref()?,
    ))
}

/// Missing, null or negative delays all read as zero.
fn normalize_delay(delay: Option<i64>) -> u32 {
    delay
        .map(|d| d.clamp(0, i64::from(u32::MAX)) as u32)
        .unwrap_or(0)
}

fn display_name(info: &TrainInfo, departure_time: &RailInstant, departure_station: &str) -> String {
    format!(
        "{} {} - {} da {} per {}",
        info.line,
        info.train_name,
        departure_time.format("%H:%M"),
        departure_station,
        capitalize(&info.direction)
    )
}

/// First character upper case, the rest lower case.
fn capitalize(s: &str) -> String {
    let lower = s.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TrainStatus;
    use crate::trenord::types::ActualData;
    use serde_json::json;

    fn pass(kind: &str, cancelled: bool, confirmed: bool, id: &str) -> serde_json::Value {
        if confirmed {
            json!({
                "type": kind,
                "cancelled": cancelled,
                "actual_data": {
                    "actual_station_mir": id,
                    "actual_station_name": format!("STATION {id}")
                }
            })
        } else {
            json!({"type": kind, "cancelled": cancelled})
        }
    }

    fn payload(
        train: serde_json::Value,
        cancelled: bool,
        pass_list: serde_json::Value,
    ) -> serde_json::Value {
        json!([{
            "date": "20240315",
            "dep_time": "08:10:00",
            "arr_time": "09:02:00",
            "dep_station": {"station_id": "S01800", "station_ori_name": "VARESE"},
            "arr_station": {"station_id": "S01900", "station_ori_name": "TREVIGLIO"},
            "cancelled": cancelled,
            "journey_list": [{"train": train, "pass_list": pass_list}]
        }])
    }

    fn train_info(extra: serde_json::Value) -> serde_json::Value {
        let mut base = json!({
            "line": "S5",
            "train_name": "10512",
            "direction": "TREVIGLIO"
        });
        if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        base
    }

    fn found(outcome: ParseOutcome) -> Train {
        match outcome {
            ParseOutcome::Found(train) => train,
            ParseOutcome::NotFound => panic!("expected a train"),
        }
    }

    fn point(kind: &str, cancelled: bool, actual: Option<(&str, &str)>) -> PassPoint {
        PassPoint {
            kind: kind.to_string(),
            cancelled,
            actual_data: actual.map(|(id, name)| ActualData {
                actual_station_mir: Some(id.to_string()),
                actual_station_name: Some(name.to_string()),
            }),
        }
    }

    #[test]
    fn empty_response_is_not_found() {
        assert_eq!(parse_train("10512", "[]").unwrap(), ParseOutcome::NotFound);
    }

    #[test]
    fn travelling_with_null_delay_and_no_confirmed_checkpoint() {
        let body = payload(
            train_info(json!({"status": "V", "delay": null})),
            false,
            json!([pass("O", false, false, "S01800"), pass("D", false, false, "S01900")]),
        );

        let train = found(parse_value("10512", body).unwrap());

        assert_eq!(train.status, TrainStatus::Travelling);
        assert_eq!(train.delay, 0);
        assert!(train.current_station.is_none());
        assert!(train.suppression.is_none());
    }

    #[test]
    fn delay_passes_through() {
        let body = payload(train_info(json!({"delay": 7})), false, json!([]));
        assert_eq!(found(parse_value("10512", body).unwrap()).delay, 7);

        let body = payload(train_info(json!({})), false, json!([]));
        assert_eq!(found(parse_value("10512", body).unwrap()).delay, 0);

        let body = payload(train_info(json!({"delay": -2})), false, json!([]));
        assert_eq!(found(parse_value("10512", body).unwrap()).delay, 0);
    }

    #[test]
    fn full_route_suppression_cancels() {
        let body = payload(
            train_info(json!({
                "status": "V",
                "suppression_start": "VARESE",
                "suppression_start_mir": "S01800",
                "suppression_end": "TREVIGLIO",
                "suppression_end_mir": "S01900"
            })),
            false,
            json!([]),
        );

        let train = found(parse_value("10512", body).unwrap());

        assert_eq!(train.status, TrainStatus::Cancelled);
        let suppression = train.suppression.unwrap();
        assert_eq!(suppression.from_station_name, "VARESE");
        assert_eq!(suppression.to_station_id, "S01900");
    }

    #[test]
    fn partial_suppression_keeps_raw_status() {
        let body = payload(
            train_info(json!({
                "status": "V",
                "suppression_start": "SARONNO",
                "suppression_start_mir": "S01850",
                "suppression_end": "TREVIGLIO",
                "suppression_end_mir": "S01900"
            })),
            false,
            json!([]),
        );

        let train = found(parse_value("10512", body).unwrap());
        assert_eq!(train.status, TrainStatus::Travelling);
        assert!(train.suppression.is_some());
    }

    #[test]
    fn incomplete_suppression_is_a_parse_failure() {
        let body = payload(
            train_info(json!({"suppression_start": "SARONNO"})),
            false,
            json!([]),
        );

        let err = parse_value("10512", body).unwrap_err();
        assert!(matches!(
            err,
            ConversionError::MissingField("suppression_start_mir")
        ));
    }

    #[test]
    fn cancelled_flag_cancels() {
        let body = payload(train_info(json!({"status": "V"})), true, json!([]));
        assert_eq!(
            found(parse_value("10512", body).unwrap()).status,
            TrainStatus::Cancelled
        );
    }

    #[test]
    fn arrived_at_destination_is_none() {
        let body = payload(
            train_info(json!({"status": "V"})),
            true,
            json!([
                pass("O", false, true, "S01800"),
                pass("F", false, true, "S01850"),
                pass("D", false, true, "S01900")
            ]),
        );

        let train = found(parse_value("10512", body).unwrap());
        assert_eq!(train.status, TrainStatus::None);
        let current = train.current_station.unwrap();
        assert_eq!(current.station_type, StationType::Destination);
        assert_eq!(current.station_id, "S01900");
    }

    #[test]
    fn display_name_and_times() {
        let body = payload(train_info(json!({})), false, json!([]));
        let train = found(parse_value("10512", body).unwrap());

        assert_eq!(train.name, "S5 10512 - 08:10 da Varese per Treviglio");
        assert_eq!(train.departure_station_name, "Varese");
        assert_eq!(train.train_id, "10512");
        assert_eq!(
            train.arrival_time.format("%Y-%m-%d %H:%M %Z").to_string(),
            "2024-03-15 09:02 CET"
        );
    }

    #[test]
    fn only_first_record_is_used() {
        let mut body = payload(train_info(json!({"delay": 1})), false, json!([]));
        let second = payload(train_info(json!({"delay": 9})), false, json!([]))[0].clone();
        if let Some(days) = body.as_array_mut() {
            days.push(second);
        }
        assert_eq!(found(parse_value("10512", body).unwrap()).delay, 1);
    }

    #[test]
    fn missing_required_key_is_a_parse_failure() {
        let body = json!([{"date": "20240315"}]);
        assert!(matches!(
            parse_value("10512", body),
            Err(ConversionError::Json { .. })
        ));

        let err = parse_train("10512", "<html>down</html>").unwrap_err();
        match err {
            ConversionError::Json { body, .. } => {
                assert_eq!(body.as_deref(), Some("<html>down</html>"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_journey_list_is_a_parse_failure() {
        let mut body = payload(train_info(json!({})), false, json!([]));
        body[0]["journey_list"] = json!([]);
        assert!(matches!(
            parse_value("10512", body),
            Err(ConversionError::MissingField("journey_list[0]"))
        ));
    }

    #[test]
    fn bad_time_is_a_parse_failure() {
        let mut body = payload(train_info(json!({})), false, json!([]));
        body[0]["dep_time"] = json!("8:10");
        assert!(matches!(
            parse_value("10512", body),
            Err(ConversionError::InvalidTime(_))
        ));
    }

    #[test]
    fn tracker_stops_at_first_unconfirmed() {
        let list = vec![
            point("O", false, Some(("S1", "ONE"))),
            point("F", false, Some(("S2", "TWO"))),
            point("F", false, None),
            point("F", false, Some(("S4", "FOUR"))),
        ];

        let current = current_station(&list).unwrap();
        assert_eq!(current.station_id, "S2");
        assert_eq!(current.name, "TWO");
        assert_eq!(current.station_type, StationType::Stop);
    }

    #[test]
    fn tracker_treats_cancelled_stop_as_unconfirmed() {
        let list = vec![
            point("O", false, Some(("S1", "ONE"))),
            point("F", true, Some(("S2", "TWO"))),
            point("D", false, Some(("S3", "THREE"))),
        ];

        let current = current_station(&list).unwrap();
        assert_eq!(current.station_id, "S1");
        assert_eq!(current.station_type, StationType::Origin);
    }

    #[test]
    fn tracker_requires_both_id_and_name() {
        let mut half = point("O", false, Some(("S1", "ONE")));
        if let Some(actual) = half.actual_data.as_mut() {
            actual.actual_station_name = None;
        }
        assert!(current_station(&[half]).is_none());
    }

    #[test]
    fn tracker_empty_prefix_is_none() {
        assert!(current_station(&[]).is_none());
        assert!(current_station(&[point("O", false, None)]).is_none());
    }

    #[test]
    fn capitalize_normalizes_case() {
        assert_eq!(capitalize("MILANO CADORNA"), "Milano cadorna");
        assert_eq!(capitalize("treviglio"), "Treviglio");
        assert_eq!(capitalize(""), "");
    }
}
