//! Stop-order tables shown to the operator
use itertools::Itertools;
use serde::Serialize;

use crate::dal::stops::{StopRegistry, UnknownStop};
use crate::model::passenger::{PassengerRequest, hh_mm};

pub const BOARD_REMARK: &str = "탑승";
pub const ALIGHT_REMARK: &str = "하차";

/// One line of the stop order table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRow {
    pub sequence: usize,
    /// `HH:MM` or empty when unknown
    pub time: String,
    pub stop: String,
    pub remark: String,
}

impl OrderRow {
    fn new(sequence: usize, time: String, stop: &str, remark: String) -> Self {
        OrderRow {
            sequence,
            time,
            stop: stop.to_string(),
            remark,
        }
    }
}

/// One origin/destination combination
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopPair {
    pub sequence: usize,
    pub origin: String,
    pub destination: String,
    /// Straight-line approximation, see [`crate::utils::approx_distance_km`]
    pub distance_km: f64,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SelectionError {
    #[error("select at least one origin and one destination")]
    EmptySelection,

    #[error(transparent)]
    UnknownStop(#[from] UnknownStop),
}

/// Two rows per passenger in insertion order: board at the origin with the
/// recorded time, alight at the destination with no time.
pub fn build_itinerary(passengers: &[PassengerRequest]) -> Vec<OrderRow> {
    passengers
        .iter()
        .enumerate()
        .flat_map(|(i, p)| {
            let n = i + 1;
            [
                OrderRow::new(
                    n * 2 - 1,
                    p.time.format(hh_mm::FORMAT).to_string(),
                    &p.start,
                    format!("{} {BOARD_REMARK}", p.name),
                ),
                OrderRow::new(
                    n * 2,
                    String::new(),
                    &p.end,
                    format!("{} {ALIGHT_REMARK}", p.name),
                ),
            ]
        })
        .collect_vec()
}

/// Every origin paired with every destination, origin-major.
pub fn build_pairs<S: AsRef<str>>(
    stops: &StopRegistry,
    origins: &[S],
    destinations: &[S],
) -> Result<Vec<StopPair>, SelectionError> {
    if origins.is_empty() || destinations.is_empty() {
        return Err(SelectionError::EmptySelection);
    }

    let origins = stops.resolve(origins)?;
    let destinations = stops.resolve(destinations)?;

    let pairs = origins
        .iter()
        .cartesian_product(destinations.iter())
        .enumerate()
        .map(|(i, (o, d))| StopPair {
            sequence: i + 1,
            origin: o.name.clone(),
            destination: d.name.clone(),
            distance_km: o.distance_km(d),
        })
        .collect_vec();

    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dal::stops::tests::sample_registry;
    use chrono::NaiveTime;

    fn passenger(name: &str, start: &str, end: &str, h: u32, m: u32) -> PassengerRequest {
        PassengerRequest {
            name: name.to_string(),
            start: start.to_string(),
            end: end.to_string(),
            time: NaiveTime::from_hms_opt(h, m, 0).unwrap(),
        }
    }

    #[test]
    fn single_passenger_yields_board_and_alight() {
        let rows = build_itinerary(&[passenger("Jihoon", "StopA", "StopB", 7, 30)]);

        assert_eq!(
            rows,
            vec![
                OrderRow {
                    sequence: 1,
                    time: "07:30".to_string(),
                    stop: "StopA".to_string(),
                    remark: "Jihoon 탑승".to_string(),
                },
                OrderRow {
                    sequence: 2,
                    time: String::new(),
                    stop: "StopB".to_string(),
                    remark: "Jihoon 하차".to_string(),
                },
            ]
        );
    }

    #[test]
    fn rows_interleave_in_insertion_order() {
        let passengers = vec![
            passenger("C", "StopC", "StopA", 9, 0),
            passenger("A", "StopA", "StopB", 7, 5),
            passenger("B", "StopB", "StopC", 8, 45),
        ];
        let rows = build_itinerary(&passengers);

        assert_eq!(rows.len(), passengers.len() * 2);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.sequence, i + 1);
            let p = &passengers[i / 2];
            if row.sequence % 2 == 1 {
                assert_eq!(row.time, p.time.format("%H:%M").to_string());
                assert_eq!(row.stop, p.start);
                assert!(row.remark.ends_with(BOARD_REMARK));
            } else {
                assert_eq!(row.time, "");
                assert_eq!(row.stop, p.end);
                assert!(row.remark.ends_with(ALIGHT_REMARK));
            }
        }
        // not sorted by time
        assert_eq!(rows[0].time, "09:00");
    }

    #[test]
    fn empty_list_yields_empty_table() {
        assert!(build_itinerary(&[]).is_empty());
    }

    #[test]
    fn pairs_are_full_product() {
        let stops = sample_registry();
        let pairs = build_pairs(&stops, &["StopA", "StopB"], &["StopA", "StopB", "StopC"]).unwrap();

        assert_eq!(pairs.len(), 6);
        assert_eq!(pairs.iter().map(|p| p.sequence).collect_vec(), (1..=6).collect_vec());
        assert_eq!(
            (pairs[0].origin.as_str(), pairs[0].destination.as_str()),
            ("StopA", "StopA")
        );
        assert_eq!(
            (pairs[5].origin.as_str(), pairs[5].destination.as_str()),
            ("StopB", "StopC")
        );
        assert_eq!(pairs[0].distance_km, 0.0);
        assert_eq!(pairs[1].distance_km, stops.distance_km("StopA", "StopB").unwrap());
    }

    #[test]
    fn pairs_need_both_sides() {
        let stops = sample_registry();
        let none: [&str; 0] = [];

        assert_eq!(
            build_pairs(&stops, &none, &["StopA"]).unwrap_err(),
            SelectionError::EmptySelection
        );
        assert_eq!(
            build_pairs(&stops, &["StopA"], &none).unwrap_err(),
            SelectionError::EmptySelection
        );
    }

    #[test]
    fn pairs_reject_unknown_stops() {
        let stops = sample_registry();
        let err = build_pairs(&stops, &["StopA"], &["Nowhere"]).unwrap_err();
        assert_eq!(err, SelectionError::UnknownStop(UnknownStop("Nowhere".to_string())));
    }
}
