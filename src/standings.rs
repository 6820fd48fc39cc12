//! Per-frame standings: which cars are shown, in what order, and how far each
//! one is behind the leader.

use std::fmt;

use crate::iracing::{SessionInfo, TelemetrySnapshot};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    pub car_idx: usize,
    pub lap_count: i32,
    pub pct_around_lap: f32,
    pub lap_delta: i32,
    /// Signed time gap to the leader, negative for cars behind.
    pub delta: f32,
    pub position: i32,
    pub best: f32,
    pub last: f32,
    pub has_fastest_lap: bool,
}

/// What the delta column shows for a row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gap {
    None,
    Laps(i32),
    Time(f32),
}

impl fmt::Display for Gap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gap::None => Ok(()),
            Gap::Laps(laps) => write!(f, "{} L", laps),
            Gap::Time(time) => write!(f, "{:.3}", time),
        }
    }
}

/// Builds the sorted rows for one frame. Pace cars, spectators and empty slots
/// are left out; cars without a live position are ranked by their qualifying
/// result.
pub fn aggregate(session: &SessionInfo, telemetry: &TelemetrySnapshot) -> Vec<Row> {
    let mut rows = Vec::with_capacity(session.cars.len());

    let mut fastest_lap_time = f32::MAX;
    let mut fastest_row = None;

    for (idx, car) in session.cars.iter().enumerate() {
        if car.is_pace_car || car.is_spectator || car.user_name.is_empty() {
            continue;
        }

        let live = telemetry.car(idx);
        let row = Row {
            car_idx: idx,
            lap_count: live.lap_completed,
            pct_around_lap: live.lap_dist_pct,
            lap_delta: 0,
            delta: -live.f2_time,
            position: if live.position > 0 { live.position } else { car.qualifying_result_position },
            best: live.best_lap_time,
            last: live.last_lap_time,
            has_fastest_lap: false,
        };

        if row.best >= 0.0 && row.best < fastest_lap_time {
            fastest_lap_time = row.best;
            fastest_row = Some(rows.len());
        }
        rows.push(row);
    }

    if let Some(fastest) = fastest_row {
        rows[fastest].has_fastest_lap = true;
    }

    // Stable, so cars sharing a rank keep slot order
    rows.sort_by_key(|row| row.position);

    if let Some(leader) = rows.first().cloned() {
        for row in &mut rows {
            row.lap_delta = lap_delta(row, &leader);
        }
    }

    rows
}

/// Whole laps between `row` and `leader`. A car on the leader's lap that is
/// further around the track has crossed the line behind the leader and counts
/// as one lap ahead of the raw difference; cars on other laps use the raw
/// completed-lap difference.
fn lap_delta(row: &Row, leader: &Row) -> i32 {
    let raw = row.lap_count - leader.lap_count;
    if raw == 0 && row.pct_around_lap > leader.pct_around_lap {
        raw + 1
    } else {
        raw
    }
}

/// The value shown in the delta column of the row at `index` in the sorted
/// standings.
pub fn gap_to_leader(row: &Row, index: usize) -> Gap {
    if index == 0 {
        Gap::None
    } else if row.lap_delta != 0 {
        Gap::Laps(row.lap_delta)
    } else {
        Gap::Time(row.delta)
    }
}

/// `45.600` below a minute, `01:01.234` above. Non-positive times mean no
/// lap was set and render empty.
pub fn format_lap_time(time: f32) -> String {
    if time <= 0.0 {
        return String::new();
    }
    let mins = (time / 60.0) as i32;
    if mins > 0 {
        format!("{:02}:{:06.3}", mins, time % 60.0)
    } else {
        format!("{:.3}", time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iracing::{Car, CarTelemetry, MAX_CARS};

    fn field(entries: &[(&str, CarTelemetry)]) -> (SessionInfo, TelemetrySnapshot) {
        let mut session = SessionInfo::default();
        let mut telemetry = TelemetrySnapshot::default();
        telemetry.cars = vec![CarTelemetry::default(); MAX_CARS];
        for (idx, (name, live)) in entries.iter().enumerate() {
            session.cars[idx] = Car {
                user_name: name.to_string(),
                ..Car::default()
            };
            telemetry.cars[idx] = *live;
        }
        (session, telemetry)
    }

    fn car(position: i32, lap_completed: i32, lap_dist_pct: f32) -> CarTelemetry {
        CarTelemetry {
            position,
            lap_completed,
            lap_dist_pct,
            best_lap_time: -1.0,
            last_lap_time: -1.0,
            ..CarTelemetry::default()
        }
    }

    #[test]
    fn filters_pace_car_spectators_and_empty_slots() {
        let (mut session, telemetry) = field(&[
            ("Pace Car", car(0, 0, 0.0)),
            ("Viewer", car(0, 0, 0.0)),
            ("Anna Berg", car(1, 3, 0.5)),
            ("", car(2, 3, 0.4)),
        ]);
        session.cars[0].is_pace_car = true;
        session.cars[1].is_spectator = true;

        let rows = aggregate(&session, &telemetry);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].car_idx, 2);
    }

    #[test]
    fn empty_session_yields_no_rows() {
        let rows = aggregate(&SessionInfo::default(), &TelemetrySnapshot::default());
        assert!(rows.is_empty());
    }

    #[test]
    fn falls_back_to_qualifying_position_before_the_start() {
        let (mut session, telemetry) = field(&[("A", car(0, 0, 0.0)), ("B", car(0, 0, 0.0)), ("C", car(0, 0, 0.0))]);
        session.cars[0].qualifying_result_position = 3;
        session.cars[1].qualifying_result_position = 1;
        session.cars[2].qualifying_result_position = 2;

        let order: Vec<usize> = aggregate(&session, &telemetry).iter().map(|r| r.car_idx).collect();
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn equal_ranks_keep_slot_order() {
        let (session, telemetry) = field(&[("A", car(2, 0, 0.0)), ("B", car(1, 0, 0.0)), ("C", car(2, 0, 0.0))]);
        let order: Vec<usize> = aggregate(&session, &telemetry).iter().map(|r| r.car_idx).collect();
        assert_eq!(order, vec![1, 0, 2]);
    }

    #[test]
    fn fastest_lap_is_unique_and_ignores_missing_laps() {
        let (session, mut telemetry) = field(&[("A", car(1, 5, 0.1)), ("B", car(2, 5, 0.0)), ("C", car(3, 5, 0.0))]);
        telemetry.cars[0].best_lap_time = 92.5;
        telemetry.cars[1].best_lap_time = 91.0;
        telemetry.cars[2].best_lap_time = 91.0;

        let rows = aggregate(&session, &telemetry);
        let fastest: Vec<usize> = rows.iter().filter(|r| r.has_fastest_lap).map(|r| r.car_idx).collect();
        assert_eq!(fastest, vec![1]);

        for live in &mut telemetry.cars {
            live.best_lap_time = -1.0;
        }
        assert!(aggregate(&session, &telemetry).iter().all(|r| !r.has_fastest_lap));
    }

    #[test]
    fn fastest_lap_follows_the_row_not_the_slot() {
        let (mut session, mut telemetry) = field(&[("Pace Car", car(0, 0, 0.0)), ("A", car(2, 5, 0.0)), ("B", car(1, 5, 0.0))]);
        session.cars[0].is_pace_car = true;
        telemetry.cars[1].best_lap_time = 95.0;
        telemetry.cars[2].best_lap_time = 90.0;

        let rows = aggregate(&session, &telemetry);
        assert_eq!(rows[0].car_idx, 2);
        assert!(rows[0].has_fastest_lap);
        assert!(!rows[1].has_fastest_lap);
    }

    #[test]
    fn lap_delta_counts_cars_past_the_line() {
        let (session, telemetry) = field(&[("Leader", car(1, 10, 0.5)), ("Ahead", car(2, 10, 0.9))]);
        let rows = aggregate(&session, &telemetry);
        assert_eq!(rows[1].lap_delta, 1);
        assert_eq!(gap_to_leader(&rows[1], 1).to_string(), "1 L");

        let (session, telemetry) = field(&[("Leader", car(1, 10, 0.5)), ("Lapped", car(2, 9, 0.9))]);
        let rows = aggregate(&session, &telemetry);
        assert_eq!(rows[1].lap_delta, -1);

        let (session, telemetry) = field(&[("Leader", car(1, 10, 0.5)), ("Lapped", car(2, 9, 0.3))]);
        let rows = aggregate(&session, &telemetry);
        assert_eq!(rows[1].lap_delta, -1);
        assert_eq!(gap_to_leader(&rows[1], 1).to_string(), "-1 L");
    }

    #[test]
    fn same_lap_shows_time_gap_and_leader_shows_nothing() {
        let (session, mut telemetry) = field(&[("Leader", car(1, 10, 0.5)), ("Second", car(2, 10, 0.4))]);
        telemetry.cars[1].f2_time = 1.5;

        let rows = aggregate(&session, &telemetry);
        assert_eq!(gap_to_leader(&rows[0], 0), Gap::None);
        assert_eq!(gap_to_leader(&rows[0], 0).to_string(), "");
        assert_eq!(gap_to_leader(&rows[1], 1), Gap::Time(-1.5));
        assert_eq!(gap_to_leader(&rows[1], 1).to_string(), "-1.500");
    }

    #[test]
    fn lap_times_format_by_magnitude() {
        assert_eq!(format_lap_time(61.234), "01:01.234");
        assert_eq!(format_lap_time(45.6), "45.600");
        assert_eq!(format_lap_time(125.5), "02:05.500");
        assert_eq!(format_lap_time(0.0), "");
        assert_eq!(format_lap_time(-1.0), "");
    }
}
