use std::time::{ Instant, Duration };

use async_std::task;
use async_std::channel::Sender;

use crate::draw::Color;
use crate::iracing::{ Update, TelemetrySnapshot, CarTelemetry, SessionInfo, TrackSpec, Car, MAX_CARS };

const DRIVERS: [(&str, &str, i32, char, f32); 6] = [
    ("Anna Berg", "17", 2456, 'A', 3.21),
    ("Chris Dale", "5", 1320, 'C', 2.05),
    ("Jonas Kvist", "88", 3810, 'A', 4.44),
    ("Mia Lund", "3", 1875, 'B', 3.02),
    ("Oskar Holm", "42", 990, 'D', 1.87),
    ("Sara Nyberg", "21", 2210, 'B', 2.66),
];

/// Lap time of each simulated car, in slot order.
const BASE_LAP_TIMES: [f32; 6] = [92.4, 93.1, 91.8, 92.9, 94.2, 93.5];
const PIT_EVERY_LAPS: i32 = 5;

/// Feeds a made-up race into the overlays, for running without the
/// simulator.
pub struct TestTask {
    sender: Sender<Update>,
    tick: Duration,
}

impl TestTask {
    pub fn new(sender: Sender<Update>) -> TestTask {
        TestTask { sender, tick: Duration::from_millis(16) }
    }

    pub fn with_tick(mut self, tick: Duration) -> TestTask {
        self.tick = tick;
        self
    }

    pub async fn execute(self) {
        info!("Starting test data producer");

        if self.sender.send(Update::Session(test_session())).await.is_err() {
            info!("No overlays listening, stopping test data producer");
            return;
        }

        let started = Instant::now();
        loop {
            let session_time = started.elapsed().as_secs_f64() * 20.0;
            if self.sender.send(Update::Telemetry(simulate(session_time))).await.is_err() {
                info!("No overlays listening, stopping test data producer");
                return;
            }
            task::sleep(self.tick).await;
        }
    }
}

pub fn test_session() -> SessionInfo {
    let mut session = SessionInfo {
        track: TrackSpec {
            name: "hungaroring".to_string(),
            configuration: "Grand Prix".to_string(),
        },
        cars: vec![Car::default(); MAX_CARS],
    };

    session.cars[0] = Car {
        user_name: "Pace Car".to_string(),
        is_pace_car: true,
        ..Car::default()
    };
    for (i, (name, number, irating, license_char, license_sr)) in DRIVERS.iter().enumerate() {
        session.cars[i + 1] = Car {
            user_name: name.to_string(),
            car_number: number.to_string(),
            irating: *irating,
            license_char: *license_char,
            license_sr: *license_sr,
            license_color: Color::from_rgb_u32(0x0153db, 1.0),
            incident_count: (i as i32 * 3) % 5,
            qualifying_result_position: i as i32 + 1,
            is_self: i == 1,
            ..Car::default()
        };
    }
    session
}

/// Telemetry for every simulated car `session_time` seconds into the race.
pub fn simulate(session_time: f64) -> TelemetrySnapshot {
    let mut cars = vec![CarTelemetry::default(); MAX_CARS];

    let mut progress = Vec::with_capacity(BASE_LAP_TIMES.len());
    for (i, lap_time) in BASE_LAP_TIMES.iter().enumerate() {
        let laps = session_time / *lap_time as f64;
        let lap_completed = laps.floor() as i32;
        let slot = &mut cars[i + 1];
        slot.lap_completed = lap_completed;
        slot.lap = lap_completed + 1;
        slot.lap_dist_pct = laps.fract() as f32;
        slot.best_lap_time = if lap_completed > 0 { *lap_time } else { -1.0 };
        slot.last_lap_time = if lap_completed > 0 { *lap_time + 0.137 * (lap_completed % 3) as f32 } else { -1.0 };
        slot.on_pit_road = lap_completed > 0 && lap_completed % PIT_EVERY_LAPS == 0 && slot.lap_dist_pct < 0.05;
        progress.push((i + 1, laps));
    }

    // Positions follow distance covered; the gap is the leader's lap time
    // times the distance between them.
    progress.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    if let Some(&(leader_slot, leader_laps)) = progress.first() {
        let leader_lap_time = BASE_LAP_TIMES[leader_slot - 1] as f64;
        for (position, (slot, laps)) in progress.iter().enumerate() {
            cars[*slot].position = if session_time > 0.0 { position as i32 + 1 } else { 0 };
            cars[*slot].f2_time = ((leader_laps - laps) * leader_lap_time) as f32;
        }
    }

    TelemetrySnapshot {
        timestamp: Instant::now(),
        session_time,
        is_on_track: true,
        cars,
    }
}
