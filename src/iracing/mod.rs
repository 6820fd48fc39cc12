use yaml_rust::{Yaml, YamlLoader};
use thiserror::Error;

pub mod data_producer;

use std::time::Instant;
use std::convert::TryFrom;

use crate::draw::Color;

/// Number of car slots the simulator reports telemetry for.
pub const MAX_CARS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CarTelemetry {
    pub lap_completed: i32,
    /// The lap the car is currently on.
    pub lap: i32,
    /// Live race position, 0 until the session assigns one.
    pub position: i32,
    pub lap_dist_pct: f32,
    /// Time behind the leader, positive for cars behind.
    pub f2_time: f32,
    pub best_lap_time: f32,
    pub last_lap_time: f32,
    pub on_pit_road: bool,
}

#[derive(Debug, Clone)]
pub struct TelemetrySnapshot {
    pub timestamp: Instant,
    pub session_time: f64,
    pub is_on_track: bool,
    pub cars: Vec<CarTelemetry>,
}

impl Default for TelemetrySnapshot {
    fn default() -> Self {
        TelemetrySnapshot {
            timestamp: Instant::now(),
            session_time: 0.0,
            is_on_track: false,
            cars: vec![],
        }
    }
}

impl TelemetrySnapshot {
    pub fn car(&self, idx: usize) -> CarTelemetry {
        self.cars.get(idx).copied().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Car {
    pub user_name: String,
    pub car_number: String,
    pub irating: i32,
    pub license_char: char,
    pub license_sr: f32,
    pub license_color: Color,
    pub incident_count: i32,
    pub qualifying_result_position: i32,
    pub last_lap_in_pits: Option<i32>,
    pub is_pace_car: bool,
    pub is_spectator: bool,
    pub is_self: bool,
    pub is_buddy: bool,
}

impl Default for Car {
    fn default() -> Self {
        Car {
            user_name: String::new(),
            car_number: String::new(),
            irating: 0,
            license_char: 'R',
            license_sr: 0.0,
            license_color: Color::new(1.0, 1.0, 1.0, 1.0),
            incident_count: 0,
            qualifying_result_position: 0,
            last_lap_in_pits: None,
            is_pace_car: false,
            is_spectator: false,
            is_self: false,
            is_buddy: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackSpec {
    pub name: String,
    pub configuration: String,
}

#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub track: TrackSpec,
    /// Indexed by car slot, always `MAX_CARS` long.
    pub cars: Vec<Car>,
}

impl Default for SessionInfo {
    fn default() -> Self {
        SessionInfo {
            track: TrackSpec {
                name: String::new(),
                configuration: String::new(),
            },
            cars: vec![Car::default(); MAX_CARS],
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionInfoError {
    #[error("empty session info")]
    Empty,
    #[error("failed to parse yaml: {0}")]
    Yaml(String),
    #[error("{0} not found")]
    MissingField(&'static str),
}

fn yaml_int(value: &Yaml) -> Option<i64> {
    match value {
        Yaml::Integer(i) => Some(*i),
        Yaml::String(s) => {
            let s = s.trim();
            match s.strip_prefix("0x") {
                Some(hex) => i64::from_str_radix(hex, 16).ok(),
                None => s.parse().ok(),
            }
        }
        _ => None,
    }
}

fn yaml_string(value: &Yaml) -> Option<String> {
    match value {
        Yaml::String(s) => Some(s.clone()),
        Yaml::Integer(i) => Some(i.to_string()),
        Yaml::Real(r) => Some(r.clone()),
        _ => None,
    }
}

/// "A 4.44" -> ('A', 4.44)
fn parse_license(lic: &str) -> (char, f32) {
    let mut parts = lic.split_whitespace();
    let license_char = parts.next().and_then(|p| p.chars().next()).unwrap_or('R');
    let license_sr = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0.0);
    (license_char, license_sr)
}

impl TryFrom<&str> for SessionInfo {
    type Error = SessionInfoError;

    fn try_from(str: &str) -> Result<Self, Self::Error> {
        if str.is_empty() {
            return Err(SessionInfoError::Empty);
        }

        let docs = YamlLoader::load_from_str(str)
                .map_err(|err| SessionInfoError::Yaml(format!("{:?}", err)))?;
        let parsed = docs.first().ok_or(SessionInfoError::Empty)?;

        let track_name = parsed["WeekendInfo"]["TrackName"].as_str()
                .ok_or(SessionInfoError::MissingField("TrackName"))?;
        let track_configuration = match &parsed["WeekendInfo"]["TrackConfigName"] {
            Yaml::String(track_config_name) => track_config_name.clone(),
            _ => "Grand Prix".to_string(),
        };

        let drivers = parsed["DriverInfo"]["Drivers"].as_vec()
                .ok_or(SessionInfoError::MissingField("Drivers"))?;
        let self_idx = yaml_int(&parsed["DriverInfo"]["DriverCarIdx"]);

        let mut cars = vec![Car::default(); MAX_CARS];
        for driver in drivers {
            let idx = match yaml_int(&driver["CarIdx"]) {
                Some(idx) if idx >= 0 && (idx as usize) < MAX_CARS => idx as usize,
                _ => {
                    warn!("Skipping driver entry without a valid CarIdx");
                    continue;
                }
            };

            let (license_char, license_sr) = parse_license(driver["LicString"].as_str().unwrap_or(""));
            let license_color = yaml_int(&driver["LicColor"])
                    .map(|rgb| Color::from_rgb_u32(rgb as u32, 1.0))
                    .unwrap_or_else(|| Car::default().license_color);

            cars[idx] = Car {
                user_name: driver["UserName"].as_str().unwrap_or("").to_string(),
                car_number: yaml_string(&driver["CarNumber"]).unwrap_or_default(),
                irating: yaml_int(&driver["IRating"]).unwrap_or(0) as i32,
                license_char,
                license_sr,
                license_color,
                incident_count: yaml_int(&driver["CurDriverIncidentCount"]).unwrap_or(0) as i32,
                qualifying_result_position: 0,
                last_lap_in_pits: None,
                is_pace_car: yaml_int(&driver["CarIsPaceCar"]).unwrap_or(0) != 0,
                is_spectator: yaml_int(&driver["IsSpectator"]).unwrap_or(0) != 0,
                is_self: self_idx == Some(idx as i64),
                is_buddy: false,
            };
        }

        // Qualifying positions are zero based in the session string
        if let Some(results) = parsed["QualifyResultsInfo"]["Results"].as_vec() {
            for result in results {
                if let (Some(position), Some(idx)) = (yaml_int(&result["Position"]), yaml_int(&result["CarIdx"])) {
                    if idx >= 0 && (idx as usize) < MAX_CARS {
                        cars[idx as usize].qualifying_result_position = position as i32 + 1;
                    }
                }
            }
        }

        Ok(SessionInfo {
            track: TrackSpec {
                name: track_name.to_string(),
                configuration: track_configuration,
            },
            cars,
        })
    }
}

impl SessionInfo {
    pub fn car(&self, idx: usize) -> Option<&Car> {
        self.cars.get(idx)
    }

    /// Remembers the current lap of every car that is on pit road.
    pub fn record_pit_stops(&mut self, telemetry: &TelemetrySnapshot) {
        for (idx, car) in self.cars.iter_mut().enumerate() {
            let car_telemetry = telemetry.car(idx);
            if car_telemetry.on_pit_road {
                car.last_lap_in_pits = Some(car_telemetry.lap);
            }
        }
    }

    /// Keeps pit history for drivers still in the same slot after a session
    /// info refresh.
    pub fn carry_over_pit_history(&mut self, previous: &SessionInfo) {
        for (car, old) in self.cars.iter_mut().zip(&previous.cars) {
            if car.user_name == old.user_name && car.last_lap_in_pits.is_none() {
                car.last_lap_in_pits = old.last_lap_in_pits;
            }
        }
    }

    pub fn mark_buddies(&mut self, buddies: &[String]) {
        for car in &mut self.cars {
            car.is_buddy = !car.user_name.is_empty() && buddies.iter().any(|b| *b == car.user_name);
        }
    }
}

#[derive(Debug, Clone)]
pub enum Update {
    Session(SessionInfo),
    Telemetry(TelemetrySnapshot),
}

#[cfg(test)]
mod tests {
    use super::*;

    const SESSION: &str = r#"
WeekendInfo:
 TrackName: hungaroring
 TrackConfigName:
DriverInfo:
 DriverCarIdx: 2
 Drivers:
 - CarIdx: 0
   UserName: Pace Car
   CarNumber: "0"
   IRating: 0
   LicString: R 0.00
   LicColor: 0xffffff
   CarIsPaceCar: 1
   IsSpectator: 0
   CurDriverIncidentCount: 0
 - CarIdx: 1
   UserName: Anna Berg
   CarNumber: "17"
   IRating: 2456
   LicString: A 3.21
   LicColor: 0x0153db
   CarIsPaceCar: 0
   IsSpectator: 0
   CurDriverIncidentCount: 4
 - CarIdx: 2
   UserName: Chris Dale
   CarNumber: 5
   IRating: 1320
   LicString: C 2.05
   LicColor: 0xfeec04
   CarIsPaceCar: 0
   IsSpectator: 0
   CurDriverIncidentCount: 0
QualifyResultsInfo:
 Results:
 - Position: 0
   CarIdx: 2
 - Position: 1
   CarIdx: 1
"#;

    #[test]
    fn parses_drivers_into_slots() {
        let session = SessionInfo::try_from(SESSION).unwrap();

        assert_eq!(session.track.name, "hungaroring");
        assert_eq!(session.track.configuration, "Grand Prix");
        assert_eq!(session.cars.len(), MAX_CARS);

        assert!(session.cars[0].is_pace_car);

        let anna = &session.cars[1];
        assert_eq!(anna.user_name, "Anna Berg");
        assert_eq!(anna.car_number, "17");
        assert_eq!(anna.irating, 2456);
        assert_eq!(anna.license_char, 'A');
        assert!((anna.license_sr - 3.21).abs() < 1e-6);
        assert_eq!(anna.incident_count, 4);
        assert_eq!(anna.qualifying_result_position, 2);
        assert!(!anna.is_self);

        let chris = &session.cars[2];
        assert_eq!(chris.car_number, "5");
        assert!(chris.is_self);
        assert_eq!(chris.qualifying_result_position, 1);
        assert_eq!(chris.license_color, Color::from_rgb_u32(0xfeec04, 1.0));

        assert!(session.cars[3].user_name.is_empty());
    }

    #[test]
    fn rejects_empty_and_incomplete_session_info() {
        assert!(matches!(SessionInfo::try_from(""), Err(SessionInfoError::Empty)));
        assert!(matches!(
            SessionInfo::try_from("DriverInfo:\n Drivers: []\n"),
            Err(SessionInfoError::MissingField("TrackName"))
        ));
    }

    #[test]
    fn pit_stops_are_recorded_and_carried_over() {
        let mut session = SessionInfo::try_from(SESSION).unwrap();
        let mut telemetry = TelemetrySnapshot::default();
        telemetry.cars = vec![CarTelemetry::default(); MAX_CARS];
        telemetry.cars[1].on_pit_road = true;
        telemetry.cars[1].lap = 7;

        session.record_pit_stops(&telemetry);
        assert_eq!(session.cars[1].last_lap_in_pits, Some(7));
        assert_eq!(session.cars[2].last_lap_in_pits, None);

        let mut refreshed = SessionInfo::try_from(SESSION).unwrap();
        refreshed.carry_over_pit_history(&session);
        assert_eq!(refreshed.cars[1].last_lap_in_pits, Some(7));
    }

    #[test]
    fn buddies_are_matched_by_name() {
        let mut session = SessionInfo::try_from(SESSION).unwrap();
        session.mark_buddies(&["Anna Berg".to_string(), String::new()]);
        assert!(session.cars[1].is_buddy);
        assert!(!session.cars[2].is_buddy);
        assert!(!session.cars[5].is_buddy);
    }

    #[test]
    fn missing_slots_read_as_defaults() {
        let telemetry = TelemetrySnapshot::default();
        assert_eq!(telemetry.car(12), CarTelemetry::default());
    }
}
