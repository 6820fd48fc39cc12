//! Read-only configuration, scoped by component name.
//!
//! The config file is a YAML mapping from component (`OverlayStandings`,
//! `General`, ...) to a flat mapping of keys. Every lookup falls back to the
//! built-in defaults below, so a config file only needs the keys it changes.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;
use yaml_rust::{Yaml, YamlLoader};

use crate::draw::Color;

const DEFAULT_CONFIG: &str = r#"
General:
  buddies: []

OverlayStandings:
  font: Microsoft YaHei UI
  font_size: 16.0
  font_weight: 500
  line_spacing: 8.0
  window_width: 640.0
  window_height: 800.0
  self_col: [0.94, 0.67, 0.13, 1.0]
  buddy_col: [0.2, 0.75, 0.0, 1.0]
  other_car_col: [1.0, 1.0, 1.0, 0.9]
  header_col: [0.7, 0.7, 0.7, 0.9]
  car_number_background_col: [1.0, 1.0, 1.0, 0.9]
  car_number_text_col: [0.0, 0.0, 0.0, 0.9]
  alternate_line_background_col: [0.5, 0.5, 0.5, 0.1]
  irating_text_col: [0.0, 0.0, 0.0, 0.9]
  irating_background_col: [1.0, 1.0, 1.0, 0.85]
  license_text_col: [1.0, 1.0, 1.0, 0.9]
  fastest_lap_col: [1.0, 0.0, 1.0, 1.0]
  pit_col: [0.94, 0.8, 0.13, 1.0]
  license_background_alpha: 0.8
  zero_incidents_alpha: 0.5
"#;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("config root must be a mapping of components")]
    NotAMapping,
}

fn parse(str: &str) -> Result<Yaml, ConfigError> {
    let mut docs = YamlLoader::load_from_str(str).map_err(|err| ConfigError::Parse(format!("{:?}", err)))?;
    if docs.is_empty() {
        return Ok(Yaml::Hash(Default::default()));
    }
    let root = docs.swap_remove(0);
    match root {
        Yaml::Hash(_) => Ok(root),
        Yaml::Null => Ok(Yaml::Hash(Default::default())),
        _ => Err(ConfigError::NotAMapping),
    }
}

fn as_f32(value: &Yaml) -> Option<f32> {
    match value {
        Yaml::Real(_) => value.as_f64().map(|f| f as f32),
        Yaml::Integer(i) => Some(*i as f32),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    user: Yaml,
    defaults: Yaml,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            user: Yaml::Hash(Default::default()),
            defaults: parse(DEFAULT_CONFIG).unwrap_or(Yaml::Hash(Default::default())),
        }
    }
}

impl Config {
    pub fn from_yaml_str(str: &str) -> Result<Config, ConfigError> {
        Ok(Config {
            user: parse(str)?,
            ..Config::default()
        })
    }

    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Config::from_yaml_str(&contents)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn lookup<T>(&self, component: &str, key: &str, extract: impl Fn(&Yaml) -> Option<T>) -> Option<T> {
        extract(&self.user[component][key])
            .or_else(|| extract(&self.defaults[component][key]))
            .or_else(|| {
                warn!("Config value {}.{} is missing or has the wrong type", component, key);
                None
            })
    }

    pub fn get_string(&self, component: &str, key: &str) -> String {
        self.lookup(component, key, |v| v.as_str().map(str::to_string)).unwrap_or_default()
    }

    pub fn get_float(&self, component: &str, key: &str) -> f32 {
        self.lookup(component, key, as_f32).unwrap_or(0.0)
    }

    pub fn get_int(&self, component: &str, key: &str) -> i32 {
        self.lookup(component, key, |v| v.as_i64().map(|i| i as i32)).unwrap_or(0)
    }

    pub fn get_bool(&self, component: &str, key: &str) -> bool {
        self.lookup(component, key, Yaml::as_bool).unwrap_or(false)
    }

    /// Colors are written as `[r, g, b, a]`.
    pub fn get_color(&self, component: &str, key: &str) -> Color {
        self.lookup(component, key, |v| {
            let channels = v.as_vec()?;
            if channels.len() != 4 {
                return None;
            }
            let c: Vec<f32> = channels.iter().map(as_f32).collect::<Option<_>>()?;
            Some(Color::new(c[0], c[1], c[2], c[3]))
        })
        .unwrap_or(Color::TRANSPARENT)
    }

    pub fn get_string_vec(&self, component: &str, key: &str) -> Vec<String> {
        self.lookup(component, key, |v| {
            v.as_vec().map(|items| items.iter().filter_map(|s| s.as_str().map(str::to_string)).collect())
        })
        .unwrap_or_default()
    }
}

/// A config file on disk, reloaded whenever its modification time changes.
pub struct ConfigFile {
    path: PathBuf,
    modified: Option<SystemTime>,
}

impl ConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> ConfigFile {
        ConfigFile { path: path.into(), modified: None }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns a fresh config the first time and after every change on disk.
    /// A missing file yields the defaults once; a broken file keeps the
    /// previous config.
    pub fn reload_if_changed(&mut self) -> Option<Config> {
        let modified = fs::metadata(&self.path).and_then(|m| m.modified()).ok();
        if modified.is_none() {
            if self.modified.is_none() {
                self.modified = Some(SystemTime::UNIX_EPOCH);
                info!("No config file at {}, using defaults", self.path.display());
                return Some(Config::default());
            }
            return None;
        }
        if modified == self.modified {
            return None;
        }
        self.modified = modified;

        match Config::load(&self.path) {
            Ok(config) => Some(config),
            Err(err) => {
                error!("{}", err);
                None
            }
        }
    }
}
