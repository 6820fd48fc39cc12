#[macro_use] extern crate log;
extern crate yaml_rust;

pub mod columns;
pub mod config;
pub mod draw;
pub mod iracing;
pub mod overlay;
pub mod standings;
pub mod standings_overlay;
pub mod text_cache;

#[cfg(feature = "window")]
pub mod window;
