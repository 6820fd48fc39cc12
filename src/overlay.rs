use crate::config::Config;
use crate::draw::{Backend, DrawError, Surface};
use crate::iracing::Update;

pub trait StateUpdater {
    fn update_state(self: &mut Self, update: &Update);
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowSpec {
    pub title: String,
    pub width: f32,
    pub height: f32,
}

/// One overlay window's lifecycle. The host enables it once, forwards every
/// config reload, and calls `on_update` once per frame after draining all
/// pending state updates.
pub trait Overlay<B: Backend>: StateUpdater {
    fn name(&self) -> &str;

    fn window_spec(&self, config: &Config) -> WindowSpec;

    fn on_enable(&mut self, surface: &mut dyn Surface<B>, config: &Config) -> Result<(), DrawError> {
        self.on_config_changed(surface, config)
    }

    fn on_config_changed(&mut self, surface: &mut dyn Surface<B>, config: &Config) -> Result<(), DrawError>;

    fn on_update(&mut self, surface: &mut dyn Surface<B>) -> Result<(), DrawError>;

    fn can_enable_while_not_driving(&self) -> bool {
        false
    }
}

/// Failing to (re)create drawing resources leaves nothing sensible to draw
/// with, so the process stops.
pub fn fail_fast(name: &str, err: &DrawError) -> ! {
    error!("{}: failed to set up drawing resources: {}", name, err);
    std::process::exit(1)
}
