#[macro_use] extern crate log;
extern crate env_logger;

use async_std::task;

use standings_overlay::config::ConfigFile;
use standings_overlay::iracing::data_producer::TestTask;
use standings_overlay::window::Overlays;

#[cfg(windows)]
fn raise_priority() {
    use windows::Win32::System::Threading::*;

    unsafe {
        SetPriorityClass(GetCurrentProcess(), HIGH_PRIORITY_CLASS);
    }
}

#[cfg(not(windows))]
fn raise_priority() {}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Debug)
        .init();

    raise_priority();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.yaml".to_string());
    info!("Using config file {}", config_path);

    let (sender, receiver) = async_std::channel::unbounded();

    let data_producer = TestTask::new(sender);
    let data_producer_thread = task::spawn(async {
        data_producer.execute().await
    });

    let overlays = Overlays::new(receiver, ConfigFile::new(config_path));
    overlays.start_event_loop();

    task::block_on(data_producer_thread);
}
