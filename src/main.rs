#[cfg_attr(not(target_arch = "arm"), path = "mock_hardware.rs")]
mod hardware;

use crate::hardware::Hardware;
use anyhow::Context;
use log::{error, info, LevelFilter};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Instant,
};
use weatherbox::{
    config::Config, controller::Controller, display::Screen,
    weather::UreqClient, wifi::NmcliRadio,
};

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_module("weatherbox", LevelFilter::Info)
        .parse_default_env()
        .init();

    let config = Config::load()?;

    let running = Arc::new(AtomicBool::new(true));
    let handler_running = Arc::clone(&running);
    ctrlc::set_handler(move || handler_running.store(false, Ordering::SeqCst))
        .context("Error installing termination handler")?;

    let hardware = Hardware::new(&config)?;
    let mut controller = Controller::new(
        &config,
        hardware.screen,
        NmcliRadio::new(config.wifi_interface.as_str()),
        UreqClient::new(config.http_timeout()),
        hardware.settings_pin,
        hardware.set_pin,
    );
    // No WiFi isn't fatal, it can be retried from the settings screen
    if let Err(err) = controller.start() {
        error!("Error starting WiFi connection: {err:#}");
    }

    let booted = Instant::now();
    info!("Running, Ctrl-c to exit...");
    while running.load(Ordering::SeqCst) {
        // Truncation wraps the counter, same as an embedded millis() clock
        let now_secs = booted.elapsed().as_secs() as u32;
        if let Err(err) = controller.step(now_secs) {
            error!("Error in main loop: {err:#}");
        }
        thread::sleep(config.loop_interval());
    }

    info!("Shutting down");
    controller.screen_mut().clear()?;
    Ok(())
}
