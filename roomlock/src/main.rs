mod app;
mod config;
mod emulate;
mod exti;
mod session;
mod utils;

use std::env::var;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use dotenv::dotenv;
use eyre::eyre;
use log::{debug, info};
use sysinfo::System;
use roomlock_gpio::GpioDriver;
use roomlock_gpio::keypad::KeypadLayout;
use roomlock_gpio::led::Led;
use roomlock_gpio::raw::RawGpioDriver;
use roomlock_gpio::sim::SimGpioDriver;
use roomlock_gpio::tick::SystemClock;
use roomlock_gpio::timed::TimedOutput;
use crate::app::{App, KeyQueue};
use crate::config::{Config, PinConfig};

/// Lines on the simulated header, matching the BCM2711.
const SIM_PIN_COUNT: usize = 58;

fn main() -> eyre::Result<()> {
    // Initialize environment and logger
    dotenv().ok();
    pretty_env_logger::init();

    info!("RoomLock starting...");

    const UNKNOWN_STR: &str = "???";
    info!(
        "Running on {} ({}), kernel {}",
        System::host_name().as_deref().unwrap_or(UNKNOWN_STR),
        System::long_os_version().as_deref().unwrap_or(UNKNOWN_STR),
        System::kernel_version().as_deref().unwrap_or(UNKNOWN_STR),
    );

    let pins = PinConfig::from_env()?;
    info!("Keypad @ Rows: {:?}, Cols: {:?}; LED @ {}", pins.rows, pins.cols, pins.led);

    debug!("Trying to load config...");
    let config = if let Some(config) = Config::try_load()? {
        info!("Config loaded.");
        config
    } else {
        info!("Config not found. Using default");
        let config = Config::default();
        config.save()?;
        info!("Default config saved to {}.", Config::path().display());
        config
    };
    // Fail before touching any pins.
    config.secret()?;

    let backend = var("ROOMLOCK_GPIO_BACKEND").unwrap_or_else(|_| "gpiomem".to_string());
    debug!("Initializing {} GPIO driver...", backend);
    match backend.as_str() {
        "gpiomem" => run(&RawGpioDriver::new_gpiomem()?, &pins, config),
        "mem" => run(&RawGpioDriver::new_mem()?, &pins, config),
        "sim" => {
            let gpio = Arc::new(SimGpioDriver::new(SIM_PIN_COUNT));
            emulate::spawn_console(gpio.clone(), pins.clone(), KeypadLayout::from(config.layout))?;
            run(&*gpio, &pins, config)
        }
        other => Err(eyre!("Unknown GPIO backend {:?} (expected gpiomem, mem or sim)", other)),
    }
}

/// Runs the keypad worker and the main loop until either fails.
fn run<D: GpioDriver + Sync>(gpio: &D, pins: &PinConfig, config: Config) -> eyre::Result<()> {
    debug!("{:?} initialized.", gpio);

    let mut queue = KeyQueue::new();
    let (producer, consumer) = queue.split();
    let running = AtomicBool::new(true);

    thread::scope(|scope| -> eyre::Result<()> {
        let worker = thread::Builder::new()
            .name("exti".to_string())
            .spawn_scoped(scope, || {
                let result = exti::run(gpio, pins, &config, producer, &running, || info!("Keypad armed."));
                running.store(false, Ordering::Relaxed);
                result
            })?;

        let result = main_loop(gpio, pins, &config, consumer, &running);
        running.store(false, Ordering::Relaxed);

        let worker_result = worker.join().map_err(|_| eyre!("Keypad worker panicked"))?;
        result?;
        worker_result?;
        Ok(())
    })
}

fn main_loop<D: GpioDriver + ?Sized>(
    gpio: &D,
    pins: &PinConfig,
    config: &Config,
    consumer: app::KeyConsumer<'_>,
    running: &AtomicBool,
) -> eyre::Result<()> {
    let mut led_pin = gpio.get_pin(pins.led)?;
    let led_out = led_pin.as_output()?;
    let clock = SystemClock::new();
    let feedback = TimedOutput::new(Led::new(&*led_out), &clock);

    let mut app = App::new(config.clone(), feedback, consumer, &clock)?;
    app.start()?;

    info!("Starting main loop...");
    while running.load(Ordering::Relaxed) {
        app.update()?;
        thread::sleep(exti::POLL_INTERVAL);
    }
    debug!("Main loop stopped.");
    Ok(())
}
