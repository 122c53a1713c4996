//! Headless driver: loads `config.json` from the working directory, builds a [`Simulation`],
//! and steps it a fixed number of times while logging progress.
//!
//! This is a minimal stand-in for the (out of scope) windowed driver, just enough to exercise
//! the crate's external surface end to end.

use galaxen::model::config;
use galaxen::Simulation;
use simplelog::{ColorChoice, Config as LogConfig, TermLogger, TerminalMode};

fn main() {
    TermLogger::init(
        log::LevelFilter::Info,
        LogConfig::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .expect("failed to initialise terminal logger");

    let config = match config::load("config.json") {
        Ok(config) => config,
        Err(err) => {
            log::error!("failed to load config.json: {err}");
            std::process::exit(1);
        }
    };

    let mut simulation = match Simulation::new(&config) {
        Ok(simulation) => simulation,
        Err(err) => {
            log::error!("failed to construct simulation: {err}");
            std::process::exit(1);
        }
    };

    const STEPS: u32 = 100;
    for step in 0..STEPS {
        simulation.step();
        if step % 10 == 0 {
            log::info!(
                "t = {:.3e} yr, mass center = {}",
                simulation.time(),
                simulation.mass_center()
            );
        }
    }
}
