//! `config.json` deserialisation.
//!
//! The JSON keys are the human-readable strings the (out of scope) driver and renderer share,
//! not idiomatic Rust identifiers, hence the `#[serde(rename = ...)]` on almost every field.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::integrator::IntegratorKind;

/// Which simulation model to run. Currently only one exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// The Barnes-Hut N-body model covered by this crate.
    NBody,
}

impl<'de> Deserialize<'de> for ModelKind {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "N-body" => ModelKind::NBody,
            other => {
                log::warn!("unrecognised model {other:?}, falling back to N-body");
                ModelKind::NBody
            }
        })
    }
}

/// The initial position and velocity of a galaxy's bulge.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct InitialConditions {
    #[serde(rename = "positionX")]
    pub position_x: f64,
    #[serde(rename = "positionY")]
    pub position_y: f64,
    #[serde(rename = "velocityX")]
    pub velocity_x: f64,
    #[serde(rename = "velocityY")]
    pub velocity_y: f64,
}

/// Parameters for synthesising one galaxy's bulge and disk.
#[derive(Debug, Clone, Deserialize)]
pub struct GalaxySettings {
    #[serde(rename = "Number of particles")]
    pub particle_count: usize,
    #[serde(rename = "Bulge mass")]
    pub bulge_mass: f64,
    #[serde(rename = "Bulge radius")]
    pub bulge_radius: f64,
    #[serde(rename = "Disk radius")]
    pub disk_radius: f64,
    #[serde(rename = "Minimum stellar mass")]
    pub min_stellar_mass: f64,
    #[serde(rename = "Maximum stellar mass")]
    pub max_stellar_mass: f64,
    #[serde(rename = "Initial conditions")]
    pub initial_conditions: InitialConditions,
}

/// The scenario-specific shape of `Simulation settings`, resolved from the raw `Simulation`
/// string and `Simulation settings` object.
#[derive(Debug, Clone)]
pub enum Scenario {
    /// A single galaxy: one bulge, one disk.
    SingleGalaxy(GalaxySettings),
    /// Several independent galaxies sharing one particle array and tree, in ascending numeric
    /// key order (`"1", "2", ..."`).
    GalaxyCollision(Vec<GalaxySettings>),
}

/// The full contents of `config.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(rename = "Window size")]
    pub window_size: i64,
    #[serde(rename = "Field of view")]
    pub field_of_view: f64,
    #[serde(rename = "Simulation")]
    pub simulation: String,
    #[serde(rename = "Model")]
    pub model: ModelKind,
    #[serde(rename = "Integrator")]
    pub integrator: IntegratorKind,
    #[serde(rename = "Time step")]
    pub time_step: f64,
    #[serde(rename = "Simulation settings")]
    simulation_settings: serde_json::Value,
}

impl Config {
    /// Resolves `Simulation` + `Simulation settings` into a concrete [`Scenario`].
    ///
    /// An unrecognised `Simulation` value falls back to [`Scenario::SingleGalaxy`], matching the
    /// original driver's dispatch default.
    pub fn scenario(&self) -> Result<Scenario> {
        match self.simulation.as_str() {
            "Galaxy Collision" => {
                let galaxies: BTreeMap<String, GalaxySettings> =
                    serde_json::from_value(self.simulation_settings.clone())?;

                let mut keyed = Vec::with_capacity(galaxies.len());
                for (key, settings) in galaxies {
                    let order: u32 = key.parse().map_err(|_| {
                        Error::Configuration(format!("non-numeric galaxy key {key:?}"))
                    })?;
                    keyed.push((order, settings));
                }
                keyed.sort_by_key(|(order, _)| *order);

                Ok(Scenario::GalaxyCollision(
                    keyed.into_iter().map(|(_, settings)| settings).collect(),
                ))
            }
            "Single Galaxy" => Ok(Scenario::SingleGalaxy(serde_json::from_value(
                self.simulation_settings.clone(),
            )?)),
            other => {
                log::warn!("unrecognised simulation {other:?}, falling back to Single Galaxy");
                Ok(Scenario::SingleGalaxy(serde_json::from_value(
                    self.simulation_settings.clone(),
                )?))
            }
        }
    }
}

/// Reads and parses `config.json` at `path`.
pub fn load(path: impl AsRef<Path>) -> Result<Config> {
    let raw = std::fs::read_to_string(path)?;
    let config = serde_json::from_str(&raw)?;
    Ok(config)
}
