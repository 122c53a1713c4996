//! The N-body model: configuration loading and initial-condition synthesis.

pub mod config;
mod nbody;

pub use config::{Config, GalaxySettings, ModelKind, Scenario};
pub use nbody::{gravitational_constant, NBodyModel};
