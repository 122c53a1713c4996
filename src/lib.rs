//! `galaxen`: an interactive 2D N-body gravitational simulator built around a Barnes-Hut
//! quadtree and a pluggable Runge-Kutta integrator family.
//!
//! The crate is the numerical core only: tree, integrators, and the N-body model that couples
//! them. Rendering, input handling and windowing are external collaborators; see
//! [`simulation::Simulation`] for the surface a driver is expected to hold.

pub mod error;
pub mod integrator;
pub mod model;
pub mod particle;
pub mod simulation;
pub mod tree;
pub mod vector;

pub use error::{Error, Result};
pub use simulation::Simulation;
