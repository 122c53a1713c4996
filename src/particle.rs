//! Particle records: phase-state, its derivative, and the static parameters that couple them.
//!
//! An integrator only ever sees the N-particle arrays as one flat `&[f64]` state vector of
//! dimension `4 * N`. [`pack_states`]/[`unpack_states`] perform that conversion explicitly instead
//! of reinterpreting the particle arrays' memory in place, so there is no `unsafe` anywhere in
//! this module: a typed buffer is converted to and from the scalar view only where the
//! integrator's generic arithmetic loop requires it.

use crate::vector::Vector2;

/// Doubles per particle in both [`ParticleState`] and [`ParticleDerivative`].
pub const COMPONENTS_PER_PARTICLE: usize = 4;

/// Phase-state of a single particle: position and velocity.
///
/// Component order (`positionX, positionY, velocityX, velocityY`) is part of the contract with
/// the integrator and must not change independently of [`ParticleDerivative`].
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ParticleState {
    /// Position, in parsecs.
    pub position: Vector2,
    /// Velocity, in parsecs per year.
    pub velocity: Vector2,
}

impl ParticleState {
    /// Creates a new particle state.
    pub fn new(position: Vector2, velocity: Vector2) -> Self {
        Self { position, velocity }
    }
}

/// Time-derivative of a [`ParticleState`]: velocity and acceleration.
///
/// Ordering matches [`ParticleState`] componentwise: d position/dt = velocity, d velocity/dt =
/// acceleration.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ParticleDerivative {
    /// d position / dt.
    pub velocity: Vector2,
    /// d velocity / dt.
    pub acceleration: Vector2,
}

impl ParticleDerivative {
    /// Creates a new particle derivative.
    pub fn new(velocity: Vector2, acceleration: Vector2) -> Self {
        Self {
            velocity,
            acceleration,
        }
    }
}

/// Static parameters of a particle: mass and radius.
///
/// Parameters do not evolve over the course of the simulation.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ParticleParameters {
    /// Mass, in solar masses.
    pub mass: f64,
    /// Radius, in parsecs. A positive radius marks a bulge or core; zero marks an ordinary star.
    pub radius: f64,
}

impl ParticleParameters {
    /// Creates new particle parameters.
    pub fn new(mass: f64, radius: f64) -> Self {
        Self { mass, radius }
    }

    /// Whether this particle is a bulge/core rather than an ordinary star.
    pub fn is_bulge(&self) -> bool {
        self.radius > 0.0
    }
}

/// Flattens `states` into a `4 * states.len()` state vector for an integrator.
pub fn pack_states(states: &[ParticleState]) -> Vec<f64> {
    let mut flat = Vec::with_capacity(states.len() * COMPONENTS_PER_PARTICLE);
    for s in states {
        flat.extend_from_slice(&[s.position.x, s.position.y, s.velocity.x, s.velocity.y]);
    }
    flat
}

/// Overwrites `states` with the particle records encoded in the flat vector `flat`.
///
/// # Panics
///
/// Panics if `flat.len() != states.len() * COMPONENTS_PER_PARTICLE`.
pub fn unpack_states(flat: &[f64], states: &mut [ParticleState]) {
    assert_eq!(flat.len(), states.len() * COMPONENTS_PER_PARTICLE);
    for (s, chunk) in states.iter_mut().zip(flat.chunks_exact(COMPONENTS_PER_PARTICLE)) {
        *s = ParticleState::new(Vector2::new(chunk[0], chunk[1]), Vector2::new(chunk[2], chunk[3]));
    }
}

/// Writes a single particle's derivative directly into a flat derivative buffer.
///
/// Used by the model to avoid materialising a `Vec<ParticleDerivative>` per evaluation.
pub fn write_derivative(flat: &mut [f64], index: usize, derivative: ParticleDerivative) {
    let base = index * COMPONENTS_PER_PARTICLE;
    flat[base] = derivative.velocity.x;
    flat[base + 1] = derivative.velocity.y;
    flat[base + 2] = derivative.acceleration.x;
    flat[base + 3] = derivative.acceleration.y;
}
