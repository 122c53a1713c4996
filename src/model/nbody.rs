//! The N-body model: owns the particle arrays and the quadtree, and synthesises the two initial
//! conditions scenarios.

use crate::error::{Error, Result};
use crate::model::config::{GalaxySettings, Scenario};
use crate::particle::{self, ParticleDerivative, ParticleParameters, ParticleState};
use crate::tree::Quadtree;
use crate::vector::Vector2;
use rand::Rng;
use rand_distr::{Distribution, Uniform};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Julian year, in seconds.
const SECONDS_PER_YEAR: f64 = 365.25 * 86400.0;
/// Solar mass, in kilograms.
const SOLAR_MASS_KG: f64 = 1.988435e30;
/// Parsec, in metres.
const PARSEC_M: f64 = 3.08567758129e16;
/// Newtonian gravitational constant, SI units.
const GRAVITATIONAL_CONSTANT_SI: f64 = 6.67428e-11;

/// The padding factor applied to the initial point cloud's extent when sizing the tree's area of
/// interest.
const AREA_OF_INTEREST_PADDING: f64 = 1.5 * 1.05;

/// Derives the gravitational constant in parsec / solar-mass / year units:
/// `G' = G * year^2 * M_sun / pc^3`.
pub fn gravitational_constant() -> f64 {
    GRAVITATIONAL_CONSTANT_SI / PARSEC_M.powi(3) * SOLAR_MASS_KG * SECONDS_PER_YEAR.powi(2)
}

/// Owns the particle state, parameters and quadtree for the Barnes-Hut N-body model.
pub struct NBodyModel {
    states: Vec<ParticleState>,
    parameters: Vec<ParticleParameters>,
    tree: Quadtree,
    mass_center: Vector2,
    area_of_interest: f64,
}

impl NBodyModel {
    /// Builds the model's initial conditions from a resolved [`Scenario`].
    ///
    /// `theta` and `softening_sq` seed the tree's opening angle and Plummer softening; `g` is
    /// normally [`gravitational_constant`] but is taken as a parameter so tests can use a
    /// convenient value.
    pub fn from_scenario(scenario: &Scenario, theta: f64, softening_sq: f64, g: f64) -> Result<Self> {
        let mut rng = rand::thread_rng();

        let (states, parameters) = match scenario {
            Scenario::SingleGalaxy(settings) => synthesize_galaxy(settings, g, &mut rng),
            Scenario::GalaxyCollision(galaxies) => {
                let mut states = Vec::new();
                let mut parameters = Vec::new();
                for settings in galaxies {
                    let (galaxy_states, galaxy_parameters) = synthesize_galaxy(settings, g, &mut rng);
                    states.extend(galaxy_states);
                    parameters.extend(galaxy_parameters);
                }
                (states, parameters)
            }
        };

        if states.is_empty() {
            return Err(Error::Configuration("scenario produced zero particles".into()));
        }

        let scenario_name = match scenario {
            Scenario::SingleGalaxy(_) => "Single Galaxy",
            Scenario::GalaxyCollision(galaxies) => {
                log::info!("galaxy collision with {} galaxies", galaxies.len());
                "Galaxy Collision"
            }
        };
        log::info!("synthesised {} particles ({scenario_name} scenario)", states.len());

        let mass_center = weighted_center(&states, &parameters);
        let area_of_interest = initial_area_of_interest(&states, mass_center);

        let tree = Quadtree::new(
            mass_center - Vector2::splat(area_of_interest),
            mass_center + Vector2::splat(area_of_interest),
            theta,
            softening_sq,
            g,
        );

        Ok(Self {
            states,
            parameters,
            tree,
            mass_center,
            area_of_interest,
        })
    }

    /// Number of particles.
    pub fn particle_count(&self) -> usize {
        self.states.len()
    }

    /// Dimension of the flat state vector the integrator advances: `4 * particle_count()`.
    pub fn dimension(&self) -> usize {
        self.states.len() * particle::COMPONENTS_PER_PARTICLE
    }

    /// Read-only particle phase-states.
    pub fn particle_states(&self) -> &[ParticleState] {
        &self.states
    }

    /// Read-only particle parameters.
    pub fn particle_parameters(&self) -> &[ParticleParameters] {
        &self.parameters
    }

    /// Current mass center, updated after every tree rebuild.
    pub fn mass_center(&self) -> Vector2 {
        self.mass_center
    }

    /// The quadtree, for rendering.
    pub fn tree(&self) -> &Quadtree {
        &self.tree
    }

    /// The tree's opening angle.
    pub fn theta(&self) -> f64 {
        self.tree.theta()
    }

    /// Sets the tree's opening angle.
    pub fn set_theta(&mut self, theta: f64) {
        self.tree.set_theta(theta);
    }

    /// Flattens the particle state cache into a `4 * N` state vector for the integrator.
    pub fn initial_state_vector(&self) -> Vec<f64> {
        particle::pack_states(&self.states)
    }

    /// Overwrites the particle state cache from a flat `4 * N` state vector.
    ///
    /// Used by the driver to resynchronise the model's cache with the integrator's state buffer
    /// after a step, since the cache last reflects whatever stage `evaluate` was called with.
    pub fn set_state(&mut self, state: &[f64]) {
        particle::unpack_states(state, &mut self.states);
    }

    /// The model's derivative function: rebuilds the tree around `state` and fills `deriv`.
    ///
    /// Matches the integrator's expected signature `(state, time, deriv) -> ()` so it can be
    /// passed directly as the derivative closure.
    pub fn evaluate(&mut self, state: &[f64], _time: f64, deriv: &mut [f64]) {
        particle::unpack_states(state, &mut self.states);

        self.tree.reset(
            self.mass_center - Vector2::splat(self.area_of_interest),
            self.mass_center + Vector2::splat(self.area_of_interest),
        );

        let mut dropped = 0usize;
        for i in 0..self.states.len() {
            if self.tree.insert(&self.states, i).is_err() {
                dropped += 1;
            }
        }
        self.tree.compute_mass_distribution(&self.states, &self.parameters);
        self.mass_center = self.tree.mass_center();

        log::debug!(
            "tree rebuilt: {} particles, {} coincident, {} dropped",
            self.tree.particle_count(),
            self.tree.coincident_count(),
            dropped
        );

        if self.states.len() > 1 {
            let (head, rest) = deriv.split_at_mut(particle::COMPONENTS_PER_PARTICLE);
            evaluate_rest(&self.tree, &self.states, &self.parameters, rest);
            let _ = head;
        }

        self.tree.clear_statistics();
        let acceleration0 = self.tree.calculate_force(0, &self.states, &self.parameters);
        particle::write_derivative(
            deriv,
            0,
            ParticleDerivative::new(self.states[0].velocity, acceleration0),
        );
    }
}

#[cfg(feature = "parallel")]
fn evaluate_rest(
    tree: &Quadtree,
    states: &[ParticleState],
    parameters: &[ParticleParameters],
    rest: &mut [f64],
) {
    rest.par_chunks_mut(particle::COMPONENTS_PER_PARTICLE)
        .enumerate()
        .for_each(|(offset, chunk)| {
            let i = offset + 1;
            let acceleration = tree.calculate_force(i, states, parameters);
            particle::write_derivative(chunk, 0, ParticleDerivative::new(states[i].velocity, acceleration));
        });
}

#[cfg(not(feature = "parallel"))]
fn evaluate_rest(
    tree: &Quadtree,
    states: &[ParticleState],
    parameters: &[ParticleParameters],
    rest: &mut [f64],
) {
    rest.chunks_mut(particle::COMPONENTS_PER_PARTICLE)
        .enumerate()
        .for_each(|(offset, chunk)| {
            let i = offset + 1;
            let acceleration = tree.calculate_force(i, states, parameters);
            particle::write_derivative(chunk, 0, ParticleDerivative::new(states[i].velocity, acceleration));
        });
}

/// Synthesises one galaxy's bulge (particle 0) and disk (remaining particles).
///
/// The bulge's own velocity is added to every star's orbital velocity so the galaxy translates
/// as a coherent whole. Each galaxy's state lives only in this function's locals and the vectors
/// it returns — there is no shared, indexable "cores" array for a collision scenario's per-galaxy
/// loop to run off the end of.
fn synthesize_galaxy(
    settings: &GalaxySettings,
    g: f64,
    rng: &mut impl Rng,
) -> (Vec<ParticleState>, Vec<ParticleParameters>) {
    let bulge_position = Vector2::new(
        settings.initial_conditions.position_x,
        settings.initial_conditions.position_y,
    );
    let bulge_velocity = Vector2::new(
        settings.initial_conditions.velocity_x,
        settings.initial_conditions.velocity_y,
    );

    let mut states = Vec::with_capacity(settings.particle_count.max(1));
    let mut parameters = Vec::with_capacity(settings.particle_count.max(1));

    states.push(ParticleState::new(bulge_position, bulge_velocity));
    parameters.push(ParticleParameters::new(settings.bulge_mass, settings.bulge_radius));

    if settings.particle_count <= 1 {
        return (states, parameters);
    }

    let radius_dist = Uniform::new(settings.bulge_radius, settings.disk_radius);
    let angle_dist = Uniform::new(0.0, std::f64::consts::TAU);
    let mass_dist = Uniform::new(settings.min_stellar_mass, settings.max_stellar_mass);

    for _ in 1..settings.particle_count {
        let radius = radius_dist.sample(rng);
        let angle = angle_dist.sample(rng);
        let offset = Vector2::new(radius * angle.sin(), radius * angle.cos());
        let position = bulge_position + offset;

        let orbital_speed = (g * settings.bulge_mass / radius).sqrt();
        let velocity = Vector2::new(offset.y, -offset.x) / radius * orbital_speed + bulge_velocity;

        states.push(ParticleState::new(position, velocity));
        parameters.push(ParticleParameters::new(mass_dist.sample(rng), 0.0));
    }

    (states, parameters)
}

fn weighted_center(states: &[ParticleState], parameters: &[ParticleParameters]) -> Vector2 {
    let mut mass_sum = 0.0;
    let mut center = Vector2::ZERO;
    for (state, params) in states.iter().zip(parameters) {
        mass_sum += params.mass;
        center += state.position * params.mass;
    }
    if mass_sum > 0.0 {
        center / mass_sum
    } else {
        Vector2::ZERO
    }
}

fn initial_area_of_interest(states: &[ParticleState], mass_center: Vector2) -> f64 {
    let mut min = mass_center;
    let mut max = mass_center;
    for state in states {
        min = min.min(state.position);
        max = max.max(state.position);
    }
    let extent = max - min;
    AREA_OF_INTEREST_PADDING * extent.x.max(extent.y)
}
