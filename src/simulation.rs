//! The simulation driver: wires the model and integrator together and advances one step per
//! render tick.

use crate::error::Result;
use crate::integrator::{Integrator, IntegratorKind};
use crate::model::{gravitational_constant, Config, NBodyModel};
use crate::particle::{ParticleParameters, ParticleState};
use crate::tree::Quadtree;
use crate::vector::Vector2;

/// Owns an [`NBodyModel`] and an [`Integrator`] and advances them together.
///
/// This is the crate's driver-visible surface: a renderer or CLI interacts with the simulation
/// only through this type, never with the model or integrator directly.
pub struct Simulation {
    model: NBodyModel,
    integrator: Integrator,
}

impl Simulation {
    /// Builds a simulation from a parsed [`Config`].
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_physics(
            config,
            Quadtree::DEFAULT_THETA,
            Quadtree::DEFAULT_SOFTENING_SQ,
            gravitational_constant(),
        )
    }

    /// Builds a simulation with explicit tree parameters, for tests that need a convenient `g`
    /// or a non-default opening angle.
    pub fn with_physics(config: &Config, theta: f64, softening_sq: f64, g: f64) -> Result<Self> {
        let scenario = config.scenario()?;
        let model = NBodyModel::from_scenario(&scenario, theta, softening_sq, g)?;

        let mut integrator = Integrator::new(config.integrator, model.dimension(), config.time_step)?;
        integrator.set_initial_state(&model.initial_state_vector());

        log::info!(
            "simulation constructed: {} particles, integrator {}, dt = {}",
            model.particle_count(),
            integrator.name(),
            integrator.time_step()
        );

        Ok(Self { model, integrator })
    }

    /// Advances the simulation by one time step.
    pub fn step(&mut self) {
        let start = std::time::Instant::now();

        let model = &mut self.model;
        let mut derivative = |state: &[f64], t: f64, deriv: &mut [f64]| {
            model.evaluate(state, t, deriv);
        };
        self.integrator.single_step(&mut derivative);

        self.model.set_state(self.integrator.state());

        log::debug!("step {:?} complete in {:?}", self.integrator.time(), start.elapsed());
    }

    /// Sets the integrator's time step.
    pub fn set_time_step(&mut self, dt: f64) {
        self.integrator.set_time_step(dt);
    }

    /// The integrator's current (signed) time step.
    pub fn time_step(&self) -> f64 {
        self.integrator.time_step()
    }

    /// Flips the sign of the time step; the next [`step`](Self::step) integrates backwards.
    pub fn reverse(&mut self) {
        self.integrator.reverse();
    }

    /// Sets the tree's opening angle.
    pub fn set_theta(&mut self, theta: f64) {
        self.model.set_theta(theta);
    }

    /// The tree's opening angle.
    pub fn theta(&self) -> f64 {
        self.model.theta()
    }

    /// Read-only particle phase-states, for rendering.
    pub fn particle_states(&self) -> &[ParticleState] {
        self.model.particle_states()
    }

    /// Read-only particle parameters, for rendering.
    pub fn particle_parameters(&self) -> &[ParticleParameters] {
        self.model.particle_parameters()
    }

    /// Current mass center of the particle distribution.
    pub fn mass_center(&self) -> Vector2 {
        self.model.mass_center()
    }

    /// The quadtree built for the most recent derivative evaluation, for rendering.
    pub fn tree(&self) -> &Quadtree {
        self.model.tree()
    }

    /// Current simulation time.
    pub fn time(&self) -> f64 {
        self.integrator.time()
    }

    /// Name of the integrator in use (`"Euler"`, `"Heun"`, or `"RK4"`).
    pub fn integrator_name(&self) -> &'static str {
        self.integrator.name()
    }

    /// Which integrator scheme is in use.
    pub fn integrator_kind(&self) -> IntegratorKind {
        self.integrator.kind()
    }

    /// Number of particles in the simulation.
    pub fn particle_count(&self) -> usize {
        self.model.particle_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelKind;

    fn config_with(integrator: &str, time_step: f64) -> Config {
        let json = format!(
            r#"{{
                "Window size": 800,
                "Field of view": 60.0,
                "Simulation": "Single Galaxy",
                "Model": "N-body",
                "Integrator": "{integrator}",
                "Time step": {time_step},
                "Simulation settings": {{
                    "Number of particles": 2,
                    "Bulge mass": 1.0,
                    "Bulge radius": 0.0,
                    "Disk radius": 1.0,
                    "Minimum stellar mass": 1.0,
                    "Maximum stellar mass": 1.0,
                    "Initial conditions": {{
                        "positionX": 0.0, "positionY": 0.0, "velocityX": 0.0, "velocityY": 0.0
                    }}
                }}
            }}"#
        );
        serde_json::from_str(&json).unwrap()
    }

    #[test]
    fn two_equal_masses_repel_symmetrically() {
        // theta = 0 so the tree falls back to an exact direct sum; the synthesised scenario is
        // irrelevant here since we overwrite the state with the literal boundary scenario below.
        let config = config_with("RK4", 1.0);
        let mut simulation = Simulation::with_physics(&config, 0.0, 0.0, 1.0).unwrap();

        // Force the exact literal configuration: two unit masses at (-1,0)/(1,0), at rest.
        let state = vec![-1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0];
        simulation.model.set_state(&state);

        let mut deriv = vec![0.0; 8];
        simulation.model.evaluate(&state, 0.0, &mut deriv);

        // a1 = (+g/4, 0), a2 = (-g/4, 0) for g = 1, r = 2.
        assert!((deriv[2] - 0.25).abs() < 1e-9);
        assert!(deriv[3].abs() < 1e-12);
        assert!((deriv[6] - (-0.25)).abs() < 1e-9);
        assert!(deriv[7].abs() < 1e-12);
    }

    #[test]
    fn unrecognised_integrator_defaults_to_heun() {
        let config = config_with("Verlet", 1.0);
        let simulation = Simulation::with_physics(&config, 1.0, 0.01, 1.0).unwrap();
        assert_eq!(simulation.integrator_kind(), IntegratorKind::Heun);
        assert_eq!(simulation.integrator_name(), "Heun");
    }

    #[test]
    fn model_kind_defaults_reported_via_config() {
        let config = config_with("Euler", 1.0);
        assert_eq!(config.model, ModelKind::NBody);
    }

    #[test]
    fn step_advances_time_and_resyncs_particle_states() {
        let config = config_with("Euler", 1.0);
        let mut simulation = Simulation::with_physics(&config, 1.0, 0.01, 1.0).unwrap();
        let before = simulation.time();
        simulation.step();
        assert!(simulation.time() > before);
        assert_eq!(simulation.particle_states().len(), simulation.particle_count());
    }
}
