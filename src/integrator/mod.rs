//! Explicit Runge-Kutta integrators advancing a flat `4*N`-dimensional state vector.
//!
//! The three schemes are realised as one tagged enum rather than a trait-object hierarchy: the
//! derivative producer they share is a plain `FnMut(&[f64], f64, &mut [f64])` closure, not a
//! capability object, so there is nothing here for a trait to abstract over besides the stepping
//! formula itself.

use crate::error::{Error, Result};
use serde::de::{self, Deserializer};
use serde::Deserialize;

/// Which integrator a configuration selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegratorKind {
    /// Forward Euler, one evaluation per step.
    Euler,
    /// Heun / Ralston's second-order method, two evaluations per step.
    Heun,
    /// Classical fourth-order Runge-Kutta, four evaluations per step.
    Rk4,
}

impl IntegratorKind {
    /// Name surfaced to the renderer and used in log messages.
    pub fn name(self) -> &'static str {
        match self {
            IntegratorKind::Euler => "Euler",
            IntegratorKind::Heun => "Heun",
            IntegratorKind::Rk4 => "RK4",
        }
    }
}

impl<'de> Deserialize<'de> for IntegratorKind {
    /// Unknown values fall back to [`IntegratorKind::Heun`] with a warning rather than failing
    /// deserialization, per the documented configuration contract.
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "Euler" => IntegratorKind::Euler,
            "Heun" => IntegratorKind::Heun,
            "RK4" => IntegratorKind::Rk4,
            other => {
                log::warn!("unrecognised integrator {other:?}, falling back to Heun");
                IntegratorKind::Heun
            }
        })
    }
}

enum Scratch {
    Euler {
        k1: Vec<f64>,
    },
    Heun {
        k1: Vec<f64>,
        k2: Vec<f64>,
        temp: Vec<f64>,
    },
    Rk4 {
        k1: Vec<f64>,
        k2: Vec<f64>,
        k3: Vec<f64>,
        k4: Vec<f64>,
        temp: Vec<f64>,
    },
}

impl Scratch {
    fn new(kind: IntegratorKind, dimension: usize) -> Self {
        let zeros = || vec![0.0; dimension];
        match kind {
            IntegratorKind::Euler => Scratch::Euler { k1: zeros() },
            IntegratorKind::Heun => Scratch::Heun {
                k1: zeros(),
                k2: zeros(),
                temp: zeros(),
            },
            IntegratorKind::Rk4 => Scratch::Rk4 {
                k1: zeros(),
                k2: zeros(),
                k3: zeros(),
                k4: zeros(),
                temp: zeros(),
            },
        }
    }

    fn kind(&self) -> IntegratorKind {
        match self {
            Scratch::Euler { .. } => IntegratorKind::Euler,
            Scratch::Heun { .. } => IntegratorKind::Heun,
            Scratch::Rk4 { .. } => IntegratorKind::Rk4,
        }
    }
}

/// A derivative function: given `(state, time)`, fills `deriv` with d(state)/dt.
pub type Derivative<'a> = dyn FnMut(&[f64], f64, &mut [f64]) + 'a;

/// One of the three explicit Runge-Kutta integrators, owning its own state buffer and scratch.
pub struct Integrator {
    state: Vec<f64>,
    time: f64,
    dt: f64,
    scratch: Scratch,
}

impl Integrator {
    /// Creates an integrator of the given kind for a state vector of dimension `4 * n`.
    ///
    /// `dt` must be strictly positive (its sign is later flipped by [`reverse`](Self::reverse)).
    pub fn new(kind: IntegratorKind, dimension: usize, dt: f64) -> Result<Self> {
        if dt <= 0.0 {
            return Err(Error::NonPositiveTimeStep(dt));
        }

        Ok(Self {
            state: vec![0.0; dimension],
            time: 0.0,
            dt,
            scratch: Scratch::new(kind, dimension),
        })
    }

    /// Which scheme this integrator runs.
    pub fn kind(&self) -> IntegratorKind {
        self.scratch.kind()
    }

    /// Name of the scheme, for display/logging.
    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Current simulation time.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Current (signed) time step.
    pub fn time_step(&self) -> f64 {
        self.dt
    }

    /// Sets the (signed) time step directly.
    pub fn set_time_step(&mut self, dt: f64) {
        self.dt = dt;
    }

    /// Flips the sign of `dt`; the next [`single_step`](Self::single_step) integrates backwards.
    pub fn reverse(&mut self) {
        self.dt = -self.dt;
    }

    /// Read-only view of the state buffer, for the renderer.
    pub fn state(&self) -> &[f64] {
        &self.state
    }

    /// Copies `initial` into the state buffer and resets time and scratch to zero.
    pub fn set_initial_state(&mut self, initial: &[f64]) {
        self.state.copy_from_slice(initial);
        self.time = 0.0;
    }

    /// Advances the state by one `dt` using `derivative` to evaluate d(state)/dt.
    pub fn single_step(&mut self, derivative: &mut Derivative<'_>) {
        let dt = self.dt;
        let t = self.time;

        match &mut self.scratch {
            Scratch::Euler { k1 } => {
                derivative(&self.state, t, k1);
                for (s, k1) in self.state.iter_mut().zip(k1.iter()) {
                    *s += dt * k1;
                }
            }
            Scratch::Heun { k1, k2, temp } => {
                derivative(&self.state, t, k1);

                for ((temp, s), k1) in temp.iter_mut().zip(self.state.iter()).zip(k1.iter()) {
                    *temp = s + (2.0 / 3.0) * dt * k1;
                }
                derivative(temp, t + (2.0 / 3.0) * dt, k2);

                for ((s, k1), k2) in self.state.iter_mut().zip(k1.iter()).zip(k2.iter()) {
                    *s += (dt / 4.0) * (k1 + 3.0 * k2);
                }
            }
            Scratch::Rk4 {
                k1,
                k2,
                k3,
                k4,
                temp,
            } => {
                derivative(&self.state, t, k1);

                for ((temp, s), k1) in temp.iter_mut().zip(self.state.iter()).zip(k1.iter()) {
                    *temp = s + 0.5 * dt * k1;
                }
                derivative(temp, t + 0.5 * dt, k2);

                for ((temp, s), k2) in temp.iter_mut().zip(self.state.iter()).zip(k2.iter()) {
                    *temp = s + 0.5 * dt * k2;
                }
                derivative(temp, t + 0.5 * dt, k3);

                for ((temp, s), k3) in temp.iter_mut().zip(self.state.iter()).zip(k3.iter()) {
                    *temp = s + dt * k3;
                }
                derivative(temp, t + dt, k4);

                for (((s, k1), k2), (k3, k4)) in self
                    .state
                    .iter_mut()
                    .zip(k1.iter())
                    .zip(k2.iter())
                    .zip(k3.iter().zip(k4.iter()))
                {
                    *s += (dt / 6.0) * (k1 + 2.0 * (k2 + k3) + k4);
                }
            }
        }

        self.time += dt;
    }
}
