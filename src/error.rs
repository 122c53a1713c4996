use crate::vector::Vector2;

/// Errors raised by the simulation engine.
///
/// Most call sites treat [`Error::OutOfBounds`] as recoverable (the offending particle is
/// dropped for that step); every other variant is a construction-time or programmer error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A particle's position fell outside the tree's bounding box during [`Insert`].
    ///
    /// [`Insert`]: crate::tree::Quadtree::insert
    #[error("particle position {position} lies outside the tree bounds [{min}, {max}]")]
    OutOfBounds {
        /// The particle's position.
        position: Vector2,
        /// Lower corner of the tree's bounding box.
        min: Vector2,
        /// Upper corner of the tree's bounding box.
        max: Vector2,
    },

    /// The configuration is missing a value, or a value cannot be used to build a simulation.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Construction of an integrator with a non-positive time step.
    #[error("time step must be strictly positive, got {0}")]
    NonPositiveTimeStep(f64),

    /// Failure to read or parse `config.json`.
    #[error("failed to load configuration: {0}")]
    Io(#[from] std::io::Error),

    /// Failure to deserialize `config.json`.
    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for fallible engine operations.
pub type Result<T> = std::result::Result<T, Error>;
