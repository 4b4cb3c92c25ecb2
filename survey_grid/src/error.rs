//! Error type shared by every stage of the gridding pipeline.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SurfaceError>;

/// Failures that abort a gridding or volume run.
///
/// All of these are raised while fitting the surface or constructing the grid
/// geometry, before any node is evaluated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SurfaceError {
    /// Too few points, non-finite coordinates, or all points collinear.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// Non-positive cell size, negative margin or degenerate extents.
    #[error("invalid grid configuration: {0}")]
    InvalidGridConfig(String),

    /// A reference surface does not share the geometry of the surface grid.
    #[error("grid mismatch: {0}")]
    GridMismatch(String),

    /// The numerical fit itself failed, e.g. a singular system.
    #[error("interpolation failure: {0}")]
    InterpolationFailure(String),
}
