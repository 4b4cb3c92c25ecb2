//! Core library for gridding scattered survey points and computing earthwork
//! volumes by the square method.
//!
//! ```no_run
//! use survey_grid::{config::GridConfig, pipeline, points::PointSet, volume::*};
//!
//! let points = PointSet::from_triples(&[(0.0, 0.0, 1.0), (4.0, 0.0, 2.0), (0.0, 4.0, 3.0)]);
//! let config = GridConfig::with_cell_size(1.0);
//! let (_, grid) = pipeline::build_surface(&points, &config).unwrap();
//! let report = VolumeCalculator::default()
//!     .compute(&grid, Reference::Elevation(0.0))
//!     .unwrap();
//! println!("net {:.3}", report.net);
//! ```

pub mod config;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod interpolate;
pub mod pipeline;
pub mod points;
pub mod volume;

pub use error::{Result, SurfaceError};
