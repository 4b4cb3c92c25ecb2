//! End-to-end runs: points in, grid and volume report out.
//!
//! Validation happens in order of cheapness and before any node is evaluated:
//! configuration, then the surface fit, then the grid geometry. The fit comes
//! before the geometry so that degenerate samples are reported as
//! insufficient data rather than as a malformed grid.

use crate::config::GridConfig;
use crate::error::Result;
use crate::grid::{GridBuilder, GridSpec, SurfaceGrid};
use crate::interpolate::SurfaceInterpolator;
use crate::points::PointSet;
use crate::volume::{Reference, VolumeCalculator, VolumeReport};

/// Baseline for a volume run.
#[derive(Debug, Clone, Copy)]
pub enum VolumeBaseline<'a> {
    /// Horizontal plane.
    Elevation(f64),
    /// Second survey, gridded on the same geometry as the first.
    Points(&'a PointSet),
}

/// Fits `points` and grids the surface over their own extents.
pub fn build_surface(
    points: &PointSet,
    config: &GridConfig,
) -> Result<(SurfaceInterpolator, SurfaceGrid)> {
    let builder = GridBuilder::new(config)?;
    let interpolator = SurfaceInterpolator::fit(points, config)?;
    let spec = builder.spec_for(points)?;
    let grid = SurfaceGrid::evaluate(spec, &interpolator);
    Ok((interpolator, grid))
}

/// Fits `points` and grids the surface on an externally chosen `spec`.
pub fn build_surface_on(
    points: &PointSet,
    spec: GridSpec,
    config: &GridConfig,
) -> Result<SurfaceGrid> {
    config.validate()?;
    let interpolator = SurfaceInterpolator::fit(points, config)?;
    Ok(SurfaceGrid::evaluate(spec, &interpolator))
}

/// Grids `points` and computes volumes against `baseline`. When the baseline
/// is a second survey both surfaces are gridded over the union of their
/// extents.
pub fn run_volume(
    points: &PointSet,
    baseline: VolumeBaseline<'_>,
    config: &GridConfig,
) -> Result<(SurfaceGrid, VolumeReport)> {
    let calculator = VolumeCalculator::new(config.exclude_extrapolated);
    match baseline {
        VolumeBaseline::Elevation(z) => {
            let (_, grid) = build_surface(points, config)?;
            let report = calculator.compute(&grid, Reference::Elevation(z))?;
            Ok((grid, report))
        }
        VolumeBaseline::Points(other) => {
            let builder = GridBuilder::new(config)?;
            let surface = SurfaceInterpolator::fit(points, config)?;
            let base = SurfaceInterpolator::fit(other, config)?;
            let spec = builder.spec_for_union(points, other)?;
            let grid = SurfaceGrid::evaluate(spec, &surface);
            let base_grid = SurfaceGrid::evaluate(spec, &base);
            let report = calculator.compute(&grid, Reference::Surface(&base_grid))?;
            Ok((grid, report))
        }
    }
}
