//! Square grid geometry and the gridded surface.
//!
//! Node `(row, col)` sits at `(x_min + col * cell_size, y_min + row * cell_size)`.
//! Rows advance along +y and columns along +x; node arrays are stored row
//! major (`row * cols + col`). A cell is the square whose lower-left node is
//! `(row, col)`, so a grid of `rows × cols` nodes has `(rows - 1) × (cols - 1)`
//! cells.

use rayon::prelude::*;

use crate::config::GridConfig;
use crate::error::{Result, SurfaceError};
use crate::geometry::{BoundingBox, Point, Point3};
use crate::interpolate::SurfaceInterpolator;
use crate::points::PointSet;

/// Node count above which a grid is refused as a configuration error.
pub const MAX_NODES: usize = 50_000_000;

/// Relative slack under which a span is treated as an exact number of cells.
const SPAN_SNAP: f64 = 1e-9;

/// Extents and resolution of a square grid.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GridSpec {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub cell_size: f64,
}

/// Number of nodes needed to cover `span` with steps of `cell_size`, i.e.
/// `ceil(span / cell_size) + 1`.
///
/// A quotient within `SPAN_SNAP` (relative) of a whole number of cells is
/// taken as that whole number, so `10.000000001 / 2` yields 6 nodes rather
/// than 7. The last node may then fall short of the far extent by at most
/// `SPAN_SNAP * steps * cell_size`. A positive span always gets at least one
/// step.
fn nodes_along(span: f64, cell_size: f64) -> usize {
    let steps = span / cell_size;
    let rounded = steps.round();
    let steps = if rounded >= 1.0 && (steps - rounded).abs() <= SPAN_SNAP * rounded {
        rounded
    } else {
        steps.ceil().max(1.0)
    };
    steps as usize + 1
}

impl GridSpec {
    /// Creates a validated grid specification.
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64, cell_size: f64) -> Result<Self> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(SurfaceError::InvalidGridConfig(format!(
                "cell size must be a positive number, got {}",
                cell_size
            )));
        }
        if ![x_min, x_max, y_min, y_max].iter().all(|v| v.is_finite()) {
            return Err(SurfaceError::InvalidGridConfig(
                "grid extents must be finite".to_string(),
            ));
        }
        if x_max <= x_min || y_max <= y_min {
            return Err(SurfaceError::InvalidGridConfig(format!(
                "degenerate extents x [{}, {}] y [{}, {}]",
                x_min, x_max, y_min, y_max
            )));
        }
        let spec = Self {
            x_min,
            x_max,
            y_min,
            y_max,
            cell_size,
        };
        let nodes = (spec.cols() as f64) * (spec.rows() as f64);
        if nodes > MAX_NODES as f64 {
            return Err(SurfaceError::InvalidGridConfig(format!(
                "grid of {} x {} nodes exceeds the limit of {} nodes",
                spec.cols(),
                spec.rows(),
                MAX_NODES
            )));
        }
        Ok(spec)
    }

    /// Nodes along x.
    pub fn cols(&self) -> usize {
        nodes_along(self.x_max - self.x_min, self.cell_size)
    }

    /// Nodes along y.
    pub fn rows(&self) -> usize {
        nodes_along(self.y_max - self.y_min, self.cell_size)
    }

    pub fn node_count(&self) -> usize {
        self.rows() * self.cols()
    }

    pub fn cell_count(&self) -> usize {
        (self.rows() - 1) * (self.cols() - 1)
    }

    pub fn cell_area(&self) -> f64 {
        self.cell_size * self.cell_size
    }

    /// Flat index of node `(row, col)`.
    pub fn node_index(&self, row: usize, col: usize) -> usize {
        row * self.cols() + col
    }

    /// Plan position of node `(row, col)`.
    pub fn node_xy(&self, row: usize, col: usize) -> Point {
        Point::new(
            self.x_min + col as f64 * self.cell_size,
            self.y_min + row as f64 * self.cell_size,
        )
    }

    /// Area actually covered by the nodes. The high sides may overshoot
    /// `x_max`/`y_max` by less than one cell.
    pub fn covered_bounds(&self) -> BoundingBox {
        let far = self.node_xy(self.rows() - 1, self.cols() - 1);
        BoundingBox::new(self.x_min, far.x, self.y_min, far.y)
    }

    /// Node coordinates in row-major order.
    pub fn sample_coordinates(&self) -> Vec<Point> {
        let (rows, cols) = (self.rows(), self.cols());
        let mut coords = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                coords.push(self.node_xy(row, col));
            }
        }
        coords
    }
}

/// Derives grid specifications from sample extents.
#[derive(Debug, Clone, Copy)]
pub struct GridBuilder {
    cell_size: f64,
    margin: f64,
}

impl GridBuilder {
    /// Creates a builder from the resolution and margin in `config`.
    pub fn new(config: &GridConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            cell_size: config.cell_size,
            margin: config.margin,
        })
    }

    /// Grid snapped to the minimum of `bbox` after padding by the margin.
    pub fn spec_for_bounds(&self, bbox: &BoundingBox) -> Result<GridSpec> {
        let b = bbox.padded(self.margin);
        GridSpec::new(b.x_min, b.x_max, b.y_min, b.y_max, self.cell_size)
    }

    /// Grid covering every sample of `points`.
    pub fn spec_for(&self, points: &PointSet) -> Result<GridSpec> {
        let bbox = points.bounding_box().ok_or_else(|| {
            SurfaceError::InsufficientData("cannot derive a grid from an empty point set".to_string())
        })?;
        self.spec_for_bounds(&bbox)
    }

    /// Grid covering the samples of both sets, for comparing two surfaces on
    /// shared geometry.
    pub fn spec_for_union(&self, a: &PointSet, b: &PointSet) -> Result<GridSpec> {
        match (a.bounding_box(), b.bounding_box()) {
            (Some(ba), Some(bb)) => self.spec_for_bounds(&ba.union(&bb)),
            (Some(only), None) | (None, Some(only)) => self.spec_for_bounds(&only),
            (None, None) => Err(SurfaceError::InsufficientData(
                "cannot derive a grid from empty point sets".to_string(),
            )),
        }
    }
}

/// Square cell ready for export: its number, index and four corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellPolygon {
    /// 1-based label, row-major.
    pub number: usize,
    pub row: usize,
    pub col: usize,
    /// Corners counter-clockwise from the lower-left node.
    pub corners: [Point3; 4],
    /// `true` if any corner was extrapolated.
    pub extrapolated: bool,
}

impl CellPolygon {
    /// Plan centre of the cell.
    pub fn center(&self) -> Point {
        Point::new(
            (self.corners[0].x + self.corners[2].x) / 2.0,
            (self.corners[0].y + self.corners[2].y) / 2.0,
        )
    }
}

/// Elevations evaluated at every node of a [`GridSpec`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "RawSurfaceGrid")]
pub struct SurfaceGrid {
    spec: GridSpec,
    elevations: Vec<f64>,
    extrapolated: Vec<bool>,
}

/// Unchecked serialized form, validated through [`SurfaceGrid::from_parts`].
#[derive(serde::Deserialize)]
struct RawSurfaceGrid {
    spec: GridSpec,
    elevations: Vec<f64>,
    extrapolated: Vec<bool>,
}

impl TryFrom<RawSurfaceGrid> for SurfaceGrid {
    type Error = SurfaceError;

    fn try_from(raw: RawSurfaceGrid) -> Result<Self> {
        let s = raw.spec;
        let spec = GridSpec::new(s.x_min, s.x_max, s.y_min, s.y_max, s.cell_size)?;
        Self::from_parts(spec, raw.elevations, raw.extrapolated)
    }
}

impl SurfaceGrid {
    /// Evaluates `interpolator` at every node of `spec`. Rows are evaluated
    /// in parallel; each worker fills its own row.
    pub fn evaluate(spec: GridSpec, interpolator: &SurfaceInterpolator) -> Self {
        let (rows, cols) = (spec.rows(), spec.cols());
        let mut elevations = vec![0.0; rows * cols];
        let mut extrapolated = vec![false; rows * cols];
        elevations
            .par_chunks_mut(cols)
            .zip(extrapolated.par_chunks_mut(cols))
            .enumerate()
            .for_each(|(row, (z_row, flag_row))| {
                for col in 0..cols {
                    let p = spec.node_xy(row, col);
                    let sample = interpolator.evaluate(p.x, p.y);
                    z_row[col] = sample.z;
                    flag_row[col] = sample.extrapolated;
                }
            });
        let grid = Self {
            spec,
            elevations,
            extrapolated,
        };
        let outside = grid.extrapolated_count();
        log::info!(
            "gridded surface: {} x {} nodes at {} spacing",
            cols,
            rows,
            spec.cell_size
        );
        if outside > 0 {
            log::warn!(
                "{} of {} nodes lie outside the sample hull and were extrapolated",
                outside,
                rows * cols
            );
        }
        grid
    }

    /// Assembles a grid from precomputed row-major node values.
    pub fn from_parts(spec: GridSpec, elevations: Vec<f64>, extrapolated: Vec<bool>) -> Result<Self> {
        let n = spec.node_count();
        if elevations.len() != n || extrapolated.len() != n {
            return Err(SurfaceError::InvalidGridConfig(format!(
                "expected {} node values, got {} elevations and {} flags",
                n,
                elevations.len(),
                extrapolated.len()
            )));
        }
        Ok(Self {
            spec,
            elevations,
            extrapolated,
        })
    }

    /// Grid with the same elevation at every node.
    pub fn flat(spec: GridSpec, z: f64) -> Self {
        let n = spec.node_count();
        Self {
            spec,
            elevations: vec![z; n],
            extrapolated: vec![false; n],
        }
    }

    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    pub fn rows(&self) -> usize {
        self.spec.rows()
    }

    pub fn cols(&self) -> usize {
        self.spec.cols()
    }

    /// Row-major node elevations.
    pub fn elevations(&self) -> &[f64] {
        &self.elevations
    }

    /// Row-major extrapolation flags.
    pub fn extrapolated_flags(&self) -> &[bool] {
        &self.extrapolated
    }

    pub fn elevation(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.rows() || col >= self.cols() {
            return None;
        }
        Some(self.elevations[self.spec.node_index(row, col)])
    }

    pub fn is_extrapolated(&self, row: usize, col: usize) -> Option<bool> {
        if row >= self.rows() || col >= self.cols() {
            return None;
        }
        Some(self.extrapolated[self.spec.node_index(row, col)])
    }

    pub fn node_xy(&self, row: usize, col: usize) -> Point {
        self.spec.node_xy(row, col)
    }

    pub fn extrapolated_count(&self) -> usize {
        self.extrapolated.iter().filter(|&&e| e).count()
    }

    /// Node coinciding with `(x, y)` within a millionth of a cell.
    pub fn node_at(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let tol = 1e-6;
        let fc = (x - self.spec.x_min) / self.spec.cell_size;
        let fr = (y - self.spec.y_min) / self.spec.cell_size;
        let (c, r) = (fc.round(), fr.round());
        if (fc - c).abs() > tol || (fr - r).abs() > tol || c < 0.0 || r < 0.0 {
            return None;
        }
        let (row, col) = (r as usize, c as usize);
        (row < self.rows() && col < self.cols()).then_some((row, col))
    }

    /// Bilinear interpolation of the node elevations at `(x, y)`, or `None`
    /// outside the area covered by the nodes.
    pub fn sample(&self, x: f64, y: f64) -> Option<f64> {
        if !self.spec.covered_bounds().contains(x, y) {
            return None;
        }
        let fc = (x - self.spec.x_min) / self.spec.cell_size;
        let fr = (y - self.spec.y_min) / self.spec.cell_size;
        let col = (fc.floor() as usize).min(self.cols() - 2);
        let row = (fr.floor() as usize).min(self.rows() - 2);
        let tx = fc - col as f64;
        let ty = fr - row as f64;
        let z00 = self.elevations[self.spec.node_index(row, col)];
        let z10 = self.elevations[self.spec.node_index(row, col + 1)];
        let z01 = self.elevations[self.spec.node_index(row + 1, col)];
        let z11 = self.elevations[self.spec.node_index(row + 1, col + 1)];
        let bottom = z00 + tx * (z10 - z00);
        let top = z01 + tx * (z11 - z01);
        Some(bottom + ty * (top - bottom))
    }

    /// Every node as a 3D point, row-major, with its extrapolation flag.
    pub fn nodes(&self) -> Vec<(Point3, bool)> {
        let mut out = Vec::with_capacity(self.elevations.len());
        for row in 0..self.rows() {
            for col in 0..self.cols() {
                let i = self.spec.node_index(row, col);
                let p = self.spec.node_xy(row, col);
                out.push((Point3::new(p.x, p.y, self.elevations[i]), self.extrapolated[i]));
            }
        }
        out
    }

    /// Square cells in row-major order, numbered from 1.
    pub fn cells(&self) -> Vec<CellPolygon> {
        let (rows, cols) = (self.rows(), self.cols());
        let mut cells = Vec::with_capacity(self.spec.cell_count());
        for row in 0..rows - 1 {
            for col in 0..cols - 1 {
                let idx = [(row, col), (row, col + 1), (row + 1, col + 1), (row + 1, col)];
                let mut corners = [Point3::new(0.0, 0.0, 0.0); 4];
                let mut extrapolated = false;
                for (k, &(r, c)) in idx.iter().enumerate() {
                    let i = self.spec.node_index(r, c);
                    let p = self.spec.node_xy(r, c);
                    corners[k] = Point3::new(p.x, p.y, self.elevations[i]);
                    extrapolated |= self.extrapolated[i];
                }
                cells.push(CellPolygon {
                    number: row * (cols - 1) + col + 1,
                    row,
                    col,
                    corners,
                    extrapolated,
                });
            }
        }
        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_counts_cover_extent() {
        let spec = GridSpec::new(0.0, 10.0, 0.0, 4.5, 2.0).unwrap();
        assert_eq!(spec.cols(), 6);
        assert_eq!(spec.rows(), 4);
        assert_eq!(spec.node_count(), 24);
        assert_eq!(spec.cell_count(), 15);
        let far = spec.covered_bounds();
        assert_eq!(far.x_max, 10.0);
        assert_eq!(far.y_max, 6.0);
    }

    #[test]
    fn floating_point_noise_does_not_add_a_column() {
        let spec = GridSpec::new(0.0, 0.1 + 0.2, 0.0, 1.0, 0.1).unwrap();
        assert_eq!(spec.cols(), 4);
        assert_eq!(spec.rows(), 11);
    }

    #[test]
    fn invalid_specs() {
        for (x0, x1, y0, y1, c) in [
            (0.0, 1.0, 0.0, 1.0, 0.0),
            (0.0, 1.0, 0.0, 1.0, -2.0),
            (0.0, 0.0, 0.0, 1.0, 1.0),
            (0.0, 1.0, 3.0, 1.0, 1.0),
            (0.0, f64::NAN, 0.0, 1.0, 1.0),
            (0.0, 1.0e9, 0.0, 1.0e9, 1.0),
        ] {
            assert!(matches!(
                GridSpec::new(x0, x1, y0, y1, c),
                Err(SurfaceError::InvalidGridConfig(_))
            ));
        }
    }

    #[test]
    fn builder_pads_and_snaps_to_minimum() {
        let pts = PointSet::from_triples(&[(10.0, 20.0, 0.0), (13.0, 21.0, 0.0), (11.0, 25.0, 0.0)]);
        let builder = GridBuilder::new(&GridConfig::with_cell_size(1.0).margin(0.5)).unwrap();
        let spec = builder.spec_for(&pts).unwrap();
        assert_eq!((spec.x_min, spec.y_min), (9.5, 19.5));
        assert_eq!(spec.cols(), 5);
        assert_eq!(spec.rows(), 7);
        let coords = spec.sample_coordinates();
        assert_eq!(coords.len(), spec.node_count());
        assert_eq!(coords[1], Point::new(10.5, 19.5));
        assert_eq!(coords[spec.cols()], Point::new(9.5, 20.5));
    }

    #[test]
    fn builder_rejects_bad_config_and_empty_sets() {
        assert!(matches!(
            GridBuilder::new(&GridConfig::with_cell_size(0.0)),
            Err(SurfaceError::InvalidGridConfig(_))
        ));
        let builder = GridBuilder::new(&GridConfig::with_cell_size(1.0)).unwrap();
        assert!(matches!(
            builder.spec_for(&PointSet::default()),
            Err(SurfaceError::InsufficientData(_))
        ));
    }

    #[test]
    fn union_spec_covers_both_sets() {
        let a = PointSet::from_triples(&[(0.0, 0.0, 0.0), (2.0, 1.0, 0.0)]);
        let b = PointSet::from_triples(&[(-1.0, 3.0, 0.0), (1.0, 5.0, 0.0)]);
        let builder = GridBuilder::new(&GridConfig::with_cell_size(1.0)).unwrap();
        let spec = builder.spec_for_union(&a, &b).unwrap();
        assert_eq!((spec.x_min, spec.x_max, spec.y_min, spec.y_max), (-1.0, 2.0, 0.0, 5.0));
    }

    #[test]
    fn cells_are_numbered_row_major() {
        let spec = GridSpec::new(0.0, 2.0, 0.0, 1.0, 1.0).unwrap();
        let z: Vec<f64> = (0..spec.node_count()).map(|i| i as f64).collect();
        let grid = SurfaceGrid::from_parts(spec, z, vec![false; 6]).unwrap();
        let cells = grid.cells();
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[1].number, 2);
        assert_eq!((cells[1].row, cells[1].col), (0, 1));
        let zs: Vec<f64> = cells[1].corners.iter().map(|p| p.z).collect();
        assert_eq!(zs, vec![1.0, 2.0, 5.0, 4.0]);
        assert_eq!(cells[1].center(), Point::new(1.5, 0.5));
    }

    #[test]
    fn from_parts_checks_lengths() {
        let spec = GridSpec::new(0.0, 1.0, 0.0, 1.0, 1.0).unwrap();
        assert!(SurfaceGrid::from_parts(spec, vec![0.0; 3], vec![false; 4]).is_err());
    }

    #[test]
    fn bilinear_sample_and_node_lookup() {
        let spec = GridSpec::new(0.0, 1.0, 0.0, 1.0, 1.0).unwrap();
        let grid = SurfaceGrid::from_parts(spec, vec![0.0, 1.0, 2.0, 3.0], vec![false; 4]).unwrap();
        assert!((grid.sample(0.5, 0.5).unwrap() - 1.5).abs() < 1e-12);
        assert!((grid.sample(1.0, 1.0).unwrap() - 3.0).abs() < 1e-12);
        assert!(grid.sample(1.5, 0.5).is_none());
        assert_eq!(grid.node_at(1.0, 0.0), Some((0, 1)));
        assert_eq!(grid.node_at(0.5, 0.0), None);
        assert_eq!(grid.elevation(1, 0), Some(2.0));
        assert_eq!(grid.elevation(2, 0), None);
    }

    #[test]
    fn tiny_span_still_gets_one_cell() {
        let spec = GridSpec::new(0.0, 1e-10, 0.0, 1.0, 1.0).unwrap();
        assert_eq!(spec.cols(), 2);
        assert_eq!(spec.rows(), 2);
        assert_eq!(spec.cell_count(), 1);
        let grid = SurfaceGrid::flat(spec, 1.0);
        assert_eq!(grid.sample(0.0, 0.0), Some(1.0));
    }

    #[test]
    fn huge_cell_size_covers_samples() {
        let pts = PointSet::from_triples(&[(0.0, 0.0, 0.0), (1.0, 0.0, 0.0), (0.0, 1.0, 1.0)]);
        let (_, grid) =
            crate::pipeline::build_surface(&pts, &GridConfig::with_cell_size(1e10)).unwrap();
        assert_eq!((grid.rows(), grid.cols()), (2, 2));
        assert_eq!(grid.cells().len(), 1);
        let covered = grid.spec().covered_bounds();
        assert!(pts.iter().all(|p| covered.contains(p.x, p.y)));
    }

    #[test]
    fn snapped_span_keeps_far_extent_within_tolerance() {
        let x_max = 10.0 + 5e-9;
        let spec = GridSpec::new(0.0, x_max, 0.0, 2.0, 2.0).unwrap();
        assert_eq!(spec.cols(), 6);
        let covered = spec.covered_bounds();
        assert!(covered.x_max < x_max);
        assert!(x_max - covered.x_max <= SPAN_SNAP * 5.0 * spec.cell_size);
        let grid = SurfaceGrid::flat(spec, 0.0);
        assert_eq!(grid.node_at(x_max, 2.0), Some((1, 5)));
    }

    #[test]
    fn deserialization_checks_node_count() {
        let spec = GridSpec::new(0.0, 2.0, 0.0, 2.0, 1.0).unwrap();
        let grid = SurfaceGrid::flat(spec, 1.5);
        let json = serde_json::to_string(&grid).unwrap();
        let back: SurfaceGrid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, grid);

        let short = r#"{"spec":{"x_min":0.0,"x_max":2.0,"y_min":0.0,"y_max":2.0,"cell_size":1.0},"elevations":[1.0],"extrapolated":[false]}"#;
        assert!(serde_json::from_str::<SurfaceGrid>(short).is_err());
        let bad_spec = r#"{"spec":{"x_min":0.0,"x_max":2.0,"y_min":0.0,"y_max":2.0,"cell_size":0.0},"elevations":[],"extrapolated":[]}"#;
        assert!(serde_json::from_str::<SurfaceGrid>(bad_spec).is_err());
    }
}
