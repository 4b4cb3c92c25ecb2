//! Earthwork volumes by the square (grid-cell) method.
//!
//! Every cell contributes `cell_size² × mean(corner differences)` where a
//! corner difference is `surface − reference`. Positive contributions are
//! fill (surface above the reference), negative contributions are cut.
//! `total_cut` is kept as a negative number so that
//! `net = total_fill + total_cut`.

use crate::error::{Result, SurfaceError};
use crate::grid::{GridSpec, SurfaceGrid};

/// Elevation the surface is compared against.
#[derive(Debug, Clone, Copy)]
pub enum Reference<'a> {
    /// Horizontal plane at the given elevation.
    Elevation(f64),
    /// Second surface gridded on exactly the same [`GridSpec`].
    Surface(&'a SurfaceGrid),
}

/// Summary of the reference used for a report.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ReferenceKind {
    Elevation(f64),
    Surface,
}

/// Volume contribution of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CellVolume {
    /// 1-based label, row-major, matching [`SurfaceGrid::cells`].
    pub number: usize,
    pub row: usize,
    pub col: usize,
    /// Surface elevations at the corners, counter-clockwise from lower-left.
    pub corner_elevations: [f64; 4],
    /// Mean of the four corner differences.
    pub mean_difference: f64,
    /// `cell_area × mean_difference`; positive is fill, negative is cut.
    pub volume: f64,
    /// Any corner extrapolated in the surface or the reference.
    pub extrapolated: bool,
    /// Left out of the totals.
    pub excluded: bool,
}

/// One line of the tabular export.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReportRow {
    Cell(CellVolume),
    Totals {
        total_cut: f64,
        total_fill: f64,
        net: f64,
    },
}

/// Per-cell and aggregate volumes for one surface and reference.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VolumeReport {
    pub spec: GridSpec,
    pub reference: ReferenceKind,
    pub cells: Vec<CellVolume>,
    /// Sum of negative contributions (≤ 0).
    pub total_cut: f64,
    /// Sum of positive contributions (≥ 0).
    pub total_fill: f64,
    pub net: f64,
    /// Plan area of the cells counted in the totals.
    pub area: f64,
    pub extrapolated_cells: usize,
    pub excluded_cells: usize,
}

impl VolumeReport {
    /// Cells in row-major order followed by the totals row.
    pub fn rows(&self) -> Vec<ReportRow> {
        let mut rows: Vec<ReportRow> = self.cells.iter().copied().map(ReportRow::Cell).collect();
        rows.push(ReportRow::Totals {
            total_cut: self.total_cut,
            total_fill: self.total_fill,
            net: self.net,
        });
        rows
    }

    /// Cut expressed as a positive quantity.
    pub fn cut_magnitude(&self) -> f64 {
        -self.total_cut
    }
}

/// Options controlling how cells are counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VolumeCalculator {
    exclude_extrapolated: bool,
}

impl VolumeCalculator {
    pub fn new(exclude_extrapolated: bool) -> Self {
        Self {
            exclude_extrapolated,
        }
    }

    /// Computes the report for `surface` against `reference`.
    pub fn compute(&self, surface: &SurfaceGrid, reference: Reference<'_>) -> Result<VolumeReport> {
        let spec = *surface.spec();
        let kind = match reference {
            Reference::Elevation(z) => {
                if !z.is_finite() {
                    return Err(SurfaceError::InvalidGridConfig(format!(
                        "reference elevation must be finite, got {}",
                        z
                    )));
                }
                ReferenceKind::Elevation(z)
            }
            Reference::Surface(other) => {
                if other.spec() != surface.spec() {
                    return Err(SurfaceError::GridMismatch(format!(
                        "surface grid {:?} differs from reference grid {:?}",
                        surface.spec(),
                        other.spec()
                    )));
                }
                ReferenceKind::Surface
            }
        };

        let reference_at = |i: usize| -> (f64, bool) {
            match reference {
                Reference::Elevation(z) => (z, false),
                Reference::Surface(other) => {
                    (other.elevations()[i], other.extrapolated_flags()[i])
                }
            }
        };

        let (rows, cols) = (spec.rows(), spec.cols());
        let cell_area = spec.cell_area();
        let z = surface.elevations();
        let flags = surface.extrapolated_flags();
        let mut cells = Vec::with_capacity(spec.cell_count());
        let mut total_cut = 0.0;
        let mut total_fill = 0.0;
        let mut area = 0.0;
        let mut extrapolated_cells = 0;
        let mut excluded_cells = 0;

        for row in 0..rows - 1 {
            for col in 0..cols - 1 {
                // corners: (r, c), (r, c+1), (r+1, c+1), (r+1, c)
                let idx = [
                    spec.node_index(row, col),
                    spec.node_index(row, col + 1),
                    spec.node_index(row + 1, col + 1),
                    spec.node_index(row + 1, col),
                ];
                let mut corner_elevations = [0.0; 4];
                let mut diff_sum = 0.0;
                let mut extrapolated = false;
                for (k, &i) in idx.iter().enumerate() {
                    let (ref_z, ref_extrapolated) = reference_at(i);
                    corner_elevations[k] = z[i];
                    diff_sum += z[i] - ref_z;
                    extrapolated |= flags[i] || ref_extrapolated;
                }
                let mean_difference = diff_sum / 4.0;
                let volume = mean_difference * cell_area;
                let excluded = extrapolated && self.exclude_extrapolated;
                if extrapolated {
                    extrapolated_cells += 1;
                }
                if excluded {
                    excluded_cells += 1;
                } else {
                    area += cell_area;
                    if volume > 0.0 {
                        total_fill += volume;
                    } else {
                        total_cut += volume;
                    }
                }
                cells.push(CellVolume {
                    number: row * (cols - 1) + col + 1,
                    row,
                    col,
                    corner_elevations,
                    mean_difference,
                    volume,
                    extrapolated,
                    excluded,
                });
            }
        }

        let net = total_fill + total_cut;
        log::info!(
            "volumes over {} cells: fill {:.3}, cut {:.3}, net {:.3}",
            cells.len(),
            total_fill,
            total_cut,
            net
        );
        if excluded_cells > 0 {
            log::warn!(
                "{} cells touching extrapolated nodes were left out of the totals",
                excluded_cells
            );
        }
        Ok(VolumeReport {
            spec,
            reference: kind,
            cells,
            total_cut,
            total_fill,
            net,
            area,
            extrapolated_cells,
            excluded_cells,
        })
    }
}
