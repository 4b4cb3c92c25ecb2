//! Import and export adapters around the gridding core: survey points from
//! DXF drawings or text files in, grid layers and tabular reports out.

use std::fs::File;
use std::io::{self, BufRead, BufReader};

pub mod csv;
pub mod dxf;

pub use csv::{read_points_csv, write_cells_csv, write_points_csv, write_report_csv};
pub use dxf::{read_points_dxf, write_grid_dxf, write_points_dxf, DxfEntityKind, GridLayerOptions};

use survey_grid::points::PointSet;

/// Reads a file into a vector of lines.
pub fn read_lines(path: &str) -> io::Result<Vec<String>> {
    let file = File::open(path)?;
    BufReader::new(file).lines().collect()
}

/// Where to find survey samples inside a drawing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointSource {
    pub kind: DxfEntityKind,
    pub layer: Option<String>,
}

impl Default for PointSource {
    fn default() -> Self {
        Self {
            kind: DxfEntityKind::Circle,
            layer: Some("0".to_string()),
        }
    }
}

/// Reads samples from `path`, choosing the format by extension: `.dxf` files
/// are read with `source`, anything else as an `x,y,z` text table.
pub fn read_survey_points(path: &str, source: &PointSource) -> io::Result<PointSet> {
    if path.to_ascii_lowercase().ends_with(".dxf") {
        read_points_dxf(path, source.kind, source.layer.as_deref())
    } else {
        read_points_csv(path)
    }
}
