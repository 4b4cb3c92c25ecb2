//! Flat text tables: `x,y,z` point lists and the `;` separated grid reports.

use std::fmt::Write as _;
use std::io::{self, Write};

use survey_grid::geometry::Point3;
use survey_grid::grid::SurfaceGrid;
use survey_grid::points::PointSet;
use survey_grid::volume::{ReportRow, VolumeReport};

use super::read_lines;

/// Reads `x,y,z` rows. Fields may be separated by commas, semicolons or
/// whitespace; blank lines and lines starting with `#` are skipped.
pub fn read_points_csv(path: &str) -> io::Result<PointSet> {
    let lines = read_lines(path)?;
    let mut pts = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = if line.contains(',') {
            line.split(',').collect()
        } else if line.contains(';') {
            line.split(';').collect()
        } else {
            line.split_whitespace().collect()
        };
        if parts.len() < 3 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("line {}: expected x,y,z", idx + 1),
            ));
        }
        let mut coords = [0.0; 3];
        for (c, part) in coords.iter_mut().zip(&parts) {
            *c = part.trim().parse().map_err(|e| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("line {}: {}", idx + 1, e),
                )
            })?;
        }
        pts.push(Point3::new(coords[0], coords[1], coords[2]));
    }
    Ok(PointSet::new(pts))
}

/// Writes samples as `x,y,z` rows.
pub fn write_points_csv(path: &str, points: &PointSet) -> io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    for p in points.iter() {
        writeln!(file, "{},{},{}", p.x, p.y, p.z)?;
    }
    Ok(())
}

/// One row per cell: `number;z1;z2;z3;z4` with corners counter-clockwise
/// from the lower-left node.
pub fn cells_to_csv(grid: &SurfaceGrid) -> String {
    let mut out = String::new();
    for cell in grid.cells() {
        let _ = write!(out, "{}", cell.number);
        for corner in &cell.corners {
            let _ = write!(out, ";{:10.4}", corner.z);
        }
        out.push('\n');
    }
    out
}

pub fn write_cells_csv(path: &str, grid: &SurfaceGrid) -> io::Result<()> {
    std::fs::write(path, cells_to_csv(grid))
}

/// Volume report as `;` separated rows with a header and a closing totals
/// row. Flags are `E` for extrapolated and `X` for excluded cells.
pub fn report_to_csv(report: &VolumeReport) -> String {
    let mut out = String::from("number;row;col;z1;z2;z3;z4;mean_diff;volume;flags\n");
    for row in report.rows() {
        match row {
            ReportRow::Cell(c) => {
                let _ = write!(out, "{};{};{}", c.number, c.row, c.col);
                for z in &c.corner_elevations {
                    let _ = write!(out, ";{:10.4}", z);
                }
                let mut flags = String::new();
                if c.extrapolated {
                    flags.push('E');
                }
                if c.excluded {
                    flags.push('X');
                }
                let _ = writeln!(out, ";{:10.4};{:12.4};{}", c.mean_difference, c.volume, flags);
            }
            ReportRow::Totals {
                total_cut,
                total_fill,
                net,
            } => {
                let _ = writeln!(
                    out,
                    "total_cut;{:.4}\ntotal_fill;{:.4}\nnet;{:.4}",
                    total_cut, total_fill, net
                );
            }
        }
    }
    out
}

pub fn write_report_csv(path: &str, report: &VolumeReport) -> io::Result<()> {
    std::fs::write(path, report_to_csv(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use survey_grid::grid::GridSpec;
    use survey_grid::volume::{Reference, VolumeCalculator};

    #[test]
    fn read_mixed_separators() {
        let path = std::env::temp_dir().join("cad_import_mixed_sep.csv");
        std::fs::write(&path, "# x,y,z\n1.0,2.0,3.0\n\n4;5;6\n7 8 9\n").unwrap();
        let pts = read_points_csv(path.to_str().unwrap()).unwrap();
        assert_eq!(
            pts.as_slice(),
            &[
                Point3::new(1.0, 2.0, 3.0),
                Point3::new(4.0, 5.0, 6.0),
                Point3::new(7.0, 8.0, 9.0)
            ]
        );
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn read_reports_bad_line() {
        let path = std::env::temp_dir().join("cad_import_bad_line.csv");
        std::fs::write(&path, "1,2,3\n1,2\n").unwrap();
        let err = read_points_csv(path.to_str().unwrap()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(err.to_string().contains("line 2"));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn points_round_trip() {
        let path = std::env::temp_dir().join("cad_import_round_trip.csv");
        let pts = PointSet::from_triples(&[(0.5, 1.25, -2.0), (1e6, 2e6, 100.125)]);
        write_points_csv(path.to_str().unwrap(), &pts).unwrap();
        assert_eq!(read_points_csv(path.to_str().unwrap()).unwrap(), pts);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn cell_table_format() {
        let spec = GridSpec::new(0.0, 1.0, 0.0, 1.0, 1.0).unwrap();
        let grid = SurfaceGrid::from_parts(spec, vec![1.0, 2.0, 3.0, 4.0], vec![false; 4]).unwrap();
        assert_eq!(
            cells_to_csv(&grid),
            "1;    1.0000;    2.0000;    4.0000;    3.0000\n"
        );
    }

    #[test]
    fn report_ends_with_totals() {
        let spec = GridSpec::new(0.0, 2.0, 0.0, 2.0, 1.0).unwrap();
        let grid = SurfaceGrid::flat(spec, 1.0);
        let report = VolumeCalculator::default()
            .compute(&grid, Reference::Elevation(0.0))
            .unwrap();
        let text = report_to_csv(&report);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1 + 4 + 3);
        assert!(lines[1].starts_with("1;0;0;"));
        assert_eq!(lines[5], "total_cut;0.0000");
        assert_eq!(lines[6], "total_fill;4.0000");
        assert_eq!(lines[7], "net;4.0000");
    }
}
