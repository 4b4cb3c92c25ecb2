//! Minimal ASCII DXF support: survey points in, grid layer out.

use std::fmt::Write as _;
use std::io;

use survey_grid::geometry::Point3;
use survey_grid::grid::SurfaceGrid;
use survey_grid::points::PointSet;

use super::read_lines;

/// Entity type whose position is taken as a survey sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DxfEntityKind {
    /// `POINT` entities; the location is the sample.
    Point,
    /// `CIRCLE` entities; the center is the sample.
    Circle,
}

impl DxfEntityKind {
    /// Parses an entity name. Case insensitive.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "POINT" => Some(Self::Point),
            "CIRCLE" => Some(Self::Circle),
            _ => None,
        }
    }

    fn dxf_name(&self) -> &'static str {
        match self {
            Self::Point => "POINT",
            Self::Circle => "CIRCLE",
        }
    }
}

/// Reads samples from the `ENTITIES` section of an ASCII DXF file. Only
/// entities of `kind` are used, and when `layer` is given only those on that
/// layer (compared case-insensitively, as DXF layer names are).
pub fn read_points_dxf(path: &str, kind: DxfEntityKind, layer: Option<&str>) -> io::Result<PointSet> {
    let lines = read_lines(path)?;
    parse_points_dxf(&lines, kind, layer)
}

/// Parses DXF group code / value line pairs. See [`read_points_dxf`].
pub fn parse_points_dxf(lines: &[String], kind: DxfEntityKind, layer: Option<&str>) -> io::Result<PointSet> {
    let mut pts = Vec::new();
    let mut in_entities = false;
    let mut expect_section_name = false;
    let mut current: Option<PendingEntity> = None;

    let mut idx = 0;
    while idx + 1 < lines.len() {
        let code = lines[idx].trim();
        let value = lines[idx + 1].trim();
        let line_no = idx + 1;
        idx += 2;

        let code: i32 = code.parse().map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("line {}: expected a group code, got {:?}", line_no, code),
            )
        })?;

        if code == 0 {
            if let Some(entity) = current.take() {
                if let Some(p) = entity.finish(layer, line_no)? {
                    pts.push(p);
                }
            }
            match value {
                "SECTION" => expect_section_name = true,
                "ENDSEC" => in_entities = false,
                "EOF" => break,
                name if in_entities && name == kind.dxf_name() => {
                    current = Some(PendingEntity::default());
                }
                _ => {}
            }
            continue;
        }
        if expect_section_name && code == 2 {
            in_entities = value == "ENTITIES";
            expect_section_name = false;
            continue;
        }
        if let Some(entity) = current.as_mut() {
            match code {
                8 => entity.layer = Some(value.to_string()),
                10 => entity.x = Some(parse_coord(value, line_no + 1)?),
                20 => entity.y = Some(parse_coord(value, line_no + 1)?),
                30 => entity.z = Some(parse_coord(value, line_no + 1)?),
                _ => {}
            }
        }
    }
    if let Some(entity) = current.take() {
        if let Some(p) = entity.finish(layer, lines.len())? {
            pts.push(p);
        }
    }
    log::info!(
        "read {} {} entities{}",
        pts.len(),
        kind.dxf_name(),
        layer.map(|l| format!(" on layer {}", l)).unwrap_or_default()
    );
    Ok(PointSet::new(pts))
}

fn parse_coord(value: &str, line_no: usize) -> io::Result<f64> {
    value.parse().map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("line {}: {}", line_no, e),
        )
    })
}

#[derive(Debug, Default)]
struct PendingEntity {
    layer: Option<String>,
    x: Option<f64>,
    y: Option<f64>,
    z: Option<f64>,
}

impl PendingEntity {
    fn finish(self, layer: Option<&str>, line_no: usize) -> io::Result<Option<Point3>> {
        if let Some(wanted) = layer {
            // entities without group 8 live on layer "0"
            let on = self.layer.as_deref().unwrap_or("0");
            if !on.eq_ignore_ascii_case(wanted) {
                return Ok(None);
            }
        }
        match (self.x, self.y) {
            (Some(x), Some(y)) => Ok(Some(Point3::new(x, y, self.z.unwrap_or(0.0)))),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("line {}: entity without a location", line_no),
            )),
        }
    }
}

/// How the grid layer is drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct GridLayerOptions {
    /// Layer receiving the grid entities.
    pub layer: String,
    /// Height of the cell number labels.
    pub text_height: f64,
    /// Draw every cell as a `3DFACE` through its corner elevations.
    pub faces: bool,
    /// Leave extrapolated nodes out of the drawing.
    pub skip_extrapolated: bool,
}

impl Default for GridLayerOptions {
    fn default() -> Self {
        Self {
            layer: "PY".to_string(),
            text_height: 0.25,
            faces: false,
            skip_extrapolated: false,
        }
    }
}

const COLOR_NODE: i32 = 6;
const COLOR_EXTRAPOLATED: i32 = 1;
const COLOR_LABEL: i32 = 4;

fn pair(out: &mut String, code: i32, value: impl std::fmt::Display) {
    let _ = writeln!(out, "{:>3}\n{}", code, value);
}

fn vertex(out: &mut String, n: i32, p: Point3) {
    pair(out, 10 + n, p.x);
    pair(out, 20 + n, p.y);
    pair(out, 30 + n, p.z);
}

/// Renders `grid` as an R12 ASCII drawing: one `POINT` per node, a `TEXT`
/// label with the cell number at each cell center and optionally a `3DFACE`
/// per cell.
pub fn grid_to_dxf(grid: &SurfaceGrid, opts: &GridLayerOptions) -> String {
    let mut out = String::new();
    pair(&mut out, 0, "SECTION");
    pair(&mut out, 2, "HEADER");
    pair(&mut out, 9, "$ACADVER");
    pair(&mut out, 1, "AC1009");
    pair(&mut out, 9, "$PDMODE");
    pair(&mut out, 70, 32);
    pair(&mut out, 9, "$PDSIZE");
    pair(&mut out, 40, 0.25);
    pair(&mut out, 0, "ENDSEC");

    pair(&mut out, 0, "SECTION");
    pair(&mut out, 2, "TABLES");
    pair(&mut out, 0, "TABLE");
    pair(&mut out, 2, "LAYER");
    pair(&mut out, 70, 1);
    pair(&mut out, 0, "LAYER");
    pair(&mut out, 2, &opts.layer);
    pair(&mut out, 70, 0);
    pair(&mut out, 62, 7);
    pair(&mut out, 6, "CONTINUOUS");
    pair(&mut out, 0, "ENDTAB");
    pair(&mut out, 0, "ENDSEC");

    pair(&mut out, 0, "SECTION");
    pair(&mut out, 2, "ENTITIES");
    for (p, extrapolated) in grid.nodes() {
        if extrapolated && opts.skip_extrapolated {
            continue;
        }
        pair(&mut out, 0, "POINT");
        pair(&mut out, 8, &opts.layer);
        pair(
            &mut out,
            62,
            if extrapolated { COLOR_EXTRAPOLATED } else { COLOR_NODE },
        );
        vertex(&mut out, 0, p);
    }
    for cell in grid.cells() {
        let c = cell.center();
        pair(&mut out, 0, "TEXT");
        pair(&mut out, 8, &opts.layer);
        pair(&mut out, 62, COLOR_LABEL);
        vertex(&mut out, 0, Point3::new(c.x, c.y, 0.0));
        pair(&mut out, 40, opts.text_height);
        pair(&mut out, 1, cell.number);
        // centered on the baseline
        pair(&mut out, 72, 1);
        vertex(&mut out, 1, Point3::new(c.x, c.y, 0.0));
        pair(&mut out, 73, 0);
        if opts.faces {
            pair(&mut out, 0, "3DFACE");
            pair(&mut out, 8, &opts.layer);
            for (n, corner) in cell.corners.iter().enumerate() {
                vertex(&mut out, n as i32, *corner);
            }
        }
    }
    pair(&mut out, 0, "ENDSEC");
    pair(&mut out, 0, "EOF");
    out
}

/// Writes the grid layer drawing to `path`.
pub fn write_grid_dxf(path: &str, grid: &SurfaceGrid, opts: &GridLayerOptions) -> io::Result<()> {
    std::fs::write(path, grid_to_dxf(grid, opts))
}

/// Writes samples as `POINT` entities on `layer`.
pub fn write_points_dxf(path: &str, points: &PointSet, layer: &str) -> io::Result<()> {
    let mut out = String::new();
    pair(&mut out, 0, "SECTION");
    pair(&mut out, 2, "ENTITIES");
    for p in points.iter() {
        pair(&mut out, 0, "POINT");
        pair(&mut out, 8, layer);
        vertex(&mut out, 0, *p);
    }
    pair(&mut out, 0, "ENDSEC");
    pair(&mut out, 0, "EOF");
    std::fs::write(path, out)
}
