use crate::geometry::{barycentric, project_onto_segment, BoundingBox, Point, Point3};

use super::index::BucketGrid;

/// Barycentric slack accepted when deciding that a query lies on a triangle.
const LOCATE_TOLERANCE: f64 = 1e-9;

/// Triangulated Irregular Network constructed from 3D points.
///
/// Triangles come from a Delaunay triangulation of the XY projection. A
/// bucket index over the triangles makes point location constant time on
/// average.
#[derive(Debug, Clone)]
pub struct Tin {
    /// Vertices of the TIN.
    pub vertices: Vec<Point3>,
    /// Indices into `vertices` forming triangles.
    pub triangles: Vec<[usize; 3]>,
    /// Convex hull as vertex indices, counter-clockwise.
    pub hull: Vec<usize>,
    index: BucketGrid,
    hull_index: BucketGrid,
}

impl Tin {
    /// Builds a TIN from the provided vertices using Delaunay triangulation on
    /// the XY plane. Returns `None` when no triangle can be formed, i.e. for
    /// fewer than three distinct points or when all of them are collinear.
    pub fn from_points(points: Vec<Point3>) -> Option<Self> {
        let coords: Vec<delaunator::Point> = points
            .iter()
            .map(|p| delaunator::Point { x: p.x, y: p.y })
            .collect();
        let triangulation = delaunator::triangulate(&coords);
        let triangles: Vec<[usize; 3]> = triangulation
            .triangles
            .chunks(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();
        if triangles.is_empty() {
            return None;
        }
        let bounds = BoundingBox::from_points(&points)?;
        let mut index = BucketGrid::new(bounds, triangles.len());
        let pad = LOCATE_TOLERANCE * bounds.width().max(bounds.height());
        for (i, tri) in triangles.iter().enumerate() {
            let extent = BoundingBox::from_points(tri.iter().map(|&v| &points[v]))?;
            index.insert(i, &extent.padded(pad));
        }
        let hull = triangulation.hull;
        let n = hull.len();
        let mut hull_index = BucketGrid::new(bounds, n);
        for i in 0..n {
            let (a, b) = (&points[hull[i]], &points[hull[(i + 1) % n]]);
            let extent = BoundingBox::from_points([a, b])?;
            hull_index.insert(i, &extent);
        }
        log::debug!(
            "triangulated {} points into {} triangles ({} hull vertices)",
            points.len(),
            triangles.len(),
            n
        );
        Some(Self {
            vertices: points,
            triangles,
            hull,
            index,
            hull_index,
        })
    }

    /// Finds the triangle containing `(x, y)` and the barycentric weights of
    /// the query within it.
    pub fn locate(&self, x: f64, y: f64) -> Option<(usize, (f64, f64, f64))> {
        let p = Point::new(x, y);
        for &t in self.index.candidates(p) {
            let tri = self.triangles[t];
            let a = self.vertices[tri[0]];
            let b = self.vertices[tri[1]];
            let c = self.vertices[tri[2]];
            if let Some((u, v, w)) = barycentric(p, a, b, c) {
                if u >= -LOCATE_TOLERANCE && v >= -LOCATE_TOLERANCE && w >= -LOCATE_TOLERANCE {
                    return Some((t, (u, v, w)));
                }
            }
        }
        None
    }

    /// Returns `true` if `(x, y)` lies within the triangulated area, which is
    /// the convex hull of the vertices.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.locate(x, y).is_some()
    }

    /// Linearly interpolated elevation at `(x, y)` if the point lies within
    /// the TIN.
    pub fn elevation_at(&self, x: f64, y: f64) -> Option<f64> {
        let (t, (u, v, w)) = self.locate(x, y)?;
        let tri = self.triangles[t];
        Some(
            u * self.vertices[tri[0]].z
                + v * self.vertices[tri[1]].z
                + w * self.vertices[tri[2]].z,
        )
    }

    /// Hull edges as consecutive vertex index pairs, closing back to the
    /// first hull vertex.
    pub fn hull_edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let n = self.hull.len();
        (0..n).map(move |i| (self.hull[i], self.hull[(i + 1) % n]))
    }

    /// Elevation of the closest point on the hull boundary to `(x, y)`,
    /// interpolated linearly along the nearest hull edge. Ties resolve to the
    /// first edge in hull order.
    pub fn boundary_elevation(&self, x: f64, y: f64) -> f64 {
        let p = Point::new(x, y);
        let n = self.hull.len();
        let edge = |i: usize| (self.vertices[self.hull[i]], self.vertices[self.hull[(i + 1) % n]]);
        let nearest = self.hull_index.nearest_by(p, |i| {
            let (a, b) = edge(i);
            project_onto_segment(p, a.xy(), b.xy()).1
        });
        // A TIN always has at least three hull vertices.
        nearest.map_or(f64::NAN, |i| {
            let (a, b) = edge(i);
            let (t, _) = project_onto_segment(p, a.xy(), b.xy());
            a.z + t * (b.z - a.z)
        })
    }
}
