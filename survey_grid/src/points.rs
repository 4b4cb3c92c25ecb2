//! Container for the raw scattered survey samples.

use crate::geometry::{BoundingBox, Point3};

/// Ordered collection of survey samples as extracted from the drawing.
///
/// The set performs no validation and no deduplication. Whether the samples
/// are fit for building a surface is decided by
/// [`SurfaceInterpolator`](crate::interpolate::SurfaceInterpolator).
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PointSet {
    points: Vec<Point3>,
}

impl PointSet {
    pub fn new(points: Vec<Point3>) -> Self {
        Self { points }
    }

    /// Builds a set from plain `(x, y, z)` triples.
    pub fn from_triples(triples: &[(f64, f64, f64)]) -> Self {
        triples.iter().copied().map(Point3::from).collect()
    }

    /// Number of samples.
    pub fn count(&self) -> usize {
        self.points.len()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// XY extents of the samples, `None` for an empty set.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(&self.points)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Point3> {
        self.points.iter()
    }

    pub fn as_slice(&self) -> &[Point3] {
        &self.points
    }

    pub fn get(&self, index: usize) -> Option<&Point3> {
        self.points.get(index)
    }
}

impl From<Vec<Point3>> for PointSet {
    fn from(points: Vec<Point3>) -> Self {
        Self::new(points)
    }
}

impl FromIterator<Point3> for PointSet {
    fn from_iter<I: IntoIterator<Item = Point3>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a PointSet {
    type Item = &'a Point3;
    type IntoIter = std::slice::Iter<'a, Point3>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
