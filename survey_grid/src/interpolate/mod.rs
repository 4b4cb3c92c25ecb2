//! Continuous surface fitted through scattered samples.
//!
//! Inside the convex hull of the samples the configured
//! [`InterpolationMethod`] is used. Outside it the configured
//! [`ExtrapolationPolicy`] supplies the value and the result is marked as
//! extrapolated. The hull itself is always taken from the Delaunay
//! triangulation, whatever the method.

mod index;
pub mod rbf;
pub mod tin;

use crate::config::{ExtrapolationPolicy, GridConfig, InterpolationMethod};
use crate::error::{Result, SurfaceError};
use crate::geometry::{BoundingBox, Point, Point3};
use crate::points::PointSet;

use index::BucketGrid;
use rbf::LocalSpline;
pub use tin::Tin;

/// Result of evaluating the surface at one location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub z: f64,
    /// `true` if the location lies outside the convex hull of the samples.
    pub extrapolated: bool,
}

#[derive(Debug, Clone)]
enum Method {
    LinearTriangulated,
    RadialBasis(LocalSpline),
}

/// Surface fitted once from a [`PointSet`] and evaluated at arbitrary XY.
///
/// Samples are shifted to a local origin at the minimum of their extents
/// before fitting so that large survey coordinates keep full precision.
#[derive(Debug, Clone)]
pub struct SurfaceInterpolator {
    origin: Point,
    tin: Tin,
    method: Method,
    policy: ExtrapolationPolicy,
    nearest: BucketGrid,
    plan: Vec<Point>,
}

impl SurfaceInterpolator {
    /// Fits the surface using the method and policy from `config`.
    pub fn fit(points: &PointSet, config: &GridConfig) -> Result<Self> {
        Self::new(
            points,
            config.interpolation_method,
            config.extrapolation_policy,
        )
    }

    /// Fits the surface with an explicit method and extrapolation policy.
    pub fn new(
        points: &PointSet,
        method: InterpolationMethod,
        policy: ExtrapolationPolicy,
    ) -> Result<Self> {
        if points.count() < 3 {
            return Err(SurfaceError::InsufficientData(format!(
                "at least 3 points are required, got {}",
                points.count()
            )));
        }
        if let Some((i, p)) = points.iter().enumerate().find(|(_, p)| !p.is_finite()) {
            return Err(SurfaceError::InsufficientData(format!(
                "point {} has a non-finite coordinate ({}, {}, {})",
                i, p.x, p.y, p.z
            )));
        }
        let bbox = points
            .bounding_box()
            .ok_or_else(|| SurfaceError::InsufficientData("no points".to_string()))?;
        let origin = Point::new(bbox.x_min, bbox.y_min);
        let local: Vec<Point3> = points
            .iter()
            .map(|p| Point3::new(p.x - origin.x, p.y - origin.y, p.z))
            .collect();

        let tin = Tin::from_points(local.clone()).ok_or_else(|| {
            SurfaceError::InsufficientData(
                "points are collinear or coincident, no surface can be triangulated".to_string(),
            )
        })?;

        let method = match method {
            InterpolationMethod::LinearTriangulated => Method::LinearTriangulated,
            InterpolationMethod::RadialBasis => Method::RadialBasis(LocalSpline::fit(&local)?),
        };

        let plan: Vec<Point> = local.iter().map(Point3::xy).collect();
        let local_bounds = BoundingBox::new(0.0, bbox.width(), 0.0, bbox.height());
        let mut nearest = BucketGrid::new(local_bounds, plan.len());
        for (i, p) in plan.iter().enumerate() {
            nearest.insert(i, &BoundingBox::new(p.x, p.x, p.y, p.y));
        }

        let interpolator = Self {
            origin,
            tin,
            method,
            policy,
            nearest,
            plan,
        };
        log::info!(
            "fitted {:?} surface on {} points ({} triangles, {:?} extrapolation)",
            interpolator.method(),
            points.count(),
            interpolator.triangle_count(),
            policy
        );
        Ok(interpolator)
    }

    /// Evaluates the surface at `(x, y)`.
    pub fn evaluate(&self, x: f64, y: f64) -> Sample {
        let lx = x - self.origin.x;
        let ly = y - self.origin.y;
        match self.tin.locate(lx, ly) {
            Some((t, (u, v, w))) => {
                let tri = self.tin.triangles[t];
                let linear = || {
                    u * self.tin.vertices[tri[0]].z
                        + v * self.tin.vertices[tri[1]].z
                        + w * self.tin.vertices[tri[2]].z
                };
                let z = match &self.method {
                    Method::LinearTriangulated => linear(),
                    // collinear neighbourhoods fall back to the triangle
                    Method::RadialBasis(spline) => spline.evaluate(lx, ly).unwrap_or_else(linear),
                };
                Sample {
                    z,
                    extrapolated: false,
                }
            }
            None => Sample {
                z: self.extrapolate(lx, ly),
                extrapolated: true,
            },
        }
    }

    fn extrapolate(&self, lx: f64, ly: f64) -> f64 {
        match self.policy {
            ExtrapolationPolicy::NearestNeighbor => self
                .nearest
                .nearest(Point::new(lx, ly), &self.plan)
                .map_or(f64::NAN, |i| self.tin.vertices[i].z),
            ExtrapolationPolicy::FlatBoundary => self.tin.boundary_elevation(lx, ly),
        }
    }

    /// Returns `true` if `(x, y)` lies inside the convex hull of the samples.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.tin.contains(x - self.origin.x, y - self.origin.y)
    }

    pub fn method(&self) -> InterpolationMethod {
        match self.method {
            Method::LinearTriangulated => InterpolationMethod::LinearTriangulated,
            Method::RadialBasis(_) => InterpolationMethod::RadialBasis,
        }
    }

    pub fn policy(&self) -> ExtrapolationPolicy {
        self.policy
    }

    pub fn triangle_count(&self) -> usize {
        self.tin.triangles.len()
    }

    /// Convex hull vertices in drawing coordinates, counter-clockwise.
    pub fn hull(&self) -> Vec<Point3> {
        self.tin
            .hull
            .iter()
            .map(|&i| {
                let v = self.tin.vertices[i];
                Point3::new(v.x + self.origin.x, v.y + self.origin.y, v.z)
            })
            .collect()
    }
}
