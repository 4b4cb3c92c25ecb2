//! Local thin-plate spline interpolation.
//!
//! Each query fits the spline `f(p) = Σ wᵢ φ(|p - pᵢ|) + a₀ + a₁x + a₂y`
//! with `φ(r) = r² ln r` through the [`NEIGHBOURS`] samples nearest to it by
//! solving the `(k + 3) × (k + 3)` system
//!
//! ```text
//! | K  P | | w |   | z |
//! | Pᵀ 0 | | a | = | 0 |
//! ```
//!
//! where `K` is `k × k` with `Kᵢⱼ = φ(|pᵢ - pⱼ|)` and `P` is `k × 3` with rows
//! `[1, xᵢ, yᵢ]`. Fitting only sorts and buckets the samples; every query
//! costs a neighbour search plus one fixed-size solve. Surveys with no more
//! than [`NEIGHBOURS`] locations get the single global spline.

use nalgebra::{DMatrix, DVector};

use crate::error::{Result, SurfaceError};
use crate::geometry::{BoundingBox, Point, Point3};

use super::index::BucketGrid;

/// Samples used by each local spline.
pub const NEIGHBOURS: usize = 16;

fn kernel(r2: f64) -> f64 {
    if r2 <= 0.0 {
        0.0
    } else {
        // r² ln r == r² ln(r²) / 2
        0.5 * r2 * r2.ln()
    }
}

/// Thin-plate spline through a small set of samples. Coordinates are
/// normalised so the sample extents fit a unit square, which keeps the
/// system well conditioned for survey coordinates of any magnitude.
#[derive(Debug, Clone)]
pub struct ThinPlateSpline {
    centers: Vec<Point>,
    weights: Vec<f64>,
    trend: [f64; 3],
    origin: Point,
    scale: f64,
}

impl ThinPlateSpline {
    /// Solves the spline through `samples`, which must have distinct XY.
    /// Returns `None` when the system is singular, e.g. for collinear
    /// samples.
    pub fn solve(samples: &[Point3]) -> Option<Self> {
        let n = samples.len();
        if n < 3 {
            return None;
        }
        let bounds = BoundingBox::from_points(samples)?;
        let origin = Point::new(bounds.x_min, bounds.y_min);
        let scale = bounds.width().max(bounds.height());
        if !(scale > 0.0) {
            return None;
        }
        let centers: Vec<Point> = samples
            .iter()
            .map(|p| Point::new((p.x - origin.x) / scale, (p.y - origin.y) / scale))
            .collect();

        let size = n + 3;
        let mut a = DMatrix::<f64>::zeros(size, size);
        let mut b = DVector::<f64>::zeros(size);
        for i in 0..n {
            for j in (i + 1)..n {
                let dx = centers[i].x - centers[j].x;
                let dy = centers[i].y - centers[j].y;
                let k = kernel(dx * dx + dy * dy);
                a[(i, j)] = k;
                a[(j, i)] = k;
            }
            let row = [1.0, centers[i].x, centers[i].y];
            for (c, v) in row.iter().enumerate() {
                a[(i, n + c)] = *v;
                a[(n + c, i)] = *v;
            }
            b[i] = samples[i].z;
        }

        let solution = a.lu().solve(&b)?;
        if solution.iter().any(|v| !v.is_finite()) {
            return None;
        }
        Some(Self {
            centers,
            weights: solution.rows(0, n).iter().copied().collect(),
            trend: [solution[n], solution[n + 1], solution[n + 2]],
            origin,
            scale,
        })
    }

    /// Evaluates the spline at `(x, y)`.
    pub fn evaluate(&self, x: f64, y: f64) -> f64 {
        let qx = (x - self.origin.x) / self.scale;
        let qy = (y - self.origin.y) / self.scale;
        let mut z = self.trend[0] + self.trend[1] * qx + self.trend[2] * qy;
        for (c, w) in self.centers.iter().zip(&self.weights) {
            let dx = qx - c.x;
            let dy = qy - c.y;
            z += w * kernel(dx * dx + dy * dy);
        }
        z
    }

    pub fn center_count(&self) -> usize {
        self.centers.len()
    }
}

/// Radial basis surface made of thin-plate splines fitted around each query.
#[derive(Debug, Clone)]
pub struct LocalSpline {
    samples: Vec<Point3>,
    plan: Vec<Point>,
    index: BucketGrid,
    global: Option<ThinPlateSpline>,
}

impl LocalSpline {
    /// Prepares `samples` for local fitting. Samples sharing an XY location
    /// are merged when their elevations agree; conflicting elevations fail
    /// the fit.
    pub fn fit(samples: &[Point3]) -> Result<Self> {
        let samples = merge_coincident(samples)?;
        let n = samples.len();
        if n < 3 {
            return Err(SurfaceError::InsufficientData(format!(
                "radial basis fit needs at least 3 distinct locations, got {}",
                n
            )));
        }
        let bounds = BoundingBox::from_points(&samples)
            .ok_or_else(|| SurfaceError::InsufficientData("no samples".to_string()))?;
        let plan: Vec<Point> = samples.iter().map(Point3::xy).collect();
        let mut index = BucketGrid::new(bounds, n);
        for (i, p) in plan.iter().enumerate() {
            index.insert(i, &BoundingBox::new(p.x, p.x, p.y, p.y));
        }
        let global = if n <= NEIGHBOURS {
            let spline = ThinPlateSpline::solve(&samples).ok_or_else(|| {
                SurfaceError::InterpolationFailure("radial basis system is singular".to_string())
            })?;
            Some(spline)
        } else {
            None
        };
        log::debug!(
            "prepared thin-plate spline on {} locations ({})",
            n,
            if global.is_some() { "global" } else { "local" }
        );
        Ok(Self {
            samples,
            plan,
            index,
            global,
        })
    }

    /// Spline value at `(x, y)`, or `None` where the local system is
    /// singular, i.e. the neighbourhood is collinear.
    pub fn evaluate(&self, x: f64, y: f64) -> Option<f64> {
        let q = Point::new(x, y);
        if let Some(spline) = &self.global {
            return Some(spline.evaluate(x, y));
        }
        let near = self.index.k_nearest(q, &self.plan, NEIGHBOURS);
        let first = *near.first()?;
        if self.plan[first] == q {
            return Some(self.samples[first].z);
        }
        let local: Vec<Point3> = near.iter().map(|&i| self.samples[i]).collect();
        ThinPlateSpline::solve(&local).map(|s| s.evaluate(x, y))
    }

    /// Distinct sample locations.
    pub fn center_count(&self) -> usize {
        self.samples.len()
    }
}

/// Collapses samples with identical XY, keeping the first occurrence.
fn merge_coincident(samples: &[Point3]) -> Result<Vec<Point3>> {
    let mut order: Vec<usize> = (0..samples.len()).collect();
    order.sort_by(|&i, &j| {
        samples[i]
            .x
            .total_cmp(&samples[j].x)
            .then(samples[i].y.total_cmp(&samples[j].y))
            .then(i.cmp(&j))
    });
    let mut keep = vec![true; samples.len()];
    for w in order.windows(2) {
        let (first, second) = (samples[w[0]], samples[w[1]]);
        if first.x == second.x && first.y == second.y {
            if first.z != second.z {
                return Err(SurfaceError::InterpolationFailure(format!(
                    "conflicting elevations {} and {} at ({}, {})",
                    first.z, second.z, first.x, first.y
                )));
            }
            keep[w[1]] = false;
        }
    }
    Ok(samples
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect())
}
