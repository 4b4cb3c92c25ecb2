//! Uniform bucket grid used for point location and nearest sample queries.

use crate::geometry::{BoundingBox, Point};

/// Buckets are sized so that on average about this many items share one.
const ITEMS_PER_BUCKET: f64 = 2.0;
const MAX_BUCKETS_PER_AXIS: usize = 4096;

/// Spatial hash over a fixed rectangle. Items are registered by their XY
/// extents and looked up by the bucket containing a query point.
#[derive(Debug, Clone)]
pub(crate) struct BucketGrid {
    bounds: BoundingBox,
    bucket_w: f64,
    bucket_h: f64,
    nx: usize,
    ny: usize,
    buckets: Vec<Vec<usize>>,
}

impl BucketGrid {
    /// Creates an empty grid over `bounds` sized for `items` entries.
    pub fn new(bounds: BoundingBox, items: usize) -> Self {
        let w = bounds.width().max(f64::MIN_POSITIVE);
        let h = bounds.height().max(f64::MIN_POSITIVE);
        let target = (items as f64 / ITEMS_PER_BUCKET).max(1.0);
        let side = (w * h / target).sqrt();
        let nx = ((w / side).ceil() as usize).clamp(1, MAX_BUCKETS_PER_AXIS);
        let ny = ((h / side).ceil() as usize).clamp(1, MAX_BUCKETS_PER_AXIS);
        Self {
            bounds,
            bucket_w: w / nx as f64,
            bucket_h: h / ny as f64,
            nx,
            ny,
            buckets: vec![Vec::new(); nx * ny],
        }
    }

    fn column(&self, x: f64) -> usize {
        let c = ((x - self.bounds.x_min) / self.bucket_w).floor();
        if c <= 0.0 {
            0
        } else {
            (c as usize).min(self.nx - 1)
        }
    }

    fn row(&self, y: f64) -> usize {
        let r = ((y - self.bounds.y_min) / self.bucket_h).floor();
        if r <= 0.0 {
            0
        } else {
            (r as usize).min(self.ny - 1)
        }
    }

    /// Registers `item` in every bucket overlapped by `extent`.
    pub fn insert(&mut self, item: usize, extent: &BoundingBox) {
        let (c0, c1) = (self.column(extent.x_min), self.column(extent.x_max));
        let (r0, r1) = (self.row(extent.y_min), self.row(extent.y_max));
        for r in r0..=r1 {
            for c in c0..=c1 {
                self.buckets[r * self.nx + c].push(item);
            }
        }
    }

    /// Items registered in the bucket containing `p`. Points outside the
    /// grid bounds have no candidates.
    pub fn candidates(&self, p: Point) -> &[usize] {
        if !self.bounds.contains(p.x, p.y) {
            return &[];
        }
        &self.buckets[self.row(p.y) * self.nx + self.column(p.x)]
    }

    /// Index of the point in `points` closest to `q`. Every entry of
    /// `points` must have been inserted under its own index. Ties resolve to
    /// the lowest index.
    pub fn nearest(&self, q: Point, points: &[Point]) -> Option<usize> {
        self.nearest_by(q, |i| distance2(q, points[i]))
    }

    /// Item minimising `dist2`, the squared distance from `q` to the item's
    /// geometry. Items must lie within the extents they were inserted with.
    /// Ties resolve to the lowest index.
    pub fn nearest_by(&self, q: Point, mut dist2: impl FnMut(usize) -> f64) -> Option<usize> {
        let mut best: Option<(f64, usize)> = None;
        for ring in 0..=self.max_ring() {
            for bucket in self.ring(q, ring) {
                for &i in bucket {
                    let d2 = dist2(i);
                    let better = match best {
                        None => true,
                        Some((bd, bi)) => d2 < bd || (d2 == bd && i < bi),
                    };
                    if better {
                        best = Some((d2, i));
                    }
                }
            }
            if let Some((bd, _)) = best {
                if bd.sqrt() < self.reach(ring) {
                    break;
                }
            }
        }
        best.map(|(_, i)| i)
    }

    /// Indices of the `k` points in `points` closest to `q`, nearest first,
    /// ties by index. Points must have been inserted once each under their
    /// own index.
    pub fn k_nearest(&self, q: Point, points: &[Point], k: usize) -> Vec<usize> {
        let mut found: Vec<(f64, usize)> = Vec::new();
        if k == 0 {
            return Vec::new();
        }
        let by_distance = |a: &(f64, usize), b: &(f64, usize)| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1));
        for ring in 0..=self.max_ring() {
            for bucket in self.ring(q, ring) {
                found.extend(bucket.iter().map(|&i| (distance2(q, points[i]), i)));
            }
            if found.len() >= k {
                found.sort_by(by_distance);
                found.truncate(k);
                if found[k - 1].0.sqrt() < self.reach(ring) {
                    break;
                }
            }
        }
        found.sort_by(by_distance);
        found.truncate(k);
        found.into_iter().map(|(_, i)| i).collect()
    }

    fn max_ring(&self) -> usize {
        self.nx.max(self.ny)
    }

    // Anything outside ring `ring` is at least this far from the clamped
    // query, and clamping onto the grid never increases distances to items
    // inside it.
    fn reach(&self, ring: usize) -> f64 {
        ring as f64 * self.bucket_w.min(self.bucket_h)
    }

    /// Buckets at Chebyshev distance `ring` from the bucket holding `q`.
    fn ring(&self, q: Point, ring: usize) -> impl Iterator<Item = &Vec<usize>> + '_ {
        let cx = self.column(q.x) as isize;
        let cy = self.row(q.y) as isize;
        ring_cells(cx, cy, ring as isize)
            .into_iter()
            .filter(move |&(c, r)| c >= 0 && r >= 0 && c < self.nx as isize && r < self.ny as isize)
            .map(move |(c, r)| &self.buckets[r as usize * self.nx + c as usize])
    }
}

fn distance2(a: Point, b: Point) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    dx * dx + dy * dy
}

/// Bucket coordinates at Chebyshev distance `ring` from `(cx, cy)`.
fn ring_cells(cx: isize, cy: isize, ring: isize) -> Vec<(isize, isize)> {
    if ring == 0 {
        return vec![(cx, cy)];
    }
    let mut cells = Vec::with_capacity((8 * ring) as usize);
    for c in (cx - ring)..=(cx + ring) {
        cells.push((c, cy - ring));
        cells.push((c, cy + ring));
    }
    for r in (cy - ring + 1)..=(cy + ring - 1) {
        cells.push((cx - ring, r));
        cells.push((cx + ring, r));
    }
    cells
}
