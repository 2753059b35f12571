//! Uniform bucket grid over a static point set for nearest-point queries.
//!
//! Points are hashed into cubic cells of edge `cell_size`. A query visits
//! cells in growing Chebyshev rings around its own cell and stops once no
//! unvisited ring can contain a closer point. Results are exact: the grid
//! only prunes, distances are the same Euclidean distances a brute-force
//! scan computes.

use hashbrown::HashMap;

use crate::geometry::vector::distance;

type Cell = [i64; 3];

/// Static spatial index over a point cloud.
#[derive(Clone, Debug)]
pub struct PointGrid {
    origin: [f64; 3],
    cell_size: f64,
    points: Vec<[f64; 3]>,
    cells: HashMap<Cell, Vec<usize>>,
    min_cell: Cell,
    max_cell: Cell,
}

impl PointGrid {
    /// Build a grid; `cell_size` defaults to [`PointGrid::auto_cell_size`].
    ///
    /// Returns `None` for an empty point set.
    pub fn new(points: Vec<[f64; 3]>, cell_size: Option<f64>) -> Option<Self> {
        let first = *points.first()?;
        let cell_size = cell_size
            .filter(|c| c.is_finite() && *c > 0.0)
            .unwrap_or_else(|| Self::auto_cell_size(&points));
        let mut origin = first;
        for p in &points {
            for k in 0..3 {
                origin[k] = origin[k].min(p[k]);
            }
        }
        let mut grid = Self {
            origin,
            cell_size,
            points: Vec::new(),
            cells: HashMap::new(),
            min_cell: [i64::MAX; 3],
            max_cell: [i64::MIN; 3],
        };
        for (idx, p) in points.iter().enumerate() {
            let c = grid.cell_of(*p);
            for k in 0..3 {
                grid.min_cell[k] = grid.min_cell[k].min(c[k]);
                grid.max_cell[k] = grid.max_cell[k].max(c[k]);
            }
            grid.cells.entry(c).or_default().push(idx);
        }
        grid.points = points;
        Some(grid)
    }

    /// Cell edge giving roughly one point per occupied cell, based on the
    /// bounding box and the number of non-flat axes.
    pub fn auto_cell_size(points: &[[f64; 3]]) -> f64 {
        let mut lo = [f64::INFINITY; 3];
        let mut hi = [f64::NEG_INFINITY; 3];
        for p in points {
            for k in 0..3 {
                lo[k] = lo[k].min(p[k]);
                hi[k] = hi[k].max(p[k]);
            }
        }
        let extents: Vec<f64> = (0..3).map(|k| (hi[k] - lo[k]).max(0.0)).collect();
        let max_extent = extents.iter().copied().fold(0.0, f64::max);
        if !(max_extent.is_finite() && max_extent > 0.0) {
            return 1.0;
        }
        let dims = extents.iter().filter(|&&e| e > max_extent * 1e-9).count().max(1);
        let per_axis = (points.len() as f64).powf(1.0 / dims as f64).max(1.0);
        max_extent / per_axis
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn cell_of(&self, p: [f64; 3]) -> Cell {
        // float -> int casts saturate, so far-away queries stay well-defined
        [0, 1, 2].map(|k| ((p[k] - self.origin[k]) / self.cell_size).floor() as i64)
    }

    /// Index and distance of the nearest stored point. Ties resolve to the
    /// lowest index.
    pub fn nearest(&self, q: [f64; 3]) -> Option<(usize, f64)> {
        if self.points.is_empty() {
            return None;
        }
        let qc = self.cell_of(q);
        let mut start = 0i64;
        let mut end = 0i64;
        for k in 0..3 {
            let below = self.min_cell[k].saturating_sub(qc[k]).max(0);
            let above = qc[k].saturating_sub(self.max_cell[k]).max(0);
            start = start.max(below.max(above));
            let far = qc[k]
                .saturating_sub(self.min_cell[k])
                .saturating_abs()
                .max(self.max_cell[k].saturating_sub(qc[k]).saturating_abs());
            end = end.max(far);
        }

        let mut best: Option<(usize, f64)> = None;
        let mut r = start;
        while r <= end {
            self.visit_ring(qc, r, |idx| {
                let d = distance(q, self.points[idx]);
                let better = match best {
                    None => true,
                    Some((bi, bd)) => d < bd || (d == bd && idx < bi),
                };
                if better {
                    best = Some((idx, d));
                }
            });
            // Rings beyond `r` are at least `r * cell_size` away; one ring of
            // slack absorbs rounding in `cell_of`.
            if let Some((_, bd)) = best {
                let bound = (r - 1).max(0) as f64 * self.cell_size;
                if bd <= bound {
                    break;
                }
            }
            if r == i64::MAX {
                break;
            }
            r += 1;
        }
        best
    }

    /// Visit the point indices in all occupied cells at Chebyshev distance
    /// exactly `r` from `center`.
    fn visit_ring(&self, center: Cell, r: i64, mut visit: impl FnMut(usize)) {
        let range = |k: usize| {
            let lo = center[k].saturating_sub(r).max(self.min_cell[k]);
            let hi = center[k].saturating_add(r).min(self.max_cell[k]);
            lo..=hi
        };
        for x in range(0) {
            let on_x = x.abs_diff(center[0]) == r.unsigned_abs();
            for y in range(1) {
                let on_y = y.abs_diff(center[1]) == r.unsigned_abs();
                let zs = range(2);
                let mut emit = |z: i64| {
                    if let Some(bucket) = self.cells.get(&[x, y, z]) {
                        bucket.iter().copied().for_each(&mut visit);
                    }
                };
                if on_x || on_y {
                    zs.for_each(&mut emit);
                } else {
                    let below = center[2].saturating_sub(r);
                    let above = center[2].saturating_add(r);
                    if zs.contains(&below) {
                        emit(below);
                    }
                    if above != below && zs.contains(&above) {
                        emit(above);
                    }
                }
            }
        }
    }
}
