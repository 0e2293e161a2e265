//! Uniform bucket grid over a triangle grid, for point localization.
//!
//! Divides the grid's bounding box into `cols x rows` buckets; each bucket
//! lists the triangles whose bounding box overlaps it. O(n) build, O(1)
//! bucket lookup, then a short barycentric scan of the bucket.

use kurbo::{Point, Rect};

use crate::barycentric::{locate_among, Located};
use crate::error::WarpError;
use crate::grid::Grid;

/// Buckets per axis used when none is configured.
pub const DEFAULT_BINS: usize = 32;

/// Triangle indices bucketed by position.
#[derive(Debug, Clone)]
pub struct TriangleBins {
    bounds: Rect,
    cols: usize,
    rows: usize,
    /// CSR layout: bucket `i` holds `entries[starts[i]..starts[i + 1]]`.
    starts: Vec<u32>,
    entries: Vec<u32>,
}

impl TriangleBins {
    /// Bucket `grid` into at most `bins x bins` cells.
    pub fn new(grid: &Grid, bins: usize) -> Self {
        let bins = bins.max(1);
        let bounds = grid.bounding_box().unwrap_or(Rect::ZERO);
        // Keep buckets roughly square on elongated grids.
        let longest = bounds.width().max(bounds.height());
        let (cols, rows) = if longest > 0.0 {
            (
                ((bins as f64 * bounds.width() / longest).ceil() as usize).max(1),
                ((bins as f64 * bounds.height() / longest).ceil() as usize).max(1),
            )
        } else {
            (1, 1)
        };
        let mut index = Self {
            bounds,
            cols,
            rows,
            starts: vec![0; cols * rows + 1],
            entries: Vec::new(),
        };

        let spans: Vec<_> = grid
            .triangles()
            .iter()
            .map(|t| index.span(t.bounding_box()))
            .collect();

        // Count, prefix-sum, then fill.
        for &(c0, r0, c1, r1) in &spans {
            for r in r0..=r1 {
                for c in c0..=c1 {
                    index.starts[r * cols + c + 1] += 1;
                }
            }
        }
        for i in 1..index.starts.len() {
            index.starts[i] += index.starts[i - 1];
        }
        let total = index.starts[cols * rows] as usize;
        index.entries = vec![0; total];
        let mut cursor = index.starts.clone();
        for (t, &(c0, r0, c1, r1)) in spans.iter().enumerate() {
            for r in r0..=r1 {
                for c in c0..=c1 {
                    let slot = &mut cursor[r * cols + c];
                    index.entries[*slot as usize] = t as u32;
                    *slot += 1;
                }
            }
        }
        log::trace!(
            "bucketed {} triangles into {}x{} bins ({} entries)",
            grid.len(),
            cols,
            rows,
            total
        );
        index
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    /// Indices (into `grid.triangles()`) of triangles that may contain `point`.
    pub fn candidates(&self, point: Point) -> &[u32] {
        match self.bucket(point) {
            Some(i) => &self.entries[self.starts[i] as usize..self.starts[i + 1] as usize],
            None => &[],
        }
    }

    /// Localize `point` in `grid`, which must be the grid these bins were built from.
    pub fn locate<'g>(&self, point: Point, grid: &'g Grid) -> Result<Located<'g>, WarpError> {
        let triangles = grid.triangles();
        locate_among(
            point,
            self.candidates(point)
                .iter()
                .filter_map(|&i| triangles.get(i as usize)),
        )
    }

    fn bucket(&self, point: Point) -> Option<usize> {
        let slack = 1e-9 * self.bounds.width().max(self.bounds.height()).max(1.0);
        if point.x < self.bounds.x0 - slack
            || point.x > self.bounds.x1 + slack
            || point.y < self.bounds.y0 - slack
            || point.y > self.bounds.y1 + slack
        {
            return None;
        }
        let c = axis_cell(point.x, self.bounds.x0, self.bounds.width(), self.cols);
        let r = axis_cell(point.y, self.bounds.y0, self.bounds.height(), self.rows);
        Some(r * self.cols + c)
    }

    /// Inclusive bucket range `(c0, r0, c1, r1)` covered by `rect`.
    fn span(&self, rect: Rect) -> (usize, usize, usize, usize) {
        let b = self.bounds;
        (
            axis_cell(rect.x0, b.x0, b.width(), self.cols),
            axis_cell(rect.y0, b.y0, b.height(), self.rows),
            axis_cell(rect.x1, b.x0, b.width(), self.cols),
            axis_cell(rect.y1, b.y0, b.height(), self.rows),
        )
    }
}

/// Bucket of coordinate `v` on an axis starting at `origin`, clamped to range.
fn axis_cell(v: f64, origin: f64, extent: f64, cells: usize) -> usize {
    if extent <= 0.0 {
        return 0;
    }
    let t = ((v - origin) / extent * cells as f64).floor();
    if t <= 0.0 {
        0
    } else {
        (t as usize).min(cells - 1)
    }
}
