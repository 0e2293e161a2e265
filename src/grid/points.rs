//! Dense "rows × lateral offsets" view of a grid.
//!
//! Row `k` holds the points at path vertex `k`; within a row, offset 0 is the
//! centerline and offsets `±1..=±strips_per_side` step away from it. This is
//! the shape neighbor-based algorithms want; the flat triangle list is the
//! shape localization wants.
//!
//! Each quad cell also records which diagonal splits it, so a grid and its
//! points view convert into each other without loss.

use std::ops::RangeInclusive;

use kurbo::Point;

use super::{Grid, GridIndex, Side, Triangle, TriangleId};
use crate::error::WarpError;
use crate::geom;

/// Which diagonal splits a quad cell into its two triangles.
///
/// Corners are named from the cell's row `k` ("near") and `k + 1` ("far"),
/// inner offset `a` and outer offset `b`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Diagonal {
    /// near `a` to far `b`.
    #[default]
    Rising,
    /// near `b` to far `a`.
    Falling,
}

/// The four corners of a quad cell.
#[derive(Debug, Clone, Copy)]
struct Corners {
    near_a: Point,
    far_a: Point,
    near_b: Point,
    far_b: Point,
}

impl Corners {
    /// `(inside, outside)` vertex lists for the given split.
    ///
    /// `inside[0..2]` and `outside[0..2]` are the same for both splits, which
    /// is what lets [`grid_to_points`] read corners without knowing the split.
    fn split(&self, diagonal: Diagonal) -> ([Point; 3], [Point; 3]) {
        let Corners {
            near_a,
            far_a,
            near_b,
            far_b,
        } = *self;
        match diagonal {
            Diagonal::Rising => ([near_a, far_a, far_b], [far_b, near_b, near_a]),
            Diagonal::Falling => ([near_a, far_a, near_b], [far_b, near_b, far_a]),
        }
    }
}

/// Grid points addressed by `(row, offset)`.
#[derive(Debug, Clone, PartialEq)]
pub struct PointsGrid {
    strips_per_side: usize,
    /// Each row has `2 * strips_per_side + 1` points, offset `-s` first.
    rows: Vec<Vec<Point>>,
    /// One per cell, `2 * strips_per_side` cells per step.
    diagonals: Vec<Diagonal>,
}

impl PointsGrid {
    /// Build from rows of points; every cell starts split along [`Diagonal::Rising`].
    pub fn new(strips_per_side: usize, rows: Vec<Vec<Point>>) -> Result<Self, WarpError> {
        if strips_per_side == 0 {
            return Err(WarpError::invalid("strips per side must be at least 1"));
        }
        if rows.len() < 2 {
            return Err(WarpError::invalid("a points grid needs at least 2 rows"));
        }
        let width = 2 * strips_per_side + 1;
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(WarpError::invalid(format!(
                "row {} has {} points, expected {}",
                i,
                row.len(),
                width
            )));
        }
        let cells = (rows.len() - 1) * 2 * strips_per_side;
        Ok(Self {
            strips_per_side,
            rows,
            diagonals: vec![Diagonal::default(); cells],
        })
    }

    pub fn strips_per_side(&self) -> usize {
        self.strips_per_side
    }

    /// Number of cell rows, one less than the number of point rows.
    pub fn steps(&self) -> usize {
        self.rows.len() - 1
    }

    pub fn rows(&self) -> &[Vec<Point>] {
        &self.rows
    }

    /// Valid lateral offsets, left-most (most negative) first.
    pub fn offsets(&self) -> RangeInclusive<i32> {
        let s = self.strips_per_side as i32;
        -s..=s
    }

    pub fn get(&self, row: usize, offset: i32) -> Option<Point> {
        let column = self.column(offset)?;
        self.rows.get(row).map(|r| r[column])
    }

    pub(crate) fn set(&mut self, row: usize, offset: i32, point: Point) {
        if let Some(column) = self.column(offset) {
            self.rows[row][column] = point;
        }
    }

    pub fn diagonals(&self) -> &[Diagonal] {
        &self.diagonals
    }

    /// Split of the cell at `step` whose outer edge is at offset `strip`.
    pub fn diagonal(&self, step: usize, strip: i32) -> Option<Diagonal> {
        self.cell(step, strip).map(|i| self.diagonals[i])
    }

    /// Replace every cell's split, e.g. to copy the splits of a co-indexed grid.
    pub fn set_diagonals(&mut self, diagonals: Vec<Diagonal>) -> Result<(), WarpError> {
        if diagonals.len() != self.diagonals.len() {
            return Err(WarpError::invalid(format!(
                "{} diagonals for {} cells",
                diagonals.len(),
                self.diagonals.len()
            )));
        }
        self.diagonals = diagonals;
        Ok(())
    }

    /// Split every cell along the diagonal whose worse triangle is the
    /// largest, measured with the orientation a regular grid would have.
    ///
    /// On a sharp bend, the offset point of the bend vertex can sit on one of
    /// the diagonals of its neighboring cells; this keeps those cells from
    /// holding a flat triangle.
    pub fn choose_diagonals(&mut self) {
        for (k, inner, outer) in cells(self.steps(), self.strips_per_side as i32) {
            let corners = self.corners(k, inner, outer);
            // Regular cells are counter-clockwise on the left (positive offsets).
            let sign = outer.signum() as f64;
            let worst = |diagonal| {
                let (inside, outside) = corners.split(diagonal);
                let area = |[a, b, c]: [Point; 3]| sign * geom::signed_area(a, b, c);
                area(inside).min(area(outside))
            };
            let diagonal = if worst(Diagonal::Falling) > worst(Diagonal::Rising) {
                Diagonal::Falling
            } else {
                Diagonal::Rising
            };
            if let Some(i) = self.cell(k, outer) {
                self.diagonals[i] = diagonal;
            }
        }
    }

    fn corners(&self, k: usize, inner: i32, outer: i32) -> Corners {
        let at = |row: usize, offset: i32| {
            let column = (offset + self.strips_per_side as i32) as usize;
            self.rows[row][column]
        };
        Corners {
            near_a: at(k, inner),
            far_a: at(k + 1, inner),
            near_b: at(k, outer),
            far_b: at(k + 1, outer),
        }
    }

    fn column(&self, offset: i32) -> Option<usize> {
        let column = offset + self.strips_per_side as i32;
        if column < 0 || column as usize > 2 * self.strips_per_side {
            return None;
        }
        Some(column as usize)
    }

    /// Position of a cell in `diagonals`, from its step and outer offset.
    fn cell(&self, step: usize, strip: i32) -> Option<usize> {
        let s = self.strips_per_side as i32;
        if step >= self.steps() || strip == 0 || strip.abs() > s {
            return None;
        }
        let lateral = if strip < 0 { strip + s } else { strip + s - 1 };
        Some(step * 2 * self.strips_per_side + lateral as usize)
    }
}

/// Cells of a grid in enumeration order: `(step, inner offset, outer offset)`.
fn cells(steps: usize, strips: i32) -> impl Iterator<Item = (usize, i32, i32)> {
    (0..steps).flat_map(move |k| {
        [-1, 1].into_iter().flat_map(move |direction| {
            (1..=strips).map(move |strip| (k, direction * (strip - 1), direction * strip))
        })
    })
}

/// Rebuild the dense matrix from a grid with `steps` rows of cells.
pub fn grid_to_points(grid: &Grid, steps: usize) -> Result<PointsGrid, WarpError> {
    if steps == 0 {
        return Err(WarpError::malformed("a grid has at least one step"));
    }
    let per_strip = 4 * steps;
    if grid.is_empty() || grid.len() % per_strip != 0 {
        return Err(WarpError::malformed(format!(
            "{} triangles is not a multiple of 4 x {} steps",
            grid.len(),
            steps
        )));
    }
    let strips_per_side = grid.len() / per_strip;
    let index = GridIndex::new(grid);
    let row = vec![Point::ORIGIN; 2 * strips_per_side + 1];
    let mut points = PointsGrid::new(strips_per_side, vec![row; steps + 1])?;

    let lookup = |id: TriangleId| {
        index
            .get(grid, id)
            .ok_or_else(|| WarpError::malformed(format!("missing triangle {}", id)))
    };
    for (k, inner, outer) in cells(steps, strips_per_side as i32) {
        let inside = lookup(TriangleId::new(k, outer, Side::Inside))?.vertices;
        let outside = lookup(TriangleId::new(k, outer, Side::Outside))?.vertices;
        points.set(k, inner, inside[0]);
        points.set(k + 1, inner, inside[1]);
        points.set(k + 1, outer, outside[0]);
        points.set(k, outer, outside[1]);
        // A falling split only matches this when the cell is flat, and then
        // both splits give the same triangles.
        let rising = inside[2] == outside[0] && outside[2] == inside[0];
        if !rising {
            if let Some(i) = points.cell(k, outer) {
                points.diagonals[i] = Diagonal::Falling;
            }
        }
    }
    Ok(points)
}

/// Triangulate a dense matrix back into a grid, splitting each cell along
/// its recorded diagonal.
pub fn points_to_grid(points: &PointsGrid) -> Grid {
    let strips = points.strips_per_side() as i32;
    let mut triangles = Vec::with_capacity(4 * points.strips_per_side() * points.steps());
    for (k, inner, outer) in cells(points.steps(), strips) {
        let diagonal = points.diagonal(k, outer).unwrap_or_default();
        let (inside, outside) = points.corners(k, inner, outer).split(diagonal);
        triangles.push(Triangle::new(TriangleId::new(k, outer, Side::Inside), inside));
        triangles.push(Triangle::new(TriangleId::new(k, outer, Side::Outside), outside));
    }
    Grid::from_triangles(triangles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::build_grids;
    use crate::path::{resample, Path};

    fn curvy() -> Path {
        Path::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.5),
            Point::new(2.0, 0.2),
            Point::new(3.0, 1.0),
            Point::new(3.5, 2.0),
        ])
        .unwrap()
    }

    fn bend() -> Path {
        let raw = Path::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
        ])
        .unwrap();
        resample(&raw, 21).unwrap()
    }

    #[test]
    fn round_trip_reproduces_grid() {
        for path in [curvy(), bend()] {
            let grids = build_grids(&path, 3).unwrap();
            for grid in [&grids.original, &grids.warped] {
                let points = grid_to_points(grid, grids.steps).unwrap();
                assert_eq!(points.steps(), grids.steps);
                assert_eq!(points.strips_per_side(), 3);
                assert_eq!(&points_to_grid(&points), grid);
            }
        }
    }

    #[test]
    fn round_trip_ignores_triangle_order() {
        let grids = build_grids(&curvy(), 2).unwrap();
        let mut shuffled = grids.original.clone().into_triangles();
        shuffled.reverse();
        let points = grid_to_points(&Grid::from_triangles(shuffled), grids.steps).unwrap();
        assert_eq!(points_to_grid(&points), grids.original);
    }

    #[test]
    fn both_grids_share_their_splits() {
        let grids = build_grids(&bend(), 2).unwrap();
        let original = grid_to_points(&grids.original, grids.steps).unwrap();
        let warped = grid_to_points(&grids.warped, grids.steps).unwrap();
        assert_eq!(original.diagonals(), warped.diagonals());
        assert!(original.diagonals().contains(&Diagonal::Rising));
        assert!(original.diagonals().contains(&Diagonal::Falling));
    }

    #[test]
    fn bend_cells_avoid_flat_triangles() {
        let grids = build_grids(&bend(), 1).unwrap();
        for t in grids.original.triangles() {
            assert!(t.signed_area().abs() > 1e-6, "flat triangle {}", t.id);
        }
    }

    #[test]
    fn centerline_is_the_path() {
        let path = curvy();
        let grids = build_grids(&path, 2).unwrap();
        let points = grid_to_points(&grids.original, grids.steps).unwrap();
        for (k, p) in path.points().iter().enumerate() {
            assert_eq!(points.get(k, 0), Some(*p));
        }
        assert_eq!(points.get(0, 3), None);
        assert_eq!(points.get(9, 0), None);
    }

    #[test]
    fn cells_are_indexed_by_step_and_outer_offset() {
        let rows = vec![vec![Point::ORIGIN; 5]; 3];
        let points = PointsGrid::new(2, rows).unwrap();
        assert_eq!(points.diagonals().len(), 8);
        assert_eq!(points.cell(0, -2), Some(0));
        assert_eq!(points.cell(0, -1), Some(1));
        assert_eq!(points.cell(0, 1), Some(2));
        assert_eq!(points.cell(1, 2), Some(7));
        assert_eq!(points.cell(1, 0), None);
        assert_eq!(points.cell(2, 1), None);
        assert_eq!(points.cell(0, 3), None);
    }

    #[test]
    fn missing_triangle_is_malformed() {
        let grids = build_grids(&curvy(), 1).unwrap();
        let mut triangles = grids.original.into_triangles();
        triangles.pop();
        let short = Grid::from_triangles(triangles.clone());
        assert!(matches!(
            grid_to_points(&short, grids.steps),
            Err(WarpError::MalformedGrid(_))
        ));

        // Right count, but one id duplicated in place of another.
        let duplicate = triangles[0];
        triangles.push(duplicate);
        let aliased = Grid::from_triangles(triangles);
        assert!(matches!(
            grid_to_points(&aliased, grids.steps),
            Err(WarpError::MalformedGrid(_))
        ));
    }

    #[test]
    fn rejects_ragged_rows_and_wrong_split_count() {
        let rows = vec![vec![Point::ORIGIN; 3], vec![Point::ORIGIN; 2]];
        assert!(PointsGrid::new(1, rows).is_err());
        let mut points = PointsGrid::new(1, vec![vec![Point::ORIGIN; 3]; 2]).unwrap();
        assert!(points.set_diagonals(vec![Diagonal::Falling; 3]).is_err());
        assert!(points.set_diagonals(vec![Diagonal::Falling; 2]).is_ok());
    }
}
