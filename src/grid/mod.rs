//! Co-indexed triangle grids around a path.
//!
//! A grid covers a swath of `2 * strips_per_side` lateral bands around the
//! path, one row of quad cells per path step, each cell split into an
//! `inside` and an `outside` triangle. The `original` grid follows the real
//! curve; the `warped` grid is the same index space laid on a straight line.
//! Every triangle carries a [`TriangleId`] so a triangle of one grid resolves
//! to its counterpart in the other with a plain key lookup.

mod points;
mod straighten;
mod zone;

pub use points::{grid_to_points, points_to_grid, Diagonal, PointsGrid};
pub use straighten::{neighbor_or_mirror, straighten, untangle, StraightenSettings, Untangled};
pub use zone::{boundary_of, points_grid_to_zone, Zone};

use std::fmt;
use std::str::FromStr;

use kurbo::{Point, Rect, Vec2};
use rustc_hash::FxHashMap;

use crate::config::Orientation;
use crate::error::WarpError;
use crate::geom;
use crate::path::Path;

/// Which of the two triangles of a quad cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    /// The triangle holding both inner (closer to the path) corners.
    Inside,
    /// The triangle holding both outer corners.
    Outside,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Inside, Side::Outside];

    fn as_str(self) -> &'static str {
        match self {
            Side::Inside => "inside",
            Side::Outside => "outside",
        }
    }
}

/// Stable position of a triangle in the grid index space.
///
/// Formats as `"{step}:{strip}:{side}"`, e.g. `4:-2:outside`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriangleId {
    /// Path segment, in `0..steps`.
    pub step: usize,
    /// Signed lateral band: positive on the left of the path, never 0.
    pub strip: i32,
    pub side: Side,
}

impl TriangleId {
    pub fn new(step: usize, strip: i32, side: Side) -> Self {
        Self { step, strip, side }
    }
}

impl fmt::Display for TriangleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.step, self.strip, self.side.as_str())
    }
}

impl FromStr for TriangleId {
    type Err = WarpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || WarpError::invalid(format!("invalid triangle id {:?}", s));
        let mut parts = s.split(':');
        let (Some(step), Some(strip), Some(side), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(bad());
        };
        let step = step.parse().map_err(|_| bad())?;
        let strip: i32 = strip.parse().map_err(|_| bad())?;
        let side = match side {
            "inside" => Side::Inside,
            "outside" => Side::Outside,
            _ => return Err(bad()),
        };
        if strip == 0 {
            return Err(bad());
        }
        Ok(Self { step, strip, side })
    }
}

/// Three ordered vertices tagged with their grid position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub id: TriangleId,
    pub vertices: [Point; 3],
}

impl Triangle {
    pub fn new(id: TriangleId, vertices: [Point; 3]) -> Self {
        Self { id, vertices }
    }

    /// Signed area; positive = counter-clockwise.
    pub fn signed_area(&self) -> f64 {
        let [a, b, c] = self.vertices;
        geom::signed_area(a, b, c)
    }

    pub fn centroid(&self) -> Point {
        let [a, b, c] = self.vertices;
        ((a.to_vec2() + b.to_vec2() + c.to_vec2()) / 3.0).to_point()
    }

    pub fn bounding_box(&self) -> Rect {
        let [a, b, c] = self.vertices;
        Rect::from_points(a, b).union_pt(c)
    }
}

/// A collection of triangles covering the swath around a path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    triangles: Vec<Triangle>,
}

impl Grid {
    pub fn from_triangles(triangles: Vec<Triangle>) -> Self {
        Self { triangles }
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn into_triangles(self) -> Vec<Triangle> {
        self.triangles
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Build the id → triangle lookup for this grid.
    pub fn index(&self) -> GridIndex {
        GridIndex::new(self)
    }

    /// Bounding box of every vertex, or `None` for an empty grid.
    pub fn bounding_box(&self) -> Option<Rect> {
        self.triangles
            .iter()
            .map(Triangle::bounding_box)
            .reduce(|acc, r| acc.union(r))
    }
}

/// Arena lookup from triangle id to its position in a [`Grid`].
#[derive(Debug, Clone, Default)]
pub struct GridIndex {
    slots: FxHashMap<TriangleId, usize>,
}

impl GridIndex {
    pub fn new(grid: &Grid) -> Self {
        let mut slots = FxHashMap::with_capacity_and_hasher(grid.len(), Default::default());
        for (i, triangle) in grid.triangles.iter().enumerate() {
            slots.insert(triangle.id, i);
        }
        Self { slots }
    }

    pub fn position(&self, id: TriangleId) -> Option<usize> {
        self.slots.get(&id).copied()
    }

    /// The triangle of `grid` tagged `id`. `grid` must be the grid this
    /// index was built from.
    pub fn get<'g>(&self, grid: &'g Grid, id: TriangleId) -> Option<&'g Triangle> {
        self.position(id).and_then(|i| grid.triangles.get(i))
    }

    pub fn contains(&self, id: TriangleId) -> bool {
        self.slots.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// The two co-indexed grids built from one path.
#[derive(Debug, Clone, PartialEq)]
pub struct Grids {
    /// Follows the real, curved path.
    pub original: Grid,
    /// Regular grid on a straight segment of the same length.
    pub warped: Grid,
    /// Number of path segments (rows of cells).
    pub steps: usize,
    pub strips_per_side: usize,
}

/// Ids of the triangles of `grid` that are flat or wound opposite to their
/// counterpart in `reference`, in `grid` order.
pub fn inverted_triangles(grid: &Grid, reference: &Grid) -> Result<Vec<TriangleId>, WarpError> {
    let index = reference.index();
    let mut inverted = Vec::new();
    for t in grid.triangles() {
        let counterpart = index
            .get(reference, t.id)
            .ok_or_else(|| WarpError::malformed(format!("reference grid has no triangle {}", t.id)))?;
        if t.signed_area() * counterpart.signed_area().signum() <= 0.0 {
            inverted.push(t.id);
        }
    }
    Ok(inverted)
}

/// Build the original and warped grids for `path`, with the straight line
/// following the path's overall bearing.
pub fn build_grids(path: &Path, strips_per_side: usize) -> Result<Grids, WarpError> {
    build_grids_oriented(path, strips_per_side, Orientation::Bearing)
}

/// Build the original and warped grids for `path`.
///
/// `step` is the mean vertex spacing: lateral bands are `step` wide so the
/// warped grid is made of squares.
pub fn build_grids_oriented(
    path: &Path,
    strips_per_side: usize,
    orientation: Orientation,
) -> Result<Grids, WarpError> {
    let n = path.len();
    if n < 3 {
        return Err(WarpError::invalid("path must have at least 3 points"));
    }
    if strips_per_side == 0 {
        return Err(WarpError::invalid("strips per side must be at least 1"));
    }
    let strips = i32::try_from(strips_per_side)
        .map_err(|_| WarpError::invalid("too many strips per side"))?;
    let total = path.length();
    if total <= 0.0 {
        return Err(WarpError::invalid("path has zero length"));
    }
    let steps = n - 1;
    let step = total / steps as f64;

    // Straight reference line.
    let direction = match orientation {
        Orientation::Bearing => geom::normalize(geom::vector(path.first(), path.last()))
            .map_err(|_| WarpError::invalid("path endpoints coincide, bearing is undefined"))?,
        Orientation::Northward => Vec2::new(0.0, 1.0),
    };
    let normal = geom::perpendicular(direction);
    let start = path.centroid() - direction * (total / 2.0);
    let warped_rows = (0..n)
        .map(|k| {
            let center = start + direction * (step * k as f64);
            lateral_row(center, normal, step, strips)
        })
        .collect();

    // Offsets along the local normal of each real vertex.
    let pts = path.points();
    let mut original_rows = Vec::with_capacity(n);
    for k in 0..n {
        let prev = pts[k.saturating_sub(1)];
        let next = pts[(k + 1).min(n - 1)];
        let local = geom::normalize(geom::vector(prev, next)).map_err(|_| {
            WarpError::invalid(format!("path direction is undefined at vertex {}", k))
        })?;
        original_rows.push(lateral_row(pts[k], geom::perpendicular(local), step, strips));
    }

    // Cells are split where the curved grid needs it; the warped grid reuses
    // the same splits so both triangulate the index space identically.
    let mut original_points = PointsGrid::new(strips_per_side, original_rows)?;
    original_points.choose_diagonals();
    let mut warped_points = PointsGrid::new(strips_per_side, warped_rows)?;
    warped_points.set_diagonals(original_points.diagonals().to_vec())?;
    let original = points_to_grid(&original_points);
    let warped = points_to_grid(&warped_points);
    log::debug!(
        "built grids: {} steps, {} strips per side, {} triangles each",
        steps,
        strips_per_side,
        original.len()
    );

    Ok(Grids {
        original,
        warped,
        steps,
        strips_per_side,
    })
}

/// Points at offsets `-strips..=strips` (in units of `step`) from `center`.
fn lateral_row(center: Point, normal: Vec2, step: f64, strips: i32) -> Vec<Point> {
    (-strips..=strips)
        .map(|j| center + geom::multiply(normal, step * j as f64))
        .collect()
}
