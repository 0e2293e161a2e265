//! Point localization and barycentric transfer between co-indexed grids.
//!
//! To warp a point: find the source triangle holding it, express the point in
//! that triangle's barycentric coordinates, and rebuild it from the same
//! coordinates in the target triangle with the same id.

use kurbo::Point;

use crate::error::WarpError;
use crate::grid::{Grid, GridIndex, Triangle};

/// Slack on each coordinate when testing containment, so points on shared
/// edges and vertices are found despite rounding.
pub const CONTAINMENT_EPSILON: f64 = 1e-9;

/// Relative determinant below which a triangle counts as flat.
const DEGENERATE_EPSILON: f64 = 1e-10;

/// Weights of a point relative to a triangle's three vertices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Barycentric {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl Barycentric {
    /// True iff every weight is in [0, 1] (within [`CONTAINMENT_EPSILON`]).
    pub fn is_inside(&self) -> bool {
        let range = -CONTAINMENT_EPSILON..=1.0 + CONTAINMENT_EPSILON;
        range.contains(&self.a) && range.contains(&self.b) && range.contains(&self.c)
    }
}

/// Barycentric coordinates of `point` in `triangle`.
pub fn barycentric(point: Point, triangle: &Triangle) -> Result<Barycentric, WarpError> {
    let [v0, v1, v2] = triangle.vertices;
    let e1 = v1 - v0;
    let e2 = v2 - v0;
    let det = e1.cross(e2);
    let scale = e1.hypot2().max(e2.hypot2());
    if !det.is_finite() || det.abs() <= DEGENERATE_EPSILON * scale {
        return Err(WarpError::DegenerateTriangle(triangle.id));
    }
    let d = point - v0;
    let b = d.cross(e2) / det;
    let c = e1.cross(d) / det;
    Ok(Barycentric {
        a: 1.0 - b - c,
        b,
        c,
    })
}

/// Cartesian point for `coords` in `triangle`.
pub fn point_in_triangle(coords: Barycentric, triangle: &Triangle) -> Point {
    let [v0, v1, v2] = triangle.vertices;
    (v0.to_vec2() * coords.a + v1.to_vec2() * coords.b + v2.to_vec2() * coords.c).to_point()
}

/// A triangle found to contain a point, with the point's coordinates in it.
#[derive(Debug, Clone, Copy)]
pub struct Located<'g> {
    pub triangle: &'g Triangle,
    pub coords: Barycentric,
}

/// First triangle among `candidates` containing `point`.
///
/// Flat triangles are skipped. If nothing contains the point but it lies
/// within the bounding box of a flat triangle, that triangle is reported
/// instead of a miss, since it may have been the one covering the point.
pub(crate) fn locate_among<'g>(
    point: Point,
    candidates: impl IntoIterator<Item = &'g Triangle>,
) -> Result<Located<'g>, WarpError> {
    let mut degenerate = None;
    for triangle in candidates {
        match barycentric(point, triangle) {
            Ok(coords) if coords.is_inside() => return Ok(Located { triangle, coords }),
            Ok(_) => {}
            Err(WarpError::DegenerateTriangle(id)) => {
                if degenerate.is_none() && near_box(point, triangle) {
                    degenerate = Some(id);
                }
            }
            Err(e) => return Err(e),
        }
    }
    match degenerate {
        Some(id) => Err(WarpError::DegenerateTriangle(id)),
        None => Err(WarpError::outside(point)),
    }
}

/// Whether `point` is in `triangle`'s bounding box, padded by [`CONTAINMENT_EPSILON`].
fn near_box(point: Point, triangle: &Triangle) -> bool {
    let b = triangle.bounding_box();
    point.x >= b.x0 - CONTAINMENT_EPSILON
        && point.x <= b.x1 + CONTAINMENT_EPSILON
        && point.y >= b.y0 - CONTAINMENT_EPSILON
        && point.y <= b.y1 + CONTAINMENT_EPSILON
}

/// Find the triangle of `grid` containing `point` by scanning every triangle.
pub fn locate(point: Point, grid: &Grid) -> Result<Located<'_>, WarpError> {
    locate_among(point, grid.triangles())
}

/// Like [`locate`], restricted to the cells of one path step.
pub fn locate_in_step(point: Point, grid: &Grid, step: usize) -> Result<Located<'_>, WarpError> {
    locate_among(point, grid.triangles().iter().filter(|t| t.id.step == step))
}

/// Rebuild a located point in the counterpart triangle of `target`.
pub(crate) fn project(
    located: Located<'_>,
    target: &Grid,
    target_index: &GridIndex,
) -> Result<Point, WarpError> {
    let id = located.triangle.id;
    let counterpart = target_index
        .get(target, id)
        .ok_or_else(|| WarpError::malformed(format!("target grid has no triangle {}", id)))?;
    Ok(point_in_triangle(located.coords, counterpart))
}

/// Map `point` from `source` grid space to `target` grid space.
///
/// Builds the target index on every call; hold a [`crate::Warping`] to
/// transform many points.
pub fn transform(point: Point, source: &Grid, target: &Grid) -> Result<Point, WarpError> {
    let located = locate(point, source)?;
    project(located, target, &target.index())
}
