//! Path preprocessing: along-path interpolation, resampling, extension and
//! simplification.
//!
//! All lengths are planar, in coordinate units, so they can be mixed freely
//! with the lateral offsets used by the grid builder.

use geo::{LineString, Simplify};
use kurbo::Point;

use crate::error::WarpError;
use crate::geom;

/// An immutable polyline of at least two points.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    points: Vec<Point>,
    /// Cumulative arc length at each vertex; `cumulative[0] == 0`.
    cumulative: Vec<f64>,
}

impl Path {
    /// Build a path, rejecting fewer than two points or non-finite coordinates.
    pub fn new(points: Vec<Point>) -> Result<Self, WarpError> {
        if points.len() < 2 {
            return Err(WarpError::invalid(format!(
                "a path needs at least 2 points, got {}",
                points.len()
            )));
        }
        if let Some(p) = points.iter().find(|p| !p.is_finite()) {
            return Err(WarpError::invalid(format!(
                "path coordinate ({}, {}) is not finite",
                p.x, p.y
            )));
        }
        let mut cumulative = Vec::with_capacity(points.len());
        let mut total = 0.0;
        cumulative.push(0.0);
        for pair in points.windows(2) {
            total += geom::distance(pair[0], pair[1]);
            cumulative.push(total);
        }
        Ok(Self { points, cumulative })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Point {
        self.points[0]
    }

    pub fn last(&self) -> Point {
        self.points[self.points.len() - 1]
    }

    /// Total planar length.
    pub fn length(&self) -> f64 {
        self.cumulative[self.cumulative.len() - 1]
    }

    /// Mean of the vertices.
    pub fn centroid(&self) -> Point {
        // A path always has at least two points.
        geom::mean(&self.points).unwrap_or(Point::ORIGIN)
    }

    /// Point at arc length `distance` from the start, clamped to the ends.
    pub fn along(&self, distance: f64) -> Point {
        if distance <= 0.0 {
            return self.first();
        }
        if distance >= self.length() {
            return self.last();
        }
        // First vertex strictly beyond `distance`; the segment ending there holds it.
        let end = self.cumulative.partition_point(|&d| d <= distance);
        let start = end - 1;
        let seg_len = self.cumulative[end] - self.cumulative[start];
        if seg_len <= 0.0 {
            return self.points[start];
        }
        let t = (distance - self.cumulative[start]) / seg_len;
        self.points[start].lerp(self.points[end], t)
    }

    /// Convert to a `geo::LineString` (x = longitude, y = latitude).
    pub fn to_line_string(&self) -> LineString<f64> {
        LineString::from(
            self.points
                .iter()
                .map(|p| (p.x, p.y))
                .collect::<Vec<_>>(),
        )
    }

    /// Build from a `geo::LineString`.
    pub fn from_line_string(line: &LineString<f64>) -> Result<Self, WarpError> {
        Self::new(line.coords().map(|c| Point::new(c.x, c.y)).collect())
    }
}

/// Resample a path into `sample_count` points at equal arc-length spacing.
///
/// The first and last vertices are kept exactly.
pub fn resample(path: &Path, sample_count: usize) -> Result<Path, WarpError> {
    if sample_count < 2 {
        return Err(WarpError::invalid(format!(
            "sample count must be at least 2, got {}",
            sample_count
        )));
    }
    let total = path.length();
    if total <= 0.0 {
        return Err(WarpError::invalid("cannot resample a zero-length path"));
    }
    let increment = total / (sample_count - 1) as f64;
    let mut points = Vec::with_capacity(sample_count);
    points.push(path.first());
    for i in 1..sample_count - 1 {
        points.push(path.along(increment * i as f64));
    }
    points.push(path.last());
    Path::new(points)
}

/// Lengthen a path by `extra_length` at both ends, continuing the direction
/// of the first and last segments.
pub fn extend_line(path: &Path, extra_length: f64) -> Result<Path, WarpError> {
    if !extra_length.is_finite() || extra_length <= 0.0 {
        return Err(WarpError::invalid(format!(
            "extension length must be positive, got {}",
            extra_length
        )));
    }
    let pts = path.points();
    let n = pts.len();
    let head = project_beyond(pts[1], pts[0], extra_length)
        .map_err(|_| WarpError::invalid("first path segment has zero length"))?;
    let tail = project_beyond(pts[n - 2], pts[n - 1], extra_length)
        .map_err(|_| WarpError::invalid("last path segment has zero length"))?;

    let mut points = Vec::with_capacity(n + 2);
    points.push(head);
    points.extend_from_slice(pts);
    points.push(tail);
    Path::new(points)
}

/// Point `extra` beyond `to`, on the ray from `from` through `to`.
fn project_beyond(from: Point, to: Point, extra: f64) -> Result<Point, WarpError> {
    let segment = geom::vector(from, to);
    let offset = geom::divide(geom::multiply(segment, extra), geom::length(segment))?;
    Ok(to + offset)
}

/// Ramer-Douglas-Peucker simplification. Endpoints are always kept.
pub fn simplify(path: &Path, epsilon: f64) -> Result<Path, WarpError> {
    if !epsilon.is_finite() || epsilon < 0.0 {
        return Err(WarpError::invalid(format!(
            "simplification epsilon must be non-negative, got {}",
            epsilon
        )));
    }
    if epsilon == 0.0 {
        return Ok(path.clone());
    }
    Path::from_line_string(&path.to_line_string().simplify(&epsilon))
}
