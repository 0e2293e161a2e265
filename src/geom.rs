//! Shared geometry utilities: 2D vector arithmetic on kurbo types.

use kurbo::{Point, Vec2};

use crate::error::WarpError;

/// Vectors shorter than this cannot be normalized or divided by.
const ZERO_LENGTH: f64 = 1e-12;

/// Vector from `from` to `to`.
pub fn vector(from: Point, to: Point) -> Vec2 {
    to - from
}

pub fn add(a: Vec2, b: Vec2) -> Vec2 {
    a + b
}

pub fn multiply(v: Vec2, scalar: f64) -> Vec2 {
    v * scalar
}

/// Divide a vector by a scalar. Division by zero is an error.
pub fn divide(v: Vec2, scalar: f64) -> Result<Vec2, WarpError> {
    if scalar == 0.0 || !scalar.is_finite() {
        return Err(WarpError::invalid(format!("cannot divide a vector by {}", scalar)));
    }
    Ok(v / scalar)
}

pub fn length(v: Vec2) -> f64 {
    v.hypot()
}

pub fn distance(a: Point, b: Point) -> f64 {
    a.distance(b)
}

/// Unit vector with the direction of `v`.
///
/// A zero-length vector has no direction and is rejected instead of
/// producing NaN components.
pub fn normalize(v: Vec2) -> Result<Vec2, WarpError> {
    let len = v.hypot();
    if len.is_nan() || len <= ZERO_LENGTH {
        return Err(WarpError::invalid("cannot normalize a zero-length vector"));
    }
    Ok(v / len)
}

pub fn dot(a: Vec2, b: Vec2) -> f64 {
    a.dot(b)
}

/// Unsigned angle between two vectors, in radians [0, pi].
pub fn angle(a: Vec2, b: Vec2) -> Result<f64, WarpError> {
    let a = normalize(a)?;
    let b = normalize(b)?;
    Ok(a.cross(b).atan2(a.dot(b)).abs())
}

/// `v` rotated by +90° (to its left).
pub fn perpendicular(v: Vec2) -> Vec2 {
    Vec2::new(-v.y, v.x)
}

/// Signed area of triangle abc. Positive = counter-clockwise.
pub fn signed_area(a: Point, b: Point, c: Point) -> f64 {
    (b - a).cross(c - a) / 2.0
}

/// Arithmetic mean of a non-empty set of points.
pub fn mean(points: &[Point]) -> Option<Point> {
    if points.is_empty() {
        return None;
    }
    let sum = points
        .iter()
        .fold(Vec2::ZERO, |acc, p| acc + p.to_vec2());
    Some((sum / points.len() as f64).to_point())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_rejects_zero_vector() {
        assert!(normalize(Vec2::ZERO).is_err());
        let unit = normalize(Vec2::new(3.0, 4.0)).unwrap();
        assert!((unit.hypot() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn angle_between_axes() {
        let a = angle(Vec2::new(1.0, 0.0), Vec2::new(0.0, 2.0)).unwrap();
        assert!((a - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert!(angle(Vec2::ZERO, Vec2::new(1.0, 0.0)).is_err());
    }

    #[test]
    fn divide_by_zero_fails() {
        assert!(divide(Vec2::new(1.0, 1.0), 0.0).is_err());
        assert_eq!(divide(Vec2::new(2.0, 4.0), 2.0).unwrap(), Vec2::new(1.0, 2.0));
    }

    #[test]
    fn perpendicular_turns_left() {
        let p = perpendicular(Vec2::new(1.0, 0.0));
        assert_eq!(p, Vec2::new(0.0, 1.0));
        assert!(signed_area(Point::ORIGIN, Point::new(1.0, 0.0), p.to_point()) > 0.0);
    }
}
