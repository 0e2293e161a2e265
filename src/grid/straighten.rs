//! Grid relaxation ("straightening").
//!
//! Sharp bends fold the original grid: cells on the inner side of the bend
//! overlap. Relaxation smooths every free point's offset from its row's
//! centerline point toward the mean offset of its four neighbors, which
//! fans the rows out around the bend while the first and last rows and the
//! centerline stay pinned to the path.

use kurbo::Point;
use serde::{Deserialize, Serialize};

use super::{grid_to_points, inverted_triangles, points_to_grid, Grid, PointsGrid, TriangleId};
use crate::error::WarpError;
use crate::geom;

/// Relaxation strength and number of passes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StraightenSettings {
    /// Blend factor toward the neighbor mean, in [0, 1]. 0 = no-op.
    pub force: f64,
    /// Number of passes, at least 1.
    pub iterations: usize,
}

impl Default for StraightenSettings {
    fn default() -> Self {
        Self {
            force: 0.5,
            iterations: 1,
        }
    }
}

impl StraightenSettings {
    fn validate(&self) -> Result<(), WarpError> {
        if !(0.0..=1.0).contains(&self.force) {
            return Err(WarpError::invalid(format!(
                "straighten force must be in [0, 1], got {}",
                self.force
            )));
        }
        if self.iterations == 0 {
            return Err(WarpError::invalid("straighten needs at least one iteration"));
        }
        Ok(())
    }
}

/// Relax the interior points of `grid` and return the adjusted copy.
pub fn straighten(
    grid: &Grid,
    steps: usize,
    settings: StraightenSettings,
) -> Result<Grid, WarpError> {
    settings.validate()?;
    let mut points = grid_to_points(grid, steps)?;
    for pass in 0..settings.iterations {
        points = relax(&points, settings.force);
        log::trace!("straighten pass {}/{}", pass + 1, settings.iterations);
    }
    Ok(points_to_grid(&points))
}

/// Result of [`untangle`].
#[derive(Debug, Clone, PartialEq)]
pub struct Untangled {
    pub grid: Grid,
    /// Relaxation passes that produced `grid`.
    pub passes: usize,
    /// Triangles of `grid` still inverted relative to the reference grid.
    pub inverted: Vec<TriangleId>,
}

/// [`straighten`], then more passes while any triangle is inverted relative
/// to its counterpart in `reference`, at most `extra_passes` of them.
///
/// Returns the earliest pass with the fewest inverted triangles. Some grids
/// cannot be unfolded with pinned end rows, e.g. when a point of the first
/// row coincides with a point of the last one; those come back with a
/// non-empty `inverted`.
pub fn untangle(
    grid: &Grid,
    reference: &Grid,
    steps: usize,
    settings: StraightenSettings,
    extra_passes: usize,
) -> Result<Untangled, WarpError> {
    let relaxed = straighten(grid, steps, settings)?;
    let mut best = Untangled {
        inverted: inverted_triangles(&relaxed, reference)?,
        grid: relaxed,
        passes: settings.iterations,
    };
    if best.inverted.is_empty() || settings.force == 0.0 {
        return Ok(best);
    }

    let mut points = grid_to_points(&best.grid, steps)?;
    for extra in 1..=extra_passes {
        points = relax(&points, settings.force);
        let grid = points_to_grid(&points);
        let inverted = inverted_triangles(&grid, reference)?;
        if inverted.len() < best.inverted.len() {
            best = Untangled {
                grid,
                passes: settings.iterations + extra,
                inverted,
            };
            if best.inverted.is_empty() {
                break;
            }
        }
    }
    log::debug!(
        "untangled after {} passes, {} inverted triangles left",
        best.passes,
        best.inverted.len()
    );
    Ok(best)
}

/// `neighbor` if it exists, otherwise `opposite` mirrored through `current`.
pub fn neighbor_or_mirror(current: Point, neighbor: Option<Point>, opposite: Point) -> Point {
    neighbor.unwrap_or_else(|| current + (current - opposite))
}

/// One Jacobi pass: reads only `points`, writes a new grid.
///
/// Works on offsets from each row's centerline point, so a uniformly offset
/// row is a fixed point however the centerline curves.
fn relax(points: &PointsGrid, force: f64) -> PointsGrid {
    let mut next = points.clone();
    if force == 0.0 {
        return next;
    }
    let offset_of = |row: usize, offset: i32| -> Option<Point> {
        Some((points.get(row, offset)? - points.get(row, 0)?).to_point())
    };
    let last_row = points.steps();
    for row in 1..last_row {
        let Some(center) = points.get(row, 0) else {
            continue;
        };
        for offset in points.offsets().filter(|&j| j != 0) {
            // Rows 1..last_row and offsets from `offsets()` are always present.
            let (Some(current), Some(top), Some(bottom)) = (
                offset_of(row, offset),
                offset_of(row + 1, offset),
                offset_of(row - 1, offset),
            ) else {
                continue;
            };
            let left = offset_of(row, offset - 1);
            let right = offset_of(row, offset + 1);
            let (left, right) = match (left, right) {
                (Some(l), r) => (l, neighbor_or_mirror(current, r, l)),
                (None, Some(r)) => (neighbor_or_mirror(current, None, r), r),
                (None, None) => continue,
            };
            let Some(mean) = geom::mean(&[top, bottom, left, right]) else {
                continue;
            };
            let moved = geom::add(
                geom::multiply(mean.to_vec2(), force),
                geom::multiply(current.to_vec2(), 1.0 - force),
            );
            next.set(row, offset, center + moved);
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::build_grids;
    use crate::path::{resample, Path};

    fn bend(samples: usize) -> Path {
        let raw = Path::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
        ])
        .unwrap();
        resample(&raw, samples).unwrap()
    }

    #[test]
    fn zero_force_is_identity() {
        let grids = build_grids(&bend(9), 2).unwrap();
        let settings = StraightenSettings {
            force: 0.0,
            iterations: 4,
        };
        let same = straighten(&grids.original, grids.steps, settings).unwrap();
        assert_eq!(same, grids.original);
    }

    #[test]
    fn end_rows_and_centerline_are_pinned() {
        let grids = build_grids(&bend(9), 3).unwrap();
        let settings = StraightenSettings {
            force: 0.8,
            iterations: 5,
        };
        let relaxed = straighten(&grids.original, grids.steps, settings).unwrap();
        let before = grid_to_points(&grids.original, grids.steps).unwrap();
        let after = grid_to_points(&relaxed, grids.steps).unwrap();
        assert_eq!(before.rows()[0], after.rows()[0]);
        assert_eq!(before.rows()[grids.steps], after.rows()[grids.steps]);
        for row in 0..=grids.steps {
            assert_eq!(before.get(row, 0), after.get(row, 0));
        }
        assert_ne!(before, after);
    }

    #[test]
    fn straight_grid_is_a_fixed_point() {
        let path = Path::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(3.0, 0.0),
        ])
        .unwrap();
        let grids = build_grids(&path, 2).unwrap();
        let relaxed = straighten(&grids.warped, grids.steps, StraightenSettings::default()).unwrap();
        for (a, b) in relaxed.triangles().iter().zip(grids.warped.triangles()) {
            for (u, v) in a.vertices.iter().zip(b.vertices.iter()) {
                assert!(u.distance(*v) < 1e-12);
            }
        }
    }

    #[test]
    fn untangle_unfolds_a_resampled_bend() {
        let grids = build_grids(&bend(21), 3).unwrap();
        assert!(!inverted_triangles(&grids.original, &grids.warped).unwrap().is_empty());
        let settings = StraightenSettings {
            force: 0.5,
            iterations: 2,
        };
        let untangled = untangle(&grids.original, &grids.warped, grids.steps, settings, 32).unwrap();
        assert!(untangled.inverted.is_empty(), "{:?}", untangled.inverted);
        assert!(untangled.passes > settings.iterations);
        assert!(untangled.passes <= settings.iterations + 32);
    }

    #[test]
    fn untangle_stops_early_on_a_clean_grid() {
        let path = Path::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.1),
            Point::new(2.0, 0.0),
            Point::new(3.0, 0.1),
        ])
        .unwrap();
        let grids = build_grids(&path, 1).unwrap();
        let untangled = untangle(
            &grids.original,
            &grids.warped,
            grids.steps,
            StraightenSettings::default(),
            10,
        )
        .unwrap();
        assert_eq!(untangled.passes, 1);
        assert!(untangled.inverted.is_empty());
    }

    #[test]
    fn mirror_synthesizes_missing_neighbor() {
        let current = Point::new(1.0, 1.0);
        let opposite = Point::new(0.0, 1.0);
        assert_eq!(neighbor_or_mirror(current, None, opposite), Point::new(2.0, 1.0));
        let given = Point::new(5.0, 5.0);
        assert_eq!(neighbor_or_mirror(current, Some(given), opposite), given);
    }

    #[test]
    fn rejects_bad_settings() {
        let grids = build_grids(&bend(5), 1).unwrap();
        let too_strong = StraightenSettings {
            force: 1.5,
            iterations: 1,
        };
        assert!(straighten(&grids.original, grids.steps, too_strong).is_err());
        let no_pass = StraightenSettings {
            force: 0.5,
            iterations: 0,
        };
        assert!(straighten(&grids.original, grids.steps, no_pass).is_err());
    }
}
