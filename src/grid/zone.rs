//! Outer boundary of a grid.

use geo::{Contains, Coord, LineString, Polygon};
use kurbo::Point;

use super::{grid_to_points, Grid, PointsGrid};
use crate::error::WarpError;

/// Closed ring around a grid: the first point is repeated at the end.
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    ring: Vec<Point>,
}

impl Zone {
    pub fn ring(&self) -> &[Point] {
        &self.ring
    }

    pub fn to_polygon(&self) -> Polygon<f64> {
        let exterior: LineString<f64> = self
            .ring
            .iter()
            .map(|p| Coord { x: p.x, y: p.y })
            .collect();
        Polygon::new(exterior, vec![])
    }

    /// Whether `point` is strictly inside the zone.
    pub fn contains(&self, point: Point) -> bool {
        self.to_polygon().contains(&geo::Point::new(point.x, point.y))
    }
}

/// Walk the outline: first row left to right, right edge upward, last row
/// right to left, left edge back down, then close the ring.
pub fn points_grid_to_zone(points: &PointsGrid) -> Zone {
    let last = points.steps();
    let rows = points.rows();
    let mut ring = Vec::with_capacity(2 * (rows[0].len() + last) + 1);
    ring.extend(rows[0].iter().copied());
    ring.extend((1..last).filter_map(|i| rows[i].last().copied()));
    ring.extend(rows[last].iter().rev().copied());
    ring.extend((1..last).rev().filter_map(|i| rows[i].first().copied()));
    ring.push(rows[0][0]);
    Zone { ring }
}

/// Zone of a grid with `steps` rows of cells.
pub fn boundary_of(grid: &Grid, steps: usize) -> Result<Zone, WarpError> {
    Ok(points_grid_to_zone(&grid_to_points(grid, steps)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::build_grids;
    use crate::path::Path;

    #[test]
    fn zone_of_straight_grid_is_its_rectangle() {
        let path = Path::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(2.0, 0.0),
        ])
        .unwrap();
        let grids = build_grids(&path, 1).unwrap();
        let zone = boundary_of(&grids.warped, grids.steps).unwrap();
        let ring = zone.ring();
        // 3 + 1 + 3 + 1 points plus the closing point.
        assert_eq!(ring.len(), 9);
        assert_eq!(ring.first(), ring.last());
        assert!(zone.contains(Point::new(1.0, 0.5)));
        assert!(zone.contains(Point::new(0.1, -0.9)));
        assert!(!zone.contains(Point::new(1.0, 1.5)));
        assert!(!zone.contains(Point::new(-0.5, 0.0)));
        let area = geo::Area::unsigned_area(&zone.to_polygon());
        assert!((area - 4.0).abs() < 1e-9);
    }

    #[test]
    fn zone_visits_every_edge_point_once() {
        let path = Path::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.3),
            Point::new(2.0, 0.1),
            Point::new(3.0, 0.4),
        ])
        .unwrap();
        let grids = build_grids(&path, 2).unwrap();
        let zone = boundary_of(&grids.original, grids.steps).unwrap();
        // 5 + 2 + 5 + 2 + closing point.
        assert_eq!(zone.ring().len(), 15);
    }
}
