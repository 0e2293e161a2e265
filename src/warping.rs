//! The warping context: path preprocessing, grid construction, relaxation
//! and indexing run once, then any number of points and geometries are
//! mapped between the curved and the straight frame.

use geo::{Coord, Geometry, MapCoords};
use kurbo::Point;
use rayon::prelude::*;

use crate::barycentric::{locate_in_step, project};
use crate::config::{WarpConfig, MAX_SAMPLES, MIN_SAMPLES};
use crate::error::WarpError;
use crate::grid::{
    boundary_of, build_grids_oriented, grid_to_points, inverted_triangles, untangle, Grid,
    GridIndex, Grids, TriangleId, Zone,
};
use crate::path::{extend_line, resample, simplify, Path};
use crate::spatial::TriangleBins;
use crate::util::Timed;

/// A ready-to-use transform between a path's neighborhood and its unrolled,
/// straight counterpart. Immutable once built, so it can be shared across
/// threads.
#[derive(Debug, Clone)]
pub struct Warping {
    path: Path,
    grids: Grids,
    original_index: GridIndex,
    warped_index: GridIndex,
    original_bins: TriangleBins,
    warped_bins: TriangleBins,
    original_zone: Zone,
    warped_zone: Zone,
    inverted: Vec<TriangleId>,
}

impl Warping {
    /// Full pipeline: path → grids → indices.
    ///
    /// Simplify, extend and resample the path, build both grids, relax the
    /// original one, then bucket both for localization.
    pub fn new(path: &Path, config: &WarpConfig) -> Result<Self, WarpError> {
        let _t = Timed::debug("Warping");

        let simplified = simplify(path, config.simplify_epsilon)?;
        let kept = simplified.len();
        let extended = if config.extension > 0.0 {
            extend_line(&simplified, config.extension * simplified.length())?
        } else {
            simplified
        };
        let samples = config
            .samples
            .unwrap_or_else(|| derived_samples(extended.len()));
        let sampled = resample(&extended, samples)?;
        log::debug!(
            "path: {} vertices, {} after simplification, {} after extension, {} samples over length {:.6}",
            path.len(),
            kept,
            extended.len(),
            sampled.len(),
            sampled.length()
        );

        let mut grids = {
            let _t = Timed::debug("Build grids");
            build_grids_oriented(&sampled, config.strips_per_side, config.orientation)?
        };
        if let Some(settings) = config.straighten {
            let _t = Timed::debug("Straighten");
            let untangled = untangle(
                &grids.original,
                &grids.warped,
                grids.steps,
                settings,
                config.untangle_passes,
            )?;
            log::debug!(
                "straightened original grid: force {}, {} passes",
                settings.force,
                untangled.passes
            );
            grids.original = untangled.grid;
        }

        Self::from_grids(sampled, grids, config.bins)
    }

    /// Wrap grids built by hand (e.g. with a custom relaxation).
    pub fn from_grids(path: Path, grids: Grids, bins: usize) -> Result<Self, WarpError> {
        let _t = Timed::debug("Index grids");
        let original_zone = boundary_of(&grids.original, grids.steps)?;
        let warped_zone = boundary_of(&grids.warped, grids.steps)?;
        let inverted = inverted_triangles(&grids.original, &grids.warped)?;
        if !inverted.is_empty() {
            log::warn!(
                "{} of {} original triangles are folded; points there may warp ambiguously",
                inverted.len(),
                grids.original.len()
            );
        }
        Ok(Self {
            original_index: grids.original.index(),
            warped_index: grids.warped.index(),
            original_bins: TriangleBins::new(&grids.original, bins),
            warped_bins: TriangleBins::new(&grids.warped, bins),
            original_zone,
            warped_zone,
            inverted,
            path,
            grids,
        })
    }

    /// The resampled path the grids were built on.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn grids(&self) -> &Grids {
        &self.grids
    }

    pub fn original(&self) -> &Grid {
        &self.grids.original
    }

    pub fn warped(&self) -> &Grid {
        &self.grids.warped
    }

    pub fn original_zone(&self) -> &Zone {
        &self.original_zone
    }

    pub fn warped_zone(&self) -> &Zone {
        &self.warped_zone
    }

    pub fn original_bbox(&self) -> Option<geo::Rect<f64>> {
        to_geo_rect(&self.grids.original)
    }

    pub fn warped_bbox(&self) -> Option<geo::Rect<f64>> {
        to_geo_rect(&self.grids.warped)
    }

    /// Original triangles that are flat or wound opposite to their warped
    /// counterpart. Empty unless a bend was too sharp to unfold.
    pub fn inverted_triangles(&self) -> &[TriangleId] {
        &self.inverted
    }

    /// The path's centerline in the straight frame.
    pub fn warped_path(&self) -> Result<Path, WarpError> {
        let points = grid_to_points(&self.grids.warped, self.grids.steps)?;
        let centerline = (0..=self.grids.steps)
            .filter_map(|row| points.get(row, 0))
            .collect();
        Path::new(centerline)
    }

    /// Map a point from the curved frame to the straight frame.
    pub fn warp(&self, point: Point) -> Result<Point, WarpError> {
        let located = self.original_bins.locate(point, &self.grids.original)?;
        project(located, &self.grids.warped, &self.warped_index)
    }

    /// Map a point from the straight frame back to the curved frame.
    pub fn unwarp(&self, point: Point) -> Result<Point, WarpError> {
        let located = self.warped_bins.locate(point, &self.grids.warped)?;
        project(located, &self.grids.original, &self.original_index)
    }

    /// [`Warping::warp`] for a point whose path step is already known.
    pub fn warp_in_step(&self, point: Point, step: usize) -> Result<Point, WarpError> {
        let located = locate_in_step(point, &self.grids.original, step)?;
        project(located, &self.grids.warped, &self.warped_index)
    }

    /// Warp every coordinate of a geometry. Fails on the first coordinate
    /// that cannot be warped.
    pub fn warp_geometry(&self, geometry: &Geometry<f64>) -> Result<Geometry<f64>, WarpError> {
        geometry.try_map_coords(|c| self.warp(to_point(c)).map(to_coord))
    }

    /// Inverse of [`Warping::warp_geometry`].
    pub fn unwarp_geometry(&self, geometry: &Geometry<f64>) -> Result<Geometry<f64>, WarpError> {
        geometry.try_map_coords(|c| self.unwarp(to_point(c)).map(to_coord))
    }

    /// Warp many geometries in parallel; all or nothing.
    pub fn warp_all(&self, geometries: &[Geometry<f64>]) -> Result<Vec<Geometry<f64>>, WarpError> {
        geometries
            .par_iter()
            .map(|g| self.warp_geometry(g))
            .collect()
    }

    /// Warp many geometries in parallel, dropping those that leave the grid.
    ///
    /// Other errors still fail the whole batch.
    pub fn warp_filtered(
        &self,
        geometries: &[Geometry<f64>],
    ) -> Result<Vec<Geometry<f64>>, WarpError> {
        let results: Vec<Option<Geometry<f64>>> = geometries
            .par_iter()
            .map(|g| match self.warp_geometry(g) {
                Ok(warped) => Ok(Some(warped)),
                Err(WarpError::PointOutsideGrid { .. }) => Ok(None),
                Err(e) => Err(e),
            })
            .collect::<Result<_, _>>()?;
        let kept: Vec<_> = results.into_iter().flatten().collect();
        if kept.len() < geometries.len() {
            log::warn!(
                "dropped {} of {} geometries outside the grid",
                geometries.len() - kept.len(),
                geometries.len()
            );
        }
        Ok(kept)
    }
}

/// One sample per input vertex, within [MIN_SAMPLES, MAX_SAMPLES].
fn derived_samples(vertices: usize) -> usize {
    vertices.clamp(MIN_SAMPLES, MAX_SAMPLES)
}

fn to_point(c: Coord<f64>) -> Point {
    Point::new(c.x, c.y)
}

fn to_coord(p: Point) -> Coord<f64> {
    Coord { x: p.x, y: p.y }
}

fn to_geo_rect(grid: &Grid) -> Option<geo::Rect<f64>> {
    grid.bounding_box().map(|r| {
        geo::Rect::new(Coord { x: r.x0, y: r.y0 }, Coord { x: r.x1, y: r.y1 })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, Polygon};

    fn arc() -> Path {
        let points = (0..=12)
            .map(|i| {
                let a = i as f64 / 12.0 * std::f64::consts::FRAC_PI_2;
                Point::new(10.0 * a.cos(), 10.0 * a.sin())
            })
            .collect();
        Path::new(points).unwrap()
    }

    fn config() -> WarpConfig {
        WarpConfig {
            samples: Some(25),
            strips_per_side: 2,
            ..WarpConfig::default()
        }
    }

    #[test]
    fn warping_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Warping>();
    }

    #[test]
    fn path_vertices_land_on_straight_centerline() {
        let warping = Warping::new(&arc(), &config()).unwrap();
        let straight = warping.warped_path().unwrap();
        for (p, expected) in warping.path().points().iter().zip(straight.points()) {
            let warped = warping.warp(*p).unwrap();
            assert!(warped.distance(*expected) < 1e-9, "{:?} vs {:?}", warped, expected);
        }
    }

    #[test]
    fn unwarp_inverts_warp() {
        let warping = Warping::new(&arc(), &config()).unwrap();
        for p in [Point::new(7.0, 7.2), Point::new(9.5, 2.0), Point::new(2.5, 9.3)] {
            let there = warping.warp(p).unwrap();
            let back = warping.unwarp(there).unwrap();
            assert!(back.distance(p) < 1e-9);
        }
    }

    #[test]
    fn warp_in_step_matches_warp() {
        let warping = Warping::new(&arc(), &config()).unwrap();
        let mid = warping.original().triangles()[37].centroid();
        let step = warping.original().triangles()[37].id.step;
        let a = warping.warp(mid).unwrap();
        let b = warping.warp_in_step(mid, step).unwrap();
        assert!(a.distance(b) < 1e-9);
    }

    #[test]
    fn polygon_rings_stay_closed() {
        let warping = Warping::new(&arc(), &config()).unwrap();
        let ring = LineString::from(vec![(7.0, 7.0), (7.5, 7.0), (7.5, 7.5), (7.0, 7.0)]);
        let polygon = Geometry::Polygon(Polygon::new(ring, vec![]));
        let Geometry::Polygon(warped) = warping.warp_geometry(&polygon).unwrap() else {
            panic!("geometry kind changed");
        };
        let coords: Vec<_> = warped.exterior().coords().copied().collect();
        assert_eq!(coords.len(), 4);
        assert_eq!(coords.first(), coords.last());
    }

    #[test]
    fn batch_is_all_or_nothing_unless_filtered() {
        let warping = Warping::new(&arc(), &config()).unwrap();
        let inside = Geometry::Point(geo::Point::new(7.0, 7.1));
        let outside = Geometry::Point(geo::Point::new(100.0, 100.0));
        let batch = vec![inside.clone(), outside, inside];
        assert!(matches!(
            warping.warp_all(&batch),
            Err(WarpError::PointOutsideGrid { .. })
        ));
        assert_eq!(warping.warp_filtered(&batch).unwrap().len(), 2);
    }

    #[test]
    fn zones_and_boxes_cover_the_grids() {
        let warping = Warping::new(&arc(), &config()).unwrap();
        let bbox = warping.warped_bbox().unwrap();
        assert!(bbox.width() > 0.0 && bbox.height() > 0.0);
        let p = Point::new(7.0, 7.1);
        assert!(warping.original_zone().contains(p));
        assert!(warping.warped_zone().contains(warping.warp(p).unwrap()));
    }

    #[test]
    fn default_pipeline_unfolds_a_sharp_bend() {
        let bend = Path::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
        ])
        .unwrap();
        for strips_per_side in [2, 3] {
            let config = WarpConfig {
                samples: Some(21),
                strips_per_side,
                ..WarpConfig::default()
            };
            let warping = Warping::new(&bend, &config).unwrap();
            assert!(
                warping.inverted_triangles().is_empty(),
                "s={}: {:?}",
                strips_per_side,
                warping.inverted_triangles()
            );
        }

        let unrelaxed = Warping::new(
            &bend,
            &WarpConfig {
                samples: Some(21),
                strips_per_side: 2,
                straighten: None,
                ..WarpConfig::default()
            },
        )
        .unwrap();
        assert!(!unrelaxed.inverted_triangles().is_empty());
    }

    #[test]
    fn extension_lengthens_the_grid() {
        let plain = Warping::new(&arc(), &config()).unwrap();
        let extended = Warping::new(
            &arc(),
            &WarpConfig {
                extension: 0.1,
                ..config()
            },
        )
        .unwrap();
        let ratio = extended.path().length() / plain.path().length();
        assert!((ratio - 1.2).abs() < 0.01, "ratio {}", ratio);
        // Just past the first vertex, along the first segment's direction.
        assert!(plain.warp(Point::new(10.0, -0.3)).is_err());
        assert!(extended.warp(Point::new(10.0, -0.3)).is_ok());
    }
}
