//! pathwarp: unroll the neighborhood of a curved path onto a straight segment.
//!
//! Builds two co-indexed triangle grids around a polyline: one following
//! the real curve, one laid on a straight segment of the same length. Any
//! point near the path is then warped by locating its triangle in one grid
//! and rebuilding it, with the same barycentric weights, in the triangle of
//! the other grid that carries the same id.
//!
//! # Example
//!
//! ```no_run
//! use pathwarp::{kurbo::Point, Path, WarpConfig, Warping};
//!
//! let path = Path::new(vec![
//!     Point::new(2.35, 48.85),
//!     Point::new(2.37, 48.86),
//!     Point::new(2.40, 48.86),
//! ])?;
//! let warping = Warping::new(&path, &WarpConfig::default())?;
//! let straight = warping.warp(Point::new(2.37, 48.861))?;
//! # Ok::<(), pathwarp::WarpError>(())
//! ```

#![forbid(unsafe_code)]

mod config;
mod util;
mod warping;

pub mod barycentric;
pub mod error;
pub mod geom;
pub mod grid;
pub mod path;
pub mod render;
pub mod spatial;

// Re-export kurbo and geo so downstream users get the same versions
// used by the public point and geometry types.
pub use geo;
pub use kurbo;

pub use barycentric::{
    barycentric, locate, locate_in_step, point_in_triangle, transform, Barycentric, Located,
};
pub use config::{Orientation, WarpConfig, MAX_SAMPLES, MIN_SAMPLES};
pub use error::WarpError;
pub use grid::{
    boundary_of, build_grids, build_grids_oriented, grid_to_points, inverted_triangles,
    points_grid_to_zone, points_to_grid, straighten, untangle, Diagonal, Grid, GridIndex, Grids,
    PointsGrid, Side, StraightenSettings, Triangle, TriangleId, Untangled, Zone,
};
pub use path::{extend_line, resample, simplify, Path};
pub use warping::Warping;
