use thiserror::Error;

use crate::grid::TriangleId;

/// Errors that can occur while building or using a warping.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum WarpError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("malformed grid: {0}")]
    MalformedGrid(String),

    #[error("degenerate triangle {0}")]
    DegenerateTriangle(TriangleId),

    #[error("point ({x}, {y}) is outside the grid")]
    PointOutsideGrid { x: f64, y: f64 },

    #[error("failed to render grids: {0}")]
    Render(String),

    #[error("failed to encode PNG: {0}")]
    Encode(#[from] png::EncodingError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl WarpError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        WarpError::InvalidArgument(msg.into())
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        WarpError::MalformedGrid(msg.into())
    }

    pub(crate) fn outside(point: kurbo::Point) -> Self {
        WarpError::PointOutsideGrid {
            x: point.x,
            y: point.y,
        }
    }
}
