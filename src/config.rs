use serde::{Deserialize, Serialize};

use crate::grid::StraightenSettings;
use crate::spatial::DEFAULT_BINS;

/// All warping parameters in one struct.
/// Serializable (for saving presets) and adjustable field by field
/// (for command-line overrides).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarpConfig {
    // -- Path stage --
    /// Ramer-Douglas-Peucker tolerance in coordinate units. 0 = keep every vertex.
    pub simplify_epsilon: f64,
    /// Length added at each end of the path, as a fraction of its length.
    /// Gives features just past the path's ends a cell to land in. 0 = off.
    pub extension: f64,
    /// Number of resampled path points (grid rows). If None, one per vertex of
    /// the simplified path, clamped to [MIN_SAMPLES, MAX_SAMPLES].
    pub samples: Option<usize>,

    // -- Grid stage --
    /// Lateral bands on each side of the path, each one step wide.
    pub strips_per_side: usize,
    /// Direction of the straight segment the path is unrolled onto.
    pub orientation: Orientation,

    // -- Relaxation --
    /// Relaxation of the original grid. None = keep it as built.
    pub straighten: Option<StraightenSettings>,
    /// Extra relaxation passes allowed while the original grid is still
    /// folded after `straighten`.
    pub untangle_passes: usize,

    // -- Localization --
    /// Buckets along the longest axis of each grid's spatial index.
    pub bins: usize,
}

/// Direction of the straight reference segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Along the path's overall bearing, first vertex to last.
    #[default]
    Bearing,
    /// Along +y, so the path runs bottom to top.
    Northward,
}

/// Bounds on the derived sample count.
pub const MIN_SAMPLES: usize = 15;
pub const MAX_SAMPLES: usize = 200;

impl Default for WarpConfig {
    fn default() -> Self {
        Self {
            simplify_epsilon: 0.0,
            extension: 0.0,
            samples: None,
            strips_per_side: 3,
            orientation: Orientation::Bearing,
            straighten: Some(StraightenSettings {
                force: 0.5,
                iterations: 3,
            }),
            untangle_passes: 64,
            bins: DEFAULT_BINS,
        }
    }
}
