//! Erosion and deposition maps derived from a before/after snapshot.

use serde::{Deserialize, Serialize};

use crate::grid::Grid;

/// Which derived maps the caller wants back from an engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapRequest {
    pub erosion: bool,
    pub deposition: bool,
}

impl MapRequest {
    pub const NONE: Self = Self {
        erosion: false,
        deposition: false,
    };
    pub const EROSION: Self = Self {
        erosion: true,
        deposition: false,
    };
    pub const DEPOSITION: Self = Self {
        erosion: false,
        deposition: true,
    };
    pub const BOTH: Self = Self {
        erosion: true,
        deposition: true,
    };

    pub fn any(&self) -> bool {
        self.erosion || self.deposition
    }
}

/// Maps produced by an engine run; `None` for maps that were not requested.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErosionMaps {
    /// `max(before - after, 0)` per cell.
    pub erosion: Option<Grid>,
    /// `max(after - before, 0)` per cell.
    pub deposition: Option<Grid>,
}

/// Snapshot taken before an engine mutates its field.
///
/// Nothing is copied when no map is requested.
#[derive(Debug)]
pub struct DepositionTracker {
    request: MapRequest,
    before: Option<Grid>,
}

impl DepositionTracker {
    pub fn begin(z: &Grid, request: MapRequest) -> Self {
        Self {
            request,
            before: request.any().then(|| z.clone()),
        }
    }

    /// Computes the requested maps against the current state of the field.
    pub fn finish(self, z: &Grid) -> ErosionMaps {
        let Some(before) = self.before else {
            return ErosionMaps::default();
        };
        let erosion = self.request.erosion.then(|| {
            let mut m = before.clone();
            m.zip_apply(z, |b, a| (b - a).max(0.0));
            m
        });
        let deposition = self.request.deposition.then(|| {
            let mut m = z.clone();
            m.zip_apply(&before, |a, b| (a - b).max(0.0));
            m
        });
        ErosionMaps { erosion, deposition }
    }
}
