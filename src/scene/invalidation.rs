use serde::{Deserialize, Serialize};

/// A change to [`SceneState`](crate::SceneState) that makes the displayed frame stale.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Invalidation {
    /// Surface equation text changed.
    Formula,
    /// A named parameter changed value.
    Parameter(String),
    /// Front material color changed.
    FrontColor,
    /// Back material color changed.
    BackColor,
    /// Surface orientation changed.
    Rotation,
    /// Camera kind or field of view changed.
    Camera,
    /// Material reflectance changed.
    Materials,
    /// A light source changed.
    Lights,
    /// Background color changed.
    Background,
    /// A whole scene description was loaded.
    Loaded,
}

/// Pending invalidations plus the bulk-update suppression depth.
#[derive(Clone, Debug, Default)]
pub(crate) struct InvalidationQueue {
    pending: Vec<Invalidation>,
    suppress_depth: u32,
}

impl InvalidationQueue {
    pub(crate) fn record(&mut self, inv: Invalidation) {
        if self.suppress_depth > 0 {
            return;
        }
        if !self.pending.contains(&inv) {
            self.pending.push(inv);
        }
    }

    pub(crate) fn suppress(&mut self) {
        self.suppress_depth += 1;
    }

    /// Returns `true` when this call lifted the last level of suppression.
    pub(crate) fn release(&mut self) -> bool {
        if self.suppress_depth == 0 {
            return false;
        }
        self.suppress_depth -= 1;
        self.suppress_depth == 0
    }

    pub(crate) fn is_suppressed(&self) -> bool {
        self.suppress_depth > 0
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub(crate) fn drain(&mut self) -> Vec<Invalidation> {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/invalidation.rs"]
mod tests;
