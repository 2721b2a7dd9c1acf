use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::PHI_INVERSE;

/// Derived condition of the torsion index relative to its floor.
///
/// Never stored: always recomputed from the current value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorsionStatus {
    /// Strictly above the floor.
    Growing,
    /// Held at the floor.
    Critical,
}

impl TorsionStatus {
    /// Classify a value against `PHI_INVERSE`.
    ///
    /// With the shipped constants the engine never leaves the floor, so
    /// `Growing` is only reachable from a starting value above it.
    pub fn of(value: f64) -> Self {
        if value > PHI_INVERSE {
            TorsionStatus::Growing
        } else {
            TorsionStatus::Critical
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TorsionStatus::Growing => "TORSION GROWING (Exponential)",
            TorsionStatus::Critical => "TORSION CRITICAL (Stable)",
        }
    }
}

impl fmt::Display for TorsionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
