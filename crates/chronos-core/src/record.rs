use serde::{Deserialize, Serialize};

use crate::status::TorsionStatus;
use crate::time::now_iso8601_millis;

/// Observability record produced after each tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TickRecord {
    /// 1-based tick counter since the scheduler was created.
    pub tick: u64,
    pub timestamp: String,
    pub value: f64,
    pub status: TorsionStatus,
}

impl TickRecord {
    /// Stamp a record with the current wall-clock time.
    pub fn now(tick: u64, value: f64) -> Self {
        Self {
            tick,
            timestamp: now_iso8601_millis(),
            value,
            status: TorsionStatus::of(value),
        }
    }

    /// Single-line JSON, suitable for newline-delimited output.
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
