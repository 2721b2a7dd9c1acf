//! Chronos torsion engine.
//!
//! Advances a single scalar, the torsion index, with the closed-form
//! solution of `dI/dt = I * k` over each step and clamps it to the
//! golden-ratio floor `1/φ`.
//!
//! Zero I/O: a pure math engine with no opinions about scheduling or hosting.

pub mod constants;
pub mod engine;
pub mod error;
pub mod record;
pub mod status;
pub mod time;

pub use constants::{
    FIXED_DELTA_SECONDS, GAMMA_TOTAL, INJECTION_EPSILON, NET_RATE, PHI_INVERSE, TICK_INTERVAL,
};
pub use engine::TorsionEngine;
pub use error::{EngineError, Result};
pub use record::TickRecord;
pub use status::TorsionStatus;
pub use time::{now_iso8601_millis, now_unix_millis};
