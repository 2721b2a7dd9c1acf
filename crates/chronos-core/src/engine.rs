use crate::constants::{NET_RATE, PHI_INVERSE};
use crate::error::{EngineError, Result};
use crate::status::TorsionStatus;

/// The torsion index and its update rule.
///
/// Each step applies the exact solution of `dI/dt = I * NET_RATE` over
/// `delta_time`, then clamps the result up to `PHI_INVERSE`. Because the
/// solution is closed-form the step is stable for any positive step size.
///
/// Invariant: `value() >= PHI_INVERSE` at all times.
#[derive(Clone, Debug, PartialEq)]
pub struct TorsionEngine {
    value: f64,
}

impl TorsionEngine {
    /// Start at the critical threshold, `value == PHI_INVERSE`.
    pub fn new() -> Self {
        Self { value: PHI_INVERSE }
    }

    /// Start from an explicit value. Rejects non-finite values and values
    /// below the floor.
    pub fn with_value(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(EngineError::InvalidArgument(format!(
                "starting value must be finite, got {value}"
            )));
        }
        if value < PHI_INVERSE {
            return Err(EngineError::InvalidArgument(format!(
                "starting value {value} is below the floor {PHI_INVERSE}"
            )));
        }
        Ok(Self { value })
    }

    /// Advance by `delta_time` simulated seconds.
    ///
    /// `delta_time` must be finite and strictly positive; otherwise the
    /// engine is left untouched.
    pub fn update(&mut self, delta_time: f64) -> Result<()> {
        if !delta_time.is_finite() || delta_time <= 0.0 {
            return Err(EngineError::InvalidArgument(format!(
                "delta_time must be a positive finite number, got {delta_time}"
            )));
        }

        self.value *= (NET_RATE * delta_time).exp();
        if self.value < PHI_INVERSE {
            self.value = PHI_INVERSE;
        }
        Ok(())
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn status(&self) -> TorsionStatus {
        TorsionStatus::of(self.value)
    }
}

impl Default for TorsionEngine {
    fn default() -> Self {
        Self::new()
    }
}
