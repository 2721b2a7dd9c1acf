use std::time::Duration;

/// Inverse golden ratio: 1 / φ. Floor of the torsion index.
pub const PHI_INVERSE: f64 = 0.618_033_988_749_894_8;

/// Total decoherence rate (environmental + internal).
pub const GAMMA_TOTAL: f64 = 0.01;

/// Positive over-injection term. Shifts `NET_RATE` by a single ulp.
pub const INJECTION_EPSILON: f64 = 1.0e-18;

/// Net exponential rate `k` in `dI/dt = I * k`.
pub const NET_RATE: f64 = -GAMMA_TOTAL + INJECTION_EPSILON;

/// Delay between the end of one tick and the start of the next (~60 Hz).
pub const TICK_INTERVAL: Duration = Duration::from_millis(16);

/// Simulated seconds fed to each tick in fixed-delta mode.
pub const FIXED_DELTA_SECONDS: f64 = 0.016;
