//! Tick scheduling and host lifecycle for the chronos torsion engine.
//!
//! [`TickScheduler`] drives a [`chronos_core::TorsionEngine`] at a fixed
//! cadence on a tokio runtime. [`ModulatorService`] is the host side: it
//! implements [`Lifecycle`] and keeps the process visible to a supervisor
//! through an advisory pidfile while ticking is active.

pub mod error;
pub mod lifecycle;
pub mod pidfile;
pub mod scheduler;

pub use error::{Result, ServiceError};
pub use lifecycle::{Lifecycle, ModulatorService};
pub use pidfile::{PIDFILE_NAME, default_data_dir};
pub use scheduler::{DeltaMode, RECORD_BUFFER, TickScheduler};
