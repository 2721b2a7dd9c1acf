use std::path::{Path, PathBuf};

use chronos_core::TorsionStatus;

use crate::error::Result;
use crate::pidfile;
use crate::scheduler::TickScheduler;

/// Start/stop hooks a host calls around the life of its resident process.
pub trait Lifecycle {
    /// Called once the host is ready. An error here is a startup failure.
    fn on_start(&mut self) -> Result<()>;

    /// Called when the host is going away. Must be safe to call repeatedly.
    fn on_stop(&mut self);
}

/// The Chronos Modulator host: owns a scheduler and keeps the process
/// visible to a supervisor while ticking.
pub struct ModulatorService {
    scheduler: TickScheduler,
    data_dir: Option<PathBuf>,
    pidfile: Option<PathBuf>,
}

impl ModulatorService {
    pub fn new(scheduler: TickScheduler) -> Self {
        tracing::info!(
            value = scheduler.value(),
            "Chronos Modulator initialized, torsion engine operational"
        );
        Self {
            scheduler,
            data_dir: None,
            pidfile: None,
        }
    }

    /// Advertise the running process with a pidfile in `data_dir`.
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(data_dir.into());
        self
    }

    pub fn start_ticking(&mut self) -> Result<()> {
        self.scheduler.start()
    }

    pub fn stop_ticking(&mut self) {
        self.scheduler.stop();
    }

    pub fn scheduler(&self) -> &TickScheduler {
        &self.scheduler
    }

    pub fn pidfile(&self) -> Option<&Path> {
        self.pidfile.as_deref()
    }

    /// One-line status surface, e.g. for a supervisor or a terminal title.
    pub fn status_line(&self) -> String {
        let state = if self.scheduler.is_running() {
            "running"
        } else {
            "idle"
        };
        let status = self.scheduler.status();
        let relation = match status {
            TorsionStatus::Growing => ">",
            TorsionStatus::Critical => "=",
        };
        format!(
            "Chronos Modulator {state}: I_tors {relation} 1/phi ({value:.16}, {status})",
            value = self.scheduler.value()
        )
    }
}

impl Lifecycle for ModulatorService {
    fn on_start(&mut self) -> Result<()> {
        if self.pidfile.is_none()
            && let Some(dir) = &self.data_dir
        {
            self.pidfile = pidfile::acquire(dir);
        }

        if let Err(e) = self.start_ticking() {
            tracing::error!("failed to start tick loop: {e}");
            if !self.scheduler.is_running()
                && let Some(path) = self.pidfile.take()
            {
                pidfile::release(&path);
            }
            return Err(e);
        }

        tracing::info!("{}", self.status_line());
        Ok(())
    }

    fn on_stop(&mut self) {
        let was_running = self.scheduler.is_running();
        self.stop_ticking();
        if let Some(path) = self.pidfile.take() {
            pidfile::release(&path);
        }
        if was_running {
            tracing::info!(
                ticks = self.scheduler.ticks(),
                value = self.scheduler.value(),
                status = %self.scheduler.status(),
                "Chronos Modulator stopped, torsion injection ceased"
            );
        }
    }
}

impl Drop for ModulatorService {
    fn drop(&mut self) {
        self.on_stop();
    }
}
