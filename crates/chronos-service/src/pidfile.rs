//! Advisory pidfile marking a resident `chronos run` process.
//!
//! Purely for observability: a second process is logged, not refused.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::{env, fs};

pub const PIDFILE_NAME: &str = "chronos.pid";

/// `~/.chronos`, falling back to the working directory without a home.
pub fn default_data_dir() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".chronos")
}

pub fn pidfile_path(data_dir: &Path) -> PathBuf {
    data_dir.join(PIDFILE_NAME)
}

/// PID recorded in the pidfile, if the file exists and holds a nonzero PID.
pub fn read_pid(data_dir: &Path) -> Option<u32> {
    fs::read_to_string(pidfile_path(data_dir))
        .ok()
        .and_then(|content| content.trim().parse().ok())
        .filter(|&pid| pid != 0)
}

/// Check for an existing pidfile and log accordingly, then write our own.
pub fn acquire(data_dir: &Path) -> Option<PathBuf> {
    let path = pidfile_path(data_dir);
    if let Some(pid) = read_pid(data_dir) {
        if is_process_alive(pid) {
            tracing::warn!("another chronos process (PID {pid}) is already running");
        } else {
            tracing::info!("cleaned up stale pidfile (PID {pid} is dead)");
            let _ = fs::remove_file(&path);
        }
    }

    if let Err(e) = fs::create_dir_all(data_dir) {
        tracing::warn!("failed to create {}: {e}", data_dir.display());
    }
    match fs::File::create(&path) {
        Ok(mut f) => {
            let _ = write!(f, "{}", std::process::id());
            tracing::info!("wrote pidfile: {}", path.display());
            Some(path)
        }
        Err(e) => {
            tracing::warn!("failed to write pidfile: {e}");
            None
        }
    }
}

pub fn release(path: &Path) {
    let _ = fs::remove_file(path);
    tracing::info!("removed pidfile: {}", path.display());
}

#[cfg(unix)]
pub fn is_process_alive(pid: u32) -> bool {
    // 0 and negative values address process groups, not a single process
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    if pid <= 0 {
        return false;
    }
    // kill(pid, 0) checks existence without sending a signal
    unsafe { libc::kill(pid, 0) == 0 }
}

#[cfg(not(unix))]
pub fn is_process_alive(_pid: u32) -> bool {
    false
}
