//! Integration tests for graceful shutdown of `chronos run`.
//! Verifies that signals cause a clean exit and the pidfile is cleaned up.

use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn chronos_binary() -> std::path::PathBuf {
    assert_cmd::cargo::cargo_bin!("chronos").into()
}

fn spawn_run(data_dir: &TempDir) -> std::process::Child {
    Command::new(chronos_binary())
        .arg("run")
        .env("CHRONOS_DATA_DIR", data_dir.path())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn chronos run")
}

/// Wait for the pidfile to appear, indicating the tick loop has started.
fn wait_for_pidfile(data_dir: &TempDir) {
    let pidfile = data_dir.path().join("chronos.pid");
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if pidfile.exists() {
            return;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

#[cfg(unix)]
fn send_signal(child: &std::process::Child, signal: libc::c_int) {
    unsafe {
        libc::kill(child.id() as libc::pid_t, signal);
    }
}

#[cfg(unix)]
#[test]
fn run_exits_on_sigterm() {
    let dir = TempDir::new().unwrap();
    let mut child = spawn_run(&dir);
    wait_for_pidfile(&dir);
    std::thread::sleep(Duration::from_millis(100));

    send_signal(&child, libc::SIGTERM);

    let start = Instant::now();
    let status = child.wait().expect("wait");
    let elapsed = start.elapsed();

    assert!(status.success(), "SIGTERM should exit 0, got {status}");
    assert!(elapsed < Duration::from_secs(2), "took {elapsed:?}");
}

#[cfg(unix)]
#[test]
fn run_exits_on_sigint() {
    let dir = TempDir::new().unwrap();
    let child = spawn_run(&dir);
    wait_for_pidfile(&dir);

    send_signal(&child, libc::SIGINT);

    let output = child.wait_with_output().expect("wait");
    assert!(output.status.success(), "SIGINT should exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("status:     TORSION CRITICAL (Stable)"),
        "stdout: {stdout}"
    );
}

#[cfg(unix)]
#[test]
fn pidfile_created_and_removed_on_exit() {
    let dir = TempDir::new().unwrap();
    let pidfile = dir.path().join("chronos.pid");

    let child = spawn_run(&dir);
    wait_for_pidfile(&dir);

    assert!(pidfile.exists(), "pidfile should exist while running");
    let content = std::fs::read_to_string(&pidfile).unwrap();
    let file_pid: u32 = content
        .trim()
        .parse()
        .expect("pidfile should contain a PID");
    assert_eq!(file_pid, child.id(), "pidfile PID should match child PID");

    send_signal(&child, libc::SIGTERM);
    child.wait_with_output().expect("wait");

    assert!(
        !pidfile.exists(),
        "pidfile should be removed after clean shutdown"
    );
}

#[cfg(unix)]
#[test]
fn status_reports_running_process() {
    let dir = TempDir::new().unwrap();
    let child = spawn_run(&dir);
    wait_for_pidfile(&dir);

    let output = Command::new(chronos_binary())
        .arg("status")
        .env("CHRONOS_DATA_DIR", dir.path())
        .output()
        .expect("status should run");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains(&format!("running (PID {})", child.id())),
        "stdout: {stdout}"
    );

    send_signal(&child, libc::SIGTERM);
    child.wait_with_output().expect("wait");
}

#[test]
fn stale_pidfile_is_replaced() {
    let dir = TempDir::new().unwrap();
    let pidfile = dir.path().join("chronos.pid");
    std::fs::write(&pidfile, "999999999").unwrap();

    let output = Command::new(chronos_binary())
        .args(["run", "--duration-ms", "100", "--verbose"])
        .env("CHRONOS_DATA_DIR", dir.path())
        .output()
        .expect("run should complete");

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("cleaned up stale pidfile (PID 999999999 is dead)"),
        "stderr: {stderr}"
    );
    assert!(!pidfile.exists());
}
