use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chronos_core::{FIXED_DELTA_SECONDS, PHI_INVERSE, TickRecord, TorsionEngine};
use chronos_service::{DeltaMode, Lifecycle, ModulatorService, TickScheduler, pidfile};
use clap::{Parser, Subcommand};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "chronos", about = "Chronos torsion modulator")]
struct Cli {
    /// Enable verbose debug output (one log line per tick)
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the tick loop until interrupted
    Run {
        /// Stop on its own after this many milliseconds
        #[arg(long)]
        duration_ms: Option<u64>,

        /// Write each tick record to stdout as a JSON line
        #[arg(long)]
        emit: bool,

        /// Feed measured elapsed time to each tick instead of the fixed 16 ms
        #[arg(long)]
        measured_delta: bool,
    },

    /// Apply fixed-delta ticks offline and print the result
    Simulate {
        /// Number of ticks to apply
        #[arg(long, default_value_t = 1000)]
        ticks: u64,

        /// Print a JSON object instead of text
        #[arg(long)]
        json: bool,
    },

    /// Report whether a `chronos run` process is alive
    Status,
}

fn data_dir() -> PathBuf {
    std::env::var("CHRONOS_DATA_DIR")
        .ok()
        .map(PathBuf::from)
        .unwrap_or_else(chronos_service::default_data_dir)
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Run {
            duration_ms,
            emit,
            measured_delta,
        } => {
            let delta_mode = if *measured_delta {
                DeltaMode::Measured
            } else {
                DeltaMode::Fixed
            };
            cmd_run(duration_ms.map(Duration::from_millis), *emit, delta_mode).await
        }
        Commands::Simulate { ticks, json } => cmd_simulate(*ticks, *json),
        Commands::Status => cmd_status(),
    }
}

async fn cmd_run(duration: Option<Duration>, emit: bool, delta_mode: DeltaMode) -> Result<()> {
    let mut scheduler = TickScheduler::on_current_runtime(TorsionEngine::new())
        .context("failed to set up tick scheduler")?
        .with_delta_mode(delta_mode);
    let printer = emit.then(|| tokio::spawn(print_records(scheduler.subscribe())));

    let signals = ShutdownSignals::register();
    let mut service = ModulatorService::new(scheduler).with_data_dir(data_dir());
    service
        .on_start()
        .context("failed to start chronos modulator")?;

    signals.wait(duration).await;
    service.on_stop();

    let ticks = service.scheduler().ticks();
    let value = service.scheduler().value();
    let status = service.scheduler().status();
    // Releases the last record sender so the printer sees end of stream.
    drop(service);

    if let Some(printer) = printer {
        printer.await.context("record printer failed")?;
        eprintln!("stopped after {ticks} ticks: value={value} status={status}");
    } else {
        println!("ticks:      {ticks}");
        println!("value:      {value}");
        println!("status:     {status}");
    }
    Ok(())
}

async fn print_records(mut rx: mpsc::Receiver<TickRecord>) {
    let mut stdout = tokio::io::stdout();
    while let Some(record) = rx.recv().await {
        let mut line = match record.to_json_line() {
            Ok(line) => line,
            Err(e) => {
                tracing::error!("failed to serialize tick record: {e}");
                continue;
            }
        };
        line.push('\n');
        if let Err(e) = stdout.write_all(line.as_bytes()).await {
            tracing::warn!("stopped emitting tick records: {e}");
            return;
        }
    }
    if let Err(e) = stdout.flush().await {
        tracing::warn!("failed to flush tick records: {e}");
    }
}

/// Termination sources, registered before the service advertises itself so
/// a signal sent right after the pidfile appears is never missed.
struct ShutdownSignals {
    #[cfg(unix)]
    sigterm: Option<tokio::signal::unix::Signal>,
    #[cfg(unix)]
    sigint: Option<tokio::signal::unix::Signal>,
}

impl ShutdownSignals {
    #[cfg(unix)]
    fn register() -> Self {
        use tokio::signal::unix::{SignalKind, signal};

        let listen = |kind: SignalKind, name: &str| match signal(kind) {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::warn!("failed to listen for {name}: {e}");
                None
            }
        };
        Self {
            sigterm: listen(SignalKind::terminate(), "SIGTERM"),
            sigint: listen(SignalKind::interrupt(), "SIGINT"),
        }
    }

    #[cfg(not(unix))]
    fn register() -> Self {
        Self {}
    }

    /// Resolve on the first of SIGTERM, Ctrl-C, or the optional deadline.
    #[cfg(unix)]
    async fn wait(mut self, duration: Option<Duration>) {
        tokio::select! {
            _ = recv_or_pending(&mut self.sigterm) => tracing::info!("received SIGTERM, shutting down"),
            _ = recv_or_pending(&mut self.sigint) => tracing::info!("received Ctrl-C, shutting down"),
            () = run_deadline(duration) => tracing::info!("run duration elapsed, shutting down"),
        }
    }

    #[cfg(not(unix))]
    async fn wait(self, duration: Option<Duration>) {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("failed to listen for Ctrl-C: {e}");
                std::future::pending::<()>().await;
            }
        };
        tokio::select! {
            () = ctrl_c => tracing::info!("received Ctrl-C, shutting down"),
            () = run_deadline(duration) => tracing::info!("run duration elapsed, shutting down"),
        }
    }
}

async fn run_deadline(duration: Option<Duration>) {
    match duration {
        Some(d) => tokio::time::sleep(d).await,
        None => std::future::pending().await,
    }
}

#[cfg(unix)]
async fn recv_or_pending(signal: &mut Option<tokio::signal::unix::Signal>) -> Option<()> {
    match signal {
        Some(s) => s.recv().await,
        None => std::future::pending().await,
    }
}

fn cmd_simulate(ticks: u64, json: bool) -> Result<()> {
    let mut engine = TorsionEngine::new();
    for _ in 0..ticks {
        engine
            .update(FIXED_DELTA_SECONDS)
            .context("torsion update rejected")?;
    }

    if json {
        let out = serde_json::json!({
            "ticks": ticks,
            "delta_seconds": FIXED_DELTA_SECONDS,
            "value": engine.value(),
            "floor": PHI_INVERSE,
            "status": engine.status(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&out).context("failed to serialize result")?
        );
    } else {
        println!("ticks:      {ticks}");
        println!("value:      {}", engine.value());
        println!("floor:      {PHI_INVERSE}");
        println!("status:     {}", engine.status());
    }
    Ok(())
}

fn cmd_status() -> Result<()> {
    let dir = data_dir();
    match pidfile::read_pid(&dir) {
        Some(pid) if pidfile::is_process_alive(pid) => {
            println!("running (PID {pid})");
        }
        Some(pid) => {
            println!("not running (stale pidfile for PID {pid})");
        }
        None => println!("not running"),
    }
    Ok(())
}
