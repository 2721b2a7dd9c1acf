use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chronos_core::{FIXED_DELTA_SECONDS, TICK_INTERVAL, TickRecord, TorsionEngine, TorsionStatus};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, ServiceError};

/// Tick records a subscriber may fall behind by before new ones are dropped.
pub const RECORD_BUFFER: usize = 256;

/// What each tick feeds to [`TorsionEngine::update`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeltaMode {
    /// Always `FIXED_DELTA_SECONDS`, whatever the real elapsed time.
    /// Simulated time drifts from wall-clock time under jitter or suspension.
    #[default]
    Fixed,
    /// Time actually elapsed since the previous tick.
    Measured,
}

impl DeltaMode {
    fn delta(self, elapsed: std::time::Duration) -> f64 {
        match self {
            DeltaMode::Fixed => FIXED_DELTA_SECONDS,
            DeltaMode::Measured => elapsed.as_secs_f64(),
        }
    }
}

struct Running {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Drives one engine at `TICK_INTERVAL` on a tokio runtime.
///
/// The next tick is scheduled only after the previous one finishes, so the
/// real period is `TICK_INTERVAL` plus the tick body. The engine is written
/// only by the tick task; reads through [`value`](Self::value) and
/// [`status`](Self::status) are fine from anywhere.
pub struct TickScheduler {
    runtime: Handle,
    delta_mode: DeltaMode,
    engine: Arc<Mutex<TorsionEngine>>,
    ticks: Arc<AtomicU64>,
    records: Option<mpsc::Sender<TickRecord>>,
    running: Option<Running>,
}

impl TickScheduler {
    pub fn new(engine: TorsionEngine, runtime: Handle) -> Self {
        Self {
            runtime,
            delta_mode: DeltaMode::default(),
            engine: Arc::new(Mutex::new(engine)),
            ticks: Arc::new(AtomicU64::new(0)),
            records: None,
            running: None,
        }
    }

    /// Schedule on the runtime the caller is executing in.
    pub fn on_current_runtime(engine: TorsionEngine) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| ServiceError::Unavailable(format!("no tokio runtime: {e}")))?;
        Ok(Self::new(engine, runtime))
    }

    pub fn with_delta_mode(mut self, delta_mode: DeltaMode) -> Self {
        self.delta_mode = delta_mode;
        self
    }

    /// Receive a [`TickRecord`] per tick. Replaces any earlier subscriber and
    /// takes effect from the next [`start`](Self::start).
    ///
    /// Holds at most `RECORD_BUFFER` unread records; ticks never wait on a
    /// slow subscriber, their records are dropped instead.
    pub fn subscribe(&mut self) -> mpsc::Receiver<TickRecord> {
        let (tx, rx) = mpsc::channel(RECORD_BUFFER);
        self.records = Some(tx);
        rx
    }

    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Err(ServiceError::IllegalState(
                "tick scheduler is already running".to_string(),
            ));
        }

        let cancel = CancellationToken::new();
        let tick_loop = TickLoop {
            engine: Arc::clone(&self.engine),
            ticks: Arc::clone(&self.ticks),
            records: self.records.clone(),
            dropped: 0,
            delta_mode: self.delta_mode,
            cancel: cancel.clone(),
        };
        let task = self.runtime.spawn(tick_loop.run());
        self.running = Some(Running { cancel, task });

        tracing::debug!(
            interval_ms = TICK_INTERVAL.as_millis() as u64,
            delta_mode = ?self.delta_mode,
            "tick scheduler started"
        );
        Ok(())
    }

    /// Stop ticking. Idempotent.
    ///
    /// Once this returns the engine will not be updated again: an update that
    /// is already in progress finishes, and nothing after it runs.
    pub fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        running.cancel.cancel();
        // The tick task re-checks the token while holding this lock.
        drop(lock(&self.engine));
        drop(running.task);

        tracing::debug!(ticks = self.ticks(), "tick scheduler stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.task.is_finished())
    }

    pub fn value(&self) -> f64 {
        lock(&self.engine).value()
    }

    pub fn status(&self) -> TorsionStatus {
        lock(&self.engine).status()
    }

    /// Completed ticks since construction.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    pub fn delta_mode(&self) -> DeltaMode {
        self.delta_mode
    }
}

impl Drop for TickScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock(engine: &Mutex<TorsionEngine>) -> MutexGuard<'_, TorsionEngine> {
    engine.lock().unwrap_or_else(PoisonError::into_inner)
}

struct TickLoop {
    engine: Arc<Mutex<TorsionEngine>>,
    ticks: Arc<AtomicU64>,
    records: Option<mpsc::Sender<TickRecord>>,
    dropped: u64,
    delta_mode: DeltaMode,
    cancel: CancellationToken,
}

impl TickLoop {
    async fn run(mut self) {
        let mut last = Instant::now();
        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                () = tokio::time::sleep(TICK_INTERVAL) => {}
            }

            let now = Instant::now();
            let delta = self.delta_mode.delta(now.duration_since(last));
            last = now;

            let mut engine = lock(&self.engine);
            if self.cancel.is_cancelled() {
                break;
            }
            if let Err(e) = engine.update(delta) {
                tracing::warn!("skipping tick: {e}");
                continue;
            }

            let tick = self.ticks.fetch_add(1, Ordering::AcqRel) + 1;
            let record = TickRecord::now(tick, engine.value());
            tracing::debug!(
                tick,
                timestamp = %record.timestamp,
                value = record.value,
                "torsion index updated"
            );
            if let Some(tx) = &self.records {
                match tx.try_send(record) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        self.dropped += 1;
                        if self.dropped == 1 {
                            tracing::warn!("tick record subscriber is lagging, dropping records");
                        }
                    }
                    // A dropped receiver only means nobody is watching.
                    Err(mpsc::error::TrySendError::Closed(_)) => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronos_core::PHI_INVERSE;
    use std::time::Duration;

    fn scheduler() -> TickScheduler {
        TickScheduler::on_current_runtime(TorsionEngine::new()).unwrap()
    }

    #[test]
    fn test_unavailable_outside_runtime() {
        let err = TickScheduler::on_current_runtime(TorsionEngine::new())
            .err()
            .expect("no runtime should be an error");
        assert!(matches!(err, ServiceError::Unavailable(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_at_interval() {
        let mut sched = scheduler();
        sched.start().unwrap();
        assert!(sched.is_running());

        tokio::time::sleep(Duration::from_millis(100)).await;
        let ticks = sched.ticks();
        assert!((5..=6).contains(&ticks), "expected ~6 ticks, got {ticks}");
        assert_eq!(sched.value(), PHI_INVERSE);
        assert_eq!(sched.status(), TorsionStatus::Critical);

        sched.stop();
        assert!(!sched.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_while_running_is_illegal() {
        let mut sched = scheduler();
        sched.start().unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;

        let ticks_before = sched.ticks();
        let value_before = sched.value();
        let err = sched.start().unwrap_err();
        assert!(matches!(err, ServiceError::IllegalState(_)));
        assert!(sched.is_running());
        assert_eq!(sched.ticks(), ticks_before);
        assert_eq!(sched.value(), value_before);
        sched.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent() {
        let mut sched = scheduler();
        sched.stop();
        assert!(!sched.is_running());

        sched.start().unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        sched.stop();
        let ticks = sched.ticks();
        sched.stop();
        assert!(!sched.is_running());
        assert_eq!(sched.ticks(), ticks);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(sched.ticks(), ticks, "no ticks after stop");
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_stop() {
        let mut sched = scheduler();
        sched.start().unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        sched.stop();
        let first_run = sched.ticks();
        assert!(first_run >= 1);

        sched.start().unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        sched.stop();
        assert!(sched.ticks() > first_run);
    }

    #[test]
    fn test_delta_mode() {
        let elapsed = Duration::from_millis(40);
        assert_eq!(DeltaMode::Fixed.delta(elapsed), FIXED_DELTA_SECONDS);
        assert_eq!(DeltaMode::Measured.delta(elapsed), 0.04);
        assert_eq!(DeltaMode::default(), DeltaMode::Fixed);
    }
}
