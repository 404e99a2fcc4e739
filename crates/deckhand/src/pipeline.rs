use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Returned by `start` when a run is already in flight
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
  #[error("a run is already in progress")]
  Busy,
}

/// How a run ended. Exactly one of these reaches the completion callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
  Completed,
  Cancelled,
  Failed,
}

/// Progress callback: whole percentages in [0, 100], delivered from the worker
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

const IDLE: u8 = 0;
const RUNNING: u8 = 1;

/// At-most-one-in-flight gate plus the cooperative cancel flag, shared
/// between the control side and the background worker.
pub struct SingleFlight {
  state: AtomicU8,
  cancelled: AtomicBool,
}

impl SingleFlight {
  pub fn new() -> Self {
    Self { state: AtomicU8::new(IDLE), cancelled: AtomicBool::new(false) }
  }

  /// Atomically move Idle -> Running so two starts cannot race into a run.
  /// Clears any cancel request left over from the previous run.
  pub fn begin(&self) -> Result<(), PipelineError> {
    self
      .state
      .compare_exchange(IDLE, RUNNING, Ordering::SeqCst, Ordering::SeqCst)
      .map_err(|_| PipelineError::Busy)?;
    self.cancelled.store(false, Ordering::SeqCst);
    Ok(())
  }

  /// Reopen the gate; the worker calls this after the terminal callback
  pub fn finish(&self) {
    self.state.store(IDLE, Ordering::SeqCst);
  }

  pub fn is_running(&self) -> bool {
    self.state.load(Ordering::SeqCst) == RUNNING
  }

  /// Request cooperative cancellation, observed at stage and entry boundaries
  pub fn cancel(&self) {
    self.cancelled.store(true, Ordering::SeqCst);
  }

  pub fn is_cancelled(&self) -> bool {
    self.cancelled.load(Ordering::SeqCst)
  }
}

impl Default for SingleFlight {
  fn default() -> Self {
    Self::new()
  }
}

/// Wraps the caller's progress callback, clamping to [0, 100] and dropping
/// decreases so delivered values never move backwards within one run.
pub struct ProgressReporter {
  callback: ProgressFn,
  last: AtomicU8,
}

impl ProgressReporter {
  pub fn new(callback: ProgressFn) -> Self {
    Self { callback, last: AtomicU8::new(0) }
  }

  pub fn report(&self, percent: u8) {
    let percent = percent.min(100);
    let previous = self.last.fetch_max(percent, Ordering::SeqCst);
    if percent >= previous {
      (self.callback)(percent);
    }
  }
}

/// Run `work` on a background task under the single-flight gate.
///
/// The future resolves to an outcome plus whatever the run accumulated;
/// `on_complete` receives both, exactly once, as the last event of the run,
/// and only then does the gate reopen. Callers get `Busy` back instead of a
/// second concurrent run.
pub fn spawn_run<T, F>(
  gate: Arc<SingleFlight>,
  work: F,
  on_complete: Box<dyn FnOnce(RunOutcome, T) + Send>,
) -> Result<(), PipelineError>
where
  T: Send + 'static,
  F: Future<Output = (RunOutcome, T)> + Send + 'static,
{
  gate.begin()?;

  tokio::spawn(async move {
    let (outcome, payload) = work.await;
    on_complete(outcome, payload);
    gate.finish();
  });

  Ok(())
}
