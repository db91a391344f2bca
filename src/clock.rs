//! Repeating tick scheduler driving simulated vehicle movement.
//!
//! Backed by a dedicated thread so the engine works outside any UI event
//! loop. Ticks are delivered one at a time on the scheduler thread with
//! strictly increasing sequence numbers; at most one tick callback is ever
//! in flight for a given clock.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ClockError {
    #[error("invalid clock transition: {0}")]
    Misuse(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Stopped,
    Running,
    Paused,
}

struct ClockControl {
    state: ClockState,
    interval_ms: u64,
}

struct ClockShared {
    control: Mutex<ClockControl>,
    wake: Condvar,
}

/// A repeating timer with pause/resume/stop semantics.
///
/// `start` is only valid from `Stopped`; `pause`/`resume` toggle between
/// `Running` and `Paused`; `stop` is valid from any state and joins the
/// scheduler thread, so no tick is delivered after it returns (a tick
/// already mid-delivery is allowed to complete first). Pausing never loses
/// the tick sequence. Dropping the clock stops it.
pub struct ProgressClock {
    shared: Arc<ClockShared>,
    handle: Option<JoinHandle<()>>,
}

impl ProgressClock {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(ClockShared {
                control: Mutex::new(ClockControl {
                    state: ClockState::Stopped,
                    interval_ms: 1000,
                }),
                wake: Condvar::new(),
            }),
            handle: None,
        }
    }

    /// Starts delivering one tick per interval to `on_tick`.
    pub fn start<F>(&mut self, interval_ms: u64, on_tick: F) -> Result<(), ClockError>
    where
        F: FnMut(u64) + Send + 'static,
    {
        if interval_ms == 0 {
            return Err(ClockError::Misuse("tick interval must be nonzero"));
        }
        {
            let mut control = lock(&self.shared.control);
            if control.state != ClockState::Stopped || self.handle.is_some() {
                return Err(ClockError::Misuse("start is only valid from the stopped state"));
            }
            control.state = ClockState::Running;
            control.interval_ms = interval_ms;
        }

        let shared = Arc::clone(&self.shared);
        self.handle = Some(thread::spawn(move || run(shared, Box::new(on_tick))));
        debug!(interval_ms, "progress clock started");
        Ok(())
    }

    /// Suspends tick delivery without losing the sequence position.
    pub fn pause(&self) -> Result<(), ClockError> {
        let mut control = lock(&self.shared.control);
        if control.state != ClockState::Running {
            return Err(ClockError::Misuse("pause is only valid while running"));
        }
        control.state = ClockState::Paused;
        self.shared.wake.notify_all();
        Ok(())
    }

    pub fn resume(&self) -> Result<(), ClockError> {
        let mut control = lock(&self.shared.control);
        if control.state != ClockState::Paused {
            return Err(ClockError::Misuse("resume is only valid while paused"));
        }
        control.state = ClockState::Running;
        self.shared.wake.notify_all();
        Ok(())
    }

    /// Changes the tick interval, taking effect at the next tick boundary.
    ///
    /// The wait in progress keeps its original deadline, so the change never
    /// causes a double tick or a skipped tick.
    pub fn set_interval_ms(&self, interval_ms: u64) -> Result<(), ClockError> {
        if interval_ms == 0 {
            return Err(ClockError::Misuse("tick interval must be nonzero"));
        }
        let mut control = lock(&self.shared.control);
        if control.state == ClockState::Stopped {
            return Err(ClockError::Misuse("cannot change interval of a stopped clock"));
        }
        control.interval_ms = interval_ms;
        Ok(())
    }

    /// Stops the clock and waits for the scheduler thread to exit.
    ///
    /// Idempotent, valid from any state, and safe to call from a torn-down
    /// view context. Must not be called from inside a tick callback.
    pub fn stop(&mut self) {
        {
            let mut control = lock(&self.shared.control);
            control.state = ClockState::Stopped;
            self.shared.wake.notify_all();
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
            debug!("progress clock stopped");
        }
    }

    pub fn state(&self) -> ClockState {
        lock(&self.shared.control).state
    }
}

impl Default for ProgressClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProgressClock {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(shared: Arc<ClockShared>, mut on_tick: Box<dyn FnMut(u64) + Send>) {
    enum Step {
        Tick,
        Reconsider,
        Exit,
    }

    let mut seq: u64 = 0;
    loop {
        let step = {
            let mut control = lock(&shared.control);
            match control.state {
                ClockState::Stopped => Step::Exit,
                ClockState::Paused => {
                    while control.state == ClockState::Paused {
                        control = shared
                            .wake
                            .wait(control)
                            .unwrap_or_else(PoisonError::into_inner);
                    }
                    Step::Reconsider
                }
                ClockState::Running => {
                    let deadline = Instant::now() + Duration::from_millis(control.interval_ms);
                    loop {
                        if control.state != ClockState::Running {
                            break Step::Reconsider;
                        }
                        let now = Instant::now();
                        if now >= deadline {
                            break Step::Tick;
                        }
                        let (guard, _) = shared
                            .wake
                            .wait_timeout(control, deadline - now)
                            .unwrap_or_else(PoisonError::into_inner);
                        control = guard;
                    }
                }
            }
        };

        match step {
            Step::Exit => break,
            Step::Reconsider => {}
            Step::Tick => {
                // Delivered outside the control lock so pause/stop never
                // block on a callback.
                on_tick(seq);
                seq += 1;
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
