//! Route tracking controller.
//!
//! Owns one [`RouteInstance`] and wires the clock, interpolator, estimator,
//! and notifier together behind a command interface, decoupling tracking
//! state from any particular rendering framework. Consumers subscribe to
//! position samples, state snapshots, and notifications.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{debug, warn};

use crate::clock::{ClockError, ClockState, ProgressClock};
use crate::eta::{EtaEstimator, EtaOptions};
use crate::geometry::RouteGeometry;
use crate::interpolate::{self, ProgressSample};
use crate::notify::{NotificationEvent, Notifier, NotifierOptions};
use crate::route::{RouteInstance, RouteStatus, StateError, Stop};

/// Who advances the stop cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveMode {
    /// Stops advance only through explicit driver commands.
    Driver,
    /// Stops auto-arrive as the simulated vehicle passes their milestones.
    Simulation,
}

#[derive(Debug, Clone)]
pub struct TrackerOptions {
    pub mode: DriveMode,
    pub tick_interval_ms: u64,
    pub eta: EtaOptions,
    pub notifier: NotifierOptions,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            mode: DriveMode::Simulation,
            tick_interval_ms: 1000,
            eta: EtaOptions::default(),
            notifier: NotifierOptions::default(),
        }
    }
}

type PositionObserver = Arc<dyn Fn(&ProgressSample) + Send + Sync>;
type SnapshotObserver = Arc<dyn Fn(&RouteInstance) + Send + Sync>;
type NotificationObserver = Arc<dyn Fn(&NotificationEvent) + Send + Sync>;

#[derive(Default)]
struct Observers {
    position: Mutex<Vec<PositionObserver>>,
    snapshot: Mutex<Vec<SnapshotObserver>>,
    notification: Mutex<Vec<NotificationObserver>>,
}

struct TrackerCore {
    instance: RouteInstance,
    estimator: EtaEstimator,
    notifier: Notifier,
    mode: DriveMode,
    /// Geometry index at which stop `i` counts as reached (simulation mode).
    milestones: Vec<usize>,
}

/// Controls one tracking session.
///
/// Each controller is the single logical owner of its instance; ticks arrive
/// on the scheduler thread and hold only a weak reference, so a controller
/// that has been torn down is never revived by a late tick.
pub struct RouteController {
    clock: ProgressClock,
    core: Arc<Mutex<TrackerCore>>,
    observers: Arc<Observers>,
    tick_interval_ms: u64,
}

impl RouteController {
    /// Builds a controller for an already-resolved geometry.
    ///
    /// Callers must resolve geometry first (see [`ResolutionGate`]); the
    /// clock must never run against a route without one.
    pub fn new(
        route_id: impl Into<String>,
        geometry: RouteGeometry,
        stops: Vec<Stop>,
        options: TrackerOptions,
    ) -> Self {
        let milestones = stop_milestones(geometry.points().len(), stops.len());
        let instance = RouteInstance::new(route_id, geometry, stops);
        let core = TrackerCore {
            instance,
            estimator: EtaEstimator::new(options.eta),
            notifier: Notifier::new(options.notifier),
            mode: options.mode,
            milestones,
        };
        Self {
            clock: ProgressClock::new(),
            core: Arc::new(Mutex::new(core)),
            observers: Arc::new(Observers::default()),
            tick_interval_ms: options.tick_interval_ms,
        }
    }

    pub fn observe_position(&self, observer: impl Fn(&ProgressSample) + Send + Sync + 'static) {
        lock(&self.observers.position).push(Arc::new(observer));
    }

    pub fn observe_snapshot(&self, observer: impl Fn(&RouteInstance) + Send + Sync + 'static) {
        lock(&self.observers.snapshot).push(Arc::new(observer));
    }

    pub fn observe_notifications(
        &self,
        observer: impl Fn(&NotificationEvent) + Send + Sync + 'static,
    ) {
        lock(&self.observers.notification).push(Arc::new(observer));
    }

    /// Starts the clock; every tick advances the simulated position.
    pub fn start(&mut self) -> Result<(), ClockError> {
        let core = Arc::downgrade(&self.core);
        let observers = Arc::clone(&self.observers);
        self.clock.start(self.tick_interval_ms, move |seq| {
            let Some(core) = core.upgrade() else {
                return;
            };
            on_tick(&core, &observers, seq);
        })
    }

    pub fn set_tick_interval_ms(&self, interval_ms: u64) -> Result<(), ClockError> {
        self.clock.set_interval_ms(interval_ms)
    }

    pub fn mark_arrived(&self, stop_index: usize) -> Result<(), StateError> {
        self.apply(|core| core.instance.mark_arrived(stop_index))
    }

    pub fn skip_to_stop(&self, stop_index: usize) -> Result<(), StateError> {
        self.apply(|core| core.instance.skip_to_stop(stop_index))
    }

    /// Forces completion (driver override).
    pub fn complete(&self) -> Result<(), StateError> {
        self.apply(|core| core.instance.complete())
    }

    /// Pauses the route and the clock together.
    pub fn pause(&self) -> Result<(), StateError> {
        {
            let mut guard = lock(&self.core);
            guard.instance.pause()?;
        }
        if self.clock.state() == ClockState::Running {
            if let Err(err) = self.clock.pause() {
                debug!(%err, "clock pause skipped");
            }
        }
        self.dispatch_snapshot();
        Ok(())
    }

    pub fn resume(&self) -> Result<(), StateError> {
        {
            let mut guard = lock(&self.core);
            guard.instance.resume()?;
        }
        if self.clock.state() == ClockState::Paused {
            if let Err(err) = self.clock.resume() {
                debug!(%err, "clock resume skipped");
            }
        }
        self.dispatch_snapshot();
        Ok(())
    }

    /// Stops the clock. Safe to call repeatedly and from a torn-down view
    /// context; must not be called from inside an observer callback.
    pub fn stop(&mut self) {
        self.clock.stop();
    }

    /// Read-only copy of the current instance state.
    pub fn snapshot(&self) -> RouteInstance {
        lock(&self.core).instance.clone()
    }

    /// Publishes a free-form announcement to notification observers.
    pub fn announce(&self, message: impl Into<String>) {
        let event = lock(&self.core).notifier.custom(message);
        dispatch_notifications(&self.observers, &[event]);
    }

    fn apply(
        &self,
        op: impl FnOnce(&mut TrackerCore) -> Result<crate::route::Transition, StateError>,
    ) -> Result<(), StateError> {
        let (events, snapshot) = {
            let mut guard = lock(&self.core);
            let core = &mut *guard;
            let transition = op(core)?;
            let events = core.notifier.on_transition(core.instance.stops(), &transition);
            (events, core.instance.clone())
        };
        dispatch_snapshot_value(&self.observers, &snapshot);
        dispatch_notifications(&self.observers, &events);
        Ok(())
    }

    fn dispatch_snapshot(&self) {
        let snapshot = self.snapshot();
        dispatch_snapshot_value(&self.observers, &snapshot);
    }
}

fn on_tick(core: &Arc<Mutex<TrackerCore>>, observers: &Observers, seq: u64) {
    let mut events: Vec<NotificationEvent> = Vec::new();
    let mut snapshot: Option<RouteInstance> = None;

    let sample = {
        let mut guard = lock(core);
        let core = &mut *guard;
        if core.instance.status() != RouteStatus::Active {
            return;
        }

        let tick_index = core.instance.advance_tick();
        let sample = interpolate::advance(core.instance.geometry(), tick_index);

        let elapsed = (Utc::now() - core.instance.started_at())
            .num_seconds()
            .max(0) as u32;
        let eta = core.estimator.estimate(
            sample.progress_percent,
            elapsed,
            core.instance.remaining_stops() as u32,
        );
        events.extend(core.notifier.on_eta(eta));

        if core.mode == DriveMode::Simulation {
            loop {
                let current = core.instance.current_stop_index();
                if current >= core.milestones.len() || tick_index < core.milestones[current] {
                    break;
                }
                match core.instance.mark_arrived(current) {
                    Ok(transition) => {
                        events.extend(
                            core.notifier
                                .on_transition(core.instance.stops(), &transition),
                        );
                        snapshot = Some(core.instance.clone());
                        if transition.completion.is_some() {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!(seq, %err, "simulated arrival rejected");
                        break;
                    }
                }
            }
        }

        sample
    };

    dispatch_position(observers, &sample);
    if let Some(snapshot) = snapshot {
        dispatch_snapshot_value(observers, &snapshot);
    }
    dispatch_notifications(observers, &events);
}

fn dispatch_position(observers: &Observers, sample: &ProgressSample) {
    let position = lock(&observers.position).clone();
    for observer in &position {
        observer(sample);
    }
}

fn dispatch_snapshot_value(observers: &Observers, snapshot: &RouteInstance) {
    let subscribers = lock(&observers.snapshot).clone();
    for observer in &subscribers {
        observer(snapshot);
    }
}

fn dispatch_notifications(observers: &Observers, events: &[NotificationEvent]) {
    if events.is_empty() {
        return;
    }
    let subscribers = lock(&observers.notification).clone();
    for event in events {
        for observer in &subscribers {
            observer(event);
        }
    }
}

/// Geometry index at which each stop counts as reached: stops are spread
/// evenly across the path, with the last stop pinned to the final point.
fn stop_milestones(point_count: usize, stop_count: usize) -> Vec<usize> {
    if stop_count == 0 {
        return Vec::new();
    }
    let last = point_count.saturating_sub(1);
    (0..stop_count)
        .map(|i| {
            let fraction = (i as f64 + 1.0) / stop_count as f64;
            (fraction * last as f64).round() as usize
        })
        .collect()
}

/// Tracks which geometry resolution the active view still wants.
///
/// Resolution blocks on network I/O on a caller thread; if the user
/// navigates away before it finishes, the result must be discarded rather
/// than acted upon. `begin` invalidates every earlier token.
#[derive(Debug, Default)]
pub struct ResolutionGate {
    generation: AtomicU64,
}

impl ResolutionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new resolution attempt and returns its token.
    pub fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether a finished resolution may still be applied.
    pub fn is_current(&self, token: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == token
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
