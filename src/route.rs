//! One in-progress tracking session: ordered stops and their transitions.
//!
//! A [`RouteInstance`] is owned and mutated by exactly one controller; other
//! instances share no state with it, so an error here never corrupts or
//! blocks a different route. Every mutating operation reports what changed
//! as a [`Transition`], which is what the notification layer consumes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::geometry::RouteGeometry;

/// Usage errors in the stop state machine. Fatal to the call, never to the
/// process: the instance stays valid and the caller decides what to do.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("stop index {index} is not actionable (current stop {current} of {len})")]
    InvalidStopIndex {
        index: usize,
        current: usize,
        len: usize,
    },
    #[error("route is already completed")]
    RouteAlreadyCompleted,
    #[error("route is paused")]
    RoutePaused,
}

/// A named, ordered waypoint on a route.
///
/// `completed` is monotonic: once true it never reverts within the lifetime
/// of the instance that owns the stop.
#[derive(Debug, Clone, Serialize)]
pub struct Stop {
    pub id: String,
    pub name: String,
    pub scheduled_time: DateTime<Utc>,
    pub completed: bool,
    pub passenger_count: u32,
}

impl Stop {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        scheduled_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            scheduled_time,
            completed: false,
            passenger_count: 0,
        }
    }

    pub fn with_passengers(mut self, passenger_count: u32) -> Self {
        self.passenger_count = passenger_count;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RouteStatus {
    Active,
    Paused,
    Completed,
}

/// How a route reached `Completed`. The manual override is an explicit
/// escape hatch and stays distinguishable downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CompletionKind {
    AllStopsArrived,
    ManualOverride,
}

/// What one state-machine operation changed.
#[derive(Debug, Clone)]
pub struct Transition {
    /// Stop the vehicle arrived at, when the operation logged an arrival.
    pub arrived_stop: Option<usize>,
    /// Stops completed without a logged arrival (the skip shortcut).
    pub passed_stops: Vec<usize>,
    /// Set when this operation completed the whole route.
    pub completion: Option<CompletionKind>,
}

/// The complete mutable state of one tracking session for one route.
///
/// Invariants: `current_stop_index` is the lowest index of an incomplete
/// stop (or `stops.len()` once none remain); `tick_index` stays inside the
/// geometry; `Completed` status implies every stop is completed.
#[derive(Debug, Clone, Serialize)]
pub struct RouteInstance {
    route_id: String,
    geometry: RouteGeometry,
    stops: Vec<Stop>,
    status: RouteStatus,
    current_stop_index: usize,
    tick_index: usize,
    started_at: DateTime<Utc>,
}

impl RouteInstance {
    pub fn new(route_id: impl Into<String>, geometry: RouteGeometry, stops: Vec<Stop>) -> Self {
        let current_stop_index = stops
            .iter()
            .position(|stop| !stop.completed)
            .unwrap_or(stops.len());
        Self {
            route_id: route_id.into(),
            geometry,
            stops,
            status: RouteStatus::Active,
            current_stop_index,
            tick_index: 0,
            started_at: Utc::now(),
        }
    }

    pub fn route_id(&self) -> &str {
        &self.route_id
    }

    pub fn geometry(&self) -> &RouteGeometry {
        &self.geometry
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    pub fn status(&self) -> RouteStatus {
        self.status
    }

    pub fn current_stop_index(&self) -> usize {
        self.current_stop_index
    }

    pub fn tick_index(&self) -> usize {
        self.tick_index
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn remaining_stops(&self) -> usize {
        self.stops.iter().filter(|stop| !stop.completed).count()
    }

    /// Logs an arrival at the current stop.
    ///
    /// Valid only while `Active` and only for `current_stop_index`; the stop
    /// and everything before it become completed and the cursor advances to
    /// the next pending stop. Arriving at the last pending stop completes
    /// the route.
    pub fn mark_arrived(&mut self, stop_index: usize) -> Result<Transition, StateError> {
        self.ensure_actionable()?;
        if stop_index >= self.stops.len() || stop_index != self.current_stop_index {
            return Err(self.invalid_index(stop_index));
        }

        for stop in &mut self.stops[..=stop_index] {
            stop.completed = true;
        }
        self.current_stop_index = self.next_pending(stop_index + 1);
        let completion = self.complete_if_no_pending();
        info!(route = %self.route_id, stop = stop_index, "arrival logged");

        Ok(Transition {
            arrived_stop: Some(stop_index),
            passed_stops: Vec::new(),
            completion,
        })
    }

    /// Jumps the route forward to `stop_index`, logging an arrival there.
    ///
    /// Intermediate stops are marked completed without individual arrival
    /// records: the bus passed them without a logged arrival. Valid only
    /// while `Active` and only for indexes beyond the current stop.
    pub fn skip_to_stop(&mut self, stop_index: usize) -> Result<Transition, StateError> {
        self.ensure_actionable()?;
        if stop_index >= self.stops.len() || stop_index <= self.current_stop_index {
            return Err(self.invalid_index(stop_index));
        }

        let passed_stops: Vec<usize> = (self.current_stop_index..stop_index)
            .filter(|&i| !self.stops[i].completed)
            .collect();
        for stop in &mut self.stops[..=stop_index] {
            stop.completed = true;
        }
        self.current_stop_index = self.next_pending(stop_index + 1);
        let completion = self.complete_if_no_pending();
        info!(
            route = %self.route_id,
            stop = stop_index,
            passed = passed_stops.len(),
            "skipped ahead"
        );

        Ok(Transition {
            arrived_stop: Some(stop_index),
            passed_stops,
            completion,
        })
    }

    /// Suspends arrivals. A no-op if already paused.
    pub fn pause(&mut self) -> Result<(), StateError> {
        if self.status == RouteStatus::Completed {
            return Err(StateError::RouteAlreadyCompleted);
        }
        self.status = RouteStatus::Paused;
        Ok(())
    }

    /// Resumes a paused route. A no-op if already active.
    pub fn resume(&mut self) -> Result<(), StateError> {
        if self.status == RouteStatus::Completed {
            return Err(StateError::RouteAlreadyCompleted);
        }
        self.status = RouteStatus::Active;
        Ok(())
    }

    /// Forces the route to `Completed` regardless of remaining stops.
    ///
    /// Driver override: remaining stops are swept into `passed_stops` so the
    /// completion invariant holds, and the transition carries
    /// [`CompletionKind::ManualOverride`] so telemetry can tell it apart
    /// from a natural completion.
    pub fn complete(&mut self) -> Result<Transition, StateError> {
        if self.status == RouteStatus::Completed {
            return Err(StateError::RouteAlreadyCompleted);
        }

        let passed_stops: Vec<usize> = (0..self.stops.len())
            .filter(|&i| !self.stops[i].completed)
            .collect();
        for stop in &mut self.stops {
            stop.completed = true;
        }
        self.current_stop_index = self.stops.len();
        self.status = RouteStatus::Completed;
        info!(route = %self.route_id, "route completed by override");

        Ok(Transition {
            arrived_stop: None,
            passed_stops,
            completion: Some(CompletionKind::ManualOverride),
        })
    }

    /// Advances the simulated position by one tick, clamped to the end of
    /// the geometry. Returns the new tick index.
    pub fn advance_tick(&mut self) -> usize {
        let last = self.geometry.points().len() - 1;
        if self.tick_index < last {
            self.tick_index += 1;
        }
        self.tick_index
    }

    fn ensure_actionable(&self) -> Result<(), StateError> {
        match self.status {
            RouteStatus::Completed => Err(StateError::RouteAlreadyCompleted),
            RouteStatus::Paused => Err(StateError::RoutePaused),
            RouteStatus::Active => Ok(()),
        }
    }

    fn invalid_index(&self, index: usize) -> StateError {
        StateError::InvalidStopIndex {
            index,
            current: self.current_stop_index,
            len: self.stops.len(),
        }
    }

    fn next_pending(&self, from: usize) -> usize {
        self.stops[from..]
            .iter()
            .position(|stop| !stop.completed)
            .map(|offset| from + offset)
            .unwrap_or(self.stops.len())
    }

    fn complete_if_no_pending(&mut self) -> Option<CompletionKind> {
        if !self.stops.is_empty() && self.current_stop_index >= self.stops.len() {
            self.status = RouteStatus::Completed;
            info!(route = %self.route_id, "all stops completed");
            Some(CompletionKind::AllStopsArrived)
        } else {
            None
        }
    }
}
