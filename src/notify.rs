//! Notification events derived from tracking state transitions.
//!
//! A pure transform: the notifier consumes [`Transition`]s and ETA samples
//! and produces discrete events for the presentation layer. It never reads
//! events back, and emitted events are immutable.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::route::{CompletionKind, Stop, Transition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NotificationKind {
    StopReached,
    Delay,
    RouteCompleted,
    Custom,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationEvent {
    pub kind: NotificationKind,
    pub message: String,
    pub eta_minutes: Option<i32>,
    pub emitted_at: DateTime<Utc>,
}

impl NotificationEvent {
    fn new(kind: NotificationKind, message: String, eta_minutes: Option<i32>) -> Self {
        Self {
            kind,
            message,
            eta_minutes,
            emitted_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotifierOptions {
    /// Minutes the ETA must grow beyond the last reported value before a
    /// delay is considered.
    pub delay_threshold_minutes: f64,
    /// Consecutive high recomputations required before the delay is
    /// actually reported.
    pub sustain_samples: u32,
}

impl Default for NotifierOptions {
    fn default() -> Self {
        Self {
            delay_threshold_minutes: 5.0,
            sustain_samples: 3,
        }
    }
}

/// Turns state transitions into passenger-facing notifications.
///
/// `RouteCompleted` fires exactly once per route instance no matter how
/// completion is reached or how often it is re-attempted. Skipped stops stay
/// silent: only a logged arrival produces `StopReached`.
#[derive(Debug, Default)]
pub struct Notifier {
    options: NotifierOptions,
    last_reported_eta: Option<f64>,
    high_samples: u32,
    completed_emitted: bool,
}

impl Notifier {
    pub fn new(options: NotifierOptions) -> Self {
        Self {
            options,
            last_reported_eta: None,
            high_samples: 0,
            completed_emitted: false,
        }
    }

    /// Events produced by one state-machine transition.
    pub fn on_transition(&mut self, stops: &[Stop], transition: &Transition) -> Vec<NotificationEvent> {
        let mut events = Vec::new();

        if let Some(index) = transition.arrived_stop {
            if let Some(stop) = stops.get(index) {
                events.push(NotificationEvent::new(
                    NotificationKind::StopReached,
                    format!("Arrived at {}", stop.name),
                    None,
                ));
            }
        }

        if let Some(kind) = transition.completion {
            if !self.completed_emitted {
                self.completed_emitted = true;
                let message = match kind {
                    CompletionKind::AllStopsArrived => "Route completed".to_string(),
                    CompletionKind::ManualOverride => {
                        "Route completed by driver".to_string()
                    }
                };
                events.push(NotificationEvent::new(
                    NotificationKind::RouteCompleted,
                    message,
                    None,
                ));
            }
        }

        events
    }

    /// Feeds one ETA recomputation; returns a `Delay` event when the
    /// increase has been sustained long enough.
    ///
    /// The baseline follows the ETA downward as the trip progresses, so a
    /// delay is always measured against the best recently reported estimate
    /// rather than a stale start-of-trip figure.
    pub fn on_eta(&mut self, eta_minutes: f64) -> Option<NotificationEvent> {
        let Some(last) = self.last_reported_eta else {
            self.last_reported_eta = Some(eta_minutes);
            return None;
        };

        if eta_minutes - last > self.options.delay_threshold_minutes {
            self.high_samples += 1;
            if self.high_samples >= self.options.sustain_samples {
                self.high_samples = 0;
                self.last_reported_eta = Some(eta_minutes);
                return Some(NotificationEvent::new(
                    NotificationKind::Delay,
                    format!("Running about {:.0} minutes behind", eta_minutes - last),
                    Some(eta_minutes.round() as i32),
                ));
            }
        } else {
            self.high_samples = 0;
            if eta_minutes < last {
                self.last_reported_eta = Some(eta_minutes);
            }
        }

        None
    }

    /// A free-form announcement, e.g. from the driver.
    pub fn custom(&self, message: impl Into<String>) -> NotificationEvent {
        NotificationEvent::new(NotificationKind::Custom, message.into(), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notifier(threshold: f64, sustain: u32) -> Notifier {
        Notifier::new(NotifierOptions {
            delay_threshold_minutes: threshold,
            sustain_samples: sustain,
        })
    }

    fn arrival(stop: usize) -> Transition {
        Transition {
            arrived_stop: Some(stop),
            passed_stops: Vec::new(),
            completion: None,
        }
    }

    fn stops(names: &[&str]) -> Vec<Stop> {
        names
            .iter()
            .map(|name| Stop::new(*name, *name, Utc::now()))
            .collect()
    }

    #[test]
    fn arrival_emits_stop_reached_with_the_stop_name() {
        let stops = stops(&["Sentral", "Pasar Seni"]);
        let events = Notifier::default().on_transition(&stops, &arrival(1));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, NotificationKind::StopReached);
        assert!(events[0].message.contains("Pasar Seni"));
    }

    #[test]
    fn skipped_stops_stay_silent() {
        let stops = stops(&["A", "B", "C"]);
        let transition = Transition {
            arrived_stop: Some(2),
            passed_stops: vec![0, 1],
            completion: None,
        };
        let events = Notifier::default().on_transition(&stops, &transition);
        let reached: Vec<_> = events
            .iter()
            .filter(|e| e.kind == NotificationKind::StopReached)
            .collect();
        assert_eq!(reached.len(), 1);
        assert!(reached[0].message.contains('C'));
    }

    #[test]
    fn route_completed_fires_exactly_once() {
        let stops = stops(&["A"]);
        let completing = Transition {
            arrived_stop: Some(0),
            passed_stops: Vec::new(),
            completion: Some(CompletionKind::AllStopsArrived),
        };
        let mut notifier = Notifier::default();
        let first = notifier.on_transition(&stops, &completing);
        assert!(first
            .iter()
            .any(|e| e.kind == NotificationKind::RouteCompleted));

        let again = Transition {
            arrived_stop: None,
            passed_stops: Vec::new(),
            completion: Some(CompletionKind::ManualOverride),
        };
        let second = notifier.on_transition(&stops, &again);
        assert!(second
            .iter()
            .all(|e| e.kind != NotificationKind::RouteCompleted));
    }

    #[test]
    fn override_completion_is_distinguishable() {
        let transition = Transition {
            arrived_stop: None,
            passed_stops: vec![0],
            completion: Some(CompletionKind::ManualOverride),
        };
        let events = Notifier::default().on_transition(&stops(&["A"]), &transition);
        assert_eq!(events.len(), 1);
        assert!(events[0].message.contains("driver"));
    }

    #[test]
    fn delay_requires_a_sustained_increase() {
        let mut notifier = notifier(5.0, 3);
        assert!(notifier.on_eta(20.0).is_none()); // baseline
        assert!(notifier.on_eta(30.0).is_none());
        assert!(notifier.on_eta(31.0).is_none());
        let delay = notifier.on_eta(32.0);
        let delay = delay.expect("third consecutive high sample reports");
        assert_eq!(delay.kind, NotificationKind::Delay);
        assert_eq!(delay.eta_minutes, Some(32));
    }

    #[test]
    fn a_single_spike_is_not_a_delay() {
        let mut notifier = notifier(5.0, 3);
        assert!(notifier.on_eta(20.0).is_none());
        assert!(notifier.on_eta(40.0).is_none());
        assert!(notifier.on_eta(21.0).is_none()); // recovered
        assert!(notifier.on_eta(40.0).is_none()); // counter was reset
    }

    #[test]
    fn baseline_follows_improving_eta() {
        let mut notifier = notifier(5.0, 2);
        assert!(notifier.on_eta(30.0).is_none());
        assert!(notifier.on_eta(10.0).is_none()); // baseline drops to 10
        assert!(notifier.on_eta(17.0).is_none());
        assert!(notifier.on_eta(17.0).is_some()); // +7 over 10, sustained twice
    }

    #[test]
    fn custom_announcements_pass_through() {
        let event = Notifier::default().custom("Detour at Jalan Ampang");
        assert_eq!(event.kind, NotificationKind::Custom);
        assert_eq!(event.message, "Detour at Jalan Ampang");
    }
}
