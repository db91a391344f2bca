//! Real Klang Valley locations for realistic test fixtures.
//!
//! Coordinates sourced from OpenStreetMap. The corridor follows a commuter
//! run from KL Sentral through the city centre out to Ampang.

use chrono::{Duration, Utc};

use route_tracker::geometry::{RouteGeometry, RoutePoint};
use route_tracker::route::{RouteInstance, Stop};
use route_tracker::straight_line::StraightLineProvider;
use route_tracker::traits::GeometryProvider;

/// A named location with coordinates.
#[derive(Debug, Clone)]
pub struct BusStop {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl BusStop {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }

    pub fn point(&self) -> RoutePoint {
        RoutePoint::new(self.lat, self.lng)
    }
}

// ============================================================================
// KL Sentral to Ampang commuter corridor
// ============================================================================

pub const CITY_CORRIDOR: &[BusStop] = &[
    BusStop::new("KL Sentral", 3.1340, 101.6869),
    BusStop::new("Muzium Negara", 3.1373, 101.6873),
    BusStop::new("Pasar Seni", 3.1423, 101.6955),
    BusStop::new("Masjid Jamek", 3.1491, 101.6958),
    BusStop::new("Dang Wangi", 3.1568, 101.7019),
    BusStop::new("KLCC", 3.1579, 101.7123),
    BusStop::new("Ampang Park", 3.1598, 101.7190),
    BusStop::new("Jelatek", 3.1672, 101.7333),
    BusStop::new("Dato Keramat", 3.1651, 101.7318),
];

/// Builds pending stops from the first `count` corridor locations, scheduled
/// ten minutes apart from now.
pub fn corridor_stops(count: usize) -> Vec<Stop> {
    let start = Utc::now();
    CITY_CORRIDOR
        .iter()
        .take(count)
        .enumerate()
        .map(|(i, stop)| {
            Stop::new(
                format!("stop-{}", i),
                stop.name,
                start + Duration::minutes(10 * (i as i64 + 1)),
            )
            .with_passengers(3 * i as u32)
        })
        .collect()
}

/// A densified straight-line geometry along the first `count` locations.
pub fn corridor_geometry(count: usize) -> RouteGeometry {
    let stops = &CITY_CORRIDOR[..count];
    let origin = stops[0].point();
    let destination = stops[count - 1].point();
    let waypoints: Vec<RoutePoint> = stops[1..count - 1].iter().map(BusStop::point).collect();
    StraightLineProvider::default()
        .resolve(origin, destination, &waypoints)
        .expect("corridor geometry resolves")
}

/// A fresh active instance over `count` corridor stops.
pub fn corridor_instance(count: usize) -> RouteInstance {
    RouteInstance::new("T410", corridor_geometry(count), corridor_stops(count))
}
