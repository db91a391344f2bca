//! Route geometries as decoded coordinate sequences.
//!
//! This module provides the coordinate types the rest of the engine works
//! with. Geometries store latitude/longitude points directly; encoding
//! to/from provider wire formats happens at the boundary (when receiving
//! from the routing service or handing points to a map renderer).

use serde::Serialize;
use thiserror::Error;

/// Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Raised when a route's physical path cannot be resolved.
///
/// Covers network failures, malformed provider responses, and zero-result
/// responses alike; callers retry (or fall back) at their own discretion.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("route geometry unavailable: {0}")]
    Unavailable(String),
}

/// A single coordinate on a route, always in (lat, lng) order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RoutePoint {
    pub lat: f64,
    pub lng: f64,
}

impl RoutePoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// The resolved physical path of a route.
///
/// Invariants: never empty, and consecutive points are distinct (zero-length
/// segments are dropped at construction). A geometry is built once per route
/// selection and replaced wholesale if the selection changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteGeometry {
    points: Vec<RoutePoint>,
}

impl RouteGeometry {
    /// Builds a geometry from decoded coordinate points.
    ///
    /// Consecutive duplicates are collapsed. An input that leaves no points
    /// at all fails with [`GeometryError::Unavailable`]: a zero-point
    /// geometry must never exist.
    pub fn new(points: Vec<RoutePoint>) -> Result<Self, GeometryError> {
        let mut deduped: Vec<RoutePoint> = Vec::with_capacity(points.len());
        for point in points {
            if deduped.last() != Some(&point) {
                deduped.push(point);
            }
        }
        if deduped.is_empty() {
            return Err(GeometryError::Unavailable(
                "empty coordinate sequence".to_string(),
            ));
        }
        Ok(Self { points: deduped })
    }

    /// Returns a reference to the coordinate points.
    pub fn points(&self) -> &[RoutePoint] {
        &self.points
    }

    /// Consumes the geometry and returns the owned coordinate points.
    pub fn into_points(self) -> Vec<RoutePoint> {
        self.points
    }

    pub fn last_point(&self) -> RoutePoint {
        self.points[self.points.len() - 1]
    }
}

/// Great-circle distance between two points in kilometers.
pub fn haversine_km(from: RoutePoint, to: RoutePoint) -> f64 {
    let lat1_rad = from.lat.to_radians();
    let lat2_rad = to.lat.to_radians();
    let delta_lat = (to.lat - from.lat).to_radians();
    let delta_lng = (to.lng - from.lng).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}
