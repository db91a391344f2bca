//! Collaborator seams for the tracking engine.
//!
//! The engine talks to the outside world through these traits so that the
//! routing service, the persistence layer, and test doubles are all
//! interchangeable. Concrete apps inject their own implementations.

use serde_json::Value;

use crate::geometry::{GeometryError, RouteGeometry, RoutePoint};
use crate::store::StoreError;

/// Resolves the physical path of a route.
///
/// Waypoints are visited in exactly the order given; they mirror stop order
/// on a real route and are never reordered for optimality. Implementations
/// must never return a geometry with zero points; every failure mode
/// (network, malformed response, zero results) surfaces as
/// [`GeometryError::Unavailable`]. Retrying is a caller decision.
pub trait GeometryProvider {
    fn resolve(
        &self,
        origin: RoutePoint,
        destination: RoutePoint,
        waypoints: &[RoutePoint],
    ) -> Result<RouteGeometry, GeometryError>;
}

/// Local key-value persistence for saved routes and booked tickets.
///
/// Values are opaque JSON blobs; the engine never inspects them and keeps no
/// durable state of its own.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<Value>;

    fn put(&mut self, key: &str, value: Value) -> Result<(), StoreError>;

    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}
