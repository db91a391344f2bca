//! Straight-line geometry provider (fallback when the routing service is unavailable).
//!
//! Synthesizes a path by interpolating straight segments through the stop
//! sequence. Less accurate than a routed path (ignores roads) but always
//! available, and deterministic enough to drive the simulation offline.

use crate::geometry::{haversine_km, GeometryError, RouteGeometry, RoutePoint};
use crate::traits::GeometryProvider;

/// Interpolated points generated per kilometer of segment length.
const DEFAULT_POINTS_PER_KM: f64 = 4.0;

#[derive(Debug, Clone)]
pub struct StraightLineProvider {
    pub points_per_km: f64,
}

impl Default for StraightLineProvider {
    fn default() -> Self {
        Self {
            points_per_km: DEFAULT_POINTS_PER_KM,
        }
    }
}

impl StraightLineProvider {
    pub fn new(points_per_km: f64) -> Self {
        Self { points_per_km }
    }
}

impl GeometryProvider for StraightLineProvider {
    fn resolve(
        &self,
        origin: RoutePoint,
        destination: RoutePoint,
        waypoints: &[RoutePoint],
    ) -> Result<RouteGeometry, GeometryError> {
        let mut anchors = Vec::with_capacity(waypoints.len() + 2);
        anchors.push(origin);
        anchors.extend_from_slice(waypoints);
        anchors.push(destination);

        let mut points = Vec::new();
        for pair in anchors.windows(2) {
            let km = haversine_km(pair[0], pair[1]);
            let steps = ((km * self.points_per_km).ceil() as usize).max(1);
            for step in 0..steps {
                let t = step as f64 / steps as f64;
                points.push(RoutePoint::new(
                    pair[0].lat + (pair[1].lat - pair[0].lat) * t,
                    pair[0].lng + (pair[1].lng - pair[0].lng) * t,
                ));
            }
        }
        points.push(destination);

        RouteGeometry::new(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_preserved() {
        let origin = RoutePoint::new(3.1340, 101.6869);
        let destination = RoutePoint::new(3.1579, 101.7123);
        let geometry = StraightLineProvider::default()
            .resolve(origin, destination, &[])
            .unwrap();

        assert_eq!(geometry.points()[0], origin);
        assert_eq!(geometry.last_point(), destination);
    }

    #[test]
    fn waypoints_appear_in_given_order() {
        let origin = RoutePoint::new(0.0, 0.0);
        let a = RoutePoint::new(0.0, 1.0);
        let b = RoutePoint::new(1.0, 1.0);
        let destination = RoutePoint::new(1.0, 0.0);
        let geometry = StraightLineProvider::default()
            .resolve(origin, destination, &[a, b])
            .unwrap();

        let points = geometry.points();
        let pos_a = points.iter().position(|p| *p == a).expect("waypoint a");
        let pos_b = points.iter().position(|p| *p == b).expect("waypoint b");
        assert!(pos_a < pos_b);
    }

    #[test]
    fn longer_segments_get_more_points() {
        let provider = StraightLineProvider::new(10.0);
        let short = provider
            .resolve(
                RoutePoint::new(3.1340, 101.6869),
                RoutePoint::new(3.1373, 101.6873),
                &[],
            )
            .unwrap();
        let long = provider
            .resolve(
                RoutePoint::new(3.1340, 101.6869),
                RoutePoint::new(3.1731, 101.6958),
                &[],
            )
            .unwrap();
        assert!(long.points().len() > short.points().len());
    }

    #[test]
    fn degenerate_same_endpoint_still_resolves() {
        let pt = RoutePoint::new(3.1340, 101.6869);
        let geometry = StraightLineProvider::default().resolve(pt, pt, &[]).unwrap();
        assert_eq!(geometry.points().len(), 1);
    }
}
