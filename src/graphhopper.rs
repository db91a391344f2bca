//! GraphHopper HTTP adapter for route geometries.

use serde::Deserialize;
use tracing::debug;

use crate::geometry::{GeometryError, RouteGeometry, RoutePoint};
use crate::traits::GeometryProvider;

#[derive(Debug, Clone)]
pub struct GraphHopperConfig {
    pub base_url: String,
    /// Vehicle profile the provider routes for.
    pub profile: String,
    /// API key, required by the hosted service, optional for self-hosted.
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for GraphHopperConfig {
    fn default() -> Self {
        Self {
            base_url: "https://graphhopper.com/api/1".to_string(),
            profile: "car".to_string(),
            api_key: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GraphHopperClient {
    config: GraphHopperConfig,
    client: reqwest::blocking::Client,
}

impl GraphHopperClient {
    pub fn new(config: GraphHopperConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }
}

impl GeometryProvider for GraphHopperClient {
    fn resolve(
        &self,
        origin: RoutePoint,
        destination: RoutePoint,
        waypoints: &[RoutePoint],
    ) -> Result<RouteGeometry, GeometryError> {
        let mut url = format!(
            "{}/route?profile={}&points_encoded=false",
            self.config.base_url, self.config.profile
        );
        for point in std::iter::once(&origin)
            .chain(waypoints.iter())
            .chain(std::iter::once(&destination))
        {
            url.push_str(&format!("&point={:.6},{:.6}", point.lat, point.lng));
        }
        if let Some(key) = &self.config.api_key {
            url.push_str(&format!("&key={}", key));
        }

        debug!(
            profile = %self.config.profile,
            waypoints = waypoints.len(),
            "requesting route geometry"
        );

        let response = self
            .client
            .get(url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<RouteResponse>())
            .map_err(|err| GeometryError::Unavailable(err.to_string()))?;

        geometry_from_response(response)
    }
}

fn geometry_from_response(response: RouteResponse) -> Result<RouteGeometry, GeometryError> {
    let path = response
        .paths
        .into_iter()
        .next()
        .ok_or_else(|| GeometryError::Unavailable("provider returned no paths".to_string()))?;

    // The provider sends GeoJSON-style (lng, lat) pairs; flip to (lat, lng).
    let points = path
        .points
        .coordinates
        .into_iter()
        .filter_map(|pair| match pair.as_slice() {
            [lng, lat, ..] => Some(RoutePoint::new(*lat, *lng)),
            _ => None,
        })
        .collect::<Vec<_>>();

    RouteGeometry::new(points)
}

#[derive(Debug, Deserialize)]
struct RouteResponse {
    #[serde(default)]
    paths: Vec<RoutePath>,
}

#[derive(Debug, Deserialize)]
struct RoutePath {
    points: PathPoints,
}

#[derive(Debug, Deserialize)]
struct PathPoints {
    #[serde(default)]
    coordinates: Vec<Vec<f64>>,
}
