//! OSRM HTTP adapter for point-to-point road routing.
//!
//! Transport failures are retried with linear backoff, then recovered by
//! falling back to great-circle estimates; well-formed error responses are
//! never retried.

use std::thread;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::error::RoutingError;
use crate::haversine::{self, DEFAULT_SPEED_KMH};
use crate::oneway::OneWayFilter;
use crate::route::{
    Coordinate, ManeuverModifier, ManeuverType, RouteInfo, RoutePreference, RouteStep,
};
use crate::traits::DistanceProvider;

#[derive(Debug, Clone)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
    /// Transport-level retries after the first attempt.
    pub max_retries: u32,
    /// Base backoff delay; the k-th retry waits k times this.
    pub retry_base_delay: Duration,
    /// Assumed speed for fallback duration estimates, km/h.
    pub fallback_speed_kmh: f64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://router.project-osrm.org".to_string(),
            profile: "driving".to_string(),
            timeout_secs: 10,
            max_retries: 3,
            retry_base_delay: Duration::from_secs(1),
            fallback_speed_kmh: DEFAULT_SPEED_KMH,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
    one_way: OneWayFilter,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config,
            client,
            one_way: OneWayFilter::default(),
        })
    }

    fn route_url(&self, from: Coordinate, to: Coordinate, query: &str) -> String {
        format!(
            "{}/route/v1/{}/{:.6},{:.6};{:.6},{:.6}?{}",
            self.config.base_url,
            self.config.profile,
            from.lon,
            from.lat,
            to.lon,
            to.lat,
            query
        )
    }

    /// GET with bounded retry on transport failures.
    fn fetch_routes(&self, url: &str) -> Result<OsrmRouteResponse, RoutingError> {
        let mut attempt: u32 = 0;
        loop {
            match self.client.get(url).send() {
                Ok(response) => {
                    let payload: OsrmRouteResponse = response
                        .json()
                        .map_err(|err| RoutingError::MalformedResponse(err.to_string()))?;
                    if payload.code != "Ok" {
                        return Err(RoutingError::ServiceStatus(payload.code));
                    }
                    if payload.routes.is_empty() {
                        return Err(RoutingError::MalformedResponse(
                            "no routes in response".to_string(),
                        ));
                    }
                    return Ok(payload);
                }
                Err(err) => {
                    if attempt >= self.config.max_retries {
                        return Err(RoutingError::Transport(err));
                    }
                    attempt += 1;
                    let delay = self.config.retry_base_delay * attempt;
                    warn!(attempt, error = %err, "routing request failed, retrying in {:?}", delay);
                    thread::sleep(delay);
                }
            }
        }
    }

    fn pseudo_route(&self, from: Coordinate, to: Coordinate) -> RouteInfo {
        let distance = haversine::great_circle_meters(from, to);
        RouteInfo {
            distance_meters: distance,
            duration_seconds: haversine::estimate_duration_seconds(
                distance,
                self.config.fallback_speed_kmh,
            ),
            steps: Vec::new(),
        }
    }
}

impl DistanceProvider for OsrmClient {
    fn driving_distance(&self, from: Coordinate, to: Coordinate) -> Result<f64, RoutingError> {
        let url = self.route_url(from, to, "overview=false");
        match self.fetch_routes(&url) {
            Ok(payload) => Ok(payload.routes[0].distance),
            Err(err) => {
                warn!(error = %err, "road distance unavailable, falling back to great-circle");
                Ok(haversine::great_circle_meters(from, to))
            }
        }
    }

    fn driving_route(&self, from: Coordinate, to: Coordinate) -> Result<RouteInfo, RoutingError> {
        let url = self.route_url(from, to, "overview=false&steps=true");
        match self.fetch_routes(&url) {
            Ok(payload) => {
                let mut routes = payload.routes;
                Ok(routes.swap_remove(0).into_route_info())
            }
            Err(err) => {
                warn!(error = %err, "road route unavailable, falling back to straight-line leg");
                Ok(self.pseudo_route(from, to))
            }
        }
    }

    fn best_route(
        &self,
        from: Coordinate,
        to: Coordinate,
        preference: &RoutePreference,
    ) -> Result<RouteInfo, RoutingError> {
        let mut query = String::from("alternatives=true&overview=false&steps=true");
        let mut excludes = Vec::new();
        if preference.avoid_tolls {
            excludes.push("toll");
        }
        if preference.avoid_highways {
            excludes.push("motorway");
        }
        if !excludes.is_empty() {
            query.push_str("&exclude=");
            query.push_str(&excludes.join(","));
        }

        let url = self.route_url(from, to, &query);
        let candidates = match self.fetch_routes(&url) {
            Ok(payload) => payload
                .routes
                .into_iter()
                .map(OsrmRoute::into_route_info)
                .collect::<Vec<_>>(),
            Err(err) => {
                warn!(error = %err, "route alternatives unavailable, falling back to straight-line leg");
                return Ok(self.pseudo_route(from, to));
            }
        };

        select_preferred(candidates, preference, &self.one_way)
    }
}

/// Pick the preferred alternative, applying the one-way filter first.
fn select_preferred(
    candidates: Vec<RouteInfo>,
    preference: &RoutePreference,
    filter: &OneWayFilter,
) -> Result<RouteInfo, RoutingError> {
    let viable: Vec<RouteInfo> = if preference.avoid_one_way {
        candidates
            .into_iter()
            .filter(|route| !filter.violates(&route.steps))
            .collect()
    } else {
        candidates
    };

    let key = |route: &RouteInfo| {
        if preference.prefer_shortest {
            route.distance_meters
        } else {
            route.duration_seconds
        }
    };

    viable
        .into_iter()
        .min_by(|a, b| key(a).total_cmp(&key(b)))
        .ok_or(RoutingError::NoRouteMeetsPreference)
}

#[derive(Debug, Deserialize)]
struct OsrmRouteResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
    #[serde(default)]
    legs: Vec<OsrmLeg>,
}

#[derive(Debug, Deserialize)]
struct OsrmLeg {
    #[serde(default)]
    steps: Vec<OsrmStep>,
}

#[derive(Debug, Deserialize)]
struct OsrmStep {
    #[serde(default)]
    name: String,
    distance: f64,
    maneuver: OsrmManeuver,
}

#[derive(Debug, Deserialize)]
struct OsrmManeuver {
    #[serde(rename = "type")]
    maneuver_type: String,
    modifier: Option<String>,
    /// Longitude, latitude.
    location: [f64; 2],
}

impl OsrmRoute {
    fn into_route_info(self) -> RouteInfo {
        let steps = self
            .legs
            .into_iter()
            .flat_map(|leg| leg.steps)
            .map(|step| RouteStep {
                maneuver: ManeuverType::from_osrm(&step.maneuver.maneuver_type),
                modifier: step
                    .maneuver
                    .modifier
                    .as_deref()
                    .map(ManeuverModifier::from_osrm),
                road_name: step.name,
                distance_meters: step.distance,
                location: Coordinate::new(step.maneuver.location[1], step.maneuver.location[0]),
            })
            .collect();

        RouteInfo {
            distance_meters: self.distance,
            duration_seconds: self.duration,
            steps,
        }
    }
}
