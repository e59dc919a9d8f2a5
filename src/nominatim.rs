//! Nominatim reverse-geocoding adapter.
//!
//! Best effort only: failures degrade to `None` and never block routing
//! decisions. Used to put a readable name on a raw start coordinate.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::route::Coordinate;
use crate::traits::Geocoder;

#[derive(Debug, Clone)]
pub struct NominatimConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Nominatim's usage policy requires an identifying User-Agent.
    pub user_agent: String,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            timeout_secs: 5,
            user_agent: "visit-planner".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NominatimClient {
    config: NominatimConfig,
    client: reqwest::blocking::Client,
}

impl NominatimClient {
    pub fn new(config: NominatimConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { config, client })
    }
}

impl Geocoder for NominatimClient {
    fn reverse(&self, coordinate: Coordinate) -> Option<String> {
        let url = format!(
            "{}/reverse?format=json&lat={:.6}&lon={:.6}&zoom=18&addressdetails=1",
            self.config.base_url, coordinate.lat, coordinate.lon
        );

        let response = match self
            .client
            .get(url)
            .send()
            .and_then(|response| response.error_for_status())
        {
            Ok(response) => response,
            Err(err) => {
                debug!(error = %err, "reverse geocoding unavailable");
                return None;
            }
        };

        let payload: ReverseResponse = match response.json() {
            Ok(payload) => payload,
            Err(err) => {
                debug!(error = %err, "reverse geocoding payload malformed");
                return None;
            }
        };

        payload.address.and_then(ReverseAddress::display_name)
    }
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    address: Option<ReverseAddress>,
}

#[derive(Debug, Deserialize)]
struct ReverseAddress {
    road: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
}

impl ReverseAddress {
    fn display_name(self) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(road) = self.road {
            parts.push(road);
        }
        if let Some(city) = self.city.or(self.town).or(self.village) {
            parts.push(city);
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}
