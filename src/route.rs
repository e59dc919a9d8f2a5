//! Core routing data types shared across the planner.

use serde::{Deserialize, Serialize};

/// A WGS84 point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Role of a location within an optimization input set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationRole {
    Start,
    Visit,
}

/// A named point to start from or to visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub coordinate: Coordinate,
    pub role: LocationRole,
}

impl Location {
    pub fn start(name: impl Into<String>, coordinate: Coordinate) -> Self {
        Self {
            name: name.into(),
            coordinate,
            role: LocationRole::Start,
        }
    }

    pub fn visit(name: impl Into<String>, coordinate: Coordinate) -> Self {
        Self {
            name: name.into(),
            coordinate,
            role: LocationRole::Visit,
        }
    }

    pub fn is_start(&self) -> bool {
        self.role == LocationRole::Start
    }
}

/// An ordered visitation sequence produced by the optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Stops in visiting order; the first is always the start location.
    pub stops: Vec<Location>,
    pub total_distance_meters: f64,
    /// True when every candidate ordering tripped the one-way filter and the
    /// minimum-cost ordering was returned best-effort.
    pub one_way_fallback: bool,
}

/// A single road leg between two coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteInfo {
    pub distance_meters: f64,
    pub duration_seconds: f64,
    /// Empty for straight-line pseudo-routes.
    pub steps: Vec<RouteStep>,
}

/// One turn-by-turn instruction within a road leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    pub maneuver: ManeuverType,
    pub modifier: Option<ManeuverModifier>,
    pub road_name: String,
    pub distance_meters: f64,
    pub location: Coordinate,
}

/// OSRM maneuver types, with unrecognized values preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManeuverType {
    Depart,
    Arrive,
    Turn,
    NewName,
    Continue,
    Merge,
    OnRamp,
    OffRamp,
    Fork,
    EndOfRoad,
    Roundabout,
    RoundaboutTurn,
    ExitRoundabout,
    Notification,
    Other(String),
}

impl ManeuverType {
    pub fn from_osrm(raw: &str) -> Self {
        match raw {
            "depart" => Self::Depart,
            "arrive" => Self::Arrive,
            "turn" => Self::Turn,
            "new name" => Self::NewName,
            "continue" => Self::Continue,
            "merge" => Self::Merge,
            "on ramp" => Self::OnRamp,
            "off ramp" => Self::OffRamp,
            "fork" => Self::Fork,
            "end of road" => Self::EndOfRoad,
            "roundabout" => Self::Roundabout,
            "roundabout turn" => Self::RoundaboutTurn,
            "exit roundabout" => Self::ExitRoundabout,
            "notification" => Self::Notification,
            other => Self::Other(other.to_string()),
        }
    }
}

/// OSRM maneuver modifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManeuverModifier {
    Left,
    Right,
    SharpLeft,
    SharpRight,
    SlightLeft,
    SlightRight,
    Straight,
    UTurn,
    Other(String),
}

impl ManeuverModifier {
    pub fn from_osrm(raw: &str) -> Self {
        match raw {
            "left" => Self::Left,
            "right" => Self::Right,
            "sharp left" => Self::SharpLeft,
            "sharp right" => Self::SharpRight,
            "slight left" => Self::SlightLeft,
            "slight right" => Self::SlightRight,
            "straight" => Self::Straight,
            "uturn" => Self::UTurn,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Caller preferences for choosing among route alternatives.
#[derive(Debug, Clone, Default)]
pub struct RoutePreference {
    pub avoid_tolls: bool,
    pub avoid_highways: bool,
    /// Drop alternatives whose steps trip the one-way filter.
    pub avoid_one_way: bool,
    /// Pick the shortest alternative by distance instead of the fastest by duration.
    pub prefer_shortest: bool,
}
