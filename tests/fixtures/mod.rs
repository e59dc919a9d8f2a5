//! Shared fakes and builders for integration tests.
//!
//! `FakeRouter` is deterministic (great-circle distances, synthetic steps)
//! so optimizer results are reproducible; `MemoryStore` is a plain in-memory
//! `PlanStore`.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::NaiveDate;
use uuid::Uuid;

use visit_planner::error::{RoutingError, StoreError};
use visit_planner::haversine;
use visit_planner::oneway::OneWayFilter;
use visit_planner::plan::{Plan, PlanStatus, PlanSummary, VisitExecutionRecord};
use visit_planner::route::{
    Coordinate, Location, ManeuverType, RouteInfo, RoutePreference, RouteStep,
};
use visit_planner::traits::{DistanceProvider, Geocoder, PlanStore};

pub fn coord(lat: f64, lon: f64) -> Coordinate {
    Coordinate::new(lat, lon)
}

pub fn start(lat: f64, lon: f64) -> Location {
    Location::start("Start", coord(lat, lon))
}

pub fn visit(name: &str, lat: f64, lon: f64) -> Location {
    Location::visit(name, coord(lat, lon))
}

/// Deterministic distance provider with an optional set of legs that read as
/// one-way violations.
#[derive(Default)]
pub struct FakeRouter {
    one_way_legs: HashSet<(String, String)>,
    calls: AtomicUsize,
}

impl FakeRouter {
    fn leg_key(from: Coordinate, to: Coordinate) -> (String, String) {
        (
            format!("{:.4},{:.4}", from.lat, from.lon),
            format!("{:.4},{:.4}", to.lat, to.lon),
        )
    }

    /// Make the leg from `from` to `to` read as a one-way violation.
    pub fn flag_one_way(&mut self, from: Coordinate, to: Coordinate) {
        self.one_way_legs.insert(Self::leg_key(from, to));
    }

    pub fn query_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn steps_for(&self, from: Coordinate, to: Coordinate) -> Vec<RouteStep> {
        let (maneuver, road_name) = if self.one_way_legs.contains(&Self::leg_key(from, to)) {
            (ManeuverType::Turn, "Jalan Satu Arah")
        } else {
            (ManeuverType::Depart, "Main Street")
        };
        vec![RouteStep {
            maneuver,
            modifier: None,
            road_name: road_name.to_string(),
            distance_meters: 120.0,
            location: from,
        }]
    }

    fn leg(&self, from: Coordinate, to: Coordinate) -> RouteInfo {
        let distance = haversine::great_circle_meters(from, to);
        RouteInfo {
            distance_meters: distance,
            duration_seconds: haversine::estimate_duration_seconds(distance, 40.0),
            steps: self.steps_for(from, to),
        }
    }
}

impl DistanceProvider for FakeRouter {
    fn driving_distance(&self, from: Coordinate, to: Coordinate) -> Result<f64, RoutingError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(haversine::great_circle_meters(from, to))
    }

    fn driving_route(&self, from: Coordinate, to: Coordinate) -> Result<RouteInfo, RoutingError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.leg(from, to))
    }

    fn best_route(
        &self,
        from: Coordinate,
        to: Coordinate,
        preference: &RoutePreference,
    ) -> Result<RouteInfo, RoutingError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let leg = self.leg(from, to);
        if preference.avoid_one_way && OneWayFilter::default().violates(&leg.steps) {
            return Err(RoutingError::NoRouteMeetsPreference);
        }
        Ok(leg)
    }
}

/// In-memory plan and record store.
#[derive(Default)]
pub struct MemoryStore {
    plans: Mutex<Vec<Plan>>,
    records: Mutex<Vec<VisitExecutionRecord>>,
}

impl MemoryStore {
    pub fn plan(&self, id: Uuid) -> Option<Plan> {
        self.plans
            .lock()
            .unwrap()
            .iter()
            .find(|plan| plan.id == id)
            .cloned()
    }

    pub fn records(&self) -> Vec<VisitExecutionRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Insert a record directly, bypassing the engine.
    pub fn insert_record(&self, record: VisitExecutionRecord) {
        self.records.lock().unwrap().push(record);
    }
}

impl PlanStore for MemoryStore {
    fn save_plan(&self, plan: &Plan) -> Result<(), StoreError> {
        self.plans.lock().unwrap().push(plan.clone());
        Ok(())
    }

    fn load_plan(&self, id: Uuid) -> Result<Option<Plan>, StoreError> {
        Ok(self.plan(id))
    }

    fn list_today_plans(
        &self,
        owner: &str,
        date: NaiveDate,
    ) -> Result<Vec<PlanSummary>, StoreError> {
        Ok(self
            .plans
            .lock()
            .unwrap()
            .iter()
            .filter(|plan| {
                plan.owner == owner && plan.date == date && plan.status != PlanStatus::Completed
            })
            .map(Plan::summary)
            .collect())
    }

    fn update_plan_status(&self, id: Uuid, status: PlanStatus) -> Result<(), StoreError> {
        for plan in self.plans.lock().unwrap().iter_mut() {
            if plan.id == id {
                plan.status = status;
            }
        }
        Ok(())
    }

    fn record_visit_execution(&self, record: &VisitExecutionRecord) -> Result<(), StoreError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    fn completed_visit_indices(&self, plan_id: Uuid) -> Result<Vec<usize>, StoreError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|record| record.plan_id == plan_id)
            .map(|record| record.location_index)
            .collect())
    }
}

/// Geocoder that never resolves anything.
pub struct NoGeocoder;

impl Geocoder for NoGeocoder {
    fn reverse(&self, _coordinate: Coordinate) -> Option<String> {
        None
    }
}

/// Geocoder that always answers with a fixed address.
pub struct FixedGeocoder(pub &'static str);

impl Geocoder for FixedGeocoder {
    fn reverse(&self, _coordinate: Coordinate) -> Option<String> {
        Some(self.0.to_string())
    }
}
