//! Seam traits for external collaborators.
//!
//! Concrete adapters live in `osrm` and `nominatim`; persistence is left to
//! the embedding application.

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::{RoutingError, StoreError};
use crate::plan::{Plan, PlanStatus, PlanSummary, VisitExecutionRecord};
use crate::route::{Coordinate, RouteInfo, RoutePreference};

/// Point-to-point road routing.
///
/// Implementations are expected to recover from routing-service failures by
/// falling back to great-circle estimates rather than surfacing transport
/// errors to the optimizer.
pub trait DistanceProvider {
    /// Road distance in meters between two points.
    fn driving_distance(&self, from: Coordinate, to: Coordinate) -> Result<f64, RoutingError>;

    /// Full road leg with turn-by-turn steps.
    fn driving_route(&self, from: Coordinate, to: Coordinate) -> Result<RouteInfo, RoutingError>;

    /// Best leg among route alternatives per the caller's preference.
    fn best_route(
        &self,
        from: Coordinate,
        to: Coordinate,
        preference: &RoutePreference,
    ) -> Result<RouteInfo, RoutingError>;
}

/// Best-effort reverse geocoding.
pub trait Geocoder {
    /// Human-readable address for a coordinate, or `None` when unavailable.
    fn reverse(&self, coordinate: Coordinate) -> Option<String>;
}

/// Keyed persistence for plans and visit-execution records.
pub trait PlanStore {
    fn save_plan(&self, plan: &Plan) -> Result<(), StoreError>;

    fn load_plan(&self, id: Uuid) -> Result<Option<Plan>, StoreError>;

    /// Non-completed plans owned by `owner` and dated `date`.
    fn list_today_plans(&self, owner: &str, date: NaiveDate)
    -> Result<Vec<PlanSummary>, StoreError>;

    fn update_plan_status(&self, id: Uuid, status: PlanStatus) -> Result<(), StoreError>;

    fn record_visit_execution(&self, record: &VisitExecutionRecord) -> Result<(), StoreError>;

    /// Indices into `Plan::optimized_route` that already have a record.
    fn completed_visit_indices(&self, plan_id: Uuid) -> Result<Vec<usize>, StoreError>;
}

impl<T: DistanceProvider> DistanceProvider for Arc<T> {
    fn driving_distance(&self, from: Coordinate, to: Coordinate) -> Result<f64, RoutingError> {
        (**self).driving_distance(from, to)
    }

    fn driving_route(&self, from: Coordinate, to: Coordinate) -> Result<RouteInfo, RoutingError> {
        (**self).driving_route(from, to)
    }

    fn best_route(
        &self,
        from: Coordinate,
        to: Coordinate,
        preference: &RoutePreference,
    ) -> Result<RouteInfo, RoutingError> {
        (**self).best_route(from, to, preference)
    }
}

impl<T: PlanStore> PlanStore for Arc<T> {
    fn save_plan(&self, plan: &Plan) -> Result<(), StoreError> {
        (**self).save_plan(plan)
    }

    fn load_plan(&self, id: Uuid) -> Result<Option<Plan>, StoreError> {
        (**self).load_plan(id)
    }

    fn list_today_plans(
        &self,
        owner: &str,
        date: NaiveDate,
    ) -> Result<Vec<PlanSummary>, StoreError> {
        (**self).list_today_plans(owner, date)
    }

    fn update_plan_status(&self, id: Uuid, status: PlanStatus) -> Result<(), StoreError> {
        (**self).update_plan_status(id, status)
    }

    fn record_visit_execution(&self, record: &VisitExecutionRecord) -> Result<(), StoreError> {
        (**self).record_visit_execution(record)
    }

    fn completed_visit_indices(&self, plan_id: Uuid) -> Result<Vec<usize>, StoreError> {
        (**self).completed_visit_indices(plan_id)
    }
}
