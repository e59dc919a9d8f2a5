//! Visit plans and the plan-creation flow.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::{OptimizeError, PlanError};
use crate::route::{Coordinate, Location, Route};
use crate::solver::{self, OptimizeOptions};
use crate::traits::{DistanceProvider, Geocoder, PlanStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanStatus {
    Draft,
    Active,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: Uuid,
    pub owner: String,
    pub created_at: DateTime<Utc>,
    pub date: NaiveDate,
    pub start_location: Location,
    pub destinations: Vec<Location>,
    /// Visit order chosen by the optimizer; the start is not repeated here.
    pub optimized_route: Vec<Location>,
    pub status: PlanStatus,
}

impl Plan {
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            id: self.id,
            date: self.date,
            location_count: self.destinations.len(),
            status: self.status,
            created_at: self.created_at,
        }
    }
}

/// What plan listings carry; enough to render a choice list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub id: Uuid,
    pub date: NaiveDate,
    pub location_count: usize,
    pub status: PlanStatus,
    pub created_at: DateTime<Utc>,
}

/// Durable, append-only record of one completed stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitExecutionRecord {
    pub plan_id: Uuid,
    /// Position of the stop in `Plan::optimized_route`.
    pub location_index: usize,
    pub timestamp: DateTime<Utc>,
    pub evidence_photo_ref: String,
    pub captured_coordinate: Coordinate,
}

/// Display name for the start position when geocoding yields nothing.
const DEFAULT_START_NAME: &str = "Starting point";

pub struct Planner<P, D, G> {
    plans: P,
    router: D,
    geocoder: G,
}

impl<P, D, G> Planner<P, D, G>
where
    P: PlanStore,
    D: DistanceProvider + Sync,
    G: Geocoder,
{
    pub fn new(plans: P, router: D, geocoder: G) -> Self {
        Self {
            plans,
            router,
            geocoder,
        }
    }

    /// Create, optimize, and persist a draft plan for `date`.
    pub fn create_plan(
        &self,
        owner: &str,
        start: Coordinate,
        destinations: &[(String, Coordinate)],
        date: NaiveDate,
    ) -> Result<Plan, PlanError> {
        if destinations.is_empty() {
            return Err(PlanError::NoDestinations);
        }

        let start_name = self
            .geocoder
            .reverse(start)
            .unwrap_or_else(|| DEFAULT_START_NAME.to_string());
        let start_location = Location::start(start_name, start);

        let mut locations = Vec::with_capacity(destinations.len() + 1);
        locations.push(start_location.clone());
        locations.extend(
            destinations
                .iter()
                .map(|(name, coordinate)| Location::visit(name.clone(), *coordinate)),
        );

        let route = self.optimize_with_fallback(&locations)?;

        let plan = Plan {
            id: Uuid::new_v4(),
            owner: owner.to_string(),
            created_at: Utc::now(),
            date,
            start_location,
            destinations: locations[1..].to_vec(),
            optimized_route: route
                .stops
                .into_iter()
                .filter(|stop| !stop.is_start())
                .collect(),
            status: PlanStatus::Draft,
        };

        self.plans.save_plan(&plan)?;
        Ok(plan)
    }

    /// Road-distance optimization, recomputed over straight-line distances
    /// when the road-based call fails outright.
    fn optimize_with_fallback(&self, locations: &[Location]) -> Result<Route, PlanError> {
        let road = OptimizeOptions {
            use_road_distance: true,
            avoid_one_way: false,
        };
        match solver::optimize(locations, &self.router, &road) {
            Ok(route) => Ok(route),
            Err(OptimizeError::Routing(err)) => {
                warn!(error = %err, "road-based optimization failed, recomputing with straight-line distances");
                let straight = OptimizeOptions {
                    use_road_distance: false,
                    avoid_one_way: false,
                };
                Ok(solver::optimize(locations, &self.router, &straight)?)
            }
            Err(err) => Err(err.into()),
        }
    }
}
