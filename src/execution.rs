//! Per-conversation execution of a visit plan.
//!
//! Drives a user stop-by-stop through the optimized route: validate presence
//! inside the geofence, capture photo evidence, then route to the next stop.
//! Every event handler runs wholly inside the conversation's session lock, so
//! interleaved location and photo events cannot corrupt the session.

use std::sync::Arc;

use chrono::{Local, NaiveDate, Utc};
use tracing::warn;
use uuid::Uuid;

use crate::error::{ExecutionError, RoutingError};
use crate::haversine;
use crate::plan::{PlanStatus, PlanSummary, VisitExecutionRecord};
use crate::route::{Coordinate, Location, RouteInfo, RoutePreference};
use crate::session::{ConversationId, SessionStore};
use crate::solver::{self, OptimizeOptions};
use crate::traits::{DistanceProvider, PlanStore};

#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Acceptance radius around a stop for location updates, meters.
    pub geofence_radius_meters: f64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            geofence_radius_meters: 100.0,
        }
    }
}

/// A stop still to be visited, keyed back to its position in the plan's
/// optimized route so execution records stay stable across re-anchoring.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedStop {
    pub original_index: usize,
    pub location: Location,
}

/// Where a conversation currently is in the execution flow.
#[derive(Debug, Clone)]
pub enum SessionPhase {
    /// Waiting for the user to pick one of today's plans.
    SelectingPlan,
    /// Waiting for the user to pick the first stop (or keep the stored order).
    SelectingStart {
        plan_id: Uuid,
        remaining: Vec<IndexedStop>,
    },
    /// Walking the remaining stops.
    Visiting(VisitProgress),
}

#[derive(Debug, Clone)]
pub struct VisitProgress {
    pub plan_id: Uuid,
    pub remaining: Vec<IndexedStop>,
    pub current: usize,
    /// Where the next leg starts: the plan's start, then each completed stop.
    pub current_location: Coordinate,
    /// A location update that passed the geofence; present means evidence is due.
    pub pending_match: Option<Coordinate>,
}

/// Live session state, owned by the `SessionStore`.
#[derive(Debug, Clone)]
pub struct ExecutionSession {
    pub owner: String,
    pub phase: SessionPhase,
}

/// Structured outbound prompts; rendering and transport belong to the caller.
#[derive(Debug, Clone)]
pub enum Reply {
    NoPlansToday,
    PlanChoices(Vec<PlanSummary>),
    PlanAlreadyCompleted { plan_id: Uuid },
    StartChoices { plan_id: Uuid, stops: Vec<String> },
    /// Head to `target`; `leg` describes the road there.
    Leg { target: Location, leg: RouteInfo },
    OutsideGeofence {
        target: String,
        distance_meters: f64,
        radius_meters: f64,
    },
    EvidenceRequested { target: String },
    Completed { plan_id: Uuid },
}

pub struct ExecutionEngine<P, D> {
    plans: P,
    router: D,
    sessions: Arc<SessionStore<ExecutionSession>>,
    config: ExecutionConfig,
}

impl<P, D> ExecutionEngine<P, D>
where
    P: PlanStore,
    D: DistanceProvider + Sync,
{
    pub fn new(
        plans: P,
        router: D,
        sessions: Arc<SessionStore<ExecutionSession>>,
        config: ExecutionConfig,
    ) -> Self {
        Self {
            plans,
            router,
            sessions,
            config,
        }
    }

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    /// Open (or restart) an execution session by listing today's plans.
    pub fn start_execution(
        &self,
        conversation: ConversationId,
        owner: &str,
    ) -> Result<Reply, ExecutionError> {
        let mut plans = self.plans.list_today_plans(owner, Self::today())?;
        if plans.is_empty() {
            return Ok(Reply::NoPlansToday);
        }
        plans.sort_by_key(|summary| summary.created_at);

        self.sessions.update(conversation, |state| {
            *state = Some(ExecutionSession {
                owner: owner.to_string(),
                phase: SessionPhase::SelectingPlan,
            });
        });
        Ok(Reply::PlanChoices(plans))
    }

    /// Pick a plan; computes the not-yet-visited stops from durable records.
    pub fn select_plan(
        &self,
        conversation: ConversationId,
        plan_id: Uuid,
    ) -> Result<Reply, ExecutionError> {
        self.sessions.update(conversation, |state| {
            let Some(session) = state.as_mut() else {
                return Err(ExecutionError::SessionExpired(conversation));
            };

            let plan = self
                .plans
                .load_plan(plan_id)?
                .ok_or(ExecutionError::PlanNotFound(plan_id))?;
            if plan.date < Self::today() {
                return Err(ExecutionError::PlanExpired {
                    id: plan_id,
                    date: plan.date,
                });
            }

            let completed = self.plans.completed_visit_indices(plan_id)?;
            let remaining: Vec<IndexedStop> = plan
                .optimized_route
                .iter()
                .enumerate()
                .filter(|(index, _)| !completed.contains(index))
                .map(|(index, location)| IndexedStop {
                    original_index: index,
                    location: location.clone(),
                })
                .collect();

            if remaining.is_empty() {
                self.plans
                    .update_plan_status(plan_id, PlanStatus::Completed)?;
                session.phase = SessionPhase::SelectingPlan;
                return Ok(Reply::PlanAlreadyCompleted { plan_id });
            }

            let stops = remaining
                .iter()
                .map(|stop| stop.location.name.clone())
                .collect();
            session.phase = SessionPhase::SelectingStart { plan_id, remaining };
            Ok(Reply::StartChoices { plan_id, stops })
        })
    }

    /// Pick the first stop. Choice 0 keeps the stored order; anything else
    /// re-anchors the route at the chosen stop and re-optimizes the rest.
    pub fn select_start(
        &self,
        conversation: ConversationId,
        choice: usize,
    ) -> Result<Reply, ExecutionError> {
        self.sessions.update(conversation, |state| {
            let Some(session) = state.as_mut() else {
                return Err(ExecutionError::SessionExpired(conversation));
            };
            let SessionPhase::SelectingStart { plan_id, remaining } = session.phase.clone() else {
                return Err(ExecutionError::UnexpectedEvent(conversation));
            };
            if choice >= remaining.len() {
                return Err(ExecutionError::InvalidSelection {
                    choice,
                    len: remaining.len(),
                });
            }

            let plan = self
                .plans
                .load_plan(plan_id)?
                .ok_or(ExecutionError::PlanNotFound(plan_id))?;

            let ordered = if choice == 0 {
                remaining
            } else {
                self.re_anchor(remaining, choice)
            };

            self.plans.update_plan_status(plan_id, PlanStatus::Active)?;

            let start = plan.start_location.coordinate;
            let first = ordered[0].location.clone();
            session.phase = SessionPhase::Visiting(VisitProgress {
                plan_id,
                remaining: ordered,
                current: 0,
                current_location: start,
                pending_match: None,
            });

            let leg = self.leg_to(start, first.coordinate)?;
            Ok(Reply::Leg { target: first, leg })
        })
    }

    /// Validate a location update against the current stop's geofence.
    pub fn submit_location(
        &self,
        conversation: ConversationId,
        coordinate: Coordinate,
    ) -> Result<Reply, ExecutionError> {
        let radius = self.config.geofence_radius_meters;
        self.sessions.update(conversation, |state| {
            let Some(session) = state.as_mut() else {
                return Err(ExecutionError::SessionExpired(conversation));
            };
            let SessionPhase::Visiting(progress) = &mut session.phase else {
                return Err(ExecutionError::UnexpectedEvent(conversation));
            };

            let target = progress.remaining[progress.current].location.clone();
            let distance = haversine::great_circle_meters(coordinate, target.coordinate);
            if distance > radius {
                return Ok(Reply::OutsideGeofence {
                    target: target.name,
                    distance_meters: distance,
                    radius_meters: radius,
                });
            }

            // a later update inside the fence overwrites an earlier one
            progress.pending_match = Some(coordinate);
            Ok(Reply::EvidenceRequested {
                target: target.name,
            })
        })
    }

    /// Record photo evidence for the geofence-validated stop and advance.
    pub fn submit_evidence(
        &self,
        conversation: ConversationId,
        evidence_ref: &str,
        coordinate: Coordinate,
    ) -> Result<Reply, ExecutionError> {
        self.sessions.update(conversation, |state| {
            let Some(session) = state.as_mut() else {
                return Err(ExecutionError::SessionExpired(conversation));
            };
            let SessionPhase::Visiting(progress) = &mut session.phase else {
                return Err(ExecutionError::UnexpectedEvent(conversation));
            };
            if progress.pending_match.is_none() {
                return Err(ExecutionError::NoValidatedLocation);
            }

            let stop = progress.remaining[progress.current].clone();
            let completed = self.plans.completed_visit_indices(progress.plan_id)?;
            if completed.contains(&stop.original_index) {
                return Err(ExecutionError::DuplicateEvidence(stop.original_index));
            }

            self.plans.record_visit_execution(&VisitExecutionRecord {
                plan_id: progress.plan_id,
                location_index: stop.original_index,
                timestamp: Utc::now(),
                evidence_photo_ref: evidence_ref.to_string(),
                captured_coordinate: coordinate,
            })?;

            progress.pending_match = None;
            progress.current_location = stop.location.coordinate;
            progress.current += 1;

            if progress.current < progress.remaining.len() {
                let next = progress.remaining[progress.current].location.clone();
                let leg = self.leg_to(progress.current_location, next.coordinate)?;
                return Ok(Reply::Leg { target: next, leg });
            }

            let plan_id = progress.plan_id;
            self.plans
                .update_plan_status(plan_id, PlanStatus::Completed)?;
            *state = None;
            Ok(Reply::Completed { plan_id })
        })
    }

    /// Promote the chosen stop to the front and re-optimize the rest around
    /// it, degrading to an unconstrained pass when the one-way-aware call
    /// fails and to the stored order when both do.
    fn re_anchor(&self, mut remaining: Vec<IndexedStop>, choice: usize) -> Vec<IndexedStop> {
        let chosen = remaining.remove(choice);

        let mut locations = Vec::with_capacity(remaining.len() + 1);
        locations.push(Location::start(
            chosen.location.name.clone(),
            chosen.location.coordinate,
        ));
        locations.extend(remaining.iter().map(|stop| stop.location.clone()));

        let constrained = OptimizeOptions {
            use_road_distance: true,
            avoid_one_way: true,
        };
        let route = match solver::optimize(&locations, &self.router, &constrained) {
            Ok(route) => Some(route),
            Err(err) => {
                warn!(error = %err, "one-way aware re-optimization failed, retrying without the constraint");
                let unconstrained = OptimizeOptions {
                    use_road_distance: true,
                    avoid_one_way: false,
                };
                match solver::optimize(&locations, &self.router, &unconstrained) {
                    Ok(route) => Some(route),
                    Err(err) => {
                        warn!(error = %err, "re-optimization failed, keeping the stored order");
                        None
                    }
                }
            }
        };

        let mut ordered = vec![chosen];
        match route {
            Some(route) => {
                // map optimized stops back to their original plan indices
                let mut pool = remaining;
                for stop in route.stops.into_iter().skip(1) {
                    if let Some(position) = pool.iter().position(|candidate| {
                        candidate.location.name == stop.name
                            && candidate.location.coordinate == stop.coordinate
                    }) {
                        ordered.push(pool.remove(position));
                    }
                }
                ordered.extend(pool);
            }
            None => ordered.extend(remaining),
        }
        ordered
    }

    /// Road guidance for one leg, preferring one-way-clean alternatives and
    /// relaxing the preference when none qualifies.
    fn leg_to(&self, from: Coordinate, to: Coordinate) -> Result<RouteInfo, ExecutionError> {
        let preferred = RoutePreference {
            avoid_one_way: true,
            ..RoutePreference::default()
        };
        match self.router.best_route(from, to, &preferred) {
            Ok(leg) => Ok(leg),
            Err(RoutingError::NoRouteMeetsPreference) => {
                Ok(self
                    .router
                    .best_route(from, to, &RoutePreference::default())?)
            }
            Err(err) => Err(err.into()),
        }
    }
}
