//! Brute-force route optimizer.
//!
//! Enumerates every ordering of the visit set (bounded to keep factorial
//! growth tractable) and keeps the cheapest one whose legs pass the one-way
//! filter, falling back to the cheapest overall when none does.

use rayon::prelude::*;
use tracing::warn;

use crate::error::{OptimizeError, RoutingError};
use crate::haversine;
use crate::oneway::OneWayFilter;
use crate::route::{Location, LocationRole, Route};
use crate::traits::DistanceProvider;

/// Largest input set the brute-force search accepts.
pub const MAX_LOCATIONS: usize = 10;

#[derive(Debug, Clone)]
pub struct OptimizeOptions {
    /// Query the distance provider for road distances instead of great-circle.
    pub use_road_distance: bool,
    /// Reject orderings whose legs trip the one-way filter. Only meaningful
    /// with road distances; straight-line legs carry no steps to inspect.
    pub avoid_one_way: bool,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            use_road_distance: true,
            avoid_one_way: false,
        }
    }
}

/// Find the minimum-cost visiting order over all permutations of the
/// visit-role locations, starting from the single start-role location.
pub fn optimize<D>(
    locations: &[Location],
    provider: &D,
    options: &OptimizeOptions,
) -> Result<Route, OptimizeError>
where
    D: DistanceProvider + Sync,
{
    if locations.len() > MAX_LOCATIONS {
        return Err(OptimizeError::TooManyLocations {
            count: locations.len(),
            max: MAX_LOCATIONS,
        });
    }

    let mut starts = locations.iter().filter(|location| location.is_start());
    let start = starts.next().ok_or(OptimizeError::MissingStart)?;
    if starts.next().is_some() {
        return Err(OptimizeError::MultipleStarts);
    }

    let visits: Vec<&Location> = locations
        .iter()
        .filter(|location| location.role == LocationRole::Visit)
        .collect();

    if visits.is_empty() {
        return Ok(Route {
            stops: vec![start.clone()],
            total_distance_meters: 0.0,
            one_way_fallback: false,
        });
    }

    // Index 0 is the start; 1..=n are the visits in input order.
    let ordered: Vec<&Location> = std::iter::once(start).chain(visits).collect();
    let legs = LegMatrix::prefetch(&ordered, provider, options)?;

    let mut perm: Vec<usize> = (1..ordered.len()).collect();
    let mut best_order = perm.clone();
    let mut best_cost = f64::INFINITY;
    let mut valid_order: Option<Vec<usize>> = None;
    let mut valid_cost = f64::INFINITY;

    heap_permutations(&mut perm, |candidate| {
        let mut cost = 0.0;
        let mut valid = true;
        let mut prev = 0usize;
        for &index in candidate {
            cost += legs.distance(prev, index);
            if options.avoid_one_way && legs.violates(prev, index) {
                valid = false;
            }
            prev = index;
        }

        if cost < best_cost {
            best_cost = cost;
            best_order = candidate.to_vec();
        }
        if valid && cost < valid_cost {
            valid_cost = cost;
            valid_order = Some(candidate.to_vec());
        }
    });

    let (order, cost, one_way_fallback) = match valid_order {
        Some(order) => (order, valid_cost, false),
        None => {
            if options.avoid_one_way {
                warn!("no ordering avoids one-way segments, returning minimum-cost route best-effort");
            }
            (best_order, best_cost, options.avoid_one_way)
        }
    };

    let mut stops = Vec::with_capacity(ordered.len());
    stops.push(start.clone());
    for index in order {
        stops.push(ordered[index].clone());
    }

    Ok(Route {
        stops,
        total_distance_meters: cost,
        one_way_fallback,
    })
}

/// Prefetched leg costs between the start (index 0) and each visit.
///
/// Only the ordered pairs a candidate route can traverse are fetched: start
/// to each visit and every ordered visit pair; nothing routes back into the
/// start. Road lookups run on the rayon pool so slow legs overlap.
struct LegMatrix {
    n: usize,
    distances: Vec<f64>,
    violations: Vec<bool>,
}

impl LegMatrix {
    fn prefetch<D>(
        ordered: &[&Location],
        provider: &D,
        options: &OptimizeOptions,
    ) -> Result<Self, RoutingError>
    where
        D: DistanceProvider + Sync,
    {
        let n = ordered.len();
        let mut pairs = Vec::with_capacity(n * (n - 1));
        for from in 0..n {
            for to in 1..n {
                if from != to {
                    pairs.push((from, to));
                }
            }
        }

        let legs: Vec<((usize, usize), (f64, bool))> = if !options.use_road_distance {
            pairs
                .iter()
                .map(|&(from, to)| {
                    let meters = haversine::great_circle_meters(
                        ordered[from].coordinate,
                        ordered[to].coordinate,
                    );
                    ((from, to), (meters, false))
                })
                .collect()
        } else if options.avoid_one_way {
            let filter = OneWayFilter::default();
            pairs
                .par_iter()
                .map(|&(from, to)| {
                    let info = provider
                        .driving_route(ordered[from].coordinate, ordered[to].coordinate)?;
                    let flagged = filter.violates(&info.steps);
                    Ok(((from, to), (info.distance_meters, flagged)))
                })
                .collect::<Result<Vec<_>, RoutingError>>()?
        } else {
            pairs
                .par_iter()
                .map(|&(from, to)| {
                    let meters = provider
                        .driving_distance(ordered[from].coordinate, ordered[to].coordinate)?;
                    Ok(((from, to), (meters, false)))
                })
                .collect::<Result<Vec<_>, RoutingError>>()?
        };

        let mut distances = vec![0.0; n * n];
        let mut violations = vec![false; n * n];
        for ((from, to), (meters, flagged)) in legs {
            distances[from * n + to] = meters;
            violations[from * n + to] = flagged;
        }

        Ok(Self {
            n,
            distances,
            violations,
        })
    }

    fn distance(&self, from: usize, to: usize) -> f64 {
        self.distances[from * self.n + to]
    }

    fn violates(&self, from: usize, to: usize) -> bool {
        self.violations[from * self.n + to]
    }
}

/// Iterative Heap's algorithm: invokes `visit` for every arrangement of
/// `items`, mutating in place. Order of arrangements is deterministic.
fn heap_permutations<T, F>(items: &mut [T], mut visit: F)
where
    F: FnMut(&[T]),
{
    let n = items.len();
    let mut counters = vec![0usize; n];

    visit(items);
    let mut i = 0;
    while i < n {
        if counters[i] < i {
            if i % 2 == 0 {
                items.swap(0, i);
            } else {
                items.swap(counters[i], i);
            }
            visit(items);
            counters[i] += 1;
            i = 0;
        } else {
            counters[i] = 0;
            i += 1;
        }
    }
}
