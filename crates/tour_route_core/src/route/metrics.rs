use serde::Serialize;

use crate::{Error, Result, model::RouteStop, route::Route};

pub const DEFAULT_AVERAGE_SPEED_KMH: f64 = 80.0;
const MINUTES_PER_HOUR: f64 = 60.0;

/// Authoritative per-leg travel times from a routing collaborator (road
/// network, traffic). Legs it does not know about use the average-speed
/// estimate.
pub trait TravelTimeSource: Sync {
    fn travel_minutes(&self, from: &RouteStop, to: &RouteStop, distance_km: f64) -> Option<f64>;
}

/// One consecutive pair of stops. `distance_km` and `travel_minutes` are
/// `None` when either end has no coordinate.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Leg {
    pub from_assignment_id: String,
    pub to_assignment_id: String,
    pub distance_km: Option<f64>,
    pub travel_minutes: Option<f64>,
}

impl Leg {
    pub fn is_routed(&self) -> bool {
        self.distance_km.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnroutedLeg {
    pub from_assignment_id: String,
    pub to_assignment_id: String,
}

/// Totals over a route. Only [`RouteMetricsCalculator`] builds these, so the
/// numbers always match the stops they were computed from.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteMetrics {
    total_distance_km: f64,
    total_travel_time_minutes: f64,
    optimization_score: Option<f64>,
    legs: Vec<Leg>,
    unrouted_legs: Vec<UnroutedLeg>,
}

impl RouteMetrics {
    pub fn total_distance_km(&self) -> f64 {
        self.total_distance_km
    }

    pub fn total_travel_time_minutes(&self) -> f64 {
        self.total_travel_time_minutes
    }

    pub fn optimization_score(&self) -> Option<f64> {
        self.optimization_score
    }

    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    pub fn unrouted_legs(&self) -> &[UnroutedLeg] {
        &self.unrouted_legs
    }

    pub fn unrouted_count(&self) -> usize {
        self.unrouted_legs.len()
    }

    pub fn routed_count(&self) -> usize {
        self.legs.len() - self.unrouted_legs.len()
    }
}

#[derive(Clone, Copy)]
pub struct RouteMetricsCalculator<'a> {
    average_speed_kmh: f64,
    travel_times: Option<&'a dyn TravelTimeSource>,
}

impl Default for RouteMetricsCalculator<'_> {
    fn default() -> Self {
        Self {
            average_speed_kmh: DEFAULT_AVERAGE_SPEED_KMH,
            travel_times: None,
        }
    }
}

impl<'a> RouteMetricsCalculator<'a> {
    pub fn new(average_speed_kmh: f64) -> Result<Self> {
        if !average_speed_kmh.is_finite() || average_speed_kmh <= 0.0 {
            return Err(Error::invalid_input(format!(
                "average speed must be a positive number of km/h, got {average_speed_kmh}"
            )));
        }
        Ok(Self {
            average_speed_kmh,
            travel_times: None,
        })
    }

    pub fn with_travel_times(mut self, source: &'a dyn TravelTimeSource) -> Self {
        self.travel_times = Some(source);
        self
    }

    pub fn average_speed_kmh(&self) -> f64 {
        self.average_speed_kmh
    }

    pub fn compute(&self, route: &Route) -> RouteMetrics {
        self.compute_stops(route.stops(), route.optimization_score())
    }

    pub(crate) fn compute_stops(
        &self,
        stops: &[RouteStop],
        optimization_score: Option<f64>,
    ) -> RouteMetrics {
        let mut metrics = RouteMetrics {
            optimization_score,
            ..RouteMetrics::default()
        };

        for pair in stops.windows(2) {
            let (from, to) = (&pair[0], &pair[1]);
            let leg = match (from.coordinate(), to.coordinate()) {
                (Some(a), Some(b)) => {
                    let distance = a.distance_km(&b);
                    let minutes = self.leg_minutes(from, to, distance);
                    metrics.total_distance_km += distance;
                    metrics.total_travel_time_minutes += minutes;
                    Leg {
                        from_assignment_id: from.id().to_owned(),
                        to_assignment_id: to.id().to_owned(),
                        distance_km: Some(distance),
                        travel_minutes: Some(minutes),
                    }
                }
                _ => {
                    metrics.unrouted_legs.push(UnroutedLeg {
                        from_assignment_id: from.id().to_owned(),
                        to_assignment_id: to.id().to_owned(),
                    });
                    Leg {
                        from_assignment_id: from.id().to_owned(),
                        to_assignment_id: to.id().to_owned(),
                        distance_km: None,
                        travel_minutes: None,
                    }
                }
            };
            metrics.legs.push(leg);
        }

        log::debug!(
            "metrics: n={} total_km={:.1} total_min={:.0} routed={} unrouted={}",
            stops.len(),
            metrics.total_distance_km,
            metrics.total_travel_time_minutes,
            metrics.routed_count(),
            metrics.unrouted_count()
        );

        metrics
    }

    /// Total distance of the located stops in order, skipping unlocated ones.
    /// Used for detour ratios, where a gap should not hide a venue's cost.
    pub(crate) fn located_path_km(stops: &[&RouteStop]) -> f64 {
        stops
            .iter()
            .filter_map(|s| s.coordinate())
            .collect::<Vec<_>>()
            .windows(2)
            .map(|w| w[0].distance_km(&w[1]))
            .sum()
    }

    fn leg_minutes(&self, from: &RouteStop, to: &RouteStop, distance_km: f64) -> f64 {
        self.travel_times
            .and_then(|source| source.travel_minutes(from, to, distance_km))
            .filter(|m| m.is_finite() && *m >= 0.0)
            .unwrap_or(distance_km / self.average_speed_kmh * MINUTES_PER_HOUR)
    }
}
