//! Sequence construction and validation.
//!
//! Two ways to get a new order for a tour: accept the remote optimizer's
//! proposal after checking it against the current assignments, or build the
//! local longitude heuristic when no proposal is available. Both end in
//! [`OptimizationResult`], whose stops are densely renumbered from 0 and
//! whose metrics are recomputed from those stops.

use std::{
    collections::{HashMap, VecDeque},
    fmt,
};

use chrono::NaiveDate;
use serde::Serialize;
use tour_route_derive::CliValue;

use crate::{
    Error, Result,
    geo::GeoCoordinate,
    model::{RouteStop, Venue, VenueCatalog},
    optimizer::{RemoteEstimate, RemoteOptimization},
    route::{DEFAULT_AVERAGE_SPEED_KMH, Route, RouteMetrics, RouteMetricsCalculator},
    status::VenueStatus,
};

/// Stops with both a location and a date needed before optimizing at all.
pub const MIN_SCHEDULABLE_STOPS: usize = 2;
/// Located stops needed before reordering is attempted.
pub const MIN_REORDERABLE_STOPS: usize = 3;

/// Detour-ratio cut-offs mapping a flexible venue to a priority hold.
/// A ratio below `hold1_below` recommends hold 1, and so on; anything at or
/// above `hold3_below` recommends hold 4.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldThresholds {
    pub hold1_below: f64,
    pub hold2_below: f64,
    pub hold3_below: f64,
}

impl Default for HoldThresholds {
    fn default() -> Self {
        Self {
            hold1_below: 1.1,
            hold2_below: 1.3,
            hold3_below: 1.5,
        }
    }
}

impl HoldThresholds {
    pub fn validate(&self) -> Result<()> {
        let ordered = self.hold1_below.is_finite()
            && self.hold3_below.is_finite()
            && self.hold1_below <= self.hold2_below
            && self.hold2_below <= self.hold3_below;
        if ordered {
            Ok(())
        } else {
            Err(Error::invalid_input(format!(
                "hold thresholds must be finite and ascending, got {} / {} / {}",
                self.hold1_below, self.hold2_below, self.hold3_below
            )))
        }
    }
}

pub fn recommend_hold(detour_ratio: f64, thresholds: &HoldThresholds) -> VenueStatus {
    if detour_ratio < thresholds.hold1_below {
        VenueStatus::Hold1
    } else if detour_ratio < thresholds.hold2_below {
        VenueStatus::Hold2
    } else if detour_ratio < thresholds.hold3_below {
        VenueStatus::Hold3
    } else {
        VenueStatus::Hold4
    }
}

/// Route distance with the stop at `idx` divided by the distance without it.
///
/// `None` when the stop has no location or the route without it has no
/// length to compare against.
pub fn detour_ratio(stops: &[RouteStop], idx: usize) -> Option<f64> {
    stops.get(idx)?.coordinate()?;
    let with: Vec<&RouteStop> = stops.iter().collect();
    let without: Vec<&RouteStop> = stops
        .iter()
        .enumerate()
        .filter_map(|(i, s)| (i != idx).then_some(s))
        .collect();

    let baseline = RouteMetricsCalculator::located_path_km(&without);
    if baseline <= 0.0 {
        return None;
    }
    Some(RouteMetricsCalculator::located_path_km(&with) / baseline)
}

/// Which assignments are pinned in place while reordering.
///
/// Sources disagree between confirmed shows only and the wider
/// confirmed + booked + planning reading, so both are selectable. The wider
/// rule maps onto the status set as: `booked` is any priority hold (a date is
/// held for the act), `planning` has no status that carries a date and adds
/// nothing.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, CliValue)]
#[cli_value(option = "anchor-rule")]
pub enum AnchorRule {
    #[default]
    #[cli(name = "confirmed")]
    ConfirmedOnly,
    #[cli(name = "confirmed-booked-planning")]
    ConfirmedBookedPlanning,
}

impl AnchorRule {
    pub fn statuses(self) -> Vec<VenueStatus> {
        match self {
            Self::ConfirmedOnly => vec![VenueStatus::Confirmed],
            Self::ConfirmedBookedPlanning => {
                let mut statuses = vec![VenueStatus::Confirmed];
                statuses.extend(VenueStatus::HOLDS);
                statuses
            }
        }
    }
}

/// Configuration for sequencing. `anchor_statuses` decides which
/// assignments are pinned in place; it defaults to [`AnchorRule::ConfirmedOnly`].
#[derive(Clone, Debug, PartialEq)]
pub struct SequenceConfig {
    pub anchor_statuses: Vec<VenueStatus>,
    pub hold_thresholds: HoldThresholds,
    pub average_speed_kmh: f64,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            anchor_statuses: AnchorRule::default().statuses(),
            hold_thresholds: HoldThresholds::default(),
            average_speed_kmh: DEFAULT_AVERAGE_SPEED_KMH,
        }
    }
}

impl SequenceConfig {
    pub fn is_anchor(&self, status: VenueStatus) -> bool {
        self.anchor_statuses.contains(&status)
    }
}

/// Where an ordering came from. Surfaced to users so a heuristic order is
/// never mistaken for an optimized one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PlanSource {
    NoOp,
    LocalFallback { reason: String },
    Remote { degraded: bool },
}

impl PlanSource {
    pub fn label(&self) -> &'static str {
        match self {
            Self::NoOp => "Original order (too few located venues to reorder)",
            Self::LocalFallback { .. } => {
                "Local fallback ordering: confirmed shows kept in place, other venues placed \
                 west to east by longitude. Not an optimized route."
            }
            Self::Remote { degraded: false } => "Optimized route",
            Self::Remote { degraded: true } => {
                "Optimizer returned its own fallback ordering (remote service degraded)"
            }
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(
            self,
            Self::LocalFallback { .. } | Self::Remote { degraded: true }
        )
    }
}

impl fmt::Display for PlanSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoOp => f.write_str("no-op"),
            Self::LocalFallback { .. } => f.write_str("local-fallback"),
            Self::Remote { degraded: false } => f.write_str("remote"),
            Self::Remote { degraded: true } => f.write_str("remote-degraded"),
        }
    }
}

/// A venue the optimizer proposes adding; not yet part of the tour.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FillVenue {
    pub venue_id: String,
    pub venue: Option<Venue>,
    pub suggested_date: Option<NaiveDate>,
    pub suggested_sequence: Option<u32>,
    pub detour_ratio: Option<f64>,
    pub status: Option<VenueStatus>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldRecommendation {
    pub assignment_id: String,
    pub venue_id: String,
    pub current: VenueStatus,
    pub detour_ratio: f64,
    pub recommended: VenueStatus,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationResult {
    source: PlanSource,
    route: Route,
    metrics: RouteMetrics,
    potential_fill_venues: Vec<FillVenue>,
    suggested_skips: Vec<String>,
    recommendations: Vec<HoldRecommendation>,
    reasoning: Option<String>,
    remote_estimate: Option<RemoteEstimate>,
    #[serde(skip)]
    anchor_ids: Vec<String>,
}

impl OptimizationResult {
    pub fn source(&self) -> &PlanSource {
        &self.source
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn metrics(&self) -> &RouteMetrics {
        &self.metrics
    }

    pub fn potential_fill_venues(&self) -> &[FillVenue] {
        &self.potential_fill_venues
    }

    pub fn suggested_skips(&self) -> &[String] {
        &self.suggested_skips
    }

    pub fn recommendations(&self) -> &[HoldRecommendation] {
        &self.recommendations
    }

    pub fn reasoning(&self) -> Option<&str> {
        self.reasoning.as_deref()
    }

    pub fn remote_estimate(&self) -> Option<&RemoteEstimate> {
        self.remote_estimate.as_ref()
    }

    /// Stops pinned in place for this pass.
    pub fn fixed_points(&self) -> Vec<&RouteStop> {
        self.route
            .stops()
            .iter()
            .filter(|s| self.anchor_ids.iter().any(|id| id == s.id()))
            .collect()
    }
}

pub struct SequenceBuilder<'a> {
    config: SequenceConfig,
    calculator: RouteMetricsCalculator<'a>,
}

impl<'a> SequenceBuilder<'a> {
    pub fn new(config: SequenceConfig) -> Result<Self> {
        config.hold_thresholds.validate()?;
        let calculator = RouteMetricsCalculator::new(config.average_speed_kmh)?;
        Ok(Self { config, calculator })
    }

    pub fn with_calculator(mut self, calculator: RouteMetricsCalculator<'a>) -> Self {
        self.calculator = calculator;
        self
    }

    pub fn config(&self) -> &SequenceConfig {
        &self.config
    }

    pub fn calculator(&self) -> &RouteMetricsCalculator<'a> {
        &self.calculator
    }

    pub fn check_preconditions(&self, route: &Route) -> Result<()> {
        let found = route.stops().iter().filter(|s| s.is_schedulable()).count();
        if found < MIN_SCHEDULABLE_STOPS {
            return Err(Error::InsufficientData {
                required: MIN_SCHEDULABLE_STOPS,
                found,
            });
        }
        Ok(())
    }

    pub fn is_reorderable(&self, route: &Route) -> bool {
        let located = route
            .stops()
            .iter()
            .filter(|s| s.coordinate().is_some())
            .count();
        located >= MIN_REORDERABLE_STOPS
    }

    /// Current order, renumbered, with metrics as they stand.
    pub fn no_op(&self, route: &Route) -> OptimizationResult {
        self.finalize(route, route.stops().to_vec(), PlanSource::NoOp)
    }

    /// Deterministic longitude ordering around the anchors.
    ///
    /// Anchors keep their relative order. Each located flexible stop goes
    /// into the anchor gap with the cheapest longitude insertion cost (zero
    /// when it lies between the two bracketing anchors), earliest gap on
    /// ties. Inside a gap stops run west to east. Flexible stops without a
    /// location are appended at the end in their current order.
    pub fn local_fallback(&self, route: &Route, reason: impl Into<String>) -> OptimizationResult {
        if !self.is_reorderable(route) {
            return self.no_op(route);
        }

        let anchors = self.anchors_in_order(route.stops());
        let flexible = route
            .stops()
            .iter()
            .filter(|s| !self.config.is_anchor(s.status()));

        let mut gaps: Vec<Vec<(f64, &RouteStop)>> = vec![Vec::new(); anchors.len() + 1];
        let mut unlocated = Vec::new();
        for stop in flexible {
            match stop.longitude() {
                Some(lon) => gaps[best_gap(&anchors, lon)].push((lon, stop)),
                None => unlocated.push(stop),
            }
        }

        let mut ordered = Vec::with_capacity(route.len());
        for (idx, mut gap) in gaps.into_iter().enumerate() {
            gap.sort_by(|a, b| a.0.total_cmp(&b.0));
            ordered.extend(gap.into_iter().map(|(_, s)| s.clone()));
            if let Some(anchor) = anchors.get(idx) {
                ordered.push((*anchor).clone());
            }
        }
        ordered.extend(unlocated.into_iter().cloned());

        log::debug!(
            "sequence.fallback: tour={} n={} anchors={}",
            route.tour_id(),
            ordered.len(),
            anchors.len()
        );

        self.finalize(
            route,
            ordered,
            PlanSource::LocalFallback {
                reason: reason.into(),
            },
        )
    }

    /// Checks a remote proposal against the current assignments and builds
    /// the resulting route.
    ///
    /// Rejected with [`Error::ApplyConflict`] when the proposal's venues are
    /// not exactly the tour's venues, or when anchors would change relative
    /// order.
    pub fn validate_remote(
        &self,
        route: &Route,
        remote: &RemoteOptimization,
        catalog: &VenueCatalog,
    ) -> Result<OptimizationResult> {
        let mut ordered = self.reorder_by_venue_ids(route, &remote.optimized_sequence)?;
        self.ensure_anchor_order(route.stops(), &ordered)?;

        for stop in ordered.iter_mut() {
            let Some(date) = remote.suggested_dates.get(stop.venue_id()) else {
                continue;
            };
            if self.config.is_anchor(stop.status()) {
                if stop.date() != Some(*date) {
                    log::debug!(
                        "sequence.remote: ignoring date change for anchor assignment={}",
                        stop.id()
                    );
                }
                continue;
            }
            stop.assignment.date = Some(*date);
        }

        let source = PlanSource::Remote {
            degraded: remote.is_degraded(),
        };
        let mut result = self.finalize(route, ordered, source);

        let venue_ids = route.venue_ids();
        let fill_venues = remote
            .recommended_venues
            .iter()
            .filter(|id| !venue_ids.contains(id.as_str()))
            .map(|id| self.fill_venue(&result.route, id, remote, catalog))
            .collect();
        result.potential_fill_venues = fill_venues;
        result.suggested_skips = remote
            .suggested_skips
            .iter()
            .filter(|id| venue_ids.contains(id.as_str()))
            .cloned()
            .collect();
        let reasoning = remote.reasoning.trim();
        result.reasoning = (!reasoning.is_empty()).then(|| reasoning.to_owned());
        result.remote_estimate = Some(remote.estimate());

        log::info!(
            "sequence.remote: accepted tour={} n={} fill={} skips={} degraded={}",
            route.tour_id(),
            result.route.len(),
            result.potential_fill_venues.len(),
            result.suggested_skips.len(),
            remote.is_degraded()
        );
        Ok(result)
    }

    fn reorder_by_venue_ids(&self, route: &Route, sequence: &[String]) -> Result<Vec<RouteStop>> {
        let mut by_venue: HashMap<&str, VecDeque<&RouteStop>> = HashMap::new();
        for stop in route.stops() {
            by_venue.entry(stop.venue_id()).or_default().push_back(stop);
        }

        let mut ordered = Vec::with_capacity(route.len());
        for venue_id in sequence {
            let stop = by_venue
                .get_mut(venue_id.as_str())
                .and_then(VecDeque::pop_front)
                .ok_or_else(|| {
                    Error::apply_conflict(format!(
                        "venue {venue_id} is not (or no longer) assigned to tour {} or is listed twice",
                        route.tour_id()
                    ))
                })?;
            ordered.push(stop.clone());
        }

        let mut missing: Vec<&str> = by_venue
            .iter()
            .filter(|(_, left)| !left.is_empty())
            .map(|(id, _)| *id)
            .collect();
        if !missing.is_empty() {
            missing.sort_unstable();
            return Err(Error::apply_conflict(format!(
                "result omits venues assigned to tour {}: {}",
                route.tour_id(),
                missing.join(", ")
            )));
        }
        Ok(ordered)
    }

    /// Anchors in their committed order: stored sequence first, then date,
    /// then route position. Stops without a sequence follow those with one.
    fn anchors_in_order<'r>(&self, stops: &'r [RouteStop]) -> Vec<&'r RouteStop> {
        let mut anchors: Vec<&RouteStop> = stops
            .iter()
            .filter(|s| self.config.is_anchor(s.status()))
            .collect();
        anchors.sort_by_key(|s| {
            let (sequence, date) = (s.sequence(), s.date());
            (sequence.is_none(), sequence, date.is_none(), date)
        });
        anchors
    }

    fn ensure_anchor_order(&self, before: &[RouteStop], after: &[RouteStop]) -> Result<()> {
        let expected: Vec<&str> = self
            .anchors_in_order(before)
            .into_iter()
            .map(RouteStop::id)
            .collect();
        let proposed: Vec<&str> = after
            .iter()
            .filter(|s| self.config.is_anchor(s.status()))
            .map(RouteStop::id)
            .collect();
        if expected != proposed {
            return Err(Error::apply_conflict(
                "result changes the relative order of confirmed shows",
            ));
        }
        Ok(())
    }

    fn fill_venue(
        &self,
        route: &Route,
        venue_id: &str,
        remote: &RemoteOptimization,
        catalog: &VenueCatalog,
    ) -> FillVenue {
        let venue = catalog.get(venue_id).cloned();
        let insertion = venue
            .as_ref()
            .and_then(|v| v.coordinate)
            .and_then(|c| cheapest_insertion(route.stops(), c));

        FillVenue {
            venue_id: venue_id.to_owned(),
            venue,
            suggested_date: remote.suggested_dates.get(venue_id).copied(),
            suggested_sequence: insertion.map(|(position, _)| position as u32),
            detour_ratio: insertion.map(|(_, ratio)| ratio),
            status: Some(
                insertion
                    .map(|(_, ratio)| recommend_hold(ratio, &self.config.hold_thresholds))
                    .unwrap_or(VenueStatus::Suggested),
            ),
        }
    }

    fn finalize(&self, route: &Route, mut stops: Vec<RouteStop>, source: PlanSource) -> OptimizationResult {
        for (idx, stop) in stops.iter_mut().enumerate() {
            stop.assignment.sequence = Some(idx as u32);
        }

        // A proposed order has no score of its own until the tour is rescored.
        let metrics = self.calculator.compute_stops(&stops, None);

        if let Some(first) = stops.first_mut() {
            first.assignment.travel_distance_from_previous = None;
            first.assignment.travel_time_from_previous = None;
        }
        for (stop, leg) in stops.iter_mut().skip(1).zip(metrics.legs()) {
            stop.assignment.travel_distance_from_previous = leg.distance_km;
            stop.assignment.travel_time_from_previous = leg.travel_minutes;
        }

        let recommendations = self.recommendations(&stops);
        let anchor_ids = stops
            .iter()
            .filter(|s| self.config.is_anchor(s.status()))
            .map(|s| s.id().to_owned())
            .collect();

        OptimizationResult {
            source,
            route: Route::from_ordered(route.tour_id(), route.optimization_score(), stops),
            metrics,
            potential_fill_venues: Vec::new(),
            suggested_skips: Vec::new(),
            recommendations,
            reasoning: None,
            remote_estimate: None,
            anchor_ids,
        }
    }

    fn recommendations(&self, stops: &[RouteStop]) -> Vec<HoldRecommendation> {
        stops
            .iter()
            .enumerate()
            .filter(|(_, s)| !self.config.is_anchor(s.status()) && !s.status().is_terminal())
            .filter_map(|(idx, s)| {
                let ratio = detour_ratio(stops, idx)?;
                Some(HoldRecommendation {
                    assignment_id: s.id().to_owned(),
                    venue_id: s.venue_id().to_owned(),
                    current: s.status(),
                    detour_ratio: ratio,
                    recommended: recommend_hold(ratio, &self.config.hold_thresholds),
                })
            })
            .collect()
    }
}

fn best_gap(anchors: &[&RouteStop], lon: f64) -> usize {
    let mut best: Option<(f64, usize)> = None;
    for gap in 0..=anchors.len() {
        let left = gap
            .checked_sub(1)
            .and_then(|i| anchors.get(i))
            .and_then(|a| a.longitude());
        let right = anchors.get(gap).and_then(|a| a.longitude());
        let cost = match (left, right) {
            (Some(l), Some(r)) => ((lon - l).abs() + (lon - r).abs() - (l - r).abs()).max(0.0),
            (Some(x), None) | (None, Some(x)) => (lon - x).abs(),
            (None, None) => continue,
        };
        if best.is_none_or(|(best_cost, _)| cost < best_cost) {
            best = Some((cost, gap));
        }
    }
    best.map_or(anchors.len(), |(_, gap)| gap)
}

/// Best route position to insert a new located venue and the detour ratio
/// it causes. Unlocated stops keep their place and are skipped for distance.
fn cheapest_insertion(stops: &[RouteStop], candidate: GeoCoordinate) -> Option<(usize, f64)> {
    let located: Vec<(usize, GeoCoordinate)> = stops
        .iter()
        .enumerate()
        .filter_map(|(idx, s)| s.coordinate().map(|c| (idx, c)))
        .collect();
    let baseline: f64 = located.windows(2).map(|w| w[0].1.distance_km(&w[1].1)).sum();
    if baseline <= 0.0 {
        return None;
    }

    let mut best: Option<(usize, f64)> = None;
    for position in 0..=located.len() {
        let prev = position.checked_sub(1).map(|i| located[i].1);
        let added = match (prev, located.get(position).map(|l| l.1)) {
            (Some(prev), Some(next)) => {
                prev.distance_km(&candidate) + candidate.distance_km(&next) - prev.distance_km(&next)
            }
            (Some(prev), None) => prev.distance_km(&candidate),
            (None, Some(next)) => candidate.distance_km(&next),
            (None, None) => continue,
        };
        if best.is_none_or(|(_, best_added)| added < best_added) {
            best = Some((position, added));
        }
    }

    best.map(|(position, added)| {
        let route_idx = match located.get(position) {
            Some((idx, _)) => *idx,
            None => located.last().map_or(0, |(idx, _)| idx + 1),
        };
        (route_idx, (baseline + added) / baseline)
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::NaiveDate;

    use super::{
        AnchorRule, HoldThresholds, PlanSource, SequenceBuilder, SequenceConfig, detour_ratio,
        recommend_hold,
    };
    use crate::{
        Error,
        geo::{GeoCoordinate, distance_km},
        model::{Venue, VenueCatalog},
        optimizer::RemoteOptimization,
        route::{
            Route,
            test_support::{ids, stop, with_date, with_sequence},
        },
        status::VenueStatus,
    };

    fn builder() -> SequenceBuilder<'static> {
        SequenceBuilder::new(SequenceConfig::default()).expect("default config is valid")
    }

    /// A(seq0, confirmed) at -100, B(potential) at -90, C(seq1, confirmed) at -80.
    fn anchored_route() -> Route {
        Route::new(
            "t1",
            vec![
                with_date(
                    with_sequence(stop("A", VenueStatus::Confirmed, Some((40.0, -100.0))), 0),
                    2026,
                    5,
                    1,
                ),
                stop("B", VenueStatus::Potential, Some((41.0, -90.0))),
                with_date(
                    with_sequence(stop("C", VenueStatus::Confirmed, Some((39.0, -80.0))), 1),
                    2026,
                    5,
                    4,
                ),
            ],
        )
    }

    fn remote(sequence: &[&str]) -> RemoteOptimization {
        RemoteOptimization {
            optimized_sequence: sequence.iter().map(|s| s.to_string()).collect(),
            ..RemoteOptimization::default()
        }
    }

    #[test]
    fn hold_thresholds_map_ratios_to_ranks() {
        let t = HoldThresholds::default();
        assert_eq!(recommend_hold(1.0, &t), VenueStatus::Hold1);
        assert_eq!(recommend_hold(1.1, &t), VenueStatus::Hold2);
        assert_eq!(recommend_hold(1.29, &t), VenueStatus::Hold2);
        assert_eq!(recommend_hold(1.3, &t), VenueStatus::Hold3);
        assert_eq!(recommend_hold(1.5, &t), VenueStatus::Hold4);
        assert_eq!(recommend_hold(3.0, &t), VenueStatus::Hold4);
    }

    #[test]
    fn hold_thresholds_are_overridable() {
        let strict = HoldThresholds {
            hold1_below: 1.01,
            hold2_below: 1.05,
            hold3_below: 1.2,
        };
        assert_eq!(recommend_hold(1.08, &strict), VenueStatus::Hold3);
        assert!(
            HoldThresholds {
                hold1_below: 1.5,
                hold2_below: 1.3,
                hold3_below: 1.1,
            }
            .validate()
            .is_err()
        );
    }

    #[test]
    fn preconditions_need_two_located_and_dated_stops() {
        let route = Route::new(
            "t1",
            vec![
                with_date(stop("a", VenueStatus::Confirmed, Some((1.0, 1.0))), 2026, 1, 1),
                with_date(stop("b", VenueStatus::Confirmed, None), 2026, 1, 2),
                stop("c", VenueStatus::Potential, Some((2.0, 2.0))),
            ],
        );
        match builder().check_preconditions(&route) {
            Err(Error::InsufficientData { required, found }) => {
                assert_eq!(required, 2);
                assert_eq!(found, 1);
            }
            other => panic!("expected InsufficientData, got {other:?}"),
        }
        builder()
            .check_preconditions(&anchored_route())
            .expect("two dated anchors");
    }

    #[test]
    fn fewer_than_three_located_stops_is_a_no_op() {
        let route = Route::new(
            "t1",
            vec![
                stop("b", VenueStatus::Potential, Some((0.0, 5.0))),
                stop("a", VenueStatus::Confirmed, Some((0.0, 1.0))),
                stop("x", VenueStatus::Potential, None),
            ],
        );
        let result = builder().local_fallback(&route, "test");
        assert_eq!(result.source(), &PlanSource::NoOp);
        assert_eq!(ids(result.route().stops()), ["b", "a", "x"]);
        let sequences: Vec<_> = result.route().stops().iter().map(|s| s.sequence()).collect();
        assert_eq!(sequences, [Some(0), Some(1), Some(2)]);
    }

    #[test]
    fn fallback_inserts_flexible_between_anchors_by_longitude() {
        let result = builder().local_fallback(&anchored_route(), "optimizer unreachable");
        assert_eq!(ids(result.route().stops()), ["A", "B", "C"]);
        assert!(result.source().is_fallback());
        assert!(result.source().label().contains("Not an optimized route"));

        let expected = distance_km(
            GeoCoordinate::new(40.0, -100.0),
            GeoCoordinate::new(41.0, -90.0),
        ) + distance_km(
            GeoCoordinate::new(41.0, -90.0),
            GeoCoordinate::new(39.0, -80.0),
        );
        assert!((result.metrics().total_distance_km() - expected).abs() < 0.5);
        assert_eq!(
            result
                .fixed_points()
                .iter()
                .map(|s| s.id())
                .collect::<Vec<_>>(),
            ["A", "C"]
        );
    }

    #[test]
    fn fallback_never_reorders_anchors() {
        for lon in [-120.0, -100.0, -95.0, -80.0, -60.0] {
            let route = Route::new(
                "t1",
                vec![
                    with_sequence(stop("A", VenueStatus::Confirmed, Some((40.0, -100.0))), 0),
                    stop("B", VenueStatus::Potential, Some((41.0, lon))),
                    with_sequence(stop("C", VenueStatus::Confirmed, Some((39.0, -80.0))), 1),
                ],
            );
            let result = builder().local_fallback(&route, "test");
            let order = ids(result.route().stops());
            let a = order.iter().position(|id| *id == "A").expect("A kept");
            let c = order.iter().position(|id| *id == "C").expect("C kept");
            assert!(a < c, "lon={lon} order={order:?}");
        }
    }

    #[test]
    fn fallback_places_outliers_on_the_near_side_and_sorts_within_gap() {
        let route = Route::new(
            "t1",
            vec![
                stop("east", VenueStatus::Hold2, Some((40.0, -70.0))),
                with_sequence(stop("A", VenueStatus::Confirmed, Some((40.0, -100.0))), 0),
                stop("mid2", VenueStatus::Potential, Some((40.0, -85.0))),
                stop("west", VenueStatus::Suggested, Some((40.0, -110.0))),
                stop("nowhere", VenueStatus::Potential, None),
                stop("mid1", VenueStatus::Negotiating, Some((40.0, -95.0))),
                with_sequence(stop("C", VenueStatus::Confirmed, Some((40.0, -80.0))), 1),
            ],
        );
        let result = builder().local_fallback(&route, "test");
        assert_eq!(
            ids(result.route().stops()),
            ["west", "A", "mid1", "mid2", "C", "east", "nowhere"]
        );
        assert_eq!(result.metrics().unrouted_count(), 1);
        let last = result.route().stops().last().expect("stops");
        assert_eq!(last.assignment.travel_distance_from_previous, None);
        assert_eq!(result.route().stops()[0].assignment.travel_distance_from_previous, None);
        assert!(result.route().stops()[1].assignment.travel_distance_from_previous.is_some());
    }

    #[test]
    fn fallback_without_anchors_sorts_west_to_east() {
        let route = Route::new(
            "t1",
            vec![
                stop("c", VenueStatus::Potential, Some((0.0, 3.0))),
                stop("a", VenueStatus::Potential, Some((0.0, 1.0))),
                stop("b", VenueStatus::Potential, Some((0.0, 2.0))),
            ],
        );
        let result = builder().local_fallback(&route, "test");
        assert_eq!(ids(result.route().stops()), ["a", "b", "c"]);
    }

    #[test]
    fn anchor_statuses_are_configurable() {
        let config = SequenceConfig {
            anchor_statuses: vec![VenueStatus::Confirmed, VenueStatus::Hold1],
            ..SequenceConfig::default()
        };
        let builder = SequenceBuilder::new(config).expect("valid");
        let route = Route::new(
            "t1",
            vec![
                with_sequence(stop("h", VenueStatus::Hold1, Some((0.0, 5.0))), 0),
                with_sequence(stop("p", VenueStatus::Potential, Some((0.0, 1.0))), 1),
                with_sequence(stop("c", VenueStatus::Confirmed, Some((0.0, 3.0))), 2),
            ],
        );
        let result = builder.local_fallback(&route, "test");
        let order = ids(result.route().stops());
        assert!(order.iter().position(|id| *id == "h") < order.iter().position(|id| *id == "c"));
    }

    #[test]
    fn remote_result_is_renumbered_and_dated() {
        let mut response = remote(&["v-A", "v-B", "v-C"]);
        let date = NaiveDate::from_ymd_opt(2026, 5, 2).expect("date");
        response.suggested_dates = BTreeMap::from([
            ("v-B".to_string(), date),
            ("v-A".to_string(), NaiveDate::from_ymd_opt(2030, 1, 1).expect("date")),
        ]);
        response.reasoning = "  shorter  ".into();

        let result = builder()
            .validate_remote(&anchored_route(), &response, &VenueCatalog::new())
            .expect("valid remote result");

        assert_eq!(result.source(), &PlanSource::Remote { degraded: false });
        let stops = result.route().stops();
        assert_eq!(ids(stops), ["A", "B", "C"]);
        assert_eq!(stops[1].date(), Some(date));
        assert_eq!(stops[0].date(), NaiveDate::from_ymd_opt(2026, 5, 1));
        assert_eq!(
            stops.iter().map(|s| s.sequence()).collect::<Vec<_>>(),
            [Some(0), Some(1), Some(2)]
        );
        assert_eq!(result.reasoning(), Some("shorter"));
    }

    #[test]
    fn remote_result_with_ai_error_is_degraded_but_applied() {
        let mut response = remote(&["v-A", "v-B", "v-C"]);
        response.ai_error = Some(serde_json::json!("model timeout"));
        let result = builder()
            .validate_remote(&anchored_route(), &response, &VenueCatalog::new())
            .expect("degraded result still valid");
        assert_eq!(result.source(), &PlanSource::Remote { degraded: true });
        assert!(result.source().is_fallback());
    }

    #[test]
    fn remote_result_with_stale_venue_set_conflicts() {
        let route = anchored_route();
        let catalog = VenueCatalog::new();
        for sequence in [
            vec!["v-A", "v-C"],
            vec!["v-A", "v-B", "v-C", "v-D"],
            vec!["v-A", "v-B", "v-B", "v-C"],
        ] {
            let err = builder()
                .validate_remote(&route, &remote(&sequence), &catalog)
                .expect_err("stale result");
            assert!(matches!(err, Error::ApplyConflict(_)), "{sequence:?}: {err}");
        }
    }

    #[test]
    fn remote_result_reordering_anchors_conflicts() {
        let err = builder()
            .validate_remote(
                &anchored_route(),
                &remote(&["v-C", "v-B", "v-A"]),
                &VenueCatalog::new(),
            )
            .expect_err("anchor order changed");
        assert!(err.to_string().contains("confirmed shows"));
    }

    #[test]
    fn recommended_venues_outside_tour_become_fill_venues() {
        let mut response = remote(&["v-A", "v-B", "v-C"]);
        response.recommended_venues = vec!["v-B".into(), "v-new".into(), "v-unknown".into()];
        response.suggested_skips = vec!["v-B".into(), "v-gone".into()];

        let mut catalog = VenueCatalog::new();
        catalog.insert(
            "v-new".into(),
            Venue::new("v-new".into(), "New Hall".into(), "Midway".into())
                .with_coordinate(GeoCoordinate::new(40.5, -95.0)),
        );

        let result = builder()
            .validate_remote(&anchored_route(), &response, &catalog)
            .expect("valid");

        let fills = result.potential_fill_venues();
        assert_eq!(fills.len(), 2);
        assert_eq!(fills[0].venue_id, "v-new");
        assert_eq!(fills[0].suggested_sequence, Some(1));
        let ratio = fills[0].detour_ratio.expect("located fill venue");
        assert!(ratio >= 1.0 && ratio < 1.1, "ratio={ratio}");
        assert_eq!(fills[0].status, Some(VenueStatus::Hold1));
        assert_eq!(fills[1].venue_id, "v-unknown");
        assert_eq!(fills[1].detour_ratio, None);
        assert_eq!(fills[1].status, Some(VenueStatus::Suggested));
        assert_eq!(result.suggested_skips(), ["v-B".to_string()]);
    }

    #[test]
    fn wider_anchor_rule_pins_held_dates() {
        let config = SequenceConfig {
            anchor_statuses: AnchorRule::ConfirmedBookedPlanning.statuses(),
            ..SequenceConfig::default()
        };
        assert!(config.is_anchor(VenueStatus::Hold3));
        assert!(!config.is_anchor(VenueStatus::Potential));
        assert!(!SequenceConfig::default().is_anchor(VenueStatus::Hold1));
        assert_eq!(
            AnchorRule::parse("confirmed-booked-planning").expect("rule"),
            AnchorRule::ConfirmedBookedPlanning
        );

        let route = Route::new(
            "t1",
            vec![
                with_sequence(stop("A", VenueStatus::Confirmed, Some((40.0, -100.0))), 0),
                with_sequence(stop("H", VenueStatus::Hold2, Some((39.0, -80.0))), 1),
                with_sequence(stop("B", VenueStatus::Potential, Some((41.0, -90.0))), 2),
            ],
        );
        let result = SequenceBuilder::new(config)
            .expect("config")
            .local_fallback(&route, "test");
        assert_eq!(ids(result.route().stops()), ["A", "B", "H"]);
        let fixed: Vec<&str> = result.fixed_points().into_iter().map(|s| s.id()).collect();
        assert_eq!(fixed, ["A", "H"]);
    }

    #[test]
    fn fallback_keeps_anchor_sequence_over_input_order() {
        let route = Route::new(
            "t1",
            vec![
                with_sequence(stop("C", VenueStatus::Confirmed, Some((39.0, -80.0))), 1),
                stop("B", VenueStatus::Potential, Some((41.0, -90.0))),
                with_sequence(stop("A", VenueStatus::Confirmed, Some((40.0, -100.0))), 0),
            ],
        );
        assert_eq!(ids(route.stops()), ["C", "B", "A"]);

        let result = builder().local_fallback(&route, "test");
        assert_eq!(ids(result.route().stops()), ["A", "B", "C"]);

        let err = builder()
            .validate_remote(&route, &remote(&["v-C", "v-B", "v-A"]), &VenueCatalog::new())
            .expect_err("anchors out of sequence");
        assert!(matches!(err, Error::ApplyConflict(_)));
    }

    #[test]
    fn fill_venue_position_counts_unlocated_stops() {
        let route = Route::new(
            "t1",
            vec![
                with_sequence(stop("X", VenueStatus::Potential, None), 0),
                with_sequence(stop("A", VenueStatus::Confirmed, Some((40.0, -100.0))), 1),
                with_sequence(stop("C", VenueStatus::Confirmed, Some((39.0, -80.0))), 2),
            ],
        );
        let mut response = remote(&["v-X", "v-A", "v-C"]);
        response.recommended_venues = vec!["v-mid".into()];
        let mut catalog = VenueCatalog::new();
        catalog.insert(
            "v-mid".into(),
            Venue::new("v-mid".into(), "Mid Hall".into(), "Midway".into())
                .with_coordinate(GeoCoordinate::new(40.0, -90.0)),
        );

        let result = builder()
            .validate_remote(&route, &response, &catalog)
            .expect("valid");
        assert_eq!(ids(result.route().stops()), ["X", "A", "C"]);
        assert_eq!(result.potential_fill_venues()[0].suggested_sequence, Some(2));
    }

    #[test]
    fn planned_metrics_carry_no_score() {
        let route = anchored_route().with_optimization_score(64.0);
        let result = builder().local_fallback(&route, "test");
        assert_eq!(result.metrics().optimization_score(), None);
        assert_eq!(result.route().optimization_score(), Some(64.0));
    }

    #[test]
    fn detour_ratio_measures_added_distance() {
        let stops = vec![
            stop("a", VenueStatus::Confirmed, Some((0.0, 0.0))),
            stop("b", VenueStatus::Potential, Some((1.0, 1.0))),
            stop("c", VenueStatus::Confirmed, Some((0.0, 2.0))),
        ];
        let ratio = detour_ratio(&stops, 1).expect("ratio");
        assert!(ratio > 1.0 && ratio < 1.5, "ratio={ratio}");
        assert!(detour_ratio(&stops[..2], 1).is_none());
        assert!(detour_ratio(&stops, 9).is_none());
    }

    #[test]
    fn recommendations_cover_flexible_located_stops() {
        let result = builder().local_fallback(&anchored_route(), "test");
        let recs = result.recommendations();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].assignment_id, "B");
        assert_eq!(recs[0].current, VenueStatus::Potential);
        assert_eq!(
            recs[0].recommended,
            recommend_hold(recs[0].detour_ratio, &HoldThresholds::default())
        );
    }
}
