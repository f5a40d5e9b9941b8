mod compare;
mod metrics;
mod sequence;

use std::collections::HashSet;

use serde::Serialize;

use crate::{Error, Result, model::RouteStop};

pub use compare::{MetricsComparison, improvement_pct};
pub use metrics::{
    DEFAULT_AVERAGE_SPEED_KMH, Leg, RouteMetrics, RouteMetricsCalculator, TravelTimeSource,
    UnroutedLeg,
};
pub use sequence::{
    AnchorRule, FillVenue, HoldRecommendation, HoldThresholds, MIN_REORDERABLE_STOPS, MIN_SCHEDULABLE_STOPS,
    OptimizationResult, PlanSource, SequenceBuilder, SequenceConfig, detour_ratio, recommend_hold,
};

/// Ordered stops of one tour.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    tour_id: String,
    optimization_score: Option<f64>,
    stops: Vec<RouteStop>,
}

impl Route {
    /// Orders `stops` for display: by `sequence` when every stop has one,
    /// otherwise by date (undated stops last), otherwise as given.
    pub fn new(tour_id: impl Into<String>, mut stops: Vec<RouteStop>) -> Self {
        display_order(&mut stops, |s| s.sequence(), |s| s.date());
        Self {
            tour_id: tour_id.into(),
            optimization_score: None,
            stops,
        }
    }

    /// Keeps `stops` exactly as given. Used for sequences that are already final.
    pub(crate) fn from_ordered(
        tour_id: impl Into<String>,
        optimization_score: Option<f64>,
        stops: Vec<RouteStop>,
    ) -> Self {
        Self {
            tour_id: tour_id.into(),
            optimization_score,
            stops,
        }
    }

    /// Score reported by the optimizer for this tour, clamped to 0..=100.
    pub fn with_optimization_score(mut self, score: f64) -> Self {
        self.optimization_score = score.is_finite().then(|| score.clamp(0.0, 100.0));
        self
    }

    pub fn tour_id(&self) -> &str {
        &self.tour_id
    }

    pub fn optimization_score(&self) -> Option<f64> {
        self.optimization_score
    }

    pub fn stops(&self) -> &[RouteStop] {
        &self.stops
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn venue_ids(&self) -> HashSet<&str> {
        self.stops.iter().map(RouteStop::venue_id).collect()
    }

    /// Replaces the stops with those of an accepted optimization result.
    ///
    /// The venue set is re-checked first; on mismatch nothing changes.
    /// Sequence, date and travel fields are swapped in together.
    pub fn apply(&mut self, result: &OptimizationResult) -> Result<()> {
        if result.route().tour_id() != self.tour_id {
            return Err(Error::apply_conflict(format!(
                "result belongs to tour {}, not {}",
                result.route().tour_id(),
                self.tour_id
            )));
        }
        if result.route().venue_ids() != self.venue_ids() {
            return Err(Error::apply_conflict(
                "tour venues changed since the optimization ran",
            ));
        }

        self.stops = result.route().stops().to_vec();
        log::info!(
            "route.apply: tour={} n={} source={}",
            self.tour_id,
            self.stops.len(),
            result.source()
        );
        Ok(())
    }
}

/// Stable display ordering shared by routes and map markers.
pub(crate) fn display_order<T, S, D>(items: &mut [T], sequence: S, date: D)
where
    S: Fn(&T) -> Option<u32>,
    D: Fn(&T) -> Option<chrono::NaiveDate>,
{
    if items.iter().all(|item| sequence(item).is_some()) {
        items.sort_by_key(|item| sequence(item));
    } else if items.iter().any(|item| date(item).is_some()) {
        items.sort_by_key(|item| {
            let d = date(item);
            (d.is_none(), d)
        });
    }
}


#[cfg(test)]
mod tests {
    use super::{
        Route, SequenceBuilder, SequenceConfig,
        test_support::{ids, stop, with_date, with_sequence},
    };
    use crate::{Error, status::VenueStatus};

    fn unordered_route(tour_id: &str) -> Route {
        Route::new(
            tour_id,
            vec![
                with_date(
                    with_sequence(stop("A", VenueStatus::Confirmed, Some((40.0, -100.0))), 0),
                    2026,
                    5,
                    1,
                ),
                with_sequence(stop("C", VenueStatus::Confirmed, Some((39.0, -80.0))), 1),
                with_sequence(stop("B", VenueStatus::Potential, Some((41.0, -90.0))), 2),
            ],
        )
    }

    #[test]
    fn orders_by_sequence_when_all_present() {
        let route = Route::new(
            "t1",
            vec![
                with_sequence(stop("b", VenueStatus::Hold1, None), 1),
                with_sequence(stop("a", VenueStatus::Hold1, None), 0),
                with_sequence(stop("c", VenueStatus::Hold1, None), 2),
            ],
        );
        assert_eq!(ids(route.stops()), ["a", "b", "c"]);
    }

    #[test]
    fn falls_back_to_date_then_input_order() {
        let route = Route::new(
            "t1",
            vec![
                with_sequence(stop("x", VenueStatus::Potential, None), 0),
                with_date(stop("late", VenueStatus::Hold1, None), 2026, 7, 1),
                stop("undated", VenueStatus::Potential, None),
                with_date(stop("early", VenueStatus::Hold1, None), 2026, 6, 1),
            ],
        );
        assert_eq!(ids(route.stops()), ["early", "late", "x", "undated"]);
    }

    #[test]
    fn keeps_input_order_without_keys() {
        let route = Route::new(
            "t1",
            vec![
                stop("c", VenueStatus::Potential, None),
                stop("a", VenueStatus::Potential, None),
                stop("b", VenueStatus::Potential, None),
            ],
        );
        assert_eq!(ids(route.stops()), ["c", "a", "b"]);
    }

    #[test]
    fn optimization_score_is_clamped() {
        let route = Route::new("t1", Vec::new()).with_optimization_score(140.0);
        assert_eq!(route.optimization_score(), Some(100.0));
        let route = Route::new("t1", Vec::new()).with_optimization_score(f64::NAN);
        assert_eq!(route.optimization_score(), None);
    }

    #[test]
    fn apply_swaps_order_and_travel_fields_together() {
        let builder = SequenceBuilder::new(SequenceConfig::default()).expect("builder");
        let mut route = unordered_route("t1");
        let result = builder.local_fallback(&route, "test");

        route.apply(&result).expect("apply");
        assert_eq!(ids(route.stops()), ["A", "B", "C"]);
        let sequences: Vec<_> = route.stops().iter().map(|s| s.sequence()).collect();
        assert_eq!(sequences, [Some(0), Some(1), Some(2)]);
        assert_eq!(route.stops()[0].date(), result.route().stops()[0].date());
        assert!(route.stops()[0].assignment.travel_distance_from_previous.is_none());
        assert!(route.stops()[1].assignment.travel_distance_from_previous.is_some());
        assert_eq!(route.stops(), result.route().stops());
    }

    #[test]
    fn apply_rejects_result_for_another_tour() {
        let builder = SequenceBuilder::new(SequenceConfig::default()).expect("builder");
        let result = builder.local_fallback(&unordered_route("t1"), "test");
        let mut other = unordered_route("t2");
        let before = other.clone();

        let err = other.apply(&result).expect_err("wrong tour");
        assert!(matches!(err, Error::ApplyConflict(_)));
        assert_eq!(other, before);
    }

    #[test]
    fn apply_rejects_changed_venue_set_without_touching_stops() {
        let builder = SequenceBuilder::new(SequenceConfig::default()).expect("builder");
        let result = builder.local_fallback(&unordered_route("t1"), "test");
        let mut changed = Route::new(
            "t1",
            vec![
                with_sequence(stop("A", VenueStatus::Confirmed, Some((40.0, -100.0))), 0),
                with_sequence(stop("C", VenueStatus::Confirmed, Some((39.0, -80.0))), 1),
                with_sequence(stop("D", VenueStatus::Hold1, Some((38.0, -85.0))), 2),
            ],
        );
        let before = changed.clone();

        let err = changed.apply(&result).expect_err("venues changed");
        assert!(err.to_string().contains("venues changed"));
        assert_eq!(changed, before);
    }
}
