use serde::Serialize;

use crate::route::RouteMetrics;

/// Percentage reduction from `original` to `optimized`, rounded.
///
/// Positive means the optimized value is smaller. Regressions come back
/// negative. A zero `original` yields 0.
pub fn improvement_pct(original: f64, optimized: f64) -> i64 {
    if original == 0.0 || !original.is_finite() || !optimized.is_finite() {
        return 0;
    }
    (((original - optimized) / original) * 100.0).round() as i64
}

/// Before/after summary of two metric sets for the same tour.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsComparison {
    pub original_distance_km: f64,
    pub optimized_distance_km: f64,
    pub distance_improvement_pct: i64,
    pub original_travel_minutes: f64,
    pub optimized_travel_minutes: f64,
    pub time_improvement_pct: i64,
    /// Plain point difference, optimized minus original.
    pub score_delta: Option<f64>,
}

impl MetricsComparison {
    pub fn between(original: &RouteMetrics, optimized: &RouteMetrics) -> Self {
        let comparison = Self {
            original_distance_km: original.total_distance_km(),
            optimized_distance_km: optimized.total_distance_km(),
            distance_improvement_pct: improvement_pct(
                original.total_distance_km(),
                optimized.total_distance_km(),
            ),
            original_travel_minutes: original.total_travel_time_minutes(),
            optimized_travel_minutes: optimized.total_travel_time_minutes(),
            time_improvement_pct: improvement_pct(
                original.total_travel_time_minutes(),
                optimized.total_travel_time_minutes(),
            ),
            score_delta: original
                .optimization_score()
                .zip(optimized.optimization_score())
                .map(|(before, after)| after - before),
        };

        if comparison.distance_improvement_pct < 0 {
            log::info!(
                "compare: regression distance_pct={} original_km={:.1} optimized_km={:.1}",
                comparison.distance_improvement_pct,
                comparison.original_distance_km,
                comparison.optimized_distance_km
            );
        }
        comparison
    }

    pub fn distance_saved_km(&self) -> f64 {
        self.original_distance_km - self.optimized_distance_km
    }

    pub fn minutes_saved(&self) -> f64 {
        self.original_travel_minutes - self.optimized_travel_minutes
    }

    pub fn is_regression(&self) -> bool {
        self.distance_improvement_pct < 0 || self.time_improvement_pct < 0
    }
}

#[cfg(test)]
mod tests {
    use super::{MetricsComparison, improvement_pct};
    use crate::route::{
        Route, RouteMetricsCalculator,
        test_support::{stop, with_sequence},
    };
    use crate::status::VenueStatus;

    #[test]
    fn zero_original_is_zero_percent() {
        for optimized in [0.0, 5.0, -3.0, 1e9] {
            assert_eq!(improvement_pct(0.0, optimized), 0);
        }
    }

    #[test]
    fn reduction_is_positive_and_regression_negative() {
        assert_eq!(improvement_pct(100.0, 80.0), 20);
        assert_eq!(improvement_pct(80.0, 100.0), -25);
        assert_eq!(improvement_pct(100.0, 100.0), 0);
    }

    #[test]
    fn rounds_to_nearest_integer() {
        assert_eq!(improvement_pct(300.0, 200.0), 33);
        assert_eq!(improvement_pct(3.0, 1.0), 67);
    }

    fn route(points: &[(f64, f64)]) -> Route {
        Route::new(
            "t1",
            points
                .iter()
                .enumerate()
                .map(|(idx, p)| {
                    with_sequence(
                        stop(&format!("s{idx}"), VenueStatus::Confirmed, Some(*p)),
                        idx as u32,
                    )
                })
                .collect(),
        )
    }

    #[test]
    fn comparison_applies_formula_per_field() {
        let calc = RouteMetricsCalculator::default();
        let zigzag = calc.compute(&route(&[(0.0, 0.0), (0.0, 2.0), (0.0, 1.0)]));
        let straight = calc.compute(&route(&[(0.0, 0.0), (0.0, 1.0), (0.0, 2.0)]));

        let comparison = MetricsComparison::between(&zigzag, &straight);
        assert_eq!(comparison.distance_improvement_pct, 33);
        assert_eq!(comparison.time_improvement_pct, 33);
        assert!(comparison.distance_saved_km() > 0.0);
        assert!(!comparison.is_regression());
        assert_eq!(comparison.score_delta, None);

        let reverse = MetricsComparison::between(&straight, &zigzag);
        assert_eq!(reverse.distance_improvement_pct, -50);
        assert!(reverse.is_regression());
    }

    #[test]
    fn score_delta_is_plain_subtraction() {
        let calc = RouteMetricsCalculator::default();
        let before = calc.compute(&route(&[(0.0, 0.0), (0.0, 1.0)]).with_optimization_score(60.0));
        let after = calc.compute(&route(&[(0.0, 0.0), (0.0, 1.0)]).with_optimization_score(75.5));
        let comparison = MetricsComparison::between(&before, &after);
        assert_eq!(comparison.score_delta, Some(15.5));
    }
}
