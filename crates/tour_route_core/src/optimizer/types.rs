use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tour_route_derive::CliValue;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize, CliValue)]
#[serde(rename_all = "lowercase")]
#[cli_value(option = "goal")]
pub enum OptimizationGoal {
    #[default]
    Distance,
    Time,
    Balance,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize, CliValue)]
#[serde(rename_all = "lowercase")]
#[cli_value(option = "venue-size")]
pub enum VenueSize {
    Small,
    Medium,
    Large,
    #[default]
    Any,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OptimizationPreferences {
    pub optimization_goal: OptimizationGoal,
    pub preferred_regions: Vec<String>,
    pub min_days_between_shows: Option<u32>,
    pub max_days_between_shows: Option<u32>,
    pub max_travel_distance_per_day: Option<f64>,
    pub avoid_cities: Vec<String>,
    pub focus_on_artist_fanbase: bool,
    pub prioritize_venue_size: VenueSize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationRequest {
    pub tour_id: String,
    pub preferences: OptimizationPreferences,
}

impl OptimizationRequest {
    pub fn new(tour_id: impl Into<String>, preferences: OptimizationPreferences) -> Self {
        Self {
            tour_id: tour_id.into(),
            preferences,
        }
    }
}

/// Totals as reported by the optimizer. Informational only: the core always
/// recomputes metrics from the stops it accepts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CalculatedMetrics {
    pub total_distance: f64,
    pub total_travel_time_minutes: f64,
    pub optimized_distance: f64,
    pub optimized_time_minutes: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteOptimization {
    /// Venue ids in proposed visit order.
    pub optimized_sequence: Vec<String>,
    pub suggested_dates: BTreeMap<String, NaiveDate>,
    pub recommended_venues: Vec<String>,
    pub suggested_skips: Vec<String>,
    pub estimated_distance_reduction: f64,
    pub estimated_time_savings: f64,
    pub reasoning: String,
    pub calculated_metrics: Option<CalculatedMetrics>,
    /// Set when the optimizer served its own fallback instead of a real
    /// optimization. Any JSON value counts.
    pub ai_error: Option<serde_json::Value>,
}

impl RemoteOptimization {
    pub fn is_degraded(&self) -> bool {
        self.ai_error.is_some()
    }

    pub fn estimate(&self) -> RemoteEstimate {
        RemoteEstimate {
            estimated_distance_reduction: self.estimated_distance_reduction,
            estimated_time_savings: self.estimated_time_savings,
            calculated_metrics: self.calculated_metrics,
        }
    }
}

/// The optimizer's own claims, kept apart from [`crate::route::RouteMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEstimate {
    pub estimated_distance_reduction: f64,
    pub estimated_time_savings: f64,
    pub calculated_metrics: Option<CalculatedMetrics>,
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{
        OptimizationGoal, OptimizationPreferences, OptimizationRequest, RemoteOptimization,
        VenueSize,
    };

    #[test]
    fn parses_full_response() {
        let json = r#"{
            "optimizedSequence": ["v1", "v3", "v2"],
            "suggestedDates": {"v3": "2026-06-02"},
            "recommendedVenues": ["v9"],
            "suggestedSkips": ["v2"],
            "estimatedDistanceReduction": 120.5,
            "estimatedTimeSavings": 90,
            "reasoning": "cluster the midwest",
            "calculatedMetrics": {
                "totalDistance": 900, "totalTravelTimeMinutes": 675,
                "optimizedDistance": 780, "optimizedTimeMinutes": 585
            }
        }"#;
        let response: RemoteOptimization = serde_json::from_str(json).expect("parse");
        assert_eq!(response.optimized_sequence, ["v1", "v3", "v2"]);
        assert_eq!(
            response.suggested_dates.get("v3"),
            NaiveDate::from_ymd_opt(2026, 6, 2).as_ref()
        );
        assert!(!response.is_degraded());
        let estimate = response.estimate();
        assert_eq!(estimate.estimated_time_savings, 90.0);
        assert_eq!(
            estimate.calculated_metrics.map(|m| m.optimized_distance),
            Some(780.0)
        );
    }

    #[test]
    fn ai_error_marks_response_degraded() {
        let response: RemoteOptimization =
            serde_json::from_str(r#"{"optimizedSequence": ["v1"], "aiError": true}"#)
                .expect("parse");
        assert!(response.is_degraded());
        let response: RemoteOptimization =
            serde_json::from_str(r#"{"optimizedSequence": ["v1"], "aiError": null}"#)
                .expect("parse");
        assert!(!response.is_degraded());
    }

    #[test]
    fn request_uses_wire_names() {
        let request = OptimizationRequest::new(
            "t1",
            OptimizationPreferences {
                optimization_goal: OptimizationGoal::Balance,
                prioritize_venue_size: VenueSize::Large,
                max_travel_distance_per_day: Some(500.0),
                ..OptimizationPreferences::default()
            },
        );
        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(value["tourId"], "t1");
        assert_eq!(value["preferences"]["optimizationGoal"], "balance");
        assert_eq!(value["preferences"]["prioritizeVenueSize"], "large");
        assert_eq!(value["preferences"]["maxTravelDistancePerDay"], 500.0);
        assert_eq!(value["preferences"]["focusOnArtistFanbase"], false);
        assert_eq!(value["preferences"]["preferredRegions"], serde_json::json!([]));
    }
}
