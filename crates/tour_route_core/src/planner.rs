//! Per-tour orchestration: preconditions, optimizer call or local fallback,
//! cancellation, and the before/after summary. Tours are independent and
//! planned in parallel.

use rayon::prelude::*;
use serde::Serialize;

use crate::{
    Error, Result,
    model::VenueCatalog,
    optimizer::{
        CancelToken, OptimizationGate, OptimizationPreferences, OptimizationRequest,
        RouteOptimizer,
    },
    options::RouteOptions,
    route::{
        MetricsComparison, OptimizationResult, Route, RouteMetrics, SequenceBuilder,
        SequenceConfig, TravelTimeSource,
    },
    status::StatusBreakdown,
};

const NO_OPTIMIZER_REASON: &str = "no optimizer configured";

/// Everything computed for one tour in a planning pass.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TourPlan {
    pub tour_id: String,
    pub current_metrics: RouteMetrics,
    pub result: OptimizationResult,
    pub comparison: MetricsComparison,
    pub status_breakdown: StatusBreakdown,
}

pub struct Planner<'a> {
    builder: SequenceBuilder<'a>,
    preferences: OptimizationPreferences,
    catalog: Option<&'a VenueCatalog>,
    gate: OptimizationGate,
}

impl<'a> Planner<'a> {
    pub fn new(config: SequenceConfig, preferences: OptimizationPreferences) -> Result<Self> {
        Ok(Self {
            builder: SequenceBuilder::new(config)?,
            preferences,
            catalog: None,
            gate: OptimizationGate::new(),
        })
    }

    pub fn from_options(options: &RouteOptions) -> Result<Self> {
        Self::new(options.sequence_config(), options.preferences())
    }

    /// Venues the optimizer may recommend from outside the tour.
    pub fn with_catalog(mut self, catalog: &'a VenueCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_travel_times(mut self, source: &'a dyn TravelTimeSource) -> Self {
        let calculator = self.builder.calculator().with_travel_times(source);
        self.builder = self.builder.with_calculator(calculator);
        self
    }

    pub fn gate(&self) -> &OptimizationGate {
        &self.gate
    }

    /// Plans one tour.
    ///
    /// Fails with [`Error::InsufficientData`] before contacting the optimizer
    /// when the tour cannot be scheduled, and with [`Error::Cancelled`] when
    /// `cancel` fires before the result is ready. An unavailable optimizer is
    /// not an error: the local fallback is used and labelled as such.
    #[tour_route_derive::timer("planner")]
    pub fn plan(
        &self,
        route: &Route,
        optimizer: Option<&dyn RouteOptimizer>,
        cancel: &CancelToken,
    ) -> Result<TourPlan> {
        let tour_id = route.tour_id();
        let _permit = self.gate.acquire(tour_id)?;
        cancel.ensure_active(tour_id)?;
        log::info!("planner: start tour={tour_id} n={}", route.len());

        self.builder.check_preconditions(route)?;
        let current_metrics = self.builder.calculator().compute(route);

        let result = if !self.builder.is_reorderable(route) {
            self.builder.no_op(route)
        } else if let Some(optimizer) = optimizer {
            self.optimize_remote(route, optimizer, cancel)?
        } else {
            self.builder.local_fallback(route, NO_OPTIMIZER_REASON)
        };

        cancel.ensure_active(tour_id)?;

        let comparison = MetricsComparison::between(&current_metrics, result.metrics());
        log::info!(
            "planner: done tour={tour_id} source={} distance_pct={} time_pct={} unrouted={}",
            result.source(),
            comparison.distance_improvement_pct,
            comparison.time_improvement_pct,
            result.metrics().unrouted_count()
        );

        Ok(TourPlan {
            tour_id: tour_id.to_owned(),
            status_breakdown: StatusBreakdown::from_stops(route.stops()),
            current_metrics,
            result,
            comparison,
        })
    }

    fn optimize_remote(
        &self,
        route: &Route,
        optimizer: &dyn RouteOptimizer,
        cancel: &CancelToken,
    ) -> Result<OptimizationResult> {
        let request = OptimizationRequest::new(route.tour_id(), self.preferences.clone());
        match optimizer.optimize(&request) {
            Ok(remote) => {
                cancel.ensure_active(route.tour_id())?;
                let empty = VenueCatalog::new();
                let catalog = self.catalog.unwrap_or(&empty);
                self.builder.validate_remote(route, &remote, catalog)
            }
            Err(Error::RemoteOptimizationUnavailable(reason)) => {
                log::warn!(
                    "planner: optimizer unavailable tour={} reason={reason}; using local fallback",
                    route.tour_id()
                );
                Ok(self.builder.local_fallback(route, reason))
            }
            Err(err) => Err(err),
        }
    }

    /// Plans every tour in parallel. One tour's failure never affects the
    /// others; results come back in input order.
    pub fn plan_all(
        &self,
        routes: &[Route],
        optimizer: Option<&dyn RouteOptimizer>,
        cancel: &CancelToken,
    ) -> Vec<(String, Result<TourPlan>)> {
        routes
            .par_iter()
            .map(|route| {
                let plan = self.plan(route, optimizer, cancel);
                if let Err(err) = &plan {
                    log::warn!(
                        "planner: failed tour={} err={err} next_action={}",
                        route.tour_id(),
                        err.next_action()
                    );
                }
                (route.tour_id().to_owned(), plan)
            })
            .collect()
    }
}
