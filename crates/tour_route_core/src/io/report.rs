use std::{
    fs::File,
    io::{BufWriter, Write},
};

use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    Error, NextAction, Result,
    map::MapScene,
    model::RouteStop,
    optimizer::RemoteEstimate,
    options::{RouteOptions, ViewMode},
    planner::TourPlan,
    route::{
        FillVenue, HoldRecommendation, MetricsComparison, PlanSource, Route, RouteMetrics,
    },
    status::{StatusBreakdown, VenueStatus},
};

/// One table row per stop, in planned order.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    pub display_number: u32,
    pub assignment_id: String,
    pub venue_name: String,
    pub city: String,
    pub status: VenueStatus,
    pub status_label: &'static str,
    pub date: Option<NaiveDate>,
    pub sequence: Option<u32>,
    pub travel_distance_from_previous: Option<f64>,
    pub travel_time_from_previous: Option<f64>,
    pub located: bool,
}

impl TableRow {
    fn from_stop(idx: usize, stop: &RouteStop) -> Self {
        Self {
            display_number: idx as u32 + 1,
            assignment_id: stop.id().to_owned(),
            venue_name: stop.venue.name.clone(),
            city: stop.venue.city.clone(),
            status: stop.status(),
            status_label: stop.status().display_name(),
            date: stop.date(),
            sequence: stop.sequence(),
            travel_distance_from_previous: stop.assignment.travel_distance_from_previous,
            travel_time_from_previous: stop.assignment.travel_time_from_previous,
            located: stop.coordinate().is_some(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ReportView {
    Map(MapScene),
    Table { rows: Vec<TableRow> },
}

impl ReportView {
    fn for_plan(plan: &TourPlan, options: &RouteOptions) -> Self {
        match options.view_mode {
            ViewMode::Map => Self::Map(MapScene::from_result(&plan.result, options.viewport_padding)),
            ViewMode::Table => Self::Table {
                rows: table_rows(plan.result.route()),
            },
        }
    }
}

pub fn table_rows(route: &Route) -> Vec<TableRow> {
    route
        .stops()
        .iter()
        .enumerate()
        .map(|(idx, stop)| TableRow::from_stop(idx, stop))
        .collect()
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedTour {
    pub tour_id: String,
    pub source: PlanSource,
    pub source_label: &'static str,
    pub is_fallback: bool,
    pub current_metrics: RouteMetrics,
    pub planned_metrics: RouteMetrics,
    pub comparison: MetricsComparison,
    pub status_breakdown: StatusBreakdown,
    pub recommendations: Vec<HoldRecommendation>,
    pub potential_fill_venues: Vec<FillVenue>,
    pub suggested_skips: Vec<String>,
    pub reasoning: Option<String>,
    pub remote_estimate: Option<RemoteEstimate>,
    pub view: ReportView,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedTour {
    pub tour_id: String,
    pub error: String,
    pub next_action: NextAction,
    pub next_action_label: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TourReport {
    Planned(Box<PlannedTour>),
    Failed(FailedTour),
}

impl TourReport {
    pub fn new(tour_id: String, plan: Result<TourPlan>, options: &RouteOptions) -> Self {
        match plan {
            Ok(plan) => Self::Planned(Box::new(PlannedTour {
                view: ReportView::for_plan(&plan, options),
                source: plan.result.source().clone(),
                source_label: plan.result.source().label(),
                is_fallback: plan.result.source().is_fallback(),
                planned_metrics: plan.result.metrics().clone(),
                recommendations: plan.result.recommendations().to_vec(),
                potential_fill_venues: plan.result.potential_fill_venues().to_vec(),
                suggested_skips: plan.result.suggested_skips().to_vec(),
                reasoning: plan.result.reasoning().map(str::to_owned),
                remote_estimate: plan.result.remote_estimate().copied(),
                current_metrics: plan.current_metrics,
                comparison: plan.comparison,
                status_breakdown: plan.status_breakdown,
                tour_id,
            })),
            Err(err) => Self::failed(tour_id, &err),
        }
    }

    pub fn failed(tour_id: String, err: &Error) -> Self {
        let next_action = err.next_action();
        Self::Failed(FailedTour {
            tour_id,
            error: err.to_string(),
            next_action,
            next_action_label: next_action.to_string(),
        })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub view_mode: ViewMode,
    pub tours: Vec<TourReport>,
}

impl Report {
    pub fn build(plans: Vec<(String, Result<TourPlan>)>, options: &RouteOptions) -> Self {
        Self {
            view_mode: options.view_mode,
            tours: plans
                .into_iter()
                .map(|(tour_id, plan)| TourReport::new(tour_id, plan, options))
                .collect(),
        }
    }

    pub fn failed_count(&self) -> usize {
        self.tours.iter().filter(|t| t.is_failed()).count()
    }

    /// Writes pretty JSON to `--output`, or stdout when none is set.
    pub fn write(&self, options: &RouteOptions) -> Result<()> {
        match options.output_path() {
            Some(path) => {
                let file = File::create(path).map_err(|e| {
                    Error::other(format!("failed to create output file {}: {e}", path.display()))
                })?;
                self.write_to(BufWriter::new(file))
            }
            None => self.write_to(std::io::stdout().lock()),
        }
    }

    fn write_to(&self, mut writer: impl Write) -> Result<()> {
        serde_json::to_writer_pretty(&mut writer, self)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }
}
