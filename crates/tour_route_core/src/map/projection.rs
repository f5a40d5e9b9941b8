use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    geo::{GeoCoordinate, MapViewport, fit_viewport},
    model::RouteStop,
    route::{FillVenue, OptimizationResult, Route, display_order},
    status::VenueStatus,
};

/// A located stop as a renderer sees it.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapMarker {
    pub id: String,
    pub coordinate: GeoCoordinate,
    pub label: String,
    pub status: VenueStatus,
    pub color: &'static str,
    pub date: Option<NaiveDate>,
    pub sequence: Option<u32>,
    /// 1-based position after [`order_markers`]; 0 until numbered.
    pub display_number: u32,
    pub is_suggested: bool,
}

/// `None` for stops without a usable coordinate.
pub fn project(stop: &RouteStop) -> Option<MapMarker> {
    let coordinate = stop.coordinate()?;
    Some(MapMarker {
        id: stop.id().to_owned(),
        coordinate,
        label: format!("{}, {}", stop.venue.name, stop.venue.city),
        status: stop.status(),
        color: stop.status().color(),
        date: stop.date(),
        sequence: stop.sequence(),
        display_number: 0,
        is_suggested: stop.status().is_suggested(),
    })
}

fn project_fill(fill: &FillVenue) -> Option<MapMarker> {
    let venue = fill.venue.as_ref()?;
    let coordinate = venue.coordinate.filter(|c| c.is_valid())?;
    let status = fill.status.unwrap_or(VenueStatus::Suggested);
    Some(MapMarker {
        id: fill.venue_id.clone(),
        coordinate,
        label: format!("{}, {}", venue.name, venue.city),
        status,
        color: VenueStatus::Suggested.color(),
        date: fill.suggested_date,
        sequence: None,
        display_number: 0,
        is_suggested: true,
    })
}

/// Same ordering rule as [`Route::new`], then numbers markers from 1.
pub fn order_markers(markers: &mut [MapMarker]) {
    display_order(markers, |m| m.sequence, |m| m.date);
    for (idx, marker) in markers.iter_mut().enumerate() {
        marker.display_number = idx as u32 + 1;
    }
}

/// Everything needed to draw one route: numbered markers, the polyline
/// through them, and the viewport that fits them.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapScene {
    pub markers: Vec<MapMarker>,
    pub polyline: Vec<GeoCoordinate>,
    /// `None` leaves the renderer's current viewport alone.
    pub viewport: Option<MapViewport>,
    pub fill_markers: Vec<MapMarker>,
}

impl MapScene {
    pub fn from_route(route: &Route, padding_px: u32) -> Self {
        let mut markers: Vec<MapMarker> = route.stops().iter().filter_map(project).collect();
        order_markers(&mut markers);
        let polyline = markers.iter().map(|m| m.coordinate).collect();
        let viewport = fit_viewport(markers.iter().map(|m| Some(m.coordinate)), padding_px);
        Self {
            markers,
            polyline,
            viewport,
            fill_markers: Vec::new(),
        }
    }

    /// Preview of a proposed order. Fill venues are drawn as suggested
    /// markers outside the polyline but inside the viewport.
    pub fn from_result(result: &OptimizationResult, padding_px: u32) -> Self {
        let mut scene = Self::from_route(result.route(), padding_px);
        let mut fill_markers: Vec<MapMarker> = result
            .potential_fill_venues()
            .iter()
            .filter_map(project_fill)
            .collect();
        order_markers(&mut fill_markers);

        if !fill_markers.is_empty() {
            scene.viewport = fit_viewport(
                scene
                    .markers
                    .iter()
                    .chain(&fill_markers)
                    .map(|m| Some(m.coordinate)),
                padding_px,
            );
        }
        scene.fill_markers = fill_markers;
        scene
    }
}
