use std::{
    collections::{HashMap, HashSet},
    fs,
    io::Read,
};

use serde::Deserialize;
use serde_json::Value;

use crate::{
    Error, Result,
    geo::GeoCoordinate,
    model::{RouteStop, Venue, VenueAssignment, VenueCatalog},
    options::RouteOptions,
    route::Route,
};

/// Venue row as persisted: flat, optional latitude/longitude.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueRecord {
    pub id: String,
    pub name: String,
    pub city: String,
    pub region: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub capacity: Option<u32>,
}

impl From<VenueRecord> for Venue {
    fn from(record: VenueRecord) -> Self {
        let coordinate = GeoCoordinate::from_parts(record.latitude, record.longitude);
        if coordinate.is_none() && (record.latitude.is_some() || record.longitude.is_some()) {
            log::debug!(
                "input: venue={} has an incomplete or out-of-range coordinate",
                record.id
            );
        }
        Self {
            id: record.id,
            name: record.name,
            city: record.city,
            region: record.region,
            coordinate,
            capacity: record.capacity,
        }
    }
}

/// One joined row: an assignment and the venue it points at.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRecord {
    pub tour_venue: VenueAssignment,
    pub venue: VenueRecord,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TourRecord {
    tour_id: String,
    optimization_score: Option<f64>,
    #[serde(default)]
    stops: Vec<AssignmentRecord>,
}

#[derive(Debug, Deserialize)]
struct TourDocument {
    tours: Vec<TourRecord>,
    #[serde(default)]
    catalog: Vec<VenueRecord>,
}

/// Tours to plan plus every venue known to the input.
#[derive(Clone, Debug, Default)]
pub struct TourInput {
    pub routes: Vec<Route>,
    pub catalog: VenueCatalog,
}

impl TourInput {
    pub fn read(options: &RouteOptions) -> Result<Self> {
        let raw = match options.input_path() {
            Some(path) => fs::read_to_string(path).map_err(|e| {
                Error::invalid_input(format!("failed to read {}: {e}", path.display()))
            })?,
            None => {
                let mut raw = String::new();
                std::io::stdin().read_to_string(&mut raw)?;
                raw
            }
        };
        Self::from_json(&raw)
    }

    /// Accepts either an array of assignment rows or a
    /// `{"tours": [...], "catalog": [...]}` document.
    pub fn from_json(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Err(Error::invalid_input("No tour data provided."));
        }

        let value: Value = serde_json::from_str(raw)?;
        let input = if value.is_array() {
            let records: Vec<AssignmentRecord> = serde_json::from_value(value)?;
            Self::from_records(records)?
        } else {
            let document: TourDocument = serde_json::from_value(value)?;
            Self::from_document(document)?
        };

        log::info!(
            "input: tours={} stops={} catalog={}",
            input.routes.len(),
            input.routes.iter().map(Route::len).sum::<usize>(),
            input.catalog.len()
        );
        Ok(input)
    }

    fn from_records(records: Vec<AssignmentRecord>) -> Result<Self> {
        let mut order: Vec<String> = Vec::new();
        let mut by_tour: HashMap<String, Vec<AssignmentRecord>> = HashMap::new();
        for record in records {
            let tour_id = record.tour_venue.tour_id.clone();
            if !by_tour.contains_key(&tour_id) {
                order.push(tour_id.clone());
            }
            by_tour.entry(tour_id).or_default().push(record);
        }

        let mut input = Self::default();
        for tour_id in order {
            let records = by_tour.remove(&tour_id).unwrap_or_default();
            let stops = input.join_stops(&tour_id, records)?;
            input.routes.push(Route::new(tour_id, stops));
        }
        Ok(input)
    }

    fn from_document(document: TourDocument) -> Result<Self> {
        let mut input = Self::default();
        for record in document.catalog {
            let venue = Venue::from(record);
            input.catalog.insert(venue.id.clone(), venue);
        }

        let mut seen_tours = HashSet::new();
        for tour in document.tours {
            if !seen_tours.insert(tour.tour_id.clone()) {
                return Err(Error::invalid_data(format!(
                    "tour {} appears more than once",
                    tour.tour_id
                )));
            }
            let stops = input.join_stops(&tour.tour_id, tour.stops)?;
            let mut route = Route::new(tour.tour_id, stops);
            if let Some(score) = tour.optimization_score {
                route = route.with_optimization_score(score);
            }
            input.routes.push(route);
        }
        Ok(input)
    }

    fn join_stops(&mut self, tour_id: &str, records: Vec<AssignmentRecord>) -> Result<Vec<RouteStop>> {
        let mut assignment_ids = HashSet::new();
        let mut stops = Vec::with_capacity(records.len());
        for record in records {
            let assignment = record.tour_venue;
            if assignment.tour_id != tour_id {
                return Err(Error::invalid_data(format!(
                    "assignment {} belongs to tour {}, listed under {tour_id}",
                    assignment.id, assignment.tour_id
                )));
            }
            if assignment.venue_id != record.venue.id {
                return Err(Error::invalid_data(format!(
                    "assignment {} points at venue {} but carries venue {}",
                    assignment.id, assignment.venue_id, record.venue.id
                )));
            }
            if !assignment_ids.insert(assignment.id.clone()) {
                return Err(Error::invalid_data(format!(
                    "assignment {} appears more than once in tour {tour_id}",
                    assignment.id
                )));
            }

            let venue = Venue::from(record.venue);
            self.catalog
                .entry(venue.id.clone())
                .or_insert_with(|| venue.clone());
            stops.push(RouteStop::new(assignment, venue));
        }
        Ok(stops)
    }
}
