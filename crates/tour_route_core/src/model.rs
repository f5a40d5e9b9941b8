use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tour_route_derive::New;

use crate::{geo::GeoCoordinate, status::VenueStatus};

/// Catalog venue. Owned by the venue catalog; the routing core only reads it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, New)]
#[serde(rename_all = "camelCase")]
pub struct Venue {
    pub id: String,
    pub name: String,
    pub city: String,
    pub region: Option<String>,
    pub coordinate: Option<GeoCoordinate>,
    pub capacity: Option<u32>,
}

/// Venues by id, used to resolve optimizer recommendations outside the tour.
pub type VenueCatalog = HashMap<String, Venue>;

/// A venue's membership in one tour.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, New)]
#[serde(rename_all = "camelCase")]
pub struct VenueAssignment {
    pub id: String,
    pub tour_id: String,
    pub venue_id: String,
    pub status: VenueStatus,
    pub date: Option<NaiveDate>,
    pub sequence: Option<u32>,
    /// Kilometres from the previous stop.
    pub travel_distance_from_previous: Option<f64>,
    /// Minutes from the previous stop.
    pub travel_time_from_previous: Option<f64>,
    pub notes: Option<String>,
}

/// An assignment joined with its venue, the unit every route computation
/// works on.
#[derive(Clone, Debug, PartialEq, Serialize, New)]
#[serde(rename_all = "camelCase")]
pub struct RouteStop {
    pub assignment: VenueAssignment,
    pub venue: Venue,
}

impl RouteStop {
    pub fn id(&self) -> &str {
        &self.assignment.id
    }

    pub fn venue_id(&self) -> &str {
        &self.assignment.venue_id
    }

    pub fn status(&self) -> VenueStatus {
        self.assignment.status
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.assignment.date
    }

    pub fn sequence(&self) -> Option<u32> {
        self.assignment.sequence
    }

    pub fn coordinate(&self) -> Option<GeoCoordinate> {
        self.venue.coordinate.filter(|c| c.is_valid())
    }

    pub fn longitude(&self) -> Option<f64> {
        self.coordinate().map(|c| c.longitude)
    }

    /// Has what an optimizer needs to place it in time and space.
    pub fn is_schedulable(&self) -> bool {
        self.coordinate().is_some() && self.date().is_some()
    }
}
