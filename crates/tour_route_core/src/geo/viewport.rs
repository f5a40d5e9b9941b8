use serde::Serialize;

use crate::geo::GeoCoordinate;

/// Padding applied around a fitted viewport when none is configured.
pub const DEFAULT_PADDING_PX: u32 = 50;

/// Bounding box a map should frame, with screen-space padding.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapViewport {
    pub south_west: GeoCoordinate,
    pub north_east: GeoCoordinate,
    pub padding_px: u32,
}

impl MapViewport {
    pub fn center(&self) -> GeoCoordinate {
        GeoCoordinate::new(
            (self.south_west.latitude + self.north_east.latitude) / 2.0,
            (self.south_west.longitude + self.north_east.longitude) / 2.0,
        )
    }

    pub fn contains(&self, point: GeoCoordinate) -> bool {
        (self.south_west.latitude..=self.north_east.latitude).contains(&point.latitude)
            && (self.south_west.longitude..=self.north_east.longitude).contains(&point.longitude)
    }
}

/// Fits the smallest lat/lng box around every present, valid coordinate.
///
/// Returns `None` when nothing is left to frame; callers keep whatever
/// viewport they already show instead of snapping to a default. The result
/// does not depend on input order.
pub fn fit_viewport<I>(coordinates: I, padding_px: u32) -> Option<MapViewport>
where
    I: IntoIterator<Item = Option<GeoCoordinate>>,
{
    let mut points = coordinates.into_iter().flatten().filter(|c| c.is_valid());
    let first = points.next()?;

    let (mut south, mut west, mut north, mut east) = (
        first.latitude,
        first.longitude,
        first.latitude,
        first.longitude,
    );
    for p in points {
        south = south.min(p.latitude);
        north = north.max(p.latitude);
        west = west.min(p.longitude);
        east = east.max(p.longitude);
    }

    Some(MapViewport {
        south_west: GeoCoordinate::new(south, west),
        north_east: GeoCoordinate::new(north, east),
        padding_px,
    })
}
