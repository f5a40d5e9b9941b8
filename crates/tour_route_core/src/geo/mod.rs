mod coordinate;
mod viewport;

pub use coordinate::{EARTH_RADIUS_KM, GeoCoordinate, distance_km};
pub use viewport::{DEFAULT_PADDING_PX, MapViewport, fit_viewport};
