mod projection;

pub use projection::{MapMarker, MapScene, order_markers, project};
