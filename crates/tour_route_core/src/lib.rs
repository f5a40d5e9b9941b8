//! Route geometry, sequencing and before/after comparison for touring
//! schedules. Turns a tour's venue assignments into distances, travel times,
//! map viewports and ordered sequences, optionally consulting an external
//! optimizer.

mod error;
pub mod geo;
mod io;
pub mod logging;
pub mod map;
pub mod model;
pub mod optimizer;
mod planner;
pub mod route;
pub mod status;
pub mod utils;

pub(crate) use io::options;

pub use error::{Error, NextAction, Result};
pub use io::input::{AssignmentRecord, TourInput, VenueRecord};
pub use io::options::{LogFormat, LogLevel, RouteOptions, ViewMode};
pub use io::report::{FailedTour, PlannedTour, Report, ReportView, TableRow, TourReport, table_rows};
pub use planner::{Planner, TourPlan};
