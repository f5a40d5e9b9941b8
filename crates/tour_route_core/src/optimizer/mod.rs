//! Boundary to the remote route optimizer.
//!
//! The core never talks to the optimizer directly: callers hand a
//! [`RouteOptimizer`] to the planner, which serializes requests per tour
//! through an [`OptimizationGate`] and discards responses whose
//! [`CancelToken`] fired while they were in flight.

mod command;
mod gate;
mod types;

pub use command::CommandOptimizer;
pub use gate::{CancelToken, OptimizationGate, OptimizationPermit};
pub use types::{
    CalculatedMetrics, OptimizationGoal, OptimizationPreferences, OptimizationRequest,
    RemoteEstimate, RemoteOptimization, VenueSize,
};

use crate::Result;

pub trait RouteOptimizer: Sync {
    /// Ask the optimizer for a new order. Unreachable or failing optimizers
    /// return [`crate::Error::RemoteOptimizationUnavailable`].
    fn optimize(&self, request: &OptimizationRequest) -> Result<RemoteOptimization>;
}
