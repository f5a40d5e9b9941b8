use std::fmt;

use thiserror::Error as ThisError;

use crate::status::VenueStatus;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error(
        "not enough data to optimize: need at least {required} venues with a location and a date, found {found}"
    )]
    InsufficientData { required: usize, found: usize },
    #[error("remote optimization unavailable: {0}")]
    RemoteOptimizationUnavailable(String),
    #[error("optimization result no longer matches the tour: {0}")]
    ApplyConflict(String),
    #[error("an optimization is already running for tour {0}")]
    OptimizationInFlight(String),
    #[error("optimization cancelled for tour {0}; result discarded")]
    Cancelled(String),
    #[error("status {from} is terminal and cannot change to {to}")]
    InvalidTransition { from: VenueStatus, to: VenueStatus },
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData(message.into())
    }

    pub fn remote_unavailable(message: impl Into<String>) -> Self {
        Self::RemoteOptimizationUnavailable(message.into())
    }

    pub fn apply_conflict(message: impl Into<String>) -> Self {
        Self::ApplyConflict(message.into())
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// What the user has to do before the failed operation can succeed.
    pub fn next_action(&self) -> NextAction {
        match self {
            Self::InsufficientData { .. } => NextAction::AddMoreVenues,
            Self::RemoteOptimizationUnavailable(_) => NextAction::AcceptFallback,
            Self::ApplyConflict(_) | Self::Cancelled(_) => NextAction::RerunOptimization,
            Self::OptimizationInFlight(_) | Self::Io(_) => NextAction::Retry,
            Self::Json(_) | Self::InvalidInput(_) | Self::InvalidData(_) => NextAction::FixInput,
            Self::InvalidTransition { .. } | Self::Other(_) => NextAction::None,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NextAction {
    Retry,
    RerunOptimization,
    AcceptFallback,
    AddMoreVenues,
    FixInput,
    None,
}

impl fmt::Display for NextAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Self::Retry => "retry",
            Self::RerunOptimization => "re-run optimization",
            Self::AcceptFallback => "accept fallback ordering",
            Self::AddMoreVenues => "add venues with a location and a date",
            Self::FixInput => "fix the input data",
            Self::None => "none",
        };
        f.write_str(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, NextAction};
    use crate::status::VenueStatus;

    #[test]
    fn every_user_facing_failure_has_a_next_action() {
        let cases = [
            (
                Error::InsufficientData {
                    required: 2,
                    found: 1,
                },
                NextAction::AddMoreVenues,
            ),
            (Error::remote_unavailable("down"), NextAction::AcceptFallback),
            (Error::apply_conflict("stale"), NextAction::RerunOptimization),
            (
                Error::OptimizationInFlight("t1".into()),
                NextAction::Retry,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.next_action(), expected, "{err}");
        }
    }

    #[test]
    fn insufficient_data_message_names_counts() {
        let err = Error::InsufficientData {
            required: 2,
            found: 0,
        };
        let message = err.to_string();
        assert!(message.contains("at least 2"));
        assert!(message.contains("found 0"));
    }

    #[test]
    fn invalid_transition_renders_wire_names() {
        let err = Error::InvalidTransition {
            from: VenueStatus::Cancelled,
            to: VenueStatus::Hold1,
        };
        assert_eq!(
            err.to_string(),
            "status cancelled is terminal and cannot change to hold1"
        );
    }
}
