//! Venue assignment statuses: grouping, display metadata and the few
//! transition rules the routing core depends on.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tour_route_derive::CliValue;

use crate::{Error, Result, model::RouteStop};

#[derive(
    Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize, CliValue,
)]
#[serde(rename_all = "lowercase")]
#[cli_value(option = "status")]
pub enum VenueStatus {
    #[default]
    Potential,
    Suggested,
    Approached,
    Negotiating,
    Hold1,
    Hold2,
    Hold3,
    Hold4,
    Confirmed,
    Cancelled,
}

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusGroup {
    Planning,
    Contact,
    PriorityHold,
    Confirmation,
}

/// Presentation data for a status. Renderers read this instead of keeping
/// their own colour tables.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusMetadata {
    pub display_name: &'static str,
    pub color: &'static str,
    pub description: &'static str,
}

const fn meta(
    display_name: &'static str,
    color: &'static str,
    description: &'static str,
) -> StatusMetadata {
    StatusMetadata {
        display_name,
        color,
        description,
    }
}

// Indexed by `VenueStatus as usize`.
static STATUS_METADATA: [StatusMetadata; 10] = [
    meta("Potential", "#94a3b8", "Venue under consideration, not yet contacted"),
    meta("Suggested", "#a78bfa", "Venue recommended by route optimization"),
    meta("Approached", "#60a5fa", "Initial contact made with the venue"),
    meta("Negotiating", "#f59e0b", "Terms and dates under negotiation"),
    meta("Hold 1", "#16a34a", "First-priority date hold"),
    meta("Hold 2", "#65a30d", "Second-priority date hold"),
    meta("Hold 3", "#ca8a04", "Third-priority date hold"),
    meta("Hold 4", "#ea580c", "Fourth-priority date hold"),
    meta("Confirmed", "#059669", "Show confirmed; fixed in the route"),
    meta("Cancelled", "#dc2626", "Show cancelled; no further changes"),
];

impl VenueStatus {
    pub const HOLDS: [Self; 4] = [Self::Hold1, Self::Hold2, Self::Hold3, Self::Hold4];

    pub const fn group(self) -> StatusGroup {
        match self {
            Self::Potential | Self::Suggested => StatusGroup::Planning,
            Self::Approached | Self::Negotiating => StatusGroup::Contact,
            Self::Hold1 | Self::Hold2 | Self::Hold3 | Self::Hold4 => StatusGroup::PriorityHold,
            Self::Confirmed | Self::Cancelled => StatusGroup::Confirmation,
        }
    }

    pub fn metadata(self) -> &'static StatusMetadata {
        &STATUS_METADATA[self as usize]
    }

    pub fn display_name(self) -> &'static str {
        self.metadata().display_name
    }

    pub fn color(self) -> &'static str {
        self.metadata().color
    }

    pub fn description(self) -> &'static str {
        self.metadata().description
    }

    /// Confirmed shows keep their place in the route during optimization.
    pub const fn is_fixed_anchor(self) -> bool {
        matches!(self, Self::Confirmed)
    }

    pub const fn is_suggested(self) -> bool {
        matches!(self, Self::Potential | Self::Suggested)
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// 1 (highest priority) through 4 for priority holds.
    pub const fn hold_rank(self) -> Option<u8> {
        match self {
            Self::Hold1 => Some(1),
            Self::Hold2 => Some(2),
            Self::Hold3 => Some(3),
            Self::Hold4 => Some(4),
            _ => None,
        }
    }

    pub const fn from_hold_rank(rank: u8) -> Option<Self> {
        match rank {
            1 => Some(Self::Hold1),
            2 => Some(Self::Hold2),
            3 => Some(Self::Hold3),
            4 => Some(Self::Hold4),
            _ => None,
        }
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        !self.is_terminal() || next == self
    }

    pub fn transition_to(self, next: Self) -> Result<Self> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(Error::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Parses a comma separated list such as `confirmed,hold1`.
    pub fn parse_list(raw: &str) -> Result<Vec<Self>> {
        let mut statuses = Vec::new();
        for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let status = Self::parse(token)?;
            if !statuses.contains(&status) {
                statuses.push(status);
            }
        }
        Ok(statuses)
    }
}

/// Per-status and per-group counts for a tour. Stops without a location are
/// counted like any other.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBreakdown {
    pub total: usize,
    pub by_status: BTreeMap<VenueStatus, usize>,
    pub by_group: BTreeMap<StatusGroup, usize>,
    pub unlocated: usize,
}

impl StatusBreakdown {
    pub fn from_stops(stops: &[RouteStop]) -> Self {
        let mut breakdown = Self::default();
        for stop in stops {
            let status = stop.assignment.status;
            breakdown.total += 1;
            *breakdown.by_status.entry(status).or_default() += 1;
            *breakdown.by_group.entry(status.group()).or_default() += 1;
            if stop.coordinate().is_none() {
                breakdown.unlocated += 1;
            }
        }
        breakdown
    }

    pub fn count(&self, status: VenueStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }

    pub fn group_count(&self, group: StatusGroup) -> usize {
        self.by_group.get(&group).copied().unwrap_or(0)
    }
}
