use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

use crate::entities::GrnStatus;

/// Review state of a receipt with discrepancies, as shown to approvers.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    /// Maps a raw persisted status onto the review vocabulary.
    ///
    /// `draft`, `posted` and `pending` (any case) all mean the receipt still
    /// waits for a decision; unrecognised values are treated the same way.
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "approved" => ReviewStatus::Approved,
            "rejected" => ReviewStatus::Rejected,
            _ => ReviewStatus::Pending,
        }
    }
}

impl From<GrnStatus> for ReviewStatus {
    fn from(status: GrnStatus) -> Self {
        ReviewStatus::normalize(&status.to_string())
    }
}

/// Filter accepted by the discrepancy list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(ReviewStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: ReviewStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => *wanted == status,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(StatusFilter::All),
            "pending" => Ok(StatusFilter::Only(ReviewStatus::Pending)),
            "approved" => Ok(StatusFilter::Only(ReviewStatus::Approved)),
            "rejected" => Ok(StatusFilter::Only(ReviewStatus::Rejected)),
            other => Err(format!(
                "Unknown status filter '{}'; expected all, pending, approved or rejected",
                other
            )),
        }
    }
}

/// Decision an approver records on a receipt with discrepancies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl ReviewDecision {
    pub fn target_status(self) -> GrnStatus {
        match self {
            ReviewDecision::Approved => GrnStatus::Approved,
            ReviewDecision::Rejected => GrnStatus::Rejected,
        }
    }
}
