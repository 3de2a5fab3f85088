use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Code used by operators to pick the "free text" reason.
pub const OTHER_REASON_CODE: &str = "other";

/// Predefined discrepancy reasons offered on the receiving screen.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum KnownReason {
    Damaged,
    Shortage,
    CountError,
    Expired,
}

impl KnownReason {
    pub fn label(&self) -> &'static str {
        match self {
            KnownReason::Damaged => "Damaged in Transit",
            KnownReason::Shortage => "Supplier Shortage",
            KnownReason::CountError => "Count Error",
            KnownReason::Expired => "Expired Items",
        }
    }
}

/// Free-text reason. Never blank; surrounding whitespace is trimmed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OtherReason(String);

impl OtherReason {
    pub fn new(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Why a line's received quantity differs from what was expected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiscrepancyReason {
    Known(KnownReason),
    Other(OtherReason),
}

/// Failure to turn raw reason input into a [`DiscrepancyReason`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReasonParseError {
    Missing,
    BlankOther,
    Unknown(String),
}

impl DiscrepancyReason {
    /// Builds a reason from the raw code and free-text the operator entered.
    pub fn parse(code: &str, other_text: &str) -> Result<Self, ReasonParseError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(ReasonParseError::Missing);
        }
        if code.eq_ignore_ascii_case(OTHER_REASON_CODE) {
            return OtherReason::new(other_text)
                .map(DiscrepancyReason::Other)
                .ok_or(ReasonParseError::BlankOther);
        }
        KnownReason::from_str(code)
            .map(DiscrepancyReason::Known)
            .map_err(|_| ReasonParseError::Unknown(code.to_string()))
    }

    /// Code persisted in `grn_draft_lines.discrepancy_reason`.
    pub fn code(&self) -> &str {
        match self {
            DiscrepancyReason::Known(reason) => reason.as_ref(),
            DiscrepancyReason::Other(_) => OTHER_REASON_CODE,
        }
    }

    pub fn other_text(&self) -> Option<&str> {
        match self {
            DiscrepancyReason::Known(_) => None,
            DiscrepancyReason::Other(text) => Some(text.as_str()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            DiscrepancyReason::Known(reason) => reason.label(),
            DiscrepancyReason::Other(text) => text.as_str(),
        }
    }
}

impl fmt::Display for DiscrepancyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
