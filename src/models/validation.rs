//! Pure validation of a receipt under construction.
//!
//! Rules run in a fixed order and the first failure wins, so the caller can
//! show the operator one message at a time. No I/O happens here.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use super::draft::{DraftLine, GrnDraft};
use super::reason::{DiscrepancyReason, ReasonParseError};
use crate::entities::grn_draft_line;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrnViolation {
    #[error("Missing received date")]
    MissingReceivedDate,

    #[error("At least one line item is required")]
    NoLineItems,

    #[error("Line {line}: Product is required")]
    ProductRequired { line: usize },

    #[error("Line {line}: Qty expected must be 0 or higher")]
    QtyExpectedInvalid { line: usize },

    #[error("Line {line}: Qty received must be 1 or higher")]
    QtyReceivedTooLow { line: usize },

    #[error("Line {line}: Discrepancy reason is required")]
    ReasonRequired { line: usize },

    #[error("Line {line}: Please type Other reason")]
    OtherReasonRequired { line: usize },

    #[error("Line {line}: Unknown discrepancy reason '{code}'")]
    UnknownReason { line: usize, code: String },
}

/// A line that passed every rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedLine {
    pub line_no: usize,
    pub product_id: Uuid,
    pub qty_expected: Decimal,
    pub qty_received: Decimal,
    /// Present exactly when the quantities differ
    pub reason: Option<DiscrepancyReason>,
}

impl ValidatedLine {
    pub fn variance(&self) -> Decimal {
        variance(self.qty_expected, self.qty_received)
    }

    pub fn has_discrepancy(&self) -> bool {
        !self.variance().is_zero()
    }
}

/// A receipt that is safe to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedGrn {
    pub received_date: NaiveDate,
    pub notes: Option<String>,
    pub lines: Vec<ValidatedLine>,
}

impl ValidatedGrn {
    pub fn has_discrepancy(&self) -> bool {
        self.lines.iter().any(ValidatedLine::has_discrepancy)
    }
}

pub fn variance(qty_expected: Decimal, qty_received: Decimal) -> Decimal {
    qty_received - qty_expected
}

/// Raw, not yet trusted view of a line.
///
/// Implemented for the in-memory draft line and for lines read back from
/// storage, so the same rules guard both save and post.
pub trait LineInput {
    fn product_id(&self) -> Option<Uuid>;
    fn qty_expected(&self) -> Option<Decimal>;
    fn qty_received(&self) -> Option<Decimal>;
    fn reason_code(&self) -> &str;
    fn other_reason(&self) -> &str;
}

pub(crate) fn parse_quantity(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed).ok()
}

impl LineInput for DraftLine {
    fn product_id(&self) -> Option<Uuid> {
        self.product_id
    }

    fn qty_expected(&self) -> Option<Decimal> {
        parse_quantity(&self.qty_expected)
    }

    fn qty_received(&self) -> Option<Decimal> {
        parse_quantity(&self.qty_received)
    }

    fn reason_code(&self) -> &str {
        &self.discrepancy_reason
    }

    fn other_reason(&self) -> &str {
        &self.other_reason
    }
}

impl LineInput for grn_draft_line::Model {
    fn product_id(&self) -> Option<Uuid> {
        Some(self.product_id)
    }

    fn qty_expected(&self) -> Option<Decimal> {
        Some(self.qty_expected)
    }

    fn qty_received(&self) -> Option<Decimal> {
        Some(self.qty_received)
    }

    fn reason_code(&self) -> &str {
        self.discrepancy_reason.as_deref().unwrap_or_default()
    }

    fn other_reason(&self) -> &str {
        self.other_reason.as_deref().unwrap_or_default()
    }
}

/// Validates a single line. `line_no` is 1-based.
pub fn validate_line<L: LineInput>(line_no: usize, line: &L) -> Result<ValidatedLine, GrnViolation> {
    let product_id = line
        .product_id()
        .ok_or(GrnViolation::ProductRequired { line: line_no })?;

    let qty_expected = line
        .qty_expected()
        .filter(|qty| !qty.is_sign_negative() || qty.is_zero())
        .ok_or(GrnViolation::QtyExpectedInvalid { line: line_no })?;

    let qty_received = line
        .qty_received()
        .filter(|qty| *qty >= Decimal::ONE)
        .ok_or(GrnViolation::QtyReceivedTooLow { line: line_no })?;

    let reason = if qty_expected != qty_received {
        let reason = DiscrepancyReason::parse(line.reason_code(), line.other_reason()).map_err(
            |err| match err {
                ReasonParseError::Missing => GrnViolation::ReasonRequired { line: line_no },
                ReasonParseError::BlankOther => {
                    GrnViolation::OtherReasonRequired { line: line_no }
                }
                ReasonParseError::Unknown(code) => GrnViolation::UnknownReason {
                    line: line_no,
                    code,
                },
            },
        )?;
        Some(reason)
    } else {
        None
    };

    Ok(ValidatedLine {
        line_no,
        product_id,
        qty_expected,
        qty_received,
        reason,
    })
}

/// Validates header fields and lines in order; the first violation wins.
pub fn validate_parts<L: LineInput>(
    received_date: Option<NaiveDate>,
    notes: &str,
    lines: &[L],
) -> Result<ValidatedGrn, GrnViolation> {
    let received_date = received_date.ok_or(GrnViolation::MissingReceivedDate)?;

    if !lines.iter().any(|line| line.product_id().is_some()) {
        return Err(GrnViolation::NoLineItems);
    }

    let lines = lines
        .iter()
        .enumerate()
        .map(|(idx, line)| validate_line(idx + 1, line))
        .collect::<Result<Vec<_>, _>>()?;

    let notes = notes.trim();
    Ok(ValidatedGrn {
        received_date,
        notes: (!notes.is_empty()).then(|| notes.to_string()),
        lines,
    })
}

pub fn validate(draft: &GrnDraft) -> Result<ValidatedGrn, GrnViolation> {
    validate_parts(draft.received_date(), draft.notes(), draft.lines())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::draft::LineField;
    use rust_decimal_macros::dec;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn draft_with(expected: &str, received: &str, reason: &str, other: &str) -> GrnDraft {
        let mut draft = GrnDraft::new(Some(date()));
        let line = draft.lines()[0].id;
        draft
            .update_field(line, LineField::Product(Some(Uuid::new_v4())))
            .unwrap();
        draft
            .update_field(line, LineField::QtyExpected(expected.into()))
            .unwrap();
        draft
            .update_field(line, LineField::QtyReceived(received.into()))
            .unwrap();
        draft
            .update_field(line, LineField::DiscrepancyReason(reason.into()))
            .unwrap();
        draft
            .update_field(line, LineField::OtherReason(other.into()))
            .unwrap();
        draft
    }

    #[test]
    fn matching_line_needs_no_reason() {
        let grn = validate(&draft_with("100", "100", "", "")).unwrap();
        assert!(!grn.has_discrepancy());
        assert_eq!(grn.lines[0].variance(), Decimal::ZERO);
        assert_eq!(grn.lines[0].reason, None);
    }

    #[test]
    fn matching_line_drops_stray_reason() {
        let grn = validate(&draft_with("100", "100", "shortage", "")).unwrap();
        assert_eq!(grn.lines[0].reason, None);
    }

    #[test]
    fn shortage_line_keeps_reason_and_negative_variance() {
        let grn = validate(&draft_with("100", "85", "shortage", "")).unwrap();
        assert!(grn.has_discrepancy());
        assert_eq!(grn.lines[0].variance(), dec!(-15));
        assert_eq!(grn.lines[0].reason.as_ref().map(|r| r.code()), Some("shortage"));
    }

    #[test]
    fn other_reason_must_be_typed() {
        let err = validate(&draft_with("50", "60", "other", "  ")).unwrap_err();
        assert_eq!(err.to_string(), "Line 1: Please type Other reason");
    }

    #[test]
    fn mismatch_without_reason_is_rejected() {
        let err = validate(&draft_with("50", "60", "", "")).unwrap_err();
        assert_eq!(err, GrnViolation::ReasonRequired { line: 1 });
    }

    #[test]
    fn missing_date_wins_over_everything() {
        let mut draft = draft_with("", "0", "", "");
        draft.set_received_date(None);
        assert_eq!(validate(&draft).unwrap_err(), GrnViolation::MissingReceivedDate);
    }

    #[test]
    fn single_empty_line_is_rejected() {
        let draft = GrnDraft::new(Some(date()));
        let err = validate(&draft).unwrap_err();
        assert_eq!(err.to_string(), "At least one line item is required");
    }

    #[test]
    fn quantity_rules() {
        for expected in ["", "-1", "abc", "NaN", "inf"] {
            assert_eq!(
                validate(&draft_with(expected, "5", "", "")).unwrap_err(),
                GrnViolation::QtyExpectedInvalid { line: 1 },
                "expected {expected:?}"
            );
        }
        for received in ["", "0", "0.5", "-3"] {
            assert_eq!(
                validate(&draft_with("5", received, "", "")).unwrap_err(),
                GrnViolation::QtyReceivedTooLow { line: 1 },
                "received {received:?}"
            );
        }
        assert!(validate(&draft_with("0", "1", "count_error", "")).is_ok());
    }

    #[test]
    fn reports_offending_line_number() {
        let mut draft = draft_with("10", "10", "", "");
        let second = draft.add_line();
        draft
            .update_field(second, LineField::Product(Some(Uuid::new_v4())))
            .unwrap();
        draft
            .update_field(second, LineField::QtyExpected("3".into()))
            .unwrap();
        let err = validate(&draft).unwrap_err();
        assert_eq!(err.to_string(), "Line 2: Qty received must be 1 or higher");
    }

    #[test]
    fn notes_are_trimmed_and_blank_becomes_none() {
        let mut draft = draft_with("1", "1", "", "");
        draft.set_notes("   ");
        assert_eq!(validate(&draft).unwrap().notes, None);
        draft.set_notes("  cold chain ok ");
        assert_eq!(validate(&draft).unwrap().notes.as_deref(), Some("cold chain ok"));
    }
}
