//! In-memory receipt under construction.
//!
//! The draft remembers the handle of its last successful save. Every change
//! to the header or lines drops that handle, so a stale handle can never be
//! posted.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use super::validation::{self, GrnViolation, ValidatedGrn};

/// Stable identity of a line inside a draft, independent of its position.
pub type LineId = Uuid;

/// Identity of a durably saved draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SavedHandle {
    pub grn_id: Uuid,
    pub grn_number: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DraftLine {
    pub id: LineId,
    pub product_id: Option<Uuid>,
    /// Raw operator input, parsed during validation
    pub qty_expected: String,
    pub qty_received: String,
    pub discrepancy_reason: String,
    pub other_reason: String,
}

impl DraftLine {
    fn empty() -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id: None,
            qty_expected: String::new(),
            qty_received: String::new(),
            discrepancy_reason: String::new(),
            other_reason: String::new(),
        }
    }
}

/// A single editable field of a line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineField {
    Product(Option<Uuid>),
    QtyExpected(String),
    QtyReceived(String),
    DiscrepancyReason(String),
    OtherReason(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("Line {0} does not exist in this draft")]
    UnknownLine(LineId),
    #[error("A receipt must keep at least one line")]
    LastLine,
}

/// Product picked up by the barcode scanner.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedProduct {
    pub product_id: Uuid,
    pub on_hand: Decimal,
}

#[derive(Debug, Clone)]
pub struct GrnDraft {
    received_date: Option<NaiveDate>,
    notes: String,
    lines: Vec<DraftLine>,
    saved: Option<SavedHandle>,
}

impl GrnDraft {
    /// Starts a draft with one empty line slot.
    pub fn new(received_date: Option<NaiveDate>) -> Self {
        Self {
            received_date,
            notes: String::new(),
            lines: vec![DraftLine::empty()],
            saved: None,
        }
    }

    pub fn received_date(&self) -> Option<NaiveDate> {
        self.received_date
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn lines(&self) -> &[DraftLine] {
        &self.lines
    }

    pub fn line(&self, line_id: LineId) -> Option<&DraftLine> {
        self.lines.iter().find(|line| line.id == line_id)
    }

    pub fn saved(&self) -> Option<&SavedHandle> {
        self.saved.as_ref()
    }

    /// Remembers the handle returned by a successful save.
    pub fn mark_saved(&mut self, handle: SavedHandle) {
        self.saved = Some(handle);
    }

    fn invalidate(&mut self) {
        self.saved = None;
    }

    pub fn set_received_date(&mut self, date: Option<NaiveDate>) {
        self.received_date = date;
        self.invalidate();
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
        self.invalidate();
    }

    /// Appends an empty line and returns its id.
    pub fn add_line(&mut self) -> LineId {
        let line = DraftLine::empty();
        let id = line.id;
        self.lines.push(line);
        self.invalidate();
        id
    }

    /// Removes a line. Refused when it is the only one left; a refusal
    /// leaves the draft and its saved handle untouched.
    pub fn remove_line(&mut self, line_id: LineId) -> Result<(), DraftError> {
        let idx = self
            .lines
            .iter()
            .position(|line| line.id == line_id)
            .ok_or(DraftError::UnknownLine(line_id))?;
        if self.lines.len() == 1 {
            return Err(DraftError::LastLine);
        }
        self.lines.remove(idx);
        self.invalidate();
        Ok(())
    }

    pub fn update_field(&mut self, line_id: LineId, field: LineField) -> Result<(), DraftError> {
        let line = self
            .lines
            .iter_mut()
            .find(|line| line.id == line_id)
            .ok_or(DraftError::UnknownLine(line_id))?;

        match field {
            LineField::Product(product_id) => line.product_id = product_id,
            LineField::QtyExpected(value) => line.qty_expected = value,
            LineField::QtyReceived(value) => line.qty_received = value,
            LineField::DiscrepancyReason(value) => line.discrepancy_reason = value,
            LineField::OtherReason(value) => line.other_reason = value,
        }
        self.invalidate();
        Ok(())
    }

    /// Places a scanned product on the receipt.
    ///
    /// A fresh draft's single empty slot is filled in place; otherwise a new
    /// line is appended. Expected quantity starts at the current on-hand.
    pub fn insert_scanned(&mut self, product: &ScannedProduct) -> LineId {
        let qty_expected = product.on_hand.normalize().to_string();

        let fill_slot = matches!(self.lines.as_slice(), [only] if only.product_id.is_none());
        if !fill_slot {
            self.lines.push(DraftLine::empty());
        }
        let last = self.lines.len() - 1;
        let line = &mut self.lines[last];
        line.product_id = Some(product.product_id);
        line.qty_expected = qty_expected;
        let id = line.id;

        self.invalidate();
        id
    }

    pub fn validate(&self) -> Result<ValidatedGrn, GrnViolation> {
        validation::validate(self)
    }

    /// Returns the builder to its initial state: one empty line, no notes,
    /// no saved handle.
    pub fn reset(&mut self, received_date: Option<NaiveDate>) {
        *self = GrnDraft::new(received_date);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn handle() -> SavedHandle {
        SavedHandle {
            grn_id: Uuid::new_v4(),
            grn_number: "GRN-20240315-101010000".into(),
        }
    }

    fn saved_draft() -> GrnDraft {
        let mut draft = GrnDraft::new(NaiveDate::from_ymd_opt(2024, 3, 15));
        draft.mark_saved(handle());
        draft
    }

    #[test]
    fn new_draft_has_one_empty_line() {
        let draft = GrnDraft::new(None);
        assert_eq!(draft.lines().len(), 1);
        assert!(draft.lines()[0].product_id.is_none());
        assert!(draft.saved().is_none());
    }

    #[test]
    fn every_mutation_clears_saved_handle() {
        let mut draft = saved_draft();
        draft.add_line();
        assert!(draft.saved().is_none());

        let mut draft = saved_draft();
        let line = draft.lines()[0].id;
        draft
            .update_field(line, LineField::QtyReceived("7".into()))
            .unwrap();
        assert!(draft.saved().is_none());

        let mut draft = saved_draft();
        let extra = {
            draft.add_line();
            draft.mark_saved(handle());
            draft.lines()[1].id
        };
        draft.remove_line(extra).unwrap();
        assert!(draft.saved().is_none());

        let mut draft = saved_draft();
        draft.set_notes("late truck");
        assert!(draft.saved().is_none());
    }

    #[test]
    fn removing_last_line_is_refused_and_keeps_handle() {
        let mut draft = saved_draft();
        let only = draft.lines()[0].id;
        assert_eq!(draft.remove_line(only), Err(DraftError::LastLine));
        assert_eq!(draft.lines().len(), 1);
        assert!(draft.saved().is_some());
    }

    #[test]
    fn unknown_line_is_an_error_and_keeps_handle() {
        let mut draft = saved_draft();
        let missing = Uuid::new_v4();
        assert_eq!(
            draft.update_field(missing, LineField::OtherReason("x".into())),
            Err(DraftError::UnknownLine(missing))
        );
        assert!(draft.saved().is_some());
    }

    #[test]
    fn line_ids_are_stable_across_removal() {
        let mut draft = GrnDraft::new(None);
        let first = draft.lines()[0].id;
        let second = draft.add_line();
        let third = draft.add_line();
        draft.remove_line(second).unwrap();
        let ids: Vec<_> = draft.lines().iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![first, third]);
    }

    #[test]
    fn scan_fills_empty_slot_then_appends() {
        let mut draft = GrnDraft::new(None);
        let slot = draft.lines()[0].id;
        let p1 = ScannedProduct {
            product_id: Uuid::new_v4(),
            on_hand: dec!(120.0000),
        };
        assert_eq!(draft.insert_scanned(&p1), slot);
        assert_eq!(draft.lines().len(), 1);
        assert_eq!(draft.lines()[0].qty_expected, "120");

        let p2 = ScannedProduct {
            product_id: Uuid::new_v4(),
            on_hand: Decimal::ZERO,
        };
        let appended = draft.insert_scanned(&p2);
        assert_ne!(appended, slot);
        assert_eq!(draft.lines().len(), 2);
        assert_eq!(draft.line(appended).unwrap().product_id, Some(p2.product_id));
        assert_eq!(draft.line(appended).unwrap().qty_expected, "0");
    }

    #[test]
    fn reset_starts_over() {
        let mut draft = saved_draft();
        draft.add_line();
        draft.set_notes("x");
        draft.reset(None);
        assert_eq!(draft.lines().len(), 1);
        assert_eq!(draft.notes(), "");
        assert!(draft.saved().is_none());
    }
}
