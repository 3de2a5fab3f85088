//! Domain types for the receiving workflow that live outside the database.

pub mod draft;
pub mod reason;
pub mod review;
pub mod stock;
pub mod validation;

pub use draft::{DraftError, DraftLine, GrnDraft, LineField, LineId, SavedHandle, ScannedProduct};
pub use reason::{DiscrepancyReason, KnownReason, OtherReason};
pub use review::{ReviewDecision, ReviewStatus, StatusFilter};
pub use stock::{StockStatus, StockUpdateMode};
pub use validation::{GrnViolation, ValidatedGrn, ValidatedLine};
