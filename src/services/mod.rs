//! Database-backed services of the receiving workflow.

pub mod catalog;
pub mod discrepancy_review;
pub mod grn_drafts;
pub mod grn_posting;
pub mod receiving_session;
