use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// How posting a receipt changes a product's on-hand balance.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum StockUpdateMode {
    /// The received count becomes the on-hand (recount on receipt). Several
    /// lines for one product in the same receipt add up.
    #[default]
    Absolute,
    /// The received count is added to the existing on-hand.
    Additive,
}

impl StockUpdateMode {
    /// Computes the balance after applying `qty_received`.
    ///
    /// `first_touch` is true for the first line of the receipt that touches
    /// the product.
    pub fn apply(self, stock_before: Decimal, qty_received: Decimal, first_touch: bool) -> Decimal {
        match self {
            StockUpdateMode::Absolute if first_touch => qty_received,
            StockUpdateMode::Absolute | StockUpdateMode::Additive => stock_before + qty_received,
        }
    }
}

/// Stock level classification shown next to catalog rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StockStatus {
    Zero,
    Low,
    Normal,
}

impl StockStatus {
    pub fn classify(on_hand: Decimal, low_threshold: Decimal) -> Self {
        if on_hand.is_zero() {
            StockStatus::Zero
        } else if on_hand < low_threshold {
            StockStatus::Low
        } else {
            StockStatus::Normal
        }
    }
}
