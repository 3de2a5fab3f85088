use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(
    Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum MovementType {
    #[sea_orm(string_value = "GRN_RECEIPT")]
    #[strum(serialize = "GRN_RECEIPT")]
    #[serde(rename = "GRN_RECEIPT")]
    GrnReceipt,
}

/// Append-only ledger entry. Rows are inserted by the posting engine and
/// never updated or deleted.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub grn_id: Uuid,
    pub line_no: i32,
    pub movement_type: MovementType,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub quantity_delta: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub stock_before: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub stock_after: Decimal,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::grn_draft::Entity",
        from = "Column::GrnId",
        to = "super::grn_draft::Column::Id"
    )]
    GrnDraft,
}

impl Related<super::grn_draft::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GrnDraft.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
