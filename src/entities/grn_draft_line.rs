use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The `grn_draft_lines` table. Lines are owned by their header and are
/// ordered by `line_no` (1-based, dense).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "grn_draft_lines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub grn_id: Uuid,
    pub line_no: i32,
    pub product_id: Uuid,
    /// Snapshot of the catalog name at save time
    pub product_name: String,
    pub sku: String,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub qty_expected: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub qty_received: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub variance: Option<Decimal>,
    /// Reason code, only set when received differs from expected
    pub discrepancy_reason: Option<String>,
    pub other_reason: Option<String>,
}

impl Model {
    /// Variance derived from the stored quantities.
    pub fn computed_variance(&self) -> Decimal {
        self.qty_received - self.qty_expected
    }

    pub fn has_discrepancy(&self) -> bool {
        !self.computed_variance().is_zero()
    }
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
