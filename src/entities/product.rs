use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Product master row as exposed by the catalog. Read-only to receiving.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// SKU (Stock Keeping Unit)
    #[sea_orm(unique)]
    pub sku: String,

    /// Display name
    pub name: String,

    /// Unit of measure (e.g. "box", "vial")
    pub unit: String,

    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::inventory_on_hand::Entity")]
    InventoryOnHand,
}

impl Related<super::inventory_on_hand::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryOnHand.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
