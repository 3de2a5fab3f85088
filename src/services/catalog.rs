use crate::{
    db::DbPool,
    entities::{inventory_on_hand, product, InventoryOnHand, Product},
    errors::ServiceError,
    models::{ScannedProduct, StockStatus},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Expr, Func},
    ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

/// Catalog row with its current on-hand balance.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ProductStock {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub unit: String,
    pub on_hand_qty: Decimal,
    pub last_updated: Option<DateTime<Utc>>,
    pub status: StockStatus,
}

impl ProductStock {
    pub fn as_scanned(&self) -> ScannedProduct {
        ScannedProduct {
            product_id: self.id,
            on_hand: self.on_hand_qty,
        }
    }
}

/// Read-only view over product master data and on-hand balances.
#[derive(Clone)]
pub struct CatalogService {
    db_pool: Arc<DbPool>,
    low_stock_threshold: Decimal,
}

impl CatalogService {
    pub fn new(db_pool: Arc<DbPool>, low_stock_threshold: Decimal) -> Self {
        Self {
            db_pool,
            low_stock_threshold,
        }
    }

    fn to_stock(
        &self,
        product: product::Model,
        on_hand: Option<inventory_on_hand::Model>,
    ) -> ProductStock {
        let on_hand_qty = on_hand
            .as_ref()
            .map(|row| row.qty_on_hand)
            .unwrap_or(Decimal::ZERO);
        ProductStock {
            id: product.id,
            sku: product.sku,
            name: product.name,
            unit: product.unit,
            on_hand_qty,
            last_updated: on_hand.map(|row| row.updated_at),
            status: StockStatus::classify(on_hand_qty, self.low_stock_threshold),
        }
    }

    /// Lists products ordered by name. `search` matches name or SKU,
    /// ignoring case.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        search: Option<&str>,
    ) -> Result<Vec<ProductStock>, ServiceError> {
        let db = &*self.db_pool;

        let mut query = Product::find().find_also_related(InventoryOnHand);

        if let Some(term) = search.map(str::trim).filter(|term| !term.is_empty()) {
            let pattern = format!("%{}%", term.to_lowercase());
            query = query.filter(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col((Product, product::Column::Name))))
                            .like(pattern.clone()),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col((Product, product::Column::Sku))))
                            .like(pattern),
                    ),
            );
        }

        let rows = query
            .order_by_asc(product::Column::Name)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(rows
            .into_iter()
            .map(|(product, on_hand)| self.to_stock(product, on_hand))
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, product_id: Uuid) -> Result<ProductStock, ServiceError> {
        let db = &*self.db_pool;

        let (product, on_hand) = Product::find_by_id(product_id)
            .find_also_related(InventoryOnHand)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        Ok(self.to_stock(product, on_hand))
    }

    /// Resolves a scanned barcode (SKU) to a catalog row.
    #[instrument(skip(self))]
    pub async fn find_by_sku(&self, sku: &str) -> Result<ProductStock, ServiceError> {
        let db = &*self.db_pool;

        let (product, on_hand) = Product::find()
            .filter(product::Column::Sku.eq(sku.trim()))
            .find_also_related(InventoryOnHand)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("No product with SKU {}", sku)))?;

        Ok(self.to_stock(product, on_hand))
    }
}
