use crate::{
    db::DbPool,
    entities::{
        grn_draft, grn_draft_line, inventory_movement, inventory_on_hand, GrnDraft, GrnDraftLine,
        GrnStatus, InventoryMovement, InventoryOnHand, MovementType, Product,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::{validation, StockUpdateMode, ValidatedLine},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionError, TransactionTrait,
};
use serde::Serialize;
use std::{collections::HashSet, sync::Arc};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Outcome of posting a receipt to inventory.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PostResult {
    pub grn_id: Uuid,
    pub grn_number: String,
    pub lines_processed: i32,
    pub products_updated: i32,
    pub movements_inserted: i32,
    pub posted_by: String,
    pub posted_at: DateTime<Utc>,
    #[schema(value_type = String, example = "POSTED")]
    pub status: GrnStatus,
    /// True when this is the stored result of an earlier request with the
    /// same request id.
    pub replayed: bool,
}

impl PostResult {
    fn from_stored(grn: &grn_draft::Model) -> Result<Self, ServiceError> {
        match (
            grn.posted_by.as_ref(),
            grn.posted_at,
            grn.lines_processed,
            grn.products_updated,
            grn.movements_inserted,
        ) {
            (
                Some(posted_by),
                Some(posted_at),
                Some(lines_processed),
                Some(products_updated),
                Some(movements_inserted),
            ) => Ok(Self {
                grn_id: grn.id,
                grn_number: grn.grn_number.clone(),
                lines_processed,
                products_updated,
                movements_inserted,
                posted_by: posted_by.clone(),
                posted_at,
                status: grn.status,
                replayed: true,
            }),
            _ => Err(ServiceError::InternalError(format!(
                "GRN {} is {} but carries no posting record",
                grn.grn_number, grn.status
            ))),
        }
    }
}

/// Reads the on-hand row a line is about to update.
///
/// The returned `version` is what the update is conditioned on, so a row
/// changed after this read makes the post fail instead of overwriting it.
#[async_trait]
pub trait OnHandReader: Send + Sync {
    async fn read_on_hand(
        &self,
        txn: &DatabaseTransaction,
        product_id: Uuid,
    ) -> Result<Option<inventory_on_hand::Model>, ServiceError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SeaOrmOnHandReader;

#[async_trait]
impl OnHandReader for SeaOrmOnHandReader {
    async fn read_on_hand(
        &self,
        txn: &DatabaseTransaction,
        product_id: Uuid,
    ) -> Result<Option<inventory_on_hand::Model>, ServiceError> {
        InventoryOnHand::find_by_id(product_id)
            .one(txn)
            .await
            .map_err(ServiceError::db_error)
    }
}

/// Applies a saved receipt to the stock ledger.
///
/// A post either lands completely (every on-hand row, every movement and the
/// status flip) or leaves the database untouched.
#[derive(Clone)]
pub struct PostingService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
    mode: StockUpdateMode,
    reader: Arc<dyn OnHandReader>,
}

impl PostingService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender, mode: StockUpdateMode) -> Self {
        Self::with_reader(db_pool, event_sender, mode, Arc::new(SeaOrmOnHandReader))
    }

    pub fn with_reader(
        db_pool: Arc<DbPool>,
        event_sender: EventSender,
        mode: StockUpdateMode,
        reader: Arc<dyn OnHandReader>,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            mode,
            reader,
        }
    }

    pub fn mode(&self) -> StockUpdateMode {
        self.mode
    }

    /// Posts a DRAFT receipt.
    ///
    /// Retrying with the same `request_id` after a success returns the stored
    /// result without touching inventory again. Any other attempt on a
    /// receipt that has left DRAFT is a conflict.
    #[instrument(skip(self), fields(mode = %self.mode))]
    pub async fn post(
        &self,
        grn_id: Uuid,
        posted_by: &str,
        request_id: Option<Uuid>,
    ) -> Result<PostResult, ServiceError> {
        let posted_by = posted_by.trim();
        if posted_by.is_empty() {
            return Err(ServiceError::ValidationError(
                "posted_by is required".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let posted_by = posted_by.to_string();
        let mode = self.mode;
        let reader = self.reader.clone();

        let result = db
            .transaction::<_, PostResult, ServiceError>(move |txn| {
                Box::pin(async move {
                    let grn = GrnDraft::find_by_id(grn_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("GRN {} not found", grn_id))
                        })?;

                    if grn.status != GrnStatus::Draft {
                        if request_id.is_some() && request_id == grn.post_request_id {
                            info!(%grn_id, "Replaying stored result for repeated post request");
                            return PostResult::from_stored(&grn);
                        }
                        warn!(%grn_id, status = %grn.status, "Refusing to post GRN twice");
                        return Err(ServiceError::Conflict(format!(
                            "GRN {} is already {}",
                            grn.grn_number, grn.status
                        )));
                    }

                    let stored_lines = GrnDraftLine::find()
                        .filter(grn_draft_line::Column::GrnId.eq(grn_id))
                        .order_by_asc(grn_draft_line::Column::LineNo)
                        .all(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    let validated = validation::validate_parts(
                        Some(grn.received_date),
                        grn.notes.as_deref().unwrap_or_default(),
                        &stored_lines,
                    )?;

                    let posted_at = Utc::now();
                    let mut touched = HashSet::new();
                    for line in &validated.lines {
                        let first_touch = touched.insert(line.product_id);
                        apply_line(
                            txn,
                            reader.as_ref(),
                            &grn,
                            line,
                            mode,
                            first_touch,
                            &posted_by,
                            posted_at,
                        )
                        .await?;
                    }

                    let lines_processed = validated.lines.len() as i32;
                    let products_updated = touched.len() as i32;
                    let movements_inserted = lines_processed;

                    let flipped = GrnDraft::update_many()
                        .set(grn_draft::ActiveModel {
                            status: Set(GrnStatus::Posted),
                            posted_by: Set(Some(posted_by.clone())),
                            posted_at: Set(Some(posted_at)),
                            post_request_id: Set(request_id),
                            lines_processed: Set(Some(lines_processed)),
                            products_updated: Set(Some(products_updated)),
                            movements_inserted: Set(Some(movements_inserted)),
                            ..Default::default()
                        })
                        .filter(grn_draft::Column::Id.eq(grn_id))
                        .filter(grn_draft::Column::Status.eq(GrnStatus::Draft))
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    if flipped.rows_affected == 0 {
                        return Err(ServiceError::Conflict(format!(
                            "GRN {} was posted by another request",
                            grn.grn_number
                        )));
                    }

                    Ok(PostResult {
                        grn_id,
                        grn_number: grn.grn_number,
                        lines_processed,
                        products_updated,
                        movements_inserted,
                        posted_by,
                        posted_at,
                        status: GrnStatus::Posted,
                        replayed: false,
                    })
                })
            })
            .await
            .map_err(|e| {
                let err = match e {
                    TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                    TransactionError::Transaction(service_err) => service_err,
                };
                error!(%grn_id, "GRN post rolled back: {}", err);
                err
            })?;

        if result.replayed {
            return Ok(result);
        }

        info!(
            grn_id = %result.grn_id,
            grn_number = %result.grn_number,
            lines_processed = result.lines_processed,
            products_updated = result.products_updated,
            "GRN posted"
        );

        self.event_sender
            .send_or_log(Event::GrnPosted {
                grn_id: result.grn_id,
                grn_number: result.grn_number.clone(),
                lines_processed: result.lines_processed,
                products_updated: result.products_updated,
                movements_inserted: result.movements_inserted,
                posted_by: result.posted_by.clone(),
                posted_at: result.posted_at,
            })
            .await;

        Ok(result)
    }
}

/// Updates on-hand for one line and records the movement.
#[allow(clippy::too_many_arguments)]
async fn apply_line(
    txn: &DatabaseTransaction,
    reader: &dyn OnHandReader,
    grn: &grn_draft::Model,
    line: &ValidatedLine,
    mode: StockUpdateMode,
    first_touch: bool,
    posted_by: &str,
    posted_at: DateTime<Utc>,
) -> Result<(), ServiceError> {
    let product_exists = Product::find_by_id(line.product_id)
        .one(txn)
        .await
        .map_err(ServiceError::db_error)?
        .is_some();
    if !product_exists {
        return Err(ServiceError::NotFound(format!(
            "Line {}: product {} not found",
            line.line_no, line.product_id
        )));
    }

    let current = reader.read_on_hand(txn, line.product_id).await?;

    let stock_before = current
        .as_ref()
        .map(|row| row.qty_on_hand)
        .unwrap_or(Decimal::ZERO);
    let stock_after = mode.apply(stock_before, line.qty_received, first_touch);

    match current {
        Some(row) => {
            let updated = InventoryOnHand::update_many()
                .set(inventory_on_hand::ActiveModel {
                    qty_on_hand: Set(stock_after),
                    version: Set(row.version + 1),
                    updated_at: Set(posted_at),
                    ..Default::default()
                })
                .filter(inventory_on_hand::Column::ProductId.eq(line.product_id))
                .filter(inventory_on_hand::Column::Version.eq(row.version))
                .exec(txn)
                .await
                .map_err(ServiceError::db_error)?;

            if updated.rows_affected == 0 {
                warn!(product_id = %line.product_id, "On-hand changed underneath the post");
                return Err(ServiceError::ConcurrentModification(line.product_id));
            }
        }
        None => {
            InventoryOnHand::insert(inventory_on_hand::ActiveModel {
                product_id: Set(line.product_id),
                qty_on_hand: Set(stock_after),
                version: Set(1),
                updated_at: Set(posted_at),
            })
            .exec_without_returning(txn)
            .await
            .map_err(ServiceError::db_error)?;
        }
    }

    InventoryMovement::insert(inventory_movement::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(line.product_id),
        grn_id: Set(grn.id),
        line_no: Set(line.line_no as i32),
        movement_type: Set(MovementType::GrnReceipt),
        quantity_delta: Set(stock_after - stock_before),
        stock_before: Set(stock_before),
        stock_after: Set(stock_after),
        created_by: Set(posted_by.to_string()),
        created_at: Set(posted_at),
    })
    .exec_without_returning(txn)
    .await
    .map_err(ServiceError::db_error)?;

    Ok(())
}
