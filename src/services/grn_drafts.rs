use crate::{
    db::DbPool,
    entities::{grn_draft, grn_draft_line, product, GrnDraft, GrnDraftLine, GrnStatus, Product},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{SavedHandle, ValidatedGrn},
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionError, TransactionTrait,
};
use serde::Serialize;
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

const UNKNOWN_PRODUCT_NAME: &str = "Unknown";
const UNKNOWN_SKU: &str = "N/A";

/// Builds `GRN-{YYYYMMDD}-{HHMMSSmmm}` from the received date and the save
/// instant.
pub fn grn_number(received_date: NaiveDate, saved_at: DateTime<Utc>) -> String {
    format!(
        "GRN-{}-{}",
        received_date.format("%Y%m%d"),
        saved_at.format("%H%M%S%3f")
    )
}

/// Stored line as returned by the read endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct GrnLineView {
    pub line_no: i32,
    pub product_id: Uuid,
    pub product_name: String,
    pub sku: String,
    pub qty_expected: Decimal,
    pub qty_received: Decimal,
    pub variance: Decimal,
    pub discrepancy_reason: Option<String>,
    pub other_reason: Option<String>,
}

impl From<grn_draft_line::Model> for GrnLineView {
    fn from(line: grn_draft_line::Model) -> Self {
        Self {
            variance: line.variance.unwrap_or_else(|| line.computed_variance()),
            line_no: line.line_no,
            product_id: line.product_id,
            product_name: line.product_name,
            sku: line.sku,
            qty_expected: line.qty_expected,
            qty_received: line.qty_received,
            discrepancy_reason: line.discrepancy_reason,
            other_reason: line.other_reason,
        }
    }
}

/// Stored header with its lines in `line_no` order.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct GrnView {
    pub id: Uuid,
    pub grn_number: String,
    pub received_date: NaiveDate,
    pub notes: Option<String>,
    #[schema(value_type = String, example = "POSTED")]
    pub status: GrnStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub posted_by: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub has_discrepancy: bool,
    pub lines: Vec<GrnLineView>,
}

impl GrnView {
    pub fn new(header: grn_draft::Model, mut lines: Vec<grn_draft_line::Model>) -> Self {
        lines.sort_by_key(|line| line.line_no);
        let has_discrepancy = lines.iter().any(grn_draft_line::Model::has_discrepancy);
        Self {
            id: header.id,
            grn_number: header.grn_number,
            received_date: header.received_date,
            notes: header.notes,
            status: header.status,
            created_by: header.created_by,
            created_at: header.created_at,
            posted_by: header.posted_by,
            posted_at: header.posted_at,
            reviewed_by: header.reviewed_by,
            reviewed_at: header.reviewed_at,
            has_discrepancy,
            lines: lines.into_iter().map(GrnLineView::from).collect(),
        }
    }
}

/// Persistence gateway for receipts: writes a validated draft as one header
/// plus its lines, all or nothing.
#[derive(Clone)]
pub struct GrnDraftService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl GrnDraftService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Saves a validated receipt in a single transaction.
    ///
    /// Every call creates a new header; previously saved receipts are never
    /// touched.
    #[instrument(skip(self, grn), fields(lines = grn.lines.len()))]
    pub async fn save(
        &self,
        grn: &ValidatedGrn,
        created_by: &str,
    ) -> Result<SavedHandle, ServiceError> {
        let created_by = created_by.trim();
        if created_by.is_empty() {
            return Err(ServiceError::ValidationError(
                "created_by is required".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let grn = grn.clone();
        let created_by = created_by.to_string();
        let line_count = grn.lines.len();

        let handle = db
            .transaction::<_, SavedHandle, ServiceError>(move |txn| {
                Box::pin(async move {
                    let now = Utc::now();
                    let number = next_free_number(txn, grn_number(grn.received_date, now)).await?;
                    let grn_id = Uuid::new_v4();

                    let header = grn_draft::ActiveModel {
                        id: Set(grn_id),
                        grn_number: Set(number.clone()),
                        received_date: Set(grn.received_date),
                        notes: Set(grn.notes.clone()),
                        status: Set(GrnStatus::Draft),
                        created_by: Set(created_by),
                        created_at: Set(now),
                        posted_by: Set(None),
                        posted_at: Set(None),
                        post_request_id: Set(None),
                        lines_processed: Set(None),
                        products_updated: Set(None),
                        movements_inserted: Set(None),
                        reviewed_by: Set(None),
                        reviewed_at: Set(None),
                    };
                    GrnDraft::insert(header)
                        .exec_without_returning(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    let product_ids: Vec<Uuid> =
                        grn.lines.iter().map(|line| line.product_id).collect();
                    let catalog: HashMap<Uuid, product::Model> = Product::find()
                        .filter(product::Column::Id.is_in(product_ids))
                        .all(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .into_iter()
                        .map(|product| (product.id, product))
                        .collect();

                    let lines = grn.lines.iter().map(|line| {
                        let snapshot = catalog.get(&line.product_id);
                        grn_draft_line::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            grn_id: Set(grn_id),
                            line_no: Set(line.line_no as i32),
                            product_id: Set(line.product_id),
                            product_name: Set(snapshot
                                .map(|p| p.name.clone())
                                .unwrap_or_else(|| UNKNOWN_PRODUCT_NAME.to_string())),
                            sku: Set(snapshot
                                .map(|p| p.sku.clone())
                                .unwrap_or_else(|| UNKNOWN_SKU.to_string())),
                            qty_expected: Set(line.qty_expected),
                            qty_received: Set(line.qty_received),
                            variance: Set(Some(line.variance())),
                            discrepancy_reason: Set(line
                                .reason
                                .as_ref()
                                .map(|reason| reason.code().to_string())),
                            other_reason: Set(line
                                .reason
                                .as_ref()
                                .and_then(|reason| reason.other_text())
                                .map(str::to_string)),
                        }
                    });
                    GrnDraftLine::insert_many(lines)
                        .exec_without_returning(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    Ok(SavedHandle {
                        grn_id,
                        grn_number: number,
                    })
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        info!(
            grn_id = %handle.grn_id,
            grn_number = %handle.grn_number,
            line_count,
            "GRN draft saved"
        );

        self.event_sender
            .send_or_log(Event::GrnSaved {
                grn_id: handle.grn_id,
                grn_number: handle.grn_number.clone(),
                line_count,
            })
            .await;

        Ok(handle)
    }

    /// Loads a stored receipt with its lines.
    #[instrument(skip(self))]
    pub async fn get_grn(&self, grn_id: Uuid) -> Result<GrnView, ServiceError> {
        let db = &*self.db_pool;

        let header = GrnDraft::find_by_id(grn_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("GRN {} not found", grn_id)))?;

        let lines = header
            .find_related(GrnDraftLine)
            .order_by_asc(grn_draft_line::Column::LineNo)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(GrnView::new(header, lines))
    }
}

/// Returns `base`, or `base-2`, `base-3`, ... when the number is taken.
async fn next_free_number<C: ConnectionTrait>(
    conn: &C,
    base: String,
) -> Result<String, ServiceError> {
    let mut candidate = base.clone();
    let mut suffix = 1;
    loop {
        let taken = GrnDraft::find()
            .filter(grn_draft::Column::GrnNumber.eq(candidate.as_str()))
            .count(conn)
            .await
            .map_err(ServiceError::db_error)?;
        if taken == 0 {
            return Ok(candidate);
        }
        suffix += 1;
        debug!(%candidate, suffix, "GRN number taken, trying next suffix");
        candidate = format!("{}-{}", base, suffix);
    }
}
