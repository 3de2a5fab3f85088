use crate::{
    db::DbPool,
    entities::{grn_draft, grn_draft_line, GrnDraft, GrnDraftLine, GrnStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{ReviewDecision, ReviewStatus, StatusFilter},
    services::grn_drafts::GrnView,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionError, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Writes the recomputed variance of one stored line.
///
/// Called inside the review transaction, once per line, each on its own
/// savepoint.
#[async_trait]
pub trait LineVarianceWriter: Send + Sync {
    async fn write_variance(
        &self,
        txn: &DatabaseTransaction,
        line: &grn_draft_line::Model,
        variance: Decimal,
    ) -> Result<(), ServiceError>;
}

/// Default writer backed by the `grn_draft_lines` table.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeaOrmVarianceWriter;

#[async_trait]
impl LineVarianceWriter for SeaOrmVarianceWriter {
    async fn write_variance(
        &self,
        txn: &DatabaseTransaction,
        line: &grn_draft_line::Model,
        variance: Decimal,
    ) -> Result<(), ServiceError> {
        let result = GrnDraftLine::update_many()
            .set(grn_draft_line::ActiveModel {
                variance: Set(Some(variance)),
                ..Default::default()
            })
            .filter(grn_draft_line::Column::Id.eq(line.id))
            .exec(txn)
            .await
            .map_err(ServiceError::db_error)?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Line {} of GRN {} not found",
                line.line_no, line.grn_id
            )));
        }
        Ok(())
    }
}

/// A posted receipt with at least one mismatched line.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DiscrepancyReport {
    pub review_status: ReviewStatus,
    /// Sum of line variances (received minus expected)
    pub total_variance: Decimal,
    pub grn: GrnView,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct DiscrepancySummary {
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ReviewOutcome {
    pub grn_id: Uuid,
    pub grn_number: String,
    pub review_status: ReviewStatus,
    pub reviewed_by: String,
    pub reviewed_at: DateTime<Utc>,
    pub lines_rewritten: usize,
}

/// Lists receipts with discrepancies and records approve/reject decisions.
#[derive(Clone)]
pub struct DiscrepancyService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
    writer: Arc<dyn LineVarianceWriter>,
}

impl DiscrepancyService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self::with_writer(db_pool, event_sender, Arc::new(SeaOrmVarianceWriter))
    }

    pub fn with_writer(
        db_pool: Arc<DbPool>,
        event_sender: EventSender,
        writer: Arc<dyn LineVarianceWriter>,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            writer,
        }
    }

    /// Receipts that have left DRAFT and carry at least one mismatched line,
    /// newest first.
    #[instrument(skip(self))]
    pub async fn list_discrepancies(
        &self,
        filter: StatusFilter,
    ) -> Result<Vec<DiscrepancyReport>, ServiceError> {
        let db = &*self.db_pool;

        let rows = GrnDraft::find()
            .filter(grn_draft::Column::Status.ne(GrnStatus::Draft))
            .order_by_desc(grn_draft::Column::CreatedAt)
            .order_by_asc(grn_draft::Column::Id)
            .find_with_related(GrnDraftLine)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(rows
            .into_iter()
            .filter(|(_, lines)| lines.iter().any(grn_draft_line::Model::has_discrepancy))
            .filter_map(|(header, lines)| {
                let review_status = ReviewStatus::from(header.status);
                if !filter.matches(review_status) {
                    return None;
                }
                let total_variance = lines
                    .iter()
                    .map(grn_draft_line::Model::computed_variance)
                    .sum();
                Some(DiscrepancyReport {
                    review_status,
                    total_variance,
                    grn: GrnView::new(header, lines),
                })
            })
            .collect())
    }

    /// Counts receipts with discrepancies per review status.
    #[instrument(skip(self))]
    pub async fn summary(&self) -> Result<DiscrepancySummary, ServiceError> {
        let reports = self.list_discrepancies(StatusFilter::All).await?;
        Ok(reports
            .iter()
            .fold(DiscrepancySummary::default(), |mut acc, report| {
                match report.review_status {
                    ReviewStatus::Pending => acc.pending += 1,
                    ReviewStatus::Approved => acc.approved += 1,
                    ReviewStatus::Rejected => acc.rejected += 1,
                }
                acc
            }))
    }

    /// Approves or rejects a posted receipt with discrepancies.
    ///
    /// Every line's variance is rewritten first. If any line fails, nothing
    /// changes and the failing line numbers are reported; the receipt stays
    /// POSTED. Inventory balances are not touched by a review.
    #[instrument(skip(self))]
    pub async fn set_status(
        &self,
        grn_id: Uuid,
        decision: ReviewDecision,
        reviewed_by: &str,
    ) -> Result<ReviewOutcome, ServiceError> {
        let reviewed_by = reviewed_by.trim();
        if reviewed_by.is_empty() {
            return Err(ServiceError::ValidationError(
                "reviewed_by is required".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let writer = Arc::clone(&self.writer);
        let reviewed_by = reviewed_by.to_string();

        let outcome = db
            .transaction::<_, ReviewOutcome, ServiceError>(move |txn| {
                Box::pin(async move {
                    let grn = GrnDraft::find_by_id(grn_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("GRN {} not found", grn_id))
                        })?;

                    if grn.status != GrnStatus::Posted {
                        return Err(ServiceError::InvalidOperation(format!(
                            "GRN {} is {}; only POSTED receipts can be reviewed",
                            grn.grn_number, grn.status
                        )));
                    }

                    let lines = GrnDraftLine::find()
                        .filter(grn_draft_line::Column::GrnId.eq(grn_id))
                        .order_by_asc(grn_draft_line::Column::LineNo)
                        .all(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    if !lines.iter().any(grn_draft_line::Model::has_discrepancy) {
                        return Err(ServiceError::InvalidOperation(format!(
                            "GRN {} has no discrepancies to review",
                            grn.grn_number
                        )));
                    }

                    let mut failed_lines = Vec::new();
                    for line in &lines {
                        let savepoint = txn.begin().await.map_err(ServiceError::db_error)?;
                        match writer
                            .write_variance(&savepoint, line, line.computed_variance())
                            .await
                        {
                            Ok(()) => savepoint.commit().await.map_err(ServiceError::db_error)?,
                            Err(e) => {
                                warn!(line_no = line.line_no, error = %e, "Variance rewrite failed");
                                savepoint
                                    .rollback()
                                    .await
                                    .map_err(ServiceError::db_error)?;
                                failed_lines.push(line.line_no);
                            }
                        }
                    }

                    if !failed_lines.is_empty() {
                        error!(?failed_lines, "Aborting review, GRN stays POSTED");
                        return Err(ServiceError::LineRewriteFailed {
                            grn_id,
                            failed_lines,
                        });
                    }

                    let reviewed_at = Utc::now();
                    let target = decision.target_status();
                    let flipped = GrnDraft::update_many()
                        .set(grn_draft::ActiveModel {
                            status: Set(target),
                            reviewed_by: Set(Some(reviewed_by.clone())),
                            reviewed_at: Set(Some(reviewed_at)),
                            ..Default::default()
                        })
                        .filter(grn_draft::Column::Id.eq(grn_id))
                        .filter(grn_draft::Column::Status.eq(GrnStatus::Posted))
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    if flipped.rows_affected == 0 {
                        return Err(ServiceError::Conflict(format!(
                            "GRN {} was reviewed by another request",
                            grn.grn_number
                        )));
                    }

                    Ok(ReviewOutcome {
                        grn_id,
                        grn_number: grn.grn_number,
                        review_status: ReviewStatus::from(target),
                        reviewed_by,
                        reviewed_at,
                        lines_rewritten: lines.len(),
                    })
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        info!(
            %grn_id,
            %decision,
            reviewed_by = %outcome.reviewed_by,
            "GRN discrepancy review recorded"
        );

        self.event_sender
            .send_or_log(Event::GrnReviewed {
                grn_id,
                decision,
                reviewed_by: outcome.reviewed_by.clone(),
                lines_rewritten: outcome.lines_rewritten,
            })
            .await;

        Ok(outcome)
    }
}
