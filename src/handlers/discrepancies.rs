use crate::{
    errors::ServiceError,
    handlers::common::{actor_or_default, validate_input},
    models::{ReviewDecision, StatusFilter},
    services::discrepancy_review::{DiscrepancyReport, DiscrepancySummary, ReviewOutcome},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DiscrepancyListQuery {
    /// all (default), pending, approved or rejected
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateReviewStatusRequest {
    pub status: ReviewDecision,
    #[validate(length(max = 64, message = "reviewed_by is limited to 64 characters"))]
    pub reviewed_by: Option<String>,
}

/// Posted receipts with at least one mismatched line.
#[utoipa::path(
    get,
    path = "/api/v1/discrepancies",
    params(DiscrepancyListQuery),
    responses(
        (status = 200, description = "Receipts with discrepancies, newest first", body = [DiscrepancyReport]),
        (status = 400, description = "Unknown status filter", body = crate::errors::ErrorResponse)
    ),
    tag = "Discrepancies"
)]
pub async fn list_discrepancies(
    State(state): State<AppState>,
    Query(query): Query<DiscrepancyListQuery>,
) -> ApiResult<Vec<DiscrepancyReport>> {
    let filter = query
        .status
        .as_deref()
        .unwrap_or_default()
        .parse::<StatusFilter>()
        .map_err(ServiceError::InvalidInput)?;

    let reports = state.reviewer.list_discrepancies(filter).await?;
    Ok(Json(ApiResponse::success(reports)))
}

#[utoipa::path(
    get,
    path = "/api/v1/discrepancies/summary",
    responses(
        (status = 200, description = "Counts per review status", body = DiscrepancySummary)
    ),
    tag = "Discrepancies"
)]
pub async fn discrepancy_summary(State(state): State<AppState>) -> ApiResult<DiscrepancySummary> {
    let summary = state.reviewer.summary().await?;
    Ok(Json(ApiResponse::success(summary)))
}

/// Approves or rejects a posted receipt with discrepancies.
#[utoipa::path(
    put,
    path = "/api/v1/grns/{id}/status",
    params(("id" = Uuid, Path, description = "GRN id")),
    request_body = UpdateReviewStatusRequest,
    responses(
        (status = 200, description = "Decision recorded", body = ReviewOutcome),
        (status = 404, description = "Unknown GRN", body = crate::errors::ErrorResponse),
        (status = 422, description = "GRN is not a posted receipt with discrepancies", body = crate::errors::ErrorResponse),
        (status = 502, description = "Variance rewrite failed; nothing changed", body = crate::errors::ErrorResponse)
    ),
    tag = "Discrepancies"
)]
pub async fn update_review_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateReviewStatusRequest>,
) -> ApiResult<ReviewOutcome> {
    validate_input(&payload)?;

    let reviewed_by = actor_or_default(
        payload.reviewed_by.as_deref(),
        &state.config.receiving.default_operator,
    );
    let outcome = state
        .reviewer
        .set_status(id, payload.status, &reviewed_by)
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}

pub fn discrepancy_routes() -> Router<AppState> {
    Router::new()
        .route("/discrepancies", get(list_discrepancies))
        .route("/discrepancies/summary", get(discrepancy_summary))
        .route("/grns/:id/status", put(update_review_status))
}
