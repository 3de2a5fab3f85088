use crate::{
    errors::ServiceError,
    handlers::common::{actor_or_default, idempotency_key, validate_input},
    models::{validation, validation::LineInput, SavedHandle},
    services::{grn_drafts::GrnView, grn_posting::PostResult},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateGrnRequest {
    pub received_date: Option<NaiveDate>,
    #[serde(default)]
    #[validate(length(max = 2000, message = "Notes are limited to 2000 characters"))]
    pub notes: String,
    /// Defaults to the configured operator
    #[validate(length(max = 64, message = "created_by is limited to 64 characters"))]
    pub created_by: Option<String>,
    #[serde(default)]
    pub lines: Vec<GrnLineRequest>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct GrnLineRequest {
    pub product_id: Option<Uuid>,
    pub qty_expected: Option<Decimal>,
    pub qty_received: Option<Decimal>,
    /// Reason code: damaged, shortage, count_error, expired or other
    #[serde(default)]
    pub discrepancy_reason: String,
    #[serde(default)]
    pub other_reason: String,
}

impl LineInput for GrnLineRequest {
    fn product_id(&self) -> Option<Uuid> {
        self.product_id
    }

    fn qty_expected(&self) -> Option<Decimal> {
        self.qty_expected
    }

    fn qty_received(&self) -> Option<Decimal> {
        self.qty_received
    }

    fn reason_code(&self) -> &str {
        &self.discrepancy_reason
    }

    fn other_reason(&self) -> &str {
        &self.other_reason
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PostGrnRequest {
    pub posted_by: Option<String>,
    /// Idempotency key; the `Idempotency-Key` header is used when absent
    pub request_id: Option<Uuid>,
}

/// Validates and saves a receipt as DRAFT.
#[utoipa::path(
    post,
    path = "/api/v1/grns",
    request_body = CreateGrnRequest,
    responses(
        (status = 201, description = "Receipt saved as DRAFT", body = SavedHandle,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse)
    ),
    tag = "Goods Receipts"
)]
pub async fn create_grn(
    State(state): State<AppState>,
    Json(payload): Json<CreateGrnRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SavedHandle>>), ServiceError> {
    validate_input(&payload)?;

    let validated =
        validation::validate_parts(payload.received_date, &payload.notes, &payload.lines)?;
    let created_by = actor_or_default(
        payload.created_by.as_deref(),
        &state.config.receiving.default_operator,
    );

    let handle = state.drafts.save(&validated, &created_by).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(handle))))
}

#[utoipa::path(
    get,
    path = "/api/v1/grns/{id}",
    params(("id" = Uuid, Path, description = "GRN id")),
    responses(
        (status = 200, description = "Receipt with lines", body = GrnView),
        (status = 404, description = "Unknown GRN", body = crate::errors::ErrorResponse)
    ),
    tag = "Goods Receipts"
)]
pub async fn get_grn(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<GrnView> {
    let grn = state.drafts.get_grn(id).await?;
    Ok(Json(ApiResponse::success(grn)))
}

/// Posts a DRAFT receipt to inventory.
#[utoipa::path(
    post,
    path = "/api/v1/grns/{id}/post",
    params(
        ("id" = Uuid, Path, description = "GRN id"),
        ("Idempotency-Key" = Option<String>, Header, description = "UUID making retries safe")
    ),
    request_body = PostGrnRequest,
    responses(
        (status = 200, description = "Receipt posted, or the stored result of a retried request", body = PostResult),
        (status = 400, description = "Stored lines no longer valid", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown GRN or product", body = crate::errors::ErrorResponse),
        (status = 409, description = "Already posted or concurrent change", body = crate::errors::ErrorResponse)
    ),
    tag = "Goods Receipts"
)]
pub async fn post_grn(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<PostGrnRequest>,
) -> ApiResult<PostResult> {
    let request_id = match payload.request_id {
        Some(request_id) => Some(request_id),
        None => idempotency_key(&headers)?,
    };
    let posted_by = actor_or_default(
        payload.posted_by.as_deref(),
        &state.config.receiving.default_operator,
    );

    let result = state.posting.post(id, &posted_by, request_id).await?;
    Ok(Json(ApiResponse::success(result)))
}

pub fn grn_routes() -> Router<AppState> {
    Router::new()
        .route("/grns", post(create_grn))
        .route("/grns/:id", get(get_grn))
        .route("/grns/:id/post", post(post_grn))
}
