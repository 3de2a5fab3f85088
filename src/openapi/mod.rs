use axum::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "GRN Receiving API",
        version = "1.0.0",
        description = r#"
# Goods Receipt Notes

Records deliveries against expected quantities, posts them to the stock
ledger and routes mismatches to an approver.

## Workflow

1. `POST /api/v1/grns` validates and saves a receipt as `DRAFT`.
2. `POST /api/v1/grns/{id}/post` applies it to on-hand and writes one
   `GRN_RECEIPT` movement per line. Send an `Idempotency-Key` to retry safely.
3. `GET /api/v1/discrepancies` lists posted receipts with mismatched lines;
   `PUT /api/v1/grns/{id}/status` approves or rejects them.

## Error Handling

```json
{
  "error": "Bad Request",
  "message": "Validation error: Line 2: Discrepancy reason is required",
  "request_id": "6f1c...",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Products", description = "Catalog and on-hand lookups"),
        (name = "Goods Receipts", description = "Saving and posting receipts"),
        (name = "Discrepancies", description = "Review of receipts with mismatched lines"),
        (name = "Health", description = "Health check endpoints")
    ),
    paths(
        crate::handlers::health::health_check,
        crate::handlers::products::list_products,
        crate::handlers::products::get_product_by_sku,
        crate::handlers::grns::create_grn,
        crate::handlers::grns::get_grn,
        crate::handlers::grns::post_grn,
        crate::handlers::discrepancies::list_discrepancies,
        crate::handlers::discrepancies::discrepancy_summary,
        crate::handlers::discrepancies::update_review_status,
    ),
    components(
        schemas(
            crate::errors::ErrorResponse,
            crate::services::catalog::ProductStock,
            crate::models::StockStatus,
            crate::models::SavedHandle,
            crate::handlers::grns::CreateGrnRequest,
            crate::handlers::grns::GrnLineRequest,
            crate::handlers::grns::PostGrnRequest,
            crate::services::grn_drafts::GrnView,
            crate::services::grn_drafts::GrnLineView,
            crate::services::grn_posting::PostResult,
            crate::services::discrepancy_review::DiscrepancyReport,
            crate::services::discrepancy_review::DiscrepancySummary,
            crate::services::discrepancy_review::ReviewOutcome,
            crate::handlers::discrepancies::UpdateReviewStatusRequest,
            crate::models::ReviewDecision,
            crate::models::ReviewStatus,
            crate::models::KnownReason,
        )
    )
)]
pub struct ApiDocV1;

/// Serves the generated document as JSON.
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDocV1::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_receiving_paths() {
        let json = serde_json::to_string(&ApiDocV1::openapi()).unwrap();
        assert!(json.contains("GRN Receiving API"));
        assert!(json.contains("/api/v1/grns/{id}/post"));
        assert!(json.contains("/api/v1/discrepancies/summary"));
        assert!(json.contains("PostResult"));
    }
}
