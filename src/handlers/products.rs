use crate::{services::catalog::ProductStock, ApiResponse, ApiResult, AppState};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductSearchQuery {
    /// Case-insensitive match on product name or SKU
    pub search: Option<String>,
}

/// Lists catalog products with current on-hand and stock status.
#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(ProductSearchQuery),
    responses(
        (status = 200, description = "Products ordered by name", body = [ProductStock],
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 500, description = "Storage failure", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductSearchQuery>,
) -> ApiResult<Vec<ProductStock>> {
    let products = state
        .catalog
        .list_products(query.search.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(products)))
}

/// Resolves a scanned barcode.
#[utoipa::path(
    get,
    path = "/api/v1/products/by-sku/{sku}",
    params(("sku" = String, Path, description = "Scanned SKU")),
    responses(
        (status = 200, description = "Matching product", body = ProductStock),
        (status = 404, description = "Unknown SKU", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn get_product_by_sku(
    State(state): State<AppState>,
    Path(sku): Path<String>,
) -> ApiResult<ProductStock> {
    let product = state.catalog.find_by_sku(&sku).await?;
    Ok(Json(ApiResponse::success(product)))
}

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/by-sku/:sku", get(get_product_by_sku))
}
