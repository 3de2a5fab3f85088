//! Goods receipt (GRN) engine for a pharmaceutical warehouse.
//!
//! Receipts are built and validated in memory, saved as DRAFT, posted
//! atomically to the stock ledger, and receipts whose counts differ from
//! expectations are routed to an approver.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod models;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{response::Json, routing::get, Router};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tower_http::timeout::TimeoutLayer;
use utoipa::ToSchema;

use crate::services::{
    catalog::CatalogService, discrepancy_review::DiscrepancyService,
    grn_drafts::GrnDraftService, grn_posting::PostingService,
    receiving_session::ReceivingSession,
};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<db::DbPool>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub catalog: CatalogService,
    pub drafts: GrnDraftService,
    pub posting: PostingService,
    pub reviewer: DiscrepancyService,
}

impl AppState {
    /// Wires every receiving service against one pool and event channel.
    pub fn new(
        db: Arc<db::DbPool>,
        config: config::AppConfig,
        event_sender: events::EventSender,
    ) -> Self {
        let receiving = &config.receiving;
        let catalog = CatalogService::new(
            db.clone(),
            Decimal::from(receiving.low_stock_threshold),
        );
        let drafts = GrnDraftService::new(db.clone(), event_sender.clone());
        let posting = PostingService::new(
            db.clone(),
            event_sender.clone(),
            receiving.stock_update_mode(),
        );
        let reviewer = DiscrepancyService::new(db.clone(), event_sender.clone());

        Self {
            db,
            config,
            event_sender,
            catalog,
            drafts,
            posting,
            reviewer,
        }
    }

    /// Replaces the posting engine, e.g. with one reading on-hand through a
    /// different [`services::grn_posting::OnHandReader`].
    pub fn with_posting(mut self, posting: PostingService) -> Self {
        self.posting = posting;
        self
    }

    /// Replaces the discrepancy reviewer, e.g. with one using a different
    /// variance writer.
    pub fn with_reviewer(mut self, reviewer: DiscrepancyService) -> Self {
        self.reviewer = reviewer;
        self
    }

    /// Opens an operator session with a fresh draft dated today.
    pub fn receiving_session(&self, operator: impl Into<String>) -> ReceivingSession {
        ReceivingSession::new(
            operator,
            self.catalog.clone(),
            self.drafts.clone(),
            self.posting.clone(),
        )
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[tokio::test]
    async fn error_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-err"), async {
                ApiResponse::<()>::error("oops".into())
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-err"));
        assert!(!meta.timestamp.is_empty());
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .merge(handlers::products::product_routes())
        .merge(handlers::grns::grn_routes())
        .merge(handlers::discrepancies::discrepancy_routes())
}

/// Full application router with the shared middleware stack. CORS is left
/// to the binary since it depends on deployment.
pub fn app_router(state: AppState) -> Router {
    let request_timeout = Duration::from_secs(state.config.request_timeout_secs);

    Router::new()
        .merge(handlers::health::health_routes())
        .route("/api-docs/openapi.json", get(openapi::openapi_json))
        .nest("/api/v1", api_v1_routes())
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        .layer(TimeoutLayer::new(request_timeout))
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            crate::tracing::request_id_middleware,
        ))
        .with_state(state)
}
