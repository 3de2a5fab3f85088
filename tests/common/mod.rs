#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request},
    Router,
};
use chrono::{NaiveDate, Utc};
use grn_receiving::{
    config::AppConfig,
    db,
    entities::{
        grn_draft, grn_draft_line, inventory_movement, inventory_on_hand, product, GrnDraft,
        GrnDraftLine, InventoryMovement, InventoryOnHand, Product,
    },
    events::{self, EventSender},
    models::{GrnDraft as DraftBuilder, LineField, SavedHandle},
    AppState,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

/// One line of a receipt as typed by an operator:
/// product, expected, received, reason code, other reason text.
pub type LineSpec<'a> = (Uuid, &'a str, &'a str, &'a str, &'a str);

/// Helper harness for spinning up an application state backed by a throwaway
/// SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _db_dir: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Same as [`TestApp::new`] with a chance to adjust configuration first.
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let db_dir = tempfile::tempdir().expect("create temp dir for test database");
        let db_path = db_dir.path().join("grn_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        adjust(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(db_arc, cfg, event_sender);
        let router = grn_receiving::app_router(state.clone());

        Self {
            router,
            state,
            _db_dir: db_dir,
            _event_task: event_task,
        }
    }

    /// Rebuilds the router after `state` was changed.
    pub fn refresh_router(&mut self) {
        self.router = grn_receiving::app_router(self.state.clone());
    }

    pub fn db(&self) -> &db::DbPool {
        &self.state.db
    }

    /// Send a request against the router.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        self.request_with_headers(method, uri, body, &[]).await
    }

    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Inserts a catalog product, optionally with an on-hand row.
    pub async fn seed_product(&self, sku: &str, name: &str, on_hand: Option<Decimal>) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        product::ActiveModel {
            id: Set(id),
            sku: Set(sku.to_string()),
            name: Set(name.to_string()),
            unit: Set("box".to_string()),
            created_at: Set(now),
        }
        .insert(self.db())
        .await
        .expect("seed product");

        if let Some(qty) = on_hand {
            inventory_on_hand::ActiveModel {
                product_id: Set(id),
                qty_on_hand: Set(qty),
                version: Set(1),
                updated_at: Set(now),
            }
            .insert(self.db())
            .await
            .expect("seed on-hand");
        }
        id
    }

    pub async fn delete_product(&self, product_id: Uuid) {
        InventoryOnHand::delete_by_id(product_id)
            .exec(self.db())
            .await
            .expect("delete on-hand");
        Product::delete_by_id(product_id)
            .exec(self.db())
            .await
            .expect("delete product");
    }

    pub async fn on_hand(&self, product_id: Uuid) -> Option<inventory_on_hand::Model> {
        InventoryOnHand::find_by_id(product_id)
            .one(self.db())
            .await
            .expect("read on-hand")
    }

    pub async fn movements(&self, grn_id: Uuid) -> Vec<inventory_movement::Model> {
        InventoryMovement::find()
            .filter(inventory_movement::Column::GrnId.eq(grn_id))
            .order_by_asc(inventory_movement::Column::LineNo)
            .all(self.db())
            .await
            .expect("read movements")
    }

    pub async fn all_movements(&self) -> Vec<inventory_movement::Model> {
        InventoryMovement::find()
            .all(self.db())
            .await
            .expect("read movements")
    }

    pub async fn header(&self, grn_id: Uuid) -> grn_draft::Model {
        GrnDraft::find_by_id(grn_id)
            .one(self.db())
            .await
            .expect("read header")
            .expect("header exists")
    }

    pub async fn lines(&self, grn_id: Uuid) -> Vec<grn_draft_line::Model> {
        GrnDraftLine::find()
            .filter(grn_draft_line::Column::GrnId.eq(grn_id))
            .order_by_asc(grn_draft_line::Column::LineNo)
            .all(self.db())
            .await
            .expect("read lines")
    }

    pub async fn header_count(&self) -> usize {
        GrnDraft::find()
            .all(self.db())
            .await
            .expect("read headers")
            .len()
    }

    /// Validates and saves a receipt built from `lines`.
    pub async fn save_grn(&self, lines: &[LineSpec<'_>]) -> SavedHandle {
        let draft = build_draft(receipt_date(), lines);
        let validated = draft.validate().expect("draft should be valid");
        self.state
            .drafts
            .save(&validated, "warehouse_operator")
            .await
            .expect("save draft")
    }

    /// Saves and posts a receipt, returning its id.
    pub async fn save_and_post(&self, lines: &[LineSpec<'_>]) -> Uuid {
        let handle = self.save_grn(lines).await;
        self.state
            .posting
            .post(handle.grn_id, "warehouse_operator", None)
            .await
            .expect("post receipt");
        handle.grn_id
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub fn receipt_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid date")
}

/// Builds an in-memory draft through the same calls an operator screen uses.
pub fn build_draft(date: NaiveDate, lines: &[LineSpec<'_>]) -> DraftBuilder {
    let mut draft = DraftBuilder::new(Some(date));
    for (idx, (product_id, expected, received, reason, other)) in lines.iter().enumerate() {
        let line_id = if idx == 0 {
            draft.lines()[0].id
        } else {
            draft.add_line()
        };
        let fields = [
            LineField::Product(Some(*product_id)),
            LineField::QtyExpected(expected.to_string()),
            LineField::QtyReceived(received.to_string()),
            LineField::DiscrepancyReason(reason.to_string()),
            LineField::OtherReason(other.to_string()),
        ];
        for field in fields {
            draft.update_field(line_id, field).expect("line exists");
        }
    }
    draft
}

pub async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("body is json")
}

/// Parses a decimal that the API rendered either as a string or a number.
pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(raw) => raw.parse().expect("decimal string"),
        Value::Number(num) => num.to_string().parse().expect("decimal number"),
        other => panic!("not a decimal: {other}"),
    }
}
