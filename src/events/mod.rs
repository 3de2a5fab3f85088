use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::ReviewDecision;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event after a commit. Delivery problems are logged only; the
    /// committed work stands regardless.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("{}", e);
        }
    }
}

/// Things that happened to receipts, published after the transaction commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    GrnSaved {
        grn_id: Uuid,
        grn_number: String,
        line_count: usize,
    },
    GrnPosted {
        grn_id: Uuid,
        grn_number: String,
        lines_processed: i32,
        products_updated: i32,
        movements_inserted: i32,
        posted_by: String,
        posted_at: DateTime<Utc>,
    },
    GrnReviewed {
        grn_id: Uuid,
        decision: ReviewDecision,
        reviewed_by: String,
        lines_rewritten: usize,
    },
}

pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::GrnSaved {
                grn_id,
                grn_number,
                line_count,
            } => info!(%grn_id, %grn_number, line_count, "GRN draft saved"),
            Event::GrnPosted {
                grn_id,
                grn_number,
                lines_processed,
                products_updated,
                movements_inserted,
                posted_by,
                ..
            } => info!(
                %grn_id,
                %grn_number,
                lines_processed,
                products_updated,
                movements_inserted,
                %posted_by,
                "GRN posted to inventory"
            ),
            Event::GrnReviewed {
                grn_id,
                decision,
                reviewed_by,
                lines_rewritten,
            } => info!(
                %grn_id,
                %decision,
                %reviewed_by,
                lines_rewritten,
                "GRN discrepancy reviewed"
            ),
        }
    }

    info!("Event processing loop stopped");
}
