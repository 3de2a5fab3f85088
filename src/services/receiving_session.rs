use crate::{
    errors::ServiceError,
    models::{GrnDraft, LineId, SavedHandle},
    services::{
        catalog::CatalogService,
        grn_drafts::GrnDraftService,
        grn_posting::{PostResult, PostingService},
    },
};
use chrono::{NaiveDate, Utc};
use tracing::{info, instrument};
use uuid::Uuid;

/// One operator's receiving screen: the draft being built plus the services
/// it saves and posts through.
///
/// The draft's saved handle decides whether a post needs a fresh save first.
pub struct ReceivingSession {
    draft: GrnDraft,
    operator: String,
    catalog: CatalogService,
    drafts: GrnDraftService,
    posting: PostingService,
}

impl ReceivingSession {
    pub fn new(
        operator: impl Into<String>,
        catalog: CatalogService,
        drafts: GrnDraftService,
        posting: PostingService,
    ) -> Self {
        Self {
            draft: GrnDraft::new(Some(today())),
            operator: operator.into(),
            catalog,
            drafts,
            posting,
        }
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }

    pub fn draft(&self) -> &GrnDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut GrnDraft {
        &mut self.draft
    }

    /// Looks up a scanned SKU and places it on the draft.
    #[instrument(skip(self))]
    pub async fn scan(&mut self, sku: &str) -> Result<LineId, ServiceError> {
        let product = self.catalog.find_by_sku(sku).await?;
        Ok(self.draft.insert_scanned(&product.as_scanned()))
    }

    /// Validates and persists the current draft, remembering the handle.
    ///
    /// A draft that has not changed since its last save keeps that save's
    /// handle; only an edit makes the next call write a new GRN.
    #[instrument(skip(self), fields(operator = %self.operator))]
    pub async fn save(&mut self) -> Result<SavedHandle, ServiceError> {
        if let Some(handle) = self.draft.saved() {
            info!(grn_id = %handle.grn_id, "Draft unchanged since last save");
            return Ok(handle.clone());
        }

        let validated = self.draft.validate()?;
        let handle = self.drafts.save(&validated, &self.operator).await?;
        self.draft.mark_saved(handle.clone());
        Ok(handle)
    }

    /// Posts the draft, saving it first when it has no valid handle.
    ///
    /// On success the draft starts over for today. On failure it is left as
    /// is, so the operator can fix it and retry.
    #[instrument(skip(self), fields(operator = %self.operator))]
    pub async fn post(&mut self, request_id: Option<Uuid>) -> Result<PostResult, ServiceError> {
        self.draft.validate()?;

        let handle = match self.draft.saved() {
            Some(handle) => handle.clone(),
            None => {
                info!("Draft changed since last save, saving before post");
                self.save().await?
            }
        };

        let result = self
            .posting
            .post(handle.grn_id, &self.operator, request_id)
            .await?;

        self.draft.reset(Some(today()));
        Ok(result)
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}
