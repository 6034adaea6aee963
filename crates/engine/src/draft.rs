//! Autosave of not-yet-submitted input.

use std::sync::Arc;

use pageforge_core::Draft;
use pageforge_storage::StateStore;

/// Thin wrapper over the storage draft slot. Every operation is
/// best-effort: a storage failure is logged and never surfaces, since
/// losing an autosave must not break the editing flow.
pub struct DraftService {
    persist: Arc<dyn StateStore>,
}

impl DraftService {
    #[must_use]
    pub fn new(persist: Arc<dyn StateStore>) -> Self {
        Self { persist }
    }

    pub async fn save(&self, draft: &Draft) {
        if let Err(e) = self.persist.save_draft(draft).await {
            tracing::warn!("draft autosave failed: {e}");
        }
    }

    pub async fn load(&self) -> Option<Draft> {
        match self.persist.load_draft().await {
            Ok(draft) => draft,
            Err(e) => {
                tracing::warn!("draft load failed: {e}");
                None
            },
        }
    }

    pub async fn discard(&self) {
        if let Err(e) = self.persist.clear_draft().await {
            tracing::warn!("draft discard failed: {e}");
        }
    }
}
