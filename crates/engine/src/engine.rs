//! Engine facade: one object wiring the completion service, state store,
//! scheduler, and ledger behind the operations consumers call.

use std::sync::{Arc, Mutex, MutexGuard};

use pageforge_core::{
    env_parse_with_default, ForgeError, JobStatus, PublishInfo, Result, VersionEntry,
    DEFAULT_BATCH_WIDTH,
};
use pageforge_llm::CompletionService;
use pageforge_storage::StateStore;
use tokio::sync::watch;

use crate::frame::{decode_frame_message, replace_image_src, FrameAction, FrameMessage};
use crate::ledger::{UndoState, VersionLedger};
use crate::pipeline::{self, GenerationOptions};
use crate::publish::{PublishBackend, PublishMetadata};
use crate::scheduler::{BatchScheduler, RetryPolicy};
use crate::site;
use crate::state::{spawn_store, EngineState, StoreEvent, StoreHandle};

pub struct Engine {
    service: Arc<dyn CompletionService>,
    store: StoreHandle,
    ledger: Arc<Mutex<VersionLedger>>,
    scheduler: BatchScheduler,
    policy: RetryPolicy,
}

impl Engine {
    /// Wire up an engine. Must be called from within a tokio runtime: the
    /// store owner task starts immediately.
    ///
    /// Batch width comes from `PAGEFORGE_BATCH_WIDTH` (default 3).
    #[must_use]
    pub fn new(service: Arc<dyn CompletionService>, persist: Arc<dyn StateStore>) -> Self {
        let ledger = Arc::new(Mutex::new(VersionLedger::new()));
        let store = spawn_store(persist, Arc::clone(&ledger));
        let width = env_parse_with_default("PAGEFORGE_BATCH_WIDTH", DEFAULT_BATCH_WIDTH);
        Self {
            service,
            store,
            ledger,
            scheduler: BatchScheduler::new(width),
            policy: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_batch_width(mut self, width: usize) -> Self {
        self.scheduler = BatchScheduler::new(width);
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The latest state snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<EngineState> {
        self.store.snapshot()
    }

    /// Watch snapshots as jobs stream (progressive display).
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<EngineState>> {
        self.store.subscribe()
    }

    /// Generate N style variants for one prompt. Returns the session id.
    pub async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        pipeline::generate_variants(
            Arc::clone(&self.service),
            &self.store,
            &self.scheduler,
            &self.policy,
            prompt,
            options,
        )
        .await
    }

    /// Generate a multi-page site, pages strictly in order.
    pub async fn generate_site(
        &self,
        prompt: &str,
        page_names: &[String],
        options: &GenerationOptions,
    ) -> Result<String> {
        site::generate_site(
            Arc::clone(&self.service),
            &self.store,
            &self.policy,
            prompt,
            page_names,
            options,
        )
        .await
    }

    /// Add one page to an existing site. Returns the new page's id.
    pub async fn add_page(
        &self,
        session_id: &str,
        name: &str,
        options: &GenerationOptions,
    ) -> Result<String> {
        site::add_page(
            Arc::clone(&self.service),
            &self.store,
            &self.policy,
            session_id,
            name,
            options,
        )
        .await
    }

    /// Re-run one settled artifact with a refinement instruction.
    pub async fn refine(
        &self,
        session_id: &str,
        artifact_id: &str,
        instruction: &str,
    ) -> Result<()> {
        pipeline::refine_artifact(
            Arc::clone(&self.service),
            &self.store,
            &self.scheduler,
            &self.policy,
            session_id,
            artifact_id,
            instruction,
        )
        .await
    }

    /// Step the linear history back and apply the state to the live
    /// artifact. Returns the state now current.
    pub async fn undo(&self) -> Option<UndoState> {
        let state = self.lock_ledger().undo()?;
        self.apply_history_state(&state);
        self.store.flush().await;
        Some(state)
    }

    /// Step the linear history forward again.
    pub async fn redo(&self) -> Option<UndoState> {
        let state = self.lock_ledger().redo()?;
        self.apply_history_state(&state);
        self.store.flush().await;
        Some(state)
    }

    /// Restore a recorded version onto the live artifact. Restoring is
    /// itself undoable.
    pub async fn restore(&self, entry_id: &str) -> Result<()> {
        let (artifact_id, content, recorded) = {
            let mut ledger = self.lock_ledger();
            let entry = ledger
                .entry(entry_id)
                .cloned()
                .ok_or_else(|| ForgeError::NotFound(format!("version entry {entry_id}")))?;
            let recorded = ledger.restore(&entry.artifact_id, &entry.content);
            (entry.artifact_id, entry.content, recorded)
        };
        let session_id = self.owning_session(&artifact_id)?;
        self.store.send(StoreEvent::ArtifactContentReplaced {
            session_id,
            artifact_id,
            content,
            recorded,
        });
        self.store.flush().await;
        Ok(())
    }

    /// Recorded versions for one artifact, oldest first.
    #[must_use]
    pub fn versions(&self, artifact_id: &str) -> Vec<VersionEntry> {
        self.lock_ledger().entries_for(artifact_id).cloned().collect()
    }

    /// Publish a completed artifact and attach the returned info.
    pub async fn publish(
        &self,
        backend: &dyn PublishBackend,
        session_id: &str,
        artifact_id: &str,
        metadata: &PublishMetadata,
    ) -> Result<PublishInfo> {
        let snapshot = self.store.snapshot();
        let artifact = snapshot
            .artifact(session_id, artifact_id)
            .ok_or_else(|| ForgeError::NotFound(format!("artifact {artifact_id}")))?;
        if artifact.status != JobStatus::Complete {
            return Err(ForgeError::InvalidInput(
                "only complete artifacts can be published".to_owned(),
            ));
        }
        let info = backend.publish(&artifact.content, metadata).await?;
        self.store.send(StoreEvent::PublishAttached {
            session_id: session_id.to_owned(),
            artifact_id: artifact_id.to_owned(),
            info: info.clone(),
        });
        self.store.flush().await;
        Ok(info)
    }

    /// Route one inbound frame message to its artifact or page.
    pub fn handle_frame_message(&self, session_id: &str, raw: &str) -> Result<FrameAction> {
        let snapshot = self.store.snapshot();
        match decode_frame_message(raw)? {
            FrameMessage::ImageClick { artifact_id, img_id } => {
                if snapshot.artifact(session_id, &artifact_id).is_none() {
                    return Err(ForgeError::NotFound(format!("artifact {artifact_id}")));
                }
                Ok(FrameAction::ImageSelected { artifact_id, img_id })
            },
            FrameMessage::SiteNavigate { page_id } => {
                if snapshot.page(session_id, &page_id).is_none() {
                    return Err(ForgeError::NotFound(format!("page {page_id}")));
                }
                Ok(FrameAction::Navigate { page_id })
            },
            FrameMessage::UpdateImage { .. } => {
                Err(ForgeError::Frame("UPDATE_IMAGE is outbound-only".to_owned()))
            },
        }
    }

    /// Hot-swap one image inside a completed artifact. Returns the
    /// outbound message for the preview frame.
    pub async fn swap_image(
        &self,
        session_id: &str,
        artifact_id: &str,
        img_id: &str,
        src: &str,
    ) -> Result<FrameMessage> {
        let snapshot = self.store.snapshot();
        let artifact = snapshot
            .artifact(session_id, artifact_id)
            .ok_or_else(|| ForgeError::NotFound(format!("artifact {artifact_id}")))?;
        if artifact.status != JobStatus::Complete {
            return Err(ForgeError::InvalidInput(
                "image swap requires a complete artifact".to_owned(),
            ));
        }
        let updated = replace_image_src(&artifact.content, img_id, src)
            .ok_or_else(|| ForgeError::NotFound(format!("image {img_id}")))?;

        let recorded = self.lock_ledger().record(artifact_id, &updated, "image updated");
        self.store.send(StoreEvent::ArtifactContentReplaced {
            session_id: session_id.to_owned(),
            artifact_id: artifact_id.to_owned(),
            content: updated,
            recorded,
        });
        self.store.flush().await;
        Ok(FrameMessage::UpdateImage { img_id: img_id.to_owned(), src: src.to_owned() })
    }

    fn apply_history_state(&self, state: &UndoState) {
        match self.owning_session(&state.artifact_id) {
            Ok(session_id) => self.store.send(StoreEvent::ArtifactContentReplaced {
                session_id,
                artifact_id: state.artifact_id.clone(),
                content: state.content.clone(),
                recorded: None,
            }),
            Err(_) => {
                tracing::warn!(
                    artifact_id = %state.artifact_id,
                    "history state for an artifact no longer in any session"
                );
            },
        }
    }

    fn owning_session(&self, artifact_id: &str) -> Result<String> {
        self.store
            .snapshot()
            .session_of_artifact(artifact_id)
            .map(|s| s.id.clone())
            .ok_or_else(|| ForgeError::NotFound(format!("artifact {artifact_id}")))
    }

    fn lock_ledger(&self) -> MutexGuard<'_, VersionLedger> {
        match self.ledger.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
