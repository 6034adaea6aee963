//! Mock completion service and store helpers shared by engine unit tests.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use pageforge_core::{Artifact, GenerationMode, Session};
use pageforge_llm::{ChunkStream, CompletionRequest, CompletionService, LlmError};
use pageforge_storage::SqliteStore;

use crate::ledger::VersionLedger;
use crate::state::{spawn_store, StoreEvent, StoreHandle};

type StreamFn = dyn Fn(&CompletionRequest) -> Option<Vec<String>> + Send + Sync;

/// Scripted [`CompletionService`] with concurrency accounting.
#[derive(Clone)]
pub(crate) struct MockService {
    inner: Arc<Inner>,
}

struct Inner {
    stream_fn: Box<StreamFn>,
    complete_response: Option<String>,
    chunk_delay_ms: u64,
    fail_first: AtomicU32,
    stream_calls: AtomicUsize,
    started_prompts: Mutex<Vec<String>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

struct ActiveGuard(Arc<Inner>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockService {
    /// Every stream call yields the same chunks, with an optional delay
    /// between chunks to force overlap in concurrency tests.
    pub(crate) fn streaming(chunks: Vec<String>, chunk_delay_ms: u64) -> Self {
        Self::build(Box::new(move |_| Some(chunks.clone())), chunk_delay_ms, 0, None)
    }

    /// First `failures` stream calls fail transiently, then stream chunks.
    pub(crate) fn failing_then_streaming(failures: u32, chunks: Vec<String>) -> Self {
        Self::build(Box::new(move |_| Some(chunks.clone())), 0, failures, None)
    }

    /// Per-request scripting: `None` means a permanent failure.
    pub(crate) fn streaming_with(
        f: impl Fn(&CompletionRequest) -> Option<Vec<String>> + Send + Sync + 'static,
    ) -> Self {
        Self::build(Box::new(f), 0, 0, None)
    }

    /// Response for single-shot `complete` calls (the style phase).
    pub(crate) fn with_complete(mut self, response: impl Into<String>) -> Self {
        let inner = Arc::get_mut(&mut self.inner).expect("configure before cloning");
        inner.complete_response = Some(response.into());
        self
    }

    fn build(
        stream_fn: Box<StreamFn>,
        chunk_delay_ms: u64,
        fail_first: u32,
        complete_response: Option<String>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                stream_fn,
                complete_response,
                chunk_delay_ms,
                fail_first: AtomicU32::new(fail_first),
                stream_calls: AtomicUsize::new(0),
                started_prompts: Mutex::new(Vec::new()),
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
            }),
        }
    }

    pub(crate) fn clone_arc(&self) -> Arc<dyn CompletionService> {
        Arc::new(self.clone())
    }

    pub(crate) fn stream_calls(&self) -> usize {
        self.inner.stream_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_active(&self) -> usize {
        self.inner.max_active.load(Ordering::SeqCst)
    }

    /// Prompts in the order their stream calls started.
    pub(crate) fn started_prompts(&self) -> Vec<String> {
        self.inner.started_prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for MockService {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String, LlmError> {
        self.inner.complete_response.clone().ok_or(LlmError::EmptyResponse)
    }

    async fn stream(&self, request: &CompletionRequest) -> Result<ChunkStream, LlmError> {
        self.inner.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.started_prompts.lock().unwrap().push(request.prompt.clone());

        if self
            .inner
            .fail_first
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(LlmError::HttpStatus {
                code: 503,
                body: "scripted transient failure".to_owned(),
            });
        }
        let Some(chunks) = (self.inner.stream_fn)(request) else {
            return Err(LlmError::HttpStatus {
                code: 400,
                body: "scripted permanent failure".to_owned(),
            });
        };

        let inner = Arc::clone(&self.inner);
        let current = inner.active.fetch_add(1, Ordering::SeqCst) + 1;
        inner.max_active.fetch_max(current, Ordering::SeqCst);
        let delay = inner.chunk_delay_ms;
        let guard = ActiveGuard(inner);

        let stream = async_stream::stream! {
            let _guard = guard;
            for chunk in chunks {
                if delay > 0 {
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
                yield Ok::<_, LlmError>(chunk);
            }
        };
        Ok(Box::pin(stream))
    }
}

/// A document long enough to pass structural validation.
pub(crate) fn valid_doc(marker: &str) -> String {
    format!(
        "<!DOCTYPE html><html><body data-marker=\"{marker}\">{}</body></html>",
        "x".repeat(120)
    )
}

/// Store task backed by an in-memory database and a fresh ledger.
pub(crate) fn spawn_test_store() -> StoreHandle {
    let ledger = Arc::new(Mutex::new(VersionLedger::new()));
    let persist: Arc<dyn pageforge_storage::StateStore> =
        Arc::new(SqliteStore::in_memory().unwrap());
    spawn_store(persist, ledger)
}

/// Seed one single-mode session with pending artifacts and wait for it to
/// be applied.
pub(crate) async fn seed_single_session(
    store: &StoreHandle,
    session_id: &str,
    artifact_ids: &[&str],
) {
    let session = Session {
        id: session_id.to_owned(),
        prompt: "test prompt".to_owned(),
        created_at: Utc::now(),
        mode: GenerationMode::Single,
        artifacts: artifact_ids
            .iter()
            .enumerate()
            .map(|(i, id)| Artifact::pending((*id).to_owned(), format!("Variant {}", i + 1)))
            .collect(),
        site: None,
    };
    store.send(StoreEvent::SessionCreated(session));
    store.flush().await;
}
