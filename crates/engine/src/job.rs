//! One unit of generation work: a single streamed completion call.

use futures_util::StreamExt;
use pageforge_core::{ForgeError, JobStatus};
use pageforge_llm::{CompletionRequest, CompletionService, LlmError};

use crate::accumulator::StreamAccumulator;
use crate::scheduler::RetryPolicy;
use crate::state::{StoreEvent, StoreHandle};

/// Where a job's progress and settlement events are routed.
#[derive(Debug, Clone)]
pub enum JobTarget {
    Artifact { session_id: String, artifact_id: String },
    Page { session_id: String, page_id: String },
}

impl JobTarget {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Artifact { artifact_id, .. } => artifact_id,
            Self::Page { page_id, .. } => page_id,
        }
    }

    fn progress(&self, content: String) -> StoreEvent {
        match self {
            Self::Artifact { session_id, artifact_id } => StoreEvent::ArtifactProgress {
                session_id: session_id.clone(),
                artifact_id: artifact_id.clone(),
                content,
            },
            Self::Page { session_id, page_id } => StoreEvent::PageProgress {
                session_id: session_id.clone(),
                page_id: page_id.clone(),
                content,
            },
        }
    }

    fn settled(&self, status: JobStatus, content: String) -> StoreEvent {
        match self {
            Self::Artifact { session_id, artifact_id } => StoreEvent::ArtifactSettled {
                session_id: session_id.clone(),
                artifact_id: artifact_id.clone(),
                status,
                content,
            },
            Self::Page { session_id, page_id } => StoreEvent::PageSettled {
                session_id: session_id.clone(),
                page_id: page_id.clone(),
                status,
                content,
            },
        }
    }
}

/// Terminal result of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub status: JobStatus,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct Job {
    pub target: JobTarget,
    pub request: CompletionRequest,
}

enum AttemptError {
    Llm(LlmError),
    Invalid(ForgeError),
}

impl AttemptError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Llm(e) => e.is_transient(),
            Self::Invalid(_) => false,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Llm(e) => e.to_string(),
            Self::Invalid(e) => e.to_string(),
        }
    }
}

impl Job {
    #[must_use]
    pub fn new(target: JobTarget, request: CompletionRequest) -> Self {
        Self { target, request }
    }

    /// Run to settlement under the scheduler's retry policy.
    ///
    /// Emits one progress event per received chunk and exactly one
    /// settlement. No failure escapes the job boundary: transport, stream,
    /// and validation errors all become an `error` settlement with a
    /// rendered diagnostic document, so sibling jobs are unaffected. Only
    /// transient failures are retried; a fresh attempt restarts the stream.
    pub async fn run(
        &self,
        service: &dyn CompletionService,
        store: &StoreHandle,
        policy: &RetryPolicy,
    ) -> JobOutcome {
        let mut last_error = None;
        for attempt in 0..policy.max_attempts() {
            if attempt > 0 {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    target_id = self.target.id(),
                    attempt,
                    ?delay,
                    "retrying job after transient failure"
                );
                tokio::time::sleep(delay).await;
            }
            match self.attempt(service, store).await {
                Ok(content) => {
                    store.send(self.target.settled(JobStatus::Complete, content.clone()));
                    return JobOutcome { status: JobStatus::Complete, content };
                },
                Err(e) => {
                    if let AttemptError::Invalid(ForgeError::Validation { raw, .. }) = &e {
                        tracing::debug!(target_id = self.target.id(), raw = %raw, "rejected raw content");
                    }
                    let transient = e.is_transient();
                    last_error = Some(e.message());
                    if !transient {
                        break;
                    }
                },
            }
        }

        let message = last_error.unwrap_or_else(|| "generation failed".to_owned());
        tracing::warn!(target_id = self.target.id(), "job settled with error: {message}");
        let content = error_document(&message);
        store.send(self.target.settled(JobStatus::Error, content.clone()));
        JobOutcome { status: JobStatus::Error, content }
    }

    async fn attempt(
        &self,
        service: &dyn CompletionService,
        store: &StoreHandle,
    ) -> Result<String, AttemptError> {
        let mut acc = StreamAccumulator::new();
        let mut stream = service.stream(&self.request).await.map_err(AttemptError::Llm)?;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(AttemptError::Llm)?;
            acc.push(&chunk);
            store.send(self.target.progress(acc.buffer().to_owned()));
        }
        acc.finalize().map_err(AttemptError::Invalid)
    }
}

/// Inline diagnostic document shown in place of failed content.
fn error_document(message: &str) -> String {
    let escaped = message.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;");
    format!(
        "<!DOCTYPE html><html><body><div class=\"pageforge-error\">\
         <h2>Generation failed</h2><p>{escaped}</p></div></body></html>"
    )
}
