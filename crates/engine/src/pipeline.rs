//! Two-phase generation pipeline for single-document mode.
//!
//! Phase 1 asks the completion service for N distinct style descriptors in
//! one non-streaming call; Phase 2 turns each descriptor into a streamed
//! job run through the batch scheduler.

use std::sync::Arc;
use std::sync::OnceLock;

use pageforge_core::{
    Artifact, ForgeError, GenerationMode, Result, Session, FALLBACK_STYLES,
    DEFAULT_VARIANT_COUNT,
};
use pageforge_llm::{CompletionRequest, CompletionService};
use regex::Regex;
use serde::Deserialize;
use uuid::Uuid;

use crate::job::{Job, JobTarget};
use crate::prompts;
use crate::scheduler::{BatchScheduler, RetryPolicy};
use crate::state::{StoreEvent, StoreHandle};

/// Brand assets shared by every variant of one generation.
#[derive(Debug, Clone, Default)]
pub struct StyleKit {
    pub colors: Vec<String>,
    pub fonts: Vec<String>,
}

/// Per-request knobs shared across both generation modes.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub variant_count: usize,
    /// Reference image as a data URL, sent inline with every call.
    pub reference_image: Option<String>,
    pub style_kit: Option<StyleKit>,
    /// Replicate the reference closely instead of designing freely.
    pub clone_mode: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            variant_count: DEFAULT_VARIANT_COUNT,
            reference_image: None,
            style_kit: None,
            clone_mode: false,
        }
    }
}

/// How the style list was obtained. Callers treat both variants the same;
/// the tag exists so behavior under malformed model output is observable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleDecision {
    /// Parsed from the model response (strictly or via extraction).
    Decoded(Vec<String>),
    /// The deterministic fixed list; the response was unusable.
    Fallback(Vec<String>),
}

impl StyleDecision {
    #[must_use]
    pub fn labels(self) -> Vec<String> {
        match self {
            Self::Decoded(labels) | Self::Fallback(labels) => labels,
        }
    }

    #[must_use]
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

/// The fixed fallback list, truncated or padded to exactly `n`.
///
/// Padding cycles the base list with a numeric suffix so the result stays
/// deterministic for any `n`.
#[must_use]
pub fn fallback_styles(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| {
            let base = FALLBACK_STYLES[i % FALLBACK_STYLES.len()];
            if i < FALLBACK_STYLES.len() {
                base.to_owned()
            } else {
                format!("{base} {}", i / FALLBACK_STYLES.len() + 1)
            }
        })
        .collect()
}

#[derive(Deserialize)]
struct StyleListJson {
    styles: Vec<String>,
}

/// Decode a style-decision response into exactly `n` labels.
///
/// Two-step decode: strict JSON parse of the full response (a bare array
/// or a `{"styles": [...]}` object), then a regex extraction of the first
/// bracketed array from free-form text. Anything else, or fewer than `n`
/// usable entries, falls back to the fixed list.
#[must_use]
pub fn decode_style_list(raw: &str, n: usize) -> StyleDecision {
    let cleaned = pageforge_core::strip_code_fence(raw);

    let parsed = parse_strict(cleaned).or_else(|| extract_array(cleaned));
    match parsed {
        Some(styles) => {
            let styles: Vec<String> =
                styles.into_iter().map(|s| s.trim().to_owned()).filter(|s| !s.is_empty()).collect();
            if styles.len() >= n {
                StyleDecision::Decoded(styles.into_iter().take(n).collect())
            } else {
                tracing::warn!(
                    returned = styles.len(),
                    requested = n,
                    "style decision returned too few entries; using fallback list"
                );
                StyleDecision::Fallback(fallback_styles(n))
            }
        },
        None => {
            tracing::warn!("style decision response unparseable; using fallback list");
            StyleDecision::Fallback(fallback_styles(n))
        },
    }
}

fn parse_strict(cleaned: &str) -> Option<Vec<String>> {
    if let Ok(list) = serde_json::from_str::<Vec<String>>(cleaned) {
        return Some(list);
    }
    serde_json::from_str::<StyleListJson>(cleaned).ok().map(|j| j.styles)
}

/// Documented fallback: the first bracketed array found anywhere in the
/// response, for models that wrap JSON in prose.
fn extract_array(cleaned: &str) -> Option<Vec<String>> {
    static ARRAY: OnceLock<Regex> = OnceLock::new();
    let re = ARRAY.get_or_init(|| {
        Regex::new(r"\[[^\[\]]*\]").unwrap_or_else(|e| panic!("invalid array regex: {e}"))
    });
    let m = re.find(cleaned)?;
    serde_json::from_str::<Vec<String>>(m.as_str()).ok()
}

/// Phase 1: one non-streaming style-decision call. Service failures and
/// unusable responses both resolve to the deterministic fallback; the
/// error never reaches the user.
pub(crate) async fn decide_styles(
    service: &dyn CompletionService,
    prompt: &str,
    reference_image: Option<&str>,
    n: usize,
) -> StyleDecision {
    let request = CompletionRequest::text(prompts::style_decision_prompt(prompt, n))
        .with_image(reference_image.map(ToOwned::to_owned))
        .expecting_json();
    match service.complete(&request).await {
        Ok(raw) => decode_style_list(&raw, n),
        Err(e) => {
            tracing::warn!("style decision call failed: {e}; using fallback list");
            StyleDecision::Fallback(fallback_styles(n))
        },
    }
}

/// Run the full two-phase pipeline. Returns the new session's id; statuses
/// and content live in the state store.
pub(crate) async fn generate_variants(
    service: Arc<dyn CompletionService>,
    store: &StoreHandle,
    scheduler: &BatchScheduler,
    policy: &RetryPolicy,
    prompt: &str,
    options: &GenerationOptions,
) -> Result<String> {
    if prompt.trim().is_empty() {
        return Err(ForgeError::InvalidInput("prompt must not be empty".to_owned()));
    }
    let n = options.variant_count.max(1);
    let session_id = Uuid::new_v4().to_string();
    let artifact_ids: Vec<String> = (0..n).map(|_| Uuid::new_v4().to_string()).collect();

    let session = Session {
        id: session_id.clone(),
        prompt: prompt.to_owned(),
        created_at: chrono::Utc::now(),
        mode: GenerationMode::Single,
        artifacts: artifact_ids
            .iter()
            .enumerate()
            .map(|(i, id)| Artifact::pending(id.clone(), format!("Variant {}", i + 1)))
            .collect(),
        site: None,
    };
    store.send(StoreEvent::SessionCreated(session));
    tracing::info!(%session_id, variants = n, "generation started");

    let decision =
        decide_styles(service.as_ref(), prompt, options.reference_image.as_deref(), n).await;
    let labels = decision.labels();
    store.send(StoreEvent::StyleLabelsAssigned {
        session_id: session_id.clone(),
        labels: labels.clone(),
    });

    let jobs: Vec<Job> = labels
        .iter()
        .zip(&artifact_ids)
        .map(|(style, artifact_id)| {
            Job::new(
                JobTarget::Artifact {
                    session_id: session_id.clone(),
                    artifact_id: artifact_id.clone(),
                },
                CompletionRequest::text(prompts::variant_prompt(prompt, style, options))
                    .with_image(options.reference_image.clone()),
            )
        })
        .collect();

    let outcomes = scheduler.run(service, store, policy, jobs).await;
    let completed = outcomes.iter().filter(|o| o.status.is_terminal()).count();
    tracing::info!(%session_id, settled = completed, "generation settled");

    store.flush().await;
    Ok(session_id)
}

/// Re-run one artifact with a refinement instruction. The artifact
/// restarts its lifecycle and, on success, supersedes a failed result.
pub(crate) async fn refine_artifact(
    service: Arc<dyn CompletionService>,
    store: &StoreHandle,
    scheduler: &BatchScheduler,
    policy: &RetryPolicy,
    session_id: &str,
    artifact_id: &str,
    instruction: &str,
) -> Result<()> {
    let snapshot = store.snapshot();
    let artifact = snapshot
        .artifact(session_id, artifact_id)
        .ok_or_else(|| ForgeError::NotFound(format!("artifact {artifact_id}")))?;
    if !artifact.status.is_terminal() {
        return Err(ForgeError::InvalidInput(
            "artifact is still generating; refine it once it settles".to_owned(),
        ));
    }

    store.send(StoreEvent::RefinementStarted {
        session_id: session_id.to_owned(),
        artifact_id: artifact_id.to_owned(),
    });

    let job = Job::new(
        JobTarget::Artifact {
            session_id: session_id.to_owned(),
            artifact_id: artifact_id.to_owned(),
        },
        CompletionRequest::text(prompts::refine_prompt(&artifact.content, instruction)),
    );
    scheduler.run(service, store, policy, vec![job]).await;
    store.flush().await;
    Ok(())
}
