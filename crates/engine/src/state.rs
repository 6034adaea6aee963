//! Session/Artifact state store.
//!
//! The authoritative in-memory model of every generation request. All
//! mutation funnels through one owner task draining an event channel and
//! applying the pure [`apply`] transition, so concurrent jobs writing to
//! sibling artifacts never race: each event re-derives the full next state
//! from the previous snapshot, and consumers only ever see completed
//! snapshots through a watch channel.

use std::sync::{Arc, Mutex};

use pageforge_core::{Artifact, JobStatus, PublishInfo, Session, SitePage, VersionEntry};
use pageforge_storage::StateStore;
use tokio::sync::{mpsc, oneshot, watch};

use crate::ledger::VersionLedger;

/// Full snapshot of all sessions. Replaced wholesale on every applied
/// event; never mutated in place.
#[derive(Debug, Clone, Default)]
pub struct EngineState {
    pub sessions: Vec<Session>,
}

impl EngineState {
    #[must_use]
    pub fn session(&self, session_id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == session_id)
    }

    #[must_use]
    pub fn artifact(&self, session_id: &str, artifact_id: &str) -> Option<&Artifact> {
        self.session(session_id)?.artifacts.iter().find(|a| a.id == artifact_id)
    }

    #[must_use]
    pub fn page(&self, session_id: &str, page_id: &str) -> Option<&SitePage> {
        self.session(session_id)?.site.as_ref()?.pages.iter().find(|p| p.id == page_id)
    }

    /// The session owning the given artifact, if any.
    #[must_use]
    pub fn session_of_artifact(&self, artifact_id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.artifacts.iter().any(|a| a.id == artifact_id))
    }
}

/// One state transition. Job callbacks enqueue these; nothing else
/// mutates the store.
#[derive(Debug)]
pub enum StoreEvent {
    SessionCreated(Session),
    StyleLabelsAssigned {
        session_id: String,
        labels: Vec<String>,
    },
    ArtifactProgress {
        session_id: String,
        artifact_id: String,
        content: String,
    },
    ArtifactSettled {
        session_id: String,
        artifact_id: String,
        status: JobStatus,
        content: String,
    },
    PageProgress {
        session_id: String,
        page_id: String,
        content: String,
    },
    PageSettled {
        session_id: String,
        page_id: String,
        status: JobStatus,
        content: String,
    },
    PageAdded {
        session_id: String,
        page: SitePage,
    },
    /// A settled artifact is being regenerated with a refinement
    /// instruction: its lifecycle restarts at `pending`.
    RefinementStarted {
        session_id: String,
        artifact_id: String,
    },
    /// Replace a completed artifact's content (undo, redo, restore, image
    /// swap). When `recorded` is set, the owner task persists that ledger
    /// entry alongside the session.
    ArtifactContentReplaced {
        session_id: String,
        artifact_id: String,
        content: String,
        recorded: Option<VersionEntry>,
    },
    PublishAttached {
        session_id: String,
        artifact_id: String,
        info: PublishInfo,
    },
    /// Barrier: acknowledged once every earlier event has been applied.
    Flush(oneshot::Sender<()>),
}

/// Pure state transition. Returns `None` when the event is a no-op
/// (unknown ids, or a transition the status machine forbids); the caller
/// keeps the previous snapshot in that case.
#[must_use]
pub fn apply(state: &EngineState, event: &StoreEvent) -> Option<EngineState> {
    match event {
        StoreEvent::SessionCreated(session) => {
            if state.session(&session.id).is_some() {
                tracing::warn!(session_id = %session.id, "duplicate session creation ignored");
                return None;
            }
            let mut next = state.clone();
            next.sessions.push(session.clone());
            Some(next)
        },
        StoreEvent::StyleLabelsAssigned { session_id, labels } => {
            update_session(state, session_id, |session| {
                let mut session = session.clone();
                for (artifact, label) in session.artifacts.iter_mut().zip(labels) {
                    artifact.style_label.clone_from(label);
                }
                Some(session)
            })
        },
        StoreEvent::ArtifactProgress { session_id, artifact_id, content } => {
            update_artifact(state, session_id, artifact_id, |artifact| {
                if artifact.status.is_terminal() {
                    tracing::warn!(%artifact_id, "progress after terminal status ignored");
                    return None;
                }
                let mut artifact = artifact.clone();
                artifact.status = JobStatus::Streaming;
                artifact.content = content.clone();
                Some(artifact)
            })
        },
        StoreEvent::ArtifactSettled { session_id, artifact_id, status, content } => {
            update_artifact(state, session_id, artifact_id, |artifact| {
                settle(artifact.status, *status, artifact_id).then(|| {
                    let mut artifact = artifact.clone();
                    artifact.status = *status;
                    artifact.content = content.clone();
                    artifact
                })
            })
        },
        StoreEvent::PageProgress { session_id, page_id, content } => {
            update_page(state, session_id, page_id, |page| {
                if page.status.is_terminal() {
                    tracing::warn!(%page_id, "progress after terminal status ignored");
                    return None;
                }
                let mut page = page.clone();
                page.status = JobStatus::Streaming;
                page.content = content.clone();
                Some(page)
            })
        },
        StoreEvent::PageSettled { session_id, page_id, status, content } => {
            update_page(state, session_id, page_id, |page| {
                settle(page.status, *status, page_id).then(|| {
                    let mut page = page.clone();
                    page.status = *status;
                    page.content = content.clone();
                    page
                })
            })
        },
        StoreEvent::PageAdded { session_id, page } => {
            update_session(state, session_id, |session| {
                let Some(site) = &session.site else {
                    tracing::warn!(%session_id, "page added to a session without a site");
                    return None;
                };
                if page.is_home && site.home().is_some() {
                    tracing::warn!(%session_id, "second home page rejected");
                    return None;
                }
                let mut session = session.clone();
                if let Some(site) = session.site.as_mut() {
                    site.pages.push(page.clone());
                }
                Some(session)
            })
        },
        StoreEvent::RefinementStarted { session_id, artifact_id } => {
            update_artifact(state, session_id, artifact_id, |artifact| {
                if !artifact.status.is_terminal() {
                    tracing::warn!(%artifact_id, "refinement requires a settled artifact");
                    return None;
                }
                let mut artifact = artifact.clone();
                artifact.status = JobStatus::Pending;
                Some(artifact)
            })
        },
        StoreEvent::ArtifactContentReplaced { session_id, artifact_id, content, .. } => {
            update_artifact(state, session_id, artifact_id, |artifact| {
                if artifact.status != JobStatus::Complete {
                    tracing::warn!(%artifact_id, "content replacement requires a complete artifact");
                    return None;
                }
                let mut artifact = artifact.clone();
                artifact.content = content.clone();
                Some(artifact)
            })
        },
        StoreEvent::PublishAttached { session_id, artifact_id, info } => {
            update_artifact(state, session_id, artifact_id, |artifact| {
                if artifact.status != JobStatus::Complete {
                    tracing::warn!(%artifact_id, "publish info requires a complete artifact");
                    return None;
                }
                let mut artifact = artifact.clone();
                artifact.publish = Some(info.clone());
                Some(artifact)
            })
        },
        StoreEvent::Flush(_) => None,
    }
}

fn settle(current: JobStatus, next: JobStatus, id: &str) -> bool {
    if !next.is_terminal() {
        tracing::warn!(id, %next, "settlement with non-terminal status ignored");
        return false;
    }
    if !current.allows(next) {
        tracing::warn!(id, %current, %next, "settlement after terminal status ignored");
        return false;
    }
    true
}

fn update_session(
    state: &EngineState,
    session_id: &str,
    f: impl FnOnce(&Session) -> Option<Session>,
) -> Option<EngineState> {
    let Some(idx) = state.sessions.iter().position(|s| s.id == session_id) else {
        tracing::warn!(session_id, "event for unknown session ignored");
        return None;
    };
    let updated = f(&state.sessions[idx])?;
    let mut next = state.clone();
    next.sessions[idx] = updated;
    Some(next)
}

fn update_artifact(
    state: &EngineState,
    session_id: &str,
    artifact_id: &str,
    f: impl FnOnce(&Artifact) -> Option<Artifact>,
) -> Option<EngineState> {
    update_session(state, session_id, |session| {
        let Some(idx) = session.artifacts.iter().position(|a| a.id == artifact_id) else {
            tracing::warn!(session_id, artifact_id, "event for unknown artifact ignored");
            return None;
        };
        let updated = f(&session.artifacts[idx])?;
        let mut session = session.clone();
        session.artifacts[idx] = updated;
        Some(session)
    })
}

fn update_page(
    state: &EngineState,
    session_id: &str,
    page_id: &str,
    f: impl FnOnce(&SitePage) -> Option<SitePage>,
) -> Option<EngineState> {
    update_session(state, session_id, |session| {
        let site = session.site.as_ref()?;
        let Some(idx) = site.pages.iter().position(|p| p.id == page_id) else {
            tracing::warn!(session_id, page_id, "event for unknown page ignored");
            return None;
        };
        let updated = f(&site.pages[idx])?;
        let mut session = session.clone();
        if let Some(site) = session.site.as_mut() {
            site.pages[idx] = updated;
        }
        Some(session)
    })
}

/// Cheaply cloneable handle used by jobs and consumers.
#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::UnboundedSender<StoreEvent>,
    snapshot: watch::Receiver<Arc<EngineState>>,
}

impl StoreHandle {
    /// Enqueue one event. Safe to call from an abandoned job: once the
    /// store is gone the event is dropped without affecting anything.
    pub fn send(&self, event: StoreEvent) {
        if self.tx.send(event).is_err() {
            tracing::warn!("store task is gone; event dropped");
        }
    }

    /// The latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<EngineState> {
        self.snapshot.borrow().clone()
    }

    /// Watch snapshots as they are published (progressive display).
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<EngineState>> {
        self.snapshot.clone()
    }

    /// Wait until every event enqueued before this call has been applied.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(StoreEvent::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }
}

/// Spawn the store owner task.
///
/// The task applies events in arrival order, publishes snapshots, records
/// completed artifacts into the ledger, and persists best-effort: a failed
/// write is logged and the in-memory state remains the source of truth.
pub fn spawn_store(
    persist: Arc<dyn StateStore>,
    ledger: Arc<Mutex<VersionLedger>>,
) -> StoreHandle {
    let (tx, mut rx) = mpsc::unbounded_channel::<StoreEvent>();
    let (watch_tx, watch_rx) = watch::channel(Arc::new(EngineState::default()));

    tokio::spawn(async move {
        let mut state = Arc::new(EngineState::default());
        while let Some(event) = rx.recv().await {
            let event = match event {
                StoreEvent::Flush(ack) => {
                    let _ = ack.send(());
                    continue;
                },
                other => other,
            };
            let Some(next) = apply(&state, &event) else { continue };
            state = Arc::new(next);
            watch_tx.send_replace(Arc::clone(&state));
            run_side_effects(&state, &event, persist.as_ref(), &ledger).await;
        }
    });

    StoreHandle { tx, snapshot: watch_rx }
}

/// Ledger recording and persistence for one applied event.
async fn run_side_effects(
    state: &EngineState,
    event: &StoreEvent,
    persist: &dyn StateStore,
    ledger: &Mutex<VersionLedger>,
) {
    match event {
        StoreEvent::SessionCreated(session) => {
            // Generation has started; the autosaved draft is obsolete.
            if let Err(e) = persist.clear_draft().await {
                tracing::warn!("draft clear failed: {e}");
            }
            persist_session(state, &session.id, persist).await;
        },
        StoreEvent::ArtifactSettled { session_id, artifact_id, status, content } => {
            if *status == JobStatus::Complete {
                let label = state
                    .artifact(session_id, artifact_id)
                    .map_or_else(|| "generated".to_owned(), |a| a.style_label.clone());
                let recorded = {
                    let mut ledger = match ledger.lock() {
                        Ok(guard) => guard,
                        Err(poisoned) => poisoned.into_inner(),
                    };
                    ledger.record(artifact_id, content, &label)
                };
                if let Some(entry) = recorded {
                    if let Err(e) = persist.append_version_entry(&entry).await {
                        tracing::warn!("version entry write failed: {e}");
                    }
                }
            }
            persist_session(state, session_id, persist).await;
        },
        StoreEvent::ArtifactContentReplaced { session_id, recorded, .. } => {
            if let Some(entry) = recorded {
                if let Err(e) = persist.append_version_entry(entry).await {
                    tracing::warn!("version entry write failed: {e}");
                }
            }
            persist_session(state, session_id, persist).await;
        },
        StoreEvent::PageSettled { session_id, .. }
        | StoreEvent::PageAdded { session_id, .. }
        | StoreEvent::PublishAttached { session_id, .. } => {
            persist_session(state, session_id, persist).await;
        },
        // Chunk-level progress and lifecycle restarts are not persisted;
        // the next settlement writes the session anyway.
        StoreEvent::StyleLabelsAssigned { .. }
        | StoreEvent::ArtifactProgress { .. }
        | StoreEvent::PageProgress { .. }
        | StoreEvent::RefinementStarted { .. }
        | StoreEvent::Flush(_) => {},
    }
}

async fn persist_session(state: &EngineState, session_id: &str, persist: &dyn StateStore) {
    let Some(session) = state.session(session_id) else { return };
    if let Err(e) = persist.save_session(session).await {
        tracing::warn!(session_id, "session write failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use pageforge_core::GenerationMode;

    use super::*;

    fn session_with_artifact() -> Session {
        Session {
            id: "s1".to_owned(),
            prompt: "p".to_owned(),
            created_at: Utc::now(),
            mode: GenerationMode::Single,
            artifacts: vec![Artifact::pending("a1".to_owned(), "Variant 1".to_owned())],
            site: None,
        }
    }

    fn seeded() -> EngineState {
        apply(&EngineState::default(), &StoreEvent::SessionCreated(session_with_artifact()))
            .unwrap()
    }

    #[test]
    fn progress_moves_pending_to_streaming() {
        let state = seeded();
        let next = apply(
            &state,
            &StoreEvent::ArtifactProgress {
                session_id: "s1".to_owned(),
                artifact_id: "a1".to_owned(),
                content: "<ht".to_owned(),
            },
        )
        .unwrap();
        let artifact = next.artifact("s1", "a1").unwrap();
        assert_eq!(artifact.status, JobStatus::Streaming);
        assert_eq!(artifact.content, "<ht");
        // Previous snapshot untouched.
        assert_eq!(state.artifact("s1", "a1").unwrap().status, JobStatus::Pending);
    }

    #[test]
    fn settlement_is_terminal() {
        let state = seeded();
        let settled = apply(
            &state,
            &StoreEvent::ArtifactSettled {
                session_id: "s1".to_owned(),
                artifact_id: "a1".to_owned(),
                status: JobStatus::Complete,
                content: "<html></html>".to_owned(),
            },
        )
        .unwrap();
        // Late progress and a second settlement are both ignored.
        assert!(apply(
            &settled,
            &StoreEvent::ArtifactProgress {
                session_id: "s1".to_owned(),
                artifact_id: "a1".to_owned(),
                content: "late".to_owned(),
            },
        )
        .is_none());
        assert!(apply(
            &settled,
            &StoreEvent::ArtifactSettled {
                session_id: "s1".to_owned(),
                artifact_id: "a1".to_owned(),
                status: JobStatus::Error,
                content: "late".to_owned(),
            },
        )
        .is_none());
    }

    #[test]
    fn settlement_with_non_terminal_status_rejected() {
        let state = seeded();
        assert!(apply(
            &state,
            &StoreEvent::ArtifactSettled {
                session_id: "s1".to_owned(),
                artifact_id: "a1".to_owned(),
                status: JobStatus::Streaming,
                content: String::new(),
            },
        )
        .is_none());
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let state = seeded();
        assert!(apply(
            &state,
            &StoreEvent::ArtifactProgress {
                session_id: "nope".to_owned(),
                artifact_id: "a1".to_owned(),
                content: String::new(),
            },
        )
        .is_none());
        assert!(apply(
            &state,
            &StoreEvent::ArtifactProgress {
                session_id: "s1".to_owned(),
                artifact_id: "nope".to_owned(),
                content: String::new(),
            },
        )
        .is_none());
    }

    #[test]
    fn style_labels_fill_placeholders() {
        let state = seeded();
        let next = apply(
            &state,
            &StoreEvent::StyleLabelsAssigned {
                session_id: "s1".to_owned(),
                labels: vec!["Warm Rustic".to_owned()],
            },
        )
        .unwrap();
        assert_eq!(next.artifact("s1", "a1").unwrap().style_label, "Warm Rustic");
    }

    #[test]
    fn refinement_restarts_settled_artifact() {
        let state = seeded();
        // Not yet settled: refinement rejected.
        assert!(apply(
            &state,
            &StoreEvent::RefinementStarted {
                session_id: "s1".to_owned(),
                artifact_id: "a1".to_owned(),
            },
        )
        .is_none());

        let settled = apply(
            &state,
            &StoreEvent::ArtifactSettled {
                session_id: "s1".to_owned(),
                artifact_id: "a1".to_owned(),
                status: JobStatus::Error,
                content: "failed".to_owned(),
            },
        )
        .unwrap();
        let restarted = apply(
            &settled,
            &StoreEvent::RefinementStarted {
                session_id: "s1".to_owned(),
                artifact_id: "a1".to_owned(),
            },
        )
        .unwrap();
        assert_eq!(restarted.artifact("s1", "a1").unwrap().status, JobStatus::Pending);
    }

    #[test]
    fn content_replacement_requires_complete() {
        let state = seeded();
        assert!(apply(
            &state,
            &StoreEvent::ArtifactContentReplaced {
                session_id: "s1".to_owned(),
                artifact_id: "a1".to_owned(),
                content: "x".to_owned(),
                recorded: None,
            },
        )
        .is_none());
    }
}
