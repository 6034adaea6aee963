use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable snapshot of a completed artifact's content.
///
/// Entries are recorded only when the content differs from the last
/// entry for the same artifact, so no-op refinements leave no trace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersionEntry {
    pub id: String,
    pub artifact_id: String,
    pub content: String,
    pub label: String,
    pub created_at: DateTime<Utc>,
}
