use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Site;

/// One user generation request, owning its variants (single mode) or
/// one site (site mode). Sessions are replaced by full-value updates,
/// never mutated through aliasing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub prompt: String,
    pub created_at: DateTime<Utc>,
    pub mode: GenerationMode,
    pub artifacts: Vec<Artifact>,
    pub site: Option<Site>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    Single,
    Site,
}

/// One generated variant within a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub id: String,
    pub style_label: String,
    pub content: String,
    pub status: JobStatus,
    pub publish: Option<PublishInfo>,
}

impl Artifact {
    /// Placeholder artifact created before any network activity starts.
    #[must_use]
    pub fn pending(id: String, style_label: String) -> Self {
        Self { id, style_label, content: String::new(), status: JobStatus::Pending, publish: None }
    }
}

/// Metadata attached to an artifact once the publishing backend accepts it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishInfo {
    pub url: String,
    pub short_id: String,
    pub published_at: DateTime<Utc>,
}

/// Lifecycle of one generation job, shared by artifacts and site pages.
///
/// Transitions move forward only: `pending → streaming → {complete | error}`.
/// Both `complete` and `error` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Streaming,
    Complete,
    Error,
}

impl JobStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }

    /// Whether the state machine permits moving from `self` to `next`.
    #[must_use]
    pub fn allows(self, next: Self) -> bool {
        match self {
            Self::Pending => matches!(next, Self::Streaming | Self::Complete | Self::Error),
            Self::Streaming => matches!(next, Self::Complete | Self::Error),
            Self::Complete | Self::Error => false,
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = crate::ForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "streaming" => Ok(Self::Streaming),
            "complete" => Ok(Self::Complete),
            "error" => Ok(Self::Error),
            _ => Err(crate::ForgeError::InvalidInput(format!("Invalid job status: {s}"))),
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Streaming => "streaming",
            Self::Complete => "complete",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}
