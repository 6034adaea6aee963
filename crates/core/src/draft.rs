use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Autosaved pre-submission input state. One slot: each save supersedes
/// the previous draft, and the slot is cleared once generation starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Draft {
    pub prompt: String,
    pub reference_image: Option<String>,
    pub style_kit_id: Option<String>,
    pub site_mode: bool,
    pub page_names: Vec<String>,
    pub saved_at: DateTime<Utc>,
}
