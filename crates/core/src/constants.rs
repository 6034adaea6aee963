//! Shared constants for pageforge.
//!
//! Centralizes limits and defaults used across crates.

/// Maximum number of sessions retained in persistent storage.
pub const MAX_STORED_SESSIONS: usize = 10;

/// Maximum number of version entries retained in persistent storage.
pub const MAX_VERSION_ENTRIES: usize = 100;

/// Default number of jobs run concurrently within one scheduler group.
pub const DEFAULT_BATCH_WIDTH: usize = 3;

/// Default number of style variants requested per generation.
pub const DEFAULT_VARIANT_COUNT: usize = 3;

/// Outbound completion call timeout in seconds, applied once on the
/// shared HTTP client. A timed-out call settles its job as an error.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Minimum finalized document length accepted by structural validation.
pub const MIN_DOCUMENT_LEN: usize = 100;

/// Maximum number of home-page characters embedded into follow-up site
/// page prompts as the style-matching reference.
pub const HOME_EXCERPT_MAX_LEN: usize = 6000;

/// Fixed style descriptors used when the style-decision response cannot
/// be parsed. Order matters: the fallback must be deterministic so the
/// same malformed response always produces the same variant labels.
pub const FALLBACK_STYLES: [&str; 10] = [
    "Modern Minimal",
    "Bold & Vibrant",
    "Elegant Classic",
    "Warm & Friendly",
    "Dark & Dramatic",
    "Clean Corporate",
    "Playful Creative",
    "Editorial Serif",
    "Soft Pastel",
    "High-Contrast Mono",
];
