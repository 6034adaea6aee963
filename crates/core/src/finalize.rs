//! Finalization of streamed document content.
//!
//! Completion models routinely wrap a generated document in a fenced code
//! block and sometimes prepend prose around it. Finalization strips one
//! such wrapper, checks the result for document structure, and attempts a
//! single rescue extraction before giving up. The whole transform is a
//! pure function of the final buffer and is idempotent: reapplying it to
//! already-clean content is a no-op.

use crate::{ForgeError, Result, MIN_DOCUMENT_LEN};

/// Strip a single fenced-code-block wrapper from content.
///
/// Handles a leading ```` ```lang ```` line (any language tag, or none)
/// and a trailing ```` ``` ```` fence. Content without a wrapper is
/// returned trimmed but otherwise untouched.
#[must_use]
pub fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    if trimmed.len() > 6 && trimmed.starts_with("```") && trimmed.ends_with("```") {
        let without_prefix = trimmed.strip_prefix("```").unwrap_or(trimmed);
        let without_suffix = without_prefix.strip_suffix("```").unwrap_or(without_prefix);
        // Drop the language tag line if present.
        return without_suffix
            .split_once('\n')
            .map_or_else(|| without_suffix.trim(), |(_, rest)| rest.trim());
    }
    trimmed
}

/// Finalize a completed stream buffer into a clean document.
///
/// Strips one code-fence wrapper, validates structure, and on failure
/// attempts one rescue: the longest substring bounded by the document's
/// root markers. If rescue also fails, returns a validation error with
/// the raw buffer preserved for diagnostics.
pub fn finalize_document(raw: &str) -> Result<String> {
    let stripped = strip_code_fence(raw);
    if is_structurally_valid(stripped) {
        return Ok(stripped.to_owned());
    }
    if let Some(rescued) = rescue_document(stripped) {
        if is_structurally_valid(rescued) {
            return Ok(rescued.to_owned());
        }
    }
    Err(ForgeError::Validation {
        reason: format!(
            "finalized content is not a document ({} chars, no root marker)",
            stripped.len()
        ),
        raw: raw.to_owned(),
    })
}

/// Minimum length, and the content must begin at the document root.
/// Prose wrapped around an otherwise intact document fails here and is
/// handled by the rescue extraction.
fn is_structurally_valid(content: &str) -> bool {
    if content.len() < MIN_DOCUMENT_LEN {
        return false;
    }
    let lower = content.trim_start().to_ascii_lowercase();
    lower.starts_with("<!doctype") || lower.starts_with("<html")
}

/// Longest substring from the first root-start marker through the last
/// closing root tag. Falls back to end-of-buffer when the closing tag
/// never arrived (truncated stream).
fn rescue_document(content: &str) -> Option<&str> {
    let lower = content.to_ascii_lowercase();
    let start = lower.find("<!doctype").or_else(|| lower.find("<html"))?;
    let end = lower.rfind("</html>").map_or(content.len(), |i| i + "</html>".len());
    if end <= start {
        return None;
    }
    content.get(start..end)
}
