//! Incremental buffer for one job's streamed output.

use pageforge_core::{finalize_document, Result};

/// Accumulates ordered text chunks from one completion call.
///
/// The buffer only ever grows while streaming; finalization is a pure
/// function of the final buffer (see `pageforge_core::finalize`).
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    buffer: String,
}

impl StreamAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one chunk and return the current buffer.
    pub fn push(&mut self, chunk: &str) -> &str {
        self.buffer.push_str(chunk);
        &self.buffer
    }

    #[must_use]
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Finalize the completed stream into a clean document.
    pub fn finalize(self) -> Result<String> {
        finalize_document(&self.buffer)
    }

    /// The raw buffer, for diagnostics when finalization fails.
    #[must_use]
    pub fn into_raw(self) -> String {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_grows_monotonically() {
        let mut acc = StreamAccumulator::new();
        let mut last_len = 0;
        for chunk in ["<html>", "<body>", "hello", "</body>", "</html>"] {
            let buf = acc.push(chunk);
            assert!(buf.len() > last_len);
            assert!(buf.ends_with(chunk));
            last_len = buf.len();
        }
        assert_eq!(acc.buffer(), "<html><body>hello</body></html>");
    }

    #[test]
    fn finalize_strips_wrapper() {
        let mut acc = StreamAccumulator::new();
        acc.push("```html\n");
        acc.push(&format!("<html><body>{}</body></html>", "x".repeat(150)));
        acc.push("\n```");
        let doc = acc.finalize().unwrap();
        assert!(doc.starts_with("<html>"));
        assert!(doc.ends_with("</html>"));
    }

    #[test]
    fn finalize_of_garbage_fails() {
        let mut acc = StreamAccumulator::new();
        acc.push("not a document");
        assert!(acc.finalize().is_err());
    }
}
