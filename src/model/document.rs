//! Editor documents and selections

use std::fmt;
use std::sync::Arc;

/// The full text of an editor buffer at one instant.
///
/// Documents are replaced wholesale on every edit; clones share the text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceDocument {
    text: Arc<str>,
}

impl SourceDocument {
    /// Capture a document from editor text
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self { text: text.into() }
    }

    /// The raw text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Lines split on `\n`, with a trailing `\r` removed
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
    }

    /// Number of lines (an empty document has one empty line)
    pub fn line_count(&self) -> usize {
        self.lines().count()
    }

    /// Get a line by its 1-based number
    pub fn line(&self, number: usize) -> Option<&str> {
        number.checked_sub(1).and_then(|idx| self.lines().nth(idx))
    }

    /// Whether the document holds nothing but whitespace
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

impl From<&str> for SourceDocument {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for SourceDocument {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl fmt::Display for SourceDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Which part of the query buffer a run executes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SelectionScope {
    /// The whole buffer
    #[default]
    WholeBuffer,
    /// Exactly this selected text
    Range(String),
}

impl SelectionScope {
    /// Build a scope from the live editor selection.
    ///
    /// An empty (or whitespace-only) selection means the whole buffer.
    pub fn from_selection(selected: &str) -> Self {
        if selected.trim().is_empty() {
            SelectionScope::WholeBuffer
        } else {
            SelectionScope::Range(selected.to_string())
        }
    }

    /// The text to send to the engine for this scope
    pub fn resolve<'a>(&'a self, buffer: &'a str) -> &'a str {
        match self {
            SelectionScope::Range(text) if !text.trim().is_empty() => text,
            _ => buffer,
        }
    }

    /// Whether a non-empty range is selected
    pub fn is_range(&self) -> bool {
        matches!(self, SelectionScope::Range(text) if !text.trim().is_empty())
    }
}
