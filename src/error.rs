//! Anchoring error types
//!
//! A single error enum covers selector resolution, selector generation and
//! the content-source plumbing underneath both.

use std::time::Duration;

use thiserror::Error;

use crate::tree::PathParseError;

/// Unified anchoring error type
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnchorError {
    /// No quote selector supplied
    #[error("No quote selector found")]
    SelectorMissing,

    /// Position offsets exceed the current text length
    #[error("Offsets {start}..{end} are out of range for text of length {len}")]
    OffsetOutOfRange { start: i64, end: i64, len: usize },

    /// Text at the resolved location does not equal the quote
    #[error("Quote mismatch: expected {expected:?}, found {found:?}")]
    QuoteMismatch { expected: String, found: String },

    /// A structural path step has no matching child
    #[error("Failed to resolve path: {0}")]
    StructuralPathUnresolved(String),

    /// No candidate met the minimum criteria on any page
    #[error("Quote not found")]
    QuoteNotFound,

    /// Generation attempted on a span crossing a page boundary
    #[error("Selecting across page breaks is not supported")]
    CrossBoundarySpan,

    /// Path string does not follow the `/tag[index]` grammar
    #[error("Invalid path: {0}")]
    InvalidPath(#[from] PathParseError),

    /// A point offset lies outside its node
    #[error("Invalid position: {0}")]
    InvalidPosition(String),

    /// Span contains no (non-whitespace) text
    #[error("Range contains no text")]
    NoText,

    /// Span lies outside any page text layer
    #[error("Selection is outside page text")]
    OutsidePage,

    /// Content source failed to produce one page's text
    #[error("Failed to get text of page {page}: {message}")]
    PageText { page: usize, message: String },

    /// Page index beyond the page count
    #[error("Invalid page index: {0}")]
    InvalidPage(usize),

    /// Failed to load a document tree
    #[error("Parse error: {0}")]
    Parse(String),

    /// Waiting for a page to render took too long
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

impl AnchorError {
    /// Whether the orchestrator should fall back to the next strategy
    /// rather than surface this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AnchorError::OffsetOutOfRange { .. }
                | AnchorError::QuoteMismatch { .. }
                | AnchorError::StructuralPathUnresolved(_)
                | AnchorError::InvalidPath(_)
                | AnchorError::InvalidPosition(_)
                | AnchorError::NoText
                | AnchorError::PageText { .. }
                | AnchorError::InvalidPage(_)
        )
    }
}

impl From<roxmltree::Error> for AnchorError {
    fn from(err: roxmltree::Error) -> Self {
        AnchorError::Parse(err.to_string())
    }
}

/// Result type alias for anchoring operations
pub type Result<T> = std::result::Result<T, AnchorError>;
