//! Selector types following the Web Annotation data model
//!
//! These are the persisted shapes of an annotation's target. Field names are
//! part of the storage format and must not change.
//!
//! Reference: <https://www.w3.org/TR/annotation-model/#selectors>

use serde::{Deserialize, Serialize};

/// Selector identifying annotated content
///
/// Several selectors are stored per annotation so that resolution can fall
/// back from the most precise to the most robust one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Selector {
    /// Text quote with context
    #[serde(rename = "TextQuoteSelector")]
    TextQuote(TextQuoteSelector),
    /// Character offsets within document text
    #[serde(rename = "TextPositionSelector")]
    TextPosition(TextPositionSelector),
    /// Structural path plus local offsets
    #[serde(rename = "RangeSelector")]
    Range(RangeSelector),
    /// Page of a paginated document
    #[serde(rename = "PageSelector")]
    Page(PageSelector),
}

/// Text quote selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextQuoteSelector {
    /// The exact text that was annotated
    pub exact: String,
    /// Text before the selection (for context)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Text after the selection (for context)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

/// Character position selector
///
/// Offsets are signed: stored selectors are untrusted and a negative value is
/// rejected when anchoring rather than when parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPositionSelector {
    /// Start character offset
    pub start: i64,
    /// End character offset
    pub end: i64,
}

/// Structural range selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeSelector {
    /// Path of the start element, e.g. `/div[1]/p[2]`
    pub start_container: String,
    /// Character offset within the start element's text
    pub start_offset: usize,
    /// Path of the end element
    pub end_container: String,
    /// Character offset within the end element's text
    pub end_offset: usize,
}

/// Page selector (paginated documents only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSelector {
    /// 0-based page index
    pub index: usize,
    /// Page label as shown by the viewer
    pub label: String,
}

impl TextQuoteSelector {
    pub fn new(exact: impl Into<String>) -> Self {
        Self {
            exact: exact.into(),
            prefix: None,
            suffix: None,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }
}

impl TextPositionSelector {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start: start as i64,
            end: end as i64,
        }
    }

    /// Offsets as a `usize` range, if they are usable against text of `len`
    /// characters.
    pub fn checked_range(&self, len: usize) -> Option<(usize, usize)> {
        if self.start < 0 || self.end < self.start || self.end as u64 > len as u64 {
            return None;
        }
        Some((self.start as usize, self.end as usize))
    }
}

impl From<TextQuoteSelector> for Selector {
    fn from(selector: TextQuoteSelector) -> Self {
        Selector::TextQuote(selector)
    }
}

impl From<TextPositionSelector> for Selector {
    fn from(selector: TextPositionSelector) -> Self {
        Selector::TextPosition(selector)
    }
}

impl From<RangeSelector> for Selector {
    fn from(selector: RangeSelector) -> Self {
        Selector::Range(selector)
    }
}

impl From<PageSelector> for Selector {
    fn from(selector: PageSelector) -> Self {
        Selector::Page(selector)
    }
}

/// Accessors over the selectors of one annotation target
pub trait SelectorSet {
    fn quote(&self) -> Option<&TextQuoteSelector>;
    fn position(&self) -> Option<&TextPositionSelector>;
    fn range(&self) -> Option<&RangeSelector>;
    fn page(&self) -> Option<&PageSelector>;
}

impl SelectorSet for [Selector] {
    fn quote(&self) -> Option<&TextQuoteSelector> {
        self.iter().find_map(|s| match s {
            Selector::TextQuote(q) => Some(q),
            _ => None,
        })
    }

    fn position(&self) -> Option<&TextPositionSelector> {
        self.iter().find_map(|s| match s {
            Selector::TextPosition(p) => Some(p),
            _ => None,
        })
    }

    fn range(&self) -> Option<&RangeSelector> {
        self.iter().find_map(|s| match s {
            Selector::Range(r) => Some(r),
            _ => None,
        })
    }

    fn page(&self) -> Option<&PageSelector> {
        self.iter().find_map(|s| match s {
            Selector::Page(p) => Some(p),
            _ => None,
        })
    }
}
