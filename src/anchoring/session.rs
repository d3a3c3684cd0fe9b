//! Per-document anchoring state
//!
//! Anchoring a paginated document repeatedly needs the same page texts, and
//! re-anchoring after a re-render usually lands where the previous quote
//! search did. Both are cached here. A session belongs to one document; drop
//! it or call [`AnchoringSession::purge`] when the document changes.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::pdf::PageSource;
use crate::config::DEFAULT_QUOTE_CACHE_CAPACITY;
use crate::error::Result;

/// Cache key for a quote search: the quote and the position hint it was
/// searched with.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct QuotePositionKey {
    pub exact: String,
    pub position: i64,
}

impl QuotePositionKey {
    pub fn new(exact: &str, position: i64) -> Self {
        Self {
            exact: exact.to_string(),
            position,
        }
    }
}

/// Location found by an earlier quote search, in page text coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageMatch {
    pub page_index: usize,
    pub start: usize,
    pub end: usize,
}

/// Caches shared by all anchoring operations on one document
pub struct AnchoringSession {
    /// One cell per page. Concurrent requests for a page share the fetch in
    /// flight; a failed fetch leaves the cell empty.
    page_texts: Mutex<HashMap<usize, Arc<OnceCell<String>>>>,
    quote_positions: Mutex<LruCache<QuotePositionKey, PageMatch>>,
    warned_text_mismatch: AtomicBool,
}

impl Default for AnchoringSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AnchoringSession {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_QUOTE_CACHE_CAPACITY)
    }

    /// Create a session whose quote-position cache holds `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            page_texts: Mutex::new(HashMap::new()),
            quote_positions: Mutex::new(LruCache::new(capacity)),
            warned_text_mismatch: AtomicBool::new(false),
        }
    }

    /// Text of a page, fetched from `source` on first use
    pub async fn page_text<S: PageSource + ?Sized>(
        &self,
        source: &S,
        page_index: usize,
    ) -> Result<String> {
        let cell = {
            let mut page_texts = self.page_texts.lock();
            page_texts.entry(page_index).or_default().clone()
        };
        let text = cell
            .get_or_try_init(|| source.page_text(page_index))
            .await?;
        Ok(text.clone())
    }

    /// Number of pages whose text is cached
    pub fn cached_pages(&self) -> usize {
        self.page_texts
            .lock()
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    pub fn cached_quote_position(&self, key: &QuotePositionKey) -> Option<PageMatch> {
        let found = self.quote_positions.lock().get(key).copied();
        if found.is_some() {
            debug!("Quote position cache hit for {:?} at {}", key.exact, key.position);
        }
        found
    }

    pub fn cache_quote_position(&self, key: QuotePositionKey, found: PageMatch) {
        self.quote_positions.lock().put(key, found);
    }

    /// Log that a page's text layer disagrees with its extracted text. Only
    /// the first report per session is logged; returns whether this one was.
    pub fn report_text_mismatch(&self, page_index: usize) -> bool {
        if self.warned_text_mismatch.swap(true, Ordering::Relaxed) {
            return false;
        }
        warn!(
            "Text layer text does not match page text (page {}). Highlights will be mis-aligned.",
            page_index
        );
        true
    }

    /// Forget all cached state
    pub fn purge(&self) {
        self.page_texts.lock().clear();
        self.quote_positions.lock().clear();
        self.warned_text_mismatch.store(false, Ordering::Relaxed);
    }
}
