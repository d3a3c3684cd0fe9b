//! Anchoring in paginated (PDF) documents
//!
//! A PDF viewer only renders the text layers of some pages at a time, and the
//! text it renders differs in whitespace from the text extracted from the
//! PDF. Selectors are therefore stored in extracted-text coordinates (offsets
//! into the concatenated text of all pages) and translated to a page's text
//! layer only once that page is rendered.
//!
//! Resolution order:
//! 1. The position selector, validated against the quote.
//! 2. A quote match found earlier in this session for the same position.
//! 3. A quote search over all pages, nearest to the expected page first.
//!
//! A match on a page that is not rendered yields an [`Anchor::Placeholder`].

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, warn};

use super::html::quote_from_range;
use super::session::{AnchoringSession, PageMatch, QuotePositionKey};
use super::text_range::{DomRange, TextPosition, TextRange};
use crate::config::AnchorConfig;
use crate::error::{AnchorError, Result};
use crate::selectors::{
    PageSelector, Selector, SelectorSet, TextPositionSelector, TextQuoteSelector,
};
use crate::text::{
    char_slice, is_not_space, match_quote_with, strip_spaces, translate_offsets, Match,
    QuoteContext, TranslateOptions,
};
use crate::tree::{Document, NodeId, TextTree};

/// Class of the element holding a rendered page's text
pub const TEXT_LAYER_CLASS: &str = "textLayer";

/// Rendering state of a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageView {
    /// The page's text layer is in the current document
    Rendered { layer: NodeId },
    /// Not rendered yet
    Pending,
}

/// Content of a paginated document
#[async_trait]
pub trait PageSource: Send + Sync {
    fn page_count(&self) -> usize;

    /// Extracted text of a page
    async fn page_text(&self, page_index: usize) -> Result<String>;

    /// Current snapshot of the viewer's document
    fn document(&self) -> Arc<Document>;

    /// Rendering state of a page in [`PageSource::document`]
    fn page_view(&self, page_index: usize) -> PageView;

    /// Label shown for a page (e.g. "iv", "12")
    fn page_label(&self, page_index: usize) -> String {
        (page_index + 1).to_string()
    }

    /// Resolves once the page has rendered
    async fn wait_for_render(&self, _page_index: usize) -> Result<()> {
        Ok(())
    }
}

/// Stand-in for an annotation on a page that is not rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placeholder {
    pub page_index: usize,
}

/// Outcome of anchoring in a paginated document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Range within the page's text layer
    Range { page_index: usize, range: DomRange },
    /// Anchored to a page that is not rendered. Anchor again once it is.
    Placeholder(Placeholder),
}

impl Anchor {
    pub fn page_index(&self) -> usize {
        match self {
            Anchor::Range { page_index, .. } => *page_index,
            Anchor::Placeholder(placeholder) => placeholder.page_index,
        }
    }

    pub fn range(&self) -> Option<&DomRange> {
        match self {
            Anchor::Range { range, .. } => Some(range),
            Anchor::Placeholder(_) => None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Anchor::Placeholder(_))
    }
}

/// Page containing a document offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOffset {
    pub index: usize,
    /// Offset of the start of the page in the document text
    pub offset: usize,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageStrategy {
    Position,
    CachedQuote,
    QuoteSearch,
}

const PAGE_STRATEGIES: [PageStrategy; 3] = [
    PageStrategy::Position,
    PageStrategy::CachedQuote,
    PageStrategy::QuoteSearch,
];

impl PageStrategy {
    fn name(&self) -> &'static str {
        match self {
            PageStrategy::Position => "position",
            PageStrategy::CachedQuote => "cached quote position",
            PageStrategy::QuoteSearch => "quote search",
        }
    }
}

/// Text layer containing `node`, if any
fn text_layer_of(doc: &Document, node: NodeId) -> Option<NodeId> {
    let mut current = Some(node);
    while let Some(n) = current {
        if doc.has_class(n, TEXT_LAYER_CLASS) {
            return Some(n);
        }
        current = doc.parent(n);
    }
    None
}

/// Page index of a text layer: the position of its page container among
/// the other pages.
fn page_index_of_layer(doc: &Document, layer: NodeId) -> Result<usize> {
    doc.parent(layer)
        .and_then(|container| doc.child_index(container))
        .ok_or(AnchorError::OutsidePage)
}

/// Shrink `range` to its text and find the single text layer containing it
fn text_layer_for_range(doc: &Document, range: &DomRange) -> Result<(DomRange, NodeId)> {
    let range = TextRange::from_range(doc, range)
        .and_then(|r| r.to_range(doc))
        .map_err(|_| AnchorError::NoText)?;

    match (
        text_layer_of(doc, range.start.node),
        text_layer_of(doc, range.end.node),
    ) {
        (Some(start), Some(end)) if start == end => Ok((range, start)),
        (Some(_), Some(_)) => Err(AnchorError::CrossBoundarySpan),
        _ => Err(AnchorError::OutsidePage),
    }
}

/// Position hint for a quote search on `page_index`, in stripped page text.
///
/// Pages before the expected one prefer matches near their end and pages
/// after it matches near their start.
fn hint_for_page(
    text: &str,
    stripped: &str,
    page_index: usize,
    expected_page: usize,
    offset: usize,
    options: TranslateOptions,
) -> usize {
    match page_index.cmp(&expected_page) {
        Ordering::Less => stripped.chars().count(),
        Ordering::Equal => {
            translate_offsets(text, stripped, offset, offset, is_not_space, options).0
        }
        Ordering::Greater => 0,
    }
}

/// Whether a match is good enough to stop searching further pages: the quote
/// matched exactly, and so did the prefix or suffix if either is known.
fn is_decisive(
    text: &str,
    quote: &str,
    prefix: Option<&str>,
    suffix: Option<&str>,
    found: &Match,
) -> bool {
    if char_slice(text, found.start, found.end) != quote {
        return false;
    }
    let prefix_matches = prefix.is_some_and(|prefix| {
        let len = prefix.chars().count();
        found.start >= len && char_slice(text, found.start - len, found.start) == prefix
    });
    let suffix_matches = suffix.is_some_and(|suffix| {
        let len = suffix.chars().count();
        char_slice(text, found.end, found.end + len) == suffix
    });
    let has_context = prefix.is_some() || suffix.is_some();
    prefix_matches || suffix_matches || !has_context
}

/// Anchors and describes annotations in a paginated document
pub struct PdfAnchorer<S> {
    source: S,
    session: AnchoringSession,
    config: AnchorConfig,
}

impl<S: PageSource> PdfAnchorer<S> {
    pub fn new(source: S, config: AnchorConfig) -> Self {
        let session = AnchoringSession::with_capacity(config.quote_cache_capacity);
        Self {
            source,
            session,
            config,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn session(&self) -> &AnchoringSession {
        &self.session
    }

    pub fn config(&self) -> &AnchorConfig {
        &self.config
    }

    /// Forget cached page text and quote positions
    pub fn purge_cache(&self) {
        self.session.purge();
    }

    fn translate_options(&self) -> TranslateOptions {
        TranslateOptions {
            normalize: self.config.normalize_unicode,
        }
    }

    async fn page_text(&self, page_index: usize) -> Result<String> {
        if page_index >= self.source.page_count() {
            return Err(AnchorError::InvalidPage(page_index));
        }
        self.session.page_text(&self.source, page_index).await
    }

    /// Whether any page has non-whitespace text. Scanned PDFs without OCR
    /// have none and cannot be annotated.
    pub async fn document_has_text(&self) -> bool {
        for page_index in 0..self.source.page_count() {
            match self.page_text(page_index).await {
                Ok(text) if !text.trim().is_empty() => return true,
                Ok(_) => {}
                Err(err) => warn!("Failed to get text of page {}: {}", page_index, err),
            }
        }
        false
    }

    /// Offset of the start of a page in the document text
    pub async fn page_offset(&self, page_index: usize) -> Result<usize> {
        if page_index >= self.source.page_count() {
            return Err(AnchorError::InvalidPage(page_index));
        }
        let mut offset = 0;
        for index in 0..page_index {
            offset += self.page_text(index).await?.chars().count();
        }
        Ok(offset)
    }

    /// Page containing `offset`.
    ///
    /// An offset at the end of a page belongs to that page. Offsets past the
    /// end of the document map to the last page.
    pub async fn find_page_by_offset(&self, offset: usize) -> Result<PageOffset> {
        let page_count = self.source.page_count();
        if page_count == 0 {
            return Err(AnchorError::InvalidPage(0));
        }

        let mut page_start = 0;
        let mut page_end = 0;
        let mut text = String::new();
        for index in 0..page_count {
            text = self.page_text(index).await?;
            page_start = page_end;
            page_end += text.chars().count();
            if page_end >= offset {
                return Ok(PageOffset {
                    index,
                    offset: page_start,
                    text,
                });
            }
        }

        Ok(PageOffset {
            index: page_count - 1,
            offset: page_start,
            text,
        })
    }

    /// Anchor `start..end` of a page's extracted text to its text layer, or
    /// to a placeholder if the page is not rendered.
    async fn anchor_by_position(
        &self,
        page_index: usize,
        start: usize,
        end: usize,
    ) -> Result<Anchor> {
        let page_text = self.page_text(page_index).await?;
        let document = self.source.document();
        let layer = match self.source.page_view(page_index) {
            PageView::Rendered { layer } => layer,
            PageView::Pending => return Ok(Anchor::Placeholder(Placeholder { page_index })),
        };

        // The text layer and the extracted text differ in whitespace, so
        // offsets are translated by counting non-space characters.
        let layer_text = document.text(layer);
        let (layer_start, layer_end) = translate_offsets(
            &page_text,
            &layer_text,
            start,
            end,
            is_not_space,
            self.translate_options(),
        );

        let layer_slice = char_slice(&layer_text, layer_start, layer_end);
        let page_slice = char_slice(&page_text, start, end);
        if strip_spaces(layer_slice) != strip_spaces(page_slice) {
            self.session.report_text_mismatch(page_index);
        } else if layer_slice != page_slice {
            warn!(
                "Text layer of page {} differs from page text in whitespace only",
                page_index
            );
        }

        let range = TextRange::new(
            TextPosition::new(layer, layer_start),
            TextPosition::new(layer, layer_end),
        )
        .to_range(document.as_ref())?;
        Ok(Anchor::Range { page_index, range })
    }

    async fn anchor_by_position_selector(
        &self,
        quote: &TextQuoteSelector,
        position: &TextPositionSelector,
    ) -> Result<Anchor> {
        let start = usize::try_from(position.start).ok();
        let end = usize::try_from(position.end).ok();
        let page = self.find_page_by_offset(start.unwrap_or(0)).await?;
        let len = page.text.chars().count();

        let local = start
            .zip(end)
            .and_then(|(start, end)| {
                Some((
                    start.checked_sub(page.offset)?,
                    end.checked_sub(page.offset)?,
                ))
            })
            .filter(|&(start, end)| start <= end && end <= len)
            .ok_or(AnchorError::OffsetOutOfRange {
                start: position.start,
                end: position.end,
                len,
            })?;

        let found = char_slice(&page.text, local.0, local.1);
        if found != quote.exact {
            return Err(AnchorError::QuoteMismatch {
                expected: quote.exact.clone(),
                found: found.to_string(),
            });
        }
        self.anchor_by_position(page.index, local.0, local.1).await
    }

    /// Search all pages for the quote. `position` is the annotation's
    /// expected document offset, used to order pages and score matches.
    async fn anchor_quote(
        &self,
        quote: &TextQuoteSelector,
        position: Option<i64>,
    ) -> Result<Anchor> {
        let hint = position.and_then(|p| usize::try_from(p).ok());
        let mut pages: Vec<usize> = (0..self.source.page_count()).collect();

        let mut expected = None;
        if let Some(hint) = hint {
            match self.find_page_by_offset(hint).await {
                Ok(page) => {
                    pages.sort_by_key(|&p| p.abs_diff(page.index));
                    expected = Some((page.index, hint.saturating_sub(page.offset)));
                }
                Err(err) => debug!("Ignoring position hint {}: {}", hint, err),
            }
        }

        // Matching is done on text with all whitespace removed.
        let prefix = quote
            .prefix
            .as_deref()
            .map(strip_spaces)
            .filter(|p| !p.is_empty());
        let suffix = quote
            .suffix
            .as_deref()
            .map(strip_spaces)
            .filter(|s| !s.is_empty());
        let exact = strip_spaces(&quote.exact);
        let options = self.translate_options();

        let mut best: Option<(PageMatch, f64)> = None;
        for page_index in pages {
            let text = match self.page_text(page_index).await {
                Ok(text) => text,
                Err(err) => {
                    warn!("Skipping page {} in quote search: {}", page_index, err);
                    continue;
                }
            };
            let stripped = strip_spaces(&text);

            let page_hint = expected.map(|(expected_page, offset)| {
                hint_for_page(&text, &stripped, page_index, expected_page, offset, options)
            });

            let context =
                QuoteContext::new(prefix.as_deref(), suffix.as_deref()).with_hint(page_hint);
            let max_errors = self.config.max_errors_cap;
            let Some(found) = match_quote_with(&stripped, &exact, &context, max_errors) else {
                continue;
            };
            if best.as_ref().is_some_and(|(_, score)| found.score <= *score) {
                continue;
            }

            let (start, end) = translate_offsets(
                &stripped,
                &text,
                found.start,
                found.end,
                is_not_space,
                options,
            );
            best = Some((
                PageMatch {
                    page_index,
                    start,
                    end,
                },
                found.score,
            ));

            if is_decisive(&stripped, &exact, prefix.as_deref(), suffix.as_deref(), &found) {
                break;
            }
        }

        let (found, _) = best.ok_or(AnchorError::QuoteNotFound)?;
        if let (Some(position), Some(_)) = (position, hint) {
            self.session
                .cache_quote_position(QuotePositionKey::new(&quote.exact, position), found);
        }
        self.anchor_by_position(found.page_index, found.start, found.end).await
    }

    async fn resolve_with(
        &self,
        strategy: PageStrategy,
        quote: &TextQuoteSelector,
        position: Option<&TextPositionSelector>,
    ) -> Result<Option<Anchor>> {
        match strategy {
            PageStrategy::Position => match position {
                Some(position) => self.anchor_by_position_selector(quote, position).await.map(Some),
                None => Ok(None),
            },
            PageStrategy::CachedQuote => {
                let cached = position.and_then(|p| {
                    self.session
                        .cached_quote_position(&QuotePositionKey::new(&quote.exact, p.start))
                });
                match cached {
                    Some(found) => self
                        .anchor_by_position(found.page_index, found.start, found.end)
                        .await
                        .map(Some),
                    None => Ok(None),
                }
            }
            PageStrategy::QuoteSearch => self
                .anchor_quote(quote, position.map(|p| p.start))
                .await
                .map(Some),
        }
    }

    /// Resolve the selectors of one annotation
    pub async fn anchor(&self, selectors: &[Selector]) -> Result<Anchor> {
        let quote = selectors.quote().ok_or(AnchorError::SelectorMissing)?;
        let position = selectors.position();

        let mut last_error = AnchorError::QuoteNotFound;
        for strategy in PAGE_STRATEGIES {
            match self.resolve_with(strategy, quote, position).await {
                Ok(Some(anchor)) => return Ok(anchor),
                Ok(None) => {}
                Err(err) if err.is_recoverable() => {
                    debug!("{} strategy failed, falling back: {}", strategy.name(), err);
                    last_error = err;
                }
                Err(err) => return Err(err),
            }
        }
        Err(last_error)
    }

    /// Wait up to `max_wait` for a page to render
    pub async fn wait_for_page(&self, page_index: usize, max_wait: Duration) -> Result<()> {
        tokio::time::timeout(max_wait, self.source.wait_for_render(page_index))
            .await
            .map_err(|_| AnchorError::Timeout(max_wait))?
    }

    /// Anchor, and if that yields a placeholder wait up to `max_wait` for the
    /// page to render and anchor again. If the page does not render in time
    /// the placeholder is returned.
    pub async fn anchor_with_wait(
        &self,
        selectors: &[Selector],
        max_wait: Duration,
    ) -> Result<Anchor> {
        let anchor = self.anchor(selectors).await?;
        let Anchor::Placeholder(placeholder) = anchor else {
            return Ok(anchor);
        };
        match self.wait_for_page(placeholder.page_index, max_wait).await {
            Ok(()) => self.anchor(selectors).await,
            Err(err) => {
                debug!("Page {} not rendered: {}", placeholder.page_index, err);
                Ok(anchor)
            }
        }
    }

    /// [`PdfAnchorer::anchor_with_wait`] with the configured timeout
    pub async fn anchor_rendered(&self, selectors: &[Selector]) -> Result<Anchor> {
        self.anchor_with_wait(selectors, self.config.materialize_timeout).await
    }

    /// Anchor many annotations concurrently. Results are in input order.
    pub async fn anchor_all(&self, targets: &[Vec<Selector>]) -> Vec<Result<Anchor>> {
        join_all(targets.iter().map(|selectors| self.anchor(selectors))).await
    }

    /// Whether [`PdfAnchorer::describe`] can describe `range`
    pub fn can_describe(&self, range: &DomRange) -> bool {
        text_layer_for_range(self.source.document().as_ref(), range).is_ok()
    }

    /// Selectors for a range within one page's text layer.
    ///
    /// The range should already be trimmed of surrounding whitespace.
    pub async fn describe(&self, range: &DomRange) -> Result<Vec<Selector>> {
        let document = self.source.document();
        let doc = document.as_ref();
        let (range, layer) = text_layer_for_range(doc, range)?;

        let start = TextPosition::from_point(doc, range.start.node, range.start.offset)?
            .relative_to(doc, layer)?;
        let end = TextPosition::from_point(doc, range.end.node, range.end.offset)?
            .relative_to(doc, layer)?;

        let page_index = page_index_of_layer(doc, layer)?;
        let page_offset = self.page_offset(page_index).await?;

        let position =
            TextPositionSelector::new(page_offset + start.offset, page_offset + end.offset);
        let quote = quote_from_range(doc, doc.root(), &range, self.config.context_len)?;
        let page = PageSelector {
            index: page_index,
            label: self.source.page_label(page_index),
        };
        Ok(vec![position.into(), quote.into(), page.into()])
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::anchoring::text_range::Boundary;

    /// In-memory viewer: one page container per page, each holding a text
    /// layer with a single text node.
    struct FakeViewer {
        pages: Vec<String>,
        document: Arc<Document>,
        layers: Vec<NodeId>,
        rendered: Mutex<Vec<bool>>,
        fetched: Mutex<Vec<usize>>,
        failing_page: Option<usize>,
        renders_on_wait: bool,
    }

    impl FakeViewer {
        fn new(pages: &[&str]) -> Self {
            Self::with_layers(pages, pages)
        }

        /// Extracted text `pages`, rendered text `layers`
        fn with_layers(pages: &[&str], layers: &[&str]) -> Self {
            let mut doc = Document::new("div");
            let mut layer_ids = Vec::new();
            for text in layers {
                let container = doc.add_element(doc.root(), "div");
                doc.set_attribute(container, "class", "page");
                let layer = doc.add_element(container, "div");
                doc.set_attribute(layer, "class", TEXT_LAYER_CLASS);
                let span = doc.add_element(layer, "span");
                doc.add_text(span, text);
                layer_ids.push(layer);
            }
            Self {
                pages: pages.iter().map(|p| p.to_string()).collect(),
                document: Arc::new(doc),
                layers: layer_ids,
                rendered: Mutex::new(vec![true; pages.len()]),
                fetched: Mutex::new(Vec::new()),
                failing_page: None,
                renders_on_wait: true,
            }
        }

        fn unrendered(self, page_index: usize) -> Self {
            self.rendered.lock()[page_index] = false;
            self
        }

        fn failing(mut self, page_index: usize) -> Self {
            self.failing_page = Some(page_index);
            self
        }

        fn never_renders(mut self) -> Self {
            self.renders_on_wait = false;
            self
        }

        fn text_node(&self, page_index: usize) -> NodeId {
            self.document.text_nodes(self.layers[page_index])[0]
        }

        /// Pages whose text was requested, in request order
        fn fetched(&self) -> Vec<usize> {
            self.fetched.lock().clone()
        }
    }

    #[async_trait]
    impl PageSource for FakeViewer {
        fn page_count(&self) -> usize {
            self.pages.len()
        }

        async fn page_text(&self, page_index: usize) -> Result<String> {
            self.fetched.lock().push(page_index);
            // Let concurrent requests pile up on the fetch in flight
            tokio::task::yield_now().await;
            if self.failing_page == Some(page_index) {
                return Err(AnchorError::PageText {
                    page: page_index,
                    message: "extraction failed".to_string(),
                });
            }
            Ok(self.pages[page_index].clone())
        }

        fn document(&self) -> Arc<Document> {
            self.document.clone()
        }

        fn page_view(&self, page_index: usize) -> PageView {
            if self.rendered.lock()[page_index] {
                PageView::Rendered {
                    layer: self.layers[page_index],
                }
            } else {
                PageView::Pending
            }
        }

        async fn wait_for_render(&self, page_index: usize) -> Result<()> {
            if !self.renders_on_wait {
                std::future::pending::<()>().await;
            }
            self.rendered.lock()[page_index] = true;
            Ok(())
        }
    }

    fn anchorer(viewer: FakeViewer) -> PdfAnchorer<FakeViewer> {
        PdfAnchorer::new(viewer, AnchorConfig::default())
    }

    fn quote(exact: &str) -> TextQuoteSelector {
        TextQuoteSelector::new(exact)
    }

    #[tokio::test]
    async fn test_suffix_selects_page() {
        let pdf = anchorer(FakeViewer::new(&["AAAA bird", "bird BBBB"]));
        let selectors = vec![quote("bird").with_suffix(" BBBB").into()];

        let anchor = pdf.anchor(&selectors).await.unwrap();
        let node = pdf.source().text_node(1);
        assert_eq!(
            anchor,
            Anchor::Range {
                page_index: 1,
                range: DomRange::new(Boundary::new(node, 0), Boundary::new(node, 4)),
            }
        );
    }

    #[tokio::test]
    async fn test_whitespace_tolerance() {
        let pdf = anchorer(FakeViewer::with_layers(&["helloworld"], &["hello world"]));
        let selectors = vec![quote("hello world").into()];

        let anchor = pdf.anchor(&selectors).await.unwrap();
        let document = pdf.source().document();
        let range = anchor.range().unwrap();
        assert_eq!(range.to_text(document.as_ref()).unwrap(), "hello world");
    }

    #[tokio::test]
    async fn test_position_selector() {
        let pdf = anchorer(FakeViewer::new(&["one two", "three four"]));
        let selectors = vec![
            TextPositionSelector::new(13, 17).into(),
            quote("four").into(),
        ];
        let anchor = pdf.anchor(&selectors).await.unwrap();
        let node = pdf.source().text_node(1);
        assert_eq!(anchor.page_index(), 1);
        assert_eq!(
            anchor.range(),
            Some(&DomRange::new(Boundary::new(node, 6), Boundary::new(node, 10)))
        );
    }

    #[tokio::test]
    async fn test_text_layer_mismatch_is_reported() {
        let pdf = anchorer(FakeViewer::with_layers(&["hello world"], &["hello there"]));
        let selectors = vec![
            TextPositionSelector::new(6, 11).into(),
            quote("world").into(),
        ];
        let anchor = pdf.anchor(&selectors).await.unwrap();
        assert!(!anchor.is_placeholder());
        // Already reported during anchoring
        assert!(!pdf.session().report_text_mismatch(0));
    }

    #[tokio::test]
    async fn test_missing_quote_selector() {
        let pdf = anchorer(FakeViewer::new(&["text"]));
        let selectors = vec![TextPositionSelector::new(0, 4).into()];
        assert_eq!(pdf.anchor(&selectors).await, Err(AnchorError::SelectorMissing));
    }

    #[tokio::test]
    async fn test_quote_not_found() {
        let pdf = anchorer(FakeViewer::new(&["abc def", "ghi jkl"]));
        let selectors = vec![quote("0123456789").into()];
        assert_eq!(pdf.anchor(&selectors).await, Err(AnchorError::QuoteNotFound));
    }

    #[tokio::test]
    async fn test_failed_page_is_skipped() {
        let pdf = anchorer(FakeViewer::new(&["bird one", "lost page", "bird two"]).failing(1));
        let selectors = vec![quote("two").into()];
        let anchor = pdf.anchor(&selectors).await.unwrap();
        assert_eq!(anchor.page_index(), 2);
    }

    #[tokio::test]
    async fn test_exact_context_match_stops_search() {
        let pdf = anchorer(FakeViewer::new(&["xx bird yy", "xx bird zz", "bird"]));
        let selectors = vec![quote("bird").with_prefix("xx ").into()];

        let anchor = pdf.anchor(&selectors).await.unwrap();
        assert_eq!(anchor.page_index(), 0);
        assert_eq!(pdf.source().fetched(), vec![0]);
    }

    #[tokio::test]
    async fn test_inexact_match_keeps_searching() {
        let pdf = anchorer(FakeViewer::new(&["xx bird yy", "ab bird zz", "xx bird"]));
        let selectors = vec![quote("bird").with_suffix(" zz").into()];

        let anchor = pdf.anchor(&selectors).await.unwrap();
        assert_eq!(anchor.page_index(), 1);
        assert_eq!(pdf.source().fetched(), vec![0, 1]);
    }

    #[tokio::test]
    async fn test_pages_searched_nearest_to_hint_first() {
        // Stale position on page 2: "ird " instead of "bird"
        let pdf = anchorer(FakeViewer::new(&["bird one", "middle", "bird two"]));
        let selectors = vec![
            TextPositionSelector::new(15, 19).into(),
            quote("bird").into(),
        ];

        let anchor = pdf.anchor(&selectors).await.unwrap();
        let node = pdf.source().text_node(2);
        assert_eq!(anchor.page_index(), 2);
        assert_eq!(
            anchor.range(),
            Some(&DomRange::new(Boundary::new(node, 0), Boundary::new(node, 4)))
        );
    }

    #[tokio::test]
    async fn test_page_before_hint_prefers_late_match() {
        // Hint on page 1, which has no match; page 0 is searched with a hint
        // at its end.
        let pdf = anchorer(FakeViewer::new(&["bird and bird", "0000 9999"]));
        let selectors = vec![
            TextPositionSelector::new(14, 18).into(),
            quote("bird").into(),
        ];

        let anchor = pdf.anchor(&selectors).await.unwrap();
        let node = pdf.source().text_node(0);
        assert_eq!(
            anchor,
            Anchor::Range {
                page_index: 0,
                range: DomRange::new(Boundary::new(node, 9), Boundary::new(node, 13)),
            }
        );
    }

    #[test]
    fn test_hint_for_page() {
        let options = TranslateOptions::default();
        let text = "a b c";
        let stripped = strip_spaces(text);
        assert_eq!(hint_for_page(text, &stripped, 0, 1, 2, options), 3);
        assert_eq!(hint_for_page(text, &stripped, 2, 1, 2, options), 0);
        assert_eq!(hint_for_page(text, &stripped, 1, 1, 2, options), 1);
        assert_eq!(hint_for_page(text, &stripped, 1, 1, 0, options), 0);
    }

    #[tokio::test]
    async fn test_invalid_positions_fall_back_to_quote() {
        let pdf = anchorer(FakeViewer::new(&["AAAA", "bird BBBB"]));
        for (start, end) in [(-5, 4), (6, 2), (-3, -1)] {
            let selectors = vec![
                Selector::TextPosition(TextPositionSelector { start, end }),
                quote("bird").into(),
            ];
            let anchor = pdf.anchor(&selectors).await.unwrap();
            assert_eq!(anchor.page_index(), 1);
        }
        // A negative start is no hint, so nothing is cached for it
        assert_eq!(
            pdf.session()
                .cached_quote_position(&QuotePositionKey::new("bird", -5)),
            None
        );
    }

    #[tokio::test]
    async fn test_placeholder_for_unrendered_page() {
        let pdf = anchorer(FakeViewer::new(&["AAAA", "bird BBBB"]).unrendered(1));
        let selectors = vec![quote("bird").into()];

        let anchor = pdf.anchor(&selectors).await.unwrap();
        assert_eq!(anchor, Anchor::Placeholder(Placeholder { page_index: 1 }));

        // Renders on request
        let anchor = pdf
            .anchor_with_wait(&selectors, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(anchor.page_index(), 1);
        assert!(!anchor.is_placeholder());
    }

    #[tokio::test]
    async fn test_wait_timeout_keeps_placeholder() {
        let pdf = anchorer(FakeViewer::new(&["AAAA", "bird BBBB"]).unrendered(1).never_renders());
        let selectors = vec![quote("bird").into()];
        let anchor = pdf
            .anchor_with_wait(&selectors, Duration::from_millis(20))
            .await
            .unwrap();
        assert!(anchor.is_placeholder());
        assert_eq!(
            pdf.wait_for_page(1, Duration::from_millis(5)).await,
            Err(AnchorError::Timeout(Duration::from_millis(5)))
        );
    }

    #[tokio::test]
    async fn test_quote_position_is_cached() {
        // Stored position points at page 2, but the text has moved
        let pdf = anchorer(FakeViewer::new(&["the cat sat", "on the mat", "with a hat"]));
        let selectors = vec![
            TextPositionSelector::new(22, 25).into(),
            quote("mat").with_prefix("on the ").into(),
        ];

        let anchor = pdf.anchor(&selectors).await.unwrap();
        assert_eq!(anchor.page_index(), 1);

        let key = QuotePositionKey::new("mat", 22);
        assert_eq!(
            pdf.session().cached_quote_position(&key),
            Some(PageMatch {
                page_index: 1,
                start: 7,
                end: 10
            })
        );
        assert_eq!(pdf.anchor(&selectors).await.unwrap(), anchor);

        pdf.purge_cache();
        assert_eq!(pdf.session().cached_quote_position(&key), None);
    }

    #[tokio::test]
    async fn test_page_text_fetched_once() {
        let pdf = anchorer(FakeViewer::new(&["alpha beta", "gamma delta"]));
        let targets = vec![
            vec![quote("delta").into()],
            vec![quote("gamma").into()],
            vec![quote("alpha").into()],
        ];

        let results = pdf.anchor_all(&targets).await;
        let pages: Vec<usize> = results.iter().map(|r| r.as_ref().unwrap().page_index()).collect();
        assert_eq!(pages, vec![1, 1, 0]);
        let mut fetched = pdf.source().fetched();
        fetched.sort_unstable();
        assert_eq!(fetched, vec![0, 1]);
        assert_eq!(pdf.session().cached_pages(), 2);
    }

    #[tokio::test]
    async fn test_page_offsets() {
        let pdf = anchorer(FakeViewer::new(&["abc", "defg", "hi"]));
        assert_eq!(pdf.page_offset(0).await, Ok(0));
        assert_eq!(pdf.page_offset(2).await, Ok(7));
        assert_eq!(pdf.page_offset(3).await, Err(AnchorError::InvalidPage(3)));

        let page = pdf.find_page_by_offset(3).await.unwrap();
        assert_eq!((page.index, page.offset), (0, 0));
        let page = pdf.find_page_by_offset(4).await.unwrap();
        assert_eq!((page.index, page.offset, page.text.as_str()), (1, 3, "defg"));
        let page = pdf.find_page_by_offset(100).await.unwrap();
        assert_eq!((page.index, page.offset), (2, 7));
    }

    #[tokio::test]
    async fn test_document_has_text() {
        assert!(anchorer(FakeViewer::new(&[" ", "x"])).document_has_text().await);
        assert!(!anchorer(FakeViewer::new(&[" ", "\n"])).document_has_text().await);
    }

    #[tokio::test]
    async fn test_describe_round_trip() {
        let pdf = anchorer(FakeViewer::new(&["AAAA bird", "bird BBBB"]));
        let node = pdf.source().text_node(1);
        let range = DomRange::new(Boundary::new(node, 5), Boundary::new(node, 9));

        assert!(pdf.can_describe(&range));
        let selectors = pdf.describe(&range).await.unwrap();
        assert_eq!(selectors.position(), Some(&TextPositionSelector::new(14, 18)));
        assert_eq!(selectors.quote().unwrap().exact, "BBBB");
        assert_eq!(
            selectors.page(),
            Some(&PageSelector {
                index: 1,
                label: "2".to_string()
            })
        );

        let anchor = pdf.anchor(&selectors).await.unwrap();
        assert_eq!(anchor.range(), Some(&range));
    }

    #[tokio::test]
    async fn test_describe_rejects_cross_page_span() {
        let pdf = anchorer(FakeViewer::new(&["AAAA bird", "bird BBBB"]));
        let range = DomRange::new(
            Boundary::new(pdf.source().text_node(0), 5),
            Boundary::new(pdf.source().text_node(1), 4),
        );
        assert!(!pdf.can_describe(&range));
        assert_eq!(pdf.describe(&range).await, Err(AnchorError::CrossBoundarySpan));
    }

    #[test]
    fn test_range_outside_text_layer() {
        let mut doc = Document::new("div");
        let toolbar = doc.add_element(doc.root(), "div");
        let label = doc.add_text(toolbar, "Menu");
        let range = DomRange::new(Boundary::new(label, 0), Boundary::new(label, 4));
        assert_eq!(
            text_layer_for_range(&doc, &range),
            Err(AnchorError::OutsidePage)
        );
    }
}
