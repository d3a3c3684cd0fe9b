//! Anchoring in single (non-paginated) documents
//!
//! Selectors are tried from the most precise to the most robust:
//!
//! | Strategy   | Selector             | Validated against quote |
//! |------------|----------------------|-------------------------|
//! | `Range`    | RangeSelector        | yes                     |
//! | `Position` | TextPositionSelector | yes                     |
//! | `Quote`    | TextQuoteSelector    | n/a                     |
//!
//! The first strategy that succeeds wins. Recoverable failures move on to the
//! next strategy.

use tracing::debug;

use super::text_range::{DomRange, TextPosition, TextRange};
use crate::config::AnchorConfig;
use crate::error::{AnchorError, Result};
use crate::selectors::{
    RangeSelector, Selector, SelectorSet, TextPositionSelector, TextQuoteSelector,
};
use crate::text::{char_slice, match_quote_with, QuoteContext};
use crate::tree::{node_from_xpath, xpath_from_node, NodeId, TextTree, XPath};

/// A way of resolving an annotation's selectors to a range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Range,
    Position,
    Quote,
}

/// Strategies in the order they are attempted
pub const STRATEGIES: [Strategy; 3] = [Strategy::Range, Strategy::Position, Strategy::Quote];

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Range => "range",
            Strategy::Position => "position",
            Strategy::Quote => "quote",
        }
    }

    /// Resolve using this strategy. `Ok(None)` if the selector it needs is
    /// absent.
    fn resolve<T: TextTree + ?Sized>(
        &self,
        tree: &T,
        root: NodeId,
        selectors: &[Selector],
        quote: &TextQuoteSelector,
        config: &AnchorConfig,
    ) -> Result<Option<DomRange>> {
        let range = match self {
            Strategy::Range => match selectors.range() {
                Some(selector) => range_from_selector(tree, root, selector)?,
                None => return Ok(None),
            },
            Strategy::Position => match selectors.position() {
                Some(selector) => range_from_position(tree, root, selector)?,
                None => return Ok(None),
            },
            Strategy::Quote => {
                let hint = selectors
                    .position()
                    .and_then(|p| usize::try_from(p.start).ok());
                return range_from_quote(tree, root, quote, hint, config).map(Some);
            }
        };
        assert_quote(tree, &range, quote)?;
        Ok(Some(range))
    }
}

fn assert_quote<T: TextTree + ?Sized>(
    tree: &T,
    range: &DomRange,
    quote: &TextQuoteSelector,
) -> Result<()> {
    let found = range.to_text(tree)?;
    if found != quote.exact {
        return Err(AnchorError::QuoteMismatch {
            expected: quote.exact.clone(),
            found,
        });
    }
    Ok(())
}

fn range_from_selector<T: TextTree + ?Sized>(
    tree: &T,
    root: NodeId,
    selector: &RangeSelector,
) -> Result<DomRange> {
    let start_path = XPath::parse(&selector.start_container)?;
    let end_path = XPath::parse(&selector.end_container)?;
    let start_container = node_from_xpath(tree, root, &start_path)?;
    let end_container = node_from_xpath(tree, root, &end_path)?;

    let start = TextPosition::from_char_offset(tree, start_container, selector.start_offset)?;
    let end = TextPosition::from_char_offset(tree, end_container, selector.end_offset)?;
    TextRange::new(start, end).to_range(tree)
}

fn range_from_position<T: TextTree + ?Sized>(
    tree: &T,
    root: NodeId,
    selector: &TextPositionSelector,
) -> Result<DomRange> {
    let len = tree.text_len(root);
    let (start, end) = selector
        .checked_range(len)
        .ok_or(AnchorError::OffsetOutOfRange {
            start: selector.start,
            end: selector.end,
            len,
        })?;
    TextRange::from_offsets(root, start, end).to_range(tree)
}

fn range_from_quote<T: TextTree + ?Sized>(
    tree: &T,
    root: NodeId,
    quote: &TextQuoteSelector,
    hint: Option<usize>,
    config: &AnchorConfig,
) -> Result<DomRange> {
    let text = tree.text(root);
    let context =
        QuoteContext::new(quote.prefix.as_deref(), quote.suffix.as_deref()).with_hint(hint);
    let found = match_quote_with(&text, &quote.exact, &context, config.max_errors_cap)
        .ok_or(AnchorError::QuoteNotFound)?;
    TextRange::from_offsets(root, found.start, found.end).to_range(tree)
}

/// Resolve `selectors` to a range within `root`
pub fn anchor<T: TextTree + ?Sized>(
    tree: &T,
    root: NodeId,
    selectors: &[Selector],
) -> Result<DomRange> {
    anchor_with(tree, root, selectors, &AnchorConfig::default())
}

/// [`anchor`] with explicit configuration
pub fn anchor_with<T: TextTree + ?Sized>(
    tree: &T,
    root: NodeId,
    selectors: &[Selector],
    config: &AnchorConfig,
) -> Result<DomRange> {
    let quote = selectors.quote().ok_or(AnchorError::SelectorMissing)?;

    let mut last_error = AnchorError::QuoteNotFound;
    for strategy in STRATEGIES {
        match strategy.resolve(tree, root, selectors, quote, config) {
            Ok(Some(range)) => return Ok(range),
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

/// Quote selector for `range` with `context_len` characters of context taken
/// from the text of `root`.
pub fn quote_from_range<T: TextTree + ?Sized>(
    tree: &T,
    root: NodeId,
    range: &DomRange,
    context_len: usize,
) -> Result<TextQuoteSelector> {
    let text = tree.text(root);
    let text_range = TextRange::from_range(tree, range)?.relative_to(tree, root)?;
    let start = text_range.start.offset;
    let end = text_range.end.offset;

    Ok(TextQuoteSelector {
        exact: char_slice(&text, start, end).to_string(),
        prefix: Some(char_slice(&text, start.saturating_sub(context_len), start).to_string()),
        suffix: Some(char_slice(&text, end, end + context_len).to_string()),
    })
}

/// Position selector for `range` relative to `root`
pub fn position_from_range<T: TextTree + ?Sized>(
    tree: &T,
    root: NodeId,
    range: &DomRange,
) -> Result<TextPositionSelector> {
    let text_range = TextRange::from_range(tree, range)?.relative_to(tree, root)?;
    Ok(TextPositionSelector::new(
        text_range.start.offset,
        text_range.end.offset,
    ))
}

/// Range selector for `range` relative to `root`.
///
/// The range is first shrunk to the text it contains so that equivalent
/// selections produce the same selector.
pub fn range_selector_from_range<T: TextTree + ?Sized>(
    tree: &T,
    root: NodeId,
    range: &DomRange,
) -> Result<RangeSelector> {
    let normalized = TextRange::from_range(tree, range)?.to_range(tree)?;
    let text_range = TextRange::from_range(tree, &normalized)?;
    Ok(RangeSelector {
        start_container: xpath_from_node(tree, text_range.start.element, root)?.to_string(),
        start_offset: text_range.start.offset,
        end_container: xpath_from_node(tree, text_range.end.element, root)?.to_string(),
        end_offset: text_range.end.offset,
    })
}

/// Selectors describing `range` within `root`
pub fn describe<T: TextTree + ?Sized>(
    tree: &T,
    root: NodeId,
    range: &DomRange,
    config: &AnchorConfig,
) -> Result<Vec<Selector>> {
    let mut selectors = Vec::with_capacity(3);
    match range_selector_from_range(tree, root, range) {
        Ok(selector) => selectors.push(selector.into()),
        Err(err) => debug!("Omitting range selector: {}", err),
    }
    selectors.push(position_from_range(tree, root, range)?.into());
    selectors.push(quote_from_range(tree, root, range, config.context_len)?.into());
    Ok(selectors)
}
