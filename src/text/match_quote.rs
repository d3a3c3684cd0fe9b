//! Approximate quote matching
//!
//! Locates the best occurrence of an annotation's quote in a text, scoring
//! candidates by edit distance and by how well the surrounding text agrees
//! with the stored prefix/suffix and expected position.

use super::approx::{exact_matches, search, StringMatch};
use crate::config::DEFAULT_MAX_ERRORS;

/// Similarity of matched text to the quote
const QUOTE_WEIGHT: f64 = 50.0;
/// Similarity of text before the match to `prefix`
const PREFIX_WEIGHT: f64 = 20.0;
/// Similarity of text after the match to `suffix`
const SUFFIX_WEIGHT: f64 = 20.0;
/// Proximity to the expected location. Acts as a tie-breaker.
const POSITION_WEIGHT: f64 = 2.0;

/// A scored match
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    /// Start offset of match in text
    pub start: usize,
    /// End offset of match in text
    pub end: usize,
    /// Edit distance between the quote and the matched text
    pub errors: usize,
    /// Score between 0 and 1.0, where 1.0 indicates a perfect match for the
    /// quote and context
    pub score: f64,
}

/// Context in which the quote originally appeared
#[derive(Debug, Clone, Copy, Default)]
pub struct QuoteContext<'a> {
    /// Expected text before the quote
    pub prefix: Option<&'a str>,
    /// Expected text after the quote
    pub suffix: Option<&'a str>,
    /// Expected offset of match within text
    pub hint: Option<usize>,
}

impl<'a> QuoteContext<'a> {
    pub fn new(prefix: Option<&'a str>, suffix: Option<&'a str>) -> Self {
        Self {
            prefix,
            suffix,
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: Option<usize>) -> Self {
        self.hint = hint;
        self
    }
}

/// Literal occurrences first, since they make the approximate search
/// unnecessary.
fn candidates(text: &[char], quote: &[char], max_errors: usize) -> Vec<StringMatch> {
    let exact = exact_matches(text, quote);
    if !exact.is_empty() {
        return exact;
    }
    search(text, quote, max_errors)
}

/// Compute a score between 0 and 1.0 for the similarity between `text` and
/// `pattern`.
pub fn text_match_score(text: &str, pattern: &str) -> f64 {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    chars_match_score(&text, &pattern)
}

fn chars_match_score(text: &[char], pattern: &[char]) -> f64 {
    if pattern.is_empty() || text.is_empty() {
        return 0.0;
    }
    // With a budget of `pattern.len()` errors there is always a match.
    match candidates(text, pattern, pattern.len()).first() {
        Some(best) => 1.0 - best.errors as f64 / pattern.len() as f64,
        None => 0.0,
    }
}

/// Find the best approximate match for `quote` in `text`.
///
/// Returns `None` if either string is empty or no candidate is within the
/// error budget `min(256, quote.len() / 2)`.
pub fn match_quote(text: &str, quote: &str, context: &QuoteContext<'_>) -> Option<Match> {
    match_quote_with(text, quote, context, DEFAULT_MAX_ERRORS)
}

/// [`match_quote`] with an explicit cap on the error budget.
pub fn match_quote_with(
    text: &str,
    quote: &str,
    context: &QuoteContext<'_>,
    max_errors_cap: usize,
) -> Option<Match> {
    let text: Vec<char> = text.chars().collect();
    let quote: Vec<char> = quote.chars().collect();
    if quote.is_empty() || text.is_empty() {
        return None;
    }

    // Search cost grows with `max_errors * text.len()`, so the budget trades
    // recall against the cost of the initial search.
    let max_errors = max_errors_cap.min(quote.len() / 2);
    let matches = candidates(&text, &quote, max_errors);

    // Empty context strings carry no information.
    let prefix: Option<Vec<char>> = context
        .prefix
        .filter(|p| !p.is_empty())
        .map(|p| p.chars().collect());
    let suffix: Option<Vec<char>> = context
        .suffix
        .filter(|s| !s.is_empty())
        .map(|s| s.chars().collect());

    let score_match = |m: &StringMatch| -> f64 {
        let quote_score = 1.0 - m.errors as f64 / quote.len() as f64;

        let prefix_score = match &prefix {
            Some(prefix) => {
                let from = m.start.saturating_sub(prefix.len());
                chars_match_score(&text[from..m.start], prefix)
            }
            None => 1.0,
        };
        let suffix_score = match &suffix {
            Some(suffix) => {
                let to = (m.end + suffix.len()).min(text.len());
                chars_match_score(&text[m.end..to], suffix)
            }
            None => 1.0,
        };
        let pos_score = match context.hint {
            Some(hint) => 1.0 - m.start.abs_diff(hint) as f64 / text.len() as f64,
            None => 1.0,
        };

        let raw = QUOTE_WEIGHT * quote_score
            + PREFIX_WEIGHT * prefix_score
            + SUFFIX_WEIGHT * suffix_score
            + POSITION_WEIGHT * pos_score;
        raw / (QUOTE_WEIGHT + PREFIX_WEIGHT + SUFFIX_WEIGHT + POSITION_WEIGHT)
    };

    // Highest score wins; on a tie the earliest candidate is kept.
    matches
        .iter()
        .map(|m| Match {
            start: m.start,
            end: m.end,
            errors: m.errors,
            score: score_match(m),
        })
        .fold(None, |best: Option<Match>, m| match best {
            Some(b) if b.score >= m.score => Some(b),
            _ => Some(m),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_match() {
        let m = match_quote("The quick brown fox", "quick", &QuoteContext::default()).unwrap();
        assert_eq!((m.start, m.end), (4, 9));
        assert_eq!(m.errors, 0);
        assert_eq!(m.score, 1.0);
    }

    #[test]
    fn test_empty_inputs() {
        let ctx = QuoteContext::default();
        assert!(match_quote("some text", "", &ctx).is_none());
        assert!(match_quote("", "quote", &ctx).is_none());
    }

    #[test]
    fn test_approximate_match() {
        let m = match_quote(
            "It was the best of times, it was the worst of times",
            "the worts of times",
            &QuoteContext::default(),
        )
        .unwrap();
        assert_eq!(m.start, 33);
        assert!(m.errors > 0);
        assert!(m.score < 1.0 && m.score > 0.9);
    }

    #[test]
    fn test_no_match_beyond_error_budget() {
        assert!(match_quote("abcdefgh", "zyxw", &QuoteContext::default()).is_none());
    }

    #[test]
    fn test_prefix_disambiguates() {
        let text = "one apple here, two apple there";
        let ctx = QuoteContext::new(Some("two "), None);
        let m = match_quote(text, "apple", &ctx).unwrap();
        assert_eq!(m.start, 20);

        let ctx = QuoteContext::new(Some("one "), None);
        let m = match_quote(text, "apple", &ctx).unwrap();
        assert_eq!(m.start, 4);
    }

    #[test]
    fn test_suffix_disambiguates() {
        let text = "apple pie and apple tart";
        let ctx = QuoteContext::new(None, Some(" tart"));
        let m = match_quote(text, "apple", &ctx).unwrap();
        assert_eq!(m.start, 14);
    }

    #[test]
    fn test_hint_breaks_ties() {
        let text = "foo bar foo bar foo";
        let ctx = QuoteContext::default().with_hint(Some(15));
        let m = match_quote(text, "foo", &ctx).unwrap();
        assert_eq!(m.start, 16);

        // Without a hint the first of the equally-scored candidates wins
        let m = match_quote(text, "foo", &QuoteContext::default()).unwrap();
        assert_eq!(m.start, 0);
    }

    #[test]
    fn test_text_match_score() {
        assert_eq!(text_match_score("hello", "hello"), 1.0);
        assert_eq!(text_match_score("", "hello"), 0.0);
        assert_eq!(text_match_score("hello", ""), 0.0);
        assert!((text_match_score("hallo", "hello") - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_char_offsets_for_multibyte_text() {
        let m = match_quote("naïve café au lait", "café", &QuoteContext::default()).unwrap();
        assert_eq!((m.start, m.end), (6, 10));
    }
}
