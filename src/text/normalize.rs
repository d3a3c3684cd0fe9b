//! Offset translation between two renditions of the same text
//!
//! Text extracted from a document by different paths (a PDF text layer vs.
//! the extraction API, a stored quote vs. the rendered DOM) tends to agree on
//! the meaningful characters and disagree on whitespace or composition.
//! [`translate_offsets`] maps a range from one rendition onto the other by
//! counting only the characters a caller-supplied filter deems important.

use unicode_normalization::char::decompose_compatible;

/// Options for [`translate_offsets`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslateOptions {
    /// Compatibility-decompose (NFKD) both strings before counting. Can be
    /// turned off when both inputs are known to share a normalization form.
    pub normalize: bool,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        Self { normalize: true }
    }
}

/// Whitespace as far as page text comparison is concerned
pub fn is_space(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\u{0B}' | '\u{0C}' | '\r' | '\u{A0}')
}

pub fn is_not_space(ch: char) -> bool {
    !is_space(ch)
}

/// Remove all [`is_space`] characters from `text`
pub fn strip_spaces(text: &str) -> String {
    text.chars().filter(|&c| is_not_space(c)).collect()
}

/// Slice of `text` between char offsets `start` and `end`, clamped to the
/// text. An inverted range yields an empty slice.
pub fn char_slice(text: &str, start: usize, end: usize) -> &str {
    let byte_offset = |n: usize| text.char_indices().nth(n).map_or(text.len(), |(i, _)| i);
    let from = byte_offset(start);
    let to = byte_offset(end).max(from);
    &text[from..to]
}

/// Characters of a string, optionally decomposed, with the original index of
/// every decomposed character.
struct Decomposed {
    chars: Vec<char>,
    /// `origin[i]` is the char index in the source of `chars[i]`
    origin: Vec<usize>,
    source_len: usize,
}

impl Decomposed {
    fn new(text: &str, normalize: bool) -> Self {
        let mut chars = Vec::new();
        let mut origin = Vec::new();
        let mut source_len = 0;
        for (index, ch) in text.chars().enumerate() {
            if normalize {
                decompose_compatible(ch, |d| {
                    chars.push(d);
                    origin.push(index);
                });
            } else {
                chars.push(ch);
                origin.push(index);
            }
            source_len += 1;
        }
        Self {
            chars,
            origin,
            source_len,
        }
    }

    /// Decomposed offset of source offset `offset`
    fn to_decomposed(&self, offset: usize) -> usize {
        self.origin.partition_point(|&o| o < offset)
    }

    /// Source offset for a decomposed start offset. A start inside the
    /// decomposition of one source char maps to that char.
    fn start_to_source(&self, offset: usize) -> usize {
        self.origin.get(offset).copied().unwrap_or(self.source_len)
    }

    /// Source offset for a decomposed end offset. An end inside the
    /// decomposition of one source char maps past that char.
    fn end_to_source(&self, offset: usize) -> usize {
        match offset.checked_sub(1).and_then(|i| self.origin.get(i)) {
            Some(&o) => o + 1,
            None => 0,
        }
    }
}

fn count_chars(chars: &[char], filter: &impl Fn(char) -> bool, start: usize, end: usize) -> usize {
    chars[start..end].iter().filter(|&&c| filter(c)).count()
}

/// Offset just past the `count`-th important char at or after `from`
fn advance(chars: &[char], mut count: usize, from: usize, filter: &impl Fn(char) -> bool) -> usize {
    let mut pos = from;
    while pos < chars.len() && count > 0 {
        if filter(chars[pos]) {
            count -= 1;
        }
        pos += 1;
    }
    pos
}

/// Translate the char range `start..end` of `input` to the equivalent range
/// of `output`.
///
/// Both strings are assumed to contain the same sequence of characters for
/// which `filter` returns true. Offsets are clamped to `input`; if `output`
/// runs out of important characters the result is clamped to its length.
/// Unimportant characters at the start of the translated range are skipped.
pub fn translate_offsets(
    input: &str,
    output: &str,
    start: usize,
    end: usize,
    filter: impl Fn(char) -> bool,
    options: TranslateOptions,
) -> (usize, usize) {
    let input = Decomposed::new(input, options.normalize);
    let output = Decomposed::new(output, options.normalize);

    let start = start.min(input.source_len);
    let end = end.clamp(start, input.source_len);

    let start_n = input.to_decomposed(start);
    let end_n = input.to_decomposed(end);

    let before_start = count_chars(&input.chars, &filter, 0, start_n);
    let start_to_end = count_chars(&input.chars, &filter, start_n, end_n);

    let mut out_start = advance(&output.chars, before_start, 0, &filter);
    while out_start < output.chars.len() && !filter(output.chars[out_start]) {
        out_start += 1;
    }
    let out_end = advance(&output.chars, start_to_end, out_start, &filter);

    let source_start = output.start_to_source(out_start);
    let source_end = output.end_to_source(out_end).max(source_start);
    if out_end == out_start {
        return (source_start, source_start);
    }
    (source_start, source_end)
}
