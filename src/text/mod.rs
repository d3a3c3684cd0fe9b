//! Text matching primitives
//!
//! - [`match_quote`]: best approximate occurrence of a quote with context
//! - [`translate_offsets`]: map offsets between two renditions of a text
//! - [`search`]: bounded edit-distance substring search behind the matcher

mod approx;
mod match_quote;
mod normalize;

pub use approx::{exact_matches, search, StringMatch};
pub use match_quote::{match_quote, match_quote_with, text_match_score, Match, QuoteContext};
pub use normalize::{
    char_slice, is_not_space, is_space, strip_spaces, translate_offsets, TranslateOptions,
};
