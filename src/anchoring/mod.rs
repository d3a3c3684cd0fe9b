//! Resolving selectors to ranges and describing ranges as selectors
//!
//! - `html`: single documents (EPUB chapters, web pages)
//! - `pdf`: paginated documents with lazily rendered text layers
//! - `session`: caches shared by anchoring operations on one document
//! - `text_range`: text-offset based positions and conversion to tree ranges
//! - `trim`: shrinking ranges to their non-whitespace text

pub mod html;
pub mod pdf;
mod session;
mod text_range;
mod trim;

pub use session::{AnchoringSession, PageMatch, QuotePositionKey};
pub use text_range::{
    resolve_offsets, Boundary, DomRange, ResolveDirection, TextPosition, TextRange,
};
pub use trim::trim_range;
