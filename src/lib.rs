//! Amnesia Anchor Library
//!
//! Annotation anchoring for EPUB and PDF documents. An annotation is stored
//! as a set of selectors describing the annotated text; anchoring resolves
//! them back to a range in the current document, even after the text has
//! been edited or re-rendered.
//!
//! # Modules
//!
//! - `anchoring`: Selector resolution and generation (single and paginated)
//! - `selectors`: Persisted selector shapes
//! - `text`: Fuzzy quote matching and whitespace-insensitive offset translation
//! - `tree`: Document tree abstraction and structural paths
//! - `config`: Tunables, read from the environment
//! - `error`: Unified error type

pub mod anchoring;
pub mod config;
pub mod error;
pub mod selectors;
pub mod text;
pub mod tree;

pub use anchoring::pdf::{Anchor, PageSource, PageView, PdfAnchorer, Placeholder};
pub use anchoring::{trim_range, AnchoringSession, Boundary, DomRange};
pub use config::AnchorConfig;
pub use error::{AnchorError, Result};
pub use selectors::{
    PageSelector, RangeSelector, Selector, SelectorSet, TextPositionSelector, TextQuoteSelector,
};
pub use tree::{Document, NodeId, TextTree};
