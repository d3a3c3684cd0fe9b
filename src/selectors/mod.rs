//! Persisted selector shapes

mod types;

pub use types::{
    PageSelector, RangeSelector, Selector, SelectorSet, TextPositionSelector, TextQuoteSelector,
};
