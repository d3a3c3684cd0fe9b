//! Configuration for the anchoring engine

use std::env;
use std::time::Duration;

/// Number of characters of context captured on either side of a quote
pub const DEFAULT_CONTEXT_LEN: usize = 32;
/// Upper bound on the error budget of the approximate quote search
pub const DEFAULT_MAX_ERRORS: usize = 256;
/// Default capacity of the quote-position cache
pub const DEFAULT_QUOTE_CACHE_CAPACITY: usize = 1000;
/// Default time to wait for an unrendered page
pub const DEFAULT_MATERIALIZE_TIMEOUT_MS: u64 = 5000;

/// Anchoring tunables
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorConfig {
    /// Context window captured for `prefix`/`suffix`
    pub context_len: usize,
    /// Cap on `maxErrors` for the approximate search
    pub max_errors_cap: usize,
    /// Entries kept in the quote-position cache
    pub quote_cache_capacity: usize,
    /// Maximum wait for a page to render before giving up for now
    pub materialize_timeout: Duration,
    /// Decompose text (NFKD) before translating offsets
    pub normalize_unicode: bool,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            context_len: DEFAULT_CONTEXT_LEN,
            max_errors_cap: DEFAULT_MAX_ERRORS,
            quote_cache_capacity: DEFAULT_QUOTE_CACHE_CAPACITY,
            materialize_timeout: Duration::from_millis(DEFAULT_MATERIALIZE_TIMEOUT_MS),
            normalize_unicode: true,
        }
    }
}

impl AnchorConfig {
    /// Read configuration from `ANCHOR_*` environment variables.
    ///
    /// Missing or unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            context_len: parse_var("ANCHOR_CONTEXT_LEN").unwrap_or(defaults.context_len),
            max_errors_cap: parse_var("ANCHOR_MAX_ERRORS").unwrap_or(defaults.max_errors_cap),
            quote_cache_capacity: parse_var("ANCHOR_QUOTE_CACHE_CAPACITY")
                .unwrap_or(defaults.quote_cache_capacity),
            materialize_timeout: parse_var("ANCHOR_MATERIALIZE_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.materialize_timeout),
            normalize_unicode: parse_var("ANCHOR_NORMALIZE_UNICODE")
                .unwrap_or(defaults.normalize_unicode),
        }
    }

    pub fn with_context_len(mut self, context_len: usize) -> Self {
        self.context_len = context_len;
        self
    }
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    match env::var(key) {
        Ok(value) => match value.trim().parse() {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                tracing::warn!("Ignoring invalid value for {}: {:?}", key, value);
                None
            }
        },
        Err(_) => None,
    }
}
