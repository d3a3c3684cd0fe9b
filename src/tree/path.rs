//! Structural paths
//!
//! Elements are addressed by the sequence of `(tag, index)` steps leading to
//! them from a root, where `index` is the 1-based position among siblings
//! with the same tag.
//!
//! Grammar:
//! ```text
//! path  = step*
//! step  = "/" name ["[" number "]"]
//! name  = (alnum | "-" | "_" | "." | ":")+
//! ```
//!
//! An empty path refers to the root itself.

use std::fmt;

use thiserror::Error;

use super::{NodeId, TextTree};
use crate::error::{AnchorError, Result};

/// Path parsing errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathParseError {
    #[error("Expected '/' at position {0}")]
    ExpectedSlash(usize),

    #[error("Expected tag name at position {0}")]
    ExpectedName(usize),

    #[error("Expected number at position {0}")]
    ExpectedNumber(usize),

    #[error("Index must be at least 1 at position {0}")]
    ZeroIndex(usize),

    #[error("Unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),
}

/// One step of a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    /// Lowercase tag name
    pub tag: String,
    /// 1-based index among same-tag siblings
    pub index: usize,
}

/// A parsed structural path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XPath {
    pub steps: Vec<PathStep>,
}

impl XPath {
    pub fn new(steps: Vec<PathStep>) -> Self {
        Self { steps }
    }

    /// Parse a path string
    pub fn parse(input: &str) -> std::result::Result<Self, PathParseError> {
        let mut parser = Parser::new(input.trim());
        let mut steps = Vec::new();

        // A lone "/" is the root, like the empty path
        if parser.remaining() == "/" {
            return Ok(Self::default());
        }

        while !parser.at_end() {
            steps.push(parser.parse_step()?);
        }

        Ok(Self { steps })
    }

    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Display for XPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            write!(f, "/{}[{}]", step.tag, step.index)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for XPath {
    type Err = PathParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_if(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn remaining(&self) -> &str {
        &self.input[self.pos..]
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if pred(ch) {
                self.advance();
            } else {
                break;
            }
        }
        &self.input[start..self.pos]
    }

    fn parse_step(&mut self) -> std::result::Result<PathStep, PathParseError> {
        if !self.skip_if('/') {
            return Err(PathParseError::ExpectedSlash(self.pos));
        }

        let name_start = self.pos;
        let name = self.take_while(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'));
        if name.is_empty() {
            return Err(PathParseError::ExpectedName(name_start));
        }

        let index = if self.skip_if('[') {
            let number_start = self.pos;
            let digits = self.take_while(|c| c.is_ascii_digit());
            let index: usize = digits
                .parse()
                .map_err(|_| PathParseError::ExpectedNumber(number_start))?;
            if index == 0 {
                return Err(PathParseError::ZeroIndex(number_start));
            }
            if !self.skip_if(']') {
                return Err(PathParseError::UnexpectedChar(
                    self.peek().unwrap_or('\0'),
                    self.pos,
                ));
            }
            index
        } else {
            1
        };

        match self.peek() {
            None | Some('/') => Ok(PathStep {
                tag: name.to_lowercase(),
                index,
            }),
            Some(ch) => Err(PathParseError::UnexpectedChar(ch, self.pos)),
        }
    }
}

/// Resolve `path` relative to `root`.
///
/// Tag names match case-insensitively. Fails with
/// [`AnchorError::StructuralPathUnresolved`] if any step has no matching child.
pub fn node_from_xpath<T: TextTree + ?Sized>(
    tree: &T,
    root: NodeId,
    path: &XPath,
) -> Result<NodeId> {
    let mut element = root;
    for step in &path.steps {
        let mut seen = 0;
        let found = tree.children(element).iter().copied().find(|&child| {
            let matches = tree
                .tag_name(child)
                .map(|tag| tag.eq_ignore_ascii_case(&step.tag))
                .unwrap_or(false);
            if matches {
                seen += 1;
            }
            matches && seen == step.index
        });
        element = found.ok_or_else(|| AnchorError::StructuralPathUnresolved(path.to_string()))?;
    }
    Ok(element)
}

/// Build the path of `node` relative to `root`.
///
/// `node` must be an element at or below `root`.
pub fn xpath_from_node<T: TextTree + ?Sized>(
    tree: &T,
    node: NodeId,
    root: NodeId,
) -> Result<XPath> {
    let mut steps = Vec::new();
    let mut element = node;
    while element != root {
        let tag = tree.tag_name(element).ok_or_else(|| {
            AnchorError::InvalidPosition("path segments must be elements".to_string())
        })?;
        let index = 1 + tree
            .previous_siblings(element)
            .into_iter()
            .filter(|&s| {
                tree.tag_name(s)
                    .map(|t| t.eq_ignore_ascii_case(tag))
                    .unwrap_or(false)
            })
            .count();
        steps.push(PathStep {
            tag: tag.to_lowercase(),
            index,
        });
        element = tree.parent(element).ok_or_else(|| {
            AnchorError::InvalidPosition("node is not a descendant of root".to_string())
        })?;
    }
    steps.reverse();
    Ok(XPath { steps })
}
