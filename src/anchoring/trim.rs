//! Range trimming
//!
//! Shrinks a range so that it starts and ends on non-whitespace characters,
//! skipping over text nodes that hold only whitespace. Selections made by a
//! user commonly start or end in such nodes.

use super::text_range::{Boundary, DomRange};
use crate::error::{AnchorError, Result};
use crate::tree::{NodeId, TextTree};

/// Which end of a range is being trimmed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Start,
    End,
}

/// Offset of the nearest non-whitespace character to `base` in `text`,
/// looking forward from the start or backward from the end.
fn trim_text_offset(text: &[char], base: usize, edge: Edge) -> Option<usize> {
    let next = match edge {
        Edge::Start => text.get(base),
        Edge::End => base.checked_sub(1).and_then(|i| text.get(i)),
    };
    if next.is_some_and(|c| !c.is_whitespace()) {
        return Some(base);
    }

    match edge {
        Edge::Start => text
            .get(base..)?
            .iter()
            .position(|c| !c.is_whitespace())
            .map(|delta| base + delta),
        Edge::End => text
            .get(..base)?
            .iter()
            .rposition(|c| !c.is_whitespace())
            .map(|last| last + 1),
    }
}

/// Nearest deepest node containing both `a` and `b`
fn common_ancestor<T: TextTree + ?Sized>(tree: &T, a: NodeId, b: NodeId) -> NodeId {
    let mut current = a;
    loop {
        if tree.contains(current, b) {
            return current;
        }
        match tree.parent(current) {
            Some(parent) => current = parent,
            None => return current,
        }
    }
}

/// Walk the text nodes of `root` from `container` towards `boundary`
/// (exclusive of `container`, inclusive of `boundary`) and return the first
/// non-whitespace position found.
fn trim_text_container<T: TextTree + ?Sized>(
    tree: &T,
    container: NodeId,
    boundary: NodeId,
    root: NodeId,
    edge: Edge,
) -> Result<Boundary> {
    let nodes = tree.text_nodes(root);
    let index = nodes
        .iter()
        .position(|&n| n == container)
        .ok_or(AnchorError::NoText)?;

    let candidates: Box<dyn Iterator<Item = &NodeId>> = match edge {
        Edge::Start => Box::new(nodes[index + 1..].iter()),
        Edge::End => Box::new(nodes[..index].iter().rev()),
    };

    for &node in candidates {
        let text: Vec<char> = tree.data(node).chars().collect();
        let base = match edge {
            Edge::Start => 0,
            Edge::End => text.len(),
        };
        if let Some(offset) = trim_text_offset(&text, base, edge) {
            return Ok(Boundary::new(node, offset));
        }
        if node == boundary {
            break;
        }
    }
    Err(AnchorError::NoText)
}

/// Trim `range` so that both ends are adjacent to non-whitespace text.
///
/// Both ends of `range` must be in text nodes. Fails with
/// [`AnchorError::NoText`] if the range has no non-whitespace text.
pub fn trim_range<T: TextTree + ?Sized>(tree: &T, range: &DomRange) -> Result<DomRange> {
    if range.to_text(tree)?.trim().is_empty() {
        return Err(AnchorError::NoText);
    }
    if !tree.is_text(range.start.node) || !tree.is_text(range.end.node) {
        return Err(AnchorError::InvalidPosition(
            "range boundaries must be in text nodes".to_string(),
        ));
    }

    let start_text: Vec<char> = tree.data(range.start.node).chars().collect();
    let end_text: Vec<char> = tree.data(range.end.node).chars().collect();

    let mut trimmed = *range;
    let start = trim_text_offset(&start_text, range.start.offset, Edge::Start);
    // An end offset of 0 would include no text of the end node.
    let end = trim_text_offset(&end_text, range.end.offset, Edge::End).filter(|&o| o > 0);

    if let Some(offset) = start {
        trimmed.start.offset = offset;
    }
    if let Some(offset) = end {
        trimmed.end.offset = offset;
    }
    if start.is_some() && end.is_some() {
        return Ok(trimmed);
    }

    let root = common_ancestor(tree, range.start.node, range.end.node);
    if start.is_none() {
        trimmed.start =
            trim_text_container(tree, range.start.node, range.end.node, root, Edge::Start)?;
    }
    if end.is_none() {
        trimmed.end =
            trim_text_container(tree, range.end.node, range.start.node, root, Edge::End)?;
    }
    Ok(trimmed)
}
