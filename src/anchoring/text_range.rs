//! Text positions and ranges
//!
//! A [`TextPosition`] is an offset into the flattened text of an element. It
//! survives changes to the element's node structure that leave its text
//! intact, and is resolved against the current tree to a concrete
//! [`Boundary`] (text node + local offset) only when needed.

use crate::error::{AnchorError, Result};
use crate::tree::{NodeId, NodeKind, TextTree};

/// Concrete point in a tree: a node and an offset within it.
///
/// For text nodes `offset` counts characters of the node's data; for
/// elements it counts children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    pub node: NodeId,
    pub offset: usize,
}

impl Boundary {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// Concrete span of a tree between two boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomRange {
    pub start: Boundary,
    pub end: Boundary,
}

impl DomRange {
    pub fn new(start: Boundary, end: Boundary) -> Self {
        Self { start, end }
    }

    /// Text covered by the range
    pub fn to_text<T: TextTree + ?Sized>(&self, tree: &T) -> Result<String> {
        let root = tree.root();
        let start = TextPosition::from_point(tree, self.start.node, self.start.offset)?
            .relative_to(tree, root)?;
        let end = TextPosition::from_point(tree, self.end.node, self.end.offset)?
            .relative_to(tree, root)?;
        Ok(tree
            .text(root)
            .chars()
            .skip(start.offset)
            .take(end.offset.saturating_sub(start.offset))
            .collect())
    }
}

/// Direction in which to look for the nearest text node when resolving an
/// offset of 0 in an element that has no text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveDirection {
    Forwards,
    Backwards,
}

/// Combined text length of the siblings before `node`
fn previous_siblings_text_len<T: TextTree + ?Sized>(tree: &T, node: NodeId) -> usize {
    tree.previous_siblings(node)
        .into_iter()
        .map(|sibling| tree.text_len(sibling))
        .sum()
}

/// Resolve character offsets within `element` to text node boundaries.
///
/// `offsets` must be in ascending order. An offset at the boundary between
/// two text nodes resolves to the start of the later one; an offset equal to
/// the text length resolves to the end of the last text node.
pub fn resolve_offsets<T: TextTree + ?Sized>(
    tree: &T,
    element: NodeId,
    offsets: &[usize],
) -> Result<Vec<Boundary>> {
    if offsets.windows(2).any(|w| w[0] > w[1]) {
        return Err(AnchorError::InvalidPosition(
            "offsets must be in ascending order".to_string(),
        ));
    }

    let mut pending = offsets.iter().copied().peekable();
    let mut results = Vec::with_capacity(offsets.len());
    let mut length = 0;
    let mut last_node = None;

    for node in tree.text_nodes(element) {
        if pending.peek().is_none() {
            break;
        }
        let node_len = tree.data(node).chars().count();
        last_node = Some((node, node_len));
        while let Some(&offset) = pending.peek() {
            if length + node_len > offset {
                results.push(Boundary::new(node, offset - length));
                pending.next();
            } else {
                break;
            }
        }
        length += node_len;
    }

    // Offsets at the very end of the text
    if let Some((node, node_len)) = last_node {
        while pending.peek() == Some(&length) {
            results.push(Boundary::new(node, node_len));
            pending.next();
        }
    }

    match pending.next() {
        Some(offset) => Err(AnchorError::OffsetOutOfRange {
            start: offset as i64,
            end: offset as i64,
            len: length,
        }),
        None => Ok(results),
    }
}

/// Offset within the flattened text of an element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextPosition {
    /// Element that `offset` is relative to
    pub element: NodeId,
    /// Character offset from the start of the element's text
    pub offset: usize,
}

impl TextPosition {
    pub fn new(element: NodeId, offset: usize) -> Self {
        Self { element, offset }
    }

    /// Same position with the offset expressed relative to `ancestor`
    pub fn relative_to<T: TextTree + ?Sized>(&self, tree: &T, ancestor: NodeId) -> Result<Self> {
        if !tree.contains(ancestor, self.element) {
            return Err(AnchorError::InvalidPosition(
                "parent is not an ancestor of current element".to_string(),
            ));
        }

        let mut element = self.element;
        let mut offset = self.offset;
        while element != ancestor {
            offset += previous_siblings_text_len(tree, element);
            element = match tree.parent(element) {
                Some(parent) => parent,
                None => break,
            };
        }
        Ok(Self::new(element, offset))
    }

    /// Resolve to a text node and an offset within it.
    ///
    /// Fails if the offset exceeds the element's text length. If the element
    /// has no text and the offset is 0, `direction` selects the nearest text
    /// node before or after it in the whole tree.
    pub fn resolve<T: TextTree + ?Sized>(
        &self,
        tree: &T,
        direction: Option<ResolveDirection>,
    ) -> Result<Boundary> {
        let err = match resolve_offsets(tree, self.element, &[self.offset]) {
            Ok(resolved) => match resolved.into_iter().next() {
                Some(boundary) => return Ok(boundary),
                None => AnchorError::NoText,
            },
            Err(err) => err,
        };

        if self.offset != 0 {
            return Err(err);
        }
        match direction {
            Some(ResolveDirection::Forwards) => tree
                .following_text_node(self.element)
                .map(|node| Boundary::new(node, 0))
                .ok_or(err),
            Some(ResolveDirection::Backwards) => tree
                .preceding_text_node(self.element)
                .map(|node| Boundary::new(node, tree.data(node).chars().count()))
                .ok_or(err),
            None => Err(err),
        }
    }

    /// Position of a range boundary point
    pub fn from_point<T: TextTree + ?Sized>(tree: &T, node: NodeId, offset: usize) -> Result<Self> {
        match tree.kind(node) {
            NodeKind::Text(data) => {
                if offset > data.chars().count() {
                    return Err(AnchorError::InvalidPosition(
                        "text node offset is out of range".to_string(),
                    ));
                }
                let parent = tree.parent(node).ok_or_else(|| {
                    AnchorError::InvalidPosition("text node has no parent".to_string())
                })?;
                Ok(Self::new(
                    parent,
                    previous_siblings_text_len(tree, node) + offset,
                ))
            }
            NodeKind::Element(_) => {
                let children = tree.children(node);
                if offset > children.len() {
                    return Err(AnchorError::InvalidPosition(
                        "child node offset is out of range".to_string(),
                    ));
                }
                let text_offset = children[..offset]
                    .iter()
                    .map(|&child| tree.text_len(child))
                    .sum();
                Ok(Self::new(node, text_offset))
            }
            NodeKind::Other => Err(AnchorError::InvalidPosition(
                "point is not in an element or text node".to_string(),
            )),
        }
    }

    /// Position of the `offset`th character within `node`
    pub fn from_char_offset<T: TextTree + ?Sized>(
        tree: &T,
        node: NodeId,
        offset: usize,
    ) -> Result<Self> {
        match tree.kind(node) {
            NodeKind::Text(_) => Self::from_point(tree, node, offset),
            NodeKind::Element(_) => Ok(Self::new(node, offset)),
            NodeKind::Other => Err(AnchorError::InvalidPosition(
                "node is not an element or text node".to_string(),
            )),
        }
    }
}

/// Span between two [`TextPosition`]s
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRange {
    pub start: TextPosition,
    pub end: TextPosition,
}

impl TextRange {
    pub fn new(start: TextPosition, end: TextPosition) -> Self {
        Self { start, end }
    }

    /// Range with both ends relative to `element`, which must contain both
    pub fn relative_to<T: TextTree + ?Sized>(&self, tree: &T, element: NodeId) -> Result<Self> {
        Ok(Self::new(
            self.start.relative_to(tree, element)?,
            self.end.relative_to(tree, element)?,
        ))
    }

    /// Resolve to a concrete range. Both ends of the result are in text nodes,
    /// so `TextRange::from_range(r).to_range()` shrinks `r` to its text.
    pub fn to_range<T: TextTree + ?Sized>(&self, tree: &T) -> Result<DomRange> {
        if self.start.element == self.end.element && self.start.offset <= self.end.offset {
            let resolved = resolve_offsets(
                tree,
                self.start.element,
                &[self.start.offset, self.end.offset],
            )?;
            return match resolved.as_slice() {
                [start, end] => Ok(DomRange::new(*start, *end)),
                _ => Err(AnchorError::NoText),
            };
        }

        let start = self.start.resolve(tree, Some(ResolveDirection::Forwards))?;
        let end = self.end.resolve(tree, Some(ResolveDirection::Backwards))?;
        Ok(DomRange::new(start, end))
    }

    pub fn from_range<T: TextTree + ?Sized>(tree: &T, range: &DomRange) -> Result<Self> {
        Ok(Self::new(
            TextPosition::from_point(tree, range.start.node, range.start.offset)?,
            TextPosition::from_point(tree, range.end.node, range.end.offset)?,
        ))
    }

    /// The `start`th to `end`th characters of `root`
    pub fn from_offsets(root: NodeId, start: usize, end: usize) -> Self {
        Self::new(TextPosition::new(root, start), TextPosition::new(root, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Document;

    // <body><p>Hello <b>big</b> world</p><p></p><p>again</p></body>
    fn sample() -> Document {
        Document::parse_xml("<body><p>Hello <b>big</b> world</p><p></p><p>again</p></body>")
            .unwrap()
    }

    fn leaves(doc: &Document) -> Vec<NodeId> {
        doc.text_nodes(doc.root())
    }

    #[test]
    fn test_resolve_offsets_boundaries() {
        let doc = sample();
        let t = leaves(&doc);

        let resolved = resolve_offsets(&doc, doc.root(), &[0, 6, 9, 20]).unwrap();
        // Offset 6 is between "Hello " and "big": start of the later node
        assert_eq!(resolved[0], Boundary::new(t[0], 0));
        assert_eq!(resolved[1], Boundary::new(t[1], 0));
        assert_eq!(resolved[2], Boundary::new(t[2], 0));
        // Offset equal to the text length: end of the last node
        assert_eq!(resolved[3], Boundary::new(t[3], 5));
    }

    #[test]
    fn test_resolve_offsets_out_of_range() {
        let doc = sample();
        assert!(matches!(
            resolve_offsets(&doc, doc.root(), &[21]),
            Err(AnchorError::OffsetOutOfRange { len: 20, .. })
        ));
        assert!(matches!(
            resolve_offsets(&doc, doc.root(), &[4, 2]),
            Err(AnchorError::InvalidPosition(_))
        ));
    }

    #[test]
    fn test_resolve_empty_element_with_direction() {
        let doc = sample();
        let t = leaves(&doc);
        let empty = doc.children(doc.root())[1];
        let pos = TextPosition::new(empty, 0);

        assert!(pos.resolve(&doc, None).is_err());
        assert_eq!(
            pos.resolve(&doc, Some(ResolveDirection::Forwards)).unwrap(),
            Boundary::new(t[3], 0)
        );
        assert_eq!(
            pos.resolve(&doc, Some(ResolveDirection::Backwards)).unwrap(),
            Boundary::new(t[2], 6)
        );
    }

    #[test]
    fn test_from_point_and_relative_to() {
        let doc = sample();
        let t = leaves(&doc);
        let b = doc.parent(t[1]).unwrap();

        let pos = TextPosition::from_point(&doc, t[1], 2).unwrap();
        assert_eq!(pos, TextPosition::new(b, 2));
        let pos = pos.relative_to(&doc, doc.root()).unwrap();
        assert_eq!(pos.offset, 8);

        // Element point: offset counts children
        let p = doc.parent(t[0]).unwrap();
        let pos = TextPosition::from_point(&doc, p, 2).unwrap();
        assert_eq!(pos, TextPosition::new(p, 9));

        assert!(TextPosition::from_point(&doc, t[0], 7).is_err());
        assert!(TextPosition::new(doc.root(), 0).relative_to(&doc, b).is_err());
    }

    #[test]
    fn test_from_char_offset() {
        let doc = sample();
        let t = leaves(&doc);
        let p = doc.parent(t[0]).unwrap();
        assert_eq!(
            TextPosition::from_char_offset(&doc, t[2], 3).unwrap(),
            TextPosition::new(p, 12)
        );
        assert_eq!(
            TextPosition::from_char_offset(&doc, p, 4).unwrap(),
            TextPosition::new(p, 4)
        );
    }

    #[test]
    fn test_text_range_round_trip() {
        let doc = sample();
        let range = TextRange::from_offsets(doc.root(), 6, 15).to_range(&doc).unwrap();
        assert_eq!(range.to_text(&doc).unwrap(), "big world");

        let back = TextRange::from_range(&doc, &range)
            .unwrap()
            .relative_to(&doc, doc.root())
            .unwrap();
        assert_eq!((back.start.offset, back.end.offset), (6, 15));
    }

    #[test]
    fn test_to_range_across_elements() {
        let doc = sample();
        let t = leaves(&doc);
        let empty = doc.children(doc.root())[1];
        let range = TextRange::new(TextPosition::new(empty, 0), TextPosition::new(empty, 0))
            .to_range(&doc);
        // Same element but no text: fast path fails
        assert!(range.is_err());

        let p3 = doc.children(doc.root())[2];
        let range = TextRange::new(TextPosition::new(empty, 0), TextPosition::new(p3, 3))
            .to_range(&doc)
            .unwrap();
        assert_eq!(range.start, Boundary::new(t[3], 0));
        assert_eq!(range.to_text(&doc).unwrap(), "aga");
    }
}
