//! Document tree abstraction
//!
//! Anchoring only needs a narrow view of a document: an ordered set of
//! text-bearing leaves reachable from a root, their parents, and the tag
//! names of the elements in between. [`TextTree`] captures that view;
//! [`Document`] is the arena-backed implementation used for EPUB content
//! documents and PDF text layers.
//!
//! ```text
//! <div>                       element  /div[1]
//!   <p>Hello <b>world</b></p> element  /div[1]/p[1]
//!   <p>again</p>              element  /div[1]/p[2]
//! </div>
//!
//! flattened text: "Hello worldagain"
//! text leaves:     "Hello " | "world" | "again"
//! ```

mod document;
mod path;

pub use document::Document;
pub use path::{node_from_xpath, xpath_from_node, PathParseError, PathStep, XPath};

/// Index of a node within its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a node is, as far as anchoring is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind<'a> {
    /// Element with its (local) tag name
    Element(&'a str),
    /// Text node with its character data
    Text(&'a str),
    /// Comments, processing instructions. Contribute no text.
    Other,
}

/// Read-only tree interface used by the position model
pub trait TextTree {
    /// Root of the whole tree
    fn root(&self) -> NodeId;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn children(&self, node: NodeId) -> &[NodeId];

    fn kind(&self, node: NodeId) -> NodeKind<'_>;

    fn is_text(&self, node: NodeId) -> bool {
        matches!(self.kind(node), NodeKind::Text(_))
    }

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        match self.kind(node) {
            NodeKind::Element(tag) => Some(tag),
            _ => None,
        }
    }

    /// Character data of a text node, empty for other nodes
    fn data(&self, node: NodeId) -> &str {
        match self.kind(node) {
            NodeKind::Text(data) => data,
            _ => "",
        }
    }

    /// Text-bearing leaves of the subtree rooted at `node`, in document order
    fn text_nodes(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if self.is_text(current) {
                out.push(current);
            }
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Flattened text of the subtree rooted at `node`
    fn text(&self, node: NodeId) -> String {
        self.text_nodes(node)
            .into_iter()
            .map(|n| self.data(n))
            .collect()
    }

    /// Length in characters of the flattened text of `node`
    fn text_len(&self, node: NodeId) -> usize {
        self.text_nodes(node)
            .into_iter()
            .map(|n| self.data(n).chars().count())
            .sum()
    }

    /// Whether `node` is `ancestor` or one of its descendants
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// Position of `node` among its parent's children
    fn child_index(&self, node: NodeId) -> Option<usize> {
        let parent = self.parent(node)?;
        self.children(parent).iter().position(|&c| c == node)
    }

    /// Siblings before `node`, nearest first
    fn previous_siblings(&self, node: NodeId) -> Vec<NodeId> {
        match (self.parent(node), self.child_index(node)) {
            (Some(parent), Some(index)) => {
                self.children(parent)[..index].iter().rev().copied().collect()
            }
            _ => Vec::new(),
        }
    }

    /// Next node in document (pre-)order, not descending into `node`
    fn next_skipping_children(&self, node: NodeId) -> Option<NodeId> {
        let mut current = node;
        loop {
            let parent = self.parent(current)?;
            let siblings = self.children(parent);
            let index = siblings.iter().position(|&c| c == current)?;
            if let Some(&next) = siblings.get(index + 1) {
                return Some(next);
            }
            current = parent;
        }
    }

    /// Next node in document order
    fn next_in_document(&self, node: NodeId) -> Option<NodeId> {
        match self.children(node).first() {
            Some(&first) => Some(first),
            None => self.next_skipping_children(node),
        }
    }

    /// Previous node in document order
    fn previous_in_document(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|&c| c == node)?;
        if index == 0 {
            return Some(parent);
        }
        let mut current = siblings[index - 1];
        while let Some(&last) = self.children(current).last() {
            current = last;
        }
        Some(current)
    }

    /// First text node after `node` in document order
    fn following_text_node(&self, node: NodeId) -> Option<NodeId> {
        let mut current = self.next_in_document(node);
        while let Some(n) = current {
            if self.is_text(n) {
                return Some(n);
            }
            current = self.next_in_document(n);
        }
        None
    }

    /// Last text node before `node` in document order
    fn preceding_text_node(&self, node: NodeId) -> Option<NodeId> {
        let mut current = self.previous_in_document(node);
        while let Some(n) = current {
            if self.is_text(n) {
                return Some(n);
            }
            current = self.previous_in_document(n);
        }
        None
    }
}
