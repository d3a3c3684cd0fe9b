//! Arena-backed document tree
//!
//! Nodes live in a single `Vec` and refer to each other by [`NodeId`].
//! Trees are built either programmatically or by loading XHTML/XML.

use super::{NodeId, NodeKind, TextTree};
use crate::error::Result;

#[derive(Debug, Clone)]
enum NodeData {
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
    Other,
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// An owned document tree
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    /// Create a document containing only a root element
    pub fn new(root_tag: &str) -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Element {
                    tag: root_tag.to_string(),
                    attributes: Vec::new(),
                },
            }],
        }
    }

    /// Load a document from XML/XHTML source.
    ///
    /// Element names are stored without their namespace prefix. Comments and
    /// processing instructions are kept as nodes that carry no text.
    pub fn parse_xml(source: &str) -> Result<Self> {
        let xml = roxmltree::Document::parse(source)?;
        let root = xml.root_element();

        let mut doc = Self::new(root.tag_name().name());
        for attr in root.attributes() {
            doc.set_attribute(doc.root(), attr.name(), attr.value());
        }

        let mut stack: Vec<(roxmltree::Node<'_, '_>, NodeId)> = root
            .children()
            .rev()
            .map(|child| (child, doc.root()))
            .collect();

        // Children are pushed in reverse so that they are appended in order.
        while let Some((node, parent)) = stack.pop() {
            let id = if node.is_element() {
                let id = doc.add_element(parent, node.tag_name().name());
                for attr in node.attributes() {
                    doc.set_attribute(id, attr.name(), attr.value());
                }
                id
            } else if node.is_text() {
                doc.add_text(parent, node.text().unwrap_or_default())
            } else {
                doc.push(Some(parent), NodeData::Other)
            };
            stack.extend(node.children().rev().map(|child| (child, id)));
        }

        Ok(doc)
    }

    /// Append an element to `parent`
    pub fn add_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        self.push(
            Some(parent),
            NodeData::Element {
                tag: tag.to_string(),
                attributes: Vec::new(),
            },
        )
    }

    /// Append a text node to `parent`
    pub fn add_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.push(Some(parent), NodeData::Text(text.to_string()))
    }

    /// Set an attribute on an element. No-op for other nodes.
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let NodeData::Element { attributes, .. } = &mut self.nodes[node.0].data {
            match attributes.iter_mut().find(|(n, _)| n == name) {
                Some((_, v)) => *v = value.to_string(),
                None => attributes.push((name.to_string(), value.to_string())),
            }
        }
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[node.0].data {
            NodeData::Element { attributes, .. } => attributes
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    /// Whether the element's `class` attribute lists `class`
    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attribute(node, "class")
            .map(|value| value.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    fn push(&mut self, parent: Option<NodeId>, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            data,
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        id
    }
}

impl TextTree for Document {
    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    fn kind(&self, node: NodeId) -> NodeKind<'_> {
        match &self.nodes[node.0].data {
            NodeData::Element { tag, .. } => NodeKind::Element(tag),
            NodeData::Text(text) => NodeKind::Text(text),
            NodeData::Other => NodeKind::Other,
        }
    }
}
