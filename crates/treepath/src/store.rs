//! In-memory document store.
//!
//! The tree is a flat arena of node records; a [`Cursor`] is an index into
//! that arena plus a shared handle on the document. Records are pushed in
//! document order (element, then its namespace nodes, then its attributes,
//! then its children), so the arena index doubles as the document-order
//! position and cursor comparison is integer comparison.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tracing::debug;

use crate::error::Error;
use crate::node::{Node, QName, XML_NAMESPACE};
use crate::parser::{Event, PullParser};

#[derive(Debug)]
struct NodeRecord {
    node: Node,
    parent: u32,
    children: Vec<u32>,
    attributes: Vec<u32>,
    namespaces: Vec<u32>,
}

#[derive(Debug)]
struct DocTree {
    nodes: Vec<NodeRecord>,
}

/// A stable handle on one node of one document. Cloning is cheap; the
/// document lives as long as any cursor into it.
#[derive(Debug, Clone)]
pub struct Cursor {
    doc: Arc<DocTree>,
    idx: u32,
}

impl PartialEq for Cursor {
    fn eq(&self, other: &Self) -> bool {
        self.idx == other.idx && Arc::ptr_eq(&self.doc, &other.doc)
    }
}

impl Eq for Cursor {}

impl Hash for Cursor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.doc), self.idx).hash(state);
    }
}

impl PartialOrd for Cursor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cursor {
    /// Document order. Only meaningful within one document.
    fn cmp(&self, other: &Self) -> Ordering {
        self.idx.cmp(&other.idx)
    }
}

impl Cursor {
    fn at(&self, idx: u32) -> Cursor {
        Cursor {
            doc: self.doc.clone(),
            idx,
        }
    }

    fn record(&self) -> &NodeRecord {
        &self.doc.nodes[self.idx as usize]
    }

    /// Document-order position; unique per document.
    pub fn pos(&self) -> usize {
        self.idx as usize
    }

    pub fn node(&self) -> &Node {
        &self.record().node
    }

    /// The parent cursor. The root is its own parent (sentinel).
    pub fn parent(&self) -> Cursor {
        self.at(self.record().parent)
    }

    pub fn is_root(&self) -> bool {
        self.record().parent == self.idx
    }

    pub fn children(&self) -> Vec<Cursor> {
        self.record().children.iter().map(|&i| self.at(i)).collect()
    }

    pub fn attributes(&self) -> Vec<Cursor> {
        self.record()
            .attributes
            .iter()
            .map(|&i| self.at(i))
            .collect()
    }

    pub fn namespaces(&self) -> Vec<Cursor> {
        self.record()
            .namespaces
            .iter()
            .map(|&i| self.at(i))
            .collect()
    }

    /// Look up an owned attribute by resolved name.
    pub fn attribute(&self, space: &str, local: &str) -> Option<Cursor> {
        self.attributes().into_iter().find(|a| {
            matches!(a.node(), Node::Attribute { name, .. }
                if name.space == space && name.local == local)
        })
    }
}

/// Consume a pull-parser to completion and return a cursor on the document
/// root. Propagates any adapter error; otherwise infallible.
pub fn build_tree(mut parser: impl PullParser) -> Result<Cursor, Error> {
    let mut nodes = vec![NodeRecord {
        node: Node::Root,
        parent: 0,
        children: Vec::new(),
        attributes: Vec::new(),
        namespaces: Vec::new(),
    }];
    // Open elements, innermost last, alongside their in-scope namespace
    // sets (prefix, uri) in materialization order.
    let mut stack: Vec<u32> = vec![0];
    let mut scopes: Vec<Vec<(String, String)>> =
        vec![vec![("xml".to_string(), XML_NAMESPACE.to_string())]];

    while let Some(event) = parser.pull()? {
        match event {
            Event::StartElement {
                name,
                namespaces,
                attributes,
            } => {
                let parent = *stack.last().expect("stack is never empty");
                let el = push_node(&mut nodes, Node::Element { name }, parent);
                nodes[parent as usize].children.push(el);

                let scope = effective_scope(scopes.last().expect("scope per open element"), &namespaces);
                for (prefix, uri) in &scope {
                    if uri.is_empty() {
                        continue;
                    }
                    let ns = push_node(
                        &mut nodes,
                        Node::Namespace {
                            prefix: prefix.clone(),
                            uri: uri.clone(),
                        },
                        el,
                    );
                    nodes[el as usize].namespaces.push(ns);
                }
                for (name, value) in attributes {
                    let attr = push_node(&mut nodes, Node::Attribute { name, value }, el);
                    nodes[el as usize].attributes.push(attr);
                }
                stack.push(el);
                scopes.push(scope);
            }
            Event::EndElement => {
                if stack.len() > 1 {
                    stack.pop();
                    scopes.pop();
                }
            }
            Event::Text(value) => {
                leaf(&mut nodes, &stack, Node::Text(value));
            }
            Event::Comment(value) => {
                leaf(&mut nodes, &stack, Node::Comment(value));
            }
            Event::ProcInst { target, value } => {
                leaf(&mut nodes, &stack, Node::ProcInst { target, value });
            }
        }
    }

    debug!(nodes = nodes.len(), "document tree built");
    Ok(Cursor {
        doc: Arc::new(DocTree { nodes }),
        idx: 0,
    })
}

fn push_node(nodes: &mut Vec<NodeRecord>, node: Node, parent: u32) -> u32 {
    let idx = nodes.len() as u32;
    nodes.push(NodeRecord {
        node,
        parent,
        children: Vec::new(),
        attributes: Vec::new(),
        namespaces: Vec::new(),
    });
    idx
}

fn leaf(nodes: &mut Vec<NodeRecord>, stack: &[u32], node: Node) {
    let parent = *stack.last().expect("stack is never empty");
    let idx = push_node(nodes, node, parent);
    nodes[parent as usize].children.push(idx);
}

/// The in-scope namespace set of an element: the implicit `xml` binding,
/// then its own declarations in declaration order, then inherited bindings
/// nearest-ancestor-first, skipping overridden prefixes. Entries with an
/// empty URI shadow inherited bindings without materializing a node.
fn effective_scope(
    parent_scope: &[(String, String)],
    own: &[(String, String)],
) -> Vec<(String, String)> {
    let mut scope: Vec<(String, String)> =
        vec![("xml".to_string(), XML_NAMESPACE.to_string())];
    for (prefix, uri) in own {
        if prefix == "xml" {
            continue;
        }
        scope.push((prefix.clone(), uri.clone()));
    }
    for (prefix, uri) in parent_scope {
        if scope.iter().any(|(p, _)| p == prefix) {
            continue;
        }
        scope.push((prefix.clone(), uri.clone()));
    }
    scope
}

/// The resolved attribute `(space, local)` on an element cursor, if declared.
pub fn get_attribute(cursor: &Cursor, space: &str, local: &str) -> Option<(QName, String)> {
    cursor.attribute(space, local).and_then(|c| match c.node() {
        Node::Attribute { name, value } => Some((name.clone(), value.clone())),
        _ => None,
    })
}
