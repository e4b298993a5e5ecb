//! The node universe of the document model.
//!
//! A document is a tree of these seven kinds. Elements and attributes are the
//! named kinds; everything except the root and the named kinds carries its
//! value directly, while the string-value of elements and the root is derived
//! by the store (see [`crate::get_cursor_string`]).

use core::fmt;

/// Namespace URI bound to the reserved `xml` prefix in every document.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// A resolved name: namespace URI (possibly empty) plus local part.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub space: String,
    pub local: String,
}

impl QName {
    pub fn new(space: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            space: space.into(),
            local: local.into(),
        }
    }

    /// A name with no namespace.
    pub fn local(local: impl Into<String>) -> Self {
        Self::new("", local)
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.space.is_empty() {
            write!(f, "{}", self.local)
        } else {
            write!(f, "{{{}}}{}", self.space, self.local)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// The unnamed document root. Exactly one per document, at position 0.
    Root,
    Element {
        name: QName,
    },
    Attribute {
        name: QName,
        value: String,
    },
    /// An in-scope namespace declaration materialized on an element.
    Namespace {
        prefix: String,
        uri: String,
    },
    Text(String),
    Comment(String),
    ProcInst {
        target: String,
        value: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Root,
    Element,
    Attribute,
    Namespace,
    Text,
    Comment,
    ProcInst,
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Root => NodeKind::Root,
            Node::Element { .. } => NodeKind::Element,
            Node::Attribute { .. } => NodeKind::Attribute,
            Node::Namespace { .. } => NodeKind::Namespace,
            Node::Text(_) => NodeKind::Text,
            Node::Comment(_) => NodeKind::Comment,
            Node::ProcInst { .. } => NodeKind::ProcInst,
        }
    }

    /// The qualified name of a named node (element or attribute).
    pub fn name(&self) -> Option<&QName> {
        match self {
            Node::Element { name } | Node::Attribute { name, .. } => Some(name),
            _ => None,
        }
    }

    /// The directly carried value, where one exists. Elements and the root
    /// derive their string-value from descendants instead.
    pub fn value(&self) -> Option<&str> {
        match self {
            Node::Attribute { value, .. } => Some(value),
            Node::Namespace { uri, .. } => Some(uri),
            Node::Text(v) | Node::Comment(v) => Some(v),
            Node::ProcInst { value, .. } => Some(value),
            Node::Root | Node::Element { .. } => None,
        }
    }
}
