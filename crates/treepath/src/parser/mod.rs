//! Source adapters: pull-parsers that feed the document store.
//!
//! Every adapter produces the same event stream. An element start event is
//! followed by the events of its content and then by exactly one
//! [`Event::EndElement`]; leaves are single events. The stream ends with
//! `Ok(None)`, at which point the store has seen a complete tree.

mod html;
mod json;
mod xml;

pub use html::HtmlParser;
pub use json::JsonParser;
pub use xml::{XmlOptions, XmlParser};

use std::collections::HashMap;

use crate::error::Error;
use crate::node::QName;

/// One step of the adapter-to-store stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    StartElement {
        name: QName,
        /// Namespace declarations carried on this element, in declaration
        /// order. Prefix `""` is the default namespace.
        namespaces: Vec<(String, String)>,
        /// Attributes in declaration order, names already resolved.
        attributes: Vec<(QName, String)>,
    },
    EndElement,
    Text(String),
    Comment(String),
    ProcInst {
        target: String,
        value: String,
    },
}

/// A pull-parser over one document. Consumed to completion by the store.
pub trait PullParser {
    fn pull(&mut self) -> Result<Option<Event>, Error>;
}

/// Entity map for the XML adapter: name → replacement text.
pub type EntityMap = HashMap<String, String>;
