//! XPath 1.0 queries over XML, HTML and JSON documents.
//!
//! Documents parse into an immutable in-memory tree behind a [`Cursor`];
//! expressions compile once with [`build_expr`] and evaluate with [`exec`]
//! into one of the four XPath value kinds. JSON documents are exposed as
//! `#obj`/`#arr` element trees so one query language covers all three
//! shapes.
//!
//! ```
//! use treepath::{exec, must_build_expr, read_xml, ContextSettings, XmlOptions};
//!
//! let xml = "<root><a>This is an XML node.</a></root>";
//! let cursor = read_xml(xml.as_bytes(), XmlOptions::default()).unwrap();
//! let expr = must_build_expr("/root/a");
//! let result = exec(&cursor, &expr, &ContextSettings::new()).unwrap();
//! assert_eq!(result.string(), "This is an XML node.");
//! ```
//!
//! Namespaces, variables and extension functions bind through
//! [`ContextSettings`]:
//!
//! ```
//! use treepath::{exec, must_build_expr, read_xml, ContextSettings, XmlOptions};
//!
//! let xml = r#"<root xmlns="http://some.namespace.com"><a>hi</a></root>"#;
//! let cursor = read_xml(xml.as_bytes(), XmlOptions::default()).unwrap();
//! let expr = must_build_expr("/ns:root/ns:a");
//! let settings = ContextSettings::new().with_namespace("ns", "http://some.namespace.com");
//! assert_eq!(exec(&cursor, &expr, &settings).unwrap().string(), "hi");
//! ```

mod axis;
mod error;
mod evaluator;
mod functions;
pub mod grammar;
mod node;
pub mod parser;
mod runtime;
mod store;
mod unmarshal;
mod value;

use std::io::BufRead;

pub use error::Error;
pub use evaluator::{exec, exec_as_bool, exec_as_nodeset, exec_as_number, exec_as_string};
pub use grammar::{build_expr, must_build_expr, Grammar};
pub use node::{Node, NodeKind, QName, XML_NAMESPACE};
pub use parser::{EntityMap, Event, HtmlParser, JsonParser, PullParser, XmlOptions, XmlParser};
pub use runtime::{CallCtx, ContextSettings, Function};
pub use store::{build_tree, get_attribute, Cursor};
pub use unmarshal::unmarshal;
pub use value::{get_cursor_string, NodeSet, Value};

/// Parse an XML document into a cursor on its root.
pub fn read_xml(reader: impl BufRead, opts: XmlOptions) -> Result<Cursor, Error> {
    build_tree(XmlParser::new(reader, opts))
}

/// Parse an HTML document, tolerantly, into a cursor on its root.
pub fn read_html(reader: impl BufRead) -> Result<Cursor, Error> {
    build_tree(HtmlParser::new(reader))
}

/// Parse a JSON document into a cursor on its root; see [`parser::JsonParser`]
/// for the tree mapping.
pub fn read_json(reader: impl BufRead) -> Result<Cursor, Error> {
    build_tree(JsonParser::new(reader)?)
}
