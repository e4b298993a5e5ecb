//! Serialize matched nodes back to XML for `-m` output.
//!
//! Elements serialize with their subtree; attribute and namespace nodes
//! have no XML form of their own, so they are written as processing
//! instructions carrying their name and value, which keeps every match
//! representable on one output line.

use anyhow::Context as _;
use quick_xml::events::{BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::Writer;
use treepath::{Cursor, Node};

pub fn node_to_xml(cursor: &Cursor) -> anyhow::Result<String> {
    let mut writer = Writer::new(Vec::new());
    write_node(&mut writer, cursor)?;
    String::from_utf8(writer.into_inner()).context("serialized XML is not UTF-8")
}

fn write_node(writer: &mut Writer<Vec<u8>>, cursor: &Cursor) -> anyhow::Result<()> {
    match cursor.node() {
        Node::Root => {
            for child in cursor.children() {
                write_node(writer, &child)?;
            }
        }
        Node::Element { name } => {
            let mut start = BytesStart::new(name.local.as_str());
            for attr in cursor.attributes() {
                if let Node::Attribute { name, value } = attr.node() {
                    start.push_attribute((name.local.as_str(), value.as_str()));
                }
            }
            writer.write_event(Event::Start(start))?;
            for child in cursor.children() {
                write_node(writer, &child)?;
            }
            writer.write_event(Event::End(BytesEnd::new(name.local.as_str())))?;
        }
        Node::Text(value) => {
            writer.write_event(Event::Text(BytesText::new(value)))?;
        }
        Node::Comment(value) => {
            writer.write_event(Event::Comment(BytesText::new(value)))?;
        }
        Node::ProcInst { target, value } => {
            writer.write_event(Event::PI(BytesPI::new(format!("{target} {value}"))))?;
        }
        Node::Attribute { name, value } => {
            writer.write_event(Event::PI(BytesPI::new(format!(
                "attribute:{name} {value}"
            ))))?;
        }
        Node::Namespace { prefix, uri } => {
            writer.write_event(Event::PI(BytesPI::new(format!(
                "namespace:{prefix} {uri}"
            ))))?;
        }
    }
    Ok(())
}
