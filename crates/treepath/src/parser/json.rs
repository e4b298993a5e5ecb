//! JSON pull adapter: synthesizes an element tree so JSON documents can be
//! queried with ordinary location paths.
//!
//! Objects become `#obj` elements whose fields are child elements named by
//! the field; arrays become `#arr` elements whose entries are encoded
//! directly (scalars as bare text children, objects as `#obj`, nested arrays
//! as `#arr`); scalars become text. `null` is the text `"null"`. Object
//! fields keep their source order, so document order follows the input.

use std::collections::VecDeque;
use std::io::BufRead;

use tracing::trace;

use super::{Event, PullParser};
use crate::error::Error;
use crate::node::QName;

pub const OBJECT_NAME: &str = "#obj";
pub const ARRAY_NAME: &str = "#arr";

pub struct JsonParser {
    events: VecDeque<Event>,
}

impl JsonParser {
    pub fn new(reader: impl BufRead) -> Result<Self, Error> {
        let value: serde_json::Value = serde_json::from_reader(reader).map_err(Error::source_err)?;
        let mut events = VecDeque::new();
        encode(&value, &mut events);
        trace!(events = events.len(), "json document encoded");
        Ok(Self { events })
    }
}

impl PullParser for JsonParser {
    fn pull(&mut self) -> Result<Option<Event>, Error> {
        Ok(self.events.pop_front())
    }
}

fn encode(value: &serde_json::Value, out: &mut VecDeque<Event>) {
    use serde_json::Value as Json;
    match value {
        Json::Null => out.push_back(Event::Text("null".to_string())),
        Json::Bool(b) => out.push_back(Event::Text(if *b { "true" } else { "false" }.to_string())),
        Json::Number(n) => out.push_back(Event::Text(format_json_number(n))),
        Json::String(s) => out.push_back(Event::Text(s.clone())),
        Json::Array(entries) => {
            out.push_back(start(ARRAY_NAME));
            for entry in entries {
                encode(entry, out);
            }
            out.push_back(Event::EndElement);
        }
        Json::Object(fields) => {
            out.push_back(start(OBJECT_NAME));
            for (key, field_value) in fields {
                out.push_back(start(key));
                encode(field_value, out);
                out.push_back(Event::EndElement);
            }
            out.push_back(Event::EndElement);
        }
    }
}

fn start(local: &str) -> Event {
    Event::StartElement {
        name: QName::local(local),
        namespaces: Vec::new(),
        attributes: Vec::new(),
    }
}

fn format_json_number(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        i.to_string()
    } else if let Some(u) = n.as_u64() {
        u.to_string()
    } else {
        crate::value::format_number(n.as_f64().unwrap_or(f64::NAN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(json: &str) -> Vec<Event> {
        let mut parser = JsonParser::new(json.as_bytes()).expect("parse");
        let mut out = Vec::new();
        while let Some(ev) = parser.pull().expect("pull") {
            out.push(ev);
        }
        out
    }

    fn render(events: &[Event]) -> String {
        let mut out = String::new();
        for ev in events {
            match ev {
                Event::StartElement { name, .. } => {
                    out.push_str(&format!("<{}>", name.local));
                }
                Event::EndElement => out.push_str("</>"),
                Event::Text(t) => out.push_str(t),
                _ => {}
            }
        }
        out
    }

    #[test]
    fn scalars_in_arrays_are_bare_text() {
        let events = drain(r#"{"states": ["AK", ["MD", "FL"]]}"#);
        assert_eq!(
            render(&events),
            "<#obj><states><#arr>AK<#arr>MDFL</></></></>"
        );
    }

    #[test]
    fn nulls_and_numbers_render_canonically() {
        let events = drain(r#"{"a": null, "b": 2.71828, "c": 9001, "d": false}"#);
        assert_eq!(
            render(&events),
            "<#obj><a>null</><b>2.71828</><c>9001</><d>false</></>"
        );
    }

    #[test]
    fn field_order_is_preserved() {
        let events = drain(r#"{"z": 1, "a": 2, "m": 3}"#);
        let names: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                Event::StartElement { name, .. } => Some(name.local.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(names, ["#obj", "z", "a", "m"]);
    }
}
