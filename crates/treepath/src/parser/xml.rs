//! XML pull adapter on top of the `quick-xml` event reader.
//!
//! Namespace handling happens here: declaration attributes are consumed into
//! per-element declaration lists and element/attribute prefixes are resolved
//! against the in-scope stack. The default namespace applies to elements
//! only. An unbound prefix is carried verbatim as the namespace value, which
//! is what the node tests downstream expect for undeclared prefixes.

use std::collections::VecDeque;
use std::io::BufRead;

use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event as XmlEvent};
use quick_xml::Reader;
use tracing::trace;

use super::{EntityMap, Event, PullParser};
use crate::error::Error;
use crate::node::QName;

#[derive(Debug, Clone)]
pub struct XmlOptions {
    /// When off, mismatched end tags and unknown entities are tolerated.
    pub strict: bool,
    /// Custom entity bindings, checked after the predefined five.
    pub entities: EntityMap,
}

impl Default for XmlOptions {
    fn default() -> Self {
        Self {
            strict: true,
            entities: EntityMap::new(),
        }
    }
}

impl XmlOptions {
    pub fn lenient() -> Self {
        Self {
            strict: false,
            ..Self::default()
        }
    }
}

pub struct XmlParser<R: BufRead> {
    reader: Reader<R>,
    opts: XmlOptions,
    buf: Vec<u8>,
    /// Locally declared namespaces per open element, innermost last.
    scopes: Vec<Vec<(String, String)>>,
    pending: VecDeque<Event>,
}

impl<R: BufRead> XmlParser<R> {
    pub fn new(reader: R, opts: XmlOptions) -> Self {
        let mut inner = Reader::from_reader(reader);
        let cfg = inner.config_mut();
        cfg.check_end_names = opts.strict;
        cfg.expand_empty_elements = false;
        cfg.trim_text(false);
        Self {
            reader: inner,
            opts,
            buf: Vec::new(),
            scopes: Vec::new(),
            pending: VecDeque::new(),
        }
    }

    fn lookup(&self, prefix: &str) -> Option<&str> {
        for scope in self.scopes.iter().rev() {
            for (p, uri) in scope.iter().rev() {
                if p == prefix {
                    return Some(uri);
                }
            }
        }
        if prefix == "xml" {
            return Some(crate::node::XML_NAMESPACE);
        }
        None
    }

    fn resolve_element_name(&self, prefix: &str, local: &str) -> QName {
        let space = if prefix.is_empty() {
            self.lookup("").unwrap_or_default().to_string()
        } else {
            self.lookup(prefix).unwrap_or(prefix).to_string()
        };
        QName::new(space, local)
    }

    fn resolve_attr_name(&self, prefix: &str, local: &str) -> QName {
        let space = if prefix.is_empty() {
            String::new()
        } else {
            self.lookup(prefix).unwrap_or(prefix).to_string()
        };
        QName::new(space, local)
    }

    fn unescape(&self, raw: &str) -> Result<String, Error> {
        unescape_text(raw, Some(&self.opts.entities), self.opts.strict)
    }

    fn start_element(&mut self, start: &BytesStart<'_>, self_closing: bool) -> Result<Event, Error> {
        let start_name = start.name();
        let (prefix, local) = split_name(utf8(start_name.as_ref())?);
        let mut decls: Vec<(String, String)> = Vec::new();
        let mut attrs_raw: Vec<(String, String, String)> = Vec::new();

        for attr in start.attributes() {
            let attr = attr.map_err(Error::source_err)?;
            let (aprefix, alocal) = split_name(utf8(attr.key.as_ref())?);
            let value = self.unescape(utf8(&attr.value)?)?;
            // xmlns="u", xmlns:p="u" and the observed p:xmlns="u" spelling
            // all declare namespaces; none become attribute nodes.
            if aprefix.is_empty() && alocal == "xmlns" {
                decls.push((String::new(), value));
            } else if aprefix == "xmlns" {
                decls.push((alocal.to_string(), value));
            } else if alocal == "xmlns" {
                decls.push((aprefix.to_string(), value));
            } else {
                attrs_raw.push((aprefix.to_string(), alocal.to_string(), value));
            }
        }

        self.scopes.push(decls.clone());
        let name = self.resolve_element_name(prefix, local);
        let attributes = attrs_raw
            .iter()
            .map(|(p, l, v)| (self.resolve_attr_name(p, l), v.clone()))
            .collect();
        if self_closing {
            self.scopes.pop();
            self.pending.push_back(Event::EndElement);
        }
        trace!(element = %name, "xml start element");
        Ok(Event::StartElement {
            name,
            namespaces: decls,
            attributes,
        })
    }
}

impl<R: BufRead> PullParser for XmlParser<R> {
    fn pull(&mut self) -> Result<Option<Event>, Error> {
        if let Some(ev) = self.pending.pop_front() {
            return Ok(Some(ev));
        }
        loop {
            self.buf.clear();
            let ev = match self.reader.read_event_into(&mut self.buf) {
                Ok(ev) => ev,
                Err(e) => return Err(Error::source_err(e)),
            };
            return match ev {
                XmlEvent::Start(start) => {
                    let start = start.into_owned();
                    self.start_element(&start, false).map(Some)
                }
                XmlEvent::Empty(start) => {
                    let start = start.into_owned();
                    self.start_element(&start, true).map(Some)
                }
                XmlEvent::End(_) => {
                    self.scopes.pop();
                    Ok(Some(Event::EndElement))
                }
                XmlEvent::Text(t) => {
                    let raw = utf8(t.as_ref())?.to_string();
                    Ok(Some(Event::Text(self.unescape(&raw)?)))
                }
                XmlEvent::CData(c) => Ok(Some(Event::Text(utf8(c.as_ref())?.to_string()))),
                XmlEvent::Comment(c) => Ok(Some(Event::Comment(utf8(c.as_ref())?.to_string()))),
                XmlEvent::PI(pi) => {
                    let raw = utf8(pi.as_ref())?;
                    let (target, value) = split_pi(raw);
                    Ok(Some(Event::ProcInst { target, value }))
                }
                XmlEvent::Decl(_) | XmlEvent::DocType(_) => continue,
                XmlEvent::Eof => Ok(None),
            };
        }
    }
}

pub(super) fn utf8(bytes: &[u8]) -> Result<&str, Error> {
    std::str::from_utf8(bytes).map_err(Error::source_err)
}

/// Split `prefix:local`; no colon means no prefix.
pub(super) fn split_name(name: &str) -> (&str, &str) {
    match name.split_once(':') {
        Some((p, l)) => (p, l),
        None => ("", name),
    }
}

/// Split a processing instruction into target and data.
pub(super) fn split_pi(raw: &str) -> (String, String) {
    match raw.split_once(char::is_whitespace) {
        Some((target, rest)) => (target.to_string(), rest.trim_start().to_string()),
        None => (raw.to_string(), String::new()),
    }
}

/// Decode `raw` with the standard entity set only, keeping anything
/// unresolvable as literal text.
pub(super) fn unescape_lenient(raw: &str) -> String {
    unescape_text(raw, None, false).unwrap_or_else(|_| raw.to_string())
}

/// Expand character references and entities. Unknown entities and bare
/// ampersands are errors in strict mode and pass through literally
/// otherwise.
fn unescape_text(raw: &str, entities: Option<&EntityMap>, strict: bool) -> Result<String, Error> {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let name = after.find(';').map(|end| &after[..end]);
        let Some(name) = name.filter(|n| is_entity_name(n)) else {
            if strict {
                return Err(Error::Source("bare '&' in character data".to_string()));
            }
            out.push('&');
            rest = after;
            continue;
        };
        let resolved: Option<String> = if let Some(code) = name.strip_prefix('#') {
            decode_char_ref(code).map(String::from)
        } else {
            resolve_predefined_entity(name)
                .map(str::to_string)
                .or_else(|| entities.and_then(|m| m.get(name)).cloned())
        };
        match resolved {
            Some(s) => out.push_str(&s),
            None if strict => {
                return Err(Error::Source(format!("unknown entity '&{name};'")));
            }
            None => {
                out.push('&');
                out.push_str(name);
                out.push(';');
            }
        }
        rest = &after[name.len() + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn is_entity_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '#' | '_' | '-' | '.'))
}

fn decode_char_ref(code: &str) -> Option<char> {
    let cp = match code.strip_prefix('x').or_else(|| code.strip_prefix('X')) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => code.parse::<u32>().ok()?,
    };
    char::from_u32(cp)
}
