//! Tolerant HTML pull adapter.
//!
//! Reuses the `quick-xml` reader with every check relaxed and layers the
//! HTML-specific tolerances on top: void elements self-close, name prefixes
//! are dropped (no namespace processing), unmatched end tags are ignored and
//! anything still open at EOF is closed. Names are lowercased.

use std::collections::VecDeque;
use std::io::BufRead;

use quick_xml::events::{BytesStart, Event as XmlEvent};
use quick_xml::Reader;
use tracing::trace;

use super::xml::{split_name, split_pi, unescape_lenient, utf8};
use super::{Event, PullParser};
use crate::error::Error;
use crate::node::QName;

/// Elements that never have content per the HTML specification.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

pub struct HtmlParser<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    open: Vec<String>,
    pending: VecDeque<Event>,
    done: bool,
}

impl<R: BufRead> HtmlParser<R> {
    pub fn new(reader: R) -> Self {
        let mut inner = Reader::from_reader(reader);
        let cfg = inner.config_mut();
        cfg.check_end_names = false;
        cfg.allow_unmatched_ends = true;
        cfg.check_comments = false;
        cfg.expand_empty_elements = false;
        cfg.trim_text(false);
        Self {
            reader: inner,
            buf: Vec::new(),
            open: Vec::new(),
            pending: VecDeque::new(),
            done: false,
        }
    }

    fn start_element(&mut self, start: &BytesStart<'_>, self_closing: bool) -> Result<Event, Error> {
        let local = local_name(utf8(start.name().as_ref())?);
        let mut attributes = Vec::new();
        for attr in start.html_attributes() {
            let attr = attr.map_err(Error::source_err)?;
            let (aprefix, alocal) = split_name(utf8(attr.key.as_ref())?);
            if aprefix.eq_ignore_ascii_case("xmlns") || alocal.eq_ignore_ascii_case("xmlns") {
                continue;
            }
            let value = unescape_lenient(utf8(&attr.value)?);
            attributes.push((QName::local(alocal.to_ascii_lowercase()), value));
        }
        let void = VOID_ELEMENTS.contains(&local.as_str());
        if void || self_closing {
            self.pending.push_back(Event::EndElement);
        } else {
            self.open.push(local.clone());
        }
        trace!(element = %local, "html start element");
        Ok(Event::StartElement {
            name: QName::local(local),
            namespaces: Vec::new(),
            attributes,
        })
    }

    /// Close up to and including the innermost open element named `local`;
    /// an end tag with no matching start is dropped.
    fn end_element(&mut self, local: &str) {
        if let Some(at) = self.open.iter().rposition(|n| n == local) {
            for _ in at..self.open.len() {
                self.open.pop();
                self.pending.push_back(Event::EndElement);
            }
        }
    }
}

impl<R: BufRead> PullParser for HtmlParser<R> {
    fn pull(&mut self) -> Result<Option<Event>, Error> {
        loop {
            if let Some(ev) = self.pending.pop_front() {
                return Ok(Some(ev));
            }
            if self.done {
                return Ok(None);
            }
            self.buf.clear();
            let ev = match self.reader.read_event_into(&mut self.buf) {
                Ok(ev) => ev,
                Err(e) => return Err(Error::source_err(e)),
            };
            match ev {
                XmlEvent::Start(start) => {
                    let start = start.into_owned();
                    return self.start_element(&start, false).map(Some);
                }
                XmlEvent::Empty(start) => {
                    let start = start.into_owned();
                    return self.start_element(&start, true).map(Some);
                }
                XmlEvent::End(end) => {
                    let local = local_name(utf8(end.name().as_ref())?);
                    self.end_element(&local);
                }
                XmlEvent::Text(t) => {
                    return Ok(Some(Event::Text(unescape_lenient(utf8(t.as_ref())?))));
                }
                XmlEvent::CData(c) => return Ok(Some(Event::Text(utf8(c.as_ref())?.to_string()))),
                XmlEvent::Comment(c) => {
                    return Ok(Some(Event::Comment(utf8(c.as_ref())?.to_string())));
                }
                XmlEvent::PI(pi) => {
                    let (target, value) = split_pi(utf8(pi.as_ref())?);
                    return Ok(Some(Event::ProcInst { target, value }));
                }
                XmlEvent::Decl(_) | XmlEvent::DocType(_) => {}
                XmlEvent::Eof => {
                    self.done = true;
                    for _ in 0..self.open.len() {
                        self.pending.push_back(Event::EndElement);
                    }
                    self.open.clear();
                }
            }
        }
    }
}

/// Lowercased local part with any prefix dropped: `svg:svg` becomes `svg`.
fn local_name(name: &str) -> String {
    split_name(name).1.to_ascii_lowercase()
}
