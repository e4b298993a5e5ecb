//! Bind query results into user-defined types.
//!
//! Each struct field's serde name is itself an XPath expression, normally
//! supplied with `#[serde(rename = "...")]`, evaluated with the current
//! node as context:
//!
//! ```
//! use serde::Deserialize;
//! use treepath::{exec_as_nodeset, must_build_expr, read_xml, unmarshal,
//!                ContextSettings, XmlOptions};
//!
//! #[derive(Deserialize)]
//! struct Item {
//!     #[serde(rename = "@id")]
//!     id: String,
//!     #[serde(rename = "normalize-space(.)")]
//!     text: String,
//! }
//!
//! let xml = r#"<root><item id="a">first</item><item id="b">second</item></root>"#;
//! let cursor = read_xml(xml.as_bytes(), XmlOptions::default()).unwrap();
//! let nodes = exec_as_nodeset(
//!     &cursor,
//!     &must_build_expr("/root/item"),
//!     &ContextSettings::new(),
//! )
//! .unwrap();
//! let items: Vec<Item> = unmarshal(&nodes, &ContextSettings::new()).unwrap();
//! assert_eq!(items[1].id, "b");
//! assert_eq!(items[1].text, "second");
//! ```
//!
//! Sequences fan out over the matched node-set, nested structs descend into
//! the first matched node, scalars parse from the coerced string value.

use serde::de::{self, DeserializeSeed, MapAccess, SeqAccess, Visitor};

use crate::error::Error;
use crate::evaluator::exec_at;
use crate::grammar::build_expr;
use crate::runtime::ContextSettings;
use crate::store::Cursor;
use crate::value::{NodeSet, Value};

/// Bind `nodes` to `T`. Sequences bind one element per node; everything
/// else binds against the first node.
pub fn unmarshal<T: de::DeserializeOwned>(
    nodes: &NodeSet,
    settings: &ContextSettings,
) -> Result<T, Error> {
    T::deserialize(ValueDeserializer {
        value: Value::Nodes(nodes.clone()),
        settings,
    })
}

struct ValueDeserializer<'s> {
    value: Value,
    settings: &'s ContextSettings,
}

impl<'s> ValueDeserializer<'s> {
    fn parsed<T: std::str::FromStr>(&self, what: &str) -> Result<T, Error>
    where
        T::Err: core::fmt::Display,
    {
        let s = self.value.string();
        s.trim()
            .parse::<T>()
            .map_err(|e| Error::Unmarshal(format!("cannot read {what} from {s:?}: {e}")))
    }
}

macro_rules! deserialize_parsed_int {
    ($method:ident, $visit:ident, $ty:ty) => {
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
            visitor.$visit(self.parsed::<$ty>(stringify!($ty))?)
        }
    };
}

impl<'de, 's> de::Deserializer<'de> for ValueDeserializer<'s> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match &self.value {
            Value::Boolean(b) => visitor.visit_bool(*b),
            Value::Number(n) => visitor.visit_f64(*n),
            _ => visitor.visit_string(self.value.string()),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match &self.value {
            Value::Boolean(b) => visitor.visit_bool(*b),
            _ => visitor.visit_bool(self.parsed::<bool>("bool")?),
        }
    }

    deserialize_parsed_int!(deserialize_i8, visit_i8, i8);
    deserialize_parsed_int!(deserialize_i16, visit_i16, i16);
    deserialize_parsed_int!(deserialize_i32, visit_i32, i32);
    deserialize_parsed_int!(deserialize_i64, visit_i64, i64);
    deserialize_parsed_int!(deserialize_u8, visit_u8, u8);
    deserialize_parsed_int!(deserialize_u16, visit_u16, u16);
    deserialize_parsed_int!(deserialize_u32, visit_u32, u32);
    deserialize_parsed_int!(deserialize_u64, visit_u64, u64);

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_f32(self.value.number() as f32)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_f64(self.value.number())
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        let s = self.value.string();
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => visitor.visit_char(c),
            _ => Err(Error::Unmarshal(format!("cannot read char from {s:?}"))),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_string(self.value.string())
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_string(self.value.string())
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Error> {
        Err(Error::Unmarshal("byte targets are not supported".into()))
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Error> {
        Err(Error::Unmarshal("byte targets are not supported".into()))
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match &self.value {
            Value::Nodes(ns) if ns.is_empty() => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error> {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.value {
            Value::Nodes(nodes) => visitor.visit_seq(NodesSeq {
                nodes: nodes.into_iter(),
                settings: self.settings,
            }),
            other => Err(Error::Unmarshal(format!(
                "sequence target needs a node-set, got {}",
                other.kind_name()
            ))),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Error> {
        Err(Error::Unmarshal("map targets are not supported".into()))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        let Value::Nodes(nodes) = &self.value else {
            return Err(Error::Unmarshal(format!(
                "struct {name} needs a node-set, got {}",
                self.value.kind_name()
            )));
        };
        let cursor = nodes.first().cloned().ok_or_else(|| {
            Error::Unmarshal(format!("no nodes matched for struct {name}"))
        })?;
        visitor.visit_map(FieldAccess {
            cursor,
            settings: self.settings,
            fields: fields.iter(),
            current: None,
        })
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Error> {
        Err(Error::Unmarshal("enum targets are not supported".into()))
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_string(self.value.string())
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_unit()
    }
}

struct NodesSeq<'s> {
    nodes: std::vec::IntoIter<Cursor>,
    settings: &'s ContextSettings,
}

impl<'de> SeqAccess<'de> for NodesSeq<'_> {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, Error> {
        match self.nodes.next() {
            Some(cursor) => seed
                .deserialize(ValueDeserializer {
                    value: Value::Nodes(vec![cursor]),
                    settings: self.settings,
                })
                .map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.nodes.len())
    }
}

struct FieldAccess<'s> {
    cursor: Cursor,
    settings: &'s ContextSettings,
    fields: core::slice::Iter<'static, &'static str>,
    current: Option<&'static str>,
}

impl<'de> MapAccess<'de> for FieldAccess<'_> {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, Error> {
        match self.fields.next() {
            Some(&field) => {
                self.current = Some(field);
                seed.deserialize(de::value::StrDeserializer::<Error>::new(field))
                    .map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, Error> {
        let field = self.current.take().expect("value follows key");
        let grammar = build_expr(field)
            .map_err(|e| Error::Unmarshal(format!("field expression {field:?}: {e}")))?;
        let value = exec_at(&self.cursor, &grammar, self.settings)
            .map_err(|e| Error::Unmarshal(format!("field expression {field:?}: {e}")))?;
        seed.deserialize(ValueDeserializer {
            value,
            settings: self.settings,
        })
    }
}
