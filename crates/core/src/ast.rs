//! Owned, arena-free form of a tree, and its JSON encoding.
//!
//! The front end hands trees over as JSON shaped like Python's `ast` dump:
//!
//! - `{"_type": "Name", "id": "x", "ctx": {"_type": "Load"}}` is a structured node
//! - arrays are lists, `null` is the empty node
//! - strings, integers, floats and booleans are atoms
//! - `{"_bytes": "deadbeef"}` is a byte-sequence atom
//!
//! `Ast` is also how catalog fragments are stored, since they live outside any one tree.

use crate::result::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};

const TYPE_KEY: &str = "_type";
const BYTES_KEY: &str = "_bytes";

/// Atomic leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    Str(String),
    Int(i64),
    Float(f64),
    Bytes(Vec<u8>),
    Bool(bool),
}

impl Atom {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Atom::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// Owned tree value.
#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
    Empty,
    Atom(Atom),
    List(Vec<Ast>),
    Node {
        kind: String,
        fields: Vec<(String, Ast)>,
    },
}

impl Ast {
    /// Structured node from a kind and `(field, value)` pairs.
    pub fn node<K, I, F>(kind: K, fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (F, Ast)>,
        F: Into<String>,
    {
        Ast::Node {
            kind: kind.into(),
            fields: fields.into_iter().map(|(f, v)| (f.into(), v)).collect(),
        }
    }

    /// Structured node without fields (contexts, operators).
    pub fn unit(kind: impl Into<String>) -> Self {
        Ast::Node {
            kind: kind.into(),
            fields: Vec::new(),
        }
    }

    pub fn str(value: impl Into<String>) -> Self {
        Ast::Atom(Atom::Str(value.into()))
    }

    /// Kind tag of a structured node.
    pub fn kind(&self) -> Option<&str> {
        match self {
            Ast::Node { kind, .. } => Some(kind),
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Ast> {
        match self {
            Ast::Node { fields, .. } => fields.iter().find(|(f, _)| f == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Decodes the JSON front-end form.
    pub fn from_value(value: &Value) -> Result<Self> {
        Ok(match value {
            Value::Null => Ast::Empty,
            Value::Bool(b) => Ast::Atom(Atom::Bool(*b)),
            Value::String(s) => Ast::Atom(Atom::Str(s.clone())),
            Value::Number(n) => Ast::Atom(number_atom(n)?),
            Value::Array(items) => Ast::List(
                items
                    .iter()
                    .map(Ast::from_value)
                    .collect::<Result<Vec<_>>>()?,
            ),
            Value::Object(map) => {
                if let Some(Value::String(hex)) = map.get(BYTES_KEY) {
                    return Ok(Ast::Atom(Atom::Bytes(hex::decode(hex)?)));
                }
                let kind = match map.get(TYPE_KEY) {
                    Some(Value::String(kind)) => kind.clone(),
                    _ => {
                        return Err(Error::UnknownNodeKind(format!(
                            "object without '{TYPE_KEY}' tag"
                        )))
                    }
                };
                let fields = map
                    .iter()
                    .filter(|(key, _)| key.as_str() != TYPE_KEY)
                    .map(|(key, v)| Ok((key.clone(), Ast::from_value(v)?)))
                    .collect::<Result<Vec<_>>>()?;
                Ast::Node { kind, fields }
            }
        })
    }

    /// Encodes into the JSON front-end form.
    pub fn to_value(&self) -> Value {
        match self {
            Ast::Empty => Value::Null,
            Ast::Atom(Atom::Str(s)) => Value::String(s.clone()),
            Ast::Atom(Atom::Int(i)) => Value::from(*i),
            Ast::Atom(Atom::Float(f)) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
            Ast::Atom(Atom::Bool(b)) => Value::Bool(*b),
            Ast::Atom(Atom::Bytes(bytes)) => {
                let mut map = Map::new();
                map.insert(BYTES_KEY.to_string(), Value::String(hex::encode(bytes)));
                Value::Object(map)
            }
            Ast::List(items) => Value::Array(items.iter().map(Ast::to_value).collect()),
            Ast::Node { kind, fields } => {
                let mut map = Map::new();
                map.insert(TYPE_KEY.to_string(), Value::String(kind.clone()));
                for (field, value) in fields {
                    map.insert(field.clone(), value.to_value());
                }
                Value::Object(map)
            }
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Ast::from_value(&value)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_value())?)
    }
}

fn number_atom(n: &Number) -> Result<Atom> {
    if let Some(i) = n.as_i64() {
        Ok(Atom::Int(i))
    } else if let Some(f) = n.as_f64() {
        Ok(Atom::Float(f))
    } else {
        Err(Error::UnknownNodeKind(format!("number out of range: {n}")))
    }
}

impl Serialize for Ast {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Ast {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ast::from_value(&value).map_err(serde::de::Error::custom)
    }
}
