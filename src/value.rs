use core::fmt;
use std::rc::Rc;

use anyhow::{bail, Result};
use serde::ser::{SerializeSeq, Serializer};
use serde::Serialize;

use crate::errors::Error;

/// Runtime value produced by evaluating a rule.
///
/// The variants mirror the JSON data model, with two additions:
/// [`Value::Absent`] marks a value that was never supplied (distinct
/// from an explicit `null`), and integers keep their signed/unsigned
/// width so that the weak-typed coercion rules can retry across the
/// boundary.
///
/// Strings are reference-counted handles owned by the rule's string
/// pool; cloning a value never copies string or array storage.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A value that was not supplied. Never appears in the output of
    /// a successful evaluation.
    Absent,
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    String(Rc<str>),
    Array(Rc<Vec<Value>>),
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Uint(u) => serializer.serialize_u64(*u),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s.as_ref()),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items.iter() {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }

            // display the absent marker as a sentinel string
            Value::Absent => serializer.serialize_str("<absent>"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(s) => write!(f, "{s}"),
            Err(_e) => Err(fmt::Error),
        }
    }
}

impl Value {
    pub fn new_array() -> Value {
        Value::from(Vec::new())
    }

    pub fn from_json_str(json: &str) -> Result<Value> {
        let parsed: serde_json::Value = serde_json::from_str(json)?;
        Value::try_from(&parsed)
    }

    pub fn to_json_str(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Uint(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<Rc<str>> for Value {
    fn from(s: Rc<str>) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(items))
    }
}

impl TryFrom<&serde_json::Value> for Value {
    type Error = anyhow::Error;

    /// Converts a parsed JSON node into a runtime value.
    ///
    /// JSON objects have no value representation (rules cannot
    /// produce them and value-objects are out of scope), so they are
    /// rejected with a type error.
    fn try_from(node: &serde_json::Value) -> Result<Value> {
        Ok(match node {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::Uint(u)
                } else if let Some(f) = n.as_f64() {
                    Value::Float(f)
                } else {
                    bail!(Error::Type(format!("unrepresentable number `{n}`")))
                }
            }
            serde_json::Value::String(s) => Value::String(Rc::from(s.as_str())),
            serde_json::Value::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(Value::try_from(item)?);
                }
                Value::from(values)
            }
            serde_json::Value::Object(_) => {
                bail!(Error::Type(
                    "JSON objects have no value representation".to_string()
                ))
            }
        })
    }
}
