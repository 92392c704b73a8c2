use std::rc::Rc;

use anyhow::{bail, Result};

use crate::errors::Error;
use crate::strings::StringPool;
use crate::value::Value;

/// Returns true if `v` is truthy under JsonLogic's boolean coercion:
/// booleans as-is, numerics nonzero, strings non-empty, null false,
/// arrays truthy iff non-empty. The absent marker is falsy.
pub fn truthy(v: &Value) -> bool {
    match v {
        Value::Absent | Value::Null => false,
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Uint(u) => *u != 0,
        Value::Float(f) => *f != 0.0,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
    }
}

/// Returns true if `v` is not truthy.
pub fn falsy(v: &Value) -> bool {
    !truthy(v)
}

pub(crate) fn parse_i64(s: &str) -> Result<i64> {
    s.parse::<i64>()
        .map_err(|_| Error::Type(format!("cannot convert `{s}` to an integer")).into())
}

pub(crate) fn parse_u64(s: &str) -> Result<u64> {
    s.parse::<u64>()
        .map_err(|_| Error::Type(format!("cannot convert `{s}` to an unsigned integer")).into())
}

pub(crate) fn parse_f64(s: &str) -> Result<f64> {
    s.parse::<f64>()
        .map_err(|_| Error::Type(format!("cannot convert `{s}` to a number")).into())
}

/// Converts `v` to a signed integer: floats truncate, bools count as
/// 0/1, null is 0, strings parse. Used for `substr` offsets and other
/// integer argument positions.
pub(crate) fn to_i64(v: &Value) -> Result<i64> {
    Ok(match v {
        Value::Int(i) => *i,
        Value::Uint(u) => i64::try_from(*u)
            .map_err(|_| Error::Range(format!("{u} exceeds the signed integer range")))?,
        Value::Float(f) => *f as i64,
        Value::Bool(b) => i64::from(*b),
        Value::Null => 0,
        Value::String(s) => parse_i64(s)?,
        _ => bail!(Error::Type(format!("cannot convert `{v}` to an integer"))),
    })
}

/// Converts `v` to an unsigned integer. Used for the `missing_some`
/// minimum-required count.
pub(crate) fn to_u64(v: &Value) -> Result<u64> {
    Ok(match v {
        Value::Uint(u) => *u,
        Value::Int(i) => u64::try_from(*i)
            .map_err(|_| Error::Range(format!("{i} is not an unsigned integer")))?,
        Value::Float(f) => *f as u64,
        Value::Bool(b) => u64::from(*b),
        Value::Null => 0,
        Value::String(s) => parse_u64(s)?,
        _ => bail!(Error::Type(format!(
            "cannot convert `{v}` to an unsigned integer"
        ))),
    })
}

/// Renders `v` in its canonical string form: decimal for integers,
/// JSON rendering for doubles, `true`/`false`/`null`, identity for
/// strings. Arrays and the absent marker do not stringify.
pub(crate) fn to_display_string(v: &Value) -> Result<String> {
    Ok(match v {
        Value::String(s) => s.as_ref().to_string(),
        Value::Bool(b) => if *b { "true" } else { "false" }.to_string(),
        Value::Null => "null".to_string(),
        Value::Int(i) => format!("{i}"),
        Value::Uint(u) => format!("{u}"),
        Value::Float(f) => match serde_json::Number::from_f64(*f) {
            Some(n) => n.to_string(),
            None => format!("{f}"),
        },
        _ => bail!(Error::Type(format!("cannot convert `{v}` to a string"))),
    })
}

/// Like [`to_display_string`], with the result interned.
pub(crate) fn to_interned_string(v: &Value, strings: &mut StringPool) -> Result<Rc<str>> {
    match v {
        Value::String(s) => Ok(s.clone()),
        _ => Ok(strings.intern_owned(to_display_string(v)?)),
    }
}

/// A numeric operand after arithmetic numerification.
///
/// `Null` is a first-class member: any operand that numerifies to
/// null makes the whole arithmetic expression null.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Num {
    Int(i64),
    Uint(u64),
    Float(f64),
    Null,
}

impl From<Num> for Value {
    fn from(n: Num) -> Value {
        match n {
            Num::Int(i) => Value::Int(i),
            Num::Uint(u) => Value::Uint(u),
            Num::Float(f) => Value::Float(f),
            Num::Null => Value::Null,
        }
    }
}

/// Numerifies an arithmetic operand.
///
/// Strings parse as numbers, with integral parse results collapsed to
/// the signed width. Bools numerify to null, as do nulls; arrays and
/// the absent marker are type errors.
pub(crate) fn numerify(v: &Value) -> Result<Num> {
    Ok(match v {
        Value::Int(i) => Num::Int(*i),
        Value::Uint(u) => Num::Uint(*u),
        Value::Float(f) => Num::Float(*f),
        Value::Null | Value::Bool(_) => Num::Null,
        Value::String(s) => {
            let parsed = parse_f64(s)?;
            let truncated = parsed as i64;
            if truncated as f64 == parsed {
                Num::Int(truncated)
            } else {
                Num::Float(parsed)
            }
        }
        _ => bail!(Error::Type(format!("cannot use `{v}` in arithmetic"))),
    })
}

/// A pair of numeric operands promoted to a shared width.
#[derive(Debug, Clone, Copy)]
pub(crate) enum NumPair {
    Ints(i64, i64),
    Uints(u64, u64),
    Floats(f64, f64),
}

/// Marker for a failed same-width integer promotion; resolved by
/// retrying with the other width.
pub(crate) struct WidthMismatch;

pub(crate) fn narrow_to_int(u: u64) -> Result<i64, WidthMismatch> {
    i64::try_from(u).map_err(|_| WidthMismatch)
}

pub(crate) fn widen_to_uint(i: i64) -> Result<u64, WidthMismatch> {
    u64::try_from(i).map_err(|_| WidthMismatch)
}

/// Promotes mixed signed/unsigned operands, retrying with the other
/// integer width on overflow.
pub(crate) fn promote_int_uint(i: i64, u: u64) -> Result<NumPair> {
    if let Ok(narrowed) = narrow_to_int(u) {
        return Ok(NumPair::Ints(i, narrowed));
    }
    if let Ok(widened) = widen_to_uint(i) {
        return Ok(NumPair::Uints(widened, u));
    }
    bail!(Error::Range(format!(
        "cannot reconcile {i} with {u} in either integer width"
    )))
}

/// Promotes two numerified operands to the smallest shared type, or
/// `None` when either side is null.
pub(crate) fn promote(lhs: Num, rhs: Num) -> Result<Option<NumPair>> {
    Ok(Some(match (lhs, rhs) {
        (Num::Null, _) | (_, Num::Null) => return Ok(None),
        (Num::Int(a), Num::Int(b)) => NumPair::Ints(a, b),
        (Num::Uint(a), Num::Uint(b)) => NumPair::Uints(a, b),
        (Num::Float(a), Num::Float(b)) => NumPair::Floats(a, b),
        (Num::Float(a), Num::Int(b)) => NumPair::Floats(a, b as f64),
        (Num::Int(a), Num::Float(b)) => NumPair::Floats(a as f64, b),
        (Num::Float(a), Num::Uint(b)) => NumPair::Floats(a, b as f64),
        (Num::Uint(a), Num::Float(b)) => NumPair::Floats(a as f64, b),
        (Num::Int(a), Num::Uint(b)) => promote_int_uint(a, b)?,
        (Num::Uint(a), Num::Int(b)) => match promote_int_uint(b, a)? {
            NumPair::Ints(x, y) => NumPair::Ints(y, x),
            NumPair::Uints(x, y) => NumPair::Uints(y, x),
            NumPair::Floats(x, y) => NumPair::Floats(y, x),
        },
    }))
}
