use std::rc::Rc;

use anyhow::{bail, Result};

use crate::ast::Op;
use crate::coerce::{self, truthy, Num, NumPair};
use crate::errors::Error;
use crate::value::Value;

/// Outcome of a single loose-equality step.
///
/// `Unpack` signals that one side is a singleton array whose sole
/// element must be compared instead; the caller resolves it with an
/// ordinary loop rather than an error.
#[derive(Debug, Clone, Copy)]
enum EqOutcome {
    Decided(bool),
    Unpack,
}

/// Relational predicate selector shared by `< <= > >=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
}

fn apply_rel<T: PartialOrd>(op: CmpOp, lhs: T, rhs: T) -> bool {
    match op {
        CmpOp::Lt => lhs < rhs,
        CmpOp::Le => lhs <= rhs,
        CmpOp::Gt => lhs > rhs,
        CmpOp::Ge => lhs >= rhs,
    }
}

/// A pair of scalar operands coerced to a shared comparison type.
///
/// String-vs-bool coerces to the constant pair `(true, false)` so the
/// combination is unequal under every equality operator.
enum ScalarPair {
    Ints(i64, i64),
    Uints(u64, u64),
    Floats(f64, f64),
    Strs(Rc<str>, Rc<str>),
    Bools(bool, bool),
}

fn flip(pair: ScalarPair) -> ScalarPair {
    match pair {
        ScalarPair::Ints(a, b) => ScalarPair::Ints(b, a),
        ScalarPair::Uints(a, b) => ScalarPair::Uints(b, a),
        ScalarPair::Floats(a, b) => ScalarPair::Floats(b, a),
        ScalarPair::Strs(a, b) => ScalarPair::Strs(b, a),
        ScalarPair::Bools(a, b) => ScalarPair::Bools(b, a),
    }
}

fn int_uint_pair(i: i64, u: u64) -> Result<ScalarPair> {
    Ok(match coerce::promote_int_uint(i, u)? {
        NumPair::Ints(a, b) => ScalarPair::Ints(a, b),
        NumPair::Uints(a, b) => ScalarPair::Uints(a, b),
        NumPair::Floats(a, b) => ScalarPair::Floats(a, b),
    })
}

/// Pairwise coercion for scalar comparison operands. Strings parse
/// against the numeric side's type; bools convert against the numeric
/// side; parse failures are type errors.
fn coerce_scalar_pair(lhs: &Value, rhs: &Value) -> Result<ScalarPair> {
    use ScalarPair::*;
    Ok(match (lhs, rhs) {
        (Value::String(a), Value::String(b)) => Strs(a.clone(), b.clone()),
        (Value::Bool(a), Value::Bool(b)) => Bools(*a, *b),

        // strings and booleans are never equal
        (Value::String(_), Value::Bool(_)) | (Value::Bool(_), Value::String(_)) => {
            Bools(true, false)
        }

        (Value::Int(a), Value::Int(b)) => Ints(*a, *b),
        (Value::Uint(a), Value::Uint(b)) => Uints(*a, *b),
        (Value::Float(a), Value::Float(b)) => Floats(*a, *b),

        (Value::Int(a), Value::Uint(b)) => int_uint_pair(*a, *b)?,
        (Value::Uint(a), Value::Int(b)) => flip(int_uint_pair(*b, *a)?),

        (Value::Float(a), Value::Int(b)) => Floats(*a, *b as f64),
        (Value::Int(a), Value::Float(b)) => Floats(*a as f64, *b),
        (Value::Float(a), Value::Uint(b)) => Floats(*a, *b as f64),
        (Value::Uint(a), Value::Float(b)) => Floats(*a as f64, *b),

        (Value::Int(a), Value::String(s)) => Ints(*a, coerce::parse_i64(s)?),
        (Value::String(s), Value::Int(b)) => Ints(coerce::parse_i64(s)?, *b),
        (Value::Uint(a), Value::String(s)) => Uints(*a, coerce::parse_u64(s)?),
        (Value::String(s), Value::Uint(b)) => Uints(coerce::parse_u64(s)?, *b),
        (Value::Float(a), Value::String(s)) => Floats(*a, coerce::parse_f64(s)?),
        (Value::String(s), Value::Float(b)) => Floats(coerce::parse_f64(s)?, *b),

        (Value::Bool(a), Value::Int(b)) => Ints(i64::from(*a), *b),
        (Value::Int(a), Value::Bool(b)) => Ints(*a, i64::from(*b)),
        (Value::Bool(a), Value::Uint(b)) => Uints(u64::from(*a), *b),
        (Value::Uint(a), Value::Bool(b)) => Uints(*a, u64::from(*b)),
        (Value::Bool(a), Value::Float(b)) => Floats(f64::from(u8::from(*a)), *b),
        (Value::Float(a), Value::Bool(b)) => Floats(*a, f64::from(u8::from(*b))),

        _ => bail!(Error::Type(format!("cannot compare `{lhs}` with `{rhs}`"))),
    })
}

fn scalar_pair_equal(pair: ScalarPair) -> bool {
    match pair {
        ScalarPair::Ints(a, b) => a == b,
        ScalarPair::Uints(a, b) => a == b,
        ScalarPair::Floats(a, b) => a == b,
        ScalarPair::Strs(a, b) => a == b,
        ScalarPair::Bools(a, b) => a == b,
    }
}

fn scalar_pair_rel(op: CmpOp, pair: ScalarPair) -> bool {
    match pair {
        ScalarPair::Ints(a, b) => apply_rel(op, a, b),
        ScalarPair::Uints(a, b) => apply_rel(op, a, b),
        ScalarPair::Floats(a, b) => apply_rel(op, a, b),
        ScalarPair::Strs(a, b) => apply_rel(op, a.as_ref(), b.as_ref()),
        ScalarPair::Bools(a, b) => apply_rel(op, a, b),
    }
}

fn unpack_singleton(v: &Value) -> Option<Value> {
    match v {
        Value::Array(items) if items.len() == 1 => items.first().cloned(),
        _ => None,
    }
}

fn loose_equal_once(lhs: &Value, rhs: &Value) -> Result<EqOutcome> {
    use EqOutcome::*;
    Ok(match (lhs, rhs) {
        (Value::Absent, _) | (_, Value::Absent) => {
            bail!(Error::Type("cannot compare an absent value".to_string()))
        }

        // null is equal only to itself
        (Value::Null, Value::Null) => Decided(true),
        (Value::Null, _) | (_, Value::Null) => Decided(false),

        (Value::Array(_), Value::Array(_)) => Decided(false),

        // a scalar equals a singleton array's element, an empty array
        // iff the scalar is falsy, and never a longer array
        (_, Value::Array(items)) => match items.len() {
            1 => Unpack,
            0 => Decided(!truthy(lhs)),
            _ => Decided(false),
        },
        (Value::Array(items), _) => match items.len() {
            1 => Unpack,
            0 => Decided(!truthy(rhs)),
            _ => Decided(false),
        },

        _ => Decided(scalar_pair_equal(coerce_scalar_pair(lhs, rhs)?)),
    })
}

/// Loose equality (`==`/`!=`), including the scalar-vs-singleton
/// array fallback.
pub(crate) fn loose_equal(lhs: &Value, rhs: &Value) -> Result<bool> {
    let mut l = lhs.clone();
    let mut r = rhs.clone();
    loop {
        match loose_equal_once(&l, &r)? {
            EqOutcome::Decided(eq) => return Ok(eq),
            EqOutcome::Unpack => {
                if let Some(element) = unpack_singleton(&l) {
                    l = element;
                } else if let Some(element) = unpack_singleton(&r) {
                    r = element;
                } else {
                    bail!(Error::Type("expected a singleton array".to_string()));
                }
            }
        }
    }
}

/// Strict equality (`===`/`!==`): no coercion, identical variants
/// only. Arrays are never strictly equal, and neither are integers of
/// different widths.
pub(crate) fn strict_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Uint(a), Value::Uint(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        _ => false,
    }
}

/// Relational comparison (`< <= > >=`) with the full coercion rules:
/// numeric promotion, string parsing, null-as-zero, the null-vs-empty
/// string special case, singleton unpacking, and lexicographic array
/// comparison.
pub(crate) fn relate(op: CmpOp, lhs: &Value, rhs: &Value) -> Result<bool> {
    Ok(match (lhs, rhs) {
        (Value::Absent, _) | (_, Value::Absent) => {
            bail!(Error::Type("cannot compare an absent value".to_string()))
        }

        (Value::Null, Value::Null) => matches!(op, CmpOp::Le | CmpOp::Ge),

        // null orders at-or-below an empty string, nowhere else
        (Value::String(s), Value::Null) | (Value::Null, Value::String(s)) => {
            matches!(op, CmpOp::Le | CmpOp::Ge) && s.is_empty()
        }

        (Value::Null, Value::Bool(b)) => apply_rel(op, false, *b),
        (Value::Bool(a), Value::Null) => apply_rel(op, *a, false),
        (Value::Null, Value::Int(b)) => apply_rel(op, 0, *b),
        (Value::Int(a), Value::Null) => apply_rel(op, *a, 0),
        (Value::Null, Value::Uint(b)) => apply_rel(op, 0, *b),
        (Value::Uint(a), Value::Null) => apply_rel(op, *a, 0),
        (Value::Null, Value::Float(b)) => apply_rel(op, 0.0, *b),
        (Value::Float(a), Value::Null) => apply_rel(op, *a, 0.0),

        (Value::Array(a), Value::Array(b)) => compare_sequence(op, a, b)?,

        (_, Value::Array(items)) => match items.len() {
            1 => {
                let element = items.first().cloned().unwrap_or(Value::Null);
                relate(op, lhs, &element)?
            }
            0 => apply_rel(op, truthy(lhs), false),
            _ => apply_rel(op, false, true),
        },
        (Value::Array(items), _) => match items.len() {
            1 => {
                let element = items.first().cloned().unwrap_or(Value::Null);
                relate(op, &element, rhs)?
            }
            0 => apply_rel(op, false, truthy(rhs)),
            _ => apply_rel(op, false, true),
        },

        _ => scalar_pair_rel(op, coerce_scalar_pair(lhs, rhs)?),
    })
}

/// Lexicographic array comparison.
///
/// A pair is decisive iff the predicate disagrees with its mirror
/// image; an all-equal prefix falls back to comparing lengths.
fn compare_sequence(op: CmpOp, lhs: &[Value], rhs: &[Value]) -> Result<bool> {
    let lsz = lhs.len();
    let rsz = rhs.len();

    if lsz == 0 {
        return Ok(apply_rel(op, false, rsz != 0));
    }
    if rsz == 0 {
        return Ok(apply_rel(op, true, false));
    }

    for (l, r) in lhs.iter().zip(rhs.iter()) {
        let forward = relate(op, l, r)?;
        if forward != relate(op, r, l)? {
            return Ok(forward);
        }
    }

    Ok(apply_rel(op, lsz, rsz))
}

/// Dispatches one comparison step of a chained comparison operator.
pub(crate) fn compare(op: Op, lhs: &Value, rhs: &Value) -> Result<bool> {
    match op {
        Op::Equal => loose_equal(lhs, rhs),
        Op::NotEqual => Ok(!loose_equal(lhs, rhs)?),
        Op::StrictEqual => Ok(strict_equal(lhs, rhs)),
        Op::StrictNotEqual => Ok(!strict_equal(lhs, rhs)),
        Op::Less => relate(CmpOp::Lt, lhs, rhs),
        Op::LessOrEqual => relate(CmpOp::Le, lhs, rhs),
        Op::Greater => relate(CmpOp::Gt, lhs, rhs),
        Op::GreaterOrEqual => relate(CmpOp::Ge, lhs, rhs),
        _ => bail!(Error::Unsupported(format!(
            "`{}` is not a comparison operator",
            op.key()
        ))),
    }
}

/// Pairwise arithmetic kernel for `+ - * / % min max`.
///
/// A null operand nulls the result. Integer overflow wraps, matching
/// host behavior. Integer division is exact or falls over to floating
/// point; division and modulo by zero yield null; modulo rejects
/// floating-point operands.
pub(crate) fn arith_pair(op: Op, lhs: Num, rhs: Num) -> Result<Num> {
    let Some(pair) = coerce::promote(lhs, rhs)? else {
        return Ok(Num::Null);
    };

    Ok(match op {
        Op::Add => match pair {
            NumPair::Ints(a, b) => Num::Int(a.wrapping_add(b)),
            NumPair::Uints(a, b) => Num::Uint(a.wrapping_add(b)),
            NumPair::Floats(a, b) => Num::Float(a + b),
        },
        Op::Subtract => match pair {
            NumPair::Ints(a, b) => Num::Int(a.wrapping_sub(b)),
            NumPair::Uints(a, b) => Num::Uint(a.wrapping_sub(b)),
            NumPair::Floats(a, b) => Num::Float(a - b),
        },
        Op::Multiply => match pair {
            NumPair::Ints(a, b) => Num::Int(a.wrapping_mul(b)),
            NumPair::Uints(a, b) => Num::Uint(a.wrapping_mul(b)),
            NumPair::Floats(a, b) => Num::Float(a * b),
        },
        Op::Divide => match pair {
            NumPair::Ints(_, 0) | NumPair::Uints(_, 0) => Num::Null,
            NumPair::Ints(a, b) => {
                if a.wrapping_rem(b) == 0 {
                    Num::Int(a.wrapping_div(b))
                } else {
                    Num::Float(a as f64 / b as f64)
                }
            }
            NumPair::Uints(a, b) => {
                if a % b == 0 {
                    Num::Uint(a / b)
                } else {
                    Num::Float(a as f64 / b as f64)
                }
            }
            NumPair::Floats(a, b) => Num::Float(a / b),
        },
        Op::Modulo => match pair {
            NumPair::Ints(_, 0) | NumPair::Uints(_, 0) => Num::Null,
            NumPair::Ints(a, b) => Num::Int(a.wrapping_rem(b)),
            NumPair::Uints(a, b) => Num::Uint(a % b),
            NumPair::Floats(..) => {
                bail!(Error::Type("`%` expects integer operands".to_string()))
            }
        },
        Op::Min => match pair {
            NumPair::Ints(a, b) => Num::Int(a.min(b)),
            NumPair::Uints(a, b) => Num::Uint(a.min(b)),
            NumPair::Floats(a, b) => Num::Float(if b < a { b } else { a }),
        },
        Op::Max => match pair {
            NumPair::Ints(a, b) => Num::Int(a.max(b)),
            NumPair::Uints(a, b) => Num::Uint(a.max(b)),
            NumPair::Floats(a, b) => Num::Float(if a < b { b } else { a }),
        },
        _ => bail!(Error::Unsupported(format!(
            "`{}` is not an arithmetic operator",
            op.key()
        ))),
    })
}

/// The `in` operator: elementwise strict equality against an array,
/// substring containment between strings, false for everything else.
pub(crate) fn membership(lhs: &Value, rhs: &Value) -> bool {
    match rhs {
        Value::Array(items) => items.iter().any(|item| strict_equal(lhs, item)),
        Value::String(haystack) => match lhs {
            Value::String(needle) => haystack.contains(needle.as_ref()),
            _ => false,
        },
        _ => false,
    }
}
