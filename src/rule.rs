use std::rc::Rc;

use anyhow::{bail, Result};

use crate::ast::Expr;
use crate::builder::Builder;
use crate::errors::Error;
use crate::interpreter::{Interpreter, VariableAccessor};
use crate::strings::StringPool;
use crate::value::Value;

/// A compiled rule: the expression tree, its string pool, and the
/// variable names the builder collected.
///
/// A rule is immutable after construction and cheap to move. It may
/// be evaluated concurrently as long as each evaluation brings its
/// own accessor; every `apply` call uses its own scratch string pool.
///
/// ```
/// # fn main() -> anyhow::Result<()> {
/// use jsonlogic::{build, Value};
///
/// let rule = build(&serde_json::json!({"+": [{"var": "a"}, {"var": "b"}]}))?;
///
/// assert_eq!(rule.variable_names().len(), 2);
/// assert_eq!(
///     rule.apply_positional(&[Value::Int(1), Value::Int(2)])?,
///     Value::Int(3)
/// );
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Rule {
    root: Expr,
    strings: StringPool,
    variable_names: Vec<Rc<str>>,
    has_computed_names: bool,
}

impl Rule {
    /// The plain (non-computed) variable names referenced by the
    /// rule, duplicate-free, in first-seen order. The order is the
    /// contract for [`Rule::apply_positional`].
    pub fn variable_names(&self) -> &[Rc<str>] {
        &self.variable_names
    }

    /// True if the rule references a variable whose name must be
    /// computed at evaluation time, or uses `missing`/`missing_some`.
    pub fn has_computed_names(&self) -> bool {
        self.has_computed_names
    }

    /// Renders the rule back as a JSON document. Rebuilding the
    /// result yields an equivalent rule (operator arguments come out
    /// in list form).
    pub fn to_json(&self) -> serde_json::Value {
        self.root.to_json()
    }

    /// Evaluates the rule without any data context. Touching any
    /// variable is an error.
    pub fn apply(&self) -> Result<Value> {
        let no_accessor = |_name: &Value, _index: Option<usize>| -> Result<Value> {
            bail!(Error::Unsupported(
                "no variable accessor installed".to_string()
            ))
        };
        self.apply_with(&no_accessor)
    }

    /// Evaluates the rule, resolving variables through `accessor`.
    pub fn apply_with(&self, accessor: &VariableAccessor) -> Result<Value> {
        Interpreter::with_strings(accessor, self.strings.clone()).eval(&self.root)
    }

    /// Evaluates the rule with values supplied positionally, in
    /// [`Rule::variable_names`] order. Requires
    /// `has_computed_names() == false`.
    pub fn apply_positional(&self, values: &[Value]) -> Result<Value> {
        if self.has_computed_names {
            bail!(Error::Unsupported(
                "rule has computed variable names; positional values cannot resolve them"
                    .to_string()
            ));
        }

        let accessor = |_name: &Value, index: Option<usize>| -> Result<Value> {
            match index.and_then(|i| values.get(i)) {
                Some(value) => Ok(value.clone()),
                None => bail!(Error::Unsupported(
                    "unable to access computed variable".to_string()
                )),
            }
        };
        self.apply_with(&accessor)
    }
}

/// Builds a rule from a parsed JSON document.
///
/// Fails with [`Error::Unsupported`] for unknown operators and value
/// objects, and with [`Error::Malformed`] for structurally invalid
/// rules such as `{"var": []}`.
pub fn build(rule: &serde_json::Value) -> Result<Rule> {
    let (root, strings, variable_names, has_computed_names) = Builder::new().build(rule)?;
    Ok(Rule {
        root,
        strings,
        variable_names,
        has_computed_names,
    })
}

/// Builds and evaluates `rule` against `data` with the JSON-object
/// accessor installed.
///
/// ```
/// # fn main() -> anyhow::Result<()> {
/// use jsonlogic::{apply, Value};
///
/// let rule = serde_json::json!({"<": [{"var": "temp"}, 110]});
/// let data = serde_json::json!({"temp": 100});
///
/// assert_eq!(apply(&rule, &data)?, Value::Bool(true));
/// # Ok(())
/// # }
/// ```
pub fn apply(rule: &serde_json::Value, data: &serde_json::Value) -> Result<Value> {
    let rule = build(rule)?;
    let accessor = data_accessor(data.clone());
    rule.apply_with(&accessor)
}

/// Creates an accessor over a JSON data context.
///
/// Names resolve by exact key lookup first, then by `.`-separated
/// descent (the exact match is retried against each suffix); numeric
/// segments index arrays. Integer name values index a top-level data
/// array. The empty name returns the whole context. Missing keys and
/// out-of-range indices raise a variable-resolution error, which
/// `var` catches to substitute its default.
pub fn data_accessor(data: serde_json::Value) -> impl Fn(&Value, Option<usize>) -> Result<Value> {
    move |name: &Value, _index: Option<usize>| match name {
        Value::String(path) if path.is_empty() => Value::try_from(&data),
        Value::String(path) => lookup_path(&data, path),
        Value::Int(i) => {
            let index = usize::try_from(*i)
                .map_err(|_| Error::VariableResolution(format!("index {i}")))?;
            lookup_index(&data, index)
        }
        Value::Uint(u) => {
            let index = usize::try_from(*u)
                .map_err(|_| Error::VariableResolution(format!("index {u}")))?;
            lookup_index(&data, index)
        }
        _ => bail!(Error::Unsupported(format!(
            "unsupported variable name `{name}`"
        ))),
    }
}

/// Creates an accessor that resolves precomputed indices against a
/// value vector, for rules without computed names.
pub fn positional_accessor(values: Vec<Value>) -> impl Fn(&Value, Option<usize>) -> Result<Value> {
    move |_name: &Value, index: Option<usize>| match index.and_then(|i| values.get(i)) {
        Some(value) => Ok(value.clone()),
        None => bail!(Error::Unsupported(
            "unable to access computed variable".to_string()
        )),
    }
}

fn lookup_path(node: &serde_json::Value, path: &str) -> Result<Value> {
    if let Some(obj) = node.as_object() {
        if let Some(found) = obj.get(path) {
            return Value::try_from(found);
        }
        if let Some((head, rest)) = path.split_once('.') {
            if let Some(next) = obj.get(head) {
                return lookup_path(next, rest);
            }
        }
    } else if let Some(items) = node.as_array() {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        if let Ok(index) = head.parse::<usize>() {
            if let Some(next) = items.get(index) {
                return match rest {
                    Some(rest) => lookup_path(next, rest),
                    None => Value::try_from(next),
                };
            }
        }
    }

    bail!(Error::VariableResolution(path.to_string()))
}

fn lookup_index(data: &serde_json::Value, index: usize) -> Result<Value> {
    match data.as_array().and_then(|items| items.get(index)) {
        Some(found) => Value::try_from(found),
        None => bail!(Error::VariableResolution(format!("index {index}"))),
    }
}
