use std::collections::HashMap;
use std::rc::Rc;

use anyhow::{bail, Result};
use indexmap::IndexMap;
use lazy_static::lazy_static;

use crate::ast::{Expr, Op, OpExpr, VarExpr};
use crate::errors::Error;
use crate::strings::StringPool;

#[rustfmt::skip]
lazy_static! {
    /// Operator dispatch table keyed by rule syntax.
    static ref OPERATORS: HashMap<&'static str, Op> = {
        let mut m: HashMap<&'static str, Op> = HashMap::new();

        m.insert("==", Op::Equal);
        m.insert("===", Op::StrictEqual);
        m.insert("!=", Op::NotEqual);
        m.insert("!==", Op::StrictNotEqual);
        m.insert("if", Op::If);
        m.insert("!", Op::Not);
        m.insert("!!", Op::NotNot);
        m.insert("or", Op::Or);
        m.insert("and", Op::And);
        m.insert(">", Op::Greater);
        m.insert(">=", Op::GreaterOrEqual);
        m.insert("<", Op::Less);
        m.insert("<=", Op::LessOrEqual);
        m.insert("max", Op::Max);
        m.insert("min", Op::Min);
        m.insert("+", Op::Add);
        m.insert("-", Op::Subtract);
        m.insert("*", Op::Multiply);
        m.insert("/", Op::Divide);
        m.insert("%", Op::Modulo);
        m.insert("map", Op::Map);
        m.insert("reduce", Op::Reduce);
        m.insert("filter", Op::Filter);
        m.insert("all", Op::All);
        m.insert("none", Op::None);
        m.insert("some", Op::Some);
        m.insert("merge", Op::Merge);
        m.insert("in", Op::In);
        m.insert("cat", Op::Cat);
        m.insert("substr", Op::Substr);
        m.insert("log", Op::Log);
        m.insert("missing", Op::Missing);
        m.insert("missing_some", Op::MissingSome);

        // extensions
        #[cfg(feature = "regex")]
        m.insert("regex", Op::RegexMatch);

        m
    };
}

/// Collects plain variable names in first-seen order and tracks
/// whether any name must be computed at evaluation time.
#[derive(Debug, Default)]
struct VariableMap {
    mapping: IndexMap<Rc<str>, usize>,
    has_computed_names: bool,
}

impl VariableMap {
    /// Inspects a freshly built `var` node.
    ///
    /// A literal name containing both `.` and `[` is computed. A
    /// non-empty plain literal name is recorded (first occurrence
    /// wins) and the node's index cached. The empty name is the
    /// lambda "current element" reference and stays unindexed. A
    /// non-literal name operand makes the whole rule computed.
    fn note_var(&mut self, var: &mut VarExpr) -> Result<()> {
        match var.operands.first() {
            Some(Expr::String(name)) => {
                let computed = name.contains('.') && name.contains('[');
                if computed {
                    self.has_computed_names = true;
                } else if !name.is_empty() {
                    let next = self.mapping.len();
                    let index = *self.mapping.entry(name.clone()).or_insert(next);
                    var.index = Some(index);
                }
            }
            Some(_) => self.has_computed_names = true,
            None => bail!(Error::Malformed(
                "`var` expects a name operand".to_string()
            )),
        }
        Ok(())
    }

    fn to_vector(&self) -> Vec<Rc<str>> {
        self.mapping.keys().cloned().collect()
    }
}

/// Translates a parsed JSON document into an expression tree,
/// interning string literals and collecting the variable-name table.
#[derive(Debug, Default)]
pub(crate) struct Builder {
    strings: StringPool,
    variables: VariableMap,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes the builder and returns the parts of a rule handle:
    /// root expression, interner, variable-name table, and the
    /// computed-names flag.
    pub fn build(
        mut self,
        rule: &serde_json::Value,
    ) -> Result<(Expr, StringPool, Vec<Rc<str>>, bool)> {
        let root = self.build_expr(rule)?;
        let names = self.variables.to_vector();
        Ok((
            root,
            self.strings,
            names,
            self.variables.has_computed_names,
        ))
    }

    fn build_expr(&mut self, node: &serde_json::Value) -> Result<Expr> {
        Ok(match node {
            serde_json::Value::Object(obj) => {
                let mut entries = obj.iter();
                let (key, args) = match (entries.next(), entries.next()) {
                    (Some(entry), None) => entry,
                    _ => bail!(Error::Unsupported(
                        "value objects are not supported; a rule object must have exactly one key"
                            .to_string()
                    )),
                };
                self.build_operator(key, args)?
            }

            // an array literal combines its sub-expressions
            serde_json::Value::Array(items) => {
                let mut operands = Vec::with_capacity(items.len());
                for item in items {
                    operands.push(self.build_expr(item)?);
                }
                Expr::Array(operands)
            }

            serde_json::Value::String(s) => Expr::String(self.strings.intern(s)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Expr::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Expr::Uint(u)
                } else if let Some(f) = n.as_f64() {
                    Expr::Float(f)
                } else {
                    bail!(Error::Malformed(format!("unrepresentable number `{n}`")))
                }
            }
            serde_json::Value::Bool(b) => Expr::Bool(*b),
            serde_json::Value::Null => Expr::Null,
        })
    }

    fn build_operator(&mut self, key: &str, args: &serde_json::Value) -> Result<Expr> {
        let operands = self.build_operands(args)?;

        if key == "var" {
            let mut var = VarExpr {
                operands,
                index: None,
            };
            self.variables.note_var(&mut var)?;
            return Ok(Expr::Var(var));
        }

        let Some(op) = OPERATORS.get(key) else {
            bail!(Error::Unsupported(format!("unknown operator `{key}`")));
        };

        // missing queries the accessor with names the builder cannot
        // see, so positional evaluation is off the table
        if matches!(op, Op::Missing | Op::MissingSome) {
            self.variables.has_computed_names = true;
        }

        Ok(Expr::Op(OpExpr {
            op: *op,
            operands,
        }))
    }

    /// A JSON-array argument list contributes one operand per
    /// element; any other value is the sole operand.
    fn build_operands(&mut self, args: &serde_json::Value) -> Result<Vec<Expr>> {
        match args {
            serde_json::Value::Array(items) => {
                let mut operands = Vec::with_capacity(items.len());
                for item in items {
                    operands.push(self.build_expr(item)?);
                }
                Ok(operands)
            }
            _ => Ok(vec![self.build_expr(args)?]),
        }
    }
}
