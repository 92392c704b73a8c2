use anyhow::{bail, Result};

use crate::ast::{Expr, Op, OpExpr, VarExpr};
use crate::coerce::{self, truthy, Num};
use crate::errors::{is_variable_resolution, Error};
use crate::ops;
use crate::strings::StringPool;
use crate::value::Value;

/// Resolves a variable reference to a value.
///
/// Arguments are the evaluated name value and, when the builder could
/// precompute it, the name's position in the rule's variable-name
/// table. An accessor reports an unknown name with
/// [`Error::VariableResolution`]; any other error aborts evaluation.
pub type VariableAccessor<'a> = dyn Fn(&Value, Option<usize>) -> Result<Value> + 'a;

/// Recursive tree-walking evaluator.
///
/// One interpreter exists per evaluation. It owns a scratch string
/// pool for strings produced by coercion, so concurrent evaluations
/// of a shared rule never contend.
pub(crate) struct Interpreter<'a> {
    vars: &'a VariableAccessor<'a>,
    strings: StringPool,
}

impl<'a> Interpreter<'a> {
    pub fn new(vars: &'a VariableAccessor<'a>) -> Self {
        Self {
            vars,
            strings: StringPool::new(),
        }
    }

    pub fn with_strings(vars: &'a VariableAccessor<'a>, strings: StringPool) -> Self {
        Self { vars, strings }
    }

    pub fn eval(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Null => Ok(Value::Null),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Int(i) => Ok(Value::Int(*i)),
            Expr::Uint(u) => Ok(Value::Uint(*u)),
            Expr::Float(f) => Ok(Value::Float(*f)),
            Expr::String(s) => Ok(Value::String(s.clone())),
            Expr::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item)?);
                }
                Ok(Value::from(values))
            }
            Expr::Var(var) => self.eval_var(var),
            Expr::Op(node) => self.eval_op(node),
        }
    }

    fn eval_op(&mut self, node: &OpExpr) -> Result<Value> {
        let operands = node.evaluated_operands();
        match node.op {
            Op::Equal
            | Op::NotEqual
            | Op::StrictEqual
            | Op::StrictNotEqual
            | Op::Less
            | Op::LessOrEqual
            | Op::Greater
            | Op::GreaterOrEqual => self.eval_comparison(node.op, operands),

            Op::And => self.eval_short_circuit(operands, false),
            Op::Or => self.eval_short_circuit(operands, true),
            Op::Not => self.eval_negation(operands, true),
            Op::NotNot => self.eval_negation(operands, false),
            Op::If => self.eval_if(operands),

            Op::Add | Op::Multiply | Op::Min | Op::Max => self.eval_arith_fold(node.op, operands),
            Op::Subtract | Op::Divide | Op::Modulo => self.eval_arith_binary(node.op, operands),

            Op::Cat => self.eval_cat(operands),
            Op::Substr => self.eval_substr(operands),
            Op::In => self.eval_in(operands),

            Op::Merge => self.eval_merge(operands),
            Op::Map => self.eval_map(operands),
            Op::Filter => self.eval_filter(operands),
            Op::All | Op::None | Op::Some => self.eval_quantifier(node.op, operands),
            Op::Reduce => self.eval_reduce(operands),

            Op::Missing => self.eval_missing(operands),
            Op::MissingSome => self.eval_missing_some(operands),
            Op::Log => self.eval_log(operands),
            Op::RegexMatch => self.eval_regex(operands),
        }
    }

    /// Chained comparison: `a op b AND b op c AND ...`, stopping at
    /// the first false without evaluating further operands.
    fn eval_comparison(&mut self, op: Op, operands: &[Expr]) -> Result<Value> {
        if operands.len() < 2 {
            bail!(Error::Type(format!(
                "`{}` expects at least 2 operands",
                op.key()
            )));
        }

        let mut lhs = self.eval(&operands[0])?;
        for operand in &operands[1..] {
            let rhs = self.eval(operand)?;
            if !ops::compare(op, &lhs, &rhs)? {
                return Ok(Value::Bool(false));
            }
            lhs = rhs;
        }
        Ok(Value::Bool(true))
    }

    /// Returns the first operand whose truthiness equals `stop`, else
    /// the last operand. `and` stops on falsy, `or` on truthy.
    fn eval_short_circuit(&mut self, operands: &[Expr], stop: bool) -> Result<Value> {
        let Some((last, rest)) = operands.split_last() else {
            bail!(Error::Type("expected at least 1 operand".to_string()));
        };

        for operand in rest {
            let value = self.eval(operand)?;
            if truthy(&value) == stop {
                return Ok(value);
            }
        }
        self.eval(last)
    }

    fn eval_negation(&mut self, operands: &[Expr], negate: bool) -> Result<Value> {
        let Some(operand) = operands.first() else {
            bail!(Error::Type("`!` expects 1 operand".to_string()));
        };
        let value = self.eval(operand)?;
        Ok(Value::Bool(truthy(&value) != negate))
    }

    /// `(cond₁, then₁, cond₂, then₂, …, else?)`: the first truthy
    /// condition's branch wins, a trailing odd operand is the else,
    /// otherwise null. A sole operand is returned as-is.
    fn eval_if(&mut self, operands: &[Expr]) -> Result<Value> {
        let num = operands.len();
        let mut pos = 0;

        while pos + 1 < num {
            if truthy(&self.eval(&operands[pos])?) {
                return self.eval(&operands[pos + 1]);
            }
            pos += 2;
        }

        match operands.get(pos) {
            Some(fallback) => self.eval(fallback),
            None => Ok(Value::Null),
        }
    }

    /// Left-fold for the n-ary arithmetic operators. A single
    /// operand is still numerified.
    fn eval_arith_fold(&mut self, op: Op, operands: &[Expr]) -> Result<Value> {
        let Some((first, rest)) = operands.split_first() else {
            bail!(Error::Type(format!(
                "`{}` expects at least 1 operand",
                op.key()
            )));
        };

        let mut acc = coerce::numerify(&self.eval(first)?)?;
        for operand in rest {
            let rhs = coerce::numerify(&self.eval(operand)?)?;
            acc = ops::arith_pair(op, acc, rhs)?;
        }
        Ok(Value::from(acc))
    }

    /// `- / %` with an invented zero when only one operand is given,
    /// so `{"-": [x]}` is `0 - x`.
    fn eval_arith_binary(&mut self, op: Op, operands: &[Expr]) -> Result<Value> {
        let (lhs, rhs) = match operands {
            [sole] => (Num::Int(0), coerce::numerify(&self.eval(sole)?)?),
            [first, second] => {
                let lhs = coerce::numerify(&self.eval(first)?)?;
                let rhs = coerce::numerify(&self.eval(second)?)?;
                (lhs, rhs)
            }
            _ => bail!(Error::Type(format!(
                "`{}` expects 1 or 2 operands",
                op.key()
            ))),
        };
        Ok(Value::from(ops::arith_pair(op, lhs, rhs)?))
    }

    fn eval_cat(&mut self, operands: &[Expr]) -> Result<Value> {
        if operands.is_empty() {
            bail!(Error::Type("`cat` expects at least 1 operand".to_string()));
        }

        let mut out = String::new();
        for operand in operands {
            let value = self.eval(operand)?;
            out.push_str(&coerce::to_display_string(&value)?);
        }
        Ok(Value::String(self.strings.intern_owned(out)))
    }

    /// `substr(s, start, length?)`. Negative start counts from the
    /// end, negative length shortens from the end, omitted length
    /// runs to the end; everything clamps. Offsets are in characters.
    fn eval_substr(&mut self, operands: &[Expr]) -> Result<Value> {
        let Some(subject) = operands.first() else {
            bail!(Error::Type("`substr` expects a string operand".to_string()));
        };
        let value = self.eval(subject)?;
        let s = coerce::to_interned_string(&value, &mut self.strings)?;
        let n = s.chars().count() as i64;

        let mut start = match operands.get(1) {
            Some(operand) => {
                let v = self.eval(operand)?;
                coerce::to_i64(&v)?
            }
            None => 0,
        };
        if start < 0 {
            start = (n + start).max(0);
        }
        start = start.min(n);

        let mut count = match operands.get(2) {
            Some(operand) => {
                let v = self.eval(operand)?;
                coerce::to_i64(&v)?
            }
            None => n - start,
        };
        if count < 0 {
            count = (n - start + count).max(0);
        }

        let out: String = s
            .chars()
            .skip(start as usize)
            .take(count as usize)
            .collect();
        Ok(Value::String(self.strings.intern_owned(out)))
    }

    fn eval_in(&mut self, operands: &[Expr]) -> Result<Value> {
        let [needle, haystack] = operands else {
            bail!(Error::Type("`in` expects 2 operands".to_string()));
        };
        let needle = self.eval(needle)?;
        let haystack = self.eval(haystack)?;
        Ok(Value::Bool(ops::membership(&needle, &haystack)))
    }

    /// Concatenates arrays, promoting non-array operands to
    /// singletons.
    fn eval_merge(&mut self, operands: &[Expr]) -> Result<Value> {
        let mut merged = Vec::new();
        for operand in operands {
            match self.eval(operand)? {
                Value::Array(items) => merged.extend(items.iter().cloned()),
                scalar => merged.push(scalar),
            }
        }
        Ok(Value::from(merged))
    }

    fn eval_map(&mut self, operands: &[Expr]) -> Result<Value> {
        let [source, body] = operands else {
            bail!(Error::Type("`map` expects an array and a body".to_string()));
        };
        let source = self.eval(source)?;
        let Value::Array(items) = &source else {
            return Ok(Value::new_array());
        };

        let mut mapped = Vec::with_capacity(items.len());
        for item in items.iter() {
            mapped.push(eval_with_element(body, item)?);
        }
        Ok(Value::from(mapped))
    }

    fn eval_filter(&mut self, operands: &[Expr]) -> Result<Value> {
        let [source, body] = operands else {
            bail!(Error::Type(
                "`filter` expects an array and a body".to_string()
            ));
        };
        let source = self.eval(source)?;
        let Value::Array(items) = &source else {
            return Ok(Value::new_array());
        };

        let mut kept = Vec::new();
        for item in items.iter() {
            if truthy(&eval_with_element(body, item)?) {
                kept.push(item.clone());
            }
        }
        Ok(Value::from(kept))
    }

    /// `all`/`none`/`some`. Empty and non-array sources take the
    /// quantifier's identity: true, true and false respectively.
    fn eval_quantifier(&mut self, op: Op, operands: &[Expr]) -> Result<Value> {
        let [source, body] = operands else {
            bail!(Error::Type(format!(
                "`{}` expects an array and a body",
                op.key()
            )));
        };
        let source = self.eval(source)?;
        let Value::Array(items) = &source else {
            return Ok(Value::Bool(!matches!(op, Op::Some)));
        };

        for item in items.iter() {
            let hit = truthy(&eval_with_element(body, item)?);
            match op {
                Op::All if !hit => return Ok(Value::Bool(false)),
                Op::None if hit => return Ok(Value::Bool(false)),
                Op::Some if hit => return Ok(Value::Bool(true)),
                _ => {}
            }
        }
        Ok(Value::Bool(!matches!(op, Op::Some)))
    }

    /// `reduce(array, body, initial)`. The body sees `current` and
    /// `accumulator`; a non-array source yields the initial value.
    fn eval_reduce(&mut self, operands: &[Expr]) -> Result<Value> {
        let [source, body, initial] = operands else {
            bail!(Error::Type(
                "`reduce` expects an array, a body and an initial value".to_string()
            ));
        };
        let source = self.eval(source)?;
        let mut accumulator = self.eval(initial)?;
        let Value::Array(items) = &source else {
            return Ok(accumulator);
        };

        for item in items.iter() {
            accumulator = eval_reduction(body, item, &accumulator)?;
        }
        Ok(accumulator)
    }

    fn eval_var(&mut self, var: &VarExpr) -> Result<Value> {
        let Some(name_expr) = var.operands.first() else {
            bail!(Error::Malformed("`var` expects a name operand".to_string()));
        };
        let name = self.eval(name_expr)?;

        match (self.vars)(&name, var.index) {
            Ok(value) => Ok(value),
            Err(err) if is_variable_resolution(&err) => match var.operands.get(1) {
                Some(default) => self.eval(default),
                None => Ok(Value::Null),
            },
            Err(err) => Err(err),
        }
    }

    /// Names whose lookup fails or resolves to null/absent.
    fn missing_names(&mut self, names: &[Value]) -> Result<Vec<Value>> {
        let mut missing = Vec::new();
        for name in names {
            match (self.vars)(name, None) {
                Ok(Value::Null | Value::Absent) => missing.push(name.clone()),
                Ok(_) => {}
                Err(err) if is_variable_resolution(&err) => missing.push(name.clone()),
                Err(err) => return Err(err),
            }
        }
        Ok(missing)
    }

    /// `missing(names…)`: a single array argument is the name list;
    /// otherwise every operand is a name. Decided dynamically on the
    /// first evaluated operand.
    fn eval_missing(&mut self, operands: &[Expr]) -> Result<Value> {
        let Some((first, rest)) = operands.split_first() else {
            return Ok(Value::new_array());
        };

        let first = self.eval(first)?;
        let names = match &first {
            Value::Array(items) => items.as_ref().clone(),
            _ => {
                let mut names = vec![first.clone()];
                for operand in rest {
                    names.push(self.eval(operand)?);
                }
                names
            }
        };

        Ok(Value::from(self.missing_names(&names)?))
    }

    fn eval_missing_some(&mut self, operands: &[Expr]) -> Result<Value> {
        let [min_required, names] = operands else {
            bail!(Error::Type(
                "`missing_some` expects a minimum count and a name list".to_string()
            ));
        };
        let min_value = self.eval(min_required)?;
        let min_required = coerce::to_u64(&min_value)?;

        let names = match self.eval(names)? {
            Value::Array(items) => items.as_ref().clone(),
            sole => vec![sole],
        };

        let missing = self.missing_names(&names)?;
        let present = (names.len() - missing.len()) as u64;

        if present >= min_required {
            Ok(Value::new_array())
        } else {
            Ok(Value::from(missing))
        }
    }

    fn eval_log(&mut self, operands: &[Expr]) -> Result<Value> {
        let Some(operand) = operands.first() else {
            bail!(Error::Type("`log` expects 1 operand".to_string()));
        };
        let value = self.eval(operand)?;
        log::info!("{value}");
        Ok(value)
    }

    #[cfg(feature = "regex")]
    fn eval_regex(&mut self, operands: &[Expr]) -> Result<Value> {
        let [pattern, subject] = operands else {
            bail!(Error::Type(
                "`regex` expects a pattern and a subject".to_string()
            ));
        };
        let pattern = self.eval(pattern)?;
        let subject = self.eval(subject)?;

        let (Value::String(pattern), Value::String(subject)) = (&pattern, &subject) else {
            bail!(Error::Type("`regex` expects string operands".to_string()));
        };

        let re = regex::Regex::new(pattern)?;
        Ok(Value::Bool(re.is_match(subject)))
    }

    #[cfg(not(feature = "regex"))]
    fn eval_regex(&mut self, _operands: &[Expr]) -> Result<Value> {
        bail!(Error::Unsupported(
            "`regex` requires the regex feature".to_string()
        ))
    }
}

/// Evaluates a sequence body against one element.
///
/// The body runs under a local accessor: the empty name resolves to
/// the element, every other name to null. Free variables in bodies
/// deliberately do not reach the outer accessor.
fn eval_with_element(body: &Expr, element: &Value) -> Result<Value> {
    let accessor = |name: &Value, _index: Option<usize>| -> Result<Value> {
        match name {
            Value::String(key) if key.is_empty() => Ok(element.clone()),
            _ => Ok(Value::Null),
        }
    };
    Interpreter::new(&accessor).eval(body)
}

/// Evaluates a reduce body with `current` and `accumulator` bound.
fn eval_reduction(body: &Expr, element: &Value, accumulator: &Value) -> Result<Value> {
    let accessor = |name: &Value, _index: Option<usize>| -> Result<Value> {
        match name {
            Value::String(key) if key.as_ref() == "current" => Ok(element.clone()),
            Value::String(key) if key.as_ref() == "accumulator" => Ok(accumulator.clone()),
            _ => Ok(Value::Null),
        }
    };
    Interpreter::new(&accessor).eval(body)
}
