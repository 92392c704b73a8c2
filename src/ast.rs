use std::rc::Rc;

/// Operator discriminant for [`Expr::Op`] nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    // comparison
    Equal,
    StrictEqual,
    NotEqual,
    StrictNotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,

    // logical
    Not,
    NotNot,
    And,
    Or,

    // control structure
    If,

    // arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Min,
    Max,

    // sequences
    Map,
    Reduce,
    Filter,
    All,
    None,
    Some,
    Merge,

    // strings
    Cat,
    Substr,
    In,

    // data access
    Missing,
    MissingSome,

    // diagnostic
    Log,

    // extension
    RegexMatch,
}

impl Op {
    /// Upper bound on how many operands the operator evaluates, or
    /// `None` for n-ary operators.
    pub fn max_arity(&self) -> Option<usize> {
        match self {
            Op::Not | Op::NotNot | Op::Log => Some(1),
            Op::Equal
            | Op::StrictEqual
            | Op::NotEqual
            | Op::StrictNotEqual
            | Op::Subtract
            | Op::Divide
            | Op::Modulo
            | Op::Map
            | Op::Filter
            | Op::All
            | Op::None
            | Op::Some
            | Op::In
            | Op::MissingSome
            | Op::RegexMatch => Some(2),
            Op::Less | Op::LessOrEqual | Op::Greater | Op::GreaterOrEqual | Op::Reduce
            | Op::Substr => Some(3),
            Op::And
            | Op::Or
            | Op::If
            | Op::Add
            | Op::Multiply
            | Op::Min
            | Op::Max
            | Op::Merge
            | Op::Cat
            | Op::Missing => None,
        }
    }

    /// The rule-syntax key of the operator, used in error messages.
    pub fn key(&self) -> &'static str {
        match self {
            Op::Equal => "==",
            Op::StrictEqual => "===",
            Op::NotEqual => "!=",
            Op::StrictNotEqual => "!==",
            Op::Less => "<",
            Op::LessOrEqual => "<=",
            Op::Greater => ">",
            Op::GreaterOrEqual => ">=",
            Op::Not => "!",
            Op::NotNot => "!!",
            Op::And => "and",
            Op::Or => "or",
            Op::If => "if",
            Op::Add => "+",
            Op::Subtract => "-",
            Op::Multiply => "*",
            Op::Divide => "/",
            Op::Modulo => "%",
            Op::Min => "min",
            Op::Max => "max",
            Op::Map => "map",
            Op::Reduce => "reduce",
            Op::Filter => "filter",
            Op::All => "all",
            Op::None => "none",
            Op::Some => "some",
            Op::Merge => "merge",
            Op::Cat => "cat",
            Op::Substr => "substr",
            Op::In => "in",
            Op::Missing => "missing",
            Op::MissingSome => "missing_some",
            Op::Log => "log",
            Op::RegexMatch => "regex",
        }
    }
}

/// A `var` node.
///
/// The first operand is the name sub-expression; an optional second
/// operand is the default. `index` caches the position of a plain
/// literal name in the rule's variable-name table; `None` means the
/// name is computed (or the lambda "current element" reference).
#[derive(Debug, Clone)]
pub struct VarExpr {
    pub operands: Vec<Expr>,
    pub index: Option<usize>,
}

/// An operator node with its ordered operand list.
#[derive(Debug, Clone)]
pub struct OpExpr {
    pub op: Op,
    pub operands: Vec<Expr>,
}

impl OpExpr {
    /// Number of operands the evaluator will look at. Fixed-arity
    /// operators ignore surplus operands; n-ary operators evaluate
    /// all of them.
    pub fn num_evaluated_operands(&self) -> usize {
        match self.op.max_arity() {
            Some(cap) => cap.min(self.operands.len()),
            None => self.operands.len(),
        }
    }

    /// The evaluated prefix of the operand list.
    pub fn evaluated_operands(&self) -> &[Expr] {
        &self.operands[..self.num_evaluated_operands()]
    }
}

/// Typed expression tree built from a rule document.
///
/// Values carried during evaluation are [`crate::Value`]s, never
/// expression nodes; literal variants exist only so the builder can
/// embed rule constants in the tree.
#[derive(Debug, Clone)]
pub enum Expr {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    String(Rc<str>),
    Array(Vec<Expr>),
    Var(VarExpr),
    Op(OpExpr),
}

impl Expr {
    /// Renders the expression back as a rule document.
    ///
    /// Operator arguments always come out in list form, so the text
    /// may differ from the authored rule (`{"var": "x"}` round-trips
    /// as `{"var": ["x"]}`), but rebuilding the result yields an
    /// equivalent rule.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Expr::Null => serde_json::Value::Null,
            Expr::Bool(b) => serde_json::Value::Bool(*b),
            Expr::Int(i) => serde_json::Value::from(*i),
            Expr::Uint(u) => serde_json::Value::from(*u),
            Expr::Float(f) => match serde_json::Number::from_f64(*f) {
                Some(n) => serde_json::Value::Number(n),
                None => serde_json::Value::Null,
            },
            Expr::String(s) => serde_json::Value::String(s.as_ref().to_string()),
            Expr::Array(items) => {
                serde_json::Value::Array(items.iter().map(Expr::to_json).collect())
            }
            Expr::Var(var) => operator_object("var", &var.operands),
            Expr::Op(node) => operator_object(node.op.key(), &node.operands),
        }
    }
}

fn operator_object(key: &str, operands: &[Expr]) -> serde_json::Value {
    let args: Vec<serde_json::Value> = operands.iter().map(Expr::to_json).collect();
    let mut object = serde_json::Map::with_capacity(1);
    object.insert(key.to_string(), serde_json::Value::Array(args));
    serde_json::Value::Object(object)
}
