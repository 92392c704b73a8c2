use thiserror::Error as ThisError;

/// Errors produced while building or evaluating a rule.
///
/// Errors travel wrapped in [`anyhow::Error`]; use
/// [`anyhow::Error::downcast_ref`] to recover the variant.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum Error {
    /// An operator could not coerce its operands.
    #[error("type error: {0}")]
    Type(String),

    /// An accessor could not resolve a variable name.
    ///
    /// Raised only by accessors. `var` catches it to substitute its
    /// default operand; `missing`/`missing_some` catch it to record
    /// the name as missing. It never escapes from those operators.
    #[error("cannot resolve variable: {0}")]
    VariableResolution(String),

    /// Signed and unsigned integer operands could not be reconciled
    /// in either width.
    #[error("range error: {0}")]
    Range(String),

    /// The rule uses a construct the engine does not support, or an
    /// accessor was asked for something it cannot provide.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// The rule is structurally invalid.
    #[error("malformed rule: {0}")]
    Malformed(String),
}

/// Returns true if `err` is a variable-resolution error raised by an
/// accessor.
pub(crate) fn is_variable_resolution(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<Error>(),
        Some(Error::VariableResolution(_))
    )
}
