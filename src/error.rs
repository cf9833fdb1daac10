use crate::runtime::Escape;
use crate::value::Value;

/// Every failure the interpreter can surface. Readers and the expander raise
/// `Syntax`; the evaluator raises the rest. All of these propagate through
/// `Result` and are reported once, at the driver's interaction boundary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("unbound variable: {0}")]
    UnboundVariable(String),

    #[error("wrong number of arguments: expected {expected}, got {got}")]
    Arity { expected: usize, got: usize },

    #[error("not applicable: {0}")]
    NotApplicable(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("escape continuation invoked outside the extent of its call/cc")]
    ContinuationMisuse,

    /// Control signal raised by an escape procedure. It unwinds pending
    /// computation and is caught by the `call/cc` frame whose handle matches
    /// by identity; callers outside `eval` never observe it.
    #[error("escape continuation unwinding")]
    ContinuationUnwind { escape: Escape, value: Value },

    #[error("input error: {0}")]
    Io(#[from] std::io::Error),
}
