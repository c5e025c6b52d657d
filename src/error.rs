use crate::LispValue;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LispError>;

/// Return early with `$err` unless `$cond` holds.
macro_rules! assert_or_err {
    ($cond:expr, $err:expr $(,)?) => {
        if !$cond {
            return Err($err.into());
        }
    };
}
pub(crate) use assert_or_err;

#[derive(Error, Debug)]
pub enum LispError {
    #[error("syntax error at line {0}, column {1}")]
    SyntaxError(usize, usize),
    #[error("missing delimiter '{1}' (expected {0} more)")]
    UnbalancedDelim(usize, &'static str),
    #[error("prefix `{0}` not followed by any form")]
    MissingToken(&'static str),
    #[error("unterminated string starting at line {0}, column {1}")]
    UnterminatedString(usize, usize),
    #[error("invalid escape sequence `\\{0}`")]
    InvalidEscape(char),
    #[error("'{0}' not found")]
    UndefinedVariable(String),
    #[error("invalid data type. expected {0}, received {1}")]
    InvalidDataType(&'static str, &'static str),
    #[error("unexpected arguments. expected {0}, received {1}")]
    IncorrectArguments(usize, usize),
    #[error("value of type {0} cannot be applied")]
    NotApplicable(&'static str),
    #[error("index {0} out of range")]
    IndexOutOfRange(i64),
    #[error("missing a value for a `let*` or `hash-map` binding")]
    MissingBinding,
    #[error("`unquote` and `splice-unquote` can only be used inside `quasiquote`")]
    OnlyInQuasiquote,
    #[error("`catch*` can only be used inside `try*`")]
    OnlyInTry,
    #[error("`try*` expects a `(catch* name body)` clause")]
    TryNoCatch,
    #[error("`defmacro!` expects a user-defined function")]
    NotAMacro,
    #[error("division by zero")]
    DivideByZero,
    #[error("operation would never finish on an infinite sequence")]
    InfiniteSequence,
    #[error("environment no longer exists")]
    DetachedEnvironment,
    #[error("uncaught exception: {}", .0.inspect())]
    UncaughtException(LispValue),

    #[cfg(feature = "io-stdlib")]
    #[error("error calling into native function: {0}")]
    OSFailure(#[from] std::io::Error),
}

impl LispError {
    /// The value a `catch*` handler binds for this failure.
    pub fn into_reason(self) -> LispValue {
        match self {
            LispError::UncaughtException(reason) => reason,
            err => LispValue::error(err),
        }
    }

    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            LispError::SyntaxError(..)
                | LispError::UnbalancedDelim(..)
                | LispError::MissingToken(_)
                | LispError::UnterminatedString(..)
                | LispError::InvalidEscape(_)
        )
    }
}
