//! Error taxonomy for the evaluator.
//!
//! Four kinds, matching the four error classes of the core evaluator:
//! user/recoverable runtime errors (catchable by `try_call`), unrecoverable
//! construction-time errors, and internal invariant violations. There is no
//! `thiserror`/`anyhow` here, only hand-rolled `Display` + `std::error::Error`
//! impls, matching the teacher's own `exception_private.rs` / `resource.rs`
//! style.

use std::fmt;

/// Result type alias used throughout the evaluator.
pub type EvalResult<T> = Result<T, EvalError>;

/// The four error kinds of the core evaluator.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// Raised by evaluating user code or built-ins against user input.
    /// Caught by `try_call`.
    User(String),
    /// Raised during AST/lambda construction (duplicate parameters, malformed
    /// format strings, `_` used as an identifier, ...). Propagates out of
    /// `try_call` uncaught.
    Unrecoverable(String),
    /// Invariant violation inside the evaluator itself. Always a bug.
    Internal(String),
}

impl EvalError {
    pub fn user(msg: impl Into<String>) -> Self {
        Self::User(msg.into())
    }

    pub fn unrecoverable(msg: impl Into<String>) -> Self {
        Self::Unrecoverable(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether `try_call` should catch this error.
    ///
    /// Only `User` errors are "recoverable" in the `try_call` sense; the
    /// general runtime-error class described in §4.C as "Recoverable error"
    /// is represented here by the `User` variant. `Unrecoverable` and
    /// `Internal` both propagate through `try_call` untouched.
    pub fn is_catchable(&self) -> bool {
        matches!(self, Self::User(_))
    }

    /// The message payload, regardless of kind.
    pub fn message(&self) -> &str {
        match self {
            Self::User(m) | Self::Unrecoverable(m) | Self::Internal(m) => m,
        }
    }

    /// Formats this error the way the top-level handler would print it
    /// (`"Error: <what>"`, or `"INTERNAL ERROR: <what>"`).
    pub fn top_level_display(&self) -> String {
        match self {
            Self::User(m) | Self::Unrecoverable(m) => format!("Error: {m}"),
            Self::Internal(m) => format!("INTERNAL ERROR: {m}"),
        }
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for EvalError {}

/// Raises an [`EvalError::Internal`] for a broken invariant.
///
/// Mirrors the teacher's `THROW_UNREACHABLE` sites: a call to this macro
/// always indicates a bug in the evaluator, never user input.
#[macro_export]
macro_rules! unreachable_eval {
    ($($arg:tt)*) => {
        return Err($crate::error::EvalError::internal(format!($($arg)*)))
    };
}
